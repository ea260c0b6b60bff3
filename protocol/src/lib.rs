// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # ATTEST Protocol — Core Library
//!
//! The primitives under the ATTEST credential registry: keys, addresses,
//! DIDs, the proof verifier, clocks and the ledger store.
//!
//! ATTEST issues, verifies and revokes signed credentials bound to
//! decentralized identifiers. This crate knows nothing about issuers or
//! credentials as *records*; that lives in `attest-contracts`. What it
//! does know is how to tell who signed something, how to name a credential
//! by its content, and how to put bytes on disk without losing them.
//!
//! ## Architecture
//!
//! - **crypto**: Ed25519 keys, signature envelopes, BLAKE3/SHA-256.
//! - **identity**: `0x` addresses and W3C DIDs.
//! - **proof**: the stateless proof verifier.
//! - **time**: the clock abstraction expiry is measured against.
//! - **storage**: the sled-backed event log.
//! - **config**: protocol constants.
//!
//! ## Design Philosophy
//!
//! 1. Verification answers yes or no. Malformed input is "no", not a panic.
//! 2. Hash formats are versioned and domain-separated.
//! 3. No unsafe code.

pub mod config;
pub mod crypto;
pub mod identity;
pub mod proof;
pub mod storage;
pub mod time;
