// Proof verifier benchmarks.
//
// Covers signer recovery from a hex envelope, the credential content hash
// at a few metadata sizes, and the SHA-256 proof hash.

use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use attest_protocol::crypto::keys::Keypair;
use attest_protocol::crypto::signatures::sign_message;
use attest_protocol::proof::{
    compute_credential_hash, compute_proof_hash, recover_signer, verify_signature,
};

fn bench_recover_signer(c: &mut Criterion) {
    let keypair = Keypair::generate();
    let message = b"issueCredential:{\"holder\":\"0xab..\",\"type\":\"DEGREE\"}";
    let signature = sign_message(&keypair, message);

    c.bench_function("proof/recover_signer", |b| {
        b.iter(|| recover_signer(message, &signature));
    });
}

fn bench_verify_signature(c: &mut Criterion) {
    let keypair = Keypair::generate();
    let message = b"attest-proof:0x00:challenge";
    let signature = sign_message(&keypair, message);
    let claimed = keypair.address().to_string().to_uppercase().replacen("0X", "0x", 1);

    c.bench_function("proof/verify_signature", |b| {
        b.iter(|| verify_signature(message, &signature, &claimed));
    });
}

fn bench_credential_hash(c: &mut Criterion) {
    let holder = Keypair::from_seed(&[1u8; 32]).address();
    let issuer = Keypair::from_seed(&[2u8; 32]).address();
    let issued_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

    let mut group = c.benchmark_group("proof/credential_hash");
    for size in [32usize, 256, 4096] {
        let metadata = "m".repeat(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &metadata, |b, m| {
            b.iter(|| compute_credential_hash(&holder, &issuer, "DEGREE", issued_at, m));
        });
    }
    group.finish();
}

fn bench_proof_hash(c: &mut Criterion) {
    let payload = vec![0x5Au8; 1024];
    c.bench_function("proof/proof_hash_1k", |b| {
        b.iter(|| compute_proof_hash(&payload));
    });
}

criterion_group!(
    benches,
    bench_recover_signer,
    bench_verify_signature,
    bench_credential_hash,
    bench_proof_hash
);
criterion_main!(benches);
