//! Benchmarks for RC4 throughput and file key derivation.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pdf_crypt::encryption::rc4::{rc4_crypt, Rc4Backend};
use pdf_crypt::{EncryptionInfo, FileKeyDeriver, Token};
use std::hint::black_box;

fn entry(key: &str, value: Token) -> (Token, Token) {
    (Token::name(key, 0), value)
}

fn r3_info() -> EncryptionInfo {
    let dict = Token::dictionary(
        vec![
            entry("Filter", Token::name("Standard", 0)),
            entry("V", Token::numeric("2", 0)),
            entry("R", Token::numeric("3", 0)),
            entry("Length", Token::numeric("128", 0)),
            entry("P", Token::numeric("-1340", 0)),
            entry(
                "O",
                Token::hex("9ea29afd75aebc39b05e23dd1f8e6c9d6567640aec190c3640b3c8dd979f0e15", 0),
            ),
            entry(
                "U",
                Token::hex("e3e350bf2e72a9b5243fee704da4ec1600000000000000000000000000000000", 0),
            ),
        ],
        0,
    );
    EncryptionInfo::parse(&dict, &[Token::hex("C21F21EA44C1E2ED2581435FA5A2DCCE", 0)])
        .expect("valid R3 dictionary")
}

fn r6_info() -> EncryptionInfo {
    let cf = Token::dictionary(
        vec![entry(
            "StdCF",
            Token::dictionary(vec![entry("CFM", Token::name("AESV3", 0))], 0),
        )],
        0,
    );
    let dict = Token::dictionary(
        vec![
            entry("Filter", Token::name("Standard", 0)),
            entry("V", Token::numeric("5", 0)),
            entry("R", Token::numeric("6", 0)),
            entry("P", Token::numeric("-1028", 0)),
            entry(
                "O",
                Token::hex(
                    "ceb5442ba4f67dacbcae9205008e1f4fcd2bd3729d6ff840bb84301d3e52b5d5\
                     6f7673616c7430316f6b73616c743031",
                    0,
                ),
            ),
            entry(
                "U",
                Token::hex(
                    "af013d30ffa008ece24dcb9f452cd1468f1900bd8734227fc7d3cfec6008b725\
                     757673616c743031756b73616c743031",
                    0,
                ),
            ),
            entry(
                "OE",
                Token::hex("e5d4d8271f7e0a323629cdc2be26fb7cd3f76fd9a001204dd6fa53a9d742e4da", 0),
            ),
            entry(
                "UE",
                Token::hex("74be3901000a93535355caa9c8683cd91141b75530bb42ef7fd48c17d8ea441f", 0),
            ),
            entry("Perms", Token::hex("a7bd64369a60eb9ea04bb2cb6558550a", 0)),
            entry("CF", cf),
            entry("StmF", Token::name("StdCF", 0)),
            entry("StrF", Token::name("StdCF", 0)),
        ],
        0,
    );
    EncryptionInfo::parse(&dict, &[]).expect("valid R6 dictionary")
}

fn rc4_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("RC4");
    let key = [0x42u8; 16];

    for &size in &[1024usize, 64 * 1024, 1024 * 1024] {
        let data = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(size as u64));

        for backend in [Rc4Backend::Native, Rc4Backend::Computed] {
            let id = BenchmarkId::new(format!("{:?}", backend), size);
            group.bench_with_input(id, &data, |b, data| {
                b.iter(|| black_box(rc4_crypt(backend, black_box(&key), black_box(data))));
            });
        }
    }

    group.finish();
}

fn derivation_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Key derivation");
    let deriver = FileKeyDeriver::new();

    let r3 = r3_info();
    group.bench_function("r3_empty_user_password", |b| {
        b.iter(|| black_box(deriver.derive(black_box(&r3), b"")));
    });

    let r6 = r6_info();
    group.bench_function("r6_user_password", |b| {
        b.iter(|| black_box(deriver.derive(black_box(&r6), b"user6")));
    });
    group.bench_function("r6_owner_password", |b| {
        b.iter(|| black_box(deriver.derive(black_box(&r6), b"owner6")));
    });

    group.finish();
}

criterion_group!(benches, rc4_benches, derivation_benches);
criterion_main!(benches);
