use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ocsp_proto::{
    build_response, CertStatus, CertificateInfo, OcspRequest, OcspRequestBuilder,
    ResponderIdentity, ResponseTemplate, RevocationReason, SerialNumber,
};

const CA_DER: &[u8] = include_bytes!("../../../testdata/ca.der");
const RESPONDER_PEM: &[u8] = include_bytes!("../../../testdata/responder.pem");
const RESPONDER_KEY: &str = include_str!("../../../testdata/responder-key.pem");

fn bench_request_parse(c: &mut Criterion) {
    let issuer = CertificateInfo::from_der(CA_DER.to_vec()).expect("Failed to parse CA");
    let request = OcspRequestBuilder::new(&issuer, SerialNumber::from(100))
        .with_nonce(vec![0x42; 16])
        .build();

    c.bench_function("request_parse", |b| {
        b.iter(|| OcspRequest::parse(black_box(&request)).expect("Failed to parse request"))
    });
}

fn bench_response_build(c: &mut Criterion) {
    let issuer = CertificateInfo::from_der(CA_DER.to_vec()).expect("Failed to parse CA");
    let identity =
        ResponderIdentity::from_pem(RESPONDER_PEM, RESPONDER_KEY).expect("Failed to load identity");
    let mut group = c.benchmark_group("response_build");

    group.bench_function("good", |b| {
        b.iter(|| {
            let now = Utc::now();
            let template = ResponseTemplate::new(SerialNumber::from(101), CertStatus::Good, now)
                .with_next_update(now + Duration::hours(1));
            build_response(black_box(&template), &issuer, &identity).expect("Failed to sign")
        })
    });

    group.bench_function("revoked", |b| {
        b.iter(|| {
            let now = Utc::now();
            let template = ResponseTemplate::new(
                SerialNumber::from(100),
                CertStatus::Revoked {
                    revoked_at: now,
                    reason: RevocationReason::Unspecified,
                },
                now,
            );
            build_response(black_box(&template), &issuer, &identity).expect("Failed to sign")
        })
    });

    group.finish();
}

criterion_group!(benches, bench_request_parse, bench_response_build);
criterion_main!(benches);
