//! Criterion benchmarks for the control-protocol receive path.
//!
//! Measures decode plus routing of a single datagram, and the routing cost of
//! an address that matches nothing (the worst case, every pattern is tried).
//!
//! Run with:
//! ```bash
//! cargo bench --package deck-core --bench control_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use deck_core::protocol::{
    decode_datagram, encode_packet, message_packet, route_message, OscMessage, OscType,
};

fn bench_route(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_route");

    let press = OscMessage {
        addr: "/press/bank/3/7".to_string(),
        args: vec![OscType::Int(1)],
    };
    let text = OscMessage {
        addr: "/style/text/12/31".to_string(),
        args: vec![OscType::String("Live".to_string())],
    };
    let unknown = OscMessage {
        addr: "/not/a/known/route".to_string(),
        args: vec![],
    };

    group.bench_function("press", |b| b.iter(|| route_message(black_box(&press))));
    group.bench_function("text", |b| b.iter(|| route_message(black_box(&text))));
    group.bench_function("unknown", |b| b.iter(|| route_message(black_box(&unknown))));

    group.finish();
}

fn bench_decode_and_route(c: &mut Criterion) {
    let bytes = encode_packet(&message_packet(
        "/style/bgcolor/2/1",
        vec![OscType::Int(255), OscType::Int(0), OscType::Int(128)],
    ))
    .expect("encode must succeed");

    c.bench_function("control_decode_and_route_bgcolor", |b| {
        b.iter(|| {
            decode_datagram(black_box(&bytes))
                .map(|msgs| msgs.iter().filter_map(route_message).count())
        })
    });
}

criterion_group!(benches, bench_route, bench_decode_and_route);
criterion_main!(benches);
