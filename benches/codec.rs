//! Wire codec benchmark suite.
//!
//! Benchmarks the hot encode/decode paths of every socket vendor:
//! - Samsung key commands and channel events
//! - LG requests and responses
//! - Pointer line frames
//!
//! Run with: cargo bench --bench codec
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use tv_remote::RequestId;
use tv_remote::protocol::lg::{Request, RequestPayload, Response, uri};
use tv_remote::protocol::samsung::{ChannelMessage, ControlKey, RemoteControlCommand};
use tv_remote::protocol::{Key, PointerFrame};

// ============================================================================
// Fixtures
// ============================================================================

const SAMSUNG_CONNECT: &str =
    r#"{"event":"ms.channel.connect","data":{"token":"12345","clients":[{"id":"c","attributes":{"name":"VFY="}}]}}"#;

const LG_VOLUME: &str = r#"{"type":"response","id":"volumeSubscription","payload":{"returnValue":true,"volumeStatus":{"muteStatus":false,"volume":12}}}"#;

const TEXT_LENGTHS: &[usize] = &[8, 64, 512];

// ============================================================================
// Benchmark: Samsung
// ============================================================================

fn bench_samsung(c: &mut Criterion) {
    let mut group = c.benchmark_group("samsung");

    group.bench_function("encode_click", |b| {
        let command = RemoteControlCommand::click(ControlKey::VolumeUp);
        b.iter(|| black_box(&command).encode());
    });

    for &len in TEXT_LENGTHS {
        let command = RemoteControlCommand::Text("x".repeat(len));
        group.bench_with_input(BenchmarkId::new("encode_text", len), &command, |b, command| {
            b.iter(|| black_box(command).encode());
        });
    }

    group.bench_function("decode_connect", |b| {
        b.iter(|| ChannelMessage::decode(black_box(SAMSUNG_CONNECT)));
    });

    group.finish();
}

// ============================================================================
// Benchmark: LG
// ============================================================================

fn bench_lg(c: &mut Criterion) {
    let mut group = c.benchmark_group("lg");

    group.bench_function("encode_set_volume", |b| {
        let request = Request::call(uri::SET_VOLUME).with_payload(RequestPayload {
            volume: Some(20),
            ..Default::default()
        });
        let id = RequestId::new("bench");
        b.iter(|| black_box(&request).encode_with_id(&id));
    });

    group.bench_function("decode_volume", |b| {
        b.iter(|| Response::decode(black_box(LG_VOLUME)));
    });

    group.finish();
}

// ============================================================================
// Benchmark: Pointer
// ============================================================================

fn bench_pointer(c: &mut Criterion) {
    c.bench_function("pointer/encode_button", |b| {
        let frame = PointerFrame::key(Key::Home);
        b.iter(|| black_box(&frame).encode());
    });
}

// ============================================================================
// Criterion Setup
// ============================================================================

criterion_group!(benches, bench_samsung, bench_lg, bench_pointer);
criterion_main!(benches);
