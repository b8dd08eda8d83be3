//! Timer scheduler benchmark suite.
//!
//! Benchmarks the per-frame hot path at different scales:
//! - Timer counts: 100, 1000, 10000
//! - Workloads: start/stop churn, steady frame ticks, session traffic
//!
//! Run with: cargo bench --bench scheduler
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;
use socket_session::{
    CommandId, ConnectOptions, EventSink, JsonCodec, Repeat, Result, SendStatus, Session,
    TargetId, TimerScheduler, Transport, TransportEvent,
};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const TIMER_COUNTS: &[usize] = &[100, 1000, 10_000];

/// One 60 Hz frame, in seconds.
const FRAME: f64 = 1.0 / 60.0;

// ============================================================================
// Benchmark: Start/Stop Churn
// ============================================================================

fn bench_start_stop(c: &mut Criterion) {
    let mut group = c.benchmark_group("start_stop");

    for &count in TIMER_COUNTS {
        group.bench_with_input(BenchmarkId::new("churn", count), &count, |b, &count| {
            let scheduler = TimerScheduler::with_capacity(count);
            b.iter(|| {
                let ids: Vec<_> = (0..count)
                    .map(|i| {
                        scheduler
                            .start(|| Ok(()), 1.0 + (i % 17) as f64 * 0.1, Repeat::Once)
                            .expect("positive interval")
                    })
                    .collect();
                for id in ids {
                    black_box(scheduler.stop(id));
                }
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Frame Ticks
// ============================================================================

fn bench_frame_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_ticks");

    for &count in TIMER_COUNTS {
        group.bench_with_input(BenchmarkId::new("update", count), &count, |b, &count| {
            let scheduler = TimerScheduler::with_capacity(count);
            for i in 0..count {
                scheduler
                    .start(|| Ok(()), FRAME * (1 + i % 120) as f64, Repeat::Forever)
                    .expect("positive interval");
            }
            b.iter(|| scheduler.update(black_box(FRAME)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Session Traffic
// ============================================================================

/// Transport that accepts every write and keeps nothing.
#[derive(Default)]
struct NullTransport {
    sink: Option<EventSink>,
}

impl Transport for NullTransport {
    fn bind(&mut self, sink: EventSink) {
        self.sink = Some(sink);
    }

    fn open(&mut self, _url: &str, _options: &ConnectOptions) -> Result<()> {
        if let Some(sink) = &self.sink {
            sink.emit(TransportEvent::Opened);
        }
        Ok(())
    }

    fn send(&mut self, frame: Vec<u8>) -> Result<SendStatus> {
        black_box(frame);
        Ok(SendStatus::Sent)
    }

    fn close(&mut self, _code: Option<u16>, _reason: Option<&str>) {}
}

fn bench_session_traffic(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_traffic");

    let scheduler = TimerScheduler::new();
    let mut session = Session::new(NullTransport::default(), JsonCodec::new(), scheduler.clone());
    session
        .connect("ws://127.0.0.1:8800", ConnectOptions::new())
        .expect("connect");
    session.poll();

    let push = CommandId::new(2001);
    session.set_response_handler(push, "ChatPush", TargetId::default(), |_, payload| {
        black_box(payload);
        Ok(())
    });
    let frame = serde_json::to_vec(&json!({ "cmd": 2001, "data": { "text": "hello" }, "reqId": 0 }))
        .expect("serializable");

    group.bench_function("push_and_tick", |b| {
        b.iter(|| {
            session.handle_event(TransportEvent::Message(frame.clone()));
            scheduler.update(FRAME);
            session.poll();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_start_stop, bench_frame_ticks, bench_session_traffic);
criterion_main!(benches);
