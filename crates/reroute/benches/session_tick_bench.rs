//! Criterion benchmark: one frame of a monitored session.
//!
//! Drives a `TestSession` with simulation and monitoring running, so each
//! iteration covers synthetic generation, the expiry sweep, relevance
//! dispatch and event publication. A second group measures a full
//! `report_event` round trip through feed, optimizer and controller.
//!
//! Run with: cargo bench -p reroute --bench session_tick_bench --features bench

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use reroute::config::MonitorConfig;
use reroute::session;
use reroute::test_harness::TestSession;
use reroute::traffic_event::{EventKind, EventReport};
use reroute::Coordinate;

const START: Coordinate = Coordinate::new(32.0853, 34.7818);

fn route() -> Vec<Coordinate> {
    (0..=10)
        .map(|i| START.offset_meters(i as f64 * 1_000.0, 0.0))
        .collect()
}

/// A session already holding `events` synthetic events.
fn busy_session(events: usize) -> TestSession {
    let config = MonitorConfig {
        simulation_interval_secs: 1.0,
        monitor_interval_secs: 5.0,
        max_simulated_events: events,
        ..MonitorConfig::default()
    };
    let mut session = TestSession::with_config(config).with_route(&route());
    session::start_simulation(session.world_mut());
    session::start_monitoring(session.world_mut());
    session.advance(events as u32 + 1);
    session
}

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_frame");
    group.measurement_time(Duration::from_secs(10));
    for events in [5usize, 25, 100] {
        let mut session = busy_session(events);
        group.bench_with_input(BenchmarkId::from_parameter(events), &events, |b, _| {
            b.iter(|| session.advance(1));
        });
    }
    group.finish();
}

fn bench_report(c: &mut Criterion) {
    c.bench_function("session_report_on_route", |b| {
        b.iter_batched(
            || TestSession::new().with_route(&route()),
            |mut session| {
                let report = EventReport::new(
                    EventKind::Accident,
                    START.offset_meters(5_000.0, 0.0),
                    0.8,
                )
                .with_radius_km(0.5);
                session.report(report)
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_frame, bench_report);
criterion_main!(benches);
