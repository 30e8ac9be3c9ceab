use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration,
};

use av_mixed_traffic::config::CollectorConfig;
use av_mixed_traffic::flow_analyzer::{
    compute_step_metrics, detect_emergency_braking, TrafficSnapshot,
};
use av_mixed_traffic::shared_data::VehicleClass;
use av_mixed_traffic::simulation_engine::vehicles::VehicleSnapshot;
use av_mixed_traffic::simulation_engine::VehicleState;

/// Builds a snapshot of `count` vehicles with a spread of speeds, some of
/// them stopped and every tenth one braking hard.
fn generate_snapshot(count: usize) -> TrafficSnapshot {
    let vehicles = (0..count)
        .map(|i| VehicleSnapshot {
            id: format!("veh{}", i),
            state: VehicleState {
                speed: (i % 15) as f64,
                acceleration: if i % 10 == 0 { -8.0 } else { 0.3 },
                fuel_consumption: 0.8 + (i % 5) as f64 * 0.2,
                stop_state: if i % 15 == 0 { 1 } else { 0 },
                waiting_time: (i % 7) as f64,
                accumulated_waiting_time: (i % 40) as f64,
            },
        })
        .collect();
    TrafficSnapshot {
        time: 600.0,
        vehicles,
    }
}

fn bench_step_metrics(c: &mut Criterion) {
    let config = CollectorConfig::default();
    let mut group = c.benchmark_group("Metrics_Collector_Benchmarks");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    for &count in [100, 1_000, 5_000].iter() {
        let snapshot = generate_snapshot(count);

        group.bench_with_input(
            BenchmarkId::new("compute_step_metrics", count),
            &count,
            |b, &_count| {
                b.iter(|| {
                    let metrics = compute_step_metrics(black_box(&snapshot), black_box(&config));
                    black_box(metrics);
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("detect_emergency_braking", count),
            &count,
            |b, &_count| {
                b.iter(|| {
                    let events = detect_emergency_braking(
                        black_box(&snapshot),
                        black_box(&config),
                        |id| {
                            if id.len() % 2 == 0 {
                                VehicleClass::Autonomous
                            } else {
                                VehicleClass::Human
                            }
                        },
                    );
                    black_box(events);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_step_metrics);
criterion_main!(benches);
