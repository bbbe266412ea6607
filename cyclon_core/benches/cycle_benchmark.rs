//! Cycle benchmark: per-axis work of one motion task pass.
//!
//! Measures axis execution (commands, trajectory, monitor, outputs) for
//! N-axis configurations against the simulated fieldbus, plus the monitor
//! and PVT cursor in isolation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use cyclon_common::motion::config::{AxisConfig, MonitorConfig};
use cyclon_core::cycle::FieldbusLink;
use cyclon_core::exec::{Axis, HealthAwareExecutor};
use cyclon_core::image::ProcessDataBuilder;
use cyclon_core::monitor::{Monitor, MonitorInput};
use cyclon_core::pvt::{PvtAxis, PvtPoint, PvtSequence};
use cyclon_core::sim::{SimConfig, SimFieldbus};

const SAMPLE_TIME: f64 = 0.001;

/// Reference monitor settings for a typical linear axis.
fn reference_monitor() -> MonitorConfig {
    MonitorConfig {
        at_target_tol: 0.01,
        at_target_time: 5,
        pos_lag_tol: 1.0,
        pos_lag_time: 20,
        max_vel: 500.0,
        enable_soft_limit_bwd: true,
        soft_limit_bwd: -900.0,
        enable_soft_limit_fwd: true,
        soft_limit_fwd: 900.0,
        ..MonitorConfig::default()
    }
}

fn axis_config(i: usize) -> AxisConfig {
    AxisConfig {
        name: format!("ax{i}"),
        task_index: 1,
        positioning_velocity: 50.0,
        stop_deceleration: 1000.0,
        kff: 1.0,
        entries: Default::default(),
        monitor: reference_monitor(),
    }
}

fn bench_axis_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("axis_pass");
    group.significance_level(0.01);
    group.sample_size(500);

    for &n_axes in &[1, 4, 8, 16, 32, 64] {
        let configs: Vec<AxisConfig> = (0..n_axes).map(axis_config).collect();
        let mut builder = ProcessDataBuilder::new();
        for cfg in &configs {
            Axis::declare(cfg, &mut builder);
        }
        let data = builder.build();
        let mut axes: Vec<Axis> = configs
            .iter()
            .map(|cfg| Axis::new(cfg.clone(), data.clone(), SAMPLE_TIME).unwrap())
            .collect();
        let mut sim = SimFieldbus::new(SimConfig::default(), &configs, data, SAMPLE_TIME).unwrap();

        for axis in &axes {
            axis.link().set_enable(true);
        }
        let mut cycle = 0u64;

        group.bench_with_input(BenchmarkId::new("axes", n_axes), &n_axes, |b, &_n| {
            b.iter(|| {
                // Keep every axis moving back and forth between ±100.
                if cycle.is_multiple_of(4000) {
                    let target = if cycle.is_multiple_of(8000) { 100.0 } else { -100.0 };
                    for axis in &axes {
                        axis.link().move_to(target);
                    }
                }
                cycle += 1;
                let status = sim.exchange();
                for axis in &mut axes {
                    axis.execute(black_box(status.ok));
                }
            });
        });
    }

    group.finish();
}

fn bench_monitor(c: &mut Criterion) {
    let mut monitor = Monitor::new(MonitorConfig {
        enable_cntrl_high_limit: true,
        cntrl_output_high_limit: 400.0,
        enable_cntrl_increase_at_limit: true,
        cntrl_kff: 1.0,
        ..reference_monitor()
    });
    let mut t = 0.0f64;

    c.bench_function("monitor_evaluate", |b| {
        b.iter(|| {
            t += SAMPLE_TIME;
            let set_position = 100.0 * t.sin();
            let set_velocity = 100.0 * t.cos();
            let input = MonitorInput {
                enabled: true,
                actual_position: set_position - 0.05,
                actual_velocity: set_velocity * 0.99,
                target_position: 100.0,
                set_position,
                set_velocity,
                controller_output: set_velocity,
                dist_to_stop: set_velocity * set_velocity / 2000.0,
                ..MonitorInput::default()
            };
            black_box(monitor.evaluate(black_box(&input)))
        });
    });
}

fn bench_pvt_step(c: &mut Criterion) {
    let points = (0..=100u32).map(|i| {
        let t = f64::from(i) * 0.1;
        PvtPoint::new(10.0 * t.sin(), 10.0 * t.cos(), t)
    });
    let mut seq = PvtSequence::from_points(SAMPLE_TIME, points).unwrap();

    c.bench_function("pvt_next_sample_step", |b| {
        b.iter(|| {
            if !seq.next_sample_step() {
                seq.init_seq().unwrap();
            }
            black_box((seq.curr_position(), seq.curr_velocity()))
        });
    });
}

criterion_group!(benches, bench_axis_pass, bench_monitor, bench_pvt_step);
criterion_main!(benches);
