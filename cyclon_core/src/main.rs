//! # Cyclon Runner
//!
//! Loads `cyclon.toml` from the configuration directory, assembles the
//! system, starts the worker tasks and runs the master cycle against the
//! simulated fieldbus until Ctrl-C or the requested number of cycles.

use clap::Parser;
use cyclon_common::config::LogLevel;
use cyclon_core::config::{CyclonConfig, load_config_dir};
use cyclon_core::cycle::{MasterCycle, rt_setup};
use cyclon_core::publish::ParamValue;
use cyclon_core::pvt::PvtAxis;
use cyclon_core::sim::SimFieldbus;
use cyclon_core::system::System;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, error, info, trace};
use tracing_subscriber::EnvFilter;

/// Cyclon motion core runner
#[derive(Parser, Debug)]
#[command(name = "cyclon_core")]
#[command(version)]
#[command(about = "Multi-rate cyclic motion core on a simulated fieldbus")]
struct Args {
    /// Directory holding cyclon.toml.
    #[arg(long, value_name = "DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Stop after this many master cycles (0 = until Ctrl-C).
    #[arg(long, default_value_t = 0)]
    cycles: u64,

    /// Start the configured PVT sequence once the cycle is running.
    #[arg(long)]
    start_pvt: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,

    /// Enable verbose logging (at least DEBUG, overriding `shared.log_level`).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    // Loaded before tracing so the configured level applies from the first line.
    let config = load_config_dir(&args.config_dir);
    let log_level = config
        .as_ref()
        .map_or(LogLevel::default(), |c| c.shared.log_level);
    setup_tracing(&args, log_level);

    info!("Cyclon v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = match config {
        Ok(config) => run(&args, &config),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Cyclon shutdown complete");
}

fn run(args: &Args, config: &CyclonConfig) -> Result<(), Box<dyn std::error::Error>> {
    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }
    let System {
        mut scheduler,
        data,
        axes,
        groups,
        pvt,
        params,
        ..
    } = System::build(config)?;

    for axis in &axes {
        axis.set_enable(true);
    }
    if args.start_pvt {
        match &pvt {
            Some(handle) => handle.set_execute(true),
            None => info!("No PVT section configured, --start-pvt ignored"),
        }
    }

    scheduler.start()?;

    let master_cycle_s = f64::from(config.scheduler.master_cycle_us) * 1e-6;
    let fieldbus = SimFieldbus::new(config.sim.clone(), &config.axes, data, master_cycle_s)?;

    rt_setup(
        config.scheduler.master_affinity,
        config.scheduler.master_priority,
    )?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let sink = Box::new(|name: &str, value: ParamValue| {
        trace!(param = name, ?value, "Published");
    });
    let mut cycle = MasterCycle::new(scheduler, fieldbus, running).with_params(params, sink);
    let stats = cycle.run(args.cycles)?;

    for task in cycle.scheduler().report() {
        info!(
            task = task.index,
            name = %task.name,
            releases = task.releases,
            overruns = task.overruns,
            last_error = format_args!("{:#x}", task.last_error),
            exec_max_ns = task.exec_time_max_ns,
            "Task summary"
        );
    }
    for axis in &axes {
        info!(
            axis = axis.name(),
            position = axis.actual_position(),
            error = format_args!("{:#x}", axis.error_code()),
            "Axis summary"
        );
    }
    for group in &groups {
        info!(
            group = group.name(),
            enabled = group.enabled(),
            error = format_args!("{:#x}", group.any_error_code()),
            "Group summary"
        );
    }
    info!(
        cycles = stats.cycle_count,
        overruns = stats.overruns,
        "Run complete"
    );
    Ok(())
}

/// Setup tracing subscriber from the configured level and CLI arguments.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let level = Level::from(log_level.with_verbose(args.verbose));

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
