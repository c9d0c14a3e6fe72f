use std::cell::Cell;
use std::rc::Rc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kairos::{
    install, ContextId, KernelResult, PeriodicSource, PeriodicSourceConfig, SimDuration, Simulation,
    SimulationConfig, SimulationContext, VirtualTime,
};

/// Sources on nodes 1..=N send packets to a sink on node 0.
#[derive(Parser)]
#[command(name = "kairos-demo")]
#[command(about = "Run a small traffic scenario on the kairos simulation kernel")]
#[command(version)]
struct Cli {
    /// Number of periodic sources
    #[arg(long, default_value = "3")]
    sources: u32,

    /// Gap between packets from one source, in milliseconds
    #[arg(
        long = "interval-ms",
        default_value = "100",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval_ms: u64,

    /// Packets per source (unbounded if omitted)
    #[arg(long)]
    packets: Option<u64>,

    /// Stop the simulation at this virtual time, in seconds
    #[arg(long = "stop-secs", default_value = "10")]
    stop_secs: u64,

    /// Pace virtual time against the wall clock at this speed
    #[arg(long)]
    realtime: Option<f64>,
}

/// Per-hop latency from source `n` to the sink.
fn link_delay(node: u32) -> SimDuration {
    SimDuration::from_millis(2 + i64::from(node))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = SimulationConfig::new().with_trace();
    if let Some(speed) = cli.realtime {
        config = config.with_realtime(speed);
    }
    let mut sim = Simulation::with_config(config);

    let sink = ContextId::new(0);
    let received = Rc::new(Cell::new(0u64));

    let interval = SimDuration::from_millis(i64::try_from(cli.interval_ms).unwrap_or(i64::MAX));
    let mut source_config = PeriodicSourceConfig::new(interval)?;
    if let Some(packets) = cli.packets {
        source_config = source_config.with_max_packets(packets);
    }

    let stop = VirtualTime::from_secs(cli.stop_secs);
    let mut handles = Vec::new();
    for n in 1..=cli.sources {
        let received = Rc::clone(&received);
        let source = PeriodicSource::new(
            source_config,
            Box::new(move |ctx: &mut SimulationContext<'_>, _seq: u64| -> KernelResult<()> {
                let received = Rc::clone(&received);
                let deliver = move |_ctx: &mut SimulationContext<'_>| {
                    received.set(received.get() + 1);
                };
                ctx.schedule_with_context(sink, link_delay(n), deliver)?;
                Ok(())
            }),
        );
        // Stagger start times so sources do not fire in lockstep.
        let start = VirtualTime::from_millis(u64::from(n));
        handles.push(install(&mut sim, ContextId::new(n), source, start, Some(stop))?);
    }

    sim.schedule_destroy(|ctx: &mut SimulationContext<'_>| {
        info!(now = %ctx.now(), "simulation torn down");
    })?;
    sim.stop_at(stop)?;

    let summary = sim.run()?;

    let sent: u64 = handles.iter().map(|h| h.borrow().sent()).sum();
    println!("halted:      {:?} at {}", summary.reason, summary.final_time);
    println!("events:      {} fired, {} discarded", summary.events_fired, summary.events_discarded);
    println!("packets:     {} sent, {} received", sent, received.get());
    println!("trace hash:  {:016x}", sim.trace().trace_hash());

    sim.destroy()?;
    Ok(())
}
