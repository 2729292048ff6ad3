use clap::Parser;
use tracing::{info, warn};

use mouldrust::api::{run_server, ApiState};
use mouldrust::{RecordingSink, Simulation, SimulationConfig, TallySink};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run in headless mode (HTTP API server ticking on a timer)
    #[arg(long)]
    headless: bool,

    /// Port for headless API server
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Configuration file path (YAML or JSON). If not specified, searches for config.yaml, config.yml, or config.json in current directory.
    #[arg(short, long)]
    config: Option<String>,

    /// Seed for the simulation RNG; overrides the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to run in batch mode
    #[arg(long, default_value_t = 500)]
    ticks: u64,

    /// Log a stats line every N ticks in batch mode
    #[arg(long, default_value_t = 50)]
    report_every: u64,

    /// Dump every place/remove notification as JSON lines after a batch run
    #[arg(long)]
    dump_events: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    if args.headless {
        let mut sim = Simulation::with_sink(config, TallySink::default())?;
        sim.reset()?;
        sim.start();
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(run_server(ApiState::new(sim), args.port))
    } else {
        batch_main(config, &args)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

/// Load configuration from file or use default
fn load_config(config_path: Option<&str>) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
    if let Some(path) = config_path {
        // User specified a config file
        SimulationConfig::from_file(path)
            .map_err(|e| format!("Failed to load config from {}: {}", path, e).into())
    } else {
        // Try default paths
        Ok(SimulationConfig::from_default_paths())
    }
}

/// Run a fixed number of ticks and log progress.
fn batch_main(config: SimulationConfig, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut sim = Simulation::with_sink(config, RecordingSink::new())?;
    let head = sim.reset()?;
    info!(%head, seed = sim.seed(), ticks = args.ticks, "starting batch run");
    sim.start();

    let report_every = args.report_every.max(1);
    for _ in 0..args.ticks {
        let Some(report) = sim.tick() else {
            break;
        };
        if report.tick % report_every == 0 {
            let stats = sim.stats();
            info!(
                tick = stats.tick,
                mould = stats.mould_cells,
                food = stats.food_cells,
                frontiers = stats.frontiers,
                max_reinforcement = stats.max_reinforcement,
                avg_saturation = stats.avg_saturation,
                "progress"
            );
        }
        if !args.dump_events {
            sim.sink_mut().clear();
        }
        if report.active_frontiers == 0 {
            warn!(tick = report.tick, "colony died out");
            break;
        }
    }

    let stats = sim.stats();
    info!(
        tick = stats.tick,
        mould = stats.mould_cells,
        food = stats.food_cells,
        remaining_food_energy = stats.remaining_food_energy,
        "batch run finished"
    );

    if args.dump_events {
        for event in &sim.sink().events {
            println!("{}", serde_json::to_string(event)?);
        }
    }
    Ok(())
}
