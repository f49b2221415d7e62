use anyhow::Result;
use clap::Parser;
use log::info;

use city_paths::simulation::{SimConfig, SimWorld};

#[derive(Parser)]
#[command(name = "city_paths")]
#[command(about = "Headless agent path-following simulation on a grid city")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "600")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Number of vehicles
    #[arg(long, default_value = "6")]
    vehicles: usize,

    /// Number of pedestrians
    #[arg(long, default_value = "4")]
    pedestrians: usize,

    /// Path nodes shared by all agents
    #[arg(long, default_value = "512")]
    pool_capacity: usize,

    /// Junctions per side of the grid
    #[arg(long, default_value = "3")]
    grid: usize,

    /// Only print the final state
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    fn config(&self) -> SimConfig {
        SimConfig {
            grid: self.grid,
            vehicles: self.vehicles,
            pedestrians: self.pedestrians,
            pool_capacity: self.pool_capacity,
            seed: self.seed,
            ..SimConfig::default()
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,city_paths=info"),
    )
    .init();

    let cli = Cli::parse();
    run_headless(&cli)
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli) -> Result<()> {
    println!("Running city paths simulation in headless mode...");
    println!("Ticks: {}, Delta: {}s", cli.ticks, cli.delta);

    // Print a snapshot once per simulated second
    let ticks_per_second = ((1.0 / cli.delta).ceil() as u32).max(1);
    println!();

    let mut world = SimWorld::create_test_world(&cli.config())?;

    if !cli.quiet {
        println!("Initial state:");
        world.print_summary();
        world.draw_map();
        println!();
    }

    let mut tick = 0;
    while tick < cli.ticks {
        let ticks_to_run = ticks_per_second.min(cli.ticks - tick);

        for _ in 0..ticks_to_run {
            tick += 1;
            world.tick(cli.delta);
        }

        if !cli.quiet {
            println!(
                "--- After tick {} ({:.1}s simulated time) ---",
                tick,
                tick as f32 * cli.delta
            );
            world.print_summary();
            println!();
        }
    }

    println!("=== Final State ===");
    world.print_summary();
    world.draw_map();

    let stats = world.stats();
    info!("SIMULATION COMPLETE");
    info!("Agents: {}", world.agents.len());
    info!("Paths built: {}", stats.paths_built);
    info!("Arrivals: {}", stats.arrivals);
    info!("Path failures: {}", stats.failures());
    info!(
        "Pool nodes in use: {}/{}",
        stats.nodes_in_use, stats.pool_capacity
    );
    Ok(())
}
