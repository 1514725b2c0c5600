use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use proxima::ascii::{self, AsciiMode, Overlay};
use proxima::config::SimConfig;
use proxima::simulation::Simulation;
use proxima::world::{ChunkStorage, TilePos};

#[derive(Parser, Debug)]
#[command(name = "proxima")]
#[command(about = "Run a headless agent simulation on a procedural chunked world")]
struct Args {
    /// Random seed (overrides the config file; random if neither sets one)
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON config file; missing fields take their defaults
    #[arg(short, long)]
    config: Option<String>,

    /// Number of agents to spawn
    #[arg(short, long, default_value = "5")]
    agents: usize,

    /// Ticks to simulate
    #[arg(short, long, default_value = "1000")]
    ticks: u64,

    /// Seconds per tick
    #[arg(long, default_value = "0.1")]
    dt: f32,

    /// Log progress every N ticks (0 disables)
    #[arg(long, default_value = "100")]
    report_every: u64,

    /// Save loaded chunks to this JSON file at the end
    #[arg(long)]
    save: Option<String>,

    /// Print the area around the first agent at the end
    #[arg(long)]
    ascii: bool,

    /// Half-width of the printed area, in tiles
    #[arg(long, default_value = "24")]
    ascii_radius: i32,

    /// Color the printed map with ANSI escapes
    #[arg(long)]
    color: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.world.noise.seed = seed;
    } else if args.config.is_none() {
        config.world.noise.seed = rand::random();
    }
    info!(seed = config.world.noise.seed, chunk_size = config.world.chunk_size, "starting");

    let mut sim = Simulation::new(config)?;
    let spawned = sim.spawn_agents(args.agents);
    info!(agents = spawned.len(), "agents placed");

    sim.run(args.ticks, args.dt, args.report_every);
    info!("{}", sim.summary());

    if let Some(path) = &args.save {
        let storage = ChunkStorage::new(path);
        let saved = sim.world().save_chunks(&storage)?;
        info!(chunks = saved, path = %path, "world saved");
    }

    if args.ascii {
        let agents = sim.agents();
        let center = agents.first().map_or(TilePos::new(0, 0), |(_, a)| a.position.tile());
        let r = args.ascii_radius.max(1);
        let min = center.offset(-r, -r / 2);
        let max = center.offset(r, r / 2);
        let overlay = Overlay { entities: true, focus: agents.first().map(|(_, a)| *a) };
        let mut map = ascii::render_viewport(sim.world(), min, max, AsciiMode::Biome, overlay);
        if args.color {
            map = ascii::colorize(sim.world(), &map);
        }
        println!("{}", map);
        println!("{}", ascii::biome_legend());
        if let Some((id, agent)) = agents.first() {
            println!("{} {}", id, serde_json::to_string_pretty(&agent.debug_snapshot())?);
        }
    }

    Ok(())
}
