//! Debug script to print the biome layout around the origin as ASCII

use clap::Parser;
use tracing_subscriber::EnvFilter;

use proxima::ascii::{biome_char, biome_legend, calculate_biome_stats, render_viewport, AsciiMode, Overlay};
use proxima::biomes::Biome;
use proxima::config::SimConfig;
use proxima::world::{TilePos, World};

#[derive(Parser, Debug)]
#[command(name = "debug_biomes")]
#[command(about = "Print an ASCII biome map and band histogram for a seed")]
struct Args {
    #[arg(short, long, default_value = "12345")]
    seed: u64,

    /// JSON config file for band layout and noise settings
    #[arg(short, long)]
    config: Option<String>,

    /// Chunks loaded around the origin
    #[arg(short, long, default_value = "3")]
    radius: i32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };
    config.world.noise.seed = args.seed;
    let size = config.world.chunk_size as i32;

    let mut world = World::new(config)?;
    let radius = args.radius.max(0);
    world.load_chunks_around(0.0, 0.0, radius);

    let min = TilePos::new(-radius * size, -radius * size);
    let max = TilePos::new((radius + 1) * size - 1, (radius + 1) * size - 1);

    println!("=== BIOME DEBUG MAP seed={} chunks={} ===", args.seed, world.loaded_count());
    println!("{}", biome_legend());
    println!("{}", render_viewport(&world, min, max, AsciiMode::Biome, Overlay::default()));

    let stats = calculate_biome_stats(&world, min, max);
    let total: usize = stats.values().sum();
    println!("=== BIOME DISTRIBUTION ===");
    for biome in Biome::all() {
        let count = stats.get(biome).copied().unwrap_or(0);
        let pct = if total > 0 { 100.0 * count as f64 / total as f64 } else { 0.0 };
        let bar = "#".repeat((pct / 2.0).round() as usize);
        println!("{} {:<10} {:>6} ({:>5.1}%) {}", biome_char(biome), biome.name(), count, pct, bar);
    }

    println!("=== BANDS ===");
    for band in world.classifier().bands() {
        println!("{:<10} [{:+.2}, {:+.2})", band.biome.name(), band.min_noise, band.max_noise);
    }
    println!("transition zone: {}", world.classifier().transition());
    Ok(())
}
