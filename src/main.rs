use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use gridtown::{
    logging,
    render::RecordingRenderer,
    scenario::ScenarioLoader,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Grid city growth simulation")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/greenfield.yaml")]
    scenario: PathBuf,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Serve the JSON/SSE API instead of running headless
    #[arg(long)]
    serve: bool,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let mut scenario = loader.load(&cli.scenario)?;
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }
    logging::init(&scenario.logging.level);

    let ticks = scenario.ticks(cli.ticks);
    if cli.serve {
        return web::run(WebServerConfig {
            scenario,
            ticks: Some(ticks),
            host: cli.host,
            port: cli.port,
        })
        .await;
    }

    let mut engine = scenario
        .build_engine(RecordingRenderer::new(scenario.grid_size))
        .context("Failed to build engine from scenario")?;
    let total = engine.run(ticks);

    let tallest = engine
        .grid()
        .tiles()
        .filter_map(|tile| tile.building.as_ref().map(|b| b.height))
        .max()
        .unwrap_or(0);
    info!(
        scenario = %scenario.name,
        ticks,
        buildings = engine.grid().building_count(),
        visuals = engine.renderer().live_count(),
        creates = total.creates(),
        removes = total.removes(),
        failures = total.failures.len(),
        tallest,
        "run complete"
    );
    println!(
        "Scenario '{}' completed for {} ticks. Buildings: {}, tallest: {}",
        scenario.name,
        ticks,
        engine.grid().building_count(),
        tallest
    );
    engine.shutdown();
    Ok(())
}
