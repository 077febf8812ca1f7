use anyhow::{Context, Result};
use car_harvester_lib::infrastructure::{ConfigManager, csv_export, init_logging_with_config};
use car_harvester_lib::{ScrapePipeline, ScrapeRequest};
use chrono::Local;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(name = "car-harvester", about = "Harvest vehicle listings from paginated search results")]
struct Cli {
    /// Region (state) to search; empty searches all regions
    #[arg(short, long, default_value = "")]
    region: String,

    /// Brand slug; empty or "none" searches every brand
    #[arg(short, long, default_value = "")]
    brand: String,

    /// First search-result page
    #[arg(short, long, default_value_t = 1)]
    start: u32,

    /// Last search-result page (inclusive)
    #[arg(short, long, default_value_t = 1)]
    end: u32,

    /// Listings a complete page is expected to contain
    #[arg(long)]
    expected_per_page: Option<usize>,

    /// Config file (TOML, JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the CSV export
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Print records as JSON lines instead of writing CSV
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let app_config = ConfigManager::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging_with_config(&app_config.logging)?;

    let t0 = Instant::now();
    let request = ScrapeRequest::new(&cli.region, &cli.brand, cli.start, cli.end).with_expected_per_page(
        cli.expected_per_page
            .unwrap_or(app_config.crawling.expected_listings_per_page),
    );

    let pipeline = ScrapePipeline::from_config(&app_config)?;
    let (records, summary) = pipeline.run_with_summary(&request).await?;

    if cli.json {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for record in &records {
            serde_json::to_writer(&mut out, record)?;
            writeln!(out)?;
        }
    } else {
        let file_name =
            csv_export::export_file_name(&cli.brand, &cli.region, cli.start, cli.end, Local::now());
        let path = csv_export::export_to_dir(&cli.output_dir, &file_name, &records)?;
        println!("Saved {} records to {}", records.len(), path.display());
    }

    info!(
        elapsed_secs = t0.elapsed().as_secs(),
        extracted = summary.details_extracted,
        skipped = summary.details_skipped,
        "Done"
    );
    Ok(())
}
