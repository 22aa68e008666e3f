use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;
use shared::{build_page, Config, PageOutcome};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "build-page")]
#[command(about = "Render the day's Markdown digest as out/index.html")]
struct Args {
    /// Root directory holding data/ and out/
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Digest date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    shared::logging::init();

    let config = Config::from_env(args.base_dir)?;
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());

    println!("📝 Building page for {}...", date.format("%Y-%m-%d"));
    match build_page(&config, date)? {
        PageOutcome::NoData { index } => {
            println!("⚠ No digest found for today; wrote empty page to {}", index.display());
        }
        PageOutcome::Built { index, archive } => {
            println!("✓ Digest archived to: {}", archive.display());
            println!("\n✅ Page saved to: {}", index.display());
        }
    }

    Ok(())
}
