use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;
use shared::{write_digests, Config, SummarizeOutcome};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "summarize-papers")]
#[command(about = "Summarize fetched papers and render the daily Markdown digests")]
struct Args {
    /// Root directory holding data/ and out/
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Digest date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    shared::logging::init();

    let config = Config::from_env(args.base_dir)?;
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());

    if config.qwen_api_key.is_some() {
        println!("🤖 Summarizing papers with {}...", config.qwen_model);
    } else {
        println!("⚠ QWEN_API_KEY not set; summaries will use a placeholder");
    }

    match write_digests(&config, date).await? {
        SummarizeOutcome::NoData => {
            println!("No paper data found in {}; skipping digest", config.data_dir().display());
        }
        SummarizeOutcome::Written {
            papers,
            topic_files,
            combined_file,
        } => {
            for path in &topic_files {
                println!("  ✓ {}", path.display());
            }
            println!(
                "\n✅ Digest of {} papers across {} topics saved to: {}",
                papers,
                topic_files.len(),
                combined_file.display()
            );
        }
    }

    Ok(())
}
