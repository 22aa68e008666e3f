use anyhow::{Context, Result};
use clap::Parser;
use shared::{load_topics, Config, Fetcher, TopicOutcome};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fetch-papers")]
#[command(about = "Fetch recent arXiv papers for every configured topic")]
struct Args {
    /// Root directory holding topics.yml, data/ and out/
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Topic configuration to use instead of <base-dir>/topics.yml
    #[arg(long)]
    topics: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    shared::logging::init();

    let mut config = Config::from_env(args.base_dir)?;
    if let Some(topics) = args.topics {
        config.topics_path = std::path::absolute(&topics)
            .with_context(|| format!("Could not resolve {}", topics.display()))?;
    }

    println!("📋 Reading topics from {}", config.topics_path.display());
    let profiles = load_topics(&config.topics_path)?;
    println!("✓ Loaded {} topics", profiles.len());

    println!("\n📚 Fetching papers from arXiv...");
    let report = Fetcher::new(&config)?.run(&profiles).await?;

    for topic in &report.topics {
        match &topic.outcome {
            TopicOutcome::Fetched { kept, excluded } => {
                println!("  ✓ {}: {} papers ({} excluded)", topic.topic, kept, excluded)
            }
            TopicOutcome::Failed(e) => println!("  ✗ {}: {}", topic.topic, e),
        }
    }

    let failed = report.failed().count();
    if failed > 0 {
        println!("\n⚠ {} of {} topics failed; their files were not written", failed, report.topics.len());
    }

    if report.all_failed() {
        anyhow::bail!("Every topic failed to fetch");
    }

    println!(
        "\n✅ Saved {} unique papers to {}",
        report.combined_count,
        shared::io::combined_json_path(&config).display()
    );

    Ok(())
}
