use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";
pub const DEFAULT_QWEN_API_URL: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation";
pub const DEFAULT_QWEN_MODEL: &str = "qwen-turbo";

/// Settings shared by every pipeline stage, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute root that `data/`, `out/` and `topics.yml` hang off.
    pub base_dir: PathBuf,
    pub topics_path: PathBuf,
    pub arxiv_api_url: String,
    pub arxiv_request_delay: Duration,
    pub qwen_api_key: Option<String>,
    pub qwen_api_url: String,
    pub qwen_model: String,
    pub summary_timeout: Duration,
    pub summary_concurrency: usize,
}

impl Config {
    pub fn from_env(base_dir: Option<PathBuf>) -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        let base_dir = match base_dir.or_else(|| env::var_os("ARXIV_DIGEST_HOME").map(PathBuf::from)) {
            Some(dir) => dir,
            None => env::current_dir().context("Could not determine current directory")?,
        };
        let mut config = Self::with_base_dir(base_dir)?;

        config.qwen_api_key = env::var("QWEN_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        if let Ok(url) = env::var("ARXIV_API_URL") {
            config.arxiv_api_url = url;
        }
        if let Ok(url) = env::var("QWEN_API_URL") {
            config.qwen_api_url = url;
        }
        if let Ok(model) = env::var("QWEN_MODEL") {
            config.qwen_model = model;
        }
        if let Ok(raw) = env::var("SUMMARY_CONCURRENCY") {
            let n: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("SUMMARY_CONCURRENCY must be a positive integer, got {raw:?}"))?;
            config.summary_concurrency = n.max(1);
        }
        if let Ok(raw) = env::var("ARXIV_REQUEST_DELAY_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("ARXIV_REQUEST_DELAY_SECS must be an integer, got {raw:?}"))?;
            config.arxiv_request_delay = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Defaults rooted at `base_dir`, without consulting the environment.
    pub fn with_base_dir(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = std::path::absolute(base_dir.as_ref()).with_context(|| {
            format!("Could not resolve base directory {}", base_dir.as_ref().display())
        })?;

        Ok(Self {
            topics_path: base_dir.join("topics.yml"),
            base_dir,
            arxiv_api_url: DEFAULT_ARXIV_API_URL.to_string(),
            arxiv_request_delay: Duration::from_secs(3),
            qwen_api_key: None,
            qwen_api_url: DEFAULT_QWEN_API_URL.to_string(),
            qwen_model: DEFAULT_QWEN_MODEL.to_string(),
            summary_timeout: Duration::from_secs(15),
            summary_concurrency: 2,
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.base_dir.join("out")
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/arxiv-digest/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("arxiv-digest").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}
