use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::models::Paper;
use crate::topics::topic_slug;

pub const COMBINED_JSON: &str = "arxiv_all.json";
pub const INDEX_HTML: &str = "index.html";

/// Format a run date the way every dated artifact name embeds it.
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn topic_json_path(config: &Config, topic: &str) -> PathBuf {
    config.data_dir().join(format!("arxiv_{}.json", topic_slug(topic)))
}

pub fn combined_json_path(config: &Config) -> PathBuf {
    config.data_dir().join(COMBINED_JSON)
}

pub fn topic_digest_path(config: &Config, topic: &str, date: NaiveDate) -> PathBuf {
    config
        .data_dir()
        .join(format!("digest_{}_{}.md", topic_slug(topic), date_stamp(date)))
}

pub fn combined_digest_path(config: &Config, date: NaiveDate) -> PathBuf {
    config.data_dir().join(format!("digest_{}.md", date_stamp(date)))
}

pub fn archived_digest_path(config: &Config, date: NaiveDate) -> PathBuf {
    config.out_dir().join(format!("digest_{}.md", date_stamp(date)))
}

pub fn index_html_path(config: &Config) -> PathBuf {
    config.out_dir().join(INDEX_HTML)
}

/// Write a text artifact, creating its parent directory first.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Save papers as a pretty-printed JSON array
pub fn save_papers(path: &Path, papers: &[Paper]) -> Result<()> {
    let json = serde_json::to_string_pretty(papers).context("Failed to serialize papers")?;
    write_text(path, &json)
}

/// Load a paper array; `Ok(None)` when the file does not exist.
pub fn load_papers(path: &Path) -> Result<Option<Vec<Paper>>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read paper file: {}", path.display()))?;

    let papers: Vec<Paper> = serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse paper JSON from {}. Re-run fetch-papers to regenerate it.",
            path.display()
        )
    })?;

    Ok(Some(papers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample() -> Paper {
        Paper {
            title: "论文".to_string(),
            authors: vec!["Zhang San".to_string()],
            id: "2501.00001v1".to_string(),
            url: "http://arxiv.org/abs/2501.00001v1".to_string(),
            summary: "摘要".to_string(),
            published_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
            topic: "Topic A".to_string(),
            raw_categories: vec![],
        }
    }

    #[test]
    fn test_artifact_names() {
        let config = Config::with_base_dir("/srv/digest").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(
            topic_json_path(&config, "LLM Agents"),
            PathBuf::from("/srv/digest/data/arxiv_LLM_Agents.json")
        );
        assert_eq!(
            topic_digest_path(&config, "LLM Agents", date),
            PathBuf::from("/srv/digest/data/digest_LLM_Agents_2025-03-07.md")
        );
        assert_eq!(
            combined_digest_path(&config, date),
            PathBuf::from("/srv/digest/data/digest_2025-03-07.md")
        );
        assert_eq!(
            archived_digest_path(&config, date),
            PathBuf::from("/srv/digest/out/digest_2025-03-07.md")
        );
        assert_eq!(index_html_path(&config), PathBuf::from("/srv/digest/out/index.html"));
    }

    #[test]
    fn test_save_keeps_non_ascii_and_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("papers.json");
        save_papers(&path, &[sample()]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("论文"));

        let loaded = load_papers(&path).unwrap().unwrap();
        assert_eq!(loaded, vec![sample()]);
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_papers(&dir.path().join("missing.json")).unwrap().is_none());
    }

    #[test]
    fn test_load_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(load_papers(&path).is_err());
    }
}
