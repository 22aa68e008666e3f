//! Markdown digests: grouping papers by topic and rendering the per-topic
//! and combined documents.

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::config::Config;
use crate::io::{combined_digest_path, combined_json_path, date_stamp, load_papers, topic_digest_path, write_text};
use crate::models::Paper;
use crate::summarizer::{QwenSummarizer, SummaryAnnotation};

pub const AUTHORS_LIMIT: usize = 200;
pub const ABSTRACT_LIMIT: usize = 500;
/// Shown for a paper that has no annotation at all.
pub const NOT_GENERATED: &str = "未生成摘要";

/// Papers of one topic, in combined-collection order.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicDigest {
    pub topic: String,
    pub papers: Vec<Paper>,
}

/// Result of the summarize stage.
#[derive(Debug)]
pub enum SummarizeOutcome {
    /// No combined collection, or an empty one. Nothing was written.
    NoData,
    Written {
        papers: usize,
        topic_files: Vec<PathBuf>,
        combined_file: PathBuf,
    },
}

/// First `max` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Group by topic, keeping first-seen topic order and paper order within a topic.
pub fn group_by_topic(papers: &[Paper]) -> Vec<TopicDigest> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<TopicDigest> = Vec::new();

    for paper in papers {
        let slot = *index.entry(paper.topic.as_str()).or_insert_with(|| {
            groups.push(TopicDigest {
                topic: paper.topic.clone(),
                papers: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].papers.push(paper.clone());
    }

    groups
}

/// Generated text lookup by paper id.
pub struct Summaries(HashMap<String, String>);

impl Summaries {
    pub fn new(annotations: Vec<SummaryAnnotation>) -> Self {
        Self(
            annotations
                .into_iter()
                .map(|a| (a.paper_id, a.text))
                .collect(),
        )
    }

    fn get(&self, paper_id: &str) -> &str {
        self.0
            .get(paper_id)
            .map(String::as_str)
            .unwrap_or(NOT_GENERATED)
    }
}

fn push_paper_block(md: &mut String, index: usize, paper: &Paper, summaries: &Summaries) {
    let authors = paper.authors.join(", ");
    let _ = write!(
        md,
        "## {}. [{}]({})\n\
         **arXiv ID**: {}\n\
         **作者**: {}\n\
         **更新时间**: {}\n\
         **论文摘要**: {}\n\
         **核心总结**: {}\n\
         \n\
         ---\n",
        index,
        paper.title,
        paper.url,
        paper.id,
        truncate_chars(&authors, AUTHORS_LIMIT),
        paper.updated_display(),
        truncate_chars(&paper.summary, ABSTRACT_LIMIT),
        summaries.get(&paper.id),
    );
}

pub fn render_topic_markdown(digest: &TopicDigest, summaries: &Summaries, date: NaiveDate) -> String {
    let mut md = format!(
        "# arXiv 论文日报 - {} {}\n> 自动抓取并筛选 | 本组共 {} 篇论文\n---\n",
        digest.topic,
        date_stamp(date),
        digest.papers.len()
    );
    for (i, paper) in digest.papers.iter().enumerate() {
        push_paper_block(&mut md, i + 1, paper, summaries);
    }
    md
}

pub fn render_combined_markdown(digests: &[TopicDigest], summaries: &Summaries, date: NaiveDate) -> String {
    let total: usize = digests.iter().map(|d| d.papers.len()).sum();
    let mut md = format!(
        "# arXiv 论文日报 - 全主题汇总 {}\n> 自动抓取并筛选 | 共 {} 篇论文\n---\n",
        date_stamp(date),
        total
    );
    for digest in digests {
        let _ = write!(
            md,
            "# {}\n> 本组共 {} 篇论文\n---\n",
            digest.topic,
            digest.papers.len()
        );
        for (i, paper) in digest.papers.iter().enumerate() {
            push_paper_block(&mut md, i + 1, paper, summaries);
        }
    }
    md
}

/// Load the combined collection, summarize each paper once and write the
/// per-topic and combined Markdown for `date`.
pub async fn write_digests(config: &Config, date: NaiveDate) -> Result<SummarizeOutcome> {
    let papers = match load_papers(&combined_json_path(config))? {
        Some(papers) if !papers.is_empty() => papers,
        _ => return Ok(SummarizeOutcome::NoData),
    };

    let summarizer = QwenSummarizer::new(config)?;
    if !summarizer.has_credential() {
        tracing::warn!("QWEN_API_KEY not set; using placeholder summaries");
    }
    let summaries = Summaries::new(summarizer.summarize_papers(&papers).await);

    let digests = group_by_topic(&papers);
    let mut topic_files = Vec::with_capacity(digests.len());
    for digest in &digests {
        let path = topic_digest_path(config, &digest.topic, date);
        write_text(&path, &render_topic_markdown(digest, &summaries, date))?;
        tracing::info!(topic = %digest.topic, path = %path.display(), "topic digest written");
        topic_files.push(path);
    }

    let combined_file = combined_digest_path(config, date);
    write_text(&combined_file, &render_combined_markdown(&digests, &summaries, date))?;

    Ok(SummarizeOutcome::Written {
        papers: papers.len(),
        topic_files,
        combined_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::save_papers;
    use crate::summarizer::tests::paper;
    use crate::summarizer::MISSING_KEY_PLACEHOLDER;
    use std::fs;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 16).unwrap()
    }

    fn no_summaries() -> Summaries {
        Summaries::new(vec![])
    }

    fn field<'a>(md: &'a str, label: &str) -> Vec<&'a str> {
        let prefix = format!("**{}**: ", label);
        md.lines()
            .filter_map(|line| line.strip_prefix(prefix.as_str()))
            .collect()
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("论文摘要", 2), "论文");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_group_by_topic_preserves_orders() {
        let papers = vec![
            paper("1", "B", "s"),
            paper("2", "A", "s"),
            paper("3", "B", "s"),
            paper("4", "A", "s"),
            paper("5", "C", "s"),
        ];
        let groups = group_by_topic(&papers);

        let topics: Vec<&str> = groups.iter().map(|g| g.topic.as_str()).collect();
        assert_eq!(topics, vec!["B", "A", "C"]);
        let b_ids: Vec<&str> = groups[0].papers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(b_ids, vec!["1", "3"]);
    }

    #[test]
    fn test_topic_markdown_layout() {
        let digest = TopicDigest {
            topic: "Agents".to_string(),
            papers: vec![paper("2501.1v1", "Agents", "An abstract.")],
        };
        let summaries = Summaries::new(vec![SummaryAnnotation {
            paper_id: "2501.1v1".to_string(),
            text: "核心内容".to_string(),
        }]);

        let md = render_topic_markdown(&digest, &summaries, date());
        let expected = "# arXiv 论文日报 - Agents 2025-01-16\n\
                        > 自动抓取并筛选 | 本组共 1 篇论文\n\
                        ---\n\
                        ## 1. [Title 2501.1v1](http://arxiv.org/abs/2501.1v1)\n\
                        **arXiv ID**: 2501.1v1\n\
                        **作者**: Ada Lovelace, Alan Turing\n\
                        **更新时间**: 2025-01-02 03:04\n\
                        **论文摘要**: An abstract.\n\
                        **核心总结**: 核心内容\n\
                        \n\
                        ---\n";
        assert_eq!(md, expected);
    }

    #[test]
    fn test_combined_markdown_numbers_within_topic() {
        let papers = vec![
            paper("1", "A", "s"),
            paper("2", "B", "s"),
            paper("3", "A", "s"),
        ];
        let digests = group_by_topic(&papers);
        let md = render_combined_markdown(&digests, &no_summaries(), date());

        assert!(md.starts_with("# arXiv 论文日报 - 全主题汇总 2025-01-16\n> 自动抓取并筛选 | 共 3 篇论文\n---\n"));
        assert!(md.contains("# A\n> 本组共 2 篇论文\n---\n## 1. [Title 1]"));
        assert!(md.contains("## 2. [Title 3]"));
        assert!(md.contains("# B\n> 本组共 1 篇论文\n---\n## 1. [Title 2]"));
        assert!(md.find("# A\n").unwrap() < md.find("# B\n").unwrap());
    }

    #[test]
    fn test_truncated_fields() {
        let mut p = paper("1", "A", &"摘".repeat(900));
        p.authors = (0..80).map(|i| format!("Author Number {}", i)).collect();
        let digest = TopicDigest {
            topic: "A".to_string(),
            papers: vec![p],
        };
        let md = render_topic_markdown(&digest, &no_summaries(), date());

        let authors = field(&md, "作者");
        let abstracts = field(&md, "论文摘要");
        assert_eq!(authors[0].chars().count(), AUTHORS_LIMIT);
        assert_eq!(abstracts[0].chars().count(), ABSTRACT_LIMIT);
    }

    #[test]
    fn test_unannotated_paper_is_not_reported_as_missing_key() {
        let digest = TopicDigest {
            topic: "A".to_string(),
            papers: vec![paper("1", "A", "s"), paper("2", "A", "t")],
        };
        let summaries = Summaries::new(vec![SummaryAnnotation {
            paper_id: "1".to_string(),
            text: "总结".to_string(),
        }]);

        let md = render_topic_markdown(&digest, &summaries, date());
        assert_eq!(field(&md, "核心总结"), vec!["总结", NOT_GENERATED]);
        assert!(!md.contains(MISSING_KEY_PLACEHOLDER));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let papers = vec![paper("1", "A", "s"), paper("2", "B", "t")];
        let digests = group_by_topic(&papers);
        let first = render_combined_markdown(&digests, &no_summaries(), date());
        let second = render_combined_markdown(&group_by_topic(&papers), &no_summaries(), date());
        assert_eq!(first, second);
        assert_eq!(
            render_topic_markdown(&digests[0], &no_summaries(), date()),
            render_topic_markdown(&digests[0], &no_summaries(), date())
        );
    }

    #[tokio::test]
    async fn test_write_digests_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_base_dir(dir.path()).unwrap();

        let outcome = write_digests(&config, date()).await.unwrap();
        assert!(matches!(outcome, SummarizeOutcome::NoData));

        save_papers(&combined_json_path(&config), &[]).unwrap();
        let outcome = write_digests(&config, date()).await.unwrap();
        assert!(matches!(outcome, SummarizeOutcome::NoData));
        assert!(!combined_digest_path(&config, date()).exists());
    }

    #[tokio::test]
    async fn test_write_digests_without_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_base_dir(dir.path()).unwrap();
        config.qwen_api_url = server.uri();
        save_papers(
            &combined_json_path(&config),
            &[paper("1", "LLM Agents", "s"), paper("2", "Vision", "t")],
        )
        .unwrap();

        let outcome = write_digests(&config, date()).await.unwrap();
        let SummarizeOutcome::Written { papers, topic_files, combined_file } = outcome else {
            panic!("expected digests to be written");
        };
        assert_eq!(papers, 2);
        assert_eq!(topic_files.len(), 2);
        assert!(topic_files[0].ends_with("digest_LLM_Agents_2025-01-16.md"));

        let combined = fs::read_to_string(combined_file).unwrap();
        let summaries = field(&combined, "核心总结");
        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| *s == MISSING_KEY_PLACEHOLDER));
    }

    #[tokio::test]
    async fn test_write_digests_summarizes_each_paper_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "output": {"text": "总结"}
            })))
            .expect(3)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_base_dir(dir.path()).unwrap();
        config.qwen_api_url = server.uri();
        config.qwen_api_key = Some("k".to_string());
        save_papers(
            &combined_json_path(&config),
            &[paper("1", "A", "s"), paper("2", "B", "t"), paper("3", "A", "u")],
        )
        .unwrap();

        write_digests(&config, date()).await.unwrap();

        let topic_a = fs::read_to_string(topic_digest_path(&config, "A", date())).unwrap();
        assert_eq!(field(&topic_a, "核心总结"), vec!["总结", "总结"]);
        server.verify().await;
    }
}
