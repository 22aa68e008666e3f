use anyhow::{Context, Result};
use std::collections::HashSet;

use crate::arxiv::{ArxivClient, ArxivEntry};
use crate::config::Config;
use crate::io::{combined_json_path, save_papers, topic_json_path};
use crate::models::Paper;
use crate::topics::TopicProfile;

#[derive(Debug, Clone, PartialEq)]
pub enum TopicOutcome {
    Fetched { kept: usize, excluded: usize },
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct TopicReport {
    pub topic: String,
    pub outcome: TopicOutcome,
}

#[derive(Debug, Clone)]
pub struct FetchReport {
    pub topics: Vec<TopicReport>,
    pub combined_count: usize,
}

impl FetchReport {
    pub fn failed(&self) -> impl Iterator<Item = &TopicReport> {
        self.topics
            .iter()
            .filter(|t| matches!(t.outcome, TopicOutcome::Failed(_)))
    }

    pub fn all_failed(&self) -> bool {
        !self.topics.is_empty() && self.failed().count() == self.topics.len()
    }
}

/// Drop entries matching an exclude keyword; returns kept papers and the drop count.
pub fn filter_excluded(profile: &TopicProfile, entries: Vec<ArxivEntry>) -> (Vec<Paper>, usize) {
    let total = entries.len();
    let kept: Vec<Paper> = entries
        .into_iter()
        .map(|entry| entry.into_paper(&profile.name))
        .filter(|paper| !profile.excludes(&paper.title, &paper.summary))
        .collect();
    let excluded = total - kept.len();
    (kept, excluded)
}

/// Deduplicate by id, keeping the first occurrence, then order by last update, newest first.
///
/// The sort is stable, so papers with equal timestamps stay in first-seen order.
pub fn merge_unique(papers: Vec<Paper>) -> Vec<Paper> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Paper> = papers
        .into_iter()
        .filter(|paper| seen.insert(paper.id.clone()))
        .collect();
    unique.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    unique
}

pub struct Fetcher<'a> {
    config: &'a Config,
    client: ArxivClient,
}

impl<'a> Fetcher<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        let client = ArxivClient::new(config.arxiv_api_url.clone(), config.arxiv_request_delay)?;
        Ok(Self { config, client })
    }

    async fn fetch_topic(&self, profile: &TopicProfile) -> Result<(Vec<Paper>, usize)> {
        let query = profile.search_query();
        tracing::info!(topic = %profile.name, %query, max = profile.max_results, "fetching topic");

        let entries = self
            .client
            .search(&query, profile.max_results)
            .await
            .with_context(|| format!("Failed to fetch topic '{}'", profile.name))?;

        let (papers, excluded) = filter_excluded(profile, entries);
        save_papers(&topic_json_path(self.config, &profile.name), &papers)?;
        Ok((papers, excluded))
    }

    /// Fetch every topic in order. A failing topic is recorded in the report
    /// and leaves its own file unwritten; the others still run.
    pub async fn run(&self, profiles: &[TopicProfile]) -> Result<FetchReport> {
        let mut all_papers = Vec::new();
        let mut reports = Vec::with_capacity(profiles.len());

        for (index, profile) in profiles.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.arxiv_request_delay).await;
            }

            let outcome = match self.fetch_topic(profile).await {
                Ok((papers, excluded)) => {
                    let kept = papers.len();
                    all_papers.extend(papers);
                    TopicOutcome::Fetched { kept, excluded }
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    tracing::warn!(topic = %profile.name, error = %message, "topic fetch failed");
                    TopicOutcome::Failed(message)
                }
            };

            reports.push(TopicReport {
                topic: profile.name.clone(),
                outcome,
            });
        }

        let combined = merge_unique(all_papers);
        save_papers(&combined_json_path(self.config), &combined)?;

        Ok(FetchReport {
            topics: reports,
            combined_count: combined.len(),
        })
    }
}
