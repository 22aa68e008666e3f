use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::config::Config;
use crate::digest::{truncate_chars, ABSTRACT_LIMIT};
use crate::models::Paper;

pub const MISSING_KEY_PLACEHOLDER: &str = "未配置通义千问API_KEY，跳过摘要生成";
const FAILURE_PREFIX: &str = "摘要生成失败: ";
const FAILURE_DETAIL_LIMIT: usize = 50;

/// Generated text for one paper.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryAnnotation {
    pub paper_id: String,
    pub text: String,
}

#[derive(Serialize)]
struct GenerationRequest {
    model: String,
    input: Input,
    parameters: Parameters,
}

#[derive(Serialize)]
struct Input {
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct Parameters {
    result_format: String,
}

#[derive(Deserialize)]
struct GenerationResponse {
    output: Output,
}

#[derive(Deserialize)]
struct Output {
    text: String,
}

pub struct QwenSummarizer {
    client: Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
    concurrency: usize,
}

impl QwenSummarizer {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.summary_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: config.qwen_api_key.clone(),
            api_url: config.qwen_api_url.clone(),
            model: config.qwen_model.clone(),
            concurrency: config.summary_concurrency.max(1),
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Summarize an abstract. Never fails: a missing key or a failed call
    /// yields placeholder text instead.
    pub async fn summarize(&self, abstract_text: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return MISSING_KEY_PLACEHOLDER.to_string();
        };

        let text = truncate_chars(abstract_text, ABSTRACT_LIMIT);
        match self.try_summarize(api_key, text).await {
            Ok(summary) => summary,
            Err(e) => {
                let detail = single_line(&format!("{:#}", e));
                tracing::warn!(error = %detail, "summary generation failed");
                format!("{}{}", FAILURE_PREFIX, truncate_chars(&detail, FAILURE_DETAIL_LIMIT))
            }
        }
    }

    async fn try_summarize(&self, api_key: &str, text: &str) -> Result<String> {
        let request = GenerationRequest {
            model: self.model.clone(),
            input: Input {
                messages: vec![Message {
                    role: "user".to_string(),
                    content: prompt(text),
                }],
            },
            parameters: Parameters {
                result_format: "text".to_string(),
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to DashScope")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("DashScope API error {}: {}", status, error_text);
        }

        let generation = response
            .json::<GenerationResponse>()
            .await
            .context("Failed to parse DashScope response")?;

        Ok(single_line(&generation.output.text))
    }

    /// Summarize every paper once. At most `concurrency` calls are in
    /// flight; results come back in input order.
    pub async fn summarize_papers(&self, papers: &[Paper]) -> Vec<SummaryAnnotation> {
        let annotations: Vec<SummaryAnnotation> = stream::iter(papers)
            .map(|paper| async move {
                let text = self.summarize(&paper.summary).await;
                // Print progress dot
                eprint!(".");
                let _ = std::io::stderr().flush();
                SummaryAnnotation {
                    paper_id: paper.id.clone(),
                    text,
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;
        eprintln!(); // Newline after dots
        annotations
    }
}

/// Markdown fields are single lines
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn prompt(text: &str) -> String {
    format!("请用简洁的中文总结这篇论文的核心创新点和研究内容，100字以内：{}", text)
}
