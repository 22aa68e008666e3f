//! Static HTML page for the daily digest.
//!
//! The converter only understands the Markdown that [`crate::digest`]
//! writes; it is not a general Markdown renderer.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

use crate::config::Config;
use crate::io::{archived_digest_path, combined_digest_path, date_stamp, index_html_path, write_text};

const ABSTRACT_LABEL: &str = "论文摘要";
const SUMMARY_LABEL: &str = "核心总结";

/// Where the converter is between lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Topic,
    TopicPaper,
    /// A paper opened before any topic heading.
    LoosePaper,
}

/// What a single trimmed Markdown line means to the converter.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Topic(&'a str),
    Paper(Option<(&'a str, &'a str)>),
    Summary { label: &'static str, value: &'a str },
    Meta { label: &'a str, value: &'a str },
    Other,
}

fn classify(line: &str) -> Line<'_> {
    if line.is_empty() {
        return Line::Blank;
    }
    if line.starts_with("# ") && !line.starts_with("## ") {
        return Line::Topic(&line[2..]);
    }
    if let Some(rest) = line.strip_prefix("## ") {
        return Line::Paper(parse_link(rest));
    }
    for label in [ABSTRACT_LABEL, SUMMARY_LABEL] {
        if let Some(value) = line
            .strip_prefix("**")
            .and_then(|l| l.strip_prefix(label))
            .and_then(|l| l.strip_prefix("**: "))
        {
            return Line::Summary { label, value };
        }
    }
    if line.starts_with("**") {
        if let Some((_, value)) = line.split_once("**: ") {
            let label = line[2..].split("**").next().unwrap_or("");
            return Line::Meta { label, value };
        }
    }
    Line::Other
}

/// Pull `title` and `url` out of `... [title](url) ...`.
fn parse_link(text: &str) -> Option<(&str, &str)> {
    let title_start = text.find('[')? + 1;
    let link_start = text.find("](")? + 2;
    let title = text[title_start..].split(']').next()?;
    let link = text[link_start..].split(')').next()?;
    Some((title, link))
}

struct HtmlBuilder {
    html: String,
    state: State,
}

impl HtmlBuilder {
    fn new(date: &str) -> Self {
        Self {
            html: page_head(date, PAGE_STYLE) + &format!("    <h1>arXiv 论文日报 - {}</h1>\n", date),
            state: State::Idle,
        }
    }

    fn close_paper(&mut self) {
        match self.state {
            State::TopicPaper => self.state = State::Topic,
            State::LoosePaper => self.state = State::Idle,
            State::Idle | State::Topic => return,
        }
        self.html.push_str("        </div>\n");
    }

    fn close_topic(&mut self) {
        self.close_paper();
        if self.state == State::Topic {
            self.html.push_str("    </div>\n");
            self.state = State::Idle;
        }
    }

    fn open_topic(&mut self, heading: &str) {
        self.close_topic();
        self.html.push_str("    <div class=\"topic-section\">\n");
        self.html
            .push_str(&format!("        <h2>{}</h2>\n", escape_html(heading)));
        self.state = State::Topic;
    }

    fn open_paper(&mut self, link: Option<(&str, &str)>) {
        self.close_paper();
        let Some((title, url)) = link else {
            return;
        };
        self.html.push_str("        <div class=\"paper-item\">\n");
        self.html.push_str(&format!(
            "            <div class=\"paper-title\"><a href=\"{}\" target=\"_blank\">{}</a></div>\n",
            escape_html(url),
            escape_html(title)
        ));
        self.state = match self.state {
            State::Topic => State::TopicPaper,
            _ => State::LoosePaper,
        };
    }

    fn field(&mut self, class: &str, label: &str, value: &str) {
        self.html.push_str(&format!(
            "            <div class=\"{}\"><strong>{}:</strong> {}</div>\n",
            class,
            escape_html(label),
            escape_html(value)
        ));
    }

    fn push_line(&mut self, line: &str) {
        match classify(line.trim()) {
            Line::Blank | Line::Other => {}
            Line::Topic(heading) => self.open_topic(heading),
            Line::Paper(link) => self.open_paper(link),
            Line::Summary { label, value } => self.field("paper-summary", label, value),
            Line::Meta { label, value } => self.field("paper-meta", label, value),
        }
    }

    fn finish(mut self) -> String {
        self.close_topic();
        self.html.push_str("</body>\n</html>\n");
        self.html
    }
}

/// Convert digest Markdown into a complete HTML document.
pub fn markdown_to_html(markdown: &str, date: NaiveDate) -> String {
    let mut builder = HtmlBuilder::new(&date_stamp(date));
    for line in markdown.lines() {
        builder.push_line(line);
    }
    builder.finish()
}

/// Page written when no digest exists for the day.
pub fn no_data_html(date: NaiveDate) -> String {
    page_head(&date_stamp(date), NO_DATA_STYLE)
        + "    <h1>暂无论文数据</h1>\n    <p>今日未抓取到符合条件的arXiv论文</p>\n</body>\n</html>\n"
}

#[derive(Debug)]
pub enum PageOutcome {
    NoData { index: PathBuf },
    Built { index: PathBuf, archive: PathBuf },
}

/// Render `out/index.html` from the day's combined digest.
pub fn build_page(config: &Config, date: NaiveDate) -> Result<PageOutcome> {
    let source = combined_digest_path(config, date);
    let index = index_html_path(config);

    if !source.exists() {
        tracing::info!(path = %source.display(), "no digest for today");
        write_text(&index, &no_data_html(date))?;
        return Ok(PageOutcome::NoData { index });
    }

    let markdown = fs::read_to_string(&source)
        .with_context(|| format!("Failed to read digest: {}", source.display()))?;

    let archive = archived_digest_path(config, date);
    write_text(&archive, &markdown)?;
    write_text(&index, &markdown_to_html(&markdown, date))?;

    Ok(PageOutcome::Built { index, archive })
}

fn page_head(date: &str, style: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"zh-CN\">\n\
         <head>\n    \
         <meta charset=\"UTF-8\">\n    \
         <title>arXiv 论文日报 {}</title>\n    \
         <style>\n{}    </style>\n\
         </head>\n\
         <body>\n",
        date, style
    )
}

const PAGE_STYLE: &str = "        body { font-family: Arial, sans-serif; max-width: 1200px; margin: 0 auto; padding: 20px; }
        h1 { color: #2c3e50; border-bottom: 2px solid #3498db; padding-bottom: 10px; }
        h2 { color: #3498db; margin-top: 30px; }
        p { line-height: 1.6; color: #34495e; }
        a { color: inherit; }
        .topic-section { margin: 40px 0; padding: 20px; background: #f8f9fa; border-radius: 8px; }
        .paper-item { margin: 20px 0; padding: 15px; border: 1px solid #e0e0e0; border-radius: 4px; }
        .paper-title { font-size: 18px; font-weight: bold; color: #2980b9; }
        .paper-meta { color: #7f8c8d; font-size: 14px; margin: 5px 0; }
        .paper-summary { margin: 10px 0; line-height: 1.5; }
";

const NO_DATA_STYLE: &str =
    "        body { font-family: Arial, sans-serif; text-align: center; padding: 50px; }\n";

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
