use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// A named filter profile from `topics.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicProfile {
    pub name: String,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(rename = "max", default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    10
}

impl TopicProfile {
    /// Build the arXiv `search_query` expression for this profile.
    ///
    /// Every category and every include keyword becomes its own clause and
    /// all clauses are joined with `AND`, so adding keywords narrows the
    /// result set. A profile with no clauses matches everything.
    pub fn search_query(&self) -> String {
        let mut clauses: Vec<String> = Vec::new();

        for cat in self.categories.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            clauses.push(format!("cat:{}", cat));
        }

        for kw in self.include.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
            let quoted = kw.replace('"', "");
            clauses.push(format!("(ti:\"{0}\" OR abs:\"{0}\")", quoted));
        }

        if clauses.is_empty() {
            "all:*".to_string()
        } else {
            clauses.join(" AND ")
        }
    }

    /// True when the lowercased title and abstract contain any exclude keyword.
    pub fn excludes(&self, title: &str, summary: &str) -> bool {
        let haystack = format!("{} {}", title, summary).to_lowercase();
        self.exclude
            .iter()
            .map(|kw| kw.to_lowercase())
            .filter(|kw| !kw.is_empty())
            .any(|kw| haystack.contains(&kw))
    }

    /// Topic name as it appears in artifact file names.
    pub fn file_slug(&self) -> String {
        topic_slug(&self.name)
    }
}

pub fn topic_slug(name: &str) -> String {
    name.replace(' ', "_")
}

#[derive(Debug, Deserialize)]
struct TopicsFile {
    #[serde(default)]
    profiles: Vec<TopicProfile>,
}

/// Load and validate the topic profiles.
pub fn load_topics(path: &Path) -> Result<Vec<TopicProfile>> {
    if !path.exists() {
        anyhow::bail!("Topic configuration not found: {}", path.display());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read topic configuration: {}", path.display()))?;

    parse_topics(&content)
        .with_context(|| format!("Invalid topic configuration in {}", path.display()))
}

pub fn parse_topics(content: &str) -> Result<Vec<TopicProfile>> {
    let file: TopicsFile =
        serde_yaml::from_str(content).context("Failed to parse topics YAML")?;

    let mut seen = HashSet::new();
    for profile in &file.profiles {
        if profile.name.trim().is_empty() {
            anyhow::bail!("Topic profile with an empty name");
        }
        // Names become file names under the data directory
        if profile.name.contains(['/', '\\']) || profile.name.contains("..") {
            anyhow::bail!(
                "Topic name '{}' may not contain path separators or '..'",
                profile.name
            );
        }
        if profile.max_results == 0 {
            anyhow::bail!("Topic '{}' has max: 0; expected a positive integer", profile.name);
        }
        if !seen.insert(profile.name.as_str()) {
            anyhow::bail!("Duplicate topic name: {}", profile.name);
        }
    }

    Ok(file.profiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(include: &[&str], categories: &[&str]) -> TopicProfile {
        TopicProfile {
            name: "Test".to_string(),
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: vec![],
            categories: categories.iter().map(|s| s.to_string()).collect(),
            max_results: 5,
        }
    }

    #[test]
    fn test_parse_topics_defaults() {
        let yaml = r#"
profiles:
  - name: LLM Agents
    include: [agent]
    categories: [cs.AI]
  - name: Vision
    max: 25
"#;
        let topics = parse_topics(yaml).unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].max_results, 10);
        assert!(topics[0].exclude.is_empty());
        assert_eq!(topics[1].max_results, 25);
        assert!(topics[1].include.is_empty());
    }

    #[test]
    fn test_parse_topics_rejects_duplicates() {
        let yaml = "profiles:\n  - name: A\n  - name: A\n";
        let err = parse_topics(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate topic name"));
    }

    #[test]
    fn test_parse_topics_rejects_path_like_names() {
        for name in ["../escape", "a/b", "a\\b", ".."] {
            let yaml = format!("profiles:\n  - name: '{}'\n", name);
            let err = parse_topics(&yaml).unwrap_err();
            assert!(err.to_string().contains("path separators"), "{}", name);
        }
        assert!(parse_topics("profiles:\n  - name: v1.5 models\n").is_ok());
    }

    #[test]
    fn test_parse_topics_rejects_zero_max() {
        let yaml = "profiles:\n  - name: A\n    max: 0\n";
        assert!(parse_topics(yaml).is_err());
    }

    #[test]
    fn test_load_topics_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_topics(&dir.path().join("topics.yml")).unwrap_err();
        assert!(err.to_string().contains("Topic configuration not found"));
    }

    #[test]
    fn test_search_query_wildcard() {
        assert_eq!(profile(&[], &[]).search_query(), "all:*");
    }

    #[test]
    fn test_search_query_categories_only() {
        assert_eq!(profile(&[], &["cs.AI", "cs.CL"]).search_query(), "cat:cs.AI AND cat:cs.CL");
    }

    // Multiple include keywords narrow the query. Changing this to OR must be deliberate.
    #[test]
    fn test_search_query_include_keywords_are_anded() {
        let query = profile(&["agent", "large language model"], &["cs.AI"]).search_query();
        assert_eq!(
            query,
            "cat:cs.AI AND (ti:\"agent\" OR abs:\"agent\") AND \
             (ti:\"large language model\" OR abs:\"large language model\")"
        );
        assert_eq!(query.matches(" AND ").count(), 2);
    }

    #[test]
    fn test_excludes_case_insensitive() {
        let mut p = profile(&[], &[]);
        p.exclude = vec!["Survey".to_string()];
        assert!(p.excludes("A SURVEY of agents", "body"));
        assert!(p.excludes("Agents", "this survey covers"));
        assert!(!p.excludes("Agents", "new method"));
    }

    #[test]
    fn test_excludes_spans_title_and_summary() {
        let mut p = profile(&[], &[]);
        p.exclude = vec!["end start".to_string()];
        assert!(p.excludes("title end", "start of abstract"));
    }

    #[test]
    fn test_file_slug() {
        assert_eq!(topic_slug("LLM Agents Daily"), "LLM_Agents_Daily");
    }
}
