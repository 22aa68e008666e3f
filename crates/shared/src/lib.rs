// Public modules
pub mod arxiv;
pub mod config;
pub mod digest;
pub mod fetcher;
pub mod io;
pub mod logging;
pub mod models;
pub mod page;
pub mod summarizer;
pub mod topics;

// Re-export commonly used types
pub use arxiv::{ArxivClient, ArxivEntry};
pub use config::Config;
pub use digest::{write_digests, SummarizeOutcome, TopicDigest};
pub use fetcher::{FetchReport, Fetcher, TopicOutcome, TopicReport};
pub use models::Paper;
pub use page::{build_page, PageOutcome};
pub use summarizer::{QwenSummarizer, SummaryAnnotation};
pub use topics::{load_topics, TopicProfile};
