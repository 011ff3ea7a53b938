pub mod client;
pub mod error;
pub mod extract;
pub mod job;
pub mod pagination;
pub mod process;
pub mod resolver;
pub mod retry;
pub mod sleeper;
pub mod types;

pub use client::ApifyClient;
pub use error::ScraperError;
pub use extract::{CommentExtractor, ExtractionTarget, ExtractorOptions};
pub use job::{JobHandle, JobOutcome, JobRequest, JobService};
pub use pagination::BatchPolicy;
pub use resolver::UrlExpander;
pub use retry::{RetryController, RetryOutcome, RetryPolicy};
pub use sleeper::{Sleeper, TokioSleeper};
