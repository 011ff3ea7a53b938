use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use crate::error::ScraperError;
use crate::job::{JobHandle, JobOutcome, JobRequest, JobService};
use crate::types::{ApiErrorBody, ApiResponse, DatasetInfo, RunData};

pub const DEFAULT_BASE_URL: &str = "https://api.apify.com/v2";

/// HTTP client for the Apify v2 REST API.
///
/// Starts actor runs, polls them to a terminal state, and downloads the
/// default dataset of a finished run. Non-2xx responses become
/// [`ScraperError::Api`]; network failures propagate as
/// [`ScraperError::Http`] so the retry layer above can decide what to do.
pub struct ApifyClient {
    client: Client,
    base_url: String,
    token: String,
    poll_interval: Duration,
}

impl ApifyClient {
    /// Creates a client against the public Apify endpoint with a 10 s poll interval.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(token: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_owned(),
            token: token.to_owned(),
            poll_interval: Duration::from_secs(10),
        })
    }

    /// Points the client at another API root (a mock server in tests).
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBaseUrl`] if `base_url` is not an absolute URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ScraperError> {
        reqwest::Url::parse(base_url).map_err(|e| ScraperError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        self.base_url = base_url.trim_end_matches('/').to_owned();
        Ok(self)
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Actor ids use `~` in place of `/` inside URL paths.
    pub(crate) fn run_url(&self, actor: &str) -> String {
        format!("{}/acts/{}/runs", self.base_url, actor.replace('/', "~"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, context: &str) -> Result<T, ScraperError> {
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;
        decode(response, context).await
    }

    async fn get_run(&self, run_id: &str) -> Result<RunData, ScraperError> {
        let url = format!("{}/actor-runs/{run_id}", self.base_url);
        let envelope: ApiResponse<RunData> = self.get_json(&url, "actor run").await?;
        Ok(envelope.data)
    }
}

/// Turns a response into `T`, mapping non-2xx statuses to [`ScraperError::Api`].
async fn decode<T: DeserializeOwned>(response: Response, context: &str) -> Result<T, ScraperError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        return Err(ScraperError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str::<T>(&body).map_err(|e| ScraperError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

impl JobService for ApifyClient {
    async fn submit(&self, request: &JobRequest) -> Result<JobHandle, ScraperError> {
        let url = self.run_url(request.actor);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&request.input)
            .send()
            .await?;
        let envelope: ApiResponse<RunData> =
            decode(response, &format!("run start for {}", request.actor)).await?;

        tracing::info!(
            actor = request.actor,
            run_id = %envelope.data.id,
            "job submitted"
        );
        Ok(JobHandle {
            run_id: envelope.data.id,
            dataset_id: envelope.data.default_dataset_id,
        })
    }

    async fn await_completion(
        &self,
        handle: &JobHandle,
        max_wait: Duration,
    ) -> Result<JobOutcome, ScraperError> {
        // `None` means the wait is too long to represent; poll until terminal.
        let deadline = Instant::now().checked_add(max_wait);

        loop {
            let run = self.get_run(&handle.run_id).await?;
            if let Some(outcome) = JobOutcome::from_status(&run.status) {
                tracing::debug!(run_id = %handle.run_id, %outcome, "job reached terminal state");
                return Ok(outcome);
            }

            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                tracing::warn!(
                    run_id = %handle.run_id,
                    status = %run.status,
                    max_wait_secs = max_wait.as_secs(),
                    "job did not finish in time"
                );
                return Ok(JobOutcome::TimedOut);
            }

            tracing::debug!(run_id = %handle.run_id, status = %run.status, "job still running");
            let pause = deadline.map_or(self.poll_interval, |d| self.poll_interval.min(d - now));
            tokio::time::sleep(pause).await;
        }
    }

    async fn fetch_items(&self, handle: &JobHandle) -> Result<Vec<serde_json::Value>, ScraperError> {
        let info_url = format!("{}/datasets/{}", self.base_url, handle.dataset_id);
        let info: ApiResponse<DatasetInfo> = self.get_json(&info_url, "dataset info").await?;
        let count = info.data.item_count;

        if count == 0 {
            return Ok(Vec::new());
        }

        // The page size must cover the whole dataset or results are silently cut.
        let items_url = format!(
            "{}/datasets/{}/items?clean=true&format=json&limit={count}",
            self.base_url, handle.dataset_id
        );
        let items: Vec<serde_json::Value> = self.get_json(&items_url, "dataset items").await?;
        tracing::debug!(dataset_id = %handle.dataset_id, count, fetched = items.len(), "dataset fetched");
        Ok(items)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
