//! Job-service (Apify v2) response envelopes.
//!
//! Every object endpoint wraps its payload in `{"data": ...}`. Errors come
//! back as `{"error": {"type": ..., "message": ...}}` with a non-2xx status.
//! The dataset items endpoint is the exception: it returns a bare JSON array.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Actor run object from `POST /acts/{actor}/runs` and `GET /actor-runs/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunData {
    pub id: String,
    pub status: String,
    pub default_dataset_id: String,
}

/// Dataset object from `GET /datasets/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    #[serde(default)]
    pub item_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}
