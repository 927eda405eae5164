//! HTTP client for the racectl API

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{
    AddRunnerRequest, AddRunnersBulkRequest, AuthoritativeId, BulkFinishesResponse,
    BulkRunnersResponse, CreateRaceRequest, FinishRequest, FinishResult, Race,
    RecordFinishesBulkRequest, ResultView, Runner, UpdateRaceRequest,
};

use super::remote::RemoteService;

/// Reqwest-backed client for the authoritative server
#[derive(Clone)]
pub struct HttpRemote {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemote {
    /// Create a client for the given base URL (scheme required)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            client: reqwest::Client::builder().build()?,
        })
    }

    /// Liveness probe; any transport failure reads as offline
    pub async fn healthz(&self) -> bool {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// List races, newest first
    pub async fn list_races(&self) -> Result<Vec<Race>> {
        self.get_json("/api/races").await
    }

    /// Fetch one race
    pub async fn get_race(&self, id: AuthoritativeId) -> Result<Race> {
        self.get_json(&format!("/api/races/{id}")).await
    }

    /// Create a race
    pub async fn create_race(&self, req: &CreateRaceRequest) -> Result<Race> {
        self.post_json("/api/races", req).await
    }

    /// Edit race name/description
    pub async fn update_race(&self, id: AuthoritativeId, req: &UpdateRaceRequest) -> Result<Race> {
        let url = format!("{}/api/races/{id}", self.base_url);
        let response = self.client.put(url).json(req).send().await?;
        Self::parse_response(response).await
    }

    /// Start a race
    pub async fn start_race(&self, id: AuthoritativeId) -> Result<Race> {
        self.post_json(&format!("/api/races/{id}/start"), &()).await
    }

    /// End a race
    pub async fn end_race(&self, id: AuthoritativeId) -> Result<Race> {
        self.post_json(&format!("/api/races/{id}/end"), &()).await
    }

    /// List runners for a race
    pub async fn list_runners(&self, race_id: AuthoritativeId) -> Result<Vec<Runner>> {
        self.get_json(&format!("/api/runners/race/{race_id}")).await
    }

    /// Natural-key runner lookup
    pub async fn runner_by_bib(&self, race_id: AuthoritativeId, bib: i64) -> Result<Runner> {
        self.get_json(&format!("/api/runners/race/{race_id}/bib/{bib}"))
            .await
    }

    /// Results with runner fields, position order
    pub async fn list_results(&self, race_id: AuthoritativeId) -> Result<Vec<ResultView>> {
        self.get_json(&format!("/api/results/race/{race_id}")).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.get(url).send().await?;
        Self::parse_response(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.post(url).json(body).send().await?;
        Self::parse_response(response).await
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

impl RemoteService for HttpRemote {
    async fn add_runner(&self, req: &AddRunnerRequest) -> Result<Runner> {
        self.post_json("/api/runners", req).await
    }

    async fn add_runners_bulk(&self, req: &AddRunnersBulkRequest) -> Result<BulkRunnersResponse> {
        self.post_json("/api/runners/bulk", req).await
    }

    async fn record_finish(&self, req: &FinishRequest) -> Result<FinishResult> {
        self.post_json("/api/results/finish", req).await
    }

    async fn record_finishes_bulk(
        &self,
        req: &RecordFinishesBulkRequest,
    ) -> Result<BulkFinishesResponse> {
        self.post_json("/api/results/batch", req).await
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Map a non-success status onto the failure taxonomy. Content rejections
/// (4xx) are terminal; everything else stays retryable.
fn classify_status(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                trimmed.to_string()
            }
        });

    match status {
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::CONFLICT => Error::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::Invalid(message),
        _ => Error::Api(format!("{message} ({})", status.as_u16())),
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Invalid("server URL must not be empty".into()));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.trim_end_matches('/').to_string())
    } else {
        Err(Error::Invalid(
            "server URL must include http:// or https://".into(),
        ))
    }
}
