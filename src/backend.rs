use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::time::{Duration, interval};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::metrics::UPSTREAM_LATENCY;
use crate::models::{AuthUser, EventInsert, EventRow, NewEvent, ParticipantInsert};

/// Client for the managed backend's REST and auth endpoints.
///
/// Every call is made on behalf of the caller's access token so the
/// backend's own row policies still apply.
pub struct BackendClient {
    client: reqwest::Client,
    pub url: String,
    api_key: String,
    healthy: AtomicBool,
}

impl BackendClient {
    // Accepts "host:port" or a full url
    pub fn new(client: reqwest::Client, url: &str, api_key: impl Into<String>) -> Self {
        let url = url.trim().trim_end_matches('/');
        let url = if url.starts_with("http") {
            url.to_string()
        } else {
            format!("http://{}", url)
        };

        Self {
            client,
            url,
            api_key: api_key.into(),
            healthy: AtomicBool::new(true),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub async fn current_user(&self, token: &str) -> Result<AuthUser, ApiError> {
        let res = self
            .send(self.authed(self.client.get(format!("{}/auth/v1/user", self.url)), token))
            .await?;

        match res.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized),
            _ => Ok(success(res).await?.json().await?),
        }
    }

    pub async fn fetch_event(&self, token: &str, event_id: &str) -> Result<Option<EventRow>, ApiError> {
        let url = self.table_url(
            "events",
            &[("id", format!("eq.{}", event_id)), ("select", "id,status,event_date".into())],
        )?;
        let req = self.client.get(url);

        // a malformed id is rejected by the backend; to the caller it's just not there
        match self.json::<Vec<EventRow>>(self.authed(req, token)).await {
            Ok(rows) => Ok(rows.into_iter().next()),
            Err(ApiError::UpstreamStatus { status, .. }) if status.is_client_error() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn is_participant(&self, token: &str, event_id: &str, user_id: &str) -> Result<bool, ApiError> {
        let url = self.table_url(
            "participants",
            &[
                ("event_id", format!("eq.{}", event_id)),
                ("user_id", format!("eq.{}", user_id)),
                ("select", "id".into()),
            ],
        )?;
        let req = self.client.get(url);

        let rows: Vec<serde_json::Value> = self.json(self.authed(req, token)).await?;
        Ok(!rows.is_empty())
    }

    pub async fn insert_participant(&self, token: &str, event_id: &str, user_id: &str) -> Result<(), ApiError> {
        let req = self
            .client
            .post(format!("{}/rest/v1/participants", self.url))
            .json(&ParticipantInsert { event_id, user_id });

        let res = self.send(self.authed(req, token)).await?;
        // unique (event_id, user_id) violation, lost a race with another join
        if res.status() == StatusCode::CONFLICT {
            return Err(ApiError::BadRequest("Already joined this event".into()));
        }
        success(res).await?;
        Ok(())
    }

    pub async fn delete_participant(&self, token: &str, event_id: &str, user_id: &str) -> Result<(), ApiError> {
        let url = self.table_url(
            "participants",
            &[("event_id", format!("eq.{}", event_id)), ("user_id", format!("eq.{}", user_id))],
        )?;
        let req = self
            .client
            .delete(url)
            .header("Prefer", "return=representation");

        let deleted: Vec<serde_json::Value> = self.json(self.authed(req, token)).await?;
        if deleted.is_empty() {
            return Err(ApiError::NotFound("Not a participant of this event".into()));
        }
        Ok(())
    }

    pub async fn create_event(&self, token: &str, creator_id: &str, event: &NewEvent) -> Result<serde_json::Value, ApiError> {
        let req = self
            .client
            .post(format!("{}/rest/v1/events", self.url))
            .header("Prefer", "return=representation")
            .json(&EventInsert { event, creator_id });

        let rows: Vec<serde_json::Value> = self.json(self.authed(req, token)).await?;
        rows.into_iter().next().ok_or(ApiError::UpstreamStatus {
            status: StatusCode::NO_CONTENT,
            body: "event insert returned no row".into(),
        })
    }

    pub async fn ping(&self) -> bool {
        let req = self
            .client
            .get(format!("{}/auth/v1/health", self.url))
            .header("apikey", &self.api_key)
            .timeout(Duration::from_secs(5));

        match req.send().await {
            Ok(res) => res.status().is_success(),
            Err(_) => false,
        }
    }

    // Table endpoint with row filters, e.g. `?id=eq.<uuid>`
    fn table_url(&self, table: &str, filters: &[(&str, String)]) -> Result<Url, ApiError> {
        Url::parse_with_params(&format!("{}/rest/v1/{}", self.url, table), filters)
            .map_err(|e| ApiError::BadRequest(format!("Invalid filter: {}", e)))
    }

    fn authed(&self, req: RequestBuilder, token: &str) -> RequestBuilder {
        req.header("apikey", &self.api_key).bearer_auth(token)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let start = Instant::now();
        let result = req.send().await;
        UPSTREAM_LATENCY.observe(start.elapsed().as_secs_f64());

        match result {
            Ok(res) => Ok(res),
            Err(e) => {
                // transport error, the health checker will confirm
                self.set_healthy(false);
                warn!(backend = %self.url, error = %e, "backend request failed, marked unhealthy");
                Err(e.into())
            }
        }
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let res = self.send(req).await?;
        Ok(success(res).await?.json().await?)
    }
}

async fn success(res: Response) -> Result<Response, ApiError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    debug!(%status, %body, "backend returned error");
    Err(ApiError::UpstreamStatus { status, body })
}

// Health check loop - probes the backend on every tick and logs transitions
pub async fn health_checker(backend: Arc<BackendClient>, check_interval: Duration) {
    let mut interval = interval(check_interval);

    info!(interval = ?check_interval, "health checker started");

    loop {
        interval.tick().await;

        let was_healthy = backend.is_healthy();
        let is_healthy = backend.ping().await;
        backend.set_healthy(is_healthy);

        if was_healthy != is_healthy {
            if is_healthy {
                info!(backend = %backend.url, "backend is now healthy");
            } else {
                warn!(backend = %backend.url, "backend is now unhealthy");
            }
        }
    }
}
