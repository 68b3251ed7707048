//! Remote canvas client
//!
//! [`CanvasApi`] is the seam between the reconciler and the network. The
//! HTTP implementation issues one create or delete per [`CanvasApi::apply`]
//! call and only returns once the call succeeded or its retry budget is
//! spent:
//! - 429 and 5xx responses are retried with jittered exponential backoff
//! - other error statuses and transport failures are terminal
//! - each success is followed by a fixed pause to stay under the rate limit

use crate::config::CanvasConfig;
use crate::entity::Entity;
use crate::error::{CanvasError, FailureKind, RemoteError};
use crate::goal::GoalMap;
use crate::retry::RetryPolicy;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Remote operation applied to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Place the entity
    Create,
    /// Remove whatever occupies the entity's position
    Delete,
}

impl Operation {
    /// HTTP verb for the operation
    #[inline]
    #[must_use]
    pub fn method(self) -> Method {
        match self {
            Self::Create => Method::POST,
            Self::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Delete => "delete",
        })
    }
}

/// Canvas API as seen by the reconciler
///
/// Implement this trait to substitute the remote service, e.g. in tests.
#[async_trait::async_trait]
pub trait CanvasApi: Send + Sync {
    /// Fetch and parse the goal map for the configured candidate
    async fn fetch_goal(&self) -> Result<GoalMap, CanvasError>;

    /// Fetch the current canvas; `true` marks an occupied cell
    async fn fetch_current_content(&self) -> Result<Vec<Vec<bool>>, CanvasError>;

    /// Apply `operation` to `entity`, retrying transient failures
    async fn apply(&self, entity: &Entity, operation: Operation) -> Result<(), RemoteError>;
}

#[derive(Debug, Deserialize)]
struct GoalResponse {
    goal: Option<Vec<Vec<String>>>,
}

#[derive(Debug, Deserialize)]
struct MapResponse {
    map: Option<MapBody>,
}

#[derive(Debug, Deserialize)]
struct MapBody {
    content: Option<Vec<Vec<serde_json::Value>>>,
}

/// HTTP implementation of [`CanvasApi`]
#[derive(Debug, Clone)]
pub struct HttpCanvasClient {
    http: reqwest::Client,
    base_url: String,
    candidate_id: String,
    goal_endpoint: String,
    map_endpoint: String,
    retry: RetryPolicy,
    request_delay: Duration,
}

impl HttpCanvasClient {
    /// Create client from configuration
    ///
    /// # Errors
    /// `CanvasError::Config` if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: &CanvasConfig) -> Result<Self, CanvasError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CanvasError::Config(format!("failed to build HTTP client: {e}")))?;
        Self::with_http_client(config, http)
    }

    /// Create client sharing an existing connection pool
    ///
    /// # Errors
    /// `CanvasError::Config` if the configuration is invalid.
    pub fn with_http_client(
        config: &CanvasConfig,
        http: reqwest::Client,
    ) -> Result<Self, CanvasError> {
        config.validate()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            candidate_id: config.candidate_id.clone(),
            goal_endpoint: config.goal_endpoint(),
            map_endpoint: config.map_endpoint(),
            retry: config.retry_policy(),
            request_delay: config.request_delay(),
        })
    }

    /// Retry policy in effect
    #[inline]
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// One attempt, no retry
    async fn send_once(&self, entity: &Entity, operation: Operation) -> Result<(), RemoteError> {
        let url = self.url(entity.resource_path());
        debug!(%operation, %entity, %url, "sending request");

        let response = self
            .http
            .request(operation.method(), &url)
            .json(&entity.request_body(&self.candidate_id))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        log_status_failure(status, &body);
        Err(RemoteError::status(status, body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CanvasError> {
        let url = self.url(path);
        debug!(%url, "fetching");

        let response = self.http.get(&url).send().await.map_err(RemoteError::from)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log_status_failure(status, &body);
            return Err(RemoteError::status(status, body).into());
        }

        let text = response.text().await.map_err(RemoteError::from)?;
        serde_json::from_str(&text)
            .map_err(|e| RemoteError::Decode(format!("{path}: {e}")).into())
    }
}

#[async_trait::async_trait]
impl CanvasApi for HttpCanvasClient {
    async fn fetch_goal(&self) -> Result<GoalMap, CanvasError> {
        let response: GoalResponse = self.get_json(&self.goal_endpoint).await?;
        let grid = response
            .goal
            .ok_or_else(|| CanvasError::MalformedResponse("goal response has no 'goal' field".to_string()))?;

        let goal = GoalMap::from_grid(&grid)?;
        info!(
            rows = goal.rows(),
            cols = goal.cols(),
            entities = goal.entities().len(),
            "fetched goal map"
        );
        Ok(goal)
    }

    async fn fetch_current_content(&self) -> Result<Vec<Vec<bool>>, CanvasError> {
        let response: MapResponse = self.get_json(&self.map_endpoint).await?;
        let content = response
            .map
            .ok_or_else(|| CanvasError::MalformedResponse("map response has no 'map' field".to_string()))?
            .content
            .ok_or_else(|| CanvasError::MalformedResponse("map has no 'content' field".to_string()))?;

        Ok(content
            .into_iter()
            .map(|row| row.into_iter().map(|cell| !cell.is_null()).collect())
            .collect())
    }

    async fn apply(&self, entity: &Entity, operation: Operation) -> Result<(), RemoteError> {
        let mut retry = 0;

        loop {
            match self.send_once(entity, operation).await {
                Ok(()) => {
                    info!(%operation, %entity, "operation succeeded");
                    if !self.request_delay.is_zero() {
                        tokio::time::sleep(self.request_delay).await;
                    }
                    return Ok(());
                }
                Err(err) if err.is_retryable() => {
                    if !self.retry.should_retry(retry) {
                        error!(%operation, %entity, attempts = retry + 1, error = %err, "retries exhausted");
                        return Err(RemoteError::RetriesExhausted {
                            attempts: retry + 1,
                            last: Box::new(err),
                        });
                    }

                    let delay = self.retry.delay_for(retry);
                    warn!(
                        %operation,
                        %entity,
                        retry = retry + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying after error"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(err) => {
                    error!(%operation, %entity, error = %err, "operation failed");
                    return Err(err);
                }
            }
        }
    }
}

fn log_status_failure(status: StatusCode, body: &str) {
    match FailureKind::classify(status) {
        FailureKind::RateLimited => {
            warn!(%status, body, "too many requests (retryable)");
        }
        FailureKind::Server => warn!(%status, body, "server error (retryable)"),
        FailureKind::Client => error!(%status, body, "client error (won't retry)"),
        FailureKind::Unexpected => error!(%status, body, "unexpected status"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CanvasConfig {
        CanvasConfig::new()
            .with_base_url("http://localhost:8080/api/")
            .with_candidate_id("cand")
    }

    #[test]
    fn operation_methods() {
        assert_eq!(Operation::Create.method(), Method::POST);
        assert_eq!(Operation::Delete.method(), Method::DELETE);
        assert_eq!(Operation::Delete.to_string(), "delete");
    }

    #[test]
    fn urls_keep_base_path() {
        let client = HttpCanvasClient::new(&config()).unwrap();

        assert_eq!(client.url("/polyanets"), "http://localhost:8080/api/polyanets");
        assert_eq!(client.goal_endpoint, "/map/cand/goal");
        assert_eq!(client.map_endpoint, "/map/cand");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = HttpCanvasClient::new(&CanvasConfig::new());
        assert!(matches!(result, Err(CanvasError::Config(_))));
    }

    #[test]
    fn map_response_tolerates_missing_fields() {
        let response: MapResponse = serde_json::from_str(r#"{"map": null}"#).unwrap();
        assert!(response.map.is_none());

        let response: MapResponse =
            serde_json::from_str(r#"{"map": {"content": [[null, {"type": 0}]]}}"#).unwrap();
        let content = response.map.unwrap().content.unwrap();
        assert!(content[0][0].is_null());
        assert!(!content[0][1].is_null());
    }
}
