//! REST client for the usage endpoints

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::usage::{
    validate_user_id, BatchSyncResponse, SubscriptionTier, UsageAnalytics, UsageBackend,
    UsageCounters, UsageEvent, UsagePeriod, UsageStats,
};
use crate::domain::DomainError;

/// Connection settings for the usage API
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub auth_token: Option<String>,
}

impl HttpBackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            auth_token: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

/// Stats payload as the backend sends it.
///
/// Limits and percentages in the payload are ignored; both are derived
/// locally from the tier and the counters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    subscription_tier: SubscriptionTier,
    #[serde(default)]
    current_period: Option<UsagePeriod>,
    #[serde(default)]
    usage: UsageCounters,
}

impl StatsResponse {
    fn into_stats(self, requested_user_id: &str) -> UsageStats {
        UsageStats::new(
            self.user_id
                .unwrap_or_else(|| requested_user_id.to_string()),
            self.subscription_tier,
            self.current_period.unwrap_or_else(UsagePeriod::current),
            self.usage,
        )
    }
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    events: &'a [UsageEvent],
}

#[derive(Debug, Serialize)]
struct UpdateTierRequest {
    tier: SubscriptionTier,
}

/// [`UsageBackend`] over HTTPS using reqwest
#[derive(Debug, Clone)]
pub struct HttpUsageBackend {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpUsageBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base}/usage/{user_id}/{suffix}` with the user ID percent-encoded as
    /// a single path segment
    fn user_url(&self, user_id: &str, suffix: &str) -> Result<Url, DomainError> {
        validate_user_id(user_id).map_err(|e| DomainError::validation(e.to_string()))?;

        let mut url = Url::parse(&self.base_url).map_err(|e| {
            DomainError::configuration(format!("Invalid backend URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                DomainError::configuration(format!("Backend URL {} cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["usage", user_id, suffix]);

        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DomainError> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| DomainError::transport(format!("Request failed: {}", e)))
    }

    async fn ensure_success(response: Response) -> Result<Response, DomainError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(DomainError::http(status.as_u16(), body))
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, DomainError> {
        response
            .json()
            .await
            .map_err(|e| DomainError::serialization(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl UsageBackend for HttpUsageBackend {
    async fn fetch_stats(&self, user_id: &str) -> Result<Option<UsageStats>, DomainError> {
        let url = self.user_url(user_id, "stats")?;
        let response = self.send(self.client.get(url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(user_id = %user_id, "No usage record on backend");
            return Ok(None);
        }

        let response = Self::ensure_success(response).await?;
        let payload: StatsResponse = Self::parse(response).await?;

        Ok(Some(payload.into_stats(user_id)))
    }

    async fn sync_events(&self, events: &[UsageEvent]) -> Result<BatchSyncResponse, DomainError> {
        let url = self.url("/usage/events/batch");
        let request = self.client.post(&url).json(&BatchRequest { events });

        let response = Self::ensure_success(self.send(request).await?).await?;
        Self::parse(response).await
    }

    async fn update_tier(&self, user_id: &str, tier: SubscriptionTier) -> Result<(), DomainError> {
        let url = self.user_url(user_id, "update-tier")?;
        let request = self.client.post(url).json(&UpdateTierRequest { tier });

        Self::ensure_success(self.send(request).await?).await?;
        Ok(())
    }

    async fn reset_period(&self, user_id: &str) -> Result<(), DomainError> {
        let url = self.user_url(user_id, "reset-period")?;

        Self::ensure_success(self.send(self.client.post(url)).await?).await?;
        Ok(())
    }

    async fn fetch_analytics(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<UsageAnalytics, DomainError> {
        if end < start {
            return Err(DomainError::validation(
                "Analytics end date must not precede start date",
            ));
        }

        let url = self.user_url(user_id, "analytics")?;
        let request = self.client.get(url).query(&[
            ("startDate", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("endDate", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ]);

        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DomainError::not_found(format!(
                "No usage analytics for user {}",
                user_id
            )));
        }

        let response = Self::ensure_success(response).await?;
        Self::parse(response).await
    }
}
