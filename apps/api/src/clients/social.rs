//! HTTP adapter for the social platform: publish endpoint and post metrics.
//!
//! The platform is opaque to the core — all this module does is speak JSON
//! and map response codes onto the publish error taxonomy so the sweep can
//! make retry decisions without vendor knowledge.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::clients::{MetricsProvider, PublishReceipt, SocialPublisher};
use crate::errors::{PublishError, PublishErrorKind};
use crate::models::feedback::PostMetrics;

#[derive(Debug, Serialize)]
struct CreatePostRequest<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatePostResponse {
    post_id: String,
}

#[derive(Clone)]
pub struct SocialClient {
    client: Client,
    base_url: String,
    token: String,
}

impl SocialClient {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

/// Maps a platform response status onto the retry taxonomy.
fn classify_status(status: StatusCode) -> PublishErrorKind {
    match status {
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => PublishErrorKind::Duplicate,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PublishErrorKind::Auth,
        s if s.is_server_error() => PublishErrorKind::Network,
        _ => PublishErrorKind::Unknown,
    }
}

#[async_trait]
impl SocialPublisher for SocialClient {
    async fn publish(&self, body: &str) -> Result<PublishReceipt, PublishError> {
        let response = self
            .client
            .post(format!("{}/v2/posts", self.base_url))
            .bearer_auth(&self.token)
            .json(&CreatePostRequest { body })
            .send()
            .await
            .map_err(|e| {
                // Connect/timeout errors never reached the platform: transient.
                PublishError::new(PublishErrorKind::Network, e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PublishError::new(classify_status(status), message));
        }

        let created: CreatePostResponse = response
            .json()
            .await
            .map_err(|e| PublishError::new(PublishErrorKind::Unknown, e.to_string()))?;

        Ok(PublishReceipt {
            external_post_id: created.post_id,
        })
    }
}

#[async_trait]
impl MetricsProvider for SocialClient {
    async fn fetch_metrics(&self, external_post_id: &str) -> Result<PostMetrics> {
        let response = self
            .client
            .get(format!(
                "{}/v2/posts/{external_post_id}/metrics",
                self.base_url
            ))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<PostMetrics>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classifies_as_duplicate() {
        assert_eq!(
            classify_status(StatusCode::CONFLICT),
            PublishErrorKind::Duplicate
        );
        assert_eq!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY),
            PublishErrorKind::Duplicate
        );
    }

    #[test]
    fn test_auth_statuses_classify_as_auth() {
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), PublishErrorKind::Auth);
        assert_eq!(classify_status(StatusCode::FORBIDDEN), PublishErrorKind::Auth);
    }

    #[test]
    fn test_server_errors_classify_as_network() {
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY),
            PublishErrorKind::Network
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            PublishErrorKind::Network
        );
    }

    #[test]
    fn test_everything_else_is_unknown() {
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST),
            PublishErrorKind::Unknown
        );
    }
}
