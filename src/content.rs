//! Homework content provider
//!
//! Fetches variant descriptions and task texts from the kompege.ru API.
//! Failures are reported as [`ContentError`]; callers that only need
//! "data or nothing" use [`load_variant`].

use crate::config::{VARIANT_CACHE_MAX_SIZE, VARIANT_CACHE_TTL_SECS};
use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while fetching a variant
#[derive(Debug, Error)]
pub enum ContentError {
    /// Connectivity problem or timeout
    #[error("Network error: {0}")]
    Network(String),
    /// Non-success HTTP status
    #[error("Content API returned status {0}")]
    Status(u16),
    /// Body was not the expected JSON
    #[error("JSON error: {0}")]
    Json(String),
}

/// One task of a variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier used for reference solutions and hints
    #[serde(rename = "taskId")]
    pub task_id: i64,
    /// Task statement, HTML-escaped
    #[serde(default)]
    pub text: String,
}

impl Task {
    /// Statement with HTML entities decoded
    #[must_use]
    pub fn plain_text(&self) -> String {
        html_escape::decode_html_entities(&self.text).into_owned()
    }
}

/// A homework variant (KIM)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Tasks in display order
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Variant {
    /// Description, or the generic one when the API gave none
    #[must_use]
    pub fn description_or_default(&self, kim: i64) -> String {
        self.description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| default_description(kim))
    }

    /// Find a task by id
    #[must_use]
    pub fn task(&self, task_id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }
}

/// Description used when the variant cannot be loaded
#[must_use]
pub fn default_description(kim: i64) -> String {
    format!("Домашняя работа {kim}")
}

/// Source of homework variants
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Fetch a variant by KIM
    async fn fetch_variant(&self, kim: i64) -> Result<Variant, ContentError>;
}

/// Fetch a variant, treating any failure as "no data"
pub async fn load_variant(provider: &dyn ContentProvider, kim: i64) -> Option<Variant> {
    match provider.fetch_variant(kim).await {
        Ok(variant) => Some(variant),
        Err(e) => {
            warn!("Failed to load variant {kim}: {e}");
            None
        }
    }
}

/// HTTP client for the kompege.ru variant API
pub struct KompegeClient {
    http_client: HttpClient,
    base_url: String,
    cache: Cache<i64, Arc<Variant>>,
}

impl KompegeClient {
    /// Create a client for `base_url`; the KIM is appended to it
    #[must_use]
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| HttpClient::new());

        let cache = Cache::builder()
            .max_capacity(VARIANT_CACHE_MAX_SIZE)
            .time_to_live(Duration::from_secs(VARIANT_CACHE_TTL_SECS))
            .build();

        Self {
            http_client,
            base_url,
            cache,
        }
    }

    async fn request(&self, kim: i64) -> Result<Variant, ContentError> {
        let url = format!("{}{kim}", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ContentError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ContentError::Status(response.status().as_u16()));
        }

        response
            .json::<Variant>()
            .await
            .map_err(|e| ContentError::Json(e.to_string()))
    }
}

#[async_trait]
impl ContentProvider for KompegeClient {
    async fn fetch_variant(&self, kim: i64) -> Result<Variant, ContentError> {
        if let Some(cached) = self.cache.get(&kim).await {
            debug!("Variant {kim} served from cache");
            return Ok(cached.as_ref().clone());
        }

        let variant = self.request(kim).await?;
        self.cache.insert(kim, Arc::new(variant.clone())).await;
        Ok(variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_deserialization() -> Result<(), serde_json::Error> {
        let json = r#"{
            "description": "Пробник",
            "tasks": [
                {"taskId": 101, "text": "a &lt; b", "number": 1},
                {"taskId": 102}
            ],
            "extra": true
        }"#;
        let variant: Variant = serde_json::from_str(json)?;

        assert_eq!(variant.description_or_default(5), "Пробник");
        assert_eq!(variant.tasks.len(), 2);
        assert_eq!(variant.task(101).map(Task::plain_text).as_deref(), Some("a < b"));
        assert_eq!(variant.task(102).map(|t| t.text.as_str()), Some(""));
        assert!(variant.task(103).is_none());
        Ok(())
    }

    #[test]
    fn test_missing_description_falls_back() -> Result<(), serde_json::Error> {
        let variant: Variant = serde_json::from_str("{}")?;
        assert_eq!(variant.description_or_default(77), "Домашняя работа 77");
        assert!(variant.tasks.is_empty());

        let blank = Variant {
            description: Some("  ".to_string()),
            tasks: vec![],
        };
        assert_eq!(blank.description_or_default(1), "Домашняя работа 1");
        Ok(())
    }

    #[tokio::test]
    async fn test_load_variant_swallows_errors() {
        let mut provider = MockContentProvider::new();
        provider
            .expect_fetch_variant()
            .returning(|_| Err(ContentError::Status(503)));

        assert!(load_variant(&provider, 1).await.is_none());
    }
}
