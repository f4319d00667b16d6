//! Remote durable tier: a network table shared across devices.
//!
//! Speaks to a REST table endpoint with columns `key` (unique), `value`
//! (JSON payload), `expires_at`, `tags` (text array) and `created_at`.
//! Durability here is nice-to-have: every transport or decode failure
//! degrades to a miss or a skipped write, logged but never propagated.

use crate::config::RemoteConfig;
use crate::entry::StoredEntry;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Serialize, Deserialize)]
struct CacheRow {
    key: String,
    value: serde_json::Value,
    expires_at: DateTime<Utc>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
}

impl CacheRow {
    fn from_entry(key: &str, entry: &StoredEntry) -> Self {
        let created_at = DateTime::<Utc>::from_timestamp_millis(entry.timestamp as i64)
            .unwrap_or_else(Utc::now);
        Self {
            key: key.to_string(),
            value: entry.data.clone(),
            expires_at: created_at + ChronoDuration::milliseconds(entry.ttl as i64),
            tags: entry.tags.clone(),
            created_at,
        }
    }

    fn into_entry(self) -> StoredEntry {
        let timestamp = self.created_at.timestamp_millis().max(0) as u64;
        let ttl = (self.expires_at - self.created_at).num_milliseconds().max(0) as u64;
        StoredEntry {
            data: self.value,
            timestamp,
            ttl,
            tags: self.tags,
        }
    }
}

/// Adapter over the remote cache table.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: reqwest::Client,
    table_url: Url,
    service_key: String,
}

impl RemoteStore {
    pub fn new(config: &RemoteConfig) -> contaflux_core::Result<Self> {
        // A trailing slash keeps Url::join from clobbering the last
        // path segment of endpoints like `https://host/rest/v1`.
        let endpoint = if config.endpoint.ends_with('/') {
            config.endpoint.clone()
        } else {
            format!("{}/", config.endpoint)
        };
        let base = Url::parse(&endpoint).map_err(|e| {
            contaflux_core::Error::configuration(format!(
                "invalid remote cache endpoint '{}': {e}",
                config.endpoint
            ))
        })?;
        let table_url = base.join(&config.table).map_err(|e| {
            contaflux_core::Error::configuration(format!(
                "invalid remote cache table '{}': {e}",
                config.table
            ))
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            table_url,
            service_key: config.service_key.clone(),
        })
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.table_url.clone())
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Exact-key read filtered to unexpired rows.
    pub async fn get(&self, key: &str) -> Option<StoredEntry> {
        let response = self
            .request(reqwest::Method::GET)
            .query(&[
                ("key", format!("eq.{key}")),
                ("expires_at", format!("gt.{}", Utc::now().to_rfc3339())),
                ("limit", "1".to_string()),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(key, status = %r.status(), "remote cache read failed");
                return None;
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "remote cache unreachable");
                return None;
            }
        };

        match response.json::<Vec<CacheRow>>().await {
            Ok(mut rows) if !rows.is_empty() => Some(rows.remove(0).into_entry()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "remote cache returned undecodable body");
                None
            }
        }
    }

    /// Upsert keyed by `key`; the row's own atomic single-row write is
    /// the only transactional guarantee any tier offers.
    pub async fn set(&self, key: &str, entry: &StoredEntry) {
        let row = CacheRow::from_entry(key, entry);
        let result = self
            .request(reqwest::Method::POST)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&row)
            .send()
            .await;

        match result {
            Ok(r) if r.status().is_success() => {}
            Ok(r) => tracing::warn!(key, status = %r.status(), "remote cache write rejected"),
            Err(e) => tracing::warn!(key, error = %e, "remote cache write skipped"),
        }
    }

    pub async fn delete(&self, key: &str) {
        let result = self
            .request(reqwest::Method::DELETE)
            .query(&[("key", format!("eq.{key}"))])
            .send()
            .await;

        if let Err(e) = result {
            tracing::warn!(key, error = %e, "remote cache delete skipped");
        }
    }

    /// Delete every row whose tags column contains `tag`; returns the
    /// number of rows removed (0 on any failure).
    pub async fn invalidate_by_tag(&self, tag: &str) -> usize {
        let result = self
            .request(reqwest::Method::DELETE)
            .header("Prefer", "return=representation")
            .query(&[("tags", format!("cs.{{\"{tag}\"}}"))])
            .send()
            .await;

        let response = match result {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(tag, status = %r.status(), "remote tag invalidation failed");
                return 0;
            }
            Err(e) => {
                tracing::warn!(tag, error = %e, "remote tag invalidation skipped");
                return 0;
            }
        };

        response
            .json::<Vec<serde_json::Value>>()
            .await
            .map(|rows| rows.len())
            .unwrap_or(0)
    }

    /// Maintenance sweep for rows already past their expiry.
    pub async fn purge_expired(&self) -> usize {
        let result = self
            .request(reqwest::Method::DELETE)
            .header("Prefer", "return=representation")
            .query(&[("expires_at", format!("lt.{}", Utc::now().to_rfc3339()))])
            .send()
            .await;

        match result {
            Ok(r) if r.status().is_success() => r
                .json::<Vec<serde_json::Value>>()
                .await
                .map(|rows| rows.len())
                .unwrap_or(0),
            _ => 0,
        }
    }

    pub async fn clear(&self) {
        let result = self
            .request(reqwest::Method::DELETE)
            .query(&[("key", "not.is.null")])
            .send()
            .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, "remote cache clear skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> RemoteStore {
        RemoteStore::new(&RemoteConfig {
            endpoint: server.uri(),
            table: "cache_entries".to_string(),
            service_key: "test-key".to_string(),
        })
        .unwrap()
    }

    fn row_json(key: &str, value: serde_json::Value, ttl_secs: i64) -> serde_json::Value {
        let now = Utc::now();
        json!({
            "key": key,
            "value": value,
            "expires_at": (now + ChronoDuration::seconds(ttl_secs)).to_rfc3339(),
            "tags": ["das"],
            "created_at": now.to_rfc3339(),
        })
    }

    #[tokio::test]
    async fn test_get_hit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cache_entries"))
            .and(query_param("key", "eq.das:42:2024-01"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([row_json("das:42:2024-01", json!({"valor": 71.6}), 3600)])),
            )
            .mount(&server)
            .await;

        let store = store_for(&server);
        let entry = store.get("das:42:2024-01").await.unwrap();
        assert_eq!(entry.data, json!({"valor": 71.6}));
        assert!(!entry.is_expired());
        assert!(entry.has_tag("das"));
    }

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let store = store_for(&server);
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_server_error_degrades_to_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = store_for(&server);
        assert!(store.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_body_degrades_to_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let store = store_for(&server);
        assert!(store.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_set_upserts_and_swallows_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cache_entries"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let store = store_for(&server);
        // Must not panic or error
        store
            .set(
                "k",
                &StoredEntry::new(json!(1), Duration::from_secs(60), vec![]),
            )
            .await;
    }

    #[tokio::test]
    async fn test_invalidate_by_tag_counts_rows() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/cache_entries"))
            .and(query_param("tags", "cs.{\"empresa:42\"}"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{}, {}, {}])))
            .mount(&server)
            .await;

        let store = store_for(&server);
        assert_eq!(store.invalidate_by_tag("empresa:42").await, 3);
    }

    #[tokio::test]
    async fn test_invalidate_by_tag_failure_counts_zero() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let store = store_for(&server);
        assert_eq!(store.invalidate_by_tag("das").await, 0);
    }
}
