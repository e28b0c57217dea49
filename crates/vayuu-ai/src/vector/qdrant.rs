//! Qdrant REST client

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{Payload, ScoredPoint, VectorIndex};
use crate::error::{AiError, Result};
use crate::http_client::build_http_client;

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";
pub const DEFAULT_COLLECTION: &str = "vayuu_memory";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct QdrantIndex {
    client: Client,
    base_url: String,
    collection: String,
    dimension: usize,
    api_key: Option<String>,
    closed: AtomicBool,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Payload>,
}

impl QdrantIndex {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>, dimension: usize) -> Self {
        Self {
            client: build_http_client(REQUEST_TIMEOUT),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            dimension,
            api_key: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Send `api-key` with every request (Qdrant Cloud).
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.is_empty()).then_some(api_key);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AiError::VectorIndex("index closed".to_string()));
        }
        Ok(())
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<reqwest::Response> {
        let response = self.authorize(request).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AiError::VectorIndex(format!(
            "Qdrant {} failed ({}): {}",
            action, status, body
        )))
    }
}

fn point_id_to_string(id: Value) -> String {
    match id {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self) -> Result<()> {
        self.check_open()?;
        let url = self.collection_url();
        let response = self.authorize(self.client.get(&url)).send().await?;

        match response.status() {
            status if status.is_success() => {
                debug!(collection = %self.collection, "Qdrant collection exists");
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                let body = json!({
                    "vectors": {"size": self.dimension, "distance": "Cosine"}
                });
                self.send(self.client.put(&url).json(&body), "create collection")
                    .await?;
                info!(
                    collection = %self.collection,
                    dimension = self.dimension,
                    "Created Qdrant collection"
                );
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AiError::VectorIndex(format!(
                    "Qdrant collection check failed ({}): {}",
                    status, body
                )))
            }
        }
    }

    async fn upsert(&self, id: &str, vector: Vec<f32>, payload: Payload) -> Result<()> {
        self.check_open()?;
        let body = json!({
            "points": [{"id": id, "vector": vector, "payload": payload}]
        });
        let url = format!("{}/points?wait=true", self.collection_url());
        self.send(self.client.put(url).json(&body), "upsert").await?;
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        self.check_open()?;
        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        let url = format!("{}/points/search", self.collection_url());
        let response = self.send(self.client.post(url).json(&body), "search").await?;
        let data: SearchResponse = response.json().await?;

        let mut hits: Vec<ScoredPoint> = data
            .result
            .into_iter()
            .map(|hit| ScoredPoint {
                id: point_id_to_string(hit.id),
                score: hit.score,
                payload: hit.payload.unwrap_or_default(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(hits)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.check_open()?;
        let body = json!({"points": [id]});
        let url = format!("{}/points/delete", self.collection_url());
        self.send(self.client.post(url).json(&body), "delete").await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(collection = %self.collection, "Qdrant client closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_ensure_collection_creates_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/vayuu_memory"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/collections/vayuu_memory"))
            .and(body_json(json!({"vectors": {"size": 768, "distance": "Cosine"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
            .expect(1)
            .mount(&server)
            .await;

        let index = QdrantIndex::new(server.uri(), DEFAULT_COLLECTION, 768);
        index.ensure_collection().await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_collection_existing_is_noop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/vayuu_memory"))
            .and(header("api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let index = QdrantIndex::new(server.uri(), DEFAULT_COLLECTION, 768).with_api_key("secret");
        index.ensure_collection().await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_and_search() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/collections/mem/points"))
            .and(query_param("wait", "true"))
            .and(body_json(json!({
                "points": [{"id": "p1", "vector": [1.0, 0.0], "payload": {"content": "hi"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collections/mem/points/search"))
            .and(body_json(json!({"vector": [1.0, 0.0], "limit": 3, "with_payload": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    {"id": 7, "score": 0.4, "payload": {"content": "other"}},
                    {"id": "p1", "score": 0.9, "payload": {"content": "hi"}}
                ],
                "status": "ok"
            })))
            .mount(&server)
            .await;

        let index = QdrantIndex::new(server.uri(), "mem", 2);
        let mut payload = Payload::new();
        payload.insert("content".to_string(), json!("hi"));
        index.upsert("p1", vec![1.0, 0.0], payload).await.unwrap();

        let hits = index.search(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "p1");
        assert_eq!(hits[0].payload["content"], "hi");
        assert_eq!(hits[1].id, "7");
    }

    #[tokio::test]
    async fn test_delete_and_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/mem/points/delete"))
            .and(body_json(json!({"points": ["p1"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collections/mem/points/search"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let index = QdrantIndex::new(server.uri(), "mem", 2);
        index.delete("p1").await.unwrap();

        let err = index.search(&[0.0, 1.0], 1).await.unwrap_err();
        assert!(matches!(err, AiError::VectorIndex(msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn test_closed_index_rejects_calls() {
        let index = QdrantIndex::new("http://127.0.0.1:9", "mem", 2);
        index.close().await.unwrap();
        index.close().await.unwrap();
        assert!(index.delete("p1").await.is_err());
    }
}
