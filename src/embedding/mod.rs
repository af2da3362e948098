//! Embedding Client — typed HTTP-JSON client over the remote embedding
//! service. Treated as an external collaborator: only its contract is
//! specified here (§4.2).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::embedding::EmbeddingServiceConfig;
use crate::error::{DriftError, DriftResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityOverlap {
    pub has_overlap: bool,
    pub overlap_score: f32,
    pub shared_entities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftAnalysisFlags {
    pub current_is_question: bool,
    pub previous_is_question: bool,
    pub current_has_anaphoric_ref: bool,
    pub has_topic_return_signal: bool,
    pub entity_overlap: EntityOverlap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftAnalysis {
    pub raw_similarity: f32,
    pub boosted_similarity: f32,
    pub boost_multiplier: f32,
    pub boosts_applied: Vec<String>,
    pub analysis: DriftAnalysisFlags,
}

impl DriftAnalysis {
    /// The non-fatal fallback used when the analysis endpoint fails:
    /// raw cosine, no boosts, no linguistic flags.
    pub fn fallback(raw_similarity: f32) -> Self {
        Self {
            raw_similarity,
            boosted_similarity: raw_similarity,
            boost_multiplier: 1.0,
            boosts_applied: Vec::new(),
            analysis: DriftAnalysisFlags::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model: Option<String>,
    pub dimension: Option<usize>,
}

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str, preprocess: bool) -> DriftResult<Vec<f32>>;
    async fn similarity(&self, t1: &str, t2: &str, preprocess: bool) -> DriftResult<f32>;
    async fn analyze_drift(
        &self,
        current: &str,
        previous: &str,
        current_embedding: &[f32],
        branch_centroid: &[f32],
    ) -> DriftResult<DriftAnalysis>;
    async fn health(&self) -> DriftResult<HealthStatus>;
}

/// HTTP-JSON client with a keep-alive connection pool, matching the contract
/// in §4.2. `/embed` failures are fatal (`Unavailable`); `analyze-drift`
/// failures are handled by the caller via `analyze_drift`'s `Result` — the
/// classifier, not this client, decides to fall back (§4.2 failure policy).
pub struct HttpEmbeddingClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpEmbeddingClient {
    pub fn new(config: &EmbeddingServiceConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .expect("failed to build embedding HTTP client");

        Self {
            http,
            base_url: config.base_url.clone(),
        }
    }

    /// `/embed` is retried once on a transient transport failure before the
    /// caller sees `Unavailable` — mirrors the batch embedding manager's
    /// retry-before-fatal posture.
    async fn embed_with_retry(&self, text: &str, preprocess: bool) -> DriftResult<Vec<f32>> {
        match self.embed_once(text, preprocess).await {
            Ok(v) => Ok(v),
            Err(first_err) => {
                warn!("embed request failed, retrying once: {}", first_err);
                self.embed_once(text, preprocess).await.map_err(|e| {
                    DriftError::unavailable(format!(
                        "embedding service unavailable after retry: {}",
                        e
                    ))
                })
            }
        }
    }

    async fn embed_once(&self, text: &str, preprocess: bool) -> DriftResult<Vec<f32>> {
        #[derive(Serialize)]
        struct Req<'a> {
            text: &'a str,
            preprocess: bool,
        }
        #[derive(Deserialize)]
        struct Resp {
            embedding: Vec<f32>,
        }

        let body: Resp = self.post_json("/embed", &Req { text, preprocess }).await?;
        Ok(body.embedding)
    }

    /// POST `body` as JSON to `{base_url}{path}`, surfacing a non-2xx status
    /// or a transport/decode failure as `Unavailable`. Shared by every
    /// endpoint in §4.2's contract.
    async fn post_json<Req: Serialize + Sync, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> DriftResult<Resp> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(DriftError::unavailable(format!(
                "{} returned status {}",
                path,
                resp.status()
            )));
        }

        Ok(resp.json().await?)
    }

    async fn get_json<Resp: for<'de> Deserialize<'de>>(&self, path: &str) -> DriftResult<Resp> {
        let resp = self.http.get(format!("{}{}", self.base_url, path)).send().await?;

        if !resp.status().is_success() {
            return Err(DriftError::unavailable(format!(
                "{} returned status {}",
                path,
                resp.status()
            )));
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str, preprocess: bool) -> DriftResult<Vec<f32>> {
        debug!("embedding {} chars (preprocess={})", text.len(), preprocess);
        self.embed_with_retry(text, preprocess).await
    }

    async fn similarity(&self, t1: &str, t2: &str, preprocess: bool) -> DriftResult<f32> {
        #[derive(Serialize)]
        struct Req<'a> {
            text1: &'a str,
            text2: &'a str,
            preprocess: bool,
        }
        #[derive(Deserialize)]
        struct Resp {
            similarity: f32,
        }

        let body: Resp = self
            .post_json(
                "/similarity",
                &Req {
                    text1: t1,
                    text2: t2,
                    preprocess,
                },
            )
            .await?;
        Ok(body.similarity)
    }

    async fn analyze_drift(
        &self,
        current: &str,
        previous: &str,
        current_embedding: &[f32],
        branch_centroid: &[f32],
    ) -> DriftResult<DriftAnalysis> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            current: &'a str,
            previous: &'a str,
            current_embedding: &'a [f32],
            branch_centroid: &'a [f32],
        }

        self.post_json(
            "/analyze-drift",
            &Req {
                current,
                previous,
                current_embedding,
                branch_centroid,
            },
        )
        .await
    }

    async fn health(&self) -> DriftResult<HealthStatus> {
        self.get_json("/health").await
    }
}
