use async_trait::async_trait;
use meshflow_core::config::{EmbeddingConfig, EmbeddingProviderKind};
use meshflow_core::embedding::deterministic_embedding;
use meshflow_core::error::{ErrorCode, MeshflowError};
use meshflow_core::metrics::LinkMetrics;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Text to fixed-length vector. Never fails: implementations degrade to a
/// deterministic vector of the same dimension instead.
pub trait EmbeddingProvider: Send + Sync {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Vec<f32>>;

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Vec<Vec<f32>>> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await);
            }
            out
        })
    }

    fn dimensions(&self) -> usize;
}

pub struct DeterministicEmbedder {
    dims: usize,
    model_id: String,
}

impl DeterministicEmbedder {
    pub fn new(dims: usize) -> Self {
        Self::with_model(dims, "embedding-default-v1")
    }

    pub fn with_model(dims: usize, model_id: impl Into<String>) -> Self {
        Self {
            dims: dims.max(1),
            model_id: model_id.into(),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        deterministic_embedding(text, &self.model_id, self.dims)
    }
}

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        Self::new(768)
    }
}

impl EmbeddingProvider for DeterministicEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Vec<f32>> {
        Box::pin(async move { self.vector(text) })
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),
    #[error("embedding endpoint rejected credentials ({0})")]
    Unauthorized(u16),
    #[error("embedding quota exhausted")]
    QuotaExhausted,
    #[error("embedding API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("embedding transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("embedding response had {got} vectors for {expected} inputs")]
    IncompleteResponse { expected: usize, got: usize },
}

impl MeshflowError for EmbeddingError {
    fn error_code(&self) -> ErrorCode {
        match self {
            EmbeddingError::DimensionMismatch { .. } => ErrorCode::InvalidArgument,
            EmbeddingError::IncompleteResponse { .. } => ErrorCode::Internal,
            _ => ErrorCode::Unavailable,
        }
    }
}

/// A remote model that may fail. Wrap it in [`ResilientEmbedder`] before use.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn try_embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    async fn try_embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.try_embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Client for OpenAI-compatible `/v1/embeddings` endpoints.
#[derive(Clone)]
pub struct HttpEmbeddingBackend {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: EmbeddingInput<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EmbeddingInput<'a> {
    Single(&'a str),
    Batch(&'a [String]),
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl HttpEmbeddingBackend {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            dimensions: config.dimensions,
        })
    }

    async fn request(&self, input: EmbeddingInput<'_>, expected: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut request = self.client.post(&self.url).json(&EmbeddingRequest {
            model: &self.model,
            input,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(match code {
                401 | 403 => EmbeddingError::Unauthorized(code),
                429 => EmbeddingError::QuotaExhausted,
                _ => {
                    let message = serde_json::from_str::<ErrorResponse>(&body)
                        .ok()
                        .and_then(|err| err.error)
                        .map(|detail| detail.message)
                        .unwrap_or(body);
                    EmbeddingError::Api {
                        status: code,
                        message,
                    }
                }
            });
        }

        let mut data = response.json::<EmbeddingResponse>().await?.data;
        if data.len() != expected {
            return Err(EmbeddingError::IncompleteResponse {
                expected,
                got: data.len(),
            });
        }
        data.sort_by_key(|d| d.index);

        let embeddings: Vec<Vec<f32>> = data.into_iter().map(|d| d.embedding).collect();
        for embedding in &embeddings {
            if embedding.len() != self.dimensions {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimensions,
                    got: embedding.len(),
                });
            }
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingBackend for HttpEmbeddingBackend {
    async fn try_embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut embeddings = self.request(EmbeddingInput::Single(text), 1).await?;
        Ok(embeddings.remove(0))
    }

    async fn try_embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(EmbeddingInput::Batch(texts), texts.len()).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Bounded wait on a backend; any failure yields the deterministic fallback.
pub struct ResilientEmbedder {
    backend: Arc<dyn EmbeddingBackend>,
    fallback: DeterministicEmbedder,
    timeout: Duration,
    metrics: Option<LinkMetrics>,
}

impl ResilientEmbedder {
    pub fn new(backend: Arc<dyn EmbeddingBackend>, timeout: Duration) -> Self {
        let fallback = DeterministicEmbedder::with_model(backend.dimensions(), backend.model_name());
        Self {
            backend,
            fallback,
            timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: LinkMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, EmbeddingError>>,
    ) -> Result<T, EmbeddingError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| EmbeddingError::Timeout(self.timeout))?
    }

    fn record(&self, fell_back: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_embedding(fell_back);
        }
    }
}

impl EmbeddingProvider for ResilientEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Vec<f32>> {
        Box::pin(async move {
            let result = self.bounded(self.backend.try_embed(text)).await.and_then(|v| {
                if v.len() == self.fallback.dimensions() {
                    Ok(v)
                } else {
                    Err(EmbeddingError::DimensionMismatch {
                        expected: self.fallback.dimensions(),
                        got: v.len(),
                    })
                }
            });
            match result {
                Ok(embedding) => {
                    self.record(false);
                    embedding
                }
                Err(err) => {
                    tracing::warn!(
                        model = self.backend.model_name(),
                        error = %err,
                        "Embedding backend failed, using deterministic fallback"
                    );
                    self.record(true);
                    self.fallback.vector(text)
                }
            }
        })
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Vec<Vec<f32>>> {
        Box::pin(async move {
            match self.bounded(self.backend.try_embed_batch(texts)).await {
                Ok(embeddings)
                    if embeddings.len() == texts.len()
                        && embeddings
                            .iter()
                            .all(|e| e.len() == self.fallback.dimensions()) =>
                {
                    for _ in texts {
                        self.record(false);
                    }
                    embeddings
                }
                outcome => {
                    match outcome {
                        Err(err) => tracing::warn!(
                            model = self.backend.model_name(),
                            error = %err,
                            "Batch embedding failed, using deterministic fallback"
                        ),
                        Ok(_) => tracing::warn!(
                            model = self.backend.model_name(),
                            "Batch embedding returned malformed vectors, using deterministic fallback"
                        ),
                    }
                    // One bounded attempt per batch; no per-text retries.
                    texts
                        .iter()
                        .map(|text| {
                            self.record(true);
                            self.fallback.vector(text)
                        })
                        .collect()
                }
            }
        })
    }

    fn dimensions(&self) -> usize {
        self.fallback.dimensions()
    }
}

/// Builds the provider selected by configuration.
pub fn provider_from_config(
    config: &EmbeddingConfig,
    metrics: Option<LinkMetrics>,
) -> Arc<dyn EmbeddingProvider> {
    match config.provider {
        EmbeddingProviderKind::Deterministic => Arc::new(DeterministicEmbedder::with_model(
            config.dimensions,
            config.model.clone(),
        )),
        EmbeddingProviderKind::Http => match HttpEmbeddingBackend::from_config(config) {
            Ok(backend) => {
                let mut embedder = ResilientEmbedder::new(
                    Arc::new(backend),
                    Duration::from_millis(config.timeout_ms.max(1)),
                );
                if let Some(metrics) = metrics {
                    embedder = embedder.with_metrics(metrics);
                }
                Arc::new(embedder)
            }
            Err(err) => {
                tracing::warn!(error = %err, "HTTP embedding backend unavailable, using deterministic embeddings");
                Arc::new(DeterministicEmbedder::with_model(
                    config.dimensions,
                    config.model.clone(),
                ))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingBackend for FailingBackend {
        async fn try_embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EmbeddingError::QuotaExhausted)
        }

        fn dimensions(&self) -> usize {
            16
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    struct SlowBackend;

    #[async_trait]
    impl EmbeddingBackend for SlowBackend {
        async fn try_embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![1.0; 8])
        }

        fn dimensions(&self) -> usize {
            8
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    struct WrongDimsBackend;

    #[async_trait]
    impl EmbeddingBackend for WrongDimsBackend {
        async fn try_embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0; 3])
        }

        fn dimensions(&self) -> usize {
            8
        }

        fn model_name(&self) -> &str {
            "wrong-dims"
        }
    }

    fn unit_norm(v: &[f32]) -> bool {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        (norm - 1.0).abs() < 1e-4
    }

    #[tokio::test]
    async fn failing_backend_falls_back_to_stable_vector() {
        let metrics = LinkMetrics::default();
        let embedder = ResilientEmbedder::new(
            Arc::new(FailingBackend {
                calls: AtomicUsize::new(0),
            }),
            Duration::from_secs(1),
        )
        .with_metrics(metrics.clone());

        let a = embedder.embed("same text").await;
        let b = embedder.embed("same text").await;
        assert_eq!(a.len(), 16);
        assert_eq!(a, b);
        assert!(unit_norm(&a));
        assert_eq!(metrics.snapshot().embedding_requests, 2);
        assert!((metrics.snapshot().embedding_fallback_rate - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out_into_fallback() {
        let embedder = ResilientEmbedder::new(Arc::new(SlowBackend), Duration::from_millis(50));
        let v = embedder.embed("slow").await;
        assert_eq!(v.len(), 8);
        assert!(unit_norm(&v));
    }

    #[tokio::test]
    async fn wrong_dimension_response_is_rejected() {
        let embedder = ResilientEmbedder::new(Arc::new(WrongDimsBackend), Duration::from_secs(1));
        let v = embedder.embed("x").await;
        assert_eq!(v.len(), 8);
    }

    #[tokio::test]
    async fn batch_failure_falls_back_without_retrying() {
        let backend = Arc::new(FailingBackend {
            calls: AtomicUsize::new(0),
        });
        let metrics = LinkMetrics::default();
        let embedder =
            ResilientEmbedder::new(backend.clone(), Duration::from_secs(1)).with_metrics(metrics.clone());
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let out = embedder.embed_batch(&texts).await;

        assert_eq!(out.len(), 3);
        assert_ne!(out[0], out[1]);
        assert_eq!(out[2], embedder.fallback.vector("c"));
        // The batch attempt stops at the first failure and nothing is retried.
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.snapshot().embedding_requests, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_batch_waits_for_one_timeout_only() {
        let embedder = ResilientEmbedder::new(Arc::new(SlowBackend), Duration::from_millis(50));
        let texts: Vec<String> = (0..5).map(|i| format!("text {}", i)).collect();

        let started = tokio::time::Instant::now();
        let out = embedder.embed_batch(&texts).await;

        assert_eq!(out.len(), 5);
        assert!(out.iter().all(|v| v.len() == 8 && unit_norm(v)));
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn deterministic_provider_has_configured_dimensions() {
        let config = EmbeddingConfig {
            dimensions: 32,
            ..Default::default()
        };
        let provider = provider_from_config(&config, None);
        assert_eq!(provider.dimensions(), 32);
        assert_eq!(provider.embed("hello").await.len(), 32);
    }
}
