//! Embedding capability for semantic scoring.
//!
//! The engine never loads a model itself. Callers inject an
//! [`EmbeddingProvider`] through [`Capabilities`]; [`LazyEmbedder`] wraps a
//! loader so the model is created on first use and shared afterwards.
//!
//! # Thread safety
//!
//! Providers are `Send + Sync` and shared behind `Arc`. `LazyEmbedder` holds
//! its model behind a mutex for the whole `embed` call, so concurrent runs
//! (see `compare_algorithms`) take turns on the model.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::MatchError;

pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier, reported in logs and errors.
    fn model_name(&self) -> &str;
    /// One vector per input text, in input order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError>;
}

/// Provider that refuses every request. Stands in when embeddings are off.
pub struct DisabledProvider;

impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError> {
        Err(MatchError::Embedding("embedding provider is disabled".into()))
    }
}

type Loader = Box<dyn Fn() -> Result<Box<dyn EmbeddingProvider>, MatchError> + Send + Sync>;

/// Loads the wrapped provider on first `embed` and keeps it until `unload`.
pub struct LazyEmbedder {
    model: String,
    loader: Loader,
    slot: Mutex<Option<Box<dyn EmbeddingProvider>>>,
}

impl LazyEmbedder {
    pub fn new(
        model: impl Into<String>,
        loader: impl Fn() -> Result<Box<dyn EmbeddingProvider>, MatchError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            model: model.into(),
            loader: Box::new(loader),
            slot: Mutex::new(None),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Drop the loaded model. The next `embed` loads it again.
    pub fn unload(&self) {
        if self.slot.lock().take().is_some() {
            log::info!("unloaded embedding model '{}'", self.model);
        }
    }
}

impl EmbeddingProvider for LazyEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError> {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            log::info!("loading embedding model '{}'", self.model);
            *slot = Some((self.loader)()?);
        }
        match slot.as_ref() {
            Some(provider) => provider.embed(texts),
            None => Err(MatchError::Embedding(format!("model '{}' failed to load", self.model))),
        }
    }
}

/// Optional heavyweight resources handed to a run.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_embedder(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder: Some(embedder),
        }
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("embedder", &self.embedder.as_ref().map(|e| e.model_name().to_string()))
            .finish()
    }
}

/// Cosine similarity in [-1, 1]. Mismatched lengths or zero vectors give 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
