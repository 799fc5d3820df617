//! Retrieval-augmented estimation pipeline
//!
//! ```text
//! task text ──► Embedder ──► ReferenceStore::nearest_references (top 3)
//!                                   │
//!                       few-shot examples appended
//!                                   ▼
//! system prompt + ack + feature ──► Generator ──► parse + normalize ──► Estimate
//! ```
//!
//! The total cost is always derived from the normalized sub-tasks.

use super::normalize::{parse_estimation, ParseError, ResponseShape};
use super::prompt::{self, ACKNOWLEDGEMENT};
use crate::llm::{Embedder, Generator, LlmError, Turn};
use crate::types::{SimilarEstimation, SubTask};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Number of reference estimations spliced into the prompt.
pub const DEFAULT_TOP_K: usize = 3;

/// Nearest-neighbour lookup over saved reference estimations.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Up to `limit` references ordered by ascending cosine distance.
    async fn nearest_references(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SimilarEstimation>, sqlx::Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum EstimationError {
    #[error("{0} is required.")]
    MissingField(&'static str),
    #[error("Failed to generate embedding: {0}")]
    Embedding(#[source] LlmError),
    #[error("Failed to get estimation from AI: {0}")]
    Generation(#[source] LlmError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Failed to query reference estimations: {0}")]
    Store(#[source] sqlx::Error),
}

/// Normalized model answer.
#[derive(Debug, Clone, Serialize)]
pub struct Estimation {
    #[serde(rename = "subTasks")]
    pub sub_tasks: Vec<SubTask>,
    pub cost: f64,
}

/// Result of a single generation call.
#[derive(Debug, Clone, Serialize)]
pub struct Estimate {
    pub estimation: Estimation,
    /// System prompt actually sent, examples included
    pub prompt: String,
    #[serde(rename = "rawResponse")]
    pub raw_response: String,
}

/// Input of the full retrieval-augmented flow.
#[derive(Debug, Clone, Default)]
pub struct EstimateRequest {
    pub task_description: String,
    pub project_context: Option<String>,
    /// Falls back to the pipeline's default prompt when blank
    pub system_prompt: Option<String>,
}

/// Estimate plus the references that shaped it.
#[derive(Debug, Clone)]
pub struct AugmentedEstimate {
    pub estimate: Estimate,
    pub references: Vec<SimilarEstimation>,
    /// Set when retrieval failed and the estimate ran without examples
    pub retrieval_error: Option<String>,
}

#[derive(Clone)]
pub struct EstimationPipeline {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    references: Arc<dyn ReferenceStore>,
    top_k: usize,
    default_prompt: String,
}

impl EstimationPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        references: Arc<dyn ReferenceStore>,
    ) -> Self {
        Self {
            embedder,
            generator,
            references,
            top_k: DEFAULT_TOP_K,
            default_prompt: prompt::default_system_prompt(prompt::DEFAULT_LANGUAGE),
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    #[must_use]
    pub fn with_default_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.default_prompt = prompt.into();
        self
    }

    pub fn default_prompt(&self) -> &str {
        &self.default_prompt
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    /// Embed text for storage or lookup.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EstimationError> {
        let start = Instant::now();
        let vector = self.embedder.embed(text).await.map_err(|e| {
            warn!(model = self.embedder.model_name(), error = %e, "Embedding call failed");
            EstimationError::Embedding(e)
        })?;
        debug!(
            dims = vector.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Embedded text"
        );
        Ok(vector)
    }

    /// Reference estimations closest to `text`.
    pub async fn find_similar(&self, text: &str) -> Result<Vec<SimilarEstimation>, EstimationError> {
        require(text, "featureDescription")?;
        let embedding = self.embed(text).await?;
        let similar = self
            .references
            .nearest_references(&embedding, self.top_k)
            .await
            .map_err(EstimationError::Store)?;
        debug!(found = similar.len(), limit = self.top_k, "Reference lookup complete");
        Ok(similar)
    }

    /// One generation call with a caller-supplied prompt.
    pub async fn estimate(
        &self,
        system_prompt: &str,
        feature_description: &str,
    ) -> Result<Estimate, EstimationError> {
        require(feature_description, "featureDescription")?;
        require(system_prompt, "systemPrompt")?;

        let turns = [
            Turn::user(system_prompt),
            Turn::model(ACKNOWLEDGEMENT),
            Turn::user(feature_description),
        ];

        let start = Instant::now();
        let raw = self.generator.generate(&turns).await.map_err(|e| {
            warn!(model = self.generator.model_name(), error = %e, "Generation call failed");
            EstimationError::Generation(e)
        })?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let parsed = parse_estimation(&raw).map_err(|e| {
            warn!(raw_len = raw.len(), error = %e, "Model output could not be parsed");
            e
        })?;

        if let Some(reported) = parsed.reported_cost {
            if (reported - parsed.cost).abs() > 1e-6 {
                debug!(reported, derived = parsed.cost, "Model total differs from derived cost");
            }
        }
        if parsed.shape == ResponseShape::UserStories {
            debug!("Model answered with nested userStories layout");
        }

        info!(
            model = self.generator.model_name(),
            sub_tasks = parsed.sub_tasks.len(),
            cost = parsed.cost,
            elapsed_ms,
            "Estimation generated"
        );

        Ok(Estimate {
            estimation: Estimation {
                sub_tasks: parsed.sub_tasks,
                cost: parsed.cost,
            },
            prompt: system_prompt.to_string(),
            raw_response: raw,
        })
    }

    /// Full flow: retrieve references, build the few-shot prompt, generate.
    ///
    /// Retrieval uses the bare task text; generation receives it wrapped with
    /// the project context. A failed lookup degrades to a zero-shot prompt.
    pub async fn estimate_with_references(
        &self,
        request: &EstimateRequest,
    ) -> Result<AugmentedEstimate, EstimationError> {
        require(&request.task_description, "taskDescription")?;

        let (references, retrieval_error) = match self.find_similar(&request.task_description).await {
            Ok(found) => (found, None),
            Err(e) => {
                warn!(error = %e, "Reference retrieval failed, estimating without examples");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let base = request
            .system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(&self.default_prompt);
        let system_prompt = prompt::augment_prompt(base, &references);
        let feature = prompt::compose_feature_description(
            request.project_context.as_deref(),
            &request.task_description,
        );

        let estimate = self.estimate(&system_prompt, &feature).await?;

        Ok(AugmentedEstimate {
            estimate,
            references,
            retrieval_error,
        })
    }
}

pub(crate) fn require(value: &str, field: &'static str) -> Result<(), EstimationError> {
    if value.trim().is_empty() {
        Err(EstimationError::MissingField(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
            Ok(vec![0.5; 4])
        }
        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct RecordingGenerator {
        reply: String,
        seen: Mutex<Vec<Turn>>,
    }

    #[async_trait]
    impl Generator for RecordingGenerator {
        async fn generate(&self, turns: &[Turn]) -> Result<String, LlmError> {
            self.seen.lock().unwrap().extend_from_slice(turns);
            Ok(self.reply.clone())
        }
        fn model_name(&self) -> &str {
            "recording"
        }
    }

    struct NoReferences;

    #[async_trait]
    impl ReferenceStore for NoReferences {
        async fn nearest_references(
            &self,
            _embedding: &[f32],
            _limit: usize,
        ) -> Result<Vec<SimilarEstimation>, sqlx::Error> {
            Ok(Vec::new())
        }
    }

    fn pipeline(reply: &str) -> (EstimationPipeline, Arc<RecordingGenerator>) {
        let generator = Arc::new(RecordingGenerator {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let p = EstimationPipeline::new(Arc::new(FixedEmbedder), generator.clone(), Arc::new(NoReferences));
        (p, generator)
    }

    #[tokio::test]
    async fn test_estimate_sends_three_turns() {
        let (p, generator) = pipeline(r#"{"subTasks":[{"task":"a","days":2}],"cost":5}"#);
        let est = p.estimate("be an estimator", "build login").await.unwrap();

        let seen = generator.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                Turn::user("be an estimator"),
                Turn::model(ACKNOWLEDGEMENT),
                Turn::user("build login"),
            ]
        );
        assert_eq!(est.estimation.cost, 2.0);
        assert_eq!(est.prompt, "be an estimator");
    }

    #[tokio::test]
    async fn test_estimate_requires_both_fields() {
        let (p, _) = pipeline("{}");
        assert!(matches!(
            p.estimate("prompt", "  ").await,
            Err(EstimationError::MissingField("featureDescription"))
        ));
        assert!(matches!(
            p.estimate("", "feature").await,
            Err(EstimationError::MissingField("systemPrompt"))
        ));
    }

    #[tokio::test]
    async fn test_estimate_surfaces_parse_errors() {
        let (p, _) = pipeline("not json");
        assert!(matches!(
            p.estimate("prompt", "feature").await,
            Err(EstimationError::Parse(ParseError::InvalidJson { .. }))
        ));
    }

    #[tokio::test]
    async fn test_augmented_estimate_uses_default_prompt_and_context() {
        let (p, generator) = pipeline(r#"{"subTasks":[]}"#);
        let request = EstimateRequest {
            task_description: "Add export".into(),
            project_context: Some("CRM".into()),
            system_prompt: None,
        };
        let out = p.estimate_with_references(&request).await.unwrap();

        assert!(out.references.is_empty());
        assert!(out.retrieval_error.is_none());
        assert_eq!(out.estimate.prompt, p.default_prompt());

        let seen = generator.seen.lock().unwrap().clone();
        assert_eq!(seen[2].text, "Project Context:\nCRM\n\nTask to Estimate:\nAdd export");
    }

    #[test]
    fn test_top_k_is_at_least_one() {
        let (p, _) = pipeline("{}");
        assert_eq!(p.top_k(), DEFAULT_TOP_K);
        assert_eq!(p.with_top_k(0).top_k(), 1);
    }
}
