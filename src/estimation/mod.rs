//! Estimation core: response normalization, prompt building, the
//! retrieval-augmented pipeline and story suggestions.

pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod stories;

pub use normalize::{parse_estimation, total_cost, ParseError, ParsedEstimation};
pub use pipeline::{
    AugmentedEstimate, Estimate, EstimateRequest, EstimationError, EstimationPipeline,
    ReferenceStore,
};
pub use stories::StorySuggestion;
