//! Vision-model analysis: the inference seam, the reply contract and the
//! background task that ties them together.

mod inference;
pub mod mock;
pub mod parser;
mod prompt;
mod task;
mod types;

pub use inference::{GeminiClient, InferenceService};
pub use mock::{MockInference, MockReply};
pub use parser::parse;
pub use prompt::ANALYSIS_PROMPT;
pub use task::{
    AnalysisOutcome, AnalysisSettings, AnalysisSignal, AnalysisTask, AnalysisTaskHandle, TaskId,
};
pub use types::{
    AnalysisResult, CategoryBucket, CategoryLabel, ComponentCategory, ComponentDistribution,
};
