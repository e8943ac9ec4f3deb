//! Semantic purpose analysis for a block of code
//!
//! Two interchangeable strategies behind one contract: a reasoning-service
//! strategy that asks an external model for structured output, and a
//! deterministic heuristic strategy that needs nothing but the code text.
//! Strategy selection is explicit (credential-driven) and the heuristic
//! path is infallible, so summarization as a whole never hard-fails.

pub mod error;
pub mod heuristics;
pub mod models;
pub mod reasoning;
pub mod summarizer;

pub use error::{PurposeError, PurposeResult};
pub use heuristics::HeuristicStrategy;
pub use models::{
    Category, CodeType, Complexity, PurposeAnalysis, Risk, RiskLevel, SuggestedTest, TestPriority,
    TestType,
};
pub use reasoning::{ReasoningBackend, ReasoningClient, ReasoningRequest, ReasoningStrategy};
pub use summarizer::{PurposeProvider, PurposeStrategy, Summarizer};
