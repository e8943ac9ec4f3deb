//! Purpose-analysis data model
//!
//! The enums here are closed vocabularies shared with the reasoning
//! service's structured-output schema. Each has a lenient parser that maps
//! anything unrecognized to its documented default instead of failing, so
//! an untrusted payload can never break decoding.

use serde::{Deserialize, Serialize};

/// Purpose category, a fixed closed enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Authentication,
    Authorization,
    Security,
    Validation,
    Testing,
    Infrastructure,
    Configuration,
    Deployment,
    Monitoring,
    Logging,
    ErrorHandling,
    DataAccess,
    DataModel,
    Migration,
    Caching,
    Messaging,
    ApiClient,
    ApiEndpoint,
    Routing,
    UiComponent,
    UiState,
    Styling,
    Forms,
    Networking,
    FileIo,
    Serialization,
    Concurrency,
    Performance,
    Algorithm,
    StateManagement,
    EventHandling,
    Utility,
    BusinessLogic,
    DomainModel,
    Internationalization,
    BuildTooling,
    Legacy,
    Unknown,
}

impl Category {
    /// Parse a category label, defaulting to [`Category::Unknown`]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "authentication" | "auth" => Self::Authentication,
            "authorization" => Self::Authorization,
            "security" => Self::Security,
            "validation" => Self::Validation,
            "testing" | "test" => Self::Testing,
            "infrastructure" => Self::Infrastructure,
            "configuration" | "config" => Self::Configuration,
            "deployment" => Self::Deployment,
            "monitoring" => Self::Monitoring,
            "logging" => Self::Logging,
            "error-handling" | "error_handling" => Self::ErrorHandling,
            "data-access" | "data_access" => Self::DataAccess,
            "data-model" | "data_model" => Self::DataModel,
            "migration" => Self::Migration,
            "caching" => Self::Caching,
            "messaging" => Self::Messaging,
            "api-client" | "api_client" | "integration" => Self::ApiClient,
            "api-endpoint" | "api_endpoint" => Self::ApiEndpoint,
            "routing" => Self::Routing,
            "ui-component" | "ui_component" | "ui" => Self::UiComponent,
            "ui-state" | "ui_state" => Self::UiState,
            "styling" => Self::Styling,
            "forms" => Self::Forms,
            "networking" => Self::Networking,
            "file-io" | "file_io" => Self::FileIo,
            "serialization" => Self::Serialization,
            "concurrency" => Self::Concurrency,
            "performance" => Self::Performance,
            "algorithm" => Self::Algorithm,
            "state-management" | "state_management" => Self::StateManagement,
            "event-handling" | "event_handling" => Self::EventHandling,
            "utility" | "util" => Self::Utility,
            "business-logic" | "business_logic" => Self::BusinessLogic,
            "domain-model" | "domain_model" => Self::DomainModel,
            "internationalization" | "i18n" => Self::Internationalization,
            "build-tooling" | "build_tooling" => Self::BuildTooling,
            "legacy" => Self::Legacy,
            _ => Self::Unknown,
        }
    }
}

/// Superficial shape of the analyzed code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodeType {
    Function,
    Class,
    Component,
    RouteHandler,
    Module,
    Test,
    Configuration,
    Script,
    Unknown,
}

impl CodeType {
    /// Parse a code-type label, defaulting to [`CodeType::Unknown`]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "function" => Self::Function,
            "class" => Self::Class,
            "component" => Self::Component,
            "route-handler" | "route_handler" | "handler" => Self::RouteHandler,
            "module" => Self::Module,
            "test" => Self::Test,
            "configuration" | "config" => Self::Configuration,
            "script" => Self::Script,
            _ => Self::Unknown,
        }
    }
}

/// Ordinal complexity estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Complexity {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Complexity {
    /// Parse a complexity label, defaulting to [`Complexity::Medium`]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "very-high" | "very_high" | "veryhigh" => Self::VeryHigh,
            _ => Self::Medium,
        }
    }
}

/// Severity of an identified risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Parse a risk level, defaulting to [`RiskLevel::Medium`]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Medium,
        }
    }

    /// Sort rank: critical first
    fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

/// One identified risk with a suggested mitigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    pub level: RiskLevel,
    pub description: String,
    pub recommendation: String,
}

/// Kind of suggested test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Unit,
    Integration,
    E2e,
    Manual,
}

impl TestType {
    /// Parse a test type, defaulting to [`TestType::Unit`]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "unit" => Self::Unit,
            "integration" => Self::Integration,
            "e2e" | "end-to-end" => Self::E2e,
            "manual" => Self::Manual,
            _ => Self::Unit,
        }
    }
}

/// Priority of a suggested test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestPriority {
    High,
    Medium,
    Low,
}

impl TestPriority {
    /// Parse a priority, defaulting to [`TestPriority::Medium`]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

/// One suggested test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedTest {
    #[serde(rename = "type")]
    pub test_type: TestType,
    pub description: String,
    pub priority: TestPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Which strategy produced the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisSource {
    /// External reasoning service
    Reasoning,
    /// Deterministic offline heuristics
    #[default]
    Heuristic,
}

/// Structured semantic analysis of one code block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurposeAnalysis {
    /// Short prose statement of what the code does
    pub purpose: String,
    /// Closed-vocabulary category
    pub category: Category,
    /// Superficial code shape
    pub code_type: CodeType,
    /// Ordinal complexity estimate
    pub complexity: Complexity,
    /// Referenced modules/packages, insertion order, deduplicated
    pub dependencies: Vec<String>,
    /// Exported identifiers, insertion order, deduplicated
    pub exports: Vec<String>,
    /// Other plausible readings of the code's intent
    pub alternative_purposes: Vec<String>,
    /// Optional explanation of how the analysis was reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Risks sorted critical-first
    pub risks: Vec<Risk>,
    /// Suggested tests, deduplicated and sorted priority-first
    pub suggested_tests: Vec<SuggestedTest>,
    /// Which strategy produced this analysis
    #[serde(default)]
    pub source: AnalysisSource,
}

impl PurposeAnalysis {
    /// Enforce the ordering and dedup invariants both strategies share:
    /// risks critical-first, suggested tests deduplicated by
    /// (type, normalized description) and sorted priority-first.
    pub fn normalize(mut self) -> Self {
        self.risks.sort_by_key(|risk| risk.level.rank());

        let mut seen: std::collections::HashSet<(TestType, String)> =
            std::collections::HashSet::new();
        self.suggested_tests
            .retain(|test| seen.insert((test.test_type, normalize_test_key(&test.description))));
        self.suggested_tests.sort_by_key(|test| test.priority.rank());

        self
    }
}

/// Normalization for test dedup keys: case, surrounding whitespace, interior
/// whitespace runs and a trailing period are not significant.
fn normalize_test_key(description: &str) -> String {
    description
        .trim()
        .trim_end_matches('.')
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
