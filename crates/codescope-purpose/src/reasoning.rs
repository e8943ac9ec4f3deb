//! Reasoning-service strategy
//!
//! Sends a bounded excerpt of the code plus recent commit subjects to an
//! external structured-reasoning service and decodes the reply with
//! per-field defaults. The payload is untrusted: every field is validated
//! individually and coerced rather than letting one bad enum value sink the
//! whole analysis.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use codescope_common::{with_retry, with_timeout, RetryPolicy};

use crate::error::{PurposeError, PurposeResult};
use crate::models::{
    AnalysisSource, Category, CodeType, Complexity, PurposeAnalysis, Risk, RiskLevel,
    SuggestedTest, TestPriority, TestType,
};
use crate::summarizer::PurposeStrategy;

/// What gets sent to the reasoning service
#[derive(Debug, Clone)]
pub struct ReasoningRequest {
    /// Model identifier
    pub model: String,
    /// Code excerpt, already capped in length
    pub code_excerpt: String,
    /// File name (for language/extension context)
    pub file_name: String,
    /// Recent commit subjects, newest first, already capped in count
    pub recent_commits: Vec<String>,
}

/// Trait seam for the structured-reasoning service
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Request a structured analysis document for the excerpt
    ///
    /// # Errors
    ///
    /// Returns [`PurposeError`] on transport, service or decoding failure.
    async fn analyze(&self, request: &ReasoningRequest) -> PurposeResult<Value>;
}

const SYSTEM_PROMPT: &str = "You are a code analysis assistant. Reply with a single JSON object \
with fields: purpose (string), category (kebab-case string), codeType (string), complexity \
(low|medium|high|very-high), dependencies (string array), exports (string array), \
alternativePurposes (string array), rationale (string), risks (array of {level, description, \
recommendation}), suggestedTests (array of {type, description, priority, rationale}).";

/// OpenAI-compatible chat-completions implementation of [`ReasoningBackend`]
pub struct ReasoningClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl ReasoningClient {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ReasoningBackend for ReasoningClient {
    #[tracing::instrument(skip(self, request), fields(model = %request.model))]
    async fn analyze(&self, request: &ReasoningRequest) -> PurposeResult<Value> {
        let url = format!(
            "{}/chat/completions",
            self.api_base.trim_end_matches('/')
        );

        let commit_context = if request.recent_commits.is_empty() {
            String::new()
        } else {
            format!("\n\nRecent commits:\n{}", request.recent_commits.join("\n"))
        };
        let user_prompt = format!(
            "Analyze this code from `{}`:{commit_context}\n\n```\n{}\n```",
            request.file_name, request.code_excerpt
        );

        let body = json!({
            "model": request.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt },
            ],
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PurposeError::Service {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let envelope: Value = response.json().await?;
        let content = envelope
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PurposeError::MalformedResponse("no message content in reply".to_string())
            })?;

        serde_json::from_str(content)
            .map_err(|e| PurposeError::MalformedResponse(format!("content is not JSON: {e}")))
    }
}

/// Strategy wrapping a [`ReasoningBackend`] with the pipeline's timeout and
/// retry discipline
pub struct ReasoningStrategy {
    backend: std::sync::Arc<dyn ReasoningBackend>,
    model: String,
    retry: RetryPolicy,
    call_timeout: Duration,
    max_code_chars: usize,
    max_context_commits: usize,
}

impl ReasoningStrategy {
    pub fn new(
        backend: std::sync::Arc<dyn ReasoningBackend>,
        model: impl Into<String>,
        retry: RetryPolicy,
        call_timeout: Duration,
        max_code_chars: usize,
        max_context_commits: usize,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            retry,
            call_timeout,
            max_code_chars,
            max_context_commits,
        }
    }

    fn build_request(&self, code: &str, path: &Path, recent_commits: &[String]) -> ReasoningRequest {
        ReasoningRequest {
            model: self.model.clone(),
            code_excerpt: truncate_excerpt(code, self.max_code_chars),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            recent_commits: recent_commits
                .iter()
                .take(self.max_context_commits)
                .cloned()
                .collect(),
        }
    }
}

#[async_trait]
impl PurposeStrategy for ReasoningStrategy {
    async fn summarize(
        &self,
        code: &str,
        path: &Path,
        recent_commits: &[String],
    ) -> PurposeResult<PurposeAnalysis> {
        let request = self.build_request(code, path, recent_commits);
        let document = with_retry(&self.retry, "reasoning-call", || {
            with_timeout(
                self.call_timeout,
                "reasoning-call",
                self.backend.analyze(&request),
            )
        })
        .await?;

        Ok(decode_analysis(&document))
    }
}

/// Hard cap on the excerpt, truncating the tail
pub fn truncate_excerpt(code: &str, max_chars: usize) -> String {
    if code.chars().count() <= max_chars {
        code.to_string()
    } else {
        code.chars().take(max_chars).collect()
    }
}

/// Decode a reasoning-service document into [`PurposeAnalysis`]
///
/// Explicit parse-with-defaults per field: unrecognized category maps to
/// unknown, unrecognized complexity to medium, non-array list fields to
/// empty sequences. Entries without a description are dropped.
pub fn decode_analysis(document: &Value) -> PurposeAnalysis {
    let analysis = PurposeAnalysis {
        purpose: string_field(document, "purpose")
            .unwrap_or_else(|| "No purpose could be determined".to_string()),
        category: string_field(document, "category")
            .map_or(Category::Unknown, |raw| Category::parse_lenient(&raw)),
        code_type: string_field(document, "codeType")
            .map_or(CodeType::Unknown, |raw| CodeType::parse_lenient(&raw)),
        complexity: string_field(document, "complexity")
            .map_or(Complexity::Medium, |raw| Complexity::parse_lenient(&raw)),
        dependencies: string_list(document, "dependencies"),
        exports: string_list(document, "exports"),
        alternative_purposes: string_list(document, "alternativePurposes"),
        rationale: string_field(document, "rationale"),
        risks: decode_risks(document),
        suggested_tests: decode_tests(document),
        source: AnalysisSource::Reasoning,
    };
    analysis.normalize()
}

fn string_field(document: &Value, key: &str) -> Option<String> {
    document
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(std::string::ToString::to_string)
}

fn string_list(document: &Value, key: &str) -> Vec<String> {
    document
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(std::string::ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn decode_risks(document: &Value) -> Vec<Risk> {
    document
        .get("risks")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let description = string_field(item, "description")?;
                    Some(Risk {
                        level: string_field(item, "level")
                            .map_or(RiskLevel::Medium, |raw| RiskLevel::parse_lenient(&raw)),
                        description,
                        recommendation: string_field(item, "recommendation").unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn decode_tests(document: &Value) -> Vec<SuggestedTest> {
    document
        .get("suggestedTests")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let description = string_field(item, "description")?;
                    Some(SuggestedTest {
                        test_type: string_field(item, "type")
                            .map_or(TestType::Unit, |raw| TestType::parse_lenient(&raw)),
                        description,
                        priority: string_field(item, "priority")
                            .map_or(TestPriority::Medium, |raw| {
                                TestPriority::parse_lenient(&raw)
                            }),
                        rationale: string_field(item, "rationale"),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
