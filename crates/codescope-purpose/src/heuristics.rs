//! Deterministic, offline purpose analysis
//!
//! Works from superficial lexical evidence only: keyword tables, bracket
//! depth, pattern-extracted identifiers. The category rule chain is ordered
//! and first-match-wins; the order is part of the contract and must not be
//! rearranged.

use std::path::Path;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PurposeResult;
use crate::models::{
    AnalysisSource, Category, CodeType, Complexity, PurposeAnalysis, Risk, RiskLevel,
    SuggestedTest, TestPriority, TestType,
};
use crate::summarizer::PurposeStrategy;

/// One entry in the ordered category rule chain
struct CategoryRule {
    category: Category,
    keywords: &'static [&'static str],
}

/// First matching rule wins; evaluated against lowercased code + filename.
/// The order is load-bearing: testing indicators shadow everything, then
/// authentication shadows security, and so on down to the generic buckets.
static CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::Testing,
        keywords: &[
            ".test.", ".spec.", "_test.", "#[test]", "describe(", "it(", "assert", "expect(",
            "mock",
        ],
    },
    CategoryRule {
        category: Category::Authentication,
        keywords: &[
            "login", "logout", "token", "password", "credential", "session", "jwt", "oauth",
            "auth",
        ],
    },
    CategoryRule {
        category: Category::Security,
        keywords: &[
            "encrypt", "decrypt", "sanitize", "escape(", "xss", "csrf", "permission", "crypto",
            "hash",
        ],
    },
    CategoryRule {
        category: Category::Infrastructure,
        keywords: &[
            "dockerfile", "docker", "terraform", "kubernetes", "deploy", "pipeline", "config",
            "env.", "settings",
        ],
    },
    CategoryRule {
        category: Category::UiComponent,
        keywords: &[
            "render", "usestate", "useeffect", "classname", "<div", "stylesheet", "component",
            "onclick", "css",
        ],
    },
    CategoryRule {
        category: Category::DataAccess,
        keywords: &[
            "select ", "insert into", "update ", "repository", "database", "query(", "sql",
            "find_by", "orm",
        ],
    },
    CategoryRule {
        category: Category::ApiClient,
        keywords: &[
            "fetch(", "axios", "http.get", "http.post", "endpoint", "api call", "webhook",
            "request(", "client.",
        ],
    },
    CategoryRule {
        category: Category::Performance,
        keywords: &[
            "cache", "memoize", "throttle", "debounce", "optimize", "batch", "pool", "lazy",
        ],
    },
    CategoryRule {
        category: Category::Legacy,
        keywords: &["deprecated", "legacy", "do not use", "workaround", "fixme"],
    },
    CategoryRule {
        category: Category::Utility,
        keywords: &["util", "helper", "format(", "convert", "parse(", "normalize"],
    },
];

static IMPORT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // ES modules / TypeScript
        r#"import\s+(?:[\w{}\s,*]+\s+from\s+)?['"]([^'"]+)['"]"#,
        // CommonJS
        r#"require\(\s*['"]([^'"]+)['"]\s*\)"#,
        // Python
        r"(?m)^\s*from\s+([\w.]+)\s+import",
        r"(?m)^\s*import\s+([\w.]+)",
        // Rust
        r"(?m)^\s*use\s+([\w:]+)",
        // C / C++
        r#"#include\s*[<"]([^>"]+)[>"]"#,
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static EXPORT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"export\s+(?:default\s+)?(?:async\s+)?(?:function|class|const|let|interface|type|enum)\s+(\w+)",
        r"module\.exports\s*(?:\.\s*(\w+))?",
        r"(?m)^\s*pub\s+(?:async\s+)?(?:fn|struct|enum|trait|const|static)\s+(\w+)",
        r"(?m)^(?:async\s+)?def\s+(\w+)",
        r"(?m)^class\s+(\w+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static FUNCTION_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?:\bfn\s+\w+|\bfunction\b|\bdef\s+\w+|=>\s*[{(]|\bconst\s+\w+\s*=\s*\()").ok()
});

/// Deterministic fallback strategy; requires no external service
#[derive(Debug, Default, Clone)]
pub struct HeuristicStrategy;

impl HeuristicStrategy {
    pub fn new() -> Self {
        Self
    }

    /// Full heuristic pass over one code block
    pub fn analyze(&self, code: &str, path: &Path) -> PurposeAnalysis {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let haystack = format!("{} {file_name}", code.to_lowercase());

        let code_type = detect_code_type(code, &file_name);
        let complexity = estimate_complexity(code);
        let category = assign_category(&haystack, code_type);
        let dependencies = extract_matches(&IMPORT_PATTERNS, code);
        let exports = extract_matches(&EXPORT_PATTERNS, code);

        let analysis = PurposeAnalysis {
            purpose: describe(category, code_type, &file_name),
            category,
            code_type,
            complexity,
            dependencies,
            exports,
            alternative_purposes: alternatives(&haystack, category),
            rationale: Some(
                "Derived offline from lexical patterns; no reasoning service was consulted."
                    .to_string(),
            ),
            risks: assess_risks(&haystack, category, complexity),
            suggested_tests: suggest_tests(category, code_type, complexity),
            source: AnalysisSource::Heuristic,
        };
        analysis.normalize()
    }
}

#[async_trait]
impl PurposeStrategy for HeuristicStrategy {
    async fn summarize(
        &self,
        code: &str,
        path: &Path,
        _recent_commits: &[String],
    ) -> PurposeResult<PurposeAnalysis> {
        Ok(self.analyze(code, path))
    }
}

/// Classify the superficial shape of the code
fn detect_code_type(code: &str, file_name: &str) -> CodeType {
    let lower = code.to_lowercase();

    let test_file = file_name.contains(".test.")
        || file_name.contains(".spec.")
        || file_name.contains("_test.");
    if test_file || lower.contains("#[test]") || lower.contains("describe(") {
        return CodeType::Test;
    }
    if file_name.ends_with(".json")
        || file_name.ends_with(".yaml")
        || file_name.ends_with(".yml")
        || file_name.ends_with(".toml")
        || file_name.ends_with(".ini")
    {
        return CodeType::Configuration;
    }
    if lower.contains("usestate")
        || lower.contains("useeffect")
        || lower.contains("extends react.component")
        || (lower.contains("return") && lower.contains("<div"))
    {
        return CodeType::Component;
    }
    if lower.contains("app.get(")
        || lower.contains("app.post(")
        || lower.contains("router.")
        || lower.contains("#[get(")
        || lower.contains("#[post(")
        || lower.contains("@getmapping")
        || lower.contains("@app.route")
    {
        return CodeType::RouteHandler;
    }
    if lower.contains("class ") || lower.contains("impl ") {
        return CodeType::Class;
    }
    if FUNCTION_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(code))
    {
        return CodeType::Function;
    }
    if lower.contains("#!/") {
        return CodeType::Script;
    }
    CodeType::Unknown
}

/// Weighted lexical complexity score bucketed into 4 ordinal levels
fn estimate_complexity(code: &str) -> Complexity {
    const CONTROL_KEYWORDS: &[&str] = &[
        "if ", "if(", "else", "for ", "for(", "while ", "while(", "switch", "match ", "case ",
        "catch", "except", "when ",
    ];

    let lower = code.to_lowercase();
    let control: usize = CONTROL_KEYWORDS
        .iter()
        .map(|kw| lower.matches(kw).count())
        .sum();
    let logical = lower.matches("&&").count()
        + lower.matches("||").count()
        + lower.matches("??").count();
    let functions = FUNCTION_PATTERN
        .as_ref()
        .map_or(0, |re| re.find_iter(code).count());

    // Max bracket depth over {, (, [
    let mut depth: i32 = 0;
    let mut max_depth: i32 = 0;
    for c in code.chars() {
        match c {
            '{' | '(' | '[' => {
                depth = depth.saturating_add(1);
                max_depth = max_depth.max(depth);
            }
            '}' | ')' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    let score = control
        .saturating_mul(2)
        .saturating_add(logical.saturating_mul(2))
        .saturating_add(functions)
        .saturating_add((max_depth.max(0) as usize).saturating_mul(3));

    if score < 10 {
        Complexity::Low
    } else if score < 25 {
        Complexity::Medium
    } else if score < 50 {
        Complexity::High
    } else {
        Complexity::VeryHigh
    }
}

/// Walk the ordered rule chain; fall through to business-logic for
/// recognizable code shapes and unknown otherwise
fn assign_category(haystack: &str, code_type: CodeType) -> Category {
    for rule in CATEGORY_RULES {
        if rule.keywords.iter().any(|kw| haystack.contains(kw)) {
            return rule.category;
        }
    }
    if matches!(code_type, CodeType::Unknown) {
        Category::Unknown
    } else {
        Category::BusinessLogic
    }
}

fn extract_matches(patterns: &[Regex], code: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut found = Vec::new();
    for pattern in patterns {
        for captures in pattern.captures_iter(code) {
            if let Some(name) = captures.get(1) {
                let name = name.as_str().to_string();
                if !name.is_empty() && seen.insert(name.clone()) {
                    found.push(name);
                }
            }
        }
    }
    found
}

fn describe(category: Category, code_type: CodeType, file_name: &str) -> String {
    let shape = match code_type {
        CodeType::Function => "a function",
        CodeType::Class => "a class or type implementation",
        CodeType::Component => "a UI component",
        CodeType::RouteHandler => "a route handler",
        CodeType::Module => "a module",
        CodeType::Test => "test code",
        CodeType::Configuration => "configuration",
        CodeType::Script => "a script",
        CodeType::Unknown => "a code block",
    };
    let concern = match category {
        Category::Authentication => "handling authentication",
        Category::Security => "security-sensitive processing",
        Category::Testing => "verifying behavior",
        Category::Infrastructure => "infrastructure or configuration concerns",
        Category::UiComponent => "user interface rendering",
        Category::DataAccess => "data persistence or querying",
        Category::ApiClient => "calling an external API",
        Category::Performance => "performance optimization",
        Category::Legacy => "legacy behavior kept for compatibility",
        Category::Utility => "general-purpose utility work",
        Category::BusinessLogic => "application business logic",
        _ => "its surrounding feature",
    };
    if file_name.is_empty() {
        format!("Appears to be {shape} {concern}.")
    } else {
        format!("Appears to be {shape} in {file_name} {concern}.")
    }
}

fn alternatives(haystack: &str, category: Category) -> Vec<String> {
    let mut alternatives = Vec::new();
    // Offer the next matching rule down the chain as a second reading
    for rule in CATEGORY_RULES {
        if rule.category != category && rule.keywords.iter().any(|kw| haystack.contains(kw)) {
            alternatives.push(format!(
                "Could also be {} related",
                category_label(rule.category)
            ));
            if alternatives.len() >= 2 {
                break;
            }
        }
    }
    alternatives
}

fn category_label(category: Category) -> &'static str {
    match category {
        Category::Testing => "testing",
        Category::Authentication => "authentication",
        Category::Security => "security",
        Category::Infrastructure => "infrastructure",
        Category::UiComponent => "UI",
        Category::DataAccess => "data access",
        Category::ApiClient => "API integration",
        Category::Performance => "performance",
        Category::Legacy => "legacy code",
        Category::Utility => "utility",
        _ => "general",
    }
}

fn assess_risks(haystack: &str, category: Category, complexity: Complexity) -> Vec<Risk> {
    let mut risks = Vec::new();

    if haystack.contains("eval(") || haystack.contains("exec(") {
        risks.push(Risk {
            level: RiskLevel::Critical,
            description: "Dynamic code execution detected".to_string(),
            recommendation: "Replace eval/exec with a safe, explicit dispatch".to_string(),
        });
    }
    if matches!(category, Category::Authentication | Category::Security) {
        risks.push(Risk {
            level: RiskLevel::High,
            description: "Changes touch authentication or security-sensitive paths".to_string(),
            recommendation: "Request a security-focused review before merging".to_string(),
        });
    }
    if complexity >= Complexity::High {
        risks.push(Risk {
            level: RiskLevel::Medium,
            description: "High lexical complexity raises regression risk".to_string(),
            recommendation: "Consider splitting into smaller, testable units".to_string(),
        });
    }
    if haystack.contains("todo") || haystack.contains("fixme") {
        risks.push(Risk {
            level: RiskLevel::Low,
            description: "Unresolved TODO/FIXME markers present".to_string(),
            recommendation: "Track the open work before it goes stale".to_string(),
        });
    }
    risks
}

fn suggest_tests(
    category: Category,
    code_type: CodeType,
    complexity: Complexity,
) -> Vec<SuggestedTest> {
    let mut tests = vec![SuggestedTest {
        test_type: TestType::Unit,
        description: "Cover the primary code path with a unit test".to_string(),
        priority: TestPriority::High,
        rationale: None,
    }];

    if matches!(code_type, CodeType::RouteHandler) || matches!(category, Category::ApiClient) {
        tests.push(SuggestedTest {
            test_type: TestType::Integration,
            description: "Exercise the request/response cycle against a stubbed backend"
                .to_string(),
            priority: TestPriority::High,
            rationale: Some("External boundaries fail in ways unit tests cannot see".to_string()),
        });
    }
    if matches!(category, Category::Authentication) {
        tests.push(SuggestedTest {
            test_type: TestType::Integration,
            description: "Verify login, logout and token expiry flows".to_string(),
            priority: TestPriority::High,
            rationale: None,
        });
    }
    if matches!(code_type, CodeType::Component) {
        tests.push(SuggestedTest {
            test_type: TestType::E2e,
            description: "Render the component and assert user-visible behavior".to_string(),
            priority: TestPriority::Medium,
            rationale: None,
        });
    }
    if complexity >= Complexity::High {
        tests.push(SuggestedTest {
            test_type: TestType::Unit,
            description: "Add edge-case coverage for each branch of the control flow".to_string(),
            priority: TestPriority::Medium,
            rationale: None,
        });
    }
    tests
}
