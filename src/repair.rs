//! Generator client plumbing and the validate → fix → re-validate loop.
//!
//! Two retry layers live here and never mix:
//!
//! - `with_retry` retries one transport call (timeouts, rate limits, 5xx)
//! - `validate_with_retry` asks the generator to repair invalid JSON, bounded by
//!   `ValidationConfig::max_retries`

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

use crate::config::RetryPolicy;
use crate::schema::Scanner;
use crate::validate::{ValidationEngine, ValidationResult};

lazy_static! {
    static ref JSON_OBJECT_RE: Regex = Regex::new(r"\{[\s\S]*\}").unwrap();
}

pub const FIX_TEMPERATURE: f64 = 0.1;
pub const REVIEW_TEMPERATURE: f64 = 0.3;

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATOR ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error or timeout: {0}")]
    Network(String),

    #[error("Generator server error: {0}")]
    Server(String),

    #[error("Content was blocked by safety filters: {0}")]
    ContentFiltered(String),

    #[error("Generator error: {0}")]
    Unknown(String),
}

impl GeneratorError {
    pub fn code(&self) -> &'static str {
        match self {
            GeneratorError::RateLimited(_) => "RATE_LIMIT",
            GeneratorError::Auth(_) => "AUTH_ERROR",
            GeneratorError::Network(_) => "NETWORK_ERROR",
            GeneratorError::Server(_) => "SERVER_ERROR",
            GeneratorError::ContentFiltered(_) => "CONTENT_FILTERED",
            GeneratorError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    pub fn retryable(&self) -> bool {
        !matches!(self, GeneratorError::Auth(_) | GeneratorError::ContentFiltered(_))
    }

    /// Map a free-form transport failure message onto the taxonomy.
    pub fn classify(message: &str) -> GeneratorError {
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
        let message = message.to_string();

        if has(&["429", "quota", "rate limit"]) {
            GeneratorError::RateLimited(message)
        } else if has(&["401", "403", "api key", "unauthorized"]) {
            GeneratorError::Auth(message)
        } else if has(&["timeout", "network", "fetch"]) {
            GeneratorError::Network(message)
        } else if has(&["500", "502", "503", "server"]) {
            GeneratorError::Server(message)
        } else if has(&["safety", "blocked"]) {
            GeneratorError::ContentFiltered(message)
        } else {
            GeneratorError::Unknown(message)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATOR CONTRACT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, temperature: f64) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub content: String,
    /// Transport retries spent producing this response.
    #[serde(default)]
    pub retry_count: u32,
}

/// An external text generator (an LLM endpoint).
#[async_trait]
pub trait Generator: Send + Sync {
    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse, GeneratorError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSPORT RETRIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Run `call` under the policy's timeout, retrying retryable failures with a linear
/// backoff. Returns the value and the number of retries it took.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut call: F) -> Result<(T, u32), GeneratorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GeneratorError>>,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            tracing::debug!(attempt, max = policy.max_retries, "retrying generator call");
            tokio::time::sleep(policy.delay_for(attempt)).await;
        }

        let outcome = match tokio::time::timeout(policy.timeout(), call()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(GeneratorError::Network(format!(
                "request timed out after {} ms",
                policy.timeout_ms
            ))),
        };

        match outcome {
            Ok(value) => return Ok((value, attempt)),
            Err(e) if e.retryable() && attempt < policy.max_retries => {
                tracing::warn!(code = e.code(), attempt, "generator call failed: {}", e);
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(code = e.code(), attempt, "generator call failed: {}", e);
                return Err(e);
            }
        }
    }
}

/// Wraps a generator with transport retries.
pub struct RetryingGenerator<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: Generator> RetryingGenerator<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<G: Generator> Generator for RetryingGenerator<G> {
    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse, GeneratorError> {
        let (mut response, retries) = with_retry(&self.policy, move || self.inner.complete(request)).await?;
        response.retry_count += retries;
        Ok(response)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROMPTS
// ═══════════════════════════════════════════════════════════════════════════════

const FIX_SYSTEM_PROMPT: &str =
    "You repair UI layout JSON. Respond with the corrected JSON object only.";

pub fn build_fix_prompt(json: &str, result: &ValidationResult) -> String {
    let errors: Vec<String> = result
        .fixable_errors()
        .map(|e| format!("- {}: {} (at {})", e.code, e.message, e.path))
        .collect();
    format!(
        "The following JSON has validation errors that need to be fixed:\n\n\
         ORIGINAL JSON:\n{}\n\n\
         ERRORS TO FIX:\n{}\n\n\
         Please provide the corrected JSON that fixes these errors while maintaining the \
         original intent. Return ONLY the corrected JSON, no explanations.",
        json,
        errors.join("\n")
    )
}

pub fn build_review_prompt(json: &str, original_request: &str) -> String {
    format!(
        "You are a UX design expert. Please analyze this JSON layout and provide feedback.\n\n\
         ORIGINAL USER REQUEST:\n{}\n\n\
         GENERATED JSON:\n{}\n\n\
         Please evaluate:\n\
         1. Does the JSON match the user's request?\n\
         2. Are there any UX problems or missing elements?\n\
         3. Is the layout logical and well-structured?\n\
         4. Any suggestions for improvement?\n\n\
         Respond in this format:\n\
         EVALUATION: [Pass/Fail]\n\
         SCORE: [0-100]\n\
         ISSUES: [List any problems]\n\
         SUGGESTIONS: [List improvements]",
        original_request, json
    )
}

/// Outermost `{ ... }` span of a generator response.
pub fn extract_json(content: &str) -> Option<&str> {
    JSON_OBJECT_RE
        .find(content)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

fn review_suggestions(content: &str) -> Option<String> {
    content
        .split_once("SUGGESTIONS:")
        .map(|(_, rest)| rest.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ═══════════════════════════════════════════════════════════════════════════════
// REPAIR LOOP
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairOutcome {
    pub result: ValidationResult,
    pub final_json: String,
    /// Fixes accepted from the generator.
    pub fix_attempts: u32,
    pub validation_runs: u32,
}

/// Inputs that stay fixed for one repair session.
#[derive(Clone, Copy)]
pub struct RepairSession<'a> {
    pub engine: &'a ValidationEngine,
    pub scanner: Option<&'a dyn Scanner>,
    pub generator: Option<&'a dyn Generator>,
    /// The user's request, needed for the optional review pass.
    pub original_request: Option<&'a str>,
}

impl<'a> RepairSession<'a> {
    pub fn new(engine: &'a ValidationEngine) -> Self {
        Self {
            engine,
            scanner: None,
            generator: None,
            original_request: None,
        }
    }

    pub fn with_scanner(mut self, scanner: &'a dyn Scanner) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn with_generator(mut self, generator: &'a dyn Generator) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_original_request(mut self, request: &'a str) -> Self {
        self.original_request = Some(request);
        self
    }

    async fn validate(&self, json: &str) -> ValidationResult {
        let mut result = self.engine.validate(json, self.scanner);
        if self.engine.config().enable_ai_validation {
            if let (Some(generator), Some(request)) = (self.generator, self.original_request) {
                if let Some(suggestion) = self.review(generator, json, request).await {
                    result.suggestions.push(suggestion);
                }
            }
        }
        result
    }

    async fn review(&self, generator: &dyn Generator, json: &str, request: &str) -> Option<String> {
        let prompt = GenerationRequest::new(build_review_prompt(json, request), REVIEW_TEMPERATURE);
        match generator.complete(&prompt).await {
            Ok(response) => review_suggestions(&response.content),
            Err(e) => {
                tracing::warn!(code = e.code(), "layout review failed: {}", e);
                None
            }
        }
    }

    async fn attempt_fix(&self, generator: &dyn Generator, json: &str, result: &ValidationResult) -> Option<String> {
        if result.fixable_errors().next().is_none() {
            return None;
        }
        let request = GenerationRequest::new(build_fix_prompt(json, result), FIX_TEMPERATURE)
            .with_system_prompt(FIX_SYSTEM_PROMPT);
        match generator.complete(&request).await {
            Ok(response) => extract_json(&response.content).map(str::to_string),
            Err(e) => {
                tracing::warn!(code = e.code(), "auto-fix request failed: {}", e);
                None
            }
        }
    }

    /// Validate, and while the result is invalid and fixable, ask the generator for a
    /// corrected document. Validation runs at most `max_retries + 1` times and the
    /// generator is never asked to fix a valid result.
    pub async fn run(&self, json: &str) -> RepairOutcome {
        let config = self.engine.config();
        let mut current = json.to_string();
        let mut attempt: u32 = 0;
        let mut runs: u32 = 0;

        loop {
            let result = self.validate(&current).await;
            runs += 1;

            let generator = match self.generator {
                Some(g) if !result.is_valid && config.auto_fix_enabled => g,
                _ => {
                    return RepairOutcome {
                        result,
                        final_json: current,
                        fix_attempts: attempt,
                        validation_runs: runs,
                    }
                }
            };

            if result.auto_fix_available && attempt < config.max_retries {
                tracing::info!(retry = attempt + 1, max = config.max_retries, "attempting auto-fix");
                if let Some(fixed) = self.attempt_fix(generator, &current, &result).await {
                    if fixed != current {
                        current = fixed;
                        attempt += 1;
                        continue;
                    }
                }
            }

            return RepairOutcome {
                result,
                final_json: current,
                fix_attempts: attempt,
                validation_runs: runs,
            };
        }
    }
}

/// Run the repair loop with the given collaborators.
pub async fn validate_with_retry(
    engine: &ValidationEngine,
    json: &str,
    scanner: Option<&dyn Scanner>,
    generator: Option<&dyn Generator>,
) -> RepairOutcome {
    let mut session = RepairSession::new(engine);
    session.scanner = scanner;
    session.generator = generator;
    session.run(json).await
}
