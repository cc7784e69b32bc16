#[cfg(test)]
mod tests {
    use crate::config::{RetryPolicy, ValidationConfig};
    use crate::repair::*;
    use crate::schema::{ComponentSchema, SchemaRegistry};
    use crate::validate::{ValidationEngine, MISSING_COMPONENT_ID};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const MISSING_ID: &str = r#"{"items":[{"type":"button"}]}"#;
    const FIXED: &str = r#"{"items":[{"type":"button","componentNodeId":"20:1"}]}"#;

    /// Replays canned responses and records every request.
    #[derive(Default)]
    struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<String, GeneratorError>>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<Result<String, GeneratorError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, i: usize) -> GenerationRequest {
            self.requests.lock().unwrap()[i].clone()
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse, GeneratorError> {
            self.requests.lock().unwrap().push(request.clone());
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GeneratorError::Unknown("script exhausted".to_string())));
            next.map(|content| GenerationResponse {
                content,
                retry_count: 0,
            })
        }
    }

    /// Always answers with a new, still-invalid layout.
    #[derive(Default)]
    struct StubbornGenerator {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Generator for StubbornGenerator {
        async fn complete(&self, _request: &GenerationRequest) -> Result<GenerationResponse, GeneratorError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GenerationResponse {
                content: format!(r#"{{"items":[{{"type":"button","name":"attempt {}"}}]}}"#, n),
                retry_count: 0,
            })
        }
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_schemas(vec![ComponentSchema::new("20:1", "Button")])
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REPAIR LOOP
    // ═══════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn test_valid_layout_never_calls_generator() {
        let engine = ValidationEngine::default();
        let generator = ScriptedGenerator::default();

        let outcome = validate_with_retry(&engine, r#"{"items":[]}"#, None, Some(&generator)).await;

        assert!(outcome.result.is_valid);
        assert_eq!(outcome.validation_runs, 1);
        assert_eq!(outcome.fix_attempts, 0);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_accepted_fix_is_revalidated() {
        let engine = ValidationEngine::default();
        let registry = registry();
        let generator = ScriptedGenerator::new(vec![Ok(format!(
            "Here is the corrected layout:\n```json\n{}\n```",
            FIXED
        ))]);

        let outcome = RepairSession::new(&engine)
            .with_scanner(&registry)
            .with_generator(&generator)
            .run(MISSING_ID)
            .await;

        assert!(outcome.result.is_valid);
        assert_eq!(outcome.final_json, FIXED);
        assert_eq!(outcome.fix_attempts, 1);
        assert_eq!(outcome.validation_runs, 2);

        let request = generator.request(0);
        assert_eq!(request.temperature, FIX_TEMPERATURE);
        assert!(request.system_prompt.is_some());
        assert!(request.prompt.contains(MISSING_ID));
        assert!(request.prompt.contains(&format!("- {}:", MISSING_COMPONENT_ID)));
    }

    #[tokio::test]
    async fn test_repair_loop_is_bounded() {
        let engine = ValidationEngine::new(ValidationConfig {
            max_retries: 2,
            ..ValidationConfig::default()
        });
        let generator = StubbornGenerator::default();

        let outcome = validate_with_retry(&engine, MISSING_ID, None, Some(&generator)).await;

        assert!(!outcome.result.is_valid);
        assert_eq!(outcome.validation_runs, 3);
        assert_eq!(outcome.fix_attempts, 2);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
        assert!(outcome.final_json.contains("attempt 1"));
    }

    #[tokio::test]
    async fn test_generator_failure_returns_last_result() {
        let engine = ValidationEngine::default();
        let generator = ScriptedGenerator::new(vec![Err(GeneratorError::Server("503".to_string()))]);

        let outcome = validate_with_retry(&engine, MISSING_ID, None, Some(&generator)).await;

        assert!(!outcome.result.is_valid);
        assert!(outcome.result.has_code(MISSING_COMPONENT_ID));
        assert_eq!(outcome.final_json, MISSING_ID);
        assert_eq!(outcome.validation_runs, 1);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_or_non_json_fix_is_rejected() {
        let engine = ValidationEngine::default();
        let generator = ScriptedGenerator::new(vec![Ok(MISSING_ID.to_string())]);
        let outcome = validate_with_retry(&engine, MISSING_ID, None, Some(&generator)).await;
        assert_eq!(outcome.fix_attempts, 0);
        assert_eq!(outcome.validation_runs, 1);

        let generator = ScriptedGenerator::new(vec![Ok("I cannot help with that.".to_string())]);
        let outcome = validate_with_retry(&engine, MISSING_ID, None, Some(&generator)).await;
        assert_eq!(outcome.fix_attempts, 0);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_generator_or_auto_fix_disabled() {
        let engine = ValidationEngine::default();
        let outcome = validate_with_retry(&engine, MISSING_ID, None, None).await;
        assert_eq!(outcome.validation_runs, 1);
        assert!(!outcome.result.is_valid);

        let disabled = ValidationEngine::new(ValidationConfig {
            auto_fix_enabled: false,
            ..ValidationConfig::default()
        });
        let generator = ScriptedGenerator::new(vec![Ok(FIXED.to_string())]);
        let outcome = validate_with_retry(&disabled, MISSING_ID, None, Some(&generator)).await;
        assert_eq!(outcome.validation_runs, 1);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_unfixable_errors_skip_generator() {
        let engine = ValidationEngine::default();
        let generator = ScriptedGenerator::new(vec![Ok(FIXED.to_string())]);

        let outcome = validate_with_retry(&engine, r#"{"items":[{"text":"no type"}]}"#, None, Some(&generator)).await;

        assert!(!outcome.result.is_valid);
        assert!(!outcome.result.auto_fix_available);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_review_adds_suggestion_without_changing_validity() {
        let engine = ValidationEngine::new(ValidationConfig {
            enable_ai_validation: true,
            ..ValidationConfig::default()
        });
        let generator = ScriptedGenerator::new(vec![Ok(
            "EVALUATION: Pass\nSCORE: 90\nISSUES: none\nSUGGESTIONS: Add a header".to_string(),
        )]);

        let outcome = RepairSession::new(&engine)
            .with_generator(&generator)
            .with_original_request("An inbox screen")
            .run(r#"{"items":[]}"#)
            .await;

        assert!(outcome.result.is_valid);
        assert_eq!(outcome.result.suggestions, vec!["Add a header"]);
        assert_eq!(generator.calls(), 1);
        let request = generator.request(0);
        assert_eq!(request.temperature, REVIEW_TEMPERATURE);
        assert!(request.prompt.contains("An inbox screen"));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSPORT RETRIES
    // ═══════════════════════════════════════════════════════════════════════════

    fn policy(max_retries: u32, retry_delay_ms: u64, timeout_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            retry_delay_ms,
            timeout_ms,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_backs_off_linearly() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let (value, retries) = with_retry(&policy(3, 1000, 30_000), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(GeneratorError::RateLimited("429".to_string()))
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(retries, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_times_out() {
        let calls = AtomicU32::new(0);

        let err = with_retry(&policy(1, 10, 100), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, GeneratorError>(())
            }
        })
        .await
        .unwrap_err();

        assert_eq!(err, GeneratorError::Network("request timed out after 100 ms".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_retry_stops_on_auth_errors() {
        let calls = AtomicU32::new(0);

        let err = with_retry(&policy(5, 0, 1000), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(GeneratorError::Auth("401".to_string())) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.code(), "AUTH_ERROR");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrying_generator_reports_retry_count() {
        let inner = ScriptedGenerator::new(vec![
            Err(GeneratorError::Network("fetch failed".to_string())),
            Ok("{}".to_string()),
        ]);
        let generator = RetryingGenerator::new(inner, policy(2, 50, 1000));

        let response = generator
            .complete(&GenerationRequest::new("hello", 0.5))
            .await
            .unwrap();

        assert_eq!(response.content, "{}");
        assert_eq!(response.retry_count, 1);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // HELPERS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_classify_transport_messages() {
        assert_eq!(GeneratorError::classify("HTTP 429 Too Many Requests").code(), "RATE_LIMIT");
        assert_eq!(GeneratorError::classify("Invalid API key").code(), "AUTH_ERROR");
        assert_eq!(GeneratorError::classify("fetch failed").code(), "NETWORK_ERROR");
        assert_eq!(GeneratorError::classify("502 Bad Gateway").code(), "SERVER_ERROR");
        assert_eq!(GeneratorError::classify("response blocked").code(), "CONTENT_FILTERED");
        assert_eq!(GeneratorError::classify("something odd").code(), "UNKNOWN_ERROR");

        assert!(GeneratorError::classify("quota exceeded").retryable());
        assert!(!GeneratorError::Auth("x".to_string()).retryable());
        assert!(!GeneratorError::ContentFiltered("x".to_string()).retryable());
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(extract_json("noise {\"a\": {\"b\": 1}} trailing"), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json("no braces here"), None);
    }

    #[test]
    fn test_fix_prompt_lists_only_fixable_errors() {
        let engine = ValidationEngine::default();
        let result = engine.validate(r#"{"items":[{"type":"button"},{"text":"x"}]}"#, None);

        let prompt = build_fix_prompt("{}", &result);

        assert!(prompt.contains("MISSING_COMPONENT_ID"));
        assert!(!prompt.contains("MISSING_TYPE"));
        assert!(prompt.contains("(at items[0].componentNodeId)"));
    }
}
