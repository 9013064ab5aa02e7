use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bist_models::PromptingMode;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::GenerationError;

/// One text-generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Short label used in logs and by test doubles ("synthesis", "judge", ...).
    pub purpose: String,
    pub system: String,
    pub prompt: String,
    pub mode: PromptingMode,
}

impl GenerationRequest {
    pub fn new(
        purpose: impl Into<String>,
        system: impl Into<String>,
        prompt: impl Into<String>,
        mode: PromptingMode,
    ) -> Self {
        Self {
            purpose: purpose.into(),
            system: system.into(),
            prompt: prompt.into(),
            mode,
        }
    }
}

/// A text generation backend. Mockable for testing.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Configuration for a CLI-backed generator.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub command: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            timeout: Duration::from_secs(90),
        }
    }
}

/// Generator that shells out to a prompt-in, text-out CLI.
pub struct CliGenerator {
    config: CliConfig,
}

impl CliGenerator {
    pub fn new(config: CliConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Generator for CliGenerator {
    fn name(&self) -> &str {
        &self.config.command
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        debug!(
            command = %self.config.command,
            model = %self.config.model,
            purpose = %request.purpose,
            "Invoking generation CLI"
        );

        let result = tokio::time::timeout(self.config.timeout, async {
            Command::new(&self.config.command)
                .args([
                    "-p",
                    &request.prompt,
                    "--system-prompt",
                    &request.system,
                    "--model",
                    &self.config.model,
                    "--output-format",
                    "text",
                ])
                .kill_on_drop(true)
                .output()
                .await
        })
        .await
        .map_err(|_| GenerationError::Timeout(self.config.timeout.as_secs()))?
        .map_err(|e| {
            GenerationError::Config(format!("failed to spawn {}: {e}", self.config.command))
        })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            warn!(status = %result.status, stderr = %stderr, "Generation CLI failed");
            return Err(classify_cli_failure(&stderr, &result.status.to_string()));
        }

        let stdout = String::from_utf8_lossy(&result.stdout).to_string();
        if stdout.trim().is_empty() {
            return Err(GenerationError::Empty);
        }

        Ok(stdout)
    }
}

/// Map CLI stderr to an error kind. Rate-limit wording becomes `Quota` so the
/// throttle backs off instead of failing the run.
fn classify_cli_failure(stderr: &str, status: &str) -> GenerationError {
    let lowered = stderr.to_lowercase();
    let quota_markers = ["rate limit", "rate_limit", "quota", "429", "overloaded"];
    if quota_markers.iter().any(|m| lowered.contains(m)) {
        GenerationError::Quota {
            detail: stderr.trim().to_string(),
            retry_after: None,
        }
    } else {
        GenerationError::Transport(format!("exited {status}: {}", stderr.trim()))
    }
}

/// Check if a generation CLI is available on the system.
pub async fn check_cli_available(command: &str) -> bool {
    match Command::new(command).arg("--version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// Retry and concurrency policy shared by every caller of one backend.
#[derive(Debug, Clone)]
pub struct ThrottlePolicy {
    pub max_concurrent: usize,
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            max_attempts: 4,
            base_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// Wraps a generator with a concurrency cap and exponential backoff on
/// quota and transport errors. Cloning shares the permit pool.
#[derive(Clone)]
pub struct ThrottledGenerator {
    inner: Arc<dyn Generator>,
    permits: Arc<Semaphore>,
    policy: ThrottlePolicy,
}

impl ThrottledGenerator {
    pub fn new(inner: Arc<dyn Generator>, policy: ThrottlePolicy) -> Self {
        let permits = Arc::new(Semaphore::new(policy.max_concurrent.max(1)));
        Self {
            inner,
            permits,
            policy,
        }
    }

    fn next_delay(&self, current: Duration, error: &GenerationError) -> Duration {
        let hinted = match error {
            GenerationError::Quota {
                retry_after: Some(after),
                ..
            } => *after,
            _ => current,
        };
        hinted.max(current).min(self.policy.max_backoff)
    }
}

#[async_trait]
impl Generator for ThrottledGenerator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delay = self.policy.base_backoff;
        let mut attempt = 1;

        loop {
            let result = {
                let _permit = self
                    .permits
                    .acquire()
                    .await
                    .map_err(|_| GenerationError::Config("throttle closed".to_string()))?;
                self.inner.generate(request).await
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let wait = self.next_delay(delay, &e);
                    warn!(
                        backend = %self.inner.name(),
                        purpose = %request.purpose,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Generation failed, backing off"
                    );
                    tokio::time::sleep(wait).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FlakyGenerator, StubGenerator};

    fn fast_policy(max_attempts: u32) -> ThrottlePolicy {
        ThrottlePolicy {
            max_concurrent: 2,
            max_attempts,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        }
    }

    #[test]
    fn default_cli_config() {
        let config = CliConfig::default();
        assert_eq!(config.command, "claude");
        assert_eq!(config.timeout, Duration::from_secs(90));
    }

    #[test]
    fn rate_limit_stderr_is_quota() {
        let err = classify_cli_failure("Error: 429 Too Many Requests", "exit status: 1");
        assert!(matches!(err, GenerationError::Quota { .. }));

        let err = classify_cli_failure("API quota exhausted", "exit status: 1");
        assert!(matches!(err, GenerationError::Quota { .. }));

        let err = classify_cli_failure("unknown flag --foo", "exit status: 2");
        assert!(matches!(err, GenerationError::Transport(_)));
    }

    #[tokio::test]
    async fn missing_binary_is_config_error() {
        let generator = CliGenerator::new(CliConfig {
            command: "definitely-not-a-real-binary-xyz".to_string(),
            ..CliConfig::default()
        });
        let request = GenerationRequest::new("synthesis", "sys", "hi", PromptingMode::ZeroShot);
        let err = generator.generate(&request).await.unwrap_err();
        assert!(matches!(err, GenerationError::Config(_)));
    }

    #[tokio::test]
    async fn throttle_retries_quota_errors() {
        let flaky = Arc::new(FlakyGenerator::new(2, "tamam"));
        let throttled = ThrottledGenerator::new(flaky.clone(), fast_policy(4));
        let request = GenerationRequest::new("synthesis", "sys", "hi", PromptingMode::FewShot);

        let text = throttled.generate(&request).await.unwrap();
        assert_eq!(text, "tamam");
        assert_eq!(flaky.calls(), 3);
    }

    #[tokio::test]
    async fn throttle_gives_up_after_max_attempts() {
        let flaky = Arc::new(FlakyGenerator::new(10, "tamam"));
        let throttled = ThrottledGenerator::new(flaky.clone(), fast_policy(3));
        let request = GenerationRequest::new("synthesis", "sys", "hi", PromptingMode::FewShot);

        let err = throttled.generate(&request).await.unwrap_err();
        assert!(matches!(err, GenerationError::Quota { .. }));
        assert_eq!(flaky.calls(), 3);
    }

    #[tokio::test]
    async fn throttle_does_not_retry_empty_responses() {
        let stub = Arc::new(StubGenerator::failing(GenerationError::Empty));
        let throttled = ThrottledGenerator::new(stub.clone(), fast_policy(4));
        let request = GenerationRequest::new("synthesis", "sys", "hi", PromptingMode::FewShot);

        assert_eq!(
            throttled.generate(&request).await.unwrap_err(),
            GenerationError::Empty
        );
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn throttle_caps_concurrency() {
        let stub = Arc::new(StubGenerator::fixed("ok").with_delay(Duration::from_millis(20)));
        let throttled = ThrottledGenerator::new(stub.clone(), fast_policy(1));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let throttled = throttled.clone();
            handles.push(tokio::spawn(async move {
                let request =
                    GenerationRequest::new("judge", "sys", "hi", PromptingMode::ZeroShot);
                throttled.generate(&request).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(stub.calls(), 6);
        assert!(stub.max_in_flight() <= 2);
    }
}
