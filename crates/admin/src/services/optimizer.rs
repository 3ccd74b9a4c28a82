//! Token-gated optimization runs.

use sqlx::PgPool;
use tracing::instrument;

use crate::db::ShopUserRepository;
use crate::error::AppError;
use crate::llm::LlmClient;
use crate::optimization::{FocusArea, OptimizationResult, parse_optimization_result};

/// Longest prompt accepted from the client, in characters.
pub const MAX_PROMPT_CHARS: usize = 20_000;

/// A completed optimization run.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    /// Raw model reply.
    pub raw: String,
    /// Fields parsed from the reply.
    pub result: OptimizationResult,
    /// Token balance after the run.
    pub tokens: i32,
}

/// Runs optimizations for one shop, one token each.
pub struct OptimizerService<'a> {
    pool: &'a PgPool,
    llm: &'a LlmClient,
}

impl<'a> OptimizerService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, llm: &'a LlmClient) -> Self {
        Self { pool, llm }
    }

    /// Consume a token, run `prompt` through the model and parse the reply.
    ///
    /// The token is refunded if the model call fails.
    ///
    /// # Errors
    ///
    /// - `AppError::BadRequest` for an empty or oversized prompt
    /// - `AppError::InsufficientTokens` when the balance is exhausted
    /// - `AppError::Llm` when the model call fails
    #[instrument(skip(self, prompt), fields(prompt_chars = tracing::field::Empty))]
    pub async fn run(
        &self,
        shop: &str,
        prompt: &str,
        fields: &[FocusArea],
    ) -> Result<OptimizationOutcome, AppError> {
        validate_prompt(prompt)?;
        tracing::Span::current().record("prompt_chars", prompt.chars().count());

        let users = ShopUserRepository::new(self.pool);
        let tokens = users
            .consume_token(shop)
            .await?
            .ok_or(AppError::InsufficientTokens)?;

        let raw = match self.llm.complete(prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                match users.refund_token(shop).await {
                    Ok(balance) => tracing::info!(balance, "Refunded token after model failure"),
                    Err(refund) => tracing::error!(error = %refund, "Failed to refund token"),
                }
                return Err(e.into());
            }
        };

        let requested = if fields.is_empty() { &FocusArea::ALL[..] } else { fields };
        let result = parse_optimization_result(&raw, requested);
        if result.is_empty() {
            tracing::warn!("Model reply contained no recognizable fields");
        }

        Ok(OptimizationOutcome { raw, result, tokens })
    }
}

fn validate_prompt(prompt: &str) -> Result<(), AppError> {
    if prompt.trim().is_empty() {
        return Err(AppError::BadRequest("Missing prompt".to_string()));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(AppError::BadRequest(format!(
            "Prompt must be at most {MAX_PROMPT_CHARS} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_prompt_rejected() {
        assert!(matches!(validate_prompt("   "), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_oversized_prompt_rejected() {
        let prompt = "א".repeat(MAX_PROMPT_CHARS + 1);
        assert!(matches!(validate_prompt(&prompt), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_reasonable_prompt_accepted() {
        assert!(validate_prompt("שפר את המוצר").is_ok());
        assert!(validate_prompt(&"a".repeat(MAX_PROMPT_CHARS)).is_ok());
    }
}
