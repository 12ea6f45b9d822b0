//! Interactive prompts with a non-interactive fallback

use super::context::UiContext;
use crate::error::{PlaceboardError, PlaceboardResult};

/// Ask for confirmation. Returns `default` when nobody can answer.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> PlaceboardResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| PlaceboardError::Internal(format!("prompt task failed: {}", e)))?
    .map_err(|e| PlaceboardError::User(format!("Prompt failed: {}", e)))
}

/// Read a password without echo.
///
/// Fails outside a terminal, where `flag` must be given instead.
pub async fn password(ctx: &UiContext, message: &str, flag: &str) -> PlaceboardResult<String> {
    if !ctx.is_interactive() {
        return Err(PlaceboardError::User(format!(
            "No terminal to prompt for a password; pass {}",
            flag
        )));
    }

    let message = message.to_string();
    tokio::task::spawn_blocking(move || cliclack::password(&message).mask('•').interact())
        .await
        .map_err(|e| PlaceboardError::Internal(format!("prompt task failed: {}", e)))?
        .map_err(|e| PlaceboardError::User(format!("Prompt failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn confirm_auto_yes() {
        let ctx = UiContext::non_interactive().with_auto_yes(true);
        assert!(confirm(&ctx, "Delete place 7?", false).await.unwrap());
    }

    #[tokio::test]
    async fn confirm_non_interactive_default() {
        let ctx = UiContext::non_interactive();
        assert!(confirm(&ctx, "Delete place 7?", true).await.unwrap());
        assert!(!confirm(&ctx, "Delete place 7?", false).await.unwrap());
    }

    #[tokio::test]
    async fn password_needs_a_terminal() {
        let ctx = UiContext::non_interactive();
        let err = password(&ctx, "Password", "--password").await.unwrap_err();
        assert!(err.to_string().contains("--password"));
    }
}
