//! Tracing subscriber initialisation.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global subscriber writing JSON-formatted events.
///
/// # Errors
///
/// Returns an error if `log_level` is not a valid filter directive or a
/// global subscriber is already installed.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level {log_level:?}"))?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .context("failed to initialise tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_fails() {
        // Whichever call wins installs the subscriber; the other must error.
        let first = init_tracing("debug");
        let second = init_tracing("debug");
        assert!(first.is_err() || second.is_err());
        tracing::debug!(field = "card_number", "subscriber smoke event");
    }
}
