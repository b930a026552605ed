// web-server/src/state.rs
use common::{Config, Verifier, VerifierError};

/// Shared application state handed to every worker
pub struct AppState {
    /// `None` when no usable bot token is configured; verification then fails closed
    pub verifier: Option<Verifier>,
}

impl AppState {
    pub fn new(verifier: Option<Verifier>) -> Self {
        Self { verifier }
    }

    /// Build the verifier from configuration, logging why it is unavailable
    pub fn from_config(config: &Config) -> Self {
        let verifier = match config.bot_token() {
            Some(token) => match Verifier::new(token) {
                Ok(verifier) => Some(
                    verifier
                        .with_max_age(config.max_auth_age_seconds)
                        .require_user(config.require_user),
                ),
                Err(e) => {
                    tracing::error!("Failed to initialise init data verifier: {}", e);
                    None
                }
            },
            None => {
                tracing::error!(
                    "{}; set BOT_TOKEN or APP_BOT_TOKEN. Init data verification will fail",
                    VerifierError::MissingSecret
                );
                None
            }
        };

        if let Some(verifier) = &verifier {
            tracing::info!(
                "Init data verifier ready (max age {}s)",
                verifier.max_age_seconds()
            );
        }

        Self { verifier }
    }
}
