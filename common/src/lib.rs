pub mod config;
pub mod init_data;
pub mod models;
pub mod secret;
pub mod utils;

pub use self::config::{Config, StaticFilesConfig};
pub use init_data::{
    InvalidReason, ValidatedInitData, VerificationResult, Verifier, VerifierError,
};
pub use secret::SecretString;
pub use utils::*;
