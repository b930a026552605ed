// common/src/init_data.rs
//! Verification of the signed init data the host platform hands to the Mini App.
//!
//! The host signs the form-encoded payload with a key derived from the bot
//! token. The check is:
//!
//! 1. drop the `hash` field and render the remaining non-empty fields as
//!    `key=value`, sorted by key and joined with `\n` (the data-check string);
//! 2. `signing_key = HMAC_SHA256(key = "WebAppData", msg = bot_token)`;
//! 3. `hash == hex(HMAC_SHA256(key = signing_key, msg = data_check_string))`;
//! 4. `now - auth_date <= max_age`.
use std::fmt;

use chrono::Utc;
use hmac::{Hmac, Mac};
use percent_encoding::percent_decode_str;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use url::form_urlencoded;

use crate::secret::SecretString;

type HmacSha256 = Hmac<Sha256>;

/// Key used to derive the signing key from the bot token
pub const WEB_APP_DATA_LABEL: &str = "WebAppData";
/// Default freshness window (24 hours)
pub const DEFAULT_MAX_AGE_SECONDS: u64 = 86400;

const HASH_FIELD: &str = "hash";
const AUTH_DATE_FIELD: &str = "auth_date";
const USER_FIELD: &str = "user";
const QUERY_ID_FIELD: &str = "query_id";
const START_PARAM_FIELD: &str = "start_param";

/// Why a payload was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidReason {
    #[error("init data has no hash field")]
    MissingSignature,
    #[error("init data signature does not match")]
    BadSignature,
    #[error("init data has no usable auth_date")]
    MissingAuthDate,
    #[error("init data is older than the freshness window")]
    Stale,
    #[error("init data user field is missing or malformed")]
    MalformedUser,
    #[error("init data could not be processed")]
    InternalError,
}

impl InvalidReason {
    /// Machine-readable code returned to API clients
    pub fn code(&self) -> &'static str {
        match self {
            InvalidReason::MissingSignature => "missing-signature",
            InvalidReason::BadSignature => "bad-signature",
            InvalidReason::MissingAuthDate => "missing-auth-date",
            InvalidReason::Stale => "stale",
            InvalidReason::MalformedUser => "malformed-user",
            InvalidReason::InternalError => "internal-error",
        }
    }
}

/// Fields extracted from a payload that passed verification
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInitData {
    /// The embedded user record, if present and parseable
    pub user: Option<serde_json::Value>,
    /// Unix timestamp (seconds) at which the host signed the payload
    pub auth_date: i64,
    pub query_id: Option<String>,
    pub start_param: Option<String>,
}

impl ValidatedInitData {
    /// Numeric `id` of the embedded user, when there is one
    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref()?.get("id")?.as_i64()
    }
}

pub type VerificationResult = Result<ValidatedInitData, InvalidReason>;

/// Errors building a [`Verifier`]
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("bot token is not configured")]
    MissingSecret,
    #[error("failed to initialise HMAC key")]
    InvalidKey,
}

#[derive(Debug, Error)]
enum UserDataError {
    #[error("user field is not valid UTF-8 after decoding: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("user field is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("user field is not a JSON object")]
    NotAnObject,
}

/// Verifies init data against a single bot token.
///
/// The signing key is derived once at construction; the verifier is
/// immutable afterwards and can be shared freely between workers.
#[derive(Clone)]
pub struct Verifier {
    mac: HmacSha256,
    max_age_seconds: u64,
    require_user: bool,
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("signing_key", &"[REDACTED]")
            .field("max_age_seconds", &self.max_age_seconds)
            .field("require_user", &self.require_user)
            .finish()
    }
}

impl Verifier {
    /// Derive the signing key from the bot token.
    ///
    /// A blank token is rejected so a misconfigured server can never
    /// accept payloads signed with an empty key.
    pub fn new(secret: &SecretString) -> Result<Self, VerifierError> {
        if secret.is_blank() {
            return Err(VerifierError::MissingSecret);
        }

        let mut derive = HmacSha256::new_from_slice(WEB_APP_DATA_LABEL.as_bytes())
            .map_err(|_| VerifierError::InvalidKey)?;
        derive.update(secret.expose_secret().as_bytes());
        let signing_key = derive.finalize().into_bytes();

        let mac = HmacSha256::new_from_slice(&signing_key)
            .map_err(|_| VerifierError::InvalidKey)?;

        Ok(Self {
            mac,
            max_age_seconds: DEFAULT_MAX_AGE_SECONDS,
            require_user: false,
        })
    }

    /// Set the freshness window in seconds
    pub fn with_max_age(mut self, max_age_seconds: u64) -> Self {
        self.max_age_seconds = max_age_seconds;
        self
    }

    /// Reject payloads whose `user` field is absent or unparseable
    pub fn require_user(mut self, require: bool) -> Self {
        self.require_user = require;
        self
    }

    pub fn max_age_seconds(&self) -> u64 {
        self.max_age_seconds
    }

    /// Verify against the current wall clock
    pub fn verify_now(&self, encoded: &str) -> VerificationResult {
        self.verify(encoded, Utc::now().timestamp())
    }

    /// Verify `encoded` as of `now` (unix seconds)
    pub fn verify(&self, encoded: &str, now: i64) -> VerificationResult {
        if encoded.trim().is_empty() {
            tracing::warn!("Received empty init data");
            return Err(InvalidReason::InternalError);
        }

        let fields: Vec<(String, String)> = form_urlencoded::parse(encoded.as_bytes())
            .into_owned()
            .collect();

        let hash = first_value(&fields, HASH_FIELD)
            .filter(|hash| !hash.is_empty())
            .ok_or(InvalidReason::MissingSignature)?;

        let expected = self.sign(&fields);
        if !bool::from(expected.as_bytes().ct_eq(hash.as_bytes())) {
            return Err(InvalidReason::BadSignature);
        }

        let auth_date = first_value(&fields, AUTH_DATE_FIELD)
            .filter(|value| !value.is_empty())
            .ok_or(InvalidReason::MissingAuthDate)?;

        // Non-numeric timestamps are reported the same way as missing ones
        let auth_date: i64 = auth_date.parse().map_err(|_| {
            tracing::warn!("Signed init data carries a non-numeric auth_date");
            InvalidReason::MissingAuthDate
        })?;

        if !self.is_fresh(auth_date, now) {
            return Err(InvalidReason::Stale);
        }

        // An empty `user` is skipped like an absent one
        let user = match first_value(&fields, USER_FIELD).filter(|raw| !raw.is_empty()) {
            Some(raw) => match parse_user(raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!("Failed to parse user data: {}", e);
                    None
                }
            },
            None => None,
        };

        if self.require_user && user.is_none() {
            return Err(InvalidReason::MalformedUser);
        }

        Ok(ValidatedInitData {
            user,
            auth_date,
            query_id: first_value(&fields, QUERY_ID_FIELD).map(str::to_owned),
            start_param: first_value(&fields, START_PARAM_FIELD).map(str::to_owned),
        })
    }

    /// Lowercase hex signature of the data-check string built from `fields`.
    /// Any `hash` field in `fields` is ignored.
    pub fn sign<K, V>(&self, fields: &[(K, V)]) -> String
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut mac = self.mac.clone();
        mac.update(data_check_string(fields).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Form-encode `fields` and append the matching `hash` field
    pub fn sign_encoded<K, V>(&self, fields: &[(K, V)]) -> String
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let hash = self.sign(fields);
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in fields {
            if key.as_ref() != HASH_FIELD {
                serializer.append_pair(key.as_ref(), value.as_ref());
            }
        }
        serializer.append_pair(HASH_FIELD, &hash);
        serializer.finish()
    }

    // Future timestamps count as fresh.
    fn is_fresh(&self, auth_date: i64, now: i64) -> bool {
        let max_age = i64::try_from(self.max_age_seconds).unwrap_or(i64::MAX);
        now.saturating_sub(auth_date) <= max_age
    }
}

/// One-shot verification with an explicit secret and window
pub fn verify(
    encoded: &str,
    secret: &SecretString,
    now: i64,
    max_age_seconds: u64,
) -> VerificationResult {
    match Verifier::new(secret) {
        Ok(verifier) => verifier.with_max_age(max_age_seconds).verify(encoded, now),
        Err(e) => {
            tracing::error!("Cannot verify init data: {}", e);
            Err(InvalidReason::InternalError)
        }
    }
}

/// Build the data-check string: non-empty, non-`hash` fields sorted by key
/// (byte order), rendered `key=value` and joined by `\n`.
pub fn data_check_string<K, V>(fields: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(&str, &str)> = fields
        .iter()
        .map(|(key, value)| (key.as_ref(), value.as_ref()))
        .filter(|(key, value)| *key != HASH_FIELD && !value.is_empty())
        .collect();
    pairs.sort_unstable();

    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn first_value<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn parse_user(raw: &str) -> Result<serde_json::Value, UserDataError> {
    let decoded = percent_decode_str(raw).decode_utf8()?;
    let user: serde_json::Value = serde_json::from_str(&decoded)?;
    if !user.is_object() {
        return Err(UserDataError::NotAnObject);
    }
    Ok(user)
}
