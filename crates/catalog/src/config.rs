//! Catalog configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CATALOG_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Asset backend
//! - `CATALOG_ASSET_BACKEND` - `supabase` (default) or `local`
//! - `CATALOG_ASSET_BUCKET` - Bucket name (default: product-images)
//! - `SUPABASE_URL` - Project URL, required for `supabase`
//! - `SUPABASE_SERVICE_KEY` - Service role key, required for `supabase`
//! - `CATALOG_ASSET_DIR` - Storage directory for `local` (default: ./data/assets)
//! - `CATALOG_PUBLIC_BASE_URL` - Public origin serving `local` assets
//!   (default: <http://127.0.0.1:3000>)
//!
//! ## Optional
//! - `CATALOG_ORPHAN_POLICY` - `reclaim` (default) or `retain`
//! - `CATALOG_CACHE_TTL_SECS` - Read-model cache lifetime (default: 300)

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use reve_essence_core::ObjectStore;

use crate::assets::{DEFAULT_BUCKET, LocalObjectStore, SupabaseObjectStore};
use crate::sync::{OrphanPolicy, SyncOptions};

const MIN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where product images are stored.
#[derive(Clone)]
pub enum AssetBackendConfig {
    /// Supabase Storage bucket.
    Supabase {
        url: String,
        service_key: SecretString,
        bucket: String,
    },
    /// Directory on local disk, served by the storefront.
    Local {
        dir: PathBuf,
        public_base_url: String,
        bucket: String,
    },
}

impl std::fmt::Debug for AssetBackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supabase { url, bucket, .. } => f
                .debug_struct("Supabase")
                .field("url", url)
                .field("service_key", &"[REDACTED]")
                .field("bucket", bucket)
                .finish(),
            Self::Local {
                dir,
                public_base_url,
                bucket,
            } => f
                .debug_struct("Local")
                .field("dir", dir)
                .field("public_base_url", public_base_url)
                .field("bucket", bucket)
                .finish(),
        }
    }
}

impl AssetBackendConfig {
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::Supabase { bucket, .. } | Self::Local { bucket, .. } => bucket,
        }
    }

    /// Directory to serve under `/<bucket>` when assets live on local disk.
    #[must_use]
    pub fn local_dir(&self) -> Option<&PathBuf> {
        match self {
            Self::Local { dir, .. } => Some(dir),
            Self::Supabase { .. } => None,
        }
    }

    /// Build the configured object store.
    #[must_use]
    pub fn build(&self) -> Arc<dyn ObjectStore> {
        match self {
            Self::Supabase {
                url,
                service_key,
                bucket,
            } => Arc::new(SupabaseObjectStore::new(
                url,
                bucket.clone(),
                service_key.clone(),
            )),
            Self::Local {
                dir,
                public_base_url,
                bucket,
            } => Arc::new(LocalObjectStore::new(
                dir.clone(),
                public_base_url,
                bucket.clone(),
            )),
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let bucket = get_env_or_default("CATALOG_ASSET_BUCKET", DEFAULT_BUCKET);
        let backend = get_env_or_default("CATALOG_ASSET_BACKEND", "supabase");

        match backend.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(Self::Supabase {
                url: get_required_env("SUPABASE_URL")?,
                service_key: get_validated_secret("SUPABASE_SERVICE_KEY")?,
                bucket,
            }),
            "local" => Ok(Self::Local {
                dir: PathBuf::from(get_env_or_default("CATALOG_ASSET_DIR", "./data/assets")),
                public_base_url: get_env_or_default(
                    "CATALOG_PUBLIC_BASE_URL",
                    "http://127.0.0.1:3000",
                ),
                bucket,
            }),
            other => Err(ConfigError::InvalidEnvVar(
                "CATALOG_ASSET_BACKEND".to_string(),
                format!("expected 'supabase' or 'local', got '{other}'"),
            )),
        }
    }
}

/// Catalog configuration shared by every binary.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Image storage backend
    pub assets: AssetBackendConfig,
    /// What happens to images a write releases
    pub orphan_policy: OrphanPolicy,
    /// Lifetime of cached collections
    pub cache_ttl: Duration,
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("CATALOG_DATABASE_URL")?;
        let assets = AssetBackendConfig::from_env()?;
        let orphan_policy = get_env_or_default("CATALOG_ORPHAN_POLICY", "reclaim")
            .parse::<OrphanPolicy>()
            .map_err(|e| ConfigError::InvalidEnvVar("CATALOG_ORPHAN_POLICY".to_string(), e))?;
        let cache_ttl = get_env_or_default("CATALOG_CACHE_TTL_SECS", "300")
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CATALOG_CACHE_TTL_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            database_url,
            assets,
            orphan_policy,
            cache_ttl,
        })
    }

    /// Synchronizer options derived from this configuration.
    #[must_use]
    pub const fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            orphan_policy: self.orphan_policy,
            cache_ttl: self.cache_ttl,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if the variable is unset.
pub fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` naming `primary_key` if neither is set.
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
#[must_use]
pub fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
#[must_use]
pub fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a secret meets minimum length requirements.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` if the secret is too short.
pub fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load a secret from the environment and reject placeholders and
/// low-entropy values.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if unset, or
/// `ConfigError::InsecureSecret` if the value looks like a placeholder.
pub fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
