use crate::services::object_store::LinkPolicy;
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, path::PathBuf, time::Duration};

/// Longest expiry the object store accepts for a presigned URL (7 days).
pub const MAX_PRESIGN_SECS: u64 = 604_800;

const DEFAULT_PORT: u16 = 10000;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub downloads_dir: PathBuf,
    pub yt_dlp_bin: String,
    pub storage: StorageConfig,
}

/// Credentials and addressing for the S3-compatible bucket.
#[derive(Clone)]
pub struct StorageConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    /// Fixed public prefix; when set, links are never presigned.
    pub public_url: Option<String>,
    pub url_expiration_secs: u64,
}

impl StorageConfig {
    pub fn link_policy(&self) -> LinkPolicy {
        match &self.public_url {
            Some(prefix) => LinkPolicy::Public {
                prefix: prefix.trim_end_matches('/').to_string(),
            },
            None => LinkPolicy::Presigned {
                expires_in: Duration::from_secs(self.url_expiration_secs),
            },
        }
    }
}

// Keep the secret out of startup logs.
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("public_url", &self.public_url)
            .field("url_expiration_secs", &self.url_expiration_secs)
            .finish()
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Social video relay to Cloudflare R2")]
pub struct Args {
    /// Host to bind to (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Staging directory for downloads (overrides DOWNLOADS_DIR)
    #[arg(long)]
    pub downloads_dir: Option<PathBuf>,

    /// Extraction tool binary (overrides YT_DLP_BIN)
    #[arg(long)]
    pub yt_dlp_bin: Option<String>,
}

impl AppConfig {
    /// Parse CLI args and the process environment into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::resolve(args, |name| env::var(name).ok())
    }

    /// Merge CLI args over values from `lookup`. Empty values count as unset.
    ///
    /// Fails listing every missing storage variable at once.
    pub fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let required = [
            "R2_ACCESS_KEY_ID",
            "R2_SECRET_ACCESS_KEY",
            "R2_ENDPOINT",
            "R2_BUCKET",
        ];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| get(*name).is_none())
            .collect();
        if !missing.is_empty() {
            bail!(
                "Missing required Cloudflare R2 env vars: {}",
                missing.join(", ")
            );
        }

        let env_port = match get("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .with_context(|| format!("parsing PORT value `{}`", value))?,
            None => DEFAULT_PORT,
        };

        let url_expiration_secs = match get("R2_URL_EXPIRATION") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("parsing R2_URL_EXPIRATION value `{}`", value))?,
            None => MAX_PRESIGN_SECS,
        };

        let public_url = get("R2_PUBLIC_URL").map(|v| v.trim_end_matches('/').to_string());
        if public_url.is_none() && !(1..=MAX_PRESIGN_SECS).contains(&url_expiration_secs) {
            bail!(
                "R2_URL_EXPIRATION must be between 1 and {} seconds, got {}",
                MAX_PRESIGN_SECS,
                url_expiration_secs
            );
        }

        let storage = StorageConfig {
            access_key_id: get("R2_ACCESS_KEY_ID").unwrap_or_default(),
            secret_access_key: get("R2_SECRET_ACCESS_KEY").unwrap_or_default(),
            endpoint: get("R2_ENDPOINT").unwrap_or_default(),
            region: get("R2_REGION").unwrap_or_else(|| "auto".into()),
            bucket: get("R2_BUCKET").unwrap_or_default(),
            public_url,
            url_expiration_secs,
        };

        Ok(Self {
            host: args
                .host
                .or_else(|| get("HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port: args.port.unwrap_or(env_port),
            downloads_dir: args
                .downloads_dir
                .or_else(|| get("DOWNLOADS_DIR").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("./downloads")),
            yt_dlp_bin: args
                .yt_dlp_bin
                .or_else(|| get("YT_DLP_BIN"))
                .unwrap_or_else(|| "yt-dlp".into()),
            storage,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
