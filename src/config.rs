use crate::services::r2_store::R2Config;
use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::env;

pub const DEFAULT_MOD_KEY: &str = "mods/create-1.20.1-6.0.4.jar";
pub const DEFAULT_ARCHIVE_NAME: &str = "netherious-modpack.zip";

/// Which `ObjectStore` implementation backs the API.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Local directory (development).
    Disk,
    /// Cloudflare R2 or any S3-compatible endpoint.
    R2,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub backend: StoreBackend,
    pub storage_dir: String,
    pub public_base_url: String,
    pub r2: Option<R2Config>,
    pub default_mod_key: String,
    pub important_key: Option<String>,
    pub archive_name: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Netherious modpack download and gallery API")]
pub struct Args {
    /// Host to bind to (overrides NETHERIOUS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides NETHERIOUS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL for gallery metadata (overrides NETHERIOUS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Object store backend (overrides NETHERIOUS_STORE)
    #[arg(long, value_enum)]
    pub store: Option<StoreBackend>,

    /// Directory used by the disk backend (overrides NETHERIOUS_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Public URL prefix for stored objects (overrides NETHERIOUS_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Key served by /api/download-mod without a `path` (overrides NETHERIOUS_DEFAULT_MOD_KEY)
    #[arg(long)]
    pub default_mod_key: Option<String>,

    /// Key whose absence the modpack build warns about; empty disables the
    /// check (overrides NETHERIOUS_IMPORTANT_KEY)
    #[arg(long)]
    pub important_key: Option<String>,

    /// Filename of the modpack attachment (overrides NETHERIOUS_ARCHIVE_NAME)
    #[arg(long)]
    pub archive_name: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::resolve(args, |name| env::var(name).ok())?;
        Ok((cfg, migrate))
    }

    /// Merge CLI args over values found through `lookup`, then defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match args.port {
            Some(port) => port,
            None => match var("NETHERIOUS_PORT") {
                Some(value) => value
                    .parse::<u16>()
                    .with_context(|| format!("parsing NETHERIOUS_PORT value `{}`", value))?,
                None => 3000,
            },
        };

        let backend = match args.store {
            Some(backend) => backend,
            None => match var("NETHERIOUS_STORE").as_deref() {
                None | Some("disk") => StoreBackend::Disk,
                Some("r2") | Some("s3") => StoreBackend::R2,
                Some(other) => bail!("unknown NETHERIOUS_STORE `{}` (expected disk or r2)", other),
            },
        };

        let host = args
            .host
            .or_else(|| var("NETHERIOUS_HOST"))
            .unwrap_or_else(|| "0.0.0.0".into());

        let r2 = match backend {
            StoreBackend::R2 => {
                let required = |name: &str| {
                    var(name).with_context(|| format!("{} is required for the r2 store", name))
                };
                Some(R2Config {
                    endpoint_url: required("NETHERIOUS_R2_ENDPOINT")?,
                    bucket: required("NETHERIOUS_R2_BUCKET")?,
                    access_key_id: required("NETHERIOUS_R2_ACCESS_KEY_ID")?,
                    secret_access_key: required("NETHERIOUS_R2_SECRET_ACCESS_KEY")?,
                    region: var("NETHERIOUS_R2_REGION").unwrap_or_else(|| "auto".into()),
                })
            }
            StoreBackend::Disk => None,
        };

        let public_base_url = args
            .public_base_url
            .or_else(|| var("NETHERIOUS_PUBLIC_BASE_URL"))
            .unwrap_or_else(|| format!("http://localhost:{}/files", port));

        // An empty important key disables the probe.
        let important_key = match args
            .important_key
            .or_else(|| lookup("NETHERIOUS_IMPORTANT_KEY"))
        {
            Some(value) if value.trim().is_empty() => None,
            Some(value) => Some(value),
            None => Some(DEFAULT_MOD_KEY.to_string()),
        };

        Ok(Self {
            host,
            port,
            database_url: args
                .database_url
                .or_else(|| var("NETHERIOUS_DATABASE_URL"))
                .unwrap_or_else(|| "sqlite://./data/meta/netherious.db".into()),
            backend,
            storage_dir: args
                .storage_dir
                .or_else(|| var("NETHERIOUS_STORAGE_DIR"))
                .unwrap_or_else(|| "./data/objects".into()),
            public_base_url,
            r2,
            default_mod_key: args
                .default_mod_key
                .or_else(|| var("NETHERIOUS_DEFAULT_MOD_KEY"))
                .unwrap_or_else(|| DEFAULT_MOD_KEY.into()),
            important_key,
            archive_name: args
                .archive_name
                .filter(|name| !name.trim().is_empty())
                .or_else(|| var("NETHERIOUS_ARCHIVE_NAME"))
                .unwrap_or_else(|| DEFAULT_ARCHIVE_NAME.into()),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
