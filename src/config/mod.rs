//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{CliArgs, Command, DatabaseOverride, MigrateArgs, ServeArgs, ServeOverrides};

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "nuxtpress";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_KV_PREFIX: &str = "nuxtpress";
const DEFAULT_KV_PURGE_INTERVAL_SECS: u64 = 60;
const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60 * 24 * 14;
const DEFAULT_POST_TTL_SECS: u64 = 60 * 60 * 4;
const DEFAULT_SLUG_EXISTS_TTL_SECS: u64 = 60 * 60;
const DEFAULT_DRAFT_TTL_SECS: u64 = 60 * 60 * 24 * 7;

pub(crate) const DEFAULT_SITE_NAME: &str = "NuxtPress";
pub(crate) const DEFAULT_SITE_DESCRIPTION: &str = "My NuxtPress blog";
pub(crate) const DEFAULT_SITE_AUTHOR: &str = "Anonymous";
pub(crate) const DEFAULT_THEME_COLOR: &str = "#1e40af";
pub(crate) const DEFAULT_FAVICON: &str = "/favicon.ico";
pub(crate) const DEFAULT_FAVICON_PNG: &str = "/favicon.png";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub kv: KvSettings,
    pub auth: AuthSettings,
    pub cache: CacheSettings,
    pub site: SiteDefaults,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvBackend {
    Memory,
    Redis { url: String },
}

#[derive(Debug, Clone)]
pub struct KvSettings {
    pub backend: KvBackend,
    /// Namespace prepended to every key, without the trailing `:`.
    pub prefix: String,
    /// How often the in-memory backend sweeps expired entries.
    pub purge_interval: Duration,
}

#[derive(Clone)]
pub struct AuthSettings {
    pub password: Option<String>,
    pub secure_cookies: bool,
    pub trust_forwarded_for: bool,
    pub session_ttl: Duration,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("secure_cookies", &self.secure_cookies)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub post_ttl: Duration,
    pub slug_exists_ttl: Duration,
    pub draft_ttl: Duration,
}

/// Fallback values for site settings that were never written to the store.
#[derive(Debug, Clone, Default)]
pub struct SiteDefaults {
    pub name: String,
    pub description: String,
    pub author: String,
    pub theme_color: String,
    pub favicon: String,
    pub favicon_png: String,
    pub github: String,
    pub twitter: String,
    pub instagram: String,
    pub patreon: String,
    pub linkedin: String,
    pub discord: String,
    pub support_email: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("NUXTPRESS").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    kv: RawKvSettings,
    auth: RawAuthSettings,
    cache: RawCacheSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(backend) = overrides.kv_backend.as_ref() {
            self.kv.backend = Some(backend.clone());
        }
        if let Some(url) = overrides.kv_url.as_ref() {
            self.kv.url = Some(url.clone());
        }
        if let Some(password) = overrides.auth_password.as_ref() {
            self.auth.password = Some(password.clone());
        }
        if let Some(secure) = overrides.auth_secure_cookies {
            self.auth.secure_cookies = Some(secure);
        }
        if let Some(trust) = overrides.auth_trust_forwarded_for {
            self.auth.trust_forwarded_for = Some(trust);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            kv,
            auth,
            cache,
            site,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let database = build_database_settings(database)?;
        let kv = build_kv_settings(kv)?;
        let auth = build_auth_settings(auth)?;
        let cache = build_cache_settings(cache)?;
        let site = build_site_defaults(site);

        Ok(Self {
            server,
            logging,
            database,
            kv,
            auth,
            cache,
            site,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_blank(database.url);

    let max_value = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = non_zero_u32(max_value.into(), "database.max_connections")?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_kv_settings(kv: RawKvSettings) -> Result<KvSettings, LoadError> {
    let backend_name = kv
        .backend
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "memory".to_string());

    let backend = match backend_name.as_str() {
        "memory" => KvBackend::Memory,
        "redis" => {
            let url = non_blank(kv.url)
                .ok_or_else(|| LoadError::invalid("kv.url", "required for the redis backend"))?;
            KvBackend::Redis { url }
        }
        other => {
            return Err(LoadError::invalid(
                "kv.backend",
                format!("unknown backend `{other}` (expected memory or redis)"),
            ));
        }
    };

    let prefix = kv
        .prefix
        .map(|value| value.trim().trim_end_matches(':').to_string())
        .unwrap_or_else(|| DEFAULT_KV_PREFIX.to_string());
    if prefix.is_empty() {
        return Err(LoadError::invalid("kv.prefix", "prefix must not be empty"));
    }

    let purge_secs = kv
        .purge_interval_seconds
        .unwrap_or(DEFAULT_KV_PURGE_INTERVAL_SECS);
    let purge_interval = positive_duration(purge_secs, "kv.purge_interval_seconds")?;

    Ok(KvSettings {
        backend,
        prefix,
        purge_interval,
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let ttl_secs = auth.session_ttl_seconds.unwrap_or(DEFAULT_SESSION_TTL_SECS);
    let session_ttl = positive_duration(ttl_secs, "auth.session_ttl_seconds")?;

    Ok(AuthSettings {
        password: auth.password.filter(|value| !value.is_empty()),
        secure_cookies: auth.secure_cookies.unwrap_or(true),
        trust_forwarded_for: auth.trust_forwarded_for.unwrap_or(false),
        session_ttl,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let post_ttl = positive_duration(
        cache.post_ttl_seconds.unwrap_or(DEFAULT_POST_TTL_SECS),
        "cache.post_ttl_seconds",
    )?;
    let slug_exists_ttl = positive_duration(
        cache
            .slug_exists_ttl_seconds
            .unwrap_or(DEFAULT_SLUG_EXISTS_TTL_SECS),
        "cache.slug_exists_ttl_seconds",
    )?;
    let draft_ttl = positive_duration(
        cache.draft_ttl_seconds.unwrap_or(DEFAULT_DRAFT_TTL_SECS),
        "cache.draft_ttl_seconds",
    )?;

    Ok(CacheSettings {
        post_ttl,
        slug_exists_ttl,
        draft_ttl,
    })
}

fn build_site_defaults(site: RawSiteSettings) -> SiteDefaults {
    let or = |value: Option<String>, fallback: &str| value.unwrap_or_else(|| fallback.to_string());

    SiteDefaults {
        name: or(site.name, DEFAULT_SITE_NAME),
        description: or(site.description, DEFAULT_SITE_DESCRIPTION),
        author: or(site.author, DEFAULT_SITE_AUTHOR),
        theme_color: or(site.theme_color, DEFAULT_THEME_COLOR),
        favicon: or(site.favicon, DEFAULT_FAVICON),
        favicon_png: or(site.favicon_png, DEFAULT_FAVICON_PNG),
        github: site.github.unwrap_or_default(),
        twitter: site.twitter.unwrap_or_default(),
        instagram: site.instagram.unwrap_or_default(),
        patreon: site.patreon.unwrap_or_default(),
        linkedin: site.linkedin.unwrap_or_default(),
        discord: site.discord.unwrap_or_default(),
        support_email: site.support_email.unwrap_or_default(),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawKvSettings {
    backend: Option<String>,
    url: Option<String>,
    prefix: Option<String>,
    purge_interval_seconds: Option<u64>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    password: Option<String>,
    secure_cookies: Option<bool>,
    trust_forwarded_for: Option<bool>,
    session_ttl_seconds: Option<u64>,
}

impl std::fmt::Debug for RawAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawAuthSettings")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("secure_cookies", &self.secure_cookies)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    post_ttl_seconds: Option<u64>,
    slug_exists_ttl_seconds: Option<u64>,
    draft_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    name: Option<String>,
    description: Option<String>,
    author: Option<String>,
    theme_color: Option<String>,
    favicon: Option<String>,
    favicon_png: Option<String>,
    github: Option<String>,
    twitter: Option<String>,
    instagram: Option<String>,
    patreon: Option<String>,
    linkedin: Option<String>,
    discord: Option<String>,
    support_email: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn positive_duration(seconds: u64, key: &'static str) -> Result<Duration, LoadError> {
    if seconds == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(seconds))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
