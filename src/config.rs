use crate::llm::{
    DEFAULT_BASE_URL, DEFAULT_DISPLAY_LANGUAGE, DEFAULT_MODEL, DEFAULT_PROVIDER_TIMEOUT,
    GenerationConfig, LlmSettings,
};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Prefix for structured environment overrides, e.g. `GROUNDED_SERVER__PORT`.
const ENV_PREFIX: &str = "GROUNDED";

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Model identifier
    #[arg(long, env = "GEMINI_MODEL")]
    pub model: Option<String>,

    /// Language answers are written in
    #[arg(long, env = "DISPLAY_LANGUAGE")]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_permissive: bool,
    pub request_timeout_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    /// Default credential used when a request carries none.
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub display_language: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("display_language", &self.display_language)
            .finish_non_exhaustive()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let generation = GenerationConfig::default();
        Self {
            server: ServerConfig {
                port: 3000,
                host: "0.0.0.0".to_string(),
                cors_permissive: true,
                request_timeout_secs: 60,
            },
            provider: ProviderConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                model: DEFAULT_MODEL.to_string(),
                api_key: None,
                timeout_secs: DEFAULT_PROVIDER_TIMEOUT.as_secs(),
                display_language: DEFAULT_DISPLAY_LANGUAGE.to_string(),
                temperature: generation.temperature,
                top_p: generation.top_p,
                top_k: generation.top_k,
                max_output_tokens: generation.max_output_tokens,
            },
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let defaults = Self::default();
        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.port", defaults.server.port)?
            .set_default("server.host", defaults.server.host)?
            .set_default("server.cors_permissive", defaults.server.cors_permissive)?
            .set_default(
                "server.request_timeout_secs",
                defaults.server.request_timeout_secs,
            )?
            .set_default("provider.base_url", defaults.provider.base_url)?
            .set_default("provider.model", defaults.provider.model)?
            .set_default("provider.timeout_secs", defaults.provider.timeout_secs)?
            .set_default(
                "provider.display_language",
                defaults.provider.display_language,
            )?
            .set_default("provider.temperature", f64::from(defaults.provider.temperature))?
            .set_default("provider.top_p", f64::from(defaults.provider.top_p))?
            .set_default("provider.top_k", defaults.provider.top_k)?
            .set_default(
                "provider.max_output_tokens",
                defaults.provider.max_output_tokens,
            )?;

        // The conventional bare variable is the weakest source of a default key.
        if let Ok(key) = env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                builder = builder.set_default("provider.api_key", key)?;
            }
        }

        // 2. Config file
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false));
        }

        // 3. Environment Variables (prefixed with GROUNDED_)
        // E.g. GROUNDED_PROVIDER__MODEL=gemini-2.5-pro
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags (and the env vars clap reads for them)
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(model) = cli.model {
            builder = builder.set_override("provider.model", model)?;
        }
        if let Some(language) = cli.language {
            builder = builder.set_override("provider.display_language", language)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.provider.base_url.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "provider.base_url cannot be empty".to_string(),
            ));
        }
        if self.provider.model.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "provider.model cannot be empty".to_string(),
            ));
        }
        if self.provider.timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "provider.timeout_secs must be positive".to_string(),
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "server.request_timeout_secs must be positive".to_string(),
            ));
        }
        // The provider bound must expire before the request bound.
        if self.server.request_timeout_secs <= self.provider.timeout_secs {
            return Err(config::ConfigError::Message(format!(
                "server.request_timeout_secs ({}) must exceed provider.timeout_secs ({})",
                self.server.request_timeout_secs, self.provider.timeout_secs
            )));
        }
        Ok(())
    }

    /// Provider settings derived from this configuration.
    #[must_use]
    pub fn llm_settings(&self) -> LlmSettings {
        let p = &self.provider;
        LlmSettings {
            base_url: p.base_url.clone(),
            model: p.model.clone(),
            display_language: p.display_language.clone(),
            generation: GenerationConfig {
                temperature: p.temperature,
                top_p: p.top_p,
                top_k: p.top_k,
                max_output_tokens: p.max_output_tokens,
            },
            timeout: Duration::from_secs(p.timeout_secs),
        }
    }
}
