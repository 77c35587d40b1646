use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::locale::Locale;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub llm: LlmConfig,
    pub chat: ChatConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub api_base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub timeout_secs: u64,
    pub token_refresh_margin_secs: u64,
    pub auth_retry_cooldown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub locale: Locale,
    pub store_name: String,
    pub max_excerpt_chars: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub store_api_base_url: Option<String>,
    pub store_token_url: Option<String>,
    pub store_client_id: Option<String>,
    pub store_client_secret: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub chat_locale: Option<Locale>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                api_base_url: "https://api.salla.dev/admin/v2".to_string(),
                token_url: "https://accounts.salla.dev/oauth2/token".to_string(),
                client_id: String::new(),
                client_secret: String::new().into(),
                timeout_secs: 10,
                token_refresh_margin_secs: 300,
                auth_retry_cooldown_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Anthropic,
                api_key: None,
                base_url: None,
                model: "claude-3-haiku-20240307".to_string(),
                max_tokens: 400,
                temperature: 0.3,
                timeout_secs: 30,
            },
            chat: ChatConfig {
                locale: Locale::Arabic,
                store_name: "وارف".to_string(),
                max_excerpt_chars: 4000,
            },
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), port: 3000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl LlmProvider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Anthropic => "https://api.anthropic.com",
            Self::OpenAi => "https://api.openai.com",
        }
    }
}

impl LlmConfig {
    pub fn resolved_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or(self.provider.default_base_url())
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected anthropic|openai)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("storechat.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(store) = patch.store {
            if let Some(api_base_url) = store.api_base_url {
                self.store.api_base_url = api_base_url;
            }
            if let Some(token_url) = store.token_url {
                self.store.token_url = token_url;
            }
            if let Some(client_id) = store.client_id {
                self.store.client_id = client_id;
            }
            if let Some(client_secret) = store.client_secret {
                self.store.client_secret = secret_value(client_secret);
            }
            if let Some(timeout_secs) = store.timeout_secs {
                self.store.timeout_secs = timeout_secs;
            }
            if let Some(margin) = store.token_refresh_margin_secs {
                self.store.token_refresh_margin_secs = margin;
            }
            if let Some(cooldown) = store.auth_retry_cooldown_secs {
                self.store.auth_retry_cooldown_secs = cooldown;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(locale) = chat.locale {
                self.chat.locale = locale;
            }
            if let Some(store_name) = chat.store_name {
                self.chat.store_name = store_name;
            }
            if let Some(max_excerpt_chars) = chat.max_excerpt_chars {
                self.chat.max_excerpt_chars = max_excerpt_chars;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("STORECHAT_STORE_API_BASE_URL") {
            self.store.api_base_url = value;
        }
        if let Some(value) = read_env("STORECHAT_STORE_TOKEN_URL") {
            self.store.token_url = value;
        }
        let client_id =
            read_env("STORECHAT_STORE_CLIENT_ID").or_else(|| read_env("SALLA_CLIENT_ID"));
        if let Some(value) = client_id {
            self.store.client_id = value;
        }
        let client_secret =
            read_env("STORECHAT_STORE_CLIENT_SECRET").or_else(|| read_env("SALLA_CLIENT_SECRET"));
        if let Some(value) = client_secret {
            self.store.client_secret = secret_value(value);
        }
        if let Some(value) = read_env("STORECHAT_STORE_TIMEOUT_SECS") {
            self.store.timeout_secs = parse_u64("STORECHAT_STORE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("STORECHAT_STORE_TOKEN_REFRESH_MARGIN_SECS") {
            self.store.token_refresh_margin_secs =
                parse_u64("STORECHAT_STORE_TOKEN_REFRESH_MARGIN_SECS", &value)?;
        }
        if let Some(value) = read_env("STORECHAT_STORE_AUTH_RETRY_COOLDOWN_SECS") {
            self.store.auth_retry_cooldown_secs =
                parse_u64("STORECHAT_STORE_AUTH_RETRY_COOLDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("STORECHAT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        let api_key = read_env("STORECHAT_LLM_API_KEY").or_else(|| read_env("ANTHROPIC_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("STORECHAT_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("STORECHAT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("STORECHAT_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("STORECHAT_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("STORECHAT_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("STORECHAT_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("STORECHAT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("STORECHAT_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("STORECHAT_CHAT_LOCALE") {
            self.chat.locale = value.parse()?;
        }
        if let Some(value) = read_env("STORECHAT_CHAT_STORE_NAME") {
            self.chat.store_name = value;
        }
        if let Some(value) = read_env("STORECHAT_CHAT_MAX_EXCERPT_CHARS") {
            self.chat.max_excerpt_chars =
                parse_u64("STORECHAT_CHAT_MAX_EXCERPT_CHARS", &value)? as usize;
        }

        if let Some(value) = read_env("STORECHAT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("STORECHAT_SERVER_PORT") {
            self.server.port = parse_u16("STORECHAT_SERVER_PORT", &value)?;
        } else if let Some(value) = read_env("PORT") {
            self.server.port = parse_u16("PORT", &value)?;
        }

        let log_level =
            read_env("STORECHAT_LOGGING_LEVEL").or_else(|| read_env("STORECHAT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("STORECHAT_LOGGING_FORMAT").or_else(|| read_env("STORECHAT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_base_url) = overrides.store_api_base_url {
            self.store.api_base_url = api_base_url;
        }
        if let Some(token_url) = overrides.store_token_url {
            self.store.token_url = token_url;
        }
        if let Some(client_id) = overrides.store_client_id {
            self.store.client_id = client_id;
        }
        if let Some(client_secret) = overrides.store_client_secret {
            self.store.client_secret = secret_value(client_secret);
        }
        if let Some(provider) = overrides.llm_provider {
            self.llm.provider = provider;
        }
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(api_key));
        }
        if let Some(base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(base_url);
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(locale) = overrides.chat_locale {
            self.chat.locale = locale;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_store(&self.store)?;
        validate_llm(&self.llm)?;
        validate_chat(&self.chat)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("storechat.toml"), PathBuf::from("config/storechat.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{key} must start with http:// or https://")))
    }
}

fn validate_timeout(key: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
    }
    Ok(())
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    validate_http_url("store.api_base_url", &store.api_base_url)?;
    validate_http_url("store.token_url", &store.token_url)?;
    validate_timeout("store.timeout_secs", store.timeout_secs)?;

    if store.client_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "store.client_id is required (set SALLA_CLIENT_ID or STORECHAT_STORE_CLIENT_ID)"
                .to_string(),
        ));
    }
    if store.client_secret.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "store.client_secret is required (set SALLA_CLIENT_SECRET or STORECHAT_STORE_CLIENT_SECRET)"
                .to_string(),
        ));
    }

    if store.token_refresh_margin_secs >= 86_400 {
        return Err(ConfigError::Validation(
            "store.token_refresh_margin_secs must be less than one day".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    validate_timeout("llm.timeout_secs", llm.timeout_secs)?;

    if let Some(base_url) = &llm.base_url {
        validate_http_url("llm.base_url", base_url)?;
    }
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }
    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=1.0".to_string(),
        ));
    }

    if llm.provider == LlmProvider::Anthropic {
        let missing = llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "llm.api_key is required for the anthropic provider (set ANTHROPIC_API_KEY)"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if chat.store_name.trim().is_empty() {
        return Err(ConfigError::Validation("chat.store_name must not be empty".to_string()));
    }
    if chat.max_excerpt_chars == 0 {
        return Err(ConfigError::Validation(
            "chat.max_excerpt_chars must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    store: Option<StorePatch>,
    llm: Option<LlmPatch>,
    chat: Option<ChatPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    api_base_url: Option<String>,
    token_url: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    timeout_secs: Option<u64>,
    token_refresh_margin_secs: Option<u64>,
    auth_retry_cooldown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    locale: Option<Locale>,
    store_name: Option<String>,
    max_excerpt_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
