use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub sms: SmsConfig,
    pub email: EmailConfig,
    pub calendar: CalendarConfig,
    pub engine: EngineConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct SmsConfig {
    pub enabled: bool,
    pub api_url: Option<String>,
    pub account_sid: Option<String>,
    pub auth_token: Option<SecretString>,
    pub from_number: Option<String>,
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub enabled: bool,
    pub api_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub from_address: Option<String>,
}

#[derive(Clone, Debug)]
pub struct CalendarConfig {
    pub enabled: bool,
    pub api_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub calendar_id: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Substituted for `{{businessType}}` in automation templates.
    pub business_type: String,
    /// Substituted for `{{agentName}}` in automation templates.
    pub agent_name: String,
    /// Out-of-band booking notifications go here when set.
    pub operator_phone: Option<String>,
    /// Owner account for leads captured through public forms.
    pub default_user_id: String,
    pub staleness_days: i64,
    pub sweep_interval_secs: u64,
    pub send_max_retries: u32,
    pub send_retry_base_delay_ms: u64,
    pub booking_window_start_hour: u32,
    pub booking_window_end_hour: u32,
    pub booking_slot_minutes: i64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
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
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub sms_enabled: Option<bool>,
    pub email_enabled: Option<bool>,
    pub calendar_enabled: Option<bool>,
    pub operator_phone: Option<String>,
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
            database: DatabaseConfig {
                url: "sqlite://leadflow.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            sms: SmsConfig {
                enabled: false,
                api_url: None,
                account_sid: None,
                auth_token: None,
                from_number: None,
            },
            email: EmailConfig { enabled: false, api_url: None, api_key: None, from_address: None },
            calendar: CalendarConfig {
                enabled: false,
                api_url: None,
                api_key: None,
                calendar_id: None,
                timeout_secs: 15,
            },
            engine: EngineConfig {
                business_type: "home services".to_string(),
                agent_name: "The Team".to_string(),
                operator_phone: None,
                default_user_id: "owner".to_string(),
                staleness_days: 3,
                sweep_interval_secs: 3600,
                send_max_retries: 2,
                send_retry_base_delay_ms: 500,
                booking_window_start_hour: 10,
                booking_window_end_hour: 16,
                booking_slot_minutes: 60,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                health_check_port: 8081,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("leadflow.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(sms) = patch.sms {
            if let Some(enabled) = sms.enabled {
                self.sms.enabled = enabled;
            }
            if let Some(api_url) = sms.api_url {
                self.sms.api_url = Some(api_url);
            }
            if let Some(account_sid) = sms.account_sid {
                self.sms.account_sid = Some(account_sid);
            }
            if let Some(sms_auth_token_value) = sms.auth_token {
                self.sms.auth_token = Some(secret_value(sms_auth_token_value));
            }
            if let Some(from_number) = sms.from_number {
                self.sms.from_number = Some(from_number);
            }
        }

        if let Some(email) = patch.email {
            if let Some(enabled) = email.enabled {
                self.email.enabled = enabled;
            }
            if let Some(api_url) = email.api_url {
                self.email.api_url = Some(api_url);
            }
            if let Some(email_api_key_value) = email.api_key {
                self.email.api_key = Some(secret_value(email_api_key_value));
            }
            if let Some(from_address) = email.from_address {
                self.email.from_address = Some(from_address);
            }
        }

        if let Some(calendar) = patch.calendar {
            if let Some(enabled) = calendar.enabled {
                self.calendar.enabled = enabled;
            }
            if let Some(api_url) = calendar.api_url {
                self.calendar.api_url = Some(api_url);
            }
            if let Some(calendar_api_key_value) = calendar.api_key {
                self.calendar.api_key = Some(secret_value(calendar_api_key_value));
            }
            if let Some(calendar_id) = calendar.calendar_id {
                self.calendar.calendar_id = Some(calendar_id);
            }
            if let Some(timeout_secs) = calendar.timeout_secs {
                self.calendar.timeout_secs = timeout_secs;
            }
        }

        if let Some(engine) = patch.engine {
            if let Some(business_type) = engine.business_type {
                self.engine.business_type = business_type;
            }
            if let Some(agent_name) = engine.agent_name {
                self.engine.agent_name = agent_name;
            }
            if let Some(operator_phone) = engine.operator_phone {
                self.engine.operator_phone = Some(operator_phone);
            }
            if let Some(default_user_id) = engine.default_user_id {
                self.engine.default_user_id = default_user_id;
            }
            if let Some(staleness_days) = engine.staleness_days {
                self.engine.staleness_days = staleness_days;
            }
            if let Some(sweep_interval_secs) = engine.sweep_interval_secs {
                self.engine.sweep_interval_secs = sweep_interval_secs;
            }
            if let Some(send_max_retries) = engine.send_max_retries {
                self.engine.send_max_retries = send_max_retries;
            }
            if let Some(send_retry_base_delay_ms) = engine.send_retry_base_delay_ms {
                self.engine.send_retry_base_delay_ms = send_retry_base_delay_ms;
            }
            if let Some(start_hour) = engine.booking_window_start_hour {
                self.engine.booking_window_start_hour = start_hour;
            }
            if let Some(end_hour) = engine.booking_window_end_hour {
                self.engine.booking_window_end_hour = end_hour;
            }
            if let Some(slot_minutes) = engine.booking_slot_minutes {
                self.engine.booking_slot_minutes = slot_minutes;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
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
        if let Some(value) = read_env("LEADFLOW_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("LEADFLOW_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("LEADFLOW_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("LEADFLOW_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("LEADFLOW_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LEADFLOW_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("LEADFLOW_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LEADFLOW_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("LEADFLOW_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("LEADFLOW_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("LEADFLOW_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("LEADFLOW_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("LEADFLOW_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("LEADFLOW_SMS_ENABLED") {
            self.sms.enabled = parse_bool("LEADFLOW_SMS_ENABLED", &value)?;
        }
        if let Some(value) = read_env("LEADFLOW_SMS_API_URL") {
            self.sms.api_url = Some(value);
        }
        if let Some(value) = read_env("LEADFLOW_SMS_ACCOUNT_SID") {
            self.sms.account_sid = Some(value);
        }
        if let Some(value) = read_env("LEADFLOW_SMS_AUTH_TOKEN") {
            self.sms.auth_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("LEADFLOW_SMS_FROM_NUMBER") {
            self.sms.from_number = Some(value);
        }

        if let Some(value) = read_env("LEADFLOW_EMAIL_ENABLED") {
            self.email.enabled = parse_bool("LEADFLOW_EMAIL_ENABLED", &value)?;
        }
        if let Some(value) = read_env("LEADFLOW_EMAIL_API_URL") {
            self.email.api_url = Some(value);
        }
        if let Some(value) = read_env("LEADFLOW_EMAIL_API_KEY") {
            self.email.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LEADFLOW_EMAIL_FROM_ADDRESS") {
            self.email.from_address = Some(value);
        }

        if let Some(value) = read_env("LEADFLOW_CALENDAR_ENABLED") {
            self.calendar.enabled = parse_bool("LEADFLOW_CALENDAR_ENABLED", &value)?;
        }
        if let Some(value) = read_env("LEADFLOW_CALENDAR_API_URL") {
            self.calendar.api_url = Some(value);
        }
        if let Some(value) = read_env("LEADFLOW_CALENDAR_API_KEY") {
            self.calendar.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LEADFLOW_CALENDAR_ID") {
            self.calendar.calendar_id = Some(value);
        }
        if let Some(value) = read_env("LEADFLOW_CALENDAR_TIMEOUT_SECS") {
            self.calendar.timeout_secs = parse_u64("LEADFLOW_CALENDAR_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LEADFLOW_ENGINE_BUSINESS_TYPE") {
            self.engine.business_type = value;
        }
        if let Some(value) = read_env("LEADFLOW_ENGINE_AGENT_NAME") {
            self.engine.agent_name = value;
        }
        if let Some(value) = read_env("LEADFLOW_ENGINE_OPERATOR_PHONE") {
            self.engine.operator_phone = Some(value);
        }
        if let Some(value) = read_env("LEADFLOW_ENGINE_DEFAULT_USER_ID") {
            self.engine.default_user_id = value;
        }
        if let Some(value) = read_env("LEADFLOW_ENGINE_STALENESS_DAYS") {
            self.engine.staleness_days = parse_i64("LEADFLOW_ENGINE_STALENESS_DAYS", &value)?;
        }
        if let Some(value) = read_env("LEADFLOW_ENGINE_SWEEP_INTERVAL_SECS") {
            self.engine.sweep_interval_secs =
                parse_u64("LEADFLOW_ENGINE_SWEEP_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("LEADFLOW_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("LEADFLOW_SERVER_PORT") {
            self.server.port = parse_u16("LEADFLOW_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("LEADFLOW_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("LEADFLOW_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("LEADFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("LEADFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("LEADFLOW_LOGGING_LEVEL").or_else(|| read_env("LEADFLOW_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LEADFLOW_LOGGING_FORMAT").or_else(|| read_env("LEADFLOW_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(sms_enabled) = overrides.sms_enabled {
            self.sms.enabled = sms_enabled;
        }
        if let Some(email_enabled) = overrides.email_enabled {
            self.email.enabled = email_enabled;
        }
        if let Some(calendar_enabled) = overrides.calendar_enabled {
            self.calendar.enabled = calendar_enabled;
        }
        if let Some(operator_phone) = overrides.operator_phone {
            self.engine.operator_phone = Some(operator_phone);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_sms(&self.sms)?;
        validate_email(&self.email)?;
        validate_calendar(&self.calendar)?;
        validate_engine(&self.engine)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("leadflow.toml"), PathBuf::from("config/leadflow.toml")]
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

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_sms(sms: &SmsConfig) -> Result<(), ConfigError> {
    if !sms.enabled {
        return Ok(());
    }

    let missing_field = [
        ("sms.api_url", sms.api_url.as_deref().map(str::trim).unwrap_or("").is_empty()),
        ("sms.account_sid", sms.account_sid.as_deref().map(str::trim).unwrap_or("").is_empty()),
        (
            "sms.auth_token",
            sms.auth_token
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true),
        ),
        ("sms.from_number", sms.from_number.as_deref().map(str::trim).unwrap_or("").is_empty()),
    ]
    .into_iter()
    .find_map(|(field, missing)| missing.then_some(field));

    match missing_field {
        Some(field) => Err(ConfigError::Validation(format!(
            "{field} is required when sms.enabled is true"
        ))),
        None => Ok(()),
    }
}

fn validate_email(email: &EmailConfig) -> Result<(), ConfigError> {
    if !email.enabled {
        return Ok(());
    }

    let missing_field = [
        ("email.api_url", email.api_url.as_deref().map(str::trim).unwrap_or("").is_empty()),
        (
            "email.api_key",
            email
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true),
        ),
        (
            "email.from_address",
            email.from_address.as_deref().map(str::trim).unwrap_or("").is_empty(),
        ),
    ]
    .into_iter()
    .find_map(|(field, missing)| missing.then_some(field));

    match missing_field {
        Some(field) => Err(ConfigError::Validation(format!(
            "{field} is required when email.enabled is true"
        ))),
        None => Ok(()),
    }
}

fn validate_calendar(calendar: &CalendarConfig) -> Result<(), ConfigError> {
    if calendar.timeout_secs == 0 || calendar.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "calendar.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !calendar.enabled {
        return Ok(());
    }

    let missing_field = [
        (
            "calendar.api_url",
            calendar.api_url.as_deref().map(str::trim).unwrap_or("").is_empty(),
        ),
        (
            "calendar.calendar_id",
            calendar.calendar_id.as_deref().map(str::trim).unwrap_or("").is_empty(),
        ),
    ]
    .into_iter()
    .find_map(|(field, missing)| missing.then_some(field));

    match missing_field {
        Some(field) => Err(ConfigError::Validation(format!(
            "{field} is required when calendar.enabled is true"
        ))),
        None => Ok(()),
    }
}

fn validate_engine(engine: &EngineConfig) -> Result<(), ConfigError> {
    if engine.staleness_days <= 0 {
        return Err(ConfigError::Validation(
            "engine.staleness_days must be greater than zero".to_string(),
        ));
    }

    if engine.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "engine.sweep_interval_secs must be greater than zero".to_string(),
        ));
    }

    if engine.booking_window_start_hour >= engine.booking_window_end_hour
        || engine.booking_window_end_hour > 23
    {
        return Err(ConfigError::Validation(
            "engine.booking_window hours must satisfy start < end <= 23".to_string(),
        ));
    }

    if engine.booking_slot_minutes <= 0
        || engine.booking_slot_minutes
            > i64::from(engine.booking_window_end_hour - engine.booking_window_start_hour) * 60
    {
        return Err(ConfigError::Validation(
            "engine.booking_slot_minutes must fit inside the booking window".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 || server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.port and server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.port == server.health_check_port {
        return Err(ConfigError::Validation(
            "server.port and server.health_check_port must differ".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
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
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value
        .parse::<i64>()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    sms: Option<SmsPatch>,
    email: Option<EmailPatch>,
    calendar: Option<CalendarPatch>,
    engine: Option<EnginePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SmsPatch {
    enabled: Option<bool>,
    api_url: Option<String>,
    account_sid: Option<String>,
    auth_token: Option<String>,
    from_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailPatch {
    enabled: Option<bool>,
    api_url: Option<String>,
    api_key: Option<String>,
    from_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CalendarPatch {
    enabled: Option<bool>,
    api_url: Option<String>,
    api_key: Option<String>,
    calendar_id: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginePatch {
    business_type: Option<String>,
    agent_name: Option<String>,
    operator_phone: Option<String>,
    default_user_id: Option<String>,
    staleness_days: Option<i64>,
    sweep_interval_secs: Option<u64>,
    send_max_retries: Option<u32>,
    send_retry_base_delay_ms: Option<u64>,
    booking_window_start_hour: Option<u32>,
    booking_window_end_hour: Option<u32>,
    booking_slot_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
