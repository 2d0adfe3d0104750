use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use leadflow_agent::analysis::LeadAnalyzer;
use leadflow_agent::booking::{BookingAllocator, BookingWindow};
use leadflow_agent::llm::{HttpLlmClient, LlmClient};
use leadflow_agent::orchestrator::{ConversationOrchestrator, OrchestratorSettings};
use leadflow_agent::triggers::TriggerDispatcher;
use leadflow_channels::calendar::{
    CalendarError, CalendarProvider, HttpCalendarProvider, InMemoryCalendarProvider,
};
use leadflow_channels::outbound::{
    ChannelError, ChannelRouter, ChannelSender, NoopChannelSender,
};
use leadflow_channels::retry::SendRetryPolicy;
use leadflow_channels::{HttpEmailSender, HttpSmsSender};
use leadflow_core::config::{
    AppConfig, CalendarConfig, ConfigError, EmailConfig, LoadOptions, SmsConfig,
};
use leadflow_db::repositories::{
    SqlAutomationRepository, SqlConversationRepository, SqlLeadEventRepository,
    SqlLeadRepository,
};
use leadflow_db::{connect_with_settings, migrations, DbPool};

use crate::routes::ApiState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub api_state: ApiState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("sms channel init failed: {0}")]
    SmsChannel(#[source] ChannelError),
    #[error("email channel init failed: {0}")]
    EmailChannel(#[source] ChannelError),
    #[error("calendar provider init failed: {0}")]
    Calendar(#[source] CalendarError),
    #[error("llm client init failed: {0}")]
    Llm(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let sms = build_sms_sender(&config.sms)?;
    let email = build_email_sender(&config.email)?;
    let calendar = build_calendar_provider(&config.calendar)?;
    let llm: Arc<dyn LlmClient> = Arc::new(
        HttpLlmClient::from_config(&config.llm)
            .map_err(|llm_error| BootstrapError::Llm(llm_error.to_string()))?,
    );

    let leads = Arc::new(SqlLeadRepository::new(db_pool.clone()));
    let events = Arc::new(SqlLeadEventRepository::new(db_pool.clone()));
    let automations = Arc::new(SqlAutomationRepository::new(db_pool.clone()));
    let conversations = Arc::new(SqlConversationRepository::new(db_pool.clone()));

    let retry = SendRetryPolicy::new(
        config.engine.send_max_retries,
        Duration::from_millis(config.engine.send_retry_base_delay_ms),
    );

    let dispatcher = Arc::new(TriggerDispatcher::new(
        leads.clone(),
        events.clone(),
        automations,
        ChannelRouter::new(Some(sms.clone()), Some(email)),
        retry,
        config.engine.business_type.clone(),
        config.engine.agent_name.clone(),
    ));

    let allocator = Arc::new(BookingAllocator::new(
        calendar,
        BookingWindow {
            start_hour: config.engine.booking_window_start_hour,
            end_hour: config.engine.booking_window_end_hour,
            slot_minutes: config.engine.booking_slot_minutes,
        },
    ));

    let orchestrator = Arc::new(ConversationOrchestrator::new(
        leads.clone(),
        conversations,
        events.clone(),
        llm.clone(),
        sms,
        allocator,
        OrchestratorSettings {
            business_type: config.engine.business_type.clone(),
            agent_name: config.engine.agent_name.clone(),
            operator_phone: config.engine.operator_phone.clone(),
            llm_timeout: Duration::from_secs(config.llm.timeout_secs),
            retry,
        },
    ));

    let analyzer = Arc::new(LeadAnalyzer::new(
        llm,
        config.engine.business_type.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    ));

    let api_state = ApiState {
        leads,
        events,
        analyzer,
        dispatcher,
        orchestrator,
        default_user_id: config.engine.default_user_id.clone(),
    };

    Ok(Application { config, db_pool, api_state })
}

fn build_sms_sender(config: &SmsConfig) -> Result<Arc<dyn ChannelSender>, BootstrapError> {
    if !config.enabled {
        info!(
            event_name = "system.bootstrap.sms_transport_mode",
            correlation_id = "bootstrap",
            transport_mode = "noop",
            "sms channel not configured, using noop transport"
        );
        return Ok(Arc::new(NoopChannelSender::new("sms")));
    }

    match (&config.api_url, &config.account_sid, &config.auth_token, &config.from_number) {
        (Some(api_url), Some(account_sid), Some(auth_token), Some(from_number)) => {
            let sender =
                HttpSmsSender::new(api_url, account_sid, auth_token.clone(), from_number)
                    .map_err(BootstrapError::SmsChannel)?;
            info!(
                event_name = "system.bootstrap.sms_transport_mode",
                correlation_id = "bootstrap",
                transport_mode = "http",
                "sms channel initialized"
            );
            Ok(Arc::new(sender))
        }
        _ => Err(BootstrapError::Config(ConfigError::Validation(
            "sms.enabled is true but credentials are incomplete".to_owned(),
        ))),
    }
}

fn build_email_sender(config: &EmailConfig) -> Result<Arc<dyn ChannelSender>, BootstrapError> {
    if !config.enabled {
        info!(
            event_name = "system.bootstrap.email_transport_mode",
            correlation_id = "bootstrap",
            transport_mode = "noop",
            "email channel not configured, using noop transport"
        );
        return Ok(Arc::new(NoopChannelSender::new("email")));
    }

    match (&config.api_url, &config.api_key, &config.from_address) {
        (Some(api_url), Some(api_key), Some(from_address)) => {
            let sender = HttpEmailSender::new(api_url, api_key.clone(), from_address)
                .map_err(BootstrapError::EmailChannel)?;
            info!(
                event_name = "system.bootstrap.email_transport_mode",
                correlation_id = "bootstrap",
                transport_mode = "http",
                "email channel initialized"
            );
            Ok(Arc::new(sender))
        }
        _ => Err(BootstrapError::Config(ConfigError::Validation(
            "email.enabled is true but credentials are incomplete".to_owned(),
        ))),
    }
}

fn build_calendar_provider(
    config: &CalendarConfig,
) -> Result<Arc<dyn CalendarProvider>, BootstrapError> {
    if !config.enabled {
        info!(
            event_name = "system.bootstrap.calendar_mode",
            correlation_id = "bootstrap",
            transport_mode = "memory",
            "calendar not configured, using in-memory provider"
        );
        return Ok(Arc::new(InMemoryCalendarProvider::new()));
    }

    match (&config.api_url, &config.calendar_id) {
        (Some(api_url), Some(calendar_id)) => {
            let provider = HttpCalendarProvider::new(
                api_url,
                config.api_key.clone(),
                calendar_id,
                config.timeout_secs,
            )
            .map_err(BootstrapError::Calendar)?;
            info!(
                event_name = "system.bootstrap.calendar_mode",
                correlation_id = "bootstrap",
                transport_mode = "http",
                "calendar provider initialized"
            );
            Ok(Arc::new(provider))
        }
        _ => Err(BootstrapError::Config(ConfigError::Validation(
            "calendar.enabled is true but api_url/calendar_id are incomplete".to_owned(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use leadflow_core::config::{ConfigOverrides, LoadOptions};
    use leadflow_core::directive::{parse_directive, Directive};
    use leadflow_core::template::{render, TemplateVars};

    use crate::bootstrap::bootstrap;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_when_sms_enabled_without_credentials() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                sms_enabled: Some(true),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("sms."));
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_schema_and_engine_checkpoints() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN \
             ('leads', 'lead_events', 'automations', 'conversations', 'conversation_messages')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected baseline tables to be available after bootstrap");
        assert_eq!(table_count, 5, "bootstrap should expose the engine's baseline tables");

        // Engine checkpoints: the directive grammar and the template
        // renderer both work against bootstrap-time configuration values.
        assert_eq!(
            parse_directive("BOOK|tomorrow|2pm"),
            Directive::BookRequest { day: "tomorrow".to_owned(), time: Some("2pm".to_owned()) }
        );
        let vars = TemplateVars::new(
            "Dana",
            app.config.engine.business_type.clone(),
            app.config.engine.agent_name.clone(),
        );
        let rendered = render("Hi {{name}}, welcome to {{businessType}}!", &vars);
        assert_eq!(rendered, "Hi Dana, welcome to home services!");

        app.db_pool.close().await;
    }
}
