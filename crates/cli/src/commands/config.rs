use leadflow_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let mut lines =
        vec!["effective config (source precedence: overrides > env > file > default):".to_string()];

    lines.push(render_line("database.url", &config.database.url));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
    ));
    lines.push(render_line("database.timeout_secs", &config.database.timeout_secs.to_string()));

    lines.push(render_line("llm.provider", &format!("{:?}", config.llm.provider)));
    lines.push(render_line("llm.model", &config.llm.model));
    lines.push(render_line(
        "llm.base_url",
        config.llm.base_url.as_deref().unwrap_or("<unset>"),
    ));
    lines.push(render_line("llm.api_key", redacted_option(config.llm.api_key.is_some())));
    lines.push(render_line("llm.timeout_secs", &config.llm.timeout_secs.to_string()));

    lines.push(render_line("sms.enabled", &config.sms.enabled.to_string()));
    lines.push(render_line(
        "sms.api_url",
        config.sms.api_url.as_deref().unwrap_or("<unset>"),
    ));
    lines.push(render_line(
        "sms.account_sid",
        config.sms.account_sid.as_deref().unwrap_or("<unset>"),
    ));
    lines.push(render_line("sms.auth_token", redacted_option(config.sms.auth_token.is_some())));
    lines.push(render_line(
        "sms.from_number",
        config.sms.from_number.as_deref().unwrap_or("<unset>"),
    ));

    lines.push(render_line("email.enabled", &config.email.enabled.to_string()));
    lines.push(render_line(
        "email.api_url",
        config.email.api_url.as_deref().unwrap_or("<unset>"),
    ));
    lines.push(render_line("email.api_key", redacted_option(config.email.api_key.is_some())));
    lines.push(render_line(
        "email.from_address",
        config.email.from_address.as_deref().unwrap_or("<unset>"),
    ));

    lines.push(render_line("calendar.enabled", &config.calendar.enabled.to_string()));
    lines.push(render_line(
        "calendar.api_url",
        config.calendar.api_url.as_deref().unwrap_or("<unset>"),
    ));
    lines.push(render_line(
        "calendar.calendar_id",
        config.calendar.calendar_id.as_deref().unwrap_or("<unset>"),
    ));
    lines.push(render_line(
        "calendar.api_key",
        redacted_option(config.calendar.api_key.is_some()),
    ));

    lines.push(render_line("engine.business_type", &config.engine.business_type));
    lines.push(render_line("engine.agent_name", &config.engine.agent_name));
    lines.push(render_line(
        "engine.operator_phone",
        config.engine.operator_phone.as_deref().unwrap_or("<unset>"),
    ));
    lines.push(render_line("engine.default_user_id", &config.engine.default_user_id));
    lines.push(render_line("engine.staleness_days", &config.engine.staleness_days.to_string()));
    lines.push(render_line(
        "engine.sweep_interval_secs",
        &config.engine.sweep_interval_secs.to_string(),
    ));
    lines.push(render_line(
        "engine.booking_window",
        &format!(
            "{:02}:00-{:02}:00 ({}m slot)",
            config.engine.booking_window_start_hour,
            config.engine.booking_window_end_hour,
            config.engine.booking_slot_minutes
        ),
    ));

    lines.push(render_line("server.bind_address", &config.server.bind_address));
    lines.push(render_line("server.port", &config.server.port.to_string()));
    lines.push(render_line(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
    ));

    lines.push(render_line("logging.level", &config.logging.level));
    lines.push(render_line("logging.format", &format!("{:?}", config.logging.format)));

    lines.join("\n")
}

fn render_line(key: &str, value: &str) -> String {
    format!("  {key} = {value}")
}

fn redacted_option(present: bool) -> &'static str {
    if present {
        "<redacted>"
    } else {
        "<unset>"
    }
}
