use anyhow::Context;
use dotenv::dotenv;
use storefront_session::config::LoggingConfig;
use storefront_session::{AppState, Settings};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .pretty(),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let config = Settings::new().context("Failed to load configuration")?;
    init_tracing(&config.logging);
    info!("Configuration loaded successfully");

    let state = AppState::new(config).context("Failed to open profile storage")?;
    let tab = state.open_tab().await.context("Failed to start session store")?;

    match tab.current_session() {
        Some(session) => info!(
            "Signed in as {} <{}> (role {:?}, last login {})",
            session.name, session.email, session.role, session.last_login
        ),
        None => warn!("No active session"),
    }

    let summary = tab.stats_summary().await;
    for day in &summary.entries {
        info!(
            "{}: {} logins, {} registrations",
            day.date, day.logins, day.registrations
        );
    }
    info!(
        "Last {} days: {} logins, {} registrations",
        summary.entries.len(),
        summary.total_logins,
        summary.total_registrations
    );

    Ok(())
}
