mod api;
mod middleware;
mod pipeline;
mod scheduler;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use lemonade_llm::{DisabledLlm, LlmClient, OpenAiClient, OpenAiConfig, ReportSummarizer};
use lemonade_signals::{SignalServices, SignalsConfig};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    pipeline::{AnalysisService, AnalysisSettings},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(lemonade_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool = lemonade_db::connect_pool_from_config(&config).await?;
    let applied = lemonade_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations up to date");

    let _scheduler = scheduler::build_scheduler(pool.clone()).await?;

    let llm: Arc<dyn LlmClient> = match OpenAiConfig::from_app_config(&config) {
        Some(llm_config) => Arc::new(OpenAiClient::new(llm_config)?),
        None => {
            tracing::warn!("OPENAI_API_KEY not set; report generation is disabled");
            Arc::new(DisabledLlm)
        }
    };
    let signals =
        SignalServices::from_config(&SignalsConfig::from_app_config(&config), llm.clone())?;

    let store: Arc<dyn lemonade_core::Store> = Arc::new(lemonade_db::PgStore::new(pool));
    let analysis = AnalysisService::new(
        Arc::clone(&store),
        Arc::new(signals.aggregator),
        ReportSummarizer::new(llm),
        AnalysisSettings::from_app_config(&config),
    );
    let state = AppState {
        store,
        analysis: Arc::new(analysis),
        social: signals.social,
        suggestions: Arc::new(signals.suggestions),
        limits: config.quota,
    };
    let app = build_app(state, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = ?config.env, "competitor lemonade listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
