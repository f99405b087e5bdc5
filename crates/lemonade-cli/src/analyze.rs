//! Terminal analysis: collect signals and summarise them without touching
//! quotas or the report history.

use std::sync::Arc;

use lemonade_core::{parse_competitor_input, AppConfig, SourceToggles};
use lemonade_llm::{DisabledLlm, LlmClient, OpenAiClient, OpenAiConfig, ReportSummarizer};
use lemonade_signals::{SignalServices, SignalsConfig};

/// Source flags as given; no flags at all means the default families.
pub(crate) fn toggles_from_flags(
    news: bool,
    funding: bool,
    social: bool,
    products: bool,
) -> SourceToggles {
    if !(news || funding || social || products) {
        return SourceToggles::default();
    }
    SourceToggles {
        news,
        funding,
        social,
        products,
    }
}

/// # Errors
///
/// Returns an error for invalid competitor input, a missing LLM key, or a
/// failed summary.
pub(crate) async fn run_analyze(
    config: &AppConfig,
    raw_competitors: &str,
    toggles: SourceToggles,
    preview: bool,
) -> anyhow::Result<()> {
    let competitors = parse_competitor_input(Some(raw_competitors), None, config.max_competitors)?;

    let llm: Arc<dyn LlmClient> = match OpenAiConfig::from_app_config(config) {
        Some(llm_config) => Arc::new(OpenAiClient::new(llm_config)?),
        None => {
            tracing::warn!("OPENAI_API_KEY not set; the summary step will fail");
            Arc::new(DisabledLlm)
        }
    };
    let signals =
        SignalServices::from_config(&SignalsConfig::from_app_config(config), llm.clone())?;
    let summarizer = ReportSummarizer::new(llm);

    tracing::info!(
        competitors = ?competitors,
        sources = ?toggles.enabled(),
        preview,
        "running terminal analysis"
    );
    let collected = signals.aggregator.collect(&competitors, &toggles).await;
    for signal in &collected {
        match &signal.unavailable {
            Some(reason) => eprintln!(
                "{:<24}{:<10}unavailable: {reason}",
                signal.competitor, signal.source
            ),
            None => eprintln!(
                "{:<24}{:<10}{} item(s)",
                signal.competitor,
                signal.source,
                signal.items.len()
            ),
        }
    }

    let output = if preview {
        let summary = summarizer.preview(&competitors, &collected).await?;
        serde_json::to_string_pretty(&summary.analysis)?
    } else {
        let summary = summarizer.summarize(&competitors, &collected, false).await?;
        serde_json::to_string_pretty(&summary.analysis)?
    };
    println!("{output}");
    Ok(())
}
