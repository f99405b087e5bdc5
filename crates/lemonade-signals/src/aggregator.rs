//! Fan-out of enabled sources across the requested competitors.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use lemonade_core::{CompetitorSignal, SourceToggles};

use crate::sources::{SignalSource, SourceOutcome};

pub struct SignalAggregator {
    sources: Vec<Arc<dyn SignalSource>>,
}

impl SignalAggregator {
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn SignalSource>>) -> Self {
        Self { sources }
    }

    #[must_use]
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    fn enabled_sources(&self, toggles: &SourceToggles) -> Vec<&Arc<dyn SignalSource>> {
        toggles
            .enabled()
            .into_iter()
            .filter_map(|family| self.sources.iter().find(|s| s.name() == family))
            .collect()
    }

    /// Run every enabled source for every competitor.
    ///
    /// Competitors and their sources all run concurrently. The result holds one
    /// [`CompetitorSignal`] per (competitor, source) in input order, with
    /// sources in toggle order. A link already seen for the same competitor is
    /// dropped from later sources.
    pub async fn collect(
        &self,
        competitors: &[String],
        toggles: &SourceToggles,
    ) -> Vec<CompetitorSignal> {
        let sources = self.enabled_sources(toggles);
        if sources.is_empty() {
            tracing::warn!(requested = ?toggles.enabled(), "no signal sources enabled");
            return Vec::new();
        }

        let per_competitor = join_all(
            competitors
                .iter()
                .map(|competitor| collect_one(competitor, &sources)),
        )
        .await;

        per_competitor.into_iter().flatten().collect()
    }
}

async fn collect_one(
    competitor: &str,
    sources: &[&Arc<dyn SignalSource>],
) -> Vec<CompetitorSignal> {
    let outcomes = join_all(sources.iter().map(|source| source.fetch(competitor))).await;

    let mut seen_urls: HashSet<String> = HashSet::new();
    sources
        .iter()
        .zip(outcomes)
        .map(|(source, outcome)| {
            let (mut items, unavailable) = match outcome {
                SourceOutcome::Items(items) => (items, None),
                SourceOutcome::Unavailable(reason) => (Vec::new(), Some(reason)),
            };
            items.retain(|item| match &item.url {
                Some(url) => seen_urls.insert(url.clone()),
                None => true,
            });
            CompetitorSignal {
                source: source.name().to_string(),
                competitor: competitor.to_string(),
                items,
                unavailable,
            }
        })
        .collect()
}
