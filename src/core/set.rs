//! # Named card set for one unit of work.
//!
//! A task may carry several cards at once (a progress card plus a profiler
//! card, say). [`CardSet`] keys them by name and scopes attachment state to
//! one explicit object with the task's lifetime — no global caches.
//!
//! ## Rules
//! - Names are unique; inserting under a taken name replaces the card.
//! - `finalize_all` attempts every card even if one fails, surfacing the
//!   first error afterwards.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::card::LiveCard;
use crate::error::RenderError;

/// Named collection of live cards owned by one task execution.
#[derive(Default)]
pub struct CardSet {
    cards: Mutex<HashMap<String, LiveCard>>,
}

impl CardSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a card under its own name, replacing any previous holder.
    pub fn insert(&self, card: LiveCard) {
        let mut cards = self.lock();
        cards.insert(card.name().to_string(), card);
    }

    /// Returns the card registered under `name`.
    pub fn get(&self, name: &str) -> Option<LiveCard> {
        self.lock().get(name).cloned()
    }

    /// Returns the sorted list of card names.
    pub fn names(&self) -> Vec<String> {
        let cards = self.lock();
        let mut names: Vec<String> = cards.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Returns true if the set holds no cards.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Refreshes every card, surfacing the first error after attempting all.
    pub async fn refresh_all(&self) -> Result<(), RenderError> {
        let cards = self.snapshot();
        let mut first_err = None;
        for card in cards {
            if let Err(e) = card.refresh().await {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Finalizes every card, surfacing the first error after attempting all.
    pub async fn finalize_all(&self) -> Result<(), RenderError> {
        let cards = self.snapshot();
        let mut first_err = None;
        for card in cards {
            if let Err(e) = card.finalize().await {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Collects the cards in name order (stable iteration for finalize).
    fn snapshot(&self) -> Vec<LiveCard> {
        let cards = self.lock();
        let mut entries: Vec<(&String, &LiveCard)> = cards.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, c)| c.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, LiveCard>> {
        self.cards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::components::Component;
    use crate::config::CardConfig;
    use crate::core::barrier::Phase;
    use crate::sink::MemorySink;

    fn card(name: &str, sink: Arc<MemorySink>) -> LiveCard {
        let cfg = CardConfig {
            refresh_interval: Duration::from_millis(10),
            render_timeout: Duration::ZERO,
            grace: Duration::from_millis(500),
            ..CardConfig::default()
        };
        LiveCard::builder(cfg).with_name(name).with_sink(sink).build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_get_and_names() {
        let set = CardSet::new();
        assert!(set.is_empty());

        let sink = Arc::new(MemorySink::new());
        set.insert(card("profiler", sink.clone()));
        set.insert(card("training", sink.clone()));

        assert_eq!(set.names(), vec!["profiler".to_string(), "training".to_string()]);
        assert_eq!(set.get("training").unwrap().name(), "training");
        assert!(set.get("missing").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalize_all_finalizes_every_card() {
        let set = CardSet::new();
        let sink = Arc::new(MemorySink::new());

        for name in ["one", "two"] {
            let c = card(name, sink.clone());
            c.append_with_id(Component::markdown(name), "body").unwrap();
            set.insert(c);
        }

        set.finalize_all().await.unwrap();
        assert_eq!(set.get("one").unwrap().phase(), Phase::Finalized);
        assert_eq!(set.get("two").unwrap().phase(), Phase::Finalized);

        let finals: Vec<_> = sink
            .stored()
            .into_iter()
            .filter(|a| a.status == crate::artifact::RenderStatus::Final)
            .collect();
        assert_eq!(finals.len(), 2);
    }
}
