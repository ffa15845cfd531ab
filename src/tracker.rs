use crate::store::AlertStore;
use crate::types::{NewDeal, ScoredRow};
use tracing::{debug, info};

/// Lifetime state of one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertState {
    /// Never alerted; eligible once its residual crosses the threshold.
    Unseen,
    /// Alerted at `at`. Terminal: the link never alerts again.
    Alerted { at: String },
}

/// Promotes qualifying deals from UNSEEN to ALERTED, at most once per link.
pub struct AlertTracker<'a> {
    store: &'a mut dyn AlertStore,
    threshold: f64,
}

impl<'a> AlertTracker<'a> {
    pub fn new(store: &'a mut dyn AlertStore, threshold: f64) -> Self {
        Self { store, threshold }
    }

    pub fn state(&self, link: &str) -> AlertState {
        match self.store.get(link) {
            Some(at) => AlertState::Alerted { at: at.to_string() },
            None => AlertState::Unseen,
        }
    }

    pub fn qualifies(&self, row: &ScoredRow) -> bool {
        row.residual <= self.threshold
    }

    /// Walks the ranked deals in order and returns the ones alerted for the
    /// first time. Already-alerted links are skipped without touching their
    /// original timestamp.
    pub fn apply(&mut self, ranked: &[ScoredRow], alerted_at: &str) -> Vec<NewDeal> {
        let mut new_deals = Vec::new();
        let mut repeats = 0usize;
        for row in ranked {
            if !self.qualifies(row) {
                continue;
            }
            let link = row.link();
            if self.store.put(link, alerted_at) {
                info!(
                    "[Alerts] NEW: {} residual {:.0} (predicted {:.0})",
                    link, row.residual, row.predicted_price
                );
                new_deals.push(NewDeal::from_scored(row, alerted_at));
            } else {
                debug!("[Alerts] Already alerted: {}", link);
                repeats += 1;
            }
        }

        info!(
            "[Alerts] {} new deal(s), {} previously alerted (store size: {})",
            new_deals.len(),
            repeats,
            self.store.len()
        );
        new_deals
    }
}
