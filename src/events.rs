use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::model::Match;

/// Broadcast after an admin write so every view holding the match can patch
/// itself without waiting for the next poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvent {
    /// Full record after a state change (e.g. marked finished). Replace it.
    Updated(Match),
    /// Result saved. Merge only the score fields.
    ScoresSaved(Match),
}

impl MatchEvent {
    pub fn record(&self) -> &Match {
        match self {
            MatchEvent::Updated(m) | MatchEvent::ScoresSaved(m) => m,
        }
    }

    /// Group-stage results feed the standings table of their season. A
    /// record without a season is assumed to belong to the shown one.
    pub fn affects_standings(&self, season_id: u64) -> bool {
        let record = self.record();
        record.stage().is_group() && record.season_id.is_none_or(|id| id == season_id)
    }

    /// Applies the event to `target` if it is the same match. Returns true
    /// when something was patched.
    pub fn apply_to(&self, target: &mut Match) -> bool {
        let record = self.record();
        if target.id != record.id {
            return false;
        }
        match self {
            MatchEvent::Updated(m) => *target = m.clone(),
            MatchEvent::ScoresSaved(m) => target.merge_scores_from(m),
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<MatchEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<MatchEvent> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    /// Delivers to every live subscriber and forgets those whose receiver
    /// was dropped. Returns the number of deliveries.
    pub fn publish(&self, event: MatchEvent) -> usize {
        let Ok(mut subs) = self.subscribers.lock() else {
            return 0;
        };
        subs.retain(|tx| tx.send(event.clone()).is_ok());
        subs.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}
