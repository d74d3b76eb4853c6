use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::model::{Match, StandingsRow};

pub const DEFAULT_FLASH: Duration = Duration::from_millis(800);

/// A record whose numeric fields are watched for changes between polls.
pub trait Tracked {
    type Key: Eq + Hash + Clone;

    fn key(&self) -> Self::Key;

    /// `(field name, value)` pairs compared against the cached copy.
    fn tracked_fields(&self) -> Vec<(&'static str, Option<i64>)>;
}

impl Tracked for Match {
    type Key = u64;

    fn key(&self) -> u64 {
        self.id
    }

    fn tracked_fields(&self) -> Vec<(&'static str, Option<i64>)> {
        vec![
            ("home_score", self.home_score.map(i64::from)),
            ("away_score", self.away_score.map(i64::from)),
        ]
    }
}

impl Tracked for StandingsRow {
    type Key = u64;

    fn key(&self) -> u64 {
        self.team_id
    }

    fn tracked_fields(&self) -> Vec<(&'static str, Option<i64>)> {
        vec![
            ("played", Some(i64::from(self.played))),
            ("wins", Some(i64::from(self.wins))),
            ("draws", Some(i64::from(self.draws))),
            ("losses", Some(i64::from(self.losses))),
            ("goals_for", Some(i64::from(self.goals_for))),
            ("goals_against", Some(i64::from(self.goals_against))),
            ("goal_diff", Some(self.goal_diff)),
            ("points", Some(i64::from(self.points))),
        ]
    }
}

pub type ChangeSet<K> = HashMap<K, HashSet<&'static str>>;

/// Records present in both lists whose tracked fields differ. New or
/// vanished records are not changes.
pub fn diff_tracked<T: Tracked>(previous: &[T], incoming: &[T]) -> ChangeSet<T::Key> {
    let before: HashMap<T::Key, Vec<(&'static str, Option<i64>)>> = previous
        .iter()
        .map(|r| (r.key(), r.tracked_fields()))
        .collect();
    let mut changes: ChangeSet<T::Key> = HashMap::new();
    for record in incoming {
        let Some(old) = before.get(&record.key()) else {
            continue;
        };
        for (field, value) in record.tracked_fields() {
            let old_value = old.iter().find(|(f, _)| *f == field).map(|(_, v)| *v);
            if old_value != Some(value) {
                changes.entry(record.key()).or_default().insert(field);
            }
        }
    }
    changes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Applied,
    Deferred { changed_records: usize },
}

#[derive(Debug, Clone)]
struct PendingUpdate<T> {
    data: Vec<T>,
    due: Instant,
}

/// Holds the displayed copy of a polled list and delays updates that change
/// tracked numbers so the change can be highlighted first.
///
/// Time is passed in by the caller; `tick` plays the role of the timer.
/// A newer update always replaces a pending one, so intermediate values
/// are never displayed.
#[derive(Debug, Clone)]
pub struct FlashBuffer<T: Tracked> {
    displayed: Vec<T>,
    pending: Option<PendingUpdate<T>>,
    flash: ChangeSet<T::Key>,
    duration: Duration,
}

impl<T: Tracked> Default for FlashBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_FLASH)
    }
}

impl<T: Tracked> FlashBuffer<T> {
    pub fn new(duration: Duration) -> Self {
        Self {
            displayed: Vec::new(),
            pending: None,
            flash: HashMap::new(),
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn displayed(&self) -> &[T] {
        &self.displayed
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    pub fn is_flashing(&self, key: &T::Key) -> bool {
        self.flash.contains_key(key)
    }

    pub fn is_field_flashing(&self, key: &T::Key, field: &str) -> bool {
        self.flash.get(key).is_some_and(|fields| fields.contains(field))
    }

    pub fn flash_state(&self) -> &ChangeSet<T::Key> {
        &self.flash
    }

    /// Takes a poll result. Unchanged data lands immediately (dropping any
    /// pending update); changed data is buffered until `now + duration`.
    pub fn ingest(&mut self, incoming: Vec<T>, now: Instant) -> IngestOutcome {
        let changes = diff_tracked(&self.displayed, &incoming);
        if changes.is_empty() {
            self.pending = None;
            self.flash.clear();
            self.displayed = incoming;
            return IngestOutcome::Applied;
        }
        let changed_records = changes.len();
        self.flash = changes;
        self.pending = Some(PendingUpdate {
            data: incoming,
            due: now + self.duration,
        });
        IngestOutcome::Deferred { changed_records }
    }

    /// Applies the buffered update once it is due. Returns true when the
    /// displayed data changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let due = match &self.pending {
            Some(p) => p.due <= now,
            None => false,
        };
        if !due {
            return false;
        }
        if let Some(pending) = self.pending.take() {
            self.displayed = pending.data;
        }
        self.flash.clear();
        true
    }

    /// Replaces displayed data without flashing, e.g. after a selection
    /// change invalidates the old list.
    pub fn reset(&mut self, data: Vec<T>) {
        self.pending = None;
        self.flash.clear();
        self.displayed = data;
    }

    /// Optimistic local edit applied to both the displayed copy and any
    /// pending update.
    pub fn patch(&mut self, mut edit: impl FnMut(&mut T)) {
        for record in self.displayed.iter_mut() {
            edit(record);
        }
        if let Some(pending) = self.pending.as_mut() {
            for record in pending.data.iter_mut() {
                edit(record);
            }
        }
    }
}
