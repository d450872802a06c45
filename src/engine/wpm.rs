use std::rc::Rc;
use std::time::Instant;

use crate::store::schema::{CharWpm, SESSION_KEY_PREFIX, session_key};
use crate::store::{KeyValueStore, save_json};

pub const CHARS_PER_WORD: f64 = 5.0;

/// Session snapshots kept in storage; older ones are pruned on flush.
const MAX_STORED_SESSIONS: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CharDuration {
    pub character: char,
    pub duration_ms: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSummary {
    pub average: f64,
    pub per_character: Vec<CharWpm>,
}

/// WPM for a single inter-keystroke gap, 5 characters per word, rounded to 3 decimals.
pub fn wpm(duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return 0.0;
    }
    let minutes = duration_ms / 60_000.0;
    round3((1.0 / minutes) / CHARS_PER_WORD)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Keystroke timing for the line currently being typed.
///
/// Keystrokes live only in memory until [`flush`](Self::flush), which is the
/// single point where timing data reaches storage.
pub struct WpmCalculator {
    store: Rc<dyn KeyValueStore>,
    records: Vec<CharDuration>,
    previous: Option<Instant>,
}

impl WpmCalculator {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            records: Vec::new(),
            previous: None,
        }
    }

    pub fn record_keystroke(&mut self, character: char) -> CharDuration {
        self.record_keystroke_at(character, Instant::now())
    }

    pub fn record_keystroke_at(&mut self, character: char, at: Instant) -> CharDuration {
        let duration_ms = match self.previous {
            Some(prev) => at.saturating_duration_since(prev).as_secs_f64() * 1000.0,
            None => 0.0,
        };
        self.previous = Some(at);
        let record = CharDuration {
            character,
            duration_ms,
        };
        self.records.push(record);
        record
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CharDuration] {
        &self.records
    }

    /// Zero-duration keystrokes (the first of a session) are left out of the
    /// average's denominator.
    pub fn session_average(&self) -> SessionSummary {
        let per_character: Vec<CharWpm> = self
            .records
            .iter()
            .map(|r| CharWpm {
                character: r.character,
                wpm: wpm(r.duration_ms),
            })
            .collect();

        let timed: Vec<f64> = self
            .records
            .iter()
            .filter(|r| r.duration_ms > 0.0)
            .map(|r| wpm(r.duration_ms))
            .collect();
        let average = if timed.is_empty() {
            0.0
        } else {
            round3(timed.iter().sum::<f64>() / timed.len() as f64)
        };

        SessionSummary {
            average,
            per_character,
        }
    }

    /// Persists the per-character breakdown under `charTimer_session_<id>` and
    /// starts a fresh session. An empty buffer writes nothing.
    pub fn flush(&mut self, session_id: &str) -> SessionSummary {
        let summary = self.session_average();
        if !summary.per_character.is_empty() {
            let key = session_key(session_id);
            match save_json(self.store.as_ref(), &key, &summary.per_character) {
                Ok(()) => {
                    tracing::debug!(key = %key, average = summary.average, "wpm session flushed");
                    self.prune_sessions();
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "failed to persist wpm session"),
            }
        }
        self.clear();
        summary
    }

    /// Discards the in-flight session without writing it.
    pub fn cancel(&mut self) {
        if !self.records.is_empty() {
            tracing::debug!(keystrokes = self.records.len(), "wpm session discarded");
        }
        self.clear();
    }

    fn clear(&mut self) {
        self.records.clear();
        self.previous = None;
    }

    fn prune_sessions(&self) {
        let mut sessions: Vec<(i64, String)> = match self.store.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|k| {
                    let stamp = k.strip_prefix(SESSION_KEY_PREFIX)?.parse::<i64>().ok()?;
                    Some((stamp, k))
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "could not list wpm sessions");
                return;
            }
        };
        if sessions.len() <= MAX_STORED_SESSIONS {
            return;
        }
        sessions.sort();
        let excess = sessions.len() - MAX_STORED_SESSIONS;
        for (_, key) in sessions.into_iter().take(excess) {
            if let Err(e) = self.store.remove(&key) {
                tracing::warn!(key = %key, error = %e, "failed to prune wpm session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::store::memory_store::MemoryStore;

    fn make_calculator() -> (Rc<MemoryStore>, WpmCalculator) {
        let store = Rc::new(MemoryStore::new());
        let calc = WpmCalculator::new(store.clone());
        (store, calc)
    }

    #[test]
    fn test_wpm_formula() {
        assert_eq!(wpm(0.0), 0.0);
        assert_eq!(wpm(-5.0), 0.0);
        // 600ms per char = 100 chars/min = 20 words/min
        assert_eq!(wpm(600.0), 20.0);
        assert_eq!(wpm(1000.0), 12.0);
        // 60000 / 700 / 5 = 17.142857...
        assert_eq!(wpm(700.0), 17.143);
    }

    #[test]
    fn test_first_keystroke_has_zero_duration() {
        let (_store, mut calc) = make_calculator();
        let t0 = Instant::now();
        let first = calc.record_keystroke_at('a', t0);
        let second = calc.record_keystroke_at('s', t0 + Duration::from_millis(250));
        assert_eq!(first.duration_ms, 0.0);
        assert!((second.duration_ms - 250.0).abs() < 0.001);
    }

    #[test]
    fn test_average_excludes_first_keystroke() {
        let (_store, mut calc) = make_calculator();
        let t0 = Instant::now();
        calc.record_keystroke_at('a', t0);
        calc.record_keystroke_at('s', t0 + Duration::from_millis(600));

        let summary = calc.session_average();
        assert_eq!(summary.average, wpm(600.0));
        assert_eq!(summary.per_character.len(), 2);
        assert_eq!(summary.per_character[0].wpm, 0.0);
    }

    #[test]
    fn test_average_of_empty_session_is_zero() {
        let (_store, calc) = make_calculator();
        assert_eq!(calc.session_average().average, 0.0);
    }

    #[test]
    fn test_flush_persists_and_clears() {
        let (store, mut calc) = make_calculator();
        let t0 = Instant::now();
        calc.record_keystroke_at('f', t0);
        calc.record_keystroke_at('d', t0 + Duration::from_millis(1000));

        let summary = calc.flush("42");
        assert_eq!(summary.average, 12.0);
        assert!(calc.is_empty());

        let stored = store.raw("charTimer_session_42").unwrap();
        let parsed: Vec<CharWpm> = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed, summary.per_character);
        assert_eq!(parsed[1].character, 'd');

        // A new session starts without a previous timestamp.
        let next = calc.record_keystroke_at('s', t0 + Duration::from_millis(5000));
        assert_eq!(next.duration_ms, 0.0);
    }

    #[test]
    fn test_flush_empty_writes_nothing() {
        let (store, mut calc) = make_calculator();
        calc.flush("1");
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_cancel_discards_without_writing() {
        let (store, mut calc) = make_calculator();
        calc.record_keystroke('a');
        calc.record_keystroke('b');
        calc.cancel();
        assert!(calc.is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_failed_flush_still_clears_buffer() {
        let (store, mut calc) = make_calculator();
        store.set_failing(true);
        calc.record_keystroke('a');
        let summary = calc.flush("7");
        assert_eq!(summary.per_character.len(), 1);
        assert!(calc.is_empty());
        assert!(store.raw("charTimer_session_7").is_none());
    }

    #[test]
    fn test_prunes_oldest_sessions() {
        let (store, mut calc) = make_calculator();
        for i in 0..MAX_STORED_SESSIONS {
            store.set(&session_key(&(1000 + i).to_string()), "[]").unwrap();
        }
        calc.record_keystroke('x');
        calc.flush("999999");

        let keys = store.keys().unwrap();
        let sessions = keys
            .iter()
            .filter(|k| k.starts_with(SESSION_KEY_PREFIX))
            .count();
        assert_eq!(sessions, MAX_STORED_SESSIONS);
        assert!(store.raw("charTimer_session_1000").is_none());
        assert!(store.raw("charTimer_session_999999").is_some());
    }
}
