use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::store::schema::{AchievedPhrase, COMPLETED_TUTORIALS_KEY, PHRASES_ACHIEVED_KEY};
use crate::store::{KeyValueStore, load_json, save_json};

/// How the ledger is written at the storage boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerEncoding {
    /// JSON array of keys.
    Keys,
    /// JSON array of `"<wpm>:<key>"` strings.
    WpmPrefixed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LedgerEvent {
    Added(String),
    AddedMany(Vec<String>),
    Reset,
}

#[derive(Clone, Debug, PartialEq)]
struct LedgerEntry {
    key: String,
    wpm: Option<f64>,
}

/// Persisted, observable, add-only set of completed keys.
///
/// Every mutation is written through to storage immediately. A failed write
/// is logged and otherwise ignored: the in-memory set stays authoritative and
/// the next successful write carries the full contents.
pub struct CompletionLedger {
    storage_key: &'static str,
    encoding: LedgerEncoding,
    entries: Vec<LedgerEntry>,
    index: HashSet<String>,
    store: Rc<dyn KeyValueStore>,
    subscribers: Vec<Sender<LedgerEvent>>,
}

impl CompletionLedger {
    pub fn tutorials(store: Rc<dyn KeyValueStore>) -> Self {
        Self::load(COMPLETED_TUTORIALS_KEY, LedgerEncoding::Keys, store)
    }

    pub fn phrases(store: Rc<dyn KeyValueStore>) -> Self {
        Self::load(PHRASES_ACHIEVED_KEY, LedgerEncoding::WpmPrefixed, store)
    }

    pub fn load(
        storage_key: &'static str,
        encoding: LedgerEncoding,
        store: Rc<dyn KeyValueStore>,
    ) -> Self {
        let raw: Vec<String> = match load_json(store.as_ref(), storage_key) {
            Ok(raw) => raw.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(key = storage_key, error = %e, "could not load ledger, starting empty");
                Vec::new()
            }
        };

        let mut ledger = Self {
            storage_key,
            encoding,
            entries: Vec::new(),
            index: HashSet::new(),
            store,
            subscribers: Vec::new(),
        };
        for item in raw {
            let entry = match encoding {
                LedgerEncoding::Keys => LedgerEntry {
                    key: item,
                    wpm: None,
                },
                LedgerEncoding::WpmPrefixed => {
                    let phrase = AchievedPhrase::decode(&item);
                    LedgerEntry {
                        key: phrase.key,
                        wpm: Some(phrase.wpm),
                    }
                }
            };
            ledger.insert(entry);
        }
        tracing::debug!(key = storage_key, count = ledger.len(), "ledger loaded");
        ledger
    }

    pub fn has(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in the order they were added.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn achieved_wpm(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .and_then(|e| e.wpm)
    }

    /// Returns `true` if the key was new. Present keys cause no write and no event.
    pub fn add(&mut self, key: &str) -> bool {
        self.add_entry(LedgerEntry {
            key: key.to_string(),
            wpm: None,
        })
    }

    /// Like [`add`](Self::add), remembering the WPM the key was achieved at.
    pub fn add_achieved(&mut self, key: &str, wpm: f64) -> bool {
        self.add_entry(LedgerEntry {
            key: key.to_string(),
            wpm: Some(wpm),
        })
    }

    /// Adds every new key with a single write and a single event.
    /// Returns the number of keys that were new.
    pub fn extend<I, S>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = Vec::new();
        for key in keys {
            let key = key.into();
            if self.insert(LedgerEntry {
                key: key.clone(),
                wpm: None,
            }) {
                added.push(key);
            }
        }
        if added.is_empty() {
            return 0;
        }
        let count = added.len();
        self.persist();
        self.notify(LedgerEvent::AddedMany(added));
        count
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.persist();
        self.notify(LedgerEvent::Reset);
        tracing::info!(key = self.storage_key, "ledger reset");
    }

    pub fn snapshot(&self) -> BTreeSet<String> {
        self.index.iter().cloned().collect()
    }

    pub fn subscribe(&mut self) -> Receiver<LedgerEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn add_entry(&mut self, entry: LedgerEntry) -> bool {
        let key = entry.key.clone();
        if !self.insert(entry) {
            return false;
        }
        self.persist();
        tracing::debug!(ledger = self.storage_key, key = %key.escape_debug(), "ledger entry added");
        self.notify(LedgerEvent::Added(key));
        true
    }

    fn insert(&mut self, entry: LedgerEntry) -> bool {
        if self.index.contains(&entry.key) {
            return false;
        }
        self.index.insert(entry.key.clone());
        self.entries.push(entry);
        true
    }

    fn encoded(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| match self.encoding {
                LedgerEncoding::Keys => e.key.clone(),
                LedgerEncoding::WpmPrefixed => AchievedPhrase {
                    key: e.key.clone(),
                    wpm: e.wpm.unwrap_or(0.0),
                }
                .encode(),
            })
            .collect()
    }

    fn persist(&self) {
        if let Err(e) = save_json(self.store.as_ref(), self.storage_key, &self.encoded()) {
            tracing::warn!(key = self.storage_key, error = %e, "failed to persist ledger");
        }
    }

    fn notify(&mut self, event: LedgerEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
