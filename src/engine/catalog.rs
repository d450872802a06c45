use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::ledger::CompletionLedger;

const BUILTIN_CURRICULUM: &str = include_str!("../../assets/curriculum.toml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse curriculum: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("duplicate curriculum key {0:?}")]
    DuplicateKey(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayAs {
    Tutorial,
    Game,
    #[default]
    None,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumEntry {
    pub key: String,
    /// Exact text to reproduce. `None` only in a malformed catalog.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub display_as: DisplayAs,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CurriculumEntry {
    pub fn tutorial(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: Some(value.to_string()),
            display_as: DisplayAs::Tutorial,
            group: None,
            description: None,
        }
    }

    pub fn game(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: Some(value.to_string()),
            display_as: DisplayAs::Game,
            group: None,
            description: None,
        }
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn unlock_text(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_tutorial(&self) -> bool {
        self.display_as == DisplayAs::Tutorial
    }

    pub fn is_game(&self) -> bool {
        self.display_as == DisplayAs::Game
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.group.as_deref() == Some(group)
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "entry")]
    entries: Vec<CurriculumEntry>,
}

/// Ordered, read-only list of lessons and phrases. Catalog order is unlock order.
#[derive(Clone, Debug)]
pub struct Catalog {
    entries: Vec<CurriculumEntry>,
}

impl Catalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml(BUILTIN_CURRICULUM)
    }

    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::from_entries(file.entries)
    }

    pub fn from_entries(entries: Vec<CurriculumEntry>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.key.as_str()) {
                return Err(CatalogError::DuplicateKey(entry.key.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CurriculumEntry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&CurriculumEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn tutorials(&self) -> impl Iterator<Item = &CurriculumEntry> {
        self.entries.iter().filter(|e| e.is_tutorial())
    }

    pub fn game_phrases(&self) -> impl Iterator<Item = &CurriculumEntry> {
        self.entries.iter().filter(|e| e.is_game())
    }

    /// Position of a tutorial among tutorials only.
    pub fn tutorial_index(&self, key: &str) -> Option<usize> {
        self.tutorials().position(|e| e.key == key)
    }

    /// Distinct group tags in first-seen order.
    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for group in self.entries.iter().filter_map(|e| e.group.as_deref()) {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        groups
    }

    pub fn next_tutorial(&self, tutorials: &CompletionLedger) -> Option<&CurriculumEntry> {
        self.tutorials().find(|e| !tutorials.has(&e.key))
    }

    pub fn next_game_phrase(&self, phrases: &CompletionLedger) -> Option<&CurriculumEntry> {
        self.game_phrases().find(|e| !phrases.has(&e.key))
    }

    /// Tutorial and Game entries tagged `group` that their ledger has not recorded.
    pub fn incomplete_in_group(
        &self,
        group: &str,
        tutorials: &CompletionLedger,
        phrases: &CompletionLedger,
    ) -> Vec<&CurriculumEntry> {
        self.entries
            .iter()
            .filter(|e| e.in_group(group))
            .filter(|e| match e.display_as {
                DisplayAs::Tutorial => !tutorials.has(&e.key),
                DisplayAs::Game => !phrases.has(&e.key),
                DisplayAs::None => false,
            })
            .collect()
    }

    pub fn incomplete_games_in_group(
        &self,
        group: &str,
        phrases: &CompletionLedger,
    ) -> Vec<&CurriculumEntry> {
        self.game_phrases()
            .filter(|e| e.in_group(group) && !phrases.has(&e.key))
            .collect()
    }

    pub fn incomplete_tutorials_in_group(
        &self,
        group: &str,
        tutorials: &CompletionLedger,
    ) -> Vec<&CurriculumEntry> {
        self.tutorials()
            .filter(|e| e.in_group(group) && !tutorials.has(&e.key))
            .collect()
    }

    pub fn all_tutorials_complete(&self, tutorials: &CompletionLedger) -> bool {
        self.tutorials().all(|e| tutorials.has(&e.key))
    }

    pub fn tutorial_progress(&self, tutorials: &CompletionLedger) -> f64 {
        let total = self.tutorials().count();
        if total == 0 {
            return 1.0;
        }
        let done = self.tutorials().filter(|e| tutorials.has(&e.key)).count();
        done as f64 / total as f64
    }

    pub fn phrase_progress(&self, phrases: &CompletionLedger) -> f64 {
        let total = self.game_phrases().count();
        if total == 0 {
            return 1.0;
        }
        let done = self.game_phrases().filter(|e| phrases.has(&e.key)).count();
        done as f64 / total as f64
    }
}
