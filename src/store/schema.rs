use serde::{Deserialize, Serialize};

pub const COMPLETED_TUTORIALS_KEY: &str = "completed-tutorials";
pub const PHRASES_ACHIEVED_KEY: &str = "phrasesAchieved";
pub const TUTORIAL_STATE_KEY: &str = "tutorial-state";
pub const SESSION_KEY_PREFIX: &str = "charTimer_session_";

pub fn session_key(session_id: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{session_id}")
}

/// Snapshot of tutorial position for external harnesses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorialState {
    pub current_step: Option<usize>,
}

/// One entry of a `charTimer_session_*` snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharWpm {
    pub character: char,
    pub wpm: f64,
}

/// A phrase recorded in the achieved ledger, with the WPM it was achieved at.
///
/// Stored as `"<wpm>:<key>"` strings. The key may itself contain `:`, so only
/// the first separator counts.
#[derive(Clone, Debug, PartialEq)]
pub struct AchievedPhrase {
    pub key: String,
    pub wpm: f64,
}

impl AchievedPhrase {
    pub fn encode(&self) -> String {
        format!("{}:{}", self.wpm, self.key)
    }

    /// Entries without a numeric prefix are kept whole with a WPM of zero.
    pub fn decode(raw: &str) -> Self {
        if let Some((prefix, key)) = raw.split_once(':')
            && let Ok(wpm) = prefix.parse::<f64>()
        {
            return Self {
                key: key.to_string(),
                wpm,
            };
        }
        Self {
            key: raw.to_string(),
            wpm: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn achieved_phrase_encoding() {
        let phrase = AchievedPhrase {
            key: "all sad lads fall".to_string(),
            wpm: 12.5,
        };
        assert_eq!(phrase.encode(), "12.5:all sad lads fall");
        assert_eq!(AchievedPhrase::decode("12.5:all sad lads fall"), phrase);
    }

    #[test]
    fn achieved_phrase_whole_number_wpm() {
        let phrase = AchievedPhrase {
            key: "asdf".to_string(),
            wpm: 12.0,
        };
        assert_eq!(phrase.encode(), "12:asdf");
    }

    #[test]
    fn decode_keeps_colons_in_key() {
        let phrase = AchievedPhrase::decode("30.25:a: b");
        assert_eq!(phrase.key, "a: b");
        assert_eq!(phrase.wpm, 30.25);
    }

    #[test]
    fn decode_without_wpm_prefix() {
        let phrase = AchievedPhrase::decode("jkl;");
        assert_eq!(phrase.key, "jkl;");
        assert_eq!(phrase.wpm, 0.0);

        let phrase = AchievedPhrase::decode("x:y");
        assert_eq!(phrase.key, "x:y");
        assert_eq!(phrase.wpm, 0.0);
    }

    #[test]
    fn tutorial_state_field_name() {
        let json = serde_json::to_string(&TutorialState {
            current_step: Some(3),
        })
        .unwrap();
        assert_eq!(json, r#"{"currentStep":3}"#);
    }

    #[test]
    fn session_key_prefix() {
        assert_eq!(session_key("1700000000000"), "charTimer_session_1700000000000");
    }
}
