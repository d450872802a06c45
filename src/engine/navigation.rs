use std::fmt;

use crate::engine::activity::Activity;

/// Stand-in for a literal carriage return in an encoded content key.
pub const ENTER_TOKEN: &str = "ENTER";

const ENTER: &str = "\r";

/// Where the front end should be: activity, content and group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigationTarget {
    pub activity: Activity,
    pub content_key: Option<String>,
    pub group: Option<String>,
}

impl NavigationTarget {
    pub fn new(activity: Activity, content_key: Option<&str>, group: Option<&str>) -> Self {
        Self {
            activity,
            content_key: content_key.map(str::to_string),
            group: group.map(str::to_string),
        }
    }

    pub fn normal() -> Self {
        Self::default()
    }

    /// `activity=<key>[&key=<content>][&group=<group>]`, percent-encoded.
    pub fn to_query(&self) -> String {
        let mut query = format!("activity={}", self.activity.to_key());
        if let Some(content) = &self.content_key {
            let content = if content == ENTER {
                ENTER_TOKEN.to_string()
            } else {
                urlencoding::encode(content).into_owned()
            };
            query.push_str("&key=");
            query.push_str(&content);
        }
        if let Some(group) = &self.group {
            query.push_str("&group=");
            query.push_str(&urlencoding::encode(group));
        }
        query
    }

    /// Unknown parameters are ignored; a missing or unknown activity yields `None`.
    pub fn from_query(query: &str) -> Option<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut target = NavigationTarget::default();
        let mut activity = None;
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (name, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(raw).ok()?.into_owned();
            match name {
                "activity" => activity = Activity::from_key(&value),
                "key" => {
                    target.content_key = Some(if value == ENTER_TOKEN {
                        ENTER.to_string()
                    } else {
                        value
                    })
                }
                "group" => target.group = Some(value),
                _ => {}
            }
        }
        target.activity = activity?;
        Some(target)
    }
}

impl fmt::Display for NavigationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.to_query())
    }
}
