#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Activity {
    #[default]
    Normal,
    Tutorial,
    Game,
    Edit,
    Tree,
}

impl Activity {
    pub fn to_key(self) -> &'static str {
        match self {
            Activity::Normal => "normal",
            Activity::Tutorial => "tutorial",
            Activity::Game => "game",
            Activity::Edit => "edit",
            Activity::Tree => "tree",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "normal" => Some(Activity::Normal),
            "tutorial" => Some(Activity::Tutorial),
            "game" => Some(Activity::Game),
            "edit" => Some(Activity::Edit),
            "tree" => Some(Activity::Tree),
            _ => None,
        }
    }

    pub fn all() -> &'static [Activity] {
        &[
            Activity::Normal,
            Activity::Tutorial,
            Activity::Game,
            Activity::Edit,
            Activity::Tree,
        ]
    }

    /// Edit and Tree sit outside the progression and never touch the ledgers.
    pub fn is_overlay(self) -> bool {
        matches!(self, Activity::Edit | Activity::Tree)
    }

    pub fn label(self) -> &'static str {
        match self {
            Activity::Normal => "Normal",
            Activity::Tutorial => "Tutorial",
            Activity::Game => "Game",
            Activity::Edit => "Edit",
            Activity::Tree => "Tree",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivityState {
    pub current: Activity,
    pub previous: Option<Activity>,
    pub transition_in_progress: bool,
    /// Every tutorial in the catalog is in the tutorial ledger.
    pub tutorial_completed: bool,
}

impl ActivityState {
    /// Moves to `next`, returning `(from, to)` when the activity actually changed.
    pub fn switch_to(&mut self, next: Activity) -> Option<(Activity, Activity)> {
        if self.current == next {
            return None;
        }
        let from = self.current;
        self.previous = Some(from);
        self.current = next;
        Some((from, next))
    }
}
