use std::rc::Rc;
use std::sync::mpsc::Receiver;

use crate::config::Config;
use crate::engine::activity::Activity;
use crate::engine::catalog::Catalog;
use crate::engine::command::ParsedCommand;
use crate::engine::ledger::LedgerEvent;
use crate::engine::mediator::{ActivityMediator, MediatorEvent, Notice};
use crate::store::KeyValueStore;
use crate::ui::components::curriculum_tree::display_text;
use crate::ui::line_input::{InputResult, LineInput};
use crate::ui::theme::Theme;

/// Names offered by tab completion on the command line.
pub const COMMANDS: &[&str] = &["clear", "edit", "help", "play", "quit", "tree", "tut"];

const MAX_SCROLLBACK: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

pub struct App {
    pub mediator: ActivityMediator,
    pub config: Config,
    pub theme: &'static Theme,
    pub input: LineInput,
    pub status: Option<StatusMessage>,
    /// Command line output in Normal mode.
    pub scrollback: Vec<String>,
    /// Lines written in Edit mode.
    pub scratch: Vec<String>,
    pub tree_selected: usize,
    pub should_quit: bool,
    events: Receiver<MediatorEvent>,
    tutorial_events: Receiver<LedgerEvent>,
}

impl App {
    pub fn new(
        config: Config,
        theme: &'static Theme,
        store: Rc<dyn KeyValueStore>,
        catalog: Catalog,
    ) -> Self {
        let mut mediator = ActivityMediator::new(catalog, store, config.target_wpm);
        let events = mediator.subscribe();
        let tutorial_events = mediator.subscribe_tutorials();
        Self {
            mediator,
            config,
            theme,
            input: LineInput::new("").with_commands(COMMANDS),
            status: None,
            scrollback: Vec::new(),
            scratch: Vec::new(),
            tree_selected: 0,
            should_quit: false,
            events,
            tutorial_events,
        }
    }

    pub fn activity(&self) -> Activity {
        self.mediator.activity()
    }

    /// Text the user is asked to type in Tutorial and Game mode.
    pub fn target_text(&self) -> Option<&str> {
        self.mediator.current_entry()?.unlock_text()
    }

    pub fn handle_input(&mut self, result: InputResult) {
        match result {
            InputResult::Typed(ch) => {
                if matches!(self.activity(), Activity::Tutorial | Activity::Game) {
                    self.mediator.record_keystroke(ch);
                }
            }
            InputResult::Submit => self.submit(),
            InputResult::Cancel => self.cancel(),
            InputResult::Continue => {}
        }
        self.drain_events();
    }

    pub fn submit(&mut self) {
        let line = self.input.take();
        match self.activity() {
            Activity::Normal => self.run_command(&line),
            Activity::Tutorial => {
                self.mediator.check_tutorial_progress(Some(&line));
            }
            Activity::Game => {
                self.mediator.check_game_progress(&line);
            }
            Activity::Edit => self.scratch.push(line),
            Activity::Tree => {}
        }
        self.drain_events();
    }

    /// First press drops the current line; a second press on an empty line
    /// leaves the activity.
    pub fn cancel(&mut self) {
        let had_text = !self.input.value().is_empty();
        self.input.clear();
        self.mediator.cancel_input();
        if had_text {
            return;
        }
        if self.activity() != Activity::Normal {
            self.mediator.leave_overlay();
            self.status = None;
        }
        self.drain_events();
    }

    pub fn tree_next(&mut self) {
        let len = self.mediator.catalog().entries().len();
        if len > 0 {
            self.tree_selected = (self.tree_selected + 1) % len;
        }
    }

    pub fn tree_prev(&mut self) {
        let len = self.mediator.catalog().entries().len();
        if len > 0 {
            self.tree_selected = (self.tree_selected + len - 1) % len;
        }
    }

    fn run_command(&mut self, line: &str) {
        let Some(command) = ParsedCommand::parse(line) else {
            return;
        };
        self.echo(format!("$ {}", line.trim()));
        if self.mediator.handle_command_executed(&command) {
            return;
        }
        match command.name.as_str() {
            "edit" => {
                self.mediator.enter_overlay(Activity::Edit);
            }
            "tree" => {
                self.tree_selected = 0;
                self.mediator.enter_overlay(Activity::Tree);
            }
            "clear" => self.scrollback.clear(),
            "help" => {
                self.echo("play          practice phrases");
                self.echo("tut [-r]      lessons, -r starts over");
                self.echo("tree          show the curriculum");
                self.echo("edit          scratch buffer");
                self.echo("clear, quit");
            }
            "quit" | "exit" => self.should_quit = true,
            other => {
                tracing::debug!(command = other, "unknown command");
                self.echo(format!("{other}: command not found"));
            }
        }
    }

    fn echo(&mut self, line: impl Into<String>) {
        self.scrollback.push(line.into());
        if self.scrollback.len() > MAX_SCROLLBACK {
            let excess = self.scrollback.len() - MAX_SCROLLBACK;
            self.scrollback.drain(..excess);
        }
    }

    /// Turns queued mediator and ledger events into the status line.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                MediatorEvent::Notice(notice) => self.status = Some(self.describe(notice)),
                MediatorEvent::ActivityChanged { from, to } => {
                    tracing::debug!(from = from.to_key(), to = to.to_key(), "activity changed");
                    self.input.clear();
                    if to == Activity::Normal && from != Activity::Normal {
                        self.echo(format!("left {}", from.label().to_lowercase()));
                    }
                }
                MediatorEvent::Navigate(_) => {}
            }
        }
        while let Ok(event) = self.tutorial_events.try_recv() {
            match event {
                LedgerEvent::AddedMany(keys) => {
                    self.status = Some(StatusMessage::new(
                        StatusKind::Success,
                        format!("{} lessons marked complete", keys.len()),
                    ));
                }
                LedgerEvent::Reset => {
                    self.status = Some(StatusMessage::new(
                        StatusKind::Info,
                        "Lesson progress cleared",
                    ));
                }
                LedgerEvent::Added(_) => {}
            }
        }
    }

    fn describe(&self, notice: Notice) -> StatusMessage {
        match notice {
            Notice::NotYetUnlocked { expected } => StatusMessage::new(
                StatusKind::Warning,
                format!("Not yet. Type {}", display_text(&expected)),
            ),
            Notice::TutorialUnlocked { key } => StatusMessage::new(
                StatusKind::Success,
                format!("Unlocked {}", display_text(&key)),
            ),
            Notice::PhraseMismatch { index, .. } => StatusMessage::new(
                StatusKind::Error,
                format!("Mismatch at character {}", index + 1),
            ),
            Notice::PhraseCompleted {
                wpm,
                recorded: true,
                ..
            } => StatusMessage::new(StatusKind::Success, format!("Complete at {wpm:.1} WPM")),
            Notice::PhraseCompleted {
                wpm,
                recorded: false,
                ..
            } => StatusMessage::new(
                StatusKind::Warning,
                format!(
                    "{wpm:.1} WPM, need more than {} to record it",
                    self.mediator.target_wpm()
                ),
            ),
            Notice::GroupCompleted { group } => {
                StatusMessage::new(StatusKind::Success, format!("Finished {group}"))
            }
            Notice::AllContentComplete => {
                StatusMessage::new(StatusKind::Success, "Everything is complete")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::engine::catalog::CurriculumEntry;
    use crate::store::memory_store::MemoryStore;

    fn make_app() -> App {
        let catalog = Catalog::from_entries(vec![
            CurriculumEntry::tutorial("\r", "\r"),
            CurriculumEntry::tutorial("fdsa", "fdsa"),
            CurriculumEntry::game("sad", "a sad lass"),
        ])
        .unwrap();
        let theme: &'static Theme = Box::leak(Box::new(Theme::default()));
        App::new(Config::default(), theme, Rc::new(MemoryStore::new()), catalog)
    }

    fn submit_line(app: &mut App, line: &str) {
        app.input = LineInput::new(line).with_commands(COMMANDS);
        app.submit();
    }

    #[test]
    fn tut_command_enters_tutorial() {
        let mut app = make_app();
        submit_line(&mut app, "tut");
        assert_eq!(app.activity(), Activity::Tutorial);
        assert_eq!(app.target_text(), Some("\r"));
        assert_eq!(app.scrollback, vec!["$ tut"]);
    }

    #[test]
    fn empty_line_in_tutorial_unlocks_enter() {
        let mut app = make_app();
        submit_line(&mut app, "tut");
        submit_line(&mut app, "");
        assert_eq!(app.target_text(), Some("fdsa"));
        assert_eq!(
            app.status.as_ref().map(|s| s.kind),
            Some(StatusKind::Success)
        );
    }

    #[test]
    fn wrong_tutorial_line_warns() {
        let mut app = make_app();
        submit_line(&mut app, "tut");
        submit_line(&mut app, "x");
        let status = app.status.clone().unwrap();
        assert_eq!(status.kind, StatusKind::Warning);
        assert!(status.text.contains('\u{21b5}'));
    }

    #[test]
    fn slow_phrase_reports_target() {
        let mut app = make_app();
        submit_line(&mut app, "play");
        assert_eq!(app.activity(), Activity::Game);
        let t0 = Instant::now();
        for (i, ch) in "a sad lass".chars().enumerate() {
            app.mediator
                .record_keystroke_at(ch, t0 + Duration::from_millis(3000 * i as u64));
        }
        submit_line(&mut app, "a sad lass");
        let status = app.status.clone().unwrap();
        assert_eq!(status.kind, StatusKind::Warning);
        assert!(status.text.contains("need more than 10"));
    }

    #[test]
    fn escape_twice_returns_to_normal() {
        let mut app = make_app();
        submit_line(&mut app, "play");
        app.input = LineInput::new("a s");
        app.cancel();
        assert_eq!(app.activity(), Activity::Game);
        assert_eq!(app.input.value(), "");
        app.cancel();
        assert_eq!(app.activity(), Activity::Normal);
    }

    #[test]
    fn edit_collects_lines() {
        let mut app = make_app();
        submit_line(&mut app, "edit");
        assert_eq!(app.activity(), Activity::Edit);
        submit_line(&mut app, "hello");
        submit_line(&mut app, "world");
        assert_eq!(app.scratch, vec!["hello", "world"]);
        assert!(app.mediator.tutorials().is_empty());
    }

    #[test]
    fn tree_navigation_wraps() {
        let mut app = make_app();
        submit_line(&mut app, "tree");
        assert_eq!(app.activity(), Activity::Tree);
        app.tree_prev();
        assert_eq!(app.tree_selected, 2);
        app.tree_next();
        assert_eq!(app.tree_selected, 0);
    }

    #[test]
    fn unknown_command_is_echoed() {
        let mut app = make_app();
        submit_line(&mut app, "ls -la");
        assert_eq!(app.activity(), Activity::Normal);
        assert_eq!(app.scrollback.last().unwrap(), "ls: command not found");
    }

    #[test]
    fn quit_sets_flag() {
        let mut app = make_app();
        submit_line(&mut app, "quit");
        assert!(app.should_quit);
    }
}
