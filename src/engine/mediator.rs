//! The activity state machine.
//!
//! Decides, after each submitted line or command, which activity the user is
//! in next and what content they see, and records completions in the ledgers.
//!
//! Every entry point enqueues a [`Transition`] and drains the queue. One
//! transition runs to completion (ledger writes, `tutorial-state` write,
//! navigation and events) before the next starts. Observers receive
//! [`MediatorEvent`]s over channels, so they can only ask for follow-up work
//! through [`ActivityMediator::enqueue`], never by re-entering a transition.

use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;

use thiserror::Error;

use crate::engine::activity::{Activity, ActivityState};
use crate::engine::catalog::{Catalog, CurriculumEntry};
use crate::engine::command::ParsedCommand;
use crate::engine::ledger::{CompletionLedger, LedgerEvent};
use crate::engine::navigation::NavigationTarget;
use crate::engine::phrase_match::{self, LiveMatch};
use crate::engine::wpm::{CharDuration, SessionSummary, WpmCalculator};
use crate::store::schema::{TUTORIAL_STATE_KEY, TutorialState};
use crate::store::{KeyValueStore, save_json};

/// Unlock text of the Enter lesson. An empty submitted line means this.
pub const ENTER_SENTINEL: &str = "\r";

const RESET_SWITCHES: &[&str] = &["-r", "--reset"];

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("curriculum entry {0:?} has no unlock text")]
    MissingUnlockText(String),
    #[error("no phrase is active")]
    NoActivePhrase,
}

/// User-facing notifications. None of these are errors.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    NotYetUnlocked { expected: String },
    TutorialUnlocked { key: String },
    PhraseMismatch { key: String, index: usize },
    PhraseCompleted { key: String, wpm: f64, recorded: bool },
    GroupCompleted { group: String },
    AllContentComplete,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MediatorEvent {
    ActivityChanged { from: Activity, to: Activity },
    Navigate(NavigationTarget),
    Notice(Notice),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    /// A submitted tutorial line, or `None` to resolve initial content.
    TutorialAttempt(Option<String>),
    /// A submitted game line.
    GameAttempt(String),
    /// Free practice: straight to the next unachieved phrase.
    Play,
    /// Re-enter tutorials, optionally clearing the tutorial ledger first.
    Tutorial { reset: bool },
    CompleteAllTutorials,
    /// Forget every lesson and phrase completion.
    ResetProgress,
    EnterOverlay(Activity),
    ReturnToNormal,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Navigated(NavigationTarget),
    NotYetUnlocked,
    Mismatch { index: usize },
    /// Data-integrity failure; mode and content unchanged.
    Aborted,
    /// The transition does not apply in the current activity.
    Ignored,
}

pub struct ActivityMediator {
    catalog: Catalog,
    tutorials: CompletionLedger,
    phrases: CompletionLedger,
    wpm: WpmCalculator,
    store: Rc<dyn KeyValueStore>,
    state: ActivityState,
    content: Option<String>,
    group: Option<String>,
    target_wpm: u32,
    queue: VecDeque<Transition>,
    subscribers: Vec<Sender<MediatorEvent>>,
    last_summary: Option<SessionSummary>,
    last_session_id: i64,
}

impl ActivityMediator {
    pub fn new(catalog: Catalog, store: Rc<dyn KeyValueStore>, target_wpm: u32) -> Self {
        let tutorials = CompletionLedger::tutorials(store.clone());
        let phrases = CompletionLedger::phrases(store.clone());
        let state = ActivityState {
            tutorial_completed: catalog.all_tutorials_complete(&tutorials),
            ..ActivityState::default()
        };
        Self {
            wpm: WpmCalculator::new(store.clone()),
            catalog,
            tutorials,
            phrases,
            store,
            state,
            content: None,
            group: None,
            target_wpm,
            queue: VecDeque::new(),
            subscribers: Vec::new(),
            last_summary: None,
            last_session_id: 0,
        }
    }

    // --- Accessors ---

    pub fn state(&self) -> &ActivityState {
        &self.state
    }

    pub fn activity(&self) -> Activity {
        self.state.current
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn tutorials(&self) -> &CompletionLedger {
        &self.tutorials
    }

    pub fn phrases(&self) -> &CompletionLedger {
        &self.phrases
    }

    #[cfg(test)]
    pub(crate) fn tutorials_mut(&mut self) -> &mut CompletionLedger {
        &mut self.tutorials
    }

    #[cfg(test)]
    pub(crate) fn phrases_mut(&mut self) -> &mut CompletionLedger {
        &mut self.phrases
    }

    pub fn current_entry(&self) -> Option<&CurriculumEntry> {
        self.content.as_deref().and_then(|key| self.catalog.get(key))
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn navigation(&self) -> NavigationTarget {
        NavigationTarget::new(
            self.state.current,
            self.content.as_deref(),
            self.group.as_deref(),
        )
    }

    pub fn target_wpm(&self) -> u32 {
        self.target_wpm
    }

    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    pub fn subscribe(&mut self) -> Receiver<MediatorEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Change notifications from the tutorial ledger.
    pub fn subscribe_tutorials(&mut self) -> Receiver<LedgerEvent> {
        self.tutorials.subscribe()
    }

    // --- Input path ---

    pub fn record_keystroke(&mut self, ch: char) -> CharDuration {
        self.wpm.record_keystroke(ch)
    }

    pub fn record_keystroke_at(&mut self, ch: char, at: Instant) -> CharDuration {
        self.wpm.record_keystroke_at(ch, at)
    }

    /// Drops the in-flight keystroke timing, e.g. on interrupt.
    pub fn cancel_input(&mut self) {
        self.wpm.cancel();
    }

    pub fn pending_keystrokes(&self) -> usize {
        self.wpm.len()
    }

    /// Live comparison of `typed` against the active content's unlock text.
    pub fn live_feedback(&self, typed: &str) -> Option<LiveMatch> {
        let target = self.current_entry()?.unlock_text()?;
        Some(phrase_match::live_status(target, typed))
    }

    // --- Entry points ---

    pub fn check_tutorial_progress(&mut self, attempt: Option<&str>) -> Outcome {
        self.request(Transition::TutorialAttempt(attempt.map(str::to_string)))
    }

    pub fn check_game_progress(&mut self, typed: &str) -> Outcome {
        self.request(Transition::GameAttempt(typed.to_string()))
    }

    /// Returns whether the command was claimed.
    pub fn handle_command_executed(&mut self, command: &ParsedCommand) -> bool {
        match command.name.as_str() {
            "play" => {
                self.request(Transition::Play);
                true
            }
            "tut" => {
                let reset = command.has_switch(RESET_SWITCHES);
                self.request(Transition::Tutorial { reset });
                true
            }
            _ => false,
        }
    }

    pub fn complete_all_tutorials(&mut self) -> Outcome {
        self.request(Transition::CompleteAllTutorials)
    }

    pub fn reset_progress(&mut self) -> Outcome {
        self.request(Transition::ResetProgress)
    }

    pub fn enter_overlay(&mut self, activity: Activity) -> Outcome {
        self.request(Transition::EnterOverlay(activity))
    }

    pub fn leave_overlay(&mut self) -> Outcome {
        self.request(Transition::ReturnToNormal)
    }

    // --- Queue ---

    /// Queues a transition without running it. Transitions queued here run
    /// before the next [`request`](Self::request) or on [`run_pending`](Self::run_pending).
    pub fn enqueue(&mut self, transition: Transition) {
        self.queue.push_back(transition);
    }

    pub fn pending_transitions(&self) -> usize {
        self.queue.len()
    }

    /// Queues `transition` behind anything already enqueued and drains the
    /// queue, returning the outcome of `transition`.
    pub fn request(&mut self, transition: Transition) -> Outcome {
        self.queue.push_back(transition);
        self.run_pending().pop().unwrap_or(Outcome::Ignored)
    }

    /// Drains the queue in order, one transition at a time.
    pub fn run_pending(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        self.state.transition_in_progress = true;
        while let Some(transition) = self.queue.pop_front() {
            tracing::trace!(?transition, "applying transition");
            let outcome = self.apply(transition);
            self.state.tutorial_completed = self.catalog.all_tutorials_complete(&self.tutorials);
            outcomes.push(outcome);
        }
        self.state.transition_in_progress = false;
        outcomes
    }

    fn apply(&mut self, transition: Transition) -> Outcome {
        match transition {
            Transition::TutorialAttempt(attempt) => self.tutorial_attempt(attempt),
            Transition::GameAttempt(typed) => self.game_attempt(&typed),
            Transition::Play => {
                self.wpm.cancel();
                self.resolve_game_phrase()
            }
            Transition::Tutorial { reset } => {
                self.wpm.cancel();
                if reset {
                    self.tutorials.reset();
                }
                self.tutorial_attempt(None)
            }
            Transition::CompleteAllTutorials => {
                let keys: Vec<String> = self.catalog.tutorials().map(|e| e.key.clone()).collect();
                self.tutorials.extend(keys);
                if self.state.current == Activity::Tutorial {
                    self.resume_tutorials()
                } else {
                    Outcome::Navigated(self.navigation())
                }
            }
            Transition::ResetProgress => {
                self.wpm.cancel();
                self.tutorials.reset();
                self.phrases.reset();
                tracing::info!("progress reset");
                match self.state.current {
                    Activity::Tutorial | Activity::Game => self.tutorial_attempt(None),
                    _ => Outcome::Navigated(self.navigation()),
                }
            }
            Transition::EnterOverlay(activity) => {
                if !activity.is_overlay() {
                    tracing::warn!(activity = activity.to_key(), "not an overlay activity");
                    return Outcome::Ignored;
                }
                self.wpm.cancel();
                self.show(activity, None, None)
            }
            Transition::ReturnToNormal => {
                self.wpm.cancel();
                self.show(Activity::Normal, None, None)
            }
        }
    }

    // --- Progression ---

    fn tutorial_attempt(&mut self, attempt: Option<String>) -> Outcome {
        if attempt.is_some() && self.state.current != Activity::Tutorial {
            return Outcome::Ignored;
        }
        let attempt = attempt.map(|line| {
            self.flush_session();
            normalize_attempt(&line)
        });

        let Some(cur) = self.catalog.next_tutorial(&self.tutorials).cloned() else {
            return self.resolve_game_phrase();
        };
        let expected = match unlock_text(&cur) {
            Ok(text) => text.to_string(),
            Err(e) => return self.abort(e),
        };

        let Some(attempt) = attempt else {
            return self.show(Activity::Tutorial, Some(&cur), None);
        };
        if attempt != expected {
            tracing::debug!(key = %cur.key.escape_debug(), "tutorial attempt did not match");
            self.emit(MediatorEvent::Notice(Notice::NotYetUnlocked { expected }));
            return Outcome::NotYetUnlocked;
        }

        self.tutorials.add(&cur.key);
        tracing::info!(key = %cur.key.escape_debug(), "tutorial unlocked");
        self.emit(MediatorEvent::Notice(Notice::TutorialUnlocked {
            key: cur.key.clone(),
        }));
        self.after_tutorial_unlock(&cur)
    }

    fn after_tutorial_unlock(&mut self, cur: &CurriculumEntry) -> Outcome {
        if let Some(group) = cur.group.as_deref() {
            let first = self
                .catalog
                .incomplete_games_in_group(group, &self.phrases)
                .first()
                .map(|e| (*e).clone());
            if let Some(first) = first {
                if let Err(e) = unlock_text(&first) {
                    return self.abort(e);
                }
                return self.show(Activity::Game, Some(&first), Some(group));
            }
        }
        self.resume_tutorials()
    }

    fn resume_tutorials(&mut self) -> Outcome {
        match self.catalog.next_tutorial(&self.tutorials).cloned() {
            Some(next) => {
                if let Err(e) = unlock_text(&next) {
                    return self.abort(e);
                }
                self.show(Activity::Tutorial, Some(&next), None)
            }
            None => self.resolve_game_phrase(),
        }
    }

    fn resolve_game_phrase(&mut self) -> Outcome {
        match self.catalog.next_game_phrase(&self.phrases).cloned() {
            Some(next) => {
                if let Err(e) = unlock_text(&next) {
                    return self.abort(e);
                }
                self.show(Activity::Game, Some(&next), None)
            }
            None => {
                tracing::info!("all curriculum content complete");
                self.emit(MediatorEvent::Notice(Notice::AllContentComplete));
                self.show(Activity::Normal, None, None)
            }
        }
    }

    fn game_attempt(&mut self, typed: &str) -> Outcome {
        if self.state.current != Activity::Game {
            return Outcome::Ignored;
        }
        let Some(entry) = self.current_entry().cloned() else {
            return self.abort(ProgressError::NoActivePhrase);
        };
        let target = match unlock_text(&entry) {
            Ok(text) => text.to_string(),
            Err(e) => return self.abort(e),
        };

        let summary = self.flush_session();

        if !phrase_match::is_complete(&target, typed) {
            let index = phrase_match::first_mismatch_index(&target, typed);
            self.emit(MediatorEvent::Notice(Notice::PhraseMismatch {
                key: entry.key.clone(),
                index,
            }));
            return Outcome::Mismatch { index };
        }

        let recorded = summary.average > f64::from(self.target_wpm);
        if recorded {
            self.phrases.add_achieved(&entry.key, summary.average);
        }
        tracing::info!(
            key = %entry.key,
            wpm = summary.average,
            target = self.target_wpm,
            recorded,
            "phrase completed"
        );
        self.emit(MediatorEvent::Notice(Notice::PhraseCompleted {
            key: entry.key.clone(),
            wpm: summary.average,
            recorded,
        }));

        let Some(group) = self.group.clone() else {
            return self.resolve_game_phrase();
        };

        let next = self
            .catalog
            .incomplete_games_in_group(&group, &self.phrases)
            .first()
            .map(|e| (*e).clone());
        if let Some(next) = next {
            if let Err(e) = unlock_text(&next) {
                return self.abort(e);
            }
            return self.show(Activity::Game, Some(&next), Some(&group));
        }

        // Finishing a group's phrases credits its remaining tutorials.
        let catch_up: Vec<String> = self
            .catalog
            .incomplete_tutorials_in_group(&group, &self.tutorials)
            .iter()
            .map(|e| e.key.clone())
            .collect();
        if !catch_up.is_empty() {
            tracing::info!(group = %group, count = catch_up.len(), "crediting group tutorials");
            self.tutorials.extend(catch_up);
        }
        self.emit(MediatorEvent::Notice(Notice::GroupCompleted {
            group: group.clone(),
        }));
        self.resume_tutorials()
    }

    // --- Effects ---

    fn show(
        &mut self,
        activity: Activity,
        content: Option<&CurriculumEntry>,
        group: Option<&str>,
    ) -> Outcome {
        let left_tutorial = self.state.current == Activity::Tutorial;
        self.content = content.map(|e| e.key.clone());
        self.group = group.map(str::to_string);
        let changed = self.state.switch_to(activity);

        if activity == Activity::Tutorial || left_tutorial {
            self.write_tutorial_state();
        }

        let target = self.navigation();
        tracing::info!(navigation = %target, "navigate");
        if let Some((from, to)) = changed {
            self.emit(MediatorEvent::ActivityChanged { from, to });
        }
        self.emit(MediatorEvent::Navigate(target.clone()));
        Outcome::Navigated(target)
    }

    fn abort(&mut self, error: ProgressError) -> Outcome {
        tracing::error!(
            error = %error,
            activity = self.state.current.to_key(),
            "transition aborted, staying on current content"
        );
        Outcome::Aborted
    }

    fn flush_session(&mut self) -> SessionSummary {
        // Ids stay numeric for pruning and never repeat within a process.
        let now = chrono::Utc::now().timestamp_millis();
        self.last_session_id = now.max(self.last_session_id + 1);
        let summary = self.wpm.flush(&self.last_session_id.to_string());
        self.last_summary = Some(summary.clone());
        summary
    }

    fn write_tutorial_state(&self) {
        let current_step = match self.state.current {
            Activity::Tutorial => self
                .content
                .as_deref()
                .and_then(|key| self.catalog.tutorial_index(key)),
            _ => None,
        };
        if let Err(e) = save_json(
            self.store.as_ref(),
            TUTORIAL_STATE_KEY,
            &TutorialState { current_step },
        ) {
            tracing::warn!(error = %e, "failed to persist tutorial state");
        }
    }

    fn emit(&mut self, event: MediatorEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// An empty line stands for the Enter key.
pub fn normalize_attempt(line: &str) -> String {
    if line.is_empty() {
        ENTER_SENTINEL.to_string()
    } else {
        line.to_string()
    }
}

fn unlock_text(entry: &CurriculumEntry) -> Result<&str, ProgressError> {
    entry
        .unlock_text()
        .ok_or_else(|| ProgressError::MissingUnlockText(entry.key.clone()))
}
