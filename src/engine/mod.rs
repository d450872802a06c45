pub mod activity;
pub mod catalog;
pub mod command;
pub mod ledger;
pub mod mediator;
pub mod navigation;
pub mod phrase_match;
pub mod wpm;

pub use activity::{Activity, ActivityState};
pub use mediator::{ActivityMediator, MediatorEvent, Notice, Outcome};
