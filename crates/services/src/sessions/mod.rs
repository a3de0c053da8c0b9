mod advance;
mod controller;
mod progress;
mod queries;
mod reporter;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use advance::AutoAdvance;
pub use controller::{
    AnswerOutcome, DEFAULT_ADVANCE_DELAY, PendingAdvance, StudyCard, StudySession,
};
pub use progress::SessionProgress;
pub use reporter::SummaryReporter;
pub use view::{
    SessionRecordDeckItem, SessionRecordId, SessionRecordListItem, SessionRecordService,
};
pub use workflow::{SessionAnswerResult, StudyLoopService};
