#![forbid(unsafe_code)]

pub mod error;
pub mod generation;
pub mod sessions;

pub use study_core::Clock;

pub use error::{GenerationError, SessionError};
pub use generation::{CardGeneratorConfig, CardGeneratorService, GeneratedCard};

pub use sessions::{
    AnswerOutcome, AutoAdvance, SessionAnswerResult, SessionRecordService, StudyLoopService,
    StudySession, SummaryReporter,
};
