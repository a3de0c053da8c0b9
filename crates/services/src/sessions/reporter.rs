use std::sync::Arc;

use study_core::Clock;
use study_core::model::{SessionSummary, UserId};
use storage::repository::{NewSessionRecord, SessionRecordRepository};

use super::controller::StudySession;
use crate::error::SessionError;

/// Submits one record per completed pass to the history store.
///
/// Submission is best-effort: the summary screen is shown from the returned
/// value whether or not the append succeeded, and a failure is only logged.
#[derive(Clone)]
pub struct SummaryReporter {
    clock: Clock,
    user_id: UserId,
    records: Arc<dyn SessionRecordRepository>,
}

impl SummaryReporter {
    #[must_use]
    pub fn new(clock: Clock, user_id: UserId, records: Arc<dyn SessionRecordRepository>) -> Self {
        Self {
            clock,
            user_id,
            records,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Compute the summary of a completed pass and submit it once.
    ///
    /// The session's `record_id` guards against double submission; a repeated
    /// call returns the summary again without touching storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotComplete` while any card is ungraded.
    /// Storage failures are logged, never propagated.
    pub async fn report(
        &self,
        session: &mut StudySession,
    ) -> Result<SessionSummary, SessionError> {
        let summary = session.build_summary(self.clock.now())?;

        if session.record_id().is_none() {
            let record = NewSessionRecord::from_summary(&summary, self.user_id);
            match self.records.append_record(&record).await {
                Ok(id) => session.set_record_id(id),
                Err(err) => tracing::warn!(
                    deck_id = %summary.deck_id(),
                    error = %err,
                    "failed to persist session record; showing summary anyway"
                ),
            }
        }

        Ok(summary)
    }

    /// Strict submission for an explicit user retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotComplete` if the pass is unfinished and
    /// `SessionError::Storage` if persistence fails.
    pub async fn finalize_record(
        &self,
        session: &mut StudySession,
    ) -> Result<i64, SessionError> {
        if let Some(id) = session.record_id() {
            return Ok(id);
        }

        let summary = session.build_summary(self.clock.now())?;
        let record = NewSessionRecord::from_summary(&summary, self.user_id);
        let id = self.records.append_record(&record).await?;
        session.set_record_id(id);
        Ok(id)
    }
}
