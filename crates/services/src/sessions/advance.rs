use std::sync::{Arc, Mutex};
use std::time::Duration;

use study_core::Clock;
use tokio::task::JoinHandle;

use super::controller::StudySession;

/// Cancellable auto-advance task tied to one grading action.
///
/// Sleeps for the configured delay, then locks the session and applies the
/// pending advance through [`StudySession::fire_auto_advance`]. Cancellation
/// is explicit: `cancel()` (or dropping the handle) aborts the task, and the
/// session's own stale-card check covers a firing that was already in flight.
#[derive(Debug)]
pub struct AutoAdvance {
    handle: JoinHandle<()>,
}

impl AutoAdvance {
    /// Arm the task for the session's most recent grading action.
    ///
    /// `delay` should match the session's advance delay so the wall-clock
    /// sleep and the armed `fire_at` agree.
    #[must_use]
    pub fn schedule(session: Arc<Mutex<StudySession>>, clock: Clock, delay: Duration) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Ok(mut session) = session.lock() {
                session.fire_auto_advance(clock.now());
            }
        });
        Self { handle }
    }

    /// Abort the task; a cancelled task never touches the session.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for AutoAdvance {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
