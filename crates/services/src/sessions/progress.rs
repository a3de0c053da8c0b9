/// Aggregated view of session progress, useful for UI.
///
/// `correct`/`incorrect` drive the running score HUD; they only count graded
/// cards, so `answered == correct + incorrect` at all times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub is_complete: bool,
}
