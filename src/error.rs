use thiserror::Error;

/// Failures raised by the study scheduler itself.
///
/// None of these are retried: they either mean the caller asked for
/// something that cannot happen (a bug) or that there is nothing to do.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StudyError {
    #[error("cannot start a study session with an empty deck")]
    EmptyDeck,

    #[error("study session is already complete")]
    SessionComplete,

    #[error("nothing to review: no cards were missed in this session")]
    NoMissedCards,

    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),
}

impl StudyError {
    /// Stable machine-readable name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            StudyError::EmptyDeck => "empty_deck",
            StudyError::SessionComplete => "session_complete",
            StudyError::NoMissedCards => "no_missed_cards",
            StudyError::InvalidRating(_) => "invalid_rating",
        }
    }
}
