//! Grading engine: applies a study outcome to the current card.
//!
//! Grading always consumes the current position. A card marked hard or
//! incorrect is not re-queued in the same pass; it lands in the session's
//! missed set and can be studied again in a remediation session.

use chrono::{DateTime, Utc};

use crate::error::StudyError;
use crate::models::{CardUpdate, Outcome};
use crate::session::StudySession;

/// Grade the current card using the wall clock.
pub fn grade(session: &mut StudySession, outcome: Outcome) -> Result<CardUpdate, StudyError> {
    grade_at(session, outcome, Utc::now())
}

/// Grade the current card as of `now`.
///
/// Either every step applies or, on a complete session, none do.
pub fn grade_at(
    session: &mut StudySession,
    outcome: Outcome,
    now: DateTime<Utc>,
) -> Result<CardUpdate, StudyError> {
    let card = session.current_mut()?;
    card.review_count += 1;
    card.last_reviewed = Some(now);

    let update = CardUpdate {
        card_id: card.id,
        last_reviewed: now,
        review_increment: 1,
    };
    let graded = card.clone();

    session.tally_mut().record(outcome);
    session.record_graded(graded, outcome.is_miss());
    session.advance();

    Ok(update)
}

/// Start a follow-up session over the cards missed in `session`.
///
/// The originating session is left untouched, so this can be called again.
pub fn start_remediation(session: &StudySession) -> Result<StudySession, StudyError> {
    if session.missed().is_empty() {
        return Err(StudyError::NoMissedCards);
    }
    StudySession::start(session.missed().to_vec())
}
