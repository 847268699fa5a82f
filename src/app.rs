use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::db::{Db, RatingStats};
use crate::error::StudyError;
use crate::grading;
use crate::models::{Card, DeckRating, MediaKind, Outcome};
use crate::progress::{self, DeckSummary, TallySummary};
use crate::session::{SessionState, StudySession};

/// Shown to the user whenever a grade or rating could not be stored.
pub const PERSISTENCE_WARNING: &str = "your progress may not be saved";

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Study(#[from] StudyError),

    #[error("study session {0} not found")]
    SessionNotFound(Uuid),

    #[error("deck {0} not found")]
    DeckNotFound(Uuid),

    /// The request itself could not be read: bad JSON, unknown field values,
    /// or a malformed id in the path or query.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Snapshot of a session for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionProgress {
    pub session_id: Uuid,
    pub deck_id: Uuid,
    pub state: SessionState,
    pub cursor: usize,
    pub len: usize,
    /// 1-based number of the active card, absent once complete.
    pub card_number: Option<usize>,
    pub percent: u8,
    pub tally: TallySummary,
    pub missed: usize,
}

impl SessionProgress {
    fn of(deck_id: Uuid, session: &StudySession) -> Self {
        Self {
            session_id: session.id(),
            deck_id,
            state: session.state(),
            cursor: session.cursor(),
            len: session.len(),
            card_number: session.position().map(|(n, _)| n),
            percent: progress::progress_percent(session),
            tally: progress::tally_summary(session),
            missed: session.missed().len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentCard {
    pub card: Card,
    pub media_kind: Option<MediaKind>,
    pub card_number: usize,
    pub of: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeReport {
    pub card_id: Uuid,
    pub outcome: Outcome,
    pub progress: SessionProgress,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingReport {
    pub deck_id: Uuid,
    pub rating: u8,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeckListing {
    #[serde(flatten)]
    pub summary: DeckSummary,
    pub ratings: RatingStats,
}

struct ActiveSession {
    deck_id: Uuid,
    session: StudySession,
    last_touched: Instant,
}

/// Live study sessions plus the store they report to.
///
/// Session state is authoritative; writes to the store are best-effort and a
/// failed write never rolls a session back. Sessions left idle for longer
/// than the configured timeout are dropped whenever a new one is registered.
pub struct App {
    pub db: Db,
    pub config: Config,
    sessions: HashMap<Uuid, ActiveSession>,
}

impl App {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db = Db::connect(&config.database_url).await?;
        Ok(Self::with_db(db, config))
    }

    pub fn with_db(db: Db, config: Config) -> Self {
        Self {
            db,
            config,
            sessions: HashMap::new(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub async fn start_session(&mut self, deck_id: Uuid) -> Result<SessionProgress, AppError> {
        if self.db.get_deck(deck_id).await?.is_none() {
            return Err(AppError::DeckNotFound(deck_id));
        }

        let cards = self.db.fetch_deck_cards(deck_id).await?;
        let session = if self.config.shuffle_cards {
            StudySession::start_shuffled(cards, &mut rand::thread_rng())?
        } else {
            StudySession::start(cards)?
        };

        log::info!(
            "Started session {} on deck {} ({} cards)",
            session.id(),
            deck_id,
            session.len()
        );
        Ok(self.register(deck_id, session))
    }

    fn register(&mut self, deck_id: Uuid, session: StudySession) -> SessionProgress {
        let now = Instant::now();
        self.prune_idle(now);

        let progress = SessionProgress::of(deck_id, &session);
        self.sessions.insert(
            session.id(),
            ActiveSession {
                deck_id,
                session,
                last_touched: now,
            },
        );
        progress
    }

    /// Drop every session not touched within the idle timeout as of `now`.
    pub fn prune_idle(&mut self, now: Instant) {
        let timeout = self.config.session_idle_timeout();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| now.saturating_duration_since(entry.last_touched) < timeout);

        let pruned = before - self.sessions.len();
        if pruned > 0 {
            log::info!("Dropped {} idle session(s)", pruned);
        }
    }

    fn entry_mut(&mut self, id: Uuid) -> Result<&mut ActiveSession, AppError> {
        let entry = self
            .sessions
            .get_mut(&id)
            .ok_or(AppError::SessionNotFound(id))?;
        entry.last_touched = Instant::now();
        Ok(entry)
    }

    pub fn progress(&mut self, id: Uuid) -> Result<SessionProgress, AppError> {
        let entry = self.entry_mut(id)?;
        Ok(SessionProgress::of(entry.deck_id, &entry.session))
    }

    pub fn current_card(&mut self, id: Uuid) -> Result<CurrentCard, AppError> {
        let session = &self.entry_mut(id)?.session;
        let card = session.current()?;

        Ok(CurrentCard {
            card: card.clone(),
            media_kind: card.media_kind(),
            card_number: session.cursor() + 1,
            of: session.len(),
        })
    }

    /// Skip forward without grading.
    pub fn advance(&mut self, id: Uuid) -> Result<SessionProgress, AppError> {
        let entry = self.entry_mut(id)?;
        entry.session.advance();
        Ok(SessionProgress::of(entry.deck_id, &entry.session))
    }

    pub fn retreat(&mut self, id: Uuid) -> Result<SessionProgress, AppError> {
        let entry = self.entry_mut(id)?;
        entry.session.retreat();
        Ok(SessionProgress::of(entry.deck_id, &entry.session))
    }

    pub async fn grade(&mut self, id: Uuid, outcome: Outcome) -> Result<GradeReport, AppError> {
        let entry = self.entry_mut(id)?;
        let update = grading::grade(&mut entry.session, outcome)?;
        let progress = SessionProgress::of(entry.deck_id, &entry.session);

        if entry.session.is_complete() {
            let tally = entry.session.tally();
            log::info!(
                "Session {} complete: {} correct, {} hard, {} incorrect",
                id,
                tally.correct,
                tally.hard,
                tally.incorrect
            );
        }

        let warning = match self.db.apply_card_update(&update).await {
            Ok(()) => None,
            Err(e) => {
                log::warn!("Failed to persist review of card {}: {:#}", update.card_id, e);
                Some(PERSISTENCE_WARNING.to_string())
            }
        };

        Ok(GradeReport {
            card_id: update.card_id,
            outcome,
            progress,
            warning,
        })
    }

    /// Open a remediation session over the cards missed in `id`.
    pub fn start_remediation(&mut self, id: Uuid) -> Result<SessionProgress, AppError> {
        let entry = self.entry_mut(id)?;
        let deck_id = entry.deck_id;
        let remediation = grading::start_remediation(&entry.session)?;

        log::info!(
            "Started remediation session {} from {} ({} cards)",
            remediation.id(),
            id,
            remediation.len()
        );
        Ok(self.register(deck_id, remediation))
    }

    /// Discard a session. Returns its final state.
    pub fn end_session(&mut self, id: Uuid) -> Result<SessionProgress, AppError> {
        let entry = self
            .sessions
            .remove(&id)
            .ok_or(AppError::SessionNotFound(id))?;
        Ok(SessionProgress::of(entry.deck_id, &entry.session))
    }

    pub async fn rate_deck(
        &self,
        user_id: Uuid,
        deck_id: Uuid,
        rating: i64,
        comment: Option<String>,
    ) -> Result<RatingReport, AppError> {
        let rating = DeckRating::new(user_id, deck_id, rating, comment)?;

        if self.db.get_deck(deck_id).await?.is_none() {
            return Err(AppError::DeckNotFound(deck_id));
        }

        let warning = match self.db.save_rating(&rating).await {
            Ok(()) => None,
            Err(e) => {
                log::warn!("Failed to persist rating of deck {}: {:#}", deck_id, e);
                Some(PERSISTENCE_WARNING.to_string())
            }
        };

        Ok(RatingReport {
            deck_id,
            rating: rating.rating(),
            warning,
        })
    }

    /// Deck listing for `owner`, or for all public decks.
    pub async fn deck_summaries(&self, owner: Option<Uuid>) -> Result<Vec<DeckListing>, AppError> {
        let now = Utc::now();
        let window = self.config.recent_window_days;
        let mut listings = Vec::new();

        for deck in self.db.list_decks(owner).await? {
            let cards = self.db.fetch_deck_cards(deck.id).await?;
            let ratings = self.db.rating_stats(deck.id).await?;
            listings.push(DeckListing {
                summary: progress::summarize_deck(deck, &cards, now, window),
                ratings,
            });
        }

        Ok(listings)
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
