//! Read-only statistics derived from sessions and card states.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Card, Deck};
use crate::session::StudySession;

/// Percentage of the original working set already passed, rounded, in 0..=100.
///
/// Reads 100 only once the session is complete; an active session tops out
/// at 99 even when rounding would say otherwise.
pub fn progress_percent(session: &StudySession) -> u8 {
    if session.is_complete() {
        return 100;
    }
    let total = session.total();
    if total == 0 {
        return 0;
    }
    let percent = (100.0 * session.cursor() as f64 / total as f64).round();
    percent.clamp(0.0, 99.0) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallySummary {
    pub correct: u32,
    pub hard: u32,
    pub incorrect: u32,
    pub total: usize,
}

pub fn tally_summary(session: &StudySession) -> TallySummary {
    let tally = session.tally();
    TallySummary {
        correct: tally.correct,
        hard: tally.hard,
        incorrect: tally.incorrect,
        total: session.total(),
    }
}

/// Share of a deck's cards that have been reviewed at least once, 0..=100.
///
/// Reads 100 only when every card has been reviewed.
pub fn completion_rate(cards: &[Card]) -> u8 {
    if cards.is_empty() {
        return 0;
    }
    let reviewed = cards.iter().filter(|c| c.review_count > 0).count();
    if reviewed == cards.len() {
        return 100;
    }
    let percent = (100.0 * reviewed as f64 / cards.len() as f64).round();
    percent.clamp(0.0, 99.0) as u8
}

/// A card is due when it was never studied or its last review is at least
/// `threshold_days` old.
pub fn is_due(card: &Card, now: DateTime<Utc>, threshold_days: u32) -> bool {
    match card.last_reviewed {
        None => true,
        Some(last) => now - last >= Duration::days(i64::from(threshold_days)),
    }
}

pub fn due_count(cards: &[Card], now: DateTime<Utc>, threshold_days: u32) -> usize {
    cards
        .iter()
        .filter(|c| is_due(c, now, threshold_days))
        .count()
}

/// Most recent review of any card in the deck.
pub fn last_studied(cards: &[Card]) -> Option<DateTime<Utc>> {
    cards.iter().filter_map(|c| c.last_reviewed).max()
}

/// Whether a deck belongs in the "recently studied" list or the "due" list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeckActivity {
    Recent,
    Due,
}

pub fn deck_activity(cards: &[Card], now: DateTime<Utc>, threshold_days: u32) -> DeckActivity {
    match last_studied(cards) {
        Some(last) if now - last < Duration::days(i64::from(threshold_days)) => {
            DeckActivity::Recent
        }
        _ => DeckActivity::Due,
    }
}

/// Everything a deck listing shows next to the title.
#[derive(Debug, Clone, Serialize)]
pub struct DeckSummary {
    pub deck: Deck,
    pub cards_count: usize,
    pub completion_rate: u8,
    pub due_cards: usize,
    pub last_studied: Option<DateTime<Utc>>,
    pub activity: DeckActivity,
}

pub fn summarize_deck(
    deck: Deck,
    cards: &[Card],
    now: DateTime<Utc>,
    threshold_days: u32,
) -> DeckSummary {
    DeckSummary {
        deck,
        cards_count: cards.len(),
        completion_rate: completion_rate(cards),
        due_cards: due_count(cards, now, threshold_days),
        last_studied: last_studied(cards),
        activity: deck_activity(cards, now, threshold_days),
    }
}
