//! Session model: the ordered working set of one study pass and its cursor.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StudyError;
use crate::models::{Card, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Complete,
}

/// Per-outcome counts for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub correct: u32,
    pub hard: u32,
    pub incorrect: u32,
}

impl OutcomeTally {
    pub fn get(&self, outcome: Outcome) -> u32 {
        match outcome {
            Outcome::Correct => self.correct,
            Outcome::Hard => self.hard,
            Outcome::Incorrect => self.incorrect,
        }
    }

    pub(crate) fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Correct => self.correct += 1,
            Outcome::Hard => self.hard += 1,
            Outcome::Incorrect => self.incorrect += 1,
        }
    }
}

/// One in-memory pass over a working set of cards.
///
/// Completion is governed only by `cursor == working_set.len()`. `total` is the
/// working set size captured at start and only feeds the progress bar.
#[derive(Debug, Clone)]
pub struct StudySession {
    id: Uuid,
    working_set: Vec<Card>,
    cursor: usize,
    total: usize,
    tally: OutcomeTally,
    missed: Vec<Card>,
}

impl StudySession {
    /// Start a session over `cards`, keeping the given order.
    pub fn start(cards: Vec<Card>) -> Result<Self, StudyError> {
        if cards.is_empty() {
            return Err(StudyError::EmptyDeck);
        }

        let total = cards.len();
        Ok(Self {
            id: Uuid::new_v4(),
            working_set: cards,
            cursor: 0,
            total,
            tally: OutcomeTally::default(),
            missed: Vec::new(),
        })
    }

    /// Like [`StudySession::start`], but with the working set shuffled first.
    pub fn start_shuffled<R: Rng + ?Sized>(
        mut cards: Vec<Card>,
        rng: &mut R,
    ) -> Result<Self, StudyError> {
        cards.shuffle(rng);
        Self::start(cards)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn current(&self) -> Result<&Card, StudyError> {
        self.working_set
            .get(self.cursor)
            .ok_or(StudyError::SessionComplete)
    }

    pub(crate) fn current_mut(&mut self) -> Result<&mut Card, StudyError> {
        self.working_set
            .get_mut(self.cursor)
            .ok_or(StudyError::SessionComplete)
    }

    /// Move to the next card. A no-op once the session is complete.
    pub fn advance(&mut self) {
        if self.cursor < self.working_set.len() {
            self.cursor += 1;
        }
    }

    /// Step back to the previous card for another look. Nothing is re-graded,
    /// and a complete session stays complete.
    pub fn retreat(&mut self) {
        if self.is_complete() {
            return;
        }
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.working_set.len()
    }

    pub fn state(&self) -> SessionState {
        if self.is_complete() {
            SessionState::Complete
        } else {
            SessionState::Active
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn len(&self) -> usize {
        self.working_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working_set.is_empty()
    }

    /// 1-based "card N of M" for the active card.
    pub fn position(&self) -> Option<(usize, usize)> {
        if self.is_complete() {
            None
        } else {
            Some((self.cursor + 1, self.working_set.len()))
        }
    }

    pub fn working_set(&self) -> &[Card] {
        &self.working_set
    }

    pub fn tally(&self) -> &OutcomeTally {
        &self.tally
    }

    pub(crate) fn tally_mut(&mut self) -> &mut OutcomeTally {
        &mut self.tally
    }

    /// Cards graded hard or incorrect at least once, in first-miss order.
    pub fn missed(&self) -> &[Card] {
        &self.missed
    }

    /// Record the graded state of `card`. A card already in the missed set is
    /// replaced by this newer copy; otherwise it is added only when `missed`.
    pub(crate) fn record_graded(&mut self, card: Card, missed: bool) {
        match self.missed.iter_mut().find(|c| c.id == card.id) {
            Some(existing) => *existing = card,
            None if missed => self.missed.push(card),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cards(n: usize) -> Vec<Card> {
        let deck_id = Uuid::new_v4();
        (0..n)
            .map(|i| {
                let mut card = Card::new(deck_id, format!("Q{}", i), format!("A{}", i));
                card.position = i as i64;
                card
            })
            .collect()
    }

    #[test]
    fn test_start_preserves_order() {
        let input = cards(3);
        let ids: Vec<Uuid> = input.iter().map(|c| c.id).collect();

        let session = StudySession::start(input).unwrap();
        let got: Vec<Uuid> = session.working_set().iter().map(|c| c.id).collect();

        assert_eq!(got, ids);
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.total(), 3);
        assert_eq!(*session.tally(), OutcomeTally::default());
        assert!(session.missed().is_empty());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn test_start_empty_fails() {
        let err = StudySession::start(Vec::new()).unwrap_err();
        assert_eq!(err, StudyError::EmptyDeck);

        let mut rng = StdRng::seed_from_u64(7);
        let err = StudySession::start_shuffled(Vec::new(), &mut rng).unwrap_err();
        assert_eq!(err, StudyError::EmptyDeck);
    }

    #[test]
    fn test_shuffled_start_is_a_permutation() {
        let input = cards(20);
        let mut expected: Vec<Uuid> = input.iter().map(|c| c.id).collect();

        let mut rng = StdRng::seed_from_u64(42);
        let session = StudySession::start_shuffled(input, &mut rng).unwrap();
        let mut got: Vec<Uuid> = session.working_set().iter().map(|c| c.id).collect();

        expected.sort();
        got.sort();
        assert_eq!(got, expected);
        assert_eq!(session.total(), 20);
    }

    #[test]
    fn test_advance_is_monotonic_and_clamped() {
        let mut session = StudySession::start(cards(3)).unwrap();
        let mut last = session.cursor();

        for _ in 0..10 {
            session.advance();
            assert!(session.cursor() >= last);
            assert!(session.cursor() <= session.len());
            last = session.cursor();
        }

        assert_eq!(session.cursor(), 3);
        assert!(session.is_complete());
    }

    #[test]
    fn test_current_follows_cursor() {
        let input = cards(2);
        let first = input[0].id;
        let second = input[1].id;
        let mut session = StudySession::start(input).unwrap();

        assert_eq!(session.current().unwrap().id, first);
        session.advance();
        assert_eq!(session.current().unwrap().id, second);
        session.retreat();
        assert_eq!(session.current().unwrap().id, first);
    }

    #[test]
    fn test_current_on_complete_session_fails() {
        let mut session = StudySession::start(cards(1)).unwrap();
        session.advance();

        assert_eq!(session.state(), SessionState::Complete);
        assert_eq!(session.current().unwrap_err(), StudyError::SessionComplete);
    }

    #[test]
    fn test_retreat_clamps_at_zero() {
        let mut session = StudySession::start(cards(2)).unwrap();
        session.retreat();
        session.retreat();
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn test_retreat_does_not_reopen_complete_session() {
        let mut session = StudySession::start(cards(2)).unwrap();
        session.advance();
        session.advance();
        session.retreat();

        assert!(session.is_complete());
        assert_eq!(session.cursor(), 2);
    }

    #[test]
    fn test_position_readout() {
        let mut session = StudySession::start(cards(3)).unwrap();
        assert_eq!(session.position(), Some((1, 3)));
        session.advance();
        assert_eq!(session.position(), Some((2, 3)));
        session.advance();
        session.advance();
        assert_eq!(session.position(), None);
    }

    #[test]
    fn test_record_graded_dedupes_by_id() {
        let input = cards(3);
        let a = input[0].clone();
        let b = input[1].clone();
        let c = input[2].clone();
        let mut session = StudySession::start(input).unwrap();

        session.record_graded(a.clone(), true);
        session.record_graded(b.clone(), true);
        session.record_graded(c.clone(), false);

        let mut newer = a.clone();
        newer.review_count = 5;
        session.record_graded(newer, false);

        let ids: Vec<Uuid> = session.missed().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert_eq!(session.missed()[0].review_count, 5);
    }
}
