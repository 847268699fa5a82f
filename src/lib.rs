//! Flashcard study scheduler.
//!
//! The scheduling core is `session` (working set and cursor), `grading`
//! (applying outcomes, remediation) and `progress` (derived statistics). It
//! never talks to storage; `app` and `api` wrap it in a small HTTP service
//! that loads decks from, and reports reviews to, the SQLite store in `db`.

pub mod api;
pub mod app;
pub mod config;
pub mod data;
pub mod db;
pub mod error;
pub mod grading;
pub mod models;
pub mod progress;
pub mod session;

pub use error::StudyError;
pub use grading::{grade, grade_at, start_remediation};
pub use models::{Card, CardUpdate, Deck, DeckRating, Outcome};
pub use session::{SessionState, StudySession};
