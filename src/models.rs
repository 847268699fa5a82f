use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StudyError;

/// Author-assigned difficulty label. Purely informational for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// How a card's attached media should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Other,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "aac", "flac"];

impl MediaKind {
    /// Classify a media URI by its file extension.
    pub fn from_uri(uri: &str) -> Self {
        // Drop query string / fragment before looking at the extension
        let path = uri.split(['?', '#']).next().unwrap_or(uri);
        let file_name = path.rsplit('/').next().unwrap_or(path);

        let ext = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => return MediaKind::Other,
        };

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Audio
        } else {
            MediaKind::Other
        }
    }
}

/// A single question/answer unit of study content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub deck_id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub media_url: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub position: i64,
    // Scheduling fields, only ever touched by grading
    #[serde(default)]
    pub review_count: u32,
    pub last_reviewed: Option<DateTime<Utc>>,
}

impl Card {
    pub fn new(deck_id: Uuid, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            deck_id,
            question: question.into(),
            answer: answer.into(),
            category: None,
            media_url: None,
            difficulty: Difficulty::default(),
            position: 0,
            review_count: 0,
            last_reviewed: None,
        }
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        self.media_url.as_deref().map(MediaKind::from_uri)
    }
}

/// A named, ordered collection of cards owned by one author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deck {
    pub fn new(owner_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: title.into(),
            description: None,
            category: None,
            is_public: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Self-assessed result of studying one card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Hard,
    Incorrect,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Correct, Outcome::Hard, Outcome::Incorrect];

    /// Hard and incorrect cards are candidates for remediation.
    pub fn is_miss(self) -> bool {
        matches!(self, Outcome::Hard | Outcome::Incorrect)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Correct => "correct",
            Outcome::Hard => "hard",
            Outcome::Incorrect => "incorrect",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "correct" => Ok(Outcome::Correct),
            "hard" => Ok(Outcome::Hard),
            "incorrect" => Ok(Outcome::Incorrect),
            other => Err(format!("unknown outcome '{}'", other)),
        }
    }
}

/// Update request emitted once per grade, for the data store to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardUpdate {
    pub card_id: Uuid,
    pub last_reviewed: DateTime<Utc>,
    /// Always 1. The store applies it as an increment, never as an absolute value.
    pub review_increment: u32,
}

/// A user's 1..=5 rating of a deck they finished studying.
///
/// Only constructible through [`DeckRating::new`], so an out-of-range
/// value never reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeckRating {
    pub user_id: Uuid,
    pub deck_id: Uuid,
    rating: u8,
    pub comment: Option<String>,
}

impl DeckRating {
    pub fn new(
        user_id: Uuid,
        deck_id: Uuid,
        rating: i64,
        comment: Option<String>,
    ) -> Result<Self, StudyError> {
        if !(1..=5).contains(&rating) {
            return Err(StudyError::InvalidRating(rating));
        }

        Ok(Self {
            user_id,
            deck_id,
            rating: rating as u8,
            comment,
        })
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }
}
