use uuid::Uuid;

use crate::models::Difficulty;

pub struct SampleCard {
    pub question: &'static str,
    pub answer: &'static str,
    pub category: &'static str,
    pub difficulty: Difficulty,
}

/// Owner of the built-in sample deck.
pub const SAMPLE_OWNER: Uuid = Uuid::from_u128(0x5a3b_1e00_0000_4000_8000_0000_0000_0001);

pub const SAMPLE_DECK_TITLE: &str = "General Knowledge";
pub const SAMPLE_DECK_DESCRIPTION: &str = "A short mixed deck to try the study flow with.";

pub const SAMPLE_CARDS: &[SampleCard] = &[
    SampleCard {
        question: "What is the capital of France?",
        answer: "Paris",
        category: "Geography",
        difficulty: Difficulty::Easy,
    },
    SampleCard {
        question: "What is the main function of mitochondria in a cell?",
        answer: "Powerhouse of the cell - generates energy in the form of ATP through cellular respiration",
        category: "Biology",
        difficulty: Difficulty::Medium,
    },
    SampleCard {
        question: "What is the square root of 144?",
        answer: "12",
        category: "Mathematics",
        difficulty: Difficulty::Easy,
    },
    SampleCard {
        question: "What year did World War II end?",
        answer: "1945",
        category: "History",
        difficulty: Difficulty::Medium,
    },
    SampleCard {
        question: "What is the chemical symbol for gold?",
        answer: "Au (Aurum)",
        category: "Chemistry",
        difficulty: Difficulty::Easy,
    },
];
