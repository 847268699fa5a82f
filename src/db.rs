use sqlx::{sqlite::{SqlitePool, SqlitePoolOptions, SqliteConnectOptions, SqliteJournalMode, SqliteRow, SqliteSynchronous}, Pool, Sqlite, ConnectOptions, Row};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;
use uuid::Uuid;

use crate::data::{SAMPLE_CARDS, SAMPLE_DECK_DESCRIPTION, SAMPLE_DECK_TITLE, SAMPLE_OWNER};
use crate::models::{Card, CardUpdate, Deck, DeckRating, Difficulty};

fn parse_uuid(value: &str) -> Result<Uuid, sqlx::Error> {
    Uuid::parse_str(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Card {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let deck_id: String = row.try_get("deck_id")?;

        // Older rows may carry no difficulty or a label we no longer know
        let difficulty: Option<String> = row.try_get("difficulty")?;
        let difficulty = difficulty
            .and_then(|d| d.parse::<Difficulty>().ok())
            .unwrap_or_default();

        let review_count: i64 = row.try_get("review_count")?;
        let last_reviewed: Option<DateTime<Utc>> = row.try_get("last_reviewed")?;

        Ok(Card {
            id: parse_uuid(&id)?,
            deck_id: parse_uuid(&deck_id)?,
            question: row.try_get("question")?,
            answer: row.try_get("answer")?,
            category: row.try_get("category")?,
            media_url: row.try_get("media_url")?,
            difficulty,
            position: row.try_get("position")?,
            review_count: review_count.max(0) as u32,
            last_reviewed,
        })
    }
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Deck {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let owner_id: String = row.try_get("owner_id")?;

        Ok(Deck {
            id: parse_uuid(&id)?,
            owner_id: parse_uuid(&owner_id)?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            is_public: row.try_get("is_public")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Aggregate of all ratings a deck has received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RatingStats {
    pub average: Option<f64>,
    pub count: i64,
}

#[derive(Clone)]
pub struct Db {
    pool: Pool<Sqlite>,
}

impl Db {
    /// Open (creating if needed) the database at `url`, migrate it, and seed
    /// the sample deck into an empty store.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .log_statements(log::LevelFilter::Trace);

        let pool = SqlitePool::connect_with(options).await?;

        let db = Db { pool };
        db.migrate().await?;
        db.seed_database_if_empty().await?;

        Ok(db)
    }

    /// Empty, migrated, unseeded in-memory store.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .log_statements(log::LevelFilter::Trace);

        // A memory database lives and dies with its single connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Db { pool };
        db.migrate().await?;

        Ok(db)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS decks (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                category TEXT,
                is_public BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                deck_id TEXT NOT NULL REFERENCES decks(id) ON DELETE CASCADE,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                category TEXT,
                media_url TEXT,
                difficulty TEXT,
                position INTEGER NOT NULL DEFAULT 0,
                review_count INTEGER NOT NULL DEFAULT 0,
                last_reviewed DATETIME,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ratings (
                user_id TEXT NOT NULL,
                deck_id TEXT NOT NULL REFERENCES decks(id) ON DELETE CASCADE,
                rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                comment TEXT,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (user_id, deck_id)
            );
            "#
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards (deck_id, position)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn seed_database_if_empty(&self) -> anyhow::Result<()> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM decks")
            .fetch_one(&self.pool)
            .await?;

        if count == 0 {
            let mut deck = Deck::new(SAMPLE_OWNER, SAMPLE_DECK_TITLE);
            deck.description = Some(SAMPLE_DECK_DESCRIPTION.to_string());
            deck.is_public = true;
            self.insert_deck(&deck).await?;

            for (i, sample) in SAMPLE_CARDS.iter().enumerate() {
                let mut card = Card::new(deck.id, sample.question, sample.answer);
                card.category = Some(sample.category.to_string());
                card.difficulty = sample.difficulty;
                card.position = i as i64;
                self.insert_card(&card).await?;
            }

            log::info!("Seeded empty store with sample deck {}", deck.id);
        }
        Ok(())
    }

    pub async fn insert_deck(&self, deck: &Deck) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO decks (id, owner_id, title, description, category, is_public, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(deck.id.to_string())
        .bind(deck.owner_id.to_string())
        .bind(&deck.title)
        .bind(&deck.description)
        .bind(&deck.category)
        .bind(deck.is_public)
        .bind(deck.created_at)
        .bind(deck.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_card(&self, card: &Card) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO cards (id, deck_id, question, answer, category, media_url, difficulty, position, review_count, last_reviewed) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(card.id.to_string())
        .bind(card.deck_id.to_string())
        .bind(&card.question)
        .bind(&card.answer)
        .bind(&card.category)
        .bind(&card.media_url)
        .bind(card.difficulty.as_str())
        .bind(card.position)
        .bind(i64::from(card.review_count))
        .bind(card.last_reviewed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_card(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM cards WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_deck(&self, id: Uuid) -> anyhow::Result<Option<Deck>> {
        let deck = sqlx::query_as::<_, Deck>("SELECT * FROM decks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(deck)
    }

    /// Decks owned by `owner`, or every public deck when no owner is given.
    /// Newest first.
    pub async fn list_decks(&self, owner: Option<Uuid>) -> anyhow::Result<Vec<Deck>> {
        let decks = match owner {
            Some(owner) => {
                sqlx::query_as::<_, Deck>(
                    "SELECT * FROM decks WHERE owner_id = ? ORDER BY created_at DESC"
                )
                .bind(owner.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Deck>(
                    "SELECT * FROM decks WHERE is_public = 1 ORDER BY created_at DESC"
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(decks)
    }

    /// Cards of a deck in author order.
    pub async fn fetch_deck_cards(&self, deck_id: Uuid) -> anyhow::Result<Vec<Card>> {
        let cards = sqlx::query_as::<_, Card>(
            "SELECT * FROM cards WHERE deck_id = ? ORDER BY position ASC, created_at ASC"
        )
        .bind(deck_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(cards)
    }

    /// Persist one grading event. The count is incremented in SQL so two
    /// devices grading the same card never overwrite each other.
    pub async fn apply_card_update(&self, update: &CardUpdate) -> anyhow::Result<()> {
        let result = sqlx::query(
            "UPDATE cards SET review_count = review_count + ?, last_reviewed = ? WHERE id = ?"
        )
        .bind(i64::from(update.review_increment))
        .bind(update.last_reviewed)
        .bind(update.card_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("card {} not found", update.card_id);
        }
        Ok(())
    }

    /// Insert or replace a user's rating of a deck.
    pub async fn save_rating(&self, rating: &DeckRating) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ratings (user_id, deck_id, rating, comment)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id, deck_id)
            DO UPDATE SET rating = excluded.rating, comment = excluded.comment
            "#
        )
        .bind(rating.user_id.to_string())
        .bind(rating.deck_id.to_string())
        .bind(i64::from(rating.rating()))
        .bind(&rating.comment)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn rating_stats(&self, deck_id: Uuid) -> anyhow::Result<RatingStats> {
        let row = sqlx::query("SELECT AVG(rating) AS average, COUNT(*) AS count FROM ratings WHERE deck_id = ?")
            .bind(deck_id.to_string())
            .fetch_one(&self.pool)
            .await?;

        Ok(RatingStats {
            average: row.try_get("average")?,
            count: row.try_get("count")?,
        })
    }

    /// Break rating writes so callers can exercise their failure path.
    #[cfg(test)]
    pub(crate) async fn drop_ratings_table(&self) -> anyhow::Result<()> {
        sqlx::query("DROP TABLE ratings").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn deck_with_cards(db: &Db, n: usize) -> (Deck, Vec<Card>) {
        let mut deck = Deck::new(Uuid::new_v4(), "Spanish verbs");
        deck.is_public = true;
        db.insert_deck(&deck).await.unwrap();

        let mut cards = Vec::new();
        // Insert in reverse so ordering has to come from `position`
        for i in (0..n).rev() {
            let mut card = Card::new(deck.id, format!("Q{}", i), format!("A{}", i));
            card.position = i as i64;
            db.insert_card(&card).await.unwrap();
            cards.push(card);
        }
        cards.reverse();
        (deck, cards)
    }

    #[tokio::test]
    async fn test_fetch_cards_in_author_order() {
        let db = Db::in_memory().await.unwrap();
        let (deck, cards) = deck_with_cards(&db, 4).await;

        let fetched = db.fetch_deck_cards(deck.id).await.unwrap();
        let ids: Vec<Uuid> = fetched.iter().map(|c| c.id).collect();
        let expected: Vec<Uuid> = cards.iter().map(|c| c.id).collect();

        assert_eq!(ids, expected);
        assert_eq!(fetched[0].difficulty, Difficulty::Medium);
        assert_eq!(fetched[0].review_count, 0);
        assert!(fetched[0].last_reviewed.is_none());
    }

    #[tokio::test]
    async fn test_unknown_deck() {
        let db = Db::in_memory().await.unwrap();
        assert!(db.get_deck(Uuid::new_v4()).await.unwrap().is_none());
        assert!(db.fetch_deck_cards(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_card_update_increments() {
        let db = Db::in_memory().await.unwrap();
        let (deck, cards) = deck_with_cards(&db, 1).await;
        let first = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 1, 9, 3, 4, 5).unwrap();

        for when in [first, second] {
            db.apply_card_update(&CardUpdate {
                card_id: cards[0].id,
                last_reviewed: when,
                review_increment: 1,
            })
            .await
            .unwrap();
        }

        let stored = db.fetch_deck_cards(deck.id).await.unwrap();
        assert_eq!(stored[0].review_count, 2);
        assert_eq!(stored[0].last_reviewed, Some(second));
    }

    #[tokio::test]
    async fn test_card_update_for_missing_card_fails() {
        let db = Db::in_memory().await.unwrap();
        let err = db
            .apply_card_update(&CardUpdate {
                card_id: Uuid::new_v4(),
                last_reviewed: Utc::now(),
                review_increment: 1,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_rating_upsert() {
        let db = Db::in_memory().await.unwrap();
        let (deck, _) = deck_with_cards(&db, 1).await;
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        assert_eq!(db.rating_stats(deck.id).await.unwrap(), RatingStats { average: None, count: 0 });

        db.save_rating(&DeckRating::new(alice, deck.id, 2, None).unwrap()).await.unwrap();
        db.save_rating(&DeckRating::new(alice, deck.id, 4, Some("better".into())).unwrap()).await.unwrap();
        db.save_rating(&DeckRating::new(bob, deck.id, 5, None).unwrap()).await.unwrap();

        let stats = db.rating_stats(deck.id).await.unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.average, Some(4.5));
    }

    #[tokio::test]
    async fn test_list_decks_by_owner_and_visibility() {
        let db = Db::in_memory().await.unwrap();
        let owner = Uuid::new_v4();

        let mut private = Deck::new(owner, "Private notes");
        private.is_public = false;
        db.insert_deck(&private).await.unwrap();

        let (public, _) = deck_with_cards(&db, 1).await;

        let public_ids: Vec<Uuid> = db.list_decks(None).await.unwrap().iter().map(|d| d.id).collect();
        assert_eq!(public_ids, vec![public.id]);

        let owned = db.list_decks(Some(owner)).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].title, "Private notes");
        assert!(!owned[0].is_public);
    }

    #[tokio::test]
    async fn test_seed_only_when_empty() {
        let db = Db::in_memory().await.unwrap();
        db.seed_database_if_empty().await.unwrap();
        db.seed_database_if_empty().await.unwrap();

        let decks = db.list_decks(Some(SAMPLE_OWNER)).await.unwrap();
        assert_eq!(decks.len(), 1);
        assert_eq!(decks[0].title, SAMPLE_DECK_TITLE);

        let cards = db.fetch_deck_cards(decks[0].id).await.unwrap();
        assert_eq!(cards.len(), SAMPLE_CARDS.len());
        assert_eq!(cards[0].question, SAMPLE_CARDS[0].question);
        assert_eq!(cards[0].category.as_deref(), Some(SAMPLE_CARDS[0].category));
    }
}
