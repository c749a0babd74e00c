//! SQLite-backed [`Store`] implementation.
//!
//! Translates every [`Store`] operation into SQL against the schema
//! created by `migrate::apply_schema` (users, journal_entries, goals,
//! tasks, habits, journal_embeddings).

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::models::{
    Goal, Habit, JournalEntry, Sentiment, Task, User, STATUS_ACTIVE, STATUS_SUGGESTED,
};

use super::Store;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_entry(row: &SqliteRow) -> Result<JournalEntry> {
    let score: Option<i64> = row.try_get("sentiment_score")?;
    let emotions: Option<String> = row.try_get("sentiment_emotions")?;
    let themes: Option<String> = row.try_get("sentiment_themes")?;

    let sentiment = score.map(|score| Sentiment {
        score,
        emotions: emotions
            .as_deref()
            .and_then(|j| serde_json::from_str(j).ok())
            .unwrap_or_default(),
        themes: themes
            .as_deref()
            .and_then(|j| serde_json::from_str(j).ok())
            .unwrap_or_default(),
    });

    Ok(JournalEntry {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        date: row.try_get("date")?,
        is_journal: row.try_get::<i64, _>("is_journal")? != 0,
        is_ai_response: row.try_get::<i64, _>("is_ai_response")? != 0,
        analyzed: row.try_get::<i64, _>("analyzed")? != 0,
        sentiment,
    })
}

fn row_to_goal(row: &SqliteRow) -> Result<Goal> {
    Ok(Goal {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        status: row.try_get("status")?,
        source: row.try_get("source")?,
        ai_explanation: row.try_get("ai_explanation")?,
        journal_entry_id: row.try_get("journal_entry_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_task(row: &SqliteRow) -> Result<Task> {
    Ok(Task {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        priority: row.try_get("priority")?,
        status: row.try_get("status")?,
        source: row.try_get("source")?,
        ai_explanation: row.try_get("ai_explanation")?,
        journal_entry_id: row.try_get("journal_entry_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_habit(row: &SqliteRow) -> Result<Habit> {
    Ok(Habit {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        frequency: row.try_get("frequency")?,
        status: row.try_get("status")?,
        source: row.try_get("source")?,
        ai_explanation: row.try_get("ai_explanation")?,
        journal_entry_id: row.try_get("journal_entry_id")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, username, email, created_at) VALUES (?, ?, ?, ?)")
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, email, created_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| User {
            id: r.get("id"),
            username: r.get("username"),
            email: r.get("email"),
            created_at: r.get("created_at"),
        }))
    }

    async fn get_all_users(&self) -> Result<Vec<User>> {
        let rows =
            sqlx::query("SELECT id, username, email, created_at FROM users ORDER BY created_at")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .iter()
            .map(|r| User {
                id: r.get("id"),
                username: r.get("username"),
                email: r.get("email"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    async fn create_journal_entry(&self, entry: &JournalEntry) -> Result<()> {
        let (score, emotions, themes) = match &entry.sentiment {
            Some(s) => (
                Some(s.score),
                Some(serde_json::to_string(&s.emotions)?),
                Some(serde_json::to_string(&s.themes)?),
            ),
            None => (None, None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO journal_entries (id, user_id, title, content, date,
                                         is_journal, is_ai_response, analyzed,
                                         sentiment_score, sentiment_emotions, sentiment_themes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(&entry.title)
        .bind(&entry.content)
        .bind(entry.date)
        .bind(entry.is_journal as i64)
        .bind(entry.is_ai_response as i64)
        .bind(entry.analyzed as i64)
        .bind(score)
        .bind(emotions)
        .bind(themes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_journal_entry(&self, id: &str) -> Result<Option<JournalEntry>> {
        let row = sqlx::query("SELECT * FROM journal_entries WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_entry).transpose()
    }

    async fn unanalyzed_entries_by_user_id(&self, user_id: &str) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM journal_entries WHERE user_id = ? AND analyzed = 0 ORDER BY date ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn recent_entries_by_user_id(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM journal_entries
            WHERE user_id = ? AND is_journal = 1 AND is_ai_response = 0
            ORDER BY date DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn mark_entry_analyzed(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE journal_entries SET analyzed = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_entry_sentiment(&self, id: &str, sentiment: &Sentiment) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE journal_entries
            SET sentiment_score = ?, sentiment_emotions = ?, sentiment_themes = ?
            WHERE id = ?
            "#,
        )
        .bind(sentiment.score)
        .bind(serde_json::to_string(&sentiment.emotions)?)
        .bind(serde_json::to_string(&sentiment.themes)?)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn goals_by_user_id(&self, user_id: &str) -> Result<Vec<Goal>> {
        let rows = sqlx::query("SELECT * FROM goals WHERE user_id = ? ORDER BY created_at")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_goal).collect()
    }

    async fn create_goal(&self, goal: &Goal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO goals (id, user_id, name, description, category, status,
                               source, ai_explanation, journal_entry_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&goal.id)
        .bind(&goal.user_id)
        .bind(&goal.name)
        .bind(&goal.description)
        .bind(&goal.category)
        .bind(&goal.status)
        .bind(&goal.source)
        .bind(&goal.ai_explanation)
        .bind(&goal.journal_entry_id)
        .bind(goal.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_goal(&self, id: &str) -> Result<Option<Goal>> {
        let row = sqlx::query("SELECT * FROM goals WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_goal).transpose()
    }

    async fn accept_goal(&self, id: &str) -> Result<Option<Goal>> {
        let updated = sqlx::query("UPDATE goals SET status = ? WHERE id = ? AND status = ?")
            .bind(STATUS_ACTIVE)
            .bind(id)
            .bind(STATUS_SUGGESTED)
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_goal(id).await
    }

    async fn delete_suggested_goal(&self, id: &str) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM goals WHERE id = ? AND status = ?")
            .bind(id)
            .bind(STATUS_SUGGESTED)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn tasks_by_user_id(&self, user_id: &str) -> Result<Vec<Task>> {
        let rows = sqlx::query("SELECT * FROM tasks WHERE user_id = ? ORDER BY created_at")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_task).collect()
    }

    async fn create_task(&self, task: &Task) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, user_id, title, description, priority, status,
                               source, ai_explanation, journal_entry_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.id)
        .bind(&task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.priority)
        .bind(&task.status)
        .bind(&task.source)
        .bind(&task.ai_explanation)
        .bind(&task.journal_entry_id)
        .bind(task.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_task).transpose()
    }

    async fn accept_task(&self, id: &str) -> Result<Option<Task>> {
        let updated = sqlx::query("UPDATE tasks SET status = ? WHERE id = ? AND status = ?")
            .bind(STATUS_ACTIVE)
            .bind(id)
            .bind(STATUS_SUGGESTED)
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_task(id).await
    }

    async fn delete_suggested_task(&self, id: &str) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM tasks WHERE id = ? AND status = ?")
            .bind(id)
            .bind(STATUS_SUGGESTED)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn habits_by_user_id(&self, user_id: &str) -> Result<Vec<Habit>> {
        let rows = sqlx::query("SELECT * FROM habits WHERE user_id = ? ORDER BY created_at")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_habit).collect()
    }

    async fn create_habit(&self, habit: &Habit) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO habits (id, user_id, title, description, frequency, status,
                                source, ai_explanation, journal_entry_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&habit.id)
        .bind(&habit.user_id)
        .bind(&habit.title)
        .bind(&habit.description)
        .bind(&habit.frequency)
        .bind(&habit.status)
        .bind(&habit.source)
        .bind(&habit.ai_explanation)
        .bind(&habit.journal_entry_id)
        .bind(habit.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_habit(&self, id: &str) -> Result<Option<Habit>> {
        let row = sqlx::query("SELECT * FROM habits WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_habit).transpose()
    }

    async fn accept_habit(&self, id: &str) -> Result<Option<Habit>> {
        let updated =
            sqlx::query("UPDATE habits SET status = ? WHERE id = ? AND status = ?")
                .bind(STATUS_ACTIVE)
                .bind(id)
                .bind(STATUS_SUGGESTED)
                .execute(&self.pool)
                .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_habit(id).await
    }

    async fn delete_suggested_habit(&self, id: &str) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM habits WHERE id = ? AND status = ?")
            .bind(id)
            .bind(STATUS_SUGGESTED)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn upsert_entry_embedding(
        &self,
        entry_id: &str,
        user_id: &str,
        model: &str,
        dims: usize,
        vector: &[f32],
    ) -> Result<()> {
        let blob = vec_to_blob(vector);
        sqlx::query(
            r#"
            INSERT INTO journal_embeddings (entry_id, user_id, model, dims, vector, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(entry_id) DO UPDATE SET
                model = excluded.model,
                dims = excluded.dims,
                vector = excluded.vector,
                created_at = excluded.created_at
            "#,
        )
        .bind(entry_id)
        .bind(user_id)
        .bind(model)
        .bind(dims as i64)
        .bind(blob)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn journal_vectors_by_user_id(
        &self,
        user_id: &str,
    ) -> Result<Vec<(JournalEntry, Vec<f32>)>> {
        let rows = sqlx::query(
            r#"
            SELECT e.*, v.vector AS embedding_blob
            FROM journal_entries e
            JOIN journal_embeddings v ON v.entry_id = e.id
            WHERE e.user_id = ? AND e.is_journal = 1 AND e.is_ai_response = 0
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let entry = row_to_entry(row)?;
            let blob: Vec<u8> = row.try_get("embedding_blob")?;
            out.push((entry, blob_to_vec(&blob)));
        }
        Ok(out)
    }
}
