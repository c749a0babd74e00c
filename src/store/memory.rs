//! In-memory [`Store`] implementation for testing.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Also carries optional fault injection so tests can verify the batch
//! drivers' per-entry error isolation.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{
    Goal, Habit, JournalEntry, Sentiment, Task, User, STATUS_ACTIVE, STATUS_SUGGESTED,
};

use super::Store;

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    entries: RwLock<Vec<JournalEntry>>,
    goals: RwLock<Vec<Goal>>,
    tasks: RwLock<Vec<Task>>,
    habits: RwLock<Vec<Habit>>,
    vectors: RwLock<HashMap<String, Vec<f32>>>,
    /// Entry ids whose item inserts should fail, for fault-isolation tests.
    fail_inserts_for: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_goal`/`create_task`/`create_habit` fail for items whose
    /// provenance points at the given entry.
    pub fn fail_inserts_for_entry(&self, entry_id: &str) {
        self.fail_inserts_for
            .write()
            .unwrap()
            .insert(entry_id.to_string());
    }

    fn insert_should_fail(&self, journal_entry_id: &Option<String>) -> bool {
        match journal_entry_id {
            Some(id) => self.fail_inserts_for.read().unwrap().contains(id),
            None => false,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        self.users.write().unwrap().push(user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn get_all_users(&self) -> Result<Vec<User>> {
        Ok(self.users.read().unwrap().clone())
    }

    async fn create_journal_entry(&self, entry: &JournalEntry) -> Result<()> {
        self.entries.write().unwrap().push(entry.clone());
        Ok(())
    }

    async fn get_journal_entry(&self, id: &str) -> Result<Option<JournalEntry>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn unanalyzed_entries_by_user_id(&self, user_id: &str) -> Result<Vec<JournalEntry>> {
        let mut entries: Vec<JournalEntry> = self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id && !e.analyzed)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.date);
        Ok(entries)
    }

    async fn recent_entries_by_user_id(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<JournalEntry>> {
        let mut entries: Vec<JournalEntry> = self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id && e.is_journal && !e.is_ai_response)
            .cloned()
            .collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.date));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn mark_entry_analyzed(&self, id: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
            entry.analyzed = true;
        }
        Ok(())
    }

    async fn set_entry_sentiment(&self, id: &str, sentiment: &Sentiment) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
            entry.sentiment = Some(sentiment.clone());
        }
        Ok(())
    }

    async fn goals_by_user_id(&self, user_id: &str) -> Result<Vec<Goal>> {
        Ok(self
            .goals
            .read()
            .unwrap()
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_goal(&self, goal: &Goal) -> Result<()> {
        if self.insert_should_fail(&goal.journal_entry_id) {
            bail!("injected goal insert failure");
        }
        self.goals.write().unwrap().push(goal.clone());
        Ok(())
    }

    async fn get_goal(&self, id: &str) -> Result<Option<Goal>> {
        Ok(self
            .goals
            .read()
            .unwrap()
            .iter()
            .find(|g| g.id == id)
            .cloned())
    }

    async fn accept_goal(&self, id: &str) -> Result<Option<Goal>> {
        let mut goals = self.goals.write().unwrap();
        match goals
            .iter_mut()
            .find(|g| g.id == id && g.status == STATUS_SUGGESTED)
        {
            Some(goal) => {
                goal.status = STATUS_ACTIVE.to_string();
                Ok(Some(goal.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_suggested_goal(&self, id: &str) -> Result<bool> {
        let mut goals = self.goals.write().unwrap();
        let before = goals.len();
        goals.retain(|g| !(g.id == id && g.status == STATUS_SUGGESTED));
        Ok(goals.len() < before)
    }

    async fn tasks_by_user_id(&self, user_id: &str) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .read()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_task(&self, task: &Task) -> Result<()> {
        if self.insert_should_fail(&task.journal_entry_id) {
            bail!("injected task insert failure");
        }
        self.tasks.write().unwrap().push(task.clone());
        Ok(())
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self
            .tasks
            .read()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn accept_task(&self, id: &str) -> Result<Option<Task>> {
        let mut tasks = self.tasks.write().unwrap();
        match tasks
            .iter_mut()
            .find(|t| t.id == id && t.status == STATUS_SUGGESTED)
        {
            Some(task) => {
                task.status = STATUS_ACTIVE.to_string();
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_suggested_task(&self, id: &str) -> Result<bool> {
        let mut tasks = self.tasks.write().unwrap();
        let before = tasks.len();
        tasks.retain(|t| !(t.id == id && t.status == STATUS_SUGGESTED));
        Ok(tasks.len() < before)
    }

    async fn habits_by_user_id(&self, user_id: &str) -> Result<Vec<Habit>> {
        Ok(self
            .habits
            .read()
            .unwrap()
            .iter()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_habit(&self, habit: &Habit) -> Result<()> {
        if self.insert_should_fail(&habit.journal_entry_id) {
            bail!("injected habit insert failure");
        }
        self.habits.write().unwrap().push(habit.clone());
        Ok(())
    }

    async fn get_habit(&self, id: &str) -> Result<Option<Habit>> {
        Ok(self
            .habits
            .read()
            .unwrap()
            .iter()
            .find(|h| h.id == id)
            .cloned())
    }

    async fn accept_habit(&self, id: &str) -> Result<Option<Habit>> {
        let mut habits = self.habits.write().unwrap();
        match habits
            .iter_mut()
            .find(|h| h.id == id && h.status == STATUS_SUGGESTED)
        {
            Some(habit) => {
                habit.status = STATUS_ACTIVE.to_string();
                Ok(Some(habit.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_suggested_habit(&self, id: &str) -> Result<bool> {
        let mut habits = self.habits.write().unwrap();
        let before = habits.len();
        habits.retain(|h| !(h.id == id && h.status == STATUS_SUGGESTED));
        Ok(habits.len() < before)
    }

    async fn upsert_entry_embedding(
        &self,
        entry_id: &str,
        _user_id: &str,
        _model: &str,
        _dims: usize,
        vector: &[f32],
    ) -> Result<()> {
        self.vectors
            .write()
            .unwrap()
            .insert(entry_id.to_string(), vector.to_vec());
        Ok(())
    }

    async fn journal_vectors_by_user_id(
        &self,
        user_id: &str,
    ) -> Result<Vec<(JournalEntry, Vec<f32>)>> {
        let vectors = self.vectors.read().unwrap();
        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .filter(|e| e.user_id == user_id && e.is_journal && !e.is_ai_response)
            .filter_map(|e| vectors.get(&e.id).map(|v| (e.clone(), v.clone())))
            .collect())
    }
}
