use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::category::Categories;
use crate::error::{MalformedStoredState, PersistenceError};
use crate::store::KeyValueStore;
use crate::task::{Task, TaskDraft};

pub const DEFAULT_STORAGE_KEY: &str = "tasks";

/// Where the collection came from at startup.
#[derive(Debug)]
pub enum LoadSource {
    Stored,
    Seeded,
    /// Stored text was unusable; the seed collection was used instead.
    Recovered(MalformedStoredState),
    /// The store could not be read; the seed collection was used instead.
    Unavailable(PersistenceError),
}

impl LoadSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, LoadSource::Recovered(_) | LoadSource::Unavailable(_))
    }
}

/// Result of a mutation. The in-memory change always happened; `persisted`
/// reports whether the store write went through.
#[derive(Debug)]
#[must_use]
pub struct Mutation<T> {
    pub value: T,
    pub persisted: Result<(), PersistenceError>,
}

impl<T> Mutation<T> {
    pub fn warning(&self) -> Option<&PersistenceError> {
        self.persisted.as_ref().err()
    }

    pub fn into_parts(self) -> (T, Option<PersistenceError>) {
        (self.value, self.persisted.err())
    }
}

/// Owns the canonical ordered task collection and mirrors every change into
/// a single key of a [`KeyValueStore`].
#[derive(Debug)]
pub struct TaskRepository<S> {
    store: S,
    key: String,
    tasks: Vec<Task>,
    last_id: i64,
}

impl<S: KeyValueStore> TaskRepository<S> {
    #[tracing::instrument(skip(store, seed, categories))]
    pub fn load(
        store: S,
        key: &str,
        seed: Vec<Task>,
        categories: &Categories,
    ) -> (Self, LoadSource) {
        let (tasks, source) = match store.get(key) {
            Ok(Some(raw)) => match parse_collection(&raw, categories) {
                Ok(tasks) => (tasks, LoadSource::Stored),
                Err(err) => {
                    warn!(error = %err, "stored tasks are malformed; using seed collection");
                    (seed, LoadSource::Recovered(err))
                }
            },
            Ok(None) => {
                debug!("no stored tasks; using seed collection");
                (seed, LoadSource::Seeded)
            }
            Err(err) => {
                warn!(error = %err, "store unavailable; using seed collection");
                (seed, LoadSource::Unavailable(err))
            }
        };

        info!(count = tasks.len(), key, ?source, "loaded tasks");

        let mut repo = Self {
            store,
            key: key.to_string(),
            tasks,
            last_id: 0,
        };
        if matches!(source, LoadSource::Seeded) {
            // `save` logs its own failure.
            let _ = repo.save();
        }
        (repo, source)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    #[tracing::instrument(skip(self, draft, now), fields(title = %draft.title))]
    pub fn add(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Mutation<Task> {
        let id = self.next_id(now);
        let task = draft.into_task(id);

        let mut next = self.tasks.clone();
        next.push(task.clone());
        self.tasks = next;

        debug!(id = %task.id, count = self.tasks.len(), "task added");
        Mutation {
            value: task,
            persisted: self.save(),
        }
    }

    /// Replaces the task sharing `task.id`. The value is false when no such
    /// task exists.
    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    pub fn update(&mut self, task: Task) -> Mutation<bool> {
        let found = self.tasks.iter().any(|t| t.id == task.id);
        if found {
            self.tasks = self
                .tasks
                .iter()
                .map(|t| if t.id == task.id { task.clone() } else { t.clone() })
                .collect();
            debug!("task updated");
        } else {
            debug!("update for unknown task ignored");
        }

        Mutation {
            value: found,
            persisted: self.save(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn remove(&mut self, id: &str) -> Mutation<bool> {
        let before = self.tasks.len();
        self.tasks = self.tasks.iter().filter(|t| t.id != id).cloned().collect();
        let removed = self.tasks.len() != before;
        debug!(removed, count = self.tasks.len(), "task removal");

        Mutation {
            value: removed,
            persisted: self.save(),
        }
    }

    /// Writes the whole collection under the repository key.
    #[tracing::instrument(skip(self))]
    pub fn save(&mut self) -> Result<(), PersistenceError> {
        let serialized = serde_json::to_string(&self.tasks)?;
        let result = self.store.set(&self.key, &serialized);
        if let Err(err) = &result {
            warn!(error = %err, "failed to persist tasks; keeping in-memory state");
        }
        result
    }

    /// Millisecond timestamp of `now`, bumped past the last issued id and any
    /// live id so it stays unique.
    fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let mut candidate = now.timestamp_millis().max(self.last_id + 1);
        while self.get(&candidate.to_string()).is_some() {
            candidate += 1;
        }
        self.last_id = candidate;
        candidate.to_string()
    }
}

/// Parses and validates a stored collection.
pub fn parse_collection(
    raw: &str,
    categories: &Categories,
) -> Result<Vec<Task>, MalformedStoredState> {
    let tasks: Vec<Task> = serde_json::from_str(raw)?;

    let mut seen = HashSet::new();
    for task in &tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(MalformedStoredState::DuplicateId(task.id.clone()));
        }
        if task.title.trim().is_empty() {
            return Err(MalformedStoredState::EmptyTitle { id: task.id.clone() });
        }
        if !categories.contains(&task.category) {
            return Err(MalformedStoredState::UnknownCategory {
                id: task.id.clone(),
                category: task.category.to_string(),
            });
        }
    }

    Ok(tasks)
}
