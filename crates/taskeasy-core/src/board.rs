//! The task board: repository, category filter, search box, create form
//! and editor wired together.
//!
//! Nothing here reads a clock. Hosts call [`TaskBoard::tick`] with the
//! current instant to deliver debounced searches and delayed submissions.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::{debug, info, warn};

use crate::category::{Categories, CategoryFilter};
use crate::edit::EditSession;
use crate::error::{PersistenceError, UnknownCategory};
use crate::filter::{self, Buckets, Overview};
use crate::form::{FormTimings, Submission, TaskForm};
use crate::repository::{DEFAULT_STORAGE_KEY, LoadSource, Mutation, TaskRepository};
use crate::search::{self, DEFAULT_DEBOUNCE_MS, SearchInput};
use crate::seed::sample_tasks;
use crate::store::KeyValueStore;
use crate::task::Task;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSettings {
    pub categories: Categories,
    pub timings: FormTimings,
    pub storage_key: String,
    /// Load the sample tasks when nothing is stored.
    pub seed: bool,
    pub debounce: Duration,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            categories: Categories::default(),
            timings: FormTimings::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            seed: true,
            debounce: Duration::milliseconds(DEFAULT_DEBOUNCE_MS),
        }
    }
}

#[derive(Debug)]
pub enum BoardEvent {
    TaskAdded(Task),
    TaskUpdated(Task),
    QueryChanged(String),
    PersistenceWarning(PersistenceError),
}

#[derive(Debug)]
pub struct TaskBoard<S> {
    repo: TaskRepository<S>,
    categories: Categories,
    category: CategoryFilter,
    search: SearchInput,
    create: TaskForm,
    editor: EditSession,
}

impl<S: KeyValueStore> TaskBoard<S> {
    #[tracing::instrument(skip(store, settings, now), fields(key = %settings.storage_key))]
    pub fn open(store: S, settings: BoardSettings, now: DateTime<Utc>) -> (Self, LoadSource) {
        let seed = if settings.seed {
            sample_tasks(now, &settings.categories)
        } else {
            Vec::new()
        };
        let (repo, source) =
            TaskRepository::load(store, &settings.storage_key, seed, &settings.categories);

        let board = Self {
            repo,
            category: CategoryFilter::All,
            search: SearchInput::new(settings.debounce),
            create: TaskForm::new(settings.categories.clone(), settings.timings),
            editor: EditSession::new(settings.categories.clone(), settings.timings),
            categories: settings.categories,
        };
        (board, source)
    }

    pub fn tasks(&self) -> &[Task] {
        self.repo.tasks()
    }

    pub fn repository(&self) -> &TaskRepository<S> {
        &self.repo
    }

    pub fn into_store(self) -> S {
        self.repo.into_store()
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    pub fn category(&self) -> &CategoryFilter {
        &self.category
    }

    pub fn select_category(&mut self, label: &str) -> Result<(), UnknownCategory> {
        self.category = CategoryFilter::parse(&self.categories, label)?;
        debug!(category = %self.category, "category selected");
        Ok(())
    }

    pub fn search(&self) -> &SearchInput {
        &self.search
    }

    pub fn query(&self) -> &str {
        self.search.active_query()
    }

    pub fn search_input(&mut self, text: impl Into<String>, now: DateTime<Utc>) {
        self.search.input(text, now);
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
    }

    pub fn create_form(&self) -> &TaskForm {
        &self.create
    }

    pub fn create_form_mut(&mut self) -> &mut TaskForm {
        &mut self.create
    }

    pub fn editor(&self) -> &EditSession {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut EditSession {
        &mut self.editor
    }

    /// Opens the editor on the task with `id`. False when there is none.
    pub fn start_edit(&mut self, id: &str) -> bool {
        match self.repo.get(id).cloned() {
            Some(task) => {
                self.editor.start_edit(task);
                true
            }
            None => {
                debug!(id, "edit requested for unknown task");
                false
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: &str) -> Mutation<bool> {
        if self.editor.editing().is_some_and(|t| t.id == id) {
            self.editor.dismiss();
        }
        let outcome = self.repo.remove(id);
        if outcome.value {
            info!("task deleted");
        }
        outcome
    }

    /// Delivers everything whose delay has elapsed at `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<BoardEvent> {
        let mut events = Vec::new();

        if let Some(query) = self.search.poll(now) {
            events.push(BoardEvent::QueryChanged(query.to_string()));
        }

        if let Some(Submission::Create(draft)) = self.create.poll(now) {
            let (task, warning) = self.repo.add(draft, now).into_parts();
            info!(id = %task.id, "task added");
            events.push(BoardEvent::TaskAdded(task));
            if let Some(err) = warning {
                events.push(BoardEvent::PersistenceWarning(err));
            }
        }

        if let Some(committed) = self.editor.tick(&mut self.repo, now) {
            events.push(BoardEvent::TaskUpdated(committed.task));
            if let Err(err) = committed.persisted {
                events.push(BoardEvent::PersistenceWarning(err));
            }
        }

        for event in &events {
            if let BoardEvent::PersistenceWarning(err) = event {
                warn!(error = %err, "change kept in memory only");
            }
        }
        events
    }

    pub fn views<Z: TimeZone>(&self, now: &DateTime<Z>) -> Buckets {
        filter::derive(self.repo.tasks(), &self.category, self.query(), now)
    }

    pub fn overview<Z: TimeZone>(&self, now: &DateTime<Z>) -> Overview {
        Overview::from_tasks(self.repo.tasks(), now)
    }

    pub fn search_summary<Z: TimeZone>(&self, now: &DateTime<Z>) -> Option<String> {
        let count = self.views(now).all.len();
        search::search_summary(self.query(), count)
    }
}
