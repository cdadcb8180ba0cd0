use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::category::Categories;
use crate::error::PersistenceError;
use crate::form::{FormTimings, Submission, TaskForm};
use crate::repository::TaskRepository;
use crate::store::KeyValueStore;
use crate::task::Task;

/// Outcome of an editor tick that committed a change.
#[derive(Debug)]
pub struct Committed {
    pub task: Task,
    pub persisted: Result<(), PersistenceError>,
}

/// Modal editor state: at most one task is edited at a time.
#[derive(Debug, Clone)]
pub struct EditSession {
    editing: Option<Task>,
    open: bool,
    form: TaskForm,
}

impl EditSession {
    pub fn new(categories: Categories, timings: FormTimings) -> Self {
        Self {
            editing: None,
            open: false,
            form: TaskForm::new(categories, timings),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn editing(&self) -> Option<&Task> {
        self.editing.as_ref()
    }

    pub fn form(&self) -> &TaskForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut TaskForm {
        &mut self.form
    }

    /// Opens the editor on `task`, replacing any edit in progress.
    pub fn start_edit(&mut self, task: Task) {
        if let Some(previous) = &self.editing {
            debug!(previous = %previous.id, next = %task.id, "replacing edit in progress");
        }
        self.form.load(Some(&task));
        self.editing = Some(task);
        self.open = true;
    }

    /// Writes `updated` through the repository and closes the editor. The
    /// editor closes even when persisting fails.
    #[tracing::instrument(skip(self, repo, updated), fields(id = %updated.id))]
    pub fn commit<S: KeyValueStore>(
        &mut self,
        repo: &mut TaskRepository<S>,
        updated: Task,
    ) -> Result<(), PersistenceError> {
        let outcome = repo.update(updated);
        self.close();
        info!(found = outcome.value, "edit committed");
        outcome.persisted
    }

    pub fn dismiss(&mut self) {
        if self.open {
            debug!("editor dismissed");
        }
        self.close();
    }

    /// Routes the form's cancel button.
    pub fn cancel(&mut self) {
        self.form.cancel();
        self.dismiss();
    }

    /// Delivers a pending edit submission, if its delay has elapsed.
    pub fn tick<S: KeyValueStore>(
        &mut self,
        repo: &mut TaskRepository<S>,
        now: DateTime<Utc>,
    ) -> Option<Committed> {
        if !self.open {
            return None;
        }
        match self.form.poll(now)? {
            Submission::Update(task) => {
                let persisted = self.commit(repo, task.clone());
                Some(Committed { task, persisted })
            }
            Submission::Create(_) => None,
        }
    }

    fn close(&mut self) {
        self.open = false;
        self.editing = None;
        self.form.load(None);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::form::FormState;
    use crate::store::MemoryStore;
    use crate::task::{Category, Priority, TaskDraft};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 16, 9, 0, 0).unwrap()
    }

    fn task(id: &str, title: &str) -> Task {
        TaskDraft::new(title, Category::new("Work")).into_task(id)
    }

    fn repo() -> TaskRepository<MemoryStore> {
        TaskRepository::load(
            MemoryStore::new(),
            "tasks",
            vec![task("1", "Test Task"), task("2", "Other")],
            &Categories::default(),
        )
        .0
    }

    fn session() -> EditSession {
        EditSession::new(Categories::default(), FormTimings::default())
    }

    #[test]
    fn start_edit_opens_populated_form() {
        let mut session = session();
        session.start_edit(task("1", "Test Task"));

        assert!(session.is_open());
        assert_eq!(session.editing().map(|t| t.id.as_str()), Some("1"));
        assert_eq!(session.form().state(), FormState::Populated);
        assert_eq!(session.form().fields().title, "Test Task");
    }

    #[test]
    fn starting_another_edit_replaces_the_reference() {
        let mut session = session();
        session.start_edit(task("1", "Test Task"));
        session.start_edit(task("2", "Other"));

        assert_eq!(session.editing().map(|t| t.id.as_str()), Some("2"));
        assert_eq!(session.form().editing_id(), Some("2"));
    }

    #[test]
    fn commit_updates_repository_and_closes() {
        let mut repo = repo();
        let mut session = session();
        session.start_edit(repo.get("1").cloned().unwrap());

        let mut updated = repo.get("1").cloned().unwrap();
        updated.priority = Priority::Low;
        session.commit(&mut repo, updated).unwrap();

        assert!(!session.is_open());
        assert!(session.editing().is_none());
        assert_eq!(repo.get("1").unwrap().priority, Priority::Low);
    }

    #[test]
    fn dismiss_leaves_repository_untouched() {
        let mut repo = repo();
        let before = repo.tasks().to_vec();
        let stored = repo.store().raw("tasks").map(str::to_string);
        let mut session = session();
        session.start_edit(repo.get("2").cloned().unwrap());
        session.form_mut().set_title("never saved");
        session.dismiss();

        assert!(!session.is_open());
        assert_eq!(repo.tasks(), before.as_slice());
        assert_eq!(repo.store().raw("tasks").map(str::to_string), stored);
    }

    #[test]
    fn tick_commits_form_submission() {
        let mut repo = repo();
        let mut session = session();
        session.start_edit(repo.get("1").cloned().unwrap());
        session.form_mut().set_title("Updated Task Title");
        session.form_mut().submit(now()).unwrap();

        assert!(session.tick(&mut repo, now()).is_none());
        let committed = session
            .tick(&mut repo, now() + Duration::milliseconds(300))
            .expect("submission delivered");

        assert!(committed.persisted.is_ok());
        assert_eq!(committed.task.title, "Updated Task Title");
        assert_eq!(repo.get("1").unwrap().title, "Updated Task Title");
        assert!(!session.is_open());
    }

    #[test]
    fn cancel_closes_without_commit() {
        let mut repo = repo();
        let mut session = session();
        session.start_edit(repo.get("1").cloned().unwrap());
        session.form_mut().set_title("changed");
        session.form_mut().submit(now()).unwrap();
        session.cancel();

        assert!(!session.is_open());
        assert!(session.tick(&mut repo, now() + Duration::seconds(1)).is_none());
        assert_eq!(repo.get("1").unwrap().title, "Test Task");
    }
}
