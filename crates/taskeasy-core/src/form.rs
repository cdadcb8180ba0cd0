//! Create/edit form for a single task.
//!
//! A form is either creating (no initial task) or editing (seeded from an
//! existing task). Submitting validates the title, then holds a short
//! "saving" state before the submission is released by [`TaskForm::poll`].

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::category::Categories;
use crate::error::{UnknownCategory, ValidationError};
use crate::task::{Priority, Status, Task, TaskDraft};
use crate::timer::Timer;

pub const DEFAULT_SUBMIT_DELAY_MS: i64 = 300;
pub const DEFAULT_SUCCESS_MS: i64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormTimings {
    pub submit_delay: Duration,
    pub success_duration: Duration,
}

impl Default for FormTimings {
    fn default() -> Self {
        Self {
            submit_delay: Duration::milliseconds(DEFAULT_SUBMIT_DELAY_MS),
            success_duration: Duration::milliseconds(DEFAULT_SUCCESS_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    /// Create mode.
    Empty,
    /// Edit mode, seeded from an existing task.
    Populated,
    Submitting,
    /// Edit mode after submit or cancel; the editor should go away.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Create(TaskDraft),
    Update(Task),
}

/// What the owner of a cancelled form should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormSignal {
    Reset,
    Close,
}

#[derive(Debug, Clone)]
pub struct TaskForm {
    fields: TaskDraft,
    editing: Option<String>,
    state: FormState,
    submit: Timer<TaskDraft>,
    success: Timer<()>,
    categories: Categories,
    timings: FormTimings,
}

impl TaskForm {
    pub fn new(categories: Categories, timings: FormTimings) -> Self {
        let fields = TaskDraft::new("", categories.default_category());
        Self {
            fields,
            editing: None,
            state: FormState::Empty,
            submit: Timer::new(),
            success: Timer::new(),
            categories,
            timings,
        }
    }

    /// Seeds the form from `initial` (edit mode) or resets it to defaults
    /// (create mode). Any pending submit is dropped.
    pub fn load(&mut self, initial: Option<&Task>) {
        self.submit.cancel();
        match initial {
            Some(task) => {
                self.fields = task.draft();
                self.editing = Some(task.id.clone());
                self.state = FormState::Populated;
                debug!(id = %task.id, "form populated for edit");
            }
            None => {
                self.reset_fields();
                self.editing = None;
                self.state = FormState::Empty;
            }
        }
    }

    pub fn mode(&self) -> FormMode {
        if self.editing.is_some() {
            FormMode::Edit
        } else {
            FormMode::Create
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn is_submitting(&self) -> bool {
        self.state == FormState::Submitting
    }

    pub fn fields(&self) -> &TaskDraft {
        &self.fields
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    pub fn timings(&self) -> FormTimings {
        self.timings
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.fields.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.fields.description = description.into();
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.fields.priority = priority;
    }

    pub fn set_status(&mut self, status: Status) {
        self.fields.status = status;
    }

    pub fn set_category(&mut self, label: &str) -> Result<(), UnknownCategory> {
        self.fields.category = self.categories.parse(label)?;
        Ok(())
    }

    pub fn set_due(&mut self, due: Option<DateTime<Utc>>) {
        self.fields.due_date = due;
    }

    /// Validates and enters the saving state. Ignored while already saving.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.is_submitting() {
            debug!("submit ignored while saving");
            return Ok(());
        }
        if self.fields.title.trim().is_empty() {
            info!("rejected submit with empty title");
            return Err(ValidationError::EmptyTitle);
        }

        self.submit
            .schedule(now, self.timings.submit_delay, self.fields.clone());
        self.state = FormState::Submitting;
        Ok(())
    }

    /// Releases the submission once the saving delay has passed.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<Submission> {
        self.success.poll(now);

        let fired_at = self.submit.deadline()?;
        let draft = self.submit.poll(now)?;

        let submission = match self.editing.clone() {
            Some(id) => {
                self.state = FormState::Closed;
                Submission::Update(draft.into_task(id))
            }
            None => {
                self.reset_fields();
                self.state = FormState::Empty;
                self.success
                    .schedule(fired_at, self.timings.success_duration, ());
                Submission::Create(draft)
            }
        };
        debug!(mode = ?self.mode(), "form submitted");
        Some(submission)
    }

    /// Discards edits without validating or submitting.
    pub fn cancel(&mut self) -> FormSignal {
        self.submit.cancel();
        if self.editing.is_some() {
            self.state = FormState::Closed;
            FormSignal::Close
        } else {
            self.reset_fields();
            self.state = FormState::Empty;
            FormSignal::Reset
        }
    }

    /// True while the "added" confirmation should be shown.
    pub fn success_visible(&self, now: DateTime<Utc>) -> bool {
        self.success.deadline().is_some_and(|until| now < until)
    }

    pub fn submit_label(&self) -> &'static str {
        match (self.is_submitting(), self.mode()) {
            (true, _) => "Saving...",
            (false, FormMode::Edit) => "Update Task",
            (false, FormMode::Create) => "Add Task",
        }
    }

    fn reset_fields(&mut self) {
        self.fields = TaskDraft::new("", self.categories.default_category());
    }
}
