use chrono::{
  DateTime,
  Duration,
  Utc
};
use tracing::debug;

use crate::task::Task;
use crate::timer::{
  Timer,
  TimerToken
};

pub const DEFAULT_DEBOUNCE_MS: i64 = 300;

/// Case-insensitive substring match over
/// title, description, category, priority
/// and status. A blank query matches
/// everything.
pub fn matches(
  task: &Task,
  query: &str
) -> bool {
  let q = query.trim().to_lowercase();
  if q.is_empty() {
    return true;
  }

  [
    task.title.as_str(),
    task.description.as_str(),
    task.category.as_str(),
    task.priority.as_str(),
    task.status.as_str()
  ]
  .iter()
  .any(|field| {
    field.to_lowercase().contains(&q)
  })
}

pub fn by_search(
  tasks: &[Task],
  query: &str
) -> Vec<Task> {
  if query.trim().is_empty() {
    return tasks.to_vec();
  }

  tasks
    .iter()
    .filter(|task| matches(task, query))
    .cloned()
    .collect()
}

/// One-line summary under the search box.
pub fn search_summary(
  query: &str,
  count: usize
) -> Option<String> {
  if query.is_empty() {
    return None;
  }
  if count == 0 {
    return Some(
      "No tasks found matching your \
       search."
        .to_string()
    );
  }
  let plural =
    if count == 1 { "" } else { "s" };
  Some(format!(
    "Found {count} task{plural} \
     matching \"{query}\""
  ))
}

/// Debounced search box. Keystrokes update
/// the raw text; the active query only
/// follows after the input has been quiet
/// for the debounce interval.
#[derive(Debug, Clone)]
pub struct SearchInput {
  text:     String,
  active:   String,
  debounce: Timer<String>,
  delay:    Duration
}

impl Default for SearchInput {
  fn default() -> Self {
    Self::new(Duration::milliseconds(
      DEFAULT_DEBOUNCE_MS
    ))
  }
}

impl SearchInput {
  pub fn new(delay: Duration) -> Self {
    Self {
      text: String::new(),
      active: String::new(),
      debounce: Timer::new(),
      delay
    }
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn active_query(&self) -> &str {
    &self.active
  }

  pub fn is_settling(&self) -> bool {
    self.debounce.is_pending()
  }

  pub fn input(
    &mut self,
    text: impl Into<String>,
    now: DateTime<Utc>
  ) -> TimerToken {
    self.text = text.into();
    self.debounce.schedule(
      now,
      self.delay,
      self.text.clone()
    )
  }

  /// Applies the debounced text once the
  /// interval has elapsed and returns the
  /// new active query.
  pub fn poll(
    &mut self,
    now: DateTime<Utc>
  ) -> Option<&str> {
    let query = self.debounce.poll(now)?;
    Some(self.apply(query))
  }

  /// Delivery path for host timers that
  /// call back with the scheduling token.
  pub fn fire(
    &mut self,
    token: TimerToken
  ) -> Option<&str> {
    let query =
      self.debounce.fire(token)?;
    Some(self.apply(query))
  }

  /// Empties the box and the active query
  /// at once, dropping any pending
  /// debounce.
  pub fn clear(&mut self) -> &str {
    self.debounce.cancel();
    self.text.clear();
    self.active.clear();
    debug!("search cleared");
    &self.active
  }

  fn apply(
    &mut self,
    query: String
  ) -> &str {
    debug!(query = %query, "search query settled");
    self.active = query;
    &self.active
  }
}
