use std::cmp::Ordering;

use crate::task::Task;

/// Display order: priority rank, then
/// dated before undated, then earliest due.
/// Stable, so undated ties keep input
/// order.
pub fn display_order(
  a: &Task,
  b: &Task
) -> Ordering {
  a.priority
    .rank()
    .cmp(&b.priority.rank())
    .then_with(|| {
      match (a.due_date, b.due_date) {
        | (Some(x), Some(y)) => x.cmp(&y),
        | (Some(_), None) => {
          Ordering::Less
        }
        | (None, Some(_)) => {
          Ordering::Greater
        }
        | (None, None) => Ordering::Equal
      }
    })
}

#[must_use]
pub fn sort_for_display(
  tasks: &[Task]
) -> Vec<Task> {
  let mut sorted = tasks.to_vec();
  sorted.sort_by(display_order);
  sorted
}

#[cfg(test)]
mod tests {
  use chrono::{
    DateTime,
    Duration,
    TimeZone,
    Utc
  };

  use super::sort_for_display;
  use crate::task::{
    Category,
    Priority,
    Task,
    TaskDraft
  };

  fn now() -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2026, 2, 16, 9, 0, 0
      )
      .unwrap()
  }

  fn task(
    id: &str,
    priority: Priority,
    due: Option<DateTime<Utc>>
  ) -> Task {
    let mut draft = TaskDraft::new(
      format!("task {id}"),
      Category::new("Work")
    );
    draft.priority = priority;
    draft.due_date = due;
    draft.into_task(id)
  }

  fn ids(tasks: &[Task]) -> Vec<&str> {
    tasks
      .iter()
      .map(|t| t.id.as_str())
      .collect()
  }

  #[test]
  fn high_priority_without_due_beats_low_with_due()
  {
    let tasks = vec![
      task("low", Priority::Low, Some(now() + Duration::days(1))),
      task("high", Priority::High, None),
    ];
    let sorted = sort_for_display(&tasks);
    assert_eq!(
      ids(&sorted),
      vec!["high", "low"]
    );
  }

  #[test]
  fn reverse_inserted_priorities_come_out_ordered()
  {
    let tasks = vec![
      task("l", Priority::Low, None),
      task("m", Priority::Medium, None),
      task("h", Priority::High, None),
    ];
    assert_eq!(
      ids(&sort_for_display(&tasks)),
      vec!["h", "m", "l"]
    );
  }

  #[test]
  fn dated_before_undated_then_by_due()
  {
    let tasks = vec![
      task("none-a", Priority::Medium, None),
      task("later", Priority::Medium, Some(now() + Duration::days(3))),
      task("none-b", Priority::Medium, None),
      task("sooner", Priority::Medium, Some(now() + Duration::hours(2))),
    ];
    assert_eq!(
      ids(&sort_for_display(&tasks)),
      vec![
        "sooner", "later", "none-a",
        "none-b"
      ]
    );
  }

  #[test]
  fn sorting_is_idempotent_and_pure() {
    let tasks = vec![
      task("a", Priority::Low, None),
      task("b", Priority::High, Some(now())),
      task("c", Priority::Medium, None),
      task("d", Priority::High, None),
    ];
    let once = sort_for_display(&tasks);
    let twice = sort_for_display(&once);
    assert_eq!(once, twice);
    assert_eq!(
      ids(&tasks),
      vec!["a", "b", "c", "d"]
    );
  }
}
