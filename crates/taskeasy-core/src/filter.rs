use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  DateTime,
  Duration,
  TimeZone,
  Utc
};
use tracing::trace;

use crate::category::CategoryFilter;
use crate::search::by_search;
use crate::sort::sort_for_display;
use crate::task::{
  Status,
  Task
};

/// How close a due date is, as shown next
/// to a task.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum DueState {
  Overdue,
  DueToday,
  /// Within the next two days.
  Soon,
  Later
}

/// Derived subsets of the collection.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum Bucket {
  #[default]
  All,
  ToDo,
  InProgress,
  Done,
  Overdue,
  DueToday
}

impl Bucket {
  /// Tab order on the task page.
  pub const TABS: [Bucket; 6] = [
    Bucket::All,
    Bucket::ToDo,
    Bucket::InProgress,
    Bucket::Done,
    Bucket::Overdue,
    Bucket::DueToday
  ];

  pub fn label(self) -> &'static str {
    match self {
      | Bucket::All => "All Tasks",
      | Bucket::ToDo => "To Do",
      | Bucket::InProgress => {
        "In Progress"
      }
      | Bucket::Done => "Done",
      | Bucket::Overdue => {
        "Overdue Tasks"
      }
      | Bucket::DueToday => "Due Today"
    }
  }
}

impl fmt::Display for Bucket {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for Bucket {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(Bucket::All),
      | "to-do" | "todo" => {
        Ok(Bucket::ToDo)
      }
      | "in-progress" | "inprogress" => {
        Ok(Bucket::InProgress)
      }
      | "done" => Ok(Bucket::Done),
      | "overdue" => Ok(Bucket::Overdue),
      | "today" | "due-today" => {
        Ok(Bucket::DueToday)
      }
      | other => {
        Err(anyhow!(
          "unknown view: {other}"
        ))
      }
    }
  }
}

pub fn by_category(
  tasks: &[Task],
  filter: &CategoryFilter
) -> Vec<Task> {
  match filter {
    | CategoryFilter::All => {
      tasks.to_vec()
    }
    | CategoryFilter::Only(_) => tasks
      .iter()
      .filter(|t| {
        filter.admits(&t.category)
      })
      .cloned()
      .collect()
  }
}

pub fn by_status(
  tasks: &[Task],
  status: Status
) -> Vec<Task> {
  tasks
    .iter()
    .filter(|t| t.status == status)
    .cloned()
    .collect()
}

/// Open task whose due day is before
/// `now`'s calendar day.
pub fn is_overdue<Z: TimeZone>(
  task: &Task,
  now: &DateTime<Z>
) -> bool {
  if task.is_done() {
    return false;
  }
  task
    .due_date
    .map(|due| {
      due
        .with_timezone(&now.timezone())
        .date_naive()
        < now.date_naive()
    })
    .unwrap_or(false)
}

/// Open task due on `now`'s calendar day.
pub fn is_due_today<Z: TimeZone>(
  task: &Task,
  now: &DateTime<Z>
) -> bool {
  if task.is_done() {
    return false;
  }
  task
    .due_date
    .map(|due| {
      due
        .with_timezone(&now.timezone())
        .date_naive()
        == now.date_naive()
    })
    .unwrap_or(false)
}

pub fn overdue<Z: TimeZone>(
  tasks: &[Task],
  now: &DateTime<Z>
) -> Vec<Task> {
  tasks
    .iter()
    .filter(|t| is_overdue(t, now))
    .cloned()
    .collect()
}

pub fn due_today<Z: TimeZone>(
  tasks: &[Task],
  now: &DateTime<Z>
) -> Vec<Task> {
  tasks
    .iter()
    .filter(|t| is_due_today(t, now))
    .cloned()
    .collect()
}

/// Due-date badge state. Independent of
/// status, like the label on a task card.
pub fn due_state<Z: TimeZone>(
  task: &Task,
  now: &DateTime<Z>
) -> Option<DueState> {
  let due = task.due_date?;
  let now_utc =
    now.with_timezone(&Utc);
  let due_day = due
    .with_timezone(&now.timezone())
    .date_naive();
  let today = now.date_naive();

  let state = if due_day == today {
    DueState::DueToday
  } else if due < now_utc {
    DueState::Overdue
  } else if due
    <= now_utc + Duration::days(2)
  {
    DueState::Soon
  } else {
    DueState::Later
  };
  Some(state)
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub struct BucketCounts {
  pub all:         usize,
  pub to_do:       usize,
  pub in_progress: usize,
  pub done:        usize,
  pub overdue:     usize,
  pub due_today:   usize
}

impl BucketCounts {
  pub fn get(
    &self,
    bucket: Bucket
  ) -> usize {
    match bucket {
      | Bucket::All => self.all,
      | Bucket::ToDo => self.to_do,
      | Bucket::InProgress => {
        self.in_progress
      }
      | Bucket::Done => self.done,
      | Bucket::Overdue => self.overdue,
      | Bucket::DueToday => {
        self.due_today
      }
    }
  }
}

/// Every view the task page shows, each
/// filtered by category, its own predicate
/// and then the search query, and sorted
/// for display.
#[derive(Debug, Clone, Default)]
pub struct Buckets {
  pub all:         Vec<Task>,
  pub to_do:       Vec<Task>,
  pub in_progress: Vec<Task>,
  pub done:        Vec<Task>,
  pub overdue:     Vec<Task>,
  pub due_today:   Vec<Task>
}

impl Buckets {
  pub fn get(
    &self,
    bucket: Bucket
  ) -> &[Task] {
    match bucket {
      | Bucket::All => &self.all,
      | Bucket::ToDo => &self.to_do,
      | Bucket::InProgress => {
        &self.in_progress
      }
      | Bucket::Done => &self.done,
      | Bucket::Overdue => &self.overdue,
      | Bucket::DueToday => {
        &self.due_today
      }
    }
  }

  pub fn counts(&self) -> BucketCounts {
    BucketCounts {
      all:         self.all.len(),
      to_do:       self.to_do.len(),
      in_progress: self.in_progress.len(),
      done:        self.done.len(),
      overdue:     self.overdue.len(),
      due_today:   self.due_today.len()
    }
  }
}

/// Builds all buckets. Order per bucket:
/// category, then status/time predicate,
/// then search.
#[tracing::instrument(skip(tasks, now))]
pub fn derive<Z: TimeZone>(
  tasks: &[Task],
  category: &CategoryFilter,
  query: &str,
  now: &DateTime<Z>
) -> Buckets {
  let scoped =
    by_category(tasks, category);
  let view = |subset: Vec<Task>| {
    sort_for_display(&by_search(
      &subset, query
    ))
  };

  let buckets = Buckets {
    all:         view(scoped.clone()),
    to_do:       view(by_status(
      &scoped,
      Status::ToDo
    )),
    in_progress: view(by_status(
      &scoped,
      Status::InProgress
    )),
    done:        view(by_status(
      &scoped,
      Status::Done
    )),
    overdue:     view(overdue(
      &scoped, now
    )),
    due_today:   view(due_today(
      &scoped, now
    ))
  };

  trace!(counts = ?buckets.counts(), "derived buckets");
  buckets
}

/// Summary counters over the whole
/// collection, ignoring filters.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub struct Overview {
  pub to_do:       usize,
  pub in_progress: usize,
  pub done:        usize,
  pub overdue:     usize
}

impl Overview {
  pub fn from_tasks<Z: TimeZone>(
    tasks: &[Task],
    now: &DateTime<Z>
  ) -> Self {
    let count = |status: Status| {
      tasks
        .iter()
        .filter(|t| t.status == status)
        .count()
    };
    Self {
      to_do:       count(Status::ToDo),
      in_progress: count(
        Status::InProgress
      ),
      done:        count(Status::Done),
      overdue:     tasks
        .iter()
        .filter(|t| is_overdue(t, now))
        .count()
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    DateTime,
    Duration,
    TimeZone,
    Utc
  };
  use chrono_tz::Tz;

  use super::*;
  use crate::category::Categories;
  use crate::task::{
    Category,
    Priority,
    TaskDraft
  };

  fn now() -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2026, 2, 16, 12, 0, 0
      )
      .unwrap()
  }

  fn task(
    id: &str,
    status: Status,
    category: &str,
    due: Option<DateTime<Utc>>
  ) -> Task {
    let mut draft = TaskDraft::new(
      format!("task {id}"),
      Category::new(category)
    );
    draft.status = status;
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
  fn yesterday_is_overdue_not_due_today()
  {
    let t = task(
      "y",
      Status::ToDo,
      "Work",
      Some(now() - Duration::days(1))
    );
    assert!(is_overdue(&t, &now()));
    assert!(!is_due_today(&t, &now()));
    assert_eq!(
      overdue(&[t.clone()], &now()).len(),
      1
    );
    assert!(
      due_today(&[t], &now()).is_empty()
    );
  }

  #[test]
  fn earlier_today_is_due_today_not_overdue()
  {
    let t = task(
      "e",
      Status::InProgress,
      "Work",
      Some(now() - Duration::hours(3))
    );
    assert!(is_due_today(&t, &now()));
    assert!(!is_overdue(&t, &now()));
  }

  #[test]
  fn done_and_undated_tasks_are_never_bucketed()
  {
    let done = task(
      "d",
      Status::Done,
      "Work",
      Some(now() - Duration::days(4))
    );
    let undated =
      task("u", Status::ToDo, "Work", None);
    for t in [&done, &undated] {
      assert!(!is_overdue(t, &now()));
      assert!(!is_due_today(t, &now()));
    }
  }

  #[test]
  fn overdue_and_due_today_are_exclusive()
  {
    let offsets =
      (-72..=72).step_by(5).map(|h| {
        Duration::hours(h)
      });
    for offset in offsets {
      let t = task(
        "x",
        Status::ToDo,
        "Work",
        Some(now() + offset)
      );
      assert!(
        !(is_overdue(&t, &now())
          && is_due_today(&t, &now()))
      );
    }
  }

  #[test]
  fn calendar_day_follows_now_timezone()
  {
    let tokyo: Tz =
      "Asia/Tokyo".parse().unwrap();
    // 2026-02-16 23:30 in Tokyo.
    let now_tokyo = Utc
      .with_ymd_and_hms(
        2026, 2, 16, 14, 30, 0
      )
      .unwrap()
      .with_timezone(&tokyo);
    // 2026-02-16 16:00 UTC is already
    // 2026-02-17 in Tokyo.
    let t = task(
      "t",
      Status::ToDo,
      "Work",
      Some(
        Utc
          .with_ymd_and_hms(
            2026, 2, 16, 16, 0, 0
          )
          .unwrap()
      )
    );
    assert!(!is_due_today(&t, &now_tokyo));
    assert!(is_due_today(&t, &now()));
  }

  #[test]
  fn category_filter_all_is_identity() {
    let tasks = vec![
      task("1", Status::ToDo, "Work", None),
      task("2", Status::ToDo, "Home", None),
    ];
    assert_eq!(
      by_category(
        &tasks,
        &CategoryFilter::All
      ),
      tasks
    );
    let home = CategoryFilter::parse(
      &Categories::default(),
      "Home"
    )
    .unwrap();
    assert_eq!(
      ids(&by_category(&tasks, &home)),
      vec!["2"]
    );
  }

  #[test]
  fn search_applies_to_every_bucket() {
    let mut urgent = task(
      "1",
      Status::ToDo,
      "Work",
      Some(now() - Duration::days(2))
    );
    urgent.title =
      "Invoice client".to_string();
    let mut today = task(
      "2",
      Status::InProgress,
      "Work",
      Some(now())
    );
    today.title =
      "Draft invoice".to_string();
    let other = task(
      "3",
      Status::ToDo,
      "Work",
      Some(now() - Duration::days(1))
    );
    let home = task(
      "4",
      Status::Done,
      "Home",
      None
    );
    let tasks =
      vec![urgent, today, other, home];

    let buckets = derive(
      &tasks,
      &CategoryFilter::All,
      "invoice",
      &now()
    );
    assert_eq!(
      ids(&buckets.all),
      vec!["1", "2"]
    );
    assert_eq!(
      ids(&buckets.overdue),
      vec!["1"]
    );
    assert_eq!(
      ids(&buckets.due_today),
      vec!["2"]
    );
    assert!(buckets.done.is_empty());
    assert_eq!(
      buckets.counts(),
      BucketCounts {
        all:         2,
        to_do:       1,
        in_progress: 1,
        done:        0,
        overdue:     1,
        due_today:   1
      }
    );
  }

  #[test]
  fn derived_views_are_sorted() {
    let mut low =
      task("low", Status::ToDo, "Work", None);
    low.priority = Priority::Low;
    let mut high =
      task("high", Status::ToDo, "Work", None);
    high.priority = Priority::High;

    let buckets = derive(
      &[low, high],
      &CategoryFilter::All,
      "",
      &now()
    );
    assert_eq!(
      ids(buckets.get(Bucket::ToDo)),
      vec!["high", "low"]
    );
  }

  #[test]
  fn overview_ignores_filters() {
    let tasks = vec![
      task("1", Status::ToDo, "Work", Some(now() - Duration::days(3))),
      task("2", Status::InProgress, "Home", None),
      task("3", Status::Done, "Home", Some(now() - Duration::days(3))),
    ];
    assert_eq!(
      Overview::from_tasks(&tasks, &now()),
      Overview {
        to_do:       1,
        in_progress: 1,
        done:        1,
        overdue:     1
      }
    );
  }

  #[test]
  fn due_state_labels() {
    let at = |d: Duration| {
      task(
        "x",
        Status::ToDo,
        "Work",
        Some(now() + d)
      )
    };
    assert_eq!(
      due_state(&at(Duration::days(-1)), &now()),
      Some(DueState::Overdue)
    );
    assert_eq!(
      due_state(&at(Duration::hours(2)), &now()),
      Some(DueState::DueToday)
    );
    assert_eq!(
      due_state(&at(Duration::days(1)), &now()),
      Some(DueState::Soon)
    );
    assert_eq!(
      due_state(&at(Duration::days(5)), &now()),
      Some(DueState::Later)
    );
    assert_eq!(
      due_state(
        &task("n", Status::ToDo, "Work", None),
        &now()
      ),
      None
    );
  }

  #[test]
  fn bucket_names_parse() {
    assert_eq!(
      "today".parse::<Bucket>().unwrap(),
      Bucket::DueToday
    );
    assert_eq!(
      "In-Progress"
        .parse::<Bucket>()
        .unwrap(),
      Bucket::InProgress
    );
    assert!(
      "later".parse::<Bucket>().is_err()
    );
  }

  #[test]
  fn every_tab_count_matches_its_bucket() {
    let tasks = vec![
      task(
        "1",
        Status::ToDo,
        "Work",
        Some(now() - Duration::days(1))
      ),
      task(
        "2",
        Status::InProgress,
        "Work",
        Some(now())
      ),
      task("3", Status::Done, "Home", None),
    ];
    let buckets = derive(
      &tasks,
      &CategoryFilter::All,
      "",
      &now()
    );
    let counts = buckets.counts();

    assert_eq!(Bucket::TABS[0], Bucket::All);
    for bucket in Bucket::TABS {
      assert_eq!(
        counts.get(bucket),
        buckets.get(bucket).len(),
        "{bucket}"
      );
    }
    assert_eq!(
      counts.get(Bucket::Overdue),
      1
    );
    assert_eq!(
      counts.get(Bucket::DueToday),
      1
    );
  }
}
