use chrono::{DateTime, Duration, Utc};

use crate::category::Categories;
use crate::task::{Priority, Status, Task};

/// Sample tasks shown to first-time users, dated relative to `now`.
///
/// Labels missing from `categories` are replaced by its default category.
pub fn sample_tasks(now: DateTime<Utc>, categories: &Categories) -> Vec<Task> {
    let task = |id: &str,
                title: &str,
                description: &str,
                priority: Priority,
                status: Status,
                category: &str,
                days: i64| Task {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        priority,
        status,
        category: categories
            .parse(category)
            .unwrap_or_else(|_| categories.default_category()),
        due_date: Some(now + Duration::days(days)),
    };

    vec![
        task(
            "1",
            "Complete project proposal",
            "Finish the TaskEasy project proposal for the client meeting",
            Priority::High,
            Status::InProgress,
            "Work",
            2,
        ),
        task(
            "2",
            "Go for a run",
            "30 minute jog in the park",
            Priority::Medium,
            Status::ToDo,
            "Health",
            0,
        ),
        task(
            "3",
            "Buy groceries",
            "Milk, eggs, bread, and vegetables",
            Priority::Low,
            Status::ToDo,
            "Home",
            1,
        ),
        task(
            "4",
            "Read chapter 5",
            "Complete reading assignment for class",
            Priority::Medium,
            Status::Done,
            "Study",
            -1,
        ),
        task(
            "5",
            "Pay utility bills",
            "Electricity and water bills due this week",
            Priority::High,
            Status::ToDo,
            "Finance",
            3,
        ),
        task(
            "6",
            "Call mom",
            "Weekly check-in call",
            Priority::Medium,
            Status::Done,
            "Personal",
            -2,
        ),
    ]
}
