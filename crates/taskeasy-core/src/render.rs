use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::DateTime;
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::format_due_label;
use crate::filter::{Bucket, BucketCounts, DueState, Overview, due_state};
use crate::task::{Priority, Status, Task};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    tz: Tz,
}

impl Renderer {
    pub fn new(cfg: &Config, tz: Tz) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
            tz,
        })
    }

    #[tracing::instrument(skip(self, tasks, now), fields(count = tasks.len()))]
    pub fn print_task_table(&self, tasks: &[Task], now: &DateTime<Tz>) -> anyhow::Result<()> {
        self.write_task_table(io::stdout().lock(), tasks, now)
    }

    pub fn write_task_table<W: Write>(
        &self,
        out: W,
        tasks: &[Task],
        now: &DateTime<Tz>,
    ) -> anyhow::Result<()> {
        let headers = ["ID", "Due", "Priority", "Status", "Category", "Title"]
            .map(String::from)
            .to_vec();

        let rows = tasks
            .iter()
            .map(|task| {
                let title = if task.is_done() {
                    self.paint(&task.title, "2")
                } else {
                    task.title.clone()
                };
                vec![
                    self.paint(&task.id, "33"),
                    self.due_cell(task, now),
                    self.priority_cell(task.priority),
                    task.status.title().to_string(),
                    task.category.to_string(),
                    title,
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    /// One line of tab labels with their counts; the active tab is marked.
    pub fn print_tabs(&self, counts: &BucketCounts, active: Bucket) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let line = Bucket::TABS
            .iter()
            .map(|&bucket| {
                let text = format!("{bucket} ({})", counts.get(bucket));
                if bucket == active {
                    self.paint(&format!("[{text}]"), "1")
                } else {
                    text
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(out, "{line}")?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task, now), fields(id = %task.id))]
    pub fn print_task_info(&self, task: &Task, now: &DateTime<Tz>) -> anyhow::Result<()> {
        self.write_task_info(io::stdout().lock(), task, now)
    }

    pub fn write_task_info<W: Write>(
        &self,
        mut out: W,
        task: &Task,
        now: &DateTime<Tz>,
    ) -> anyhow::Result<()> {
        writeln!(out, "id           {}", task.id)?;
        writeln!(out, "title        {}", task.title)?;
        writeln!(out, "description  {}", task.description)?;
        writeln!(out, "priority     {}", task.priority.title())?;
        writeln!(out, "status       {}", task.status.title())?;
        writeln!(out, "category     {}", task.category)?;
        match task.due_date {
            Some(due) => {
                let local = due.with_timezone(&self.tz);
                writeln!(
                    out,
                    "due          {} ({})",
                    local.format("%Y-%m-%d %H:%M %Z"),
                    strip_ansi(&self.due_cell(task, now))
                )?;
            }
            None => writeln!(out, "due          -")?,
        }
        Ok(())
    }

    pub fn print_overview(&self, overview: &Overview) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let rows = vec![
            vec![Status::ToDo.title().to_string(), overview.to_do.to_string()],
            vec![
                Status::InProgress.title().to_string(),
                overview.in_progress.to_string(),
            ],
            vec![Status::Done.title().to_string(), overview.done.to_string()],
            vec![
                self.paint("Overdue", "31"),
                self.paint(&overview.overdue.to_string(), "31"),
            ],
        ];
        write_table(&mut out, vec!["Status".to_string(), "Tasks".to_string()], rows)
    }

    pub fn print_line(&self, line: &str) -> anyhow::Result<()> {
        writeln!(io::stdout().lock(), "{line}")?;
        Ok(())
    }

    pub fn print_warning(&self, message: &str) -> anyhow::Result<()> {
        writeln!(io::stderr().lock(), "warning: {message}")?;
        Ok(())
    }

    fn due_cell(&self, task: &Task, now: &DateTime<Tz>) -> String {
        let Some(due) = task.due_date else {
            return "-".to_string();
        };
        match due_state(task, now) {
            Some(DueState::Overdue) => self.paint("Overdue", "31"),
            Some(DueState::DueToday) => self.paint("Due today", "33"),
            Some(DueState::Soon) => self.paint(&format_due_label(due, &self.tz), "36"),
            _ => format_due_label(due, &self.tz),
        }
    }

    fn priority_cell(&self, priority: Priority) -> String {
        match priority {
            Priority::High => self.paint(priority.title(), "31"),
            Priority::Medium => self.paint(priority.title(), "33"),
            Priority::Low => self.paint(priority.title(), "32"),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|h| UnicodeWidthStr::width(h.as_str()))
        .collect();

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(h, *w))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", header_line.trim_end())?;

    let rule = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{rule}")?;

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| pad(cell, *w))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn pad(cell: &str, width: usize) -> String {
    let visible = UnicodeWidthStr::width(strip_ansi(cell).as_str());
    format!("{cell}{}", " ".repeat(width.saturating_sub(visible)))
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
