use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};

use crate::board::{BoardEvent, TaskBoard};
use crate::cli::{AddArgs, Command, EditArgs, ListArgs};
use crate::config::Config;
use crate::datetime::parse_due_expr;
use crate::form::TaskForm;
use crate::render::Renderer;
use crate::store::KeyValueStore;
use crate::task::{Priority, Status};

/// Runs one command against the board. `None` lists every task.
#[instrument(skip(board, cfg, renderer, command, now))]
pub fn dispatch<S: KeyValueStore>(
    board: &mut TaskBoard<S>,
    cfg: &Config,
    renderer: &Renderer,
    command: Option<Command>,
    now: DateTime<Tz>,
) -> anyhow::Result<()> {
    let command = command.unwrap_or_else(|| Command::List(ListArgs::default()));
    debug!(?command, "dispatching command");

    match command {
        Command::Add(args) => cmd_add(board, renderer, args, now),
        Command::Edit(args) => cmd_edit(board, renderer, args, now),
        Command::Delete { id } => cmd_delete(board, renderer, &id),
        Command::List(args) => cmd_list(board, cfg, renderer, args, now),
        Command::Info { id } => cmd_info(board, renderer, &id, now),
        Command::Overview => renderer.print_overview(&board.overview(&now)),
        Command::Categories => cmd_categories(board, renderer),
    }
}

#[instrument(skip(board, renderer, args, now))]
fn cmd_add<S: KeyValueStore>(
    board: &mut TaskBoard<S>,
    renderer: &Renderer,
    args: AddArgs,
    now: DateTime<Tz>,
) -> anyhow::Result<()> {
    info!("command add");

    let form = board.create_form_mut();
    form.set_title(args.title.join(" "));
    fill_form(
        form,
        FieldChanges {
            description: args.description,
            priority: args.priority,
            status: args.status,
            category: args.category,
        },
    )?;
    if let Some(expr) = args.due {
        form.set_due(Some(parse_due_expr(&expr, now)?));
    }

    let events = submit_and_settle(board, |b| b.create_form_mut(), now.with_timezone(&Utc))?;
    let added = events.iter().find_map(|event| match event {
        BoardEvent::TaskAdded(task) => Some(task.id.clone()),
        _ => None,
    });
    report_warnings(&events, renderer)?;

    let id = added.ok_or_else(|| anyhow!("task was not created"))?;
    renderer.print_line(&format!("Created task {id}."))
}

#[instrument(skip(board, renderer, args, now), fields(id = %args.id))]
fn cmd_edit<S: KeyValueStore>(
    board: &mut TaskBoard<S>,
    renderer: &Renderer,
    args: EditArgs,
    now: DateTime<Tz>,
) -> anyhow::Result<()> {
    info!("command edit");

    let due = match (&args.due, args.no_due) {
        (_, true) => Some(None),
        (Some(expr), false) => Some(Some(parse_due_expr(expr, now)?)),
        (None, false) => None,
    };

    if !board.start_edit(&args.id) {
        return Err(anyhow!("no task with id {}", args.id));
    }

    let form = board.editor_mut().form_mut();
    if let Some(title) = args.title {
        form.set_title(title);
    }
    if let Some(due) = due {
        form.set_due(due);
    }
    let submitted = fill_form(
        form,
        FieldChanges {
            description: args.description,
            priority: args.priority,
            status: args.status,
            category: args.category,
        },
    )
    .and_then(|()| {
        submit_and_settle(
            board,
            |b| b.editor_mut().form_mut(),
            now.with_timezone(&Utc),
        )
    });
    if submitted.is_err() {
        board.editor_mut().dismiss();
    }
    let events = submitted?;
    let updated = events
        .iter()
        .any(|event| matches!(event, BoardEvent::TaskUpdated(_)));
    report_warnings(&events, renderer)?;

    if !updated {
        return Err(anyhow!("task {} was not modified", args.id));
    }
    renderer.print_line(&format!("Modified task {}.", args.id))
}

#[instrument(skip(board, renderer))]
fn cmd_delete<S: KeyValueStore>(
    board: &mut TaskBoard<S>,
    renderer: &Renderer,
    id: &str,
) -> anyhow::Result<()> {
    info!("command delete");

    let (removed, warning) = board.delete(id).into_parts();
    if let Some(err) = warning {
        renderer.print_warning(&format!("change not saved: {err}"))?;
    }
    if !removed {
        return Err(anyhow!("no task with id {id}"));
    }
    renderer.print_line(&format!("Deleted task {id}."))
}

#[instrument(skip(board, cfg, renderer, args, now))]
fn cmd_list<S: KeyValueStore>(
    board: &mut TaskBoard<S>,
    cfg: &Config,
    renderer: &Renderer,
    args: ListArgs,
    now: DateTime<Tz>,
) -> anyhow::Result<()> {
    info!(tab = ?args.tab, "command list");

    if let Some(label) = &args.category {
        board
            .select_category(label)
            .with_context(|| format!("cannot filter by category {label:?}"))?;
    }
    if let Some(query) = args.search {
        let at = now.with_timezone(&Utc);
        board.search_input(query, at);
        let events = board.tick(at + cfg.debounce());
        debug!(events = events.len(), "search settled");
    }

    let views = board.views(&now);
    renderer.print_tabs(&views.counts(), args.tab)?;

    let tasks = views.get(args.tab);
    if tasks.is_empty() {
        if board.tasks().is_empty() {
            renderer.print_line("No tasks yet. Add one with `taskeasy add`.")?;
        } else {
            renderer.print_line("No tasks in this view.")?;
        }
    } else {
        renderer.print_task_table(tasks, &now)?;
    }

    if let Some(summary) = board.search_summary(&now) {
        renderer.print_line(&summary)?;
    }
    Ok(())
}

fn cmd_info<S: KeyValueStore>(
    board: &TaskBoard<S>,
    renderer: &Renderer,
    id: &str,
    now: DateTime<Tz>,
) -> anyhow::Result<()> {
    let task = board
        .repository()
        .get(id)
        .ok_or_else(|| anyhow!("no task with id {id}"))?;
    renderer.print_task_info(task, &now)
}

fn cmd_categories<S: KeyValueStore>(
    board: &TaskBoard<S>,
    renderer: &Renderer,
) -> anyhow::Result<()> {
    let default = board.categories().default_category();
    for category in board.categories().iter() {
        let count = board
            .tasks()
            .iter()
            .filter(|t| &t.category == category)
            .count();
        let marker = if *category == default {
            " (default)"
        } else {
            ""
        };
        renderer.print_line(&format!("{category}{marker}: {count}"))?;
    }
    Ok(())
}

struct FieldChanges {
    description: Option<String>,
    priority: Option<Priority>,
    status: Option<Status>,
    category: Option<String>,
}

fn fill_form(form: &mut TaskForm, changes: FieldChanges) -> anyhow::Result<()> {
    if let Some(description) = changes.description {
        form.set_description(description);
    }
    if let Some(priority) = changes.priority {
        form.set_priority(priority);
    }
    if let Some(status) = changes.status {
        form.set_status(status);
    }
    if let Some(label) = changes.category {
        form.set_category(&label)?;
    }
    Ok(())
}

/// Submits the selected form and ticks the board past the submit delay.
fn submit_and_settle<S, F>(
    board: &mut TaskBoard<S>,
    mut form: F,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<BoardEvent>>
where
    S: KeyValueStore,
    F: FnMut(&mut TaskBoard<S>) -> &mut TaskForm,
{
    let target = form(board);
    target.submit(now)?;
    let settle_at = now + target.timings().submit_delay;
    Ok(board.tick(settle_at))
}

fn report_warnings(events: &[BoardEvent], renderer: &Renderer) -> anyhow::Result<()> {
    for event in events {
        if let BoardEvent::PersistenceWarning(err) = event {
            warn!(error = %err, "task change not persisted");
            renderer.print_warning(&format!("change not saved: {err}"))?;
        }
    }
    Ok(())
}
