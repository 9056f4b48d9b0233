use std::io::Write;
use std::time::Instant;

use anyhow::{Context, anyhow, bail};
use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use crate::autoscroll::Edge;
use crate::cli::{Command, ViewArgs, ViewChoice};
use crate::datetime::{DAYS_PER_WEEK, parse_date_arg, start_of_week, weekday_index};
use crate::drag::{PointerKind, PointerSample};
use crate::render::{GridRenderer, ListRenderer, Renderer, WeekRenderer, WeekView, week_renderer};
use crate::scheduler::{LayoutMode, Scheduler, SwipeTarget, WeekStep};
use crate::task::TaskId;

#[instrument(skip(scheduler, renderer, out))]
pub fn dispatch(
    scheduler: &mut Scheduler,
    renderer: &Renderer,
    command: Command,
    today: NaiveDate,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    debug!(layout = ?scheduler.layout(), "dispatching command");

    match command {
        Command::Week(view) => cmd_week(scheduler, renderer, &view, out),
        Command::Next(view) => cmd_step(scheduler, renderer, WeekStep::Next, &view, out),
        Command::Prev(view) => cmd_step(scheduler, renderer, WeekStep::Previous, &view, out),
        Command::Info { id } => cmd_info(scheduler, renderer, &id, out),
        Command::Move { id, target, view } => {
            let date = parse_date_arg(&target, today)
                .with_context(|| format!("invalid target date for {id}"))?;
            cmd_move(scheduler, renderer, &id, date, &view, out)
        }
    }
}

fn cmd_week(
    scheduler: &mut Scheduler,
    renderer: &Renderer,
    view: &ViewArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    if let Some(day) = view.day
        && !scheduler.handle_day_change(day)
    {
        bail!("--day must be between 0 and {}, got {day}", DAYS_PER_WEEK - 1);
    }

    let week_renderer: &dyn WeekRenderer = match view.view {
        ViewChoice::Grid => &GridRenderer,
        ViewChoice::List => &ListRenderer,
        ViewChoice::Auto => week_renderer(scheduler.layout()),
    };

    let calendar = scheduler.calendar();
    let week = WeekView {
        calendar: &calendar,
        selected_day: scheduler.selected_day(),
    };
    renderer.print_week(week_renderer, &week, out)
}

fn cmd_step(
    scheduler: &mut Scheduler,
    renderer: &Renderer,
    step: WeekStep,
    view: &ViewArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    scheduler.handle_week_change(step);
    cmd_week(scheduler, renderer, view, out)
}

#[instrument(skip(scheduler, renderer, out))]
fn cmd_info(
    scheduler: &mut Scheduler,
    renderer: &Renderer,
    id: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    if !scheduler.store().contains(id) {
        bail!("no task with id {id}");
    }
    scheduler.set_selected_task(Some(TaskId::from(id)));
    let task = scheduler
        .selected_task()
        .ok_or_else(|| anyhow!("no task with id {id}"))?;
    renderer.print_task_detail(task, out)
}

#[instrument(skip(scheduler, renderer, view, out))]
fn cmd_move(
    scheduler: &mut Scheduler,
    renderer: &Renderer,
    id: &str,
    target: NaiveDate,
    view: &ViewArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    simulate_drag(scheduler, id, target, Instant::now())?;
    info!(id, %target, "task moved");
    cmd_week(scheduler, renderer, view, out)
}

/// Replays a full drag of `id` onto `target` through the scheduler's pointer
/// events: press, activation, autoscroll (or week swipes on the mobile
/// layout) until the target week is shown, hover and drop.
#[instrument(skip(scheduler, start))]
pub fn simulate_drag(
    scheduler: &mut Scheduler,
    id: &str,
    target: NaiveDate,
    start: Instant,
) -> anyhow::Result<()> {
    if !scheduler.store().contains(id) {
        bail!("no task with id {id}");
    }

    let options = scheduler.options().clone();
    let layout = scheduler.layout();
    let width = scheduler.viewport_width();
    let centre = width / 2.0;
    let y = 300.0;
    let mut clock = start;

    let (kind, constraint) = match layout {
        LayoutMode::Desktop => (PointerKind::Mouse, options.sensors.mouse),
        LayoutMode::Mobile => (PointerKind::Touch, options.sensors.touch),
    };
    let sample = |x: f64, at: Instant| PointerSample { kind, x, y, at };

    // The detail view blocks dragging its own task.
    scheduler.set_selected_task(None);
    scheduler.pointer_down(TaskId::from(id), sample(centre, clock));

    if let Some(distance) = constraint.distance_px {
        scheduler.pointer_move(sample(centre + distance + 1.0, clock), None);
    }
    if scheduler.active_task_id().is_none() {
        clock += constraint.delay.unwrap_or_default();
        scheduler.tick(clock);
    }
    if scheduler.active_task_id().is_none() {
        scheduler.drag_cancel();
        bail!("drag of {id} did not start");
    }

    let target_week = start_of_week(target);
    let weeks_away = (target_week - start_of_week(scheduler.current_date())).num_weeks();
    let edge = if weeks_away < 0 { Edge::Left } else { Edge::Right };
    for _ in 0..weeks_away.unsigned_abs() {
        let before = scheduler.current_date();
        match layout {
            LayoutMode::Desktop => {
                let edge_x = match edge {
                    Edge::Left => 0.0,
                    Edge::Right => width,
                };
                scheduler.pointer_move(sample(edge_x, clock), None);
                if scheduler.autoscroll() != Some(edge) {
                    scheduler.drag_cancel();
                    bail!(
                        "x={edge_x} is not in the {edge:?} autoscroll zone \
                         (edge threshold {}px, viewport {width}px)",
                        options.edge_threshold_px
                    );
                }
                clock += options.autoscroll_interval;
                scheduler.tick(clock);
            }
            LayoutMode::Mobile => {
                let offset = options.swipe_threshold_px + 1.0;
                scheduler.handle_swipe(
                    SwipeTarget::WeekStrip,
                    match edge {
                        Edge::Left => offset,
                        Edge::Right => -offset,
                    },
                );
            }
        }
        if scheduler.current_date() == before {
            scheduler.drag_cancel();
            bail!("week did not advance while dragging {id} towards {target}");
        }
    }

    scheduler.pointer_move(sample(centre, clock), Some(target));
    scheduler.pointer_up(sample(centre, clock), Some(target));
    scheduler.handle_day_change(weekday_index(target));

    match scheduler.store().get(id) {
        Some(task) if task.date == target => Ok(()),
        _ => Err(anyhow!("drop of {id} on {target} was not applied")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::parse_iso_date;
    use crate::scheduler::SchedulerOptions;
    use crate::store::TaskStore;
    use crate::task::Task;

    fn date(raw: &str) -> NaiveDate {
        parse_iso_date(raw).expect("valid date")
    }

    fn scheduler(width: f64) -> Scheduler {
        let store = TaskStore::from_tasks([
            Task::new("a", date("2024-03-11"), "09:00", "Standup"),
            Task::new("b", date("2024-03-12"), "10:00", "Review"),
        ]);
        let mut scheduler = Scheduler::new(store, date("2024-03-11"), SchedulerOptions::default());
        scheduler.set_viewport_width(width);
        scheduler
    }

    fn run(scheduler: &mut Scheduler, command: Command) -> anyhow::Result<String> {
        let mut out = Vec::new();
        dispatch(
            scheduler,
            &Renderer::plain(),
            command,
            date("2024-03-11"),
            &mut out,
        )?;
        Ok(String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn drag_within_the_week_moves_the_task() {
        let mut scheduler = scheduler(1280.0);
        simulate_drag(&mut scheduler, "a", date("2024-03-14"), Instant::now()).expect("drag");

        assert_eq!(scheduler.store().get("a").map(|t| t.date), Some(date("2024-03-14")));
        assert_eq!(scheduler.current_date(), date("2024-03-11"));
        assert_eq!(scheduler.selected_day(), 3);
        assert!(!scheduler.is_autoscrolling());
    }

    #[test]
    fn desktop_drag_autoscrolls_to_later_weeks() {
        let mut scheduler = scheduler(1280.0);
        simulate_drag(&mut scheduler, "b", date("2024-03-27"), Instant::now()).expect("drag");

        assert_eq!(scheduler.store().get("b").map(|t| t.date), Some(date("2024-03-27")));
        assert_eq!(start_of_week(scheduler.current_date()), date("2024-03-25"));
        assert!(!scheduler.is_autoscrolling());
    }

    fn scheduler_with_edge(edge_threshold_px: f64, width: f64) -> Scheduler {
        let store = TaskStore::from_tasks([Task::new("a", date("2024-03-11"), "09:00", "Standup")]);
        let options = SchedulerOptions {
            edge_threshold_px,
            ..SchedulerOptions::default()
        };
        let mut scheduler = Scheduler::new(store, date("2024-03-11"), options);
        scheduler.set_viewport_width(width);
        scheduler
    }

    #[test]
    fn one_pixel_edge_zone_still_autoscrolls() {
        let mut scheduler = scheduler_with_edge(1.0, 1280.0);
        simulate_drag(&mut scheduler, "a", date("2024-03-20"), Instant::now()).expect("forwards");
        assert_eq!(scheduler.store().get("a").map(|t| t.date), Some(date("2024-03-20")));

        simulate_drag(&mut scheduler, "a", date("2024-03-05"), Instant::now()).expect("backwards");
        assert_eq!(scheduler.store().get("a").map(|t| t.date), Some(date("2024-03-05")));
        assert_eq!(start_of_week(scheduler.current_date()), date("2024-03-04"));
    }

    #[test]
    fn edge_zone_wider_than_viewport_fails_instead_of_scrolling_backwards() {
        let mut scheduler = scheduler_with_edge(900.0, 800.0);
        let err = simulate_drag(&mut scheduler, "a", date("2024-03-20"), Instant::now())
            .expect_err("unreachable right edge");

        assert!(err.to_string().contains("Right autoscroll zone"));
        assert_eq!(scheduler.active_task_id(), None);
        assert_eq!(scheduler.current_date(), date("2024-03-11"));
        assert_eq!(scheduler.store().get("a").map(|t| t.date), Some(date("2024-03-11")));
    }

    #[test]
    fn mobile_drag_swipes_back_a_week() {
        let mut scheduler = scheduler(390.0);
        simulate_drag(&mut scheduler, "a", date("2024-03-08"), Instant::now()).expect("drag");

        assert_eq!(scheduler.store().get("a").map(|t| t.date), Some(date("2024-03-08")));
        assert_eq!(scheduler.current_date(), date("2024-03-04"));
        assert_eq!(scheduler.selected_day(), 4);
    }

    #[test]
    fn drag_of_open_task_still_moves_it() {
        let mut scheduler = scheduler(1280.0);
        scheduler.set_selected_task(Some("a".into()));
        simulate_drag(&mut scheduler, "a", date("2024-03-12"), Instant::now()).expect("drag");
        assert_eq!(scheduler.store().get("a").map(|t| t.date), Some(date("2024-03-12")));
    }

    #[test]
    fn unknown_tasks_are_errors() {
        let mut scheduler = scheduler(1280.0);
        let err = simulate_drag(&mut scheduler, "zzz", date("2024-03-12"), Instant::now())
            .expect_err("unknown");
        assert!(err.to_string().contains("no task with id zzz"));

        let err = run(&mut scheduler, Command::Info { id: "zzz".to_string() })
            .expect_err("unknown info");
        assert!(err.to_string().contains("zzz"));
    }

    #[test]
    fn move_command_renders_the_new_week() {
        let mut scheduler = scheduler(1280.0);
        let text = run(
            &mut scheduler,
            Command::Move {
                id: "a".to_string(),
                target: "+1w".to_string(),
                view: ViewArgs::default(),
            },
        )
        .expect("move");

        assert!(text.contains("Mon 18"));
        assert!(text.contains("09:00 Standup (a)"));
    }

    #[test]
    fn week_commands_pick_view_and_day() {
        let mut scheduler = scheduler(1280.0);
        let text = run(
            &mut scheduler,
            Command::Week(ViewArgs {
                view: ViewChoice::List,
                day: Some(1),
            }),
        )
        .expect("week");
        assert!(text.contains("Tuesday, March 12"));
        assert!(text.contains("10:00  Review (b)"));

        let next = run(&mut scheduler, Command::Next(ViewArgs::default())).expect("next");
        assert!(next.contains("2024-03-18 - 2024-03-24"));
        assert!(next.contains("No events"));

        let err = run(
            &mut scheduler,
            Command::Prev(ViewArgs {
                view: ViewChoice::Grid,
                day: Some(9),
            }),
        )
        .expect_err("bad day");
        assert!(err.to_string().contains("--day"));
    }

    #[test]
    fn info_prints_the_detail_view() {
        let mut scheduler = scheduler(1280.0);
        let text = run(&mut scheduler, Command::Info { id: "b".to_string() }).expect("info");
        assert!(text.starts_with("Review\n"));
        assert_eq!(scheduler.selected_task_id(), Some(&TaskId::from("b")));
    }
}
