use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate, Weekday};
use weekboard_core::calendar::CalendarData;
use weekboard_core::config::Config;
use weekboard_core::dataset::{parse_events, sample_events, seed_store};
use weekboard_core::datetime::{parse_iso_date, start_of_week, week_dates};
use weekboard_core::drag::PointerSample;
use weekboard_core::render::{GridRenderer, Renderer, WeekView};
use weekboard_core::scheduler::{Scheduler, SchedulerOptions, WeekStep};
use weekboard_core::store::TaskStore;
use weekboard_core::task::{Task, TaskId, color_for};

fn date(raw: &str) -> NaiveDate {
    parse_iso_date(raw).expect("valid date")
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn two_task_board() -> Scheduler {
    let events = parse_events(
        r#"{
            "2024-03-11": [{"id": "a", "time": "09:00", "title": "A", "description": "", "imageUrl": ""}],
            "2024-03-12": [{"id": "b", "time": "10:00", "title": "B", "description": "", "imageUrl": ""}]
        }"#,
    )
    .expect("parse events");
    let store = seed_store(&events).expect("seed");
    Scheduler::new(store, date("2024-03-11"), SchedulerOptions::default())
}

#[test]
fn week_dates_are_seven_consecutive_days_from_monday() {
    let mut day = date("2023-12-25");
    for _ in 0..30 {
        let week = week_dates(day);
        assert_eq!(week[0].weekday(), Weekday::Mon);
        assert!(week.contains(&day));
        assert!(week.windows(2).all(|pair| pair[1] - pair[0] == chrono::Duration::days(1)));
        assert_eq!(start_of_week(start_of_week(day)), start_of_week(day));
        day = day.succ_opt().expect("next day");
    }
}

#[test]
fn seeded_week_groups_tasks_by_day() {
    let mut board = two_task_board();
    let week = board.calendar();

    assert_eq!(week.week_dates[0], date("2024-03-11"));
    assert_eq!(week.weekly_tasks[0].len(), 1);
    assert_eq!(week.weekly_tasks[0][0].id.as_str(), "a");
    assert_eq!(week.weekly_tasks[1][0].id.as_str(), "b");
    assert!(week.weekly_tasks[2..].iter().all(Vec::is_empty));
    assert_eq!(week.label, "March 2024");
}

#[test]
fn dragging_over_a_day_reassigns_only_that_task() {
    let mut board = two_task_board();
    let t0 = Instant::now();

    board.pointer_down(TaskId::from("a"), PointerSample::mouse(400.0, 300.0, t0));
    board.pointer_move(PointerSample::mouse(470.0, 300.0, t0 + ms(30)), None);
    assert_eq!(board.active_task().map(|task| task.title.as_str()), Some("A"));

    board.pointer_move(
        PointerSample::mouse(520.0, 300.0, t0 + ms(60)),
        Some(date("2024-03-13")),
    );
    let week = board.calendar();
    assert!(week.weekly_tasks[0].is_empty());
    assert_eq!(week.weekly_tasks[2][0].id.as_str(), "a");
    assert_eq!(week.weekly_tasks[1][0].id.as_str(), "b");

    board.pointer_up(
        PointerSample::mouse(520.0, 300.0, t0 + ms(90)),
        Some(date("2024-03-13")),
    );
    assert!(board.active_task().is_none());
    assert_eq!(board.store().get("a").map(|t| t.date), Some(date("2024-03-13")));
    assert_eq!(board.store().get("b").map(|t| t.date), Some(date("2024-03-12")));
}

#[test]
fn cancelled_drop_keeps_the_last_hovered_day() {
    let mut board = two_task_board();
    let t0 = Instant::now();

    board.pointer_down(TaskId::from("a"), PointerSample::mouse(400.0, 300.0, t0));
    board.pointer_move(PointerSample::mouse(470.0, 300.0, t0 + ms(30)), None);
    board.pointer_move(
        PointerSample::mouse(700.0, 300.0, t0 + ms(60)),
        Some(date("2024-03-15")),
    );
    board.pointer_move(PointerSample::mouse(700.0, 900.0, t0 + ms(90)), None);
    board.pointer_up(PointerSample::mouse(700.0, 900.0, t0 + ms(120)), None);

    assert_eq!(board.store().get("a").map(|t| t.date), Some(date("2024-03-15")));
}

#[test]
fn self_move_keeps_the_snapshot() {
    let store = TaskStore::from_tasks([Task::new("a", date("2024-03-11"), "09:00", "A")]);
    let same = store.move_to_date("a", date("2024-03-11"));
    assert!(same.same_snapshot(&store));

    let missing = store.move_to_date("zzz", date("2024-03-12"));
    assert!(missing.same_snapshot(&store));
}

#[test]
fn days_are_sorted_chronologically() {
    let store = TaskStore::from_tasks([
        Task::new("late", date("2024-03-11"), "09:00", "Late"),
        Task::new("early", date("2024-03-11"), "08:30", "Early"),
        Task::new("unpadded", date("2024-03-11"), "9:15", "Unpadded"),
    ]);
    let week = CalendarData::derive(date("2024-03-11"), &store);
    let order: Vec<&str> = week.weekly_tasks[0].iter().map(|t| t.id.as_str()).collect();
    assert_eq!(order, vec!["early", "late", "unpadded"]);
}

#[test]
fn colours_are_stable_per_id() {
    assert_eq!(color_for("event-1"), color_for("event-1"));
    let task = Task::new("event-1", date("2024-03-11"), "09:00", "A");
    assert_eq!(task.display_color(), color_for("event-1"));
}

#[test]
fn autoscroll_advances_only_while_held_at_the_edge() {
    let mut board = two_task_board();
    let t0 = Instant::now();

    board.pointer_down(TaskId::from("b"), PointerSample::mouse(400.0, 300.0, t0));
    board.pointer_move(PointerSample::mouse(10.0, 300.0, t0 + ms(10)), None);
    for step in 1..=3 {
        board.tick(t0 + ms(10 + 750 * step));
    }
    assert_eq!(board.current_date(), date("2024-02-19"));

    board.pointer_up(PointerSample::mouse(10.0, 300.0, t0 + ms(2400)), None);
    board.tick(t0 + ms(10_000));
    assert_eq!(board.current_date(), date("2024-02-19"));

    board.handle_week_change(WeekStep::Next);
    assert_eq!(board.current_date(), date("2024-02-26"));
}

#[test]
fn sample_board_renders_with_config_defaults() {
    let cfg = Config::default();
    let store = seed_store(&sample_events().expect("sample")).expect("seed");
    let mut board = Scheduler::new(
        store,
        cfg.start_date().expect("start date"),
        cfg.scheduler_options(),
    );

    let week = board.calendar();
    let view = WeekView {
        calendar: &week,
        selected_day: board.selected_day(),
    };
    let mut out = Vec::new();
    Renderer::plain()
        .print_week(&GridRenderer, &view, &mut out)
        .expect("render");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains("Mon 11"));
    assert!(text.contains("09:00 Team standup (event-1)"));
}
