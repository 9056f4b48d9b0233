use std::io::{self, IsTerminal, Write};

use chrono::{Datelike, NaiveDate};
use unicode_width::UnicodeWidthStr;

use crate::calendar::{CalendarData, DayColumn};
use crate::config::Config;
use crate::datetime::{day_name, format_iso_date, month_name_of, weekday_index};
use crate::scheduler::LayoutMode;
use crate::task::Task;

const EMPTY_GRID_DAY: &str = "No events";
const EMPTY_LIST_DAY: &str = "No events scheduled";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

/// What a week view draws: the derived week plus the focused day.
#[derive(Debug, Clone, Copy)]
pub struct WeekView<'a> {
    pub calendar: &'a CalendarData,
    pub selected_day: usize,
}

/// A way of laying out one [`CalendarData`].
pub trait WeekRenderer {
    fn render(
        &self,
        renderer: &Renderer,
        view: &WeekView<'_>,
        out: &mut dyn Write,
    ) -> anyhow::Result<()>;
}

/// Seven columns side by side.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridRenderer;

/// The focused day under a weekday strip.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListRenderer;

pub fn week_renderer(layout: LayoutMode) -> &'static dyn WeekRenderer {
    match layout {
        LayoutMode::Desktop => &GridRenderer,
        LayoutMode::Mobile => &ListRenderer,
    }
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self::with_color(cfg.color && io::stdout().is_terminal())
    }

    pub fn with_color(color: bool) -> Self {
        Self { color }
    }

    pub fn plain() -> Self {
        Self::with_color(false)
    }

    #[tracing::instrument(skip_all, fields(week = %view.calendar.first_date()))]
    pub fn print_week(
        &self,
        week_renderer: &dyn WeekRenderer,
        view: &WeekView<'_>,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        week_renderer.render(self, view, out)?;
        out.flush()?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task, out), fields(id = %task.id))]
    pub fn print_task_detail(&self, task: &Task, out: &mut dyn Write) -> anyhow::Result<()> {
        let weekday = day_name(weekday_index(task.date)).unwrap_or_default();

        writeln!(out, "{}", self.paint(&task.title, "1"))?;
        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "date        {} ({weekday})", format_iso_date(task.date))?;
        writeln!(out, "time        {}", task.time)?;
        writeln!(
            out,
            "color       {}",
            self.paint(task.display_color().as_str(), task.display_color().ansi_code())
        )?;
        writeln!(
            out,
            "image       {}",
            task.image_url.as_deref().unwrap_or("-")
        )?;
        if !task.description.is_empty() {
            writeln!(out)?;
            writeln!(out, "{}", task.description)?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    fn task_label(&self, task: &Task) -> String {
        format!(
            "{} {} ({})",
            task.time,
            self.paint(&task.title, task.display_color().ansi_code()),
            task.id
        )
    }

    fn week_heading(&self, calendar: &CalendarData) -> String {
        format!(
            "{}  {}",
            self.paint(&calendar.label, "1"),
            calendar.week_range_label()
        )
    }
}

impl WeekRenderer for GridRenderer {
    fn render(
        &self,
        renderer: &Renderer,
        view: &WeekView<'_>,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let calendar = view.calendar;
        writeln!(out, "{}", renderer.week_heading(calendar))?;
        writeln!(out)?;

        let days: Vec<DayColumn<'_>> = calendar.days().collect();
        let headers = days
            .iter()
            .map(|day| format!("{} {}", day.short_name, day.day_of_month()))
            .collect();

        let row_count = days.iter().map(|day| day.tasks.len()).max().unwrap_or(0).max(1);
        let rows = (0..row_count)
            .map(|row| {
                days.iter()
                    .map(|day| match day.tasks.get(row) {
                        Some(task) => renderer.task_label(task),
                        None if row == 0 => renderer.paint(EMPTY_GRID_DAY, "2"),
                        None => String::new(),
                    })
                    .collect()
            })
            .collect();

        write_table(out, headers, rows)
    }
}

impl WeekRenderer for ListRenderer {
    fn render(
        &self,
        renderer: &Renderer,
        view: &WeekView<'_>,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let calendar = view.calendar;
        writeln!(out, "{}", renderer.week_heading(calendar))?;

        let strip = calendar
            .days()
            .map(|day| {
                let label = format!("{} {}", day.short_name, day.day_of_month());
                if day.index == view.selected_day {
                    renderer.paint(&format!("[{label}]"), "7")
                } else {
                    format!(" {label} ")
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{strip}")?;
        writeln!(out)?;

        let Some(day) = calendar.day(view.selected_day) else {
            return Ok(());
        };
        writeln!(out, "{}", renderer.paint(&day_heading(day.date), "1"))?;

        if day.is_empty() {
            writeln!(out, "  {}", renderer.paint(EMPTY_LIST_DAY, "2"))?;
            return Ok(());
        }

        let time_width = day
            .tasks
            .iter()
            .map(|task| UnicodeWidthStr::width(task.time.as_str()))
            .max()
            .unwrap_or(0);
        for task in day.tasks {
            let padding = time_width.saturating_sub(UnicodeWidthStr::width(task.time.as_str()));
            writeln!(
                out,
                "  {}{}  {} ({})",
                task.time,
                " ".repeat(padding),
                renderer.paint(&task.title, task.display_color().ansi_code()),
                task.id
            )?;
            if !task.description.is_empty() {
                writeln!(out, "  {}  {}", " ".repeat(time_width), task.description)?;
            }
        }
        Ok(())
    }
}

/// `Wednesday, March 13`
fn day_heading(date: NaiveDate) -> String {
    format!(
        "{}, {} {}",
        day_name(weekday_index(date)).unwrap_or_default(),
        month_name_of(date),
        date.day()
    )
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(widths.iter().copied()) {
        write!(writer, "{header:width$} | ")?;
    }
    writeln!(writer)?;

    for width in widths.iter().copied() {
        write!(writer, "{:-<width$}-+-", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(widths.iter().copied()) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} | ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::parse_iso_date;
    use crate::store::TaskStore;
    use crate::task::TaskColor;

    fn date(raw: &str) -> NaiveDate {
        parse_iso_date(raw).expect("valid date")
    }

    fn calendar() -> CalendarData {
        let store = TaskStore::from_tasks([
            Task::new("a", date("2024-03-11"), "09:00", "Standup"),
            Task::new("b", date("2024-03-11"), "08:30", "Gym").with_description("Leg day"),
            Task::new("c", date("2024-03-13"), "14:00", "Review").with_color(TaskColor::Green),
        ]);
        CalendarData::derive(date("2024-03-11"), &store)
    }

    fn render(week_renderer: &dyn WeekRenderer, renderer: &Renderer, selected_day: usize) -> String {
        let calendar = calendar();
        let view = WeekView {
            calendar: &calendar,
            selected_day,
        };
        let mut out = Vec::new();
        renderer
            .print_week(week_renderer, &view, &mut out)
            .expect("render");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn grid_shows_every_day_with_placeholders() {
        let text = render(&GridRenderer, &Renderer::plain(), 0);

        assert!(text.starts_with("March 2024  2024-03-11 - 2024-03-17"));
        for header in ["Mon 11", "Tue 12", "Wed 13", "Sun 17"] {
            assert!(text.contains(header), "missing {header}");
        }
        assert_eq!(text.matches(EMPTY_GRID_DAY).count(), 5);

        let gym = text.find("08:30 Gym (b)").expect("gym");
        let standup = text.find("09:00 Standup (a)").expect("standup");
        assert!(gym < standup);
        assert!(text.contains("14:00 Review (c)"));
    }

    #[test]
    fn list_shows_the_selected_day() {
        let text = render(&ListRenderer, &Renderer::plain(), 0);
        assert!(text.contains("[Mon 11]"));
        assert!(text.contains("Monday, March 11"));
        assert!(text.contains("08:30  Gym (b)"));
        assert!(text.contains("Leg day"));
        assert!(!text.contains("Review"));

        let empty = render(&ListRenderer, &Renderer::plain(), 1);
        assert!(empty.contains("[Tue 12]"));
        assert!(empty.contains(EMPTY_LIST_DAY));
    }

    #[test]
    fn colour_codes_do_not_break_alignment() {
        let text = render(&GridRenderer, &Renderer::with_color(true), 0);
        assert!(text.contains("\x1b[32mReview\x1b[0m"));

        let plain = strip_ansi(&text);
        let widths: Vec<usize> = plain
            .lines()
            .skip(2)
            .filter(|line| !line.is_empty())
            .map(UnicodeWidthStr::width)
            .collect();
        assert!(widths.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn detail_lists_task_fields() {
        let task = Task::new("event-1", date("2024-03-13"), "10:00", "Design review")
            .with_description("Walk through mockups")
            .with_image_url("https://example.com/a.png");
        let mut out = Vec::new();
        Renderer::plain()
            .print_task_detail(&task, &mut out)
            .expect("detail");
        let text = String::from_utf8(out).expect("utf8");

        assert!(text.starts_with("Design review\n"));
        assert!(text.contains("date        2024-03-13 (Wednesday)"));
        assert!(text.contains("image       https://example.com/a.png"));
        assert!(text.ends_with("Walk through mockups\n"));
    }

    #[test]
    fn layout_picks_the_renderer() {
        let calendar = calendar();
        let view = WeekView {
            calendar: &calendar,
            selected_day: 2,
        };
        let mut out = Vec::new();
        week_renderer(LayoutMode::Mobile)
            .render(&Renderer::plain(), &view, &mut out)
            .expect("render");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Wednesday, March 13"));
    }
}
