use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::datetime::{
    DAYS_PER_WEEK, format_iso_date, month_name_of, short_day_name, week_dates,
};
use crate::store::TaskStore;
use crate::task::Task;

/// Everything the week views need, derived from an anchor date and a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarData {
    pub week_dates: [NaiveDate; DAYS_PER_WEEK],
    pub weekly_tasks: [Vec<Task>; DAYS_PER_WEEK],
    pub label: String,
}

/// One column of the week grid, or the single day of the list view.
#[derive(Debug, Clone, Copy)]
pub struct DayColumn<'a> {
    pub index: usize,
    pub date: NaiveDate,
    pub short_name: &'static str,
    pub tasks: &'a [Task],
}

impl DayColumn<'_> {
    pub fn day_of_month(&self) -> u32 {
        self.date.day()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl CalendarData {
    #[tracing::instrument(skip(store), fields(version = store.version()))]
    pub fn derive(current_date: NaiveDate, store: &TaskStore) -> Self {
        let week_dates = week_dates(current_date);
        let monday = week_dates[0];

        let mut weekly_tasks: [Vec<Task>; DAYS_PER_WEEK] = Default::default();
        for task in store.iter() {
            let offset = (task.date - monday).num_days();
            if (0..DAYS_PER_WEEK as i64).contains(&offset) {
                weekly_tasks[offset as usize].push(task.clone());
            }
        }
        for tasks in &mut weekly_tasks {
            tasks.sort_by(compare_by_time);
        }

        let label = period_label(week_dates[0], week_dates[DAYS_PER_WEEK - 1]);
        debug!(
            week_start = %monday,
            tasks = weekly_tasks.iter().map(Vec::len).sum::<usize>(),
            "derived calendar week"
        );

        Self {
            week_dates,
            weekly_tasks,
            label,
        }
    }

    pub fn first_date(&self) -> NaiveDate {
        self.week_dates[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.week_dates[DAYS_PER_WEEK - 1]
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.week_dates.iter().position(|d| *d == date)
    }

    pub fn day(&self, index: usize) -> Option<DayColumn<'_>> {
        let date = *self.week_dates.get(index)?;
        Some(DayColumn {
            index,
            date,
            short_name: short_day_name(index)?,
            tasks: &self.weekly_tasks[index],
        })
    }

    pub fn days(&self) -> impl Iterator<Item = DayColumn<'_>> {
        (0..DAYS_PER_WEEK).filter_map(|index| self.day(index))
    }

    /// Tasks scheduled on `date`; empty when the date lies outside the week.
    pub fn tasks_for(&self, date: NaiveDate) -> &[Task] {
        self.index_of(date)
            .map(|index| self.weekly_tasks[index].as_slice())
            .unwrap_or(&[])
    }

    pub fn week_range_label(&self) -> String {
        format!(
            "{} - {}",
            format_iso_date(self.first_date()),
            format_iso_date(self.last_date())
        )
    }
}

/// Label for the span between two dates: `March 2024`,
/// `March - April 2024` or `December 2024 - January 2025`.
pub fn period_label(first: NaiveDate, last: NaiveDate) -> String {
    let first_month = month_name_of(first);
    let last_month = month_name_of(last);

    if first.year() == last.year() && first.month() == last.month() {
        format!("{first_month} {}", first.year())
    } else if first.year() == last.year() {
        format!("{first_month} - {last_month} {}", first.year())
    } else {
        format!(
            "{first_month} {} - {last_month} {}",
            first.year(),
            last.year()
        )
    }
}

/// `Month Year` of the anchor date, as shown above the week.
pub fn header_label(date: NaiveDate) -> String {
    format!("{} {}", month_name_of(date), date.year())
}

/// Chronological order of the task times. Times that do not parse sort
/// after those that do; ties fall back to the raw text and then the id.
pub fn compare_by_time(a: &Task, b: &Task) -> Ordering {
    match (a.time_of_day(), b.time_of_day()) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.time.cmp(&b.time))
    .then_with(|| a.id.cmp(&b.id))
}

/// Memoizes [`CalendarData`] on the anchor date and the store snapshot
/// identity; a new snapshot or a new anchor date triggers recomputation.
#[derive(Debug, Default)]
pub struct CalendarCache {
    entry: Option<CacheEntry>,
    recomputations: u64,
}

#[derive(Debug)]
struct CacheEntry {
    current_date: NaiveDate,
    store: TaskStore,
    data: Arc<CalendarData>,
}

impl CalendarCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, current_date: NaiveDate, store: &TaskStore) -> Arc<CalendarData> {
        if let Some(entry) = &self.entry
            && entry.current_date == current_date
            && entry.store.same_snapshot(store)
        {
            return Arc::clone(&entry.data);
        }

        let data = Arc::new(CalendarData::derive(current_date, store));
        self.recomputations += 1;
        self.entry = Some(CacheEntry {
            current_date,
            store: store.clone(),
            data: Arc::clone(&data),
        });
        data
    }

    /// How many times the week has been derived.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::parse_iso_date;

    fn date(raw: &str) -> NaiveDate {
        parse_iso_date(raw).expect("valid date")
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.id.as_str()).collect()
    }

    #[test]
    fn groups_tasks_by_weekday() {
        let store = TaskStore::from_tasks([
            Task::new("a", date("2024-03-11"), "09:00", "A"),
            Task::new("b", date("2024-03-12"), "10:00", "B"),
            Task::new("outside", date("2024-03-18"), "10:00", "Next week"),
        ]);
        let data = CalendarData::derive(date("2024-03-13"), &store);

        assert_eq!(data.first_date(), date("2024-03-11"));
        assert_eq!(data.last_date(), date("2024-03-17"));
        assert_eq!(ids(&data.weekly_tasks[0]), vec!["a"]);
        assert_eq!(ids(&data.weekly_tasks[1]), vec!["b"]);
        assert!(data.weekly_tasks[2..].iter().all(Vec::is_empty));
        assert!(data.tasks_for(date("2024-03-18")).is_empty());
    }

    #[test]
    fn sorts_chronologically_not_lexically() {
        let store = TaskStore::from_tasks([
            Task::new("nine", date("2024-03-11"), "09:00", "Nine"),
            Task::new("half-eight", date("2024-03-11"), "08:30", "Half eight"),
            Task::new("quarter-past", date("2024-03-11"), "9:15", "Unpadded"),
            Task::new("evening", date("2024-03-11"), "7:00 pm", "Evening"),
            Task::new("whenever", date("2024-03-11"), "tbd", "Unknown"),
        ]);
        let data = CalendarData::derive(date("2024-03-11"), &store);

        assert_eq!(
            ids(&data.weekly_tasks[0]),
            vec!["half-eight", "nine", "quarter-past", "evening", "whenever"]
        );
    }

    #[test]
    fn equal_times_are_ordered_by_id() {
        let store = TaskStore::from_tasks([
            Task::new("b", date("2024-03-11"), "09:00", "B"),
            Task::new("a", date("2024-03-11"), "09:00", "A"),
        ]);
        let data = CalendarData::derive(date("2024-03-11"), &store);
        assert_eq!(ids(&data.weekly_tasks[0]), vec!["a", "b"]);
    }

    #[test]
    fn labels_cover_month_and_year_boundaries() {
        assert_eq!(
            period_label(date("2024-03-11"), date("2024-03-17")),
            "March 2024"
        );
        assert_eq!(
            period_label(date("2024-04-29"), date("2024-05-05")),
            "April - May 2024"
        );
        assert_eq!(
            period_label(date("2024-12-30"), date("2025-01-05")),
            "December 2024 - January 2025"
        );

        let data = CalendarData::derive(date("2025-01-01"), &TaskStore::new());
        assert_eq!(data.label, "December 2024 - January 2025");
        assert_eq!(data.week_range_label(), "2024-12-30 - 2025-01-05");
        assert_eq!(header_label(date("2025-01-01")), "January 2025");
    }

    #[test]
    fn day_columns_carry_names_and_dates() {
        let data = CalendarData::derive(date("2024-03-11"), &TaskStore::new());
        let sunday = data.day(6).expect("sunday");
        assert_eq!(sunday.short_name, "Sun");
        assert_eq!(sunday.day_of_month(), 17);
        assert!(sunday.is_empty());
        assert!(data.day(7).is_none());
        assert_eq!(data.days().count(), 7);
    }

    #[test]
    fn cache_recomputes_only_on_new_inputs() {
        let store = TaskStore::from_tasks([Task::new("a", date("2024-03-11"), "09:00", "A")]);
        let mut cache = CalendarCache::new();

        let first = cache.get(date("2024-03-11"), &store);
        let again = cache.get(date("2024-03-11"), &store.clone());
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(cache.recomputations(), 1);

        let unchanged = store.move_to_date("a", date("2024-03-11"));
        cache.get(date("2024-03-11"), &unchanged);
        assert_eq!(cache.recomputations(), 1);

        let moved = store.move_to_date("a", date("2024-03-12"));
        let after_move = cache.get(date("2024-03-11"), &moved);
        assert_eq!(cache.recomputations(), 2);
        assert_eq!(ids(&after_move.weekly_tasks[1]), vec!["a"]);

        cache.get(date("2024-03-18"), &moved);
        assert_eq!(cache.recomputations(), 3);

        // The earlier result is still intact.
        assert_eq!(ids(&first.weekly_tasks[0]), vec!["a"]);
    }

    #[test]
    fn invalidate_forces_a_recompute() {
        let store = TaskStore::from_tasks([Task::new("a", date("2024-03-11"), "09:00", "A")]);
        let mut cache = CalendarCache::new();

        let first = cache.get(date("2024-03-11"), &store);
        cache.invalidate();
        let second = cache.get(date("2024-03-11"), &store);

        assert_eq!(cache.recomputations(), 2);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(ids(&second.weekly_tasks[0]), vec!["a"]);
    }
}
