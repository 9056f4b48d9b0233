use std::borrow::Borrow;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::datetime::parse_time_of_day;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskColor {
    Blue,
    Green,
    Purple,
    Red,
    Yellow,
}

impl TaskColor {
    pub const PALETTE: [TaskColor; 5] = [
        TaskColor::Blue,
        TaskColor::Green,
        TaskColor::Purple,
        TaskColor::Red,
        TaskColor::Yellow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskColor::Blue => "blue",
            TaskColor::Green => "green",
            TaskColor::Purple => "purple",
            TaskColor::Red => "red",
            TaskColor::Yellow => "yellow",
        }
    }

    /// SGR foreground code used by the terminal renderers.
    pub fn ansi_code(self) -> &'static str {
        match self {
            TaskColor::Blue => "34",
            TaskColor::Green => "32",
            TaskColor::Purple => "35",
            TaskColor::Red => "31",
            TaskColor::Yellow => "33",
        }
    }
}

impl fmt::Display for TaskColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks a palette colour from the UTF-16 code units of `id`.
///
/// The same id always maps to the same colour; distinct ids may collide.
pub fn color_for(id: &str) -> TaskColor {
    let hash: u64 = id.encode_utf16().map(u64::from).sum();
    TaskColor::PALETTE[(hash % TaskColor::PALETTE.len() as u64) as usize]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,

    pub date: NaiveDate,

    pub time: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<TaskColor>,
}

impl Task {
    pub fn new(
        id: impl Into<TaskId>,
        date: NaiveDate,
        time: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            time: time.into(),
            title: title.into(),
            description: String::new(),
            image_url: None,
            color: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_color(mut self, color: TaskColor) -> Self {
        self.color = Some(color);
        self
    }

    /// Explicit colour, or the one derived from the id.
    pub fn display_color(&self) -> TaskColor {
        self.color.unwrap_or_else(|| color_for(self.id.as_str()))
    }

    pub fn time_of_day(&self) -> Option<NaiveTime> {
        parse_time_of_day(&self.time)
    }

    /// Merges `patch` into this task and reports whether any field changed.
    pub fn apply(&mut self, patch: &TaskPatch) -> bool {
        let mut changed = false;

        if let Some(date) = patch.date
            && date != self.date
        {
            self.date = date;
            changed = true;
        }
        changed |= assign(&mut self.time, &patch.time);
        changed |= assign(&mut self.title, &patch.title);
        changed |= assign(&mut self.description, &patch.description);
        changed |= assign(&mut self.image_url, &patch.image_url);
        changed |= assign(&mut self.color, &patch.color);

        changed
    }
}

fn assign<T: Clone + PartialEq>(slot: &mut T, value: &Option<T>) -> bool {
    match value {
        Some(value) if value != slot => {
            *slot = value.clone();
            true
        }
        _ => false,
    }
}

/// Partial update of a [`Task`]. `None` leaves a field untouched; the
/// nested options of `image_url` and `color` allow clearing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<Option<String>>,
    pub color: Option<Option<TaskColor>>,
}

impl TaskPatch {
    pub fn date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        crate::datetime::parse_iso_date(raw).expect("valid date")
    }

    #[test]
    fn color_for_is_deterministic() {
        let ids = ["a", "b", "event-1", "event-2", "日本", "🚀 launch", ""];
        for id in ids {
            assert_eq!(color_for(id), color_for(id), "{id}");
        }
    }

    #[test]
    fn color_for_sums_code_units() {
        // 'a' = 97, 97 % 5 = 2 -> purple
        assert_eq!(color_for("a"), TaskColor::Purple);
        // "" sums to 0 -> blue
        assert_eq!(color_for(""), TaskColor::Blue);
        // 'b' = 98 -> red
        assert_eq!(color_for("b"), TaskColor::Red);
    }

    #[test]
    fn display_color_prefers_explicit_color() {
        let task = Task::new("a", date("2024-03-11"), "09:00", "Standup");
        assert_eq!(task.display_color(), TaskColor::Purple);
        let task = task.with_color(TaskColor::Green);
        assert_eq!(task.display_color(), TaskColor::Green);
    }

    #[test]
    fn apply_reports_changes_only_when_values_differ() {
        let mut task = Task::new("a", date("2024-03-11"), "09:00", "Standup");

        assert!(!task.apply(&TaskPatch::date(date("2024-03-11"))));
        assert!(!task.apply(&TaskPatch::default()));

        let patch = TaskPatch {
            title: Some("Retro".to_string()),
            image_url: Some(Some("https://example.com/retro.png".to_string())),
            ..TaskPatch::default()
        };
        assert!(task.apply(&patch));
        assert_eq!(task.title, "Retro");
        assert_eq!(
            task.image_url.as_deref(),
            Some("https://example.com/retro.png")
        );

        let clear = TaskPatch {
            image_url: Some(None),
            ..TaskPatch::default()
        };
        assert!(task.apply(&clear));
        assert_eq!(task.image_url, None);
    }

    #[test]
    fn patch_is_empty_only_without_fields() {
        assert!(TaskPatch::default().is_empty());
        assert!(!TaskPatch::date(date("2024-03-11")).is_empty());

        let clear_image = TaskPatch {
            image_url: Some(None),
            ..TaskPatch::default()
        };
        assert!(!clear_image.is_empty());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let task = Task::new("a", date("2024-03-11"), "09:00", "Standup")
            .with_image_url("https://example.com/a.png");
        let json = serde_json::to_value(&task).expect("serialize");
        assert_eq!(json["date"], "2024-03-11");
        assert_eq!(json["imageUrl"], "https://example.com/a.png");
        assert!(json.get("color").is_none());
    }
}
