use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::datetime::parse_iso_date;
use crate::store::TaskStore;
use crate::task::{Task, TaskColor, TaskId};

const SAMPLE_EVENTS_JSON: &str = include_str!("../data/events.json");

/// One entry of the static event dataset, before it is tagged with a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub time: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub color: Option<TaskColor>,
}

/// Events grouped by their `YYYY-MM-DD` key.
pub type EventsByDate = BTreeMap<String, Vec<EventRecord>>;

pub fn parse_events(raw: &str) -> anyhow::Result<EventsByDate> {
    serde_json::from_str(raw).context("failed parsing event dataset")
}

#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_events(path: &Path) -> anyhow::Result<EventsByDate> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let events =
        parse_events(&raw).with_context(|| format!("invalid dataset {}", path.display()))?;
    debug!(dates = events.len(), "loaded event dataset");
    Ok(events)
}

/// The dataset bundled with the crate.
pub fn sample_events() -> anyhow::Result<EventsByDate> {
    parse_events(SAMPLE_EVENTS_JSON).context("bundled sample dataset is invalid")
}

/// Flattens the dataset into tasks, each tagged with its date key.
pub fn tasks_from_events(events: &EventsByDate) -> anyhow::Result<Vec<Task>> {
    let mut seen = BTreeSet::new();
    let mut tasks = Vec::new();

    for (raw_date, day_events) in events {
        let date = parse_iso_date(raw_date)
            .with_context(|| format!("invalid date key in dataset: {raw_date}"))?;

        for event in day_events {
            if !seen.insert(event.id.clone()) {
                return Err(anyhow!(
                    "duplicate event id {} (second occurrence on {raw_date})",
                    event.id
                ));
            }

            let image_url = event
                .image_url
                .as_ref()
                .map(|url| url.trim())
                .filter(|url| !url.is_empty())
                .map(str::to_string);

            tasks.push(Task {
                id: TaskId::new(event.id.clone()),
                date,
                time: event.time.clone(),
                title: event.title.clone(),
                description: event.description.clone(),
                image_url,
                color: event.color,
            });
        }
    }

    Ok(tasks)
}

#[tracing::instrument(skip(events))]
pub fn seed_store(events: &EventsByDate) -> anyhow::Result<TaskStore> {
    let tasks = tasks_from_events(events)?;
    info!(
        dates = events.len(),
        tasks = tasks.len(),
        "seeded task store"
    );
    Ok(TaskStore::from_tasks(tasks))
}
