//! The single owner of the week board's state.
//!
//! A [`Scheduler`] holds the task store snapshot, the anchor date, the
//! selection and the drag machinery. Presentation code reads it and calls
//! back into its command methods; nothing else mutates the store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::autoscroll::{Autoscroll, DayEdgeStepper, Edge, EdgeZone};
use crate::calendar::{CalendarCache, CalendarData};
use crate::datetime::{DAYS_PER_WEEK, shift_weeks};
use crate::drag::{DragController, DragEffect, DragPhase, PointerKind, PointerSample, SensorConfig};
use crate::store::TaskStore;
use crate::task::{Task, TaskId, TaskPatch};

pub const DEFAULT_VIEWPORT_WIDTH: f64 = 1280.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDirection {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekStep {
    Previous,
    Next,
}

impl From<Edge> for WeekStep {
    fn from(edge: Edge) -> Self {
        match edge {
            Edge::Left => WeekStep::Previous,
            Edge::Right => WeekStep::Next,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Seven-column week grid.
    Desktop,
    /// One day at a time with a weekday strip.
    Mobile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeTarget {
    DayList,
    WeekStrip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerOptions {
    pub sensors: SensorConfig,
    pub edge_threshold_px: f64,
    pub autoscroll_interval: Duration,
    pub day_change_debounce: Duration,
    pub swipe_threshold_px: f64,
    pub mobile_max_width: f64,
    pub rollback_on_cancel: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            sensors: SensorConfig::default(),
            edge_threshold_px: 100.0,
            autoscroll_interval: Duration::from_millis(750),
            day_change_debounce: Duration::from_millis(300),
            swipe_threshold_px: 80.0,
            mobile_max_width: 768.0,
            rollback_on_cancel: false,
        }
    }
}

#[derive(Debug)]
pub struct Scheduler {
    store: TaskStore,
    current_date: NaiveDate,
    selected_day: usize,
    direction: NavigationDirection,
    selected_task: Option<TaskId>,
    viewport_width: f64,
    drag: DragController,
    autoscroll: Autoscroll,
    day_stepper: DayEdgeStepper,
    cache: CalendarCache,
    options: SchedulerOptions,
}

impl Scheduler {
    pub fn new(store: TaskStore, current_date: NaiveDate, options: SchedulerOptions) -> Self {
        let zone = EdgeZone::new(options.edge_threshold_px);
        info!(
            tasks = store.len(),
            %current_date,
            "scheduler ready"
        );
        Self {
            store,
            current_date,
            selected_day: 0,
            direction: NavigationDirection::Left,
            selected_task: None,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            drag: DragController::new(options.sensors),
            autoscroll: Autoscroll::new(zone, options.autoscroll_interval),
            day_stepper: DayEdgeStepper::new(zone, options.day_change_debounce),
            cache: CalendarCache::new(),
            options,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn selected_day(&self) -> usize {
        self.selected_day
    }

    pub fn direction(&self) -> NavigationDirection {
        self.direction
    }

    pub fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    pub fn layout(&self) -> LayoutMode {
        if self.viewport_width <= self.options.mobile_max_width {
            LayoutMode::Mobile
        } else {
            LayoutMode::Desktop
        }
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Week derived from the anchor date and the current store snapshot.
    pub fn calendar(&mut self) -> Arc<CalendarData> {
        self.cache.get(self.current_date, &self.store)
    }

    pub fn calendar_recomputations(&self) -> u64 {
        self.cache.recomputations()
    }

    /// Date of the focused day in the single-day view.
    pub fn selected_date(&mut self) -> NaiveDate {
        self.calendar().week_dates[self.selected_day]
    }

    pub fn selected_task_id(&self) -> Option<&TaskId> {
        self.selected_task.as_ref()
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.selected_task
            .as_ref()
            .and_then(|id| self.store.get(id.as_str()))
    }

    pub fn active_task_id(&self) -> Option<&TaskId> {
        self.drag.active_task_id()
    }

    /// The task under the drag overlay.
    pub fn active_task(&self) -> Option<&Task> {
        self.active_task_id()
            .and_then(|id| self.store.get(id.as_str()))
    }

    pub fn drag_phase(&self) -> &DragPhase {
        self.drag.phase()
    }

    pub fn autoscroll(&self) -> Option<Edge> {
        self.autoscroll.edge()
    }

    pub fn is_autoscrolling(&self) -> bool {
        self.autoscroll.is_running()
    }

    pub fn add_task(&mut self, task: Task) {
        self.store = self.store.add(task);
    }

    pub fn delete_task(&mut self, id: &str) {
        if self.active_task_id().is_some_and(|active| active.as_str() == id) {
            self.drag_cancel();
        }
        if self.selected_task.as_ref().is_some_and(|selected| selected.as_str() == id) {
            self.selected_task = None;
        }
        self.store = self.store.delete(id);
    }

    pub fn update_task(&mut self, id: &str, patch: &TaskPatch) {
        self.store = self.store.update(id, patch);
    }

    pub fn move_to_date(&mut self, id: &str, date: NaiveDate) {
        self.store = self.store.move_to_date(id, date);
    }

    /// Focuses the weekday at `index` (Monday = 0). Out-of-range indices
    /// are ignored.
    pub fn handle_day_change(&mut self, index: usize) -> bool {
        if index >= DAYS_PER_WEEK {
            warn!(index, "day index out of range; ignoring");
            return false;
        }
        self.direction = if index > self.selected_day {
            NavigationDirection::Left
        } else {
            NavigationDirection::Right
        };
        debug!(from = self.selected_day, to = index, direction = ?self.direction, "day change");
        self.selected_day = index;
        true
    }

    pub fn handle_week_change(&mut self, step: WeekStep) {
        let (weeks, direction) = match step {
            WeekStep::Previous => (-1, NavigationDirection::Right),
            WeekStep::Next => (1, NavigationDirection::Left),
        };
        self.direction = direction;
        self.current_date = shift_weeks(self.current_date, weeks);
        debug!(?step, current_date = %self.current_date, "week change");
    }

    /// Opens (or with `None` closes) the detail view. Unknown tasks and
    /// requests made while a drag is running are ignored.
    pub fn set_selected_task(&mut self, id: Option<TaskId>) {
        match id {
            None => self.selected_task = None,
            Some(id) => {
                if self.drag.is_dragging() {
                    debug!(%id, "selection ignored while dragging");
                } else if !self.store.contains(id.as_str()) {
                    debug!(%id, "selection of unknown task ignored");
                } else {
                    self.selected_task = Some(id);
                }
            }
        }
    }

    /// Horizontal swipe released with `offset_x` pixels of travel; negative
    /// values swipe towards the left.
    pub fn handle_swipe(&mut self, target: SwipeTarget, offset_x: f64) {
        let threshold = self.options.swipe_threshold_px;
        match target {
            SwipeTarget::DayList => {
                if self.drag.is_dragging() {
                    debug!("day swipe ignored while dragging");
                    return;
                }
                if offset_x < -threshold && self.selected_day + 1 < DAYS_PER_WEEK {
                    self.handle_day_change(self.selected_day + 1);
                } else if offset_x > threshold && self.selected_day > 0 {
                    self.handle_day_change(self.selected_day - 1);
                }
            }
            SwipeTarget::WeekStrip => {
                if offset_x < -threshold {
                    self.handle_week_change(WeekStep::Next);
                } else if offset_x > threshold {
                    self.handle_week_change(WeekStep::Previous);
                }
            }
        }
    }

    pub fn set_viewport_width(&mut self, width: f64) {
        self.viewport_width = width;
        if self.layout() == LayoutMode::Mobile {
            self.autoscroll.stop();
        }
    }

    pub fn pointer_down(&mut self, task_id: TaskId, sample: PointerSample) {
        let effects = self
            .drag
            .press(task_id, sample, self.selected_task.as_ref(), &self.store);
        self.apply_drag_effects(effects);
    }

    /// Pointer moved; `over` is the day under the pointer, if any.
    pub fn pointer_move(&mut self, sample: PointerSample, over: Option<NaiveDate>) {
        let effects = self.drag.update(sample, over, &self.store);
        self.apply_drag_effects(effects);
        self.track_edges(sample);
    }

    pub fn pointer_up(&mut self, sample: PointerSample, over: Option<NaiveDate>) {
        let effects = self.drag.release(sample, over, &self.store);
        self.apply_drag_effects(effects);
        self.stop_edge_tracking();
    }

    pub fn drag_cancel(&mut self) {
        let effects = self.drag.cancel();
        self.apply_drag_effects(effects);
        self.stop_edge_tracking();
    }

    /// Advances timers: delayed drag activation and week autoscroll.
    pub fn tick(&mut self, now: Instant) {
        let effects = self.drag.poll(now, &self.store);
        self.apply_drag_effects(effects);

        if !self.drag.is_dragging() {
            self.autoscroll.stop();
            return;
        }
        if let Some((edge, fired)) = self.autoscroll.poll(now) {
            for _ in 0..fired {
                self.handle_week_change(WeekStep::from(edge));
            }
        }
    }

    fn track_edges(&mut self, sample: PointerSample) {
        if !self.drag.is_dragging() {
            self.autoscroll.stop();
            return;
        }
        match self.layout() {
            LayoutMode::Desktop => {
                self.autoscroll
                    .track(sample.x, self.viewport_width, sample.at);
            }
            LayoutMode::Mobile => {
                self.autoscroll.stop();
                if sample.kind == PointerKind::Touch
                    && let Some(next) = self.day_stepper.step(
                        sample.x,
                        self.viewport_width,
                        self.selected_day,
                        sample.at,
                    )
                {
                    self.handle_day_change(next);
                }
            }
        }
    }

    fn stop_edge_tracking(&mut self) {
        if !self.drag.is_dragging() {
            self.autoscroll.stop();
            self.day_stepper.reset();
        }
    }

    fn apply_drag_effects(&mut self, effects: Vec<DragEffect>) {
        for effect in effects {
            match effect {
                DragEffect::Activated(task_id) => {
                    debug!(%task_id, "drag active");
                }
                DragEffect::Aborted(task_id) => {
                    debug!(%task_id, "press abandoned");
                }
                DragEffect::Tapped(task_id) => {
                    self.set_selected_task(Some(task_id));
                }
                DragEffect::Moved { task_id, date } => {
                    self.move_to_date(task_id.as_str(), date);
                }
                DragEffect::Ended {
                    task_id,
                    target,
                    origin_date,
                } => {
                    if target.is_none() && self.options.rollback_on_cancel {
                        debug!(%task_id, %origin_date, "rolling back cancelled drag");
                        self.move_to_date(task_id.as_str(), origin_date);
                    }
                }
            }
        }
    }
}
