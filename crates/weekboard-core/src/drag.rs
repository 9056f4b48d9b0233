//! Drag-and-drop rescheduling of tasks between days.
//!
//! [`DragController`] turns raw pointer samples into [`DragEffect`]s. It only
//! reads the store; the owner applies the effects, which keeps every move a
//! plain `move_to_date` on the current snapshot.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{debug, info, trace};

use crate::store::TaskStore;
use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
}

/// Position of the pointer in viewport pixels at a given instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub kind: PointerKind,
    pub x: f64,
    pub y: f64,
    pub at: Instant,
}

impl PointerSample {
    pub fn mouse(x: f64, y: f64, at: Instant) -> Self {
        Self {
            kind: PointerKind::Mouse,
            x,
            y,
            at,
        }
    }

    pub fn touch(x: f64, y: f64, at: Instant) -> Self {
        Self {
            kind: PointerKind::Touch,
            x,
            y,
            at,
        }
    }

    /// Travel since the press, while a press is pending.
    fn distance_from_origin(&self, phase: &DragPhase) -> Option<f64> {
        match phase {
            DragPhase::Pressed { origin, .. } => {
                Some((self.x - origin.0).hypot(self.y - origin.1))
            }
            _ => None,
        }
    }
}

/// When a press on a task turns into a drag rather than a tap.
///
/// The drag starts once the pointer has travelled `distance_px`, or once it
/// has been held for `delay`. Travelling further than `tolerance_px` before
/// either happens abandons the press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivationConstraint {
    pub distance_px: Option<f64>,
    pub delay: Option<Duration>,
    pub tolerance_px: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Pending,
    Activate,
    Abort,
}

impl ActivationConstraint {
    pub fn mouse_default() -> Self {
        Self {
            distance_px: Some(50.0),
            delay: Some(Duration::from_millis(500)),
            tolerance_px: None,
        }
    }

    pub fn touch_default() -> Self {
        Self {
            distance_px: None,
            delay: Some(Duration::from_millis(500)),
            tolerance_px: Some(100.0),
        }
    }

    fn evaluate(&self, travelled: f64, held: Duration) -> Activation {
        if let Some(distance) = self.distance_px
            && travelled >= distance
        {
            return Activation::Activate;
        }
        if let Some(tolerance) = self.tolerance_px
            && travelled > tolerance
        {
            return Activation::Abort;
        }
        if let Some(delay) = self.delay
            && held >= delay
        {
            return Activation::Activate;
        }
        if self.distance_px.is_none() && self.delay.is_none() {
            return Activation::Activate;
        }
        Activation::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    pub mouse: ActivationConstraint,
    pub touch: ActivationConstraint,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            mouse: ActivationConstraint::mouse_default(),
            touch: ActivationConstraint::touch_default(),
        }
    }
}

impl SensorConfig {
    fn constraint_for(&self, kind: PointerKind) -> &ActivationConstraint {
        match kind {
            PointerKind::Mouse => &self.mouse,
            PointerKind::Touch => &self.touch,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragPhase {
    Idle,
    /// Pointer is down on a task; not yet a drag.
    Pressed {
        task_id: TaskId,
        kind: PointerKind,
        origin: (f64, f64),
        pressed_at: Instant,
    },
    Dragging {
        task_id: TaskId,
        kind: PointerKind,
        origin_date: NaiveDate,
        pointer: (f64, f64),
        over: Option<NaiveDate>,
    },
    /// Last drag ended; `target` is the day it was released over, if any.
    Dropped {
        task_id: TaskId,
        target: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEffect {
    Activated(TaskId),
    /// The press moved past its tolerance before activating.
    Aborted(TaskId),
    /// The press ended before activating; the task was clicked.
    Tapped(TaskId),
    Moved {
        task_id: TaskId,
        date: NaiveDate,
    },
    Ended {
        task_id: TaskId,
        target: Option<NaiveDate>,
        origin_date: NaiveDate,
    },
}

#[derive(Debug, Clone)]
pub struct DragController {
    phase: DragPhase,
    sensors: SensorConfig,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(SensorConfig::default())
    }
}

impl DragController {
    pub fn new(sensors: SensorConfig) -> Self {
        Self {
            phase: DragPhase::Idle,
            sensors,
        }
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging { .. })
    }

    /// The task being dragged; `None` outside the dragging phase.
    pub fn active_task_id(&self) -> Option<&TaskId> {
        match &self.phase {
            DragPhase::Dragging { task_id, .. } => Some(task_id),
            _ => None,
        }
    }

    pub fn pointer(&self) -> Option<(f64, f64)> {
        match &self.phase {
            DragPhase::Dragging { pointer, .. } => Some(*pointer),
            _ => None,
        }
    }

    pub fn pointer_kind(&self) -> Option<PointerKind> {
        match &self.phase {
            DragPhase::Pressed { kind, .. } | DragPhase::Dragging { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Pointer down on `task_id`. Ignored while another drag is running,
    /// for unknown tasks, and for the task whose detail view is open.
    pub fn press(
        &mut self,
        task_id: TaskId,
        sample: PointerSample,
        selected_task: Option<&TaskId>,
        store: &TaskStore,
    ) -> Vec<DragEffect> {
        if self.is_dragging() {
            debug!(%task_id, "press ignored; a drag is already running");
            return vec![];
        }
        if !store.contains(task_id.as_str()) {
            debug!(%task_id, "press on unknown task ignored");
            return vec![];
        }
        if selected_task == Some(&task_id) {
            debug!(%task_id, "press ignored; task detail is open");
            return vec![];
        }

        trace!(%task_id, kind = ?sample.kind, x = sample.x, y = sample.y, "pointer pressed");
        self.phase = DragPhase::Pressed {
            task_id,
            kind: sample.kind,
            origin: (sample.x, sample.y),
            pressed_at: sample.at,
        };
        vec![]
    }

    /// Pointer moved, currently over the day `over` (if any).
    pub fn update(
        &mut self,
        sample: PointerSample,
        over: Option<NaiveDate>,
        store: &TaskStore,
    ) -> Vec<DragEffect> {
        let travelled = sample.distance_from_origin(&self.phase);
        let mut effects = self.try_activate(travelled, sample.at, store);
        if let DragPhase::Dragging {
            task_id,
            pointer,
            over: hovered,
            ..
        } = &mut self.phase
        {
            *pointer = (sample.x, sample.y);
            *hovered = over;
            trace!(%task_id, x = sample.x, over = ?over, "drag over");
            if let Some(effect) = move_effect(task_id, over, store) {
                effects.push(effect);
            }
        }
        effects
    }

    /// Lets a held press activate on its delay without any movement.
    pub fn poll(&mut self, now: Instant, store: &TaskStore) -> Vec<DragEffect> {
        match &self.phase {
            DragPhase::Pressed { .. } => self.try_activate(None, now, store),
            _ => vec![],
        }
    }

    /// Pointer released over the day `over` (if any).
    pub fn release(
        &mut self,
        sample: PointerSample,
        over: Option<NaiveDate>,
        store: &TaskStore,
    ) -> Vec<DragEffect> {
        let travelled = sample.distance_from_origin(&self.phase);
        let mut effects = self.try_activate(travelled, sample.at, store);

        match std::mem::replace(&mut self.phase, DragPhase::Idle) {
            DragPhase::Pressed { task_id, .. } => {
                debug!(%task_id, "press released before activation");
                effects.push(DragEffect::Tapped(task_id));
            }
            DragPhase::Dragging {
                task_id,
                origin_date,
                ..
            } => {
                if let Some(effect) = move_effect(&task_id, over, store) {
                    effects.push(effect);
                }
                info!(%task_id, target = ?over, "drag dropped");
                effects.push(DragEffect::Ended {
                    task_id: task_id.clone(),
                    target: over,
                    origin_date,
                });
                self.phase = DragPhase::Dropped {
                    task_id,
                    target: over,
                };
            }
            other => self.phase = other,
        }
        effects
    }

    /// Pointer cancelled: a running drag ends as if released over nothing.
    pub fn cancel(&mut self) -> Vec<DragEffect> {
        match std::mem::replace(&mut self.phase, DragPhase::Idle) {
            DragPhase::Pressed { task_id, .. } => {
                debug!(%task_id, "press cancelled");
                vec![DragEffect::Aborted(task_id)]
            }
            DragPhase::Dragging {
                task_id,
                origin_date,
                ..
            } => {
                info!(%task_id, "drag cancelled");
                self.phase = DragPhase::Dropped {
                    task_id: task_id.clone(),
                    target: None,
                };
                vec![DragEffect::Ended {
                    task_id,
                    target: None,
                    origin_date,
                }]
            }
            other => {
                self.phase = other;
                vec![]
            }
        }
    }

    fn try_activate(
        &mut self,
        travelled: Option<f64>,
        now: Instant,
        store: &TaskStore,
    ) -> Vec<DragEffect> {
        let DragPhase::Pressed {
            task_id,
            kind,
            origin,
            pressed_at,
        } = &self.phase
        else {
            return vec![];
        };

        let (task_id, kind, origin) = (task_id.clone(), *kind, *origin);
        let held = now.saturating_duration_since(*pressed_at);

        match self.sensors.constraint_for(kind).evaluate(travelled.unwrap_or(0.0), held) {
            Activation::Pending => vec![],
            Activation::Abort => {
                debug!(%task_id, "press moved past tolerance; abandoning");
                self.phase = DragPhase::Idle;
                vec![DragEffect::Aborted(task_id)]
            }
            Activation::Activate => {
                let Some(origin_date) = store.get(task_id.as_str()).map(|task| task.date) else {
                    debug!(%task_id, "pressed task vanished before activation");
                    self.phase = DragPhase::Idle;
                    return vec![DragEffect::Aborted(task_id)];
                };
                info!(%task_id, ?kind, held_ms = held.as_millis() as u64, "drag started");
                self.phase = DragPhase::Dragging {
                    task_id: task_id.clone(),
                    kind,
                    origin_date,
                    pointer: origin,
                    over: None,
                };
                vec![DragEffect::Activated(task_id)]
            }
        }
    }
}

fn move_effect(task_id: &TaskId, over: Option<NaiveDate>, store: &TaskStore) -> Option<DragEffect> {
    let date = over?;
    let task = store.get(task_id.as_str())?;
    (task.date != date).then(|| DragEffect::Moved {
        task_id: task_id.clone(),
        date,
    })
}
