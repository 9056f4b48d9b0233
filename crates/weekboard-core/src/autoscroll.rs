use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::datetime::DAYS_PER_WEEK;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
}

/// Band of `threshold_px` along the left and right viewport edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeZone {
    pub threshold_px: f64,
}

impl EdgeZone {
    pub fn new(threshold_px: f64) -> Self {
        Self { threshold_px }
    }

    pub fn classify(&self, x: f64, viewport_width: f64) -> Option<Edge> {
        if x < self.threshold_px {
            Some(Edge::Left)
        } else if viewport_width - x < self.threshold_px {
            Some(Edge::Right)
        } else {
            None
        }
    }
}

/// Fires every `interval` after it was started, until dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatingTimer {
    interval: Duration,
    next_due: Instant,
}

impl RepeatingTimer {
    pub fn start(interval: Duration, now: Instant) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        Self {
            interval,
            next_due: now + interval,
        }
    }

    /// Number of firings due by `now`.
    pub fn poll(&mut self, now: Instant) -> u32 {
        let mut fired = 0;
        while now >= self.next_due {
            fired += 1;
            self.next_due += self.interval;
        }
        fired
    }
}

/// Week autoscroll while a drag hovers near a viewport edge.
///
/// The timer exists only while the pointer is inside an edge zone;
/// [`Autoscroll::stop`] drops it, so nothing can fire after a drag ends.
#[derive(Debug, Clone)]
pub struct Autoscroll {
    zone: EdgeZone,
    interval: Duration,
    edge: Option<Edge>,
    timer: Option<RepeatingTimer>,
}

impl Autoscroll {
    pub fn new(zone: EdgeZone, interval: Duration) -> Self {
        Self {
            zone,
            interval,
            edge: None,
            timer: None,
        }
    }

    pub fn edge(&self) -> Option<Edge> {
        self.edge
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Re-evaluates the edge for a new pointer position. Entering a zone (or
    /// switching sides) restarts the timer; leaving every zone stops it.
    pub fn track(&mut self, x: f64, viewport_width: f64, now: Instant) {
        let edge = self.zone.classify(x, viewport_width);
        if edge == self.edge {
            return;
        }

        debug!(from = ?self.edge, to = ?edge, x, "autoscroll edge changed");
        self.edge = edge;
        self.timer = edge.map(|_| RepeatingTimer::start(self.interval, now));
    }

    pub fn stop(&mut self) {
        if self.timer.is_some() {
            debug!("autoscroll stopped");
        }
        self.edge = None;
        self.timer = None;
    }

    /// Firings due by `now`, with the edge they scroll towards.
    pub fn poll(&mut self, now: Instant) -> Option<(Edge, u32)> {
        let edge = self.edge?;
        let fired = self.timer.as_mut()?.poll(now);
        (fired > 0).then_some((edge, fired))
    }
}

/// Steps the focused day while a touch drag rests near an edge, at most
/// once per `min_interval`.
#[derive(Debug, Clone)]
pub struct DayEdgeStepper {
    zone: EdgeZone,
    min_interval: Duration,
    last_change: Option<Instant>,
}

impl DayEdgeStepper {
    pub fn new(zone: EdgeZone, min_interval: Duration) -> Self {
        Self {
            zone,
            min_interval,
            last_change: None,
        }
    }

    /// New day index if the pointer at `x` should move focus off `selected_day`.
    pub fn step(
        &mut self,
        x: f64,
        viewport_width: f64,
        selected_day: usize,
        now: Instant,
    ) -> Option<usize> {
        if let Some(last) = self.last_change
            && now.saturating_duration_since(last) < self.min_interval
        {
            return None;
        }

        let next = match self.zone.classify(x, viewport_width)? {
            Edge::Left if selected_day > 0 => selected_day - 1,
            Edge::Right if selected_day + 1 < DAYS_PER_WEEK => selected_day + 1,
            _ => return None,
        };

        trace!(from = selected_day, to = next, x, "edge day step");
        self.last_change = Some(now);
        Some(next)
    }

    pub fn reset(&mut self) {
        self.last_change = None;
    }
}
