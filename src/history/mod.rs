//! Sliding-window history of accepted steps.
//!
//! Every accepted sample is turned into a [`HistoryRecord`] on ingestion:
//! energies and unwrapped angles are computed once, here, and stored. Reads
//! hand back exactly what was observed at the time.
//!
//! Storage is a [`RingBuffer`] of `ceil(W / dt) + 2` records, so memory stays
//! bounded and appends never shift.

pub mod ring;

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::engine::state::{PhysicalParams, RotorState};
use crate::physics::derived::{wrap_angle, AngleUnwrapper, EnergyBreakdown};

pub use ring::{BufferPhase, RingBuffer};

/// One accepted step, with its derived quantities frozen at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Simulation time (s).
    pub time: f64,
    /// Raw integrated state.
    pub state: RotorState,
    /// Energy decomposition.
    pub energy: EnergyBreakdown,
    /// Cumulative unwrapped angles.
    pub unwrapped_theta: (f64, f64),
}

/// Chronological, column-oriented copy of the history window.
///
/// All four columns have the same length (the occupancy at read time).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    /// Sample times, strictly increasing.
    pub times: Vec<f64>,
    /// Raw states.
    pub states: Vec<RotorState>,
    /// `(e1, e2, etotal)` per sample.
    pub energies: Vec<(f64, f64, f64)>,
    /// Unwrapped `(theta1, theta2)` per sample.
    pub unwrapped_thetas: Vec<(f64, f64)>,
}

impl HistorySnapshot {
    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Unwrapped angles folded back into `[-π, π)` for display.
    #[must_use]
    pub fn wrapped_thetas(&self) -> Vec<(f64, f64)> {
        self.unwrapped_thetas
            .iter()
            .map(|&(a, b)| (wrap_angle(a), wrap_angle(b)))
            .collect()
    }

    /// Per-rotator indices where the wrapped angle trace must break; see
    /// [`segment_breaks`].
    #[must_use]
    pub fn segment_breaks(&self) -> (Vec<usize>, Vec<usize>) {
        let (first, second): (Vec<f64>, Vec<f64>) = self.wrapped_thetas().into_iter().unzip();
        (segment_breaks(&first), segment_breaks(&second))
    }

    /// Visible time range for this window, ending at its latest sample.
    /// An empty snapshot is treated as ending at `t = 0`.
    #[must_use]
    pub fn time_axis(&self, window_width: f64) -> (f64, f64) {
        time_axis(window_width, self.times.last().copied().unwrap_or(0.0))
    }
}

/// Indices `i` where a plotted line must break between samples `i-1`
/// and `i` because `series` jumps by more than `π`.
#[must_use]
pub fn segment_breaks(series: &[f64]) -> Vec<usize> {
    series
        .windows(2)
        .enumerate()
        .filter(|(_, w)| (w[1] - w[0]).abs() > PI)
        .map(|(i, _)| i + 1)
        .collect()
}

/// Visible time range for a window of width `window_width` ending at
/// `now`: `(max(0, now − W), max(W, now))`.
#[must_use]
pub fn time_axis(window_width: f64, now: f64) -> (f64, f64) {
    ((now - window_width).max(0.0), window_width.max(now))
}

impl FromIterator<HistoryRecord> for HistorySnapshot {
    fn from_iter<I: IntoIterator<Item = HistoryRecord>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        let mut snap = Self {
            times: Vec::with_capacity(lower),
            states: Vec::with_capacity(lower),
            energies: Vec::with_capacity(lower),
            unwrapped_thetas: Vec::with_capacity(lower),
        };
        for record in iter {
            snap.times.push(record.time);
            snap.states.push(record.state);
            snap.energies.push(record.energy.as_tuple());
            snap.unwrapped_thetas.push(record.unwrapped_theta);
        }
        snap
    }
}

/// Bounded history plus the unwrap accumulator feeding it.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    buffer: RingBuffer<HistoryRecord>,
    unwrapper: AngleUnwrapper,
    params: PhysicalParams,
}

impl HistoryStore {
    /// Allocate a store for `capacity` records.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize, params: PhysicalParams) -> Self {
        Self {
            buffer: RingBuffer::with_capacity(capacity),
            unwrapper: AngleUnwrapper::default(),
            params,
        }
    }

    /// Clear occupancy and seed the window with the initial sample.
    pub fn reset(&mut self, time: f64, state: &RotorState, params: PhysicalParams) {
        self.buffer.clear();
        self.params = params;
        self.unwrapper.seed(state.theta1, state.theta2);
        self.ingest(time, state);
    }

    /// Compute derived quantities for an accepted sample and append it.
    pub fn ingest(&mut self, time: f64, state: &RotorState) -> HistoryRecord {
        let unwrapped_theta = self.unwrapper.update(state.theta1, state.theta2);
        let record = HistoryRecord {
            time,
            state: *state,
            energy: EnergyBreakdown::of(state, &self.params),
            unwrapped_theta,
        };
        self.buffer.push(record);
        record
    }

    /// Chronological column copy of the window.
    #[must_use]
    pub fn snapshot(&self) -> HistorySnapshot {
        self.buffer.iter().copied().collect()
    }

    /// Iterate records oldest to newest.
    pub fn records(&self) -> impl DoubleEndedIterator<Item = &HistoryRecord> + '_ {
        self.buffer.iter()
    }

    /// Most recent record.
    #[must_use]
    pub fn latest(&self) -> Option<&HistoryRecord> {
        self.buffer.latest()
    }

    /// Current occupancy.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been ingested since the last reset.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Fixed capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Occupancy phase.
    #[must_use]
    pub const fn phase(&self) -> BufferPhase {
        self.buffer.phase()
    }

    /// Parameters used for energy computation.
    #[must_use]
    pub const fn params(&self) -> PhysicalParams {
        self.params
    }
}
