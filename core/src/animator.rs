//! Convergent highlight animation.
//!
//! The highlight walks a fixed cyclic path round the grid for a number of
//! full cycles, slows down over the final stretch, and stops on the cell
//! mapped to the awarded prize.
//!
//! PHASES: Idle -> Running -> Decelerating -> Stopped
//!
//! The stepping rule is a pure function, `next_state`, returning the new
//! state, the cell to highlight and the delay before the next tick. Any
//! scheduler can drive it: a real timer, a frame callback, or a test loop
//! that never sleeps.
//!
//! CONVERGENCE: a run of `|path| * cycles + path.position(target)` steps
//! from cursor 0 lands on the target by construction. The final frame is
//! nevertheless forced to the target, so a miscount can never leave the
//! highlight one cell off.

use crate::{
    error::{DrawError, DrawResult},
    rng::DrawRng,
    types::{CellIndex, PrizeId},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Receives "highlight cell N" commands.
pub trait HighlightSink {
    fn render_highlight(&mut self, cell: CellIndex);
}

// ── Path and prize mapping ─────────────────────────────────────────

/// Ordered, cyclic traversal of grid cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CellIndex>", into = "Vec<CellIndex>")]
pub struct AnimationPath {
    cells: Vec<CellIndex>,
}

impl TryFrom<Vec<CellIndex>> for AnimationPath {
    type Error = DrawError;

    fn try_from(cells: Vec<CellIndex>) -> DrawResult<Self> {
        Self::new(cells)
    }
}

impl From<AnimationPath> for Vec<CellIndex> {
    fn from(path: AnimationPath) -> Self {
        path.cells
    }
}

impl AnimationPath {
    pub fn new(cells: Vec<CellIndex>) -> DrawResult<Self> {
        if cells.is_empty() {
            return Err(DrawError::InvalidConfig("animation path is empty".into()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = cells.iter().find(|c| !seen.insert(**c)) {
            return Err(DrawError::InvalidConfig(format!(
                "cell {dup} appears twice in the animation path"
            )));
        }
        Ok(Self { cells })
    }

    /// Clockwise round a 3x3 grid whose centre cell is the trigger.
    pub fn ring_3x3() -> Self {
        Self { cells: vec![0, 1, 2, 5, 8, 7, 6, 3] }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[CellIndex] {
        &self.cells
    }

    pub fn position(&self, cell: CellIndex) -> Option<usize> {
        self.cells.iter().position(|c| *c == cell)
    }

    pub fn contains(&self, cell: CellIndex) -> bool {
        self.position(cell).is_some()
    }

    /// Cell at cursor position `cursor`, wrapping.
    pub fn cell_at(&self, cursor: usize) -> CellIndex {
        self.cells[cursor % self.cells.len()]
    }
}

/// Prize id to the grid cell the animation stops on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrizeCellMap(BTreeMap<PrizeId, CellIndex>);

impl PrizeCellMap {
    pub fn new(entries: impl IntoIterator<Item = (PrizeId, CellIndex)>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn cell_for(&self, prize_id: PrizeId) -> Option<CellIndex> {
        self.0.get(&prize_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PrizeId, CellIndex)> + '_ {
        self.0.iter().map(|(p, c)| (*p, *c))
    }
}

// ── Tunables ───────────────────────────────────────────────────────

/// Upper bound on full cycles per run.
pub const MAX_CYCLES: u32 = 1_000;

/// How many full cycles a run spins before its final approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CycleCount {
    Fixed { count: u32 },
    /// Uniform in `[min, max]`, drawn once per run.
    Random { min: u32, max: u32 },
}

impl CycleCount {
    pub fn draw(&self, rng: &mut DrawRng) -> u32 {
        match *self {
            Self::Fixed { count } => count,
            Self::Random { min, max } => rng.next_u32_inclusive(min, max),
        }
    }

    /// Largest count `draw` can return.
    pub fn most(&self) -> u32 {
        match *self {
            Self::Fixed { count } => count,
            Self::Random { min, max } => min.max(max),
        }
    }
}

/// Animation feel. None of these affect where the run stops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationProfile {
    /// Delay between ticks before deceleration starts.
    pub base_delay_ms:    u64,
    /// Added to the delay on every decelerating tick.
    pub acceleration_ms:  u64,
    pub min_delay_ms:     u64,
    pub max_delay_ms:     u64,
    /// Length of the final slow-down stretch, in path traversals.
    pub decel_traversals: f64,
    pub cycles:           CycleCount,
}

impl Default for AnimationProfile {
    fn default() -> Self {
        Self {
            base_delay_ms:    100,
            acceleration_ms:  5,
            min_delay_ms:     30,
            max_delay_ms:     250,
            decel_traversals: 1.5,
            cycles:           CycleCount::Fixed { count: 4 },
        }
    }
}

impl AnimationProfile {
    pub fn validate(&self) -> DrawResult<()> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(DrawError::InvalidConfig(format!(
                "min delay {}ms exceeds max delay {}ms",
                self.min_delay_ms, self.max_delay_ms
            )));
        }
        if self.max_delay_ms == 0 {
            return Err(DrawError::InvalidConfig("max delay must be positive".into()));
        }
        if !self.decel_traversals.is_finite() || self.decel_traversals < 0.0 {
            return Err(DrawError::InvalidConfig(format!(
                "deceleration stretch {} must be a non-negative number",
                self.decel_traversals
            )));
        }
        match self.cycles {
            CycleCount::Fixed { count: 0 } => Err(DrawError::InvalidConfig(
                "at least one full cycle is required".into(),
            )),
            CycleCount::Random { min, max } if min == 0 || min > max => {
                Err(DrawError::InvalidConfig(format!(
                    "random cycle range [{min}, {max}] must be non-empty and start at 1 or more"
                )))
            }
            cycles if cycles.most() > MAX_CYCLES => Err(DrawError::InvalidConfig(format!(
                "{} cycles exceeds the limit of {MAX_CYCLES}",
                cycles.most()
            ))),
            _ => Ok(()),
        }
    }

    fn clamp(&self, delay: u64) -> u64 {
        delay.clamp(self.min_delay_ms, self.max_delay_ms)
    }

    fn decel_steps(&self, path_len: usize) -> u32 {
        (path_len as f64 * self.decel_traversals).ceil() as u32
    }
}

// ── State machine ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationPhase {
    Idle,
    Running,
    Decelerating,
    Stopped,
}

impl AnimationPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Decelerating)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationState {
    pub phase:       AnimationPhase,
    pub target_cell: Option<CellIndex>,
    /// Position on the path, not a grid index.
    pub cursor:      usize,
    pub step:        u32,
    pub total_steps: u32,
    /// Steps after this one decelerate.
    pub decel_from:  u32,
    /// Delay before the next tick.
    pub delay_ms:    u64,
}

impl AnimationState {
    pub fn idle() -> Self {
        Self {
            phase:       AnimationPhase::Idle,
            target_cell: None,
            cursor:      0,
            step:        0,
            total_steps: 0,
            decel_from:  0,
            delay_ms:    0,
        }
    }
}

/// Output of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub highlight: Option<CellIndex>,
    /// Delay before the next tick; `None` once the run is over.
    pub delay_ms:  Option<u64>,
    /// True only on the tick that stopped the run.
    pub finished:  bool,
}

impl Frame {
    pub const QUIET: Frame = Frame { highlight: None, delay_ms: None, finished: false };
}

/// Advance one tick. Idle and Stopped states are fixed points.
pub fn next_state(
    state: &AnimationState,
    path: &AnimationPath,
    profile: &AnimationProfile,
) -> (AnimationState, Frame) {
    if !state.phase.is_active() {
        return (state.clone(), Frame::QUIET);
    }

    let mut next = state.clone();

    if next.step < next.total_steps {
        next.cursor = (next.cursor + 1) % path.len();
        next.step += 1;
    }

    if next.step >= next.total_steps {
        let natural = path.cell_at(next.cursor);
        if next.target_cell != Some(natural) {
            log::warn!(
                "animation cursor landed on {natural}, forcing target {:?}",
                next.target_cell
            );
        }
        next.phase = AnimationPhase::Stopped;
        next.delay_ms = 0;
        let frame = Frame {
            highlight: next.target_cell,
            delay_ms:  None,
            finished:  true,
        };
        return (next, frame);
    }

    if next.step > next.decel_from {
        next.phase = AnimationPhase::Decelerating;
        next.delay_ms = profile.clamp(next.delay_ms + profile.acceleration_ms);
    }

    let frame = Frame {
        highlight: Some(path.cell_at(next.cursor)),
        delay_ms:  Some(next.delay_ms),
        finished:  false,
    };
    (next, frame)
}

/// Parameters fixed at the start of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationRun {
    pub target_cell:    CellIndex,
    pub cycles:         u32,
    pub total_steps:    u32,
    /// Delay before the first tick.
    pub first_delay_ms: u64,
}

/// One widget's animator. Owns the state machine and the current
/// highlight; at most one run is active at a time.
pub struct Animator {
    path:        AnimationPath,
    profile:     AnimationProfile,
    state:       AnimationState,
    highlighted: Option<CellIndex>,
}

impl Animator {
    pub fn new(path: AnimationPath, profile: AnimationProfile) -> Self {
        Self {
            path,
            profile,
            state: AnimationState::idle(),
            highlighted: None,
        }
    }

    pub fn path(&self) -> &AnimationPath {
        &self.path
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn phase(&self) -> AnimationPhase {
        self.state.phase
    }

    pub fn is_running(&self) -> bool {
        self.state.phase.is_active()
    }

    /// Cell most recently highlighted, across runs.
    pub fn highlighted(&self) -> Option<CellIndex> {
        self.highlighted
    }

    /// Arm a run towards `target`. Rejected while a run is active.
    /// A target off the path stops the animator without touching the
    /// highlight.
    pub fn start(&mut self, target: CellIndex, rng: &mut DrawRng) -> DrawResult<AnimationRun> {
        if self.is_running() {
            return Err(DrawError::AnimationBusy);
        }

        let Some(offset) = self.path.position(target) else {
            log::error!(
                "animation target {target} is not on path {:?}",
                self.path.cells()
            );
            self.state = AnimationState {
                phase: AnimationPhase::Stopped,
                ..AnimationState::idle()
            };
            return Err(DrawError::InvalidAnimationTarget { cell: target });
        };

        let cycles = self.profile.cycles.draw(rng);
        let total_steps = u32::try_from(self.path.len())
            .ok()
            .and_then(|len| len.checked_mul(cycles))
            .and_then(|steps| steps.checked_add(u32::try_from(offset).ok()?))
            .ok_or_else(|| {
                DrawError::InvalidConfig(format!(
                    "{cycles} cycles over a {}-cell path overflow the step counter",
                    self.path.len()
                ))
            })?;
        let decel_from = total_steps.saturating_sub(self.profile.decel_steps(self.path.len()));
        let first_delay_ms = self.profile.clamp(self.profile.base_delay_ms);

        self.state = AnimationState {
            phase: AnimationPhase::Running,
            target_cell: Some(target),
            cursor: 0,
            step: 0,
            total_steps,
            decel_from,
            delay_ms: first_delay_ms,
        };

        log::debug!(
            "animation armed: target={target} cycles={cycles} steps={total_steps} decel_from={decel_from}"
        );

        Ok(AnimationRun {
            target_cell: target,
            cycles,
            total_steps,
            first_delay_ms,
        })
    }

    pub fn tick(&mut self) -> Frame {
        let (next, frame) = next_state(&self.state, &self.path, &self.profile);
        self.state = next;
        if let Some(cell) = frame.highlight {
            self.highlighted = Some(cell);
        }
        frame
    }

    /// Run to completion on the caller's scheduler. `wait` is handed each
    /// delay in turn; a test harness can simply record it.
    pub fn run(
        &mut self,
        target: CellIndex,
        rng: &mut DrawRng,
        sink: &mut dyn HighlightSink,
        mut wait: impl FnMut(u64),
    ) -> DrawResult<AnimationRun> {
        let run = self.start(target, rng)?;
        wait(run.first_delay_ms);
        loop {
            let frame = self.tick();
            if let Some(cell) = frame.highlight {
                sink.render_highlight(cell);
            }
            match frame.delay_ms {
                Some(delay) => wait(delay),
                None => break,
            }
        }
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed(total_steps: u32, decel_from: u32, delay_ms: u64) -> AnimationState {
        AnimationState {
            phase: AnimationPhase::Running,
            target_cell: Some(5),
            cursor: 0,
            step: 0,
            total_steps,
            decel_from,
            delay_ms,
        }
    }

    #[test]
    fn idle_and_stopped_are_fixed_points() {
        let path = AnimationPath::ring_3x3();
        let profile = AnimationProfile::default();
        let idle = AnimationState::idle();
        let (next, frame) = next_state(&idle, &path, &profile);
        assert_eq!(next, idle);
        assert_eq!(frame, Frame::QUIET);
    }

    #[test]
    fn delay_grows_only_in_final_stretch_and_clamps() {
        let path = AnimationPath::ring_3x3();
        let profile = AnimationProfile {
            acceleration_ms: 60,
            max_delay_ms: 200,
            ..AnimationProfile::default()
        };
        // Path position of cell 5 is 3, so 8 + 3 steps lands on it.
        let mut state = armed(11, 6, 100);
        let mut delays = Vec::new();
        loop {
            let (next, frame) = next_state(&state, &path, &profile);
            state = next;
            match frame.delay_ms {
                Some(d) => delays.push(d),
                None => {
                    assert_eq!(frame.highlight, Some(5));
                    assert!(frame.finished);
                    break;
                }
            }
        }
        assert_eq!(delays, vec![100, 100, 100, 100, 100, 100, 160, 200, 200, 200]);
        assert_eq!(state.phase, AnimationPhase::Stopped);
    }

    #[test]
    fn profile_validation() {
        assert!(AnimationProfile::default().validate().is_ok());
        let bad = AnimationProfile { cycles: CycleCount::Fixed { count: 0 }, ..Default::default() };
        assert!(bad.validate().is_err());
        let bad = AnimationProfile { cycles: CycleCount::Random { min: 5, max: 3 }, ..Default::default() };
        assert!(bad.validate().is_err());
        let bad = AnimationProfile { min_delay_ms: 300, ..Default::default() };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn path_rejects_duplicates() {
        assert!(AnimationPath::new(vec![0, 1, 1]).is_err());
        assert!(AnimationPath::new(vec![]).is_err());
        assert_eq!(AnimationPath::ring_3x3().position(3), Some(7));
    }

    #[test]
    fn cycle_count_is_bounded() {
        let huge = AnimationProfile { cycles: CycleCount::Fixed { count: u32::MAX / 4 }, ..Default::default() };
        assert!(matches!(huge.validate(), Err(DrawError::InvalidConfig(_))));
        let huge = AnimationProfile { cycles: CycleCount::Random { min: 1, max: u32::MAX }, ..Default::default() };
        assert!(huge.validate().is_err());
        let at_limit = AnimationProfile { cycles: CycleCount::Fixed { count: MAX_CYCLES }, ..Default::default() };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn oversized_run_is_refused_not_panicking() {
        let profile = AnimationProfile { cycles: CycleCount::Fixed { count: u32::MAX / 4 }, ..Default::default() };
        let mut animator = Animator::new(AnimationPath::ring_3x3(), profile);
        let mut rng = DrawRng::new(1, 1);
        assert!(matches!(animator.start(3, &mut rng), Err(DrawError::InvalidConfig(_))));
        assert!(!animator.is_running());
        assert_eq!(animator.highlighted(), None);
    }
}
