// Section - Named block of bars with its own meter and drum pattern

use super::pattern::{DrumPattern, Instrument};
use super::timeline::{StepGrid, TimeSignature};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identity of a section, unaffected by reordering
pub type SectionId = u64;

/// Global section ID generator (atomic for thread-safety)
static NEXT_SECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a unique section ID
pub fn generate_section_id() -> SectionId {
    NEXT_SECTION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Direction of a timeline move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

/// A song section (verse, chorus, ...)
///
/// The step grid and total step count are cached and recomputed on every
/// structural edit, so the pattern length always equals `total_steps()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    id: SectionId,
    pub name: String,
    measure_count: u32,
    time_signature: TimeSignature,
    grid: StepGrid,
    pattern: DrumPattern,
}

impl Section {
    /// Create a section with a zero-filled pattern
    ///
    /// `measure_count` must already be clamped by the caller (at least 1).
    pub(crate) fn new(name: String, measure_count: u32, time_signature: TimeSignature) -> Self {
        debug_assert!(measure_count >= 1);
        let grid = time_signature.grid();
        Self {
            id: generate_section_id(),
            name,
            measure_count,
            time_signature,
            grid,
            pattern: DrumPattern::new(grid.total_steps(measure_count)),
        }
    }

    pub fn id(&self) -> SectionId {
        self.id
    }

    pub fn measure_count(&self) -> u32 {
        self.measure_count
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn grid(&self) -> StepGrid {
        self.grid
    }

    pub fn steps_per_beat(&self) -> usize {
        self.grid.steps_per_beat
    }

    pub fn steps_per_measure(&self) -> usize {
        self.grid.steps_per_measure
    }

    /// Length of every instrument sequence
    pub fn total_steps(&self) -> usize {
        self.pattern.len()
    }

    pub fn pattern(&self) -> &DrumPattern {
        &self.pattern
    }

    pub(crate) fn set_measure_count(&mut self, measure_count: u32) {
        self.measure_count = measure_count;
        self.refresh_grid();
    }

    pub(crate) fn set_time_signature(&mut self, time_signature: TimeSignature) {
        self.time_signature = time_signature;
        self.refresh_grid();
    }

    pub(crate) fn pattern_mut(&mut self) -> &mut DrumPattern {
        &mut self.pattern
    }

    /// Whether `instrument` fires on `step`
    pub fn is_on(&self, instrument: Instrument, step: usize) -> bool {
        self.pattern.is_on(instrument, step)
    }

    fn refresh_grid(&mut self) {
        self.grid = self.time_signature.grid();
        self.pattern.resize(self.grid.total_steps(self.measure_count));
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} bars, {})",
            self.name, self.measure_count, self.time_signature
        )
    }
}
