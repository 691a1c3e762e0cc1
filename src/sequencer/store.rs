// Pattern store - Ordered timeline of sections plus the active pointer
// Every mutator keeps pattern lengths and the active index consistent

use super::error::{SequencerError, SequencerResult};
use super::pattern::Instrument;
use super::section::{Direction, Section, SectionId};
use super::timeline::TimeSignature;

/// Default upper bound for a section's bar count
pub const DEFAULT_MAX_MEASURES: u32 = 128;

/// Owner of the song timeline
///
/// The active index is renormalized after every structural edit: cleared when
/// the timeline empties, clamped to the last section otherwise. The scheduler
/// relies on this whenever it looks the active section up.
#[derive(Debug, Clone)]
pub struct PatternStore {
    sections: Vec<Section>,
    active: Option<usize>,
    max_measures: u32,
}

impl PatternStore {
    /// Create an empty store with the default measure range [1, 128]
    pub fn new() -> Self {
        Self::with_max_measures(DEFAULT_MAX_MEASURES)
    }

    /// Create an empty store with measure counts clamped to [1, max_measures]
    pub fn with_max_measures(max_measures: u32) -> Self {
        Self {
            sections: Vec::new(),
            active: None,
            max_measures: max_measures.max(1),
        }
    }

    pub fn max_measures(&self) -> u32 {
        self.max_measures
    }

    /// Number of sections in the timeline
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// All sections in timeline order
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Section at `index`
    pub fn section(&self, index: usize) -> SequencerResult<&Section> {
        self.sections
            .get(index)
            .ok_or(SequencerError::SectionOutOfRange {
                index,
                len: self.sections.len(),
            })
    }

    /// Section by stable ID, wherever it currently sits
    pub fn section_by_id(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id() == id)
    }

    /// Current timeline index of a section
    pub fn index_of(&self, id: SectionId) -> Option<usize> {
        self.sections.iter().position(|s| s.id() == id)
    }

    /// Clamp a requested bar count into [1, max_measures]
    pub fn clamp_measures(&self, measure_count: u32) -> u32 {
        measure_count.clamp(1, self.max_measures)
    }

    /// Append a zero-filled section and return its index
    ///
    /// The bar count is clamped, so this never fails.
    pub fn append_section(
        &mut self,
        name: impl Into<String>,
        measure_count: u32,
        time_signature: TimeSignature,
    ) -> usize {
        let measure_count = self.clamp_measures(measure_count);
        self.sections
            .push(Section::new(name.into(), measure_count, time_signature));
        self.sections.len() - 1
    }

    /// Change a section's bar count (clamped); returns the new total step count
    pub fn resize(&mut self, index: usize, measure_count: u32) -> SequencerResult<usize> {
        let measure_count = self.clamp_measures(measure_count);
        let section = self.section_mut(index)?;
        if section.measure_count() != measure_count {
            section.set_measure_count(measure_count);
        }
        Ok(section.total_steps())
    }

    /// Change a section's meter; returns the new total step count
    pub fn set_time_signature(
        &mut self,
        index: usize,
        time_signature: TimeSignature,
    ) -> SequencerResult<usize> {
        let section = self.section_mut(index)?;
        if section.time_signature() != time_signature {
            section.set_time_signature(time_signature);
        }
        Ok(section.total_steps())
    }

    /// Flip one step; returns the new value
    pub fn toggle_step(
        &mut self,
        index: usize,
        instrument: Instrument,
        step: usize,
    ) -> SequencerResult<bool> {
        let bit = self.step_mut(index, instrument, step)?;
        *bit = !*bit;
        Ok(*bit)
    }

    /// Set one step to an explicit value
    pub fn set_step(
        &mut self,
        index: usize,
        instrument: Instrument,
        step: usize,
        on: bool,
    ) -> SequencerResult<()> {
        *self.step_mut(index, instrument, step)? = on;
        Ok(())
    }

    /// Clear every step of a section
    pub fn clear_pattern(&mut self, index: usize) -> SequencerResult<()> {
        self.section_mut(index)?.pattern_mut().clear();
        Ok(())
    }

    /// Swap a section with its neighbour; returns its new index
    ///
    /// The active pointer follows the section it designated before the move.
    pub fn move_section(&mut self, index: usize, direction: Direction) -> SequencerResult<usize> {
        let len = self.sections.len();
        if index >= len {
            return Err(SequencerError::SectionOutOfRange { index, len });
        }
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => Some(index + 1).filter(|&t| t < len),
        }
        .ok_or(SequencerError::MoveOutOfRange { index, direction })?;

        self.sections.swap(index, target);
        self.active = match self.active {
            Some(a) if a == index => Some(target),
            Some(a) if a == target => Some(index),
            other => other,
        };
        self.normalize_active();
        Ok(target)
    }

    /// Remove a section and return it
    ///
    /// Deleting the active section clears the active pointer; deleting an
    /// earlier section shifts it so it keeps designating the same section.
    pub fn delete_section(&mut self, index: usize) -> SequencerResult<Section> {
        let len = self.sections.len();
        if index >= len {
            return Err(SequencerError::SectionOutOfRange { index, len });
        }
        let removed = self.sections.remove(index);
        self.active = match self.active {
            Some(a) if a == index => None,
            Some(a) if a > index => Some(a - 1),
            other => other,
        };
        self.normalize_active();
        Ok(removed)
    }

    /// Index of the active section
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// The active section, if any
    pub fn active_section(&self) -> Option<&Section> {
        self.active.and_then(|i| self.sections.get(i))
    }

    /// Select the active section (or none)
    pub fn set_active(&mut self, index: Option<usize>) -> SequencerResult<()> {
        if let Some(i) = index {
            self.section(i)?;
        }
        self.active = index;
        Ok(())
    }

    fn section_mut(&mut self, index: usize) -> SequencerResult<&mut Section> {
        let len = self.sections.len();
        self.sections
            .get_mut(index)
            .ok_or(SequencerError::SectionOutOfRange { index, len })
    }

    fn step_mut(
        &mut self,
        index: usize,
        instrument: Instrument,
        step: usize,
    ) -> SequencerResult<&mut bool> {
        let section = self.section_mut(index)?;
        let total = section.total_steps();
        section
            .pattern_mut()
            .step_mut(instrument, step)
            .ok_or(SequencerError::StepOutOfRange { step, total })
    }

    fn normalize_active(&mut self) {
        self.active = match (self.active, self.sections.len()) {
            (_, 0) => None,
            (Some(a), len) if a >= len => Some(len - 1),
            (active, _) => active,
        };
    }
}

impl Default for PatternStore {
    fn default() -> Self {
        Self::new()
    }
}
