//! In-memory model of a Noir Music File

use std::cmp::Ordering;

/// Maximum number of sections in an NMF file.
pub const MAX_SECTIONS: usize = 65535;

/// Maximum number of note records in an NMF file.
pub const MAX_NOTES: usize = 1_048_576;

/// Pitch range, in semitones from middle C.
pub const MIN_PITCH: i16 = -39;
pub const MAX_PITCH: i16 = 48;

/// Maximum articulation index.
pub const MAX_ART: u16 = 61;

/// Quantum basis of an NMF file.
///
/// Time offsets and durations count quanta; the basis says how long one
/// quantum is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    /// 96 quanta per quarter note.
    Q96,
    /// 44,100 quanta per second.
    Rate44100,
    /// 48,000 quanta per second.
    Rate48000,
}

impl Basis {
    /// Decode the on-disk basis field.
    pub fn from_raw(raw: u16) -> Option<Basis> {
        match raw {
            0 => Some(Basis::Q96),
            1 => Some(Basis::Rate44100),
            2 => Some(Basis::Rate48000),
            _ => None,
        }
    }

    /// The on-disk basis field value.
    pub fn raw(self) -> u16 {
        match self {
            Basis::Q96 => 0,
            Basis::Rate44100 => 1,
            Basis::Rate48000 => 2,
        }
    }
}

/// One note record.
///
/// `dur > 0` is a measured duration in quanta.  `dur < 0` is a grace note
/// offset, where -1 is the grace note immediately before the beat, -2 the one
/// before that, and so on.  `dur == 0` is a cue; cues carry no pitch and
/// encode their cue number with the high 16 bits in `art` and the low 16 bits
/// in `layer_i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Note {
    /// Time offset in quanta from the start of the composition.
    pub t: i32,
    /// Duration in quanta, grace offset, or zero for a cue.
    pub dur: i32,
    /// Semitones from middle C, in [MIN_PITCH, MAX_PITCH].
    pub pitch: i16,
    /// Articulation index, in [0, MAX_ART].
    pub art: u16,
    /// Section index.
    pub sect: u16,
    /// One less than the layer number within the section.
    pub layer_i: u16,
}

impl Note {
    /// Whether this record is a cue marker rather than a note.
    pub fn is_cue(&self) -> bool {
        self.dur == 0
    }

    /// Whether this record is an unmeasured grace note.
    pub fn is_grace(&self) -> bool {
        self.dur < 0
    }
}

/// Canonical NMF note ordering: ascending time offset, grace notes before
/// anything else at the same offset, and grace notes among themselves in
/// sequential order (more negative offset first).  Non-grace records at the
/// same offset compare equal.
pub fn cmp_notes(a: &Note, b: &Note) -> Ordering {
    a.t.cmp(&b.t).then_with(|| match (a.dur < 0, b.dur < 0) {
        (true, true) => a.dur.cmp(&b.dur),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    })
}

/// Parsed or in-construction NMF data: a quantum basis, an ordered section
/// table, and a note table.
///
/// Section zero always exists with offset zero.  Mutators panic when handed
/// values that violate the format invariants and return `false` only when a
/// capacity limit is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NmfData {
    basis: Basis,
    sections: Vec<i32>,
    notes: Vec<Note>,
}

impl NmfData {
    /// Fresh data object: basis Q96, one section at offset zero, no notes.
    pub fn new() -> Self {
        Self {
            basis: Basis::Q96,
            sections: vec![0],
            notes: Vec::new(),
        }
    }

    pub(crate) fn from_parts(basis: Basis, sections: Vec<i32>, notes: Vec<Note>) -> Self {
        Self {
            basis,
            sections,
            notes,
        }
    }

    pub fn basis(&self) -> Basis {
        self.basis
    }

    /// Change the quantum basis.  Quanta values are not rescaled.
    pub fn set_basis(&mut self, basis: Basis) {
        self.basis = basis;
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Starting offset of the given section.  Panics if out of range.
    pub fn offset(&self, sect_i: usize) -> i32 {
        self.sections[sect_i]
    }

    /// The note at the given index.  Panics if out of range.
    pub fn note(&self, note_i: usize) -> Note {
        self.notes[note_i]
    }

    /// All notes, in table order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Section table.
    pub fn offsets(&self) -> &[i32] {
        &self.sections
    }

    /// Overwrite the note at the given index.  Panics if the index is out of
    /// range or the note violates the format invariants.
    pub fn set_note(&mut self, note_i: usize, note: Note) {
        assert!(note_i < self.notes.len());
        self.check_note(&note);
        self.notes[note_i] = note;
    }

    /// Append a section starting at `offset`.  Offsets must not decrease.
    ///
    /// Returns `false` when the section table is full.
    pub fn add_section(&mut self, offset: i32) -> bool {
        assert!(offset >= 0);
        assert!(offset >= *self.sections.last().unwrap());
        if self.sections.len() >= MAX_SECTIONS {
            return false;
        }
        self.sections.push(offset);
        true
    }

    /// Append a note record.  Returns `false` when the note table is full.
    pub fn append_note(&mut self, note: Note) -> bool {
        self.check_note(&note);
        if self.notes.len() >= MAX_NOTES {
            return false;
        }
        self.notes.push(note);
        true
    }

    /// Sort the note table into the canonical NMF ordering.
    pub fn sort(&mut self) {
        self.notes.sort_by(cmp_notes);
    }

    fn check_note(&self, note: &Note) {
        assert!(note.t >= 0);
        assert!(note.dur > i32::MIN);
        assert!((MIN_PITCH..=MAX_PITCH).contains(&note.pitch));
        assert!(note.art <= MAX_ART);
        assert!((note.sect as usize) < self.sections.len());
        assert!(note.t >= self.sections[note.sect as usize]);
    }
}

impl Default for NmfData {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(t: i32, dur: i32) -> Note {
        Note {
            t,
            dur,
            ..Note::default()
        }
    }

    #[test]
    fn test_new_data() {
        let d = NmfData::new();
        assert_eq!(d.basis(), Basis::Q96);
        assert_eq!(d.section_count(), 1);
        assert_eq!(d.offset(0), 0);
        assert_eq!(d.note_count(), 0);
    }

    #[test]
    fn test_sort_grace_before_beat() {
        let mut d = NmfData::new();
        d.append_note(note(0, 96));
        d.append_note(note(0, -1));
        d.append_note(note(0, -3));
        d.append_note(note(0, -2));
        d.sort();
        let durs: Vec<i32> = d.notes().iter().map(|n| n.dur).collect();
        assert_eq!(durs, vec![-3, -2, -1, 96]);
    }

    #[test]
    fn test_sort_by_time_first() {
        let mut d = NmfData::new();
        d.append_note(note(96, 48));
        d.append_note(note(0, 96));
        d.append_note(note(96, -1));
        d.sort();
        let keys: Vec<(i32, i32)> = d.notes().iter().map(|n| (n.t, n.dur)).collect();
        assert_eq!(keys, vec![(0, 96), (96, -1), (96, 48)]);
    }

    #[test]
    fn test_basis_raw_round_trip() {
        for basis in [Basis::Q96, Basis::Rate44100, Basis::Rate48000] {
            assert_eq!(Basis::from_raw(basis.raw()), Some(basis));
        }
        assert_eq!(Basis::from_raw(3), None);
    }

    #[test]
    #[should_panic]
    fn test_section_offsets_must_not_decrease() {
        let mut d = NmfData::new();
        d.add_section(96);
        d.add_section(48);
    }

    #[test]
    #[should_panic]
    fn test_note_before_section_start_rejected() {
        let mut d = NmfData::new();
        d.add_section(96);
        let mut n = note(0, 96);
        n.sect = 1;
        d.append_note(n);
    }
}
