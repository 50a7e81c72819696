//! Event buffer
//!
//! Collects section offsets and note/cue events as the virtual machine emits
//! them.  Events are append-only; the one mutation allowed is the grace-run
//! flip, which rewrites the durations of the most recent events once the
//! length of a grace sequence is known.

use crate::error::ErrorKind;
use crate::nmf::data::{NmfData, Note, MAX_SECTIONS};

/// Ordered section table plus note list, backed by an NMF data object so the
/// format's field validation applies at the point of emission.
#[derive(Debug)]
pub struct EventBuffer {
    data: NmfData,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self {
            data: NmfData::new(),
        }
    }

    pub fn note_count(&self) -> usize {
        self.data.note_count()
    }

    pub fn section_count(&self) -> usize {
        self.data.section_count()
    }

    /// Begin a new section at the given offset.  Offsets must not decrease.
    pub fn section(&mut self, offset: i32) -> Result<(), ErrorKind> {
        if self.data.section_count() >= MAX_SECTIONS {
            return Err(ErrorKind::ManySect);
        }
        self.data.add_section(offset);
        Ok(())
    }

    /// Append a note event.  `dur` must be non-zero; zero durations are
    /// reserved for cues.
    pub fn note(
        &mut self,
        t: i32,
        dur: i32,
        pitch: i16,
        art: u16,
        sect: u16,
        layer_i: u16,
    ) -> Result<(), ErrorKind> {
        assert!(dur != 0);
        let appended = self.data.append_note(Note {
            t,
            dur,
            pitch,
            art,
            sect,
            layer_i,
        });
        if appended {
            Ok(())
        } else {
            Err(ErrorKind::ManyNotes)
        }
    }

    /// Append a cue event.  The cue number is split across the articulation
    /// field (high 16 bits) and the layer field (low 16 bits).
    pub fn cue(&mut self, t: i32, sect: u16, cue_num: i32) -> Result<(), ErrorKind> {
        assert!(cue_num >= 0);
        let appended = self.data.append_note(Note {
            t,
            dur: 0,
            pitch: 0,
            art: (cue_num >> 16) as u16,
            sect,
            layer_i: (cue_num & 0xffff) as u16,
        });
        if appended {
            Ok(())
        } else {
            Err(ErrorKind::ManyNotes)
        }
    }

    /// Flip the grace offsets of the last `count` events so the run reads in
    /// chronological order: an event recorded with offset -k becomes
    /// -((max_offs + 1) - k), putting the earliest grace note furthest from
    /// the beat.
    pub fn flip(&mut self, count: i32, max_offs: i32) {
        assert!(count >= 0 && max_offs >= 1);
        assert!(count as usize <= self.data.note_count());

        let total = self.data.note_count();
        for i in (total - count as usize)..total {
            let mut note = self.data.note(i);
            assert!(note.dur < 0);
            let flipped = (max_offs + 1) + note.dur;
            assert!(flipped >= 1);
            note.dur = -flipped;
            self.data.set_note(i, note);
        }
    }

    /// Hand the collected events to the codec.
    pub fn into_data(self) -> NmfData {
        self.data
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_reverses_grace_run() {
        let mut buf = EventBuffer::new();
        buf.note(0, -1, 0, 0, 0, 0).unwrap();
        buf.note(0, -2, 2, 0, 0, 0).unwrap();
        buf.note(0, -3, 4, 0, 0, 0).unwrap();
        buf.flip(3, 3);
        let data = buf.into_data();
        let durs: Vec<i32> = data.notes().iter().map(|n| n.dur).collect();
        assert_eq!(durs, vec![-3, -2, -1]);
    }

    #[test]
    fn test_flip_leaves_earlier_events_alone() {
        let mut buf = EventBuffer::new();
        buf.note(0, 96, 0, 0, 0, 0).unwrap();
        buf.note(96, -1, 2, 0, 0, 0).unwrap();
        buf.flip(1, 1);
        let data = buf.into_data();
        assert_eq!(data.note(0).dur, 96);
        assert_eq!(data.note(1).dur, -1);
    }

    #[test]
    fn test_cue_field_encoding() {
        let mut buf = EventBuffer::new();
        buf.cue(0, 0, 0x3dffff).unwrap();
        let data = buf.into_data();
        let cue = data.note(0);
        assert_eq!(cue.dur, 0);
        assert_eq!(cue.art, 0x3d);
        assert_eq!(cue.layer_i, 0xffff);
    }
}
