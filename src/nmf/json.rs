//! JSON serialization types for NMF data

use super::data::{Basis, NmfData, Note};
use serde::Serialize;

/// Top-level JSON structure for an NMF file
#[derive(Debug, Clone, Serialize)]
pub struct NmfJson {
    /// Quantum basis as a string (e.g., "q96")
    pub basis: String,
    /// Section starting offsets in quanta
    pub sections: Vec<i32>,
    /// Note and cue records, in table order
    pub notes: Vec<NoteJson>,
}

/// JSON representation of one note record
#[derive(Debug, Clone, Serialize)]
pub struct NoteJson {
    /// Time offset in quanta
    pub t: i32,
    /// Duration in quanta (negative = grace offset, zero = cue)
    pub dur: i32,
    /// Semitones from middle C (omitted for cues)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<i16>,
    /// Articulation index
    pub art: u16,
    /// Section index
    pub sect: u16,
    /// One less than the layer number
    pub layer_i: u16,
    /// Decoded cue number (cues only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cue: Option<u32>,
}

impl NmfJson {
    pub fn new(data: &NmfData) -> Self {
        Self {
            basis: basis_name(data.basis()).to_string(),
            sections: data.offsets().to_vec(),
            notes: data.notes().iter().map(NoteJson::new).collect(),
        }
    }
}

impl NoteJson {
    fn new(note: &Note) -> Self {
        Self {
            t: note.t,
            dur: note.dur,
            pitch: if note.is_cue() { None } else { Some(note.pitch) },
            art: note.art,
            sect: note.sect,
            layer_i: note.layer_i,
            cue: if note.is_cue() {
                Some(((note.art as u32) << 16) | note.layer_i as u32)
            } else {
                None
            },
        }
    }
}

fn basis_name(basis: Basis) -> &'static str {
    match basis {
        Basis::Q96 => "q96",
        Basis::Rate44100 => "44100hz",
        Basis::Rate48000 => "48000hz",
    }
}
