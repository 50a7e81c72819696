//! Noir virtual machine
//!
//! Holds the interpreter state for one compile: the cursor, the pitch and
//! duration registers, the section and base-time registers, the base layer,
//! the immediate articulation register, the grace-note counters, and the four
//! interpreter stacks.  Operations either update this state or emit events
//! into the buffer.

use super::event::EventBuffer;
use super::pitch::PitchSet;
use crate::error::ErrorKind;
use crate::nmf::data::NmfData;

/// Maximum depth of each interpreter stack.
pub const MAX_STACK: usize = 1024;

/// Maximum one-indexed layer number.
pub const MAX_LAYER: i32 = 65536;

/// Maximum cue number.
pub const MAX_CUE: i32 = 0x3dffff;

/// A section/layer pair.  Layers are stored zero-indexed.
#[derive(Debug, Clone, Copy)]
struct LayerReg {
    sect: u16,
    layer_i: u16,
}

/// Virtual machine state for one compile.
#[derive(Debug)]
pub struct Vm {
    /// Current time offset in quanta.
    cursor: i32,
    /// Last pitch set seen, after transposition.  Undefined initially.
    pitch_reg: Option<PitchSet>,
    /// Last duration seen; zero denotes a grace note.  Undefined initially.
    dur_reg: Option<i32>,
    /// Current section number.
    sect: u16,
    /// Cursor value at the start of the current section.
    baset: i32,
    /// Layer used when the layer stack is empty.
    base_layer: LayerReg,
    /// One-shot articulation override.
    imm_art: Option<u16>,
    /// Grace notes emitted since the current run started.
    grace_count: i32,
    /// Position within the current grace run.
    grace_offset: i32,
    loc_stack: Vec<i32>,
    trans_stack: Vec<i32>,
    layer_stack: Vec<LayerReg>,
    art_stack: Vec<u16>,
    events: EventBuffer,
}

impl Vm {
    pub fn new() -> Self {
        Self {
            cursor: 0,
            pitch_reg: None,
            dur_reg: None,
            sect: 0,
            baset: 0,
            base_layer: LayerReg { sect: 0, layer_i: 0 },
            imm_art: None,
            grace_count: 0,
            grace_offset: 0,
            loc_stack: Vec::new(),
            trans_stack: Vec::new(),
            layer_stack: Vec::new(),
            art_stack: Vec::new(),
            events: EventBuffer::new(),
        }
    }

    /// Report a pitch set from the input.  The current transposition is
    /// applied to a copy, the result becomes the pitch register, and repeat
    /// semantics run once.
    pub fn pitch_set(&mut self, ps: PitchSet) -> Result<(), ErrorKind> {
        let mut ps = ps;
        let trans = self.trans_stack.last().copied().unwrap_or(0);
        if !ps.transpose(trans) {
            return Err(ErrorKind::TransRng);
        }
        self.pitch_reg = Some(ps);
        self.repeat()
    }

    /// Report a duration from the input, in quanta; zero means grace note.
    ///
    /// Moving off a grace duration flushes the pending grace run before the
    /// register changes.
    pub fn duration(&mut self, q: i32) -> Result<(), ErrorKind> {
        assert!(q >= 0);
        if self.dur_reg == Some(0) && q != 0 {
            self.grace_flush();
        }
        self.dur_reg = Some(q);
        Ok(())
    }

    /// The repeat operation: emit one event per pitch in the pitch register
    /// at the cursor, then advance the cursor by the effective duration.
    pub fn repeat(&mut self) -> Result<(), ErrorKind> {
        let ps = self.pitch_reg.ok_or(ErrorKind::NoPitch)?;
        let dur = self.dur_reg.ok_or(ErrorKind::NoDur)?;

        if dur == 0 {
            if self.grace_offset == i32::MAX {
                return Err(ErrorKind::HugeGrace);
            }
            self.grace_offset += 1;
        }

        // Within a grace run, events carry their provisional offset from the
        // start of the run; the flush rewrites them once the run ends.
        let durval = if self.grace_offset > 0 {
            -self.grace_offset
        } else {
            dur
        };

        let art = match self.imm_art.take() {
            Some(art) => art,
            None => self.art_stack.last().copied().unwrap_or(0),
        };

        let layer = self
            .layer_stack
            .last()
            .copied()
            .unwrap_or(self.base_layer);

        for pitch in ps.iter() {
            self.events
                .note(self.cursor, durval, pitch, art, layer.sect, layer.layer_i)?;
            if durval < 0 {
                if self.grace_count == i32::MAX {
                    return Err(ErrorKind::HugeGrace);
                }
                self.grace_count += 1;
            }
        }

        if durval > 0 {
            self.cursor = self
                .cursor
                .checked_add(durval)
                .ok_or(ErrorKind::LongPiece)?;
        }

        Ok(())
    }

    /// Run the repeat operation `count` times.
    pub fn multiple(&mut self, count: i32) -> Result<(), ErrorKind> {
        if count < 1 {
            return Err(ErrorKind::MultCount);
        }
        for _ in 0..count {
            self.repeat()?;
        }
        Ok(())
    }

    /// Begin a new section at the cursor.
    pub fn section(&mut self) -> Result<(), ErrorKind> {
        self.require_clean()?;
        if self.sect as usize >= crate::nmf::data::MAX_SECTIONS - 1 {
            return Err(ErrorKind::ManySect);
        }
        self.sect += 1;
        self.events.section(self.cursor)?;
        self.reset_current();
        self.baset = self.cursor;
        self.base_layer = LayerReg {
            sect: self.sect,
            layer_i: 0,
        };
        Ok(())
    }

    /// Rewind the cursor to the start of the current section.
    pub fn rewind(&mut self) -> Result<(), ErrorKind> {
        self.require_clean()?;
        self.reset_current();
        self.cursor = self.baset;
        self.base_layer.layer_i = 0;
        Ok(())
    }

    /// Push the cursor onto the location stack.
    pub fn push_loc(&mut self) -> Result<(), ErrorKind> {
        push(&mut self.loc_stack, self.cursor)
    }

    /// Return the cursor to the bookmark on top of the location stack.
    pub fn return_loc(&mut self) -> Result<(), ErrorKind> {
        if self.imm_art.is_some() {
            return Err(ErrorKind::DangleArt);
        }
        let loc = *self.loc_stack.last().ok_or(ErrorKind::NoLoc)?;
        self.reset_current();
        self.cursor = loc;
        Ok(())
    }

    pub fn pop_loc(&mut self) -> Result<(), ErrorKind> {
        pop(&mut self.loc_stack)
    }

    /// Push a transposition, cumulative with the current one.
    pub fn push_trans(&mut self, semitones: i32) -> Result<(), ErrorKind> {
        let new = match self.trans_stack.last() {
            Some(&top) => {
                let sum = top as i64 + semitones as i64;
                if sum < i32::MIN as i64 || sum > i32::MAX as i64 {
                    return Err(ErrorKind::HugeTrans);
                }
                sum as i32
            }
            None => semitones,
        };
        push(&mut self.trans_stack, new)
    }

    pub fn pop_trans(&mut self) -> Result<(), ErrorKind> {
        pop(&mut self.trans_stack)
    }

    /// Set the one-shot articulation register.
    pub fn imm_art(&mut self, art: u16) -> Result<(), ErrorKind> {
        self.imm_art = Some(art);
        Ok(())
    }

    pub fn push_art(&mut self, art: u16) -> Result<(), ErrorKind> {
        push(&mut self.art_stack, art)
    }

    pub fn pop_art(&mut self) -> Result<(), ErrorKind> {
        pop(&mut self.art_stack)
    }

    /// Change the layer used when the layer stack is empty.  `layer` is
    /// one-indexed.
    pub fn set_base_layer(&mut self, layer: i32) -> Result<(), ErrorKind> {
        if !(1..=MAX_LAYER).contains(&layer) {
            return Err(ErrorKind::BadLayer);
        }
        self.base_layer.layer_i = (layer - 1) as u16;
        Ok(())
    }

    /// Push a layer in the current section.  `layer` is one-indexed.
    pub fn push_layer(&mut self, layer: i32) -> Result<(), ErrorKind> {
        if !(1..=MAX_LAYER).contains(&layer) {
            return Err(ErrorKind::BadLayer);
        }
        push(
            &mut self.layer_stack,
            LayerReg {
                sect: self.sect,
                layer_i: (layer - 1) as u16,
            },
        )
    }

    pub fn pop_layer(&mut self) -> Result<(), ErrorKind> {
        pop(&mut self.layer_stack)
    }

    /// Emit a cue event at the cursor.  Any pending grace run is flushed
    /// first.
    pub fn cue(&mut self, cue_num: i32) -> Result<(), ErrorKind> {
        assert!((0..=MAX_CUE).contains(&cue_num));
        self.grace_flush();
        self.events.cue(self.cursor, self.sect, cue_num)
    }

    /// End of input: all stacks and the immediate articulation register must
    /// be clear, and any pending grace run is flushed.
    pub fn eof(&mut self) -> Result<(), ErrorKind> {
        self.require_clean()?;
        self.grace_flush();
        Ok(())
    }

    /// Surrender the collected events.
    pub fn into_data(self) -> NmfData {
        self.events.into_data()
    }

    /// Check that no stack holds values and no articulation is pending.
    fn require_clean(&self) -> Result<(), ErrorKind> {
        if !self.loc_stack.is_empty()
            || !self.trans_stack.is_empty()
            || !self.layer_stack.is_empty()
            || !self.art_stack.is_empty()
        {
            return Err(ErrorKind::Linger);
        }
        if self.imm_art.is_some() {
            return Err(ErrorKind::DangleArt);
        }
        Ok(())
    }

    /// Clear the pitch and duration registers, flushing any grace run.
    fn reset_current(&mut self) {
        self.grace_flush();
        self.pitch_reg = None;
        self.dur_reg = None;
    }

    /// Rewrite the pending grace run so its offsets read chronologically,
    /// then clear the grace counters.
    fn grace_flush(&mut self) {
        if self.grace_count > 0 {
            self.events.flip(self.grace_count, self.grace_offset);
        }
        self.grace_count = 0;
        self.grace_offset = 0;
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

fn push<T>(stack: &mut Vec<T>, value: T) -> Result<(), ErrorKind> {
    if stack.len() >= MAX_STACK {
        return Err(ErrorKind::StackFull);
    }
    stack.push(value);
    Ok(())
}

fn pop<T>(stack: &mut Vec<T>) -> Result<(), ErrorKind> {
    if stack.pop().is_none() {
        return Err(ErrorKind::Underflow);
    }
    Ok(())
}
