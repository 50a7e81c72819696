//! Noir compiler front end
//!
//! Pipeline: bytes -> lexer -> tokens -> entity interpreter -> virtual
//! machine -> event buffer -> NMF codec.  The whole event list is
//! materialised and sorted before anything is written.

pub mod entity;
pub mod event;
pub mod lexer;
pub mod pitch;
pub mod vm;

pub use lexer::{Lexer, Token, TokenKind};
pub use pitch::PitchSet;
pub use vm::Vm;

use crate::error::{Error, ErrorKind, Result};
use crate::nmf::NmfWriter;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Compiler for Noir notation.
#[derive(Debug, Clone, Copy)]
pub struct Compiler;

impl Compiler {
    pub fn new() -> Self {
        Compiler
    }

    /// Compile Noir source read from `input` into an NMF file on `output`.
    ///
    /// The input should be buffered; bytes are consumed one at a time.
    pub fn compile<R: Read, W: Write>(&mut self, input: R, output: W) -> Result<()> {
        let mut lexer = Lexer::new(input);
        let mut vm = Vm::new();
        entity::run(&mut lexer, &mut vm)?;

        let mut data = vm.into_data();
        if data.note_count() == 0 {
            return Err(Error::Compile {
                kind: ErrorKind::Empty,
            });
        }
        data.sort();

        NmfWriter::new(BufWriter::new(output)).serialize(&data)
    }

    /// Compile a Noir source file into an NMF file.
    pub fn compile_file(&mut self, input: &Path, output: &Path) -> Result<()> {
        let reader = BufReader::new(File::open(input)?);
        let writer = File::create(output)?;
        self.compile(reader, writer)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
