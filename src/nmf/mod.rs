//! Noir Music File (NMF) codec
//!
//! Binary layout: two 32-bit signatures, a 16-bit quantum basis, a 16-bit
//! section count, a 32-bit note count, the section offset table, then one
//! 16-byte record per note.  All integers are big-endian; signed fields are
//! stored biased with raw zero reserved.

pub mod data;
pub mod json;
pub mod reader;
pub mod writer;

pub use data::{Basis, NmfData, Note};
pub use json::NmfJson;
pub use reader::NmfReader;
pub use writer::NmfWriter;

/// Primary and secondary file signatures.
pub const SIG_PRIMARY: i32 = 1_928_196_216;
pub const SIG_SECONDARY: i32 = 1_313_818_926;

/// Biases for the signed integer encodings.
pub(crate) const BIAS32: i64 = 2_147_483_648;
pub(crate) const BIAS16: i32 = 32_768;
