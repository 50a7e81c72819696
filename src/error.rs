use std::io;

/// The kind of a compile error.
///
/// Every way a compile can fail on user input maps to exactly one kind.
/// Violated internal invariants are not represented here; those panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("No notes were defined")]
    Empty,

    #[error("I/O error reading input")]
    IoRead,

    #[error("Input file includes nul byte")]
    NulChar,

    #[error("Invalid character in input")]
    BadChar,

    #[error("Too many lines in input text")]
    OverLine,

    #[error("Bad key operation token")]
    KeyToken,

    #[error("Token is too long")]
    LongToken,

    #[error("Bad parameter operation token")]
    ParamTk,

    #[error("Right closing ) or ] without opening symbol")]
    Right,

    #[error("Unclosed ( or [ group")]
    Unclosed,

    #[error("Too much nesting")]
    TooDeep,

    #[error("Grace note in rhythm group")]
    InGrace,

    #[error("Rhythm duration too long")]
    LongDur,

    #[error("Invalid duration")]
    BadDur,

    #[error("Invalid pitch")]
    BadPitch,

    #[error("Pitch out of range")]
    PitchR,

    #[error("Invalid operation")]
    BadOp,

    #[error("Attempted to pop an empty stack")]
    Underflow,

    #[error("Invalid layer index")]
    BadLayer,

    #[error("Too many elements on stack")]
    StackFull,

    #[error("Cumulative transposition value too large")]
    HugeTrans,

    #[error("Dangling immediate articulation")]
    DangleArt,

    #[error("Attempt to warp when location stack is empty")]
    NoLoc,

    #[error("Lingering values in interpreter stacks")]
    Linger,

    #[error("Too many sections")]
    ManySect,

    #[error("Invalid count for multiple operation")]
    MultCount,

    #[error("Transposed pitches out of range")]
    TransRng,

    #[error("Current pitch register undefined")]
    NoPitch,

    #[error("Current duration register undefined")]
    NoDur,

    #[error("Grace note sequence too long")]
    HugeGrace,

    #[error("Composition is too long")]
    LongPiece,

    #[error("Too many notes and/or cues")]
    ManyNotes,

    #[error("Cue number out of range")]
    CueNum,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Compile error tied to a source line.
    #[error("[Line {line}] {kind}")]
    Parse { line: i32, kind: ErrorKind },

    /// Compile error where no line number is meaningful.
    #[error("{kind}")]
    Compile { kind: ErrorKind },

    #[error("NMF format error: {0}")]
    NmfFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// The error kind, for compile errors.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Parse { kind, .. } | Error::Compile { kind } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
