use super::class_file::{Constant, ConstantIndex};
use super::code::Label;
use super::verifier::VerificationType;
use super::{BinaryName, RefType};
use crate::util::Offset;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    /// Class bytes do not follow the class file format
    MalformedClass(String),

    ConstantPoolOverflow {
        constant: Constant,
        offset: usize,
    },

    /// Constant index points nowhere (or into the middle of a wide constant)
    MissingConstant(ConstantIndex),

    /// Constant exists, but is the wrong kind of constant
    UnexpectedConstant {
        index: ConstantIndex,
        expected: &'static str,
    },

    BadOpcode {
        opcode: u8,
        offset: Offset,
    },
    BadDescriptor(String),

    MethodCodeOverflow(Offset),
    MethodCodeMaxStackOverflow(Offset),
    MethodCodeMaxLocalsOverflow(Offset),

    /// Error trying to verify
    VerifierError {
        instruction: String,
        kind: VerifierErrorKind,
    },

    /// A label is reached with two frames that cannot be merged
    ConflictingFrames(Option<Label>, String, String),

    /// A branch or table entry refers to a label that is never placed
    UnknownLabel(Label),

    /// The class hierarchy could not be resolved for this class
    MissingClass(BinaryName),
}

#[derive(Debug)]
pub enum VerifierErrorKind {
    EmptyStack,
    InvalidWidth(usize),
    NotArrayType,
    InvalidIndex,
    InvalidType,
    MissingConstant(ConstantIndex),
    NotLoadableConstant(Constant),
    IncompatibleTypes(
        VerificationType<RefType<BinaryName>, Label>,
        VerificationType<RefType<BinaryName>, Label>,
    ),
    BadDescriptor(String),

    /// `new` instruction without a label right before it
    UnlabelledNew,

    /// `jsr` and `ret` are not supported by the frame analysis
    Subroutine,

    /// Execution can run past the last instruction
    FallsOffEnd,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "i/o error: {}", err),
            Error::MalformedClass(msg) => write!(f, "malformed class: {}", msg),
            Error::ConstantPoolOverflow { constant, offset } => write!(
                f,
                "constant pool overflow adding {:?} at offset {}",
                constant, offset
            ),
            Error::MissingConstant(index) => write!(f, "missing constant #{}", index.0),
            Error::UnexpectedConstant { index, expected } => {
                write!(f, "constant #{} should be {}", index.0, expected)
            }
            Error::BadOpcode { opcode, offset } => {
                write!(f, "bad opcode 0x{:02x} at offset {}", opcode, offset.0)
            }
            Error::BadDescriptor(msg) => write!(f, "bad descriptor: {}", msg),
            Error::MethodCodeOverflow(offset) => {
                write!(f, "method code too long ({} bytes)", offset.0)
            }
            Error::MethodCodeMaxStackOverflow(offset) => {
                write!(f, "max stack too large ({})", offset.0)
            }
            Error::MethodCodeMaxLocalsOverflow(offset) => {
                write!(f, "max locals too large ({})", offset.0)
            }
            Error::VerifierError { instruction, kind } => {
                write!(f, "cannot verify {}: {:?}", instruction, kind)
            }
            Error::ConflictingFrames(label, frame1, frame2) => write!(
                f,
                "conflicting frames at {:?}: {} vs. {}",
                label, frame1, frame2
            ),
            Error::UnknownLabel(label) => write!(f, "label {:?} is never placed", label),
            Error::MissingClass(name) => write!(f, "cannot resolve class {}", name),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}
