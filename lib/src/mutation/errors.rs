use super::{MethodLocation, MutationIdentifier, Mutator};
use crate::jvm::{self, BinaryName};
use std::fmt;

#[derive(Debug)]
pub enum MutationError {
    /// Reading or writing the class failed
    Codec(jvm::Error),

    /// The byte source does not know about the class
    ClassUnavailable(BinaryName),

    /// Re-scanning the class never produced this identifier
    IdentifierNotFound(MutationIdentifier),

    /// A rule computed something that does not fit the instruction it matched
    StructuralInconsistency {
        location: MethodLocation,
        detail: String,
    },

    /// A rule registered twice for the same instruction
    DuplicateRegistration {
        location: MethodLocation,
        mutator: Mutator,
    },

    /// Candidate registered before any method was entered
    OutsideMethod(Mutator),

    /// Name that is neither a rule id nor a group of rules
    UnknownMutator(String),
}

impl From<jvm::Error> for MutationError {
    fn from(err: jvm::Error) -> MutationError {
        MutationError::Codec(err)
    }
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationError::Codec(err) => write!(f, "class codec error: {}", err),
            MutationError::ClassUnavailable(name) => write!(f, "class {} is unavailable", name),
            MutationError::IdentifierNotFound(id) => write!(f, "mutation {} not found", id),
            MutationError::StructuralInconsistency { location, detail } => {
                write!(f, "cannot rewrite {}: {}", location, detail)
            }
            MutationError::DuplicateRegistration { location, mutator } => write!(
                f,
                "{} registered twice for one instruction in {}",
                mutator, location
            ),
            MutationError::OutsideMethod(mutator) => {
                write!(f, "{} registered outside of a method", mutator)
            }
            MutationError::UnknownMutator(name) => write!(f, "unknown mutator {}", name),
        }
    }
}

impl std::error::Error for MutationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MutationError::Codec(err) => Some(err),
            _ => None,
        }
    }
}
