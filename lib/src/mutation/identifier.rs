use super::Mutator;
use crate::jvm::BinaryName;
use std::fmt;

/// Method in which a mutation happens
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodLocation {
    pub class: BinaryName,
    pub method: String,
    pub descriptor: String,
}

impl fmt::Display for MethodLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}{}", self.class, self.method, self.descriptor)
    }
}

/// Stable identity of one candidate mutation
///
/// Scanning the same class bytes with the same rules always produces the same identifiers in the
/// same order, which is what lets a caller enumerate candidates first and apply one of them later.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MutationIdentifier {
    pub location: MethodLocation,
    pub mutator: Mutator,

    /// Disambiguates several matches of the same rule in the same method (counts from 0)
    pub ordinal: u32,
}

impl fmt::Display for MutationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} #{}", self.location, self.mutator, self.ordinal)
    }
}

/// Candidate mutation found while scanning a class
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub id: MutationIdentifier,
    pub description: String,

    /// Source line of the instruction, when the class has line numbers
    pub line: Option<u16>,
}

impl fmt::Display for MutationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.description)?;
        if let Some(line) = self.line {
            write!(f, " (line {})", line)?;
        }
        Ok(())
    }
}
