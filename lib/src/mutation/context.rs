use super::{MethodLocation, MutationError, MutationIdentifier, MutationRecord, Mutator};
use std::collections::{HashMap, HashSet};

/// State of one scan over a class
///
/// Every candidate found during the scan is registered here and gets the next ordinal for its
/// method and rule. When a target is set, the rewriter asks the context whether a freshly
/// registered candidate is the one to apply.
#[derive(Debug)]
pub struct MutationContext {
    target: Option<MutationIdentifier>,
    ordinals: HashMap<(MethodLocation, Mutator), u32>,
    records: Vec<MutationRecord>,

    /// Method currently being traversed
    location: Option<MethodLocation>,

    /// Source line of the current instruction
    line: Option<u16>,

    /// Rules which already registered at the current instruction
    registered_here: HashSet<Mutator>,
}

impl MutationContext {
    pub fn new(target: Option<MutationIdentifier>) -> MutationContext {
        MutationContext {
            target,
            ordinals: HashMap::new(),
            records: vec![],
            location: None,
            line: None,
            registered_here: HashSet::new(),
        }
    }

    /// Start traversing a new method
    pub fn enter_method(&mut self, location: MethodLocation) {
        self.location = Some(location);
        self.line = None;
        self.registered_here.clear();
    }

    pub fn set_line(&mut self, line: u16) {
        self.line = Some(line);
    }

    /// Move on to the next instruction of the current method
    pub fn next_instruction(&mut self) {
        self.registered_here.clear();
    }

    /// Record a candidate at the current instruction and allocate its identifier
    pub fn register_candidate(
        &mut self,
        mutator: Mutator,
        description: impl Into<String>,
    ) -> Result<MutationIdentifier, MutationError> {
        let location = match &self.location {
            Some(location) => location.clone(),
            None => return Err(MutationError::OutsideMethod(mutator)),
        };
        if !self.registered_here.insert(mutator) {
            return Err(MutationError::DuplicateRegistration { location, mutator });
        }

        let counter = self
            .ordinals
            .entry((location.clone(), mutator))
            .or_insert(0);
        let id = MutationIdentifier {
            location,
            mutator,
            ordinal: *counter,
        };
        *counter += 1;

        self.records.push(MutationRecord {
            id: id.clone(),
            description: description.into(),
            line: self.line,
        });
        Ok(id)
    }

    /// Is this the mutation the scan is looking for?
    pub fn should_apply(&self, id: &MutationIdentifier) -> bool {
        self.target.as_ref() == Some(id)
    }

    pub fn records_so_far(&self) -> &[MutationRecord] {
        &self.records
    }

    /// Record of the target, once the scan has passed it
    pub fn target_record(&self) -> Option<&MutationRecord> {
        let target = self.target.as_ref()?;
        self.records.iter().find(|record| &record.id == target)
    }

    pub fn into_records(self) -> Vec<MutationRecord> {
        self.records
    }
}
