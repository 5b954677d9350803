use super::filter::exclusion_reason;
use super::{
    ClassInfo, MethodFilter, MethodInfo, MethodRewriter, MutationContext, MutationError,
    MutationIdentifier, MutationRecord, Settings,
};
use crate::jvm::class_file::{ClassFile, Method};
use crate::jvm::code::MethodBody;
use crate::jvm::hierarchy::{CachingFrameSupport, HierarchyEntry, IncludingClass};
use crate::jvm::verifier::MethodContext;
use crate::jvm::BinaryName;
use crate::source::ClassByteSource;
use std::rc::Rc;

/// Class with exactly one mutation applied
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mutant {
    pub record: MutationRecord,
    pub bytes: Vec<u8>,
}

/// Finds and applies mutations in classes
///
/// Mutating happens in two passes. [`Mutater::enumerate`] scans a class and returns every
/// candidate mutation. Later, [`Mutater::apply`] re-scans the same class bytes looking for one
/// of those candidates and produces the mutated class. Identifiers are stable across scans, so
/// the two passes need not share any state.
///
/// Only the method containing the mutation is re-assembled. The `Code` attributes of all other
/// methods are copied through untouched.
///
/// Calls for different classes can run on separate threads sharing one `Mutater` (when the byte
/// source is `Sync`). They share only the cache of superclass lookups.
pub struct Mutater<S> {
    /// Class bytes for [`Mutater::find_mutations`] and superclass lookups when computing frames
    hierarchy: CachingFrameSupport<S>,
    settings: Settings,
    filter: MethodFilter,
}

impl<S: ClassByteSource> Mutater<S> {
    pub fn new(source: S, settings: Settings, filter: MethodFilter) -> Mutater<S> {
        Mutater {
            hierarchy: CachingFrameSupport::new(source),
            settings,
            filter,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// List every candidate mutation in a class, in the order they are encountered
    pub fn enumerate(&self, bytes: &[u8]) -> Result<Vec<MutationRecord>, MutationError> {
        let class = ClassFile::parse(bytes)?;
        let info = Rc::new(ClassInfo::from_class(&class)?);
        let mut context = MutationContext::new(None);

        for method in &class.methods {
            let method_info = MethodInfo::from_method(info.clone(), method, &class)?;
            if let Some(reason) = exclusion_reason(&method_info, &self.filter) {
                log::debug!("Skipping {} ({})", method_info.description(), reason);
                continue;
            }
            let mut body = match decode_body(method, &class)? {
                Some(body) => body,
                None => continue,
            };
            let location = method_info.location();
            let rewriter = MethodRewriter {
                mutators: &self.settings.mutators,
                constants: &class.constants,
                location: &location,
            };
            if let Err(err) = rewriter.rewrite(&mut body, &mut context) {
                log::error!("Failed to scan {}: {}", location, err);
                return Err(err);
            }
        }

        let records = context.into_records();
        log::info!("Found {} mutations in {}", records.len(), info.name);
        Ok(records)
    }

    /// Produce the class with the identified mutation applied
    pub fn apply(&self, bytes: &[u8], id: &MutationIdentifier) -> Result<Mutant, MutationError> {
        let not_found = || MutationError::IdentifierNotFound(id.clone());

        let mut class = ClassFile::parse(bytes)?;
        let info = Rc::new(ClassInfo::from_class(&class)?);
        if info.name != id.location.class {
            return Err(not_found());
        }

        // Find the method, skipping any the scan would have skipped
        let mut found = None;
        for (index, method) in class.methods.iter().enumerate() {
            let method_info = MethodInfo::from_method(info.clone(), method, &class)?;
            if method_info.name == id.location.method
                && method_info.descriptor == id.location.descriptor
                && exclusion_reason(&method_info, &self.filter).is_none()
            {
                found = Some((index, method_info));
                break;
            }
        }
        let (index, method_info) = found.ok_or_else(not_found)?;
        let mut body = decode_body(&class.methods[index], &class)?.ok_or_else(not_found)?;

        let mut context = MutationContext::new(Some(id.clone()));
        let mutators = [id.mutator];
        let rewriter = MethodRewriter {
            mutators: &mutators,
            constants: &class.constants,
            location: &id.location,
        };
        if !rewriter.rewrite(&mut body, &mut context)? {
            return Err(not_found());
        }
        let record = context.target_record().cloned().ok_or_else(not_found)?;

        let hierarchy = IncludingClass {
            inner: &self.hierarchy,
            entry: HierarchyEntry::from_class(&class)?,
        };
        let method_context = MethodContext {
            class: &info.name,
            name: &method_info.name,
            descriptor: &method_info.descriptor,
            is_static: method_info.is_static(),
        };
        let code = body
            .assemble(&method_context, &mut class.constants, &hierarchy, class.version)
            .map_err(|err| {
                log::error!("Failed to assemble {}: {}", record.id, err);
                MutationError::from(err)
            })?;
        class.replace_method_code(index, &code)?;
        let bytes = class.to_bytes()?;

        log::info!("Applied {}", record);
        Ok(Mutant { record, bytes })
    }

    /// List the candidate mutations of a class fetched from the byte source
    ///
    /// A class the source does not have has no mutations.
    pub fn find_mutations(
        &self,
        class_name: &BinaryName,
    ) -> Result<Vec<MutationRecord>, MutationError> {
        match self.hierarchy.source().get_bytes(class_name) {
            Some(bytes) => self.enumerate(&bytes),
            None => {
                log::warn!("No bytes for {}, so no mutations", class_name);
                Ok(vec![])
            }
        }
    }

    /// Apply a mutation to a class fetched from the byte source
    pub fn get_mutation(&self, id: &MutationIdentifier) -> Result<Mutant, MutationError> {
        let bytes = self
            .hierarchy
            .source()
            .get_bytes(&id.location.class)
            .ok_or_else(|| MutationError::ClassUnavailable(id.location.class.clone()))?;
        self.apply(&bytes, id)
    }
}

/// Decode the body of a method, if it has one (abstract and native methods do not)
fn decode_body(method: &Method, class: &ClassFile) -> Result<Option<MethodBody>, MutationError> {
    match method.code(&class.constants)? {
        Some(code) => Ok(Some(MethodBody::decode(&code, &class.constants)?)),
        None => Ok(None),
    }
}
