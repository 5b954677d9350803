//! Class hierarchy queries needed to compute stack map frames
//!
//! Merging two frames where a slot holds different object types needs the closest common
//! superclass of those types, which in turn needs the superclass and interfaces of classes other
//! than the one being rewritten. Those are fetched by name through [`FrameSupport`].

use super::class_file::ClassFile;
use super::{BinaryName, Error, Name};
use crate::source::ClassByteSource;
use elsa::sync::FrozenMap;
use std::collections::HashSet;

mod java_lang;

pub use java_lang::java_lang_entry;

/// What the frame computation needs to know about a class
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HierarchyEntry {
    pub name: BinaryName,

    /// `None` only for `java/lang/Object`
    pub superclass: Option<BinaryName>,
    pub interfaces: Vec<BinaryName>,
    pub is_interface: bool,
}

impl HierarchyEntry {
    /// Extract the hierarchy information from a parsed class
    pub fn from_class(class: &ClassFile) -> Result<HierarchyEntry, Error> {
        let to_name = |name: &str| BinaryName::from_str(name).map_err(Error::MalformedClass);
        Ok(HierarchyEntry {
            name: to_name(class.this_class_name()?)?,
            superclass: class.super_class_name()?.map(to_name).transpose()?,
            interfaces: class
                .interface_names()?
                .into_iter()
                .map(to_name)
                .collect::<Result<_, _>>()?,
            is_interface: class.is_interface(),
        })
    }
}

/// Resolves class names to their place in the hierarchy
pub trait FrameSupport {
    fn lookup(&self, name: &BinaryName) -> Option<&HierarchyEntry>;
}

/// Hierarchy backed by a class byte source, with each class parsed at most once
///
/// Classes the source does not know about fall back to a small built-in table of `java.lang`
/// (and a few `java.util`/`java.io`) types.
pub struct CachingFrameSupport<S> {
    source: S,
    entries: FrozenMap<BinaryName, Box<Option<HierarchyEntry>>>,
}

impl<S: ClassByteSource> CachingFrameSupport<S> {
    pub fn new(source: S) -> Self {
        CachingFrameSupport {
            source,
            entries: FrozenMap::new(),
        }
    }

    /// Source the classes are read from
    pub fn source(&self) -> &S {
        &self.source
    }

    fn load(&self, name: &BinaryName) -> Option<HierarchyEntry> {
        if let Some(bytes) = self.source.get_bytes(name) {
            match ClassFile::parse(&bytes).and_then(|class| HierarchyEntry::from_class(&class)) {
                Ok(entry) => return Some(entry),
                Err(err) => log::warn!("Cannot read hierarchy of {}: {}", name, err),
            }
        }
        java_lang_entry(name)
    }
}

impl<S: ClassByteSource> FrameSupport for CachingFrameSupport<S> {
    fn lookup(&self, name: &BinaryName) -> Option<&HierarchyEntry> {
        if let Some(cached) = self.entries.get(name) {
            return cached.as_ref();
        }
        let loaded = self.load(name);
        if loaded.is_none() {
            log::debug!("Class {} is not in the hierarchy", name);
        }
        self.entries
            .insert(name.clone(), Box::new(loaded))
            .as_ref()
    }
}

/// Hierarchy which also knows about one extra class (usually the one being rewritten, whose
/// bytes the underlying source may not have)
pub struct IncludingClass<'a> {
    pub inner: &'a dyn FrameSupport,
    pub entry: HierarchyEntry,
}

impl<'a> FrameSupport for IncludingClass<'a> {
    fn lookup(&self, name: &BinaryName) -> Option<&HierarchyEntry> {
        if *name == self.entry.name {
            Some(&self.entry)
        } else {
            self.inner.lookup(name)
        }
    }
}

fn lookup_required<'a>(
    support: &'a dyn FrameSupport,
    name: &BinaryName,
) -> Result<&'a HierarchyEntry, Error> {
    support
        .lookup(name)
        .ok_or_else(|| Error::MissingClass(name.clone()))
}

/// Is `sub_type` a subclass of, or does it implement, `super_type`?
///
/// This does a traversal of super types in the hierarchy.
pub fn is_assignable(
    support: &dyn FrameSupport,
    sub_type: &BinaryName,
    super_type: &BinaryName,
) -> Result<bool, Error> {
    if *super_type == BinaryName::OBJECT {
        return Ok(true);
    }

    let mut supertypes_to_visit: Vec<BinaryName> = vec![sub_type.clone()];
    let mut dont_revisit: HashSet<BinaryName> = HashSet::new();
    dont_revisit.insert(sub_type.clone());

    while let Some(class_name) = supertypes_to_visit.pop() {
        if class_name == *super_type {
            return Ok(true);
        }
        let entry = lookup_required(support, &class_name)?;

        // Enqueue next types to visit
        for next in entry.superclass.iter().chain(entry.interfaces.iter()) {
            if dont_revisit.insert(next.clone()) {
                supertypes_to_visit.push(next.clone());
            }
        }
    }

    Ok(false)
}

/// Closest common superclass of two classes
///
/// Interfaces have no useful common superclass, so anything involving an interface that is not
/// assignable one way or the other merges to `java/lang/Object`.
pub fn common_super_class(
    support: &dyn FrameSupport,
    type1: &BinaryName,
    type2: &BinaryName,
) -> Result<BinaryName, Error> {
    if type1 == type2 {
        return Ok(type1.clone());
    }
    if is_assignable(support, type2, type1)? {
        return Ok(type1.clone());
    }
    if is_assignable(support, type1, type2)? {
        return Ok(type2.clone());
    }

    let entry1 = lookup_required(support, type1)?;
    let entry2 = lookup_required(support, type2)?;
    if entry1.is_interface || entry2.is_interface {
        return Ok(BinaryName::OBJECT);
    }

    let mut current = entry1;
    loop {
        match &current.superclass {
            None => return Ok(BinaryName::OBJECT),
            Some(superclass) => {
                if is_assignable(support, type2, superclass)? {
                    return Ok(superclass.clone());
                }
                current = lookup_required(support, superclass)?;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::MapSource;

    fn support() -> CachingFrameSupport<MapSource> {
        CachingFrameSupport::new(MapSource::new())
    }

    #[test]
    fn built_in_hierarchy() {
        let support = support();
        let npe = BinaryName::from("java/lang/NullPointerException");
        let iae = BinaryName::from("java/lang/IllegalArgumentException");
        assert_eq!(
            common_super_class(&support, &npe, &iae).unwrap(),
            BinaryName::from("java/lang/RuntimeException")
        );
        assert_eq!(
            common_super_class(&support, &npe, &BinaryName::THROWABLE).unwrap(),
            BinaryName::THROWABLE
        );
        assert_eq!(
            common_super_class(&support, &BinaryName::STRING, &BinaryName::from("java/lang/Integer"))
                .unwrap(),
            BinaryName::OBJECT
        );
        assert!(is_assignable(&support, &BinaryName::STRING, &BinaryName::SERIALIZABLE).unwrap());
    }

    #[test]
    fn interfaces_merge_to_object() {
        let support = support();
        assert_eq!(
            common_super_class(
                &support,
                &BinaryName::from("java/lang/Runnable"),
                &BinaryName::STRING
            )
            .unwrap(),
            BinaryName::OBJECT
        );
    }

    #[test]
    fn extra_class_and_missing_classes() {
        let support = support();
        let extra = IncludingClass {
            inner: &support,
            entry: HierarchyEntry {
                name: BinaryName::from("com/example/MyError"),
                superclass: Some(BinaryName::from("java/lang/IllegalStateException")),
                interfaces: vec![],
                is_interface: false,
            },
        };
        assert_eq!(
            common_super_class(
                &extra,
                &BinaryName::from("com/example/MyError"),
                &BinaryName::from("java/lang/ArithmeticException")
            )
            .unwrap(),
            BinaryName::from("java/lang/RuntimeException")
        );

        let missing = common_super_class(
            &extra,
            &BinaryName::from("com/example/Nowhere"),
            &BinaryName::STRING,
        );
        assert!(matches!(missing, Err(Error::MissingClass(_))));
    }

    #[test]
    fn cache_shared_between_threads() {
        let support = support();
        let npe = BinaryName::from("java/lang/NullPointerException");
        let iae = BinaryName::from("java/lang/IllegalArgumentException");
        let (shared, npe_ref, iae_ref) = (&support, &npe, &iae);
        let merged: Vec<BinaryName> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(move || common_super_class(shared, npe_ref, iae_ref).unwrap())
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });
        assert!(merged
            .iter()
            .all(|name| *name == BinaryName::from("java/lang/RuntimeException")));
        assert!(support.lookup(&npe).is_some());
    }
}
