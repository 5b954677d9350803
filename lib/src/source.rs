//! Where class bytes come from
//!
//! Both the mutation driver (which needs the bytes of the class to mutate) and the frame
//! computation (which needs the superclass and interfaces of every class it merges) look classes
//! up by name through a [`ClassByteSource`].

use crate::jvm::{BinaryName, Name};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Source of raw class file bytes, keyed by internal class name (eg. `com/example/Foo`)
pub trait ClassByteSource {
    /// Fetch the bytes of a class, if the source knows about it
    fn get_bytes(&self, name: &BinaryName) -> Option<Vec<u8>>;
}

impl<S: ClassByteSource + ?Sized> ClassByteSource for &S {
    fn get_bytes(&self, name: &BinaryName) -> Option<Vec<u8>> {
        (**self).get_bytes(name)
    }
}

/// Classes held in memory
#[derive(Default, Debug, Clone)]
pub struct MapSource {
    classes: HashMap<BinaryName, Vec<u8>>,
}

impl MapSource {
    pub fn new() -> MapSource {
        MapSource::default()
    }

    /// Add (or replace) a class
    pub fn insert(&mut self, name: BinaryName, bytes: Vec<u8>) {
        self.classes.insert(name, bytes);
    }
}

impl ClassByteSource for MapSource {
    fn get_bytes(&self, name: &BinaryName) -> Option<Vec<u8>> {
        self.classes.get(name).cloned()
    }
}

/// Classes laid out on disk as in a classpath directory (`com/example/Foo.class`)
///
/// Roots are searched in order.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    roots: Vec<PathBuf>,
}

impl DirectorySource {
    pub fn new(roots: Vec<PathBuf>) -> DirectorySource {
        DirectorySource { roots }
    }
}

impl ClassByteSource for DirectorySource {
    fn get_bytes(&self, name: &BinaryName) -> Option<Vec<u8>> {
        let relative = format!("{}.class", name.as_str());
        self.roots.iter().find_map(|root| {
            let path = root.join(&relative);
            match fs::read(&path) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    log::trace!("No class at {}: {}", path.display(), err);
                    None
                }
            }
        })
    }
}

/// Classes produced on demand by a closure
pub struct FnSource<F>(pub F);

impl<F: Fn(&BinaryName) -> Option<Vec<u8>>> ClassByteSource for FnSource<F> {
    fn get_bytes(&self, name: &BinaryName) -> Option<Vec<u8>> {
        (self.0)(name)
    }
}
