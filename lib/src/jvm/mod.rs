//! Read, rewrite, and write JVM classes
//!
//! ### Simple example
//!
//! Round-tripping every method body of a class through the editable representation looks like
//! this: parse the class, decode each `Code` attribute into a [`code::MethodBody`], then assemble
//! it back (recomputing the stack map frames) and swap it in.
//!
//! ```
//! use gregor::jvm::class_file::ClassFile;
//! use gregor::jvm::code::MethodBody;
//! use gregor::jvm::hierarchy::{CachingFrameSupport, HierarchyEntry, IncludingClass};
//! use gregor::jvm::verifier::MethodContext;
//! use gregor::jvm::*;
//! use gregor::source::MapSource;
//!
//! # fn reassemble(bytes: &[u8]) -> Result<Vec<u8>, Error> {
//! let mut class = ClassFile::parse(bytes)?;
//!
//! // Frames need to know the superclasses of the classes mentioned in the code
//! let library = CachingFrameSupport::new(MapSource::new());
//! let hierarchy = IncludingClass {
//!     inner: &library,
//!     entry: HierarchyEntry::from_class(&class)?,
//! };
//! let class_name = hierarchy.entry.name.clone();
//!
//! for index in 0..class.methods.len() {
//!     let method = &class.methods[index];
//!     let code = match method.code(&class.constants)? {
//!         Some(code) => code,
//!         None => continue,
//!     };
//!     let name = method.name(&class.constants)?.to_owned();
//!     let descriptor = method.descriptor(&class.constants)?.to_owned();
//!     let context = MethodContext {
//!         class: &class_name,
//!         name: &name,
//!         descriptor: &descriptor,
//!         is_static: method.access_flags.contains(MethodAccessFlags::STATIC),
//!     };
//!
//!     let body = MethodBody::decode(&code, &class.constants)?;
//!     let code = body.assemble(&context, &mut class.constants, &hierarchy, class.version)?;
//!     class.replace_method_code(index, &code)?;
//! }
//!
//! class.to_bytes()
//! # }
//! ```

mod access_flags;
pub mod binary_format;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
pub mod hierarchy;
mod names;
pub mod verifier;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
