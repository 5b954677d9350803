//! Bytecode representation, decoding, and assembly
//!
//! ### Structure
//!
//! Despite being pushed off into [just another method attribute](crate::jvm::class_file::Code),
//! the bytecode is arguably the most important part of the class file - it contains the actual
//! executable instructions. We split up the [list of bytecode instructions][0] into two groups:
//!
//!   - [`Instruction`] for straight-line instructions
//!   - [`BranchInstruction`] for instructions that may branch, return, or throw
//!
//! A [`MethodBody`] is a flat list of these, interleaved with [`Label`]s and line number markers.
//! Nothing in it refers to a bytecode offset, so instructions can be spliced in or out without
//! fixing up anything else.
//!
//! ### Round trip
//!
//! [`MethodBody::decode`] turns a `Code` attribute into a body and [`MethodBody::assemble`] turns
//! it back. Assembly re-runs the frame inference (see [`crate::jvm::verifier`]), picks jump
//! encodings, and rebuilds the exception and debug tables.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se18/html/jvms-6.html#jvms-6.5

mod assemble;
mod body;
mod decode;
mod instructions;
mod label;

pub use body::*;
pub use instructions::*;
pub use label::*;
