//! Instruction-level mutation engine for JVM class files
//!
//! [`mutation`] finds the places in a compiled class where a small semantic change can be made
//! (swap `+` for `-`, flip a comparison, drop an operand, ...) and produces the mutated class
//! bytes for any one of them. [`jvm`] is the class file codec underneath it: parsing, an editable
//! representation of method bodies, and re-assembly with recomputed stack map frames.

pub mod jvm;
pub mod mutation;
pub mod source;
mod util;
