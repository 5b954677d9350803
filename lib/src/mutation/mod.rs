//! Instruction-level mutations of JVM classes
//!
//! ### Identity
//!
//! Every candidate mutation gets a [`MutationIdentifier`]: the method it is in, the rule
//! ([`Mutator`]) that found it, and an ordinal counting earlier matches of the same rule in the
//! same method. Scanning the same bytes with the same rules always gives the same identifiers, so
//! a mutation can be listed in one process and applied in another.
//!
//! ### Rules
//!
//! | Family | Instructions | Rewrite |
//! |---|---|---|
//! | arithmetic | `iadd` ... `drem` | another operator of the same type |
//! | bitwise | `iand` ... `lxor` | another operator of the same type |
//! | relational | `ifeq` ... `if_icmple` | another condition, same target |
//! | operand deletion | `iadd` ... `drem` | drop one of the operands |
//! | null check | `getfield` | default value when the object is `null` |
//! | constructor calls | `new X; dup; ...; invokespecial X.<init>` | `null` |
//! | increments | `iinc` | increment by one more |
//!
//! Rewrites keep the operand stack the same shape, using the helpers in [`stack`].

mod class_info;
mod context;
mod driver;
mod errors;
mod filter;
mod identifier;
mod rewriter;
mod rules;
mod settings;
pub mod stack;

pub use class_info::*;
pub use context::*;
pub use driver::*;
pub use errors::*;
pub use filter::*;
pub use identifier::*;
pub use rewriter::*;
pub use rules::*;
pub use settings::*;
