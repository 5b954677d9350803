//! Type inference over method bodies
//!
//! For any specific instruction inside a method body, the stack and locals should have the same
//! structure, regardless of which control flow was used to reach that instruction. In other words:
//! although the values on the stack and in the locals may obviously be different, the types and
//! order of the stack and local variables cannot. This information is referred to as the _stack
//! map frame_ (represented using [`Frame`]) and the set of stack map frames for all possible jump
//! targets in a method is the _stack map table_.
//!
//! Since a mutation can change what is on the stack, the frames of a rewritten method are
//! recomputed from scratch: [`Analysis`] runs the transfer functions of [`Frame`] to a fixpoint,
//! merging frames where control flow meets. Merging two object types needs their closest common
//! superclass, which comes from a [`crate::jvm::hierarchy::FrameSupport`].
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.10.1

mod analysis;
mod frame;
mod types;

pub use analysis::*;
pub use frame::*;
pub use types::*;
