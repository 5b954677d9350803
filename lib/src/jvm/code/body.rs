use super::{BranchInstruction, Instruction, Label, LabelGenerator};
use crate::jvm::class_file::{Attribute, ClassConstantIndex, Utf8ConstantIndex};

/// One entry in the linear instruction list of a method body
///
/// Labels and line markers take no space in the encoded bytecode, they mark the position of the
/// next instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodeItem {
    Label(Label),
    Line(u16),
    Instruction(Instruction),
    Branch(BranchInstruction<Label>),
}

impl CodeItem {
    /// Is this an instruction that gets encoded (as opposed to a marker)?
    pub fn is_instruction(&self) -> bool {
        matches!(self, CodeItem::Instruction(_) | CodeItem::Branch(_))
    }
}

/// Exception handler, with its protected range `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Handler {
    pub start: Label,
    pub end: Label,
    pub handler: Label,

    /// `None` catches everything (eg. `finally` blocks)
    pub catch_type: Option<ClassConstantIndex>,
}

/// Which table a local variable entry came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocalVariableKind {
    /// `LocalVariableTable`, with a field descriptor
    Descriptor,

    /// `LocalVariableTypeTable`, with a generic signature
    Signature,
}

/// Debug information about a local variable, live over `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalVariable {
    pub start: Label,
    pub end: Label,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub index: u16,
    pub kind: LocalVariableKind,
}

/// Editable method body
///
/// The bytecode is flattened into a list of [`CodeItem`]s where jump targets, exception ranges,
/// and debug information all refer to [`Label`]s instead of bytecode offsets. That way
/// instructions can be inserted or removed freely and everything gets re-resolved when the body is
/// assembled back into a `Code` attribute.
#[derive(Clone, Debug)]
pub struct MethodBody {
    pub items: Vec<CodeItem>,
    pub handlers: Vec<Handler>,
    pub local_variables: Vec<LocalVariable>,

    /// Values from the original `Code` attribute
    pub max_stack: u16,
    pub max_locals: u16,

    /// Attributes of the `Code` attribute which are carried over as-is
    pub other_attributes: Vec<Attribute>,

    pub labels: LabelGenerator,
}

impl MethodBody {
    /// Get a label that is not yet used anywhere in the body
    pub fn fresh_label(&mut self) -> Label {
        self.labels.fresh_label()
    }

    /// Iterate over just the encoded instructions (skipping labels and line markers)
    pub fn instructions(&self) -> impl Iterator<Item = &CodeItem> {
        self.items.iter().filter(|item| item.is_instruction())
    }

    /// Position in `items` of every label
    pub fn label_positions(&self) -> std::collections::HashMap<Label, usize> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| match item {
                CodeItem::Label(label) => Some((*label, idx)),
                _ => None,
            })
            .collect()
    }
}
