use super::{MethodLocation, MutationError};
use crate::jvm::class_file::{ConstantsPool, FieldRefConstantIndex};
use crate::jvm::code::{BranchInstruction, CodeItem, Instruction, InvokeType, OrdComparison};
use crate::jvm::{BinaryName, FieldType, MethodDescriptor, Name, ParseDescriptor, UnqualifiedName};
use std::fmt;

/// Operand type of a numeric instruction
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NumericType {
    Int,
    Long,
    Float,
    Double,
}

impl NumericType {
    /// Are operands of this type two stack slots wide?
    pub const fn is_wide(self) -> bool {
        matches!(self, NumericType::Long | NumericType::Double)
    }

    const fn long_word(self) -> &'static str {
        match self {
            NumericType::Int => "integer",
            NumericType::Long => "long",
            NumericType::Float => "float",
            NumericType::Double => "double",
        }
    }

    const fn short_word(self) -> &'static str {
        match self {
            NumericType::Int => "int",
            NumericType::Long => "long",
            NumericType::Float => "float",
            NumericType::Double => "double",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithmeticOp {
    pub const ALL: [ArithmeticOp; 5] = [
        ArithmeticOp::Add,
        ArithmeticOp::Sub,
        ArithmeticOp::Mul,
        ArithmeticOp::Div,
        ArithmeticOp::Rem,
    ];

    const fn noun(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "addition",
            ArithmeticOp::Sub => "subtraction",
            ArithmeticOp::Mul => "multiplication",
            ArithmeticOp::Div => "division",
            ArithmeticOp::Rem => "modulus",
        }
    }

    const fn article(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "an",
            _ => "a",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BitwiseOp {
    And,
    Or,
    Xor,
}

impl BitwiseOp {
    pub const ALL: [BitwiseOp; 3] = [BitwiseOp::And, BitwiseOp::Or, BitwiseOp::Xor];

    const fn symbol(self) -> &'static str {
        match self {
            BitwiseOp::And => "&",
            BitwiseOp::Or => "|",
            BitwiseOp::Xor => "^",
        }
    }
}

const fn relational_symbol(comparison: OrdComparison) -> &'static str {
    match comparison {
        OrdComparison::EQ => "==",
        OrdComparison::GE => ">=",
        OrdComparison::GT => ">",
        OrdComparison::LE => "<=",
        OrdComparison::LT => "<",
        OrdComparison::NE => "!=",
    }
}

/// Binary arithmetic instructions, by operand type and operator
const ARITHMETIC: [(Instruction, NumericType, ArithmeticOp); 20] = [
    (Instruction::IAdd, NumericType::Int, ArithmeticOp::Add),
    (Instruction::ISub, NumericType::Int, ArithmeticOp::Sub),
    (Instruction::IMul, NumericType::Int, ArithmeticOp::Mul),
    (Instruction::IDiv, NumericType::Int, ArithmeticOp::Div),
    (Instruction::IRem, NumericType::Int, ArithmeticOp::Rem),
    (Instruction::LAdd, NumericType::Long, ArithmeticOp::Add),
    (Instruction::LSub, NumericType::Long, ArithmeticOp::Sub),
    (Instruction::LMul, NumericType::Long, ArithmeticOp::Mul),
    (Instruction::LDiv, NumericType::Long, ArithmeticOp::Div),
    (Instruction::LRem, NumericType::Long, ArithmeticOp::Rem),
    (Instruction::FAdd, NumericType::Float, ArithmeticOp::Add),
    (Instruction::FSub, NumericType::Float, ArithmeticOp::Sub),
    (Instruction::FMul, NumericType::Float, ArithmeticOp::Mul),
    (Instruction::FDiv, NumericType::Float, ArithmeticOp::Div),
    (Instruction::FRem, NumericType::Float, ArithmeticOp::Rem),
    (Instruction::DAdd, NumericType::Double, ArithmeticOp::Add),
    (Instruction::DSub, NumericType::Double, ArithmeticOp::Sub),
    (Instruction::DMul, NumericType::Double, ArithmeticOp::Mul),
    (Instruction::DDiv, NumericType::Double, ArithmeticOp::Div),
    (Instruction::DRem, NumericType::Double, ArithmeticOp::Rem),
];

/// Bitwise instructions, by operand type and operator
const BITWISE: [(Instruction, NumericType, BitwiseOp); 6] = [
    (Instruction::IAnd, NumericType::Int, BitwiseOp::And),
    (Instruction::IOr, NumericType::Int, BitwiseOp::Or),
    (Instruction::IXor, NumericType::Int, BitwiseOp::Xor),
    (Instruction::LAnd, NumericType::Long, BitwiseOp::And),
    (Instruction::LOr, NumericType::Long, BitwiseOp::Or),
    (Instruction::LXor, NumericType::Long, BitwiseOp::Xor),
];

fn arithmetic(insn: &Instruction) -> Option<(NumericType, ArithmeticOp)> {
    ARITHMETIC
        .iter()
        .find(|(candidate, _, _)| candidate == insn)
        .map(|(_, typ, op)| (*typ, *op))
}

fn arithmetic_instruction(typ: NumericType, op: ArithmeticOp) -> Option<Instruction> {
    ARITHMETIC
        .iter()
        .find(|(_, t, o)| *t == typ && *o == op)
        .map(|(insn, _, _)| insn.clone())
}

fn bitwise(insn: &Instruction) -> Option<(NumericType, BitwiseOp)> {
    BITWISE
        .iter()
        .find(|(candidate, _, _)| candidate == insn)
        .map(|(_, typ, op)| (*typ, *op))
}

fn bitwise_instruction(typ: NumericType, op: BitwiseOp) -> Option<Instruction> {
    BITWISE
        .iter()
        .find(|(_, t, o)| *t == typ && *o == op)
        .map(|(insn, _, _)| insn.clone())
}

/// Mutation rule
///
/// Rules that substitute one operator for another come in one variant per replacement operator,
/// so that each candidate replacement has its own id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mutator {
    /// Swap a binary arithmetic operator for another one of the same operand type
    ArithmeticReplace(ArithmeticOp),

    /// Swap a bitwise operator for another one of the same operand type
    BitwiseReplace(BitwiseOp),

    /// Swap the condition of an `int` branch
    RelationalReplace(OrdComparison),

    /// Drop the left hand side of a binary arithmetic operation
    RemoveFirstOperand,

    /// Drop the right hand side of a binary arithmetic operation
    RemoveSecondOperand,

    /// Read a default value instead of throwing when a field is read off `null`
    CheckNullObject,

    /// Skip a constructor call, leaving `null` where the new object would be
    ConstructorCall,

    /// Add one to the amount a local variable gets incremented by
    IncrementIncrement,
}

/// Group of related rules
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MutatorFamily {
    Arithmetic,
    Bitwise,
    Relational,
    OperandDeletion,
    NullCheck,
    ConstructorCall,
    Increment,
}

impl MutatorFamily {
    pub const fn name(self) -> &'static str {
        match self {
            MutatorFamily::Arithmetic => "ARITHMETIC",
            MutatorFamily::Bitwise => "BITWISE",
            MutatorFamily::Relational => "RELATIONAL",
            MutatorFamily::OperandDeletion => "OPERAND_DELETION",
            MutatorFamily::NullCheck => "NULL_CHECK",
            MutatorFamily::ConstructorCall => "CONSTRUCTOR_CALLS",
            MutatorFamily::Increment => "INCREMENTS",
        }
    }
}

impl Mutator {
    /// Every rule, in the order rules get offered each instruction
    pub const ALL: [Mutator; 19] = [
        Mutator::ArithmeticReplace(ArithmeticOp::Add),
        Mutator::ArithmeticReplace(ArithmeticOp::Sub),
        Mutator::ArithmeticReplace(ArithmeticOp::Mul),
        Mutator::ArithmeticReplace(ArithmeticOp::Div),
        Mutator::ArithmeticReplace(ArithmeticOp::Rem),
        Mutator::BitwiseReplace(BitwiseOp::And),
        Mutator::BitwiseReplace(BitwiseOp::Or),
        Mutator::BitwiseReplace(BitwiseOp::Xor),
        Mutator::RelationalReplace(OrdComparison::EQ),
        Mutator::RelationalReplace(OrdComparison::GE),
        Mutator::RelationalReplace(OrdComparison::GT),
        Mutator::RelationalReplace(OrdComparison::LE),
        Mutator::RelationalReplace(OrdComparison::LT),
        Mutator::RelationalReplace(OrdComparison::NE),
        Mutator::RemoveFirstOperand,
        Mutator::RemoveSecondOperand,
        Mutator::CheckNullObject,
        Mutator::ConstructorCall,
        Mutator::IncrementIncrement,
    ];

    /// Stable name of the rule
    pub const fn id(self) -> &'static str {
        match self {
            Mutator::ArithmeticReplace(ArithmeticOp::Add) => "ARITHMETIC_REPLACE_ADD",
            Mutator::ArithmeticReplace(ArithmeticOp::Sub) => "ARITHMETIC_REPLACE_SUB",
            Mutator::ArithmeticReplace(ArithmeticOp::Mul) => "ARITHMETIC_REPLACE_MUL",
            Mutator::ArithmeticReplace(ArithmeticOp::Div) => "ARITHMETIC_REPLACE_DIV",
            Mutator::ArithmeticReplace(ArithmeticOp::Rem) => "ARITHMETIC_REPLACE_REM",
            Mutator::BitwiseReplace(BitwiseOp::And) => "BITWISE_REPLACE_AND",
            Mutator::BitwiseReplace(BitwiseOp::Or) => "BITWISE_REPLACE_OR",
            Mutator::BitwiseReplace(BitwiseOp::Xor) => "BITWISE_REPLACE_XOR",
            Mutator::RelationalReplace(OrdComparison::EQ) => "RELATIONAL_REPLACE_EQ",
            Mutator::RelationalReplace(OrdComparison::GE) => "RELATIONAL_REPLACE_GE",
            Mutator::RelationalReplace(OrdComparison::GT) => "RELATIONAL_REPLACE_GT",
            Mutator::RelationalReplace(OrdComparison::LE) => "RELATIONAL_REPLACE_LE",
            Mutator::RelationalReplace(OrdComparison::LT) => "RELATIONAL_REPLACE_LT",
            Mutator::RelationalReplace(OrdComparison::NE) => "RELATIONAL_REPLACE_NE",
            Mutator::RemoveFirstOperand => "REMOVE_FIRST_OPERAND",
            Mutator::RemoveSecondOperand => "REMOVE_SECOND_OPERAND",
            Mutator::CheckNullObject => "CHECK_NULL_OBJECT",
            Mutator::ConstructorCall => "CONSTRUCTOR_CALL",
            Mutator::IncrementIncrement => "INCREMENT_INCREMENT",
        }
    }

    /// Look up a rule by its id (ignoring case)
    pub fn from_id(id: &str) -> Option<Mutator> {
        Mutator::ALL
            .iter()
            .copied()
            .find(|mutator| mutator.id().eq_ignore_ascii_case(id))
    }

    pub const fn family(self) -> MutatorFamily {
        match self {
            Mutator::ArithmeticReplace(_) => MutatorFamily::Arithmetic,
            Mutator::BitwiseReplace(_) => MutatorFamily::Bitwise,
            Mutator::RelationalReplace(_) => MutatorFamily::Relational,
            Mutator::RemoveFirstOperand | Mutator::RemoveSecondOperand => {
                MutatorFamily::OperandDeletion
            }
            Mutator::CheckNullObject => MutatorFamily::NullCheck,
            Mutator::ConstructorCall => MutatorFamily::ConstructorCall,
            Mutator::IncrementIncrement => MutatorFamily::Increment,
        }
    }

    /// Check if the rule applies at a site and, if so, what it would do there
    pub fn recognize(self, site: &Site<'_>) -> Result<Option<Candidate>, MutationError> {
        let candidate = match (self, site.item) {
            (Mutator::ArithmeticReplace(target), CodeItem::Instruction(insn)) => {
                match arithmetic(insn) {
                    Some((typ, op)) if op != target => {
                        let replacement = arithmetic_instruction(typ, target)
                            .ok_or_else(|| site.inconsistent("no arithmetic instruction"))?;
                        Some(Candidate {
                            description: format!(
                                "Replaced {} {} with {}",
                                typ.long_word(),
                                op.noun(),
                                target.noun()
                            ),
                            rewrite: Rewrite::Replace(vec![CodeItem::Instruction(replacement)]),
                        })
                    }
                    _ => None,
                }
            }

            (Mutator::BitwiseReplace(target), CodeItem::Instruction(insn)) => match bitwise(insn) {
                Some((typ, op)) if op != target => {
                    let replacement = bitwise_instruction(typ, target)
                        .ok_or_else(|| site.inconsistent("no bitwise instruction"))?;
                    Some(Candidate {
                        description: format!(
                            "Replaced {} with {} ({})",
                            op.symbol(),
                            target.symbol(),
                            typ.long_word()
                        ),
                        rewrite: Rewrite::Replace(vec![CodeItem::Instruction(replacement)]),
                    })
                }
                _ => None,
            },

            (Mutator::RelationalReplace(target), CodeItem::Branch(branch)) => {
                let replacement = match branch {
                    BranchInstruction::If(cmp, lbl) if *cmp != target => {
                        Some((*cmp, BranchInstruction::If(target, *lbl)))
                    }
                    BranchInstruction::IfICmp(cmp, lbl) if *cmp != target => {
                        Some((*cmp, BranchInstruction::IfICmp(target, *lbl)))
                    }
                    _ => None,
                };
                replacement.map(|(original, replacement)| Candidate {
                    description: format!(
                        "Relational operator replacement: Mutated {} to {}",
                        relational_symbol(original),
                        relational_symbol(target)
                    ),
                    rewrite: Rewrite::Replace(vec![CodeItem::Branch(replacement)]),
                })
            }

            (Mutator::RemoveFirstOperand, CodeItem::Instruction(insn)) => {
                arithmetic(insn).map(|(typ, op)| Candidate {
                    description: format!(
                        "REMOVE_FIRST_OPERAND: Remove the first operand from {} {} formula ({})",
                        op.article(),
                        op.noun(),
                        typ.short_word()
                    ),
                    rewrite: Rewrite::DeleteOperand {
                        first: true,
                        wide: typ.is_wide(),
                    },
                })
            }

            (Mutator::RemoveSecondOperand, CodeItem::Instruction(insn)) => {
                arithmetic(insn).map(|(typ, op)| Candidate {
                    description: format!(
                        "REMOVE_SECOND_OPERATOR: Remove the second operand from {} {} formula ({})",
                        op.article(),
                        op.noun(),
                        typ.short_word()
                    ),
                    rewrite: Rewrite::DeleteOperand {
                        first: false,
                        wide: typ.is_wide(),
                    },
                })
            }

            (Mutator::CheckNullObject, CodeItem::Instruction(Instruction::GetField(field))) => {
                let member = site.constants.member_ref(field.0)?;
                let field_type = FieldType::<BinaryName>::parse(member.descriptor).map_err(|err| {
                    site.inconsistent(format!("field descriptor {}: {}", member.descriptor, err))
                })?;
                Some(Candidate {
                    description: String::from("Checked for NULL object here."),
                    rewrite: Rewrite::GuardedRead {
                        field: *field,
                        field_type,
                    },
                })
            }

            (
                Mutator::ConstructorCall,
                CodeItem::Instruction(Instruction::Invoke(InvokeType::Special, method)),
            ) => {
                let member = site.constants.member_ref(method.0)?;
                let paired = site
                    .construction
                    .map_or(false, |class| class.as_str() == member.class);
                if member.name != UnqualifiedName::INIT.as_str() || !paired {
                    None
                } else {
                    let descriptor = MethodDescriptor::parse(member.descriptor)
                        .map_err(|err| site.inconsistent(err))?;
                    let owner = member.class.replace('/', ".");
                    Some(Candidate {
                        description: format!("removed call to {}::<init>", owner),
                        rewrite: Rewrite::SuppressConstructor {
                            parameters: descriptor.parameters,
                        },
                    })
                }
            }

            (Mutator::IncrementIncrement, CodeItem::Instruction(Instruction::IInc(var, k))) => {
                k.checked_add(1).map(|incremented| Candidate {
                    description: String::from("Added increment on increment of local variable"),
                    rewrite: Rewrite::Replace(vec![CodeItem::Instruction(Instruction::IInc(
                        *var,
                        incremented,
                    ))]),
                })
            }

            _ => None,
        };
        Ok(candidate)
    }
}

impl fmt::Display for Mutator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Instruction offered to the rules, along with what they may need to know about its surroundings
pub struct Site<'a> {
    pub item: &'a CodeItem,
    pub constants: &'a ConstantsPool,
    pub location: &'a MethodLocation,

    /// Class of the innermost `new X; dup` whose constructor has not been called yet
    pub construction: Option<&'a BinaryName>,
}

impl<'a> Site<'a> {
    fn inconsistent(&self, detail: impl Into<String>) -> MutationError {
        MutationError::StructuralInconsistency {
            location: self.location.clone(),
            detail: detail.into(),
        }
    }
}

/// Rule match at one instruction
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub description: String,
    pub rewrite: Rewrite,
}

/// What replaces a matched instruction
#[derive(Clone, Debug, PartialEq)]
pub enum Rewrite {
    /// Emit these items instead
    Replace(Vec<CodeItem>),

    /// Discard one operand of a binary operation, leaving the other one as the result
    DeleteOperand { first: bool, wide: bool },

    /// Read the field only if the object is not `null`, otherwise push the default value
    GuardedRead {
        field: FieldRefConstantIndex,
        field_type: FieldType<BinaryName>,
    },

    /// Drop the arguments and both copies of the uninitialized object, then push `null`
    SuppressConstructor {
        parameters: Vec<FieldType<BinaryName>>,
    },
}
