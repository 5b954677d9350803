//! Instructions as they appear in a method body
//!
//! The representation is slightly different from the usual presentation of the instruction set,
//! in order to make it more convenient to inspect and rewrite bytecode:
//!
//!   - The "wide" instruction doesn't show up at all, but instead gets merged into the
//!     instructions it is allowed to modify
//!
//!   - Short forms (eg. `iload_0`) and long forms (eg. `ldc_w`, `goto_w`) are folded into one
//!     instruction. The assembler picks the encoding.
//!
//!   - Some instructions (like the branches) get abstracted into one instruction with a field.
//!     This helps with repetitive pattern matches and also simplifies tasks like inverting a
//!     branch condition.

use crate::jvm::class_file::{
    ClassConstantIndex, ConstantIndex, FieldRefConstantIndex, InvokeDynamicConstantIndex,
    MethodRefConstantIndex, Serialize,
};
use crate::jvm::BaseType;
use crate::util::Width;
use byteorder::WriteBytesExt;
use std::convert::TryFrom;
use std::io::Result;
use std::ops::Not;

/// Non-branching JVM bytecode instruction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Nop,
    AConstNull,
    IConstM1,
    IConst0,
    IConst1,
    IConst2,
    IConst3,
    IConst4,
    IConst5,
    LConst0,
    LConst1,
    FConst0,
    FConst1,
    FConst2,
    DConst0,
    DConst1,
    BiPush(i8),
    SiPush(i16),
    Ldc(ConstantIndex), // covers both `ldc` and `ldc_w`
    Ldc2(ConstantIndex),
    ILoad(u16), // covers `iload`, `iload{0,3}`, and `wide iload`
    LLoad(u16),
    FLoad(u16),
    DLoad(u16),
    ALoad(u16),
    IALoad,
    LALoad,
    FALoad,
    DALoad,
    AALoad,
    BALoad,
    CALoad,
    SALoad,
    IStore(u16), // covers `istore`, `istore{0,3}`, and `wide istore`
    LStore(u16),
    FStore(u16),
    DStore(u16),
    AStore(u16),
    IAStore,
    LAStore,
    FAStore,
    DAStore,
    AAStore,
    BAStore,
    CAStore,
    SAStore,
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
    IAdd,
    LAdd,
    FAdd,
    DAdd,
    ISub,
    LSub,
    FSub,
    DSub,
    IMul,
    LMul,
    FMul,
    DMul,
    IDiv,
    LDiv,
    FDiv,
    DDiv,
    IRem,
    LRem,
    FRem,
    DRem,
    INeg,
    LNeg,
    FNeg,
    DNeg,
    ISh(ShiftType), // covers `ishr`, `ishl`, and `iushr`
    LSh(ShiftType), // covers `lshr`, `lshl`, and `lushr`
    IAnd,
    LAnd,
    IOr,
    LOr,
    IXor,
    LXor,
    IInc(u16, i16), // covers `iinc` and `wide iinc`
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2C,
    I2S,
    LCmp,
    FCmp(CompareMode), // covers `fcmpl` and `fcmpg`
    DCmp(CompareMode), // covers `dcmpl` and `dcmpg`
    GetStatic(FieldRefConstantIndex),
    PutStatic(FieldRefConstantIndex),
    GetField(FieldRefConstantIndex),
    PutField(FieldRefConstantIndex),
    Invoke(InvokeType, MethodRefConstantIndex),
    InvokeDynamic(InvokeDynamicConstantIndex),
    New(ClassConstantIndex),
    NewArray(BaseType),
    ANewArray(ClassConstantIndex),
    ArrayLength,
    CheckCast(ClassConstantIndex),
    InstanceOf(ClassConstantIndex),
    MonitorEnter,
    MonitorExit,
    MultiANewArray(ClassConstantIndex, u8),
}

/// Instructions without operands, along with their opcode
#[rustfmt::skip]
const OPERANDLESS: [(u8, Instruction); 100] = {
    use Instruction::*;
    [
    (0x00, Nop),
    (0x01, AConstNull),
    (0x02, IConstM1),
    (0x03, IConst0),
    (0x04, IConst1),
    (0x05, IConst2),
    (0x06, IConst3),
    (0x07, IConst4),
    (0x08, IConst5),
    (0x09, LConst0),
    (0x0a, LConst1),
    (0x0b, FConst0),
    (0x0c, FConst1),
    (0x0d, FConst2),
    (0x0e, DConst0),
    (0x0f, DConst1),
    (0x2e, IALoad),
    (0x2f, LALoad),
    (0x30, FALoad),
    (0x31, DALoad),
    (0x32, AALoad),
    (0x33, BALoad),
    (0x34, CALoad),
    (0x35, SALoad),
    (0x4f, IAStore),
    (0x50, LAStore),
    (0x51, FAStore),
    (0x52, DAStore),
    (0x53, AAStore),
    (0x54, BAStore),
    (0x55, CAStore),
    (0x56, SAStore),
    (0x57, Pop),
    (0x58, Pop2),
    (0x59, Dup),
    (0x5a, DupX1),
    (0x5b, DupX2),
    (0x5c, Dup2),
    (0x5d, Dup2X1),
    (0x5e, Dup2X2),
    (0x5f, Swap),
    (0x60, IAdd),
    (0x61, LAdd),
    (0x62, FAdd),
    (0x63, DAdd),
    (0x64, ISub),
    (0x65, LSub),
    (0x66, FSub),
    (0x67, DSub),
    (0x68, IMul),
    (0x69, LMul),
    (0x6a, FMul),
    (0x6b, DMul),
    (0x6c, IDiv),
    (0x6d, LDiv),
    (0x6e, FDiv),
    (0x6f, DDiv),
    (0x70, IRem),
    (0x71, LRem),
    (0x72, FRem),
    (0x73, DRem),
    (0x74, INeg),
    (0x75, LNeg),
    (0x76, FNeg),
    (0x77, DNeg),
    (0x78, ISh(ShiftType::Left)),
    (0x79, LSh(ShiftType::Left)),
    (0x7a, ISh(ShiftType::ArithmeticRight)),
    (0x7b, LSh(ShiftType::ArithmeticRight)),
    (0x7c, ISh(ShiftType::LogicalRight)),
    (0x7d, LSh(ShiftType::LogicalRight)),
    (0x7e, IAnd),
    (0x7f, LAnd),
    (0x80, IOr),
    (0x81, LOr),
    (0x82, IXor),
    (0x83, LXor),
    (0x85, I2L),
    (0x86, I2F),
    (0x87, I2D),
    (0x88, L2I),
    (0x89, L2F),
    (0x8a, L2D),
    (0x8b, F2I),
    (0x8c, F2L),
    (0x8d, F2D),
    (0x8e, D2I),
    (0x8f, D2L),
    (0x90, D2F),
    (0x91, I2B),
    (0x92, I2C),
    (0x93, I2S),
    (0x94, LCmp),
    (0x95, FCmp(CompareMode::L)),
    (0x96, FCmp(CompareMode::G)),
    (0x97, DCmp(CompareMode::L)),
    (0x98, DCmp(CompareMode::G)),
    (0xbe, ArrayLength),
    (0xc2, MonitorEnter),
    (0xc3, MonitorExit),
    ]
};

impl Instruction {
    /// Instruction encoded as just this opcode
    pub fn from_operandless_opcode(opcode: u8) -> Option<Instruction> {
        OPERANDLESS
            .iter()
            .find(|(candidate, _)| *candidate == opcode)
            .map(|(_, insn)| insn.clone())
    }

    fn operandless_opcode(&self) -> Option<u8> {
        OPERANDLESS
            .iter()
            .find(|(_, insn)| insn == self)
            .map(|(opcode, _)| *opcode)
    }
}

/// Sink that only counts what gets written to it
struct ByteCount(usize);

impl std::io::Write for ByteCount {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Encoded length, which depends on the operands (`iload_1` vs. `iload 9` vs. `wide iload 300`)
impl Width for Instruction {
    fn width(&self) -> usize {
        let mut count = ByteCount(0);
        match self.serialize(&mut count) {
            Ok(()) => count.0,
            Err(_) => 0,
        }
    }
}

impl Serialize for Instruction {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        if let Some(opcode) = self.operandless_opcode() {
            return opcode.serialize(writer);
        }

        // Loads and stores of locals 0-3 have dedicated opcodes, then come the one byte operand
        // form and the `wide` form
        fn local<W: WriteBytesExt>(
            index: u16,
            short_forms: u8,
            opcode: u8,
            writer: &mut W,
        ) -> Result<()> {
            match u8::try_from(index) {
                Ok(short @ 0..=3) => (short_forms + short).serialize(writer),
                Ok(narrow) => {
                    opcode.serialize(writer)?;
                    narrow.serialize(writer)
                }
                Err(_) => {
                    WIDE.serialize(writer)?;
                    opcode.serialize(writer)?;
                    index.serialize(writer)
                }
            }
        }

        fn with_operand<W: WriteBytesExt, O: Serialize>(
            opcode: u8,
            operand: &O,
            writer: &mut W,
        ) -> Result<()> {
            opcode.serialize(writer)?;
            operand.serialize(writer)
        }

        match self {
            Instruction::BiPush(byte) => with_operand(0x10, byte, writer),
            Instruction::SiPush(short) => with_operand(0x11, short, writer),
            Instruction::Ldc(ConstantIndex(index)) => match u8::try_from(*index) {
                Ok(narrow) => with_operand(0x12, &narrow, writer),
                Err(_) => with_operand(0x13, index, writer),
            },
            Instruction::Ldc2(index) => with_operand(0x14, index, writer),
            Instruction::ILoad(index) => local(*index, 0x1a, 0x15, writer),
            Instruction::LLoad(index) => local(*index, 0x1e, 0x16, writer),
            Instruction::FLoad(index) => local(*index, 0x22, 0x17, writer),
            Instruction::DLoad(index) => local(*index, 0x26, 0x18, writer),
            Instruction::ALoad(index) => local(*index, 0x2a, 0x19, writer),
            Instruction::IStore(index) => local(*index, 0x3b, 0x36, writer),
            Instruction::LStore(index) => local(*index, 0x3f, 0x37, writer),
            Instruction::FStore(index) => local(*index, 0x43, 0x38, writer),
            Instruction::DStore(index) => local(*index, 0x47, 0x39, writer),
            Instruction::AStore(index) => local(*index, 0x4b, 0x3a, writer),
            Instruction::IInc(index, delta) => {
                match (u8::try_from(*index), i8::try_from(*delta)) {
                    (Ok(index), Ok(delta)) => {
                        0x84u8.serialize(writer)?;
                        index.serialize(writer)?;
                        delta.serialize(writer)
                    }
                    _ => {
                        WIDE.serialize(writer)?;
                        0x84u8.serialize(writer)?;
                        index.serialize(writer)?;
                        delta.serialize(writer)
                    }
                }
            }
            Instruction::GetStatic(index) => with_operand(0xb2, index, writer),
            Instruction::PutStatic(index) => with_operand(0xb3, index, writer),
            Instruction::GetField(index) => with_operand(0xb4, index, writer),
            Instruction::PutField(index) => with_operand(0xb5, index, writer),
            Instruction::Invoke(InvokeType::Virtual, index) => with_operand(0xb6, index, writer),
            Instruction::Invoke(InvokeType::Special, index) => with_operand(0xb7, index, writer),
            Instruction::Invoke(InvokeType::Static, index) => with_operand(0xb8, index, writer),
            Instruction::Invoke(InvokeType::Interface(count), index) => {
                with_operand(0xb9, index, writer)?;
                count.serialize(writer)?;
                0u8.serialize(writer)
            }
            Instruction::InvokeDynamic(index) => {
                with_operand(0xba, index, writer)?;
                0u16.serialize(writer)
            }
            Instruction::New(index) => with_operand(0xbb, index, writer),
            Instruction::NewArray(base_type) => with_operand(0xbc, &base_type.array_code(), writer),
            Instruction::ANewArray(index) => with_operand(0xbd, index, writer),
            Instruction::CheckCast(index) => with_operand(0xc0, index, writer),
            Instruction::InstanceOf(index) => with_operand(0xc1, index, writer),
            Instruction::MultiANewArray(index, dimensions) => {
                with_operand(0xc5, index, writer)?;
                dimensions.serialize(writer)
            }
            other => {
                let msg = format!("no encoding for {:?}", other);
                Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, msg))
            }
        }
    }
}

/// Prefix widening the local index (and `iinc` delta) of the next instruction
pub const WIDE: u8 = 0xc4;

/// Branching JVM bytecode instruction
///
/// Jump targets are abstracted by `Lbl`. In a method body, these are [`super::Label`]s. Shortly
/// before the final serialization step, they are replaced with signed offsets relative to the
/// start of the branch instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BranchInstruction<Lbl> {
    If(OrdComparison, Lbl), // covers `ifeq`, `ifne`, `iflt`, `ifge`, `ifgt`, `ifle`
    IfICmp(OrdComparison, Lbl), // covers `if_icmpeq`, `if_icmpne`, `if_icmplt`, ... `if_icmple`
    IfACmp(EqComparison, Lbl),  // covers `if_acmpeq`, `if_acmpne`
    IfNull(EqComparison, Lbl),  // covers `ifnull`, `ifnonnull`
    Goto(Lbl),                  // covers `goto` and `goto_w`
    Jsr(Lbl),                   // covers `jsr` and `jsr_w`
    Ret(u16),                   // covers `ret` and `wide ret`
    TableSwitch {
        /// Jump target if the argument is less than `low` or greater than
        /// `low + targets.len()`
        default: Lbl,

        /// Value associated with the first jump target
        low: i32,

        /// Jump targets
        targets: Vec<Lbl>,
    },
    LookupSwitch {
        /// Jump target if there is no corresponding key
        default: Lbl,

        /// Jump targets (sorted so that the keys are ascending)
        targets: Vec<(i32, Lbl)>,
    },
    IReturn,
    LReturn,
    FReturn,
    DReturn,
    AReturn,
    Return,
    AThrow,
}

/// First opcode of each family of conditional branches
const IF: u8 = 0x99;
const IF_ICMP: u8 = 0x9f;
const IF_ACMP: u8 = 0xa5;
const IF_NULL: u8 = 0xc6;
const GOTO_W: u8 = 0xc8;

impl<Lbl: Copy> BranchInstruction<Lbl> {
    /// Can execution continue with the next instruction?
    pub fn falls_through(&self) -> bool {
        self.is_conditional() || matches!(self, BranchInstruction::Jsr(_))
    }

    pub fn is_conditional(&self) -> bool {
        self.conditional_opcode().is_some()
    }

    /// Explicit jump targets, in encoding order (a switch's default comes first)
    pub fn jump_targets(&self) -> Vec<Lbl> {
        match self {
            BranchInstruction::If(_, target)
            | BranchInstruction::IfICmp(_, target)
            | BranchInstruction::IfACmp(_, target)
            | BranchInstruction::IfNull(_, target)
            | BranchInstruction::Goto(target)
            | BranchInstruction::Jsr(target) => vec![*target],
            BranchInstruction::TableSwitch {
                default, targets, ..
            } => std::iter::once(default).chain(targets).copied().collect(),
            BranchInstruction::LookupSwitch { default, targets } => std::iter::once(*default)
                .chain(targets.iter().map(|(_, target)| *target))
                .collect(),
            _ => vec![],
        }
    }

    /// Conditional branch with the opposite condition, jumping somewhere else
    pub fn inverted<Lbl2>(&self, target: Lbl2) -> Option<BranchInstruction<Lbl2>> {
        match self {
            BranchInstruction::If(op, _) => Some(BranchInstruction::If(!*op, target)),
            BranchInstruction::IfICmp(op, _) => Some(BranchInstruction::IfICmp(!*op, target)),
            BranchInstruction::IfACmp(op, _) => Some(BranchInstruction::IfACmp(!*op, target)),
            BranchInstruction::IfNull(op, _) => Some(BranchInstruction::IfNull(!*op, target)),
            _ => None,
        }
    }
}

impl<Lbl> BranchInstruction<Lbl> {
    pub fn map_labels<Lbl2, E>(
        &self,
        mut map_label: impl FnMut(&Lbl) -> std::result::Result<Lbl2, E>,
    ) -> std::result::Result<BranchInstruction<Lbl2>, E> {
        use BranchInstruction::*;

        let mapped = match self {
            If(op, target) => If(*op, map_label(target)?),
            IfICmp(op, target) => IfICmp(*op, map_label(target)?),
            IfACmp(op, target) => IfACmp(*op, map_label(target)?),
            IfNull(op, target) => IfNull(*op, map_label(target)?),
            Goto(target) => Goto(map_label(target)?),
            Jsr(target) => Jsr(map_label(target)?),
            TableSwitch {
                default,
                low,
                targets,
            } => TableSwitch {
                default: map_label(default)?,
                low: *low,
                targets: targets.iter().map(&mut map_label).collect::<std::result::Result<_, E>>()?,
            },
            LookupSwitch { default, targets } => {
                let default = map_label(default)?;
                let mut mapped = Vec::with_capacity(targets.len());
                for (key, target) in targets {
                    mapped.push((*key, map_label(target)?));
                }
                LookupSwitch {
                    default,
                    targets: mapped,
                }
            }
            Ret(index) => Ret(*index),
            IReturn => IReturn,
            LReturn => LReturn,
            FReturn => FReturn,
            DReturn => DReturn,
            AReturn => AReturn,
            Return => Return,
            AThrow => AThrow,
        };
        Ok(mapped)
    }

    /// Number of bytes taken by the encoded instruction
    ///
    /// `padding` only matters for switches and `wide` only for jumps. A wide conditional branch is
    /// the inverted branch hopping over a `goto_w`.
    pub fn encoded_width(&self, padding: u8, wide: bool) -> usize {
        let padding = padding as usize;
        match self {
            BranchInstruction::TableSwitch { targets, .. } => 1 + padding + 4 * (3 + targets.len()),
            BranchInstruction::LookupSwitch { targets, .. } => {
                1 + padding + 8 * (1 + targets.len())
            }
            BranchInstruction::Ret(index) if *index > 255 => 4,
            BranchInstruction::Ret(_) => 2,
            BranchInstruction::Goto(_) | BranchInstruction::Jsr(_) => {
                if wide {
                    5
                } else {
                    3
                }
            }
            _ if self.conditional_opcode().is_some() => {
                if wide {
                    3 + 5
                } else {
                    3
                }
            }
            _ => 1,
        }
    }

    fn conditional_opcode(&self) -> Option<u8> {
        match self {
            BranchInstruction::If(op, _) => Some(IF + op.opcode_offset()),
            BranchInstruction::IfICmp(op, _) => Some(IF_ICMP + op.opcode_offset()),
            BranchInstruction::IfACmp(op, _) => Some(IF_ACMP + op.opcode_offset()),
            BranchInstruction::IfNull(op, _) => Some(IF_NULL + op.opcode_offset()),
            _ => None,
        }
    }
}

/// Branch instruction whose targets are resolved to offsets relative to the start of the branch
pub struct EncodedBranch<'a> {
    pub branch: &'a BranchInstruction<i32>,

    /// Switch padding to get the operands 4-byte aligned
    pub padding: u8,

    /// Use the 32-bit offset form
    pub wide: bool,
}

impl<'a> Serialize for EncodedBranch<'a> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        let short_offset = |offset: i32| {
            i16::try_from(offset).map_err(|_| {
                let msg = format!("jump offset {} needs a wide encoding", offset);
                std::io::Error::new(std::io::ErrorKind::InvalidInput, msg)
            })
        };
        let padding = |writer: &mut W| -> Result<()> {
            for _ in 0..self.padding {
                0u8.serialize(writer)?;
            }
            Ok(())
        };

        let branch = self.branch;
        if let Some(opcode) = branch.conditional_opcode() {
            let offset = branch.jump_targets()[0];
            if self.wide {
                let hop = branch
                    .inverted(0)
                    .and_then(|inverted| inverted.conditional_opcode())
                    .unwrap_or(opcode);
                hop.serialize(writer)?;
                8i16.serialize(writer)?;
                GOTO_W.serialize(writer)?;
                return (offset - 3).serialize(writer);
            }
            opcode.serialize(writer)?;
            return short_offset(offset)?.serialize(writer);
        }

        match branch {
            BranchInstruction::Goto(offset) | BranchInstruction::Jsr(offset) => {
                let jsr = matches!(branch, BranchInstruction::Jsr(_)) as u8;
                if self.wide {
                    (GOTO_W + jsr).serialize(writer)?;
                    offset.serialize(writer)
                } else {
                    (0xa7 + jsr).serialize(writer)?;
                    short_offset(*offset)?.serialize(writer)
                }
            }
            BranchInstruction::Ret(index) => match u8::try_from(*index) {
                Ok(narrow) => {
                    0xa9u8.serialize(writer)?;
                    narrow.serialize(writer)
                }
                Err(_) => {
                    WIDE.serialize(writer)?;
                    0xa9u8.serialize(writer)?;
                    index.serialize(writer)
                }
            },
            BranchInstruction::TableSwitch {
                default,
                low,
                targets,
            } => {
                0xaau8.serialize(writer)?;
                padding(writer)?;
                default.serialize(writer)?;
                low.serialize(writer)?;
                (low + targets.len() as i32 - 1).serialize(writer)?;
                targets.iter().try_for_each(|target| target.serialize(writer))
            }
            BranchInstruction::LookupSwitch { default, targets } => {
                0xabu8.serialize(writer)?;
                padding(writer)?;
                default.serialize(writer)?;
                (targets.len() as i32).serialize(writer)?;
                for (key, target) in targets {
                    key.serialize(writer)?;
                    target.serialize(writer)?;
                }
                Ok(())
            }
            BranchInstruction::IReturn => 0xacu8.serialize(writer),
            BranchInstruction::LReturn => 0xadu8.serialize(writer),
            BranchInstruction::FReturn => 0xaeu8.serialize(writer),
            BranchInstruction::DReturn => 0xafu8.serialize(writer),
            BranchInstruction::AReturn => 0xb0u8.serialize(writer),
            BranchInstruction::Return => 0xb1u8.serialize(writer),
            BranchInstruction::AThrow => 0xbfu8.serialize(writer),
            // Handled above
            BranchInstruction::If(_, _)
            | BranchInstruction::IfICmp(_, _)
            | BranchInstruction::IfACmp(_, _)
            | BranchInstruction::IfNull(_, _) => Ok(()),
        }
    }
}

/// Possible bit shifts
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ShiftType {
    Left,
    LogicalRight,
    ArithmeticRight,
}

/// Comparison modes for floating point
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum CompareMode {
    /// -1 on NaN
    L,

    /// 1 on NaN
    G,
}

/// Binary comparison operators available for `int` branches
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OrdComparison {
    EQ,
    GE,
    GT,
    LE,
    LT,
    NE,
}

impl OrdComparison {
    /// Order of the comparisons within the `if<cond>` and `if_icmp<cond>` opcode ranges
    const OPCODE_ORDER: [OrdComparison; 6] = [
        OrdComparison::EQ,
        OrdComparison::NE,
        OrdComparison::LT,
        OrdComparison::GE,
        OrdComparison::GT,
        OrdComparison::LE,
    ];

    pub fn opcode_offset(self) -> u8 {
        match OrdComparison::OPCODE_ORDER.iter().position(|op| *op == self) {
            Some(position) => position as u8,
            None => 0,
        }
    }

    /// Inverse of [`OrdComparison::opcode_offset`]
    pub fn from_opcode_offset(offset: u8) -> Option<OrdComparison> {
        OrdComparison::OPCODE_ORDER.get(offset as usize).copied()
    }
}

impl Not for OrdComparison {
    type Output = Self;

    /// Opposite comparisons sit next to each other in the opcode order
    fn not(self) -> Self::Output {
        OrdComparison::OPCODE_ORDER[(self.opcode_offset() ^ 1) as usize]
    }
}

/// Equality/inequality comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

impl EqComparison {
    pub fn opcode_offset(self) -> u8 {
        match self {
            EqComparison::EQ => 0,
            EqComparison::NE => 1,
        }
    }
}

impl Not for EqComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            EqComparison::EQ => EqComparison::NE,
            EqComparison::NE => EqComparison::EQ,
        }
    }
}

/// Type of method to invoke
///
/// Note: `InvokeDynamic` is kept separate because the constant argument it expects is not to a
/// `Constant::MethodRef`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface(u8), // `count` is of total arguments, where `long`/`double` count for 2
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode(insn: &Instruction) -> Vec<u8> {
        let mut out = vec![];
        insn.serialize(&mut out).unwrap();
        assert_eq!(out.len(), insn.width(), "width of {:?}", insn);
        out
    }

    #[test]
    fn operandless_table() {
        for (opcode, insn) in OPERANDLESS.iter() {
            assert_eq!(encode(insn), vec![*opcode]);
            assert_eq!(Instruction::from_operandless_opcode(*opcode).as_ref(), Some(insn));
        }
        let mut opcodes: Vec<u8> = OPERANDLESS.iter().map(|(opcode, _)| *opcode).collect();
        opcodes.sort_unstable();
        opcodes.dedup();
        assert_eq!(opcodes.len(), OPERANDLESS.len());
        assert_eq!(Instruction::from_operandless_opcode(0x15), None);
    }

    fn encode_branch(branch: &BranchInstruction<i32>, padding: u8, wide: bool) -> Vec<u8> {
        let mut out = vec![];
        EncodedBranch {
            branch,
            padding,
            wide,
        }
        .serialize(&mut out)
        .unwrap();
        assert_eq!(out.len(), branch.encoded_width(padding, wide));
        out
    }

    #[test]
    fn load_store_forms() {
        assert_eq!(encode(&Instruction::ILoad(2)), vec![0x1c]);
        assert_eq!(encode(&Instruction::ALoad(7)), vec![0x19, 7]);
        assert_eq!(encode(&Instruction::DStore(300)), vec![0xc4, 0x39, 1, 44]);
        assert_eq!(encode(&Instruction::IInc(1, 1)), vec![0x84, 1, 1]);
        assert_eq!(encode(&Instruction::IInc(1, 200)), vec![0xc4, 0x84, 0, 1, 0, 200]);
    }

    #[test]
    fn constant_forms() {
        assert_eq!(encode(&Instruction::Ldc(ConstantIndex(5))), vec![0x12, 5]);
        assert_eq!(
            encode(&Instruction::Ldc(ConstantIndex(256))),
            vec![0x13, 1, 0]
        );
        assert_eq!(
            encode(&Instruction::MultiANewArray(
                ClassConstantIndex(ConstantIndex(3)),
                2
            )),
            vec![0xc5, 0, 3, 2]
        );
    }

    #[test]
    fn branch_forms() {
        let ifeq = BranchInstruction::If(OrdComparison::EQ, 10);
        assert_eq!(encode_branch(&ifeq, 0, false), vec![0x99, 0, 10]);
        assert_eq!(
            encode_branch(&ifeq, 0, true),
            vec![0x9a, 0, 8, 0xc8, 0, 0, 0, 7]
        );

        let goto = BranchInstruction::Goto(-40000);
        assert_eq!(
            encode_branch(&goto, 0, true),
            vec![0xc8, 0xff, 0xff, 0x63, 0xc0]
        );

        let switch = BranchInstruction::TableSwitch {
            default: 20,
            low: 1,
            targets: vec![16],
        };
        assert_eq!(
            encode_branch(&switch, 2, false),
            vec![0xaa, 0, 0, 0, 0, 0, 20, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 16]
        );
    }

    #[test]
    fn comparisons_negate() {
        for op in OrdComparison::OPCODE_ORDER {
            assert_ne!(!op, op);
            assert_eq!(!!op, op);
            assert_eq!(OrdComparison::from_opcode_offset(op.opcode_offset()), Some(op));
        }
        assert_eq!(!OrdComparison::LT, OrdComparison::GE);
        assert_eq!(!OrdComparison::GT, OrdComparison::LE);
    }

    #[test]
    fn branch_shape() {
        let branch = BranchInstruction::IfICmp(OrdComparison::LT, 3u32);
        assert!(branch.falls_through());
        assert_eq!(branch.jump_targets(), vec![3]);
        assert_eq!(
            branch.inverted(4u32),
            Some(BranchInstruction::IfICmp(OrdComparison::GE, 4))
        );
        assert!(!BranchInstruction::Goto(1u32).falls_through());
        assert_eq!(BranchInstruction::<u32>::AThrow.inverted(0u32), None);
    }
}
