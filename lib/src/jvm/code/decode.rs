use super::*;
use crate::jvm::class_file::{
    AttributeLike, ClassConstantIndex, Code, ConstantIndex, ConstantsPool, Deserialize,
    FieldRefConstantIndex, InvokeDynamicConstantIndex, LineNumberTable, LocalVariableTable,
    LocalVariableTypeTable, MethodRefConstantIndex, StackMapTable,
};
use crate::jvm::{BaseType, Error};
use crate::util::Offset;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Error as IoError, ErrorKind, Result as IoResult};

/// Instruction decoded from the code array, with branch targets as absolute offsets
enum Decoded {
    Instruction(Instruction),
    Branch(BranchInstruction<i64>),
}

const RUNTIME_VISIBLE_TYPE_ANNOTATIONS: &str = "RuntimeVisibleTypeAnnotations";
const RUNTIME_INVISIBLE_TYPE_ANNOTATIONS: &str = "RuntimeInvisibleTypeAnnotations";

impl MethodBody {
    /// Decode a `Code` attribute into an editable body
    ///
    /// Labels are placed at every branch target, exception range boundary, line number entry,
    /// local variable range boundary, the end of the code, and right before every `new`.
    /// Stack map frames are dropped (they get recomputed when assembling) and so are type
    /// annotations (their offsets cannot be kept accurate). Other attributes are kept as is.
    pub fn decode(code: &Code, constants: &ConstantsPool) -> Result<MethodBody, Error> {
        let bytes = &code.code_array.0;
        if bytes.is_empty() {
            return Err(Error::MalformedClass(String::from("empty code array")));
        }

        // Raw pass
        let mut decoded: Vec<(usize, Decoded)> = vec![];
        let mut pc = 0;
        while pc < bytes.len() {
            let (insn, len) = decode_instruction(bytes, pc)?;
            decoded.push((pc, insn));
            pc += len;
        }
        let code_end = bytes.len();
        let starts: BTreeSet<usize> = decoded.iter().map(|(pc, _)| *pc).collect();
        let is_start = |pc: i64| pc >= 0 && starts.contains(&(pc as usize));
        let is_boundary = |pc: i64| is_start(pc) || pc == code_end as i64;

        // Find every offset that needs a label
        let mut label_pcs: BTreeSet<usize> = BTreeSet::new();
        label_pcs.insert(code_end);
        for (pc, insn) in &decoded {
            match insn {
                Decoded::Branch(branch) => {
                    for target in branch.jump_targets() {
                        if !is_start(target) {
                            return Err(Error::MalformedClass(format!(
                                "branch at {} targets {}, which is not an instruction",
                                pc, target
                            )));
                        }
                        label_pcs.insert(target as usize);
                    }
                }
                Decoded::Instruction(Instruction::New(_)) => {
                    label_pcs.insert(*pc);
                }
                Decoded::Instruction(_) => (),
            }
        }

        for handler in &code.exception_table {
            let start = handler.start_pc.0 as i64;
            let end = handler.end_pc.0 as i64;
            let handler_pc = handler.handler_pc.0 as i64;
            if !is_start(start) || !is_boundary(end) || start >= end || !is_start(handler_pc) {
                return Err(Error::MalformedClass(format!(
                    "invalid exception handler {:?}",
                    handler
                )));
            }
            label_pcs.extend([start as usize, end as usize, handler_pc as usize]);
        }

        // Debug attributes
        let mut lines: BTreeMap<usize, Vec<u16>> = BTreeMap::new();
        let mut raw_locals = vec![];
        let mut other_attributes = vec![];
        for attribute in &code.attributes {
            let name = attribute.name(constants)?;
            if name == LineNumberTable::NAME {
                let table: LineNumberTable = attribute.decode()?;
                for entry in table.0 {
                    if is_start(entry.start_pc.0 as i64) {
                        let pc = entry.start_pc.0 as usize;
                        label_pcs.insert(pc);
                        lines.entry(pc).or_default().push(entry.line_number);
                    } else {
                        log::debug!("Dropping line number entry at invalid offset {:?}", entry);
                    }
                }
            } else if name == LocalVariableTable::NAME {
                let table: LocalVariableTable = attribute.decode()?;
                raw_locals.extend(table.0.into_iter().map(|l| (l, LocalVariableKind::Descriptor)));
            } else if name == LocalVariableTypeTable::NAME {
                let table: LocalVariableTypeTable = attribute.decode()?;
                raw_locals.extend(table.0.into_iter().map(|l| (l, LocalVariableKind::Signature)));
            } else if name == StackMapTable::NAME
                || name == RUNTIME_VISIBLE_TYPE_ANNOTATIONS
                || name == RUNTIME_INVISIBLE_TYPE_ANNOTATIONS
            {
                log::trace!("Dropping {} attribute", name);
            } else {
                other_attributes.push(attribute.clone());
            }
        }

        let mut kept_locals = vec![];
        for (local, kind) in raw_locals {
            let start = local.start_pc.0 as i64;
            let end = start + local.length as i64;
            if is_start(start) && is_boundary(end) {
                label_pcs.extend([start as usize, end as usize]);
                kept_locals.push((local, kind));
            } else {
                log::debug!("Dropping local variable entry with invalid range {:?}", local);
            }
        }

        // Assign labels in offset order
        let mut labels = LabelGenerator::new();
        let pc_labels: HashMap<usize, Label> = label_pcs
            .iter()
            .map(|pc| (*pc, labels.fresh_label()))
            .collect();
        let label_at = |pc: i64| -> Result<Label, Error> {
            usize::try_from(pc)
                .ok()
                .and_then(|pc| pc_labels.get(&pc).copied())
                .ok_or_else(|| Error::MalformedClass(format!("no label at offset {}", pc)))
        };

        let mut items = vec![];
        for (pc, insn) in decoded {
            if let Some(label) = pc_labels.get(&pc) {
                items.push(CodeItem::Label(*label));
            }
            if let Some(line_numbers) = lines.get(&pc) {
                items.extend(line_numbers.iter().map(|line| CodeItem::Line(*line)));
            }
            items.push(match insn {
                Decoded::Instruction(insn) => CodeItem::Instruction(insn),
                Decoded::Branch(branch) => {
                    CodeItem::Branch(branch.map_labels(|target| label_at(*target))?)
                }
            });
        }
        items.push(CodeItem::Label(label_at(code_end as i64)?));

        let handlers = code
            .exception_table
            .iter()
            .map(|handler| {
                Ok(Handler {
                    start: label_at(handler.start_pc.0 as i64)?,
                    end: label_at(handler.end_pc.0 as i64)?,
                    handler: label_at(handler.handler_pc.0 as i64)?,
                    catch_type: match handler.catch_type {
                        ClassConstantIndex(ConstantIndex(0)) => None,
                        catch_type => Some(catch_type),
                    },
                })
            })
            .collect::<Result<_, Error>>()?;

        let local_variables = kept_locals
            .into_iter()
            .map(|(local, kind)| {
                let start = local.start_pc.0 as i64;
                Ok(LocalVariable {
                    start: label_at(start)?,
                    end: label_at(start + local.length as i64)?,
                    name_index: local.name_index,
                    descriptor_index: local.descriptor_index,
                    index: local.index,
                    kind,
                })
            })
            .collect::<Result<_, Error>>()?;

        Ok(MethodBody {
            items,
            handlers,
            local_variables,
            max_stack: code.max_stack,
            max_locals: code.max_locals,
            other_attributes,
            labels,
        })
    }
}

fn load(kind: u8, index: u16) -> Instruction {
    match kind {
        0 => Instruction::ILoad(index),
        1 => Instruction::LLoad(index),
        2 => Instruction::FLoad(index),
        3 => Instruction::DLoad(index),
        _ => Instruction::ALoad(index),
    }
}

fn store(kind: u8, index: u16) -> Instruction {
    match kind {
        0 => Instruction::IStore(index),
        1 => Instruction::LStore(index),
        2 => Instruction::FStore(index),
        3 => Instruction::DStore(index),
        _ => Instruction::AStore(index),
    }
}

fn ord_comparison(offset_from_base: u8) -> OrdComparison {
    OrdComparison::from_opcode_offset(offset_from_base).unwrap_or(OrdComparison::LE)
}

/// Decode the instruction starting at `pc`, returning it along with its length
fn decode_instruction(code: &[u8], pc: usize) -> Result<(Decoded, usize), Error> {
    let mut reader: &[u8] = &code[pc..];
    let opcode = code[pc];
    match decode_operands(&mut reader, pc) {
        Ok(Some(decoded)) => Ok((decoded, code.len() - pc - reader.len())),
        Ok(None) => Err(Error::BadOpcode {
            opcode,
            offset: Offset(pc),
        }),
        Err(err) => Err(Error::MalformedClass(format!(
            "cannot decode instruction at {}: {}",
            pc, err
        ))),
    }
}

fn decode_operands(reader: &mut &[u8], pc: usize) -> IoResult<Option<Decoded>> {
    use Instruction::*;

    let opcode = u8::deserialize(reader)?;
    if let Some(insn) = Instruction::from_operandless_opcode(opcode) {
        return Ok(Some(Decoded::Instruction(insn)));
    }
    let insn = match opcode {
        0x10 => BiPush(i8::deserialize(reader)?),
        0x11 => SiPush(i16::deserialize(reader)?),
        0x12 => Ldc(ConstantIndex(u8::deserialize(reader)? as u16)),
        0x13 => Ldc(ConstantIndex::deserialize(reader)?),
        0x14 => Ldc2(ConstantIndex::deserialize(reader)?),
        0x15..=0x19 => load(opcode - 0x15, u8::deserialize(reader)? as u16),
        0x1a..=0x2d => load((opcode - 0x1a) / 4, ((opcode - 0x1a) % 4) as u16),
        0x36..=0x3a => store(opcode - 0x36, u8::deserialize(reader)? as u16),
        0x3b..=0x4e => store((opcode - 0x3b) / 4, ((opcode - 0x3b) % 4) as u16),
        0x84 => IInc(
            u8::deserialize(reader)? as u16,
            i8::deserialize(reader)? as i16,
        ),

        0x99..=0xab | 0xac..=0xb1 | 0xbf | 0xc6..=0xc9 => {
            return decode_branch(opcode, reader, pc).map(|b| Some(Decoded::Branch(b)))
        }

        0xb2 => GetStatic(FieldRefConstantIndex::deserialize(reader)?),
        0xb3 => PutStatic(FieldRefConstantIndex::deserialize(reader)?),
        0xb4 => GetField(FieldRefConstantIndex::deserialize(reader)?),
        0xb5 => PutField(FieldRefConstantIndex::deserialize(reader)?),
        0xb6 => Invoke(
            InvokeType::Virtual,
            MethodRefConstantIndex::deserialize(reader)?,
        ),
        0xb7 => Invoke(
            InvokeType::Special,
            MethodRefConstantIndex::deserialize(reader)?,
        ),
        0xb8 => Invoke(
            InvokeType::Static,
            MethodRefConstantIndex::deserialize(reader)?,
        ),
        0xb9 => {
            let index = MethodRefConstantIndex::deserialize(reader)?;
            let count = u8::deserialize(reader)?;
            let _zero = u8::deserialize(reader)?;
            Invoke(InvokeType::Interface(count), index)
        }
        0xba => {
            let index = InvokeDynamicConstantIndex::deserialize(reader)?;
            let _zero = u16::deserialize(reader)?;
            InvokeDynamic(index)
        }
        0xbb => New(ClassConstantIndex::deserialize(reader)?),
        0xbc => {
            let code = u8::deserialize(reader)?;
            let base_type = BaseType::from_array_code(code).ok_or_else(|| {
                let msg = format!("invalid newarray type {}", code);
                IoError::new(ErrorKind::InvalidData, msg)
            })?;
            NewArray(base_type)
        }
        0xbd => ANewArray(ClassConstantIndex::deserialize(reader)?),
        0xc0 => CheckCast(ClassConstantIndex::deserialize(reader)?),
        0xc1 => InstanceOf(ClassConstantIndex::deserialize(reader)?),
        WIDE => {
            let modified = u8::deserialize(reader)?;
            match modified {
                0x15..=0x19 => load(modified - 0x15, u16::deserialize(reader)?),
                0x36..=0x3a => store(modified - 0x36, u16::deserialize(reader)?),
                0x84 => IInc(u16::deserialize(reader)?, i16::deserialize(reader)?),
                0xa9 => {
                    let index = u16::deserialize(reader)?;
                    return Ok(Some(Decoded::Branch(BranchInstruction::Ret(index))));
                }
                other => {
                    let msg = format!("opcode 0x{:02x} cannot be wide", other);
                    return Err(IoError::new(ErrorKind::InvalidData, msg));
                }
            }
        }
        0xc5 => MultiANewArray(
            ClassConstantIndex::deserialize(reader)?,
            u8::deserialize(reader)?,
        ),
        _ => return Ok(None),
    };
    Ok(Some(Decoded::Instruction(insn)))
}

fn decode_branch(opcode: u8, reader: &mut &[u8], pc: usize) -> IoResult<BranchInstruction<i64>> {
    use BranchInstruction::*;

    let jump = |offset: i64| pc as i64 + offset;
    let short_target = |reader: &mut &[u8]| -> IoResult<i64> {
        Ok(jump(i16::deserialize(reader)? as i64))
    };

    let branch = match opcode {
        0x99..=0x9e => If(ord_comparison(opcode - 0x99), short_target(reader)?),
        0x9f..=0xa4 => IfICmp(ord_comparison(opcode - 0x9f), short_target(reader)?),
        0xa5 => IfACmp(EqComparison::EQ, short_target(reader)?),
        0xa6 => IfACmp(EqComparison::NE, short_target(reader)?),
        0xa7 => Goto(short_target(reader)?),
        0xa8 => Jsr(short_target(reader)?),
        0xa9 => Ret(u8::deserialize(reader)? as u16),
        0xaa | 0xab => {
            let padding = (4 - (pc + 1) % 4) % 4;
            for _ in 0..padding {
                let _ = u8::deserialize(reader)?;
            }
            let default = jump(i32::deserialize(reader)? as i64);
            if opcode == 0xaa {
                let low = i32::deserialize(reader)?;
                let high = i32::deserialize(reader)?;
                let count = high as i64 - low as i64 + 1;
                if count < 0 || count as usize > reader.len() / 4 {
                    let msg = format!("invalid tableswitch range {}..={}", low, high);
                    return Err(IoError::new(ErrorKind::InvalidData, msg));
                }
                let targets = (0..count)
                    .map(|_| Ok(jump(i32::deserialize(reader)? as i64)))
                    .collect::<IoResult<_>>()?;
                TableSwitch {
                    default,
                    low,
                    targets,
                }
            } else {
                let count = i32::deserialize(reader)?;
                if count < 0 || count as usize > reader.len() / 8 {
                    let msg = format!("invalid lookupswitch size {}", count);
                    return Err(IoError::new(ErrorKind::InvalidData, msg));
                }
                let targets = (0..count)
                    .map(|_| {
                        let key = i32::deserialize(reader)?;
                        Ok((key, jump(i32::deserialize(reader)? as i64)))
                    })
                    .collect::<IoResult<_>>()?;
                LookupSwitch { default, targets }
            }
        }
        0xac => IReturn,
        0xad => LReturn,
        0xae => FReturn,
        0xaf => DReturn,
        0xb0 => AReturn,
        0xb1 => Return,
        0xbf => AThrow,
        0xc6 => IfNull(EqComparison::EQ, short_target(reader)?),
        0xc7 => IfNull(EqComparison::NE, short_target(reader)?),
        0xc8 => Goto(jump(i32::deserialize(reader)? as i64)),
        _ => Jsr(jump(i32::deserialize(reader)? as i64)),
    };
    Ok(branch)
}
