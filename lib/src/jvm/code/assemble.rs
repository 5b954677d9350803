use super::*;
use crate::jvm::class_file::{
    BytecodeArray, BytecodeIndex, ClassConstantIndex, Code, ConstantIndex, ConstantsPool,
    ExceptionHandler, LineNumber, LineNumberTable, LocalVariableTable, LocalVariableTypeTable,
    Serialize, StackMapFrame, StackMapTable, Version,
};
use crate::jvm::class_file;
use crate::jvm::hierarchy::FrameSupport;
use crate::jvm::verifier::{Analysis, Frame, MethodContext, VerificationType, VerifierFrame};
use crate::jvm::{BinaryName, Error, MethodDescriptor, ParseDescriptor, RefType};
use crate::util::{Offset, Width};
use std::collections::{BTreeSet, HashMap};

/// Placement of every item in the code array
struct Layout {
    /// Offset of each item (markers share the offset of the next instruction)
    pcs: Vec<usize>,

    /// Which branches need their long form
    wide: Vec<bool>,

    label_pcs: HashMap<Label, usize>,
    code_len: usize,
}

impl MethodBody {
    /// Assemble the body back into a `Code` attribute
    ///
    /// Frames are recomputed from scratch so `max_stack`, `max_locals`, and the `StackMapTable`
    /// always match the instructions. Unreachable code is replaced with `athrow` (and cut out of
    /// exception ranges) so that it needs no real frame. Jumps that do not fit in 16 bits get
    /// their wide form.
    pub fn assemble(
        &self,
        method: &MethodContext<'_>,
        constants: &mut ConstantsPool,
        hierarchy: &dyn FrameSupport,
        version: Version,
    ) -> Result<Code, Error> {
        let analysis = Analysis::analyze(self, method, constants, hierarchy)?;
        let (body, analysis) = match self.without_dead_code(&analysis)? {
            Some(body) => {
                log::debug!("Replaced unreachable code in {}.{}", method.class, method.name);
                let analysis = Analysis::analyze(&body, method, constants, hierarchy)?;
                (body, analysis)
            }
            None => (self.clone(), analysis),
        };
        let has_dead_code = body
            .items
            .iter()
            .enumerate()
            .any(|(idx, item)| item.is_instruction() && !analysis.is_reachable(idx));

        let layout = layout(&body.items)?;
        if layout.code_len > u16::MAX as usize {
            return Err(Error::MethodCodeOverflow(Offset(layout.code_len)));
        }
        let label_pc = |label: &Label| -> Result<usize, Error> {
            layout
                .label_pcs
                .get(label)
                .copied()
                .ok_or(Error::UnknownLabel(*label))
        };

        // Code array
        let mut bytes = Vec::with_capacity(layout.code_len);
        for (idx, item) in body.items.iter().enumerate() {
            match item {
                CodeItem::Label(_) | CodeItem::Line(_) => (),
                CodeItem::Instruction(insn) => insn.serialize(&mut bytes)?,
                CodeItem::Branch(branch) => {
                    let pc = layout.pcs[idx];
                    let branch = branch.map_labels(|target| {
                        label_pc(target).map(|target| target as i32 - pc as i32)
                    })?;
                    let encoded = EncodedBranch {
                        branch: &branch,
                        padding: switch_padding(pc),
                        wide: layout.wide[idx],
                    };
                    encoded.serialize(&mut bytes)?;
                }
            }
        }
        debug_assert_eq!(bytes.len(), layout.code_len);

        // Exception table
        let mut exception_table = vec![];
        for handler in &body.handlers {
            let start = label_pc(&handler.start)?;
            let end = label_pc(&handler.end)?;
            if start >= end {
                continue;
            }
            exception_table.push(ExceptionHandler {
                start_pc: BytecodeIndex(start as u16),
                end_pc: BytecodeIndex(end as u16),
                handler_pc: BytecodeIndex(label_pc(&handler.handler)? as u16),
                catch_type: handler
                    .catch_type
                    .unwrap_or(ClassConstantIndex(ConstantIndex(0))),
            });
        }

        // Debug tables
        let mut line_numbers = vec![];
        for (idx, item) in body.items.iter().enumerate() {
            if let CodeItem::Line(line_number) = item {
                let pc = layout.pcs[idx];
                if pc < layout.code_len {
                    line_numbers.push(LineNumber {
                        start_pc: BytecodeIndex(pc as u16),
                        line_number: *line_number,
                    });
                }
            }
        }
        let mut local_variables = vec![];
        let mut local_variable_types = vec![];
        for local in &body.local_variables {
            let start = label_pc(&local.start)?;
            let end = label_pc(&local.end)?.max(start);
            let entry = class_file::LocalVariable {
                start_pc: BytecodeIndex(start as u16),
                length: (end - start) as u16,
                name_index: local.name_index,
                descriptor_index: local.descriptor_index,
                index: local.index,
            };
            match local.kind {
                LocalVariableKind::Descriptor => local_variables.push(entry),
                LocalVariableKind::Signature => local_variable_types.push(entry),
            }
        }

        let mut attributes = vec![];
        if !line_numbers.is_empty() {
            attributes.push(constants.get_attribute(&LineNumberTable(line_numbers))?);
        }
        if !local_variables.is_empty() {
            attributes.push(constants.get_attribute(&LocalVariableTable(local_variables))?);
        }
        if !local_variable_types.is_empty() {
            attributes.push(constants.get_attribute(&LocalVariableTypeTable(local_variable_types))?);
        }
        attributes.extend(body.other_attributes.iter().cloned());

        if version.supports_stack_map_frames() {
            let frames = stack_map_frames(&body, &analysis, &layout, method, constants)?;
            if !frames.is_empty() {
                attributes.push(constants.get_attribute(&StackMapTable(frames))?);
            }
        }

        let max_stack = if has_dead_code {
            analysis.max_stack.max(1)
        } else {
            analysis.max_stack
        };

        Ok(Code {
            max_stack,
            max_locals: analysis.max_locals,
            code_array: BytecodeArray(bytes),
            exception_table,
            attributes,
        })
    }

    /// Copy of the body where every run of unreachable instructions becomes a single `athrow`
    ///
    /// Returns `None` if everything is reachable. The `athrow`s are removed from the exception
    /// ranges covering them, otherwise the frame of the handler would have to be compatible with
    /// the made up frame of the dead code.
    fn without_dead_code(&self, analysis: &Analysis) -> Result<Option<MethodBody>, Error> {
        let has_dead_code = self
            .items
            .iter()
            .enumerate()
            .any(|(idx, item)| item.is_instruction() && !analysis.is_reachable(idx));
        if !has_dead_code {
            return Ok(None);
        }

        let mut body = MethodBody {
            items: Vec::with_capacity(self.items.len()),
            handlers: vec![],
            ..self.clone()
        };
        let mut dead_ranges = vec![];
        let mut in_dead_run = false;
        for (idx, item) in self.items.iter().enumerate() {
            if !item.is_instruction() {
                body.items.push(item.clone());
            } else if analysis.is_reachable(idx) {
                in_dead_run = false;
                body.items.push(item.clone());
            } else if !in_dead_run {
                in_dead_run = true;
                let start = body.fresh_label();
                let end = body.fresh_label();
                body.items.extend([
                    CodeItem::Label(start),
                    CodeItem::Branch(BranchInstruction::AThrow),
                    CodeItem::Label(end),
                ]);
                dead_ranges.push((start, end));
            }
        }

        // Split exception ranges around the dead code
        let positions = body.label_positions();
        let position = |label: &Label| -> Result<usize, Error> {
            positions
                .get(label)
                .copied()
                .ok_or(Error::UnknownLabel(*label))
        };
        for handler in &self.handlers {
            let mut ranges = vec![(handler.start, handler.end)];
            for (dead_start, dead_end) in &dead_ranges {
                let mut split = vec![];
                for (start, end) in ranges {
                    if position(&start)? <= position(dead_start)?
                        && position(dead_end)? <= position(&end)?
                    {
                        split.push((start, *dead_start));
                        split.push((*dead_end, end));
                    } else {
                        split.push((start, end));
                    }
                }
                ranges = split;
            }
            body.handlers.extend(ranges.into_iter().map(|(start, end)| Handler {
                start,
                end,
                ..*handler
            }));
        }

        Ok(Some(body))
    }
}

/// Padding after a switch opcode at `pc` so that its operands start 4-byte aligned
fn switch_padding(pc: usize) -> u8 {
    ((4 - (pc + 1) % 4) % 4) as u8
}

/// Compute offsets, widening jumps until every short jump is in range
///
/// Once a jump is widened it stays wide, so this terminates.
fn layout(items: &[CodeItem]) -> Result<Layout, Error> {
    let mut wide = vec![false; items.len()];
    loop {
        let mut pcs = Vec::with_capacity(items.len());
        let mut label_pcs = HashMap::new();
        let mut pc = 0;
        for (idx, item) in items.iter().enumerate() {
            pcs.push(pc);
            pc += match item {
                CodeItem::Label(label) => {
                    label_pcs.insert(*label, pc);
                    0
                }
                CodeItem::Line(_) => 0,
                CodeItem::Instruction(insn) => insn.width(),
                CodeItem::Branch(branch) => branch.encoded_width(switch_padding(pc), wide[idx]),
            };
        }

        let mut widened = false;
        for (idx, item) in items.iter().enumerate() {
            let branch = match item {
                CodeItem::Branch(branch) if !wide[idx] => branch,
                _ => continue,
            };
            let has_short_form = branch.is_conditional()
                || matches!(branch, BranchInstruction::Goto(_) | BranchInstruction::Jsr(_));
            if !has_short_form {
                continue;
            }
            for target in branch.jump_targets() {
                let target_pc = label_pcs
                    .get(&target)
                    .copied()
                    .ok_or(Error::UnknownLabel(target))?;
                if i16::try_from(target_pc as i64 - pcs[idx] as i64).is_err() {
                    log::trace!("Widening jump to {:?} at offset {}", target, pcs[idx]);
                    wide[idx] = true;
                    widened = true;
                }
            }
        }

        if !widened {
            return Ok(Layout {
                pcs,
                wide,
                label_pcs,
                code_len: pc,
            });
        }
    }
}

/// Stack map frames at every offset where the JVM expects one
///
/// That is: jump targets, exception handlers, instructions right after an unconditional branch
/// (or after the `goto_w` of a widened conditional), and dead code. Dead code gets a frame with
/// no locals and just a `Throwable` on the stack.
fn stack_map_frames(
    body: &MethodBody,
    analysis: &Analysis,
    layout: &Layout,
    method: &MethodContext<'_>,
    constants: &mut ConstantsPool,
) -> Result<Vec<StackMapFrame>, Error> {
    let items = &body.items;
    let positions = body.label_positions();
    let instruction_at = |label: &Label| -> Result<Option<usize>, Error> {
        let pos = positions
            .get(label)
            .copied()
            .ok_or(Error::UnknownLabel(*label))?;
        Ok((pos..items.len()).find(|idx| items[*idx].is_instruction()))
    };

    let mut points: BTreeSet<usize> = BTreeSet::new();
    for (idx, item) in items.iter().enumerate() {
        match item {
            CodeItem::Branch(branch) => {
                for target in branch.jump_targets() {
                    points.extend(instruction_at(&target)?);
                }
                if !branch.falls_through() || layout.wide[idx] {
                    points.extend((idx + 1..items.len()).find(|idx| items[*idx].is_instruction()));
                }
            }
            CodeItem::Instruction(_) if !analysis.is_reachable(idx) => {
                points.insert(idx);
            }
            _ => (),
        }
    }
    for handler in &body.handlers {
        let start = layout.label_pcs.get(&handler.start);
        let end = layout.label_pcs.get(&handler.end);
        if start < end {
            points.extend(instruction_at(&handler.handler)?);
        }
    }

    let new_offset = |label: &Label| -> Result<u16, Error> {
        layout
            .label_pcs
            .get(label)
            .map(|pc| *pc as u16)
            .ok_or(Error::UnknownLabel(*label))
    };
    let dead_frame: VerifierFrame = Frame {
        locals: vec![],
        stack: std::iter::once(VerificationType::Object(RefType::Object(
            BinaryName::THROWABLE,
        )))
        .collect(),
    };

    let descriptor = MethodDescriptor::parse(method.descriptor).map_err(Error::BadDescriptor)?;
    let mut previous_frame =
        VerifierFrame::initial(method.class, method.name, &descriptor, method.is_static)
            .into_serializable(constants, &new_offset)?;
    let mut previous_pc: Option<usize> = None;
    let mut stack_map_frames = vec![];
    for idx in points {
        let frame = analysis.frames[idx].as_ref().unwrap_or(&dead_frame);
        let frame = frame.into_serializable(constants, &new_offset)?;
        let pc = layout.pcs[idx];
        let offset_delta = match previous_pc {
            None => pc,
            Some(previous_pc) => pc - previous_pc - 1,
        };
        stack_map_frames.push(frame.stack_map_frame(offset_delta as u16, &previous_frame));
        previous_frame = frame;
        previous_pc = Some(pc);
    }
    Ok(stack_map_frames)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::hierarchy::CachingFrameSupport;
    use crate::source::MapSource;

    fn body(items: Vec<CodeItem>, labels: LabelGenerator) -> MethodBody {
        MethodBody {
            items,
            handlers: vec![],
            local_variables: vec![],
            max_stack: 0,
            max_locals: 0,
            other_attributes: vec![],
            labels,
        }
    }

    fn assemble(body: &MethodBody, descriptor: &str, version: Version) -> (Code, ConstantsPool) {
        let class = BinaryName::from("me/Test");
        let method = MethodContext {
            class: &class,
            name: "test",
            descriptor,
            is_static: true,
        };
        let mut constants = ConstantsPool::new();
        let hierarchy = CachingFrameSupport::new(MapSource::new());
        let code = body
            .assemble(&method, &mut constants, &hierarchy, version)
            .unwrap();
        (code, constants)
    }

    #[test]
    fn conditional_with_frame() {
        let mut labels = LabelGenerator::new();
        let start = labels.fresh_label();
        let zero = labels.fresh_label();
        let end = labels.fresh_label();
        let body = body(
            vec![
                CodeItem::Label(start),
                CodeItem::Instruction(Instruction::ILoad(0)),
                CodeItem::Branch(BranchInstruction::If(OrdComparison::EQ, zero)),
                CodeItem::Instruction(Instruction::IConst1),
                CodeItem::Branch(BranchInstruction::IReturn),
                CodeItem::Label(zero),
                CodeItem::Instruction(Instruction::IConst0),
                CodeItem::Branch(BranchInstruction::IReturn),
                CodeItem::Label(end),
            ],
            labels,
        );

        let (code, mut constants) = assemble(&body, "(I)I", Version::JAVA8);
        assert_eq!(
            code.code_array.0,
            vec![0x1a, 0x99, 0, 5, 0x04, 0xac, 0x03, 0xac]
        );
        assert_eq!(code.max_stack, 1);
        assert_eq!(code.max_locals, 1);
        let expected = StackMapTable(vec![StackMapFrame::SameLocalsNoStack { offset_delta: 6 }]);
        assert_eq!(
            code.attributes,
            vec![constants.get_attribute(&expected).unwrap()]
        );

        let (old_code, _) = assemble(&body, "(I)I", Version { major_version: 49, minor_version: 0 });
        assert_eq!(old_code.code_array, code.code_array);
        assert!(old_code.attributes.is_empty());
    }

    #[test]
    fn dead_code_becomes_athrow() {
        let mut labels = LabelGenerator::new();
        let end = labels.fresh_label();
        let body = body(
            vec![
                CodeItem::Branch(BranchInstruction::Return),
                CodeItem::Instruction(Instruction::IConst1),
                CodeItem::Instruction(Instruction::Pop),
                CodeItem::Branch(BranchInstruction::Return),
                CodeItem::Label(end),
            ],
            labels,
        );

        let (code, mut constants) = assemble(&body, "()V", Version::JAVA8);
        assert_eq!(code.code_array.0, vec![0xb1, 0xbf]);
        assert_eq!(code.max_stack, 1);
        let throwable = constants
            .get_class(&RefType::Object(BinaryName::THROWABLE))
            .unwrap();
        let expected = StackMapTable(vec![StackMapFrame::SameLocalsOneStack {
            offset_delta: 1,
            stack: VerificationType::Object(throwable),
        }]);
        assert_eq!(
            code.attributes,
            vec![constants.get_attribute(&expected).unwrap()]
        );
    }

    #[test]
    fn far_conditional_is_widened() {
        let mut labels = LabelGenerator::new();
        let far = labels.fresh_label();
        let end = labels.fresh_label();
        let mut items = vec![
            CodeItem::Instruction(Instruction::ILoad(0)),
            CodeItem::Branch(BranchInstruction::If(OrdComparison::EQ, far)),
        ];
        items.extend((0..40000).map(|_| CodeItem::Instruction(Instruction::Nop)));
        items.extend([
            CodeItem::Label(far),
            CodeItem::Branch(BranchInstruction::Return),
            CodeItem::Label(end),
        ]);
        let body = body(items, labels);

        let (code, _) = assemble(&body, "(I)V", Version::JAVA8);
        let bytes = &code.code_array.0;
        assert_eq!(bytes.len(), 40010);
        assert_eq!(&bytes[..9], &[0x1a, 0x9a, 0, 8, 0xc8, 0, 0, 0x9c, 0x45]);
        assert_eq!(bytes[40009], 0xb1);
    }

    #[test]
    fn handlers_and_lines() {
        let mut labels = LabelGenerator::new();
        let start = labels.fresh_label();
        let end = labels.fresh_label();
        let handler = labels.fresh_label();
        let last = labels.fresh_label();
        let mut body = body(
            vec![
                CodeItem::Label(start),
                CodeItem::Line(7),
                CodeItem::Instruction(Instruction::IConst0),
                CodeItem::Instruction(Instruction::Pop),
                CodeItem::Label(end),
                CodeItem::Branch(BranchInstruction::Return),
                CodeItem::Label(handler),
                CodeItem::Instruction(Instruction::Pop),
                CodeItem::Branch(BranchInstruction::Return),
                CodeItem::Label(last),
            ],
            labels,
        );
        body.handlers.push(Handler {
            start,
            end,
            handler,
            catch_type: None,
        });

        let (code, mut constants) = assemble(&body, "()V", Version::JAVA8);
        assert_eq!(code.code_array.0, vec![0x03, 0x57, 0xb1, 0x57, 0xb1]);
        assert_eq!(
            code.exception_table,
            vec![ExceptionHandler {
                start_pc: BytecodeIndex(0),
                end_pc: BytecodeIndex(2),
                handler_pc: BytecodeIndex(3),
                catch_type: ClassConstantIndex(ConstantIndex(0)),
            }]
        );
        let lines = LineNumberTable(vec![LineNumber {
            start_pc: BytecodeIndex(0),
            line_number: 7,
        }]);
        assert_eq!(code.attributes[0], constants.get_attribute(&lines).unwrap());
        assert_eq!(code.attributes.len(), 2);
    }

    #[test]
    fn unplaced_label_is_an_error() {
        let mut labels = LabelGenerator::new();
        let nowhere = labels.fresh_label();
        let body = body(
            vec![
                CodeItem::Branch(BranchInstruction::Goto(nowhere)),
            ],
            labels,
        );
        let class = BinaryName::from("me/Test");
        let method = MethodContext {
            class: &class,
            name: "test",
            descriptor: "()V",
            is_static: true,
        };
        let hierarchy = CachingFrameSupport::new(MapSource::new());
        let result = body.assemble(&method, &mut ConstantsPool::new(), &hierarchy, Version::JAVA8);
        assert!(matches!(result, Err(Error::UnknownLabel(label)) if label == nowhere));
    }
}
