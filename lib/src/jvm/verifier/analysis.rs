use super::*;
use crate::jvm::class_file::ConstantsPool;
use crate::jvm::code::{CodeItem, Instruction, Label, MethodBody};
use crate::jvm::hierarchy::{common_super_class, FrameSupport};
use crate::jvm::{
    ArrayType, BinaryName, Error, MethodDescriptor, ParseDescriptor, RefType, VerifierErrorKind,
};
use crate::util::{Offset, OffsetVec};
use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;

/// Method whose body is being analyzed
#[derive(Clone, Copy, Debug)]
pub struct MethodContext<'a> {
    /// Class declaring the method
    pub class: &'a BinaryName,
    pub name: &'a str,
    pub descriptor: &'a str,
    pub is_static: bool,
}

/// Result of running the type inference over a method body
#[derive(Debug)]
pub struct Analysis {
    /// Frame on entry to each item in the body (`None` if the item is unreachable)
    pub frames: Vec<Option<VerifierFrame>>,

    pub max_stack: u16,
    pub max_locals: u16,
}

impl Analysis {
    /// Run the analysis to a fixpoint
    ///
    /// Frames flow along fallthrough edges, jumps, and exception edges. Where two frames meet,
    /// their types are merged: locals that cannot be merged become `Top` while a stack that cannot
    /// be merged is an error.
    pub fn analyze(
        body: &MethodBody,
        method: &MethodContext<'_>,
        constants: &ConstantsPool,
        hierarchy: &dyn FrameSupport,
    ) -> Result<Analysis, Error> {
        let descriptor =
            MethodDescriptor::parse(method.descriptor).map_err(Error::BadDescriptor)?;
        let items = &body.items;
        let positions = body.label_positions();
        let position = |label: &Label| -> Result<usize, Error> {
            positions
                .get(label)
                .copied()
                .ok_or(Error::UnknownLabel(*label))
        };

        // Exception edges
        let mut handlers = vec![];
        for handler in &body.handlers {
            let catch_type = match handler.catch_type {
                Some(index) => VerificationType::Object(constants.class_type(index)?),
                None => VerificationType::Object(RefType::Object(BinaryName::THROWABLE)),
            };
            handlers.push((
                position(&handler.start)?,
                position(&handler.end)?,
                position(&handler.handler)?,
                catch_type,
            ));
        }

        // Labels right before each instruction, and which class each `new` creates
        let mut new_labels: Vec<Option<Label>> = vec![None; items.len()];
        let mut uninitialized = HashMap::new();
        let mut pending_label = None;
        for (idx, item) in items.iter().enumerate() {
            match item {
                CodeItem::Label(label) => pending_label = Some(*label),
                CodeItem::Line(_) => (),
                CodeItem::Instruction(insn) => {
                    new_labels[idx] = pending_label.take();
                    if let (Instruction::New(class), Some(label)) = (insn, new_labels[idx]) {
                        uninitialized.insert(label, constants.class_type(*class)?);
                    }
                }
                CodeItem::Branch(_) => pending_label = None,
            }
        }

        let context = FrameContext {
            constants,
            this_class: method.class,
            return_type: descriptor.return_type.as_ref(),
            uninitialized: &uninitialized,
        };

        let mut frames: Vec<Option<VerifierFrame>> = vec![None; items.len()];
        let mut worklist: BTreeSet<usize> = BTreeSet::new();
        let mut max_stack = 0;
        let mut max_locals = 0;

        let initial = VerifierFrame::initial(method.class, method.name, &descriptor, method.is_static);
        propagate(items, &mut frames, &mut worklist, 0, initial, hierarchy)?;

        while let Some(idx) = worklist.iter().next().copied() {
            worklist.remove(&idx);
            let frame = match &frames[idx] {
                Some(frame) => frame.clone(),
                None => continue,
            };
            max_stack = max_stack.max(frame.stack.offset_len().0);
            max_locals = max_locals.max(frame.locals_len());

            let item = &items[idx];
            let verifier_error = |kind: VerifierErrorKind| Error::VerifierError {
                instruction: format!("{:?} (item {})", item, idx),
                kind,
            };

            let mut next = frame.clone();
            match item {
                CodeItem::Label(_) | CodeItem::Line(_) => (),
                CodeItem::Instruction(insn) => {
                    next.verify_instruction(insn, new_labels[idx], &context)
                        .map_err(verifier_error)?;
                }
                CodeItem::Branch(branch) => {
                    next.verify_branch_instruction(branch, &context)
                        .map_err(verifier_error)?;
                }
            }
            max_stack = max_stack.max(next.stack.offset_len().0);
            max_locals = max_locals.max(next.locals_len());

            // Any instruction in a protected range can jump to the handler, both before and after
            // it updates the locals
            if item.is_instruction() {
                for (start, end, handler, catch_type) in &handlers {
                    if *start <= idx && idx < *end {
                        for locals in [&frame.locals, &next.locals] {
                            let handler_frame = Frame {
                                locals: locals.clone(),
                                stack: std::iter::once(catch_type.clone()).collect(),
                            };
                            max_stack = max_stack.max(1);
                            propagate(items, &mut frames, &mut worklist, *handler, handler_frame, hierarchy)?;
                        }
                    }
                }
            }

            let falls_through = match item {
                CodeItem::Branch(branch) => {
                    for target in branch.jump_targets() {
                        let target = position(&target)?;
                        propagate(items, &mut frames, &mut worklist, target, next.clone(), hierarchy)?;
                    }
                    branch.falls_through()
                }
                _ => true,
            };
            if falls_through {
                if idx + 1 >= items.len() {
                    return Err(verifier_error(VerifierErrorKind::FallsOffEnd));
                }
                propagate(items, &mut frames, &mut worklist, idx + 1, next, hierarchy)?;
            }
        }

        // Debug information can mention locals that are never touched by the code
        for local in &body.local_variables {
            let descriptor = constants.utf8(local.descriptor_index)?;
            let width = match descriptor.chars().next() {
                Some('J' | 'D') => 2,
                _ => 1,
            };
            max_locals = max_locals.max(local.index as usize + width);
        }
        max_locals = max_locals.max(body.max_locals as usize);

        Ok(Analysis {
            frames,
            max_stack: u16::try_from(max_stack)
                .map_err(|_| Error::MethodCodeMaxStackOverflow(Offset(max_stack)))?,
            max_locals: u16::try_from(max_locals)
                .map_err(|_| Error::MethodCodeMaxLocalsOverflow(Offset(max_locals)))?,
        })
    }

    /// Can execution reach this item?
    pub fn is_reachable(&self, idx: usize) -> bool {
        matches!(self.frames.get(idx), Some(Some(_)))
    }
}

/// Merge an incoming frame into the frame for `idx`, queueing it up if anything changed
fn propagate(
    items: &[CodeItem],
    frames: &mut [Option<VerifierFrame>],
    worklist: &mut BTreeSet<usize>,
    idx: usize,
    incoming: VerifierFrame,
    hierarchy: &dyn FrameSupport,
) -> Result<(), Error> {
    let merged = match &frames[idx] {
        None => incoming,
        Some(existing) => match merge_frames(existing, &incoming, hierarchy)? {
            Some(merged) if merged == *existing => return Ok(()),
            Some(merged) => merged,
            None => {
                let label = items[..=idx].iter().rev().find_map(|item| match item {
                    CodeItem::Label(label) => Some(*label),
                    _ => None,
                });
                return Err(Error::ConflictingFrames(
                    label,
                    existing.describe(),
                    incoming.describe(),
                ));
            }
        },
    };
    frames[idx] = Some(merged);
    worklist.insert(idx);
    Ok(())
}

/// Merge two frames, or `None` if their stacks are incompatible
fn merge_frames(
    frame1: &VerifierFrame,
    frame2: &VerifierFrame,
    hierarchy: &dyn FrameSupport,
) -> Result<Option<VerifierFrame>, Error> {
    if frame1.stack.len() != frame2.stack.len() {
        return Ok(None);
    }

    let mut stack = OffsetVec::new();
    for ((_, _, t1), (_, _, t2)) in frame1.stack.iter().zip(frame2.stack.iter()) {
        match merge_types(t1, t2, hierarchy)? {
            Some(merged) => {
                stack.push(merged);
            }
            None => return Ok(None),
        }
    }

    let len = frame1.locals.len().max(frame2.locals.len());
    let mut locals = Vec::with_capacity(len);
    for slot in 0..len {
        let t1 = frame1.locals.get(slot).unwrap_or(&VerificationType::Top);
        let t2 = frame2.locals.get(slot).unwrap_or(&VerificationType::Top);
        locals.push(merge_types(t1, t2, hierarchy)?.unwrap_or(VerificationType::Top));
    }

    Ok(Some(Frame { locals, stack }))
}

/// Least upper bound of two verification types, or `None` if there isn't one
pub fn merge_types(
    type1: &VType,
    type2: &VType,
    hierarchy: &dyn FrameSupport,
) -> Result<Option<VType>, Error> {
    use VerificationType::*;

    Ok(match (type1, type2) {
        _ if type1 == type2 => Some(type1.clone()),
        (Null, Object(_)) => Some(type2.clone()),
        (Object(_), Null) => Some(type1.clone()),
        (Object(ref1), Object(ref2)) => Some(Object(merge_ref_types(ref1, ref2, hierarchy)?)),
        _ => None,
    })
}

fn merge_ref_types(
    ref1: &RefType<BinaryName>,
    ref2: &RefType<BinaryName>,
    hierarchy: &dyn FrameSupport,
) -> Result<RefType<BinaryName>, Error> {
    Ok(match (ref1, ref2) {
        (RefType::Object(class1), RefType::Object(class2)) => {
            RefType::Object(common_super_class(hierarchy, class1, class2)?)
        }
        (RefType::ObjectArray(arr1), RefType::ObjectArray(arr2))
            if arr1.additional_dimensions == arr2.additional_dimensions =>
        {
            RefType::ObjectArray(ArrayType {
                additional_dimensions: arr1.additional_dimensions,
                element_type: common_super_class(hierarchy, &arr1.element_type, &arr2.element_type)?,
            })
        }
        _ => RefType::Object(BinaryName::OBJECT),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::hierarchy::CachingFrameSupport;
    use crate::source::MapSource;
    use VerificationType::*;

    fn object(name: &'static str) -> VType {
        Object(RefType::Object(BinaryName::from(name)))
    }

    #[test]
    fn merging_types() {
        let hierarchy = CachingFrameSupport::new(MapSource::new());
        let merge = |t1: &VType, t2: &VType| merge_types(t1, t2, &hierarchy).unwrap();

        assert_eq!(merge(&Integer, &Integer), Some(Integer));
        assert_eq!(merge(&Integer, &Float), None);
        assert_eq!(merge(&Null, &object("java/lang/String")), Some(object("java/lang/String")));
        assert_eq!(
            merge(
                &object("java/lang/NullPointerException"),
                &object("java/lang/ArithmeticException")
            ),
            Some(object("java/lang/RuntimeException"))
        );

        let strings = RefType::array(crate::jvm::FieldType::object(BinaryName::STRING));
        let ints = RefType::array(crate::jvm::FieldType::int());
        assert_eq!(
            merge(&Object(strings.clone()), &Object(strings.clone())),
            Some(Object(strings.clone()))
        );
        assert_eq!(
            merge(&Object(strings), &Object(ints)),
            Some(object("java/lang/Object"))
        );
    }

    #[test]
    fn merging_frames() {
        let hierarchy = CachingFrameSupport::new(MapSource::new());
        let frame1 = Frame {
            locals: vec![Integer, Long, Top],
            stack: vec![Null].into_iter().collect(),
        };
        let frame2 = Frame {
            locals: vec![Integer, Float],
            stack: vec![object("java/lang/String")].into_iter().collect(),
        };
        let merged = merge_frames(&frame1, &frame2, &hierarchy).unwrap().unwrap();
        assert_eq!(merged.locals, vec![Integer, Top, Top]);
        assert_eq!(merged.stack.last(), Some(&object("java/lang/String")));

        let frame3: VerifierFrame = Frame {
            locals: vec![],
            stack: vec![Integer].into_iter().collect(),
        };
        assert_eq!(merge_frames(&frame1, &frame3, &hierarchy).unwrap(), None);
    }
}
