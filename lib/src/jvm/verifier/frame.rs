use super::*;
use crate::jvm::class_file::{
    ClassConstantIndex, Constant, ConstantIndex, ConstantsPool, StackMapFrame,
};
use crate::jvm::code::{BranchInstruction, Instruction, InvokeType, Label};
use crate::jvm::descriptors::ParseDescriptor;
use crate::jvm::{
    ArrayType, BinaryName, Error, FieldType, MethodDescriptor, RefType,
    UnqualifiedName, VerifierErrorKind,
};
use crate::jvm::names::Name;
use crate::util::{OffsetVec, Width};
use std::collections::HashMap;

/// Snapshot of the stack and local variables at a point in the bytecode
///
/// Locals are tracked one entry per slot: a `long` or `double` is followed by a [`VerificationType::Top`]
/// for its second half. The stack is tracked by value, as an [`OffsetVec`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Frame<Cls, U> {
    /// Local variables in scope
    pub locals: Vec<VerificationType<Cls, U>>,

    /// Types of values on the stack
    pub stack: OffsetVec<VerificationType<Cls, U>>,
}

impl<Cls, U> Default for Frame<Cls, U> {
    fn default() -> Self {
        Frame {
            locals: vec![],
            stack: OffsetVec::new(),
        }
    }
}

/// Stack map frame stored during verification
pub type VerifierFrame = Frame<RefType<BinaryName>, Label>;

/// What the frame transfer functions need to know about the surrounding method
pub struct FrameContext<'a> {
    pub constants: &'a ConstantsPool,

    /// Class declaring the method (the type `this` gets after `<init>`)
    pub this_class: &'a BinaryName,

    /// `None` for `void` methods
    pub return_type: Option<&'a FieldType<BinaryName>>,

    /// Class created by the `new` right after each label
    pub uninitialized: &'a HashMap<Label, RefType<BinaryName>>,
}

impl<Cls: Clone + Eq, U: Clone + Eq> Frame<Cls, U> {
    /// Locals as they are written in a stack map frame
    ///
    /// Wide types are written once (the `Top` for their second half is implied) and trailing
    /// `Top`s are dropped entirely.
    pub fn compact_locals(&self) -> Vec<VerificationType<Cls, U>> {
        let mut compact = vec![];
        let mut slot = 0;
        while slot < self.locals.len() {
            let local = &self.locals[slot];
            slot += local.width();
            compact.push(local.clone());
        }
        while compact.last() == Some(&VerificationType::Top) {
            compact.pop();
        }
        compact
    }

    /// Number of local slots in use
    pub fn locals_len(&self) -> usize {
        let mut len = self.locals.len();
        while len > 0 && self.locals[len - 1] == VerificationType::Top {
            len -= 1;
        }
        match self.locals[..len].last() {
            Some(last) => len - 1 + last.width(),
            None => 0,
        }
    }
}

impl VerifierFrame {
    /// Frame on entry to a method, computed from its descriptor
    pub fn initial(
        this_class: &BinaryName,
        method_name: &str,
        descriptor: &MethodDescriptor<BinaryName>,
        is_static: bool,
    ) -> VerifierFrame {
        let mut locals = vec![];
        if !is_static {
            if method_name == UnqualifiedName::INIT.as_str() && this_class != &BinaryName::OBJECT {
                locals.push(VerificationType::UninitializedThis);
            } else {
                locals.push(VerificationType::Object(RefType::Object(this_class.clone())));
            }
        }
        for parameter in &descriptor.parameters {
            let vtype = VType::from(parameter.clone());
            let wide = vtype.width() == 2;
            locals.push(vtype);
            if wide {
                locals.push(VerificationType::Top);
            }
        }
        Frame {
            locals,
            stack: OffsetVec::new(),
        }
    }

    /// Update the frame to reflect the effects of the given (non-branching) instruction
    ///
    /// `new_label` is the label placed immediately before the instruction, if any.
    pub fn verify_instruction(
        &mut self,
        insn: &Instruction,
        new_label: Option<Label>,
        context: &FrameContext<'_>,
    ) -> Result<(), VerifierErrorKind> {
        verify_instruction(self, context, insn, new_label)
    }

    /// Update the frame to reflect the effects of the given branching instruction
    pub fn verify_branch_instruction<Lbl>(
        &mut self,
        insn: &BranchInstruction<Lbl>,
        context: &FrameContext<'_>,
    ) -> Result<(), VerifierErrorKind> {
        verify_branch_instruction(self, context.return_type, insn)
    }

    /// Resolve the frame into its serializable form
    pub fn into_serializable(
        &self,
        constants: &mut ConstantsPool,
        new_offset: impl Fn(&Label) -> Result<u16, Error>,
    ) -> Result<Frame<ClassConstantIndex, u16>, Error> {
        let mut serialize = |vtype: &VType| {
            vtype.map(|ref_type| constants.get_class(ref_type), |label| new_offset(label))
        };
        let locals = self
            .locals
            .iter()
            .map(&mut serialize)
            .collect::<Result<_, _>>()?;
        let stack = self
            .stack
            .iter()
            .map(|(_, _, t)| serialize(t))
            .collect::<Result<_, _>>()?;
        Ok(Frame { locals, stack })
    }

    /// Render the frame (for error messages)
    pub fn describe(&self) -> String {
        let stack: Vec<&VType> = self.stack.iter().map(|(_, _, t)| t).collect();
        format!("locals {:?}, stack {:?}", self.compact_locals(), stack)
    }
}

impl Frame<ClassConstantIndex, u16> {
    /// Compute a stack map frame for this frame, given the previous frame
    ///
    /// This will fall back to the `Full` option using [`Self::full_stack_map_frame`] only if none
    /// of the other stack map frame variants are enough to encode the transition.
    pub fn stack_map_frame(&self, offset_delta: u16, previous_frame: &Self) -> StackMapFrame {
        let this_locals = self.compact_locals();
        let prev_locals = previous_frame.compact_locals();

        match self.stack.len() {
            0 => {
                if this_locals.len() <= prev_locals.len() {
                    let len_difference = prev_locals.len() - this_locals.len();
                    if len_difference < 4 && prev_locals.starts_with(&this_locals) {
                        if len_difference == 0 {
                            return StackMapFrame::SameLocalsNoStack { offset_delta };
                        } else {
                            return StackMapFrame::ChopLocalsNoStack {
                                offset_delta,
                                chopped_k: len_difference as u8,
                            };
                        }
                    }
                } else if this_locals.len() - prev_locals.len() < 4
                    && this_locals.starts_with(&prev_locals)
                {
                    return StackMapFrame::AppendLocalsNoStack {
                        offset_delta,
                        locals: this_locals[prev_locals.len()..].to_vec(),
                    };
                }
            }
            1 if this_locals == prev_locals => {
                if let Some(stack) = self.stack.last() {
                    return StackMapFrame::SameLocalsOneStack {
                        offset_delta,
                        stack: *stack,
                    };
                }
            }
            _ => (),
        }

        self.full_stack_map_frame(offset_delta)
    }

    /// Compute a `Full` stack map frame
    pub fn full_stack_map_frame(&self, offset_delta: u16) -> StackMapFrame {
        StackMapFrame::Full {
            offset_delta,
            stack: self.stack.iter().map(|(_, _, t)| *t).collect(),
            locals: self.compact_locals(),
        }
    }
}

fn constant_error(index: ConstantIndex) -> impl Fn(Error) -> VerifierErrorKind {
    move |_| VerifierErrorKind::MissingConstant(index)
}

fn parse_field_type(descriptor: &str) -> Result<FieldType<BinaryName>, VerifierErrorKind> {
    FieldType::parse(descriptor).map_err(VerifierErrorKind::BadDescriptor)
}

fn parse_method_type(
    descriptor: &str,
) -> Result<MethodDescriptor<BinaryName>, VerifierErrorKind> {
    MethodDescriptor::parse(descriptor).map_err(VerifierErrorKind::BadDescriptor)
}

fn class_type(
    constants: &ConstantsPool,
    index: ClassConstantIndex,
) -> Result<RefType<BinaryName>, VerifierErrorKind> {
    constants
        .class_type(index)
        .map_err(constant_error(index.0))
}

fn object(name: BinaryName) -> VType {
    VerificationType::Object(RefType::Object(name))
}

/// Type of a primitive written as a descriptor letter (`I`, `J`, `F` or `D`)
fn primitive(letter: char) -> VType {
    match letter {
        'J' => VerificationType::Long,
        'F' => VerificationType::Float,
        'D' => VerificationType::Double,
        _ => VerificationType::Integer,
    }
}

/// Operands and result of the instructions that only work on the stack
///
/// Operands are listed bottom to top as descriptor letters, with `A` standing for any reference.
fn stack_effect(insn: &Instruction) -> (&'static str, Option<char>) {
    use Instruction::*;

    match insn {
        IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4 | IConst5 | BiPush(_)
        | SiPush(_) => ("", Some('I')),
        LConst0 | LConst1 => ("", Some('J')),
        FConst0 | FConst1 | FConst2 => ("", Some('F')),
        DConst0 | DConst1 => ("", Some('D')),

        IALoad | BALoad | CALoad | SALoad => ("AI", Some('I')),
        LALoad => ("AI", Some('J')),
        FALoad => ("AI", Some('F')),
        DALoad => ("AI", Some('D')),
        IAStore | BAStore | CAStore | SAStore => ("AII", None),
        LAStore => ("AIJ", None),
        FAStore => ("AIF", None),
        DAStore => ("AID", None),
        AAStore => ("AIA", None),

        IAdd | ISub | IDiv | IMul | IRem | IAnd | IOr | IXor | ISh(_) => ("II", Some('I')),
        LAdd | LSub | LDiv | LMul | LRem | LAnd | LOr | LXor => ("JJ", Some('J')),
        FAdd | FSub | FDiv | FMul | FRem => ("FF", Some('F')),
        DAdd | DSub | DDiv | DMul | DRem => ("DD", Some('D')),
        LSh(_) => ("JI", Some('J')),
        INeg | I2B | I2C | I2S => ("I", Some('I')),
        LNeg => ("J", Some('J')),
        FNeg => ("F", Some('F')),
        DNeg => ("D", Some('D')),

        I2L => ("I", Some('J')),
        I2F => ("I", Some('F')),
        I2D => ("I", Some('D')),
        L2I => ("J", Some('I')),
        L2F => ("J", Some('F')),
        L2D => ("J", Some('D')),
        F2I => ("F", Some('I')),
        F2L => ("F", Some('J')),
        F2D => ("F", Some('D')),
        D2I => ("D", Some('I')),
        D2L => ("D", Some('J')),
        D2F => ("D", Some('F')),

        LCmp => ("JJ", Some('I')),
        FCmp(_) => ("FF", Some('I')),
        DCmp(_) => ("DD", Some('I')),

        ArrayLength | InstanceOf(_) => ("A", Some('I')),
        MonitorEnter | MonitorExit => ("A", None),

        // nop
        _ => ("", None),
    }
}

/// Letter of the primitive a typed load or store moves
fn local_letter(insn: &Instruction) -> char {
    match insn {
        Instruction::LLoad(_) | Instruction::LStore(_) => 'J',
        Instruction::FLoad(_) | Instruction::FStore(_) => 'F',
        Instruction::DLoad(_) | Instruction::DStore(_) => 'D',
        _ => 'I',
    }
}

fn verify_instruction(
    frame: &mut VerifierFrame,
    context: &FrameContext<'_>,
    insn: &Instruction,
    new_label: Option<Label>,
) -> Result<(), VerifierErrorKind> {
    use Instruction::*;
    use VerificationType::*;

    let Frame { stack, locals } = frame;

    match insn {
        AConstNull => {
            stack.push(Null);
        }
        Ldc(index) | Ldc2(index) => {
            let vtype = constant_type(context.constants, *index)?;
            if (vtype.width() == 2) != matches!(insn, Ldc2(_)) {
                return Err(VerifierErrorKind::InvalidWidth(vtype.width()));
            }
            stack.push(vtype);
        }

        ILoad(index) | LLoad(index) | FLoad(index) | DLoad(index) => {
            let vtype = primitive(local_letter(insn));
            expect_local(locals, *index, &vtype)?;
            stack.push(vtype);
        }
        ALoad(index) => {
            let vtype = local(locals, *index)?;
            if !vtype.is_reference() {
                return Err(VerifierErrorKind::InvalidType);
            }
            stack.push(vtype);
        }
        IStore(index) | LStore(index) | FStore(index) | DStore(index) => {
            let vtype = primitive(local_letter(insn));
            pop_expecting(stack, &vtype)?;
            store_local(locals, *index, vtype);
        }
        AStore(index) => {
            let vtype = pop_reference(stack)?;
            store_local(locals, *index, vtype);
        }
        IInc(index, _) => expect_local(locals, *index, &Integer)?,

        AALoad => {
            pop_expecting(stack, &Integer)?;
            let array = pop_reference(stack)?;
            let element = reference_element(array).ok_or(VerifierErrorKind::NotArrayType)?;
            stack.push(element);
        }

        Pop => {
            take_slots(stack, 1)?;
        }
        Pop2 => {
            take_slots(stack, 2)?;
        }
        Dup => duplicate(stack, 1, 0)?,
        DupX1 => duplicate(stack, 1, 1)?,
        DupX2 => duplicate(stack, 1, 2)?,
        Dup2 => duplicate(stack, 2, 0)?,
        Dup2X1 => duplicate(stack, 2, 1)?,
        Dup2X2 => duplicate(stack, 2, 2)?,
        Swap => {
            let top = take_slots(stack, 1)?;
            let under = take_slots(stack, 1)?;
            stack.extend(top);
            stack.extend(under);
        }

        GetStatic(field) | PutStatic(field) | GetField(field) | PutField(field) => {
            let member = context
                .constants
                .member_ref(field.0)
                .map_err(constant_error(field.0))?;
            let value = VType::from(parse_field_type(member.descriptor)?);
            if matches!(insn, PutStatic(_) | PutField(_)) {
                pop_expecting(stack, &value)?;
            }
            if matches!(insn, GetField(_) | PutField(_)) {
                pop_reference(stack)?;
            }
            if matches!(insn, GetStatic(_) | GetField(_)) {
                stack.push(value);
            }
        }

        Invoke(invoke_type, method) => {
            let member = context
                .constants
                .member_ref(method.0)
                .map_err(constant_error(method.0))?;
            let descriptor = parse_method_type(member.descriptor)?;
            pop_arguments(stack, &descriptor)?;

            let constructor = matches!(invoke_type, InvokeType::Special)
                && member.name == UnqualifiedName::INIT.as_str();
            if constructor {
                if descriptor.return_type.is_some() {
                    return Err(VerifierErrorKind::InvalidType);
                }
                let receiver = pop_value(stack)?;
                let initialized = match &receiver {
                    UninitializedThis => object(context.this_class.clone()),
                    Uninitialized(label) => context
                        .uninitialized
                        .get(label)
                        .cloned()
                        .map(Object)
                        .ok_or(VerifierErrorKind::InvalidType)?,
                    _ => return Err(VerifierErrorKind::InvalidType),
                };
                mark_initialized(stack, locals, &receiver, &initialized);
            } else {
                if !matches!(invoke_type, InvokeType::Static) {
                    pop_reference(stack)?;
                }
                stack.extend(descriptor.return_type.map(VType::from));
            }
        }
        InvokeDynamic(index) => {
            let descriptor = context
                .constants
                .invoke_dynamic_descriptor(*index)
                .map_err(constant_error(index.0))?;
            let descriptor = parse_method_type(descriptor)?;
            pop_arguments(stack, &descriptor)?;
            stack.extend(descriptor.return_type.map(VType::from));
        }

        New(index) => {
            if !matches!(class_type(context.constants, *index)?, RefType::Object(_)) {
                return Err(VerifierErrorKind::InvalidType);
            }
            let label = new_label.ok_or(VerifierErrorKind::UnlabelledNew)?;
            stack.push(Uninitialized(label));
        }
        NewArray(base_type) => {
            pop_expecting(stack, &Integer)?;
            stack.push(Object(RefType::array(FieldType::Base(*base_type))));
        }
        ANewArray(index) => {
            let element = class_type(context.constants, *index)?;
            pop_expecting(stack, &Integer)?;
            stack.push(Object(RefType::array(FieldType::Ref(element))));
        }
        MultiANewArray(index, dimensions) => {
            let array = class_type(context.constants, *index)?;
            for _ in 0..*dimensions {
                pop_expecting(stack, &Integer)?;
            }
            stack.push(Object(array));
        }
        CheckCast(index) => {
            let cast_to = class_type(context.constants, *index)?;
            pop_reference(stack)?;
            stack.push(Object(cast_to));
        }

        other => {
            let (operands, result) = stack_effect(other);
            pop_operands(stack, operands)?;
            stack.extend(result.map(primitive));
        }
    }

    Ok(())
}

/// Type `ldc` pushes for a constant
fn constant_type(
    constants: &ConstantsPool,
    index: ConstantIndex,
) -> Result<VType, VerifierErrorKind> {
    let missing = constant_error(index);
    let vtype = match constants.get(index).map_err(&missing)? {
        Constant::Integer(_) => VerificationType::Integer,
        Constant::Float(_) => VerificationType::Float,
        Constant::Long(_) => VerificationType::Long,
        Constant::Double(_) => VerificationType::Double,
        Constant::String(_) => object(BinaryName::STRING),
        Constant::Class(_) => object(BinaryName::CLASS),
        Constant::MethodHandle { .. } => object(BinaryName::METHODHANDLE),
        Constant::MethodType { .. } => object(BinaryName::METHODTYPE),
        Constant::Dynamic { name_and_type, .. } => {
            let (_, descriptor) = constants.name_and_type(*name_and_type).map_err(&missing)?;
            VType::from(parse_field_type(descriptor)?)
        }
        other => return Err(VerifierErrorKind::NotLoadableConstant(other.clone())),
    };
    Ok(vtype)
}

/// What `aaload` produces from an array, if it is an array of references
fn reference_element(array: VType) -> Option<VType> {
    let element = match array {
        VerificationType::Null => return Some(VerificationType::Null),
        VerificationType::Object(RefType::ObjectArray(array)) => {
            match array.additional_dimensions.checked_sub(1) {
                None => RefType::Object(array.element_type),
                Some(additional_dimensions) => RefType::ObjectArray(ArrayType {
                    additional_dimensions,
                    ..array
                }),
            }
        }
        VerificationType::Object(RefType::PrimitiveArray(array)) => {
            let additional_dimensions = array.additional_dimensions.checked_sub(1)?;
            RefType::PrimitiveArray(ArrayType {
                additional_dimensions,
                ..array
            })
        }
        _ => return None,
    };
    Some(VerificationType::Object(element))
}

fn verify_branch_instruction<Lbl>(
    frame: &mut VerifierFrame,
    return_type: Option<&FieldType<BinaryName>>,
    insn: &BranchInstruction<Lbl>,
) -> Result<(), VerifierErrorKind> {
    use BranchInstruction::*;

    let operands = match insn {
        If(_, _) | TableSwitch { .. } | LookupSwitch { .. } => "I",
        IfICmp(_, _) => "II",
        IfACmp(_, _) => "AA",
        IfNull(_, _) | AThrow => "A",
        Goto(_) => "",
        Jsr(_) | Ret(_) => return Err(VerifierErrorKind::Subroutine),
        IReturn => "I",
        LReturn => "J",
        FReturn => "F",
        DReturn => "D",
        AReturn => "A",
        Return => "",
    };
    pop_operands(&mut frame.stack, operands)?;

    let returned = match insn {
        IReturn | LReturn | FReturn | DReturn | AReturn => operands.chars().next(),
        Return => None,
        _ => return Ok(()),
    };
    let declared = return_type.map(|declared| VType::from(declared.clone()));
    let consistent = match (declared, returned) {
        (None, None) => true,
        (Some(declared), Some('A')) => declared.is_reference(),
        (Some(declared), Some(letter)) => declared == primitive(letter),
        _ => false,
    };
    if consistent {
        Ok(())
    } else {
        Err(VerifierErrorKind::InvalidType)
    }
}

/// Replace every copy of a value whose constructor just ran
fn mark_initialized(
    stack: &mut OffsetVec<VType>,
    locals: &mut [VType],
    receiver: &VType,
    initialized: &VType,
) {
    let values: Vec<VType> = std::mem::take(stack)
        .into_iter()
        .map(|(_, _, vtype)| {
            if vtype == *receiver {
                initialized.clone()
            } else {
                vtype
            }
        })
        .collect();
    stack.extend(values);

    for local in locals.iter_mut() {
        if local == receiver {
            *local = initialized.clone();
        }
    }
}

fn local(locals: &[VType], index: u16) -> Result<VType, VerifierErrorKind> {
    locals
        .get(index as usize)
        .cloned()
        .ok_or(VerifierErrorKind::InvalidIndex)
}

fn expect_local(locals: &[VType], index: u16, expected: &VType) -> Result<(), VerifierErrorKind> {
    let found = local(locals, index)?;
    if found == *expected {
        Ok(())
    } else {
        Err(VerifierErrorKind::IncompatibleTypes(found, expected.clone()))
    }
}

/// Store a type into a local, invalidating any wide value it overwrites half of
fn store_local(locals: &mut Vec<VType>, index: u16, vtype: VType) {
    let index = index as usize;
    let width = vtype.width();
    if locals.len() < index + width {
        locals.resize(index + width, VerificationType::Top);
    }
    if index > 0 && locals[index - 1].width() == 2 {
        locals[index - 1] = VerificationType::Top;
    }
    if width == 1 && locals[index].width() == 2 && index + 1 < locals.len() {
        locals[index + 1] = VerificationType::Top;
    }
    locals[index] = vtype;
    if width == 2 {
        locals[index + 1] = VerificationType::Top;
    }
}

fn pop_value(stack: &mut OffsetVec<VType>) -> Result<VType, VerifierErrorKind> {
    stack.pop().ok_or(VerifierErrorKind::EmptyStack)
}

fn pop_reference(stack: &mut OffsetVec<VType>) -> Result<VType, VerifierErrorKind> {
    let vtype = pop_value(stack)?;
    if vtype.is_reference() {
        Ok(vtype)
    } else {
        Err(VerifierErrorKind::InvalidType)
    }
}

/// Pop a value, checking it against the expected type
///
/// Reference types are only checked for being references: assignability between classes is left
/// to the JVM verifier.
fn pop_expecting(stack: &mut OffsetVec<VType>, expected: &VType) -> Result<(), VerifierErrorKind> {
    let found = pop_value(stack)?;
    let consistent = if expected.is_reference() {
        found.is_reference()
    } else {
        found == *expected
    };
    if consistent {
        Ok(())
    } else {
        Err(VerifierErrorKind::IncompatibleTypes(found, expected.clone()))
    }
}

/// Pop operands written as descriptor letters (see [`stack_effect`])
fn pop_operands(stack: &mut OffsetVec<VType>, operands: &str) -> Result<(), VerifierErrorKind> {
    for letter in operands.chars().rev() {
        match letter {
            'A' => {
                pop_reference(stack)?;
            }
            _ => pop_expecting(stack, &primitive(letter))?,
        }
    }
    Ok(())
}

fn pop_arguments(
    stack: &mut OffsetVec<VType>,
    descriptor: &MethodDescriptor<BinaryName>,
) -> Result<(), VerifierErrorKind> {
    for parameter in descriptor.parameters.iter().rev() {
        pop_expecting(stack, &VType::from(parameter.clone()))?;
    }
    Ok(())
}

/// Pop values filling exactly `slots` stack slots, returned bottom to top
///
/// Splitting a `long` or `double` is an error.
fn take_slots(stack: &mut OffsetVec<VType>, slots: usize) -> Result<Vec<VType>, VerifierErrorKind> {
    let mut taken = vec![];
    let mut width = 0;
    while width < slots {
        let vtype = pop_value(stack)?;
        width += vtype.width();
        taken.push(vtype);
    }
    if width > slots {
        return Err(VerifierErrorKind::InvalidWidth(width));
    }
    taken.reverse();
    Ok(taken)
}

/// The `dup` family: copy the top `copied` slots below the `skipped` slots under them
fn duplicate(
    stack: &mut OffsetVec<VType>,
    copied: usize,
    skipped: usize,
) -> Result<(), VerifierErrorKind> {
    let top = take_slots(stack, copied)?;
    let under = take_slots(stack, skipped)?;
    stack.extend(top.iter().cloned());
    stack.extend(under);
    stack.extend(top);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::Instruction::*;
    use VerificationType::*;

    fn new_frame(locals: Vec<VType>, stack: Vec<VType>) -> VerifierFrame {
        Frame {
            locals,
            stack: stack.into_iter().collect(),
        }
    }

    fn verify(frame: &mut VerifierFrame, insn: &Instruction) -> Result<(), VerifierErrorKind> {
        let constants = ConstantsPool::new();
        let this_class = BinaryName::from("MyClass");
        let uninitialized = HashMap::new();
        let context = FrameContext {
            constants: &constants,
            this_class: &this_class,
            return_type: None,
            uninitialized: &uninitialized,
        };
        frame.verify_instruction(insn, None, &context)
    }

    #[test]
    fn arithmetic() {
        let binops = [
            (Integer, vec![IAdd, ISub, IDiv, IMul, IRem, IAnd, IOr, IXor]),
            (Long, vec![LAdd, LSub, LDiv, LMul, LRem, LAnd, LOr, LXor]),
            (Float, vec![FAdd, FSub, FDiv, FMul, FRem]),
            (Double, vec![DAdd, DSub, DDiv, DMul, DRem]),
        ];

        for (good_typ, instructions) in binops {
            for instruction in instructions {
                // Try a bunch of different types
                for typ in [Integer, Long, Float, Double, Null, UninitializedThis] {
                    let mut frame_in = new_frame(vec![], vec![typ.clone(), typ.clone()]);
                    let frame_out = new_frame(vec![], vec![typ.clone()]);
                    if typ == good_typ {
                        assert!(
                            verify(&mut frame_in, &instruction).is_ok(),
                            "Verification of {:?}",
                            instruction
                        );
                        assert_eq!(
                            frame_in, frame_out,
                            "Verification output frame of {:?}",
                            instruction
                        );
                    } else {
                        assert!(
                            matches!(
                                verify(&mut frame_in, &instruction),
                                Err(VerifierErrorKind::IncompatibleTypes(_, _)),
                            ),
                            "Verification of {:?}",
                            instruction
                        );
                    }
                }

                // Try with a stack that is too small
                let mut frame_in = new_frame(vec![], vec![good_typ.clone()]);
                assert!(
                    matches!(
                        verify(&mut frame_in, &instruction),
                        Err(VerifierErrorKind::EmptyStack),
                    ),
                    "Verification of {:?}",
                    instruction
                );
            }
        }
    }

    #[test]
    fn wide_stores_invalidate_neighbours() {
        let mut frame = new_frame(vec![Long, Top, Integer], vec![Double]);
        verify(&mut frame, &DStore(1)).unwrap();
        assert_eq!(frame.locals, vec![Top, Double, Top]);

        let mut frame = new_frame(vec![Integer], vec![Integer]);
        verify(&mut frame, &IStore(3)).unwrap();
        assert_eq!(frame.locals, vec![Integer, Top, Top, Integer]);
        assert_eq!(frame.compact_locals(), vec![Integer, Top, Top, Integer]);
        assert_eq!(frame.locals_len(), 4);
    }

    #[test]
    fn category_checks_on_stack_shuffles() {
        let mut frame = new_frame(vec![], vec![Long]);
        assert!(matches!(
            verify(&mut frame, &Pop),
            Err(VerifierErrorKind::InvalidWidth(2))
        ));

        let mut frame = new_frame(vec![], vec![Integer, Float, Long]);
        verify(&mut frame, &Dup2X2).unwrap();
        assert_eq!(
            frame.stack.iter().map(|(_, _, t)| t.clone()).collect::<Vec<_>>(),
            vec![Long, Integer, Float, Long]
        );
    }

    #[test]
    fn constructor_initializes_this() {
        let descriptor = MethodDescriptor::parse("(J)V").unwrap();
        let this_class = BinaryName::from("MyClass");
        let frame = VerifierFrame::initial(&this_class, "<init>", &descriptor, false);
        assert_eq!(frame.locals, vec![UninitializedThis, Long, Top]);

        let frame = VerifierFrame::initial(&this_class, "run", &descriptor, true);
        assert_eq!(frame.locals, vec![Long, Top]);
    }

    #[test]
    fn compact_locals_and_frame_compression() {
        let prev: Frame<ClassConstantIndex, u16> = Frame {
            locals: vec![Integer, Long, Top],
            stack: OffsetVec::new(),
        };
        let same = prev.clone();
        assert_eq!(
            same.stack_map_frame(3, &prev),
            StackMapFrame::SameLocalsNoStack { offset_delta: 3 }
        );

        let chopped: Frame<ClassConstantIndex, u16> = Frame {
            locals: vec![Integer, Top, Top],
            stack: OffsetVec::new(),
        };
        assert_eq!(
            chopped.stack_map_frame(0, &prev),
            StackMapFrame::ChopLocalsNoStack {
                offset_delta: 0,
                chopped_k: 1
            }
        );

        let appended: Frame<ClassConstantIndex, u16> = Frame {
            locals: vec![Integer, Long, Top, Float],
            stack: OffsetVec::new(),
        };
        assert_eq!(
            appended.stack_map_frame(1, &prev),
            StackMapFrame::AppendLocalsNoStack {
                offset_delta: 1,
                locals: vec![Float]
            }
        );

        let one_stack: Frame<ClassConstantIndex, u16> = Frame {
            locals: vec![Integer, Long, Top],
            stack: vec![Null].into_iter().collect(),
        };
        assert_eq!(
            one_stack.stack_map_frame(2, &prev),
            StackMapFrame::SameLocalsOneStack {
                offset_delta: 2,
                stack: Null
            }
        );
    }
}
