//! Instruction sequences which remove values from the operand stack
//!
//! The JVM has separate instructions for one-word (`int`, `float`, references) and two-word
//! (`long`, `double`) values, and using the wrong one leaves the stack in a shape the verifier
//! rejects. Everything here picks the instruction from the width of the value being dropped.

use crate::jvm::code::Instruction;
use crate::jvm::{BaseType, BinaryName, FieldType};
use crate::util::Width;

/// Drop the one-word value on top of the stack
pub fn pop_one_word() -> Vec<Instruction> {
    vec![Instruction::Pop]
}

/// Drop the two-word value on top of the stack
pub fn pop_two_word() -> Vec<Instruction> {
    vec![Instruction::Pop2]
}

/// Drop the value on top of the stack
pub fn pop(wide: bool) -> Vec<Instruction> {
    if wide {
        pop_two_word()
    } else {
        pop_one_word()
    }
}

/// Drop the one-word value just under the one-word value on top of the stack
pub fn delete_below_top() -> Vec<Instruction> {
    vec![Instruction::Swap, Instruction::Pop]
}

/// Drop the two-word value just under the two-word value on top of the stack
///
/// There is no `swap` for two-word values, so the top is copied underneath the value to drop
/// first: `a b -> b a b -> b a -> b`.
pub fn delete_below_top_wide() -> Vec<Instruction> {
    vec![Instruction::Dup2X2, Instruction::Pop2, Instruction::Pop2]
}

/// Drop the arguments of a method call, last argument first
pub fn pop_arguments(parameters: &[FieldType<BinaryName>]) -> Vec<Instruction> {
    parameters
        .iter()
        .rev()
        .flat_map(|parameter| pop(parameter.width() == 2))
        .collect()
}

/// Push the default value of a field type (`0`, `0L`, `0.0f`, `0.0`, or `null`)
pub fn default_value(field_type: &FieldType<BinaryName>) -> Instruction {
    match field_type {
        FieldType::Base(BaseType::Long) => Instruction::LConst0,
        FieldType::Base(BaseType::Float) => Instruction::FConst0,
        FieldType::Base(BaseType::Double) => Instruction::DConst0,
        FieldType::Base(_) => Instruction::IConst0,
        FieldType::Ref(_) => Instruction::AConstNull,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::ConstantsPool;
    use crate::jvm::code::LabelGenerator;
    use crate::jvm::verifier::{Frame, FrameContext, VType, VerificationType, VerifierFrame};
    use crate::jvm::RefType;
    use std::collections::HashMap;
    use VerificationType::*;

    fn run(stack: Vec<VType>, instructions: &[Instruction]) -> Vec<VType> {
        let constants = ConstantsPool::new();
        let this_class = BinaryName::from("com/example/Test");
        let uninitialized = HashMap::new();
        let context = FrameContext {
            constants: &constants,
            this_class: &this_class,
            return_type: None,
            uninitialized: &uninitialized,
        };
        let mut frame: VerifierFrame = Frame {
            locals: vec![],
            stack: stack.into_iter().collect(),
        };
        for insn in instructions {
            frame.verify_instruction(insn, None, &context).unwrap();
        }
        frame.stack.into_iter().map(|(_, _, vtype)| vtype).collect()
    }

    fn string() -> VType {
        Object(RefType::Object(BinaryName::STRING))
    }

    #[test]
    fn pops() {
        assert_eq!(run(vec![Long, Integer], &pop_one_word()), vec![Long]);
        assert_eq!(run(vec![Integer, Double], &pop_two_word()), vec![Integer]);
        assert_eq!(run(vec![Float, Long], &pop(true)), vec![Float]);
        assert_eq!(run(vec![Float, string()], &pop(false)), vec![Float]);
    }

    #[test]
    fn deletes_the_value_below() {
        assert_eq!(
            run(vec![Long, Integer, Float], &delete_below_top()),
            vec![Long, Float]
        );
        assert_eq!(
            run(vec![Integer, Long, Double], &delete_below_top_wide()),
            vec![Integer, Double]
        );
        assert_eq!(
            run(vec![Double, Double], &delete_below_top_wide()),
            vec![Double]
        );
    }

    #[test]
    fn drops_constructor_arguments() {
        let new_label = LabelGenerator::new().fresh_label();
        let parameters = vec![
            FieldType::int(),
            FieldType::long(),
            FieldType::object(BinaryName::STRING),
            FieldType::double(),
        ];
        let mut instructions = pop_arguments(&parameters);
        assert_eq!(
            instructions,
            vec![
                Instruction::Pop2,
                Instruction::Pop,
                Instruction::Pop2,
                Instruction::Pop
            ]
        );
        instructions.extend([Instruction::Pop, Instruction::Pop, Instruction::AConstNull]);

        let stack = vec![
            Uninitialized(new_label),
            Uninitialized(new_label),
            Integer,
            Long,
            string(),
            Double,
        ];
        assert_eq!(run(stack, &instructions), vec![Null]);
    }

    #[test]
    fn defaults() {
        let cases = [
            (FieldType::int(), Integer),
            (FieldType::Base(BaseType::Boolean), Integer),
            (FieldType::long(), Long),
            (FieldType::float(), Float),
            (FieldType::double(), Double),
            (FieldType::object(BinaryName::STRING), Null),
        ];
        for (field_type, expected) in cases {
            assert_eq!(run(vec![], &[default_value(&field_type)]), vec![expected]);
        }
    }
}
