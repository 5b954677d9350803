use super::stack::{default_value, delete_below_top, delete_below_top_wide, pop, pop_arguments};
use super::{MethodLocation, MutationContext, MutationError, Mutator, Rewrite, Site};
use crate::jvm::class_file::ConstantsPool;
use crate::jvm::code::{BranchInstruction, CodeItem, EqComparison, Instruction, MethodBody};
use crate::jvm::{BinaryName, Name};

/// Runs the rules over the body of one method
pub struct MethodRewriter<'a> {
    /// Rules to try, in order
    pub mutators: &'a [Mutator],
    pub constants: &'a ConstantsPool,
    pub location: &'a MethodLocation,
}

impl<'a> MethodRewriter<'a> {
    /// Offer every instruction to every rule, registering all the matches in the context
    ///
    /// When the context's target is among the matches, the matched instruction is replaced in
    /// `body` and the return value is `true`. Otherwise the body comes back unchanged.
    pub fn rewrite(
        &self,
        body: &mut MethodBody,
        context: &mut MutationContext,
    ) -> Result<bool, MutationError> {
        context.enter_method(self.location.clone());
        log::debug!("Scanning {}", self.location);

        let items = std::mem::take(&mut body.items);
        let mut rewritten = Vec::with_capacity(items.len());
        let mut constructions: Vec<BinaryName> = vec![];
        let mut applied = false;

        for (idx, item) in items.iter().enumerate() {
            match item {
                CodeItem::Line(line) => context.set_line(*line),
                CodeItem::Label(_) => (),
                CodeItem::Instruction(_) | CodeItem::Branch(_) => context.next_instruction(),
            }

            let mut chosen = None;
            let site = Site {
                item,
                constants: self.constants,
                location: self.location,
                construction: constructions.last(),
            };
            for mutator in self.mutators {
                if let Some(candidate) = mutator.recognize(&site)? {
                    let id = context.register_candidate(*mutator, candidate.description)?;
                    if !applied && chosen.is_none() && context.should_apply(&id) {
                        log::debug!("Applying {}", id);
                        chosen = Some(candidate.rewrite);
                    }
                }
            }

            self.track_constructions(&items[idx..], &mut constructions)?;

            match chosen {
                Some(rewrite) => {
                    applied = true;
                    self.emit(rewrite, body, &mut rewritten);
                }
                None => rewritten.push(item.clone()),
            }
        }

        body.items = rewritten;
        Ok(applied)
    }

    /// Keep track of which `new X; dup` pairs are waiting on their constructor call
    ///
    /// `items` starts at the current item.
    fn track_constructions(
        &self,
        items: &[CodeItem],
        constructions: &mut Vec<BinaryName>,
    ) -> Result<(), MutationError> {
        match items.first() {
            Some(CodeItem::Instruction(Instruction::New(class))) => {
                let next = items[1..].iter().find(|item| item.is_instruction());
                if next == Some(&CodeItem::Instruction(Instruction::Dup)) {
                    let name = self.constants.class_name(*class)?;
                    let name = BinaryName::from_str(name).map_err(|err| {
                        MutationError::StructuralInconsistency {
                            location: self.location.clone(),
                            detail: err,
                        }
                    })?;
                    constructions.push(name);
                }
            }
            Some(CodeItem::Instruction(Instruction::Invoke(_, method))) => {
                let member = self.constants.member_ref(method.0)?;
                let top_matches = constructions
                    .last()
                    .map_or(false, |class| class.as_str() == member.class);
                if member.name == "<init>" && top_matches {
                    constructions.pop();
                }
            }
            _ => (),
        }
        Ok(())
    }

    fn emit(&self, rewrite: Rewrite, body: &mut MethodBody, output: &mut Vec<CodeItem>) {
        let instructions = |insns: Vec<Instruction>| insns.into_iter().map(CodeItem::Instruction);
        match rewrite {
            Rewrite::Replace(items) => output.extend(items),

            Rewrite::DeleteOperand { first: true, wide } => output.extend(instructions(if wide {
                delete_below_top_wide()
            } else {
                delete_below_top()
            })),
            Rewrite::DeleteOperand { first: false, wide } => output.extend(instructions(pop(wide))),

            Rewrite::GuardedRead { field, field_type } => {
                let is_null = body.fresh_label();
                let end = body.fresh_label();
                output.extend([
                    CodeItem::Instruction(Instruction::Dup),
                    CodeItem::Branch(BranchInstruction::IfNull(EqComparison::EQ, is_null)),
                    CodeItem::Instruction(Instruction::GetField(field)),
                    CodeItem::Branch(BranchInstruction::Goto(end)),
                    CodeItem::Label(is_null),
                    CodeItem::Instruction(Instruction::Pop),
                    CodeItem::Instruction(default_value(&field_type)),
                    CodeItem::Label(end),
                ]);
            }

            Rewrite::SuppressConstructor { parameters } => {
                output.extend(instructions(pop_arguments(&parameters)));
                output.extend([
                    CodeItem::Instruction(Instruction::Pop),
                    CodeItem::Instruction(Instruction::Pop),
                    CodeItem::Instruction(Instruction::AConstNull),
                ]);
            }
        }
    }
}
