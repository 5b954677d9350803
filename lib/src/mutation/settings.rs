use super::{MutationError, Mutator, MutatorFamily};

/// Which rules a scan runs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Enabled rules, without duplicates and in the order of [`Mutator::ALL`]
    pub mutators: Vec<Mutator>,
}

impl Settings {
    /// Families enabled by the `DEFAULTS` group
    pub const DEFAULT_FAMILIES: [MutatorFamily; 4] = [
        MutatorFamily::Arithmetic,
        MutatorFamily::Bitwise,
        MutatorFamily::Relational,
        MutatorFamily::OperandDeletion,
    ];

    pub fn new(mutators: impl IntoIterator<Item = Mutator>) -> Settings {
        let requested: Vec<Mutator> = mutators.into_iter().collect();
        Settings {
            mutators: Mutator::ALL
                .iter()
                .copied()
                .filter(|mutator| requested.contains(mutator))
                .collect(),
        }
    }

    /// Build settings from rule ids and group names (case insensitive)
    ///
    /// Groups are `ALL`, `DEFAULTS`, and the family names (eg. `ARITHMETIC`).
    pub fn from_names<S: AsRef<str>>(
        names: impl IntoIterator<Item = S>,
    ) -> Result<Settings, MutationError> {
        let mut mutators = vec![];
        for name in names {
            let name = name.as_ref().trim();
            mutators.extend(Settings::expand(name)?);
        }
        Ok(Settings::new(mutators))
    }

    fn expand(name: &str) -> Result<Vec<Mutator>, MutationError> {
        let in_families = |families: &[MutatorFamily]| -> Vec<Mutator> {
            Mutator::ALL
                .iter()
                .copied()
                .filter(|mutator| families.contains(&mutator.family()))
                .collect()
        };

        if name.eq_ignore_ascii_case("ALL") {
            return Ok(Mutator::ALL.to_vec());
        }
        if name.eq_ignore_ascii_case("DEFAULTS") {
            return Ok(in_families(&Settings::DEFAULT_FAMILIES));
        }
        let family = Mutator::ALL
            .iter()
            .map(|mutator| mutator.family())
            .find(|family| family.name().eq_ignore_ascii_case(name));
        if let Some(family) = family {
            return Ok(in_families(&[family]));
        }
        Mutator::from_id(name)
            .map(|mutator| vec![mutator])
            .ok_or_else(|| MutationError::UnknownMutator(name.to_owned()))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::new(Mutator::ALL)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::OrdComparison;
    use crate::mutation::{ArithmeticOp, BitwiseOp};

    #[test]
    fn names_expand_in_canonical_order() {
        let settings =
            Settings::from_names(["remove_second_operand", "BITWISE", "ARITHMETIC_REPLACE_SUB"])
                .unwrap();
        assert_eq!(
            settings.mutators,
            vec![
                Mutator::ArithmeticReplace(ArithmeticOp::Sub),
                Mutator::BitwiseReplace(BitwiseOp::And),
                Mutator::BitwiseReplace(BitwiseOp::Or),
                Mutator::BitwiseReplace(BitwiseOp::Xor),
                Mutator::RemoveSecondOperand,
            ]
        );
    }

    #[test]
    fn groups() {
        assert_eq!(Settings::from_names(["all"]).unwrap(), Settings::default());
        assert_eq!(Settings::default().mutators.len(), Mutator::ALL.len());

        let defaults = Settings::from_names(["DEFAULTS"]).unwrap();
        assert_eq!(defaults.mutators.len(), 16);
        assert!(defaults
            .mutators
            .contains(&Mutator::RelationalReplace(OrdComparison::LT)));
        assert!(!defaults.mutators.contains(&Mutator::CheckNullObject));

        let duplicated = Settings::from_names(["RELATIONAL", "RELATIONAL_REPLACE_EQ"]).unwrap();
        assert_eq!(duplicated.mutators.len(), 6);
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(matches!(
            Settings::from_names(["ARITHMETIC", "SWAP_VARIABLES"]),
            Err(MutationError::UnknownMutator(name)) if name == "SWAP_VARIABLES"
        ));
    }
}
