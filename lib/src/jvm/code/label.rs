use std::fmt;

/// Opaque position marker in a method body
///
/// Labels are what branches, exception handlers, and debug tables point at. They only get a
/// concrete bytecode offset when the method is assembled.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Label(u32);

impl Label {
    /// Get the next fresh label
    pub fn next(&self) -> Label {
        Label(self.0 + 1)
    }
}

/// Generates new labels
///
/// Cloning does not split the generator source - the cloned generator will produce the same
/// sequence of labels as the original.
#[derive(Clone, Debug)]
pub struct LabelGenerator(Label);

impl LabelGenerator {
    pub fn new() -> LabelGenerator {
        LabelGenerator(Label(0))
    }

    /// Generate a fresh label
    pub fn fresh_label(&mut self) -> Label {
        let to_return = self.0;
        self.0 = self.0.next();
        to_return
    }
}

impl Default for LabelGenerator {
    fn default() -> Self {
        LabelGenerator::new()
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn labels_are_fresh() {
        let mut labels = LabelGenerator::new();
        let l0 = labels.fresh_label();
        let l1 = labels.fresh_label();
        assert_ne!(l0, l1);
        assert!(l0 < l1);
        assert_eq!(format!("{:?} {:?}", l0, l1), "l0 l1");
    }
}
