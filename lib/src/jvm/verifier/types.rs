use crate::jvm::class_file::{ClassConstantIndex, Serialize};
use crate::jvm::code::Label;
use crate::jvm::{BaseType, BinaryName, FieldType, RefType};
use crate::util::Width;
use byteorder::WriteBytesExt;

/// Type of one local or stack slot, as tracked by the [type checker][0]
///
/// `Cls` is how object types are named and `U` is how the `new` site of an uninitialized object
/// is identified. During analysis these are [`RefType`] and [`Label`] (see [`VType`]). In a
/// serialized `StackMapTable` they are a class constant and the bytecode offset of the `new`.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.10.1.2
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum VerificationType<Cls, U> {
    /// Nothing usable: an unwritten local, the upper half of a wide value, or a failed merge
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,

    /// `this` inside a constructor before the superclass `<init>` runs
    UninitializedThis,
    Object(Cls),

    /// Result of `new` before its `<init>` runs
    Uninitialized(U),
}

/// Verification type used while analyzing a method body
pub type VType = VerificationType<RefType<BinaryName>, Label>;

impl<Cls, U> VerificationType<Cls, U> {
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            VerificationType::Null
                | VerificationType::UninitializedThis
                | VerificationType::Object(_)
                | VerificationType::Uninitialized(_)
        )
    }

    /// Tag of this type in a `StackMapTable` entry
    pub fn tag(&self) -> u8 {
        match self {
            VerificationType::Top => 0,
            VerificationType::Integer => 1,
            VerificationType::Float => 2,
            VerificationType::Double => 3,
            VerificationType::Long => 4,
            VerificationType::Null => 5,
            VerificationType::UninitializedThis => 6,
            VerificationType::Object(_) => 7,
            VerificationType::Uninitialized(_) => 8,
        }
    }

    /// Convert the class and `new` site representations, keeping everything else
    pub fn map<C2, U2, E>(
        &self,
        mut map_class: impl FnMut(&Cls) -> Result<C2, E>,
        mut map_uninitialized: impl FnMut(&U) -> Result<U2, E>,
    ) -> Result<VerificationType<C2, U2>, E> {
        use VerificationType::*;
        let mapped = match self {
            Object(class) => Object(map_class(class)?),
            Uninitialized(site) => Uninitialized(map_uninitialized(site)?),
            Top => Top,
            Integer => Integer,
            Float => Float,
            Double => Double,
            Long => Long,
            Null => Null,
            UninitializedThis => UninitializedThis,
        };
        Ok(mapped)
    }
}

impl<C, U> From<FieldType<C>> for VerificationType<RefType<C>, U> {
    fn from(field_type: FieldType<C>) -> Self {
        match field_type {
            FieldType::Ref(ref_type) => VerificationType::Object(ref_type),
            FieldType::Base(BaseType::Float) => VerificationType::Float,
            FieldType::Base(BaseType::Long) => VerificationType::Long,
            FieldType::Base(BaseType::Double) => VerificationType::Double,
            // boolean, byte, char, short
            FieldType::Base(_) => VerificationType::Integer,
        }
    }
}

impl Serialize for VerificationType<ClassConstantIndex, u16> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.tag().serialize(writer)?;
        match self {
            VerificationType::Object(class) => class.serialize(writer),
            VerificationType::Uninitialized(offset) => offset.serialize(writer),
            _ => Ok(()),
        }
    }
}

impl<Cls, U> Width for VerificationType<Cls, U> {
    fn width(&self) -> usize {
        match self {
            VerificationType::Double | VerificationType::Long => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::ConstantIndex;

    fn bytes(vtype: VerificationType<ClassConstantIndex, u16>) -> Vec<u8> {
        let mut out = vec![];
        vtype.serialize(&mut out).unwrap();
        out
    }

    #[test]
    fn stack_map_encoding() {
        assert_eq!(bytes(VerificationType::Long), vec![4]);
        assert_eq!(
            bytes(VerificationType::Object(ClassConstantIndex(ConstantIndex(0x0102)))),
            vec![7, 0x01, 0x02]
        );
        assert_eq!(bytes(VerificationType::Uninitialized(9)), vec![8, 0, 9]);
    }

    #[test]
    fn small_integers_widen() {
        let boolean: VType = FieldType::Base(BaseType::Boolean).into();
        let long: VType = FieldType::long().into();
        assert_eq!(boolean, VerificationType::Integer);
        assert_eq!(long.width(), 2);
        assert!(!long.is_reference());
        assert!(VType::Null.is_reference());
    }
}
