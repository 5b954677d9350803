use crate::jvm::binary_format::{read_bytes, Deserialize, Serialize};
use crate::jvm::class_file::{ClassConstantIndex, ConstantsPool, Utf8ConstantIndex};
use crate::jvm::verifier::VerificationType;
use crate::jvm::Error;
use byteorder::{ReadBytesExt, WriteBytesExt};

/// Attributes (used in classes, fields, methods, and even on some attributes)
///
/// Attributes are kept as raw bytes unless something needs to look inside them. This is what
/// makes it possible to copy attributes we know nothing about through unchanged.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name_index: Utf8ConstantIndex,
    pub info: Vec<u8>,
}

impl Attribute {
    /// Name of the attribute, as found in the constant pool
    pub fn name<'a>(&self, constants: &'a ConstantsPool) -> Result<&'a str, Error> {
        constants.utf8(self.name_index)
    }

    /// Interpret the attribute body
    pub fn decode<A: AttributeLike + Deserialize>(&self) -> Result<A, Error> {
        let mut reader: &[u8] = &self.info;
        let attribute = A::deserialize(&mut reader)
            .map_err(|err| Error::MalformedClass(format!("bad {} attribute: {}", A::NAME, err)))?;
        if !reader.is_empty() {
            return Err(Error::MalformedClass(format!(
                "{} trailing bytes in {} attribute",
                reader.len(),
                A::NAME
            )));
        }
        Ok(attribute)
    }
}

impl Serialize for Attribute {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.name_index.serialize(writer)?;

        // Attribute info length is 4 bytes
        (self.info.len() as u32).serialize(writer)?;
        writer.write_all(&self.info)?;

        Ok(())
    }
}

impl Deserialize for Attribute {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        let name_index = Utf8ConstantIndex::deserialize(reader)?;
        let len = u32::deserialize(reader)?;
        let info = read_bytes(reader, len as usize)?;
        Ok(Attribute { name_index, info })
    }
}

/// Attributes are all stored in the same way (see `Attribute`), but internally
/// they represent very different things. This trait is implemented by things
/// which can be turned into attributes.
pub trait AttributeLike: Serialize {
    /// Name of the attribute
    const NAME: &'static str;
}

/// Implement `Serialize` and `Deserialize` for a struct stored as its fields in order
macro_rules! fixed_layout {
    ($name:ident { $($field:ident: $typ:ty),* $(,)? }) => {
        impl Serialize for $name {
            fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                $(self.$field.serialize(writer)?;)*
                Ok(())
            }
        }

        impl Deserialize for $name {
            fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
                Ok($name {
                    $($field: <$typ>::deserialize(reader)?,)*
                })
            }
        }
    };
}

/// Attribute whose body is a `u16`-counted list of entries
macro_rules! list_attribute {
    ($(#[$attr:meta])* $name:ident($entry:ty) = $attribute_name:literal) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(pub Vec<$entry>);

        impl AttributeLike for $name {
            const NAME: &'static str = $attribute_name;
        }

        impl Serialize for $name {
            fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                self.0.serialize(writer)
            }
        }

        impl Deserialize for $name {
            fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
                Vec::deserialize(reader).map($name)
            }
        }
    };
}

/// Body of a method, see [`crate::jvm::code`] for the decoded form
#[derive(Debug, Clone)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_array: BytecodeArray,
    pub exception_table: Vec<ExceptionHandler>,

    /// Usually `LineNumberTable`, `LocalVariableTable` and `StackMapTable`
    pub attributes: Vec<Attribute>,
}

fixed_layout!(Code {
    max_stack: u16,
    max_locals: u16,
    code_array: BytecodeArray,
    exception_table: Vec<ExceptionHandler>,
    attributes: Vec<Attribute>,
});

impl AttributeLike for Code {
    const NAME: &'static str = "Code";
}

/// Entry of the exception table, covering `start_pc..end_pc`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start_pc: BytecodeIndex,
    pub end_pc: BytecodeIndex,
    pub handler_pc: BytecodeIndex,

    /// Index zero catches everything (`finally` blocks)
    pub catch_type: ClassConstantIndex,
}

fixed_layout!(ExceptionHandler {
    start_pc: BytecodeIndex,
    end_pc: BytecodeIndex,
    handler_pc: BytecodeIndex,
    catch_type: ClassConstantIndex,
});

/// Encoded instructions of a method, prefixed by a 4-byte length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytecodeArray(pub Vec<u8>);

impl Serialize for BytecodeArray {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        (self.0.len() as u32).serialize(writer)?;
        writer.write_all(&self.0)
    }
}

impl Deserialize for BytecodeArray {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        let len = u32::deserialize(reader)? as usize;
        read_bytes(reader, len).map(BytecodeArray)
    }
}

/// Offset into a [`BytecodeArray`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BytecodeIndex(pub u16);

impl Serialize for BytecodeIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Deserialize for BytecodeIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        u16::deserialize(reader).map(BytecodeIndex)
    }
}

/// Source line starting at an offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
    pub start_pc: BytecodeIndex,
    pub line_number: u16,
}

fixed_layout!(LineNumber {
    start_pc: BytecodeIndex,
    line_number: u16,
});

list_attribute!(LineNumberTable(LineNumber) = "LineNumberTable");

/// Entry of a `LocalVariableTable` or `LocalVariableTypeTable`
///
/// `descriptor_index` names a field descriptor in the first and a generic signature in the
/// second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVariable {
    pub start_pc: BytecodeIndex,
    pub length: u16,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub index: u16,
}

fixed_layout!(LocalVariable {
    start_pc: BytecodeIndex,
    length: u16,
    name_index: Utf8ConstantIndex,
    descriptor_index: Utf8ConstantIndex,
    index: u16,
});

list_attribute!(LocalVariableTable(LocalVariable) = "LocalVariableTable");
list_attribute!(LocalVariableTypeTable(LocalVariable) = "LocalVariableTypeTable");

/// Verification frames at the branch targets of a method
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.4
#[derive(Debug, Clone, PartialEq)]
pub struct StackMapTable(pub Vec<StackMapFrame>);

impl StackMapTable {
    /// Existing tables describe the old bytecode offsets, so they are never carried over
    pub const NAME: &'static str = "StackMapTable";
}

impl AttributeLike for StackMapTable {
    const NAME: &'static str = StackMapTable::NAME;
}

impl Serialize for StackMapTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

type FrameType = VerificationType<ClassConstantIndex, u16>;

/// One entry of a [`StackMapTable`], relative to the entry before it
#[derive(Debug, Clone, PartialEq)]
pub enum StackMapFrame {
    /// Same locals, empty stack
    SameLocalsNoStack { offset_delta: u16 },

    /// Same locals, one value on the stack
    SameLocalsOneStack {
        offset_delta: u16,
        stack: FrameType,
    },

    /// Last 1 to 3 locals removed, empty stack
    ChopLocalsNoStack { offset_delta: u16, chopped_k: u8 },

    /// 1 to 3 locals added, empty stack
    AppendLocalsNoStack {
        offset_delta: u16,
        locals: Vec<FrameType>,
    },

    Full {
        offset_delta: u16,
        locals: Vec<FrameType>,
        stack: Vec<FrameType>,
    },
}

impl StackMapFrame {
    /// Frame type byte, and whether `offset_delta` is written after it
    fn frame_type(&self) -> std::io::Result<(u8, Option<u16>)> {
        let invalid = |msg: &str| std::io::Error::new(std::io::ErrorKind::InvalidInput, msg);
        let frame_type = match self {
            StackMapFrame::SameLocalsNoStack { offset_delta } => match *offset_delta {
                delta @ 0..=63 => (delta as u8, None),
                delta => (251, Some(delta)),
            },
            StackMapFrame::SameLocalsOneStack { offset_delta, .. } => match *offset_delta {
                delta @ 0..=63 => (64 + delta as u8, None),
                delta => (247, Some(delta)),
            },
            StackMapFrame::ChopLocalsNoStack {
                offset_delta,
                chopped_k,
            } => match *chopped_k {
                chopped @ 1..=3 => (251 - chopped, Some(*offset_delta)),
                _ => return Err(invalid("chop frames remove 1 to 3 locals")),
            },
            StackMapFrame::AppendLocalsNoStack {
                offset_delta,
                locals,
            } => match locals.len() {
                added @ 1..=3 => (251 + added as u8, Some(*offset_delta)),
                _ => return Err(invalid("append frames add 1 to 3 locals")),
            },
            StackMapFrame::Full { offset_delta, .. } => (255, Some(*offset_delta)),
        };
        Ok(frame_type)
    }
}

impl Serialize for StackMapFrame {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        let (frame_type, offset_delta) = self.frame_type()?;
        frame_type.serialize(writer)?;
        if let Some(offset_delta) = offset_delta {
            offset_delta.serialize(writer)?;
        }
        match self {
            StackMapFrame::SameLocalsOneStack { stack, .. } => stack.serialize(writer),
            StackMapFrame::AppendLocalsNoStack { locals, .. } => {
                locals.iter().try_for_each(|local| local.serialize(writer))
            }
            StackMapFrame::Full { locals, stack, .. } => {
                locals.serialize(writer)?;
                stack.serialize(writer)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::ConstantIndex;

    #[test]
    fn frame_tags() {
        let object = VerificationType::Object(ClassConstantIndex(ConstantIndex(7)));
        let cases = vec![
            (StackMapFrame::SameLocalsNoStack { offset_delta: 5 }, vec![5]),
            (
                StackMapFrame::SameLocalsNoStack { offset_delta: 300 },
                vec![251, 1, 44],
            ),
            (
                StackMapFrame::SameLocalsOneStack {
                    offset_delta: 2,
                    stack: VerificationType::Integer,
                },
                vec![66, 1],
            ),
            (
                StackMapFrame::ChopLocalsNoStack {
                    offset_delta: 4,
                    chopped_k: 2,
                },
                vec![249, 0, 4],
            ),
            (
                StackMapFrame::AppendLocalsNoStack {
                    offset_delta: 0,
                    locals: vec![VerificationType::Long, object],
                },
                vec![253, 0, 0, 4, 7, 0, 7],
            ),
            (
                StackMapFrame::Full {
                    offset_delta: 1,
                    locals: vec![VerificationType::Top],
                    stack: vec![VerificationType::Null],
                },
                vec![255, 0, 1, 0, 1, 0, 0, 1, 5],
            ),
        ];
        for (frame, expected) in cases {
            let mut out = vec![];
            frame.serialize(&mut out).unwrap();
            assert_eq!(out, expected, "{:?}", frame);
        }
    }

    #[test]
    fn code_attribute_round_trip() {
        let code = Code {
            max_stack: 2,
            max_locals: 1,
            code_array: BytecodeArray(vec![0x1a, 0xac]),
            exception_table: vec![ExceptionHandler {
                start_pc: BytecodeIndex(0),
                end_pc: BytecodeIndex(1),
                handler_pc: BytecodeIndex(1),
                catch_type: ClassConstantIndex(ConstantIndex(0)),
            }],
            attributes: vec![],
        };
        let mut info = vec![];
        code.serialize(&mut info).unwrap();
        let attribute = Attribute {
            name_index: Utf8ConstantIndex(ConstantIndex(1)),
            info,
        };
        let parsed: Code = attribute.decode().unwrap();
        assert_eq!(parsed.code_array, code.code_array);
        assert_eq!(parsed.exception_table, code.exception_table);
    }
}
