//! Field and method descriptors ([JVMS 4.3][0])
//!
//! Descriptors come out of the constant pool as strings. Mutation rules parse them to learn the
//! widths of operands (what `pop` or `pop2` to emit) and the frame computation parses them to
//! type locals, fields, and invocation results.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.3

use super::{BinaryName, Name};
use crate::util::Width;
use std::fmt::Display;

/// Types that have a textual descriptor
pub trait RenderDescriptor {
    fn render(&self) -> String {
        let mut out = String::new();
        self.render_to(&mut out);
        out
    }

    fn render_to(&self, out: &mut String);
}

/// Types that can be read back from their textual descriptor
///
/// Errors are messages that mention the full descriptor and where in it parsing stopped.
pub trait ParseDescriptor: Sized {
    fn parse(source: &str) -> Result<Self, String> {
        let mut reader = DescriptorReader {
            source,
            position: 0,
        };
        let parsed = Self::read(&mut reader)?;
        if reader.position < source.len() {
            return Err(reader.error("trailing input"));
        }
        Ok(parsed)
    }

    fn read(reader: &mut DescriptorReader) -> Result<Self, String>;
}

/// Cursor into a descriptor being parsed
///
/// Every character with meaning in a descriptor is ASCII, so the cursor steps over bytes. Class
/// names are sliced out between `L` and `;`, which keeps any non-ASCII characters in them intact.
pub struct DescriptorReader<'a> {
    source: &'a str,
    position: usize,
}

impl<'a> DescriptorReader<'a> {
    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.position).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let next = self.peek()?;
        self.position += 1;
        Some(next)
    }

    fn expect(&mut self, expected: u8) -> Result<(), String> {
        match self.bump() {
            Some(found) if found == expected => Ok(()),
            _ => Err(self.error(format!("expected '{}'", expected as char))),
        }
    }

    fn error(&self, msg: impl Display) -> String {
        format!(
            "{} at index {} of descriptor '{}'",
            msg, self.position, self.source
        )
    }
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    /// Descriptor character and `newarray` type code, in declaration order
    const TABLE: [(BaseType, u8, u8); 8] = [
        (BaseType::Byte, b'B', 8),
        (BaseType::Char, b'C', 5),
        (BaseType::Double, b'D', 7),
        (BaseType::Float, b'F', 6),
        (BaseType::Int, b'I', 10),
        (BaseType::Long, b'J', 11),
        (BaseType::Short, b'S', 9),
        (BaseType::Boolean, b'Z', 4),
    ];

    pub fn descriptor_char(self) -> u8 {
        BaseType::TABLE[self as usize].1
    }

    /// Operand of `newarray` for an array of this type
    pub fn array_code(self) -> u8 {
        BaseType::TABLE[self as usize].2
    }

    pub fn from_array_code(code: u8) -> Option<BaseType> {
        BaseType::TABLE
            .iter()
            .find(|(_, _, table_code)| *table_code == code)
            .map(|(base_type, _, _)| *base_type)
    }

    fn from_descriptor_char(c: u8) -> Option<BaseType> {
        BaseType::TABLE
            .iter()
            .find(|(_, table_char, _)| *table_char == c)
            .map(|(base_type, _, _)| *base_type)
    }
}

impl Width for BaseType {
    fn width(&self) -> usize {
        match self {
            BaseType::Double | BaseType::Long => 2,
            _ => 1,
        }
    }
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, out: &mut String) {
        out.push(self.descriptor_char() as char);
    }
}

impl ParseDescriptor for BaseType {
    fn read(reader: &mut DescriptorReader) -> Result<Self, String> {
        match reader.bump() {
            Some(c) => BaseType::from_descriptor_char(c)
                .ok_or_else(|| reader.error(format!("'{}' is not a base type", c as char))),
            None => Err(reader.error("missing base type")),
        }
    }
}

/// Reference type
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum RefType<Class> {
    Object(Class),
    ObjectArray(ArrayType<Class>),
    PrimitiveArray(ArrayType<BaseType>),
}

/// Array type, stored as its innermost element type plus a dimension count
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ArrayType<T> {
    /// `A[]` has 0 additional dimensions, `A[][][][]` has 3
    pub additional_dimensions: usize,

    /// `A` for all of `A[]`, `A[][]`, ...
    pub element_type: T,
}

impl<T: RenderDescriptor> RenderDescriptor for ArrayType<T> {
    fn render_to(&self, out: &mut String) {
        out.extend(std::iter::repeat('[').take(self.additional_dimensions + 1));
        self.element_type.render_to(out);
    }
}

impl RenderDescriptor for BinaryName {
    fn render_to(&self, out: &mut String) {
        out.push('L');
        out.push_str(self.as_str());
        out.push(';');
    }
}

impl ParseDescriptor for BinaryName {
    fn read(reader: &mut DescriptorReader) -> Result<Self, String> {
        reader.expect(b'L')?;
        let start = reader.position;
        let length = reader.source[start..]
            .find(';')
            .ok_or_else(|| reader.error("unterminated class name"))?;
        reader.position = start + length + 1;
        BinaryName::from_string(reader.source[start..start + length].to_owned())
            .map_err(|msg| reader.error(msg))
    }
}

impl<C: RenderDescriptor> RenderDescriptor for RefType<C> {
    fn render_to(&self, out: &mut String) {
        match self {
            RefType::Object(class) => class.render_to(out),
            RefType::PrimitiveArray(array) => array.render_to(out),
            RefType::ObjectArray(array) => array.render_to(out),
        }
    }
}

impl<C: ParseDescriptor> ParseDescriptor for RefType<C> {
    fn read(reader: &mut DescriptorReader) -> Result<Self, String> {
        let mut dimensions = 0;
        while reader.peek() == Some(b'[') {
            reader.bump();
            dimensions += 1;
        }
        let is_object = reader.peek() == Some(b'L');
        match (dimensions, is_object) {
            (0, true) => Ok(RefType::Object(C::read(reader)?)),
            (0, false) => Err(reader.error("expected a reference type")),
            (n, true) => Ok(RefType::ObjectArray(ArrayType {
                additional_dimensions: n - 1,
                element_type: C::read(reader)?,
            })),
            (n, false) => Ok(RefType::PrimitiveArray(ArrayType {
                additional_dimensions: n - 1,
                element_type: BaseType::read(reader)?,
            })),
        }
    }
}

impl<C> RefType<C> {
    /// Array whose elements have the given type
    pub fn array(element: FieldType<C>) -> RefType<C> {
        match element {
            FieldType::Base(element_type) => RefType::PrimitiveArray(ArrayType {
                additional_dimensions: 0,
                element_type,
            }),
            FieldType::Ref(RefType::Object(element_type)) => RefType::ObjectArray(ArrayType {
                additional_dimensions: 0,
                element_type,
            }),
            FieldType::Ref(RefType::PrimitiveArray(inner)) => RefType::PrimitiveArray(ArrayType {
                additional_dimensions: inner.additional_dimensions + 1,
                element_type: inner.element_type,
            }),
            FieldType::Ref(RefType::ObjectArray(inner)) => RefType::ObjectArray(ArrayType {
                additional_dimensions: inner.additional_dimensions + 1,
                element_type: inner.element_type,
            }),
        }
    }
}

/// Type of a field, local, or method parameter
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType<Class> {
    Base(BaseType),
    Ref(RefType<Class>),
}

impl<C> Width for FieldType<C> {
    fn width(&self) -> usize {
        match self {
            FieldType::Base(base_type) => base_type.width(),
            FieldType::Ref(_) => 1,
        }
    }
}

impl<C> FieldType<C> {
    pub fn array(element: FieldType<C>) -> FieldType<C> {
        FieldType::Ref(RefType::array(element))
    }

    pub const fn object(class_name: C) -> FieldType<C> {
        FieldType::Ref(RefType::Object(class_name))
    }

    pub const fn int() -> FieldType<C> {
        FieldType::Base(BaseType::Int)
    }

    pub const fn long() -> FieldType<C> {
        FieldType::Base(BaseType::Long)
    }

    pub const fn float() -> FieldType<C> {
        FieldType::Base(BaseType::Float)
    }

    pub const fn double() -> FieldType<C> {
        FieldType::Base(BaseType::Double)
    }
}

impl<C: RenderDescriptor> RenderDescriptor for FieldType<C> {
    fn render_to(&self, out: &mut String) {
        match self {
            FieldType::Base(base_type) => base_type.render_to(out),
            FieldType::Ref(ref_type) => ref_type.render_to(out),
        }
    }
}

impl<C: ParseDescriptor> ParseDescriptor for FieldType<C> {
    fn read(reader: &mut DescriptorReader) -> Result<Self, String> {
        match reader.peek() {
            Some(b'L' | b'[') => RefType::read(reader).map(FieldType::Ref),
            _ => BaseType::read(reader).map(FieldType::Base),
        }
    }
}

/// Signature of a method
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct MethodDescriptor<Class> {
    pub parameters: Vec<FieldType<Class>>,

    /// `None` for `void`
    pub return_type: Option<FieldType<Class>>,
}

impl<C> MethodDescriptor<C> {
    /// Number of local variable slots the parameters occupy
    pub fn parameter_length(&self, has_this_param: bool) -> usize {
        let receiver = if has_this_param { 1 } else { 0 };
        receiver + self.parameters.iter().map(Width::width).sum::<usize>()
    }
}

impl<C: RenderDescriptor> RenderDescriptor for MethodDescriptor<C> {
    fn render_to(&self, out: &mut String) {
        out.push('(');
        for parameter in &self.parameters {
            parameter.render_to(out);
        }
        out.push(')');
        match &self.return_type {
            None => out.push('V'),
            Some(return_type) => return_type.render_to(out),
        }
    }
}

impl<C: ParseDescriptor> ParseDescriptor for MethodDescriptor<C> {
    fn read(reader: &mut DescriptorReader) -> Result<Self, String> {
        reader.expect(b'(')?;
        let mut parameters = vec![];
        loop {
            match reader.peek() {
                Some(b')') => break,
                None => return Err(reader.error("unterminated parameter list")),
                Some(_) => parameters.push(FieldType::read(reader)?),
            }
        }
        reader.expect(b')')?;

        let return_type = if reader.peek() == Some(b'V') {
            reader.bump();
            None
        } else {
            Some(FieldType::read(reader)?)
        };
        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    type FT = FieldType<BinaryName>;
    type MD = MethodDescriptor<BinaryName>;

    #[test]
    fn table_follows_declaration_order() {
        for (index, (base_type, _, _)) in BaseType::TABLE.iter().enumerate() {
            assert_eq!(*base_type as usize, index);
        }
    }

    #[test]
    fn base_type_codes() {
        for (descriptor, code) in [("Z", 4), ("C", 5), ("D", 7), ("I", 10), ("J", 11)] {
            let base_type = BaseType::parse(descriptor).unwrap();
            assert_eq!(base_type.render(), descriptor);
            assert_eq!(base_type.array_code(), code);
            assert_eq!(BaseType::from_array_code(code), Some(base_type));
        }
        assert_eq!(BaseType::from_array_code(3), None);
    }

    #[test]
    fn nested_arrays() {
        let parsed = FT::parse("[[[D").unwrap();
        assert_eq!(parsed, FT::array(FT::array(FT::array(FT::double()))));
        assert_eq!(parsed.render(), "[[[D");

        let strings = FT::parse("[Ljava/lang/String;").unwrap();
        assert_eq!(strings, FT::array(FT::object(BinaryName::STRING)));
        assert_eq!(strings.width(), 1);
    }

    #[test]
    fn method_descriptors() {
        let parsed = MD::parse("(IDLjava/lang/Class;)Ljava/lang/Object;").unwrap();
        assert_eq!(
            parsed,
            MethodDescriptor {
                parameters: vec![FT::int(), FT::double(), FT::object(BinaryName::CLASS)],
                return_type: Some(FT::object(BinaryName::OBJECT)),
            }
        );
        assert_eq!(parsed.render(), "(IDLjava/lang/Class;)Ljava/lang/Object;");
        assert_eq!(MD::parse("()V").unwrap().return_type, None);
    }

    #[test]
    fn parameter_slots() {
        let desc = MD::parse("(JIDLjava/lang/String;)V").unwrap();
        assert_eq!(desc.parameter_length(false), 6);
        assert_eq!(desc.parameter_length(true), 7);
    }

    #[test]
    fn class_names_keep_unicode() {
        let parsed = FT::parse("Lcom/example/Café;").unwrap();
        assert_eq!(parsed, FT::object(BinaryName::from("com/example/Café")));
    }

    #[test]
    fn malformed() {
        assert!(MD::parse("(I").is_err());
        assert!(MD::parse("()").is_err());
        assert!(MD::parse("(Q)V").is_err());
        assert!(FT::parse("Ljava/lang/String").is_err());
        assert!(FT::parse("II").is_err());

        let err = FT::parse("[").unwrap_err();
        assert!(err.contains("descriptor '['"), "{}", err);
    }
}
