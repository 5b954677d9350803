use crate::jvm::binary_format::{read_bytes, Deserialize, Serialize};
use crate::jvm::class_file::{Attribute, AttributeLike};
use crate::jvm::descriptors::{ParseDescriptor, RenderDescriptor};
use crate::jvm::names::Name;
use crate::jvm::{BinaryName, Error, RefType};
use crate::util::{Offset, OffsetVec, Width};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::hash::Hash;
use std::io::{Error as IoError, ErrorKind};

/// Class file constants pool
///
/// The pool is parsed from an existing class and afterwards is append only: indices that existed
/// in the parsed class never move, so everything outside a rewritten method can be copied over
/// verbatim. New entries are de-duplicated against everything already in the pool.
#[derive(Debug, Clone)]
pub struct ConstantsPool {
    constants: OffsetVec<Constant>,

    utf8s: HashMap<String, Utf8ConstantIndex>,
    classes: HashMap<Utf8ConstantIndex, ClassConstantIndex>,
    name_and_types: HashMap<(Utf8ConstantIndex, Utf8ConstantIndex), NameAndTypeConstantIndex>,
    members: HashMap<(ClassConstantIndex, NameAndTypeConstantIndex, MemberKind), ConstantIndex>,
}

/// Distinguishes the three member reference constants when de-duplicating
#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
enum MemberKind {
    Field,
    Method,
    InterfaceMethod,
}

impl Default for ConstantsPool {
    fn default() -> Self {
        ConstantsPool::new()
    }
}

impl ConstantsPool {
    /// Make a fresh empty constants pool
    pub fn new() -> ConstantsPool {
        ConstantsPool {
            constants: OffsetVec::new_starting_at(Offset(1)),
            utf8s: HashMap::new(),
            classes: HashMap::new(),
            name_and_types: HashMap::new(),
            members: HashMap::new(),
        }
    }

    /// Read a constants pool (including its leading count)
    pub fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<ConstantsPool, Error> {
        let count = u16::deserialize(reader)? as usize;
        let mut pool = ConstantsPool::new();
        while pool.constants.offset_len().0 < count {
            let constant = Constant::deserialize(reader)?;
            let index = ConstantIndex(pool.constants.offset_len().0 as u16);
            if pool.constants.offset_len().0 + constant.width() > count {
                return Err(Error::MalformedClass(format!(
                    "constant #{} overruns the pool",
                    index.0
                )));
            }
            match &constant {
                Constant::Utf8(string) => {
                    pool.utf8s
                        .entry(string.clone())
                        .or_insert(Utf8ConstantIndex(index));
                }
                Constant::Class(name) => {
                    pool.classes
                        .entry(*name)
                        .or_insert(ClassConstantIndex(index));
                }
                Constant::NameAndType { name, descriptor } => {
                    pool.name_and_types
                        .entry((*name, *descriptor))
                        .or_insert(NameAndTypeConstantIndex(index));
                }
                Constant::FieldRef(class, name_and_type) => {
                    pool.members
                        .entry((*class, *name_and_type, MemberKind::Field))
                        .or_insert(index);
                }
                Constant::MethodRef {
                    class,
                    name_and_type,
                    is_interface,
                } => {
                    let kind = if *is_interface {
                        MemberKind::InterfaceMethod
                    } else {
                        MemberKind::Method
                    };
                    pool.members
                        .entry((*class, *name_and_type, kind))
                        .or_insert(index);
                }
                _ => (),
            }
            pool.constants.push(constant);
        }
        Ok(pool)
    }

    /// Number of slots in use, as written in the class file header
    pub fn count(&self) -> u16 {
        self.constants.offset_len().0 as u16
    }

    /// Get or insert a utf8 constant from the constant pool
    pub fn get_utf8<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        utf8: S,
    ) -> Result<Utf8ConstantIndex, Error> {
        let utf8 = utf8.into();
        if let Some(index) = self.utf8s.get::<str>(utf8.borrow()) {
            return Ok(*index);
        }
        let utf8 = utf8.into_owned();
        let key = utf8.clone();
        intern(&mut self.constants, &mut self.utf8s, key, Utf8ConstantIndex, || {
            Constant::Utf8(utf8)
        })
    }

    /// Get or insert a class constant from the constant pool
    ///
    /// Array types are named by their descriptor, see [the class file format][0].
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4.1
    pub fn get_class(
        &mut self,
        ref_type: &RefType<BinaryName>,
    ) -> Result<ClassConstantIndex, Error> {
        let name = match ref_type {
            RefType::Object(class) => self.get_utf8(class.as_str())?,
            array => self.get_utf8(array.render())?,
        };
        intern(&mut self.constants, &mut self.classes, name, ClassConstantIndex, || {
            Constant::Class(name)
        })
    }

    /// Get or insert a name & type constant from the constant pool
    pub fn get_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        let name = self.get_utf8(name)?;
        let descriptor = self.get_utf8(descriptor)?;
        let key = (name, descriptor);
        let typed = NameAndTypeConstantIndex;
        intern(&mut self.constants, &mut self.name_and_types, key, typed, || {
            Constant::NameAndType { name, descriptor }
        })
    }

    fn get_member(
        &mut self,
        class: &BinaryName,
        name: &str,
        descriptor: &str,
        kind: MemberKind,
    ) -> Result<ConstantIndex, Error> {
        let class = self.get_class(&RefType::Object(class.clone()))?;
        let name_and_type = self.get_name_and_type(name, descriptor)?;
        let key = (class, name_and_type, kind);
        intern(&mut self.constants, &mut self.members, key, |index| index, || {
            match kind {
                MemberKind::Field => Constant::FieldRef(class, name_and_type),
                MemberKind::Method | MemberKind::InterfaceMethod => Constant::MethodRef {
                    class,
                    name_and_type,
                    is_interface: kind == MemberKind::InterfaceMethod,
                },
            }
        })
    }

    /// Get or insert a field reference constant from the constant pool
    pub fn get_field_ref(
        &mut self,
        class: &BinaryName,
        name: &str,
        descriptor: &str,
    ) -> Result<FieldRefConstantIndex, Error> {
        self.get_member(class, name, descriptor, MemberKind::Field)
            .map(FieldRefConstantIndex)
    }

    /// Get or insert a method (or interface method) reference constant from the constant pool
    pub fn get_method_ref(
        &mut self,
        class: &BinaryName,
        name: &str,
        descriptor: &str,
        is_interface: bool,
    ) -> Result<MethodRefConstantIndex, Error> {
        let kind = if is_interface {
            MemberKind::InterfaceMethod
        } else {
            MemberKind::Method
        };
        self.get_member(class, name, descriptor, kind)
            .map(MethodRefConstantIndex)
    }

    /// Add an attribute to the constant pool
    pub fn get_attribute<A: AttributeLike>(&mut self, attribute: &A) -> Result<Attribute, Error> {
        let name_index = self.get_utf8(A::NAME)?;
        let mut info = vec![];
        attribute.serialize(&mut info)?;
        Ok(Attribute { name_index, info })
    }

    /// Look up a constant by its index
    pub fn get(&self, index: ConstantIndex) -> Result<&Constant, Error> {
        self.constants
            .get_offset(Offset(index.0 as usize))
            .ok_or(Error::MissingConstant(index))
    }

    /// Look up the string contents of a utf8 constant
    pub fn utf8(&self, index: Utf8ConstantIndex) -> Result<&str, Error> {
        match self.get(index.0)? {
            Constant::Utf8(string) => Ok(string),
            _ => Err(Error::UnexpectedConstant {
                index: index.0,
                expected: "a decodable utf8 constant",
            }),
        }
    }

    /// Look up the name of a class constant
    ///
    /// For array classes, this is the array descriptor (eg. `[Ljava/lang/String;`).
    pub fn class_name(&self, index: ClassConstantIndex) -> Result<&str, Error> {
        match self.get(index.0)? {
            Constant::Class(name) => self.utf8(*name),
            _ => Err(Error::UnexpectedConstant {
                index: index.0,
                expected: "a class",
            }),
        }
    }

    /// Look up a class constant as a reference type
    pub fn class_type(&self, index: ClassConstantIndex) -> Result<RefType<BinaryName>, Error> {
        let name = self.class_name(index)?;
        if name.starts_with('[') {
            RefType::parse(name).map_err(Error::BadDescriptor)
        } else {
            BinaryName::from_str(name)
                .map(RefType::Object)
                .map_err(Error::MalformedClass)
        }
    }

    /// Look up the name and descriptor of a name & type constant
    pub fn name_and_type(&self, index: NameAndTypeConstantIndex) -> Result<(&str, &str), Error> {
        match self.get(index.0)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(Error::UnexpectedConstant {
                index: index.0,
                expected: "a name and type",
            }),
        }
    }

    /// Look up a field, method, or interface method reference
    pub fn member_ref(&self, index: ConstantIndex) -> Result<MemberRef<'_>, Error> {
        let (class, name_and_type, is_interface) = match self.get(index)? {
            Constant::FieldRef(class, name_and_type) => (*class, *name_and_type, false),
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => (*class, *name_and_type, *is_interface),
            _ => {
                return Err(Error::UnexpectedConstant {
                    index,
                    expected: "a member reference",
                })
            }
        };
        let (name, descriptor) = self.name_and_type(name_and_type)?;
        Ok(MemberRef {
            class: self.class_name(class)?,
            name,
            descriptor,
            is_interface,
        })
    }

    /// Look up the method descriptor of an `invokedynamic` call site
    pub fn invoke_dynamic_descriptor(
        &self,
        index: InvokeDynamicConstantIndex,
    ) -> Result<&str, Error> {
        match self.get(index.0)? {
            Constant::InvokeDynamic {
                method_descriptor, ..
            } => Ok(self.name_and_type(*method_descriptor)?.1),
            _ => Err(Error::UnexpectedConstant {
                index: index.0,
                expected: "an invokedynamic call site",
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConstantIndex, &Constant)> {
        self.constants
            .iter()
            .map(|(offset, _, constant)| (ConstantIndex(offset.0 as u16), constant))
    }
}

/// Look `key` up in one of the de-duplication maps, pushing a new constant if it is missing
///
/// The largest usable index is 65535 and `long`/`double` constants take two indices.
fn intern<K: Hash + Eq, I: Copy>(
    constants: &mut OffsetVec<Constant>,
    existing: &mut HashMap<K, I>,
    key: K,
    typed: impl FnOnce(ConstantIndex) -> I,
    make: impl FnOnce() -> Constant,
) -> Result<I, Error> {
    if let Some(index) = existing.get(&key) {
        return Ok(*index);
    }
    let constant = make();
    let offset = constants.offset_len().0;
    if offset + constant.width() > u16::MAX as usize {
        return Err(Error::ConstantPoolOverflow { constant, offset });
    }
    constants.push(constant);
    let index = typed(ConstantIndex(offset as u16));
    existing.insert(key, index);
    Ok(index)
}

impl Serialize for ConstantsPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.count().serialize(writer)?;
        for (_, _, constant) in &self.constants {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

/// Resolved `Fieldref`, `Methodref`, or `InterfaceMethodref`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub class: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
    pub is_interface: bool,
}

/// Entry of the constant pool
///
/// See [the class file format][0]. `Methodref` and `InterfaceMethodref` share one variant.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone)]
pub enum Constant {
    Class(Utf8ConstantIndex),
    FieldRef(ClassConstantIndex, NameAndTypeConstantIndex),
    MethodRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_interface: bool,
    },
    String(Utf8ConstantIndex),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Text stored in [modified UTF-8](encode_modified_utf8)
    Utf8(String),

    /// `Utf8` entry that does not decode to a string and re-encode to the same bytes (eg. an
    /// unpaired surrogate), kept as is
    RawUtf8(Vec<u8>),

    /// `member` is a field reference for the field handle kinds, a method reference otherwise
    MethodHandle {
        handle_kind: HandleKind,
        member: ConstantIndex,
    },
    MethodType {
        descriptor: Utf8ConstantIndex,
    },

    /// Dynamically-computed constant
    Dynamic {
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Call site of an `invokedynamic` (`bootstrap_method` indexes `BootstrapMethods`)
    InvokeDynamic {
        bootstrap_method: u16,
        method_descriptor: NameAndTypeConstantIndex,
    },
    Module(Utf8ConstantIndex),
    Package(Utf8ConstantIndex),
}

impl Constant {
    /// Tag byte that starts the entry in the class file
    pub fn tag(&self) -> u8 {
        match self {
            Constant::Utf8(_) | Constant::RawUtf8(_) => 1,
            Constant::Integer(_) => 3,
            Constant::Float(_) => 4,
            Constant::Long(_) => 5,
            Constant::Double(_) => 6,
            Constant::Class(_) => 7,
            Constant::String(_) => 8,
            Constant::FieldRef(_, _) => 9,
            Constant::MethodRef { is_interface, .. } => 10 + *is_interface as u8,
            Constant::NameAndType { .. } => 12,
            Constant::MethodHandle { .. } => 15,
            Constant::MethodType { .. } => 16,
            Constant::Dynamic { .. } => 17,
            Constant::InvokeDynamic { .. } => 18,
            Constant::Module(_) => 19,
            Constant::Package(_) => 20,
        }
    }
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.tag().serialize(writer)?;
        match self {
            Constant::Utf8(string) => {
                let encoded = encode_modified_utf8(string);
                (encoded.len() as u16).serialize(writer)?;
                writer.write_all(&encoded)
            }
            Constant::RawUtf8(bytes) => {
                (bytes.len() as u16).serialize(writer)?;
                writer.write_all(bytes)
            }
            Constant::Integer(value) => value.serialize(writer),
            Constant::Float(value) => value.to_bits().serialize(writer),
            Constant::Long(value) => value.serialize(writer),
            Constant::Double(value) => value.to_bits().serialize(writer),
            Constant::Class(utf8)
            | Constant::String(utf8)
            | Constant::MethodType { descriptor: utf8 }
            | Constant::Module(utf8)
            | Constant::Package(utf8) => utf8.serialize(writer),
            Constant::FieldRef(class, name_and_type)
            | Constant::MethodRef {
                class,
                name_and_type,
                ..
            } => {
                class.serialize(writer)?;
                name_and_type.serialize(writer)
            }
            Constant::NameAndType { name, descriptor } => {
                name.serialize(writer)?;
                descriptor.serialize(writer)
            }
            Constant::MethodHandle {
                handle_kind,
                member,
            } => {
                handle_kind.serialize(writer)?;
                member.serialize(writer)
            }
            Constant::Dynamic {
                bootstrap_method,
                name_and_type,
            }
            | Constant::InvokeDynamic {
                bootstrap_method,
                method_descriptor: name_and_type,
            } => {
                bootstrap_method.serialize(writer)?;
                name_and_type.serialize(writer)
            }
        }
    }
}

impl Deserialize for Constant {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        let tag = u8::deserialize(reader)?;
        let constant = match tag {
            1 => {
                let len = u16::deserialize(reader)? as usize;
                let bytes = read_bytes(reader, len)?;
                match decode_modified_utf8(&bytes) {
                    Some(string) if encode_modified_utf8(&string) == bytes => {
                        Constant::Utf8(string)
                    }
                    _ => Constant::RawUtf8(bytes),
                }
            }
            3 => Constant::Integer(i32::deserialize(reader)?),
            4 => Constant::Float(f32::from_bits(u32::deserialize(reader)?)),
            5 => Constant::Long(i64::deserialize(reader)?),
            6 => Constant::Double(f64::from_bits(u64::deserialize(reader)?)),
            7 | 8 | 16 | 19 | 20 => {
                let utf8 = Utf8ConstantIndex::deserialize(reader)?;
                match tag {
                    7 => Constant::Class(utf8),
                    8 => Constant::String(utf8),
                    16 => Constant::MethodType { descriptor: utf8 },
                    19 => Constant::Module(utf8),
                    _ => Constant::Package(utf8),
                }
            }
            9 | 10 | 11 => {
                let class = ClassConstantIndex::deserialize(reader)?;
                let name_and_type = NameAndTypeConstantIndex::deserialize(reader)?;
                if tag == 9 {
                    Constant::FieldRef(class, name_and_type)
                } else {
                    Constant::MethodRef {
                        class,
                        name_and_type,
                        is_interface: tag == 11,
                    }
                }
            }
            12 => Constant::NameAndType {
                name: Utf8ConstantIndex::deserialize(reader)?,
                descriptor: Utf8ConstantIndex::deserialize(reader)?,
            },
            15 => Constant::MethodHandle {
                handle_kind: HandleKind::deserialize(reader)?,
                member: ConstantIndex::deserialize(reader)?,
            },
            17 | 18 => {
                let bootstrap_method = u16::deserialize(reader)?;
                let name_and_type = NameAndTypeConstantIndex::deserialize(reader)?;
                if tag == 17 {
                    Constant::Dynamic {
                        bootstrap_method,
                        name_and_type,
                    }
                } else {
                    Constant::InvokeDynamic {
                        bootstrap_method,
                        method_descriptor: name_and_type,
                    }
                }
            }
            other => {
                let msg = format!("unknown constant pool tag {}", other);
                return Err(IoError::new(ErrorKind::InvalidData, msg));
            }
        };
        Ok(constant)
    }
}

/// Encode text the way class files store it
///
/// This is [modified UTF-8][0]: text is first split into UTF-16 code units (so supplementary
/// characters become surrogate pairs), each unit takes one to three bytes, and `\0` takes two.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(string.len());
    for unit in string.encode_utf16() {
        match unit {
            0x0001..=0x007F => encoded.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                encoded.push(0xC0 | (unit >> 6) as u8);
                encoded.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                encoded.push(0xE0 | (unit >> 12) as u8);
                encoded.push(0x80 | (unit >> 6 & 0x3F) as u8);
                encoded.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    encoded
}

/// Inverse of [`encode_modified_utf8`]
///
/// `None` if the bytes are malformed or hold surrogates that don't pair up.
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let continuation = |byte: Option<&u8>| match byte {
        Some(byte) if byte & 0xC0 == 0x80 => Some((byte & 0x3F) as u16),
        _ => None,
    };

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut rest = bytes.iter();
    while let Some(&lead) = rest.next() {
        let unit = match lead {
            0x01..=0x7F => lead as u16,
            0xC0..=0xDF => ((lead & 0x1F) as u16) << 6 | continuation(rest.next())?,
            0xE0..=0xEF => {
                let high = continuation(rest.next())?;
                ((lead & 0x0F) as u16) << 12 | high << 6 | continuation(rest.next())?
            }
            _ => return None,
        };
        units.push(unit);
    }
    String::from_utf16(&units).ok()
}


/// `long` and `double` constants take up two pool indices, the second of which is unusable
impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct ConstantIndex(pub u16);

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Deserialize for ConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        u16::deserialize(reader).map(ConstantIndex)
    }
}

/// Index that is known to point at one kind of constant
macro_rules! typed_index {
    ($($(#[$attr:meta])* $name:ident;)*) => {$(
        $(#[$attr])*
        #[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
        pub struct $name(pub ConstantIndex);

        impl From<$name> for ConstantIndex {
            fn from(index: $name) -> ConstantIndex {
                index.0
            }
        }

        impl Serialize for $name {
            fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                self.0.serialize(writer)
            }
        }

        impl Deserialize for $name {
            fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
                ConstantIndex::deserialize(reader).map($name)
            }
        }
    )*};
}

typed_index! {
    Utf8ConstantIndex;
    NameAndTypeConstantIndex;
    ClassConstantIndex;
    FieldRefConstantIndex;
    /// Either a `Methodref` or an `InterfaceMethodref`
    MethodRefConstantIndex;
    InvokeDynamicConstantIndex;
}

/// [Reference kind][0] of a method handle
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-5.html#jvms-5.4.3.5
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum HandleKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl HandleKind {
    /// In order of their encoding, which starts at 1
    const ALL: [HandleKind; 9] = [
        HandleKind::GetField,
        HandleKind::GetStatic,
        HandleKind::PutField,
        HandleKind::PutStatic,
        HandleKind::InvokeVirtual,
        HandleKind::InvokeStatic,
        HandleKind::InvokeSpecial,
        HandleKind::NewInvokeSpecial,
        HandleKind::InvokeInterface,
    ];
}

impl Serialize for HandleKind {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        let position = HandleKind::ALL.iter().position(|kind| kind == self);
        (position.unwrap_or(0) as u8 + 1).serialize(writer)
    }
}

impl Deserialize for HandleKind {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        let encoded = u8::deserialize(reader)?;
        (encoded as usize)
            .checked_sub(1)
            .and_then(|position| HandleKind::ALL.get(position))
            .copied()
            .ok_or_else(|| {
                let msg = format!("unknown method handle kind {}", encoded);
                IoError::new(ErrorKind::InvalidData, msg)
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_pool(bytes: &[u8]) -> ConstantsPool {
        ConstantsPool::parse(&mut &bytes[..]).unwrap()
    }

    #[test]
    fn wide_constants_take_two_slots() {
        let mut bytes: Vec<u8> = vec![0, 5];
        bytes.extend([5, 0, 0, 0, 0, 0, 0, 0, 42]); // #1 long
        bytes.extend([1, 0, 1, b'A']); // #3 utf8
        bytes.extend([7, 0, 3]); // #4 class
        let pool = parse_pool(&bytes);
        assert_eq!(pool.count(), 5);
        assert!(matches!(pool.get(ConstantIndex(1)), Ok(Constant::Long(42))));
        assert!(matches!(
            pool.get(ConstantIndex(2)),
            Err(Error::MissingConstant(ConstantIndex(2)))
        ));
        let class = ClassConstantIndex(ConstantIndex(4));
        assert_eq!(pool.class_name(class).unwrap(), "A");

        let mut out = vec![];
        pool.serialize(&mut out).unwrap();
        assert_eq!(out, bytes);
    }

    #[test]
    fn insertion_reuses_parsed_entries() {
        let mut bytes: Vec<u8> = vec![0, 3];
        bytes.extend([1, 0, 1, b'A']); // #1 utf8
        bytes.extend([7, 0, 1]); // #2 class
        let mut pool = parse_pool(&bytes);

        let class = RefType::Object(BinaryName::from_str("A").unwrap());
        assert_eq!(
            pool.get_class(&class).unwrap(),
            ClassConstantIndex(ConstantIndex(2))
        );
        assert_eq!(pool.count(), 3);

        let string = RefType::Object(BinaryName::STRING);
        assert_eq!(
            pool.get_class(&string).unwrap(),
            ClassConstantIndex(ConstantIndex(4))
        );
        let name = Utf8ConstantIndex(ConstantIndex(3));
        assert_eq!(pool.utf8(name).unwrap(), "java/lang/String");
        assert_eq!(pool.count(), 5);
    }

    #[test]
    fn member_references_are_shared() {
        let mut pool = ConstantsPool::new();
        let owner = BinaryName::from("com/example/Point");
        let x = pool.get_field_ref(&owner, "x", "I").unwrap();
        assert_eq!(pool.get_field_ref(&owner, "x", "I").unwrap(), x);

        let init = pool.get_method_ref(&owner, "<init>", "()V", false).unwrap();
        let member = pool.member_ref(init.0).unwrap();
        assert_eq!(member.class, "com/example/Point");
        assert_eq!(member.name, "<init>");
        assert!(!member.is_interface);

        // Same name and type, but a different kind of member
        let default = pool.get_method_ref(&owner, "<init>", "()V", true).unwrap();
        assert_ne!(default, init);

        let count = pool.count();
        let mut out = vec![];
        pool.serialize(&mut out).unwrap();
        let mut reparsed = parse_pool(&out);
        assert_eq!(reparsed.get_field_ref(&owner, "x", "I").unwrap(), x);
        assert_eq!(reparsed.count(), count);
    }

    #[test]
    fn truncated_pool_is_an_error() {
        let bytes = vec![0, 3, 1, 0, 5, b'a'];
        assert!(ConstantsPool::parse(&mut &bytes[..]).is_err());
    }
}
