use crate::jvm::class_file::{
    Attribute, ClassConstantIndex, Code, ConstantIndex, ConstantsPool, Deserialize, Field, Method,
    Serialize, Version,
};
use crate::jvm::{ClassAccessFlags, Error};
use byteorder::WriteBytesExt;
use std::io::ErrorKind;

/// Representation of the [`class` file format of the JVM][0]
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub version: Version,
    pub constants: ConstantsPool,
    pub access_flags: ClassAccessFlags,
    pub this_class: ClassConstantIndex,

    /// Zero only for `java/lang/Object`
    pub super_class: ClassConstantIndex,
    pub interfaces: Vec<ClassConstantIndex>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Magic header bytes that go at the front of the serialized class file
    const MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

    /// Parse a complete class file
    ///
    /// Running out of input and leftover input are both reported as a malformed class.
    pub fn parse(bytes: &[u8]) -> Result<ClassFile, Error> {
        let mut reader = bytes;
        let class = ClassFile::parse_from(&mut reader).map_err(|err| match err {
            Error::IoError(err) if err.kind() == ErrorKind::UnexpectedEof => {
                Error::MalformedClass(String::from("unexpected end of class file"))
            }
            Error::IoError(err) => Error::MalformedClass(err.to_string()),
            other => other,
        })?;
        if !reader.is_empty() {
            return Err(Error::MalformedClass(format!(
                "{} trailing bytes after class file",
                reader.len()
            )));
        }
        Ok(class)
    }

    fn parse_from(reader: &mut &[u8]) -> Result<ClassFile, Error> {
        let mut magic = [0; 4];
        std::io::Read::read_exact(reader, &mut magic)?;
        if magic != ClassFile::MAGIC {
            return Err(Error::MalformedClass(format!(
                "bad magic number {:02X?}",
                magic
            )));
        }
        Ok(ClassFile {
            version: Version::deserialize(reader)?,
            constants: ConstantsPool::parse(reader)?,
            access_flags: ClassAccessFlags::deserialize(reader)?,
            this_class: ClassConstantIndex::deserialize(reader)?,
            super_class: ClassConstantIndex::deserialize(reader)?,
            interfaces: Vec::deserialize(reader)?,
            fields: Vec::deserialize(reader)?,
            methods: Vec::deserialize(reader)?,
            attributes: Vec::deserialize(reader)?,
        })
    }

    /// Serialize the class into a fresh buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = vec![];
        self.serialize(&mut bytes)?;
        Ok(bytes)
    }

    /// Name of this class (eg. `java/lang/String`)
    pub fn this_class_name(&self) -> Result<&str, Error> {
        self.constants.class_name(self.this_class)
    }

    /// Name of the superclass, if there is one
    pub fn super_class_name(&self) -> Result<Option<&str>, Error> {
        if self.super_class.0 == ConstantIndex(0) {
            Ok(None)
        } else {
            self.constants.class_name(self.super_class).map(Some)
        }
    }

    pub fn interface_names(&self) -> Result<Vec<&str>, Error> {
        self.interfaces
            .iter()
            .map(|interface| self.constants.class_name(*interface))
            .collect()
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    /// Swap out the `Code` attribute of one method, leaving everything else untouched
    ///
    /// New constants are appended to the pool, so the indices used by other methods stay valid.
    pub fn replace_method_code(&mut self, method_index: usize, code: &Code) -> Result<(), Error> {
        let attribute = self.constants.get_attribute(code)?;
        let method = self.methods.get_mut(method_index).ok_or_else(|| {
            Error::MalformedClass(format!("no method at index {}", method_index))
        })?;
        match method.code_position(&self.constants) {
            Some(position) => method.attributes[position] = attribute,
            None => method.attributes.push(attribute),
        }
        Ok(())
    }
}

impl Serialize for ClassFile {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&ClassFile::MAGIC)?;
        self.version.serialize(writer)?;
        self.constants.serialize(writer)?;
        self.access_flags.serialize(writer)?;
        self.this_class.serialize(writer)?;
        self.super_class.serialize(writer)?;
        self.interfaces.serialize(writer)?;
        self.fields.serialize(writer)?;
        self.methods.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}
