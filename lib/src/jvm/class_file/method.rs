use crate::jvm::class_file::{
    Attribute, AttributeLike, Code, ConstantsPool, Deserialize, Serialize, Utf8ConstantIndex,
};
use crate::jvm::{Error, MethodAccessFlags};
use byteorder::{ReadBytesExt, WriteBytesExt};

/// Method declared by a class or interface
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6
#[derive(Debug, Clone)]
pub struct Method {
    pub access_flags: MethodAccessFlags,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub attributes: Vec<Attribute>,
}

impl Method {
    pub fn name<'a>(&self, constants: &'a ConstantsPool) -> Result<&'a str, Error> {
        constants.utf8(self.name_index)
    }

    pub fn descriptor<'a>(&self, constants: &'a ConstantsPool) -> Result<&'a str, Error> {
        constants.utf8(self.descriptor_index)
    }

    /// Position of the `Code` attribute (abstract and native methods have none)
    pub fn code_position(&self, constants: &ConstantsPool) -> Option<usize> {
        self.attributes
            .iter()
            .position(|attr| attr.name(constants).map_or(false, |name| name == Code::NAME))
    }

    /// Parse the `Code` attribute, if there is one
    pub fn code(&self, constants: &ConstantsPool) -> Result<Option<Code>, Error> {
        match self.code_position(constants) {
            Some(position) => self.attributes[position].decode().map(Some),
            None => Ok(None),
        }
    }
}

impl Serialize for Method {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.access_flags.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for Method {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Method {
            access_flags: MethodAccessFlags::deserialize(reader)?,
            name_index: Utf8ConstantIndex::deserialize(reader)?,
            descriptor_index: Utf8ConstantIndex::deserialize(reader)?,
            attributes: Vec::deserialize(reader)?,
        })
    }
}
