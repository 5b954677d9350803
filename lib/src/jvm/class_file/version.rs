use crate::jvm::binary_format::{Deserialize, Serialize};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::Result;

/// Version of the class file, which is used to verify that the JVM has the
/// necessary features to interpret the class
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Version {
    pub major_version: u16,
    pub minor_version: u16,
}

impl Version {
    /// JVM class file version corresponding to Java SE 6, the first to have `StackMapTable`
    pub const JAVA6: Version = Version {
        major_version: 50,
        minor_version: 0,
    };

    /// JVM class file version corresponding to Java SE 8 (released March 2014)
    pub const JAVA8: Version = Version {
        major_version: 52,
        minor_version: 0,
    };

    /// Whether methods in classes of this version need a `StackMapTable`
    pub fn supports_stack_map_frames(&self) -> bool {
        *self >= Version::JAVA6
    }
}

impl Serialize for Version {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.minor_version.serialize(writer)?;
        self.major_version.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for Version {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        let minor_version = u16::deserialize(reader)?;
        let major_version = u16::deserialize(reader)?;
        Ok(Version {
            major_version,
            minor_version,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stack_map_frames_start_at_java6() {
        let java5 = Version {
            major_version: 49,
            minor_version: 3,
        };
        assert!(!java5.supports_stack_map_frames());
        assert!(Version::JAVA6.supports_stack_map_frames());
        assert!(Version::JAVA8.supports_stack_map_frames());
    }

    #[test]
    fn minor_version_comes_first() {
        let mut out = vec![];
        Version::JAVA8.serialize(&mut out).unwrap();
        assert_eq!(out, vec![0, 0, 0, 52]);
        assert_eq!(Version::deserialize(&mut &out[..]).unwrap(), Version::JAVA8);
    }
}
