//! Validated [names] as they appear in the constant pool
//!
//! [names]: https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.2

use std::borrow::Cow;
use std::fmt;

/// Behaviour shared by the kinds of names
pub trait Name: Sized {
    fn as_str(&self) -> &str;

    /// Validate and wrap a string
    fn from_string(name: String) -> Result<Self, String>;

    fn from_str(name: &str) -> Result<Self, String> {
        Self::from_string(name.to_owned())
    }
}

macro_rules! name_type {
    ($(#[$attr:meta])* $name:ident, $validate:path) => {
        $(#[$attr])*
        #[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            const fn literal(value: &'static str) -> $name {
                $name(Cow::Borrowed(value))
            }
        }

        impl Name for $name {
            fn as_str(&self) -> &str {
                &self.0
            }

            fn from_string(name: String) -> Result<Self, String> {
                $validate(&name)?;
                Ok($name(Cow::Owned(name)))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_type!(
    /// Method or field name (eg. `toString`, `<init>`)
    UnqualifiedName,
    validate_unqualified
);

name_type!(
    /// Class or interface name in internal form (eg. `java/lang/String`)
    BinaryName,
    validate_binary
);

fn validate_unqualified(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(String::from("empty unqualified name"));
    }
    match name.chars().find(|c| matches!(c, '.' | ';' | '[' | '/')) {
        Some(c) => Err(format!("'{}' in unqualified name '{}'", c, name)),
        None => Ok(()),
    }
}

fn validate_binary(name: &str) -> Result<(), String> {
    name.split('/')
        .try_for_each(validate_unqualified)
        .map_err(|err| format!("bad class name '{}': {}", name, err))
}

impl UnqualifiedName {
    pub const INIT: Self = Self::literal("<init>");
    pub const CLINIT: Self = Self::literal("<clinit>");

    // Generated for every enum
    pub const VALUES: Self = Self::literal("values");
    pub const VALUEOF: Self = Self::literal("valueOf");
}

impl BinaryName {
    pub const OBJECT: Self = Self::literal("java/lang/Object");
    pub const STRING: Self = Self::literal("java/lang/String");
    pub const CLASS: Self = Self::literal("java/lang/Class");
    pub const ENUM: Self = Self::literal("java/lang/Enum");
    pub const THROWABLE: Self = Self::literal("java/lang/Throwable");
    pub const SERIALIZABLE: Self = Self::literal("java/io/Serializable");
    pub const METHODHANDLE: Self = Self::literal("java/lang/invoke/MethodHandle");
    pub const METHODTYPE: Self = Self::literal("java/lang/invoke/MethodType");

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

/// Literal names are not validated
impl From<&'static str> for BinaryName {
    fn from(name: &'static str) -> BinaryName {
        BinaryName::literal(name)
    }
}
