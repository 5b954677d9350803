use super::MethodLocation;
use crate::jvm::class_file::{ClassFile, Method, Version};
use crate::jvm::{BinaryName, ClassAccessFlags, Error, MethodAccessFlags, Name, UnqualifiedName};
use std::rc::Rc;

/// Summary of a class being mutated
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: BinaryName,
    pub version: Version,
    pub access_flags: ClassAccessFlags,

    /// `None` only for `java/lang/Object`
    pub superclass: Option<BinaryName>,
    pub interfaces: Vec<BinaryName>,
}

impl ClassInfo {
    pub fn from_class(class: &ClassFile) -> Result<ClassInfo, Error> {
        let to_name = |name: &str| BinaryName::from_str(name).map_err(Error::MalformedClass);
        Ok(ClassInfo {
            name: to_name(class.this_class_name()?)?,
            version: class.version,
            access_flags: class.access_flags,
            superclass: class.super_class_name()?.map(to_name).transpose()?,
            interfaces: class
                .interface_names()?
                .into_iter()
                .map(to_name)
                .collect::<Result<_, _>>()?,
        })
    }

    /// Is this class a Java `enum`?
    pub fn is_enum(&self) -> bool {
        self.superclass.as_ref() == Some(&BinaryName::ENUM)
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    /// Was this class compiled from Groovy?
    ///
    /// The Groovy compiler marks every class it emits with one of its runtime interfaces.
    pub fn is_groovy_class(&self) -> bool {
        self.interfaces.iter().any(|interface| {
            interface.starts_with("groovy/lang/")
                || interface.starts_with("org/codehaus/groovy/runtime")
        })
    }
}

/// Summary of a method being mutated, along with the class declaring it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodInfo {
    pub class: Rc<ClassInfo>,
    pub access_flags: MethodAccessFlags,
    pub name: String,
    pub descriptor: String,
}

impl MethodInfo {
    pub fn from_method(
        class: Rc<ClassInfo>,
        method: &Method,
        class_file: &ClassFile,
    ) -> Result<MethodInfo, Error> {
        Ok(MethodInfo {
            class,
            access_flags: method.access_flags,
            name: method.name(&class_file.constants)?.to_owned(),
            descriptor: method.descriptor(&class_file.constants)?.to_owned(),
        })
    }

    pub fn is_constructor(&self) -> bool {
        self.name == UnqualifiedName::INIT.as_str()
    }

    pub fn is_static_initializer(&self) -> bool {
        self.name == UnqualifiedName::CLINIT.as_str()
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    pub fn is_synthetic(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::SYNTHETIC)
    }

    pub fn is_void(&self) -> bool {
        self.descriptor.ends_with(")V")
    }

    pub fn takes_no_parameters(&self) -> bool {
        self.descriptor.starts_with("()")
    }

    pub fn is_lambda(&self) -> bool {
        self.name.starts_with("lambda$")
    }

    /// Is this one of the methods `javac` generates for every enum?
    pub fn is_generated_enum_method(&self) -> bool {
        self.class.is_enum()
            && (self.is_values_method() || self.is_value_of_method() || self.is_static_initializer())
    }

    fn is_values_method(&self) -> bool {
        self.name == UnqualifiedName::VALUES.as_str() && self.takes_no_parameters() && self.is_static()
    }

    fn is_value_of_method(&self) -> bool {
        self.name == UnqualifiedName::VALUEOF.as_str()
            && self.descriptor.starts_with("(Ljava/lang/String;)")
            && self.is_static()
    }

    pub fn is_in_groovy_class(&self) -> bool {
        self.class.is_groovy_class()
    }

    /// Human readable name (eg. `com/example/Calc::add`)
    pub fn description(&self) -> String {
        format!("{}::{}", self.class.name, self.name)
    }

    pub fn location(&self) -> MethodLocation {
        MethodLocation {
            class: self.class.name.clone(),
            method: self.name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }

    pub fn with_descriptor(&self, descriptor: impl Into<String>) -> MethodInfo {
        MethodInfo {
            descriptor: descriptor.into(),
            ..self.clone()
        }
    }

    pub fn with_access(&self, access_flags: MethodAccessFlags) -> MethodInfo {
        MethodInfo {
            access_flags,
            ..self.clone()
        }
    }

    pub fn with_name(&self, name: impl Into<String>) -> MethodInfo {
        MethodInfo {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn with_owner(&self, class: Rc<ClassInfo>) -> MethodInfo {
        MethodInfo {
            class,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn class(superclass: &'static str, interfaces: Vec<&'static str>) -> Rc<ClassInfo> {
        Rc::new(ClassInfo {
            name: BinaryName::from("com/example/Colour"),
            version: Version::JAVA8,
            access_flags: ClassAccessFlags::PUBLIC,
            superclass: Some(BinaryName::from(superclass)),
            interfaces: interfaces.into_iter().map(BinaryName::from).collect(),
        })
    }

    fn method(class: Rc<ClassInfo>, flags: MethodAccessFlags, name: &str, desc: &str) -> MethodInfo {
        MethodInfo {
            class,
            access_flags: flags,
            name: name.to_owned(),
            descriptor: desc.to_owned(),
        }
    }

    #[test]
    fn enum_methods() {
        let colour = class("java/lang/Enum", vec![]);
        assert!(colour.is_enum());
        let values = method(
            colour.clone(),
            MethodAccessFlags::STATIC,
            "values",
            "()[Lcom/example/Colour;",
        );
        assert!(values.is_generated_enum_method());
        assert!(!values.with_access(MethodAccessFlags::PUBLIC).is_generated_enum_method());
        assert!(values
            .with_name("valueOf")
            .with_descriptor("(Ljava/lang/String;)Lcom/example/Colour;")
            .is_generated_enum_method());
        assert!(values.with_name("<clinit>").with_descriptor("()V").is_generated_enum_method());
        assert!(!values.with_name("other").is_generated_enum_method());
        assert!(!values
            .with_owner(class("java/lang/Object", vec![]))
            .is_generated_enum_method());
    }

    #[test]
    fn queries() {
        let groovy = class("java/lang/Object", vec!["groovy/lang/GroovyObject"]);
        assert!(groovy.is_groovy_class());
        assert!(!class("java/lang/Object", vec!["java/lang/Runnable"]).is_groovy_class());

        let init = method(groovy, MethodAccessFlags::PUBLIC, "<init>", "()V");
        assert!(init.is_constructor());
        assert!(init.is_void());
        assert!(init.takes_no_parameters());
        assert!(init.is_in_groovy_class());
        assert!(!init.is_static());
        assert_eq!(init.description(), "com/example/Colour::<init>");
        assert!(init.with_name("lambda$run$0").is_lambda());
        assert!(!init.with_descriptor("(I)I").is_void());
    }
}
