//! Small class builder, so tests can describe classes as instruction lists

#![allow(dead_code)]

use gregor::jvm::class_file::{
    ClassConstantIndex, ClassFile, Code, ConstantsPool, Field, FieldRefConstantIndex, Method,
    MethodRefConstantIndex, Version,
};
use gregor::jvm::code::{CodeItem, Instruction, LabelGenerator, MethodBody};
use gregor::jvm::hierarchy::{CachingFrameSupport, HierarchyEntry, IncludingClass};
use gregor::jvm::verifier::MethodContext;
use gregor::jvm::*;
use gregor::source::MapSource;

pub struct ClassBuilder {
    pub class: ClassFile,
    pub entry: HierarchyEntry,
}

impl ClassBuilder {
    pub fn new(name: &'static str, superclass: &'static str) -> ClassBuilder {
        ClassBuilder::with_interfaces(name, superclass, &[])
    }

    pub fn with_interfaces(
        name: &'static str,
        superclass: &'static str,
        interfaces: &[&'static str],
    ) -> ClassBuilder {
        let mut constants = ConstantsPool::new();
        let this_class = constants
            .get_class(&RefType::Object(BinaryName::from(name)))
            .unwrap();
        let super_class = constants
            .get_class(&RefType::Object(BinaryName::from(superclass)))
            .unwrap();
        let interface_indices = interfaces
            .iter()
            .map(|interface| {
                constants
                    .get_class(&RefType::Object(BinaryName::from(*interface)))
                    .unwrap()
            })
            .collect();
        ClassBuilder {
            class: ClassFile {
                version: Version::JAVA8,
                constants,
                access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
                this_class,
                super_class,
                interfaces: interface_indices,
                fields: vec![],
                methods: vec![],
                attributes: vec![],
            },
            entry: HierarchyEntry {
                name: BinaryName::from(name),
                superclass: Some(BinaryName::from(superclass)),
                interfaces: interfaces.iter().map(|i| BinaryName::from(*i)).collect(),
                is_interface: false,
            },
        }
    }

    pub fn name(&self) -> BinaryName {
        self.entry.name.clone()
    }

    pub fn constants(&mut self) -> &mut ConstantsPool {
        &mut self.class.constants
    }

    pub fn class_ref(&mut self, name: &'static str) -> ClassConstantIndex {
        self.class
            .constants
            .get_class(&RefType::Object(BinaryName::from(name)))
            .unwrap()
    }

    /// Declare a field on this class and get a reference to it
    pub fn field(&mut self, name: &str, descriptor: &str) -> FieldRefConstantIndex {
        let name_index = self.class.constants.get_utf8(name).unwrap();
        let descriptor_index = self.class.constants.get_utf8(descriptor).unwrap();
        self.class.fields.push(Field {
            access_flags: FieldAccessFlags::PUBLIC,
            name_index,
            descriptor_index,
            attributes: vec![],
        });
        let owner = self.name();
        self.class
            .constants
            .get_field_ref(&owner, name, descriptor)
            .unwrap()
    }

    pub fn method_ref(
        &mut self,
        owner: &'static str,
        name: &str,
        descriptor: &str,
    ) -> MethodRefConstantIndex {
        self.class
            .constants
            .get_method_ref(&BinaryName::from(owner), name, descriptor, false)
            .unwrap()
    }

    /// Add a method whose body is built from the given items
    ///
    /// The closure gets a label generator so it can place labels (jump targets and the label
    /// that has to precede each `new`).
    pub fn method(
        &mut self,
        access_flags: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        build: impl FnOnce(&mut LabelGenerator) -> Vec<CodeItem>,
    ) -> &mut ClassBuilder {
        let mut labels = LabelGenerator::new();
        let items = build(&mut labels);
        let body = MethodBody {
            items,
            handlers: vec![],
            local_variables: vec![],
            max_stack: 0,
            max_locals: 0,
            other_attributes: vec![],
            labels,
        };

        let library = CachingFrameSupport::new(MapSource::new());
        let hierarchy = IncludingClass {
            inner: &library,
            entry: self.entry.clone(),
        };
        let context = MethodContext {
            class: &self.entry.name,
            name,
            descriptor,
            is_static: access_flags.contains(MethodAccessFlags::STATIC),
        };
        let code = body
            .assemble(&context, &mut self.class.constants, &hierarchy, self.class.version)
            .unwrap();
        self.push_method(access_flags, name, descriptor, Some(code));
        self
    }

    /// Add a method with no `Code` attribute
    pub fn abstract_method(&mut self, name: &str, descriptor: &str) -> &mut ClassBuilder {
        let flags = MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT;
        self.push_method(flags, name, descriptor, None);
        self
    }

    fn push_method(
        &mut self,
        access_flags: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        code: Option<Code>,
    ) {
        let constants = &mut self.class.constants;
        let name_index = constants.get_utf8(name).unwrap();
        let descriptor_index = constants.get_utf8(descriptor).unwrap();
        let attributes = code
            .map(|code| constants.get_attribute(&code).unwrap())
            .into_iter()
            .collect();
        self.class.methods.push(Method {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        });
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.class.to_bytes().unwrap()
    }
}

/// Shorthand for a straight-line instruction
pub fn insn(instruction: Instruction) -> CodeItem {
    CodeItem::Instruction(instruction)
}

/// Instructions of a method in a serialized class, with labels and line markers stripped out
pub fn method_instructions(bytes: &[u8], name: &str) -> Vec<CodeItem> {
    let class = ClassFile::parse(bytes).unwrap();
    let method = class
        .methods
        .iter()
        .find(|method| method.name(&class.constants).unwrap() == name)
        .unwrap();
    let code = method.code(&class.constants).unwrap().unwrap();
    let body = MethodBody::decode(&code, &class.constants).unwrap();
    body.instructions().cloned().collect()
}

/// `Code` attribute of a method in a serialized class
pub fn method_code(bytes: &[u8], name: &str) -> Code {
    let class = ClassFile::parse(bytes).unwrap();
    let method = class
        .methods
        .iter()
        .find(|method| method.name(&class.constants).unwrap() == name)
        .unwrap();
    method.code(&class.constants).unwrap().unwrap()
}

/// Names of the attributes on the `Code` attribute of a method
pub fn code_attribute_names(bytes: &[u8], name: &str) -> Vec<String> {
    let class = ClassFile::parse(bytes).unwrap();
    method_code(bytes, name)
        .attributes
        .iter()
        .map(|attribute| attribute.name(&class.constants).unwrap().to_owned())
        .collect()
}
