mod common;

use common::*;
use gregor::jvm::class_file::ClassFile;
use gregor::jvm::code::Instruction::*;
use gregor::jvm::code::{BranchInstruction, CodeItem, MethodBody, OrdComparison};
use gregor::jvm::hierarchy::{CachingFrameSupport, HierarchyEntry, IncludingClass};
use gregor::jvm::verifier::MethodContext;
use gregor::jvm::MethodAccessFlags;
use gregor::source::MapSource;

/// Decode then re-assemble every method body
fn reassemble(bytes: &[u8]) -> Vec<u8> {
    let mut class = ClassFile::parse(bytes).unwrap();
    let library = CachingFrameSupport::new(MapSource::new());
    let hierarchy = IncludingClass {
        inner: &library,
        entry: HierarchyEntry::from_class(&class).unwrap(),
    };
    let class_name = hierarchy.entry.name.clone();
    for index in 0..class.methods.len() {
        let method = &class.methods[index];
        let code = match method.code(&class.constants).unwrap() {
            Some(code) => code,
            None => continue,
        };
        let name = method.name(&class.constants).unwrap().to_owned();
        let descriptor = method.descriptor(&class.constants).unwrap().to_owned();
        let context = MethodContext {
            class: &class_name,
            name: &name,
            descriptor: &descriptor,
            is_static: method.access_flags.contains(MethodAccessFlags::STATIC),
        };
        let body = MethodBody::decode(&code, &class.constants).unwrap();
        let code = body
            .assemble(&context, &mut class.constants, &hierarchy, class.version)
            .unwrap();
        class.replace_method_code(index, &code).unwrap();
    }
    class.to_bytes().unwrap()
}

#[test]
fn straight_line_and_branches() {
    let statics = MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC;
    let mut class = ClassBuilder::new("com/example/Loops", "java/lang/Object");
    class.method(statics, "sum", "(I)I", |labels| {
        let top = labels.fresh_label();
        let done = labels.fresh_label();
        vec![
            CodeItem::Line(3),
            insn(IConst0),
            insn(IStore(1)),
            CodeItem::Label(top),
            CodeItem::Line(4),
            insn(ILoad(0)),
            CodeItem::Branch(BranchInstruction::If(OrdComparison::LE, done)),
            insn(ILoad(1)),
            insn(ILoad(0)),
            insn(IAdd),
            insn(IStore(1)),
            insn(IInc(0, -1)),
            CodeItem::Branch(BranchInstruction::Goto(top)),
            CodeItem::Label(done),
            CodeItem::Line(7),
            insn(ILoad(1)),
            CodeItem::Branch(BranchInstruction::IReturn),
        ]
    });
    class.method(statics, "wide", "(JD)D", |_| {
        vec![
            insn(LLoad(0)),
            insn(L2D),
            insn(DLoad(2)),
            insn(DMul),
            CodeItem::Branch(BranchInstruction::DReturn),
        ]
    });
    class.abstract_method("later", "()V");
    let bytes = class.bytes();

    let once = reassemble(&bytes);
    assert_eq!(once, bytes);
    assert_eq!(reassemble(&once), once);
}

#[test]
fn decoded_body_keeps_markers() {
    let statics = MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC;
    let mut class = ClassBuilder::new("com/example/Lines", "java/lang/Object");
    class.method(statics, "id", "(I)I", |_| {
        vec![
            CodeItem::Line(42),
            insn(ILoad(0)),
            CodeItem::Branch(BranchInstruction::IReturn),
        ]
    });
    let bytes = class.bytes();

    let code = method_code(&bytes, "id");
    let parsed = ClassFile::parse(&bytes).unwrap();
    let body = MethodBody::decode(&code, &parsed.constants).unwrap();
    assert!(body.items.contains(&CodeItem::Line(42)));
    assert_eq!(
        method_instructions(&bytes, "id"),
        vec![insn(ILoad(0)), CodeItem::Branch(BranchInstruction::IReturn)]
    );
    assert!(code_attribute_names(&bytes, "id").contains(&String::from("LineNumberTable")));
}
