use super::HierarchyEntry;
use crate::jvm::{BinaryName, Name};

/// `(name, superclass, interfaces)` for the classes every program touches
const CLASSES: &[(&str, &str, &[&str])] = &[
    ("java/lang/String", "java/lang/Object", &["java/io/Serializable", "java/lang/Comparable", "java/lang/CharSequence"]),
    ("java/lang/Class", "java/lang/Object", &["java/io/Serializable"]),
    ("java/lang/Enum", "java/lang/Object", &["java/lang/Comparable", "java/io/Serializable"]),
    ("java/lang/Number", "java/lang/Object", &["java/io/Serializable"]),
    ("java/lang/Integer", "java/lang/Number", &["java/lang/Comparable"]),
    ("java/lang/Long", "java/lang/Number", &["java/lang/Comparable"]),
    ("java/lang/Float", "java/lang/Number", &["java/lang/Comparable"]),
    ("java/lang/Double", "java/lang/Number", &["java/lang/Comparable"]),
    ("java/lang/Short", "java/lang/Number", &["java/lang/Comparable"]),
    ("java/lang/Byte", "java/lang/Number", &["java/lang/Comparable"]),
    ("java/lang/Boolean", "java/lang/Object", &["java/io/Serializable", "java/lang/Comparable"]),
    ("java/lang/Character", "java/lang/Object", &["java/io/Serializable", "java/lang/Comparable"]),
    ("java/lang/AbstractStringBuilder", "java/lang/Object", &["java/lang/Appendable", "java/lang/CharSequence"]),
    ("java/lang/StringBuilder", "java/lang/AbstractStringBuilder", &["java/io/Serializable"]),
    ("java/lang/StringBuffer", "java/lang/AbstractStringBuilder", &["java/io/Serializable"]),
    ("java/lang/Throwable", "java/lang/Object", &["java/io/Serializable"]),
    ("java/lang/Exception", "java/lang/Throwable", &[]),
    ("java/lang/Error", "java/lang/Throwable", &[]),
    ("java/lang/RuntimeException", "java/lang/Exception", &[]),
    ("java/lang/NullPointerException", "java/lang/RuntimeException", &[]),
    ("java/lang/IllegalArgumentException", "java/lang/RuntimeException", &[]),
    ("java/lang/NumberFormatException", "java/lang/IllegalArgumentException", &[]),
    ("java/lang/IllegalStateException", "java/lang/RuntimeException", &[]),
    ("java/lang/ArithmeticException", "java/lang/RuntimeException", &[]),
    ("java/lang/ClassCastException", "java/lang/RuntimeException", &[]),
    ("java/lang/UnsupportedOperationException", "java/lang/RuntimeException", &[]),
    ("java/lang/IndexOutOfBoundsException", "java/lang/RuntimeException", &[]),
    ("java/lang/ArrayIndexOutOfBoundsException", "java/lang/IndexOutOfBoundsException", &[]),
    ("java/lang/StringIndexOutOfBoundsException", "java/lang/IndexOutOfBoundsException", &[]),
    ("java/lang/InterruptedException", "java/lang/Exception", &[]),
    ("java/lang/CloneNotSupportedException", "java/lang/Exception", &[]),
    ("java/lang/ReflectiveOperationException", "java/lang/Exception", &[]),
    ("java/lang/ClassNotFoundException", "java/lang/ReflectiveOperationException", &[]),
    ("java/io/IOException", "java/lang/Exception", &[]),
    ("java/lang/AssertionError", "java/lang/Error", &[]),
    ("java/lang/invoke/MethodHandle", "java/lang/Object", &[]),
    ("java/lang/invoke/MethodType", "java/lang/Object", &["java/io/Serializable"]),
    ("java/util/AbstractCollection", "java/lang/Object", &["java/util/Collection"]),
    ("java/util/AbstractList", "java/util/AbstractCollection", &["java/util/List"]),
    ("java/util/ArrayList", "java/util/AbstractList", &["java/util/List", "java/util/RandomAccess", "java/lang/Cloneable", "java/io/Serializable"]),
    ("java/util/AbstractMap", "java/lang/Object", &["java/util/Map"]),
    ("java/util/HashMap", "java/util/AbstractMap", &["java/util/Map", "java/lang/Cloneable", "java/io/Serializable"]),
];

/// `(name, superinterfaces)` for common interfaces
const INTERFACES: &[(&str, &[&str])] = &[
    ("java/io/Serializable", &[]),
    ("java/lang/Comparable", &[]),
    ("java/lang/CharSequence", &[]),
    ("java/lang/Appendable", &[]),
    ("java/lang/Cloneable", &[]),
    ("java/lang/Runnable", &[]),
    ("java/lang/AutoCloseable", &[]),
    ("java/lang/Iterable", &[]),
    ("java/util/Collection", &["java/lang/Iterable"]),
    ("java/util/List", &["java/util/Collection"]),
    ("java/util/Set", &["java/util/Collection"]),
    ("java/util/Map", &[]),
    ("java/util/RandomAccess", &[]),
];

fn names(names: &[&'static str]) -> Vec<BinaryName> {
    names.iter().map(|name| BinaryName::from(*name)).collect()
}

/// Built-in hierarchy entry for well-known JDK types
pub fn java_lang_entry(name: &BinaryName) -> Option<HierarchyEntry> {
    if *name == BinaryName::OBJECT {
        return Some(HierarchyEntry {
            name: BinaryName::OBJECT,
            superclass: None,
            interfaces: vec![],
            is_interface: false,
        });
    }

    if let Some((class, superclass, interfaces)) =
        CLASSES.iter().find(|(class, _, _)| *class == name.as_str())
    {
        return Some(HierarchyEntry {
            name: BinaryName::from(*class),
            superclass: Some(BinaryName::from(*superclass)),
            interfaces: names(interfaces),
            is_interface: false,
        });
    }

    INTERFACES
        .iter()
        .find(|(interface, _)| *interface == name.as_str())
        .map(|(interface, superinterfaces)| HierarchyEntry {
            name: BinaryName::from(*interface),
            superclass: Some(BinaryName::OBJECT),
            interfaces: names(superinterfaces),
            is_interface: true,
        })
}
