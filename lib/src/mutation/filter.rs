use super::MethodInfo;
use std::fmt;

/// Caller supplied predicate deciding which methods get mutated
pub struct MethodFilter {
    description: String,
    predicate: Box<dyn Fn(&MethodInfo) -> bool + Send + Sync>,
}

impl MethodFilter {
    pub fn new(
        description: impl Into<String>,
        predicate: impl Fn(&MethodInfo) -> bool + Send + Sync + 'static,
    ) -> MethodFilter {
        MethodFilter {
            description: description.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Accept every method
    pub fn all() -> MethodFilter {
        MethodFilter::new("all methods", |_| true)
    }

    /// Accept only methods with this name
    pub fn named(name: impl Into<String>) -> MethodFilter {
        let name = name.into();
        MethodFilter::new(format!("methods named {}", name), move |method| {
            method.name == name
        })
    }

    /// Accept methods that both filters accept
    pub fn and(self, other: MethodFilter) -> MethodFilter {
        let description = format!("{} and {}", self.description, other.description);
        MethodFilter::new(description, move |method| {
            self.accepts(method) && other.accepts(method)
        })
    }

    pub fn accepts(&self, method: &MethodInfo) -> bool {
        (self.predicate)(method)
    }
}

impl Default for MethodFilter {
    fn default() -> Self {
        MethodFilter::all()
    }
}

impl fmt::Debug for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodFilter({})", self.description)
    }
}

/// Why a method should not be mutated, if there is a reason
///
/// Compiler generated code is skipped since mutants there say nothing about the tests (except
/// for lambda bodies, which hold user code).
pub fn exclusion_reason(method: &MethodInfo, filter: &MethodFilter) -> Option<&'static str> {
    if method.is_synthetic() && !method.is_lambda() {
        Some("synthetic")
    } else if method.is_generated_enum_method() {
        Some("generated enum method")
    } else if method.is_in_groovy_class() {
        Some("groovy class")
    } else if !filter.accepts(method) {
        Some("rejected by filter")
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::Version;
    use crate::jvm::{BinaryName, ClassAccessFlags, MethodAccessFlags};
    use crate::mutation::ClassInfo;
    use std::rc::Rc;

    fn method(name: &str, flags: MethodAccessFlags) -> MethodInfo {
        MethodInfo {
            class: Rc::new(ClassInfo {
                name: BinaryName::from("com/example/Calc"),
                version: Version::JAVA8,
                access_flags: ClassAccessFlags::PUBLIC,
                superclass: Some(BinaryName::OBJECT),
                interfaces: vec![],
            }),
            access_flags: flags,
            name: name.to_owned(),
            descriptor: String::from("()V"),
        }
    }

    #[test]
    fn composition() {
        let filter = MethodFilter::named("add").and(MethodFilter::new("public", |m| {
            m.access_flags.contains(MethodAccessFlags::PUBLIC)
        }));
        assert!(filter.accepts(&method("add", MethodAccessFlags::PUBLIC)));
        assert!(!filter.accepts(&method("add", MethodAccessFlags::PRIVATE)));
        assert!(!filter.accepts(&method("sub", MethodAccessFlags::PUBLIC)));
        assert_eq!(
            format!("{:?}", filter),
            "MethodFilter(methods named add and public)"
        );
    }

    #[test]
    fn synthetic_methods_except_lambdas() {
        let all = MethodFilter::all();
        assert_eq!(
            exclusion_reason(&method("access$000", MethodAccessFlags::SYNTHETIC), &all),
            Some("synthetic")
        );
        assert_eq!(
            exclusion_reason(&method("lambda$run$0", MethodAccessFlags::SYNTHETIC), &all),
            None
        );
        assert_eq!(
            exclusion_reason(&method("run", MethodAccessFlags::PUBLIC), &MethodFilter::named("x")),
            Some("rejected by filter")
        );
    }
}
