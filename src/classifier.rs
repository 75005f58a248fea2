//! Stack frame classification
//!
//! Every frame is sorted into one of a handful of classes purely from its
//! declaring class name:
//!
//! - **LibraryBoundary**: public entry points of the assertion library; the
//!   failure trace above (and including) the last one is library noise
//! - **RunnerBoundary**: the test runner's statements and runners; the trace
//!   below one of these is runner noise
//! - **Framework / Reflective**: test-framework, assertion-library,
//!   concurrency-framework and reflective-call frames that may be collapsed
//! - **User**: everything else
//!
//! The package tables are compile-time constants. Optional type metadata
//! ([`TypeHierarchy`]) sharpens boundary detection for user-defined
//! subclasses; without it, allow-lists and a conservative name heuristic
//! take over.

use crate::frame::{enclosing_class, is_synthetic_class, StackFrame};
use crate::type_hierarchy::{NoTypeInfo, TypeHierarchy};
use std::fmt;

/// Types whose subclasses mark the entrance into the assertion library
const LIBRARY_ENTRY_POINTS: &[&str] = &[
    "com.google.common.truth.Subject",
    "com.google.common.truth.StandardSubjectBuilder",
];

/// Known entry-point classes, used when no type metadata is available
const LIBRARY_KNOWN_ENTRY_CLASSES: &[&str] = &[
    "com.google.common.truth.Subject",
    "com.google.common.truth.StandardSubjectBuilder",
    "com.google.common.truth.SimpleSubjectBuilder",
    "com.google.common.truth.Truth",
    "com.google.common.truth.Truth8",
    "com.google.common.truth.Expect",
    "com.google.common.truth.ExpectFailure",
    "com.google.common.truth.TruthJUnit",
];

/// Packages that hold the assertion library itself
const LIBRARY_PACKAGES: &[&str] = &[
    "com.google.common.truth",
    "com.google.common.truth.extensions.proto",
    "com.google.common.truth.extensions.re2j",
];

const RUNNER_ENTRY_POINTS: &[&str] = &[
    "org.junit.runners.model.Statement",
    "org.junit.runner.Runner",
];

const RUNNER_KNOWN_CLASSES: &[&str] = &[
    "org.junit.runners.model.Statement",
    "org.junit.runner.Runner",
    "org.junit.runners.ParentRunner",
    "org.junit.runners.BlockJUnit4ClassRunner",
    "org.junit.runners.Suite",
    "org.junit.runners.Parameterized",
    "org.junit.internal.runners.statements.InvokeMethod",
    "org.junit.internal.runners.statements.RunBefores",
    "org.junit.internal.runners.statements.RunAfters",
    "org.junit.internal.runners.statements.ExpectException",
    "org.junit.internal.runners.statements.FailOnTimeout",
    "org.junit.rules.RunRules",
];

const RUNNER_PACKAGE_ROOT: &str = "org.junit";

const TESTING_FRAMEWORK_PACKAGES: &[&str] = &[
    "junit",
    "org.junit",
    "junit.framework",
    "com.google.testing.junit",
    "com.google.testing.testsize",
    "com.google.testing.util",
];

const REFLECTIVE_PACKAGES: &[&str] = &["java.lang.reflect", "jdk.internal.reflect", "sun.reflect"];

const CONCURRENT_FRAMEWORK_PACKAGES: &[&str] = &["com.google.common.util.concurrent"];

/// Class-name prefixes (not packages) of concurrency-framework internals
const CONCURRENT_FRAMEWORK_CLASS_PREFIXES: &[&str] = &["java.util.concurrent.ForkJoin"];

/// Display bucket of a collapsible frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    TestingFramework,
    AssertionLibrary,
    ConcurrentFramework,
    ReflectiveCall,
}

impl Bucket {
    pub fn label(self) -> &'static str {
        match self {
            Bucket::TestingFramework => "Testing framework",
            Bucket::AssertionLibrary => "Assertion library",
            Bucket::ConcurrentFramework => "Concurrent framework",
            Bucket::ReflectiveCall => "Reflective call",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification of one stack frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    User,
    Framework(Bucket),
    Reflective(Bucket),
    LibraryBoundary,
    RunnerBoundary,
}

impl Classification {
    pub fn is_user(self) -> bool {
        self == Classification::User
    }

    /// Bucket used for streak grouping; `None` for frames that never collapse
    pub fn bucket(self) -> Option<Bucket> {
        match self {
            Classification::Framework(bucket) | Classification::Reflective(bucket) => Some(bucket),
            _ => None,
        }
    }
}

/// Decides which classes are genuine test classes
///
/// Test classes are never hidden, even when they live in a package that is
/// otherwise treated as framework code.
#[derive(Debug, Clone)]
pub enum TestClassPredicate {
    /// Simple name ends with any of these suffixes
    Suffixes(Vec<String>),
    Custom(fn(&str) -> bool),
}

impl TestClassPredicate {
    pub fn matches(&self, simple_name: &str) -> bool {
        match self {
            TestClassPredicate::Suffixes(suffixes) => suffixes
                .iter()
                .any(|suffix| !suffix.is_empty() && simple_name.ends_with(suffix.as_str())),
            TestClassPredicate::Custom(predicate) => predicate(simple_name),
        }
    }
}

impl Default for TestClassPredicate {
    fn default() -> Self {
        TestClassPredicate::Custom(ends_with_test)
    }
}

fn ends_with_test(simple_name: &str) -> bool {
    simple_name.ends_with("Test")
}

/// Classifies frames by declaring class name
#[derive(Debug, Clone)]
pub struct FrameClassifier<H = NoTypeInfo> {
    hierarchy: H,
    test_class: TestClassPredicate,
}

impl FrameClassifier<NoTypeInfo> {
    /// Classifier without type metadata and with the default test-class predicate
    pub const fn standard() -> Self {
        Self {
            hierarchy: NoTypeInfo,
            test_class: TestClassPredicate::Custom(ends_with_test),
        }
    }
}

impl Default for FrameClassifier<NoTypeInfo> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<H: TypeHierarchy> FrameClassifier<H> {
    pub fn with_hierarchy(hierarchy: H) -> Self {
        Self {
            hierarchy,
            test_class: TestClassPredicate::default(),
        }
    }

    pub fn with_test_class_predicate(mut self, predicate: TestClassPredicate) -> Self {
        self.test_class = predicate;
        self
    }

    pub fn hierarchy(&self) -> &H {
        &self.hierarchy
    }

    pub fn classify(&self, frame: &StackFrame) -> Classification {
        self.classify_class(&frame.declaring_class)
    }

    pub fn classify_class(&self, class_name: &str) -> Classification {
        if is_synthetic_class(class_name) {
            return Classification::User;
        }

        let outer = enclosing_class(class_name);
        let is_test_class = self.test_class.matches(simple_name(outer));

        if self.is_library_boundary(outer, is_test_class) {
            return Classification::LibraryBoundary;
        }
        if self.is_runner_boundary(outer, is_test_class) {
            return Classification::RunnerBoundary;
        }
        if in_any_package(outer, REFLECTIVE_PACKAGES) {
            return Classification::Reflective(Bucket::ReflectiveCall);
        }

        let framework = if in_any_package(outer, TESTING_FRAMEWORK_PACKAGES) {
            Some(Bucket::TestingFramework)
        } else if in_any_package(outer, LIBRARY_PACKAGES) {
            Some(Bucket::AssertionLibrary)
        } else if in_any_package(outer, CONCURRENT_FRAMEWORK_PACKAGES)
            || CONCURRENT_FRAMEWORK_CLASS_PREFIXES
                .iter()
                .any(|prefix| outer.starts_with(prefix))
        {
            Some(Bucket::ConcurrentFramework)
        } else {
            None
        };

        match framework {
            Some(bucket) if !is_test_class => Classification::Framework(bucket),
            _ => Classification::User,
        }
    }

    fn is_library_boundary(&self, class_name: &str, is_test_class: bool) -> bool {
        if LIBRARY_ENTRY_POINTS.contains(&class_name) {
            return true;
        }
        match assignable_to_any(&self.hierarchy, class_name, LIBRARY_ENTRY_POINTS) {
            Some(assignable) => assignable,
            None => {
                LIBRARY_KNOWN_ENTRY_CLASSES.contains(&class_name)
                    || (!is_test_class && looks_like_library_entry(class_name))
            }
        }
    }

    fn is_runner_boundary(&self, class_name: &str, is_test_class: bool) -> bool {
        if RUNNER_ENTRY_POINTS.contains(&class_name) {
            return true;
        }
        match assignable_to_any(&self.hierarchy, class_name, RUNNER_ENTRY_POINTS) {
            Some(assignable) => assignable,
            None => {
                RUNNER_KNOWN_CLASSES.contains(&class_name)
                    || (!is_test_class && looks_like_runner(class_name))
            }
        }
    }
}

/// `Some(true)` if assignable to any target, `None` if the class is unknown
fn assignable_to_any<H: TypeHierarchy>(
    hierarchy: &H,
    class_name: &str,
    targets: &[&str],
) -> Option<bool> {
    let mut known = false;
    for target in targets {
        match hierarchy.is_assignable(class_name, target) {
            Some(true) => return Some(true),
            Some(false) => known = true,
            None => {}
        }
    }
    known.then_some(false)
}

/// Name heuristic for library entry points: the package must be a library
/// package and the simple name must look like a subject or a subject builder.
/// Requiring both keeps user classes such as `com.example.FooSubject` out.
fn looks_like_library_entry(class_name: &str) -> bool {
    LIBRARY_PACKAGES.contains(&package_of(class_name)) && {
        let simple = simple_name(class_name);
        simple.ends_with("Subject") || simple.contains("SubjectBuilder")
    }
}

fn looks_like_runner(class_name: &str) -> bool {
    let package = package_of(class_name);
    if !(package == RUNNER_PACKAGE_ROOT || in_package(package, RUNNER_PACKAGE_ROOT)) {
        return false;
    }
    simple_name(class_name).ends_with("Runner") || simple_name(package) == "statements"
}

fn in_any_package(class_name: &str, packages: &[&str]) -> bool {
    packages.iter().any(|package| in_package(class_name, package))
}

/// `a.b.C` is in `a` and `a.b`, but `ab.C` is not in `a`
fn in_package(class_name: &str, package: &str) -> bool {
    class_name
        .strip_prefix(package)
        .is_some_and(|rest| rest.starts_with('.'))
}

fn package_of(class_name: &str) -> &str {
    class_name.rsplit_once('.').map_or("", |(package, _)| package)
}

fn simple_name(class_name: &str) -> &str {
    class_name.rsplit_once('.').map_or(class_name, |(_, name)| name)
}
