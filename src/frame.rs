//! Stack frame model
//!
//! A frame is one entry of a captured stack trace: the declaring class, the
//! method, the source file and the line. Frames are value types; cleaning
//! builds new sequences of them rather than editing frames in place.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference printed inside every collapsed-frame summary
pub const CLEANER_LINK: &str = "https://docs.rs/stackscrub/latest/stackscrub/#collapsed-frames";

/// Line number reported for frames whose line is not known
pub const UNKNOWN_LINE: i32 = -1;

/// Line number reported for native methods
pub const NATIVE_LINE: i32 = -2;

const SYNTHETIC_OPEN: &str = "[[";
const SYNTHETIC_CLOSE: &str = "]]";

/// A single stack frame
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackFrame {
    /// Fully qualified declaring class, nested classes joined with `$`
    pub declaring_class: String,
    pub method_name: String,
    /// Source file name, empty when unknown
    #[serde(default)]
    pub file_name: String,
    /// Line number; negative when unknown ([`UNKNOWN_LINE`]) or native ([`NATIVE_LINE`])
    #[serde(default = "default_line")]
    pub line_number: i32,
}

fn default_line() -> i32 {
    UNKNOWN_LINE
}

impl StackFrame {
    pub fn new(
        declaring_class: impl Into<String>,
        method_name: impl Into<String>,
        file_name: impl Into<String>,
        line_number: i32,
    ) -> Self {
        Self {
            declaring_class: declaring_class.into(),
            method_name: method_name.into(),
            file_name: file_name.into(),
            line_number,
        }
    }

    /// Frame carrying only a class name, the way fixtures usually build them
    pub fn for_class(declaring_class: impl Into<String>) -> Self {
        Self::new(declaring_class, "", "", UNKNOWN_LINE)
    }

    /// Build the summary frame that replaces a run of `count` collapsed frames
    ///
    /// The class name has the form
    /// `[[<label>: <count> frames collapsed (<link>)]]`; method and file are
    /// empty and the line is 0.
    pub fn synthetic(label: &str, count: usize) -> Self {
        Self {
            declaring_class: format!(
                "{SYNTHETIC_OPEN}{label}: {count} frames collapsed ({CLEANER_LINK}){SYNTHETIC_CLOSE}"
            ),
            method_name: String::new(),
            file_name: String::new(),
            line_number: 0,
        }
    }

    /// Whether this frame is a collapsed-run summary
    pub fn is_synthetic(&self) -> bool {
        is_synthetic_class(&self.declaring_class)
    }

    /// Bucket label and run length encoded in a synthetic frame
    pub fn synthetic_summary(&self) -> Option<(&str, usize)> {
        let body = self
            .declaring_class
            .strip_prefix(SYNTHETIC_OPEN)?
            .strip_suffix(SYNTHETIC_CLOSE)?;
        let (label, rest) = body.split_once(": ")?;
        let (count, _) = rest.split_once(" frames collapsed")?;
        Some((label, count.parse().ok()?))
    }

    /// Enclosing top-level class (`a.b.Outer` for `a.b.Outer$Inner$1`)
    pub fn enclosing_class(&self) -> &str {
        enclosing_class(&self.declaring_class)
    }

    pub fn is_native_method(&self) -> bool {
        self.line_number == NATIVE_LINE
    }
}

pub(crate) fn is_synthetic_class(class_name: &str) -> bool {
    class_name.len() >= SYNTHETIC_OPEN.len() + SYNTHETIC_CLOSE.len()
        && class_name.starts_with(SYNTHETIC_OPEN)
        && class_name.ends_with(SYNTHETIC_CLOSE)
}

pub(crate) fn enclosing_class(class_name: &str) -> &str {
    match class_name.find('$') {
        Some(0) | None => class_name,
        Some(idx) => &class_name[..idx],
    }
}

/// Renders the conventional `pkg.Class.method(File.java:12)` form.
/// Synthetic frames render as their class name alone since they carry no
/// source location.
impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthetic() {
            return f.write_str(&self.declaring_class);
        }
        write!(f, "{}.{}(", self.declaring_class, self.method_name)?;
        if self.is_native_method() {
            f.write_str("Native Method")?;
        } else if self.file_name.is_empty() {
            f.write_str("Unknown Source")?;
        } else if self.line_number >= 0 {
            write!(f, "{}:{}", self.file_name, self.line_number)?;
        } else {
            f.write_str(&self.file_name)?;
        }
        f.write_str(")")
    }
}
