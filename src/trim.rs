//! Boundary trimming
//!
//! Removes the two noisy ends of an assertion failure trace:
//!
//! 1. **Top**: the frames inside the assertion library, up to and including
//!    the last library entry point that is reached without passing a user
//!    frame.
//! 2. **Bottom**: the test runner's frames, starting at the first runner
//!    boundary that has an informative user frame above it.
//!
//! A runner boundary with nothing informative above it is the only context
//! left for the reader (the library was called straight from the runner),
//! so it is kept and the search continues further down.

use crate::classifier::{Classification, FrameClassifier};
use crate::frame::StackFrame;
use crate::type_hierarchy::TypeHierarchy;

/// Trim library frames from the top and runner frames from the bottom
pub fn trim_boundaries<H: TypeHierarchy>(
    mut frames: Vec<StackFrame>,
    classifier: &FrameClassifier<H>,
) -> Vec<StackFrame> {
    let classes: Vec<Classification> = frames.iter().map(|f| classifier.classify(f)).collect();

    let start = top_trim_len(&classes);
    let end = start + bottom_trim_index(&frames[start..], &classes[start..]);

    frames.truncate(end);
    frames.drain(..start);
    frames
}

/// Number of leading frames to drop: one past the last library boundary
/// reached before any user frame, or 0.
fn top_trim_len(classes: &[Classification]) -> usize {
    let mut trim = 0;
    for (idx, class) in classes.iter().enumerate() {
        match class {
            Classification::User => break,
            Classification::LibraryBoundary => trim = idx + 1,
            _ => {}
        }
    }
    trim
}

/// Index of the first runner boundary preceded by an informative user frame,
/// or the length of the slice when nothing should be cut.
fn bottom_trim_index(frames: &[StackFrame], classes: &[Classification]) -> usize {
    let mut seen_user = false;
    for (idx, (frame, class)) in frames.iter().zip(classes).enumerate() {
        match class {
            Classification::RunnerBoundary if seen_user => return idx,
            // Summaries of collapsed frames are not the user's call site
            Classification::User if !frame.is_synthetic() => seen_user = true,
            _ => {}
        }
    }
    frames.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBJECT: &str = "com.google.common.truth.Subject";
    const BUILDER: &str = "com.google.common.truth.StandardSubjectBuilder";
    const STATEMENT: &str = "org.junit.runners.model.Statement";
    const RUNNER: &str = "org.junit.runner.Runner";

    fn frames(class_names: &[&str]) -> Vec<StackFrame> {
        class_names.iter().map(|c| StackFrame::for_class(*c)).collect()
    }

    fn trim(class_names: &[&str]) -> Vec<StackFrame> {
        trim_boundaries(frames(class_names), &FrameClassifier::standard())
    }

    #[test]
    fn test_top_trim_removes_library_prefix() {
        let result = trim(&[
            "com.google.common.truth.Pkg",
            "com.google.common.truth.Impl",
            "com.google.common.truth.StandardSubjectBuilderSubtype",
            "com.google.example.SomeClass",
        ]);
        assert_eq!(result, frames(&["com.google.example.SomeClass"]));
    }

    #[test]
    fn test_top_trim_uses_last_boundary() {
        let result = trim(&[SUBJECT, "com.google.common.truth.Impl", BUILDER, "com.example.A"]);
        assert_eq!(result, frames(&["com.example.A"]));
    }

    #[test]
    fn test_top_trim_stops_at_user_frame() {
        let input = ["com.example.Helper", SUBJECT, "com.example.A"];
        assert_eq!(trim(&input), frames(&input));
    }

    #[test]
    fn test_top_trim_ignores_boundary_after_user_frame() {
        let result = trim(&[SUBJECT, "com.example.A", BUILDER, "com.example.B"]);
        assert_eq!(result, frames(&["com.example.A", BUILDER, "com.example.B"]));
    }

    #[test]
    fn test_no_boundary_no_top_trim() {
        let input = ["org.junit.Assert", "com.example.A"];
        assert_eq!(trim(&input), frames(&input));
    }

    #[test]
    fn test_bottom_trim_after_user_frame() {
        let result = trim(&[
            SUBJECT,
            "com.example.FooTest",
            STATEMENT,
            "org.junit.runners.ParentRunner",
            "org.junit.runner.JUnitCore",
        ]);
        assert_eq!(result, frames(&["com.example.FooTest"]));
    }

    #[test]
    fn test_bottom_boundary_kept_without_user_frame() {
        let input = [RUNNER, STATEMENT];
        let result = trim(&[SUBJECT, RUNNER, STATEMENT]);
        assert_eq!(result, frames(&input));
    }

    #[test]
    fn test_bottom_trim_after_kept_boundary() {
        let result = trim(&[SUBJECT, RUNNER, "com.example.MyRule", STATEMENT, "org.junit.X"]);
        assert_eq!(result, frames(&[RUNNER, "com.example.MyRule"]));
    }

    #[test]
    fn test_framework_frames_do_not_count_as_user() {
        let input = ["org.junit.Assert", STATEMENT, "org.junit.Other"];
        assert_eq!(trim(&input), frames(&input));
    }

    #[test]
    fn test_synthetic_frame_does_not_justify_bottom_trim() {
        let mut input = vec![StackFrame::synthetic("Testing framework", 2)];
        input.extend(frames(&[STATEMENT, "org.junit.Other"]));
        let result = trim_boundaries(input.clone(), &FrameClassifier::standard());
        assert_eq!(result, input);
    }

    #[test]
    fn test_trim_empty() {
        assert!(trim(&[]).is_empty());
    }

    #[test]
    fn test_trim_only_library_frames() {
        assert!(trim(&["com.google.common.truth.Impl", SUBJECT]).is_empty());
    }
}
