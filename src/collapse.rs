//! Streak collapsing
//!
//! Replaces each maximal run of two or more frames from the same
//! collapsible bucket with a single synthetic summary frame:
//!
//! ```text
//! Input:
//! [MyTest.testFoo, org.junit.A, org.junit.B, org.junit.C, MyTest.helper]
//!
//! Output:
//! [MyTest.testFoo, [[Testing framework: 3 frames collapsed (...)]], MyTest.helper]
//! ```
//!
//! Synthetic frames classify as user frames, so they break runs and are
//! never folded into a new summary. Collapsing an already collapsed trace
//! therefore changes nothing.

use crate::classifier::{Bucket, FrameClassifier};
use crate::frame::StackFrame;
use crate::type_hierarchy::TypeHierarchy;

/// Shortest run that is replaced by a summary frame
pub const MIN_COLLAPSED_RUN: usize = 2;

/// Collapse streaks of same-bucket frames, preserving order
pub fn collapse_streaks<H: TypeHierarchy>(
    frames: Vec<StackFrame>,
    classifier: &FrameClassifier<H>,
) -> Vec<StackFrame> {
    let mut collapsed = Vec::with_capacity(frames.len());
    let mut run: Vec<StackFrame> = Vec::new();
    let mut run_bucket: Option<Bucket> = None;

    for frame in frames {
        let bucket = classifier.classify(&frame).bucket();
        if bucket.is_none() || bucket != run_bucket {
            flush_run(&mut collapsed, &mut run, run_bucket);
        }
        match bucket {
            Some(_) => run.push(frame),
            None => collapsed.push(frame),
        }
        run_bucket = bucket;
    }
    flush_run(&mut collapsed, &mut run, run_bucket);

    collapsed
}

fn flush_run(out: &mut Vec<StackFrame>, run: &mut Vec<StackFrame>, bucket: Option<Bucket>) {
    match bucket {
        Some(bucket) if run.len() >= MIN_COLLAPSED_RUN => {
            out.push(StackFrame::synthetic(bucket.label(), run.len()));
            run.clear();
        }
        _ => out.append(run),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(class_names: &[&str]) -> Vec<StackFrame> {
        class_names.iter().map(|c| StackFrame::for_class(*c)).collect()
    }

    fn collapse(class_names: &[&str]) -> Vec<StackFrame> {
        collapse_streaks(frames(class_names), &FrameClassifier::standard())
    }

    #[test]
    fn test_collapse_framework_streak() {
        let result = collapse(&[
            "com.example.A",
            "org.junit.F1",
            "org.junit.F2",
            "org.junit.F3",
            "com.example.B",
        ]);
        assert_eq!(
            result,
            vec![
                StackFrame::for_class("com.example.A"),
                StackFrame::synthetic("Testing framework", 3),
                StackFrame::for_class("com.example.B"),
            ]
        );
    }

    #[test]
    fn test_single_frame_is_not_collapsed() {
        let input = ["com.example.A", "org.junit.F1", "com.example.B"];
        assert_eq!(collapse(&input), frames(&input));
    }

    #[test]
    fn test_adjacent_buckets_collapse_separately() {
        let result = collapse(&[
            "org.junit.F1",
            "org.junit.F2",
            "sun.reflect.R1",
            "java.lang.reflect.Method",
        ]);
        assert_eq!(
            result,
            vec![
                StackFrame::synthetic("Testing framework", 2),
                StackFrame::synthetic("Reflective call", 2),
            ]
        );
    }

    #[test]
    fn test_single_frames_of_different_buckets_are_kept() {
        let input = ["org.junit.F1", "sun.reflect.R1", "org.junit.F2"];
        assert_eq!(collapse(&input), frames(&input));
    }

    #[test]
    fn test_boundary_frames_break_runs() {
        let result = collapse(&[
            "org.junit.F1",
            "org.junit.runners.model.Statement",
            "org.junit.F2",
        ]);
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|f| !f.is_synthetic()));
    }

    #[test]
    fn test_existing_synthetic_frames_are_opaque() {
        let mut input = frames(&["org.junit.F1"]);
        input.push(StackFrame::synthetic("Testing framework", 5));
        input.extend(frames(&["org.junit.F2"]));

        let result = collapse_streaks(input.clone(), &FrameClassifier::standard());
        assert_eq!(result, input);
    }

    #[test]
    fn test_collapse_is_idempotent() {
        let once = collapse(&[
            "org.junit.F1",
            "org.junit.F2",
            "com.example.A",
            "sun.reflect.R1",
            "sun.reflect.R2",
            "sun.reflect.R3",
        ]);
        let twice = collapse_streaks(once.clone(), &FrameClassifier::standard());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_collapse_empty() {
        assert!(collapse(&[]).is_empty());
    }

    #[test]
    fn test_trailing_run_is_collapsed() {
        let result = collapse(&["com.example.A", "sun.reflect.R1", "sun.reflect.R2"]);
        assert_eq!(result.last(), Some(&StackFrame::synthetic("Reflective call", 2)));
    }
}
