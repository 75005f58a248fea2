//! Stack trace cleaning over a throwable graph
//!
//! # Algorithm
//!
//! For each throwable reachable from the one being cleaned:
//!
//! 1. Skip it if this cleaning pass has already visited it (identity check)
//! 2. Trim library frames from the top and runner frames from the bottom
//! 3. Collapse streaks of framework and reflective frames
//! 4. Continue with the cause, then each suppressed throwable
//!
//! Throwables are taken from an explicit work stack, so a cause chain of
//! any length is walked in constant stack space. The visited set lives in a
//! [`CleaningContext`] created per top-level call, so self-causes and
//! cycles through suppressed throwables terminate.
//! Cleaning never fails: unknown classes fall back to name matching and an
//! empty trace stays empty.

use crate::classifier::{FrameClassifier, TestClassPredicate};
use crate::collapse::collapse_streaks;
use crate::config::CleanerConfig;
use crate::throwable::{Throwable, ThrowableId};
use crate::trim::trim_boundaries;
use crate::type_hierarchy::{NoTypeInfo, TypeHierarchy};
use std::collections::HashSet;

/// Throwables already visited by one top-level cleaning call
#[derive(Debug, Default)]
pub struct CleaningContext {
    visited: HashSet<ThrowableId>,
}

impl CleaningContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a throwable visited; false if it already was
    pub fn visit(&mut self, throwable: &Throwable) -> bool {
        self.visited.insert(throwable.id())
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// Cleans the stack traces of a throwable and everything reachable from it
#[derive(Debug, Clone)]
pub struct StackTraceCleaner<H = NoTypeInfo> {
    classifier: FrameClassifier<H>,
}

static STANDARD_CLEANER: StackTraceCleaner = StackTraceCleaner::standard();

impl StackTraceCleaner<NoTypeInfo> {
    pub const fn standard() -> Self {
        Self {
            classifier: FrameClassifier::standard(),
        }
    }
}

impl Default for StackTraceCleaner<NoTypeInfo> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<H: TypeHierarchy> StackTraceCleaner<H> {
    pub fn new(classifier: FrameClassifier<H>) -> Self {
        Self { classifier }
    }

    pub fn with_hierarchy(hierarchy: H) -> Self {
        Self::new(FrameClassifier::with_hierarchy(hierarchy))
    }

    pub fn with_test_class_predicate(self, predicate: TestClassPredicate) -> Self {
        Self::new(self.classifier.with_test_class_predicate(predicate))
    }

    pub fn classifier(&self) -> &FrameClassifier<H> {
        &self.classifier
    }

    /// Clean `throwable` and its cause/suppressed graph in place
    pub fn clean(&self, throwable: &Throwable) {
        let mut context = CleaningContext::new();
        self.clean_with_context(throwable, &mut context);
    }

    /// Clean using a caller-supplied context; throwables already in the
    /// context are left untouched
    pub fn clean_with_context(&self, throwable: &Throwable, context: &mut CleaningContext) {
        let mut pending = vec![throwable.clone()];
        while let Some(current) = pending.pop() {
            if !context.visit(&current) {
                tracing::trace!("Skipping already cleaned throwable {}", current.class_name());
                continue;
            }

            self.clean_frames(&current);

            // Handles are cloned out; no lock is held between throwables.
            // Pushed in reverse so the cause pops first.
            pending.extend(current.suppressed().into_iter().rev());
            pending.extend(current.cause());
        }
    }

    fn clean_frames(&self, throwable: &Throwable) {
        let frames = throwable.take_stack_trace();
        let original_len = frames.len();

        let trimmed = trim_boundaries(frames, &self.classifier);
        let trimmed_len = trimmed.len();
        let cleaned = collapse_streaks(trimmed, &self.classifier);

        tracing::trace!(
            "Cleaned {}: {} frames, {} trimmed, {} after collapsing",
            throwable.class_name(),
            original_len,
            original_len - trimmed_len,
            cleaned.len()
        );

        throwable.set_stack_trace(cleaned);
    }
}

/// Clean a failure's stack trace with the standard tables
///
/// This is the single call the assertion layer makes after building a
/// failure and before throwing or reporting it. It does nothing when
/// cleaning is disabled through [`CleanerConfig`].
pub fn clean_stack_trace(throwable: &Throwable) {
    clean_stack_trace_with(CleanerConfig::global(), throwable);
}

/// [`clean_stack_trace`] with explicit settings instead of the environment
pub fn clean_stack_trace_with(config: &CleanerConfig, throwable: &Throwable) {
    if !config.enabled {
        tracing::debug!("Stack trace cleaning disabled by configuration");
        return;
    }
    STANDARD_CLEANER.clean(throwable);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::StackFrame;
    use crate::type_hierarchy::TypeTable;

    fn frames(class_names: &[&str]) -> Vec<StackFrame> {
        class_names.iter().map(|c| StackFrame::for_class(*c)).collect()
    }

    fn throwable(class_names: &[&str]) -> Throwable {
        Throwable::new("java.lang.AssertionError", None).with_stack_trace(frames(class_names))
    }

    #[test]
    fn test_clean_collapses_streak() {
        let t = throwable(&[
            "com.example.A",
            "org.junit.F1",
            "org.junit.F2",
            "org.junit.F3",
            "com.example.B",
        ]);
        StackTraceCleaner::standard().clean(&t);
        assert_eq!(
            t.stack_trace(),
            vec![
                StackFrame::for_class("com.example.A"),
                StackFrame::synthetic("Testing framework", 3),
                StackFrame::for_class("com.example.B"),
            ]
        );
    }

    #[test]
    fn test_clean_trims_then_collapses() {
        let t = throwable(&[
            "com.google.common.truth.Subject",
            "com.example.FooTest",
            "sun.reflect.NativeMethodAccessorImpl",
            "sun.reflect.DelegatingMethodAccessorImpl",
            "org.junit.internal.runners.statements.InvokeMethod",
            "org.junit.runners.ParentRunner",
        ]);
        StackTraceCleaner::standard().clean(&t);
        assert_eq!(
            t.stack_trace(),
            vec![
                StackFrame::for_class("com.example.FooTest"),
                StackFrame::synthetic("Reflective call", 2),
            ]
        );
    }

    #[test]
    fn test_clean_empty_trace() {
        let t = throwable(&[]);
        StackTraceCleaner::standard().clean(&t);
        assert!(t.stack_trace().is_empty());
    }

    #[test]
    fn test_self_cause_terminates() {
        let t = throwable(&["com.google.common.truth.Subject", "com.example.A"]);
        t.set_cause(Some(t.clone()));
        StackTraceCleaner::standard().clean(&t);
        assert_eq!(t.stack_trace(), frames(&["com.example.A"]));
    }

    #[test]
    fn test_suppressed_cycle_terminates() {
        let a = throwable(&["org.junit.F1", "org.junit.F2"]);
        let b = throwable(&["sun.reflect.R1", "sun.reflect.R2"]);
        a.add_suppressed(b.clone());
        b.add_suppressed(a.clone());

        StackTraceCleaner::standard().clean(&a);
        assert_eq!(a.stack_trace(), vec![StackFrame::synthetic("Testing framework", 2)]);
        assert_eq!(b.stack_trace(), vec![StackFrame::synthetic("Reflective call", 2)]);
    }

    #[test]
    fn test_context_counts_each_throwable_once() {
        let shared = throwable(&["com.example.A"]);
        let root = throwable(&["com.example.B"])
            .with_cause(shared.clone())
            .with_suppressed(shared.clone());

        let mut context = CleaningContext::new();
        StackTraceCleaner::standard().clean_with_context(&root, &mut context);
        assert_eq!(context.visited_count(), 2);
    }

    #[test]
    fn test_previsited_throwable_is_left_alone() {
        let t = throwable(&["org.junit.F1", "org.junit.F2"]);
        let mut context = CleaningContext::new();
        assert!(context.visit(&t));

        StackTraceCleaner::standard().clean_with_context(&t, &mut context);
        assert_eq!(t.stack_trace(), frames(&["org.junit.F1", "org.junit.F2"]));
    }

    #[test]
    fn test_hierarchy_cleaner_trims_custom_subject() {
        let types = TypeTable::new().with_type("com.acme.MoneySubject", ["com.google.common.truth.Subject"]);
        let t = throwable(&["com.acme.MoneySubject", "com.acme.MoneyTest"]);
        StackTraceCleaner::with_hierarchy(types).clean(&t);
        assert_eq!(t.stack_trace(), frames(&["com.acme.MoneyTest"]));
    }

    #[test]
    fn test_custom_test_predicate_keeps_suffixed_classes() {
        let cleaner = StackTraceCleaner::standard()
            .with_test_class_predicate(TestClassPredicate::Suffixes(vec!["Spec".to_string()]));
        let t = throwable(&["com.example.A", "org.junit.FooSpec", "org.junit.FooSpec"]);
        cleaner.clean(&t);
        assert_eq!(
            t.stack_trace(),
            frames(&["com.example.A", "org.junit.FooSpec", "org.junit.FooSpec"])
        );
    }

    #[test]
    fn test_clean_stack_trace_uses_standard_tables() {
        let t = throwable(&["com.google.common.truth.Truth", "com.example.A"]);
        clean_stack_trace_with(&CleanerConfig::default(), &t);
        assert_eq!(t.stack_trace(), frames(&["com.example.A"]));
    }

    #[test]
    fn test_disabled_config_leaves_trace_untouched() {
        let original = frames(&["com.google.common.truth.Truth", "org.junit.F1", "org.junit.F2"]);
        let t = throwable(&["com.google.common.truth.Truth", "org.junit.F1", "org.junit.F2"]);
        clean_stack_trace_with(&CleanerConfig::from_disable_value(Some("1")), &t);
        assert_eq!(t.stack_trace(), original);
    }

    #[test]
    fn test_deep_cause_chain_cleans_without_recursion() {
        let depth = 100_000;
        let root = throwable(&["com.example.A", "org.junit.F1", "org.junit.F2"]);
        let mut tail = root.clone();
        for _ in 1..depth {
            let next = throwable(&["com.google.common.truth.Subject", "com.example.B"]);
            tail.set_cause(Some(next.clone()));
            tail = next;
        }

        let mut context = CleaningContext::new();
        StackTraceCleaner::standard().clean_with_context(&root, &mut context);

        assert_eq!(context.visited_count(), depth);
        assert_eq!(
            root.stack_trace(),
            vec![
                StackFrame::for_class("com.example.A"),
                StackFrame::synthetic("Testing framework", 2),
            ]
        );
        assert_eq!(tail.stack_trace(), frames(&["com.example.B"]));
    }
}
