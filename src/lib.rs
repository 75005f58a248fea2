//! stackscrub - stack trace cleaning for assertion failures
//!
//! When an assertion fails, most of the captured stack trace belongs to the
//! assertion library and the test runner. This library trims those frames
//! and collapses runs of testing-framework and reflective frames, so the
//! failure points at the user's own code.
//!
//! ```
//! use stackscrub::cleaner::clean_stack_trace_with;
//! use stackscrub::config::CleanerConfig;
//! use stackscrub::frame::StackFrame;
//! use stackscrub::throwable::Throwable;
//!
//! let failure = Throwable::new("java.lang.AssertionError", Some("expected: 1".to_string()))
//!     .with_stack_trace(vec![
//!         StackFrame::new("com.google.common.truth.Subject", "isEqualTo", "Subject.java", 90),
//!         StackFrame::new("com.example.FooTest", "testBar", "FooTest.java", 42),
//!         StackFrame::new("org.junit.runners.model.Statement", "evaluate", "Statement.java", 10),
//!     ]);
//!
//! clean_stack_trace_with(&CleanerConfig::default(), &failure);
//! assert_eq!(failure.stack_trace().len(), 1);
//! ```
//!
//! The assertion layer calls [`cleaner::clean_stack_trace`], which reads its
//! settings from the environment through [`config::CleanerConfig::global`].
//!
//! # Collapsed frames
//!
//! A run of two or more frames from the same framework is replaced by a
//! single summary frame whose class name reads
//! `[[Testing framework: 3 frames collapsed (<link>)]]`. Summary frames have
//! an empty method and file and line number 0.

pub mod classifier;
pub mod cleaner;
pub mod cli;
pub mod collapse;
pub mod config;
pub mod frame;
pub mod throwable;
pub mod trace_text;
pub mod trim;
pub mod type_hierarchy;
