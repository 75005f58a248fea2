//! Throwable graph
//!
//! A [`Throwable`] is a shared handle to a failure record: a type name, a
//! message, a mutable stack trace, an optional cause and a list of
//! suppressed throwables. Cloning the handle shares the record, so the
//! cause/suppressed relations form a directed graph that may contain cycles
//! (a throwable can even be its own cause). Identity is the shared
//! allocation, never the record's contents.

use crate::frame::StackFrame;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct ThrowableState {
    class_name: String,
    message: Option<String>,
    stack_trace: Vec<StackFrame>,
    cause: Option<Throwable>,
    suppressed: Vec<Throwable>,
}

// Unlinks nested throwables one at a time so that dropping a long cause
// chain does not recurse once per link
impl Drop for ThrowableState {
    fn drop(&mut self) {
        let mut pending: Vec<Throwable> = self.cause.take().into_iter().collect();
        pending.append(&mut self.suppressed);
        while let Some(throwable) = pending.pop() {
            if let Ok(mutex) = Arc::try_unwrap(throwable.inner) {
                let mut state = mutex.into_inner().unwrap_or_else(PoisonError::into_inner);
                pending.extend(state.cause.take());
                pending.append(&mut state.suppressed);
            }
        }
    }
}

/// Shared, mutable failure record
///
/// # Cycles
///
/// Cause and suppressed links are strong references. A throwable that is
/// its own cause, or any other cycle through cause and suppressed links,
/// keeps itself alive after the last outside handle is dropped. Call
/// [`Throwable::detach`] on a member of the cycle once the failure has been
/// reported to release it.
#[derive(Clone)]
pub struct Throwable {
    inner: Arc<Mutex<ThrowableState>>,
}

/// Opaque identity of a [`Throwable`], stable for the lifetime of the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThrowableId(usize);

impl Throwable {
    pub fn new(class_name: impl Into<String>, message: Option<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ThrowableState {
                class_name: class_name.into(),
                message,
                stack_trace: Vec::new(),
                cause: None,
                suppressed: Vec::new(),
            })),
        }
    }

    pub fn with_stack_trace(self, frames: Vec<StackFrame>) -> Self {
        self.set_stack_trace(frames);
        self
    }

    pub fn with_cause(self, cause: Throwable) -> Self {
        self.set_cause(Some(cause));
        self
    }

    pub fn with_suppressed(self, suppressed: Throwable) -> Self {
        self.add_suppressed(suppressed);
        self
    }

    // A panic while the lock was held cannot leave the record half-written
    // (every mutation is a single assignment), so a poisoned lock is usable.
    fn state(&self) -> MutexGuard<'_, ThrowableState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> ThrowableId {
        ThrowableId(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    /// Whether both handles refer to the same record
    pub fn same_as(&self, other: &Throwable) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn class_name(&self) -> String {
        self.state().class_name.clone()
    }

    pub fn message(&self) -> Option<String> {
        self.state().message.clone()
    }

    pub fn stack_trace(&self) -> Vec<StackFrame> {
        self.state().stack_trace.clone()
    }

    pub fn set_stack_trace(&self, frames: Vec<StackFrame>) {
        self.state().stack_trace = frames;
    }

    /// Move the stack trace out, leaving it empty
    pub fn take_stack_trace(&self) -> Vec<StackFrame> {
        std::mem::take(&mut self.state().stack_trace)
    }

    pub fn cause(&self) -> Option<Throwable> {
        self.state().cause.clone()
    }

    pub fn set_cause(&self, cause: Option<Throwable>) {
        self.state().cause = cause;
    }

    pub fn suppressed(&self) -> Vec<Throwable> {
        self.state().suppressed.clone()
    }

    pub fn add_suppressed(&self, suppressed: Throwable) {
        self.state().suppressed.push(suppressed);
    }

    /// Drop the cause and all suppressed throwables
    pub fn detach(&self) {
        let mut state = self.state();
        state.cause = None;
        state.suppressed.clear();
    }

    /// `Class: message`, or just the class name when there is no message
    pub fn header(&self) -> String {
        let state = self.state();
        match &state.message {
            Some(message) => format!("{}: {}", state.class_name, message),
            None => state.class_name.clone(),
        }
    }

    /// Snapshot of the graph as a tree, cutting cycles at repeated throwables
    ///
    /// Throwables are visited cause first, then suppressed in order; the
    /// second time a throwable is reached it is recorded as `circular`
    /// without frames or links.
    pub fn to_record(&self) -> ThrowableRecord {
        let mut seen = HashSet::new();
        // Preorder, so every child lands after its parent
        let mut records: Vec<ThrowableRecord> = Vec::new();
        let mut links: Vec<(Option<usize>, Vec<usize>)> = Vec::new();
        let mut pending: Vec<(Throwable, Option<(usize, bool)>)> = vec![(self.clone(), None)];

        while let Some((throwable, parent)) = pending.pop() {
            let idx = records.len();
            match parent {
                Some((parent, true)) => links[parent].0 = Some(idx),
                Some((parent, false)) => links[parent].1.push(idx),
                None => {}
            }

            let circular = !seen.insert(throwable.id());
            let (class_name, message, stack_trace, cause, suppressed) = {
                let state = throwable.state();
                if circular {
                    (state.class_name.clone(), state.message.clone(), Vec::new(), None, Vec::new())
                } else {
                    (
                        state.class_name.clone(),
                        state.message.clone(),
                        state.stack_trace.clone(),
                        state.cause.clone(),
                        state.suppressed.clone(),
                    )
                }
            };

            records.push(ThrowableRecord {
                class_name,
                message,
                stack_trace,
                cause: None,
                suppressed: Vec::new(),
                circular,
            });
            links.push((None, Vec::new()));

            for suppressed in suppressed.into_iter().rev() {
                pending.push((suppressed, Some((idx, false))));
            }
            if let Some(cause) = cause {
                pending.push((cause, Some((idx, true))));
            }
        }

        for (idx, (cause, suppressed)) in links.into_iter().enumerate().rev() {
            let cause = cause.map(|c| Box::new(std::mem::take(&mut records[c])));
            let suppressed = suppressed
                .into_iter()
                .map(|s| std::mem::take(&mut records[s]))
                .collect();
            records[idx].cause = cause;
            records[idx].suppressed = suppressed;
        }

        records.into_iter().next().unwrap_or_default()
    }

    /// Rebuild a throwable graph from a tree snapshot
    pub fn from_record(record: &ThrowableRecord) -> Self {
        let build = |record: &ThrowableRecord| {
            Throwable::new(record.class_name.clone(), record.message.clone())
                .with_stack_trace(record.stack_trace.clone())
        };

        let root = build(record);
        let mut pending = vec![(record, root.clone())];
        while let Some((record, throwable)) = pending.pop() {
            if let Some(cause) = &record.cause {
                let child = build(cause);
                throwable.set_cause(Some(child.clone()));
                pending.push((cause, child));
            }
            for suppressed in &record.suppressed {
                let child = build(suppressed);
                throwable.add_suppressed(child.clone());
                pending.push((suppressed, child));
            }
        }
        root
    }

    /// Nesting depth of the tree [`Throwable::to_record`] builds, counting
    /// this throwable and circular references
    pub fn depth(&self) -> usize {
        let mut seen = HashSet::new();
        let mut deepest = 0;
        let mut pending = vec![(self.clone(), 1)];
        while let Some((throwable, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            if !seen.insert(throwable.id()) {
                continue;
            }
            pending.extend(throwable.suppressed().into_iter().rev().map(|s| (s, depth + 1)));
            pending.extend(throwable.cause().map(|c| (c, depth + 1)));
        }
        deepest
    }
}

impl fmt::Debug for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Cause and suppressed are summarized to stay finite on cyclic graphs
        let state = self.state();
        f.debug_struct("Throwable")
            .field("class_name", &state.class_name)
            .field("message", &state.message)
            .field("stack_trace", &state.stack_trace.len())
            .field("has_cause", &state.cause.is_some())
            .field("suppressed", &state.suppressed.len())
            .finish()
    }
}

/// Serializable tree snapshot of a throwable graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThrowableRecord {
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub stack_trace: Vec<StackFrame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ThrowableRecord>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<ThrowableRecord>,
    /// Set where a repeated throwable was cut to keep the tree finite
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub circular: bool,
}

impl Drop for ThrowableRecord {
    fn drop(&mut self) {
        let mut pending: Vec<ThrowableRecord> = self.cause.take().map(|c| *c).into_iter().collect();
        pending.append(&mut self.suppressed);
        while let Some(mut record) = pending.pop() {
            pending.extend(record.cause.take().map(|c| *c));
            pending.append(&mut record.suppressed);
        }
    }
}
