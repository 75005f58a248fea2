//! Printed stack trace format
//!
//! Parses and renders the conventional multi-line trace format:
//!
//! ```text
//! java.lang.AssertionError: expected: 1
//! but was: 2
//!     at com.example.FooTest.testBar(FooTest.java:42)
//!     at [[Testing framework: 3 frames collapsed (...)]]
//!     Suppressed: java.lang.IllegalStateException: cleanup failed
//!         at com.example.Fixture.close(Fixture.java:9)
//!         ... 1 more
//! Caused by: java.io.IOException: disk full
//!     at com.example.Store.write(Store.java:77)
//!     ... 1 more
//! ```
//!
//! (Indentation is one tab per level; shown as spaces above.)
//!
//! - A header is `Class` or `Class: message`; message lines may continue
//!   on following lines until the first frame. A continuation line that
//!   looks like a frame or a `... N more` line but is not indented as one
//!   stays part of the message. One that starts with `Caused by: ` cannot be
//!   told apart from a cause and is read as one
//! - `... N more` stands for the last N frames of the enclosing trace
//! - `Caused by:` keeps the owner's indentation, `Suppressed:` adds a tab
//! - `[CIRCULAR REFERENCE: header]` points back at an already printed throwable
//!
//! Rendering produces the same format, so a cleaned trace can be parsed
//! again and cleaned again without change.

use crate::frame::{is_synthetic_class, StackFrame, NATIVE_LINE, UNKNOWN_LINE};
use crate::throwable::Throwable;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

const CAUSE_CAPTION: &str = "Caused by: ";
const SUPPRESSED_CAPTION: &str = "Suppressed: ";
const CIRCULAR_OPEN: &str = "[CIRCULAR REFERENCE: ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty stack trace text")]
    Empty,

    #[error("Line {line}: malformed frame: {content}")]
    MalformedFrame { line: usize, content: String },

    #[error("Line {line}: unexpected content: {content}")]
    UnexpectedLine { line: usize, content: String },

    #[error("Line {line}: indentation depth {depth} does not match any open throwable")]
    MisplacedIndent { line: usize, depth: usize },

    #[error("Line {line}: {requested} shared frames requested but enclosing trace has {available}")]
    MissingEnclosingFrames {
        line: usize,
        requested: usize,
        available: usize,
    },

    #[error("Line {line}: circular reference to unknown throwable: {header}")]
    UnresolvedCircularReference { line: usize, header: String },
}

/// Throwable under construction, linked by index
#[derive(Debug, Default)]
struct Node {
    class_name: String,
    message: Option<String>,
    frames: Vec<StackFrame>,
    cause: Option<usize>,
    suppressed: Vec<usize>,
    /// Frames of the throwable this one was printed inside
    enclosing: Vec<StackFrame>,
    /// False once a frame or nested throwable follows the header
    accepts_message: bool,
}

impl Node {
    fn from_header(header: &str, enclosing: Vec<StackFrame>) -> Self {
        let (class_name, message) = match header.split_once(": ") {
            Some((class_name, message)) => (class_name, Some(message.to_string())),
            None => (header.strip_suffix(':').unwrap_or(header), None),
        };
        Self {
            class_name: class_name.trim().to_string(),
            message,
            enclosing,
            accepts_message: true,
            ..Self::default()
        }
    }

    fn header(&self) -> String {
        match &self.message {
            Some(message) => format!("{}: {}", self.class_name, message),
            None => self.class_name.clone(),
        }
    }
}

enum Line<'a> {
    Frame(&'a str),
    More(&'a str),
    Cause(&'a str),
    Suppressed(&'a str),
    Other,
}

fn split_line(raw: &str) -> (usize, Line<'_>) {
    let body = raw.trim_start_matches('\t');
    let depth = raw.len() - body.len();
    let kind = if let Some(rest) = body.strip_prefix("at ") {
        Line::Frame(rest.trim())
    } else if let Some(rest) = body
        .strip_prefix("... ")
        .and_then(|rest| rest.trim_end().strip_suffix(" more"))
    {
        Line::More(rest)
    } else if let Some(rest) = body.strip_prefix(CAUSE_CAPTION) {
        Line::Cause(rest)
    } else if let Some(rest) = body.strip_prefix(SUPPRESSED_CAPTION) {
        Line::Suppressed(rest)
    } else {
        Line::Other
    };
    (depth, kind)
}

/// Parse one frame, without the leading `at `
pub fn parse_frame(text: &str) -> Option<StackFrame> {
    if is_synthetic_class(text) {
        return Some(StackFrame::new(text, "", "", 0));
    }

    let (head, location) = text.strip_suffix(')')?.rsplit_once('(')?;
    // Drop class loader and module prefixes such as `java.base/` or `app//`
    let qualified = head.rsplit('/').next().unwrap_or(head);
    let (class_name, method) = qualified.rsplit_once('.')?;
    if class_name.is_empty() || method.is_empty() || class_name.contains(char::is_whitespace) {
        return None;
    }

    let (file_name, line_number) = match location {
        "Native Method" => ("", NATIVE_LINE),
        "Unknown Source" => ("", UNKNOWN_LINE),
        _ => match location.rsplit_once(':') {
            Some((file, line)) => match line.parse::<i32>() {
                Ok(line) => (file, line),
                Err(_) => (location, UNKNOWN_LINE),
            },
            None => (location, UNKNOWN_LINE),
        },
    };
    let file_name = if file_name == "Unknown Source" { "" } else { file_name };

    Some(StackFrame::new(class_name, method, file_name, line_number))
}

/// Parse printed stack trace text into a throwable graph
pub fn parse_trace(text: &str) -> Result<Throwable, ParseError> {
    let mut lines = text
        .trim_end()
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .skip_while(|(_, line)| line.trim().is_empty());

    let (_, first) = lines.next().ok_or(ParseError::Empty)?;
    let first = strip_thread_prefix(first.trim());

    let mut nodes = vec![Node::from_header(first, Vec::new())];
    // (node index, indentation of its header)
    let mut open: Vec<(usize, usize)> = vec![(0, 0)];

    for (line_no, raw) in lines {
        let (depth, kind) = split_line(raw);
        match kind {
            Line::Frame(text) => {
                let owner = match owner_at(&open, depth, line_no) {
                    Ok(owner) => owner,
                    Err(err) => {
                        continue_message(&mut nodes, &open, raw).ok_or(err)?;
                        continue;
                    }
                };
                let frame = parse_frame(text).ok_or_else(|| ParseError::MalformedFrame {
                    line: line_no,
                    content: raw.to_string(),
                })?;
                let node = &mut nodes[owner];
                node.frames.push(frame);
                node.accepts_message = false;
            }
            Line::More(count) => {
                let owner = match owner_at(&open, depth, line_no) {
                    Ok(owner) => owner,
                    Err(err) => {
                        continue_message(&mut nodes, &open, raw).ok_or(err)?;
                        continue;
                    }
                };
                let requested: usize = count.trim().parse().map_err(|_| ParseError::UnexpectedLine {
                    line: line_no,
                    content: raw.to_string(),
                })?;
                let node = &mut nodes[owner];
                let available = node.enclosing.len();
                if requested > available {
                    return Err(ParseError::MissingEnclosingFrames {
                        line: line_no,
                        requested,
                        available,
                    });
                }
                let shared = node.enclosing[available - requested..].to_vec();
                node.frames.extend(shared);
                node.accepts_message = false;
            }
            Line::Cause(header) => {
                // The cause is printed at its owner's indentation, after the
                // owner's suppressed throwables
                close_deeper_than(&mut open, depth, line_no)?;
                let (owner, _) = open.pop().ok_or(ParseError::MisplacedIndent { line: line_no, depth })?;
                nodes[owner].accepts_message = false;

                let child = attach(&mut nodes, owner, header, line_no)?;
                nodes[owner].cause = Some(child.index());
                if let Attached::New(idx) = child {
                    open.push((idx, depth));
                }
            }
            Line::Suppressed(header) => {
                if depth == 0 {
                    // Never structure at the left margin
                    continue_message(&mut nodes, &open, raw)
                        .ok_or(ParseError::MisplacedIndent { line: line_no, depth })?;
                    continue;
                }
                close_deeper_than(&mut open, depth - 1, line_no)?;
                let &(owner, _) = open.last().ok_or(ParseError::MisplacedIndent { line: line_no, depth })?;
                nodes[owner].accepts_message = false;

                let child = attach(&mut nodes, owner, header, line_no)?;
                nodes[owner].suppressed.push(child.index());
                if let Attached::New(idx) = child {
                    open.push((idx, depth));
                }
            }
            Line::Other => {
                if continue_message(&mut nodes, &open, raw).is_some() || raw.trim().is_empty() {
                    continue;
                }
                return Err(ParseError::UnexpectedLine {
                    line: line_no,
                    content: raw.to_string(),
                });
            }
        }
    }

    Ok(build_graph(nodes))
}

/// Append `raw` to the message of the innermost open throwable while its
/// header is still being read; `None` once frames have started
fn continue_message(nodes: &mut [Node], open: &[(usize, usize)], raw: &str) -> Option<()> {
    let &(current, _) = open.last()?;
    let node = &mut nodes[current];
    if !node.accepts_message {
        return None;
    }
    let message = node.message.get_or_insert_with(String::new);
    message.push('\n');
    message.push_str(raw);
    Some(())
}

/// Uncaught-exception output starts with `Exception in thread "name" `
fn strip_thread_prefix(header: &str) -> &str {
    header
        .strip_prefix("Exception in thread \"")
        .and_then(|rest| rest.split_once("\" "))
        .map_or(header, |(_, header)| header)
}

enum Attached {
    New(usize),
    Existing(usize),
}

impl Attached {
    fn index(&self) -> usize {
        match self {
            Attached::New(idx) | Attached::Existing(idx) => *idx,
        }
    }
}

/// Create the node for a `Caused by:`/`Suppressed:` header, or resolve a
/// circular reference to an already parsed node
fn attach(nodes: &mut Vec<Node>, owner: usize, header: &str, line: usize) -> Result<Attached, ParseError> {
    if let Some(referenced) = header
        .strip_prefix(CIRCULAR_OPEN)
        .and_then(|rest| rest.trim_end().strip_suffix(']'))
    {
        return nodes
            .iter()
            .rposition(|node| node.header() == referenced)
            .map(Attached::Existing)
            .ok_or_else(|| ParseError::UnresolvedCircularReference {
                line,
                header: referenced.to_string(),
            });
    }

    let enclosing = nodes[owner].frames.clone();
    nodes.push(Node::from_header(header.trim(), enclosing));
    Ok(Attached::New(nodes.len() - 1))
}

/// The open throwable whose frames are indented by `depth` tabs
fn owner_at(open: &[(usize, usize)], depth: usize, line: usize) -> Result<usize, ParseError> {
    match open.last() {
        Some(&(idx, indent)) if indent + 1 == depth => Ok(idx),
        _ => Err(ParseError::MisplacedIndent { line, depth }),
    }
}

/// Close open throwables until the innermost one is indented by `depth`
fn close_deeper_than(open: &mut Vec<(usize, usize)>, depth: usize, line: usize) -> Result<(), ParseError> {
    while let Some(&(_, indent)) = open.last() {
        if indent <= depth {
            break;
        }
        open.pop();
    }
    match open.last() {
        Some(&(_, indent)) if indent == depth => Ok(()),
        _ => Err(ParseError::MisplacedIndent { line, depth }),
    }
}

fn build_graph(nodes: Vec<Node>) -> Throwable {
    let throwables: Vec<Throwable> = nodes
        .iter()
        .map(|node| {
            Throwable::new(node.class_name.clone(), node.message.clone())
                .with_stack_trace(node.frames.clone())
        })
        .collect();

    for (node, throwable) in nodes.iter().zip(&throwables) {
        if let Some(cause) = node.cause {
            throwable.set_cause(Some(throwables[cause].clone()));
        }
        for &suppressed in &node.suppressed {
            throwable.add_suppressed(throwables[suppressed].clone());
        }
    }

    throwables[0].clone()
}

/// Render a throwable graph in the printed trace format
pub fn render_trace(throwable: &Throwable) -> String {
    RenderedTrace(throwable).to_string()
}

/// [`fmt::Display`] adapter printing a throwable graph as a trace
///
/// Nested throwables are written from a work stack, so arbitrarily long
/// cause chains render without recursion.
#[derive(Debug, Clone, Copy)]
pub struct RenderedTrace<'a>(pub &'a Throwable);

/// A throwable waiting to be printed inside another one
struct Pending {
    throwable: Throwable,
    enclosing: Rc<[StackFrame]>,
    caption: &'static str,
    prefix: String,
}

impl fmt::Display for RenderedTrace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = self.0;
        let mut seen = HashSet::new();
        seen.insert(root.id());

        let frames: Rc<[StackFrame]> = root.stack_trace().into();
        writeln!(f, "{}", root.header())?;
        for frame in frames.iter() {
            writeln!(f, "\tat {}", frame)?;
        }

        let mut pending = Vec::new();
        push_enclosed(&mut pending, root, &frames, "");

        while let Some(Pending {
            throwable,
            enclosing,
            caption,
            prefix,
        }) = pending.pop()
        {
            if !seen.insert(throwable.id()) {
                writeln!(f, "{prefix}{caption}{CIRCULAR_OPEN}{}]", throwable.header())?;
                continue;
            }

            let frames: Rc<[StackFrame]> = throwable.stack_trace().into();
            let in_common = frames
                .iter()
                .rev()
                .zip(enclosing.iter().rev())
                .take_while(|(a, b)| a == b)
                .count();

            writeln!(f, "{prefix}{caption}{}", throwable.header())?;
            for frame in &frames[..frames.len() - in_common] {
                writeln!(f, "{prefix}\tat {}", frame)?;
            }
            if in_common != 0 {
                writeln!(f, "{prefix}\t... {} more", in_common)?;
            }

            push_enclosed(&mut pending, &throwable, &frames, &prefix);
        }
        Ok(())
    }
}

/// Queue the suppressed throwables (one tab deeper) and then the cause (same
/// indentation) of `owner`, so that they pop in printing order
fn push_enclosed(pending: &mut Vec<Pending>, owner: &Throwable, frames: &Rc<[StackFrame]>, prefix: &str) {
    if let Some(cause) = owner.cause() {
        pending.push(Pending {
            throwable: cause,
            enclosing: Rc::clone(frames),
            caption: CAUSE_CAPTION,
            prefix: prefix.to_string(),
        });
    }
    let nested_prefix = format!("{prefix}\t");
    for suppressed in owner.suppressed().into_iter().rev() {
        pending.push(Pending {
            throwable: suppressed,
            enclosing: Rc::clone(frames),
            caption: SUPPRESSED_CAPTION,
            prefix: nested_prefix.clone(),
        });
    }
}
