//! Call-stack capture and cause-chain inspection
//!
//! Errors are enriched with a [`StackTrace`] by wrapping them in a
//! [`TracedError`]. Before capturing, the cause chain is searched so an error
//! that already carries a stack somewhere in its chain is left untouched.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use super::error::Result;

/// Maximum number of frames kept in a captured trace
pub const MAX_STACK_FRAMES: usize = 25;

/// Upper bound on cause-chain walks, guarding against cyclic wrapping
pub const MAX_CAUSE_DEPTH: usize = 32;

pub type BoxError = Box<dyn Error + Send + Sync + 'static>;
pub type SharedError = Arc<dyn Error + Send + Sync + 'static>;

const CRATE_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");
const CORE_SOURCE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/");

static TEST_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(_test\.rs$|/tests/)").expect("test file pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl Frame {
    fn from_symbol(symbol: &backtrace::Symbol) -> Self {
        Self {
            function: symbol
                .name()
                .map(|n| format!("{:#}", n))
                .unwrap_or_else(|| "<unknown>".to_string()),
            file: symbol.filename().map(|p| p.display().to_string()),
            line: symbol.lineno(),
        }
    }

    fn is_test(&self) -> bool {
        self.function.contains("::tests::")
            || self.file.as_deref().is_some_and(|f| TEST_FILE.is_match(f))
    }

    /// Whether the frame belongs to this crate or the capture machinery
    fn is_core(&self) -> bool {
        let function = self.function.trim_start_matches('<');
        if function.starts_with("backtrace::") || function.starts_with("_Unwind") {
            return true;
        }
        if self.is_test() {
            return false;
        }
        function.starts_with(CRATE_PREFIX)
            || self
                .file
                .as_deref()
                .is_some_and(|f| f.starts_with(CORE_SOURCE_DIR))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.function)?;
        if let Some(file) = &self.file {
            write!(f, " ({}", file)?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Ordered frames, innermost call first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StackTrace {
    frames: Vec<Frame>,
}

impl StackTrace {
    /// Capture the current stack, starting at the first frame outside this crate
    pub fn capture() -> Self {
        let mut frames = Vec::with_capacity(MAX_STACK_FRAMES);
        let mut leading = true;

        backtrace::trace(|raw| {
            let mut symbols = Vec::new();
            backtrace::resolve_frame(raw, |symbol| symbols.push(Frame::from_symbol(symbol)));
            if symbols.is_empty() {
                symbols.push(Frame {
                    function: format!("{:?}", raw.ip()),
                    file: None,
                    line: None,
                });
            }

            for frame in symbols {
                if leading && frame.is_core() {
                    continue;
                }
                leading = false;
                frames.push(frame);
                if frames.len() >= MAX_STACK_FRAMES {
                    return false;
                }
            }
            true
        });

        Self { frames }
    }

    pub fn from_frames(mut frames: Vec<Frame>) -> Self {
        frames.truncate(MAX_STACK_FRAMES);
        Self { frames }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// A copy with the frames rejected by `filter` removed
    pub fn filtered(&self, filter: &StackFilter) -> StackTrace {
        filter.apply(self)
    }
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &self.frames {
            writeln!(f, "{}", frame)?;
        }
        Ok(())
    }
}

/// An error carrying the stack captured where it was wrapped
#[derive(Debug)]
pub struct TracedError {
    context: Option<String>,
    source: BoxError,
    stack: StackTrace,
}

impl TracedError {
    /// Attach a stack captured at the caller to `err`
    pub fn capture<E: Into<BoxError>>(err: E) -> Self {
        Self {
            context: None,
            source: err.into(),
            stack: StackTrace::capture(),
        }
    }

    /// Wrap `err` under a context message, capturing a stack
    pub fn wrap<E: Into<BoxError>>(context: impl Into<String>, err: E) -> Self {
        Self {
            context: Some(context.into()),
            source: err.into(),
            stack: StackTrace::capture(),
        }
    }

    /// Replace the captured stack
    #[must_use]
    pub fn with_stack(mut self, stack: StackTrace) -> Self {
        self.stack = stack;
        self
    }

    pub fn stack_trace(&self) -> &StackTrace {
        &self.stack
    }
}

impl fmt::Display for TracedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{}", context),
            None => write!(f, "{}", self.source),
        }
    }
}

impl Error for TracedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}

/// Sentinel used when a caller attaches an absent error
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("(nil)")]
pub struct NilError;

fn chain<'a>(err: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(err), |&e| e.source()).take(MAX_CAUSE_DEPTH)
}

/// The outermost error in `err`'s cause chain that already carries a stack
pub fn earliest_tracer<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a TracedError> {
    chain(err).find_map(|e| e.downcast_ref::<TracedError>())
}

/// The deepest cause reachable within [`MAX_CAUSE_DEPTH`] hops
pub fn root_cause<'a>(err: &'a (dyn Error + 'static)) -> &'a (dyn Error + 'static) {
    chain(err).last().unwrap_or(err)
}

/// Make sure `err` carries a stack trace, capturing one only when none of its
/// causes already has one.
pub fn enrich(err: BoxError) -> SharedError {
    let has_stack = {
        let view: &(dyn Error + 'static) = &*err;
        earliest_tracer(view).is_some()
    };
    if has_stack {
        Arc::from(err)
    } else {
        Arc::new(TracedError::capture(err))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    Keep,
    Drop,
}

/// A frame rule, matched against a frame's file path or function name
#[derive(Debug, Clone)]
pub struct FrameRule {
    pattern: Regex,
    action: FilterAction,
}

impl FrameRule {
    pub fn new(pattern: &str, action: FilterAction) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            action,
        })
    }

    fn matches(&self, frame: &Frame) -> bool {
        self.pattern.is_match(&frame.function)
            || frame
                .file
                .as_deref()
                .is_some_and(|f| self.pattern.is_match(f))
    }
}

/// Ordered frame rules pruning reported traces; the first matching rule
/// decides and unmatched frames are kept.
#[derive(Debug, Clone, Default)]
pub struct StackFilter {
    rules: Vec<FrameRule>,
}

impl StackFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rule(mut self, rule: FrameRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn keep(self, pattern: &str) -> Result<Self> {
        Ok(self.with_rule(FrameRule::new(pattern, FilterAction::Keep)?))
    }

    pub fn exclude(self, pattern: &str) -> Result<Self> {
        Ok(self.with_rule(FrameRule::new(pattern, FilterAction::Drop)?))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn allows(&self, frame: &Frame) -> bool {
        self.rules
            .iter()
            .find(|r| r.matches(frame))
            .map_or(true, |r| r.action == FilterAction::Keep)
    }

    pub fn apply(&self, trace: &StackTrace) -> StackTrace {
        StackTrace {
            frames: trace
                .frames
                .iter()
                .filter(|f| self.allows(f))
                .cloned()
                .collect(),
        }
    }
}
