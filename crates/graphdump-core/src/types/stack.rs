//! Call-stack frame types.

use serde::Serialize;

/// Provider-assigned identifier of a stack frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

/// What a provider knows about the function executing in a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFunction
{
    /// Linkage or print name; may be mangled.
    pub name: String,
    /// Source line associated with the frame.
    pub line: u32,
}

/// One entry of a dump's backtrace, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BacktraceFrame
{
    pub function: String,
    pub line: u32,
}
