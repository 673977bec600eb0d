//! Call-stack capture for dump metadata.

use tracing::{debug, trace, warn};

use crate::demangle::SymbolName;
use crate::provider::IntrospectionProvider;
use crate::types::{BacktraceFrame, FrameId};

/// Upper bound on captured frames, in case a provider reports a looping stack.
pub const MAX_FRAMES: usize = 4096;

/// Walk from `start` outward, recording function name and line per frame
///
/// Stops at the first frame without a resolvable function, or after
/// [`MAX_FRAMES`]. Names are demangled when possible. A `None` start (no
/// selected frame) yields an empty backtrace.
pub fn capture_backtrace<P: IntrospectionProvider + ?Sized>(provider: &P, start: Option<FrameId>) -> Vec<BacktraceFrame>
{
    let mut frames = Vec::new();
    let mut cursor = start;

    while let Some(frame) = cursor {
        let Some(function) = provider.frame_function(frame) else {
            break;
        };
        if frames.len() >= MAX_FRAMES {
            warn!(max = MAX_FRAMES, "Backtrace truncated");
            break;
        }

        let name = SymbolName::parse(function.name);
        if name.is_demangled() {
            trace!(raw = name.raw(), name = name.display_name(), "Demangled frame function");
        }
        frames.push(BacktraceFrame {
            function: name.display_name().to_string(),
            line: function.line,
        });
        cursor = provider.older_frame(frame);
    }

    debug!(frames = frames.len(), "Captured backtrace");
    frames
}
