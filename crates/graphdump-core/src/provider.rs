//! # Introspection Provider Trait
//!
//! The interface the dumper consumes to look inside a paused process.
//!
//! This trait defines what the walker needs from a debugger backend,
//! regardless of which debugger is underneath:
//!
//! - **Heap image**: [`HeapImage`](crate::image::HeapImage) serves a serialized
//!   snapshot, used for offline dumps and tests
//! - **Live debuggers**: an adapter translating the debugger's value and type
//!   objects into [`ObjectHandle`] and [`TypeDescriptor`]
//!
//! ## Contract
//!
//! - Every method is read-only with respect to the inspected process.
//! - Calls block until the backend answers; the process does not advance in
//!   between, so there is no ordering concern.
//! - Failures are reported per value through [`ProviderError`]; the walker
//!   decides how far each one propagates.

use crate::error::ProviderResult;
use crate::types::{FrameFunction, FrameId, ObjectHandle, TypeDescriptor};

/// Read-only, typed access to a paused process
///
/// ## Example
///
/// ```rust
/// use graphdump_core::image::HeapImage;
/// use graphdump_core::provider::IntrospectionProvider;
/// use graphdump_core::types::TypeKind;
///
/// let image = HeapImage::from_json_str(
///     r#"{
///         "types": { "int": { "kind": "int" } },
///         "symbols": { "counter": { "address": "0x1000", "type": "int" } },
///         "objects": { "0x1000": 42 }
///     }"#,
/// )?;
///
/// let handle = image.evaluate("counter")?;
/// assert_eq!(image.type_of(&handle)?.kind, TypeKind::Int);
/// assert_eq!(image.render(&handle)?, "42");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait IntrospectionProvider
{
    /// Provider-specific locator stored inside each [`ObjectHandle`].
    type Locator: Clone;

    /// Evaluate an access expression (`name`, `a.b`, `a->b`, `*p`)
    ///
    /// ## Errors
    ///
    /// - `Evaluation`: unknown symbol or member, malformed expression
    /// - `UnsupportedAccessor`: the member is only reachable through a
    ///   scripted accessor the backend cannot run
    /// - `MemoryRead`: an intermediate pointer could not be followed
    fn evaluate(&self, expr: &str) -> ProviderResult<ObjectHandle<Self::Locator>>;

    /// Describe the type of a value, typedefs resolved
    ///
    /// ## Errors
    ///
    /// - `Internal`: the backend has no usable description of the type
    fn type_of(&self, handle: &ObjectHandle<Self::Locator>) -> ProviderResult<TypeDescriptor>;

    /// Follow a pointer-like value to its target
    ///
    /// ## Errors
    ///
    /// - `MemoryRead`: the pointer itself or its target is unreadable (null included)
    /// - `Evaluation`: the value is not pointer-like
    fn dereference(&self, handle: &ObjectHandle<Self::Locator>) -> ProviderResult<ObjectHandle<Self::Locator>>;

    /// Render a value the way the debugger would print it
    ///
    /// Renderings may embed an error token (`<error: ...>`) for parts that
    /// could not be read instead of failing outright.
    ///
    /// ## Errors
    ///
    /// - `MemoryRead`: the value itself is unreadable
    fn render(&self, handle: &ObjectHandle<Self::Locator>) -> ProviderResult<String>;

    /// Frame the process is currently stopped in, if any.
    fn selected_frame(&self) -> Option<FrameId>;

    /// Function executing in `frame`; `None` when the frame has no resolvable function.
    fn frame_function(&self, frame: FrameId) -> Option<FrameFunction>;

    /// Caller of `frame`; `None` at the outermost frame.
    fn older_frame(&self, frame: FrameId) -> Option<FrameId>;
}
