//! # Graph Walker
//!
//! Recursive, cycle-safe expansion of an object graph into [`FieldRecord`]s.
//!
//! For every declared field of an object, in declaration order, the walker:
//!
//! 1. builds the field's access expression (`parent.field` or `parent->field`)
//! 2. evaluates it through the provider
//! 3. emits the ignored sentinel for ignore-listed declared types
//! 4. emits a back-reference if the field's identity was already serialized
//! 5. otherwise records the identity and classifies the value: scalars and
//!    non-aggregate pointers are rendered, pointers to aggregates are
//!    dereferenced (and the target identity checked and recorded too), and
//!    aggregates are expanded recursively
//!
//! ## Failure isolation
//!
//! | Provider error        | Effect                                                 |
//! |-----------------------|--------------------------------------------------------|
//! | `MemoryRead`          | this field's value is `null`                           |
//! | `Evaluation`          | this field's value is `null`                           |
//! | `UnsupportedAccessor` | the enclosing object becomes its flat text rendering   |
//! | `Internal`            | diagnostic entry, this field is left out               |
//!
//! None of these ever abort sibling fields or ancestor objects. A pointer
//! whose target cannot be read is treated exactly like an unreadable pointer,
//! and a render failure is classified the same way as an evaluation failure.
//!
//! Identities recorded below an object that ends up flattened, and the
//! identities of a node cut off by the depth limit, are rolled back out of
//! the visited table: only nodes present in the output can be
//! back-referenced.
//!
//! ## Depth
//!
//! Records directly under the root are at depth 1. With a configured
//! `max_depth`, an aggregate sitting at that depth is replaced by a
//! truncated marker instead of being expanded.

use tracing::{debug, trace};

use crate::classify::{Classification, OpaqueReason, TypeClassifier};
use crate::config::DumpConfig;
use crate::diagnostics::{DiagnosticEntry, DiagnosticLog};
use crate::error::ProviderError;
use crate::provider::IntrospectionProvider;
use crate::types::{Address, FieldDescriptor, FieldMap, FieldRecord, ObjectHandle, TypeDescriptor, Value};
use crate::visited::VisitedTable;

/// How an object's fields are reached from its expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access
{
    /// The expression denotes the object itself: `expr.field`.
    Value,
    /// The expression denotes a pointer to the object: `expr->field`.
    Pointer,
}

impl Access
{
    /// Access expression of `field` inside the object denoted by `parent`.
    pub fn join(self, parent: &str, field: &str) -> String
    {
        match self {
            Access::Value => format!("{parent}.{field}"),
            Access::Pointer => format!("{parent}->{field}"),
        }
    }
}

/// Result of expanding one object's field list.
#[derive(Debug, Clone, PartialEq)]
pub enum Expansion
{
    /// One record per declared field that could be dumped.
    Fields(FieldMap),
    /// A synthetic accessor was hit; the whole object as the provider prints it.
    Flattened(Value),
}

impl Expansion
{
    /// The expansion as a record value.
    pub fn into_value(self) -> Value
    {
        match self {
            Expansion::Fields(fields) => Value::Fields(fields),
            Expansion::Flattened(value) => value,
        }
    }
}

/// Counters for one dump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats
{
    /// Field records emitted.
    pub fields: usize,
    /// Aggregates whose field lists were walked.
    pub expanded: usize,
    pub back_references: usize,
    pub nulls: usize,
    pub ignored: usize,
    /// Aggregates cut off by the depth limit.
    pub truncated: usize,
    /// Objects replaced by their flat rendering.
    pub flattened: usize,
    /// Entries written to the diagnostic log.
    pub diagnostics: usize,
}

/// Everything one in-flight dump mutates
///
/// Owned by a single dump; nothing here is shared between dumps.
#[derive(Debug)]
pub struct WalkContext
{
    /// Identities already serialized, with their first-seen paths.
    pub visited: VisitedTable,
    pub classifier: TypeClassifier,
    /// Side channel for fields left out of the dump.
    pub diagnostics: DiagnosticLog,
    pub stats: WalkStats,
    max_depth: Option<usize>,
    error_token: String,
}

impl WalkContext
{
    pub fn new(classifier: TypeClassifier, diagnostics: DiagnosticLog) -> Self
    {
        Self {
            visited: VisitedTable::new(),
            classifier,
            diagnostics,
            stats: WalkStats::default(),
            max_depth: None,
            error_token: "error:".to_string(),
        }
    }

    /// Context with classifier, depth limit and error token from `config`.
    pub fn from_config(config: &DumpConfig, diagnostics: DiagnosticLog) -> Self
    {
        let mut ctx = Self::new(TypeClassifier::from_config(config), diagnostics);
        ctx.max_depth = config.max_depth;
        ctx.error_token.clone_from(&config.error_token);
        ctx
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self
    {
        self.max_depth = max_depth;
        self
    }

    fn is_error_text(&self, text: &str) -> bool
    {
        text.contains(self.error_token.as_str())
    }
}

/// A failed field, with whatever was learned before the failure.
#[derive(Debug)]
struct FieldFailure
{
    error: ProviderError,
    type_name: Option<String>,
    classification: Option<Classification>,
}

impl FieldFailure
{
    fn new(error: ProviderError) -> Self
    {
        Self {
            error,
            type_name: None,
            classification: None,
        }
    }

    fn classified(classification: Classification) -> impl FnOnce(ProviderError) -> Self
    {
        move |error| Self {
            error,
            type_name: None,
            classification: Some(classification),
        }
    }
}

/// The recursive engine; borrows a provider and a per-dump context.
pub struct GraphWalker<'a, P: IntrospectionProvider + ?Sized>
{
    provider: &'a P,
    ctx: &'a mut WalkContext,
}

impl<'a, P: IntrospectionProvider + ?Sized> GraphWalker<'a, P>
{
    pub fn new(provider: &'a P, ctx: &'a mut WalkContext) -> Self
    {
        Self { provider, ctx }
    }

    /// Expand the root of a dump
    ///
    /// `root` must already be evaluated and its identity recorded under
    /// `expr`. A pointer to an aggregate is dereferenced once (recording the
    /// target identity under `expr` as well) so the root is handled like any
    /// nested pointer field; anything else is classified as is.
    ///
    /// ## Errors
    ///
    /// Returns the provider error if the root's type cannot be described or a
    /// root pointer cannot be followed. The caller treats these as fatal.
    pub fn walk_root(&mut self, expr: &str, root: &ObjectHandle<P::Locator>) -> Result<Value, ProviderError>
    {
        let descriptor = self.provider.type_of(root)?;
        if self.ctx.classifier.is_ignored(root.type_name()) {
            return Ok(Value::Ignored);
        }

        if descriptor.points_to_aggregate() {
            debug!(expr, "Dereferencing root pointer");
            let target = self.provider.dereference(root)?;
            self.ctx.visited.record(&target, expr);
            let target_descriptor = self.provider.type_of(&target)?;
            return root_value(self.value_of(expr, Access::Pointer, &target, &target_descriptor, 0));
        }

        root_value(self.resolve(expr, root, &descriptor, 0))
    }

    /// Expand the fields of the object denoted by `object_expr`
    ///
    /// `depth` is the depth of the records being produced.
    pub fn expand(&mut self, object_expr: &str, access: Access, fields: &[FieldDescriptor], depth: usize) -> Expansion
    {
        let mut records = FieldMap::with_capacity(fields.len());
        let mark = self.ctx.visited.mark();
        let stats = self.ctx.stats;

        for field in fields {
            let expr = access.join(object_expr, &field.name);
            match self.walk_field(&expr, depth) {
                Ok(record) => {
                    self.count(&record.value);
                    records.insert(field.name.clone(), record);
                }
                Err(failure) if failure.error.is_read_failure() => {
                    debug!(expr = %expr, error = %failure.error, "Field unreadable");
                    let type_name = failure.type_name.unwrap_or_else(|| field.type_name.clone());
                    let record = FieldRecord::new(expr, type_name, Value::Null);
                    self.count(&record.value);
                    records.insert(field.name.clone(), record);
                }
                Err(FieldFailure {
                    error: ProviderError::UnsupportedAccessor(detail),
                    ..
                }) => {
                    debug!(expr = %expr, detail = %detail, "Unsupported accessor, flattening enclosing object");
                    // Records already built for this object are dropped; diagnostics are not.
                    self.ctx.visited.rollback(mark);
                    self.ctx.stats = WalkStats {
                        flattened: stats.flattened + 1,
                        diagnostics: self.ctx.stats.diagnostics,
                        ..stats
                    };
                    return Expansion::Flattened(self.flatten(object_expr, access));
                }
                Err(failure) => {
                    self.ctx.stats.diagnostics += 1;
                    self.ctx.diagnostics.record(DiagnosticEntry {
                        field_expr: expr,
                        classification: failure.classification,
                        error: failure.error,
                    });
                }
            }
        }

        Expansion::Fields(records)
    }

    fn walk_field(&mut self, expr: &str, depth: usize) -> Result<FieldRecord, FieldFailure>
    {
        let handle = self.provider.evaluate(expr).map_err(FieldFailure::new)?;
        let type_name = handle.type_name().to_string();

        if self.ctx.classifier.is_ignored(&type_name) {
            trace!(expr, type_name = %type_name, "Ignored type");
            return Ok(FieldRecord::new(expr, type_name, Value::Ignored));
        }

        if let Some(path) = self.ctx.visited.path_of(&handle) {
            trace!(expr, first_seen = path, "Already visited");
            let value = Value::BackReference(path.to_string());
            return Ok(FieldRecord::new(expr, type_name, value));
        }
        let mark = self.ctx.visited.mark();
        self.ctx.visited.record(&handle, expr);

        let value = self
            .provider
            .type_of(&handle)
            .map_err(FieldFailure::new)
            .and_then(|descriptor| self.resolve(expr, &handle, &descriptor, depth));

        match value {
            Ok(value) => {
                if matches!(value, Value::Truncated(_)) {
                    self.ctx.visited.rollback(mark);
                }
                Ok(FieldRecord::new(expr, type_name, value))
            }
            Err(mut failure) => {
                self.ctx.visited.rollback(mark);
                failure.type_name = Some(type_name);
                Err(failure)
            }
        }
    }

    /// Value of an evaluated, not yet visited handle.
    fn resolve(
        &mut self,
        expr: &str,
        handle: &ObjectHandle<P::Locator>,
        descriptor: &TypeDescriptor,
        depth: usize,
    ) -> Result<Value, FieldFailure>
    {
        let classification = self.ctx.classifier.classify(descriptor);
        if classification != Classification::Pointer || !descriptor.points_to_aggregate() {
            return self.value_of(expr, Access::Value, handle, descriptor, depth);
        }

        let target = self
            .provider
            .dereference(handle)
            .map_err(FieldFailure::classified(classification))?;
        if self.ctx.classifier.is_ignored(target.type_name()) {
            trace!(expr, type_name = target.type_name(), "Pointer target of ignored type");
            return Ok(Value::Ignored);
        }
        if let Some(path) = self.ctx.visited.path_of(&target) {
            trace!(expr, first_seen = path, "Pointer target already visited");
            return Ok(Value::BackReference(path.to_string()));
        }
        self.ctx.visited.record(&target, expr);

        let target_descriptor = self
            .provider
            .type_of(&target)
            .map_err(FieldFailure::classified(classification))?;
        self.value_of(expr, Access::Pointer, &target, &target_descriptor, depth)
    }

    /// Value of a handle that will not be dereferenced.
    fn value_of(
        &mut self,
        expr: &str,
        access: Access,
        handle: &ObjectHandle<P::Locator>,
        descriptor: &TypeDescriptor,
        depth: usize,
    ) -> Result<Value, FieldFailure>
    {
        let classification = self.ctx.classifier.classify(descriptor);
        let provider = self.provider;
        let render = || provider.render(handle).map_err(FieldFailure::classified(classification));

        match classification {
            Classification::ExpandableAggregate => {
                if self.ctx.max_depth.is_some_and(|max| depth >= max) {
                    trace!(expr, depth, "Depth limit reached");
                    return Ok(Value::Truncated(depth));
                }
                self.ctx.stats.expanded += 1;
                Ok(self.expand(expr, access, &descriptor.fields, depth + 1).into_value())
            }
            Classification::Opaque(OpaqueReason::Empty) => Ok(Value::Null),
            Classification::Opaque(OpaqueReason::Ignored) => Ok(Value::Ignored),
            Classification::Pointer => Ok(self.pointer_text(&render()?)),
            Classification::PrintableScalar
            | Classification::Opaque(OpaqueReason::Internal | OpaqueReason::Unsupported) => Ok(self.scalar_text(render()?)),
        }
    }

    /// Flat rendering of the object denoted by `object_expr`.
    fn flatten(&self, object_expr: &str, access: Access) -> Value
    {
        let rendered = self.provider.evaluate(object_expr).and_then(|handle| match access {
            Access::Value => self.provider.render(&handle),
            Access::Pointer => self.provider.dereference(&handle).and_then(|target| self.provider.render(&target)),
        });
        match rendered {
            Ok(text) if !self.ctx.is_error_text(&text) => Value::Opaque(text),
            Ok(_) => Value::Null,
            Err(err) => {
                debug!(expr = object_expr, error = %err, "Flat rendering failed");
                Value::Null
            }
        }
    }

    fn scalar_text(&self, text: String) -> Value
    {
        if self.ctx.is_error_text(&text) {
            Value::Null
        } else {
            Value::Scalar(text)
        }
    }

    /// Pointer rendering with addresses removed.
    fn pointer_text(&self, text: &str) -> Value
    {
        let stripped = Address::strip_all(text);
        let cleaned = stripped.trim().trim_matches('"');
        self.scalar_text(cleaned.to_string())
    }

    fn count(&mut self, value: &Value)
    {
        let stats = &mut self.ctx.stats;
        stats.fields += 1;
        match value {
            Value::Null => stats.nulls += 1,
            Value::BackReference(_) => stats.back_references += 1,
            Value::Ignored => stats.ignored += 1,
            Value::Truncated(_) => stats.truncated += 1,
            Value::Scalar(_) | Value::Opaque(_) | Value::Fields(_) => {}
        }
    }
}

/// Root failures that only null the root; everything else is fatal.
fn root_value(result: Result<Value, FieldFailure>) -> Result<Value, ProviderError>
{
    match result {
        Ok(value) => Ok(value),
        Err(failure) if failure.error.is_read_failure() => Ok(Value::Null),
        Err(failure) => Err(failure.error),
    }
}
