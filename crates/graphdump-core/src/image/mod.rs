//! # Heap Image Provider
//!
//! An [`IntrospectionProvider`] over a serialized snapshot of a paused
//! process: a type table, memory cells keyed by address, named symbols and a
//! call stack (see [`format`] for the JSON layout).
//!
//! ## Memory model
//!
//! Every object cell is a JSON value stored at a base address. Members of an
//! aggregate live inside the cell of the outermost object and are located by
//! a field-name path; their address is the base plus the declared offsets.
//! Pointers are stored as `"0x..."` strings (or integers) naming the base
//! address of another cell. A missing or `null` cell is unreadable memory.
//!
//! ## Error mapping
//!
//! | Situation                           | Error                  |
//! |-------------------------------------|------------------------|
//! | unknown symbol or member, bad syntax| `Evaluation`           |
//! | member marked `synthetic`           | `UnsupportedAccessor`  |
//! | missing cell, null or dangling ptr  | `MemoryRead`           |
//! | unknown type, malformed pointer     | `Internal`             |

mod expr;
mod format;

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use smallvec::SmallVec;
use tracing::debug;

use self::expr::AccessPath;
use self::format::{FieldEntry, ImageData, ImageFile, TypeEntry};
use crate::error::{DumpError, ProviderError, ProviderResult, Result};
use crate::provider::IntrospectionProvider;
use crate::types::{Address, FieldDescriptor, FrameFunction, FrameId, ObjectHandle, TypeDescriptor, TypeKind};

/// Typedef chains and nested renderings deeper than this are cut off.
const MAX_TYPE_DEPTH: usize = 32;

/// Stride used for struct members without an explicit offset.
const DEFAULT_FIELD_STRIDE: u64 = 8;

/// Where a value lives inside a [`HeapImage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLocator
{
    base: Address,
    address: Address,
    path: SmallVec<[String; 4]>,
}

impl ImageLocator
{
    fn at(address: Address) -> Self
    {
        Self {
            base: address,
            address,
            path: SmallVec::new(),
        }
    }

    /// Base address of the cell holding the value.
    pub fn base(&self) -> Address
    {
        self.base
    }

    /// Address of the value itself.
    pub fn address(&self) -> Address
    {
        self.address
    }

    /// Member names leading from the cell to the value.
    pub fn path(&self) -> &[String]
    {
        &self.path
    }
}

/// A loaded heap image.
#[derive(Debug)]
pub struct HeapImage
{
    data: ImageData,
}

impl HeapImage
{
    /// Parse an image from JSON text.
    ///
    /// ## Errors
    ///
    /// Returns `DumpError::Image` for malformed JSON, unknown keys, bad
    /// addresses, or type entries with neither a kind nor a typedef.
    pub fn from_json_str(text: &str) -> Result<Self>
    {
        let file: ImageFile = serde_json::from_str(text).map_err(|err| DumpError::Image(err.to_string()))?;
        Self::from_file(file)
    }

    /// Build an image from an already parsed JSON document.
    ///
    /// ## Errors
    ///
    /// See [`from_json_str`](Self::from_json_str).
    pub fn from_value(value: serde_json::Value) -> Result<Self>
    {
        let file: ImageFile = serde_json::from_value(value).map_err(|err| DumpError::Image(err.to_string()))?;
        Self::from_file(file)
    }

    /// Read and parse an image file.
    ///
    /// ## Errors
    ///
    /// Returns `DumpError::Io` if the file cannot be read, otherwise see
    /// [`from_json_str`](Self::from_json_str).
    pub fn load(path: &Path) -> Result<Self>
    {
        debug!(path = %path.display(), "Loading heap image");
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text).map_err(|err| match err {
            DumpError::Image(reason) => DumpError::Image(format!("{}: {reason}", path.display())),
            other => other,
        })
    }

    fn from_file(file: ImageFile) -> Result<Self>
    {
        let data = file.validate()?;
        debug!(
            types = data.types.len(),
            symbols = data.symbols.len(),
            objects = data.objects.len(),
            frames = data.frames.len(),
            "Heap image ready"
        );
        Ok(Self { data })
    }

    /// Descriptor of a type by name, typedefs resolved.
    ///
    /// ## Errors
    ///
    /// Returns `ProviderError::Internal` for unknown types and for typedef
    /// chains that do not terminate.
    pub fn describe(&self, type_name: &str) -> ProviderResult<TypeDescriptor>
    {
        self.describe_at(type_name, 0)
    }

    fn describe_at(&self, type_name: &str, depth: usize) -> ProviderResult<TypeDescriptor>
    {
        let entry = self.lookup(type_name, depth)?;
        let kind = entry.kind.unwrap_or(TypeKind::Unknown);
        let mut descriptor = TypeDescriptor::aggregate(
            type_name,
            kind,
            entry.fields.iter().map(|field| FieldDescriptor::new(&field.name, &field.type_name)),
        );
        if let Some(target) = &entry.target {
            descriptor.target = Some(Box::new(self.describe_at(target, depth + 1)?));
        }
        Ok(descriptor)
    }

    fn lookup(&self, type_name: &str, depth: usize) -> ProviderResult<Cow<'_, TypeEntry>>
    {
        if depth > MAX_TYPE_DEPTH {
            return Err(ProviderError::Internal(format!("type `{type_name}` nests too deeply")));
        }
        if let Some(entry) = self.data.types.get(type_name) {
            return match &entry.typedef {
                Some(alias) => self.lookup(alias, depth + 1),
                None => Ok(Cow::Borrowed(entry)),
            };
        }
        if let Some(pointee) = type_name.strip_suffix('*') {
            return Ok(Cow::Owned(TypeEntry {
                kind: Some(TypeKind::Pointer),
                typedef: None,
                target: Some(pointee.trim_end().to_string()),
                fields: Vec::new(),
            }));
        }
        Err(ProviderError::Internal(format!("unknown type `{type_name}`")))
    }

    fn handle(locator: ImageLocator, type_name: impl Into<String>) -> ObjectHandle<ImageLocator>
    {
        // Bare address: type names may carry hex literals of their own (`Buf<0x20>`).
        let identity = locator.address.to_string();
        ObjectHandle::new(locator, type_name, Some(identity))
    }

    fn read(&self, locator: &ImageLocator) -> ProviderResult<&serde_json::Value>
    {
        let unreadable = || ProviderError::unreadable(locator.address);
        let mut cell = self.data.objects.get(&locator.base).ok_or_else(unreadable)?;
        for name in &locator.path {
            cell = cell.get(name.as_str()).ok_or_else(unreadable)?;
        }
        if cell.is_null() {
            return Err(unreadable());
        }
        Ok(cell)
    }

    fn member(&self, object: &ObjectHandle<ImageLocator>, name: &str) -> ProviderResult<ObjectHandle<ImageLocator>>
    {
        let mut object = object.clone();
        let mut entry = self.lookup(object.type_name(), 0)?;
        if entry.kind.is_some_and(TypeKind::is_pointer_like) {
            object = self.follow(&object)?;
            entry = self.lookup(object.type_name(), 0)?;
        }

        let kind = entry.kind.unwrap_or(TypeKind::Unknown);
        if !kind.is_aggregate() {
            return Err(ProviderError::Evaluation(
                "Attempt to extract a component of a value that is not a structure.".to_string(),
            ));
        }

        let (index, field) = entry
            .fields
            .iter()
            .enumerate()
            .find(|(_, field)| field.name == name)
            .ok_or_else(|| ProviderError::Evaluation(format!("There is no member named {name}.")))?;
        if field.synthetic {
            return Err(ProviderError::UnsupportedAccessor(format!(
                "member `{name}` of `{}` is only reachable through a scripted accessor",
                object.type_name()
            )));
        }

        let locator = object.locator();
        let address = locator
            .address
            .checked_add(field_offset(kind, index, field))
            .ok_or_else(|| ProviderError::Internal(format!("member `{name}` lies beyond the address space")))?;
        let mut path = locator.path.clone();
        path.push(name.to_string());

        Ok(Self::handle(
            ImageLocator {
                base: locator.base,
                address,
                path,
            },
            field.type_name.clone(),
        ))
    }

    fn follow(&self, handle: &ObjectHandle<ImageLocator>) -> ProviderResult<ObjectHandle<ImageLocator>>
    {
        let descriptor = self.describe(handle.type_name())?;
        if !descriptor.kind.is_pointer_like() {
            return Err(ProviderError::Evaluation("Attempt to take contents of a non-pointer value.".to_string()));
        }
        let target = descriptor
            .target
            .ok_or_else(|| ProviderError::Internal(format!("pointer type `{}` has no target", handle.type_name())))?;

        let cell = self.read(handle.locator())?;
        let address = pointer_value(cell).ok_or_else(|| {
            ProviderError::Internal(format!("malformed pointer value at {}", handle.locator().address))
        })?;
        if address.is_null() || !self.data.objects.contains_key(&address) {
            return Err(ProviderError::unreadable(address));
        }

        Ok(Self::handle(ImageLocator::at(address), target.name))
    }

    fn format_value(
        &self,
        descriptor: &TypeDescriptor,
        cell: &serde_json::Value,
        address: Address,
        top_level: bool,
        depth: usize,
    ) -> String
    {
        if depth > MAX_TYPE_DEPTH {
            return "...".to_string();
        }
        if descriptor.kind.is_aggregate() {
            return self.format_aggregate(&descriptor.name, cell, address, depth);
        }
        if descriptor.kind.is_pointer_like() {
            return self.format_pointer(descriptor, cell, top_level);
        }

        match (descriptor.kind, cell) {
            (TypeKind::Array, serde_json::Value::Array(items)) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| match &descriptor.target {
                        Some(element) => self.format_value(element, item, address, false, depth + 1),
                        None => cell_text(item),
                    })
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            (TypeKind::String, serde_json::Value::String(text)) => quoted(text),
            _ => cell_text(cell),
        }
    }

    fn format_aggregate(&self, type_name: &str, cell: &serde_json::Value, address: Address, depth: usize) -> String
    {
        let entry = match self.lookup(type_name, 0) {
            Ok(entry) => entry,
            Err(err) => return format!("<error: {err}>"),
        };
        let kind = entry.kind.unwrap_or(TypeKind::Unknown);

        let parts: Vec<String> = entry
            .fields
            .iter()
            .enumerate()
            .filter(|(_, field)| !field.synthetic)
            .map(|(index, field)| {
                let field_address = address.checked_add(field_offset(kind, index, field)).unwrap_or(address);
                let text = match cell.get(field.name.as_str()).filter(|value| !value.is_null()) {
                    None => format!("<error: {}>", ProviderError::unreadable(field_address)),
                    Some(value) => match self.describe(&field.type_name) {
                        Ok(field_type) => self.format_value(&field_type, value, field_address, false, depth + 1),
                        Err(err) => format!("<error: {err}>"),
                    },
                };
                format!("{} = {text}", field.name)
            })
            .collect();

        if parts.is_empty() {
            "{<No data fields>}".to_string()
        } else {
            format!("{{{}}}", parts.join(", "))
        }
    }

    fn format_pointer(&self, descriptor: &TypeDescriptor, cell: &serde_json::Value, top_level: bool) -> String
    {
        let Some(address) = pointer_value(cell) else {
            return cell_text(cell);
        };

        let points_to_text = descriptor.target.as_ref().is_some_and(|target| target.kind == TypeKind::Char);
        if points_to_text && !address.is_null() {
            return match self.data.objects.get(&address) {
                Some(serde_json::Value::String(text)) => format!("{address} {}", quoted(text)),
                _ => format!("{address} <error: {}>", ProviderError::unreadable(address)),
            };
        }

        if top_level {
            format!("({}) {address}", descriptor.name)
        } else {
            address.to_string()
        }
    }
}

impl IntrospectionProvider for HeapImage
{
    type Locator = ImageLocator;

    fn evaluate(&self, expr: &str) -> ProviderResult<ObjectHandle<ImageLocator>>
    {
        let path = AccessPath::parse(expr)?;
        let (address, type_name) = self
            .data
            .symbols
            .get(&path.root)
            .ok_or_else(|| ProviderError::Evaluation(format!("No symbol \"{}\" in current context.", path.root)))?;

        let mut current = Self::handle(ImageLocator::at(*address), type_name.clone());
        for (_, name) in &path.members {
            current = self.member(&current, name)?;
        }
        for _ in 0..path.derefs {
            current = self.follow(&current)?;
        }
        Ok(current)
    }

    fn type_of(&self, handle: &ObjectHandle<ImageLocator>) -> ProviderResult<TypeDescriptor>
    {
        self.describe(handle.type_name())
    }

    fn dereference(&self, handle: &ObjectHandle<ImageLocator>) -> ProviderResult<ObjectHandle<ImageLocator>>
    {
        self.follow(handle)
    }

    fn render(&self, handle: &ObjectHandle<ImageLocator>) -> ProviderResult<String>
    {
        let descriptor = self.type_of(handle)?;
        let cell = self.read(handle.locator())?;
        Ok(self.format_value(&descriptor, cell, handle.locator().address, true, 0))
    }

    fn selected_frame(&self) -> Option<FrameId>
    {
        (!self.data.frames.is_empty()).then_some(FrameId(0))
    }

    fn frame_function(&self, frame: FrameId) -> Option<FrameFunction>
    {
        let entry = self.data.frames.get(usize::try_from(frame.0).ok()?)?;
        entry.function.as_ref().map(|name| FrameFunction {
            name: name.clone(),
            line: entry.line,
        })
    }

    fn older_frame(&self, frame: FrameId) -> Option<FrameId>
    {
        let older = frame.0.checked_add(1)?;
        let index = usize::try_from(older).ok()?;
        (index < self.data.frames.len()).then_some(FrameId(older))
    }
}

fn field_offset(kind: TypeKind, index: usize, field: &FieldEntry) -> u64
{
    field.offset.unwrap_or(match kind {
        TypeKind::Union => 0,
        _ => index as u64 * DEFAULT_FIELD_STRIDE,
    })
}

fn pointer_value(cell: &serde_json::Value) -> Option<Address>
{
    match cell {
        serde_json::Value::String(text) => text.parse().ok(),
        serde_json::Value::Number(number) => number.as_u64().map(Address::new),
        _ => None,
    }
}

fn cell_text(cell: &serde_json::Value) -> String
{
    match cell {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn quoted(text: &str) -> String
{
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
}

#[cfg(test)]
mod tests
{
    use serde_json::json;

    use super::*;

    fn image() -> HeapImage
    {
        HeapImage::from_value(json!({
            "types": {
                "int": { "kind": "int" },
                "char": { "kind": "char" },
                "char *": { "kind": "pointer", "target": "char" },
                "Pair": { "kind": "struct", "fields": [
                    { "name": "a", "type": "int" },
                    { "name": "b", "type": "int" }
                ] },
                "pair_t": { "typedef": "Pair" },
                "Holder": { "kind": "struct", "fields": [
                    { "name": "pair", "type": "pair_t" },
                    { "name": "label", "type": "char *" },
                    { "name": "next", "type": "Holder *" },
                    { "name": "size", "type": "int", "synthetic": true }
                ] }
            },
            "symbols": {
                "holder": { "address": "0x1000", "type": "Holder" },
                "numbers": { "address": "0x3000", "type": "int" }
            },
            "objects": {
                "0x1000": { "pair": { "a": 1, "b": null }, "label": "0x2000", "next": "0x0" },
                "0x2000": "hello"
            },
            "frames": [
                { "function": "inner", "line": 10 },
                { "function": "main", "line": 20 },
                { "line": 0 }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_member_addresses_and_identity()
    {
        let image = image();
        let label = image.evaluate("holder.label").unwrap();
        assert_eq!(label.type_name(), "char *");
        assert_eq!(label.locator().address(), Address::new(0x1008));
        assert_eq!(label.locator().path(), ["label".to_string()]);
        assert_eq!(label.address(), Some(Address::new(0x1008)));
    }

    #[test]
    fn test_identity_ignores_hex_in_type_names()
    {
        let image = HeapImage::from_value(json!({
            "types": {
                "int": { "kind": "int" },
                "Buf<0x20>": { "kind": "struct", "fields": [ { "name": "len", "type": "int" } ] }
            },
            "symbols": {
                "first": { "address": "0x2000", "type": "Buf<0x20>" },
                "second": { "address": "0x3000", "type": "Buf<0x20>" }
            },
            "objects": { "0x2000": { "len": 1 }, "0x3000": { "len": 2 } }
        }))
        .unwrap();

        let first = image.evaluate("first").unwrap();
        let second = image.evaluate("second.len").unwrap();
        assert_eq!(first.address(), Some(Address::new(0x2000)));
        assert_eq!(second.address(), Some(Address::new(0x3000)));
    }

    #[test]
    fn test_typedef_resolution_keeps_declared_name()
    {
        let image = image();
        let pair = image.evaluate("holder.pair").unwrap();
        let descriptor = image.type_of(&pair).unwrap();
        assert_eq!(descriptor.name, "pair_t");
        assert_eq!(descriptor.kind, TypeKind::Struct);
        assert_eq!(descriptor.fields.len(), 2);
    }

    #[test]
    fn test_render_formats()
    {
        let image = image();
        let label = image.evaluate("holder.label").unwrap();
        assert_eq!(image.render(&label).unwrap(), "0x2000 \"hello\"");

        let next = image.evaluate("holder.next").unwrap();
        assert_eq!(image.render(&next).unwrap(), "(Holder *) 0x0");

        let pair = image.evaluate("holder.pair").unwrap();
        assert_eq!(
            image.render(&pair).unwrap(),
            "{a = 1, b = <error: Cannot access memory at address 0x1008>}"
        );
    }

    #[test]
    fn test_error_mapping()
    {
        let image = image();
        assert!(matches!(image.evaluate("nobody"), Err(ProviderError::Evaluation(_))));
        assert!(matches!(image.evaluate("holder.missing"), Err(ProviderError::Evaluation(_))));
        assert!(matches!(image.evaluate("holder.size"), Err(ProviderError::UnsupportedAccessor(_))));
        assert!(matches!(image.evaluate("holder.next->pair"), Err(ProviderError::MemoryRead(_))));

        let b = image.evaluate("holder.pair.b").unwrap();
        assert_eq!(image.render(&b), Err(ProviderError::unreadable("0x1008")));

        let numbers = image.evaluate("numbers").unwrap();
        assert!(matches!(image.render(&numbers), Err(ProviderError::MemoryRead(_))));
        assert!(matches!(image.dereference(&numbers), Err(ProviderError::Evaluation(_))));
    }

    #[test]
    fn test_unknown_type_is_internal()
    {
        let image = HeapImage::from_value(json!({
            "symbols": { "x": { "address": "0x10", "type": "Mystery" } },
            "objects": { "0x10": 1 }
        }))
        .unwrap();
        let x = image.evaluate("x").unwrap();
        assert!(matches!(image.type_of(&x), Err(ProviderError::Internal(_))));
    }

    #[test]
    fn test_frames()
    {
        let image = image();
        let top = image.selected_frame().unwrap();
        assert_eq!(image.frame_function(top).unwrap().name, "inner");

        let caller = image.older_frame(top).unwrap();
        assert_eq!(image.frame_function(caller).unwrap().line, 20);

        let last = image.older_frame(caller).unwrap();
        assert_eq!(image.frame_function(last), None);
        assert_eq!(image.older_frame(last), None);
    }

    #[test]
    fn test_invalid_images()
    {
        assert!(matches!(HeapImage::from_json_str("{"), Err(DumpError::Image(_))));
        assert!(matches!(
            HeapImage::from_value(json!({ "types": { "T": {} } })),
            Err(DumpError::Image(_))
        ));
        assert!(matches!(
            HeapImage::from_value(json!({ "objects": { "nowhere": 1 } })),
            Err(DumpError::Image(_))
        ));
    }
}
