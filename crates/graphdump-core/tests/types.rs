//! Tests for provider-agnostic types

use graphdump_core::types::{Address, FieldDescriptor, FieldMap, FieldRecord, ObjectHandle, TypeDescriptor, TypeKind, Value};

#[test]
fn test_address_from_u64()
{
    let addr = Address::from(0x601040);
    assert_eq!(addr.value(), 0x601040);
    assert_eq!(addr.to_string(), "0x601040");
}

#[test]
fn test_address_to_u64()
{
    let value: u64 = Address::new(0x2000).into();
    assert_eq!(value, 0x2000);
}

#[test]
fn test_address_null()
{
    assert!(Address::ZERO.is_null());
    assert!(!Address::new(1).is_null());
}

#[test]
fn test_handle_address_from_identity()
{
    let handle = ObjectHandle::new(7_u32, "Node", Some("(Node *) 0x601040 <head>".to_string()));
    assert_eq!(*handle.locator(), 7);
    assert_eq!(handle.type_name(), "Node");
    assert_eq!(handle.address(), Some(Address::new(0x601040)));

    let temporary = ObjectHandle::new(8_u32, "int", None);
    assert_eq!(temporary.address(), None);
}

#[test]
fn test_type_kind_deserialize()
{
    let kinds: Vec<TypeKind> = serde_json::from_str(r#"["int", "decfloat", "ref", "rvalue_ref", "memberptr", "union"]"#).unwrap();
    assert_eq!(
        kinds,
        vec![
            TypeKind::Int,
            TypeKind::DecFloat,
            TypeKind::Reference,
            TypeKind::RvalueReference,
            TypeKind::MemberPointer,
            TypeKind::Union
        ]
    );
}

#[test]
fn test_type_kind_display()
{
    assert_eq!(TypeKind::Pointer.to_string(), "PTR");
    assert_eq!(TypeKind::Struct.to_string(), "STRUCT");
}

#[test]
fn test_descriptor_preserves_field_order()
{
    let descriptor = TypeDescriptor::aggregate(
        "Row",
        TypeKind::Struct,
        ["z", "a", "m"].map(|name| FieldDescriptor::new(name, "int")),
    );
    let names: Vec<&str> = descriptor.fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(names, vec!["z", "a", "m"]);
}

#[test]
fn test_value_depth_and_count()
{
    let mut leaf = FieldMap::new();
    leaf.insert("v".to_string(), FieldRecord::new("r.a.v", "int", Value::Scalar("1".to_string())));
    let mut top = FieldMap::new();
    top.insert("a".to_string(), FieldRecord::new("r.a", "A", Value::Fields(leaf)));
    top.insert("b".to_string(), FieldRecord::new("r.b", "B *", Value::BackReference("r".to_string())));

    let value = Value::Fields(top);
    assert_eq!(value.depth(), 2);
    let count: usize = value.fields().unwrap().values().map(FieldRecord::count).sum();
    assert_eq!(count, 3);
    assert_eq!(Value::Fields(FieldMap::new()).depth(), 0);
}
