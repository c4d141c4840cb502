#![allow(clippy::unwrap_used)]

use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn name(raw: u32) -> Name {
    Name::from_raw(raw)
}

#[test]
fn test_preregistered_types() {
    let reg = TypeRegistry::new();
    assert_eq!(reg.len(), TypeId::FIRST_COMPOUND as usize);
    assert_eq!(reg.kind(TypeId::INT), &TypeKind::Primitive(Primitive::Int));
    assert_eq!(reg.kind(TypeId::DYNAMIC), &TypeKind::Dynamic);
    assert_eq!(reg.kind(TypeId::ERROR), &TypeKind::Error);
    assert_eq!(reg.layout(TypeId::DOUBLE), Layout::new(8, 8));
    assert_eq!(reg.layout(TypeId::BOOL), Layout::new(4, 4));
    assert_eq!(reg.layout(TypeId::VOID), Layout::EMPTY);
}

#[test]
fn test_span_is_canonical() {
    let mut reg = TypeRegistry::new();
    let a = reg.span_of(TypeId::FLOAT, 4);
    let b = reg.span_of(TypeId::FLOAT, 4);
    let c = reg.span_of(TypeId::FLOAT, 8);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(reg.layout(a), Layout::new(16, 4));
    assert_eq!(reg.layout(c).size - reg.layout(a).size, 4 * 4);
}

#[test]
fn test_function_signature_ignores_name() {
    let mut reg = TypeRegistry::new();
    let f = reg.function(vec![TypeId::INT, TypeId::FLOAT], TypeId::INT);
    let g = reg.function(vec![TypeId::INT, TypeId::FLOAT], TypeId::INT);
    let h = reg.function(vec![TypeId::FLOAT, TypeId::INT], TypeId::INT);
    assert_eq!(f, g);
    assert_ne!(f, h);
    assert_eq!(reg.display(f), "int(int, float)");
}

#[test]
fn test_ref_collapses() {
    let mut reg = TypeRegistry::new();
    let r = reg.ref_of(TypeId::INT);
    assert_eq!(reg.ref_of(r), r);
    assert_eq!(reg.strip_ref(r), TypeId::INT);
    assert_eq!(reg.strip_ref(TypeId::INT), TypeId::INT);
}

#[test]
fn test_struct_natural_alignment() {
    let mut reg = TypeRegistry::new();
    let id = reg.declare_struct("Voice");
    let layout = reg
        .define_struct(
            id,
            &[
                (name(1), TypeId::BOOL),
                (name(2), TypeId::DOUBLE),
                (name(3), TypeId::INT),
            ],
        )
        .unwrap();
    assert_eq!(layout, Layout::new(24, 8));
    let def = reg.struct_def(id).unwrap();
    let offsets: Vec<u32> = def.members.iter().map(|m| m.offset).collect();
    assert_eq!(offsets, vec![0, 8, 16]);
    assert_eq!(def.member(name(3)).map(|(i, _)| i), Some(2));
}

#[test]
fn test_empty_struct() {
    let mut reg = TypeRegistry::new();
    let id = reg.declare_struct("Empty");
    assert_eq!(reg.define_struct(id, &[]), Ok(Layout::EMPTY));
}

#[test]
fn test_self_reference_through_ref() {
    let mut reg = TypeRegistry::new();
    let node = reg.declare_struct("Node");
    let next = reg.ref_of(node);
    let layout = reg
        .define_struct(node, &[(name(1), TypeId::FLOAT), (name(2), next)])
        .unwrap();
    assert_eq!(layout, Layout::new(8, 4));
    assert_eq!(reg.display(next), "Node&");
}

#[test]
fn test_recursive_struct_by_value() {
    let mut reg = TypeRegistry::new();
    let node = reg.declare_struct("Node");
    assert!(matches!(
        reg.define_struct(node, &[(name(1), node)]),
        Err(RegistryError::RecursiveStruct { .. })
    ));
    let arr = reg.span_of(node, 2);
    assert!(matches!(
        reg.define_struct(node, &[(name(1), arr)]),
        Err(RegistryError::RecursiveStruct { .. })
    ));
}

#[test]
fn test_incomplete_member() {
    let mut reg = TypeRegistry::new();
    let outer = reg.declare_struct("Outer");
    let inner = reg.declare_struct("Inner");
    let err = reg.define_struct(outer, &[(name(1), inner)]).unwrap_err();
    assert_eq!(
        err,
        RegistryError::IncompleteMember {
            name: "Outer".into(),
            member: name(1)
        }
    );
    assert!(!reg.is_complete(inner));
}

#[test]
fn test_define_twice_and_not_a_struct() {
    let mut reg = TypeRegistry::new();
    let id = reg.declare_struct("A");
    reg.define_struct(id, &[(name(1), TypeId::INT)]).unwrap();
    assert!(matches!(
        reg.define_struct(id, &[]),
        Err(RegistryError::AlreadyDefined { .. })
    ));
    assert_eq!(
        reg.define_struct(TypeId::INT, &[]),
        Err(RegistryError::NotAStruct)
    );
}

#[test]
fn test_span_layout_follows_late_definition() {
    let mut reg = TypeRegistry::new();
    let voice = reg.declare_struct("Voice");
    let voices = reg.span_of(voice, 4);
    assert!(!reg.is_complete(voices));
    reg.define_struct(voice, &[(name(1), TypeId::DOUBLE), (name(2), TypeId::INT)])
        .unwrap();
    assert_eq!(reg.layout(voice), Layout::new(16, 8));
    assert_eq!(reg.layout(voices), Layout::new(64, 8));
    assert!(reg.is_complete(voices));
}

#[test]
fn test_register_struct_returns_existing() {
    let mut reg = TypeRegistry::new();
    let members = [(name(1), TypeId::FLOAT), (name(2), TypeId::FLOAT)];
    let a = reg.register_struct("Stereo", &members).unwrap();
    let b = reg.register_struct("Stereo", &members).unwrap();
    let c = reg.register_struct("Other", &members).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert!(!reg.structurally_equal(a, c));
}

#[test]
fn test_declared_structs_compare_structurally() {
    let mut reg = TypeRegistry::new();
    let a = reg.declare_struct("Node");
    let b = reg.declare_struct("Node");
    let ra = reg.ref_of(a);
    let rb = reg.ref_of(b);
    reg.define_struct(a, &[(name(1), ra)]).unwrap();
    reg.define_struct(b, &[(name(1), rb)]).unwrap();
    assert_ne!(a, b);
    assert!(reg.structurally_equal(a, b));
    assert!(reg.structurally_equal(ra, rb));
}

#[test]
fn test_display() {
    let mut reg = TypeRegistry::new();
    let span = reg.span_of(TypeId::FLOAT, 4);
    let view = reg.dyn_of(TypeId::DOUBLE);
    let r = reg.ref_of(TypeId::INT);
    assert_eq!(reg.display(span), "span<float, 4>");
    assert_eq!(reg.display(view), "dyn<double>");
    assert_eq!(reg.display(r), "int&");
    assert_eq!(reg.display(TypeId::ERROR), "<error>");
    assert_eq!(reg.display(TypeId::DYNAMIC), "dynamic");
}

#[test]
fn test_type_char() {
    let mut reg = TypeRegistry::new();
    let span = reg.span_of(TypeId::INT, 2);
    let s = reg.register_struct("S", &[]).unwrap();
    let f = reg.function(vec![], TypeId::VOID);
    let r = reg.ref_of(TypeId::INT);
    let chars: String = [
        TypeId::INT,
        TypeId::FLOAT,
        TypeId::DOUBLE,
        TypeId::BOOL,
        TypeId::VOID,
        span,
        s,
        r,
        f,
        TypeId::DYNAMIC,
    ]
    .iter()
    .map(|t| reg.type_char(*t))
    .collect();
    assert_eq!(chars, "IFDBVSCRf?");
}

#[test]
fn test_flags() {
    let mut reg = TypeRegistry::new();
    assert!(reg.flags(TypeId::FLOAT).contains(TypeFlags::IS_FLOATING));
    assert!(!reg.flags(TypeId::BOOL).contains(TypeFlags::IS_NUMERIC));
    let span = reg.span_of(TypeId::ERROR, 2);
    assert!(reg.flags(span).contains(TypeFlags::HAS_ERROR));
    assert!(reg.flags(span).is_aggregate());
    let view = reg.dyn_of(TypeId::INT);
    assert!(reg.flags(view).is_sequence());
    assert!(!reg.flags(view).is_aggregate());
}

#[derive(Clone, Debug)]
enum Shape {
    Prim(u8),
    Span(Box<Shape>, u8),
    Dyn(Box<Shape>),
    Ref(Box<Shape>),
    Struct(u8, Vec<Shape>),
    Func(Vec<Shape>, Box<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = (0u8..4).prop_map(Shape::Prim);
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            (inner.clone(), 1u8..4).prop_map(|(s, n)| Shape::Span(Box::new(s), n)),
            inner.clone().prop_map(|s| Shape::Dyn(Box::new(s))),
            inner.clone().prop_map(|s| Shape::Ref(Box::new(s))),
            (0u8..3, prop::collection::vec(inner.clone(), 0..3))
                .prop_map(|(n, m)| Shape::Struct(n, m)),
            (prop::collection::vec(inner.clone(), 0..3), inner)
                .prop_map(|(p, r)| Shape::Func(p, Box::new(r))),
        ]
    })
}

fn build(reg: &mut TypeRegistry, shape: &Shape) -> TypeId {
    match shape {
        Shape::Prim(p) => [TypeId::INT, TypeId::FLOAT, TypeId::DOUBLE, TypeId::BOOL][*p as usize],
        Shape::Span(elem, len) => {
            let elem = build(reg, elem);
            reg.span_of(elem, u32::from(*len))
        }
        Shape::Dyn(elem) => {
            let elem = build(reg, elem);
            reg.dyn_of(elem)
        }
        Shape::Ref(inner) => {
            let inner = build(reg, inner);
            reg.ref_of(inner)
        }
        Shape::Struct(n, members) => {
            let members: Vec<(Name, TypeId)> = members
                .iter()
                .enumerate()
                .map(|(i, m)| (name(i as u32 + 1), build(reg, m)))
                .collect();
            reg.register_struct(format!("S{n}"), &members).unwrap()
        }
        Shape::Func(params, ret) => {
            let params = params.iter().map(|p| build(reg, p)).collect();
            let ret = build(reg, ret);
            reg.function(params, ret)
        }
    }
}

proptest! {
    #[test]
    fn prop_structural_equality_laws(a in shape(), b in shape(), c in shape()) {
        let mut reg = TypeRegistry::new();
        let (a, b, c) = (build(&mut reg, &a), build(&mut reg, &b), build(&mut reg, &c));
        prop_assert!(reg.structurally_equal(a, a));
        prop_assert_eq!(reg.structurally_equal(a, b), reg.structurally_equal(b, a));
        if reg.structurally_equal(a, b) && reg.structurally_equal(b, c) {
            prop_assert!(reg.structurally_equal(a, c));
        }
    }

    #[test]
    fn prop_repeated_requests_share_id(s in shape(), len in 1u32..16) {
        let mut reg = TypeRegistry::new();
        let first = build(&mut reg, &s);
        let second = build(&mut reg, &s);
        prop_assert_eq!(first, second);
        prop_assert_eq!(reg.span_of(first, len), reg.span_of(second, len));
    }

    #[test]
    fn prop_layout_is_aligned(s in shape()) {
        let mut reg = TypeRegistry::new();
        let id = build(&mut reg, &s);
        let layout = reg.layout(id);
        prop_assert!(layout.align.is_power_of_two());
        prop_assert_eq!(layout.size % layout.align, 0);
    }
}
