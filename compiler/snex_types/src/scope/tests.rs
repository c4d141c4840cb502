#![allow(clippy::unwrap_used)]

use super::*;
use pretty_assertions::assert_eq;
use snex_ir::StringInterner;

fn var(ty: TypeId, slot: u32) -> Symbol {
    Symbol::Variable {
        ty,
        storage: Storage::Local(LocalId::new(slot)),
        is_const: false,
    }
}

fn ty_of(tree: &ScopeTree, id: SymbolId) -> TypeId {
    match &tree.symbol(id).unwrap().symbol {
        Symbol::Variable { ty, .. } | Symbol::Type(ty) => *ty,
        other => panic!("unexpected symbol {other:?}"),
    }
}

#[test]
fn test_shadowing_resolves_innermost() {
    let mut names = StringInterner::new();
    let x = names.intern("x");
    let mut tree = ScopeTree::new();
    let func = tree.enter(ScopeId::GLOBAL, ScopeKind::Function, None);
    tree.declare(func, x, var(TypeId::INT, 0), Span::DUMMY)
        .unwrap();
    let block = tree.enter(func, ScopeKind::Block, None);
    tree.declare(block, x, var(TypeId::FLOAT, 1), Span::DUMMY)
        .unwrap();

    let inner = tree.resolve(x, block).unwrap();
    let outer = tree.resolve(x, func).unwrap();
    assert_eq!(ty_of(&tree, inner), TypeId::FLOAT);
    assert_eq!(ty_of(&tree, outer), TypeId::INT);
}

#[test]
fn test_duplicate_in_same_scope() {
    let mut names = StringInterner::new();
    let x = names.intern("x");
    let mut tree = ScopeTree::new();
    let first = tree
        .declare(ScopeId::GLOBAL, x, var(TypeId::INT, 0), Span::DUMMY)
        .unwrap();
    let err = tree
        .declare(ScopeId::GLOBAL, x, var(TypeId::INT, 1), Span::DUMMY)
        .unwrap_err();
    assert_eq!(
        err,
        ScopeError::DuplicateName {
            name: x,
            existing: first
        }
    );
    let child = tree.enter(ScopeId::GLOBAL, ScopeKind::Block, None);
    assert!(tree
        .declare(child, x, var(TypeId::INT, 2), Span::DUMMY)
        .is_ok());
}

#[test]
fn test_not_found() {
    let mut names = StringInterner::new();
    let y = names.intern("undefinedVar");
    let tree = ScopeTree::new();
    assert_eq!(
        tree.resolve(y, ScopeId::GLOBAL),
        Err(ScopeError::NotFound { name: y })
    );
}

#[test]
fn test_overload_set_grows() {
    let mut names = StringInterner::new();
    let f = names.intern("f");
    let mut tree = ScopeTree::new();
    let a = tree
        .declare_function(ScopeId::GLOBAL, f, Callee::Func(FuncId::new(0)), Span::DUMMY)
        .unwrap();
    let b = tree
        .declare_function(ScopeId::GLOBAL, f, Callee::Func(FuncId::new(1)), Span::DUMMY)
        .unwrap();
    assert_eq!(a, b);
    match &tree.symbol(a).unwrap().symbol {
        Symbol::Functions(set) => assert_eq!(set.len(), 2),
        other => panic!("unexpected symbol {other:?}"),
    }

    let g = names.intern("g");
    tree.declare(ScopeId::GLOBAL, g, var(TypeId::INT, 0), Span::DUMMY)
        .unwrap();
    assert!(matches!(
        tree.declare_function(ScopeId::GLOBAL, g, Callee::Func(FuncId::new(2)), Span::DUMMY),
        Err(ScopeError::DuplicateName { .. })
    ));
}

#[test]
fn test_namespace_reopen_reuses_scope() {
    let mut names = StringInterner::new();
    let dsp = names.intern("dsp");
    let mut tree = ScopeTree::new();
    let first = tree.namespace(ScopeId::GLOBAL, dsp, Span::DUMMY).unwrap();
    let second = tree.namespace(ScopeId::GLOBAL, dsp, Span::DUMMY).unwrap();
    assert_eq!(first, second);
    assert_eq!(tree.kind(first), Some(ScopeKind::Namespace));
    assert_eq!(tree.qualifiers(first), vec![dsp]);
}

#[test]
fn test_qualified_path() {
    let mut names = StringInterner::new();
    let (dsp, filters, gain) = (
        names.intern("dsp"),
        names.intern("filters"),
        names.intern("gain"),
    );
    let mut tree = ScopeTree::new();
    let outer = tree.namespace(ScopeId::GLOBAL, dsp, Span::DUMMY).unwrap();
    let inner = tree.namespace(outer, filters, Span::DUMMY).unwrap();
    let sym = tree
        .declare(
            inner,
            gain,
            Symbol::Constant {
                ty: TypeId::DOUBLE,
                value: ConstValue::double(0.5),
            },
            Span::DUMMY,
        )
        .unwrap();
    assert_eq!(
        tree.resolve_path(&[dsp, filters, gain], ScopeId::GLOBAL),
        Ok(sym)
    );
    assert_eq!(
        tree.resolve_path(&[dsp, gain], ScopeId::GLOBAL),
        Err(ScopeError::NotFound { name: gain })
    );
    assert_eq!(
        tree.resolve_path(&[dsp, filters, gain, gain], ScopeId::GLOBAL),
        Err(ScopeError::NotAScope { name: gain })
    );
}

#[test]
fn test_class_scope_path() {
    let mut names = StringInterner::new();
    let (voice, process) = (names.intern("Voice"), names.intern("process"));
    let mut tree = ScopeTree::new();
    let ty = TypeId::new(TypeId::FIRST_COMPOUND);
    tree.declare(ScopeId::GLOBAL, voice, Symbol::Type(ty), Span::DUMMY)
        .unwrap();
    let class = tree.enter(ScopeId::GLOBAL, ScopeKind::Class, Some(voice));
    tree.set_class_scope(ty, class);
    let method = tree
        .declare_function(class, process, Callee::Func(FuncId::new(0)), Span::DUMMY)
        .unwrap();
    assert_eq!(tree.resolve_path(&[voice, process], ScopeId::GLOBAL), Ok(method));
    assert_eq!(tree.lookup_type(voice, class), Ok(ty));
}

#[test]
fn test_imports_and_ambiguity() {
    let mut names = StringInterner::new();
    let (a, b, x, only_a) = (
        names.intern("a"),
        names.intern("b"),
        names.intern("x"),
        names.intern("onlyA"),
    );
    let mut tree = ScopeTree::new();
    let ns_a = tree.namespace(ScopeId::GLOBAL, a, Span::DUMMY).unwrap();
    let ns_b = tree.namespace(ScopeId::GLOBAL, b, Span::DUMMY).unwrap();
    tree.declare(ns_a, x, var(TypeId::INT, 0), Span::DUMMY)
        .unwrap();
    let in_a = tree
        .declare(ns_a, only_a, var(TypeId::INT, 1), Span::DUMMY)
        .unwrap();
    tree.declare(ns_b, x, var(TypeId::FLOAT, 2), Span::DUMMY)
        .unwrap();

    let func = tree.enter(ScopeId::GLOBAL, ScopeKind::Function, None);
    tree.add_import(func, ns_a);
    tree.add_import(func, ns_b);
    assert_eq!(tree.resolve(only_a, func), Ok(in_a));
    assert!(matches!(
        tree.resolve(x, func),
        Err(ScopeError::Ambiguous { candidates, .. }) if candidates.len() == 2
    ));

    // A local binding wins over imports at the same level.
    let local = tree
        .declare(func, x, var(TypeId::DOUBLE, 3), Span::DUMMY)
        .unwrap();
    assert_eq!(tree.resolve(x, func), Ok(local));
}

#[test]
fn test_inner_scope_binding_beats_outer_import() {
    let mut names = StringInterner::new();
    let (math, pi) = (names.intern("Math"), names.intern("pi"));
    let mut tree = ScopeTree::new();
    let ns = tree.namespace(ScopeId::GLOBAL, math, Span::DUMMY).unwrap();
    tree.declare(ns, pi, var(TypeId::DOUBLE, 0), Span::DUMMY)
        .unwrap();
    tree.add_import(ScopeId::GLOBAL, ns);
    let func = tree.enter(ScopeId::GLOBAL, ScopeKind::Function, None);
    let block = tree.enter(func, ScopeKind::Block, None);
    let shadow = tree
        .declare(func, pi, var(TypeId::FLOAT, 1), Span::DUMMY)
        .unwrap();
    assert_eq!(tree.resolve(pi, block), Ok(shadow));
}

#[test]
fn test_alias_to_namespace() {
    let mut names = StringInterner::new();
    let (dsp, alias, gain) = (names.intern("dsp"), names.intern("D"), names.intern("gain"));
    let mut tree = ScopeTree::new();
    let ns = tree.namespace(ScopeId::GLOBAL, dsp, Span::DUMMY).unwrap();
    let sym = tree
        .declare(ns, gain, var(TypeId::FLOAT, 0), Span::DUMMY)
        .unwrap();
    tree.declare(ScopeId::GLOBAL, alias, Symbol::Namespace(ns), Span::DUMMY)
        .unwrap();
    assert_eq!(tree.resolve_path(&[alias, gain], ScopeId::GLOBAL), Ok(sym));
    // Reopening through the alias name is not a namespace reopen.
    assert!(matches!(
        tree.namespace(ScopeId::GLOBAL, alias, Span::DUMMY),
        Err(ScopeError::DuplicateName { .. })
    ));
}

#[test]
fn test_enclosing() {
    let mut tree = ScopeTree::new();
    let func = tree.enter(ScopeId::GLOBAL, ScopeKind::Function, None);
    let block = tree.enter(func, ScopeKind::Block, None);
    assert_eq!(tree.enclosing(block, ScopeKind::Function), Some(func));
    assert_eq!(tree.enclosing(block, ScopeKind::Class), None);
    assert_eq!(tree.enclosing(block, ScopeKind::Global), Some(ScopeId::GLOBAL));
}
