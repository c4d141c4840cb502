use pretty_assertions::assert_eq;
use snex_ir::{ItemKind, TemplateParamKind};

use super::{parse_ok, render_type};

#[test]
fn function_with_params() {
    let (ast, interner) = parse_ok("float gain(const float& x, int n) { return x; }");
    assert_eq!(ast.items.len(), 1);
    let ItemKind::Function(f) = &ast.items[0].kind else {
        panic!("expected function");
    };
    assert_eq!(interner.lookup(f.name), "gain");
    assert_eq!(render_type(&ast, &f.ret, &interner), "float");
    let params: Vec<_> = f
        .params
        .iter()
        .map(|p| (interner.lookup(p.name).to_string(), render_type(&ast, &p.ty, &interner), p.is_const))
        .collect();
    assert_eq!(
        params,
        vec![
            ("x".to_string(), "float&".to_string(), true),
            ("n".to_string(), "int".to_string(), false),
        ]
    );
    assert!(f.body.is_some());
}

#[test]
fn void_parameter_list_is_empty() {
    let (ast, _) = parse_ok("int f(void) { return 1; }");
    let ItemKind::Function(f) = &ast.items[0].kind else {
        panic!("expected function");
    };
    assert!(f.params.is_empty());
}

#[test]
fn globals_and_constants() {
    let (ast, interner) = parse_ok("const int N = 4; static float gain = 0.5f; span<float, N> buffer;");
    let globals: Vec<_> = ast
        .items
        .iter()
        .map(|item| match &item.kind {
            ItemKind::Global(g) => (
                interner.lookup(g.name).to_string(),
                render_type(&ast, &g.ty, &interner),
                g.is_const,
                g.init.is_some(),
            ),
            other => panic!("expected global, got {other:?}"),
        })
        .collect();
    assert_eq!(
        globals,
        vec![
            ("N".to_string(), "int".to_string(), true, true),
            ("gain".to_string(), "float".to_string(), false, true),
            ("buffer".to_string(), "span<float, N>".to_string(), false, false),
        ]
    );
}

#[test]
fn struct_with_fields_and_methods() {
    let (ast, interner) = parse_ok(
        "struct Voice { float gain = 1.0f; int note; float process(float x) { return x * gain; } };",
    );
    let ItemKind::Struct(s) = &ast.items[0].kind else {
        panic!("expected struct");
    };
    assert_eq!(interner.lookup(s.name), "Voice");
    assert_eq!(s.fields.len(), 2);
    assert!(s.fields[0].init.is_some());
    assert_eq!(s.methods.len(), 1);
    assert_eq!(interner.lookup(s.methods[0].name), "process");
}

#[test]
fn namespaces_and_usings() {
    let (ast, interner) = parse_ok(
        "namespace dsp { namespace filters { int order() { return 2; } } }
         using namespace dsp::filters;
         using F = dsp::filters;
         using Buffer = span<float, 8>;",
    );
    assert_eq!(ast.items.len(), 4);
    let ItemKind::Namespace { name, items, .. } = &ast.items[0].kind else {
        panic!("expected namespace");
    };
    assert_eq!(interner.lookup(*name), "dsp");
    assert!(matches!(items[0].kind, ItemKind::Namespace { .. }));
    let ItemKind::UsingNamespace(path) = &ast.items[1].kind else {
        panic!("expected using namespace");
    };
    assert_eq!(path.segments.len(), 2);
    let ItemKind::Alias { target, .. } = &ast.items[3].kind else {
        panic!("expected alias");
    };
    assert_eq!(render_type(&ast, target, &interner), "span<float, 8>");
    assert_eq!(ast.function_count(), 1);
}

#[test]
fn templates() {
    let (ast, interner) = parse_ok(
        "template <int N> span<float, N> makeSpan(float v) { span<float, N> s; return s; }
         template <typename T, int Size> struct Buffer { span<T, Size> data; };
         Buffer<float, 4> b;
         Buffer<Buffer<int, 2>, 3> nested;
         Buffer<Buffer<int, 2>> shifted;",
    );
    let ItemKind::Template(t) = &ast.items[0].kind else {
        panic!("expected template");
    };
    assert_eq!(t.params.len(), 1);
    assert_eq!(t.params[0].kind, TemplateParamKind::Int);
    assert!(matches!(t.item.kind, ItemKind::Function(_)));

    let ItemKind::Template(t) = &ast.items[1].kind else {
        panic!("expected template");
    };
    assert_eq!(
        t.params.iter().map(|p| p.kind).collect::<Vec<_>>(),
        vec![TemplateParamKind::Type, TemplateParamKind::Int]
    );

    let ItemKind::Global(g) = &ast.items[3].kind else {
        panic!("expected global");
    };
    assert_eq!(render_type(&ast, &g.ty, &interner), "Buffer<Buffer<int, 2>, 3>");

    // `>>` closes two argument lists.
    let ItemKind::Global(g) = &ast.items[4].kind else {
        panic!("expected global");
    };
    assert_eq!(render_type(&ast, &g.ty, &interner), "Buffer<Buffer<int, 2>>");
}
