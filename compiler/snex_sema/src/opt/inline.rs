//! Call-site inlining.
//!
//! # Eligibility
//!
//! A function may be inlined when it
//! - is not recursive: its call-graph SCC has one member and no self edge
//! - is not the global initializer
//! - has a straight-line body (declarations, assignments and expression
//!   statements, optionally closed by one `return`)
//! - has at most `max_statements` statements, nested inlined bodies
//!   included
//!
//! Functions are never address-taken: the language has no function
//! values, so every call is direct.
//!
//! # Order
//!
//! SCCs come out of Tarjan's algorithm callees first, so a callee's own
//! call sites are already inlined when its eligibility is decided and its
//! body is copied.

use rustc_hash::FxHashSet;
use snex_ir::Span;
use snex_types::{FuncId, LocalId, TypeId};

use crate::ir::visitor::{
    count_statements, walk_expr, walk_expr_mut, walk_place_mut, walk_stmt_mut, MutVisitor, Visitor,
};
use crate::ir::{
    FunctionKind, InlinedCall, IrExpr, IrExprKind, IrFunction, IrLocal, IrModule, IrPlace, IrStmt,
    IrStmtKind, PlaceKind,
};

/// Inline eligible callees into every function of `module` and set
/// [`IrFunction::inline_eligible`]. Returns the number of inlined call
/// sites.
pub fn run(module: &mut IrModule, max_statements: usize) -> usize {
    let graph = CallGraph::build(module);
    let mut inlined = 0;
    for scc in graph.sccs() {
        let recursive = scc.len() > 1 || scc.iter().any(|&f| graph.calls_itself(f));
        for &f in &scc {
            inlined += inline_calls_in(module, f);
            if let Some(func) = module.functions.get_mut(f) {
                func.inline_eligible = !recursive && is_eligible(func, max_statements);
                tracing::trace!(
                    function = %func.name,
                    eligible = func.inline_eligible,
                    "inline eligibility"
                );
            }
        }
    }
    inlined
}

fn is_eligible(func: &IrFunction, max_statements: usize) -> bool {
    func.kind != FunctionKind::Init
        && is_straight_line(&func.body)
        && count_statements(&func.body) <= max_statements
}

fn is_straight_line(body: &[IrStmt]) -> bool {
    let rest = match body.split_last() {
        Some((last, rest)) if matches!(last.kind, IrStmtKind::Return(_)) => rest,
        _ => body,
    };
    rest.iter().all(|stmt| {
        matches!(
            stmt.kind,
            IrStmtKind::Local { .. } | IrStmtKind::Assign { .. } | IrStmtKind::Expr(_)
        )
    })
}

/// Replace eligible call sites in function `f`.
fn inline_calls_in(module: &mut IrModule, f: usize) -> usize {
    let Some(func) = module.functions.get_mut(f) else {
        return 0;
    };
    let mut body = std::mem::take(&mut func.body);
    let mut locals = std::mem::take(&mut func.locals);
    let mut inliner = Inliner {
        functions: &module.functions,
        caller: f,
        locals: &mut locals,
        inlined: 0,
    };
    inliner.visit_block(&mut body);
    let inlined = inliner.inlined;
    if let Some(func) = module.functions.get_mut(f) {
        func.body = body;
        func.locals = locals;
    }
    inlined
}

struct Inliner<'a> {
    functions: &'a [IrFunction],
    caller: usize,
    locals: &'a mut Vec<IrLocal>,
    inlined: usize,
}

impl Inliner<'_> {
    fn expand(&mut self, callee_id: FuncId, args: Vec<IrExpr>, ty: TypeId, span: Span) -> IrExpr {
        let functions = self.functions;
        let callee = &functions[callee_id.index()];
        let short_name = callee.name.rsplit("::").next().unwrap_or(&callee.name);
        let map: Vec<LocalId> = callee
            .locals
            .iter()
            .map(|local| {
                let id = LocalId::from_len(self.locals.len());
                self.locals.push(IrLocal {
                    name: format!("{short_name}.{}", local.name),
                    ty: local.ty,
                    is_const: local.is_const,
                    is_param: false,
                });
                id
            })
            .collect();

        let bindings = callee
            .params
            .iter()
            .map(|p| map[p.index()])
            .zip(args)
            .collect();
        let mut body = callee.body.clone();
        let mut value = match body.last().map(|s| &s.kind) {
            Some(IrStmtKind::Return(_)) => match body.pop().map(|s| s.kind) {
                Some(IrStmtKind::Return(value)) => value,
                _ => None,
            },
            _ => None,
        };

        let mut remap = Remap { map: &map };
        remap.visit_block(&mut body);
        if let Some(value) = &mut value {
            remap.visit_expr(value);
        }
        self.inlined += 1;
        IrExpr::new(
            IrExprKind::Inlined(Box::new(InlinedCall {
                callee: callee_id,
                bindings,
                body,
                value,
            })),
            ty,
            span,
        )
    }

    fn can_inline(&self, callee: FuncId) -> bool {
        callee.index() != self.caller
            && self
                .functions
                .get(callee.index())
                .is_some_and(|f| f.inline_eligible)
    }
}

impl MutVisitor for Inliner<'_> {
    fn visit_expr(&mut self, expr: &mut IrExpr) {
        walk_expr_mut(self, expr);
        let callee = match &expr.kind {
            IrExprKind::Call { callee, .. } if self.can_inline(*callee) => *callee,
            _ => return,
        };
        let kind = std::mem::replace(&mut expr.kind, IrExprKind::Zero);
        let IrExprKind::Call { args, .. } = kind else {
            return;
        };
        *expr = self.expand(callee, args, expr.ty, expr.span);
    }
}

/// Renumbers callee locals into the caller's frame.
struct Remap<'m> {
    map: &'m [LocalId],
}

impl Remap<'_> {
    fn local(&self, id: LocalId) -> LocalId {
        self.map.get(id.index()).copied().unwrap_or(id)
    }
}

impl MutVisitor for Remap<'_> {
    fn visit_stmt(&mut self, stmt: &mut IrStmt) {
        if let IrStmtKind::Local { local, .. } = &mut stmt.kind {
            *local = self.local(*local);
        }
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr(&mut self, expr: &mut IrExpr) {
        match &mut expr.kind {
            IrExprKind::Materialize { local, .. } => *local = self.local(*local),
            IrExprKind::Inlined(call) => {
                for (local, _) in &mut call.bindings {
                    *local = self.local(*local);
                }
            }
            _ => {}
        }
        walk_expr_mut(self, expr);
    }

    fn visit_place(&mut self, place: &mut IrPlace) {
        if let PlaceKind::Local(local) = &mut place.kind {
            *local = self.local(*local);
        }
        walk_place_mut(self, place);
    }
}

/// Direct call edges between IR functions.
struct CallGraph {
    edges: Vec<FxHashSet<usize>>,
}

impl CallGraph {
    fn build(module: &IrModule) -> Self {
        struct Calls(FxHashSet<usize>);
        impl<'ir> Visitor<'ir> for Calls {
            fn visit_expr(&mut self, expr: &'ir IrExpr) {
                if let IrExprKind::Call { callee, .. } = expr.kind {
                    self.0.insert(callee.index());
                }
                walk_expr(self, expr);
            }
        }
        let edges = module
            .functions
            .iter()
            .map(|func| {
                let mut calls = Calls(FxHashSet::default());
                calls.visit_block(&func.body);
                calls.0
            })
            .collect();
        CallGraph { edges }
    }

    fn calls_itself(&self, f: usize) -> bool {
        self.edges.get(f).is_some_and(|e| e.contains(&f))
    }

    /// Strongly connected components, callees before callers.
    fn sccs(&self) -> Vec<Vec<usize>> {
        let n = self.edges.len();
        let mut tarjan = Tarjan {
            graph: self,
            next_index: 0,
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            sccs: Vec::new(),
        };
        for v in 0..n {
            if tarjan.index[v].is_none() {
                tarjan.strongconnect(v);
            }
        }
        tarjan.sccs
    }
}

struct Tarjan<'g> {
    graph: &'g CallGraph,
    next_index: usize,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    sccs: Vec<Vec<usize>>,
}

impl Tarjan<'_> {
    fn strongconnect(&mut self, v: usize) {
        snex_stack::ensure_sufficient_stack(|| self.strongconnect_inner(v));
    }

    fn strongconnect_inner(&mut self, v: usize) {
        self.index[v] = Some(self.next_index);
        self.lowlink[v] = self.next_index;
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack[v] = true;

        let graph = self.graph;
        for &w in graph.edges.get(v).into_iter().flatten() {
            if w >= self.index.len() {
                continue;
            }
            match self.index[w] {
                None => {
                    self.strongconnect(w);
                    self.lowlink[v] = self.lowlink[v].min(self.lowlink[w]);
                }
                Some(index_w) if self.on_stack[w] => {
                    self.lowlink[v] = self.lowlink[v].min(index_w);
                }
                Some(_) => {}
            }
        }

        if Some(self.lowlink[v]) == self.index[v] {
            let mut scc = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack[w] = false;
                scc.push(w);
                if w == v {
                    break;
                }
            }
            self.sccs.push(scc);
        }
    }
}
