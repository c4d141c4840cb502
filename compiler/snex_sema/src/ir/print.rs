//! Human-readable IR dump, used by `--dump-ir` and by tests comparing IR
//! shapes.

use std::fmt::{self, Write as _};

use snex_ir::StringInterner;
use snex_types::{ExternTable, TypeRegistry};

use super::{
    FunctionKind, IrExpr, IrExprKind, IrFunction, IrModule, IrPlace, IrStmt, IrStmtKind,
    PlaceKind,
};

/// Display adapter returned by [`IrModule::display`].
pub struct IrDisplay<'a> {
    module: &'a IrModule,
    types: &'a TypeRegistry,
    names: Option<&'a StringInterner>,
    externs: Option<&'a ExternTable>,
}

impl IrModule {
    pub fn display<'a>(&'a self, types: &'a TypeRegistry) -> IrDisplay<'a> {
        IrDisplay {
            module: self,
            types,
            names: None,
            externs: None,
        }
    }
}

impl<'a> IrDisplay<'a> {
    /// Print field names instead of field indices.
    pub fn with_names(mut self, names: &'a StringInterner) -> Self {
        self.names = Some(names);
        self
    }

    /// Print host function names instead of extern ids.
    pub fn with_externs(mut self, externs: &'a ExternTable) -> Self {
        self.externs = Some(externs);
        self
    }

    /// Render a single function.
    pub fn function(&self, func: &IrFunction) -> String {
        let mut printer = Printer::new(self, func);
        printer.function();
        printer.out
    }
}

impl fmt::Display for IrDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for global in &self.module.globals {
            write!(
                f,
                "{}global {}: {}",
                if global.is_const { "const " } else { "" },
                global.name,
                self.types.display(global.ty)
            )?;
            if let Some(value) = global.constant {
                write!(f, " = {value}")?;
            }
            writeln!(f)?;
        }
        for func in &self.module.functions {
            f.write_str(&self.function(func))?;
        }
        Ok(())
    }
}

struct Printer<'a, 'd> {
    display: &'d IrDisplay<'a>,
    func: &'d IrFunction,
    out: String,
    indent: usize,
}

impl<'a, 'd> Printer<'a, 'd> {
    fn new(display: &'d IrDisplay<'a>, func: &'d IrFunction) -> Self {
        Printer {
            display,
            func,
            out: String::new(),
            indent: 0,
        }
    }

    fn function(&mut self) {
        let func = self.func;
        let types = self.display.types;
        let prefix = match func.kind {
            FunctionKind::Free => "fn",
            FunctionKind::Method { .. } => "method",
            FunctionKind::Init => "init",
        };
        let _ = write!(self.out, "{prefix} {}(", func.name);
        for (i, param) in func.params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            if let Some(local) = func.local(*param) {
                let _ = write!(self.out, "{}: {}", local.name, types.display(local.ty));
            }
        }
        let _ = write!(self.out, ") -> {}", types.display(func.ret));
        if func.inline_eligible {
            self.out.push_str(" #inline");
        }
        self.out.push_str(" {\n");
        self.indent = 1;
        self.block(&func.body);
        self.out.push_str("}\n");
    }

    fn line_start(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn block(&mut self, stmts: &[IrStmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn nested(&mut self, stmts: &[IrStmt]) {
        self.out.push_str("{\n");
        self.indent += 1;
        self.block(stmts);
        self.indent -= 1;
        self.line_start();
        self.out.push('}');
    }

    fn stmt(&mut self, stmt: &IrStmt) {
        self.line_start();
        match &stmt.kind {
            IrStmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.out.push_str("if (");
                self.expr(cond);
                self.out.push_str(") ");
                self.nested(then_body);
                if !else_body.is_empty() {
                    self.out.push_str(" else ");
                    self.nested(else_body);
                }
                self.out.push('\n');
            }
            IrStmtKind::While { cond, body } => {
                self.out.push_str("while (");
                self.expr(cond);
                self.out.push_str(") ");
                self.nested(body);
                self.out.push('\n');
            }
            IrStmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.out.push_str("for (");
                self.inline_stmts(init);
                self.out.push_str("; ");
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                self.out.push_str("; ");
                self.inline_stmts(update);
                self.out.push_str(") ");
                self.nested(body);
                self.out.push('\n');
            }
            IrStmtKind::Block(stmts) => {
                self.nested(stmts);
                self.out.push('\n');
            }
            _ => {
                self.simple_stmt(stmt);
                self.out.push_str(";\n");
            }
        }
    }

    /// Statement without trailing `;`, for `for` headers and inlined bodies.
    fn simple_stmt(&mut self, stmt: &IrStmt) {
        match &stmt.kind {
            IrStmtKind::Expr(e) => self.expr(e),
            IrStmtKind::Local { local, init } => {
                let (name, ty) = self
                    .func_local(*local)
                    .unwrap_or_else(|| (format!("${}", local.index()), String::new()));
                let _ = write!(self.out, "let {name}: {ty} = ");
                self.expr(init);
            }
            IrStmtKind::Assign { place, op, value } => {
                self.place(place);
                match op {
                    Some(op) => {
                        let _ = write!(self.out, " {}= ", op.as_symbol());
                    }
                    None => self.out.push_str(" = "),
                }
                self.expr(value);
            }
            IrStmtKind::Return(value) => {
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.expr(value);
                }
            }
            IrStmtKind::Break => self.out.push_str("break"),
            IrStmtKind::Continue => self.out.push_str("continue"),
            IrStmtKind::If { .. }
            | IrStmtKind::While { .. }
            | IrStmtKind::For { .. }
            | IrStmtKind::Block(_) => {
                let mut nested = Printer::new(self.display, self.func);
                nested.stmt(stmt);
                self.out.push_str(nested.out.trim_end());
            }
        }
    }

    fn inline_stmts(&mut self, stmts: &[IrStmt]) {
        for (i, stmt) in stmts.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.simple_stmt(stmt);
        }
    }

    fn func_local(&self, id: snex_types::LocalId) -> Option<(String, String)> {
        self.func
            .local(id)
            .map(|l| (l.name.clone(), self.display.types.display(l.ty)))
    }

    fn local_name(&self, id: snex_types::LocalId) -> String {
        self.func
            .local(id)
            .map_or_else(|| format!("${}", id.index()), |l| l.name.clone())
    }

    fn place(&mut self, place: &IrPlace) {
        match &place.kind {
            PlaceKind::Local(id) => {
                let name = self.local_name(*id);
                self.out.push_str(&name);
            }
            PlaceKind::Global(id) => {
                let name = self
                    .display
                    .module
                    .global(*id)
                    .map_or_else(|| format!("@{}", id.index()), |g| g.name.clone());
                self.out.push_str(&name);
            }
            PlaceKind::Deref(reference) => {
                self.out.push('*');
                self.expr(reference);
            }
            PlaceKind::Field { base, index, .. } => {
                self.place(base);
                self.out.push('.');
                let field = self.field_name(base.ty, *index);
                self.out.push_str(&field);
            }
            PlaceKind::Index {
                base,
                index,
                checked,
            } => {
                self.place(base);
                self.out.push('[');
                self.expr(index);
                if !checked {
                    self.out.push_str(" unchecked");
                }
                self.out.push(']');
            }
        }
    }

    fn field_name(&self, owner: snex_types::TypeId, index: u32) -> String {
        let types = self.display.types;
        let member = types
            .struct_def(types.strip_ref(owner))
            .and_then(|def| def.members.get(index as usize));
        match (member, self.display.names) {
            (Some(member), Some(names)) => names.lookup(member.name).to_owned(),
            _ => index.to_string(),
        }
    }

    fn expr(&mut self, expr: &IrExpr) {
        match &expr.kind {
            IrExprKind::Const(value) => {
                let _ = write!(self.out, "{value}");
            }
            IrExprKind::Zero => {
                if expr.is_error() {
                    self.out.push_str("<error>");
                } else {
                    self.out.push_str("zero");
                }
            }
            IrExprKind::Load(place) => self.place(place),
            IrExprKind::AddressOf(place) => {
                self.out.push('&');
                self.place(place);
            }
            IrExprKind::Materialize { local, value } => {
                let name = self.local_name(*local);
                let _ = write!(self.out, "&({name} = ");
                self.expr(value);
                self.out.push(')');
            }
            IrExprKind::Len(place) => {
                self.out.push_str("len(");
                self.place(place);
                self.out.push(')');
            }
            IrExprKind::Unary { op, operand } => {
                let _ = write!(self.out, "({}", op.as_symbol());
                self.expr(operand);
                self.out.push(')');
            }
            IrExprKind::Binary { op, lhs, rhs } => {
                self.out.push('(');
                self.expr(lhs);
                let _ = write!(self.out, " {} ", op.as_symbol());
                self.expr(rhs);
                self.out.push(')');
            }
            IrExprKind::Convert(inner) => {
                let ty = self.display.types.display(expr.ty);
                let _ = write!(self.out, "{ty}(");
                self.expr(inner);
                self.out.push(')');
            }
            IrExprKind::Select {
                cond,
                then_expr,
                else_expr,
            } => {
                self.out.push('(');
                self.expr(cond);
                self.out.push_str(" ? ");
                self.expr(then_expr);
                self.out.push_str(" : ");
                self.expr(else_expr);
                self.out.push(')');
            }
            IrExprKind::Call { callee, args } => {
                let name = self
                    .display
                    .module
                    .function(*callee)
                    .map_or_else(|| format!("fn#{}", callee.index()), |f| f.name.clone());
                self.out.push_str(&name);
                self.args(args);
            }
            IrExprKind::CallExtern { callee, args } => {
                let name = self
                    .display
                    .externs
                    .and_then(|e| e.function(*callee))
                    .map_or_else(|| format!("extern#{}", callee.index()), |f| f.qualified_name());
                self.out.push_str(&name);
                self.args(args);
            }
            IrExprKind::Aggregate(elems) => {
                self.out.push('{');
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(elem);
                }
                self.out.push('}');
            }
            IrExprKind::Inlined(call) => {
                let name = self
                    .display
                    .module
                    .function(call.callee)
                    .map_or_else(|| format!("fn#{}", call.callee.index()), |f| f.name.clone());
                let _ = write!(self.out, "inline {name}[");
                for (i, (local, arg)) in call.bindings.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    let local = self.local_name(*local);
                    let _ = write!(self.out, "{local} = ");
                    self.expr(arg);
                }
                self.out.push_str("] {");
                for stmt in &call.body {
                    self.out.push(' ');
                    self.simple_stmt(stmt);
                    self.out.push(';');
                }
                self.out.push_str(" }");
                if let Some(value) = &call.value {
                    self.out.push_str(" => ");
                    self.expr(value);
                }
            }
        }
    }

    fn args(&mut self, args: &[IrExpr]) {
        self.out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(arg);
        }
        self.out.push(')');
    }
}
