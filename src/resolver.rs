//! Static resolver pass for the **Lox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<&str,bool>` tracking
//!    declared/defined).
//! 2. Report static errors (redeclaration, forward-read in initializer,
//!    invalid `return`) — accumulating them rather than stopping, so one pass
//!    surfaces every independent mistake.
//! 3. Record, for *each* variable occurrence it can see the declaration of,
//!    the lexical distance to that declaration.  Occurrences absent from the
//!    table are globals and fall back to a dynamic lookup at run time — which
//!    is what permits forward references and redefinition at global scope.
//!
//! The distance table and the AST it annotates must originate from the same
//! parse: the table is keyed on the parser's per-node [`ExprId`]s.

use crate::error::LoxError;
use crate::parser::{Expr, ExprId, Stmt};
use crate::token::Token;
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// Side table produced by resolution: node identity → lexical scope distance
/// (0 = innermost).  Absence means "global; resolve dynamically".
pub type Locals = HashMap<ExprId, usize>;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances into the [`Locals`] side table.
pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    global_names: HashSet<&'a str>,      // top-level declarations seen so far
    locals: Locals,
    errors: Vec<LoxError>,
    current_function: FunctionType,
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            global_names: HashSet::new(),
            locals: Locals::new(),
            errors: Vec::new(),
            current_function: FunctionType::None,
        }
    }

    /// Walk all top-level statements.  Returns the distance table together
    /// with every static error found; a non-empty error list means the
    /// program must not be interpreted.
    pub fn resolve(mut self, statements: &[Stmt<'a>]) -> (Locals, Vec<LoxError>) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        (self.locals, self.errors)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt<'a>) {
        debug!("Resolving stmt: {:?}", stmt);

        match stmt {
            Stmt::Block(statements) => {
                // ① Push a new anonymous scope for `{ … }`
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // ② var declaration: declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function { name, params, body } => {
                // ③ function declaration: name is visible *inside* its own body
                self.declare(name);
                self.define(name);
                self.resolve_function(params, body);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                // ④ just resolve the inner expression
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                // ⑤ if
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                // ⑥ while (for-loops arrive here already desugared)
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                // ⑦ return only allowed inside a function
                if self.current_function == FunctionType::None {
                    self.errors.push(LoxError::resolve(
                        keyword,
                        "'return' used outside of function",
                    ));
                }
                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr<'a>) {
        debug!("Resolving expr: {:?}", expr);

        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                // The name is declared in the innermost scope but not yet
                // defined: this is a read inside its own initializer.  Such a
                // read binds to whatever an enclosing scope (or an already-
                // seen global) provides — the half-initialized slot itself is
                // never a valid target — and is rejected when nothing
                // enclosing declares the name.
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme) == Some(&false) {
                        if let Some(depth) = self.enclosing_depth(name.lexeme) {
                            debug!(
                                "Self-shadowing read of '{}' bound at depth {}",
                                name.lexeme, depth
                            );

                            self.locals.insert(*id, depth);
                        } else if !self.global_names.contains(name.lexeme) {
                            self.errors.push(LoxError::resolve(
                                name,
                                "Cannot read local variable in its own initializer",
                            ));
                        }
                        // else: left unresolved → dynamic global lookup.

                        return;
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, params: &[&'a Token<'a>], body: &[Stmt<'a>]) {
        let enclosing = self.current_function;
        self.current_function = FunctionType::Function;

        self.begin_scope();
        for param in params {
            self.declare(param);
            self.define(param);
        }
        for stmt in body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token<'a>) {
        match self.scopes.last_mut() {
            Some(scope) => {
                if scope.contains_key(name.lexeme) {
                    self.errors.push(LoxError::resolve(
                        name,
                        "Variable already declared in this scope",
                    ));

                    return;
                }
                scope.insert(name.lexeme, false);
            }

            // Top level: globals may be redeclared freely; the name is only
            // recorded so initializer self-reference checks can see it.
            None => {
                self.global_names.insert(name.lexeme);
            }
        }
    }

    fn define(&mut self, name: &Token<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Innermost depth > 0 at which `name` is declared, skipping the current
    /// scope.  Used for initializer self-reference disambiguation.
    fn enclosing_depth(&self, name: &str) -> Option<usize> {
        for (depth, scope) in self.scopes.iter().rev().enumerate().skip(1) {
            if scope.contains_key(name) {
                return Some(depth);
            }
        }

        None
    }

    /// Record this variable occurrence as a local at the depth of the scope
    /// that declares it, or leave it out of the table entirely (global).
    fn resolve_local(&mut self, id: ExprId, name: &Token<'a>) {
        // check innermost → outermost
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);

                self.locals.insert(id, depth);
                return;
            }
        }

        // not found in any local scope ⇒ global, looked up dynamically
        debug!("Resolved '{}' as global", name.lexeme);
    }
}

impl<'a> Default for Resolver<'a> {
    fn default() -> Self {
        Self::new()
    }
}
