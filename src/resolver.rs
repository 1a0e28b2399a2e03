//! Static resolution pass between the parser and the interpreter.
//!
//! Walks the AST once with an explicit stack of lexical scopes and records,
//! for every variable-like reference, how many scope hops separate the use
//! from the declaration.  The result is a side table keyed on [`ExprId`]
//! that the interpreter consults for direct environment access; unresolved
//! names fall through to the dynamic global lookup.
//!
//! The same walk performs the language's static checks.  Errors are
//! *collected*, not fail-fast, and any error blocks execution:
//! - reading a local variable inside its own initializer;
//! - redeclaring a name in the same local scope;
//! - `return` at the top level, or `return <value>` inside `init`;
//! - `this` outside a class or trait method;
//! - `super` outside a class, inside a trait, or in a class without a
//!   superclass;
//! - `break` outside a loop (a function body resets the loop context, so a
//!   `break` inside a function declared inside a loop is also rejected);
//! - a class naming itself as its superclass;
//! - a `with` clause naming an identifier that is not a declared trait.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::LoxError;
use crate::token::Token;

/// What kind of function body is currently being resolved.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// What kind of class-like body encloses the current code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
    Trait,
}

/// The resolver.  Consumed by [`Resolver::resolve`].
pub struct Resolver {
    /// Innermost scope last.  `false` marks declared-but-not-initialized.
    scopes: Vec<HashMap<String, bool>>,

    /// Hop-count side table, keyed by reference-node id.
    locals: HashMap<ExprId, usize>,

    errors: Vec<LoxError>,

    current_function: FunctionType,
    current_class: ClassType,

    /// Loops lexically enclosing the current statement *within the current
    /// function body*.  Reset to zero on function entry so `break` cannot
    /// cross a call boundary.
    loop_depth: usize,

    /// Names introduced by `trait` declarations seen so far.
    declared_traits: HashSet<String>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        info!("Resolver created");

        Self {
            scopes: Vec::new(),
            locals: HashMap::new(),
            errors: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            loop_depth: 0,
            declared_traits: HashSet::new(),
        }
    }

    /// Resolve a whole program.  Returns the hop-count table and every
    /// static error found; a non-empty error vector means the program must
    /// not be executed.
    pub fn resolve(mut self, statements: &[Stmt]) -> (HashMap<ExprId, usize>, Vec<LoxError>) {
        info!("Beginning resolve phase over {} statement(s)", statements.len());

        self.resolve_stmts(statements);

        info!(
            "Resolution finished: {} local(s), {} error(s)",
            self.locals.len(),
            self.errors.len()
        );

        (self.locals, self.errors)
    }

    // ───────────────────────── statements ─────────────────────────

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }

            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(els) = else_branch {
                    self.resolve_stmt(els);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);

                self.loop_depth += 1;
                self.resolve_stmt(body);
                self.loop_depth -= 1;
            }

            Stmt::Break { keyword } => {
                if self.loop_depth == 0 {
                    self.errors.push(LoxError::resolve(
                        keyword.line,
                        "Can't use 'break' outside of a loop.",
                    ));
                }
            }

            Stmt::Function(decl) => {
                // The name is defined before the body resolves, so the
                // function can refer to itself recursively.
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.errors.push(LoxError::resolve(
                        keyword.line,
                        "Can't return from top-level code.",
                    ));
                }

                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.errors.push(LoxError::resolve(
                            keyword.line,
                            "Can't return a value from an initializer.",
                        ));
                    }
                    self.resolve_expr(value);
                }
            }

            Stmt::Class {
                name,
                superclass,
                traits,
                methods,
                class_methods,
            } => {
                self.resolve_class(name, superclass.as_ref(), traits, methods, class_methods)
            }

            Stmt::Trait {
                name,
                traits,
                methods,
            } => self.resolve_trait(name, traits, methods),
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        traits: &[Expr],
        methods: &[Rc<FunctionDecl>],
        class_methods: &[Rc<FunctionDecl>],
    ) {
        debug!("Resolving class {}", name.lexeme);

        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(sup) = superclass {
            if let Expr::Variable { name: sup_name, .. } = sup {
                if sup_name.lexeme == name.lexeme {
                    self.errors.push(LoxError::resolve(
                        sup_name.line,
                        "A class can't inherit from itself.",
                    ));
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(sup);
        }

        self.resolve_with_clause(traits);

        if superclass.is_some() {
            self.begin_scope();
            self.scope_define("super");
        }

        self.begin_scope();
        self.scope_define("this");

        for method in methods {
            let ftype = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, ftype);
        }

        // Class methods also see `this` (bound to the class object itself).
        for method in class_methods {
            self.resolve_function(method, FunctionType::Method);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_trait(&mut self, name: &Token, traits: &[Expr], methods: &[Rc<FunctionDecl>]) {
        debug!("Resolving trait {}", name.lexeme);

        let enclosing_class = self.current_class;
        self.current_class = ClassType::Trait;

        self.declare(name);
        self.define(name);
        self.declared_traits.insert(name.lexeme.clone());

        self.resolve_with_clause(traits);

        self.begin_scope();
        self.scope_define("this");

        for method in methods {
            self.resolve_function(method, FunctionType::Method);
        }

        self.end_scope();

        self.current_class = enclosing_class;
    }

    /// `with` clause entries must name declared traits.
    fn resolve_with_clause(&mut self, traits: &[Expr]) {
        for t in traits {
            if let Expr::Variable { name, .. } = t {
                if !self.declared_traits.contains(&name.lexeme) {
                    self.errors.push(LoxError::resolve(
                        name.line,
                        format!("Trait '{}' is not declared.", name.lexeme),
                    ));
                }
            }
            self.resolve_expr(t);
        }
    }

    /// Resolve a function body.  Parameters and body share one scope, which
    /// matches the single environment the interpreter creates per call.
    fn resolve_function(&mut self, decl: &Rc<FunctionDecl>, ftype: FunctionType) {
        let enclosing_function = self.current_function;
        let enclosing_loop_depth = self.loop_depth;

        self.current_function = ftype;
        self.loop_depth = 0;

        self.begin_scope();

        if let Some(params) = &decl.params {
            for param in params {
                self.declare(param);
                self.define(param);
            }
        }

        self.resolve_stmts(&decl.body);

        self.end_scope();

        self.current_function = enclosing_function;
        self.loop_depth = enclosing_loop_depth;
    }

    // ───────────────────────── expressions ────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::Variable { name, id } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.errors.push(LoxError::resolve(
                            name.line,
                            "Can't read local variable in its own initializer.",
                        ));
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { name, value, id } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::This { keyword, id } => {
                if self.current_class == ClassType::None {
                    self.errors.push(LoxError::resolve(
                        keyword.line,
                        "Can't use 'this' outside of a class.",
                    ));
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { keyword, id, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.errors.push(LoxError::resolve(
                            keyword.line,
                            "Can't use 'super' outside of a class.",
                        ));
                        return;
                    }
                    ClassType::Trait => {
                        self.errors.push(LoxError::resolve(
                            keyword.line,
                            "Can't use 'super' in a trait.",
                        ));
                        return;
                    }
                    ClassType::Class => {
                        self.errors.push(LoxError::resolve(
                            keyword.line,
                            "Can't use 'super' in a class with no superclass.",
                        ));
                        return;
                    }
                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }
        }
    }

    // ─────────────────────── scope bookkeeping ────────────────────

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Mark `name` as declared-but-not-ready in the current scope.
    /// No-op at global scope (globals stay dynamic).
    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.errors.push(LoxError::resolve(
                name.line,
                "Already a variable with this name in this scope.",
            ));
        }

        scope.insert(name.lexeme.clone(), false);
    }

    /// Mark `name` as fully initialized.
    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    /// Define a synthetic binding (`this` / `super`) directly by name.
    fn scope_define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned(), true);
        }
    }

    /// Record the hop count for a reference if it binds to a local scope.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (hops, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at distance {}", name.lexeme, hops);
                self.locals.insert(id, hops);
                return;
            }
        }
        // Not found locally: assumed global, looked up dynamically at runtime.
    }
}
