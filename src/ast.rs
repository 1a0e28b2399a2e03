//! Abstract syntax tree produced by the [`crate::parser`].
//!
//! Every variable-like reference node (`Variable`, `Assign`, `This`,
//! `Super`) carries a parser-assigned [`ExprId`].  The resolver keys its
//! scope-hop side table on these ids, which gives the interpreter direct
//! (non-searching) environment lookups without relying on node addresses.

use std::rc::Rc;

use crate::token::Token;

/// Stable identity of a reference node, assigned monotonically by the parser.
pub type ExprId = u32;

/// A **literal constant** that appears directly in the source code.
///
/// These variants are the *terminal leaves* of the expression tree.  The
/// parser copies the value at parse time so the AST owns its literals.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal, stored as IEEE-754 `f64`.
    /// Integral lexemes such as `"3"` are still parsed as `3.0`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// The boolean constant `true`.
    True,

    /// The boolean constant `false`.
    False,

    /// The `nil` literal.
    Nil,
}

/// **AST node** representing every kind of *expression* in the language.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Parenthesised sub-expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Prefix unary operator expression, e.g. `!isReady` or `-42`.
    Unary {
        /// The operator token (`!` or `-`).
        operator: Token,
        right: Box<Expr>,
    },

    /// Infix binary operator expression, e.g. `a + b`, `x <= y`.
    Binary {
        left: Box<Expr>,
        /// Operator token such as `+`, `%`, `==`, ...
        operator: Token,
        right: Box<Expr>,
    },

    /// Short-circuiting logical operators `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token, // `AND` or `OR`
        right: Box<Expr>,
    },

    /// Ternary `condition ? then : else` (right-associative).
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Function, method, or class call expression.
    Call {
        /// Expression that evaluates to a callable.
        callee: Box<Expr>,
        /// The closing `)` token, retained for error reporting.
        paren: Token,
        /// Argument list (may be empty).
        arguments: Vec<Expr>,
    },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// Variable access.
    Variable { name: Token, id: ExprId },

    /// Assignment expression: `identifier "=" expression`.
    Assign {
        name: Token,
        value: Box<Expr>,
        id: ExprId,
    },

    /// The `this` keyword inside a method.
    This { keyword: Token, id: ExprId },

    /// `super.method` inside a subclass method.
    Super {
        keyword: Token,
        method: Token,
        id: ExprId,
    },
}

/// A function or method declaration.
///
/// `params == None` marks a **getter**: a method declared without a parameter
/// list, invoked automatically on property access.  Shared via `Rc` so every
/// closure created from the declaration references one copy of the body.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity <= 255), or `None` for a getter.
    pub params: Option<Vec<Token>>,

    /// Body executed when the function is called.
    pub body: Vec<Stmt>,
}

impl FunctionDecl {
    /// Exact parameter count required at call sites.
    pub fn arity(&self) -> usize {
        self.params.as_ref().map_or(0, Vec::len)
    }
}

/// **AST node** for *statements*.  A program is a sequence of these nodes
/// returned by [`crate::parser::Parser::parse`].
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Stand-alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement used for output.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    /// Introduces a new lexical scope.
    Block(Vec<Stmt>),

    /// `if` / `else` conditional.
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop.  `for` loops desugar into this at parse time.
    While { condition: Expr, body: Box<Stmt> },

    /// Function declaration, becomes a first-class callable value.
    Function(Rc<FunctionDecl>),

    /// `return` statement inside a function body.
    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Optional expression to return.  Absent means `nil` is returned.
        value: Option<Expr>,
    },

    /// `break` out of the innermost enclosing loop.
    Break { keyword: Token },

    /// Class declaration with optional single superclass, trait composition
    /// clause, instance methods (including getters), and class-level methods.
    Class {
        name: Token,
        /// Always an `Expr::Variable` naming the superclass, when present.
        superclass: Option<Expr>,
        /// `with` clause: `Expr::Variable`s naming composed traits, in order.
        traits: Vec<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
        class_methods: Vec<Rc<FunctionDecl>>,
    },

    /// Trait declaration: a reusable method table, optionally composed from
    /// other traits.
    Trait {
        name: Token,
        traits: Vec<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}
