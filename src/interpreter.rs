//! Tree-walking evaluator, the final pipeline stage.
//!
//! Statement execution returns a [`Flow`] signal in the `Ok` channel:
//! `Break` and `Return` ride alongside normal completion instead of abusing
//! the error channel, and are consumed by the nearest enclosing loop or call
//! boundary respectively.  The error channel is reserved for real runtime
//! failures, which are fail-fast and collect the active call frames as they
//! unwind.
//!
//! The interpreter is generic over its output sink so tests capture `print`
//! into a buffer while the CLI writes to stdout.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::class::{LoxClass, LoxInstance, LoxTrait};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::natives;
use crate::token::{Token, TokenType};
use crate::value::{LoxFunction, Value};

/// How a statement finished.  Checked after every statement so `break` and
/// `return` propagate outwards without touching the error channel.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Break,
    Return(Value),
}

/// The evaluator.  One instance owns the global scope (with natives
/// installed), the resolver's hop-count table, and the output sink.
pub struct Interpreter<W: Write> {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    frames: Vec<String>,
    out: W,
}

impl Interpreter<io::Stdout> {
    /// Interpreter printing to stdout (the CLI configuration).
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    /// Interpreter printing into `out`.  Tests pass a `Vec<u8>`.
    pub fn with_output(out: W) -> Self {
        info!("Interpreter created");

        let globals = Environment::new();
        natives::install(&globals);

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            frames: Vec::new(),
            out,
        }
    }

    /// Consume the interpreter and hand back the output sink.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Execute a resolved program.  `locals` is the resolver's hop-count
    /// table for these statements; repeated calls accumulate (REPL-style).
    ///
    /// A `Break` or `Return` signal reaching this level is a resolver defect
    /// and is reported as a runtime error rather than silently dropped.
    pub fn interpret(&mut self, statements: &[Stmt], locals: HashMap<ExprId, usize>) -> Result<()> {
        info!(
            "Interpreting {} statement(s), {} resolved local(s)",
            statements.len(),
            locals.len()
        );

        self.locals.extend(locals);

        for statement in statements {
            match self.execute(statement)? {
                Flow::Normal => {}
                Flow::Break => {
                    return Err(LoxError::runtime(0, "'break' escaped to top-level code."));
                }
                Flow::Return(_) => {
                    return Err(LoxError::runtime(0, "'return' escaped to top-level code."));
                }
            }
        }

        Ok(())
    }

    // ───────────────────────── statements ─────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{value}")?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(init) => self.evaluate(init)?,
                    None => Value::Nil,
                };

                self.environment
                    .borrow_mut()
                    .define(name.lexeme.clone(), value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(els) = else_branch {
                    self.execute(els)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Break { .. } => Ok(Flow::Break),

            Stmt::Function(decl) => {
                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.environment
                    .borrow_mut()
                    .define(decl.name.lexeme.clone(), Value::Function(function));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                traits,
                methods,
                class_methods,
            } => {
                self.execute_class(name, superclass.as_ref(), traits, methods, class_methods)?;
                Ok(Flow::Normal)
            }

            Stmt::Trait {
                name,
                traits,
                methods,
            } => {
                self.execute_trait(name, traits, methods)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` inside `env`, restoring the previous environment on
    /// every exit path (normal, signal, or error).
    fn execute_block(&mut self, statements: &[Stmt], env: Rc<RefCell<Environment>>) -> Result<Flow> {
        let previous = mem::replace(&mut self.environment, env);

        let mut result = Ok(Flow::Normal);
        for statement in statements {
            match self.execute(statement) {
                Ok(Flow::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;
        result
    }

    /// Declare a class: evaluate the superclass and traits, then flatten the
    /// method tables once.  Superclass tables form the base, composed traits
    /// layer in left-to-right (later wins), own declarations go on top.
    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        traits: &[Expr],
        methods: &[Rc<FunctionDecl>],
        class_methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        debug!("Declaring class {}", name.lexeme);

        let superclass: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    return Err(LoxError::runtime(
                        expr_line(expr).unwrap_or(name.line),
                        "Superclass must be a class.",
                    ));
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(name.lexeme.clone(), Value::Nil);

        // Methods close over a scope holding `super` when there is a
        // superclass; the resolver assumes exactly this shape.
        let method_env = match &superclass {
            Some(sup) => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));
                env.borrow_mut()
                    .define("super", Value::Class(Rc::clone(sup)));
                env
            }
            None => Rc::clone(&self.environment),
        };

        let mut method_table = superclass
            .as_ref()
            .map(|s| s.methods.clone())
            .unwrap_or_default();
        let mut getter_table = superclass
            .as_ref()
            .map(|s| s.getters.clone())
            .unwrap_or_default();
        let mut class_method_table = superclass
            .as_ref()
            .map(|s| s.class_methods.clone())
            .unwrap_or_default();

        for trait_expr in traits {
            let t = self.evaluate_trait(trait_expr)?;
            for (k, v) in &t.methods {
                insert_member(&mut method_table, &mut getter_table, k.clone(), Rc::clone(v), false);
            }
            for (k, v) in &t.getters {
                insert_member(&mut method_table, &mut getter_table, k.clone(), Rc::clone(v), true);
            }
        }

        for decl in methods {
            let function = LoxFunction::new(
                Rc::clone(decl),
                Rc::clone(&method_env),
                decl.name.lexeme == "init",
            );

            insert_member(
                &mut method_table,
                &mut getter_table,
                decl.name.lexeme.clone(),
                function,
                decl.params.is_none(),
            );
        }

        for decl in class_methods {
            class_method_table.insert(
                decl.name.lexeme.clone(),
                LoxFunction::new(Rc::clone(decl), Rc::clone(&method_env), false),
            );
        }

        let class = Rc::new(LoxClass {
            name: name.lexeme.clone(),
            superclass,
            methods: method_table,
            getters: getter_table,
            class_methods: class_method_table,
        });

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(class));

        Ok(())
    }

    /// Declare a trait.  Composed traits merge later-wins, but an own method
    /// colliding with a composed one is an error.
    fn execute_trait(
        &mut self,
        name: &Token,
        traits: &[Expr],
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        debug!("Declaring trait {}", name.lexeme);

        self.environment
            .borrow_mut()
            .define(name.lexeme.clone(), Value::Nil);

        let mut method_table = HashMap::new();
        let mut getter_table = HashMap::new();

        for trait_expr in traits {
            let t = self.evaluate_trait(trait_expr)?;
            for (k, v) in &t.methods {
                insert_member(&mut method_table, &mut getter_table, k.clone(), Rc::clone(v), false);
            }
            for (k, v) in &t.getters {
                insert_member(&mut method_table, &mut getter_table, k.clone(), Rc::clone(v), true);
            }
        }

        for decl in methods {
            let key = &decl.name.lexeme;

            if method_table.contains_key(key) || getter_table.contains_key(key) {
                return Err(LoxError::runtime(
                    decl.name.line,
                    format!("A previous trait declares a method named '{key}'."),
                ));
            }

            let function = LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
            insert_member(
                &mut method_table,
                &mut getter_table,
                key.clone(),
                function,
                decl.params.is_none(),
            );
        }

        let t = Rc::new(LoxTrait {
            name: name.lexeme.clone(),
            methods: method_table,
            getters: getter_table,
        });

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Trait(t));

        Ok(())
    }

    /// Evaluate a `with`-clause entry, which must produce a trait value.
    fn evaluate_trait(&mut self, expr: &Expr) -> Result<Rc<LoxTrait>> {
        match self.evaluate(expr)? {
            Value::Trait(t) => Ok(t),
            _ => {
                let (line, what) = match expr {
                    Expr::Variable { name, .. } => (name.line, name.lexeme.clone()),
                    _ => (expr_line(expr).unwrap_or(0), "expression".to_owned()),
                };
                Err(LoxError::runtime(line, format!("{what} is not a trait.")))
            }
        }
    }

    // ───────────────────────── expressions ────────────────────────

    fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(LoxError::runtime(operator.line, "Operand must be a number.")),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => unreachable!("parser only emits '!' and '-' unaries"),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.binary_op(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                // Short-circuit yields the determining operand itself.
                let short_circuits = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Variable { name, id } => self.lookup_variable(name, *id),

            Expr::Assign { name, value, id } => {
                let value = self.evaluate(value)?;

                let assigned = match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                    ),
                    None => self.globals.borrow_mut().assign(&name.lexeme, value.clone()),
                };

                if !assigned {
                    return Err(LoxError::runtime(
                        name.line,
                        format!("Undefined variable '{}'.", name.lexeme),
                    ));
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.call_value(callee, args, paren.line)
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;
                self.get_property(object, name)
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;

                let Value::Instance(instance) = object else {
                    return Err(LoxError::runtime(name.line, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;
                instance.set_field(name.lexeme.clone(), value.clone());
                Ok(value)
            }

            Expr::This { keyword, id } => self.lookup_variable(keyword, *id),

            Expr::Super {
                keyword,
                method,
                id,
            } => {
                // Distances are fixed by the resolver: `super` lives in the
                // wrapper scope, `this` one scope closer.
                let distance = *self.locals.get(id).ok_or_else(|| {
                    LoxError::runtime(keyword.line, "Unresolved 'super' expression.")
                })?;

                let superclass =
                    match Environment::get_at(&self.environment, distance, "super") {
                        Some(Value::Class(class)) => class,
                        _ => {
                            return Err(LoxError::runtime(
                                keyword.line,
                                "Unresolved 'super' expression.",
                            ));
                        }
                    };

                let this = Environment::get_at(&self.environment, distance - 1, "this")
                    .ok_or_else(|| {
                        LoxError::runtime(keyword.line, "Unresolved 'super' expression.")
                    })?;

                if let Some(m) = superclass.find_method(&method.lexeme) {
                    return Ok(Value::Function(m.bind(this)));
                }

                if let Some(g) = superclass.find_getter(&method.lexeme) {
                    let bound = g.bind(this);
                    return self.call_function(&bound, Vec::new());
                }

                Err(LoxError::runtime(
                    method.line,
                    format!("Undefined property '{}'.", method.lexeme),
                ))
            }
        }
    }

    fn binary_op(&mut self, operator: &Token, left: Value, right: Value) -> Result<Value> {
        use TokenType::*;

        match operator.token_type {
            PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            MINUS => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Number(a - b))
            }

            STAR => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Number(a * b))
            }

            SLASH => {
                let (a, b) = number_operands(operator, left, right)?;
                if b == 0.0 {
                    return Err(LoxError::runtime(operator.line, "Division by zero."));
                }
                Ok(Value::Number(a / b))
            }

            MODULO => {
                let (a, b) = number_operands(operator, left, right)?;
                if b == 0.0 {
                    return Err(LoxError::runtime(operator.line, "Division by zero."));
                }
                // Floored modulo: result takes the sign of the divisor.
                Ok(Value::Number(a - b * (a / b).floor()))
            }

            GREATER => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Bool(a > b))
            }
            GREATER_EQUAL => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Bool(a >= b))
            }
            LESS => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Bool(a < b))
            }
            LESS_EQUAL => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Bool(a <= b))
            }

            EQUAL_EQUAL => Ok(Value::Bool(left == right)),
            BANG_EQUAL => Ok(Value::Bool(left != right)),

            _ => unreachable!("parser only emits binary operator tokens"),
        }
    }

    fn lookup_variable(&self, name: &Token, id: ExprId) -> Result<Value> {
        let found = match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme),
            None => self.globals.borrow().get(&name.lexeme),
        };

        found.ok_or_else(|| {
            LoxError::runtime(
                name.line,
                format!("Undefined variable '{}'.", name.lexeme),
            )
        })
    }

    /// Property access dispatch: instances check fields, then getters
    /// (auto-invoked), then methods; class values expose class methods bound
    /// to the class; arrays expose `get`/`set`/`length`.
    fn get_property(&mut self, object: Value, name: &Token) -> Result<Value> {
        match object {
            Value::Instance(instance) => {
                if let Some(value) = instance.get_field(&name.lexeme) {
                    return Ok(value);
                }

                if let Some(getter) = instance.class.find_getter(&name.lexeme) {
                    let bound = getter.bind(Value::Instance(Rc::clone(&instance)));
                    return self.call_function(&bound, Vec::new());
                }

                if let Some(method) = instance.class.find_method(&name.lexeme) {
                    return Ok(Value::Function(
                        method.bind(Value::Instance(Rc::clone(&instance))),
                    ));
                }

                Err(LoxError::runtime(
                    name.line,
                    format!("Undefined property '{}'.", name.lexeme),
                ))
            }

            Value::Class(class) => {
                if let Some(method) = class.find_class_method(&name.lexeme) {
                    let bound = method.bind(Value::Class(Rc::clone(&class)));
                    if method.is_getter() {
                        return self.call_function(&bound, Vec::new());
                    }
                    return Ok(Value::Function(bound));
                }

                Err(LoxError::runtime(
                    name.line,
                    format!("Undefined property '{}'.", name.lexeme),
                ))
            }

            Value::Array(array) => {
                natives::array_property(&array, &name.lexeme).ok_or_else(|| {
                    LoxError::runtime(
                        name.line,
                        format!("Undefined property '{}'.", name.lexeme),
                    )
                })
            }

            _ => Err(LoxError::runtime(
                name.line,
                "Only instances have properties.",
            )),
        }
    }

    // ────────────────────────── call machinery ────────────────────

    fn call_value(&mut self, callee: Value, args: Vec<Value>, line: usize) -> Result<Value> {
        match callee {
            Value::Function(function) => {
                check_arity(function.arity(), args.len(), line)?;
                self.call_function(&function, args)
            }

            Value::Native(native) => {
                check_arity(native.arity, args.len(), line)?;
                (native.func)(&args).map_err(|msg| LoxError::runtime(line, msg))
            }

            Value::Class(class) => {
                check_arity(class.arity(), args.len(), line)?;
                self.instantiate(&class, args)
            }

            _ => Err(LoxError::runtime(
                line,
                "Can only call functions and classes.",
            )),
        }
    }

    /// Invoke a user function: one fresh child environment of the captured
    /// closure per call, parameters and body sharing it.  A `Return` signal
    /// stops here; an initializer always yields its `this`.
    pub fn call_function(&mut self, function: &Rc<LoxFunction>, args: Vec<Value>) -> Result<Value> {
        let fn_name = function.declaration.name.lexeme.clone();
        debug!("Calling {fn_name} (depth {})", self.frames.len());

        let env = Environment::with_enclosing(Rc::clone(&function.closure));
        if let Some(params) = &function.declaration.params {
            for (param, arg) in params.iter().zip(args) {
                env.borrow_mut().define(param.lexeme.clone(), arg);
            }
        }

        self.frames.push(fn_name);
        let flow = self.execute_block(&function.declaration.body, env);
        let fn_name = self.frames.pop().unwrap_or_default();

        let this_of = |f: &LoxFunction| {
            Environment::get_at(&f.closure, 0, "this").unwrap_or(Value::Nil)
        };

        match flow {
            Ok(Flow::Return(value)) => {
                if function.is_initializer {
                    Ok(this_of(function))
                } else {
                    Ok(value)
                }
            }

            Ok(Flow::Normal) => {
                if function.is_initializer {
                    Ok(this_of(function))
                } else {
                    Ok(Value::Nil)
                }
            }

            Ok(Flow::Break) => Err(LoxError::runtime(
                function.declaration.name.line,
                "'break' crossed a function boundary.",
            )),

            Err(LoxError::Runtime {
                message,
                line,
                mut trace,
            }) => {
                trace.push(fn_name);
                Err(LoxError::Runtime {
                    message,
                    line,
                    trace,
                })
            }

            Err(other) => Err(other),
        }
    }

    /// Call a class: allocate the instance, run a bound `init` when present,
    /// and return the instance regardless.
    fn instantiate(&mut self, class: &Rc<LoxClass>, args: Vec<Value>) -> Result<Value> {
        let instance = LoxInstance::new(Rc::clone(class));

        if let Some(init) = class.find_method("init") {
            let bound = init.bind(Value::Instance(Rc::clone(&instance)));
            self.call_function(&bound, args)?;
        }

        Ok(Value::Instance(instance))
    }
}

/// Insert a member into its kind's table, displacing any same-named entry of
/// the other kind.  A name occupies at most one of the two tables, so the
/// later definition wins regardless of whether it is a method or a getter.
fn insert_member(
    methods: &mut HashMap<String, Rc<LoxFunction>>,
    getters: &mut HashMap<String, Rc<LoxFunction>>,
    name: String,
    function: Rc<LoxFunction>,
    is_getter: bool,
) {
    if is_getter {
        methods.remove(&name);
        getters.insert(name, function);
    } else {
        getters.remove(&name);
        methods.insert(name, function);
    }
}

fn check_arity(expected: usize, got: usize, line: usize) -> Result<()> {
    if expected != got {
        return Err(LoxError::runtime(
            line,
            format!("Expected {expected} arguments but got {got}."),
        ));
    }
    Ok(())
}

fn number_operands(operator: &Token, left: Value, right: Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((a, b)),
        _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
    }
}

/// Best-effort source line for an expression, from its nearest token.
fn expr_line(expr: &Expr) -> Option<usize> {
    match expr {
        Expr::Literal(_) => None,
        Expr::Grouping(inner) => expr_line(inner),
        Expr::Unary { operator, .. } => Some(operator.line),
        Expr::Binary { operator, .. } | Expr::Logical { operator, .. } => Some(operator.line),
        Expr::Conditional { condition, .. } => expr_line(condition),
        Expr::Call { paren, .. } => Some(paren.line),
        Expr::Get { name, .. } | Expr::Set { name, .. } => Some(name.line),
        Expr::Variable { name, .. } | Expr::Assign { name, .. } => Some(name.line),
        Expr::This { keyword, .. } | Expr::Super { keyword, .. } => Some(keyword.line),
    }
}
