//! Parenthesized prefix rendering of the AST, used by the `parse` subcommand
//! and handy when debugging the parser.
//!
//! Expressions render Lisp-style: `1 + 2 * 3` becomes
//! `(+ 1.0 (* 2.0 3.0))`.  Number literals always show a fractional part so
//! `1` and `"1"` stay distinguishable in the output.

use std::fmt::Write;

use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};

/// Render a whole program, one statement per line.
pub fn print_program(statements: &[Stmt]) -> String {
    let mut out = String::new();

    for stmt in statements {
        out.push_str(&print_stmt(stmt));
        out.push('\n');
    }

    out
}

pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expression(expr) => print_expr(expr),

        Stmt::Print(expr) => format!("(print {})", print_expr(expr)),

        Stmt::Var { name, initializer } => match initializer {
            Some(init) => format!("(var {} {})", name.lexeme, print_expr(init)),
            None => format!("(var {})", name.lexeme),
        },

        Stmt::Block(statements) => {
            let mut s = String::from("(block");
            for stmt in statements {
                let _ = write!(s, " {}", print_stmt(stmt));
            }
            s.push(')');
            s
        }

        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => match else_branch {
            Some(els) => format!(
                "(if {} {} {})",
                print_expr(condition),
                print_stmt(then_branch),
                print_stmt(els)
            ),
            None => format!("(if {} {})", print_expr(condition), print_stmt(then_branch)),
        },

        Stmt::While { condition, body } => {
            format!("(while {} {})", print_expr(condition), print_stmt(body))
        }

        Stmt::Break { .. } => "(break)".to_owned(),

        Stmt::Function(decl) => print_function(decl, "fun"),

        Stmt::Return { value, .. } => match value {
            Some(expr) => format!("(return {})", print_expr(expr)),
            None => "(return)".to_owned(),
        },

        Stmt::Class {
            name,
            superclass,
            traits,
            methods,
            class_methods,
        } => {
            let mut s = format!("(class {}", name.lexeme);
            if let Some(sup) = superclass {
                let _ = write!(s, " < {}", print_expr(sup));
            }
            for t in traits {
                let _ = write!(s, " with {}", print_expr(t));
            }
            for method in methods {
                let _ = write!(s, " {}", print_function(method, "method"));
            }
            for method in class_methods {
                let _ = write!(s, " {}", print_function(method, "class-method"));
            }
            s.push(')');
            s
        }

        Stmt::Trait {
            name,
            traits,
            methods,
        } => {
            let mut s = format!("(trait {}", name.lexeme);
            for t in traits {
                let _ = write!(s, " with {}", print_expr(t));
            }
            for method in methods {
                let _ = write!(s, " {}", print_function(method, "method"));
            }
            s.push(')');
            s
        }
    }
}

fn print_function(decl: &FunctionDecl, kind: &str) -> String {
    let mut s = format!("({kind} {}", decl.name.lexeme);

    match &decl.params {
        Some(params) => {
            s.push_str(" (");
            for (i, param) in params.iter().enumerate() {
                if i > 0 {
                    s.push(' ');
                }
                s.push_str(&param.lexeme);
            }
            s.push(')');
        }
        None => s.push_str(" getter"),
    }

    for stmt in &decl.body {
        let _ = write!(s, " {}", print_stmt(stmt));
    }

    s.push(')');
    s
}

pub fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Literal(lit) => match lit {
            LiteralValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{n:.1}")
                } else {
                    format!("{n}")
                }
            }
            LiteralValue::Str(s) => s.clone(),
            LiteralValue::True => "true".to_owned(),
            LiteralValue::False => "false".to_owned(),
            LiteralValue::Nil => "nil".to_owned(),
        },

        Expr::Grouping(inner) => format!("(group {})", print_expr(inner)),

        Expr::Unary { operator, right } => {
            format!("({} {})", operator.lexeme, print_expr(right))
        }

        Expr::Binary {
            left,
            operator,
            right,
        }
        | Expr::Logical {
            left,
            operator,
            right,
        } => format!(
            "({} {} {})",
            operator.lexeme,
            print_expr(left),
            print_expr(right)
        ),

        Expr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => format!(
            "(?: {} {} {})",
            print_expr(condition),
            print_expr(then_branch),
            print_expr(else_branch)
        ),

        Expr::Call {
            callee, arguments, ..
        } => {
            let mut s = format!("(call {}", print_expr(callee));
            for arg in arguments {
                let _ = write!(s, " {}", print_expr(arg));
            }
            s.push(')');
            s
        }

        Expr::Get { object, name } => format!("(. {} {})", print_expr(object), name.lexeme),

        Expr::Set {
            object,
            name,
            value,
        } => format!(
            "(.= {} {} {})",
            print_expr(object),
            name.lexeme,
            print_expr(value)
        ),

        Expr::Variable { name, .. } => name.lexeme.clone(),

        Expr::Assign { name, value, .. } => {
            format!("(= {} {})", name.lexeme, print_expr(value))
        }

        Expr::This { .. } => "this".to_owned(),

        Expr::Super { method, .. } => format!("(super {})", method.lexeme),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn parse_program(source: &str) -> Vec<Stmt> {
        let (tokens, scan_errors) = Scanner::new(source).scan_tokens();
        assert!(scan_errors.is_empty());

        let (statements, parse_errors) = Parser::new(tokens).parse();
        assert!(parse_errors.is_empty());

        statements
    }

    #[test]
    fn precedence_shows_in_prefix_form() {
        let program = parse_program("1 + 2 * 3;");
        assert_eq!(print_stmt(&program[0]), "(+ 1.0 (* 2.0 3.0))");
    }

    #[test]
    fn ternary_renders_right_associative() {
        let program = parse_program("a ? b : c ? d : e;");
        assert_eq!(print_stmt(&program[0]), "(?: a b (?: c d e))");
    }

    #[test]
    fn class_renders_header_and_members() {
        let program = parse_program("class A < B with T { go() {} area {} class make() {} }");
        assert_eq!(
            print_stmt(&program[0]),
            "(class A < B with T (method go ()) (method area getter) (class-method make ()))"
        );
    }
}
