use tlox::error::LoxError;
use tlox::parser::Parser;
use tlox::resolver::Resolver;
use tlox::scanner::Scanner;

/// Resolve a syntactically valid program and return the static errors.
fn resolve_errors(source: &str) -> Vec<LoxError> {
    let (tokens, scan_errors) = Scanner::new(source).scan_tokens();
    assert!(scan_errors.is_empty(), "unexpected scan errors: {scan_errors:?}");

    let (statements, parse_errors) = Parser::new(tokens).parse();
    assert!(parse_errors.is_empty(), "unexpected parse errors: {parse_errors:?}");

    let (_, errors) = Resolver::new().resolve(&statements);
    errors
}

fn assert_rejects(source: &str, message: &str) {
    let errors = resolve_errors(source);
    assert!(
        errors.iter().any(|e| e.to_string().contains(message)),
        "expected error containing {message:?}, got {errors:?}"
    );
}

fn assert_clean(source: &str) {
    let errors = resolve_errors(source);
    assert!(errors.is_empty(), "expected clean resolve, got {errors:?}");
}

#[test]
fn self_referential_initializer_is_rejected() {
    assert_rejects(
        "var a = 1; { var a = a; }",
        "Can't read local variable in its own initializer.",
    );
}

#[test]
fn global_self_reference_stays_dynamic() {
    // Globals are not resolved statically, so this is legal at resolve time.
    assert_clean("var a = a;");
}

#[test]
fn same_scope_redeclaration_is_rejected() {
    assert_rejects(
        "{ var a = 1; var a = 2; }",
        "Already a variable with this name in this scope.",
    );

    // Global redeclaration stays legal.
    assert_clean("var a = 1; var a = 2;");
}

#[test]
fn top_level_return_is_rejected() {
    assert_rejects("return 1;", "Can't return from top-level code.");
}

#[test]
fn returning_a_value_from_init_is_rejected() {
    assert_rejects(
        "class A { init() { return 1; } }",
        "Can't return a value from an initializer.",
    );

    // A bare return in init is fine.
    assert_clean("class A { init() { return; } }");
}

#[test]
fn this_outside_a_class_is_rejected() {
    assert_rejects("print this;", "Can't use 'this' outside of a class.");
    assert_rejects("fun f() { return this; }", "Can't use 'this' outside of a class.");
    assert_clean("class A { m() { return this; } }");
}

#[test]
fn super_misuse_is_rejected() {
    assert_rejects("print super.x;", "Can't use 'super' outside of a class.");
    assert_rejects(
        "class A { m() { return super.m(); } }",
        "Can't use 'super' in a class with no superclass.",
    );
    assert_rejects(
        "trait T { m() { return super.m(); } }",
        "Can't use 'super' in a trait.",
    );
    assert_clean("class A {} class B < A { m() { return super.m(); } }");
}

#[test]
fn class_inheriting_from_itself_is_rejected() {
    assert_rejects("class A < A {}", "A class can't inherit from itself.");
}

#[test]
fn break_outside_a_loop_is_rejected() {
    assert_rejects("break;", "Can't use 'break' outside of a loop.");
    assert_rejects("if (true) break;", "Can't use 'break' outside of a loop.");
    assert_clean("while (true) { if (true) break; }");
}

#[test]
fn break_inside_function_inside_loop_is_rejected() {
    // A function body resets the loop context, so the break cannot target
    // the loop surrounding the declaration.
    assert_rejects(
        "while (true) { fun f() { break; } f(); }",
        "Can't use 'break' outside of a loop.",
    );
}

#[test]
fn with_clause_must_name_a_declared_trait() {
    assert_rejects("class A with NotATrait {}", "Trait 'NotATrait' is not declared.");
    assert_rejects(
        "var X = 1; class A with X {}",
        "Trait 'X' is not declared.",
    );
    assert_clean("trait T { m() { return 1; } } class A with T {}");
}

#[test]
fn trait_composition_is_visible_to_later_declarations() {
    assert_clean("trait T1 { a() { return 1; } } trait T2 with T1 { b() { return 2; } }");
}

#[test]
fn errors_accumulate_across_the_program() {
    let errors = resolve_errors("return 1; break; print this;");
    assert_eq!(errors.len(), 3);
}

#[test]
fn methods_allow_this_in_getters_and_class_methods() {
    assert_clean(
        "class A {
            size { return 1; }
            class make() { return this; }
         }",
    );
}
