use tlox::error::LoxError;
use tlox::interpreter::Interpreter;
use tlox::run_pipeline;

/// Run a program end to end, capturing print output.
fn run(source: &str) -> Result<String, Vec<LoxError>> {
    let mut interpreter = Interpreter::with_output(Vec::new());
    run_pipeline(source, &mut interpreter)?;
    Ok(String::from_utf8(interpreter.into_output()).expect("print output is UTF-8"))
}

fn run_ok(source: &str) -> String {
    match run(source) {
        Ok(output) => output,
        Err(errors) => panic!("program failed: {errors:?}"),
    }
}

fn assert_prints(source: &str, expected: &[&str]) {
    let output = run_ok(source);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines, expected, "program: {source}");
}

fn assert_runtime_error(source: &str, message: &str) {
    let errors = run(source).expect_err("expected a runtime error");
    assert_eq!(errors.len(), 1, "runtime failures are fail-fast: {errors:?}");
    assert!(errors[0].is_runtime(), "expected runtime error, got {:?}", errors[0]);
    assert!(
        errors[0].to_string().contains(message),
        "expected {message:?} in {:?}",
        errors[0]
    );
}

// ───────────────────────── arithmetic & typing ─────────────────────────

#[test]
fn arithmetic_follows_precedence() {
    assert_prints("print 1 + 2 * 3;", &["7"]);
    assert_prints("print (1 + 2) * 3;", &["9"]);
    assert_prints("print 10 / 4;", &["2.5"]);
    assert_prints("print -3 + 1;", &["-2"]);
}

#[test]
fn modulo_is_floored() {
    assert_prints("print 7 % 3;", &["1"]);
    assert_prints("print -7 % 3;", &["2"]);
}

#[test]
fn plus_concatenates_strings_only_with_strings() {
    assert_prints("print \"foo\" + \"bar\";", &["foobar"]);
    assert_runtime_error(
        "print \"a\" + 1;",
        "Operands must be two numbers or two strings.",
    );
    assert_runtime_error(
        "print 1 + \"a\";",
        "Operands must be two numbers or two strings.",
    );
}

#[test]
fn arithmetic_rejects_non_numbers() {
    assert_runtime_error("print \"a\" * 2;", "Operands must be numbers.");
    assert_runtime_error("print \"a\" < \"b\";", "Operands must be numbers.");
    assert_runtime_error("print -\"a\";", "Operand must be a number.");
}

#[test]
fn division_and_modulo_by_zero_fail() {
    assert_runtime_error("print 1 / 0;", "Division by zero.");
    assert_runtime_error("print 1 % 0;", "Division by zero.");
}

#[test]
fn equality_never_coerces() {
    assert_prints("print 1 == \"1\";", &["false"]);
    assert_prints("print nil == false;", &["false"]);
    assert_prints("print nil == nil;", &["true"]);
    assert_prints("print \"a\" != \"b\";", &["true"]);
}

#[test]
fn logical_operators_yield_the_determining_operand() {
    assert_prints("print 0 or 2;", &["0"]); // 0 is truthy
    assert_prints("print nil or \"fallback\";", &["fallback"]);
    assert_prints("print nil and 1;", &["nil"]);
    assert_prints("print 1 and \"second\";", &["second"]);
}

#[test]
fn ternary_selects_by_truthiness() {
    assert_prints("print true ? \"yes\" : \"no\";", &["yes"]);
    assert_prints("print nil ? \"yes\" : \"no\";", &["no"]);
}

// ───────────────────────── variables & control flow ─────────────────────────

#[test]
fn undefined_variable_access_fails() {
    assert_runtime_error("print missing;", "Undefined variable 'missing'.");
    assert_runtime_error("missing = 1;", "Undefined variable 'missing'.");
}

#[test]
fn uninitialized_variables_default_to_nil() {
    assert_prints("var x; print x;", &["nil"]);
}

#[test]
fn for_loop_desugaring_executes() {
    assert_prints(
        "var sum = 0; for (var i = 0; i < 5; i = i + 1) sum = sum + i; print sum;",
        &["10"],
    );
}

#[test]
fn break_exits_only_the_innermost_loop() {
    assert_prints(
        "var result = \"\";
         var i = 0;
         while (i < 3) {
           var j = 0;
           while (j < 3) {
             if (j == 1) break;
             result = result + \"x\";
             j = j + 1;
           }
           i = i + 1;
         }
         print result;",
        &["xxx"],
    );
}

#[test]
fn break_in_a_for_loop() {
    assert_prints(
        "var n = 0; for (;;) { n = n + 1; if (n == 4) break; } print n;",
        &["4"],
    );
}

// ───────────────────────── functions & closures ─────────────────────────

#[test]
fn closure_counters_are_independent() {
    assert_prints(
        "fun makeCounter() {
           var i = 0;
           fun count() {
             i = i + 1;
             return i;
           }
           return count;
         }
         var a = makeCounter();
         var b = makeCounter();
         print a();
         print a();
         print b();",
        &["1", "2", "1"],
    );
}

#[test]
fn closures_capture_lexically() {
    assert_prints(
        "var a = \"global\";
         {
           fun show() { print a; }
           show();
           var a = \"block\";
           show();
         }",
        &["global", "global"],
    );
}

#[test]
fn recursion_works() {
    assert_prints(
        "fun fib(n) {
           if (n < 2) return n;
           return fib(n - 2) + fib(n - 1);
         }
         print fib(10);",
        &["55"],
    );
}

#[test]
fn functions_without_return_yield_nil() {
    assert_prints("fun f() {} print f();", &["nil"]);
}

#[test]
fn arity_is_exact() {
    assert_runtime_error(
        "fun f(a, b) { return a; } f(1);",
        "Expected 2 arguments but got 1.",
    );
    assert_runtime_error(
        "fun f() {} f(1);",
        "Expected 0 arguments but got 1.",
    );
}

#[test]
fn only_functions_and_classes_are_callable() {
    assert_runtime_error("\"not a function\"();", "Can only call functions and classes.");
}

#[test]
fn runtime_errors_carry_the_active_call_frames() {
    let errors = run(
        "fun inner() { return 1 + \"x\"; }
         fun outer() { return inner(); }
         outer();",
    )
    .expect_err("expected a runtime error");

    match &errors[0] {
        LoxError::Runtime { trace, .. } => {
            assert_eq!(trace, &["inner".to_string(), "outer".to_string()]);
        }
        other => panic!("expected runtime error, got {other:?}"),
    }
}

// ───────────────────────── classes ─────────────────────────

#[test]
fn fields_and_methods_work_through_this() {
    assert_prints(
        "class Counter {
           init() { this.n = 0; }
           bump() { this.n = this.n + 1; return this.n; }
         }
         var c = Counter();
         c.bump();
         print c.bump();",
        &["2"],
    );
}

#[test]
fn fields_shadow_methods() {
    assert_prints(
        "class A { m() { return \"method\"; } }
         var a = A();
         a.m = \"field\";
         print a.m;",
        &["field"],
    );
}

#[test]
fn undefined_property_access_fails() {
    assert_runtime_error("class A {} print A().nope;", "Undefined property 'nope'.");
}

#[test]
fn only_instances_have_fields() {
    assert_runtime_error("var x = 1; x.y = 2;", "Only instances have fields.");
    assert_runtime_error("print 1 .y;", "Only instances have properties.");
}

#[test]
fn init_always_returns_the_instance() {
    assert_prints(
        "class P { init() { this.x = 1; return; } }
         var p = P();
         print p;
         print p.init() == p;",
        &["P instance", "true"],
    );
}

#[test]
fn superclass_must_be_a_class() {
    assert_runtime_error("var NotAClass = 1; class A < NotAClass {}", "Superclass must be a class.");
}

#[test]
fn super_resolves_against_the_lexically_enclosing_class() {
    // test() comes from B, so super there is A even when the receiver is a C.
    assert_prints(
        "class A { method() { print \"A\"; } }
         class B < A {
           method() { print \"B\"; }
           test() { super.method(); }
         }
         class C < B {}
         C().test();",
        &["A"],
    );
}

#[test]
fn inherited_methods_dispatch_on_the_runtime_class() {
    assert_prints(
        "class A {
           name() { return \"A\"; }
           describe() { return this.name(); }
         }
         class B < A { name() { return \"B\"; } }
         print B().describe();",
        &["B"],
    );
}

#[test]
fn bound_methods_remember_their_receiver() {
    assert_prints(
        "class Greeter {
           init(name) { this.name = name; }
           greet() { print this.name; }
         }
         var m = Greeter(\"alice\").greet;
         m();",
        &["alice"],
    );
}

// ───────────────────────── getters & class methods ─────────────────────────

#[test]
fn getters_are_invoked_on_property_access() {
    assert_prints(
        "class Circle {
           init(r) { this.r = r; }
           area { return this.r * this.r * 3; }
         }
         print Circle(2).area;",
        &["12"],
    );
}

#[test]
fn a_method_overrides_an_inherited_getter_of_the_same_name() {
    assert_prints(
        "class B { m { return \"getter B\"; } }
         class C < B { m() { return \"method C\"; } }
         print C().m();",
        &["method C"],
    );
}

#[test]
fn a_getter_overrides_an_inherited_method_of_the_same_name() {
    assert_prints(
        "class B { m() { return \"method B\"; } }
         class C < B { m { return \"getter C\"; } }
         print C().m;",
        &["getter C"],
    );
}

#[test]
fn class_methods_are_called_on_the_class_value() {
    assert_prints(
        "class Math {
           class square(n) { return n * n; }
         }
         print Math.square(3);",
        &["9"],
    );
}

// ───────────────────────── traits ─────────────────────────

#[test]
fn traits_contribute_methods_to_classes() {
    assert_prints(
        "trait Greeter { greet() { return \"hello \" + this.name; } }
         class Person with Greeter {
           init(name) { this.name = name; }
         }
         print Person(\"bob\").greet();",
        &["hello bob"],
    );
}

#[test]
fn later_traits_override_earlier_ones() {
    assert_prints(
        "trait T1 { m() { return \"T1\"; } }
         trait T2 { m() { return \"T2\"; } }
         class A with T1, T2 {}
         print A().m();",
        &["T2"],
    );
}

#[test]
fn own_methods_override_trait_methods() {
    assert_prints(
        "trait T1 { m() { return \"T1\"; } }
         trait T2 { m() { return \"T2\"; } }
         class A with T1, T2 { m() { return \"own\"; } }
         print A().m();",
        &["own"],
    );
}

#[test]
fn traits_compose_into_other_traits() {
    assert_prints(
        "trait Base { a() { return 1; } }
         trait Extended with Base { b() { return 2; } }
         class C with Extended {}
         var c = C();
         print c.a() + c.b();",
        &["3"],
    );
}

#[test]
fn a_trait_cannot_redeclare_a_composed_method() {
    assert_runtime_error(
        "trait Base { m() { return 1; } }
         trait Bad with Base { m() { return 2; } }",
        "A previous trait declares a method named 'm'.",
    );
}

#[test]
fn with_clause_value_must_be_a_trait_at_runtime() {
    // The name was declared as a trait, then shadowed by a plain value.
    assert_runtime_error(
        "trait T { m() { return 1; } }
         var T = 2;
         class A with T {}",
        "T is not a trait.",
    );
}

#[test]
fn a_later_trait_method_overrides_an_earlier_trait_getter() {
    assert_prints(
        "trait T1 { m { return \"T1 getter\"; } }
         trait T2 { m() { return \"T2 method\"; } }
         class A with T1, T2 {}
         print A().m();",
        &["T2 method"],
    );
}

#[test]
fn an_own_getter_overrides_a_trait_method_of_the_same_name() {
    assert_prints(
        "trait T { m() { return \"trait method\"; } }
         class A with T { m { return \"own getter\"; } }
         print A().m;",
        &["own getter"],
    );
}

#[test]
fn trait_getters_flatten_into_classes() {
    assert_prints(
        "trait Sized { size { return 5; } }
         class Box with Sized {}
         print Box().size;",
        &["5"],
    );
}

// ───────────────────────── natives & arrays ─────────────────────────

#[test]
fn math_natives_are_available() {
    assert_prints("print sqrt(16);", &["4"]);
    assert_prints("print pow(2, 10);", &["1024"]);
    assert_prints("print min(3, 7) + max(3, 7);", &["10"]);
    assert_prints("print floor(2.7) + ceil(2.1);", &["5"]);
    assert_prints("print abs(-4);", &["4"]);
}

#[test]
fn sum_adds_up_an_array() {
    assert_prints(
        "var a = Array(3);
         a.set(0, 1);
         a.set(1, 2);
         a.set(2, 3);
         print sum(a);",
        &["6"],
    );
    assert_runtime_error("sum(1);", "Argument to sum() must be an array.");
    assert_runtime_error("sum(Array(1));", "All array elements must be numbers.");
}

#[test]
fn clock_returns_a_number() {
    assert_prints("print clock() > 0;", &["true"]);
}

#[test]
fn random_stays_in_unit_range() {
    assert_prints(
        "var r = random();
         print r >= 0 and r < 1;
         var s = randomrange(5, 6);
         print s >= 5 and s < 6;",
        &["true", "true"],
    );
}

#[test]
fn natives_reject_bad_arguments() {
    assert_runtime_error("print sqrt(\"x\");", "must be a number");
    assert_runtime_error("print sqrt(1, 2);", "Expected 1 arguments but got 2.");
}

#[test]
fn arrays_allocate_independently_with_nil_defaults() {
    assert_prints(
        "var a = Array(3);
         var b = Array(3);
         a.set(1, 5);
         print a.length;
         print a.get(1);
         print b.get(1);
         print a.get(0);",
        &["3", "5", "nil", "nil"],
    );
}

#[test]
fn array_access_is_bounds_checked() {
    assert_runtime_error("Array(2).get(2);", "out of bounds");
    assert_runtime_error("Array(2).set(5, 1);", "out of bounds");
    assert_runtime_error("Array(2).get(-1);", "non-negative integer");
}

#[test]
fn array_size_must_be_a_non_negative_integer() {
    assert_runtime_error("Array(-1);", "non-negative integer");
    assert_runtime_error("Array(2.5);", "non-negative integer");
}

#[test]
fn array_accessors_are_first_class() {
    assert_prints(
        "var a = Array(1);
         var put = a.set;
         put(0, 9);
         print a.get(0);",
        &["9"],
    );
}

// ───────────────────────── pipeline behavior ─────────────────────────

#[test]
fn static_errors_block_execution() {
    let errors = run("print \"runs\"; return 1;").expect_err("expected static errors");

    assert_eq!(errors.len(), 1);
    assert!(!errors[0].is_runtime());
}

#[test]
fn all_static_stages_report_together() {
    // One lex error, one parse error, one resolve error.
    let errors = run("var @ = 1; var x = ; break;").expect_err("expected static errors");
    assert!(errors.len() >= 3, "got {errors:?}");
}

#[test]
fn printed_numbers_drop_integral_fraction() {
    assert_prints("print 1 + 2;", &["3"]);
    assert_prints("print 0.5 + 0.25;", &["0.75"]);
}
