#[cfg(test)]
mod interpreter_tests {
    use rox::error::LoxError;
    use rox::runner::Lox;

    fn output_of(lox: &Lox<Vec<u8>>) -> String {
        String::from_utf8(lox.output().clone()).unwrap()
    }

    fn check_output(source: &str, expected: &[&str]) {
        let mut lox = Lox::with_output(Vec::new());

        if let Err(e) = lox.run(source) {
            panic!("run failed: {}", e);
        }

        let printed = output_of(&lox);
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(lines, expected);
    }

    fn check_error(source: &str, expected: &str) -> LoxError {
        let mut lox = Lox::with_output(Vec::new());
        let err = lox.run(source).unwrap_err();

        assert!(
            err.to_string().contains(expected),
            "expected error containing {:?}, got {:?}",
            expected,
            err.to_string()
        );
        err
    }

    // ── scoping ──────────────────────────────────────────────────────────

    #[test]
    fn test_block_shadowing() {
        check_output(
            "var a = 1;\n\
             { var a = 2; print a; }\n\
             print a;",
            &["2", "1"],
        );
    }

    #[test]
    fn test_closure_sees_declaration_scope() {
        check_output(
            "var a = \"global\";\n\
             {\n\
               fun show() { print a; }\n\
               show();\n\
               var a = \"block\";\n\
               show();\n\
             }",
            &["global", "global"],
        );
    }

    #[test]
    fn test_closure_counters_are_independent() {
        check_output(
            "fun makeCounter() {\n\
               var i = 0;\n\
               fun count() { i = i + 1; return i; }\n\
               return count;\n\
             }\n\
             var a = makeCounter();\n\
             var b = makeCounter();\n\
             print a();\n\
             print a();\n\
             print b();",
            &["1", "2", "1"],
        );
    }

    #[test]
    fn test_lambda_and_recursion() {
        check_output(
            "fun fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }\n\
             print fib(10);\n\
             var twice = fun (f, x) { return f(f(x)); };\n\
             print twice(fun (n) { return n * 3; }, 2);\n\
             print twice;",
            &["55", "18", "<fn>"],
        );
    }

    // ── control flow ─────────────────────────────────────────────────────

    #[test]
    fn test_for_continue_runs_increment() {
        check_output(
            "for (var i = 0; i < 5; i = i + 1) {\n\
               if (i == 2) continue;\n\
               print i;\n\
             }",
            &["0", "1", "3", "4"],
        );
    }

    #[test]
    fn test_nested_break_exits_inner_loop_only() {
        check_output(
            "for (var i = 0; i < 2; i = i + 1) {\n\
               var j = 0;\n\
               while (true) {\n\
                 if (j == 2) break;\n\
                 print i * 10 + j;\n\
                 j = j + 1;\n\
               }\n\
             }",
            &["0", "1", "10", "11"],
        );
    }

    #[test]
    fn test_return_from_inside_loop() {
        check_output(
            "fun first(n) {\n\
               var i = 0;\n\
               while (true) {\n\
                 if (i * i >= n) return i;\n\
                 i = i + 1;\n\
               }\n\
             }\n\
             print first(10);",
            &["4"],
        );
    }

    #[test]
    fn test_logical_operators_return_operands() {
        check_output(
            "print nil or \"yes\";\n\
             print 0 and \"zero is truthy\";\n\
             print false and undefinedName;\n\
             print \"\" ? \"empty string is truthy\" : \"no\";",
            &["yes", "zero is truthy", "false", "empty string is truthy"],
        );
    }

    // ── values ───────────────────────────────────────────────────────────

    #[test]
    fn test_plus_concatenation() {
        check_output(
            "print \"a\" + \"b\";\n\
             print \"n=\" + 3;\n\
             print 1.5 + \"!\";\n\
             print \"is \" + nil;\n\
             print 1 + 2;",
            &["ab", "n=3", "1.5!", "is nil", "3"],
        );
    }

    #[test]
    fn test_equality() {
        check_output(
            "print 1 == 1;\n\
             print 1 == \"1\";\n\
             print nil == false;\n\
             print nil == nil;\n\
             print \"a\" + \"b\" == \"ab\";\n\
             fun f() {}\n\
             var g = f;\n\
             print f == g;\n\
             class A {}\n\
             print A() == A();",
            &["true", "false", "false", "true", "true", "true", "false"],
        );
    }

    #[test]
    fn test_number_formatting() {
        check_output(
            "print 10 / 4;\n\
             print 3 * 2;\n\
             print -0.5;",
            &["2.5", "6", "-0.5"],
        );
    }

    #[test]
    fn test_clock_is_native() {
        check_output(
            "print clock;\n\
             print clock() > 0;",
            &["<native fn clock>", "true"],
        );
    }

    // ── classes ──────────────────────────────────────────────────────────

    #[test]
    fn test_fields_and_methods() {
        check_output(
            "class Point {\n\
               init(x, y) { this.x = x; this.y = y; }\n\
               sum() { return this.x + this.y; }\n\
             }\n\
             var p = Point(1, 2);\n\
             print p.sum();\n\
             p.x = 10;\n\
             print p.sum();\n\
             print p;\n\
             print Point;",
            &["3", "12", "Point instance", "Point"],
        );
    }

    #[test]
    fn test_fields_shadow_methods() {
        check_output(
            "class A { m() { return \"method\"; } }\n\
             var a = A();\n\
             print a.m();\n\
             a.m = fun () { return \"field\"; };\n\
             print a.m();",
            &["method", "field"],
        );
    }

    #[test]
    fn test_bound_method_keeps_receiver() {
        check_output(
            "class Box { init(v) { this.v = v; } get() { return this.v; } }\n\
             var g = Box(7).get;\n\
             print g();",
            &["7"],
        );
    }

    #[test]
    fn test_super_dispatch_keeps_this() {
        check_output(
            "class A {\n\
               name() { return \"A\"; }\n\
               hello() { return \"hello from \" + this.name(); }\n\
             }\n\
             class B < A {\n\
               name() { return \"B\"; }\n\
               hello() { return super.hello() + \"!\"; }\n\
             }\n\
             print B().hello();",
            &["hello from B!"],
        );
    }

    #[test]
    fn test_inherited_init() {
        check_output(
            "class A { init(v) { this.v = v; } }\n\
             class B < A {}\n\
             print B(5).v;",
            &["5"],
        );
    }

    #[test]
    fn test_init_with_bare_return_yields_instance() {
        check_output(
            "class A {\n\
               init() { this.ok = true; return; this.ok = false; }\n\
             }\n\
             var a = A();\n\
             print a.ok;\n\
             print a.init() == a;",
            &["true", "true"],
        );
    }

    // ── runtime errors ───────────────────────────────────────────────────

    #[test]
    fn test_arity_mismatch() {
        let err = check_error(
            "fun f(a, b) {}\nf(1);",
            "Expected 2 arguments but got 1.",
        );
        assert!(matches!(err, LoxError::Runtime { line: 2, .. }));
        assert_eq!(err.exit_code(), 70);

        check_error("class A { init(x) {} }\nA();", "Expected 1 arguments but got 0.");
    }

    #[test]
    fn test_undefined_variable() {
        let err = check_error("print nope;", "Undefined variable 'nope'.");
        assert_eq!(err.to_string(), "[line 1] Runtime error: Undefined variable 'nope'.");
    }

    #[test]
    fn test_assignment_does_not_create_globals() {
        check_error("ghost = 1;", "Undefined variable 'ghost'.");
    }

    #[test]
    fn test_operand_type_errors() {
        check_error("print -\"a\";", "Operand must be a number.");
        check_error("print 1 < \"2\";", "Operands must be numbers.");
        check_error("print true + 1;", "Operands must be two numbers or at least one string.");
        check_error("print 1 / 0;", "Division by zero.");
    }

    #[test]
    fn test_call_and_property_errors() {
        check_error("\"str\"();", "Can only call functions and classes.");
        check_error("var x = 1; print x.y;", "Only instances have properties.");
        check_error("var x = 1; x.y = 2;", "Only instances have fields.");
        check_error("class A {} print A().missing;", "Undefined property 'missing'.");
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        check_error("var NotClass = 1;\nclass B < NotClass {}", "Superclass must be a class.");
    }

    #[test]
    fn test_output_before_error_is_kept() {
        let mut lox = Lox::with_output(Vec::new());

        assert!(lox.run("print 1;\nprint nope;\nprint 2;").is_err());
        assert_eq!(output_of(&lox), "1\n");
    }

    #[test]
    fn test_static_error_prevents_execution() {
        let mut lox = Lox::with_output(Vec::new());

        let err = lox.run("print 1;\nreturn 2;").unwrap_err();
        assert!(matches!(err, LoxError::Resolve { .. }));
        assert_eq!(err.exit_code(), 65);
        assert_eq!(output_of(&lox), "");
    }

    // ── sessions ─────────────────────────────────────────────────────────

    #[test]
    fn test_session_state_persists_across_runs() {
        let mut lox = Lox::with_output(Vec::new());

        lox.run("var count = 0;").unwrap();
        lox.run("fun bump() { count = count + 1; return count; }").unwrap();
        lox.run("print bump();").unwrap();
        lox.run("print bump();").unwrap();

        assert_eq!(output_of(&lox), "1\n2\n");
    }

    #[test]
    fn test_closure_from_earlier_run_still_resolves() {
        let mut lox = Lox::with_output(Vec::new());

        lox.run("fun make() { var n = 41; return fun () { n = n + 1; return n; }; }")
            .unwrap();
        lox.run("var next = make();").unwrap();
        lox.run("{ var n = 0; print next(); }").unwrap();
        lox.run("print next();").unwrap();

        assert_eq!(output_of(&lox), "42\n43\n");
    }

    #[test]
    fn test_session_survives_errors() {
        let mut lox = Lox::with_output(Vec::new());

        lox.run("var a = 1;").unwrap();
        assert!(lox.run("{ var b = 2; print missing; }").is_err());
        assert!(lox.run("print (;").is_err());
        lox.run("print a;").unwrap();

        assert_eq!(output_of(&lox), "1\n");
    }
}
