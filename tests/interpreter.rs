#[cfg(test)]
mod interpreter_tests {
    use rlox::error::LoxError;
    use rlox::interpreter::{Interpreter, SharedOutput};
    use rlox::parser::Parser;
    use rlox::resolver::Resolver;
    use rlox::scanner::scan;

    /// Run `source` through the whole pipeline, capturing `print` output.
    /// Panics on static errors; returns the output plus any runtime error.
    fn run(source: &str) -> (String, Option<LoxError>) {
        let buf = SharedOutput::default();

        let (tokens, lex_errors) = scan(source.as_bytes());
        assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);

        let mut parser = Parser::new(&tokens);
        let (statements, parse_errors) = parser.parse();
        assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);

        let (locals, resolve_errors) = Resolver::new().resolve(&statements);
        assert!(resolve_errors.is_empty(), "resolve errors: {:?}", resolve_errors);

        let mut interpreter = Interpreter::with_output(Box::new(buf.clone()));
        let result = interpreter.interpret(&statements, locals);

        (buf.contents(), result.err())
    }

    /// Like [`run`] but asserts the program completes without error.
    fn run_ok(source: &str) -> String {
        let (output, error) = run(source);
        assert!(error.is_none(), "unexpected runtime error: {:?}", error);

        output
    }

    #[test]
    fn test_interp_01_block_scoping() {
        // Shadowed inner `a` initializes from the global, prints, and is
        // discarded when the block exits.
        let output = run_ok("var a = 1; { var a = a + 1; print a; } print a;");

        assert_eq!(output, "2\n1\n");
    }

    #[test]
    fn test_interp_02_closure_counter() {
        let output = run_ok(
            "fun makeCounter() { var i = 0; fun count() { i = i + 1; print i; } return count; } \
             var counter = makeCounter(); counter(); counter();",
        );

        assert_eq!(output, "1\n2\n");
    }

    #[test]
    fn test_interp_03_string_plus_number_is_a_type_error() {
        let (output, error) = run("print \"a\" + 1;");

        assert_eq!(output, "", "nothing may print before the error");

        let msg = error.expect("expected a runtime error").to_string();
        assert!(
            msg.contains("Operands must be two numbers or two strings."),
            "got: {}",
            msg
        );
        assert!(msg.contains("Runtime Error"), "got: {}", msg);
        assert!(msg.contains("at '+'"), "got: {}", msg);
    }

    #[test]
    fn test_interp_04_division_by_zero() {
        let (output, error) = run("print 1 / 0;");

        assert_eq!(output, "");

        let msg = error.expect("expected a runtime error").to_string();
        assert!(msg.contains("Division by zero."), "got: {}", msg);
    }

    #[test]
    fn test_interp_05_string_concatenation() {
        assert_eq!(run_ok("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn test_interp_06_arithmetic_and_number_formatting() {
        let output = run_ok("print 1 + 2 * 3; print 10 / 4; print -3;");

        assert_eq!(output, "7\n2.5\n-3\n");
    }

    #[test]
    fn test_interp_07_truthiness() {
        // Only nil and false are falsy; 0 and "" are truthy.
        let output = run_ok(
            "if (0) print \"zero\"; \
             if (\"\") print \"empty\"; \
             if (nil) print \"nil\"; else print \"nil is falsy\"; \
             if (false) print \"false\"; else print \"false is falsy\";",
        );

        assert_eq!(output, "zero\nempty\nnil is falsy\nfalse is falsy\n");
    }

    #[test]
    fn test_interp_08_equality_has_no_coercion() {
        let output = run_ok(
            "print 1 == 1; print 1 == \"1\"; print nil == nil; \
             print nil == false; print \"a\" != \"b\";",
        );

        assert_eq!(output, "true\nfalse\ntrue\nfalse\ntrue\n");
    }

    #[test]
    fn test_interp_09_logical_operators_return_operands() {
        let output = run_ok(
            "print \"hi\" or 2; print nil or \"yes\"; \
             print nil and 1; print 1 and 2;",
        );

        assert_eq!(output, "hi\nyes\nnil\n2\n");
    }

    #[test]
    fn test_interp_10_short_circuit_skips_right_operand() {
        let output = run_ok(
            "var called = false; \
             fun mark() { called = true; return true; } \
             var r = false and mark(); \
             print called; \
             r = true or mark(); \
             print called;",
        );

        assert_eq!(output, "false\nfalse\n");
    }

    #[test]
    fn test_interp_11_while_loop() {
        let output = run_ok("var i = 0; while (i < 3) { print i; i = i + 1; }");

        assert_eq!(output, "0\n1\n2\n");
    }

    #[test]
    fn test_interp_12_for_loop_desugaring_runs() {
        let output = run_ok("for (var i = 0; i < 3; i = i + 1) print i;");

        assert_eq!(output, "0\n1\n2\n");
    }

    #[test]
    fn test_interp_13_function_without_return_yields_nil() {
        let output = run_ok("fun f() { 1 + 1; } print f();");

        assert_eq!(output, "nil\n");
    }

    #[test]
    fn test_interp_14_return_unwinds_nested_blocks_and_loops() {
        let output = run_ok(
            "fun first(list) { while (true) { { return list; } } } \
             print first(7);",
        );

        assert_eq!(output, "7\n");
    }

    #[test]
    fn test_interp_15_recursion() {
        let output = run_ok(
            "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } \
             print fib(10);",
        );

        assert_eq!(output, "55\n");
    }

    #[test]
    fn test_interp_16_arity_mismatch() {
        let (output, error) = run("fun f(a, b) { return a; } f(1);");

        assert_eq!(output, "");

        let msg = error.expect("expected a runtime error").to_string();
        assert!(msg.contains("Expected 2 arguments but got 1."), "got: {}", msg);
    }

    #[test]
    fn test_interp_17_calling_a_non_callable() {
        let (_, error) = run("var x = 1; x();");

        let msg = error.expect("expected a runtime error").to_string();
        assert!(
            msg.contains("Can only call functions and classes."),
            "got: {}",
            msg
        );
    }

    #[test]
    fn test_interp_18_undefined_variable() {
        let (_, error) = run("print missing;");

        let msg = error.expect("expected a runtime error").to_string();
        assert!(msg.contains("Undefined variable 'missing'."), "got: {}", msg);
        assert!(msg.contains("at 'missing'"), "got: {}", msg);
    }

    #[test]
    fn test_interp_19_global_forward_reference_from_function_body() {
        // Bodies may mention globals defined later, as long as the call
        // happens after the definition.
        let output = run_ok(
            "fun show() { print late; } \
             var late = \"here\"; \
             show();",
        );

        assert_eq!(output, "here\n");
    }

    #[test]
    fn test_interp_20_print_value_formats() {
        let output = run_ok(
            "fun f() {} \
             print nil; print true; print 2.5; print 4; print \"s\"; \
             print f; print clock;",
        );

        assert_eq!(output, "nil\ntrue\n2.5\n4\ns\n<fn f>\n<native fn>\n");
    }

    #[test]
    fn test_interp_21_clock_returns_a_number() {
        let output = run_ok("print clock() >= 0;");

        assert_eq!(output, "true\n");
    }

    #[test]
    fn test_interp_22_runtime_error_stops_remaining_statements() {
        let (output, error) = run("print 1; print \"a\" + 1; print 2;");

        assert_eq!(output, "1\n", "statements after the fault must not run");
        assert!(error.is_some());
    }

    #[test]
    fn test_interp_23_environment_restored_after_runtime_error_in_block() {
        // The failing block unwinds, but the interpreter stays usable and
        // the enclosing environment is current again.
        let buf = SharedOutput::default();

        let (tokens, lex_errors) = scan(b"var a = 1; { var a = 2; print a + nil; }");
        assert!(lex_errors.is_empty());

        // Follow-up line, parsed with continued ids as a REPL would.
        let (tokens2, lex_errors2) = scan(b"print a;");
        assert!(lex_errors2.is_empty());

        let mut parser = Parser::new(&tokens);
        let (statements, parse_errors) = parser.parse();
        assert!(parse_errors.is_empty());

        let mut parser2 = Parser::with_start_id(&tokens2, parser.next_id());
        let (statements2, parse_errors2) = parser2.parse();
        assert!(parse_errors2.is_empty());

        let (locals, resolve_errors) = Resolver::new().resolve(&statements);
        assert!(resolve_errors.is_empty());
        let (locals2, _) = Resolver::new().resolve(&statements2);

        let mut interpreter = Interpreter::with_output(Box::new(buf.clone()));
        assert!(interpreter.interpret(&statements, locals).is_err());

        // The follow-up sees the global `a`, not the dead block-local.
        assert!(interpreter.interpret(&statements2, locals2).is_ok());

        assert_eq!(buf.contents(), "1\n");
    }

    #[test]
    fn test_interp_24_sibling_closures_share_an_environment() {
        let output = run_ok(
            "fun pair() { var n = 0; fun bump() { n = n + 1; } fun get() { print n; } \
             bump(); bump(); get(); } \
             pair();",
        );

        assert_eq!(output, "2\n");
    }

    #[test]
    fn test_interp_25_interpret_is_idempotent_with_fresh_environments() {
        let source = "var total = 0; \
                      fun add(n) { total = total + n; return total; } \
                      print add(1); print add(2); print add(3);";

        let (tokens, lex_errors) = scan(source.as_bytes());
        assert!(lex_errors.is_empty());

        let mut parser = Parser::new(&tokens);
        let (statements, parse_errors) = parser.parse();
        assert!(parse_errors.is_empty());

        // Same parse, two resolve+interpret rounds with fresh environments.
        let mut outputs = Vec::new();
        for _ in 0..2 {
            let buf = SharedOutput::default();

            let (locals, resolve_errors) = Resolver::new().resolve(&statements);
            assert!(resolve_errors.is_empty());

            let mut interpreter = Interpreter::with_output(Box::new(buf.clone()));
            interpreter
                .interpret(&statements, locals)
                .expect("program should run");

            outputs.push(buf.contents());
        }

        assert_eq!(outputs[0], "1\n3\n6\n");
        assert_eq!(outputs[0], outputs[1]);
    }
}
