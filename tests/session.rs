#[cfg(test)]
mod session_tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use treelox as lox;

    use lox::session::{RunError, Session};

    struct Harness {
        output: Rc<RefCell<Vec<u8>>>,
        session: Session,
    }

    impl Harness {
        fn new() -> Self {
            let output = Rc::new(RefCell::new(Vec::new()));
            let session = Session::with_output(output.clone());

            Self { output, session }
        }

        /// Runs one unit and drains whatever it printed.
        fn run(&mut self, source: &str) -> (String, Result<(), RunError>) {
            let result = self.session.run(source);
            let text = String::from_utf8(self.output.take()).expect("output should be UTF-8");

            (text, result)
        }
    }

    fn static_errors(result: Result<(), RunError>) -> Vec<String> {
        match result {
            Err(RunError::Static(errors)) => errors.iter().map(ToString::to_string).collect(),
            other => panic!("expected static errors, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_suppresses_all_output() {
        let mut harness = Harness::new();

        let (text, result) = harness.run("print 1;\nprint ;\nprint 2;");

        assert_eq!(text, "");
        assert_eq!(
            static_errors(result),
            vec!["[line 2] Error at ';': Expected expression."]
        );
    }

    #[test]
    fn test_resolve_error_suppresses_all_output() {
        let mut harness = Harness::new();

        let (text, result) = harness.run("print \"before\";\nreturn 1;");

        assert_eq!(text, "");
        assert_eq!(
            static_errors(result),
            vec!["[line 2] Error at 'return': Cannot return from top-level code."]
        );
    }

    #[test]
    fn test_lexical_and_syntax_errors_are_reported_together() {
        let mut harness = Harness::new();

        let (text, result) = harness.run("print 1;\n@\nvar = 2;");

        assert_eq!(text, "");
        assert_eq!(
            static_errors(result),
            vec![
                "[line 2] Error: Unexpected character: @",
                "[line 3] Error at '=': Expected variable name.",
            ]
        );
    }

    #[test]
    fn test_lexical_error_alone_suppresses_execution() {
        let mut harness = Harness::new();

        let (text, result) = harness.run("print 1; #");

        assert_eq!(text, "");
        let error = result.expect_err("lexical error should fail the unit");
        assert_eq!(error.exit_code(), 65);
        assert_eq!(error.diagnostics().len(), 1);
    }

    #[test]
    fn test_globals_persist_across_units() {
        let mut harness = Harness::new();

        harness.run("var greeting = \"hello\";").1.expect("should run");
        harness.run("fun shout(s) { return s + \"!\"; }").1.expect("should run");
        harness.run("class Box { init(v) { this.v = v; } }").1.expect("should run");

        let (text, result) = harness.run("print shout(greeting); print Box(3).v;");

        assert!(result.is_ok());
        assert_eq!(text, "hello!\n3\n");
    }

    #[test]
    fn test_errors_do_not_poison_later_units() {
        let mut harness = Harness::new();

        harness.run("var count = 1;").1.expect("should run");

        let (_, result) = harness.run("print count +;");
        assert_eq!(result.expect_err("syntax error").exit_code(), 65);

        let (_, result) = harness.run("count = count + 1; print -\"x\";");
        assert_eq!(result.expect_err("runtime error").exit_code(), 70);

        // The assignment before the runtime error stuck; the failed units
        // left nothing else behind.
        let (text, result) = harness.run("print count;");
        assert!(result.is_ok());
        assert_eq!(text, "2\n");
    }

    #[test]
    fn test_runtime_error_inside_block_restores_global_scope() {
        let mut harness = Harness::new();

        let (_, result) = harness.run("{ var local = 1; print -local + nil; }");
        assert!(matches!(result, Err(RunError::Runtime(_))));

        let (text, result) = harness.run("var x = \"top\"; print x;");
        assert!(result.is_ok());
        assert_eq!(text, "top\n");

        let (_, result) = harness.run("print local;");
        match result {
            Err(RunError::Runtime(e)) => {
                assert_eq!(e.to_string(), "Undefined variable 'local'.\n[line 1]")
            }
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_closure_from_earlier_unit_keeps_its_bindings() {
        let mut harness = Harness::new();

        harness
            .run(
                "fun makeAdder(n) {
                   fun add(x) { return x + n; }
                   return add;
                 }
                 var addTwo = makeAdder(2);",
            )
            .1
            .expect("should run");

        let (text, result) = harness.run("{ var n = 100; print addTwo(1); }");

        assert!(result.is_ok());
        assert_eq!(text, "3\n");
    }

    #[test]
    fn test_shadowed_self_reference_is_rejected() {
        let mut harness = Harness::new();

        let (text, result) = harness.run("var a = \"outer\"; { var a = a; }");

        assert_eq!(text, "");
        assert_eq!(
            static_errors(result),
            vec!["[line 1] Error at 'a': Cannot read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_mixed_plus_prints_nothing() {
        let mut harness = Harness::new();

        let (text, result) = harness.run("print 1 + \"b\";");

        assert_eq!(text, "");
        assert!(matches!(result, Err(RunError::Runtime(_))));
    }

    #[test]
    fn test_for_matches_its_expansion() {
        let mut harness = Harness::new();

        let (desugared, result) =
            harness.run("for (var i = 0; i < 4; i = i + 1) { print i * i; }");
        assert!(result.is_ok());

        let (expanded, result) =
            harness.run("{ var i = 0; while (i < 4) { { print i * i; } i = i + 1; } }");
        assert!(result.is_ok());

        assert_eq!(desugared, "0\n1\n4\n9\n");
        assert_eq!(desugared, expanded);
    }

    #[test]
    fn test_class_init_round_trip() {
        let mut harness = Harness::new();

        let (text, result) = harness.run(
            "class Greeter {
               init(x) { this.x = x; }
               greet() { return \"Hello, \" + this.x + \"!\"; }
             }
             print Greeter(\"world\").greet();",
        );
        assert!(result.is_ok());
        assert_eq!(text, "Hello, world!\n");

        let (text, result) = harness.run("Greeter();");
        assert_eq!(text, "");
        match result {
            Err(RunError::Runtime(e)) => {
                assert_eq!(e.message(), "Expected 1 arguments but got 0.")
            }
            other => panic!("expected arity error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejected_units_leave_no_bindings() {
        let mut harness = Harness::new();

        let (_, result) = harness.run("{ var a = 1; print a; }\nreturn;");
        assert!(matches!(result, Err(RunError::Static(_))));

        let (_, result) = harness.run("@ { var b = 2; print b; }");
        assert!(matches!(result, Err(RunError::Static(_))));

        assert_eq!(harness.session.interpreter().resolved_locals(), 0);

        let (text, result) = harness.run("{ var c = 3; print c; }");
        assert!(result.is_ok());
        assert_eq!(text, "3\n");
        assert_eq!(harness.session.interpreter().resolved_locals(), 1);
    }

    #[test]
    fn test_evaluate_expression() {
        let mut harness = Harness::new();

        harness.run("var base = 40;").1.expect("should run");

        let value = harness
            .session
            .evaluate("base + 2")
            .expect("expression should evaluate");
        assert_eq!(value.to_string(), "42");
    }

    #[test]
    fn test_evaluate_reports_static_errors() {
        let mut harness = Harness::new();

        let error = harness
            .session
            .evaluate("this")
            .expect_err("stray this is rejected");

        assert_eq!(error.exit_code(), 65);
        let diagnostics: Vec<String> = error.diagnostics().iter().map(ToString::to_string).collect();
        assert_eq!(
            diagnostics,
            vec!["[line 1] Error at 'this': Cannot use 'this' outside of a class."]
        );

        let error = harness.session.evaluate("1 +").expect_err("incomplete");
        assert_eq!(error.exit_code(), 65);

        let error = harness.session.evaluate("-\"x\"").expect_err("bad operand");
        assert_eq!(error.exit_code(), 70);
    }

    #[test]
    fn test_diagnostics_for_runtime_error() {
        let mut harness = Harness::new();

        let (_, result) = harness.run("nil();");
        let error = result.expect_err("calling nil fails");

        let diagnostics: Vec<String> = error.diagnostics().iter().map(ToString::to_string).collect();
        assert_eq!(diagnostics, vec!["Can only call functions and classes.\n[line 1]"]);
    }
}
