#[cfg(test)]
mod resolver_tests {
    use treelox as lox;

    use lox::ast::{Expr, Stmt};
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::scan;

    fn resolve(source: &str) -> Vec<String> {
        let (tokens, _) = scan(source);
        let statements = Parser::new(tokens).parse().expect("program should parse");

        match Resolver::new().resolve(&statements) {
            Ok(_) => Vec::new(),
            Err(errors) => errors.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_valid_program_has_no_errors() {
        let errors = resolve(
            "var a = 1;
             fun outer(x) {
               var y = x;
               fun inner() { return x + y + a; }
               return inner;
             }
             class Point {
               init(x) { this.x = x; return; }
               get() { return this.x; }
             }",
        );

        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn test_local_read_in_own_initializer() {
        assert_eq!(
            resolve("{ var a = a; }"),
            vec!["[line 1] Error at 'a': Cannot read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_global_read_in_own_initializer_is_allowed() {
        assert!(resolve("var a = a;").is_empty());
    }

    #[test]
    fn test_duplicate_local_declaration() {
        assert_eq!(
            resolve("{\n  var a = 1;\n  var a = 2;\n}"),
            vec!["[line 3] Error at 'a': Variable with this name already declared in this scope."]
        );
    }

    #[test]
    fn test_duplicate_parameter() {
        let errors = resolve("fun f(a, a) {}");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("already declared in this scope"));
    }

    #[test]
    fn test_global_redeclaration_is_allowed() {
        assert!(resolve("var a = 1; var a = 2;").is_empty());
    }

    #[test]
    fn test_return_at_top_level() {
        assert_eq!(
            resolve("return 1;"),
            vec!["[line 1] Error at 'return': Cannot return from top-level code."]
        );
    }

    #[test]
    fn test_return_value_from_initializer() {
        assert_eq!(
            resolve("class A { init() { return 1; } }"),
            vec!["[line 1] Error at 'return': Cannot return a value from an initializer."]
        );
    }

    #[test]
    fn test_bare_return_in_initializer_is_allowed() {
        assert!(resolve("class A { init() { return; } }").is_empty());
    }

    #[test]
    fn test_this_outside_class() {
        assert_eq!(
            resolve("print this;"),
            vec!["[line 1] Error at 'this': Cannot use 'this' outside of a class."]
        );

        assert_eq!(resolve("fun f() { return this; }").len(), 1);
    }

    #[test]
    fn test_this_in_function_nested_in_method() {
        assert!(resolve("class A { m() { fun f() { return this; } return f; } }").is_empty());
    }

    #[test]
    fn test_errors_accumulate() {
        let errors = resolve("return 1;\nprint this;\n{ var b = b; }");

        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("[line 1]"));
        assert!(errors[1].starts_with("[line 2]"));
        assert!(errors[2].starts_with("[line 3]"));
    }

    #[test]
    fn test_distances_for_locals_only() {
        let (tokens, _) = scan("var g = 1; { var a = 2; { print a; print g; } }");
        let statements = Parser::new(tokens).parse().expect("program should parse");

        let locals = Resolver::new()
            .resolve(&statements)
            .expect("program should resolve");

        // Only `a` is local; `g` is left to the globals.
        assert_eq!(locals.len(), 1);

        let Stmt::Block(outer) = &statements[1] else {
            panic!("expected outer block");
        };
        let Stmt::Block(inner) = &outer[1] else {
            panic!("expected inner block");
        };
        let Stmt::Print(Expr::Variable { id, .. }) = &inner[0] else {
            panic!("expected print of a variable");
        };

        assert_eq!(locals.get(id), Some(&1));
    }

    #[test]
    fn test_rejected_program_yields_no_distances() {
        let (tokens, _) = scan("{ var a = 1; print a; }\nreturn;");
        let statements = Parser::new(tokens).parse().expect("program should parse");

        let errors = Resolver::new()
            .resolve(&statements)
            .expect_err("top-level return should be rejected");

        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_lone_expression() {
        let (tokens, _) = scan("this");
        let expr = Parser::new(tokens).parse_expression().expect("should parse");

        let errors = Resolver::new()
            .resolve_expression(&expr)
            .expect_err("this outside a class");

        assert_eq!(
            errors[0].to_string(),
            "[line 1] Error at 'this': Cannot use 'this' outside of a class."
        );
    }
}
