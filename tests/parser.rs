#[cfg(test)]
mod parser_tests {
    use treelox as lox;

    use lox::ast::*;
    use lox::ast_printer::AstPrinter;
    use lox::parser::*;
    use lox::scanner::scan;

    fn parse_program(source: &str) -> Result<Vec<Stmt>, Vec<String>> {
        let (tokens, errors) = scan(source);
        assert!(errors.is_empty(), "unexpected lexical errors: {:?}", errors);

        Parser::new(tokens)
            .parse()
            .map_err(|errors| errors.iter().map(ToString::to_string).collect())
    }

    fn printed(source: &str) -> Vec<String> {
        let statements = parse_program(source).expect("program should parse");
        statements.iter().map(AstPrinter::print_stmt).collect()
    }

    fn errors_of(source: &str) -> Vec<String> {
        match parse_program(source) {
            Ok(statements) => panic!("expected parse errors, got {:?}", statements),
            Err(errors) => errors,
        }
    }

    #[test]
    fn test_precedence_and_associativity() {
        let (tokens, _) = scan("1 + 2 * 3 - 4 / 2");
        let expr = Parser::new(tokens).parse_expression().expect("should parse");

        assert_eq!(
            AstPrinter::print(&expr),
            "(- (+ 1.0 (* 2.0 3.0)) (/ 4.0 2.0))"
        );
    }

    #[test]
    fn test_comparison_equality_and_logic() {
        assert_eq!(
            printed("print 1 < 2 == 3 >= 4 or !true and nil;"),
            vec!["(print (or (== (< 1.0 2.0) (>= 3.0 4.0)) (and (! true) nil)))"]
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(printed("a = b = 3;"), vec!["(; (= a (= b 3.0)))"]);
    }

    #[test]
    fn test_property_access_and_set() {
        assert_eq!(
            printed("point.x = point.y.z(1, \"s\");"),
            vec!["(; (.= point x (call (. (. point y) z) 1.0 s)))"]
        );
    }

    #[test]
    fn test_for_loop_is_desugared() {
        assert_eq!(
            printed("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"]
        );
    }

    #[test]
    fn test_empty_for_clauses_loop_forever() {
        let statements = parse_program("for (;;) print 1;").expect("should parse");

        match &statements[..] {
            [Stmt::While { condition, body }] => {
                assert_eq!(*condition, Expr::Literal(LiteralValue::True));
                assert_eq!(AstPrinter::print_stmt(body), "(print 1.0)");
            }
            other => panic!("expected a bare while loop, got {:?}", other),
        }
    }

    #[test]
    fn test_class_and_function_declarations() {
        assert_eq!(
            printed("class A { init(x) { this.x = x; } get() { return this.x; } } fun f() { return; }"),
            vec![
                "(class A (fun init (x) (; (.= this x x))) (fun get () (return (. this x))))",
                "(fun f () (return))",
            ]
        );
    }

    #[test]
    fn test_if_else_and_while() {
        assert_eq!(
            printed("if (a) print 1; else { print 2; } while (false) {}"),
            vec!["(if a (print 1.0) (block (print 2.0)))", "(while false (block))"]
        );
    }

    #[test]
    fn test_resolvable_nodes_get_distinct_ids() {
        let statements = parse_program("a; a;").expect("should parse");

        let ids: Vec<ExprId> = statements
            .iter()
            .map(|stmt| match stmt {
                Stmt::Expression(Expr::Variable { id, .. }) => *id,
                other => panic!("expected variable expression, got {:?}", other),
            })
            .collect();

        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_error_recovery_collects_every_error() {
        let errors = errors_of("var = 1;\nprint 2 print 3;\nvar ok = 4;");

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at '=': Expected variable name.",
                "[line 2] Error at 'print': Expected ';' after value.",
            ]
        );
    }

    #[test]
    fn test_error_at_end() {
        let errors = errors_of("print 1");

        assert_eq!(errors, vec!["[line 1] Error at end: Expected ';' after value."]);
    }

    #[test]
    fn test_invalid_assignment_target_does_not_abort() {
        let errors = errors_of("a + b = c; var = 2;");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], "[line 1] Error at '=': Invalid assignment target.");
        assert!(errors[1].contains("Expected variable name."));
    }

    #[test]
    fn test_argument_limit() {
        assert!(parse_program("f(1, 2, 3, 4, 5, 6, 7, 8);").is_ok());

        let errors = errors_of("f(1, 2, 3, 4, 5, 6, 7, 8, 9);");
        assert_eq!(
            errors,
            vec![format!(
                "[line 1] Error at '9': Cannot have more than {} arguments.",
                MAX_ARGUMENTS
            )]
        );
    }

    #[test]
    fn test_parameter_limit() {
        assert!(parse_program("fun f(a, b, c, d, e, g, h, i) {}").is_ok());

        let errors = errors_of("fun f(a, b, c, d, e, g, h, i, j) {}");
        assert_eq!(
            errors,
            vec!["[line 1] Error at 'j': Cannot have more than 8 parameters."]
        );
    }

    #[test]
    fn test_missing_expression() {
        let errors = errors_of("print );");

        assert_eq!(errors, vec!["[line 1] Error at ')': Expected expression."]);
    }

    #[test]
    fn test_parse_expression_rejects_trailing_tokens() {
        let (tokens, _) = scan("1 2");
        let errors = Parser::new(tokens)
            .parse_expression()
            .expect_err("trailing token should be rejected");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Expected end of expression."));
    }

    #[test]
    fn test_missing_eof_is_tolerated() {
        let statements = Parser::new(Vec::new()).parse().expect("empty input parses");
        assert!(statements.is_empty());
    }
}
