#[cfg(test)]
mod parser_tests {
    use rox::ast::{Expr, ExprIdGen, Stmt};
    use rox::ast_printer::AstPrinter;
    use rox::error::LoxError;
    use rox::parser::Parser;
    use rox::scanner::scan;

    fn parse_program(source: &str) -> Result<Vec<Stmt>, LoxError> {
        let tokens = scan(source)?;
        let mut ids = ExprIdGen::default();
        Parser::new(&tokens, &mut ids).parse()
    }

    fn print_expr(source: &str) -> String {
        let tokens = scan(source).unwrap();
        let mut ids = ExprIdGen::default();
        let expr = Parser::new(&tokens, &mut ids).parse_expression().unwrap();
        AstPrinter::print(&expr)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(print_expr("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(print_expr("(1 + 2) * 3"), "(* (group (+ 1 2)) 3)");
        assert_eq!(print_expr("-a.b == !c"), "(== (- (. a b)) (! c))");
        assert_eq!(print_expr("1 - 2 - 3"), "(- (- 1 2) 3)");
        assert_eq!(print_expr("2.5 >= 1"), "(>= 2.5 1)");
    }

    #[test]
    fn test_logical_and_ternary() {
        assert_eq!(print_expr("a or b and c"), "(or a (and b c))");
        assert_eq!(print_expr("a ? b : c ? d : e"), "(?: a b (?: c d e))");
        assert_eq!(print_expr("x = y ? 1 : 2"), "(= x (?: y 1 2))");
    }

    #[test]
    fn test_calls_properties_and_lambdas() {
        assert_eq!(print_expr("f(1, \"two\")(3)"), "(call (call f 1 two) 3)");
        assert_eq!(print_expr("a.b.c = 4"), "(= (. (. a b) c) 4)");
        assert_eq!(print_expr("fun (a, b) { return a; }"), "(fun (a b) ...)");
        assert_eq!(print_expr("super.m"), "(super m)");
        assert_eq!(print_expr("this"), "this");
    }

    #[test]
    fn test_statement_shapes() {
        let stmts = parse_program(
            "var a = 1;\n\
             fun f(x) { return x; }\n\
             class B < A { init() {} m() {} }\n\
             for (var i = 0; i < 3; i = i + 1) { continue; }\n\
             while (true) break;\n\
             fun () {};",
        )
        .unwrap();

        assert_eq!(stmts.len(), 6);
        assert!(matches!(stmts[0], Stmt::Var { .. }));
        assert!(matches!(&stmts[1], Stmt::Function(decl) if decl.arity() == 1 && decl.is_named("f")));

        match &stmts[2] {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                assert_eq!(name.lexeme, "B");
                assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));
                assert_eq!(methods.len(), 2);
            }
            other => panic!("expected class, got {:?}", other),
        }

        assert!(matches!(
            &stmts[3],
            Stmt::For {
                initializer: Some(_),
                condition: Some(_),
                increment: Some(_),
                ..
            }
        ));
        assert!(matches!(&stmts[4], Stmt::While { body, .. } if matches!(**body, Stmt::Break { .. })));
        assert!(matches!(&stmts[5], Stmt::Expression(Expr::Lambda(decl)) if decl.name.is_none()));
    }

    #[test]
    fn test_ids_are_unique_across_parses() {
        let mut ids = ExprIdGen::default();

        let first = scan("a;").unwrap();
        let second = scan("a;").unwrap();

        let id_of = |stmts: Vec<Stmt>| match &stmts[0] {
            Stmt::Expression(Expr::Variable { id, .. }) => *id,
            other => panic!("expected variable, got {:?}", other),
        };

        let a = id_of(Parser::new(&first, &mut ids).parse().unwrap());
        let b = id_of(Parser::new(&second, &mut ids).parse().unwrap());

        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_program("1 + 2 = 3;").unwrap_err();

        assert_eq!(
            err.to_string(),
            "[line 1] Error at '=': Invalid assignment target."
        );
    }

    #[test]
    fn test_first_error_is_reported() {
        let err = parse_program("var = 1;\nprint 2\nprint 3;").unwrap_err();

        assert!(matches!(err, LoxError::Parse { line: 1, .. }));
        assert!(err.to_string().contains("Expect variable name."));
    }

    #[test]
    fn test_error_at_end() {
        let err = parse_program("print 1").unwrap_err();

        assert_eq!(
            err.to_string(),
            "[line 1] Error at end: Expect ';' after value."
        );
    }

    #[test]
    fn test_super_needs_method_name() {
        let err = parse_program("super;").unwrap_err();

        assert!(err.to_string().contains("Expect '.' after 'super'."));
    }

    #[test]
    fn test_trailing_tokens_in_expression_mode() {
        let tokens = scan("1 2").unwrap();
        let mut ids = ExprIdGen::default();
        let err = Parser::new(&tokens, &mut ids).parse_expression().unwrap_err();

        assert!(err.to_string().contains("Expect end of expression."));
    }
}
