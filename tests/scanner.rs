#[cfg(test)]
mod scanner_tests {
    use rox::error::LoxError;
    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_ternary_and_loop_keywords() {
        assert_token_sequence(
            "a ? b : c; break; continue;",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::QUESTION, "?"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::COLON, ":"),
                (TokenType::IDENTIFIER, "c"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::BREAK, "break"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::CONTINUE, "continue"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_comments_and_lines() {
        let tokens = scan("// leading comment\nvar x = 1; // trailing\n\nprint x;").unwrap();

        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![2, 2, 2, 2, 2, 4, 4, 4, 4]);
    }

    #[test]
    fn test_scanner_04_literals() {
        let tokens = scan("12.5 7 \"hi there\"").unwrap();

        assert!(matches!(tokens[0].token_type, TokenType::NUMBER(n) if n == 12.5));
        assert!(matches!(tokens[1].token_type, TokenType::NUMBER(n) if n == 7.0));
        assert!(matches!(&tokens[2].token_type, TokenType::STRING(s) if s == "hi there"));
        assert_eq!(tokens[2].lexeme, "\"hi there\"");
    }

    #[test]
    fn test_token_display() {
        let tokens = scan("42 3.5 \"s\" or").unwrap();
        let rendered: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();

        assert_eq!(
            rendered,
            vec![
                "NUMBER 42 42.0",
                "NUMBER 3.5 3.5",
                "STRING \"s\" s",
                "OR or null",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = scan("print \"oops;").unwrap_err();

        assert!(matches!(err, LoxError::Lex { line: 1, .. }));
        assert!(err.to_string().contains("Unterminated string."));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source.as_bytes());

        let results: Vec<_> = scanner.collect();

        // COMMA, DOT, error '$', LEFT_PAREN, error '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                err
            );
        }

        fn assert_token_matches(
            result: &Result<Token, LoxError>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(
                        token.token_type, expected_type,
                        "Expected token type {:?}, got {:?}",
                        expected_type, token.token_type
                    );
                    assert_eq!(
                        token.lexeme, expected_lexeme,
                        "Expected lexeme '{}', got '{}'",
                        expected_lexeme, token.lexeme
                    );
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }
}
