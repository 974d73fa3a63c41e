#[cfg(test)]
mod scanner_tests {
    use rlox::scanner::{scan, Scanner};
    use rlox::token::*;

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
    fn test_scanner_02_maximal_munch_operators() {
        assert_token_sequence(
            "! != = == < <= > >= / //ignored",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "var foo = fun_2; while class andes",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "foo"),
                (TokenType::EQUAL, "="),
                (TokenType::IDENTIFIER, "fun_2"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::WHILE, "while"),
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "andes"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_numbers() {
        // A dot with no digit after it is NOT part of the number.
        let (tokens, errors) = scan(b"123 3.14 5.");

        assert!(errors.is_empty());

        let kinds: Vec<_> = tokens.iter().map(|t| t.lexeme).collect();
        assert_eq!(kinds, vec!["123", "3.14", "5", ".", ""]);

        match &tokens[0].token_type {
            TokenType::NUMBER(n) => assert_eq!(*n, 123.0),
            other => panic!("Expected NUMBER, got {:?}", other),
        }
        match &tokens[1].token_type {
            TokenType::NUMBER(n) => assert_eq!(*n, 3.14),
            other => panic!("Expected NUMBER, got {:?}", other),
        }
        assert_eq!(tokens[3].token_type, TokenType::DOT);
    }

    #[test]
    fn test_scanner_05_string_literal_payload() {
        let (tokens, errors) = scan(b"\"hello world\";");

        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 3); // string, semicolon, EOF

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "hello world"),
            other => panic!("Expected STRING, got {:?}", other),
        }
        assert_eq!(tokens[0].lexeme, "\"hello world\"");
    }

    #[test]
    fn test_scanner_06_multiline_string_counts_lines() {
        let (tokens, errors) = scan(b"\"a\nb\"\nident");

        assert!(errors.is_empty());

        // The embedded newline bumps the counter, so the string token is
        // emitted on line 2 and the identifier lands on line 3.
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].lexeme, "ident");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_scanner_07_unterminated_string() {
        let (tokens, errors) = scan(b"\"abc\ndef");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Unterminated string."));

        // Error is reported at the line where scanning ended.
        assert!(errors[0].to_string().contains("[line 2]"));

        // Still exactly one EOF token.
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, TokenType::EOF);
    }

    #[test]
    fn test_scanner_08_comments_and_lines() {
        let (tokens, errors) = scan(b"// first line\nprint 1; // trailing\nprint 2;");

        assert!(errors.is_empty());

        assert_eq!(tokens[0].token_type, TokenType::PRINT);
        assert_eq!(tokens[0].line, 2);

        let second_print = tokens
            .iter()
            .filter(|t| t.token_type == TokenType::PRINT)
            .nth(1)
            .expect("second print token");
        assert_eq!(second_print.line, 3);
    }

    #[test]
    fn test_scanner_09_unexpected_chars_are_non_fatal() {
        let source = ",.$(#";
        let results: Vec<_> = Scanner::new(source.as_bytes()).collect();

        // 2 valid tokens, 2 errors, 1 valid token, EOF.
        assert_eq!(results.len(), 6);

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            let msg = err.to_string();
            assert!(
                msg.contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                msg
            );
            assert!(msg.contains("Lex Error"));
        }

        let lexemes: Vec<_> = results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|t| t.lexeme)
            .collect();
        assert_eq!(lexemes, vec![",", ".", "(", ""]);
    }

    #[test]
    fn test_scanner_10_lexeme_concatenation_reproduces_source() {
        // Joining lexemes reproduces the source with whitespace removed —
        // scanning loses nothing but insignificants.
        let source = "var answer = 40 + 2;\nprint answer <= 43;";
        let (tokens, errors) = scan(source.as_bytes());

        assert!(errors.is_empty());

        let joined: String = tokens.iter().map(|t| t.lexeme).collect();
        let normalized: String = source.chars().filter(|c| !c.is_whitespace()).collect();

        assert_eq!(joined, normalized);
    }
}
