use tlox::scanner::Scanner;
use tlox::token::{Token, TokenType};

fn scan(source: &str) -> Vec<Token> {
    let (tokens, errors) = Scanner::new(source).scan_tokens();
    assert!(errors.is_empty(), "unexpected scan errors: {errors:?}");
    tokens
}

fn variants(source: &str) -> Vec<&'static str> {
    scan(source).iter().map(|t| t.token_type.variant()).collect()
}

#[test]
fn punctuators_and_operators() {
    assert_eq!(
        variants("(){},.-+;*/% ? : ! != = == < <= > >="),
        vec![
            "LEFT_PAREN",
            "RIGHT_PAREN",
            "LEFT_BRACE",
            "RIGHT_BRACE",
            "COMMA",
            "DOT",
            "MINUS",
            "PLUS",
            "SEMICOLON",
            "STAR",
            "SLASH",
            "MODULO",
            "QUESTION",
            "COLON",
            "BANG",
            "BANG_EQUAL",
            "EQUAL",
            "EQUAL_EQUAL",
            "LESS",
            "LESS_EQUAL",
            "GREATER",
            "GREATER_EQUAL",
            "EOF",
        ]
    );
}

#[test]
fn keywords_are_not_identifiers() {
    assert_eq!(
        variants("trait with break class super this fun"),
        vec!["TRAIT", "WITH", "BREAK", "CLASS", "SUPER", "THIS", "FUN", "EOF"]
    );

    // Prefix of a keyword is a plain identifier.
    assert_eq!(variants("breaker withy"), vec!["IDENTIFIER", "IDENTIFIER", "EOF"]);
}

#[test]
fn string_literal_keeps_contents_without_quotes() {
    let tokens = scan("\"hello world\"");

    match &tokens[0].token_type {
        TokenType::STRING(s) => assert_eq!(s, "hello world"),
        other => panic!("expected string, got {other:?}"),
    }
    assert_eq!(tokens[0].lexeme, "\"hello world\"");
}

#[test]
fn multi_line_string_bumps_line_counter() {
    let tokens = scan("\"a\nb\"\nx");

    let ident = tokens
        .iter()
        .find(|t| t.token_type == TokenType::IDENTIFIER)
        .unwrap();
    assert_eq!(ident.line, 3);
}

#[test]
fn unterminated_string_is_an_error() {
    let (_, errors) = Scanner::new("\"oops").scan_tokens();

    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Unterminated string."));
}

#[test]
fn number_literals_parse_integer_and_fraction() {
    let tokens = scan("42 3.14");

    match tokens[0].token_type {
        TokenType::NUMBER(n) => assert_eq!(n, 42.0),
        _ => panic!("expected number"),
    }
    match tokens[1].token_type {
        TokenType::NUMBER(n) => assert_eq!(n, 3.14),
        _ => panic!("expected number"),
    }

    // Display format pads integral values with .0
    assert_eq!(tokens[0].to_string(), "NUMBER 42 42.0");
    assert_eq!(tokens[1].to_string(), "NUMBER 3.14 3.14");
}

#[test]
fn line_comments_are_skipped() {
    assert_eq!(variants("a // b c d\nb"), vec!["IDENTIFIER", "IDENTIFIER", "EOF"]);
}

#[test]
fn block_comments_nest() {
    // The inner /* */ must not close the outer comment.
    assert_eq!(
        variants("a /* outer /* inner */ still a comment */ b"),
        vec!["IDENTIFIER", "IDENTIFIER", "EOF"]
    );
}

#[test]
fn unterminated_block_comment_is_an_error() {
    let (_, errors) = Scanner::new("a /* never closed").scan_tokens();

    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Unterminated block comment."));
}

#[test]
fn errors_accumulate_and_scanning_continues() {
    let (tokens, errors) = Scanner::new("@ a # b").scan_tokens();

    assert_eq!(errors.len(), 2);
    // Both identifiers still made it through.
    let idents = tokens
        .iter()
        .filter(|t| t.token_type == TokenType::IDENTIFIER)
        .count();
    assert_eq!(idents, 2);
}

#[test]
fn eof_is_always_last_and_unique() {
    let tokens = scan("");

    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].token_type, TokenType::EOF);
}
