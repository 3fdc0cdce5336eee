use pretty_assertions::assert_eq;
use super::*;
use crate::error::ErrorKind;

fn lexemes(code: &str) -> Vec<Lexeme> {
    lex(code)
        .expect("lexing failed")
        .into_iter()
        .map(|tok| tok.lexeme)
        .collect()
}

fn sym(s: &str) -> Lexeme {
    Lexeme::Symbol(Intern::new(s.to_string()))
}

#[test]
fn test_lex_arithmetic() {
    assert_eq!(lexemes("(+ 3 2.5 -1)"), vec![
        Lexeme::LParen,
        sym("+"),
        Lexeme::Number(3.0),
        Lexeme::Number(2.5),
        Lexeme::Number(-1.0),
        Lexeme::RParen,
    ]);
}

#[test]
fn test_lex_symbols_and_bools() {
    assert_eq!(lexemes("(null? #t #f set! x-y ==)"), vec![
        Lexeme::LParen,
        sym("null?"),
        Lexeme::Bool(true),
        Lexeme::Bool(false),
        sym("set!"),
        sym("x-y"),
        sym("=="),
        Lexeme::RParen,
    ]);
}

#[test]
fn test_lex_string_escapes() {
    assert_eq!(lexemes(r#""a \"b\"\n""#), vec![
        Lexeme::String(Intern::new("a \"b\"\n".to_string())),
    ]);
}

#[test]
fn test_lex_comments() {
    assert_eq!(lexemes("; a comment\n(x) ; trailing"), vec![
        Lexeme::LParen,
        sym("x"),
        Lexeme::RParen,
    ]);
}

#[test]
fn test_lex_regions() {
    let tokens = lex("(foo \"s\")").unwrap();
    assert_eq!(tokens[1].region, SrcRegion::from((1, 4)));
    assert_eq!(tokens[2].region, SrcRegion::from((5, 8)));
}

#[test]
fn test_lex_unclosed_string() {
    let errors = lex("(read \"oops").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), &ErrorKind::UnclosedDelimiter('"'));
}

#[test]
fn test_lex_collects_all_errors() {
    let errors = lex("(+ 1x #q)").unwrap_err();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].kind(), &ErrorKind::InvalidNumber("1x".to_string()));
    assert_eq!(errors[1].kind(), &ErrorKind::UnexpectedChar('#'));
}
