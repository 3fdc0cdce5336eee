use std::fmt;
use internment::Intern;
use crate::{
    Error,
    util::{Ident, SrcLoc, SrcRegion},
};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Lexeme {
    Symbol(Ident),
    String(Intern<String>),
    Number(f64),
    Bool(bool),

    LParen,
    RParen,
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Lexeme::Symbol(s) => write!(f, "{}", s.as_str()),
            Lexeme::String(s) => write!(f, "\"{}\"", s.as_str()),
            Lexeme::Number(x) => write!(f, "{}", x),
            Lexeme::Bool(true) => write!(f, "#t"),
            Lexeme::Bool(false) => write!(f, "#f"),
            Lexeme::LParen => write!(f, "("),
            Lexeme::RParen => write!(f, ")"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Token {
    pub lexeme: Lexeme,
    pub region: SrcRegion,
}

impl Token {
    pub fn new(lexeme: Lexeme, region: SrcRegion) -> Self {
        Self {
            lexeme,
            region,
        }
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '"' | ';')
}

fn looks_numeric(atom: &str) -> bool {
    let digits = atom.strip_prefix('-').unwrap_or(atom);
    digits.starts_with(|c: char| c.is_ascii_digit())
        || (digits.starts_with('.') && digits[1..].starts_with(|c: char| c.is_ascii_digit()))
}

fn classify_atom(atom: &str, region: SrcRegion) -> Result<Token, Error> {
    let lexeme = match atom {
        "#t" => Lexeme::Bool(true),
        "#f" => Lexeme::Bool(false),
        _ if atom.starts_with('#') => return Err(Error::unexpected_char('#').at(region)),
        _ if looks_numeric(atom) => match atom.parse::<f64>() {
            Ok(x) if atom.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-') => Lexeme::Number(x),
            _ => return Err(Error::invalid_number(atom).at(region)),
        },
        _ => Lexeme::Symbol(Intern::new(atom.to_string())),
    };
    Ok(Token::new(lexeme, region))
}

/// Split source text into tokens. All lexical errors are collected.
pub fn lex(s: &str) -> Result<Vec<Token>, Vec<Error>> {
    enum State {
        Default,
        Atom(SrcLoc, String),
        String { start: SrcLoc, buf: String, escaped: bool },
        Comment,
    }

    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    let mut chars = s.chars().peekable();
    let mut state = State::Default;
    let mut loc = SrcLoc::start();

    loop {
        let c = chars.peek().copied();
        let mut to_next = true;
        match &mut state {
            State::Default => match c {
                Some(c) if c.is_whitespace() => {},
                Some('(') => tokens.push(Token::new(Lexeme::LParen, SrcRegion::single(loc))),
                Some(')') => tokens.push(Token::new(Lexeme::RParen, SrcRegion::single(loc))),
                Some(';') => state = State::Comment,
                Some('"') => state = State::String { start: loc, buf: String::new(), escaped: false },
                Some(c) if !c.is_control() => state = State::Atom(loc, c.to_string()),
                Some(c) => errors.push(Error::unexpected_char(c).at(SrcRegion::single(loc))),
                None => break,
            },
            State::Comment => match c {
                Some('\n') | None => {
                    to_next = false;
                    state = State::Default;
                },
                Some(_) => {},
            },
            State::String { start, buf, escaped } => match c {
                Some(c) if *escaped => {
                    buf.push(match c {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                    *escaped = false;
                },
                Some('\\') => *escaped = true,
                Some('"') => {
                    let region = SrcRegion::range(*start, loc.next());
                    tokens.push(Token::new(Lexeme::String(Intern::new(std::mem::take(buf))), region));
                    state = State::Default;
                },
                Some(c) => buf.push(c),
                None => {
                    errors.push(Error::unclosed_delimiter('"').at(SrcRegion::single(*start)));
                    to_next = false;
                    state = State::Default;
                },
            },
            State::Atom(start, atom) => match c {
                Some(c) if !is_delimiter(c) => atom.push(c),
                _ => {
                    match classify_atom(atom, SrcRegion::range(*start, loc)) {
                        Ok(token) => tokens.push(token),
                        Err(err) => errors.push(err),
                    }
                    to_next = false;
                    state = State::Default;
                },
            },
        }

        if to_next {
            if let Some(c) = chars.next() {
                loc = loc.advance(c);
            }
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests;
