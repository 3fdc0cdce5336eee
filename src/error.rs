use std::{collections::BTreeSet, fmt};
use crate::util::SrcRegion;

/// Something the front-end was looking at, or hoping to find.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Thing {
    Char(char),
    OpenParen,
    CloseParen,
    Ident,
    Number,
    String,
    Expr,
    Define,
    Binding,
    Formal,
    Program,
}

impl fmt::Display for Thing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Thing::Char(c) => write!(f, "'{}'", c),
            Thing::OpenParen => write!(f, "'('"),
            Thing::CloseParen => write!(f, "')'"),
            Thing::Ident => write!(f, "identifier"),
            Thing::Number => write!(f, "number"),
            Thing::String => write!(f, "string"),
            Thing::Expr => write!(f, "expression"),
            Thing::Define => write!(f, "definition"),
            Thing::Binding => write!(f, "let binding"),
            Thing::Formal => write!(f, "formal parameter"),
            Thing::Program => write!(f, "program"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ErrorKind {
    UnexpectedChar(char),
    UnclosedDelimiter(char),
    InvalidNumber(String),
    UnexpectedEof,
    Unexpected(Thing),
    WrongOperandCount { form: &'static str, found: usize },
}

/// A syntax error produced while lexing or parsing source text.
#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    region: SrcRegion,
    while_parsing: Vec<Thing>,
    expected: BTreeSet<Thing>,
    hint: Option<&'static str>,
}

impl Error {
    pub fn unexpected_char(c: char) -> Self {
        Self::from(ErrorKind::UnexpectedChar(c))
    }

    pub fn unexpected(thing: impl Into<Thing>) -> Self {
        Self::from(ErrorKind::Unexpected(thing.into()))
    }

    pub fn unclosed_delimiter(c: char) -> Self {
        Self::from(ErrorKind::UnclosedDelimiter(c))
    }

    pub fn invalid_number(s: impl Into<String>) -> Self {
        Self::from(ErrorKind::InvalidNumber(s.into()))
    }

    pub fn unexpected_eof() -> Self {
        Self::from(ErrorKind::UnexpectedEof)
    }

    pub fn wrong_operand_count(form: &'static str, found: usize) -> Self {
        Self::from(ErrorKind::WrongOperandCount { form, found })
    }

    pub fn at(mut self, region: SrcRegion) -> Self {
        self.region = region;
        self
    }

    pub fn while_parsing(mut self, thing: impl Into<Thing>) -> Self {
        self.while_parsing.push(thing.into());
        self
    }

    pub fn expected(mut self, thing: impl Into<Thing>) -> Self {
        self.expected.insert(thing.into());
        self
    }

    pub fn hint(mut self, hint: &'static str) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn region(&self) -> SrcRegion {
        self.region
    }

    /// Render the error against the code it came from, with a 1-based line and column.
    pub fn in_context(&self, code: &str) -> String {
        match self.region.in_context(code) {
            Some(((line, col), _)) => format!("{}:{}: {}", line + 1, col + 1, self),
            None => format!("{}", self),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            region: SrcRegion::none(),
            while_parsing: Vec::new(),
            expected: BTreeSet::default(),
            hint: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ErrorKind::UnexpectedChar(c) => write!(f, "Unexpected character '{}'", c)?,
            ErrorKind::UnclosedDelimiter(c) => write!(f, "Unclosed delimiter '{}'", c)?,
            ErrorKind::InvalidNumber(s) => write!(f, "Invalid number literal '{}'", s)?,
            ErrorKind::UnexpectedEof => write!(f, "Unexpected end of input")?,
            ErrorKind::Unexpected(thing) => write!(f, "Unexpected {}", thing)?,
            ErrorKind::WrongOperandCount { form, found } =>
                write!(f, "Wrong number of operands for '{}': found {}", form, found)?,
        }

        if let Some(thing) = self.while_parsing.first() {
            write!(f, " while parsing {}", thing)?;
        }

        if !self.expected.is_empty() {
            let expected = self.expected
                .iter()
                .map(|thing| thing.to_string())
                .collect::<Vec<_>>();
            write!(f, ", expected {}", expected.join(" or "))?;
        }

        if let Some(hint) = self.hint {
            write!(f, " (hint: {})", hint)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
