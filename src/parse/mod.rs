use std::{fmt, rc::Rc};
use crate::{
    error::{Error, Thing},
    lex::{self, Lexeme, Token},
    stack::ensure_sufficient_stack,
    util::{format_number, Ident, SrcRegion},
};

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Unit,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

/// Runtime tags tested by the type predicates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeTag {
    Number,
    Boolean,
    String,
    Procedure,
    Pair,
    Unit,
}

impl TypeTag {
    pub fn predicate(self) -> &'static str {
        match self {
            TypeTag::Number => "number?",
            TypeTag::Boolean => "boolean?",
            TypeTag::String => "string?",
            TypeTag::Procedure => "procedure?",
            TypeTag::Pair => "pair?",
            TypeTag::Unit => "unit?",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Car,
    Cdr,
    IsNull,
    IsList,
    Is(TypeTag),
    Ref,
    Deref,
    Free,
    Eval,
    Read,
}

impl UnaryOp {
    pub fn keyword(self) -> &'static str {
        match self {
            UnaryOp::Car => "car",
            UnaryOp::Cdr => "cdr",
            UnaryOp::IsNull => "null?",
            UnaryOp::IsList => "list?",
            UnaryOp::Is(tag) => tag.predicate(),
            UnaryOp::Ref => "ref",
            UnaryOp::Deref => "deref",
            UnaryOp::Free => "free",
            UnaryOp::Eval => "eval",
            UnaryOp::Read => "read",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Cons,
    SetRef,
    Less,
    Equal,
    Greater,
}

impl BinaryOp {
    pub fn keyword(self) -> &'static str {
        match self {
            BinaryOp::Cons => "cons",
            BinaryOp::SetRef => "set!",
            BinaryOp::Less => "<",
            BinaryOp::Equal => "=",
            BinaryOp::Greater => ">",
        }
    }
}

/// A function literal. Shared between the syntax tree and every closure built from it.
#[derive(Debug, PartialEq)]
pub struct Lambda {
    pub formals: Vec<Ident>,
    /// Default value expression for the last formal.
    pub default: Option<Expr>,
    pub body: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Var(Ident),
    Arith(ArithOp, Vec<Expr>),
    Let(Vec<(Ident, Expr)>, Box<Expr>),
    Lambda(Rc<Lambda>),
    Call(Box<Expr>, Vec<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    List(Vec<Expr>),
    Array(Vec<Expr>),
    Index {
        array: Box<Expr>,
        indices: Vec<Expr>,
    },
    Assign {
        array: Box<Expr>,
        indices: Vec<Expr>,
        value: Box<Expr>,
    },
}

impl Expr {
    pub fn unary(op: UnaryOp, a: Expr) -> Self {
        Expr::Unary(op, Box::new(a))
    }

    pub fn binary(op: BinaryOp, a: Expr, b: Expr) -> Self {
        Expr::Binary(op, Box::new(a), Box::new(b))
    }
}

/// Top-level `(define name expr)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Define {
    pub name: Ident,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub defines: Vec<Define>,
    pub main: Expr,
}

fn write_seq(f: &mut fmt::Formatter, items: &[Expr]) -> fmt::Result {
    for item in items {
        write!(f, " {}", item)?;
    }
    Ok(())
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Literal::Number(x) => write!(f, "{}", format_number(*x)),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Bool(true) => write!(f, "#t"),
            Literal::Bool(false) => write!(f, "#f"),
            Literal::Unit => write!(f, "()"),
        }
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(lambda (")?;
        for (i, formal) in self.formals.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match &self.default {
                Some(default) if i + 1 == self.formals.len() => write!(f, "({} = {})", formal.as_str(), default)?,
                _ => write!(f, "{}", formal.as_str())?,
            }
        }
        write!(f, ") {})", self.body)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Literal(l) => write!(f, "{}", l),
            Expr::Var(name) => write!(f, "{}", name.as_str()),
            Expr::Arith(op, operands) => {
                write!(f, "({}", op.symbol())?;
                write_seq(f, operands)?;
                write!(f, ")")
            },
            Expr::Let(bindings, body) => {
                write!(f, "(let (")?;
                for (i, (name, value)) in bindings.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "({} {})", name.as_str(), value)?;
                }
                write!(f, ") {})", body)
            },
            Expr::Lambda(lambda) => write!(f, "{}", lambda),
            Expr::Call(operator, operands) => {
                write!(f, "({}", operator)?;
                write_seq(f, operands)?;
                write!(f, ")")
            },
            Expr::If(cond, a, b) => write!(f, "(if {} {} {})", cond, a, b),
            Expr::Unary(op, a) => write!(f, "({} {})", op.keyword(), a),
            Expr::Binary(op, a, b) => write!(f, "({} {} {})", op.keyword(), a, b),
            Expr::List(items) => {
                write!(f, "(list")?;
                write_seq(f, items)?;
                write!(f, ")")
            },
            Expr::Array(dims) => {
                write!(f, "(array")?;
                write_seq(f, dims)?;
                write!(f, ")")
            },
            Expr::Index { array, indices } => {
                write!(f, "(index {}", array)?;
                write_seq(f, indices)?;
                write!(f, ")")
            },
            Expr::Assign { array, indices, value } => {
                write!(f, "(assign {}", array)?;
                write_seq(f, indices)?;
                write!(f, " {})", value)
            },
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for define in &self.defines {
            writeln!(f, "(define {} {})", define.name.as_str(), define.value)?;
        }
        write!(f, "{}", self.main)
    }
}

/// Parse a whole program: any number of top-level definitions followed by an
/// optional main expression. A program with no main expression evaluates to unit.
pub fn parse(code: &str) -> Result<Program, Vec<Error>> {
    let tokens = lex::lex(code)?;
    Parser::new(&tokens)
        .parse_program()
        .map_err(|e| vec![e])
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + n)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eof_region(&self) -> SrcRegion {
        self.tokens
            .last()
            .map(|tok| tok.region)
            .unwrap_or_else(SrcRegion::none)
    }

    fn expect_open(&mut self, while_parsing: Thing) -> Result<SrcRegion, Error> {
        match self.next() {
            Some(Token { lexeme: Lexeme::LParen, region }) => Ok(*region),
            Some(tok) => Err(Error::unexpected(thing_of(tok.lexeme))
                .at(tok.region)
                .while_parsing(while_parsing)
                .expected(Thing::OpenParen)),
            None => Err(Error::unexpected_eof()
                .at(self.eof_region())
                .while_parsing(while_parsing)
                .expected(Thing::OpenParen)),
        }
    }

    fn expect_close(&mut self, while_parsing: Thing) -> Result<SrcRegion, Error> {
        match self.next() {
            Some(Token { lexeme: Lexeme::RParen, region }) => Ok(*region),
            Some(tok) => Err(Error::unexpected(thing_of(tok.lexeme))
                .at(tok.region)
                .while_parsing(while_parsing)
                .expected(Thing::CloseParen)),
            None => Err(Error::unclosed_delimiter('(')
                .at(self.eof_region())
                .while_parsing(while_parsing)
                .expected(Thing::CloseParen)),
        }
    }

    fn expect_ident(&mut self, while_parsing: Thing) -> Result<Ident, Error> {
        match self.next() {
            Some(Token { lexeme: Lexeme::Symbol(name), .. }) => Ok(*name),
            Some(tok) => Err(Error::unexpected(thing_of(tok.lexeme))
                .at(tok.region)
                .while_parsing(while_parsing)
                .expected(Thing::Ident)),
            None => Err(Error::unexpected_eof()
                .at(self.eof_region())
                .while_parsing(while_parsing)
                .expected(Thing::Ident)),
        }
    }

    fn at_define(&self) -> bool {
        matches!(
            (self.peek().map(|t| t.lexeme), self.peek_nth(1).map(|t| t.lexeme)),
            (Some(Lexeme::LParen), Some(Lexeme::Symbol(s))) if s.as_str() == "define"
        )
    }

    fn parse_program(&mut self) -> Result<Program, Error> {
        let mut defines = Vec::new();
        while self.at_define() {
            defines.push(self.parse_define()?);
        }

        let main = if self.peek().is_some() {
            self.parse_expr()?
        } else {
            Expr::Literal(Literal::Unit)
        };

        if let Some(tok) = self.peek() {
            let err = Error::unexpected(thing_of(tok.lexeme))
                .at(tok.region)
                .while_parsing(Thing::Program);
            return Err(if self.at_define() {
                err.hint("definitions must come before the main expression")
            } else {
                err.hint("a program has a single main expression")
            });
        }

        Ok(Program { defines, main })
    }

    fn parse_define(&mut self) -> Result<Define, Error> {
        self.expect_open(Thing::Define)?;
        self.next(); // `define`
        let name = self.expect_ident(Thing::Define)?;
        let value = self.parse_expr().map_err(|e| e.while_parsing(Thing::Define))?;
        self.expect_close(Thing::Define)?;
        Ok(Define { name, value })
    }

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        ensure_sufficient_stack(|| match self.next() {
            Some(tok) => match tok.lexeme {
                Lexeme::Number(x) => Ok(Expr::Literal(Literal::Number(x))),
                Lexeme::String(s) => Ok(Expr::Literal(Literal::String(s.as_str().to_string()))),
                Lexeme::Bool(b) => Ok(Expr::Literal(Literal::Bool(b))),
                Lexeme::Symbol(name) => Ok(Expr::Var(name)),
                Lexeme::LParen => self.parse_compound(tok.region),
                Lexeme::RParen => Err(Error::unexpected(Thing::CloseParen)
                    .at(tok.region)
                    .expected(Thing::Expr)),
            },
            None => Err(Error::unexpected_eof()
                .at(self.eof_region())
                .expected(Thing::Expr)),
        })
    }

    /// Parse expressions up to and including the closing paren of the current form.
    fn parse_operands(&mut self) -> Result<(Vec<Expr>, SrcRegion), Error> {
        let mut operands = Vec::new();
        loop {
            match self.peek() {
                Some(Token { lexeme: Lexeme::RParen, region }) => {
                    self.next();
                    return Ok((operands, *region));
                },
                Some(_) => operands.push(self.parse_expr()?),
                None => return Err(Error::unclosed_delimiter('(')
                    .at(self.eof_region())
                    .expected(Thing::CloseParen)),
            }
        }
    }

    fn parse_compound(&mut self, open: SrcRegion) -> Result<Expr, Error> {
        let keyword = match self.peek().map(|tok| tok.lexeme) {
            Some(Lexeme::RParen) => {
                self.next();
                return Ok(Expr::Literal(Literal::Unit));
            },
            Some(Lexeme::Symbol(s)) => Some(s),
            _ => None,
        };

        let keyword = match keyword {
            Some(k) if is_keyword(k.as_str()) => k,
            _ => {
                let operator = self.parse_expr()?;
                let (operands, _) = self.parse_operands()?;
                return Ok(Expr::Call(Box::new(operator), operands));
            },
        };
        let keyword_region = self.next().map(|tok| tok.region).unwrap_or(open);

        match keyword.as_str() {
            "let" => return self.parse_let(),
            "lambda" => return self.parse_lambda(),
            "define" => return Err(Error::unexpected(Thing::Define)
                .at(keyword_region)
                .expected(Thing::Expr)
                .hint("definitions are only allowed at the top level")),
            _ => {},
        }

        let (mut operands, close) = self.parse_operands()?;
        let region = open.union(close);
        let kw = keyword.as_str();
        let arity = |n: usize, operands: &Vec<Expr>, form: &'static str| if operands.len() == n {
            Ok(())
        } else {
            Err(Error::wrong_operand_count(form, operands.len()).at(region))
        };
        let at_least = |n: usize, operands: &Vec<Expr>, form: &'static str| if operands.len() >= n {
            Ok(())
        } else {
            Err(Error::wrong_operand_count(form, operands.len()).at(region))
        };

        let unary = |op: UnaryOp, mut operands: Vec<Expr>| -> Result<Expr, Error> {
            arity(1, &operands, op.keyword())?;
            Ok(Expr::unary(op, operands.remove(0)))
        };
        let binary = |op: BinaryOp, mut operands: Vec<Expr>| -> Result<Expr, Error> {
            arity(2, &operands, op.keyword())?;
            let b = operands.remove(1);
            let a = operands.remove(0);
            Ok(Expr::binary(op, a, b))
        };

        match kw {
            "+" => Ok(Expr::Arith(ArithOp::Add, operands)),
            "*" => Ok(Expr::Arith(ArithOp::Mul, operands)),
            "-" => at_least(1, &operands, "-").map(|_| Expr::Arith(ArithOp::Sub, operands)),
            "/" => at_least(1, &operands, "/").map(|_| Expr::Arith(ArithOp::Div, operands)),
            "if" => {
                arity(3, &operands, "if")?;
                let b = operands.remove(2);
                let a = operands.remove(1);
                let cond = operands.remove(0);
                Ok(Expr::If(Box::new(cond), Box::new(a), Box::new(b)))
            },
            "<" => binary(BinaryOp::Less, operands),
            "=" | "==" => binary(BinaryOp::Equal, operands),
            ">" => binary(BinaryOp::Greater, operands),
            "cons" => binary(BinaryOp::Cons, operands),
            "set!" => binary(BinaryOp::SetRef, operands),
            "car" => unary(UnaryOp::Car, operands),
            "cdr" => unary(UnaryOp::Cdr, operands),
            "null?" => unary(UnaryOp::IsNull, operands),
            "list?" => unary(UnaryOp::IsList, operands),
            "number?" => unary(UnaryOp::Is(TypeTag::Number), operands),
            "boolean?" => unary(UnaryOp::Is(TypeTag::Boolean), operands),
            "string?" => unary(UnaryOp::Is(TypeTag::String), operands),
            "procedure?" => unary(UnaryOp::Is(TypeTag::Procedure), operands),
            "pair?" => unary(UnaryOp::Is(TypeTag::Pair), operands),
            "unit?" => unary(UnaryOp::Is(TypeTag::Unit), operands),
            "ref" => unary(UnaryOp::Ref, operands),
            "deref" => unary(UnaryOp::Deref, operands),
            "free" => unary(UnaryOp::Free, operands),
            "eval" => unary(UnaryOp::Eval, operands),
            "read" => unary(UnaryOp::Read, operands),
            "list" => Ok(Expr::List(operands)),
            "array" => Ok(Expr::Array(operands)),
            "index" => {
                at_least(2, &operands, "index")?;
                let array = Box::new(operands.remove(0));
                Ok(Expr::Index { array, indices: operands })
            },
            "assign" => {
                at_least(3, &operands, "assign")?;
                let array = Box::new(operands.remove(0));
                let value = Box::new(operands.pop().expect("checked operand count"));
                Ok(Expr::Assign { array, indices: operands, value })
            },
            _ => unreachable!("unhandled keyword {}", kw),
        }
    }

    fn parse_let(&mut self) -> Result<Expr, Error> {
        self.expect_open(Thing::Binding)?;
        let mut bindings = Vec::new();
        loop {
            match self.peek().map(|tok| tok.lexeme) {
                Some(Lexeme::RParen) => {
                    self.next();
                    break;
                },
                _ => {
                    self.expect_open(Thing::Binding)?;
                    let name = self.expect_ident(Thing::Binding)?;
                    let value = self.parse_expr().map_err(|e| e.while_parsing(Thing::Binding))?;
                    self.expect_close(Thing::Binding)?;
                    bindings.push((name, value));
                },
            }
        }
        let body = self.parse_expr()?;
        self.expect_close(Thing::Expr)?;
        Ok(Expr::Let(bindings, Box::new(body)))
    }

    fn parse_lambda(&mut self) -> Result<Expr, Error> {
        self.expect_open(Thing::Formal)?;
        let mut formals = Vec::new();
        let mut default = None;
        loop {
            let tok = match self.next() {
                Some(tok) => tok,
                None => return Err(Error::unclosed_delimiter('(')
                    .at(self.eof_region())
                    .while_parsing(Thing::Formal)),
            };
            match tok.lexeme {
                Lexeme::RParen => break,
                _ if default.is_some() => return Err(Error::unexpected(thing_of(tok.lexeme))
                    .at(tok.region)
                    .while_parsing(Thing::Formal)
                    .expected(Thing::CloseParen)
                    .hint("only the last parameter may have a default value")),
                Lexeme::Symbol(name) => formals.push(name),
                Lexeme::LParen => {
                    let name = self.expect_ident(Thing::Formal)?;
                    match self.next() {
                        Some(Token { lexeme: Lexeme::Symbol(eq), .. }) if eq.as_str() == "=" => {},
                        Some(tok) => return Err(Error::unexpected(thing_of(tok.lexeme))
                            .at(tok.region)
                            .while_parsing(Thing::Formal)
                            .expected(Thing::Char('='))),
                        None => return Err(Error::unexpected_eof()
                            .at(self.eof_region())
                            .while_parsing(Thing::Formal)
                            .expected(Thing::Char('='))),
                    }
                    default = Some(self.parse_expr().map_err(|e| e.while_parsing(Thing::Formal))?);
                    self.expect_close(Thing::Formal)?;
                    formals.push(name);
                },
                other => return Err(Error::unexpected(thing_of(other))
                    .at(tok.region)
                    .while_parsing(Thing::Formal)
                    .expected(Thing::Ident)),
            }
        }
        let body = self.parse_expr()?;
        self.expect_close(Thing::Expr)?;
        Ok(Expr::Lambda(Rc::new(Lambda { formals, default, body })))
    }
}

fn is_keyword(s: &str) -> bool {
    matches!(s,
        "define" | "let" | "lambda" | "if"
        | "+" | "-" | "*" | "/"
        | "<" | "=" | "==" | ">"
        | "car" | "cdr" | "cons" | "list" | "null?" | "list?"
        | "number?" | "boolean?" | "string?" | "procedure?" | "pair?" | "unit?"
        | "ref" | "deref" | "set!" | "free"
        | "array" | "index" | "assign"
        | "eval" | "read"
    )
}

fn thing_of(lexeme: Lexeme) -> Thing {
    match lexeme {
        Lexeme::Symbol(_) => Thing::Ident,
        Lexeme::String(_) => Thing::String,
        Lexeme::Number(_) => Thing::Number,
        Lexeme::Bool(_) => Thing::Expr,
        Lexeme::LParen => Thing::OpenParen,
        Lexeme::RParen => Thing::CloseParen,
    }
}
