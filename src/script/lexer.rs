//! Lexer for call scripts using logos

use logos::Logos;

pub use crate::error::Span;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Statement keywords
    #[token("event")]
    Event,
    #[token("declare")]
    Declare,
    #[token("action")]
    Action,
    #[token("call")]
    Call,
    #[token("start")]
    Start,
    #[token("if")]
    If,
    #[token("ifelse")]
    IfElse,
    #[token("else")]
    Else,
    #[token("not")]
    Not,
    #[token("repeat")]
    Repeat,
    #[token("end")]
    End,
    #[token("function")]
    Function,
    #[token("process")]
    Process,

    // Delimiters
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("=")]
    Equals,
    #[token("@")]
    At,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len()-1])
    })]
    String(String),

    #[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,
}

impl Token {
    /// Source spelling of keyword tokens
    pub fn keyword(&self) -> Option<&'static str> {
        Some(match self {
            Token::Event => "event",
            Token::Declare => "declare",
            Token::Action => "action",
            Token::Call => "call",
            Token::Start => "start",
            Token::If => "if",
            Token::IfElse => "ifelse",
            Token::Else => "else",
            Token::Not => "not",
            Token::Repeat => "repeat",
            Token::End => "end",
            Token::Function => "function",
            Token::Process => "process",
            _ => return None,
        })
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Lex input string into tokens with spans
///
/// Input no token matches comes back as `Err` carrying its span.
pub fn lex(input: &str) -> impl Iterator<Item = Result<(Token, Span), Span>> + '_ {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| match tok {
            Ok(t) => Ok((t, span)),
            Err(()) => Err(span),
        })
}
