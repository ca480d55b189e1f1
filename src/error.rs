//! Error types for compilation and call-script parsing

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::value::ValueError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Errors raised while building, resolving, emitting or encoding a template
///
/// Every variant except `Encoding` and `Decoding` carries the zero-based
/// index of the builder call that caused it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("call {index}: invalid value: {source}")]
    InvalidValue {
        index: usize,
        #[source]
        source: ValueError,
    },

    #[error("call {index}: unknown variable '{name}'")]
    UnknownVariable { index: usize, name: String },

    #[error("call {index}: unbalanced scope: {reason}")]
    UnbalancedScope { index: usize, reason: String },

    #[error("call {index}: {block} {action} expects {expected}: {detail}")]
    ParameterMismatch {
        index: usize,
        block: String,
        action: String,
        expected: String,
        detail: String,
    },

    #[error("call {index}: unknown action '{action}' for {block}")]
    UnknownAction {
        index: usize,
        block: String,
        action: String,
    },

    #[error("call {index}: target {target} is not valid for {block}")]
    InvalidTarget {
        index: usize,
        block: String,
        target: String,
    },

    #[error("call {index}: misplaced {block} block: {reason}")]
    MisplacedHeader {
        index: usize,
        block: String,
        reason: String,
    },

    /// Serialization or compression failed, or the code exceeds the
    /// configured length. Indicates a compiler defect or a misconfiguration.
    #[error("encoding failed: {message}")]
    Encoding { message: String },

    #[error("cannot decode template: {message}")]
    Decoding { message: String },
}

impl CompileError {
    /// The builder call index this error refers to, if any
    pub fn index(&self) -> Option<usize> {
        match self {
            CompileError::InvalidValue { index, .. }
            | CompileError::UnknownVariable { index, .. }
            | CompileError::UnbalancedScope { index, .. }
            | CompileError::ParameterMismatch { index, .. }
            | CompileError::UnknownAction { index, .. }
            | CompileError::InvalidTarget { index, .. }
            | CompileError::MisplacedHeader { index, .. } => Some(*index),
            CompileError::Encoding { .. } | CompileError::Decoding { .. } => None,
        }
    }

    pub(crate) fn unbalanced(index: usize, reason: impl Into<String>) -> Self {
        CompileError::UnbalancedScope {
            index,
            reason: reason.into(),
        }
    }

    pub(crate) fn encoding(message: impl Into<String>) -> Self {
        CompileError::Encoding {
            message: message.into(),
        }
    }

    pub(crate) fn decoding(message: impl Into<String>) -> Self {
        CompileError::Decoding {
            message: message.into(),
        }
    }
}

/// Errors raised while reading a call script
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Syntax error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },

    #[error("{message}")]
    Invalid { span: Span, message: String },
}

impl ScriptError {
    pub(crate) fn invalid(span: Span, message: impl Into<String>) -> Self {
        ScriptError::Invalid {
            span,
            message: message.into(),
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            ScriptError::Syntax { span, .. } | ScriptError::Invalid { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            ScriptError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };
                format_report(
                    source,
                    filename,
                    span,
                    message,
                    &format!("{message}{expected_str}"),
                )
            }
            ScriptError::Invalid { span, message } => {
                format_report(source, filename, span, message, message)
            }
        }
    }
}

/// Render a single-label error report
pub(crate) fn format_report(
    source: &str,
    filename: &str,
    span: &Span,
    message: &str,
    label: &str,
) -> String {
    let mut buf = Vec::new();
    let written = Report::build(ReportKind::Error, filename, span.start)
        .with_message(message)
        .with_label(
            Label::new((filename, span.clone()))
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish()
        .write((filename, Source::from(source)), &mut buf);
    match written {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("{filename}:{}: {message}", span.start),
    }
}

impl<'a> From<chumsky::error::Rich<'a, crate::script::lexer::Token>> for ScriptError {
    fn from(err: chumsky::error::Rich<'a, crate::script::lexer::Token>) -> Self {
        use chumsky::error::{RichPattern, RichReason};

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => {
                let found_str = match found {
                    Some(tok) => format_token(tok),
                    None => "end of input".to_string(),
                };
                format!("Unexpected {found_str}")
            }
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                RichPattern::Token(tok) => Some(format_token(tok)),
                RichPattern::Label(label) => Some(label.to_string()),
                RichPattern::EndOfInput => Some("end of input".to_string()),
                RichPattern::Identifier(s) => Some(format!("identifier '{s}'")),
                RichPattern::Any => Some("any token".to_string()),
                RichPattern::SomethingElse => None,
            })
            .collect();

        ScriptError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &crate::script::lexer::Token) -> String {
    use crate::script::lexer::Token;
    match tok {
        Token::Ident(s) => format!("identifier '{s}'"),
        Token::String(s) => format!("string \"{s}\""),
        Token::Number(n) => format!("number {n}"),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::BraceOpen => "'{'".to_string(),
        Token::BraceClose => "'}'".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Equals => "'='".to_string(),
        Token::At => "'@'".to_string(),
        keyword => match keyword.keyword() {
            Some(word) => format!("keyword '{word}'"),
            None => format!("{keyword:?}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_accessor() {
        let err = CompileError::UnknownVariable {
            index: 4,
            name: "x".to_string(),
        };
        assert_eq!(err.index(), Some(4));
        assert_eq!(CompileError::encoding("boom").index(), None);
    }

    #[test]
    fn test_display_names_call() {
        let err = CompileError::ParameterMismatch {
            index: 1,
            block: "player_action".to_string(),
            action: "GiveItems".to_string(),
            expected: "(item+)".to_string(),
            detail: "missing parameter at position 0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "call 1: player_action GiveItems expects (item+): missing parameter at position 0"
        );
    }

    #[test]
    fn test_report_contains_message() {
        let err = ScriptError::invalid(0..5, "bad value");
        let report = err.format("hello world", "test.dfs");
        assert!(report.contains("bad value"));
    }
}
