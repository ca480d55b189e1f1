//! AST types for call scripts

use crate::block::{BlockCategory, ConditionCategory};
use crate::error::Span;
use crate::value::{ScopeClass, ValueKind};

/// A node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A parsed call script; statement `i` becomes builder call `i`
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub statements: Vec<Spanned<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `event [player|entity] <Action>`
    Event {
        category: BlockCategory,
        action: Spanned<String>,
    },
    /// `declare <local|saved|global> <name> [: kind]`
    Declare {
        scope: ScopeClass,
        name: Spanned<String>,
        kind: Option<ValueKind>,
    },
    /// `action <category> <Action> [@Target] [(args)] [{tags}]`
    Action(ActionStmt),
    /// `call "name"`
    Call(Spanned<String>),
    /// `start "name"`
    Start(Spanned<String>),
    /// `if ...` or `ifelse ...`
    If { has_else: bool, condition: ConditionStmt },
    Else,
    End,
    /// `repeat <Action> [<SubCond>] [not] [(args)] [{tags}]`
    Repeat(RepeatStmt),
    /// `function "name" [(args)] [{tags}]`
    Function(DefinitionStmt),
    /// `process "name" [(args)] [{tags}]`
    Process(DefinitionStmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionStmt {
    pub category: BlockCategory,
    pub action: Spanned<String>,
    pub target: Option<Spanned<String>>,
    pub args: Vec<Spanned<Expr>>,
    pub tags: Vec<TagAssign>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionStmt {
    pub category: ConditionCategory,
    pub negated: bool,
    pub action: Spanned<String>,
    pub target: Option<Spanned<String>>,
    pub args: Vec<Spanned<Expr>>,
    pub tags: Vec<TagAssign>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatStmt {
    pub action: Spanned<String>,
    pub sub_action: Option<Spanned<String>>,
    pub negated: bool,
    pub args: Vec<Spanned<Expr>>,
    pub tags: Vec<TagAssign>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionStmt {
    pub name: Spanned<String>,
    pub args: Vec<Spanned<Expr>>,
    pub tags: Vec<TagAssign>,
}

/// `"Tag" = "Option"`
#[derive(Debug, Clone, PartialEq)]
pub struct TagAssign {
    pub tag: Spanned<String>,
    pub option: Spanned<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    String(String),
    Number(f64),
    /// Bare identifier, only meaningful as a constructor argument
    Ident(String),
    List(Vec<Spanned<Expr>>),
    Dict(Vec<(Spanned<String>, Spanned<Expr>)>),
    /// Constructor call such as `loc(1, 2, 3, pitch: 10)`
    Call {
        name: Spanned<String>,
        args: Vec<Arg>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Positional(Spanned<Expr>),
    Named {
        name: Spanned<String>,
        value: Spanned<Expr>,
    },
}
