//! Action graph construction
//!
//! [`GraphBuilder`] records builder calls in program order. Every public call
//! (declarations included) consumes the next zero-based call index, which is
//! what errors report. Scopes nest through an explicit stack; nothing is
//! ever reordered.

pub mod resolver;

pub use resolver::{resolve, FlatNode};

use tracing::debug;

use crate::block::{BlockCategory, ConditionCategory, Target};
use crate::error::CompileError;
use crate::registry::{Registry, Variable};
use crate::value::{ScopeClass, Value, ValueKind, VariableRef};

/// A single codeblock invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ActionNode {
    pub category: BlockCategory,
    /// Action identifier, or the callee name for call blocks
    pub action: String,
    pub params: Vec<Value>,
    pub target: Option<Target>,
    /// (tag name, option) pairs
    pub tags: Vec<(String, String)>,
    /// Call index, assigned by the builder
    pub index: usize,
}

impl ActionNode {
    pub fn new(category: BlockCategory, action: impl Into<String>) -> Self {
        Self {
            category,
            action: action.into(),
            params: Vec::new(),
            target: None,
            tags: Vec::new(),
            index: 0,
        }
    }

    pub fn event(action: impl Into<String>) -> Self {
        Self::new(BlockCategory::Event, action)
    }

    pub fn player(action: impl Into<String>) -> Self {
        Self::new(BlockCategory::PlayerAction, action)
    }

    pub fn entity(action: impl Into<String>) -> Self {
        Self::new(BlockCategory::EntityAction, action)
    }

    pub fn game(action: impl Into<String>) -> Self {
        Self::new(BlockCategory::GameAction, action)
    }

    pub fn set_var(action: impl Into<String>) -> Self {
        Self::new(BlockCategory::SetVariable, action)
    }

    pub fn call_function(name: impl Into<String>) -> Self {
        Self::new(BlockCategory::CallFunction, name)
    }

    pub fn start_process(name: impl Into<String>) -> Self {
        Self::new(BlockCategory::StartProcess, name)
    }

    pub fn with_param(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn with_params(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.params.extend(values);
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>, option: impl Into<String>) -> Self {
        self.tags.push((tag.into(), option.into()));
        self
    }
}

/// Header of an if / if-else scope
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub category: ConditionCategory,
    pub action: String,
    pub target: Option<Target>,
    pub values: Vec<Value>,
    pub negated: bool,
    pub tags: Vec<(String, String)>,
}

impl Condition {
    pub fn new(category: ConditionCategory, action: impl Into<String>) -> Self {
        Self {
            category,
            action: action.into(),
            target: None,
            values: Vec::new(),
            negated: false,
            tags: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn with_values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.values.extend(values);
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>, option: impl Into<String>) -> Self {
        self.tags.push((tag.into(), option.into()));
        self
    }
}

/// Header of a repeat scope
#[derive(Debug, Clone, PartialEq)]
pub struct Repeat {
    pub action: String,
    pub values: Vec<Value>,
    /// Condition action for `While`-style repeats
    pub sub_action: Option<String>,
    pub negated: bool,
    pub tags: Vec<(String, String)>,
}

impl Repeat {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            values: Vec::new(),
            sub_action: None,
            negated: false,
            tags: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn with_values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.values.extend(values);
        self
    }

    pub fn with_sub_action(mut self, sub_action: impl Into<String>) -> Self {
        self.sub_action = Some(sub_action.into());
        self
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>, option: impl Into<String>) -> Self {
        self.tags.push((tag.into(), option.into()));
        self
    }
}

/// Header of a function or process definition
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub values: Vec<Value>,
    pub tags: Vec<(String, String)>,
}

impl Definition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>, option: impl Into<String>) -> Self {
        self.tags.push((tag.into(), option.into()));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    If,
    IfElse,
    Repeat,
    FunctionDef,
    Process,
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScopeKind::If => "if",
            ScopeKind::IfElse => "if-else",
            ScopeKind::Repeat => "repeat",
            ScopeKind::FunctionDef => "function",
            ScopeKind::Process => "process",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeHeader {
    If(Condition),
    IfElse(Condition),
    Repeat(Repeat),
    FunctionDef(Definition),
    Process(Definition),
}

impl ScopeHeader {
    pub fn kind(&self) -> ScopeKind {
        match self {
            ScopeHeader::If(_) => ScopeKind::If,
            ScopeHeader::IfElse(_) => ScopeKind::IfElse,
            ScopeHeader::Repeat(_) => ScopeKind::Repeat,
            ScopeHeader::FunctionDef(_) => ScopeKind::FunctionDef,
            ScopeHeader::Process(_) => ScopeKind::Process,
        }
    }

    pub fn values(&self) -> &[Value] {
        match self {
            ScopeHeader::If(c) | ScopeHeader::IfElse(c) => &c.values,
            ScopeHeader::Repeat(r) => &r.values,
            ScopeHeader::FunctionDef(d) | ScopeHeader::Process(d) => &d.values,
        }
    }
}

/// A bracketed region of the graph
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeNode {
    pub header: ScopeHeader,
    pub body: Vec<Node>,
    /// Present only for `IfElse`
    pub else_body: Option<Vec<Node>>,
    pub open_index: usize,
    /// Call index of the `else_branch` call, if one was made
    pub else_index: Option<usize>,
    /// `None` when the scope was never closed
    pub close_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Action(ActionNode),
    Scope(ScopeNode),
}

/// The finished, immutable result of a builder session
#[derive(Debug)]
pub struct ActionGraph {
    pub nodes: Vec<Node>,
    registry: Registry,
    calls: usize,
}

impl ActionGraph {
    /// Every variable declared while building
    pub fn variables(&self) -> Vec<&Variable> {
        self.registry.variables()
    }

    /// The registry the graph was built with, frames included
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of builder calls that produced this graph
    pub fn calls(&self) -> usize {
        self.calls
    }
}

struct OpenScope {
    node: ScopeNode,
    in_else: bool,
}

/// Accumulates builder calls into an [`ActionGraph`]
pub struct GraphBuilder {
    root: Vec<Node>,
    stack: Vec<OpenScope>,
    registry: Registry,
    next_index: usize,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            root: Vec::new(),
            stack: Vec::new(),
            registry: Registry::new(),
            next_index: 0,
        }
    }

    /// Index the next call will receive
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Number of scopes currently open
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Declare a variable in the current scope
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        scope: ScopeClass,
        kind: Option<ValueKind>,
    ) -> VariableRef {
        self.next_call();
        self.registry.declare(name, scope, kind)
    }

    /// Resolve a visible variable into a value
    ///
    /// Does not consume a call index; a failure reports the index of the call
    /// the value is being built for.
    pub fn var(&self, name: &str) -> Result<Value, CompileError> {
        self.registry
            .resolve(name)
            .map(Value::Variable)
            .map_err(|_| CompileError::UnknownVariable {
                index: self.next_index,
                name: name.to_string(),
            })
    }

    /// Append an action to the innermost open body
    pub fn add_action(&mut self, mut node: ActionNode) -> Result<(), CompileError> {
        let index = self.next_call();
        self.check_visible(index, &node.params)?;
        node.index = index;
        self.current_body().push(Node::Action(node));
        Ok(())
    }

    /// Open a new scope; later calls land in its body until it is closed
    pub fn open_scope(&mut self, header: ScopeHeader) -> Result<(), CompileError> {
        let index = self.next_call();
        self.check_visible(index, header.values())?;
        let else_body = (header.kind() == ScopeKind::IfElse).then(Vec::new);
        self.registry.enter_scope();
        self.stack.push(OpenScope {
            node: ScopeNode {
                header,
                body: Vec::new(),
                else_body,
                open_index: index,
                else_index: None,
                close_index: None,
            },
            in_else: false,
        });
        Ok(())
    }

    /// Switch the innermost if-else scope to its else branch
    pub fn else_branch(&mut self) -> Result<(), CompileError> {
        let index = self.next_call();
        let top = self
            .stack
            .last_mut()
            .ok_or_else(|| CompileError::unbalanced(index, "else outside of an if-else scope"))?;
        if top.node.header.kind() != ScopeKind::IfElse {
            return Err(CompileError::unbalanced(
                index,
                format!(
                    "else inside a {} scope opened at call {}",
                    top.node.header.kind(),
                    top.node.open_index
                ),
            ));
        }
        if top.in_else {
            return Err(CompileError::unbalanced(
                index,
                format!(
                    "if-else scope opened at call {} already switched to its else branch",
                    top.node.open_index
                ),
            ));
        }
        top.in_else = true;
        top.node.else_index = Some(index);
        // The else branch does not see the true branch's declarations
        self.registry.exit_scope();
        self.registry.enter_scope();
        Ok(())
    }

    /// Close the innermost open scope
    pub fn close_scope(&mut self) -> Result<(), CompileError> {
        let index = self.next_call();
        let mut open = self
            .stack
            .pop()
            .ok_or_else(|| CompileError::unbalanced(index, "close without an open scope"))?;
        self.registry.exit_scope();
        open.node.close_index = Some(index);
        self.current_body().push(Node::Scope(open.node));
        Ok(())
    }

    /// Finish building; scopes still open are kept without a close index
    pub fn finish(mut self) -> ActionGraph {
        while let Some(open) = self.stack.pop() {
            self.current_body().push(Node::Scope(open.node));
        }
        debug!(
            calls = self.next_index,
            top_level = self.root.len(),
            variables = self.registry.variables().len(),
            "action graph finished"
        );
        ActionGraph {
            nodes: self.root,
            registry: self.registry,
            calls: self.next_index,
        }
    }

    fn next_call(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    fn current_body(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(open) if open.in_else => open.node.else_body.get_or_insert_with(Vec::new),
            Some(open) => &mut open.node.body,
            None => &mut self.root,
        }
    }

    fn check_visible(&self, index: usize, values: &[Value]) -> Result<(), CompileError> {
        for var in values.iter().flat_map(Value::variables) {
            if !self.registry.is_visible(var) {
                return Err(CompileError::UnknownVariable {
                    index,
                    name: var.name.clone(),
                });
            }
        }
        Ok(())
    }
}
