//! Flatten an action graph into a bracket-delimited node sequence

use tracing::debug;

use super::{ActionGraph, ActionNode, Node, ScopeHeader, ScopeKind, ScopeNode};
use crate::error::CompileError;

/// One element of the flat sequence
#[derive(Debug, Clone, PartialEq)]
pub enum FlatNode {
    Action(ActionNode),
    Open {
        index: usize,
        header: ScopeHeader,
    },
    /// With `else_marker` set, closes the true branch of an if-else and opens
    /// its else branch
    Close {
        index: usize,
        kind: ScopeKind,
        else_marker: bool,
    },
}

impl FlatNode {
    /// Call index that produced this node
    pub fn index(&self) -> usize {
        match self {
            FlatNode::Action(action) => action.index,
            FlatNode::Open { index, .. } | FlatNode::Close { index, .. } => *index,
        }
    }

    /// Change in nesting depth caused by this node
    pub fn depth_delta(&self) -> i32 {
        match self {
            FlatNode::Action(_) => 0,
            FlatNode::Open { .. } => 1,
            FlatNode::Close {
                else_marker: true, ..
            } => 0,
            FlatNode::Close { .. } => -1,
        }
    }
}

/// Flatten the graph and verify bracket balance
///
/// A scope that was never closed fails at its open call index.
pub fn resolve(graph: ActionGraph) -> Result<Vec<FlatNode>, CompileError> {
    let mut flat = Vec::new();
    flatten_nodes(graph.nodes, &mut flat)?;
    check_balance(&flat)?;
    debug!(nodes = flat.len(), "resolved brackets");
    Ok(flat)
}

fn flatten_nodes(nodes: Vec<Node>, out: &mut Vec<FlatNode>) -> Result<(), CompileError> {
    for node in nodes {
        match node {
            Node::Action(action) => out.push(FlatNode::Action(action)),
            Node::Scope(scope) => flatten_scope(scope, out)?,
        }
    }
    Ok(())
}

fn flatten_scope(scope: ScopeNode, out: &mut Vec<FlatNode>) -> Result<(), CompileError> {
    let kind = scope.header.kind();
    let close_index = scope.close_index.ok_or_else(|| {
        CompileError::unbalanced(
            scope.open_index,
            format!(
                "{kind} scope opened at call {} is never closed",
                scope.open_index
            ),
        )
    })?;

    out.push(FlatNode::Open {
        index: scope.open_index,
        header: scope.header,
    });
    flatten_nodes(scope.body, out)?;
    if let Some(else_body) = scope.else_body {
        out.push(FlatNode::Close {
            index: scope.else_index.unwrap_or(close_index),
            kind,
            else_marker: true,
        });
        flatten_nodes(else_body, out)?;
    }
    out.push(FlatNode::Close {
        index: close_index,
        kind,
        else_marker: false,
    });
    Ok(())
}

/// Depth must never go negative and must end at zero
fn check_balance(nodes: &[FlatNode]) -> Result<(), CompileError> {
    let mut depth = 0i32;
    let mut open_at = Vec::new();
    for node in nodes {
        match node {
            FlatNode::Open { index, .. } => open_at.push(*index),
            FlatNode::Close {
                else_marker: false, ..
            } => {
                open_at.pop();
            }
            _ => {}
        }
        depth += node.depth_delta();
        if depth < 0 {
            return Err(CompileError::unbalanced(
                node.index(),
                "close without a matching open",
            ));
        }
    }
    match open_at.first() {
        Some(&index) => Err(CompileError::unbalanced(
            index,
            format!("scope opened at call {index} is never closed"),
        )),
        None => Ok(()),
    }
}
