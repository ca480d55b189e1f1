//! Indented, human-readable rendering of a resolved node sequence

use std::fmt::Write;

use crate::block::{FUNCTION_BLOCK, PROCESS_BLOCK, REPEAT_BLOCK};
use crate::graph::{ActionNode, FlatNode, ScopeHeader};
use crate::value::Value;

const INDENT: &str = "    ";

/// Render one line per node; bodies are indented and the else marker shows
/// as `} else {`
pub fn render(nodes: &[FlatNode]) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    for node in nodes {
        match node {
            FlatNode::Action(action) => line(&mut out, depth, &action_line(action)),
            FlatNode::Open { header, .. } => {
                line(&mut out, depth, &format!("{} {{", header_line(header)));
                depth += 1;
            }
            FlatNode::Close {
                else_marker: true, ..
            } => line(&mut out, depth.saturating_sub(1), "} else {"),
            FlatNode::Close { .. } => {
                depth = depth.saturating_sub(1);
                line(&mut out, depth, "}");
            }
        }
    }
    out
}

fn line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

fn action_line(action: &ActionNode) -> String {
    let block = action.category.block_id();
    if action.category.is_call() {
        return format!("{block} {:?}", action.action);
    }
    let mut text = format!("{block} {}", action.action);
    if let Some(target) = action.target {
        let _ = write!(text, " @{target}");
    }
    push_params(&mut text, &action.params);
    push_tags(&mut text, &action.tags);
    text
}

fn header_line(header: &ScopeHeader) -> String {
    match header {
        ScopeHeader::If(cond) | ScopeHeader::IfElse(cond) => {
            let mut text = format!("{} {}", cond.category.block_id(), cond.action);
            if let Some(target) = cond.target {
                let _ = write!(text, " @{target}");
            }
            if cond.negated {
                text.push_str(" NOT");
            }
            push_params(&mut text, &cond.values);
            push_tags(&mut text, &cond.tags);
            text
        }
        ScopeHeader::Repeat(repeat) => {
            let mut text = format!("{REPEAT_BLOCK} {}", repeat.action);
            if let Some(sub) = &repeat.sub_action {
                let _ = write!(text, " {sub}");
            }
            if repeat.negated {
                text.push_str(" NOT");
            }
            push_params(&mut text, &repeat.values);
            push_tags(&mut text, &repeat.tags);
            text
        }
        ScopeHeader::FunctionDef(def) | ScopeHeader::Process(def) => {
            let block = if matches!(header, ScopeHeader::Process(_)) {
                PROCESS_BLOCK
            } else {
                FUNCTION_BLOCK
            };
            let mut text = format!("{block} {:?}", def.name);
            push_params(&mut text, &def.values);
            push_tags(&mut text, &def.tags);
            text
        }
    }
}

fn push_params(text: &mut String, values: &[Value]) {
    if values.is_empty() {
        return;
    }
    let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
    let _ = write!(text, " ({})", rendered.join(", "));
}

fn push_tags(text: &mut String, tags: &[(String, String)]) {
    if tags.is_empty() {
        return;
    }
    let rendered: Vec<String> = tags
        .iter()
        .map(|(tag, option)| format!("{tag:?} = {option:?}"))
        .collect();
    let _ = write!(text, " {{{}}}", rendered.join(", "));
}
