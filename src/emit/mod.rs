//! Codeblock emission
//!
//! Translates the resolved flat node sequence into platform block records.
//! Each action becomes one codeblock; each scope boundary becomes a header
//! block and/or bracket. Parameters are checked against the schema table and
//! placed into consecutive slots, with block tags filling the final slots.

pub mod schema;

pub use schema::{ActionSchema, ParamKind, ParamSpec, SchemaError, SchemaTable, TagSpec};

use tracing::{debug, trace};

use crate::block::{
    TargetSide, Target, DEFINITION_ACTION, ELSE_BLOCK, FUNCTION_BLOCK, PROCESS_BLOCK,
    REPEAT_BLOCK,
};
use crate::config::Limits;
use crate::error::CompileError;
use crate::graph::{ActionNode, Definition, FlatNode, ScopeHeader, ScopeKind};
use crate::template::{Args, BlockRecord, Bracket, BracketType, CodeBlock, ItemSlot};
use crate::value::{ItemValue, Value, ValueError};

/// Emits block records from a resolved node sequence
pub struct Emitter<'a> {
    schema: &'a SchemaTable,
    limits: &'a Limits,
}

/// Identifies the codeblock being emitted, for error reporting
struct Site<'s> {
    index: usize,
    block: &'s str,
    action: &'s str,
}

impl Site<'_> {
    fn mismatch(&self, schema: &ActionSchema, detail: impl Into<String>) -> CompileError {
        CompileError::ParameterMismatch {
            index: self.index,
            block: self.block.to_string(),
            action: self.action.to_string(),
            expected: schema.signature(),
            detail: detail.into(),
        }
    }

    fn invalid(&self, source: ValueError) -> CompileError {
        CompileError::InvalidValue {
            index: self.index,
            source,
        }
    }
}

impl<'a> Emitter<'a> {
    pub fn new(schema: &'a SchemaTable, limits: &'a Limits) -> Self {
        Self { schema, limits }
    }

    /// Emit records for the whole sequence, in order
    pub fn emit(&self, nodes: &[FlatNode]) -> Result<Vec<BlockRecord>, CompileError> {
        check_headers(nodes)?;

        let mut records = Vec::with_capacity(nodes.len() + nodes.len() / 2);
        for node in nodes {
            match node {
                FlatNode::Action(action) => records.push(self.emit_action(action)?),
                FlatNode::Open { index, header } => self.emit_open(*index, header, &mut records)?,
                FlatNode::Close {
                    kind, else_marker, ..
                } => emit_close(*kind, *else_marker, &mut records),
            }
        }
        debug!(
            nodes = nodes.len(),
            records = records.len(),
            "emitted block records"
        );
        Ok(records)
    }

    fn emit_action(&self, node: &ActionNode) -> Result<BlockRecord, CompileError> {
        let block = node.category.block_id();
        let site = Site {
            index: node.index,
            block,
            action: &node.action,
        };
        check_target(&site, node.category.target_side(), node.target)?;

        if node.category.is_call() {
            let extra = node.params.len() + node.tags.len();
            if extra > 0 {
                return Err(CompileError::ParameterMismatch {
                    index: node.index,
                    block: block.to_string(),
                    action: node.action.clone(),
                    expected: "()".to_string(),
                    detail: format!("calls take no parameters, {extra} given"),
                });
            }
            self.check_name(&site, &node.action)?;
            trace!(block, name = %node.action, "call block");
            return Ok(BlockRecord::Block(
                CodeBlock::new(block).with_data(node.action.clone()),
            ));
        }

        let schema = self.lookup(&site)?;
        let args = self.encode_args(&site, schema, &node.params, &node.tags)?;
        let mut record = CodeBlock::new(block)
            .with_action(node.action.clone())
            .with_args(args);
        record.target = node.target.map(|t| t.as_str().to_string());
        trace!(block, action = %node.action, "codeblock");
        Ok(BlockRecord::Block(record))
    }

    fn emit_open(
        &self,
        index: usize,
        header: &ScopeHeader,
        records: &mut Vec<BlockRecord>,
    ) -> Result<(), CompileError> {
        match header {
            ScopeHeader::If(cond) | ScopeHeader::IfElse(cond) => {
                let block = cond.category.block_id();
                let site = Site {
                    index,
                    block,
                    action: &cond.action,
                };
                check_target(&site, cond.category.target_side(), cond.target)?;
                let schema = self.lookup(&site)?;
                let args = self.encode_args(&site, schema, &cond.values, &cond.tags)?;
                let mut record = CodeBlock::new(block)
                    .with_action(cond.action.clone())
                    .with_args(args);
                record.target = cond.target.map(|t| t.as_str().to_string());
                record.inverted = cond.negated.then(|| "NOT".to_string());
                trace!(block, action = %cond.action, negated = cond.negated, "condition");
                records.push(BlockRecord::Block(record));
                records.push(BlockRecord::Bracket(Bracket::open(BracketType::Normal)));
            }
            ScopeHeader::Repeat(repeat) => {
                let site = Site {
                    index,
                    block: REPEAT_BLOCK,
                    action: &repeat.action,
                };
                let schema = self.lookup(&site)?;
                let args = self.encode_args(&site, schema, &repeat.values, &repeat.tags)?;
                let mut record = CodeBlock::new(REPEAT_BLOCK)
                    .with_action(repeat.action.clone())
                    .with_args(args);
                record.sub_action = repeat.sub_action.clone();
                record.inverted = repeat.negated.then(|| "NOT".to_string());
                trace!(action = %repeat.action, "repeat");
                records.push(BlockRecord::Block(record));
                records.push(BlockRecord::Bracket(Bracket::open(BracketType::Repeat)));
            }
            ScopeHeader::FunctionDef(def) => {
                records.push(self.emit_definition(index, FUNCTION_BLOCK, def)?);
            }
            ScopeHeader::Process(def) => {
                records.push(self.emit_definition(index, PROCESS_BLOCK, def)?);
            }
        }
        Ok(())
    }

    fn emit_definition(
        &self,
        index: usize,
        block: &str,
        def: &Definition,
    ) -> Result<BlockRecord, CompileError> {
        let site = Site {
            index,
            block,
            action: DEFINITION_ACTION,
        };
        self.check_name(&site, &def.name)?;
        let schema = self.lookup(&site)?;
        let args = self.encode_args(&site, schema, &def.values, &def.tags)?;
        trace!(block, name = %def.name, "definition");
        Ok(BlockRecord::Block(
            CodeBlock::new(block)
                .with_data(def.name.clone())
                .with_args(args),
        ))
    }

    fn lookup(&self, site: &Site<'_>) -> Result<&'a ActionSchema, CompileError> {
        self.schema
            .lookup(site.block, site.action)
            .ok_or_else(|| CompileError::UnknownAction {
                index: site.index,
                block: site.block.to_string(),
                action: site.action.to_string(),
            })
    }

    fn check_name(&self, site: &Site<'_>, name: &str) -> Result<(), CompileError> {
        if name.is_empty() {
            return Err(site.invalid(ValueError::Empty {
                field: "function name",
            }));
        }
        let len = name.chars().count();
        if len > self.limits.max_function_name_length {
            return Err(site.invalid(ValueError::TooLong {
                field: "function name",
                len,
                max: self.limits.max_function_name_length,
            }));
        }
        Ok(())
    }

    /// Match values against the schema and lay out parameter and tag slots
    fn encode_args(
        &self,
        site: &Site<'_>,
        schema: &ActionSchema,
        values: &[Value],
        tags: &[(String, String)],
    ) -> Result<Args, CompileError> {
        let param_slots = self.limits.max_parameters.saturating_sub(schema.tags.len());
        let mut items = Vec::new();
        let mut given = values.iter().enumerate().peekable();

        for (position, spec) in schema.params.iter().enumerate() {
            if spec.plural {
                let mut matched = 0;
                for (_, value) in given.by_ref() {
                    match value {
                        Value::List(elements) if spec.kind != ParamKind::List => {
                            for element in elements {
                                let slot = (position, element, param_slots);
                                self.push_param(site, schema, spec, slot, &mut items)?;
                                matched += 1;
                            }
                        }
                        _ => {
                            let slot = (position, value, param_slots);
                            self.push_param(site, schema, spec, slot, &mut items)?;
                            matched += 1;
                        }
                    }
                }
                if matched == 0 && !spec.optional {
                    return Err(site.mismatch(
                        schema,
                        format!("missing parameter at position {position}: expected {spec}"),
                    ));
                }
            } else {
                match given.next() {
                    Some((_, value)) => {
                        let slot = (position, value, param_slots);
                        self.push_param(site, schema, spec, slot, &mut items)?
                    }
                    None if spec.optional => {}
                    None => {
                        return Err(site.mismatch(
                            schema,
                            format!("missing parameter at position {position}: expected {spec}"),
                        ))
                    }
                }
            }
        }

        if let Some((position, value)) = given.next() {
            return Err(site.mismatch(
                schema,
                format!(
                    "unexpected {} at position {position}: takes at most {} parameters",
                    value.kind(),
                    schema.params.len()
                ),
            ));
        }

        for (tag, option) in tags {
            let spec = schema
                .tag(tag)
                .ok_or_else(|| site.mismatch(schema, format!("unknown tag '{tag}'")))?;
            if !spec.options.contains(option) {
                return Err(site.mismatch(
                    schema,
                    format!(
                        "'{option}' is not an option of tag '{tag}' (expected one of: {})",
                        spec.options.join(", ")
                    ),
                ));
            }
        }
        if tags.len() > 1 {
            for (i, (tag, _)) in tags.iter().enumerate() {
                if tags[..i].iter().any(|(earlier, _)| earlier == tag) {
                    return Err(site.mismatch(schema, format!("tag '{tag}' given twice")));
                }
            }
        }

        for (i, spec) in schema.tags.iter().enumerate() {
            let option = tags
                .iter()
                .find(|(name, _)| *name == spec.name)
                .map(|(_, option)| option.clone())
                .unwrap_or_else(|| spec.default.clone());
            items.push(ItemSlot {
                item: ItemValue::Tag {
                    option,
                    tag: spec.name.clone(),
                    action: site.action.to_string(),
                    block: site.block.to_string(),
                },
                slot: param_slots + i,
            });
        }

        Ok(Args { items })
    }

    /// `placement` is (schema position, value, parameter slots available)
    fn push_param(
        &self,
        site: &Site<'_>,
        schema: &ActionSchema,
        spec: &ParamSpec,
        placement: (usize, &Value, usize),
        items: &mut Vec<ItemSlot>,
    ) -> Result<(), CompileError> {
        let (position, value, param_slots) = placement;
        if !spec.kind.accepts(value) {
            return Err(site.mismatch(
                schema,
                format!(
                    "parameter at position {position} is a {} but {spec} is expected",
                    value.kind()
                ),
            ));
        }
        let slot = items.len();
        if slot >= param_slots {
            return Err(site.mismatch(
                schema,
                format!("more than {param_slots} parameter slots used"),
            ));
        }
        let item = value.encode(self.limits).map_err(|e| site.invalid(e))?;
        items.push(ItemSlot { item, slot });
        Ok(())
    }
}

fn emit_close(kind: ScopeKind, else_marker: bool, records: &mut Vec<BlockRecord>) {
    let bracket = match kind {
        ScopeKind::If | ScopeKind::IfElse => BracketType::Normal,
        ScopeKind::Repeat => BracketType::Repeat,
        // Definitions span the rest of the line and have no closing bracket
        ScopeKind::FunctionDef | ScopeKind::Process => return,
    };
    records.push(BlockRecord::Bracket(Bracket::close(bracket)));
    if else_marker {
        records.push(BlockRecord::Block(CodeBlock::new(ELSE_BLOCK)));
        records.push(BlockRecord::Bracket(Bracket::open(BracketType::Normal)));
    }
}

fn check_target(
    site: &Site<'_>,
    side: Option<TargetSide>,
    target: Option<Target>,
) -> Result<(), CompileError> {
    let Some(target) = target else {
        return Ok(());
    };
    let allowed = side.is_some_and(|side| target.allowed_on(side));
    if allowed {
        Ok(())
    } else {
        Err(CompileError::InvalidTarget {
            index: site.index,
            block: site.block.to_string(),
            target: target.as_str().to_string(),
        })
    }
}

/// Events and definitions must open the code line; definitions also end it
fn check_headers(nodes: &[FlatNode]) -> Result<(), CompileError> {
    let mut depth = 0i32;
    let mut top_level = 0usize;
    let mut definition_closed: Option<&'static str> = None;

    for node in nodes {
        if let Some(block) = definition_closed {
            return Err(CompileError::MisplacedHeader {
                index: node.index(),
                block: block.to_string(),
                reason: format!("nothing may follow the end of a {block} definition"),
            });
        }

        let header_block = match node {
            FlatNode::Action(action) if action.category.is_event() => {
                Some(action.category.block_id())
            }
            FlatNode::Open { header, .. } => match header.kind() {
                ScopeKind::FunctionDef => Some(FUNCTION_BLOCK),
                ScopeKind::Process => Some(PROCESS_BLOCK),
                _ => None,
            },
            _ => None,
        };
        if let Some(block) = header_block {
            if depth != 0 || top_level != 0 {
                return Err(CompileError::MisplacedHeader {
                    index: node.index(),
                    block: block.to_string(),
                    reason: "must be the first block of the code line".to_string(),
                });
            }
        }

        if depth == 0 && !matches!(node, FlatNode::Close { .. }) {
            top_level += 1;
        }
        depth += node.depth_delta();

        if depth == 0 {
            definition_closed = match node {
                FlatNode::Close {
                    kind: ScopeKind::FunctionDef,
                    ..
                } => Some(FUNCTION_BLOCK),
                FlatNode::Close {
                    kind: ScopeKind::Process,
                    ..
                } => Some(PROCESS_BLOCK),
                _ => None,
            };
        }
    }
    Ok(())
}
