//! Integration tests for the builder-driven pipeline

use dftemplate::block::{ConditionCategory, Target};
use dftemplate::graph::{ActionNode, Condition, Definition, Repeat, ScopeHeader};
use dftemplate::template::{BlockRecord, BracketDirection, CodeBlock};
use dftemplate::value::{ItemValue, ScopeClass};
use dftemplate::{
    CompileError, Compiler, CompilerConfig, FlatNode, GraphBuilder, TemplateHeader, Value,
};
use pretty_assertions::assert_eq;

fn compiler() -> Compiler<'static> {
    Compiler::new(CompilerConfig::default())
}

fn header() -> TemplateHeader {
    TemplateHeader::new("test", "tester")
}

fn codeblock(record: &BlockRecord) -> &CodeBlock {
    match record {
        BlockRecord::Block(block) => block,
        other => panic!("expected codeblock, got {other:?}"),
    }
}

fn if_player(action: &str) -> ScopeHeader {
    ScopeHeader::If(Condition::new(ConditionCategory::IfPlayer, action))
}

#[test]
fn test_on_join_send_message() {
    let mut builder = GraphBuilder::new();
    builder.add_action(ActionNode::event("Join")).unwrap();
    builder
        .add_action(
            ActionNode::player("SendMessage")
                .with_target(Target::Default)
                .with_param("Test"),
        )
        .unwrap();

    let template = compiler().compile(builder, header()).unwrap();
    let blocks = template.blocks();
    assert_eq!(blocks.len(), 2);

    let event = codeblock(&blocks[0]);
    assert_eq!(event.block, "event");
    assert_eq!(event.action.as_deref(), Some("Join"));

    let send = codeblock(&blocks[1]);
    assert_eq!(send.block, "player_action");
    assert_eq!(send.action.as_deref(), Some("SendMessage"));
    assert_eq!(send.target.as_deref(), Some("Default"));
    let texts: Vec<_> = send
        .args
        .items
        .iter()
        .filter(|slot| matches!(slot.item, ItemValue::Text { .. }))
        .collect();
    assert_eq!(texts.len(), 1);
    assert_eq!(
        texts[0].item,
        ItemValue::Text {
            name: "Test".to_string()
        }
    );
    assert_eq!(texts[0].slot, 0);
}

#[test]
fn test_empty_if_scope() {
    let mut builder = GraphBuilder::new();
    builder.add_action(ActionNode::event("Join")).unwrap();
    builder.open_scope(if_player("IsSneaking")).unwrap();
    builder.close_scope().unwrap();

    let compiled = compiler().compile_detailed(builder, header()).unwrap();
    assert!(matches!(compiled.nodes[1], FlatNode::Open { index: 1, .. }));
    assert!(matches!(compiled.nodes[2], FlatNode::Close { index: 2, .. }));

    let blocks = compiled.template.blocks();
    assert_eq!(blocks.len(), 4);
    assert_eq!(codeblock(&blocks[1]).block, "if_player");
    assert!(matches!(
        &blocks[2],
        BlockRecord::Bracket(b) if b.direct == BracketDirection::Open
    ));
    assert!(matches!(
        &blocks[3],
        BlockRecord::Bracket(b) if b.direct == BracketDirection::Close
    ));
}

#[test]
fn test_over_close_fails_at_that_call() {
    let mut builder = GraphBuilder::new();
    builder.add_action(ActionNode::event("Join")).unwrap();
    builder.open_scope(if_player("IsSneaking")).unwrap();
    builder.close_scope().unwrap();
    let err = builder.close_scope().unwrap_err();
    assert!(matches!(err, CompileError::UnbalancedScope { index: 3, .. }));
    assert_eq!(err.index(), Some(3));
}

#[test]
fn test_missing_parameter_names_position() {
    let mut builder = GraphBuilder::new();
    builder.add_action(ActionNode::event("Join")).unwrap();
    // SetHealth takes one number
    builder.add_action(ActionNode::player("SetHealth")).unwrap();

    match compiler().compile(builder, header()).unwrap_err() {
        CompileError::ParameterMismatch {
            index,
            action,
            detail,
            ..
        } => {
            assert_eq!(index, 1);
            assert_eq!(action, "SetHealth");
            assert!(detail.contains("position 0"), "detail was: {detail}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_order_preserved() {
    let names = ["Heal", "ClearInv", "LaunchUp", "Heal", "SendMessage"];
    let mut builder = GraphBuilder::new();
    builder.add_action(ActionNode::event("Join")).unwrap();
    for name in names {
        let mut node = ActionNode::player(name);
        if name == "LaunchUp" {
            node = node.with_param(2);
        }
        builder.add_action(node).unwrap();
    }

    let template = compiler().compile(builder, header()).unwrap();
    let emitted: Vec<_> = template.blocks()[1..]
        .iter()
        .map(|r| codeblock(r).action.clone().unwrap_or_default())
        .collect();
    assert_eq!(emitted, names.to_vec());
}

#[test]
fn test_brackets_balance_in_every_prefix() {
    let mut builder = GraphBuilder::new();
    builder.add_action(ActionNode::event("Sneak")).unwrap();
    builder
        .open_scope(ScopeHeader::IfElse(Condition::new(
            ConditionCategory::IfPlayer,
            "IsGrounded",
        )))
        .unwrap();
    builder.open_scope(ScopeHeader::Repeat(Repeat::new("Multiple").with_value(3))).unwrap();
    builder.add_action(ActionNode::player("Heal")).unwrap();
    builder.close_scope().unwrap();
    builder.else_branch().unwrap();
    builder.open_scope(if_player("IsSneaking")).unwrap();
    builder.close_scope().unwrap();
    builder.close_scope().unwrap();

    let compiled = compiler().compile_detailed(builder, header()).unwrap();

    let mut depth = 0;
    for node in &compiled.nodes {
        depth += node.depth_delta();
        assert!(depth >= 0);
    }
    assert_eq!(depth, 0);

    let mut open = 0i32;
    for record in compiled.template.blocks() {
        if let BlockRecord::Bracket(bracket) = record {
            match bracket.direct {
                BracketDirection::Open => open += 1,
                BracketDirection::Close => open -= 1,
            }
            assert!(open >= 0);
        }
    }
    assert_eq!(open, 0);
}

#[test]
fn test_unclosed_scope_reported_at_open() {
    let mut builder = GraphBuilder::new();
    builder.add_action(ActionNode::event("Join")).unwrap();
    builder.open_scope(if_player("IsSneaking")).unwrap();
    builder.open_scope(ScopeHeader::Repeat(Repeat::new("Forever"))).unwrap();
    builder.close_scope().unwrap();

    assert!(matches!(
        compiler().compile(builder, header()),
        Err(CompileError::UnbalancedScope { index: 1, .. })
    ));
}

#[test]
fn test_scope_visibility() {
    let mut builder = GraphBuilder::new();
    builder.add_action(ActionNode::event("Join")).unwrap();
    builder.open_scope(if_player("IsSneaking")).unwrap();
    let inner = builder.declare("inner", ScopeClass::Local, None);
    // Visible from a descendant scope
    builder.open_scope(if_player("IsGrounded")).unwrap();
    builder
        .add_action(ActionNode::set_var("=").with_param(inner.clone()).with_param(1))
        .unwrap();
    builder.close_scope().unwrap();
    builder.close_scope().unwrap();

    // A sibling scope did not declare it
    builder.open_scope(if_player("IsSneaking")).unwrap();
    assert!(matches!(
        builder.var("inner"),
        Err(CompileError::UnknownVariable { ref name, .. }) if name == "inner"
    ));
    let err = builder
        .add_action(ActionNode::set_var("=").with_param(inner).with_param(2))
        .unwrap_err();
    assert!(matches!(err, CompileError::UnknownVariable { index: 8, .. }));
}

#[test]
fn test_function_definition_template() {
    let mut builder = GraphBuilder::new();
    builder
        .open_scope(ScopeHeader::FunctionDef(
            Definition::new("greet").with_tag("Is Hidden", "True"),
        ))
        .unwrap();
    builder
        .add_action(ActionNode::player("SendMessage").with_param("hi"))
        .unwrap();
    builder.close_scope().unwrap();

    let template = compiler().compile(builder, header()).unwrap();
    let blocks = template.blocks();
    assert_eq!(blocks.len(), 2);
    let func = codeblock(&blocks[0]);
    assert_eq!(func.block, "func");
    assert_eq!(func.data.as_deref(), Some("greet"));
    assert!(!blocks.iter().any(BlockRecord::is_bracket));
}

#[test]
fn test_variables_and_values_encode() {
    let mut builder = GraphBuilder::new();
    let coins = builder.declare("coins", ScopeClass::Saved, None);
    builder.add_action(ActionNode::event("Join")).unwrap();
    builder
        .add_action(
            ActionNode::set_var("=")
                .with_param(coins)
                .with_param(Value::list([Value::number(1.0), Value::text("two")])),
        )
        .unwrap();

    let template = compiler().compile(builder, header()).unwrap();
    let set = codeblock(&template.blocks()[1]);
    assert_eq!(
        set.args.items[0].item,
        ItemValue::Variable {
            name: "coins".to_string(),
            scope: "saved".to_string()
        }
    );
    assert!(matches!(&set.args.items[1].item, ItemValue::List { values } if values.len() == 2));
}
