//! Replays a parsed call script against a [`GraphBuilder`]
//!
//! Statement `i` becomes builder call `i`, so any compile error's call index
//! points straight back at the statement that caused it.

use tracing::trace;

use super::ast::*;
use crate::block::Target;
use crate::error::{ScriptError, Span};
use crate::graph::{ActionNode, Condition, Definition, GraphBuilder, Repeat, ScopeHeader};
use crate::value::{GameValue, Item, Location, Particle, Potion, Sound, Value, Vector};
use crate::PipelineError;

/// Feed every statement of `script` into `builder`, stopping at the first error
pub fn interpret(script: &Script, builder: &mut GraphBuilder) -> Result<(), PipelineError> {
    for stmt in &script.statements {
        trace!(index = builder.next_index(), "interpreting statement");
        let span = &stmt.span;
        let result = match &stmt.node {
            Statement::Event { category, action } => {
                builder.add_action(ActionNode::new(*category, action.node.clone()))
            }
            Statement::Declare { scope, name, kind } => {
                builder.declare(name.node.clone(), *scope, *kind);
                Ok(())
            }
            Statement::Action(action) => {
                let mut node = ActionNode::new(action.category, action.action.node.clone())
                    .with_params(eval_all(&action.args, builder)?);
                if let Some(target) = &action.target {
                    node = node.with_target(target_of(target)?);
                }
                node.tags = tags_of(&action.tags);
                builder.add_action(node)
            }
            Statement::Call(name) => builder.add_action(ActionNode::call_function(name.node.clone())),
            Statement::Start(name) => builder.add_action(ActionNode::start_process(name.node.clone())),
            Statement::If {
                has_else,
                condition: cond,
            } => {
                let mut condition = Condition::new(cond.category, cond.action.node.clone())
                    .with_values(eval_all(&cond.args, builder)?);
                condition.negated = cond.negated;
                if let Some(target) = &cond.target {
                    condition = condition.with_target(target_of(target)?);
                }
                condition.tags = tags_of(&cond.tags);
                let header = if *has_else {
                    ScopeHeader::IfElse(condition)
                } else {
                    ScopeHeader::If(condition)
                };
                builder.open_scope(header)
            }
            Statement::Else => builder.else_branch(),
            Statement::End => builder.close_scope(),
            Statement::Repeat(rep) => {
                let mut repeat =
                    Repeat::new(rep.action.node.clone()).with_values(eval_all(&rep.args, builder)?);
                if let Some(sub) = &rep.sub_action {
                    repeat = repeat.with_sub_action(sub.node.clone());
                }
                repeat.negated = rep.negated;
                repeat.tags = tags_of(&rep.tags);
                builder.open_scope(ScopeHeader::Repeat(repeat))
            }
            Statement::Function(def) => {
                builder.open_scope(ScopeHeader::FunctionDef(definition(def, builder)?))
            }
            Statement::Process(def) => {
                builder.open_scope(ScopeHeader::Process(definition(def, builder)?))
            }
        };
        result.map_err(|error| PipelineError::Compile {
            error,
            span: Some(span.clone()),
        })?;
    }
    Ok(())
}

fn definition(def: &DefinitionStmt, builder: &GraphBuilder) -> Result<Definition, PipelineError> {
    let mut definition = Definition::new(def.name.node.clone());
    definition.values = eval_all(&def.args, builder)?;
    definition.tags = tags_of(&def.tags);
    Ok(definition)
}

fn tags_of(tags: &[TagAssign]) -> Vec<(String, String)> {
    tags.iter()
        .map(|t| (t.tag.node.clone(), t.option.node.clone()))
        .collect()
}

fn target_of(target: &Spanned<String>) -> Result<Target, PipelineError> {
    Target::from_name(&target.node).ok_or_else(|| {
        script_error(ScriptError::invalid(
            target.span.clone(),
            format!("Unknown target '@{}'", target.node),
        ))
    })
}

fn script_error(error: ScriptError) -> PipelineError {
    PipelineError::Script(vec![error])
}

fn eval_all(exprs: &[Spanned<Expr>], builder: &GraphBuilder) -> Result<Vec<Value>, PipelineError> {
    exprs.iter().map(|e| eval(e, builder)).collect()
}

fn eval(expr: &Spanned<Expr>, builder: &GraphBuilder) -> Result<Value, PipelineError> {
    match &expr.node {
        Expr::String(s) => Ok(Value::Text(s.clone())),
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Ident(name) => Err(script_error(ScriptError::invalid(
            expr.span.clone(),
            format!("Bare identifier '{name}'; write var({name}) or quote it as text"),
        ))),
        Expr::List(items) => Ok(Value::List(eval_all(items, builder)?)),
        Expr::Dict(entries) => entries
            .iter()
            .map(|(key, value)| Ok((key.node.clone(), eval(value, builder)?)))
            .collect::<Result<Vec<_>, PipelineError>>()
            .map(Value::Dict),
        Expr::Call { name, args } => {
            let call = CallArgs::new(name, &expr.span, args);
            construct(&call, builder)
        }
    }
}

/// Build a value from a constructor call like `loc(1, 2, 3, pitch: 10)`
fn construct(call: &CallArgs<'_>, builder: &GraphBuilder) -> Result<Value, PipelineError> {
    match call.name {
        "var" => {
            call.expect(1, 1, &[])?;
            let name = name_of(call.positional[0])?;
            builder.var(&name).map_err(|error| PipelineError::Compile {
                error,
                span: Some(call.span.clone()),
            })
        }
        "loc" => {
            call.expect(3, 3, &["pitch", "yaw", "world", "block"])?;
            let mut loc = Location::new(
                number(call.positional[0])?,
                number(call.positional[1])?,
                number(call.positional[2])?,
            );
            if let Some(pitch) = call.named("pitch") {
                loc = loc.with_pitch(number(pitch)?);
            }
            if let Some(yaw) = call.named("yaw") {
                loc = loc.with_yaw(number(yaw)?);
            }
            if let Some(world) = call.named("world") {
                loc = loc.with_world(text(world)?);
            }
            if let Some(block) = call.named("block") {
                if flag(block)? {
                    loc = loc.as_block();
                }
            }
            Ok(loc.into())
        }
        "vec" => {
            call.expect(3, 3, &[])?;
            Ok(Vector::new(
                number(call.positional[0])?,
                number(call.positional[1])?,
                number(call.positional[2])?,
            )
            .into())
        }
        "item" => {
            call.expect(
                1,
                1,
                &["count", "name", "lore", "damage", "unbreakable", "enchant", "nbt"],
            )?;
            let mut item = Item::new(text(call.positional[0])?);
            if let Some(count) = call.named("count") {
                item = item.with_count(whole(count)?);
            }
            if let Some(name) = call.named("name") {
                item = item.with_name(text(name)?);
            }
            if let Some(lore) = call.named("lore") {
                let lines = match &lore.node {
                    Expr::List(lines) => lines.iter().map(text).collect::<Result<Vec<_>, _>>()?,
                    _ => vec![text(lore)?],
                };
                item = item.with_lore(lines);
            }
            if let Some(damage) = call.named("damage") {
                item = item.with_damage(whole(damage)?);
            }
            if let Some(unbreakable) = call.named("unbreakable") {
                if flag(unbreakable)? {
                    item = item.unbreakable();
                }
            }
            if let Some(enchant) = call.named("enchant") {
                let Expr::Dict(entries) = &enchant.node else {
                    return Err(script_error(ScriptError::invalid(
                        enchant.span.clone(),
                        "enchant expects a dictionary such as { \"sharpness\": 5 }",
                    )));
                };
                for (id, level) in entries {
                    item = item.with_enchantment(id.node.clone(), whole(level)?);
                }
            }
            if let Some(nbt) = call.named("nbt") {
                item = item.with_nbt(text(nbt)?);
            }
            Ok(item.into())
        }
        "sound" => {
            call.expect(1, 1, &["pitch", "volume"])?;
            let mut sound = Sound::new(text(call.positional[0])?);
            if let Some(pitch) = call.named("pitch") {
                sound = sound.with_pitch(number(pitch)?);
            }
            if let Some(volume) = call.named("volume") {
                sound = sound.with_volume(number(volume)?);
            }
            Ok(sound.into())
        }
        "potion" => {
            call.expect(1, 1, &["amplifier", "duration"])?;
            let mut potion = Potion::new(text(call.positional[0])?);
            if let Some(amplifier) = call.named("amplifier") {
                potion = potion.with_amplifier(whole(amplifier)?);
            }
            if let Some(duration) = call.named("duration") {
                potion = potion.with_duration(whole(duration)?);
            }
            Ok(potion.into())
        }
        "particle" => {
            call.expect(1, 1, &[])?;
            Ok(Particle::new(text(call.positional[0])?).into())
        }
        "gval" => {
            call.expect(1, 1, &["target"])?;
            let mut value = GameValue::new(text(call.positional[0])?);
            if let Some(target) = call.named("target") {
                let name = name_of(target)?;
                let target = Target::from_name(&name).ok_or_else(|| {
                    script_error(ScriptError::invalid(
                        target.span.clone(),
                        format!("Unknown target '{name}'"),
                    ))
                })?;
                value = value.with_target(target);
            }
            Ok(value.into())
        }
        other => Err(script_error(ScriptError::invalid(
            call.name_span.clone(),
            format!(
                "Unknown constructor '{other}', expected var, loc, vec, item, sound, potion or gval"
            ),
        ))),
    }
}

/// Constructor arguments split into positional and named parts
struct CallArgs<'s> {
    name: &'s str,
    name_span: &'s Span,
    span: &'s Span,
    positional: Vec<&'s Spanned<Expr>>,
    named: Vec<(&'s Spanned<String>, &'s Spanned<Expr>)>,
}

impl<'s> CallArgs<'s> {
    fn new(name: &'s Spanned<String>, span: &'s Span, args: &'s [Arg]) -> Self {
        let mut positional = Vec::new();
        let mut named = Vec::new();
        for arg in args {
            match arg {
                Arg::Positional(expr) => positional.push(expr),
                Arg::Named { name, value } => named.push((name, value)),
            }
        }
        Self {
            name: &name.node,
            name_span: &name.span,
            span,
            positional,
            named,
        }
    }

    fn expect(&self, min: usize, max: usize, allowed: &[&str]) -> Result<(), PipelineError> {
        let count = self.positional.len();
        if count < min || count > max {
            let wanted = if min == max {
                min.to_string()
            } else {
                format!("{min} to {max}")
            };
            return Err(script_error(ScriptError::invalid(
                self.span.clone(),
                format!("{} takes {wanted} positional arguments, got {count}", self.name),
            )));
        }
        for (i, (key, _)) in self.named.iter().enumerate() {
            if !allowed.contains(&key.node.as_str()) {
                return Err(script_error(ScriptError::invalid(
                    key.span.clone(),
                    format!("{} has no argument named '{}'", self.name, key.node),
                )));
            }
            if self.named[..i].iter().any(|(k, _)| k.node == key.node) {
                return Err(script_error(ScriptError::invalid(
                    key.span.clone(),
                    format!("Argument '{}' given twice", key.node),
                )));
            }
        }
        Ok(())
    }

    fn named(&self, key: &str) -> Option<&'s Spanned<Expr>> {
        self.named
            .iter()
            .find(|(k, _)| k.node == key)
            .map(|(_, value)| *value)
    }
}

fn number(expr: &Spanned<Expr>) -> Result<f64, PipelineError> {
    match &expr.node {
        Expr::Number(n) => Ok(*n),
        _ => Err(script_error(ScriptError::invalid(
            expr.span.clone(),
            "Expected a number",
        ))),
    }
}

/// A non-negative integral number
fn whole(expr: &Spanned<Expr>) -> Result<u32, PipelineError> {
    let n = number(expr)?;
    if n.fract() != 0.0 || n < 0.0 || n > f64::from(u32::MAX) {
        return Err(script_error(ScriptError::invalid(
            expr.span.clone(),
            format!("Expected a whole number, got {n}"),
        )));
    }
    Ok(n as u32)
}

fn text(expr: &Spanned<Expr>) -> Result<String, PipelineError> {
    match &expr.node {
        Expr::String(s) => Ok(s.clone()),
        _ => Err(script_error(ScriptError::invalid(
            expr.span.clone(),
            "Expected a quoted string",
        ))),
    }
}

/// A name given either bare or quoted
fn name_of(expr: &Spanned<Expr>) -> Result<String, PipelineError> {
    match &expr.node {
        Expr::String(s) | Expr::Ident(s) => Ok(s.clone()),
        _ => Err(script_error(ScriptError::invalid(
            expr.span.clone(),
            "Expected a name",
        ))),
    }
}

fn flag(expr: &Spanned<Expr>) -> Result<bool, PipelineError> {
    match &expr.node {
        Expr::Ident(s) if s == "true" => Ok(true),
        Expr::Ident(s) if s == "false" => Ok(false),
        _ => Err(script_error(ScriptError::invalid(
            expr.span.clone(),
            "Expected true or false",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::graph::Node;
    use crate::script::parse;
    use crate::value::ScopeClass;

    fn build(source: &str) -> Result<crate::graph::ActionGraph, PipelineError> {
        let script = parse(source).map_err(PipelineError::Script)?;
        let mut builder = GraphBuilder::new();
        interpret(&script, &mut builder)?;
        Ok(builder.finish())
    }

    fn actions(source: &str) -> Vec<ActionNode> {
        build(source)
            .expect("Should build")
            .nodes
            .into_iter()
            .filter_map(|n| match n {
                Node::Action(a) => Some(a),
                Node::Scope(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_statements_become_calls_in_order() {
        let graph = build(
            "event Join\ndeclare saved coins: number\naction set \"+=\" (var(coins), 1)",
        )
        .unwrap();
        assert_eq!(graph.calls(), 3);
        match &graph.nodes[1] {
            Node::Action(a) => {
                assert_eq!(a.index, 2);
                assert_eq!(a.params.len(), 2);
            }
            other => panic!("expected action, got {other:?}"),
        }
    }

    #[test]
    fn test_constructors() {
        let acts = actions(
            r#"action player Teleport (loc(1, 64, -3, pitch: 10, yaw: 90, block: true))
action player GiveItems (item("diamond_sword", count: 1, name: "&bBlade", lore: ["one", "two"], unbreakable: true, enchant: { "sharpness": 5 }))
action player PlaySound (sound("Pling", pitch: 2))
action player GivePotion (potion("Speed", amplifier: 1, duration: 200))
action player SetVelocity (vec(0, 1, 0))
action player SendMessage (gval("Location", target: Killer))
action player ParticleEffect (particle("Angry Villager"), loc(0, 64, 0))"#,
        );
        match &acts[0].params[0] {
            Value::Location(loc) => {
                assert_eq!((loc.x, loc.y, loc.z), (1.0, 64.0, -3.0));
                assert_eq!((loc.pitch, loc.yaw), (Some(10.0), Some(90.0)));
                assert!(loc.is_block);
            }
            other => panic!("expected location, got {other:?}"),
        }
        match &acts[1].params[0] {
            Value::Item(item) => {
                assert_eq!(item.material, "diamond_sword");
                assert_eq!(item.lore, vec!["one".to_string(), "two".to_string()]);
                assert!(item.unbreakable);
                assert_eq!(item.enchantments[0].level, 5);
            }
            other => panic!("expected item, got {other:?}"),
        }
        assert!(matches!(&acts[2].params[0], Value::Sound(s) if s.pitch == 2.0));
        assert!(matches!(&acts[3].params[0], Value::Potion(p) if p.amplifier == 1 && p.duration == 200));
        assert!(matches!(&acts[4].params[0], Value::Vector(v) if v.y == 1.0));
        assert!(matches!(&acts[5].params[0], Value::GameValue(g) if g.target == Target::Killer));
        assert!(matches!(&acts[6].params[0], Value::Particle(p) if p.name == "Angry Villager"));
    }

    #[test]
    fn test_action_target_and_tags() {
        let acts = actions(
            r#"action player SendMessage @AllPlayers ("hi") { "Alignment Mode" = "Centered" }"#,
        );
        assert_eq!(acts[0].target, Some(Target::AllPlayers));
        assert_eq!(
            acts[0].tags,
            vec![("Alignment Mode".to_string(), "Centered".to_string())]
        );
    }

    #[test]
    fn test_scopes() {
        let graph = build("ifelse player not IsSneaking\naction player Jump\nelse\nend").unwrap();
        match &graph.nodes[0] {
            Node::Scope(scope) => {
                assert!(matches!(&scope.header, ScopeHeader::IfElse(c) if c.negated));
                assert_eq!(scope.else_index, Some(2));
                assert_eq!(scope.close_index, Some(3));
            }
            other => panic!("expected scope, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_variable_points_at_call() {
        let err = build("event Join\naction player SendMessage (var(ghost))").unwrap_err();
        match err {
            PipelineError::Compile {
                error: CompileError::UnknownVariable { index, name },
                span,
            } => {
                assert_eq!(index, 1);
                assert_eq!(name, "ghost");
                assert_eq!(span, Some(38..48));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_builder_error_carries_statement_span() {
        let err = build("event Join\nend").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Compile {
                error: CompileError::UnbalancedScope { index: 1, .. },
                span: Some(ref span),
            } if *span == (11..14)
        ));
    }

    #[test]
    fn test_script_errors() {
        for source in [
            "action player SendMessage (hello)",
            "action player SendMessage (loc(1, 2))",
            "action player SendMessage (item(\"stone\", colour: 1))",
            "action player SendMessage (item(\"stone\", count: 1.5))",
            "action player SendMessage (spell(\"x\"))",
            "action player SendMessage @Nobody",
        ] {
            assert!(
                matches!(build(source), Err(PipelineError::Script(_))),
                "{source} should be rejected"
            );
        }
    }

    #[test]
    fn test_declare_records_variable() {
        let graph = build("declare global total: number").unwrap();
        let vars = graph.variables();
        assert_eq!(vars[0].name, "total");
        assert_eq!(vars[0].scope, ScopeClass::Global);
    }
}
