//! Call-script parser using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use super::ast::*;
use super::lexer::Token;
use crate::block::{BlockCategory, ConditionCategory};
use crate::error::ScriptError;
use crate::value::{ScopeClass, ValueKind};

/// Parse call-script source into statements
pub fn parse(input: &str) -> Result<Script, Vec<ScriptError>> {
    let len = input.len();

    let mut tokens = Vec::new();
    let mut unreadable = Vec::new();
    for item in super::lexer::lex(input) {
        match item {
            Ok((tok, span)) => tokens.push((tok, SimpleSpan::from(span))),
            Err(span) => unreadable.push(ScriptError::Syntax {
                message: format!("Unrecognized input '{}'", &input[span.clone()]),
                span,
                expected: Vec::new(),
            }),
        }
    }
    // A script with unreadable input never reaches the parser
    if !unreadable.is_empty() {
        return Err(unreadable);
    }

    // Turn the token list into a stream that chumsky can use
    let token_stream = Stream::from_iter(tokens)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    script_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn script_parser<'a, I>() -> impl Parser<'a, I, Script, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let ident = select! {
        Token::Ident(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    let string = select! {
        Token::String(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    // Action and condition names may be bare or quoted ("+=", "Send Message")
    let name = choice((ident.clone(), string.clone()));

    let expr = recursive(|expr| {
        let named_arg = ident
            .clone()
            .then_ignore(just(Token::Colon))
            .then(expr.clone())
            .map(|(name, value)| Arg::Named { name, value });
        let arg = named_arg.or(expr.clone().map(Arg::Positional));

        let call = ident
            .clone()
            .then(
                arg.separated_by(just(Token::Comma))
                    .allow_trailing()
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
            )
            .map(|(name, args)| Expr::Call { name, args });

        let list = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(Expr::List);

        let dict = string
            .clone()
            .then_ignore(just(Token::Colon))
            .then(expr.clone())
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
            .map(Expr::Dict);

        let literal = select! {
            Token::String(s) => Expr::String(s),
            Token::Number(n) => Expr::Number(n),
        };

        choice((
            literal,
            call,
            ident.clone().map(|id| Expr::Ident(id.node)),
            list,
            dict,
        ))
        .map_with(|expr, e| Spanned::new(expr, span_range(&e.span())))
        .boxed()
    });

    let args = expr
        .clone()
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
        .or_not()
        .map(Option::unwrap_or_default);

    let tag = string
        .clone()
        .then_ignore(just(Token::Equals))
        .then(string.clone())
        .map(|(tag, option)| TagAssign { tag, option });

    let tags = tag
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
        .or_not()
        .map(Option::unwrap_or_default);

    let target = just(Token::At).ignore_then(ident.clone()).or_not();
    let negated = just(Token::Not).or_not().map(|n| n.is_some());

    // Category words are plain identifiers validated here
    let action_category = ident.clone().try_map(|id, span| match id.node.as_str() {
        "player" => Ok(BlockCategory::PlayerAction),
        "entity" => Ok(BlockCategory::EntityAction),
        "game" => Ok(BlockCategory::GameAction),
        "control" => Ok(BlockCategory::Control),
        "set" => Ok(BlockCategory::SetVariable),
        "select" => Ok(BlockCategory::SelectObject),
        other => Err(Rich::custom(
            span,
            format!(
                "Unknown action category '{other}', expected player, entity, game, control, set or select"
            ),
        )),
    });

    let condition_category = ident.clone().try_map(|id, span| match id.node.as_str() {
        "player" => Ok(ConditionCategory::IfPlayer),
        "entity" => Ok(ConditionCategory::IfEntity),
        "game" => Ok(ConditionCategory::IfGame),
        "var" => Ok(ConditionCategory::IfVariable),
        other => Err(Rich::custom(
            span,
            format!("Unknown condition category '{other}', expected player, entity, game or var"),
        )),
    });

    let scope_class = ident.clone().try_map(|id, span| match id.node.as_str() {
        "local" => Ok(ScopeClass::Local),
        "saved" => Ok(ScopeClass::Saved),
        "global" => Ok(ScopeClass::Global),
        other => Err(Rich::custom(
            span,
            format!("Unknown variable scope '{other}', expected local, saved or global"),
        )),
    });

    let value_kind = ident.clone().try_map(|id, span| {
        ValueKind::from_name(&id.node)
            .ok_or_else(|| Rich::custom(span, format!("Unknown value kind '{}'", id.node)))
    });

    // event [player|entity] <Action>
    let event = just(Token::Event)
        .ignore_then(name.clone())
        .then(name.clone().or_not())
        .try_map(|(first, second), _span: SimpleSpan| match second {
            None => Ok(Statement::Event {
                category: BlockCategory::Event,
                action: first,
            }),
            Some(action) => match first.node.as_str() {
                "player" => Ok(Statement::Event {
                    category: BlockCategory::Event,
                    action,
                }),
                "entity" => Ok(Statement::Event {
                    category: BlockCategory::EntityEvent,
                    action,
                }),
                other => Err(Rich::custom(
                    SimpleSpan::from(first.span.clone()),
                    format!("Unknown event category '{other}', expected player or entity"),
                )),
            },
        });

    let declare = just(Token::Declare)
        .ignore_then(scope_class)
        .then(name.clone())
        .then(just(Token::Colon).ignore_then(value_kind).or_not())
        .map(|((scope, name), kind)| Statement::Declare { scope, name, kind });

    let action = just(Token::Action)
        .ignore_then(action_category)
        .then(name.clone())
        .then(target.clone())
        .then(args.clone())
        .then(tags.clone())
        .map(|((((category, action), target), args), tags)| {
            Statement::Action(ActionStmt {
                category,
                action,
                target,
                args,
                tags,
            })
        });

    let call = just(Token::Call)
        .ignore_then(string.clone())
        .map(Statement::Call);

    let start = just(Token::Start)
        .ignore_then(string.clone())
        .map(Statement::Start);

    let condition = choice((just(Token::If).to(false), just(Token::IfElse).to(true)))
        .then(condition_category)
        .then(negated.clone())
        .then(name.clone())
        .then(target)
        .then(args.clone())
        .then(tags.clone())
        .map(
            |((((((has_else, category), negated), action), target), args), tags)| Statement::If {
                has_else,
                condition: ConditionStmt {
                    category,
                    negated,
                    action,
                    target,
                    args,
                    tags,
                },
            },
        );

    let repeat = just(Token::Repeat)
        .ignore_then(name.clone())
        .then(name.clone().or_not())
        .then(negated)
        .then(args.clone())
        .then(tags.clone())
        .map(|((((action, sub_action), negated), args), tags)| {
            Statement::Repeat(RepeatStmt {
                action,
                sub_action,
                negated,
                args,
                tags,
            })
        });

    let definition = string
        .clone()
        .then(args)
        .then(tags)
        .map(|((name, args), tags)| DefinitionStmt { name, args, tags });

    let function = just(Token::Function)
        .ignore_then(definition.clone())
        .map(Statement::Function);

    let process = just(Token::Process)
        .ignore_then(definition)
        .map(Statement::Process);

    let statement = choice((
        event,
        declare,
        action,
        call,
        start,
        condition,
        just(Token::Else).to(Statement::Else),
        just(Token::End).to(Statement::End),
        repeat,
        function,
        process,
    ))
    .map_with(|stmt, e| Spanned::new(stmt, span_range(&e.span())))
    .boxed();

    statement
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
        .map(|statements| Script { statements })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statements(input: &str) -> Vec<Statement> {
        parse(input)
            .expect("Should parse")
            .statements
            .into_iter()
            .map(|s| s.node)
            .collect()
    }

    #[test]
    fn test_event_forms() {
        let stmts = statements("event Join\nevent entity EntityDeath");
        assert!(matches!(
            &stmts[0],
            Statement::Event { category: BlockCategory::Event, action } if action.node == "Join"
        ));
        assert!(matches!(
            &stmts[1],
            Statement::Event { category: BlockCategory::EntityEvent, action } if action.node == "EntityDeath"
        ));
    }

    #[test]
    fn test_action_with_target_args_and_tags() {
        let stmts = statements(
            r#"action player SendMessage @Default ("Test", 5) { "Alignment Mode" = "Centered" }"#,
        );
        match &stmts[0] {
            Statement::Action(action) => {
                assert_eq!(action.category, BlockCategory::PlayerAction);
                assert_eq!(action.action.node, "SendMessage");
                assert_eq!(action.target.as_ref().map(|t| t.node.as_str()), Some("Default"));
                assert_eq!(action.args.len(), 2);
                assert_eq!(action.args[0].node, Expr::String("Test".to_string()));
                assert_eq!(action.args[1].node, Expr::Number(5.0));
                assert_eq!(action.tags.len(), 1);
                assert_eq!(action.tags[0].option.node, "Centered");
            }
            other => panic!("expected action, got {other:?}"),
        }
    }

    #[test]
    fn test_quoted_action_name() {
        let stmts = statements(r#"action set "+=" (var(x), 1)"#);
        match &stmts[0] {
            Statement::Action(action) => {
                assert_eq!(action.action.node, "+=");
                assert!(matches!(&action.args[0].node, Expr::Call { name, .. } if name.node == "var"));
            }
            other => panic!("expected action, got {other:?}"),
        }
    }

    #[test]
    fn test_declare() {
        let stmts = statements("declare saved coins: number\ndeclare local tmp");
        assert!(matches!(
            &stmts[0],
            Statement::Declare { scope: ScopeClass::Saved, kind: Some(ValueKind::Number), name } if name.node == "coins"
        ));
        assert!(matches!(
            &stmts[1],
            Statement::Declare { scope: ScopeClass::Local, kind: None, .. }
        ));
    }

    #[test]
    fn test_control_flow() {
        let stmts = statements(
            "ifelse player not IsSneaking\nelse\nrepeat While IsGrounded not\nend\nend",
        );
        assert!(matches!(
            &stmts[0],
            Statement::If { has_else: true, condition } if condition.negated && condition.category == ConditionCategory::IfPlayer
        ));
        assert_eq!(stmts[1], Statement::Else);
        assert!(matches!(
            &stmts[2],
            Statement::Repeat(r) if r.sub_action.as_ref().map(|s| s.node.as_str()) == Some("IsGrounded") && r.negated
        ));
        assert_eq!(stmts[3], Statement::End);
    }

    #[test]
    fn test_nested_expressions() {
        let stmts = statements(
            r#"action player GiveItems ([item("stone", count: 3), item("dirt")], { "k": loc(1, 2, 3, pitch: 10) })"#,
        );
        match &stmts[0] {
            Statement::Action(action) => {
                assert!(matches!(&action.args[0].node, Expr::List(items) if items.len() == 2));
                match &action.args[1].node {
                    Expr::Dict(entries) => {
                        assert_eq!(entries[0].0.node, "k");
                        match &entries[0].1.node {
                            Expr::Call { args, .. } => {
                                assert_eq!(args.len(), 4);
                                assert!(matches!(&args[3], Arg::Named { name, .. } if name.node == "pitch"));
                            }
                            other => panic!("expected call, got {other:?}"),
                        }
                    }
                    other => panic!("expected dict, got {other:?}"),
                }
            }
            other => panic!("expected action, got {other:?}"),
        }
    }

    #[test]
    fn test_function_and_calls() {
        let stmts = statements(
            "function \"setup\" { \"Is Hidden\" = \"True\" }\ncall \"other\"\nstart \"loop\"\nend",
        );
        assert!(matches!(&stmts[0], Statement::Function(def) if def.name.node == "setup" && def.tags.len() == 1));
        assert!(matches!(&stmts[1], Statement::Call(name) if name.node == "other"));
        assert!(matches!(&stmts[2], Statement::Start(name) if name.node == "loop"));
    }

    #[test]
    fn test_statement_spans() {
        let script = parse("event Join\naction player Heal").expect("Should parse");
        assert_eq!(script.statements[0].span, 0..10);
        assert_eq!(script.statements[1].span, 11..29);
    }

    #[test]
    fn test_unknown_category_is_error() {
        let errors = parse("action wizard Fly").unwrap_err();
        assert!(matches!(
            &errors[0],
            ScriptError::Syntax { message, .. } if message.contains("wizard")
        ));
    }

    #[test]
    fn test_unreadable_characters_are_errors() {
        let source = "event Join $$$ %%%\naction player SendMessage (\"hi\") ;;";
        let errors = parse(source).unwrap_err();
        assert_eq!(errors[0].span().start, 11);
        for error in &errors {
            let text = &source[error.span().clone()];
            assert!(text.chars().all(|c| "$%;".contains(c)), "unexpected span text {text:?}");
        }
        let semicolon = source.find(';').unwrap();
        assert!(errors.iter().any(|e| e.span().start == semicolon));
    }

    #[test]
    fn test_syntax_error_reports_expected() {
        let errors = parse("action player SendMessage (\"a\"").unwrap_err();
        assert!(matches!(&errors[0], ScriptError::Syntax { .. }));
    }
}
