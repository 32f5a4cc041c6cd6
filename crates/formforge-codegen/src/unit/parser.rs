//! Unit parser.
//!
//! Parsing runs in two passes: tokens are read into a bracket tree, then the
//! tree is resolved into a [`Unit`]. The second pass binds builtins, checks
//! arity and variable scope, folds constant collections, and reconstructs
//! strategy literals through their serde form.

use std::sync::Arc;

use formforge_core::{FormResult, FormforgeError, Value, ValueMap};
use formforge_forms::{Constraint, Transform, ViewConfig};
use serde::de::DeserializeOwned;

use super::ast::{method_params, Expr, FieldStmt, Method, Unit, UnitKind};
use super::builtins::Builtin;
use super::lexer::{tokenize, Spanned, Token};

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Str(String),
    Int(i64),
    Float(f64),
    Symbol(String),
    Paren(Vec<Located>),
    Bracket(Vec<Located>),
    Brace(Vec<Located>),
}

#[derive(Debug, Clone, PartialEq)]
struct Located {
    node: Node,
    line: usize,
}

fn syntax(line: usize, message: impl Into<String>) -> FormforgeError {
    FormforgeError::UnitSyntax {
        line,
        message: message.into(),
    }
}

fn contract(line: usize, message: impl std::fmt::Display) -> FormforgeError {
    FormforgeError::UnitContract(format!("line {line}: {message}"))
}

// ── Pass one: bracket tree ─────────────────────────────────────────────

fn read_tree(tokens: Vec<Spanned>) -> FormResult<Vec<Located>> {
    let mut stack: Vec<(Token, usize, Vec<Located>)> = Vec::new();
    let mut top = Vec::new();

    for Spanned { token, line } in tokens {
        let located = match token {
            Token::OpenParen | Token::OpenBracket | Token::OpenBrace => {
                stack.push((token, line, Vec::new()));
                continue;
            }
            Token::CloseParen | Token::CloseBracket | Token::CloseBrace => {
                let Some((open, start, items)) = stack.pop() else {
                    return Err(syntax(line, "unbalanced closing bracket"));
                };
                let node = match (open, token) {
                    (Token::OpenParen, Token::CloseParen) => Node::Paren(items),
                    (Token::OpenBracket, Token::CloseBracket) => Node::Bracket(items),
                    (Token::OpenBrace, Token::CloseBrace) => Node::Brace(items),
                    _ => return Err(syntax(line, format!("mismatched bracket opened on line {start}"))),
                };
                Located { node, line: start }
            }
            Token::Str(s) => Located {
                node: Node::Str(s),
                line,
            },
            Token::Int(i) => Located {
                node: Node::Int(i),
                line,
            },
            Token::Float(f) => Located {
                node: Node::Float(f),
                line,
            },
            Token::Symbol(s) => Located {
                node: Node::Symbol(s),
                line,
            },
        };
        match stack.last_mut() {
            Some((_, _, items)) => items.push(located),
            None => top.push(located),
        }
    }

    if let Some((_, start, _)) = stack.last() {
        return Err(syntax(*start, "unclosed bracket"));
    }
    Ok(top)
}

// ── Pass two: resolution ───────────────────────────────────────────────

fn expect_str(located: &Located, what: &str) -> FormResult<String> {
    match &located.node {
        Node::Str(s) => Ok(s.clone()),
        _ => Err(syntax(located.line, format!("expected {what} as a string"))),
    }
}

fn expect_symbol<'n>(located: &'n Located, what: &str) -> FormResult<&'n str> {
    match &located.node {
        Node::Symbol(s) => Ok(s),
        _ => Err(syntax(located.line, format!("expected {what}"))),
    }
}

fn expect_form<'n>(located: &'n Located, head: &str) -> FormResult<&'n [Located]> {
    match &located.node {
        Node::Paren(items) if items.first().is_some_and(|h| h.node == Node::Symbol(head.into())) => {
            Ok(&items[1..])
        }
        _ => Err(syntax(located.line, format!("expected a ({head} ..) form"))),
    }
}

/// Parses unit source text.
///
/// # Errors
///
/// Returns [`FormforgeError::UnitSyntax`] for malformed text,
/// [`FormforgeError::UnitContract`] for unknown names, wrong arity and
/// misplaced methods, and [`FormforgeError::Serialization`] for strategy
/// literals that do not deserialize.
pub fn parse_unit(source: &str) -> FormResult<Unit> {
    let tree = read_tree(tokenize(source)?)?;
    let [root] = tree.as_slice() else {
        let line = tree.get(1).map_or(1, |l| l.line);
        return Err(syntax(line, "expected exactly one (unit ..) form"));
    };
    let body = expect_form(root, "unit")?;
    if body.len() < 3 {
        return Err(syntax(root.line, "unit header needs a kind, a name and a fingerprint"));
    }
    let keyword = expect_symbol(&body[0], "a unit kind")?;
    let kind = UnitKind::from_keyword(keyword)
        .ok_or_else(|| contract(body[0].line, format!("unknown unit kind '{keyword}'")))?;
    let name = expect_str(&body[1], "the unit name")?;
    let fingerprint = expect_str(&body[2], "the unit fingerprint")?;

    let mut methods: Vec<Method> = Vec::new();
    for located in &body[3..] {
        let method = parse_method(located, kind)?;
        if methods.iter().any(|m| m.name == method.name) {
            return Err(contract(located.line, format!("method '{}' defined twice", method.name)));
        }
        methods.push(method);
    }

    Ok(Unit {
        kind,
        name,
        fingerprint,
        methods,
    })
}

fn parse_method(located: &Located, kind: UnitKind) -> FormResult<Method> {
    let body = expect_form(located, "method")?;
    let Some(head) = body.first() else {
        return Err(syntax(located.line, "method needs a name"));
    };
    let name = expect_symbol(head, "a method name")?;
    if !kind.methods().contains(&name) {
        return Err(contract(head.line, format!("{kind} units have no method '{name}'")));
    }
    let params = method_params(name).unwrap_or_default();
    let mut scope: Vec<String> = params.iter().map(|p| (*p).to_string()).collect();

    let fields = body[1..]
        .iter()
        .map(|stmt| {
            let parts = expect_form(stmt, "field")?;
            let [field, key, expr] = parts else {
                return Err(syntax(stmt.line, "field needs a name, a key and an expression"));
            };
            Ok(FieldStmt {
                field: expect_str(field, "the field name")?,
                key: expect_str(key, "the field key")?,
                expr: resolve(expr, &mut scope)?,
            })
        })
        .collect::<FormResult<Vec<_>>>()?;

    Ok(Method {
        name: name.to_string(),
        fields,
    })
}

fn as_literal(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Literal(value) => Some(value),
        _ => None,
    }
}

fn resolve(located: &Located, scope: &mut Vec<String>) -> FormResult<Expr> {
    let line = located.line;
    match &located.node {
        Node::Str(s) => Ok(Expr::Literal(Value::String(s.clone()))),
        Node::Int(i) => Ok(Expr::Literal(Value::Int(*i))),
        Node::Float(f) => Ok(Expr::Literal(Value::Float(*f))),
        Node::Symbol(s) => match s.as_str() {
            "null" => Ok(Expr::Literal(Value::Null)),
            "true" => Ok(Expr::Literal(Value::Bool(true))),
            "false" => Ok(Expr::Literal(Value::Bool(false))),
            var if var.starts_with('$') => {
                if scope.iter().any(|bound| bound == var) {
                    Ok(Expr::Var(var.to_string()))
                } else {
                    Err(contract(line, format!("unbound variable {var}")))
                }
            }
            other => Err(syntax(line, format!("unexpected symbol '{other}'"))),
        },
        Node::Bracket(items) => {
            let items = items
                .iter()
                .map(|item| resolve(item, scope))
                .collect::<FormResult<Vec<_>>>()?;
            if items.iter().all(|item| as_literal(item).is_some()) {
                let values = items.iter().filter_map(as_literal).cloned().collect();
                Ok(Expr::Literal(Value::List(values)))
            } else {
                Ok(Expr::List(items))
            }
        }
        Node::Brace(items) => {
            if items.len() % 2 != 0 {
                return Err(syntax(line, "map literal needs key/value pairs"));
            }
            let entries = items
                .chunks(2)
                .map(|pair| Ok((expect_str(&pair[0], "a map key")?, resolve(&pair[1], scope)?)))
                .collect::<FormResult<Vec<_>>>()?;
            if entries.iter().all(|(_, v)| as_literal(v).is_some()) {
                let map: ValueMap = entries
                    .into_iter()
                    .filter_map(|(k, v)| match v {
                        Expr::Literal(value) => Some((k, value)),
                        _ => None,
                    })
                    .collect();
                Ok(Expr::Literal(Value::Map(map)))
            } else {
                Ok(Expr::Map(entries))
            }
        }
        Node::Paren(items) => resolve_form(items, line, scope),
    }
}

fn resolve_form(items: &[Located], line: usize, scope: &mut Vec<String>) -> FormResult<Expr> {
    let Some((head, args)) = items.split_first() else {
        return Err(syntax(line, "empty form"));
    };
    let head = expect_symbol(head, "a form name")?;
    match head {
        "let" => {
            let [name, value, body] = args else {
                return Err(syntax(line, "let needs a name, a value and a body"));
            };
            let name = binding_name(name)?;
            let value = resolve(value, scope)?;
            scope.push(name.clone());
            let body = resolve(body, scope);
            scope.pop();
            Ok(Expr::Let {
                name,
                value: Box::new(value),
                body: Box::new(body?),
            })
        }
        "??" => Ok(Expr::Coalesce(
            args.iter()
                .map(|arg| resolve(arg, scope))
                .collect::<FormResult<Vec<_>>>()?,
        )),
        "if" => {
            let [cond, then, otherwise] = args else {
                return Err(syntax(line, "if needs a condition and two branches"));
            };
            Ok(Expr::If {
                cond: Box::new(resolve(cond, scope)?),
                then: Box::new(resolve(then, scope)?),
                otherwise: Box::new(resolve(otherwise, scope)?),
            })
        }
        "each" => {
            let [var, list, body] = args else {
                return Err(syntax(line, "each needs a variable, a list and a body"));
            };
            let var = binding_name(var)?;
            let list = resolve(list, scope)?;
            scope.push(var.clone());
            let body = resolve(body, scope);
            scope.pop();
            Ok(Expr::Each {
                var,
                list: Box::new(list),
                body: Box::new(body?),
            })
        }
        "constraint" => Ok(Expr::Constraint(Arc::new(tagged::<Constraint>(
            head, args, line, scope,
        )?))),
        "transform" => Ok(Expr::Transform(Arc::new(tagged::<Transform>(
            head, args, line, scope,
        )?))),
        "view-config" => {
            let [fields] = args else {
                return Err(syntax(line, "view-config needs one map literal"));
            };
            let json = literal_map(fields, scope)?;
            Ok(Expr::ViewConfig(Arc::new(deserialize::<ViewConfig>(head, json)?)))
        }
        name => {
            let builtin = Builtin::from_name(name)
                .ok_or_else(|| contract(line, format!("unknown builtin '{name}'")))?;
            if args.len() != builtin.arity() {
                return Err(contract(
                    line,
                    format!(
                        "{name} takes {} argument(s), got {}",
                        builtin.arity(),
                        args.len()
                    ),
                ));
            }
            let args = args
                .iter()
                .map(|arg| resolve(arg, scope))
                .collect::<FormResult<Vec<_>>>()?;
            Ok(Expr::Call { builtin, args })
        }
    }
}

fn binding_name(located: &Located) -> FormResult<String> {
    match &located.node {
        Node::Symbol(s) if s.starts_with('$') && s.len() > 1 => Ok(s.clone()),
        _ => Err(syntax(located.line, "expected a $variable")),
    }
}

fn literal_map(
    located: &Located,
    scope: &mut Vec<String>,
) -> FormResult<serde_json::Map<String, serde_json::Value>> {
    match resolve(located, scope)? {
        Expr::Literal(value @ Value::Map(_)) => match value.to_json() {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(syntax(located.line, "expected a constant map")),
        },
        _ => Err(syntax(located.line, "expected a constant map")),
    }
}

/// `(head "kind" {params})`, rebuilt as the serde form `{"kind": .., ..params}`.
fn tagged<T: DeserializeOwned>(
    head: &str,
    args: &[Located],
    line: usize,
    scope: &mut Vec<String>,
) -> FormResult<T> {
    let [kind, params] = args else {
        return Err(syntax(line, format!("{head} needs a kind and a parameter map")));
    };
    let kind = expect_str(kind, "the kind tag")?;
    let mut json = literal_map(params, scope)?;
    json.insert("kind".to_string(), serde_json::Value::String(kind));
    deserialize(head, json)
}

fn deserialize<T: DeserializeOwned>(
    head: &str,
    json: serde_json::Map<String, serde_json::Value>,
) -> FormResult<T> {
    serde_json::from_value(serde_json::Value::Object(json))
        .map_err(|e| FormforgeError::Serialization(format!("invalid {head} literal: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(body: &str) -> String {
        format!("; header\n(unit validator \"F\" \"fp\"\n  (method validate\n    (field \"a\" \"a\" {body})))\n")
    }

    fn field_expr(source: &str) -> Expr {
        parse_unit(source).unwrap().methods[0].fields[0].expr.clone()
    }

    #[test]
    fn test_header_and_methods() {
        let parsed = parse_unit(&unit("null")).unwrap();
        assert_eq!(parsed.kind, UnitKind::Validator);
        assert_eq!(parsed.name, "F");
        assert_eq!(parsed.fingerprint, "fp");
        assert_eq!(parsed.methods.len(), 1);
        assert_eq!(parsed.methods[0].fields[0].field, "a");
    }

    #[test]
    fn test_constant_collections_fold() {
        assert_eq!(
            field_expr(&unit(r#"{"k" [1 "x" null]}"#)),
            Expr::Literal(Value::Map(ValueMap::from([(
                "k".to_string(),
                Value::List(vec![Value::Int(1), Value::from("x"), Value::Null]),
            )])))
        );
        assert!(matches!(
            field_expr(&unit(r#"[(get $data "a")]"#)),
            Expr::List(_)
        ));
    }

    #[test]
    fn test_special_forms_and_scope() {
        let expr = field_expr(&unit(
            r#"(let $t_1 (get $data "a") (?? (if (blank? $t_1) (error "m" "c" {}) null) null))"#,
        ));
        let Expr::Let { name, body, .. } = expr else {
            panic!("expected let");
        };
        assert_eq!(name, "$t_1");
        assert!(matches!(*body, Expr::Coalesce(ref items) if items.len() == 2));

        // The binding does not leak past its body.
        let err = parse_unit(&unit(r#"[(let $t (get $data "a") $t) $t]"#)).unwrap_err();
        assert!(matches!(err, FormforgeError::UnitContract(_)));
    }

    #[test]
    fn test_strategy_literals() {
        let expr = field_expr(&unit(
            r#"(constraint.check (constraint "length" {"min" 2 "max" null}) (get $data "a"))"#,
        ));
        let Expr::Call { builtin, args } = expr else {
            panic!("expected call");
        };
        assert_eq!(builtin, Builtin::ConstraintCheck);
        assert_eq!(
            args[0],
            Expr::Constraint(Arc::new(Constraint::Length {
                min: Some(2),
                max: None
            }))
        );

        let err = parse_unit(&unit(r#"(constraint.check (constraint "nope" {}) null)"#)).unwrap_err();
        assert!(matches!(err, FormforgeError::Serialization(_)));
        assert!(err.is_corruption());
    }

    #[test]
    fn test_view_config_literal() {
        let source = r#"(unit instantiator "F" "fp"
            (method default
              (field "a" "a" (view.build (view-config {"widget" "select" "attributes" {} "choices" [["r" "Red"]] "checked_value" null})
                "a" "a" true null null $parent))))"#;
        let parsed = parse_unit(source).unwrap();
        let Expr::Call { args, .. } = &parsed.methods[0].fields[0].expr else {
            panic!("expected call");
        };
        let Expr::ViewConfig(config) = &args[0] else {
            panic!("expected view config");
        };
        assert_eq!(config.choices, vec![("r".to_string(), "Red".to_string())]);
    }

    #[test]
    fn test_contract_violations() {
        for body in [
            r#"(eval "x")"#,
            r#"(blank? $data $data)"#,
            "$input",
        ] {
            let err = parse_unit(&unit(body)).unwrap_err();
            assert!(matches!(err, FormforgeError::UnitContract(_)), "{body}: {err}");
        }

        let wrong_method = "(unit validator \"F\" \"fp\" (method to-wire))";
        assert!(matches!(
            parse_unit(wrong_method),
            Err(FormforgeError::UnitContract(_))
        ));
        let twice = "(unit validator \"F\" \"fp\" (method validate) (method validate))";
        assert!(matches!(parse_unit(twice), Err(FormforgeError::UnitContract(_))));
    }

    #[test]
    fn test_syntax_errors() {
        for source in [
            String::new(),
            "(unit validator \"F\" \"fp\"".to_string(),
            "(unit validator \"F\" \"fp\"))".to_string(),
            "(unit validator \"F\" \"fp\" (method validate (field \"a\" \"a\" [1 2}))))".to_string(),
            "(unit validator \"F\" \"fp\") (unit validator \"G\" \"fp\")".to_string(),
            "(unit validator F \"fp\")".to_string(),
            unit("{\"k\"}"),
            unit("bare"),
        ] {
            let err = parse_unit(&source).unwrap_err();
            assert!(matches!(err, FormforgeError::UnitSyntax { .. }), "{source}: {err}");
        }
    }
}
