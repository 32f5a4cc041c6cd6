//! Wire input parsing.
//!
//! Browsers submit forms as `application/x-www-form-urlencoded` bodies whose
//! keys use bracket notation for lists and nested forms:
//!
//! | Key | Result |
//! |---|---|
//! | `name=Ada` | `name: "Ada"` |
//! | `tags[]=a&tags[]=b` | `tags: ["a", "b"]` |
//! | `user[email]=x` | `user: {email: "x"}` |
//!
//! A repeated plain key keeps its last value.

use formforge_core::{Value, ValueMap};

/// Parses an urlencoded body into a wire map.
///
/// # Examples
///
/// ```
/// use formforge_forms::wire::parse_urlencoded;
/// use formforge_forms::Value;
///
/// let input = parse_urlencoded("name=Ada+L&tags[]=x&tags[]=y");
/// assert_eq!(input["name"], Value::from("Ada L"));
/// assert_eq!(input["tags"], Value::List(vec![Value::from("x"), Value::from("y")]));
/// ```
pub fn parse_urlencoded(body: &str) -> ValueMap {
    let mut out = ValueMap::new();
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
        let path = split_key(&key);
        insert(&mut out, &path, Value::String(value.into_owned()));
    }
    out
}

/// Splits `a[b][]` into `["a", "b", ""]`.
fn split_key(key: &str) -> Vec<&str> {
    let Some(open) = key.find('[') else {
        return vec![key];
    };
    let mut segments = vec![&key[..open]];
    let mut rest = &key[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            break;
        };
        segments.push(&stripped[..close]);
        rest = &stripped[close + 1..];
    }
    segments
}

fn insert(target: &mut ValueMap, path: &[&str], value: Value) {
    let Some((head, tail)) = path.split_first() else {
        return;
    };
    match tail.first() {
        None => {
            target.insert((*head).to_string(), value);
        }
        Some(&"") => {
            let slot = target
                .entry((*head).to_string())
                .or_insert_with(|| Value::List(Vec::new()));
            if !matches!(slot, Value::List(_)) {
                *slot = Value::List(Vec::new());
            }
            if let Value::List(items) = slot {
                items.push(value);
            }
        }
        Some(_) => {
            let slot = target
                .entry((*head).to_string())
                .or_insert_with(|| Value::Map(ValueMap::new()));
            if !matches!(slot, Value::Map(_)) {
                *slot = Value::Map(ValueMap::new());
            }
            if let Value::Map(nested) = slot {
                insert(nested, tail, value);
            }
        }
    }
}
