//! Attribute values darling does not parse on its own.

use darling::ast::NestedMeta;
use darling::FromMeta;
use syn::{Expr, ExprLit, Lit, LitStr};

/// A list of string literals, written `key("a", "b")` or `key = ["a", "b"]`.
///
/// The literals keep their spans so errors point at the offending entry.
#[derive(Debug, Clone, Default)]
pub(crate) struct LitList(pub Vec<LitStr>);

impl LitList {
    pub(crate) fn iter(&self) -> impl Iterator<Item = &LitStr> {
        self.0.iter()
    }
}

fn string_literal(lit: &Lit) -> darling::Result<LitStr> {
    match lit {
        Lit::Str(s) => Ok(s.clone()),
        other => Err(darling::Error::unexpected_lit_type(other)),
    }
}

impl FromMeta for LitList {
    fn from_list(items: &[NestedMeta]) -> darling::Result<Self> {
        items
            .iter()
            .map(|item| match item {
                NestedMeta::Lit(lit) => string_literal(lit),
                NestedMeta::Meta(meta) => {
                    Err(darling::Error::unexpected_type("path").with_span(meta))
                }
            })
            .collect::<darling::Result<_>>()
            .map(LitList)
    }

    fn from_expr(expr: &Expr) -> darling::Result<Self> {
        let Expr::Array(array) = expr else {
            return Err(darling::Error::unexpected_expr_type(expr));
        };
        array
            .elems
            .iter()
            .map(|elem| match elem {
                Expr::Lit(ExprLit { lit, .. }) => string_literal(lit),
                other => Err(darling::Error::unexpected_expr_type(other)),
            })
            .collect::<darling::Result<_>>()
            .map(LitList)
    }
}

/// Splits `"head:rest"` at the first colon.
pub(crate) fn split_pair(entry: &str) -> (&str, Option<&str>) {
    match entry.split_once(':') {
        Some((head, rest)) => (head, Some(rest)),
        None => (entry, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_array_form() {
        let expr: Expr = parse_quote!(["trim", "split:,"]);
        let list = LitList::from_expr(&expr).unwrap();
        let values: Vec<String> = list.iter().map(LitStr::value).collect();
        assert_eq!(values, vec!["trim", "split:,"]);
    }

    #[test]
    fn test_rejects_non_strings() {
        let expr: Expr = parse_quote!([1, 2]);
        assert!(LitList::from_expr(&expr).is_err());
    }

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("date_format:%H:%M"), ("date_format", Some("%H:%M")));
        assert_eq!(split_pair("trim"), ("trim", None));
    }
}
