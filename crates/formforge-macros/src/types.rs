//! Inspecting field types.

use syn::{GenericArgument, PathArguments, Type};

/// If the type is `Option<T>`, returns `T`.
pub(crate) fn unwrap_option_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) => Some(inner),
        _ => None,
    }
}

/// The name of the type's last path segment, e.g. `NaiveDate` for
/// `chrono::NaiveDate`.
fn last_segment(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string()),
        Type::Reference(reference) => last_segment(&reference.elem),
        _ => None,
    }
}

/// The `ValueType` variant implied by a (non-optional) field type.
pub(crate) fn infer_value_type(ty: &Type) -> &'static str {
    match last_segment(ty).as_deref() {
        Some("String" | "str") => "String",
        Some(
            "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize",
        ) => "Int",
        Some("f32" | "f64") => "Float",
        Some("bool") => "Bool",
        Some("NaiveDate") => "Date",
        Some("NaiveDateTime") => "DateTime",
        Some("Vec") => "List",
        _ => "Any",
    }
}

/// Whether a non-optional field of this type can be hydrated from a missing
/// value. Strings, numbers and dates cannot; `bool` is cast from null to
/// `false`, and lists and `Value` accept null.
pub(crate) fn hydrates_from_null(ty: &Type) -> bool {
    !matches!(
        infer_value_type(ty),
        "String" | "Int" | "Float" | "Date" | "DateTime"
    )
}

/// Maps a `value_type = "..."` override to its variant.
pub(crate) fn value_type_variant(name: &str) -> Option<&'static str> {
    Some(match name {
        "string" => "String",
        "int" => "Int",
        "float" => "Float",
        "bool" => "Bool",
        "date" => "Date",
        "datetime" => "DateTime",
        "list" => "List",
        "any" => "Any",
        _ => return None,
    })
}

/// Maps a widget name to its variant.
pub(crate) fn widget_variant(name: &str) -> Option<&'static str> {
    Some(match name {
        "text_input" | "text" => "TextInput",
        "number_input" | "number" => "NumberInput",
        "email_input" | "email" => "EmailInput",
        "password_input" | "password" => "PasswordInput",
        "hidden_input" | "hidden" => "HiddenInput",
        "textarea" => "Textarea",
        "checkbox" => "Checkbox",
        "select" => "Select",
        "select_multiple" => "SelectMultiple",
        "date_input" | "date" => "DateInput",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;
    use syn::parse_quote;

    fn type_to_string(ty: &Type) -> String {
        quote!(#ty).to_string()
    }

    #[test]
    fn test_unwrap_option_type() {
        let ty: Type = parse_quote!(Option<i64>);
        assert_eq!(type_to_string(unwrap_option_type(&ty).unwrap()), "i64");
        let ty: Type = parse_quote!(String);
        assert!(unwrap_option_type(&ty).is_none());
    }

    #[test]
    fn test_infer_value_type() {
        let cases: Vec<(Type, &str)> = vec![
            (parse_quote!(String), "String"),
            (parse_quote!(u16), "Int"),
            (parse_quote!(f64), "Float"),
            (parse_quote!(bool), "Bool"),
            (parse_quote!(chrono::NaiveDate), "Date"),
            (parse_quote!(chrono::NaiveDateTime), "DateTime"),
            (parse_quote!(Vec<String>), "List"),
            (parse_quote!(formforge_core::Value), "Any"),
        ];
        for (ty, expected) in cases {
            assert_eq!(infer_value_type(&ty), expected, "{}", type_to_string(&ty));
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(widget_variant("select_multiple"), Some("SelectMultiple"));
        assert_eq!(widget_variant("radio"), None);
        assert_eq!(value_type_variant("any"), Some("Any"));
    }
}
