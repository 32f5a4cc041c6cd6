//! `#[derive(FormData)]` implementation.
//!
//! Generates `schema()` from the struct's fields and attributes, and the
//! `from_values` / `to_values` conversions through `FromValue` / `ToValue`.

use darling::{FromDeriveInput, FromField};
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{DeriveInput, Ident, LitStr};

use crate::meta::{split_pair, LitList};
use crate::types::{
    hydrates_from_null, infer_value_type, unwrap_option_type, value_type_variant, widget_variant,
};

/// Struct-level attributes from `#[form(...)]`.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(form), supports(struct_named))]
struct FormOpts {
    ident: Ident,
    data: darling::ast::Data<(), FormFieldOpts>,

    /// Schema name override.
    #[darling(default)]
    name: Option<String>,

    /// Path of the forms crate.
    #[darling(default, rename = "crate")]
    krate: Option<syn::Path>,
}

/// Per-field attributes from `#[form_field(...)]`.
#[derive(Debug, FromField)]
#[darling(attributes(form_field))]
struct FormFieldOpts {
    ident: Option<Ident>,
    ty: syn::Type,

    #[darling(default)]
    wire_name: Option<String>,
    #[darling(default)]
    required: Option<bool>,
    #[darling(default)]
    value_type: Option<LitStr>,

    #[darling(default)]
    min_length: Option<usize>,
    #[darling(default)]
    max_length: Option<usize>,
    #[darling(default)]
    min: Option<f64>,
    #[darling(default)]
    max: Option<f64>,
    #[darling(default)]
    pattern: Option<String>,
    #[darling(default)]
    pattern_message: Option<String>,
    #[darling(default)]
    email: bool,
    #[darling(default)]
    choices: Option<LitList>,
    #[darling(default)]
    custom: Option<LitList>,

    #[darling(default)]
    transforms: Option<LitList>,

    #[darling(default)]
    widget: Option<LitStr>,
}

/// Generates the `FormData` implementation.
pub(crate) fn derive_form_data_impl(input: &DeriveInput) -> TokenStream {
    match expand(input) {
        Ok(tokens) => tokens,
        Err(err) => err.write_errors(),
    }
}

fn expand(input: &DeriveInput) -> darling::Result<TokenStream> {
    let opts = FormOpts::from_derive_input(input)?;
    let ident = &opts.ident;
    let forms = opts
        .krate
        .as_ref()
        .map_or_else(|| quote! { ::formforge_forms }, |path| quote! { #path });

    let Some(fields) = opts.data.as_ref().take_struct() else {
        return Err(darling::Error::unsupported_shape("enum").with_span(ident));
    };

    let mut errors = darling::Error::accumulator();
    let descriptors: Vec<TokenStream> = fields
        .iter()
        .filter_map(|field| errors.handle(field_descriptor(field, &forms)))
        .collect();
    errors.finish()?;

    let schema_name = opts.name.as_ref().map_or_else(
        || quote! { concat!(module_path!(), "::", stringify!(#ident)) },
        |name| quote! { #name },
    );

    let idents: Vec<&Ident> = fields.iter().filter_map(|f| f.ident.as_ref()).collect();
    let names: Vec<String> = idents.iter().map(ToString::to_string).collect();
    let types: Vec<&syn::Type> = fields.iter().map(|f| &f.ty).collect();

    Ok(quote! {
        impl #forms::FormData for #ident {
            fn schema() -> #forms::FormSchema {
                #forms::FormSchema::new(#schema_name, vec![#(#descriptors),*])
            }

            fn from_values(values: &#forms::ValueMap) -> #forms::FormResult<Self> {
                Ok(Self {
                    #(
                        #idents: <#types as #forms::FromValue>::from_value(
                            values.get(#names).unwrap_or(&#forms::Value::Null),
                        )?,
                    )*
                })
            }

            fn to_values(&self) -> #forms::ValueMap {
                let mut values = #forms::ValueMap::new();
                #(
                    values.insert(
                        #names.to_string(),
                        #forms::ToValue::to_value(&self.#idents),
                    );
                )*
                values
            }
        }
    })
}

/// Builds the `FieldDescriptor` expression of one field.
fn field_descriptor(field: &FormFieldOpts, forms: &TokenStream) -> darling::Result<TokenStream> {
    let Some(ident) = field.ident.as_ref() else {
        return Err(darling::Error::custom("fields must be named"));
    };
    let name = ident.to_string();

    let optional = unwrap_option_type(&field.ty);
    if field.required == Some(false) && optional.is_none() && !hydrates_from_null(&field.ty) {
        return Err(darling::Error::custom(
            "`required = false` needs an `Option<_>` field; an empty submission cannot fill this type",
        )
        .with_span(ident));
    }
    let value_type = match &field.value_type {
        Some(lit) => value_type_variant(&lit.value())
            .ok_or_else(|| darling::Error::custom("unknown value type").with_span(lit))?,
        None => infer_value_type(optional.unwrap_or(&field.ty)),
    };
    let value_type = Ident::new(value_type, Span::call_site());

    let mut chain = Vec::new();
    if let Some(wire_name) = &field.wire_name {
        chain.push(quote! { .wire_name(#wire_name) });
    }
    if !field.required.unwrap_or(optional.is_none()) {
        chain.push(quote! { .required(false) });
    }
    chain.extend(constraints(field, forms)?);
    chain.extend(transforms(field, forms)?);

    if let Some(lit) = &field.widget {
        let variant = widget_variant(&lit.value())
            .ok_or_else(|| darling::Error::custom("unknown widget").with_span(lit))?;
        let variant = Ident::new(variant, lit.span());
        chain.push(quote! { .widget(#forms::WidgetType::#variant) });
    }
    if let Some(choices) = &field.choices {
        let pairs = choices.iter().map(|lit| {
            let entry = lit.value();
            let (value, label) = split_pair(&entry);
            let label = label.unwrap_or(value);
            quote! { (#value.to_string(), #label.to_string()) }
        });
        chain.push(quote! { .choices(vec![#(#pairs),*]) });
        if field.widget.is_none() {
            chain.push(quote! { .widget(#forms::WidgetType::Select) });
        }
    }

    Ok(quote! {
        #forms::FieldDescriptor::new(#name, #forms::ValueType::#value_type)
            #(#chain)*
    })
}

fn option_tokens<T: quote::ToTokens>(value: Option<&T>) -> TokenStream {
    value.map_or_else(|| quote! { None }, |v| quote! { Some(#v) })
}

fn constraints(field: &FormFieldOpts, forms: &TokenStream) -> darling::Result<Vec<TokenStream>> {
    let mut out = Vec::new();
    if field.min_length.is_some() || field.max_length.is_some() {
        let min = option_tokens(field.min_length.as_ref());
        let max = option_tokens(field.max_length.as_ref());
        out.push(quote! { .constraint(#forms::Constraint::Length { min: #min, max: #max }) });
    }
    if field.min.is_some() || field.max.is_some() {
        let min = option_tokens(field.min.as_ref());
        let max = option_tokens(field.max.as_ref());
        out.push(quote! { .constraint(#forms::Constraint::Range { min: #min, max: #max }) });
    }
    if let Some(pattern) = &field.pattern {
        let message = option_tokens(
            field
                .pattern_message
                .as_ref()
                .map(|m| quote! { #m.to_string() })
                .as_ref(),
        );
        out.push(quote! {
            .constraint(#forms::Constraint::Pattern {
                pattern: #pattern.to_string(),
                message: #message,
            })
        });
    } else if field.pattern_message.is_some() {
        return Err(darling::Error::custom("pattern_message requires pattern"));
    }
    if field.email {
        out.push(quote! { .constraint(#forms::Constraint::Email) });
    }
    if let Some(choices) = &field.choices {
        let values = choices.iter().map(|lit| {
            let entry = lit.value();
            let value = split_pair(&entry).0.to_string();
            quote! { #forms::Value::from(#value) }
        });
        out.push(quote! {
            .constraint(#forms::Constraint::Choice {
                choices: vec![#(#values),*],
                multiple: false,
            })
        });
    }
    if let Some(custom) = &field.custom {
        for lit in custom.iter() {
            out.push(quote! {
                .constraint(#forms::Constraint::Custom {
                    name: #lit.to_string(),
                    options: #forms::ValueMap::new(),
                })
            });
        }
    }
    Ok(out)
}

fn transforms(field: &FormFieldOpts, forms: &TokenStream) -> darling::Result<Vec<TokenStream>> {
    let Some(list) = &field.transforms else {
        return Ok(Vec::new());
    };
    let mut errors = darling::Error::accumulator();
    let steps = list
        .iter()
        .filter_map(|lit| errors.handle(transform_step(lit, forms)))
        .map(|step| quote! { .transform(#step) })
        .collect();
    errors.finish_with(steps)
}

fn transform_step(lit: &LitStr, forms: &TokenStream) -> darling::Result<TokenStream> {
    let entry = lit.value();
    let (kind, argument) = split_pair(&entry);
    let simple = |variant: &str| {
        if argument.is_some() {
            return Err(darling::Error::custom(format!("`{kind}` takes no argument")).with_span(lit));
        }
        let variant = Ident::new(variant, lit.span());
        Ok(quote! { #forms::Transform::#variant })
    };
    let needs_argument = || {
        argument.ok_or_else(|| {
            darling::Error::custom(format!("`{kind}` needs an argument, e.g. `{kind}:...`"))
                .with_span(lit)
        })
    };
    match kind {
        "trim" => simple("Trim"),
        "uppercase" => simple("Uppercase"),
        "lowercase" => simple("Lowercase"),
        "to_integer" => simple("ToInteger"),
        "to_float" => simple("ToFloat"),
        "to_boolean" => simple("ToBoolean"),
        "to_string" => simple("ToString"),
        "json" => simple("Json"),
        "date_format" => {
            let format = needs_argument()?;
            Ok(quote! { #forms::Transform::DateFormat { format: #format.to_string() } })
        }
        "split" => {
            let separator = needs_argument()?;
            Ok(quote! { #forms::Transform::Split { separator: #separator.to_string() } })
        }
        "default" => {
            let value = needs_argument()?;
            Ok(quote! { #forms::Transform::Default { value: #forms::Value::from(#value) } })
        }
        "custom" => {
            let name = needs_argument()?;
            Ok(quote! {
                #forms::Transform::Custom {
                    name: #name.to_string(),
                    options: #forms::ValueMap::new(),
                }
            })
        }
        _ => Err(darling::Error::unknown_value(kind).with_span(lit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expand_str(input: DeriveInput) -> String {
        derive_form_data_impl(&input).to_string()
    }

    #[test]
    fn test_default_schema_name_uses_module_path() {
        let out = expand_str(parse_quote! {
            struct Login {
                user: String,
            }
        });
        assert!(out.contains("module_path"));
        assert!(out.contains("ValueType :: String"));
        assert!(!out.contains("required"));
    }

    #[test]
    fn test_option_fields_are_optional() {
        let out = expand_str(parse_quote! {
            #[form(name = "x::Y")]
            struct Y {
                age: Option<i64>,
            }
        });
        assert!(out.contains("\"x::Y\""));
        assert!(out.contains("ValueType :: Int"));
        assert!(out.contains(". required (false)"));
    }

    #[test]
    fn test_unknown_transform_is_reported() {
        let out = expand_str(parse_quote! {
            struct Bad {
                #[form_field(transforms = ["trim", "explode"])]
                a: String,
            }
        });
        assert!(out.contains("compile_error"));
        assert!(out.contains("explode"));
    }

    #[test]
    fn test_argument_checks() {
        let out = expand_str(parse_quote! {
            struct Bad {
                #[form_field(transforms = ["split"])]
                a: Vec<String>,
            }
        });
        assert!(out.contains("needs an argument"));

        let out = expand_str(parse_quote! {
            struct Bad {
                #[form_field(pattern_message = "nope")]
                a: String,
            }
        });
        assert!(out.contains("pattern_message requires pattern"));
    }

    #[test]
    fn test_optional_scalar_requires_option_type() {
        let out = expand_str(parse_quote! {
            struct Bad {
                #[form_field(required = false)]
                nickname: String,
            }
        });
        assert!(out.contains("compile_error"));
        assert!(out.contains("needs an `Option<_>` field"));

        let out = expand_str(parse_quote! {
            struct Fine {
                #[form_field(required = false)]
                nickname: Option<String>,
                #[form_field(required = false)]
                tags: Vec<String>,
                #[form_field(required = false)]
                agreed: bool,
            }
        });
        assert!(!out.contains("compile_error"));
    }

    #[test]
    fn test_enums_are_rejected() {
        let out = expand_str(parse_quote! {
            enum E { A }
        });
        assert!(out.contains("compile_error"));
    }
}
