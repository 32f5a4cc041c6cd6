//! # formforge-macros
//!
//! `#[derive(FormData)]` turns a plain struct into a form data type: it
//! implements `formforge_forms::FormData`, producing the schema from the
//! struct's fields and their `#[form_field(...)]` attributes.
//!
//! This crate is independent of the other formforge crates because
//! proc-macro crates cannot depend on crates that use them.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod form_data;
mod meta;
mod types;

/// Derives `FormData`.
///
/// Struct attributes (`#[form(...)]`):
///
/// - `name = "..."`: the schema name; defaults to `module_path!()::Type`
/// - `crate = "..."`: path of the forms crate; defaults to `::formforge_forms`
///
/// Field attributes (`#[form_field(...)]`):
///
/// - `wire_name = "..."`, `required = bool` (`Option<T>` fields default to
///   optional, all others to required)
/// - constraints, in this order: `min_length`, `max_length`, `min`, `max`,
///   `pattern` (with `pattern_message`), `email`, `choices = ["value:Label", ..]`,
///   `custom = ["registered_name", ..]`
/// - `transforms = ["trim", "split:,", "date_format:%d/%m/%Y", "default:x", ..]`
/// - `widget = "textarea"` (any widget name), `value_type = "any"`
#[proc_macro_derive(FormData, attributes(form, form_field))]
pub fn derive_form_data(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    form_data::derive_form_data_impl(&input).into()
}
