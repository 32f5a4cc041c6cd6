//! The view-instantiator emitter.

use formforge_core::FormResult;

use super::{EmitterState, Lifecycle, UnitWriter};
use crate::expr;
use crate::generators::{ViewAccessors, ViewClosure};
use crate::unit::UnitKind;

struct ViewEntry {
    name: String,
    wire_name: String,
    view: Option<ViewClosure>,
}

/// Assembles the `submitted` and `default` methods.
///
/// Both methods call the same per-field closure. `submitted` supplies the
/// field's wire value and error; `default` supplies `null` for both. The
/// parent name is threaded through in both.
pub struct InstantiatorEmitter {
    name: String,
    fingerprint: String,
    lifecycle: Lifecycle,
    fields: Vec<ViewEntry>,
}

impl InstantiatorEmitter {
    pub fn new(name: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fingerprint: fingerprint.into(),
            lifecycle: Lifecycle::new(UnitKind::Instantiator),
            fields: Vec::new(),
        }
    }

    pub const fn state(&self) -> EmitterState {
        self.lifecycle.state()
    }

    /// Declares a field with its wire name.
    ///
    /// # Errors
    ///
    /// Fails when the field is already declared or appending has begun.
    pub fn declare_field(&mut self, name: &str, wire_name: &str) -> FormResult<()> {
        self.lifecycle.declare()?;
        if self.fields.iter().any(|entry| entry.name == name) {
            return Err(self.lifecycle.duplicate(name));
        }
        self.fields.push(ViewEntry {
            name: name.to_string(),
            wire_name: wire_name.to_string(),
            view: None,
        });
        Ok(())
    }

    /// Sets the view closure of `field`. Each field takes exactly one.
    ///
    /// # Errors
    ///
    /// Fails for undeclared fields, a second view, and after finalize.
    pub fn append_view(&mut self, field: &str, view: ViewClosure) -> FormResult<()> {
        self.lifecycle.append()?;
        let Some(entry) = self.fields.iter_mut().find(|entry| entry.name == field) else {
            return Err(self.lifecycle.undeclared(field));
        };
        if entry.view.is_some() {
            return Err(self.lifecycle.duplicate(field));
        }
        entry.view = Some(view);
        Ok(())
    }

    /// Renders the unit.
    ///
    /// # Errors
    ///
    /// Fails when called twice, when a declared field has no view, or when
    /// a view closure fails.
    pub fn finalize(&mut self) -> FormResult<String> {
        self.lifecycle.finalize()?;
        let fields = std::mem::take(&mut self.fields);

        let mut submitted = Vec::with_capacity(fields.len());
        let mut default = Vec::with_capacity(fields.len());
        for entry in &fields {
            let Some(view) = &entry.view else {
                return Err(self
                    .lifecycle
                    .misuse(&format!("field '{}' has no view", entry.name)));
            };
            submitted.push(view(&ViewAccessors {
                value: expr::call("get", [expr::var("$values"), expr::string(&entry.wire_name)]),
                error: expr::call("get", [expr::var("$errors"), expr::string(&entry.name)]),
                parent: expr::var("$parent"),
            })?);
            default.push(view(&ViewAccessors {
                value: expr::null(),
                error: expr::null(),
                parent: expr::var("$parent"),
            })?);
        }

        let mut writer = UnitWriter::new(UnitKind::Instantiator, &self.name, &self.fingerprint);
        writer.method("submitted");
        for (entry, expression) in fields.iter().zip(&submitted) {
            writer.field(&entry.name, &entry.wire_name, expression);
        }
        writer.method("default");
        for (entry, expression) in fields.iter().zip(&default) {
            writer.field(&entry.name, &entry.wire_name, expression);
        }
        Ok(writer.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formforge_core::FormforgeError;

    fn echo() -> ViewClosure {
        Box::new(|acc: &ViewAccessors| {
            Ok(expr::call(
                "view.name",
                [acc.parent.clone(), acc.value.clone()],
            ))
        })
    }

    #[test]
    fn test_accessors_per_method() {
        let mut emitter = InstantiatorEmitter::new("I", "fp");
        emitter.declare_field("a", "wire_a").unwrap();
        emitter.append_view("a", echo()).unwrap();
        let text = emitter.finalize().unwrap();
        assert!(text.contains(r#"(view.name $parent (get $values "wire_a"))"#));
        assert!(text.contains("(view.name $parent null)"));
    }

    #[test]
    fn test_missing_or_repeated_views_are_rejected() {
        let mut emitter = InstantiatorEmitter::new("I", "fp");
        emitter.declare_field("a", "a").unwrap();
        emitter.declare_field("b", "b").unwrap();
        emitter.append_view("a", echo()).unwrap();
        assert!(emitter.append_view("a", echo()).is_err());
        assert!(matches!(emitter.finalize(), Err(FormforgeError::EmitterState(_))));
        assert_eq!(emitter.state(), EmitterState::Finalized);
    }
}
