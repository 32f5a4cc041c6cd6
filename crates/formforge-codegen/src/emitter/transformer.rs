//! The transformer emitter.

use formforge_core::FormResult;

use super::{EmitterState, Lifecycle, UnitWriter};
use crate::expr::{self, Expression};
use crate::unit::UnitKind;

/// Wraps the previous expression in one transform step.
pub type StepClosure<'a> = Box<dyn FnOnce(Expression) -> FormResult<Expression> + 'a>;

struct TransformerEntry<'a> {
    name: String,
    wire_name: String,
    from_wire: Vec<StepClosure<'a>>,
    to_wire: Vec<StepClosure<'a>>,
}

/// Assembles the `from-wire` and `to-wire` methods.
///
/// `from-wire` reads each field by wire name, nests its steps in declared
/// order, and stores the result under the field name. `to-wire` reads by
/// field name, nests the steps in reverse, and stores under the wire name.
pub struct TransformerEmitter<'a> {
    name: String,
    fingerprint: String,
    lifecycle: Lifecycle,
    fields: Vec<TransformerEntry<'a>>,
}

impl<'a> TransformerEmitter<'a> {
    pub fn new(name: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fingerprint: fingerprint.into(),
            lifecycle: Lifecycle::new(UnitKind::Transformer),
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
        self.fields.push(TransformerEntry {
            name: name.to_string(),
            wire_name: wire_name.to_string(),
            from_wire: Vec::new(),
            to_wire: Vec::new(),
        });
        Ok(())
    }

    /// Appends the next step of `field`, given as both directions.
    ///
    /// # Errors
    ///
    /// Fails for undeclared fields and after finalize.
    pub fn append_step(
        &mut self,
        field: &str,
        from_wire: StepClosure<'a>,
        to_wire: StepClosure<'a>,
    ) -> FormResult<()> {
        self.lifecycle.append()?;
        let Some(entry) = self.fields.iter_mut().find(|entry| entry.name == field) else {
            return Err(self.lifecycle.undeclared(field));
        };
        entry.from_wire.push(from_wire);
        entry.to_wire.push(to_wire);
        Ok(())
    }

    /// Renders the unit.
    ///
    /// # Errors
    ///
    /// Fails when called twice, or when a step closure fails.
    pub fn finalize(&mut self) -> FormResult<String> {
        self.lifecycle.finalize()?;
        let fields = std::mem::take(&mut self.fields);
        let mut from_wire = Vec::with_capacity(fields.len());
        let mut to_wire = Vec::with_capacity(fields.len());

        for entry in fields {
            let mut forward = expr::call("get", [expr::var("$input"), expr::string(&entry.wire_name)]);
            for step in entry.from_wire {
                forward = step(forward)?;
            }
            from_wire.push((entry.name.clone(), entry.name.clone(), forward));

            let mut backward = expr::call("get", [expr::var("$input"), expr::string(&entry.name)]);
            for step in entry.to_wire.into_iter().rev() {
                backward = step(backward)?;
            }
            to_wire.push((entry.name, entry.wire_name, backward));
        }

        let mut writer = UnitWriter::new(UnitKind::Transformer, &self.name, &self.fingerprint);
        writer.method("from-wire");
        for (field, key, expression) in &from_wire {
            writer.field(field, key, expression);
        }
        writer.method("to-wire");
        for (field, key, expression) in &to_wire {
            writer.field(field, key, expression);
        }
        Ok(writer.finish())
    }
}
