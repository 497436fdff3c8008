//! Schemas and the structs they validate.
//!
//! A schema is an ordered table of field abstractions with optional
//! defaults and guards. Structs re-validate on every access: a field
//! read re-checks the field type and the guards, a write checks the type
//! before mutating and the guards after.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use kuma_ir::Name;
use rustc_hash::FxHashMap;

use super::Abstraction;
use crate::errors::{
    guard_not_bool, schema_field_conflict, schema_field_invalid, schema_field_missing,
    schema_guard_rejected, schema_invalid_default, schema_unknown_default, struct_field_missing,
    struct_guard_violated, struct_inconsistent, EvalError, EvalResult,
};
use crate::function::{call, Callable};
use crate::value::Value;

/// Outcome of checking a record against a schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaCheck {
    Ok,
    /// Valid once the listed defaults were filled in.
    DefaultsApplied(Vec<Name>),
    /// A required field without default is absent.
    MissingField(Name),
    /// A field holds a value outside its abstraction.
    InvalidField(Name),
}

impl SchemaCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, SchemaCheck::Ok | SchemaCheck::DefaultsApplied(_))
    }
}

#[derive(Clone)]
pub struct Schema(Rc<SchemaData>);

struct SchemaData {
    name: Name,
    fields: Vec<(Name, Abstraction)>,
    defaults: FxHashMap<Name, Value>,
    /// Every guard must return `true`; included schemas contribute theirs.
    guards: Vec<Callable>,
}

/// Builder for [`Schema`].
pub struct SchemaBuilder {
    name: Name,
    fields: Vec<(Name, Abstraction)>,
    defaults: Vec<(Name, Value)>,
    guard: Option<Callable>,
    included: Vec<Schema>,
}

impl SchemaBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: Name::intern(name),
            fields: Vec::new(),
            defaults: Vec::new(),
            guard: None,
            included: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, name: &str, abstraction: impl Into<Abstraction>) -> Self {
        self.fields.push((Name::intern(name), abstraction.into()));
        self
    }

    #[must_use]
    pub fn default(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.defaults.push((Name::intern(name), value.into()));
        self
    }

    /// Guard called with a hash copy of the fields; must return a bool.
    #[must_use]
    pub fn guard(mut self, guard: Callable) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Include every field, default and guard of `other`.
    #[must_use]
    pub fn contains(mut self, other: &Schema) -> Self {
        self.included.push(other.clone());
        self
    }

    pub fn build(self) -> Result<Schema, EvalError> {
        let mut fields: Vec<(Name, Abstraction)> = Vec::new();
        let mut defaults = FxHashMap::default();
        let mut guards = Vec::new();

        let add_field = |fields: &mut Vec<(Name, Abstraction)>, name: Name, ty: Abstraction| {
            if fields.iter().any(|(existing, _)| *existing == name) {
                return Err(schema_field_conflict(name));
            }
            fields.push((name, ty));
            Ok(())
        };

        for included in &self.included {
            for (name, ty) in &included.0.fields {
                add_field(&mut fields, *name, ty.clone())?;
            }
            defaults.extend(included.0.defaults.iter().map(|(k, v)| (*k, v.clone())));
            guards.extend(included.0.guards.iter().cloned());
        }
        for (name, ty) in self.fields {
            add_field(&mut fields, name, ty)?;
        }

        for (name, value) in self.defaults {
            let Some((_, ty)) = fields.iter().find(|(field, _)| *field == name) else {
                return Err(schema_unknown_default(name));
            };
            if !ty.contains(&value) {
                return Err(schema_invalid_default(name));
            }
            defaults.insert(name, value);
        }
        guards.extend(self.guard);

        Ok(Schema(Rc::new(SchemaData {
            name: self.name,
            fields,
            defaults,
            guards,
        })))
    }
}

impl Schema {
    pub fn name(&self) -> Name {
        self.0.name
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Field names and abstractions in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (Name, &Abstraction)> {
        self.0.fields.iter().map(|(name, ty)| (*name, ty))
    }

    pub fn field_type(&self, name: Name) -> Option<&Abstraction> {
        self.0
            .fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, ty)| ty)
    }

    pub fn default_value(&self, name: Name) -> Option<&Value> {
        self.0.defaults.get(&name)
    }

    pub(crate) fn contains(&self, value: &Value) -> bool {
        matches!(value, Value::Struct(s) if s.schema().ptr_eq(self))
    }

    /// Check `record` field by field, filling in defaults for absent fields.
    ///
    /// Stops at the first missing or invalid field. Guards are not run.
    pub fn check_all(&self, record: &mut FxHashMap<Name, Value>) -> SchemaCheck {
        let mut applied = Vec::new();
        for (name, ty) in &self.0.fields {
            match record.get(name) {
                Some(value) if ty.contains(value) => {}
                Some(_) => return SchemaCheck::InvalidField(*name),
                None => match self.0.defaults.get(name) {
                    Some(default) => {
                        record.insert(*name, default.clone());
                        applied.push(*name);
                    }
                    None => return SchemaCheck::MissingField(*name),
                },
            }
        }
        if applied.is_empty() {
            SchemaCheck::Ok
        } else {
            SchemaCheck::DefaultsApplied(applied)
        }
    }

    /// Run every guard against a copy of `fields`.
    fn guards_accept(&self, fields: &FxHashMap<Name, Value>) -> EvalResult<bool> {
        for guard in &self.0.guards {
            let verdict = call(guard, &[Value::hash(fields.clone())])?;
            match verdict.as_bool() {
                Some(true) => {}
                Some(false) => return Ok(false),
                None => return Err(guard_not_bool(self.0.name, verdict.type_name())),
            }
        }
        Ok(true)
    }

    /// Build a struct from `fields`.
    ///
    /// Entries that are not schema fields are dropped.
    #[tracing::instrument(level = "debug", skip_all, fields(schema = %self.0.name))]
    pub fn create(
        &self,
        fields: impl IntoIterator<Item = (Name, Value)>,
    ) -> Result<StructValue, EvalError> {
        let mut record: FxHashMap<Name, Value> = fields.into_iter().collect();
        match self.check_all(&mut record) {
            SchemaCheck::MissingField(field) => return Err(schema_field_missing(field)),
            SchemaCheck::InvalidField(field) => return Err(schema_field_invalid(field)),
            SchemaCheck::Ok | SchemaCheck::DefaultsApplied(_) => {}
        }
        record.retain(|name, _| self.field_type(*name).is_some());
        if !self.guards_accept(&record)? {
            return Err(schema_guard_rejected(self.0.name));
        }
        Ok(StructValue(Rc::new(StructData {
            schema: self.clone(),
            fields: RefCell::new(record),
        })))
    }
}

/// A mutable record bound to its schema.
#[derive(Clone)]
pub struct StructValue(Rc<StructData>);

struct StructData {
    schema: Schema,
    fields: RefCell<FxHashMap<Name, Value>>,
}

impl StructValue {
    pub fn schema(&self) -> &Schema {
        &self.0.schema
    }

    pub fn ptr_eq(&self, other: &StructValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Whether `field` is part of the schema.
    pub fn has(&self, field: Name) -> bool {
        self.0.schema.field_type(field).is_some()
    }

    /// Current field values.
    pub fn snapshot(&self) -> FxHashMap<Name, Value> {
        self.0.fields.borrow().clone()
    }

    /// Read a field, re-validating it and the guards.
    pub fn get(&self, field: Name) -> EvalResult {
        let ty = self
            .0
            .schema
            .field_type(field)
            .ok_or_else(|| struct_field_missing(field))?;
        let value = self
            .0
            .fields
            .borrow()
            .get(&field)
            .cloned()
            .ok_or_else(|| struct_inconsistent(field))?;
        if !ty.contains(&value) {
            return Err(struct_inconsistent(field));
        }
        if !self.0.schema.guards_accept(&self.snapshot())? {
            return Err(struct_guard_violated(self.0.schema.name()));
        }
        Ok(value)
    }

    /// Write a field.
    ///
    /// A type mismatch leaves the struct unchanged. A guard rejecting the
    /// written struct is fatal: the write already happened.
    pub fn set(&self, field: Name, value: Value) -> Result<(), EvalError> {
        let ty = self
            .0
            .schema
            .field_type(field)
            .ok_or_else(|| struct_field_missing(field))?;
        if !ty.contains(&value) {
            return Err(schema_field_invalid(field));
        }
        self.0.fields.borrow_mut().insert(field, value);
        if !self.0.schema.guards_accept(&self.snapshot())? {
            return Err(struct_guard_violated(self.0.schema.name()));
        }
        Ok(())
    }
}

impl fmt::Debug for StructValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructValue")
            .field("schema", &self.0.schema.name())
            .field("fields", &self.0.fields.borrow().len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for StructValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.0.fields.borrow();
        write!(f, "{} {{ ", self.0.schema.name())?;
        for (i, (name, _)) in self.0.schema.0.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match fields.get(name) {
                Some(value) => write!(f, "{name}: {value}")?,
                None => write!(f, "{name}: ?")?,
            }
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
