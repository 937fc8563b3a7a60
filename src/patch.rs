//! Partial updates expressed as a list of recognized columns and their new
//! values, turned into a single `UPDATE ... SET ...` statement.

use serde::{Deserialize, Deserializer};
use sqlx::{Postgres, QueryBuilder};
use time::Date;
use uuid::Uuid;

use crate::auth::repo_types::Role;

#[derive(Debug, Clone, PartialEq)]
pub enum PatchValue {
    Text(String),
    Bool(bool),
    Int(i32),
    Date(Date),
    Json(serde_json::Value),
    Role(Role),
    Uuid(Uuid),
    Null,
}

/// A request field that can be left out, sent as `null` to clear the
/// column, or carry a new value. Use with `#[serde(default)]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<T> Field<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Field<U>, E> {
        Ok(match self {
            Field::Absent => Field::Absent,
            Field::Null => Field::Null,
            Field::Value(v) => Field::Value(f(v)?),
        })
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(v: Option<T>) -> Self {
        v.map_or(Field::Null, Field::Value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Field::from)
    }
}

impl From<String> for PatchValue {
    fn from(v: String) -> Self {
        PatchValue::Text(v)
    }
}

impl From<&'static str> for PatchValue {
    fn from(v: &'static str) -> Self {
        PatchValue::Text(v.to_string())
    }
}

impl From<bool> for PatchValue {
    fn from(v: bool) -> Self {
        PatchValue::Bool(v)
    }
}

impl From<i32> for PatchValue {
    fn from(v: i32) -> Self {
        PatchValue::Int(v)
    }
}

impl From<Date> for PatchValue {
    fn from(v: Date) -> Self {
        PatchValue::Date(v)
    }
}

impl From<serde_json::Value> for PatchValue {
    fn from(v: serde_json::Value) -> Self {
        PatchValue::Json(v)
    }
}

impl From<Role> for PatchValue {
    fn from(v: Role) -> Self {
        PatchValue::Role(v)
    }
}

impl From<Uuid> for PatchValue {
    fn from(v: Uuid) -> Self {
        PatchValue::Uuid(v)
    }
}

/// Column assignments for one row. Column names are always `'static`
/// literals chosen by the caller, never user input.
#[derive(Debug, Default, Clone)]
pub struct Patch {
    columns: Vec<(&'static str, PatchValue)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<PatchValue>) -> &mut Self {
        self.columns.retain(|(c, _)| *c != column);
        self.columns.push((column, value.into()));
        self
    }

    /// Adds the assignment only when a value was supplied.
    pub fn set_opt<T: Into<PatchValue>>(&mut self, column: &'static str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    /// Sets, clears or skips the column depending on the field.
    pub fn set_field<T: Into<PatchValue>>(&mut self, column: &'static str, field: Field<T>) -> &mut Self {
        match field {
            Field::Absent => {}
            Field::Null => {
                self.set(column, PatchValue::Null);
            }
            Field::Value(v) => {
                self.set(column, v);
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn get(&self, column: &str) -> Option<&PatchValue> {
        self.columns
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    #[cfg(test)]
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(c, _)| *c)
    }

    /// Builds `UPDATE {table} SET .., updated_at = now() WHERE {key_column} = $n RETURNING *`.
    pub fn into_update(
        self,
        table: &'static str,
        key_column: &'static str,
        key: Uuid,
    ) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("UPDATE {table} SET "));
        let mut assignments = qb.separated(", ");
        for (column, value) in self.columns {
            assignments.push(format!("{column} = "));
            match value {
                PatchValue::Text(v) => assignments.push_bind_unseparated(v),
                PatchValue::Bool(v) => assignments.push_bind_unseparated(v),
                PatchValue::Int(v) => assignments.push_bind_unseparated(v),
                PatchValue::Date(v) => assignments.push_bind_unseparated(v),
                PatchValue::Json(v) => assignments.push_bind_unseparated(v),
                PatchValue::Role(v) => assignments.push_bind_unseparated(v),
                PatchValue::Uuid(v) => assignments.push_bind_unseparated(v),
                PatchValue::Null => assignments.push_unseparated("NULL"),
            };
        }
        assignments.push("updated_at = now()");
        qb.push(format!(" WHERE {key_column} = "));
        qb.push_bind(key);
        qb.push(" RETURNING *");
        qb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_numbered_assignments() {
        let mut patch = Patch::new();
        patch.set("full_name", "Ada".to_string());
        patch.set("prior_counselling", true);
        let qb = patch.into_update("client_intake_forms", "user_id", Uuid::nil());
        assert_eq!(
            qb.sql(),
            "UPDATE client_intake_forms SET full_name = $1, prior_counselling = $2, \
             updated_at = now() WHERE user_id = $3 RETURNING *"
        );
    }

    #[test]
    fn absent_values_are_skipped() {
        let mut patch = Patch::new();
        patch.set_opt("pronouns", None::<String>);
        patch.set_opt("occupation_school", Some("Student".to_string()));
        assert_eq!(patch.len(), 1);
        assert_eq!(patch.column_names().collect::<Vec<_>>(), vec!["occupation_school"]);
    }

    #[test]
    fn null_fields_clear_the_column() {
        let mut patch = Patch::new();
        patch.set_field("date_of_birth", Field::<Date>::Null);
        patch.set_field("pronouns", Field::<String>::Absent);
        patch.set_field("full_name", Field::Value("Ada".to_string()));
        let qb = patch.into_update("client_intake_forms", "user_id", Uuid::nil());
        assert_eq!(
            qb.sql(),
            "UPDATE client_intake_forms SET date_of_birth = NULL, full_name = $1, \
             updated_at = now() WHERE user_id = $2 RETURNING *"
        );
    }

    #[test]
    fn field_tells_null_from_absent() {
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct Body {
            a: Field<i32>,
            b: Field<i32>,
            c: Field<i32>,
        }
        let body: Body = serde_json::from_str(r#"{"a": null, "b": 4}"#).unwrap();
        assert_eq!(body.a, Field::Null);
        assert_eq!(body.b, Field::Value(4));
        assert_eq!(body.c, Field::Absent);
    }

    #[test]
    fn setting_a_column_twice_keeps_the_last_value() {
        let mut patch = Patch::new();
        patch.set("role", Role::User);
        patch.set("role", Role::Admin);
        assert_eq!(patch.len(), 1);
        assert_eq!(patch.get("role"), Some(&PatchValue::Role(Role::Admin)));
    }
}
