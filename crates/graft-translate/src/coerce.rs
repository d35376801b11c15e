//! Scalar value coercion for parameters.

use crate::schema::ScalarType;
use graft_cypher::{Expr, Param};
use serde_json::{Number, Value};
use thiserror::Error;

/// Coercion error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    /// The value does not fit the declared type
    #[error("expected {expected} for {ty:?}, got {value}")]
    Mismatch {
        ty: ScalarType,
        expected: &'static str,
        value: Value,
    },
}

/// Turns request values into parameter values of a declared type.
pub trait ScalarCoercion: Send + Sync {
    /// Coerce one (non-list) value. `null` passes through.
    fn coerce(&self, ty: ScalarType, value: &Value) -> Result<Value, CoercionError>;

    /// Coerce a field value, element-wise for list fields.
    fn coerce_field(&self, ty: ScalarType, list: bool, value: &Value) -> Result<Value, CoercionError> {
        match (list, value) {
            (true, Value::Array(items)) => items
                .iter()
                .map(|item| self.coerce(ty, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => self.coerce(ty, value),
        }
    }
}

/// Coercion matching the JSON shapes the standard scalars arrive in.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCoercion;

impl ScalarCoercion for DefaultCoercion {
    fn coerce(&self, ty: ScalarType, value: &Value) -> Result<Value, CoercionError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = |expected: &'static str| CoercionError::Mismatch {
            ty,
            expected,
            value: value.clone(),
        };

        match ty {
            ScalarType::Int => value.as_i64().map(Value::from).ok_or_else(|| mismatch("an integer")),
            ScalarType::BigInt => match value {
                Value::Number(n) if n.is_i64() => Ok(value.clone()),
                Value::String(s) => s
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| mismatch("an integer or integer string")),
                _ => Err(mismatch("an integer or integer string")),
            },
            ScalarType::Float => value
                .as_f64()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| mismatch("a number")),
            ScalarType::Boolean => value.as_bool().map(Value::from).ok_or_else(|| mismatch("a boolean")),
            ScalarType::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(mismatch("a string")),
            },
            ScalarType::Id => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                _ => Err(mismatch("a string or number")),
            },
            ScalarType::DateTime
            | ScalarType::Date
            | ScalarType::Time
            | ScalarType::LocalDateTime
            | ScalarType::LocalTime
            | ScalarType::Duration => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(mismatch("an ISO-8601 string")),
            },
            ScalarType::Point | ScalarType::CartesianPoint => match value {
                Value::Object(_) => Ok(value.clone()),
                _ => Err(mismatch("a point object")),
            },
        }
    }
}

/// Parameter reference for a value of type `ty`, wrapped in the type's
/// constructor for temporal and spatial types (`datetime($param0)`).
pub fn param_expr(ty: ScalarType, list: bool, param: Param) -> Expr {
    match ty.constructor() {
        Some(constructor) if !list => Expr::call(constructor, vec![Expr::param(param)]),
        _ => Expr::param(param),
    }
}
