//! Raw request parameters and typed accessors.
//!
//! Every endpoint receives a flat JSON map of named parameters. This wrapper
//! provides typed access with uniform validation errors carrying the
//! offending parameter name.

use serde_json::Value;

use crate::error::{PortalError, PortalResult};

/// A flat map of named request parameters.
#[derive(Debug, Clone, Default)]
pub struct Params(serde_json::Map<String, Value>);

impl Params {
    pub fn new(map: serde_json::Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.get(name).map(|v| !v.is_null()).unwrap_or(false)
    }

    /// String rendering of a parameter, if present. Numbers and booleans are
    /// accepted and rendered; this mirrors the permissive wire contract.
    pub fn str(&self, name: &str) -> Option<String> {
        match self.0.get(name) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn required_str(&self, name: &str) -> PortalResult<String> {
        self.str(name)
            .ok_or_else(|| PortalError::validation(name, "missing required parameter"))
    }

    pub fn f64(&self, name: &str) -> PortalResult<Option<f64>> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| PortalError::validation(name, format!("not a number: `{}`", s))),
            Some(other) => Err(PortalError::validation(
                name,
                format!("expected a number, got {}", other),
            )),
        }
    }

    pub fn required_f64(&self, name: &str) -> PortalResult<f64> {
        self.f64(name)?
            .ok_or_else(|| PortalError::validation(name, "missing required parameter"))
    }

    pub fn usize(&self, name: &str) -> PortalResult<Option<usize>> {
        match self.f64(name)? {
            None => Ok(None),
            Some(v) if v >= 0.0 => Ok(Some(v as usize)),
            Some(v) => Err(PortalError::validation(
                name,
                format!("expected a non-negative integer, got {}", v),
            )),
        }
    }

    /// Boolean flag. Accepts JSON booleans and the string forms `True`,
    /// `true`, `False`, `false`. Absent means `false`.
    pub fn flag(&self, name: &str) -> bool {
        match self.0.get(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.as_str(), "True" | "true" | "1"),
            _ => false,
        }
    }

    /// Verify the parameters belong to at most one of the declared
    /// mutually-exclusive groups, and return the index of the group that is
    /// present. Each group is `(group_name, member_parameters)`.
    pub fn exclusive_group(&self, groups: &[(&str, &[&str])]) -> PortalResult<Option<usize>> {
        let mut found: Option<usize> = None;
        for (idx, (group, members)) in groups.iter().enumerate() {
            if let Some(present) = members.iter().find(|m| self.has(m)) {
                match found {
                    None => found = Some(idx),
                    Some(prev) => {
                        return Err(PortalError::validation_in_group(
                            *present,
                            *group,
                            format!(
                                "conflicts with parameters of group `{}`",
                                groups[prev].0
                            ),
                        ));
                    }
                }
            }
        }
        Ok(found)
    }
}
