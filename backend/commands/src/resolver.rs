/// Parameter resolution: map the model's loosely named parameter bag onto an
/// action's declared parameters.
///
/// Parameters are resolved in declared order. For each one the canonical key
/// and then its aliases are tried in priority order; the first key present
/// wins. The first missing or malformed parameter stops resolution.
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{ParamKind, ParamSpec, ParamValue};

/// A resolved, typed parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Text(String),
    Number(u64),
}

/// Why a parameter could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No accepted key was present (or its value was blank).
    Missing { param: String, description: String },
    /// A key was present but its value has the wrong shape.
    Malformed {
        param: String,
        description: String,
        value: String,
    },
}

impl ResolveError {
    pub fn param(&self) -> &str {
        match self {
            ResolveError::Missing { param, .. } | ResolveError::Malformed { param, .. } => param,
        }
    }

    fn missing(spec: &ParamSpec) -> Self {
        Self::Missing {
            param: spec.name.clone(),
            description: spec.description.clone(),
        }
    }

    fn malformed(spec: &ParamSpec, value: &ParamValue) -> Self {
        Self::Malformed {
            param: spec.name.clone(),
            description: spec.description.clone(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Missing { param, .. } => write!(f, "missing parameter '{param}'"),
            ResolveError::Malformed { param, value, .. } => {
                write!(f, "malformed value '{value}' for parameter '{param}'")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// Parameters resolved against an action's spec, keyed by canonical name.
/// Absent optional parameters have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedParams {
    values: BTreeMap<String, Resolved>,
}

impl ResolvedParams {
    pub fn get(&self, name: &str) -> Option<&Resolved> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            Resolved::Text(s) => Some(s),
            Resolved::Number(_) => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<u64> {
        match self.values.get(name)? {
            Resolved::Number(n) => Some(*n),
            Resolved::Text(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolve `raw` against `specs`.
pub fn resolve_params(
    raw: &BTreeMap<String, ParamValue>,
    specs: &[ParamSpec],
) -> Result<ResolvedParams, ResolveError> {
    let mut resolved = ResolvedParams::default();

    for spec in specs {
        let found = spec.keys().find_map(|key| raw.get(key));
        let value = match found {
            Some(value) => coerce(spec, value)?,
            None => None,
        };

        match value {
            Some(value) => {
                resolved.values.insert(spec.name.clone(), value);
            }
            None if spec.required => return Err(ResolveError::missing(spec)),
            None => {}
        }
    }

    Ok(resolved)
}

/// `Ok(None)` means "treat as absent" (blank text).
fn coerce(spec: &ParamSpec, value: &ParamValue) -> Result<Option<Resolved>, ResolveError> {
    match (spec.kind, value) {
        (ParamKind::Text, ParamValue::Text(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| Resolved::Text(trimmed.to_string())))
        }
        (ParamKind::Text, ParamValue::Number(n)) => Ok(Some(Resolved::Text(n.to_string()))),
        (ParamKind::Number, ParamValue::Number(n)) => n
            .as_u64()
            .map(|n| Some(Resolved::Number(n)))
            .ok_or_else(|| ResolveError::malformed(spec, value)),
        (ParamKind::Number, ParamValue::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<u64>()
                .map(|n| Some(Resolved::Number(n)))
                .map_err(|_| ResolveError::malformed(spec, value))
        }
    }
}
