use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::nets::{Net, NetScope};
use crate::placement::Placement;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("invalid params: expected object")]
    NotObject,
    #[error("invalid param `{0}`: {1}")]
    Invalid(String, &'static str),
    #[error("missing param `{0}`")]
    Missing(String),
    #[error("param `{name}` expects a {kind}, got {value}")]
    WrongType {
        name: String,
        kind: ParamKind,
        value: JsonValue,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Net,
    String,
    Number,
    Boolean,
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ParamKind::Net => "net",
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<JsonValue>,
}

pub type ParamSpecTable = IndexMap<String, ParamSpec>;

/// Parses a module's `params` object. `null` yields an empty table.
pub fn parse_params(value: &JsonValue) -> Result<ParamSpecTable, ParamError> {
    if value.is_null() {
        return Ok(IndexMap::new());
    }
    let obj = value.as_object().ok_or(ParamError::NotObject)?;
    let mut out = IndexMap::new();
    for (name, val) in obj {
        let spec = parse_param_value(name, val)?;
        out.insert(name.clone(), spec);
    }
    Ok(out)
}

fn parse_param_value(name: &str, value: &JsonValue) -> Result<ParamSpec, ParamError> {
    let invalid = |reason| ParamError::Invalid(name.to_string(), reason);
    if let Some(obj) = value.as_object() {
        let kind_val = obj.get("type").ok_or_else(|| invalid("missing type"))?;
        let kind = match kind_val.as_str().ok_or_else(|| invalid("type must be string"))? {
            "net" => ParamKind::Net,
            "string" => ParamKind::String,
            "number" => ParamKind::Number,
            "boolean" => ParamKind::Boolean,
            _ => return Err(invalid("unknown type")),
        };
        let default = obj.get("value").cloned().filter(|v| !v.is_null());
        if let Some(default) = &default
            && !default_matches_kind(kind, default)
        {
            return Err(invalid("default type mismatch"));
        }
        return Ok(ParamSpec {
            kind,
            required: default.is_none(),
            default,
        });
    }

    let kind = match value {
        JsonValue::String(_) => ParamKind::String,
        JsonValue::Number(_) => ParamKind::Number,
        JsonValue::Bool(_) => ParamKind::Boolean,
        JsonValue::Null => {
            return Ok(ParamSpec {
                kind: ParamKind::Net,
                required: false,
                default: None,
            });
        }
        _ => return Err(invalid("unsupported default type")),
    };
    Ok(ParamSpec {
        kind,
        required: false,
        default: Some(value.clone()),
    })
}

fn default_matches_kind(kind: ParamKind, value: &JsonValue) -> bool {
    match kind {
        ParamKind::Net | ParamKind::String => value.is_string(),
        ParamKind::Number => value.is_number(),
        ParamKind::Boolean => value.is_boolean(),
    }
}

/// A parameter value after coercion to its declared kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Net(Net),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Net(_) => ParamKind::Net,
            ParamValue::String(_) => ParamKind::String,
            ParamValue::Number(_) => ParamKind::Number,
            ParamValue::Boolean(_) => ParamKind::Boolean,
        }
    }

    /// JSON form of a non-net value. Nets have no JSON form of their own.
    pub fn to_json(&self) -> Option<JsonValue> {
        match self {
            ParamValue::Net(_) => None,
            ParamValue::String(s) => Some(JsonValue::String(s.clone())),
            ParamValue::Number(n) => serde_json::Number::from_f64(*n).map(JsonValue::Number),
            ParamValue::Boolean(b) => Some(JsonValue::Bool(*b)),
        }
    }
}

/// Per-instance inputs the host supplies alongside the raw parameter values.
#[derive(Debug, Clone)]
pub struct InstanceOptions {
    pub placement: Placement,
    pub side: String,
    pub ref_hide: bool,
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self {
            placement: Placement::default(),
            side: "F".to_string(),
            ref_hide: true,
        }
    }
}

/// Allocates reference designators (`D1`, `D2`, ...) per prefix.
#[derive(Debug, Default, Clone)]
pub struct Designators {
    counts: HashMap<String, usize>,
}

impl Designators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, prefix: &str) -> String {
        let entry = self.counts.entry(prefix.to_string()).or_insert(0);
        *entry += 1;
        format!("{prefix}{}", *entry)
    }
}

/// Everything a render function sees for one footprint instance.
#[derive(Debug, Clone)]
pub struct ResolvedParams {
    pub at: String,
    pub r: f64,
    pub side: String,
    pub ref_str: String,
    pub ref_hide: String,
    placement: Placement,
    nets: NetScope,
    values: IndexMap<String, ParamValue>,
}

impl ResolvedParams {
    pub fn new(
        placement: Placement,
        ref_str: impl Into<String>,
        side: impl Into<String>,
        ref_hide: bool,
        nets: NetScope,
    ) -> Self {
        Self {
            at: placement.at(),
            r: placement.r,
            side: side.into(),
            ref_str: ref_str.into(),
            ref_hide: if ref_hide { "hide".to_string() } else { String::new() },
            placement,
            nets,
            values: IndexMap::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn values(&self) -> &IndexMap<String, ParamValue> {
        &self.values
    }

    pub fn net(&self, name: &str) -> Option<&Net> {
        match self.values.get(name)? {
            ParamValue::Net(net) => Some(net),
            _ => None,
        }
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.values.get(name)? {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.values.get(name)? {
            ParamValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn xy(&self, x: f64, y: f64) -> String {
        self.placement.xy(x, y)
    }

    pub fn local_net(&self, name: &str) -> Net {
        self.nets.local_net(name)
    }

    pub fn global_net(&self, name: &str) -> Net {
        self.nets.global_net(name)
    }

    pub fn nets(&self) -> &NetScope {
        &self.nets
    }
}

/// Coerces raw host values against a module schema and builds the
/// parameter object for one instance. Net params bind to global nets.
pub fn resolve_params(
    specs: &ParamSpecTable,
    raw: &IndexMap<String, JsonValue>,
    opts: &InstanceOptions,
    nets: &std::sync::Arc<crate::nets::NetRegistry>,
    designators: &mut Designators,
) -> Result<ResolvedParams, ParamError> {
    for name in raw.keys() {
        if !specs.contains_key(name) {
            tracing::warn!(param = %name, "ignoring param not declared by footprint");
        }
    }

    let ref_str = designators.next(&resolve_designator(specs, raw));
    let scope = NetScope::new(ref_str.clone(), std::sync::Arc::clone(nets));

    let mut values = IndexMap::with_capacity(specs.len());
    for (name, spec) in specs {
        let Some(value) = raw.get(name).filter(|v| !v.is_null()).or(spec.default.as_ref()) else {
            if spec.required {
                return Err(ParamError::Missing(name.clone()));
            }
            if spec.kind == ParamKind::Net {
                values.insert(name.clone(), ParamValue::Net(scope.global_net("")));
            }
            continue;
        };
        let resolved = match spec.kind {
            ParamKind::Net => ParamValue::Net(scope.global_net(&scalar_to_string(name, spec.kind, value)?)),
            ParamKind::String => ParamValue::String(scalar_to_string(name, spec.kind, value)?),
            ParamKind::Number => ParamValue::Number(coerce_number(name, value)?),
            ParamKind::Boolean => ParamValue::Boolean(coerce_bool(name, value)?),
        };
        values.insert(name.clone(), resolved);
    }

    // An explicit `side` value beats the instance side, which beats the schema default.
    let explicit = raw.get("side").is_some_and(|v| !v.is_null());
    let side = match values.get_mut("side") {
        Some(ParamValue::String(s)) if explicit => s.clone(),
        Some(ParamValue::String(s)) => {
            s.clone_from(&opts.side);
            opts.side.clone()
        }
        _ => opts.side.clone(),
    };
    let mut resolved = ResolvedParams::new(opts.placement, ref_str, side, opts.ref_hide, scope);
    resolved.values = values;
    Ok(resolved)
}

fn wrong_type(name: &str, kind: ParamKind, value: &JsonValue) -> ParamError {
    ParamError::WrongType {
        name: name.to_string(),
        kind,
        value: value.clone(),
    }
}

fn scalar_to_string(name: &str, kind: ParamKind, value: &JsonValue) -> Result<String, ParamError> {
    match value {
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Bool(b) => Ok(b.to_string()),
        _ => Err(wrong_type(name, kind, value)),
    }
}

fn coerce_number(name: &str, value: &JsonValue) -> Result<f64, ParamError> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| wrong_type(name, ParamKind::Number, value))
}

fn coerce_bool(name: &str, value: &JsonValue) -> Result<bool, ParamError> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => s.trim().parse::<bool>().ok(),
        _ => None,
    }
    .ok_or_else(|| wrong_type(name, ParamKind::Boolean, value))
}

fn resolve_designator(specs: &ParamSpecTable, raw: &IndexMap<String, JsonValue>) -> String {
    if let Some(JsonValue::String(s)) = raw.get("designator")
        && !s.is_empty()
    {
        return s.clone();
    }
    if let Some(spec) = specs.get("designator")
        && let Some(s) = spec.default.as_ref().and_then(|d| d.as_str())
        && !s.is_empty()
    {
        return s.to_string();
    }
    "FP".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nets::NetRegistry;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn parses_param_defaults_and_types() {
        let params = json!({
            "designator": "MH",
            "side": "F",
            "hole_size": "2.2",
            "from": { "type": "net", "value": null },
            "to": null,
            "width": { "type": "number", "value": 0.25 },
            "flag": { "type": "boolean", "value": true },
        });

        let specs = parse_params(&params).unwrap();
        assert_eq!(specs["designator"].kind, ParamKind::String);
        assert_eq!(specs["hole_size"].kind, ParamKind::String);
        assert_eq!(specs["width"].kind, ParamKind::Number);
        assert_eq!(specs["flag"].kind, ParamKind::Boolean);

        let from = &specs["from"];
        assert_eq!(from.kind, ParamKind::Net);
        assert!(from.required);
        assert!(from.default.is_none());

        let to = &specs["to"];
        assert_eq!(to.kind, ParamKind::Net);
        assert!(!to.required);
    }

    #[test]
    fn rejects_unknown_kinds_and_mismatched_defaults() {
        let err = parse_params(&json!({ "a": { "type": "array", "value": [] } })).unwrap_err();
        assert_eq!(err, ParamError::Invalid("a".into(), "unknown type"));

        let err = parse_params(&json!({ "w": { "type": "number", "value": "x" } })).unwrap_err();
        assert_eq!(err, ParamError::Invalid("w".into(), "default type mismatch"));

        let err = parse_params(&json!({ "l": [1, 2] })).unwrap_err();
        assert_eq!(err, ParamError::Invalid("l".into(), "unsupported default type"));

        assert_eq!(parse_params(&json!(3)).unwrap_err(), ParamError::NotObject);
        assert!(parse_params(&JsonValue::Null).unwrap().is_empty());
    }

    fn specs() -> ParamSpecTable {
        parse_params(&json!({
            "designator": "D",
            "from": { "type": "net", "value": null },
            "to": { "type": "net", "value": "GND" },
            "width": 0.25,
            "locked": false,
            "label": "x",
        }))
        .unwrap()
    }

    #[test]
    fn resolves_values_with_defaults_and_coercion() {
        let nets = Arc::new(NetRegistry::new());
        let mut refs = Designators::new();
        let mut raw = IndexMap::new();
        raw.insert("from".to_string(), json!("ROW1"));
        raw.insert("width".to_string(), json!("0.5"));
        raw.insert("locked".to_string(), json!("true"));
        raw.insert("label".to_string(), json!(7));

        let p = resolve_params(&specs(), &raw, &InstanceOptions::default(), &nets, &mut refs)
            .unwrap();
        assert_eq!(p.ref_str, "D1");
        assert_eq!(p.at, "(at 0 0 0)");
        assert_eq!(p.side, "F");
        assert_eq!(p.ref_hide, "hide");
        assert_eq!(p.net("from").unwrap().name, "ROW1");
        assert_eq!(p.net("to").unwrap().name, "GND");
        assert_eq!(p.number("width"), Some(0.5));
        assert_eq!(p.boolean("locked"), Some(true));
        assert_eq!(p.string("label"), Some("7"));
        assert_eq!(nets.names(), vec!["ROW1", "GND"]);

        let again = resolve_params(&specs(), &raw, &InstanceOptions::default(), &nets, &mut refs)
            .unwrap();
        assert_eq!(again.ref_str, "D2");
        assert_eq!(again.net("from"), p.net("from"));
    }

    #[test]
    fn missing_required_and_wrong_types_fail() {
        let nets = Arc::new(NetRegistry::new());
        let mut refs = Designators::new();
        let err = resolve_params(
            &specs(),
            &IndexMap::new(),
            &InstanceOptions::default(),
            &nets,
            &mut refs,
        )
        .unwrap_err();
        assert_eq!(err, ParamError::Missing("from".into()));

        let mut raw = IndexMap::new();
        raw.insert("from".to_string(), json!("A"));
        raw.insert("width".to_string(), json!("wide"));
        let err = resolve_params(&specs(), &raw, &InstanceOptions::default(), &nets, &mut refs)
            .unwrap_err();
        assert!(matches!(err, ParamError::WrongType { ref name, kind: ParamKind::Number, .. } if name == "width"));
    }

    #[test]
    fn side_param_overrides_instance_side() {
        let specs = parse_params(&json!({ "side": "F" })).unwrap();
        let mut raw = IndexMap::new();
        raw.insert("side".to_string(), json!("B"));
        let p = resolve_params(
            &specs,
            &raw,
            &InstanceOptions::default(),
            &Arc::new(NetRegistry::new()),
            &mut Designators::new(),
        )
        .unwrap();
        assert_eq!(p.side, "B");
        assert_eq!(p.ref_str, "FP1");
    }

    #[test]
    fn instance_side_beats_schema_default() {
        let specs = parse_params(&json!({ "side": "F" })).unwrap();
        let opts = InstanceOptions {
            side: "B".to_string(),
            ..InstanceOptions::default()
        };
        let p = resolve_params(
            &specs,
            &IndexMap::new(),
            &opts,
            &Arc::new(NetRegistry::new()),
            &mut Designators::new(),
        )
        .unwrap();
        assert_eq!(p.side, "B");
        assert_eq!(p.string("side"), Some("B"));
    }
}
