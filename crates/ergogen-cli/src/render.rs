use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use ergogen_footprint::{
    Catalog, Designators, FootprintError, InstanceOptions, NetRegistry, Placement, resolve_params,
};
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Footprint module path or built-in name
    #[arg(value_name = "MODULE")]
    pub module: String,

    /// Placement x in layout units
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub x: f64,

    /// Placement y in layout units
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub y: f64,

    /// Placement rotation in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub r: f64,

    /// Board side handed to the footprint
    #[arg(long, default_value = "F")]
    pub side: String,

    /// Show the reference designator instead of hiding it
    #[arg(long)]
    pub show_ref: bool,

    /// Parameter value as KEY=VALUE, VALUE is read as YAML (repeatable)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,

    /// YAML file with a map of parameter values
    #[arg(long = "params", value_name = "FILE")]
    pub params_file: Option<PathBuf>,
}

pub fn run_params(catalog: &Catalog, module: &str) -> Result<(), CliError> {
    let footprint = catalog.load(module)?;
    let json = serde_json::to_string_pretty(footprint.params())
        .map_err(|e| CliError::processing(e.to_string()))?;
    println!("{json}");
    Ok(())
}

pub fn run_render(catalog: &Catalog, args: &RenderArgs) -> Result<(), CliError> {
    let mut raw = match &args.params_file {
        Some(path) => read_params_file(path)?,
        None => IndexMap::new(),
    };
    for (key, value) in &args.params {
        raw.insert(key.clone(), value.clone());
    }

    let mut footprint = catalog.load(&args.module)?;
    let nets = Arc::new(NetRegistry::new());
    let opts = InstanceOptions {
        placement: Placement::new(args.x, args.y, args.r),
        side: args.side.clone(),
        ref_hide: !args.show_ref,
    };
    let p = resolve_params(footprint.params(), &raw, &opts, &nets, &mut Designators::new())
        .map_err(|source| FootprintError::Params {
            module: footprint.name().to_string(),
            source,
        })?;

    let out = footprint.render(&p)?;
    println!("{}", out.trim());
    tracing::info!(reference = %p.ref_str, nets = ?nets.names(), "rendered footprint");
    Ok(())
}

fn read_params_file(path: &Path) -> Result<IndexMap<String, Value>, CliError> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read params {}", path.display()))?;
    let params = serde_yaml::from_str::<Option<IndexMap<String, Value>>>(&raw)
        .with_context(|| format!("Invalid params file {}", path.display()))?;
    Ok(params.unwrap_or_default())
}

fn parse_param(s: &str) -> Result<(String, Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in `{s}`"));
    }
    let value = serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_are_read_as_yaml_scalars() {
        assert_eq!(parse_param("width=0.5").unwrap(), ("width".into(), json!(0.5)));
        assert_eq!(parse_param("locked=true").unwrap(), ("locked".into(), json!(true)));
        assert_eq!(parse_param("net=GND").unwrap(), ("net".into(), json!("GND")));
        assert_eq!(
            parse_param("route=f(0 0)(1 0)").unwrap(),
            ("route".into(), json!("f(0 0)(1 0)"))
        );
    }

    #[test]
    fn unparsable_yaml_falls_back_to_text() {
        assert_eq!(parse_param("route=|").unwrap(), ("route".into(), json!("|")));
        assert_eq!(parse_param("route=[1, 2").unwrap(), ("route".into(), json!("[1, 2")));
    }

    #[test]
    fn malformed_params_are_rejected() {
        assert!(parse_param("width").is_err());
        assert!(parse_param("=1").is_err());
    }
}
