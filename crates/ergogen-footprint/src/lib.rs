//! Footprint modules for ergogen PCBs.
//!
//! A footprint module declares a typed parameter schema and a render function
//! that turns resolved parameters into KiCad board primitives. Modules are
//! located through a [`Resolver`], evaluated in an isolated JavaScript context
//! by [`script`], or provided natively (the trace [`router`]).

mod catalog;
mod error;
mod nets;
mod params;
mod registry;
mod resolver;

pub mod placement;
pub mod router;
pub mod script;

pub use catalog::Catalog;
pub use error::FootprintError;
pub use nets::{Net, NetRegistry, NetScope};
pub use params::{
    Designators, InstanceOptions, ParamError, ParamKind, ParamSpec, ParamSpecTable, ParamValue,
    ResolvedParams, parse_params, resolve_params,
};
pub use placement::Placement;
pub use registry::SourceRegistry;
pub use resolver::{ModuleSource, OverrideHook, ResolveError, Resolver};
pub use router::{RouteError, Router, render_route};

/// A loaded footprint: a fixed parameter schema plus a render function.
///
/// Script modules and native footprints share this surface so the host can
/// treat them alike once they are loaded.
pub trait Footprint {
    /// Identity used in diagnostics (the resolved path or built-in name).
    fn name(&self) -> &str;

    fn params(&self) -> &ParamSpecTable;

    fn render(&mut self, p: &ResolvedParams) -> Result<String, FootprintError>;
}

pub(crate) fn fmt_num(v: f64) -> String {
    let v = if v.abs() < 1e-12 { 0.0 } else { v };
    format!("{}", v)
}

/// Rounds to `decimals` fractional digits and drops insignificant zeros.
pub(crate) fn fmt_fixed(v: f64, decimals: usize) -> String {
    let v = if v.abs() < 1e-12 { 0.0 } else { v };
    let s = format!("{:.*}", decimals, v);
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s.as_str()
    };
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

pub(crate) fn escape_kicad_text(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_formatting_trims_zeros() {
        assert_eq!(fmt_fixed(1.5, 5), "1.5");
        assert_eq!(fmt_fixed(2.0, 5), "2");
        assert_eq!(fmt_fixed(100.0, 5), "100");
        assert_eq!(fmt_fixed(-0.000001, 5), "0");
        assert_eq!(fmt_fixed(1.234567, 5), "1.23457");
        assert_eq!(fmt_fixed(-3.25, 5), "-3.25");
    }

    #[test]
    fn plain_numbers_collapse_negative_zero() {
        assert_eq!(fmt_num(-0.0), "0");
        assert_eq!(fmt_num(0.25), "0.25");
        assert_eq!(fmt_num(90.0), "90");
    }

    #[test]
    fn kicad_text_escapes_quotes() {
        assert_eq!(escape_kicad_text(r#"a"b\c"#), r#"a\"b\\c"#);
    }
}
