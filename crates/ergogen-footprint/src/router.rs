//! The trace router footprint.
//!
//! A router instance carries a compact route string that is walked left to
//! right and turned into `segment` and `via` primitives relative to the
//! footprint placement:
//!
//! | token        | effect                                                  |
//! |--------------|---------------------------------------------------------|
//! | `f` / `b`    | select front / back copper                              |
//! | `(x y)`      | move to a point, drawing a segment from the last point  |
//! | `v`          | drop a via at the current point                         |
//! | `<name>`     | switch to global net `name` and break the path          |
//! | `x` / `\|`   | break the path                                          |
//!
//! Anything else is ignored, so routes may be spaced out freely.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

use crate::error::FootprintError;
use crate::nets::Net;
use crate::params::{ParamSpecTable, ResolvedParams, parse_params};
use crate::{Footprint, fmt_fixed, fmt_num};

macro_rules! number {
    () => {
        r"([-+]?[0-9.]+(?:[eE][-+]?[0-9]+)?)"
    };
}

lazy_static! {
    static ref AT_PATTERN: Regex =
        Regex::new(concat!(r"\(at ", number!(), " ", number!(), " ", number!(), r"\)"))
            .expect("valid placement regex");
}

const COORD_DECIMALS: usize = 5;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    #[error("could not read x, y and angle from placement `{0}`")]
    InvalidPlacement(String),
    #[error("segment to `{0}` has no layer; start the route with `f` or `b`")]
    MissingLayer(String),
    #[error("invalid route coordinate `{0}`")]
    InvalidCoordinate(String),
    #[error("unterminated net name `{0}`")]
    InvalidNetName(String),
    #[error("missing router param `{0}`")]
    MissingParam(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Front,
    Back,
}

impl Layer {
    fn copper(self) -> &'static str {
        match self {
            Layer::Front => "F.Cu",
            Layer::Back => "B.Cu",
        }
    }
}

/// Maps footprint-local route coordinates onto the board.
#[derive(Debug, Clone, Copy)]
struct Transform {
    x: f64,
    y: f64,
    cos: f64,
    sin: f64,
}

impl Transform {
    fn parse(at: &str) -> Result<Self, RouteError> {
        let invalid = || RouteError::InvalidPlacement(at.to_string());
        let caps = AT_PATTERN.captures(at).ok_or_else(invalid)?;
        let num = |i: usize| caps[i].parse::<f64>().map_err(|_| invalid());
        let (x, y, angle) = (num(1)?, num(2)?, num(3)?);
        let (sin, cos) = angle.to_radians().sin_cos();
        Ok(Self { x, y, cos, sin })
    }

    // The y axis points down on the board, hence the mirrored sin terms.
    fn apply(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (
            self.cos * x + self.sin * y + self.x,
            self.cos * y - self.sin * x + self.y,
        )
    }

    fn point(&self, p: (f64, f64)) -> String {
        let (nx, ny) = self.apply(p);
        format!("{} {}", fmt_fixed(nx, COORD_DECIMALS), fmt_fixed(ny, COORD_DECIMALS))
    }
}

struct RouteState {
    layer: Option<Layer>,
    point: Option<(f64, f64)>,
    net: Net,
    locked: bool,
}

impl RouteState {
    fn lock_token(&self) -> &'static str {
        if self.locked { "locked " } else { "" }
    }
}

struct Style {
    width: f64,
    via_size: f64,
    via_drill: f64,
}

/// Renders the route of a router instance.
pub fn render_route(p: &ResolvedParams) -> Result<String, RouteError> {
    let transform = Transform::parse(&p.at)?;
    let route = p.string("route").unwrap_or_default();
    let net = p.net("net").cloned().ok_or(RouteError::MissingParam("net"))?;
    let style = Style {
        width: p.number("width").unwrap_or(0.25),
        via_size: p.number("via_size").unwrap_or(0.8),
        via_drill: p.number("via_drill").unwrap_or(0.4),
    };
    let mut state = RouteState {
        layer: None,
        point: None,
        net,
        locked: p.boolean("locked").unwrap_or(false),
    };

    let mut out = vec![format!("# router {}", p.ref_str)];
    let mut rest = route;
    while let Some(c) = rest.chars().next() {
        let mut advance = c.len_utf8();
        match c.to_ascii_lowercase() {
            'f' => state.layer = Some(Layer::Front),
            'b' => state.layer = Some(Layer::Back),
            'x' | '|' => state.point = None,
            'v' => {
                if let Some(at) = state.point {
                    out.push(format!(
                        "(via {}(at {}) (size {}) (drill {}) (layers \"F.Cu\" \"B.Cu\") (net {}))",
                        state.lock_token(),
                        transform.point(at),
                        fmt_num(style.via_size),
                        fmt_num(style.via_drill),
                        state.net.index
                    ));
                }
            }
            '(' => {
                let close = rest
                    .find(')')
                    .ok_or_else(|| RouteError::InvalidCoordinate(rest.to_string()))?;
                let fragment = &rest[..=close];
                let end = parse_tuple(&rest[1..close])
                    .ok_or_else(|| RouteError::InvalidCoordinate(fragment.to_string()))?;
                if let Some(start) = state.point {
                    let layer = state
                        .layer
                        .ok_or_else(|| RouteError::MissingLayer(fragment.to_string()))?;
                    out.push(format!(
                        "(segment {}(start {}) (end {}) (width {}) (layer \"{}\") (net {}))",
                        state.lock_token(),
                        transform.point(start),
                        transform.point(end),
                        fmt_num(style.width),
                        layer.copper(),
                        state.net.index
                    ));
                }
                state.point = Some(end);
                advance = close + 1;
            }
            '<' => {
                let close = rest
                    .find('>')
                    .ok_or_else(|| RouteError::InvalidNetName(rest.to_string()))?;
                state.net = p.global_net(&rest[1..close]);
                state.point = None;
                advance = close + 1;
            }
            _ => {}
        }
        rest = &rest[advance..];
    }

    tracing::trace!(reference = %p.ref_str, primitives = out.len() - 1, "routed");
    Ok(out.join("\n").trim().to_string())
}

/// Parses `x y` or `x, y`. Both fields must be JSON numbers.
fn parse_tuple(inner: &str) -> Option<(f64, f64)> {
    let inner = inner.trim();
    let (x, y) = match inner.split_once(',') {
        Some((_, y)) if y.contains(',') => return None,
        Some((x, y)) => (x.trim(), y.trim()),
        None => {
            let mut parts = inner.split_whitespace();
            let pair = (parts.next()?, parts.next()?);
            if parts.next().is_some() {
                return None;
            }
            pair
        }
    };
    Some((json_number(x)?, json_number(y)?))
}

fn json_number(field: &str) -> Option<f64> {
    if field.is_empty() {
        return None;
    }
    serde_json::from_str::<f64>(field).ok().filter(|v| v.is_finite())
}

/// Native footprint wrapping [`render_route`].
#[derive(Debug, Clone)]
pub struct Router {
    params: ParamSpecTable,
}

impl Router {
    pub const NAME: &'static str = "router";

    pub fn new() -> Self {
        let schema = json!({
            "designator": "T",
            "side": "F",
            "net": { "type": "net", "value": "GND" },
            "route": { "type": "string", "value": "" },
            "width": 0.25,
            "via_size": 0.8,
            "via_drill": 0.4,
            "locked": false,
        });
        let params = parse_params(&schema).expect("router schema is well-formed");
        Self { params }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Footprint for Router {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn params(&self) -> &ParamSpecTable {
        &self.params
    }

    fn render(&mut self, p: &ResolvedParams) -> Result<String, FootprintError> {
        render_route(p).map_err(|source| FootprintError::Route {
            module: Self::NAME.to_string(),
            source,
        })
    }
}
