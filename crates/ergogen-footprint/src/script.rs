//! JavaScript footprint modules.
//!
//! A module is evaluated in a fresh engine context that only sees `module`
//! and `exports`. The module publishes `params` (its schema) and `body`
//! (its render function) on `module.exports`; nothing else is read back.

use boa_engine::{
    Context, JsError, JsNativeError, JsResult, JsString, JsValue, NativeFunction, Source,
    js_string, object::ObjectInitializer, property::Attribute,
};
use serde_json::Value as JsonValue;

use crate::error::FootprintError;
use crate::nets::{Net, NetScope};
use crate::params::{ParamSpecTable, ParamValue, ResolvedParams, parse_params};
use crate::placement::Placement;
use crate::resolver::ModuleSource;
use crate::Footprint;

const PRELUDE: &str = "(function () {\n\
const module = { exports: {} };\n\
(function (module, exports) {\n";

const EPILOGUE: &str = "\n})(module, module.exports);\n\
return module.exports;\n\
})()";

pub struct ScriptModule {
    id: String,
    params: ParamSpecTable,
    body: JsValue,
    ctx: Context,
}

impl std::fmt::Debug for ScriptModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptModule")
            .field("id", &self.id)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Evaluates `source` and extracts its schema and render function.
///
/// The source is evaluated on every call; callers own any caching.
pub fn load_module(source: &ModuleSource) -> Result<ScriptModule, FootprintError> {
    let id = source.id.as_str();
    let mut ctx = Context::default();
    let wrapped = format!("{PRELUDE}{}{EPILOGUE}", source.text);
    let exports = ctx
        .eval(Source::from_bytes(wrapped.as_bytes()))
        .map_err(|e| FootprintError::script(id, describe(&e, &mut ctx)))?;

    let Some(exports_obj) = exports.as_object() else {
        return Err(FootprintError::invalid_module(
            id,
            "module.exports must be an object",
        ));
    };

    let params_val = exports_obj
        .get(js_string!("params"), &mut ctx)
        .map_err(|e| FootprintError::script(id, e.to_string()))?;
    let params_json = js_to_json(&params_val, &mut ctx)
        .map_err(|e| FootprintError::script(id, e.to_string()))?;
    let params = parse_params(&params_json).map_err(|source| FootprintError::Params {
        module: id.to_string(),
        source,
    })?;

    let body = exports_obj
        .get(js_string!("body"), &mut ctx)
        .map_err(|e| FootprintError::script(id, e.to_string()))?;
    if !body.is_callable() {
        return Err(FootprintError::invalid_module(id, "body must be a function"));
    }

    tracing::debug!(module = id, params = params.len(), "loaded footprint module");
    Ok(ScriptModule {
        id: id.to_string(),
        params,
        body,
        ctx,
    })
}

pub fn params_of(source: &ModuleSource) -> Result<ParamSpecTable, FootprintError> {
    load_module(source).map(|m| m.params)
}

/// Loads `source` and renders it once with `p`.
pub fn render(source: &ModuleSource, p: &ResolvedParams) -> Result<String, FootprintError> {
    load_module(source)?.render(p)
}

impl Footprint for ScriptModule {
    fn name(&self) -> &str {
        &self.id
    }

    fn params(&self) -> &ParamSpecTable {
        &self.params
    }

    fn render(&mut self, p: &ResolvedParams) -> Result<String, FootprintError> {
        let id = self.id.as_str();
        let ctx = &mut self.ctx;
        let p_val = build_p_object(ctx, p).map_err(|e| FootprintError::script(id, e.to_string()))?;
        let body_fn = self
            .body
            .as_object()
            .ok_or_else(|| FootprintError::invalid_module(id, "body must be a function"))?;
        let result = body_fn
            .call(&JsValue::undefined(), &[p_val], ctx)
            .map_err(|e| FootprintError::script(id, describe(&e, ctx)))?;
        let rendered = result
            .to_string(ctx)
            .map_err(|e| FootprintError::script(id, e.to_string()))?
            .to_std_string_escaped();
        tracing::trace!(module = id, bytes = rendered.len(), "rendered footprint module");
        Ok(rendered)
    }
}

fn build_p_object(ctx: &mut Context, p: &ResolvedParams) -> JsResult<JsValue> {
    let mut resolved = Vec::with_capacity(p.values().len());
    for (name, value) in p.values() {
        let js_val = match value {
            ParamValue::Net(net) => net_to_js(ctx, net)?,
            other => match other.to_json() {
                Some(json) => JsValue::from_json(&json, ctx)?,
                None => JsValue::null(),
            },
        };
        resolved.push((name.as_str(), js_val));
    }

    let placement = p.placement();
    let mut builder = ObjectInitializer::new(ctx);
    builder
        .property(js_string!("at"), JsString::from(p.at.as_str()), Attribute::all())
        .property(js_string!("r"), JsValue::from(p.r), Attribute::all())
        .property(js_string!("rot"), JsValue::from(p.r), Attribute::all())
        .property(js_string!("ref"), JsString::from(p.ref_str.as_str()), Attribute::all())
        .property(
            js_string!("ref_hide"),
            JsString::from(p.ref_hide.as_str()),
            Attribute::all(),
        )
        .property(js_string!("side"), JsString::from(p.side.as_str()), Attribute::all());

    builder
        .function(make_xy_fn(placement), js_string!("xy"), 2)
        .function(make_xy_fn(placement), js_string!("eaxy"), 2)
        .function(make_net_fn(p.nets().clone(), NetKind::Local), js_string!("local_net"), 1)
        .function(make_net_fn(p.nets().clone(), NetKind::Global), js_string!("global_net"), 1);

    for (name, js_val) in resolved {
        builder.property(JsString::from(name), js_val, Attribute::all());
    }

    Ok(builder.build().into())
}

#[derive(Clone, Copy)]
enum NetKind {
    Local,
    Global,
}

fn make_xy_fn(placement: Placement) -> NativeFunction {
    NativeFunction::from_copy_closure(move |_, args, _ctx| {
        let x = args.first().and_then(JsValue::as_number).unwrap_or(0.0);
        let y = args.get(1).and_then(JsValue::as_number).unwrap_or(0.0);
        Ok(JsValue::from(JsString::from(placement.xy(x, y).as_str())))
    })
}

fn make_net_fn(scope: NetScope, kind: NetKind) -> NativeFunction {
    // SAFETY: the closure captures only a net name prefix and an `Arc` to the
    // host net registry, neither of which holds garbage-collected values.
    unsafe {
        NativeFunction::from_closure(move |_, args, ctx| {
            let name = match args.first() {
                Some(v) if !v.is_null_or_undefined() => v.to_string(ctx)?.to_std_string_escaped(),
                _ => String::new(),
            };
            let net = match kind {
                NetKind::Local => scope.local_net(&name),
                NetKind::Global => scope.global_net(&name),
            };
            net_to_js(ctx, &net)
        })
    }
}

fn net_to_js(ctx: &mut Context, net: &Net) -> JsResult<JsValue> {
    let to_string = NativeFunction::from_copy_closure(|this, _args, ctx| {
        if let Some(obj) = this.as_object() {
            return obj.get(js_string!("str"), ctx);
        }
        Ok(JsValue::from(js_string!("")))
    });
    let mut builder = ObjectInitializer::new(ctx);
    builder
        .property(js_string!("name"), JsString::from(net.name.as_str()), Attribute::all())
        .property(js_string!("index"), JsValue::from(net.index as f64), Attribute::all())
        .property(
            js_string!("str"),
            JsString::from(net.to_string().as_str()),
            Attribute::all(),
        )
        .function(to_string, js_string!("toString"), 0);
    Ok(builder.build().into())
}

/// Converts through the engine's own `JSON.stringify`, so functions and
/// `undefined` members are dropped the way scripts expect.
fn js_to_json(value: &JsValue, ctx: &mut Context) -> JsResult<JsonValue> {
    if value.is_null_or_undefined() {
        return Ok(JsonValue::Null);
    }
    let global = ctx.global_object();
    let json = global.get(js_string!("JSON"), ctx)?;
    let stringify = match json.as_object() {
        Some(obj) => obj.get(js_string!("stringify"), ctx)?,
        None => return Err(type_error("JSON is not available")),
    };
    let Some(stringify) = stringify.as_object() else {
        return Err(type_error("JSON.stringify is not available"));
    };
    let text = stringify.call(&json, &[value.clone()], ctx)?;
    if text.is_undefined() {
        return Ok(JsonValue::Null);
    }
    let text = text.to_string(ctx)?.to_std_string_escaped();
    serde_json::from_str(&text).map_err(|e| type_error(&e.to_string()))
}

/// Text of a thrown value as the script would print it (`Error: boom`).
fn describe(err: &JsError, ctx: &mut Context) -> String {
    let thrown = err.to_opaque(ctx);
    match thrown.to_string(ctx) {
        Ok(text) => text.to_std_string_escaped(),
        Err(_) => err.to_string(),
    }
}

fn type_error(message: &str) -> JsError {
    JsNativeError::typ().with_message(message.to_string()).into()
}
