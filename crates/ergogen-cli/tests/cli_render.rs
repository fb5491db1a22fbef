use std::path::Path;
use std::process::{Command, Output};

const PAD: &str = r#"module.exports = {
  params: {
    designator: 'PAD',
    width: 1,
    net: { type: 'net', value: undefined },
  },
  body: p => `(pad 1 smd rect ${p.at} (size ${p.width} ${p.width}) ${p.net.str}) # ${p.ref}`
}
"#;

fn ergogen_fp(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ergogen-fp"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run ergogen-fp")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn write_pad(dir: &Path) {
    std::fs::create_dir_all(dir.join("misc")).expect("create dir");
    std::fs::write(dir.join("misc/pad.js"), PAD).expect("write pad");
}

#[test]
fn params_prints_router_schema() {
    let output = ergogen_fp(&["params", "router"]);
    assert!(output.status.success(), "{output:?}");
    let schema: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json");
    assert_eq!(schema["net"]["kind"], "net");
    assert_eq!(schema["net"]["default"], "GND");
    assert_eq!(schema["width"]["kind"], "number");
    assert_eq!(schema["locked"]["default"], false);
}

#[test]
fn render_router_segment() {
    let output = ergogen_fp(&["render", "router", "--param", "route=f(0 0)(1 0)"]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        stdout(&output),
        "# router T1\n\
         (segment (start 0 0) (end 1 0) (width 0.25) (layer \"F.Cu\") (net 1))"
    );
}

#[test]
fn render_router_with_placement_and_params_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let params = dir.path().join("params.yaml");
    std::fs::write(&params, "route: b(0 0)(0 1)\nwidth: 0.5\nlocked: true\n").expect("write");

    let output = ergogen_fp(&[
        "render",
        "router",
        "--x",
        "2",
        "--y",
        "-3",
        "--params",
        params.to_string_lossy().as_ref(),
        "-p",
        "width=0.3",
    ]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        stdout(&output),
        "# router T1\n\
         (segment locked (start 2 3) (end 2 4) (width 0.3) (layer \"B.Cu\") (net 1))"
    );
}

#[test]
fn render_script_module_from_sources() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_pad(dir.path());

    let output = ergogen_fp(&[
        "--sources",
        dir.path().to_string_lossy().as_ref(),
        "--no-fs",
        "render",
        "pad",
        "-p",
        "net=VCC",
        "-p",
        "width=1.5",
    ]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        stdout(&output),
        "(pad 1 smd rect (at 0 0 0) (size 1.5 1.5) (net 1 \"VCC\")) # PAD1"
    );
}

#[test]
fn params_of_script_module_keeps_declaration_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_pad(dir.path());

    let output = ergogen_fp(&[
        "params",
        "misc/pad.js",
        "--sources",
        dir.path().to_string_lossy().as_ref(),
    ]);
    assert!(output.status.success(), "{output:?}");
    let text = stdout(&output);
    let position = |key: &str| text.find(&format!("\"{key}\"")).expect(key);
    assert!(position("designator") < position("width"), "{text}");
    assert!(position("width") < position("net"), "{text}");
    let schema: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(schema["net"]["required"], true);
}

#[test]
fn render_side_flag_reaches_the_footprint() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("sided.js"),
        "module.exports = { params: { side: 'F' }, body: p => 'side=' + p.side };",
    )
    .expect("write module");
    let sources = dir.path().to_string_lossy().to_string();

    let output = ergogen_fp(&["--sources", &sources, "render", "sided", "--side", "B"]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout(&output), "side=B");

    let output = ergogen_fp(&["--sources", &sources, "render", "sided"]);
    assert_eq!(stdout(&output), "side=F");

    let output = ergogen_fp(&[
        "--sources", &sources, "render", "sided", "--side", "B", "-p", "side=F",
    ]);
    assert_eq!(stdout(&output), "side=F");
}
