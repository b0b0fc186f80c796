use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const VALID_SHADER: &str = r"@fragment
fn fs_main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let shade = fract(env.time + position.x / env.width);
    return vec4<f32>(shade, shade, shade, 1.0);
}
";

fn shaderpad(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_shaderpad"))
        .env("SHADERPAD_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run shaderpad")
}

#[test]
fn print_default_emits_fragment_entry() {
    let root = TempDir::new().unwrap();
    let output = shaderpad(root.path(), &["--print-default"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("@fragment"));
    assert!(stdout.contains("fn fs_main"));
}

#[test]
fn check_accepts_valid_shader() {
    let root = TempDir::new().unwrap();
    let shader = root.path().join("valid.wgsl");
    fs::write(&shader, VALID_SHADER).unwrap();

    let output = shaderpad(root.path(), &["--check", shader.to_str().unwrap()]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(": ok"));
}

#[test]
fn check_rejects_syntax_errors() {
    let root = TempDir::new().unwrap();
    let shader = root.path().join("broken.wgsl");
    fs::write(&shader, "@fragment fn fs_main( -> {").unwrap();

    let output = shaderpad(root.path(), &["--check", shader.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to compile shader"));
}

#[test]
fn check_rejects_missing_entry_point() {
    let root = TempDir::new().unwrap();
    let shader = root.path().join("helper.wgsl");
    fs::write(&shader, "fn fs_main_helper() -> f32 { return 1.0; }\n").unwrap();

    let output = shaderpad(root.path(), &["--check", shader.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing entry point `fs_main`"));
}

#[test]
fn check_uses_shader_from_config_file() {
    let root = TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("shaders")).unwrap();
    fs::write(root.path().join("shaders/configured.wgsl"), VALID_SHADER).unwrap();
    fs::write(
        root.path().join("shaderpad.toml"),
        "[editor]\nshader = \"shaders/configured.wgsl\"\n",
    )
    .unwrap();

    let output = shaderpad(root.path(), &["--check"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("configured.wgsl: ok"));
}

#[test]
fn invalid_config_is_reported() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("shaderpad.toml"),
        "[playback]\nspeed_level = 40\n",
    )
    .unwrap();

    let output = shaderpad(root.path(), &["--check"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("speed level 40"));
}
