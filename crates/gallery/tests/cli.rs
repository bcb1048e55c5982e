use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const VALID_FRAGMENT: &str = "precision mediump float;
uniform vec2 iResolution;
uniform float iTime;

void main() {
    vec2 uv = gl_FragCoord.xy / iResolution;
    gl_FragColor = vec4(uv, 0.5 + 0.5 * sin(iTime), 1.0);
}
";

const BROKEN_FRAGMENT: &str = "precision mediump float;

void main() {
    gl_FragColor = vec4(undefined_value, 1.0);
}
";

fn gallery(root: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_shader-gallery"));
    command
        .env("SHADER_GALLERY_CONFIG_DIR", root.join("config"))
        .env("SHADER_GALLERY_CACHE_DIR", root.join("cache"))
        .env_remove("SHADER_GALLERY_SOURCE")
        .env_remove("SHADER_GALLERY_CONFIG")
        .env("RUST_LOG", "error");
    command
}

fn run(command: &mut Command) -> Output {
    command.output().expect("failed to run shader-gallery")
}

fn create_gallery(root: &Path) {
    let frag = root.join("site/frag");
    fs::create_dir_all(&frag).unwrap();
    fs::write(frag.join("shaderB.glsl"), VALID_FRAGMENT).unwrap();
    fs::write(frag.join("shaderA.glsl"), VALID_FRAGMENT).unwrap();
    fs::write(frag.join("README.md"), "not a shader").unwrap();
    fs::write(
        root.join("site/manifest.json"),
        r#"["waves.glsl", "aurora.glsl", "notes.txt"]"#,
    )
    .unwrap();
}

#[test]
fn list_prints_sorted_shaders() {
    let root = TempDir::new().unwrap();
    create_gallery(root.path());

    let output = run(gallery(root.path()).arg("list").arg(root.path().join("site")));
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        vec!["shaderA.glsl", "shaderB.glsl"]
    );
}

#[test]
fn list_reads_manifest_when_asked() {
    let root = TempDir::new().unwrap();
    create_gallery(root.path());

    let output = run(gallery(root.path())
        .arg("list")
        .arg(root.path().join("site"))
        .args(["--listing", "manifest"]));
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        vec!["aurora.glsl", "waves.glsl"]
    );
}

#[test]
fn list_uses_configured_source() {
    let root = TempDir::new().unwrap();
    create_gallery(root.path());
    let config_dir = root.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("gallery.toml"),
        format!("source = {:?}\n", root.path().join("site").display().to_string()),
    )
    .unwrap();

    let output = run(gallery(root.path()).arg("list"));
    assert!(output.status.success(), "{output:?}");
    assert!(String::from_utf8(output.stdout)
        .unwrap()
        .contains("shaderA.glsl"));
}

#[test]
fn list_fails_for_missing_gallery() {
    let root = TempDir::new().unwrap();
    let output = run(gallery(root.path())
        .arg("list")
        .arg(root.path().join("nowhere")));
    assert!(!output.status.success());
}

#[test]
fn check_reports_uniform_handles() {
    let root = TempDir::new().unwrap();
    let shader = root.path().join("ok.glsl");
    fs::write(&shader, VALID_FRAGMENT).unwrap();

    let output = run(gallery(root.path()).arg("check").arg(&shader));
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("ok"), "{stdout}");
    assert!(stdout.contains("iResolution +0"), "{stdout}");
    assert!(stdout.contains("a_position at location 0"), "{stdout}");
}

#[test]
fn check_fails_on_compile_errors() {
    let root = TempDir::new().unwrap();
    let shader = root.path().join("broken.glsl");
    fs::write(&shader, BROKEN_FRAGMENT).unwrap();

    let output = run(gallery(root.path()).arg("check").arg(&shader));
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(
        stderr.contains("fragment shader failed to compile"),
        "{stderr}"
    );
    assert!(stderr.contains("\n4:"), "{stderr}");
}

#[test]
fn check_accepts_custom_uniforms() {
    let root = TempDir::new().unwrap();
    let shader = root.path().join("tinted.glsl");
    fs::write(
        &shader,
        "precision mediump float;\nuniform float u_speed;\nuniform vec3 u_tint;\n\nvoid main() {\n    gl_FragColor = vec4(u_tint * u_speed, 1.0);\n}\n",
    )
    .unwrap();

    let output = run(gallery(root.path()).arg("check").arg(&shader));
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("iMouse +16"), "{stdout}");
}

#[test]
fn check_fails_without_position_attribute() {
    let root = TempDir::new().unwrap();
    let shader = root.path().join("ok.glsl");
    let vertex = root.path().join("vertex.glsl");
    fs::write(&shader, VALID_FRAGMENT).unwrap();
    fs::write(
        &vertex,
        "attribute vec2 position;\nvoid main() { gl_Position = vec4(position, 0.0, 1.0); }\n",
    )
    .unwrap();

    let output = run(gallery(root.path())
        .arg("check")
        .arg(&shader)
        .arg("--vertex")
        .arg(&vertex));
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("a_position"), "{stderr}");
}

#[test]
fn help_lists_subcommands() {
    let root = TempDir::new().unwrap();
    let output = run(gallery(root.path()).arg("--help"));
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("list"));
    assert!(stdout.contains("check"));
    assert!(stdout.contains("--route"));
}
