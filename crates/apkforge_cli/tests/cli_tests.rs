//! CLI integration tests using the real apkforge binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{self, File};
use std::path::Path;

#[allow(deprecated)]
fn apkforge_cmd() -> Command {
    let mut cmd = Command::cargo_bin("apkforge").unwrap();
    cmd.env_remove("APKFORGE_CONFIG").env("APKFORGE_LOG", "warn");
    cmd
}

const BUCKETS: [&str; 5] = ["mdpi", "hdpi", "xhdpi", "xxhdpi", "xxxhdpi"];

fn write_web_app(dir: &Path) {
    fs::write(dir.join("app.html"), "<h1>Hi</h1>").unwrap();
    fs::write(dir.join("style.css"), "h1 { color: red; }").unwrap();
}

fn archive_entries(path: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    names
}

#[test]
fn test_help_output() {
    apkforge_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--html"))
        .stdout(predicate::str::contains("--app-name"))
        .stdout(predicate::str::contains("--strategy"));
}

#[test]
fn test_placeholder_build() {
    let dir = tempfile::tempdir().unwrap();
    write_web_app(dir.path());
    let output = dir.path().join("dist");

    apkforge_cmd()
        .arg("--html")
        .arg(dir.path().join("app.html"))
        .args(["--app-name", "Demo App", "--package-name", "com.demo.app"])
        .arg("--output-dir")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Demo_App.apk"))
        .stdout(predicate::str::contains("com.demo.app"));

    let apk = output.join("apks/Demo_App.apk");
    assert!(apk.is_file());
    let entries = archive_entries(&apk);
    assert!(entries.contains(&"assets/index.html".to_string()));
    assert!(entries.contains(&"assets/style.css".to_string()));

    for bucket in BUCKETS {
        let icon = output.join(format!("build/src/main/res/drawable-{}/ic_launcher.png", bucket));
        assert!(icon.is_file(), "missing icon for {}", bucket);
    }

    let info: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.join("build-info.json")).unwrap()).unwrap();
    assert_eq!(info["app_name"], "Demo App");
    assert_eq!(info["package_name"], "com.demo.app");
    assert!(info["build_time"].is_string());
}

#[test]
fn test_missing_html_fails_before_creating_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("dist");

    apkforge_cmd()
        .arg("--html")
        .arg(dir.path().join("missing.html"))
        .args(["--app-name", "Demo App"])
        .arg("--output-dir")
        .arg(&output)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("HTML file not found"));

    assert!(!output.exists());
}

#[test]
fn test_icon_copied_without_image_processing() {
    let dir = tempfile::tempdir().unwrap();
    write_web_app(dir.path());
    let icon = dir.path().join("icon.png");
    image::RgbaImage::from_pixel(300, 200, image::Rgba([10, 20, 30, 255]))
        .save(&icon)
        .unwrap();
    let original = fs::read(&icon).unwrap();
    let output = dir.path().join("dist");

    apkforge_cmd()
        .arg("--html")
        .arg(dir.path().join("app.html"))
        .args(["--app-name", "Demo App", "--no-image-processing"])
        .arg("--icon")
        .arg(&icon)
        .arg("--output-dir")
        .arg(&output)
        .assert()
        .success();

    for bucket in BUCKETS {
        let copied = fs::read(output.join(format!(
            "build/src/main/res/drawable-{}/ic_launcher.png",
            bucket
        )))
        .unwrap();
        assert_eq!(copied, original, "icon for {} differs", bucket);
    }
}

#[test]
fn test_nested_assets_excluded() {
    let dir = tempfile::tempdir().unwrap();
    write_web_app(dir.path());
    fs::create_dir_all(dir.path().join("css")).unwrap();
    fs::write(dir.path().join("css/nested.css"), "body {}").unwrap();
    fs::write(dir.path().join("notes.txt"), "not an asset").unwrap();
    let output = dir.path().join("dist");

    apkforge_cmd()
        .arg("--html")
        .arg(dir.path().join("app.html"))
        .args(["--app-name", "Demo"])
        .arg("--output-dir")
        .arg(&output)
        .assert()
        .success();

    let entries = archive_entries(&output.join("apks/Demo.apk"));
    assert_eq!(
        entries,
        vec!["AndroidManifest.xml", "assets/index.html", "assets/style.css"]
    );
}

#[test]
fn test_config_file() {
    let dir = tempfile::tempdir().unwrap();
    write_web_app(dir.path());
    fs::write(
        dir.path().join("apkforge.toml"),
        r#"
[app]
html = "app.html"
name = "From File"
package = "com.file.app"
output_dir = "out"
"#,
    )
    .unwrap();

    apkforge_cmd()
        .arg("--config")
        .arg(dir.path().join("apkforge.toml"))
        .assert()
        .success();

    assert!(dir.path().join("out/apks/From_File.apk").is_file());
}

#[test]
fn test_invalid_package_name() {
    let dir = tempfile::tempdir().unwrap();
    write_web_app(dir.path());

    apkforge_cmd()
        .arg("--html")
        .arg(dir.path().join("app.html"))
        .args(["--app-name", "Demo", "--package-name", "nodots"])
        .arg("--output-dir")
        .arg(dir.path().join("dist"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}
