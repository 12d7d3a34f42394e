use std::fs;
use std::path::Path;
use std::process::Command;

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

fn sideblur(config_dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_sideblur"));
    command
        .env("SIDEBLUR_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn");
    command
}

fn write_frame(path: &Path, width: u32, height: u32, pixel: [u8; 4]) {
    RgbaImage::from_pixel(width, height, Rgba(pixel))
        .save(path)
        .unwrap();
}

#[test]
fn render_cpu_letterboxes_and_fills_bars() {
    let root = TempDir::new().unwrap();
    let input = root.path().join("frame.png");
    let output = root.path().join("out/frame.png");
    write_frame(&input, 32, 18, [200, 40, 10, 255]);

    let status = sideblur(root.path())
        .args(["render", "--cpu", "--aspect", "9:16", "-o"])
        .arg(&output)
        .arg(&input)
        .status()
        .expect("failed to run sideblur render");
    assert!(status.success());

    let rendered = image::open(&output).unwrap().into_rgba8();
    assert_eq!(rendered.dimensions(), (32, 57));
    // Uniform frame: the blurred bars carry the frame colour, fully opaque.
    assert_eq!(rendered.get_pixel(16, 28).0, [200, 40, 10, 255]);
    // Rows 19..37 hold the frame; row 17 is bar, transparent before the effect.
    let bar = rendered.get_pixel(16, 17).0;
    assert!(bar[3] > 100, "bar should be filled: {bar:?}");
    assert!(bar[0] > 80, "bar should carry the frame colour: {bar:?}");
    assert!(bar[0] > bar[2]);
}

#[test]
fn render_reads_aspect_from_config_dir() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("sideblur.toml"),
        "[output]\naspect = \"1:1\"\n",
    )
    .unwrap();
    let input = root.path().join("wide.png");
    let output = root.path().join("square.png");
    write_frame(&input, 20, 10, [0, 0, 255, 255]);

    let status = sideblur(root.path())
        .args(["render", "--cpu", "-o"])
        .arg(&output)
        .arg(&input)
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(image::image_dimensions(&output).unwrap(), (20, 20));
}

#[test]
fn invalid_config_is_reported() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("sideblur.toml"), "[sequence]\nfps = 0\n").unwrap();
    let input = root.path().join("frame.png");
    write_frame(&input, 4, 4, [0, 0, 0, 255]);

    let result = sideblur(root.path())
        .args(["render", "--cpu", "-o"])
        .arg(root.path().join("out.png"))
        .arg(&input)
        .output()
        .unwrap();
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("fps"), "stderr: {stderr}");
}

#[test]
fn sequence_cpu_writes_frames_and_manifest() {
    let root = TempDir::new().unwrap();
    let frames = root.path().join("frames");
    let out = root.path().join("export");
    fs::create_dir_all(&frames).unwrap();
    write_frame(&frames.join("0001.png"), 16, 9, [255, 0, 0, 255]);
    write_frame(&frames.join("0002.png"), 16, 9, [0, 255, 0, 255]);
    write_frame(&frames.join("0003.png"), 8, 8, [0, 0, 255, 255]);
    fs::write(frames.join("README.txt"), "not a frame").unwrap();

    let status = sideblur(root.path())
        .args(["sequence", "--cpu", "--fps", "25", "-o"])
        .arg(&out)
        .arg(&frames)
        .status()
        .unwrap();
    assert!(status.success());

    for name in ["0001.png", "0002.png", "0003.png"] {
        assert!(out.join(name).exists(), "missing {name}");
    }

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("export.json")).unwrap()).unwrap();
    assert_eq!(manifest["renderer"], "cpu");
    assert_eq!(manifest["fps"], 25);
    let records = manifest["frames"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[1]["presentation_time_us"], 40_000);
    assert_eq!(records[0]["configured"], true);
    assert_eq!(records[1]["configured"], false);
    assert_eq!(records[2]["configured"], true);
    assert_eq!(records[2]["width"], 8);
}

#[test]
fn sequence_without_frames_fails() {
    let root = TempDir::new().unwrap();
    let frames = root.path().join("empty");
    fs::create_dir_all(&frames).unwrap();

    let status = sideblur(root.path())
        .args(["sequence", "--cpu", "-o"])
        .arg(root.path().join("out"))
        .arg(&frames)
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn oversized_gpu_canvas_fails_without_panicking() {
    let root = TempDir::new().unwrap();
    let input = root.path().join("strip.png");
    // Wider than any device's 2D texture limit.
    write_frame(&input, 70_000, 1, [10, 20, 30, 255]);

    let result = sideblur(root.path())
        .args(["render", "-o"])
        .arg(root.path().join("out.png"))
        .arg(&input)
        .output()
        .unwrap();
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert_eq!(result.status.code(), Some(1), "stderr: {stderr}");
    assert!(!stderr.contains("panicked"), "stderr: {stderr}");
    assert!(!root.path().join("out.png").exists());
}
