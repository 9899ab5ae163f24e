use std::fs;
use std::path::Path;
use std::process::Output;

use tempfile::TempDir;

const FFPROBE: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then exit 0; fi
for last; do :; done
[ -f "$last" ] || { echo "$last: No such file or directory" >&2; exit 1; }
echo '{"format":{"format_name":"matroska","duration":"4.0","size":"512"},"streams":[{"codec_type":"video","codec_name":"vp9","width":640,"height":360}]}'
"#;

const FFMPEG: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then exit 0; fi
for last; do :; done
echo "$@" > "$last.args"
echo "out_time_ms=2000000" >&2
echo "progress=continue" >&2
echo "out_time_ms=4000000" >&2
echo "progress=end" >&2
echo "done" > "$last"
"#;

/// Run the binary with an isolated environment
async fn run_cli(dir: &Path, args: &[&str]) -> Output {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_ffmpeg-transform"))
        .args(args)
        .current_dir(dir)
        .env("TRANSFORM_CONFIG", dir.join("transform.toml"))
        .env("RUST_LOG", "error") // Quiet logs during tests
        .output()
        .await
        .expect("Failed to run ffmpeg-transform")
}

#[cfg(unix)]
fn install(dir: &Path, name: &str, script: &str) {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[tokio::test]
async fn test_missing_command_exits_with_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("in.mkv"), b"movie").unwrap();

    let output = run_cli(dir.path(), &["in.mkv", "out.mp4"]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ffmpeg binary not defined"), "stderr: {}", stderr);
}

#[tokio::test]
async fn test_invalid_config_exits_with_error() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("transform.toml"),
        "[logging]\nlevel = \"loud\"\n",
    )
    .unwrap();

    let output = run_cli(dir.path(), &["in.mkv", "out.mp4"]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Configuration validation failed"),
        "stderr: {}",
        stderr
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_transcodes_with_configured_binary() {
    let dir = TempDir::new().unwrap();
    install(dir.path(), "ffmpeg", FFMPEG);
    install(dir.path(), "ffprobe", FFPROBE);
    fs::write(dir.path().join("in.mkv"), b"movie").unwrap();
    fs::write(
        dir.path().join("transform.toml"),
        format!(
            "[task]\ncommand = \"{}\"\n\n[task.options]\nvideo_codec = \"libx264\"\n\n\
             [task.options.custom]\nvf = \"scale=640:-2\"\nmap = \"0:v\"\n",
            dir.path().join("ffmpeg").display()
        ),
    )
    .unwrap();

    let output = run_cli(dir.path(), &["--metrics", "in.mkv", "out.mp4"]).await;

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(dir.path().join("out.mp4").exists());
    let args = fs::read_to_string(dir.path().join("out.mp4.args")).unwrap();
    assert!(args.contains("-threads 2 -vf scale=640:-2 -map 0:v"), "args: {}", args);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("transform_runs_total{result=\"success\"} 1"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_ffmpeg_flag_overrides_config() {
    let dir = TempDir::new().unwrap();
    install(dir.path(), "ffmpeg", FFMPEG);
    install(dir.path(), "ffprobe", FFPROBE);

    let ffmpeg = dir.path().join("ffmpeg");
    let output = run_cli(
        dir.path(),
        &["--ffmpeg", ffmpeg.to_str().unwrap(), "missing.mkv", "out.mp4"],
    )
    .await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to transform missing.mkv"), "stderr: {}", stderr);
}
