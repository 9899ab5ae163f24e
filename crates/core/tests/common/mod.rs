//! Fake ffmpeg/ffprobe executables for integration tests.
//!
//! The scripts answer `-version`, report a 10 second 1280x720 source, and
//! write a progress stream that ends at the full duration.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub const FFPROBE_SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffprobe version test"
  exit 0
fi
for last; do :; done
if [ ! -f "$last" ]; then
  echo "$last: No such file or directory" >&2
  exit 1
fi
if grep -q corrupt "$last"; then
  echo "$last: Invalid data found when processing input" >&2
  exit 1
fi
cat <<'JSON'
{"format":{"filename":"source","format_name":"mov,mp4,m4a","duration":"10.000000","size":"2048","bit_rate":"1638"},"streams":[{"codec_type":"video","codec_name":"h264","width":1280,"height":720,"r_frame_rate":"25/1"},{"codec_type":"audio","codec_name":"aac","sample_rate":"48000","channels":2}]}
JSON
"#;

pub const FFMPEG_SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version test"
  exit 0
fi
for last; do :; done
echo "$@" > "$last.args"
echo "frame=0" >&2
echo "out_time_ms=0" >&2
echo "progress=continue" >&2
echo "frame=125" >&2
echo "out_time_ms=5000000" >&2
echo "speed=2.0x" >&2
echo "progress=continue" >&2
echo "out_time_ms=10000000" >&2
echo "progress=end" >&2
echo "transcoded" > "$last"
exit 0
"#;

pub const LATIN1_METADATA_FFMPEG_SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version test"
  exit 0
fi
for last; do :; done
printf 'Metadata title: caf\351\n' >&2
echo "out_time_ms=5000000" >&2
printf 'Stream #0:0: Video: h264 (caf\351)\n' >&2
echo "out_time_ms=10000000" >&2
echo "progress=end" >&2
echo "transcoded" > "$last"
exit 0
"#;

pub const FAILING_FFMPEG_SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version test"
  exit 0
fi
echo "out_time_ms=2500000" >&2
echo "progress=continue" >&2
echo "Unknown encoder 'libnothing'" >&2
exit 1
"#;

/// A directory holding fake binaries plus room for media files.
pub struct FakeToolchain {
    pub dir: TempDir,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::with_ffmpeg(FFMPEG_SCRIPT)
    }

    pub fn with_ffmpeg(ffmpeg_script: &str) -> Self {
        let toolchain = Self::without_binaries();
        toolchain.install("ffmpeg", ffmpeg_script);
        toolchain.install("ffprobe", FFPROBE_SCRIPT);
        toolchain
    }

    pub fn without_binaries() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        Self { dir }
    }

    pub fn install(&self, name: &str, script: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, script).expect("Failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make script executable");
        path
    }

    pub fn ffmpeg(&self) -> PathBuf {
        self.dir.path().join("ffmpeg")
    }

    pub fn media(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("Failed to write media file");
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Arguments the fake ffmpeg was called with, recorded next to `output`.
pub fn recorded_args(output: &Path) -> String {
    let mut args_path = output.as_os_str().to_owned();
    args_path.push(".args");
    fs::read_to_string(args_path).expect("ffmpeg arguments were not recorded")
}
