//! Container conversion ahead of sampling.
//!
//! QuickTime `.mov` files are re-encoded to H.264 `.mp4` before the decoder
//! sees them. A missing `ffmpeg` binary is not fatal: the step is skipped
//! and the decoder gets the original file.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Result of the conversion step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeOutcome {
    /// The input is decoded as-is.
    NotNeeded,
    /// The input was converted; decode this file instead.
    Transcoded(PathBuf),
    /// `ffmpeg` is not installed.
    CapabilityMissing,
    /// `ffmpeg` ran but failed; the original file is used.
    Failed(String),
}

impl TranscodeOutcome {
    /// The file the decoder should open.
    pub fn decode_path<'a>(&'a self, original: &'a Path) -> &'a Path {
        match self {
            TranscodeOutcome::Transcoded(path) => path,
            _ => original,
        }
    }
}

/// Whether `path` needs converting before it can be sampled.
pub fn needs_transcode(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("mov"))
        .unwrap_or(false)
}

/// Convert `input` to `<work_dir>/<stem>.mp4` when it needs converting.
pub fn transcode_to_mp4(input: &Path, work_dir: &Path) -> TranscodeOutcome {
    if !needs_transcode(input) {
        return TranscodeOutcome::NotNeeded;
    }

    if let Err(e) = std::fs::create_dir_all(work_dir) {
        return TranscodeOutcome::Failed(format!(
            "cannot create '{}': {}",
            work_dir.display(),
            e
        ));
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    let output = work_dir.join(format!("{}.mp4", stem));

    log::info!(
        "Converting {} to {}",
        input.display(),
        output.display()
    );
    let result = Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-i"])
        .arg(input)
        .args(["-c:v", "libx264", "-an"])
        .arg(&output)
        .output();

    match result {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!(
                "ffmpeg not found; decoding {} without conversion",
                input.display()
            );
            TranscodeOutcome::CapabilityMissing
        }
        Err(e) => {
            log::warn!("Failed to run ffmpeg: {}", e);
            TranscodeOutcome::Failed(e.to_string())
        }
        Ok(out) if !out.status.success() => {
            let message = String::from_utf8_lossy(&out.stderr).trim().to_string();
            log::warn!("ffmpeg conversion failed: {}", message);
            TranscodeOutcome::Failed(message)
        }
        Ok(_) => TranscodeOutcome::Transcoded(output),
    }
}
