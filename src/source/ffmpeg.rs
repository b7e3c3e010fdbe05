//! Video decoding through the `ffprobe` and `ffmpeg` executables.
//!
//! A video is probed once, then decoded by a single `ffmpeg` process that
//! writes every frame as raw 8-bit gray to a pipe, read one frame at a time.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use image::GrayImage;
use serde::Deserialize;

use super::{VideoDecoder, VideoError, VideoInfo};

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// A video file decoded front to back by one `ffmpeg` process.
#[derive(Debug)]
pub struct FfmpegVideo {
    path: PathBuf,
    info: VideoInfo,
    stream: Option<FrameStream>,
    decoded: u64,
    finished: bool,
}

impl FfmpegVideo {
    /// Probe `path` with `ffprobe` and keep its stream properties.
    pub fn open(path: &Path) -> Result<Self, VideoError> {
        let out = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .map_err(|e| spawn_error("ffprobe", e))?;
        if !out.status.success() {
            return Err(VideoError::ProbeFailed(
                String::from_utf8_lossy(&out.stderr).trim().to_string(),
            ));
        }

        let probe: ProbeOutput = serde_json::from_slice(&out.stdout)
            .map_err(|e| VideoError::ProbeFailed(format!("invalid ffprobe output: {}", e)))?;
        let info = parse_probe(&probe)?;
        log::debug!("Probed {}: {:?}", path.display(), info);

        Ok(Self {
            path: path.to_path_buf(),
            info,
            stream: None,
            decoded: 0,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VideoDecoder for FfmpegVideo {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<GrayImage>, VideoError> {
        if self.finished {
            return Ok(None);
        }
        let index = self.decoded;
        let frame_len = self.info.width as usize * self.info.height as usize;
        if frame_len == 0 {
            return Err(VideoError::DecodeFailed {
                index,
                message: "video reports zero-sized frames".to_string(),
            });
        }
        if self.stream.is_none() {
            self.stream = Some(FrameStream::spawn(&self.path)?);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        let mut buffer = vec![0u8; frame_len];
        let read = read_frame(&mut stream.stdout, &mut buffer).map_err(|e| {
            VideoError::DecodeFailed {
                index,
                message: e.to_string(),
            }
        })?;

        if read == 0 {
            self.finished = true;
            let result = self.stream.take().map(FrameStream::finish).unwrap_or(Ok(()));
            return match result {
                Ok(()) => Ok(None),
                Err(message) => Err(VideoError::DecodeFailed { index, message }),
            };
        }
        if read < frame_len {
            self.finished = true;
            return Err(VideoError::DecodeFailed {
                index,
                message: format!("truncated frame: got {} of {} bytes", read, frame_len),
            });
        }

        self.decoded += 1;
        GrayImage::from_raw(self.info.width, self.info.height, buffer)
            .map(Some)
            .ok_or(VideoError::DecodeFailed {
                index,
                message: "frame buffer size mismatch".to_string(),
            })
    }
}

/// Running `ffmpeg` process emitting raw gray frames on stdout.
#[derive(Debug)]
struct FrameStream {
    child: Child,
    stdout: ChildStdout,
    stderr_thread: Option<JoinHandle<Vec<String>>>,
}

impl FrameStream {
    fn spawn(path: &Path) -> Result<Self, VideoError> {
        // Frames come out in stored orientation so they match the probed
        // width and height; passthrough keeps the source frame numbering.
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-noautorotate", "-i"])
            .arg(path)
            .args([
                "-map",
                "0:v:0",
                "-an",
                "-vsync",
                "passthrough",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "gray",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error("ffmpeg", e))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(VideoError::DecodeFailed {
                index: 0,
                message: "ffmpeg stdout was not captured".to_string(),
            });
        };

        let stderr_thread = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                let reader = BufReader::new(stderr);
                let mut lines = Vec::new();
                for line in reader.lines() {
                    match line {
                        Ok(l) => {
                            log::debug!("[ffmpeg] {}", l);
                            lines.push(l);
                        }
                        Err(_) => break,
                    }
                }
                lines
            })
        });

        Ok(Self {
            child,
            stdout,
            stderr_thread,
        })
    }

    /// Wait for a stream that reached end of output; `Err` carries stderr.
    fn finish(mut self) -> Result<(), String> {
        let status = self.child.wait().map_err(|e| e.to_string())?;
        let stderr = self
            .stderr_thread
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        if status.success() {
            Ok(())
        } else {
            Err(stderr.join("\n"))
        }
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        // Sampling usually stops before the end of the video
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// Fill `buffer` from `reader`, returning how many bytes were read before
/// end of stream.
fn read_frame(reader: &mut impl Read, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn spawn_error(tool: &'static str, source: std::io::Error) -> VideoError {
    if source.kind() == std::io::ErrorKind::NotFound {
        VideoError::ToolMissing { tool }
    } else {
        VideoError::Spawn { tool, source }
    }
}

fn parse_probe(probe: &ProbeOutput) -> Result<VideoInfo, VideoError> {
    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or(VideoError::NoVideoStream)?;

    let width = stream
        .width
        .ok_or_else(|| VideoError::ProbeFailed("missing video width".to_string()))?;
    let height = stream
        .height
        .ok_or_else(|| VideoError::ProbeFailed("missing video height".to_string()))?;
    let native_fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_ratio)
        .unwrap_or(0.0);

    let frame_count = match stream.nb_frames.as_deref().and_then(|n| n.parse::<u64>().ok()) {
        Some(n) if n > 0 => n,
        _ => {
            let duration = stream
                .duration
                .as_deref()
                .or(probe.format.as_ref().and_then(|f| f.duration.as_deref()))
                .and_then(|d| d.parse::<f64>().ok())
                .unwrap_or(0.0);
            let estimate = (duration * native_fps).round();
            if estimate.is_finite() && estimate > 0.0 {
                estimate as u64
            } else {
                0
            }
        }
    };

    Ok(VideoInfo {
        native_fps,
        frame_count,
        width,
        height,
    })
}

/// Parse an ffprobe rate such as `30000/1001`.
fn parse_ratio(s: &str) -> Option<f64> {
    let (num, den) = s.split_once('/')?;
    let num = num.trim().parse::<f64>().ok()?;
    let den = den.trim().parse::<f64>().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}
