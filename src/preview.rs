//! Human-viewable previews of encoded frames.
//!
//! A preview draws each grid cell as a solid block, `scale` pixels wide and
//! `floor(scale * aspect)` tall, so the image has the proportions the
//! matrix renderer will show. Previews are informational only.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::{GrayImage, Luma};

use crate::grid::{BrightnessGrid, Frame};

/// Cell width in pixels for per-frame preview rasters.
pub const FRAME_PREVIEW_SCALE: u32 = 10;
/// Cell width in pixels for the standalone `preview` command.
pub const SINGLE_PREVIEW_SCALE: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("Could not create preview directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not save preview '{}': {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("ffmpeg I/O failed: {0}")]
    Pipe(#[from] std::io::Error),

    #[error("ffmpeg failed to encode '{}': {message}", path.display())]
    Encode { path: PathBuf, message: String },
}

/// Why no preview video was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSkip {
    Disabled,
    TooFewFrames,
    CapabilityMissing,
    /// The preview rasters could not be written.
    NoPreviews,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoOutcome {
    Written(PathBuf),
    Skipped(VideoSkip),
    /// ffmpeg ran but did not produce a video.
    Failed(String),
}

/// Pixel size of one cell at `scale`.
pub fn cell_pixel_size(scale: u32, cell_aspect_ratio: f64) -> (u32, u32) {
    let height = (scale as f64 * cell_aspect_ratio).floor();
    let height = if height.is_finite() && height >= 1.0 {
        height as u32
    } else {
        1
    };
    (scale.max(1), height)
}

/// Nearest-neighbour upscale of a grid into a preview raster.
pub fn render_preview(grid: &BrightnessGrid, cell_aspect_ratio: f64, scale: u32) -> GrayImage {
    let (cell_w, cell_h) = cell_pixel_size(scale, cell_aspect_ratio);
    GrayImage::from_fn(grid.width() * cell_w, grid.height() * cell_h, |px, py| {
        Luma([grid.get(px / cell_w, py / cell_h).unwrap_or(0)])
    })
}

/// File name of the preview for one frame.
pub fn frame_file_name(frame_number: u32) -> String {
    format!("frame_{:05}.png", frame_number)
}

/// Save a preview raster, creating its directory.
pub fn save_preview(image: &GrayImage, path: &Path) -> Result<(), PreviewError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| PreviewError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    image.save(path).map_err(|source| PreviewError::Save {
        path: path.to_path_buf(),
        source,
    })
}

/// Write one preview PNG per frame into `dir`, returning the rasters in order.
pub fn write_frame_previews(
    frames: &[Frame],
    dir: &Path,
    cell_aspect_ratio: f64,
) -> Result<Vec<GrayImage>, PreviewError> {
    let mut images = Vec::with_capacity(frames.len());
    for frame in frames {
        let image = render_preview(&frame.grid, cell_aspect_ratio, FRAME_PREVIEW_SCALE);
        save_preview(&image, &dir.join(frame_file_name(frame.frame_number)))?;
        images.push(image);
    }
    log::info!("Wrote {} preview frames to {}", images.len(), dir.display());
    Ok(images)
}

/// Pad a raster with black on the right and bottom to even dimensions.
pub fn pad_to_even(image: &GrayImage) -> GrayImage {
    let (w, h) = image.dimensions();
    let (even_w, even_h) = (w + w % 2, h + h % 2);
    if (even_w, even_h) == (w, h) {
        return image.clone();
    }
    let mut padded = GrayImage::new(even_w, even_h);
    image::imageops::replace(&mut padded, image, 0, 0);
    padded
}

/// Encode preview rasters to an H.264 video at `fps`.
///
/// Needs at least two frames. When `ffmpeg` is not installed the video is
/// skipped rather than failing the invocation.
pub fn assemble_video(
    images: &[GrayImage],
    path: &Path,
    fps: u32,
) -> Result<VideoOutcome, PreviewError> {
    if images.len() < 2 {
        return Ok(VideoOutcome::Skipped(VideoSkip::TooFewFrames));
    }
    let padded: Vec<GrayImage> = images.iter().map(pad_to_even).collect();
    let (width, height) = padded[0].dimensions();

    let mut child = match Command::new("ffmpeg")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .args(["-v", "error", "-y", "-f", "rawvideo", "-pix_fmt", "gray", "-s"])
        .arg(format!("{}x{}", width, height))
        .arg("-r")
        .arg(fps.to_string())
        .args(["-i", "pipe:0", "-an", "-c:v", "libx264", "-pix_fmt", "yuv420p"])
        .arg(path)
        .spawn()
    {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("ffmpeg not found; skipping preview video");
            return Ok(VideoOutcome::Skipped(VideoSkip::CapabilityMissing));
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(mut stdin) = child.stdin.take() {
        for image in &padded {
            if image.dimensions() != (width, height) {
                continue;
            }
            if let Err(e) = stdin.write_all(image.as_raw()) {
                // ffmpeg exited early; its stderr explains why
                log::debug!("ffmpeg stdin closed: {}", e);
                break;
            }
        }
    }

    let out = child.wait_with_output()?;
    if !out.status.success() {
        return Err(PreviewError::Encode {
            path: path.to_path_buf(),
            message: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }
    log::info!("Preview video saved to '{}'", path.display());
    Ok(VideoOutcome::Written(path.to_path_buf()))
}
