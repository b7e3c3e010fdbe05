//! Orchestration of one encoding invocation.
//!
//! Source frames are decoded to grayscale one at a time and each goes
//! straight through resample → tone map → filter → sparse encode in
//! ascending frame order; only the small grids are kept. The table is
//! rendered in memory and only written once every frame has been
//! processed, so an input error never leaves a partial table behind.

use std::path::{Path, PathBuf};

use image::GrayImage;

use crate::config::OutputConfig;
use crate::error::{InputError, PixelatorError};
use crate::grid::{Animation, Frame, GridStats, filter_dark_pixels, resample_to_grid, tone_map};
use crate::preview::{self, PreviewError, VideoOutcome, VideoSkip};
use crate::settings::Settings;
use crate::source::{
    self, FfmpegVideo, FrameSource, PartialExtraction, SampleError, TranscodeOutcome,
};
use crate::sparse::{SparseFrame, encode_grid};
use crate::table::{DeclarationRegistry, RegistryOutcome, render_table, table_path, write_table};

/// Where the artifacts of an invocation are written.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    pub table_dir: PathBuf,
    pub registry: PathBuf,
    /// `None` disables preview rasters and the preview video.
    pub preview_dir: Option<PathBuf>,
}

impl OutputLayout {
    pub fn from_config(output: &OutputConfig) -> Self {
        Self {
            table_dir: output.table_dir.clone(),
            registry: output.registry.clone(),
            preview_dir: Some(output.preview_dir.clone()),
        }
    }

    /// All artifacts under one directory, using the default file names.
    pub fn in_dir(root: &Path) -> Self {
        let defaults = OutputConfig::default();
        Self {
            table_dir: root.join(defaults.table_dir),
            registry: root.join(defaults.registry),
            preview_dir: Some(root.join(defaults.preview_dir)),
        }
    }

    pub fn without_previews(mut self) -> Self {
        self.preview_dir = None;
        self
    }
}

/// One frame after every stage has run.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub frame: Frame,
    pub sparse: SparseFrame,
    pub stats: GridStats,
    pub tone_changed: usize,
    pub suppressed: usize,
    pub dimmed: usize,
}

/// Run every per-frame stage on one grayscale raster.
pub fn process_frame(image: &GrayImage, settings: &Settings, frame_number: u32) -> ProcessedFrame {
    let raw = resample_to_grid(image, settings);
    let toned = tone_map(&raw, settings);
    let filtered = filter_dark_pixels(&toned.grid, settings);
    let sparse = encode_grid(&filtered.grid, frame_number);
    let stats = filtered.grid.stats();

    log::debug!(
        "Frame {}: {} active pixels, tone changed {}, filter suppressed {} dimmed {}",
        frame_number,
        sparse.num_pixels(),
        toned.changed,
        filtered.suppressed,
        filtered.dimmed
    );

    ProcessedFrame {
        frame: Frame {
            grid: filtered.grid,
            frame_number,
        },
        sparse,
        stats,
        tone_changed: toned.changed,
        suppressed: filtered.suppressed,
        dimmed: filtered.dimmed,
    }
}

/// Frames encoded so far, with the change counts summed over them.
#[derive(Debug, Default)]
pub struct EncodedFrames {
    pub frames: Vec<Frame>,
    pub sparse: Vec<SparseFrame>,
    pub active_pixels: usize,
    pub tone_changed: usize,
    pub suppressed: usize,
    pub dimmed: usize,
}

impl EncodedFrames {
    /// Run every stage on `image` as the next frame in order.
    pub fn push(&mut self, image: &GrayImage, settings: &Settings) {
        let processed = process_frame(image, settings, self.frames.len() as u32);
        self.active_pixels += processed.stats.active;
        self.tone_changed += processed.tone_changed;
        self.suppressed += processed.suppressed;
        self.dimmed += processed.dimmed;
        self.frames.push(processed.frame);
        self.sparse.push(processed.sparse);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Everything read from one source.
#[derive(Debug)]
pub struct LoadedFrames {
    pub encoded: EncodedFrames,
    /// Sequence images that failed to decode and were skipped.
    pub skipped: usize,
    pub partial: Option<PartialExtraction>,
    pub transcode: TranscodeOutcome,
}

/// Decode and encode every frame of `frame_source`, in frame order.
///
/// Each raster is reduced to its grid as soon as it is decoded, so at most
/// one full-resolution frame is held at a time.
pub fn load_frames(
    frame_source: &FrameSource,
    settings: &Settings,
) -> Result<LoadedFrames, InputError> {
    let mut encoded = EncodedFrames::default();
    match frame_source {
        FrameSource::Image(path) => {
            encoded.push(&source::open_gray(path)?, settings);
            Ok(LoadedFrames {
                encoded,
                skipped: 0,
                partial: None,
                transcode: TranscodeOutcome::NotNeeded,
            })
        }
        FrameSource::Sequence(dir) => {
            let files = source::list_sequence(dir)?;
            let mut skipped = 0;
            for file in &files {
                match source::open_gray(file) {
                    Ok(image) => encoded.push(&image, settings),
                    Err(e) => {
                        log::warn!("Skipping frame: {}", e);
                        skipped += 1;
                    }
                }
            }
            if encoded.is_empty() {
                return Err(InputError::EmptySequence { path: dir.clone() });
            }
            Ok(LoadedFrames {
                encoded,
                skipped,
                partial: None,
                transcode: TranscodeOutcome::NotNeeded,
            })
        }
        FrameSource::Video(path) => load_video(path, settings),
    }
}

fn load_video(path: &Path, settings: &Settings) -> Result<LoadedFrames, InputError> {
    let work_dir = std::env::temp_dir().join(format!("matrix-pixelator-{}", std::process::id()));
    let transcode = source::transcode_to_mp4(path, &work_dir);

    let mut encoded = EncodedFrames::default();
    let sampled = FfmpegVideo::open(transcode.decode_path(path))
        .map_err(|source| InputError::Video {
            path: path.to_path_buf(),
            source,
        })
        .and_then(|mut video| {
            source::sample_frames(&mut video, settings.sample_fps, |frame| {
                encoded.push(frame, settings)
            })
            .map_err(|SampleError::NoFrames { .. }| InputError::NoFramesExtracted {
                path: path.to_path_buf(),
            })
        });

    if let TranscodeOutcome::Transcoded(converted) = &transcode
        && let Err(e) = std::fs::remove_file(converted)
    {
        log::debug!("Could not remove {}: {}", converted.display(), e);
    }
    let _ = std::fs::remove_dir(&work_dir);

    let summary = sampled?;
    if encoded.is_empty() {
        return Err(InputError::NoFramesExtracted {
            path: path.to_path_buf(),
        });
    }
    Ok(LoadedFrames {
        encoded,
        skipped: 0,
        partial: summary.partial,
        transcode,
    })
}

/// Summary of one invocation.
#[derive(Debug, Clone)]
pub struct EncodeReport {
    pub name: String,
    pub source_kind: &'static str,
    pub frames_encoded: usize,
    pub skipped_images: usize,
    pub partial: Option<PartialExtraction>,
    pub table_path: PathBuf,
    pub registry_path: PathBuf,
    pub registry: RegistryOutcome,
    pub transcode: TranscodeOutcome,
    /// Directory holding the preview rasters, when they were written.
    pub preview_dir: Option<PathBuf>,
    /// Why previews were not written, when writing them failed.
    pub preview_error: Option<String>,
    pub video: VideoOutcome,
    pub active_pixels: usize,
    pub tone_changed: usize,
    pub suppressed: usize,
    pub dimmed: usize,
}

/// Encode `input` as animation `name` and write its artifacts.
pub fn encode_animation(
    input: &Path,
    name: &str,
    settings: &Settings,
    layout: &OutputLayout,
) -> Result<EncodeReport, PixelatorError> {
    let name = source::sanitize_symbol_name(name)?;
    log::info!("Encoding '{}' as {}", input.display(), name);
    log::info!("Settings: {}", settings.summary());

    let frame_source = FrameSource::detect(input)?;
    let loaded = load_frames(&frame_source, settings)?;
    log::info!(
        "Processed {} frames from {} {}",
        loaded.encoded.len(),
        frame_source.kind(),
        input.display()
    );

    write_animation(
        &name,
        loaded.encoded,
        settings,
        layout,
        EncodeContext {
            source_kind: frame_source.kind(),
            skipped_images: loaded.skipped,
            partial: loaded.partial,
            transcode: loaded.transcode,
        },
    )
}

/// Source details carried into the report.
#[derive(Debug, Clone)]
pub struct EncodeContext {
    pub source_kind: &'static str,
    pub skipped_images: usize,
    pub partial: Option<PartialExtraction>,
    pub transcode: TranscodeOutcome,
}

impl Default for EncodeContext {
    fn default() -> Self {
        Self {
            source_kind: "image",
            skipped_images: 0,
            partial: None,
            transcode: TranscodeOutcome::NotNeeded,
        }
    }
}

/// Encode already-decoded rasters; frame numbers follow slice order.
pub fn encode_images(
    name: &str,
    images: &[GrayImage],
    settings: &Settings,
    layout: &OutputLayout,
    context: EncodeContext,
) -> Result<EncodeReport, PixelatorError> {
    let mut encoded = EncodedFrames::default();
    for image in images {
        encoded.push(image, settings);
    }
    write_animation(name, encoded, settings, layout, context)
}

/// Write the table, the registry declaration and the previews for
/// `encoded` frames.
///
/// The registry's matrix size is checked before anything is written.
/// Preview failures are logged and reported but do not fail the call.
pub fn write_animation(
    name: &str,
    encoded: EncodedFrames,
    settings: &Settings,
    layout: &OutputLayout,
    context: EncodeContext,
) -> Result<EncodeReport, PixelatorError> {
    let EncodedFrames {
        frames,
        sparse,
        active_pixels,
        tone_changed,
        suppressed,
        dimmed,
    } = encoded;
    let animation = Animation::new(name, frames).ok_or_else(|| InputError::EmptySequence {
        path: PathBuf::from(name),
    })?;
    let (grid_width, grid_height) = animation.grid_size();

    let registry = DeclarationRegistry::new(&layout.registry);
    registry.check_matrix_size(grid_width, grid_height)?;

    let table = render_table(animation.name(), &sparse, &registry.include_name());
    let table_file = table_path(&layout.table_dir, animation.name());
    write_table(&table_file, &table)?;

    let registry_outcome = registry.ensure_declared(
        animation.name(),
        animation.frames().len(),
        grid_width,
        grid_height,
    )?;

    let (preview_dir, preview_error, video) = match &layout.preview_dir {
        Some(dir) => {
            let dir = dir.join(animation.name());
            match write_previews(&animation, &dir, settings) {
                Ok(video) => (Some(dir), None, video),
                Err(e) => {
                    log::warn!("Previews not written: {}", e);
                    (
                        None,
                        Some(e.to_string()),
                        VideoOutcome::Skipped(VideoSkip::NoPreviews),
                    )
                }
            }
        }
        None => (None, None, VideoOutcome::Skipped(VideoSkip::Disabled)),
    };

    log::info!(
        "Encoded {} frames ({} active pixels) into {}",
        animation.frames().len(),
        active_pixels,
        table_file.display()
    );
    if let Some(partial) = &context.partial {
        log::warn!("Partial extraction: {}", partial);
    }

    Ok(EncodeReport {
        name: animation.name().to_string(),
        source_kind: context.source_kind,
        frames_encoded: animation.frames().len(),
        skipped_images: context.skipped_images,
        partial: context.partial,
        table_path: table_file,
        registry_path: layout.registry.clone(),
        registry: registry_outcome,
        transcode: context.transcode,
        preview_dir,
        preview_error,
        video,
        active_pixels,
        tone_changed,
        suppressed,
        dimmed,
    })
}

fn write_previews(
    animation: &Animation,
    dir: &Path,
    settings: &Settings,
) -> Result<VideoOutcome, PreviewError> {
    let images =
        preview::write_frame_previews(animation.frames(), dir, settings.cell_aspect_ratio)?;
    if !settings.generate_video {
        return Ok(VideoOutcome::Skipped(VideoSkip::Disabled));
    }

    let video_path = dir.join(format!("{}_animation.mp4", animation.name()));
    match preview::assemble_video(&images, &video_path, settings.video_fps) {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            log::warn!("Preview video not written: {}", e);
            Ok(VideoOutcome::Failed(e.to_string()))
        }
    }
}
