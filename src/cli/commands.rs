//! Subcommand handlers for encode, preview and config actions.

use std::path::Path;

use super::args::{ConfigAction, OutputArgs, SettingsArgs};
use crate::config::{self, Config, ConfigError, DEFAULT_CONFIG_TEMPLATE};
use crate::error::{InputError, PixelatorError};
use crate::pipeline::{self, EncodeReport, OutputLayout};
use crate::preview::{self, SINGLE_PREVIEW_SCALE, VideoOutcome, VideoSkip};
use crate::settings::{RawSettings, Settings};
use crate::source::{self, TranscodeOutcome};
use crate::table::RegistryOutcome;

/// Load the config file.
///
/// If a path is given it must exist. Otherwise the default location is
/// tried and an unreadable file falls back to defaults with a warning.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from_explicit(path),
        None => match Config::load() {
            Ok(c) => Ok(c),
            Err(e) => {
                eprintln!("Warning: Failed to load config file: {}", e);
                eprintln!("Using default settings.\n");
                Ok(Config::default())
            }
        },
    }
}

/// Merge settings: CLI args > JSON record > config file > built-in defaults.
pub fn effective_settings(
    config: &Config,
    settings_json: Option<&Path>,
    flags: &SettingsArgs,
) -> Result<Settings, ConfigError> {
    let mut raw = config.settings.clone();
    if let Some(path) = settings_json {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        raw = raw.merge(RawSettings::from_json_str(&json)?);
    }
    Settings::from_raw(&raw.merge(flags.to_raw()))
}

/// Output layout: CLI args > config file `[output]` > defaults.
pub fn effective_layout(config: &Config, flags: &OutputArgs) -> OutputLayout {
    let mut layout = OutputLayout::from_config(&config.output);
    if let Some(dir) = &flags.table_dir {
        layout.table_dir = dir.clone();
    }
    if let Some(registry) = &flags.registry {
        layout.registry = registry.clone();
    }
    if let Some(dir) = &flags.preview_dir {
        layout.preview_dir = Some(dir.clone());
    }
    if flags.no_previews {
        layout.preview_dir = None;
    }
    layout
}

/// Handle `encode`.
pub fn run_encode(
    config: &Config,
    input: &Path,
    name: Option<&str>,
    settings_json: Option<&Path>,
    settings: &SettingsArgs,
    output: &OutputArgs,
) -> Result<EncodeReport, PixelatorError> {
    let settings = effective_settings(config, settings_json, settings)?;
    let layout = effective_layout(config, output);
    let name = match name {
        Some(name) => source::sanitize_symbol_name(name)?,
        None => source::default_symbol_name(input)?,
    };
    let report = pipeline::encode_animation(input, &name, &settings, &layout)?;
    print_report(&report);
    Ok(report)
}

fn print_report(report: &EncodeReport) {
    println!(
        "Encoded {} frame(s) from {} as `{}`",
        report.frames_encoded, report.source_kind, report.name
    );
    println!("  Table: {}", report.table_path.display());
    match report.registry {
        RegistryOutcome::Appended => {
            println!("  Registry: {} (declaration added)", report.registry_path.display())
        }
        RegistryOutcome::AlreadyPresent => println!(
            "  Registry: {} (already declared)",
            report.registry_path.display()
        ),
    }
    println!(
        "  Pixels: {} active, tone changed {}, filtered {}, dimmed {}",
        report.active_pixels, report.tone_changed, report.suppressed, report.dimmed
    );
    if report.skipped_images > 0 {
        println!("  Skipped {} unreadable image(s)", report.skipped_images);
    }
    if let Some(partial) = &report.partial {
        println!("  Warning: {}", partial);
    }
    match &report.transcode {
        TranscodeOutcome::Transcoded(_) => println!("  Converted .mov input with ffmpeg"),
        TranscodeOutcome::CapabilityMissing => {
            println!("  Note: ffmpeg not found, .mov input decoded without conversion")
        }
        TranscodeOutcome::Failed(message) => println!("  Warning: conversion failed: {}", message),
        TranscodeOutcome::NotNeeded => {}
    }
    if let Some(dir) = &report.preview_dir {
        println!("  Previews: {}", dir.display());
    }
    if let Some(error) = &report.preview_error {
        println!("  Warning: previews not written: {}", error);
    }
    match &report.video {
        VideoOutcome::Written(path) => println!("  Video: {}", path.display()),
        VideoOutcome::Skipped(VideoSkip::CapabilityMissing) => {
            println!("  Note: ffmpeg not found, preview video skipped")
        }
        VideoOutcome::Failed(message) => println!("  Warning: preview video failed: {}", message),
        VideoOutcome::Skipped(_) => {}
    }
}

/// Handle `preview`: render one image at preview scale to a PNG.
pub fn run_preview(
    config: &Config,
    input: &Path,
    output: &Path,
    settings: &SettingsArgs,
) -> Result<(), PixelatorError> {
    let settings = effective_settings(config, None, settings)?;
    if !input.exists() {
        return Err(InputError::NotFound {
            path: input.to_path_buf(),
        }
        .into());
    }
    let image = source::open_gray(input)?;
    let processed = pipeline::process_frame(&image, &settings, 0);
    let raster = preview::render_preview(
        &processed.frame.grid,
        settings.cell_aspect_ratio,
        SINGLE_PREVIEW_SCALE,
    );
    preview::save_preview(&raster, output).map_err(crate::error::SerializationError::from)?;
    println!(
        "Preview saved to {} ({} active pixels)",
        output.display(),
        processed.sparse.num_pixels()
    );
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, config_path: Option<&Path>) {
    match action {
        ConfigAction::Show => {
            let settings = load_config(config_path).and_then(|cfg| {
                effective_settings(&cfg, None, &SettingsArgs::default()).map(|s| (cfg, s))
            });
            let (cfg, settings) = match settings {
                Ok(pair) => pair,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            println!("Current configuration:");
            println!("  Grid: {}x{}", settings.grid_width, settings.grid_height);
            println!(
                "  Contrast: {} (k={}, center={})",
                if settings.enhance_contrast { "on" } else { "off" },
                settings.sigmoid_k,
                settings.sigmoid_center
            );
            println!(
                "  Filter/dim thresholds: {}/{}",
                settings.filter_threshold, settings.dimming_threshold
            );
            println!("  Cell aspect ratio: {}", settings.cell_aspect_ratio);
            println!("  Sample FPS: {}", settings.sample_fps);
            println!(
                "  Video FPS: {}{}",
                settings.video_fps,
                if settings.generate_video { "" } else { " (video off)" }
            );
            println!("  Table dir: {}", cfg.output.table_dir.display());
            println!("  Registry: {}", cfg.output.registry.display());
            println!("  Preview dir: {}", cfg.output.preview_dir.display());
            println!();

            let config_path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(config::default_path);
            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            let config_path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(config::default_path);

            if config_path.exists() {
                eprintln!("Config file already exists: {}", config_path.display());
                eprintln!("Use 'matrix-pixelator config show' to view current settings.");
                std::process::exit(1);
            }

            if let Some(parent) = config_path.parent()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                eprintln!("Error creating config directory: {}", e);
                std::process::exit(1);
            }

            if let Err(e) = std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE) {
                eprintln!("Error writing config file: {}", e);
                std::process::exit(1);
            }

            println!("Created config file: {}", config_path.display());
        }
    }
}
