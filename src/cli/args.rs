//! CLI argument parsing with clap.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::settings::RawSettings;

/// Convert images and videos into sparse brightness tables for LED matrices
#[derive(Parser, Debug)]
#[command(name = "matrix-pixelator")]
#[command(version, about = "Pixelate images and videos into C animation tables", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode an image, image directory or video into an animation table
    Encode {
        /// Image file, directory of numbered images, or video file
        input: PathBuf,

        /// Animation (C symbol) name; defaults to the input's file name
        #[arg(long, short)]
        name: Option<String>,

        /// Flat JSON settings record applied over the config file
        #[arg(long)]
        settings_json: Option<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Render a single image as a grid preview PNG
    Preview {
        /// Image file to preview
        input: PathBuf,

        /// Where to write the preview PNG
        #[arg(long, short, default_value = "preview.png")]
        output: PathBuf,

        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show effective settings
    Show,
    /// Create default config file
    Init,
}

/// Per-invocation overrides for the encoding settings.
///
/// Values are checked against their ranges when the settings are built,
/// so out-of-range input is reported the same way as in a config file.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct SettingsArgs {
    /// Grid width in cells
    #[arg(long, allow_negative_numbers = true)]
    pub grid_width: Option<i64>,

    /// Grid height in cells
    #[arg(long, allow_negative_numbers = true)]
    pub grid_height: Option<i64>,

    /// Enable sigmoid contrast enhancement
    #[arg(long, conflicts_with = "no_contrast")]
    pub contrast: bool,

    /// Disable sigmoid contrast enhancement
    #[arg(long)]
    pub no_contrast: bool,

    /// Sigmoid steepness
    #[arg(long, allow_negative_numbers = true)]
    pub sigmoid_k: Option<f64>,

    /// Sigmoid midpoint (0-255)
    #[arg(long, allow_negative_numbers = true)]
    pub sigmoid_center: Option<f64>,

    /// Values at or below this become 0
    #[arg(long, allow_negative_numbers = true)]
    pub filter_threshold: Option<i64>,

    /// Values at or below this (and above the filter threshold) are dimmed
    #[arg(long, allow_negative_numbers = true)]
    pub dimming_threshold: Option<i64>,

    /// Height/width ratio of one rendered cell
    #[arg(long, allow_negative_numbers = true)]
    pub cell_aspect_ratio: Option<f64>,

    /// Video sampling rate in frames per second
    #[arg(long, allow_negative_numbers = true)]
    pub fps: Option<f64>,

    /// Preview video frame rate
    #[arg(long, allow_negative_numbers = true)]
    pub video_fps: Option<i64>,

    /// Skip the preview video
    #[arg(long)]
    pub no_video: bool,
}

impl SettingsArgs {
    /// Flags as a settings layer; unset flags leave lower layers alone.
    pub fn to_raw(&self) -> RawSettings {
        let enhance_contrast = match (self.contrast, self.no_contrast) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        RawSettings {
            grid_width: self.grid_width,
            grid_height: self.grid_height,
            enhance_contrast,
            sigmoid_k: self.sigmoid_k,
            sigmoid_center: self.sigmoid_center,
            filter_threshold: self.filter_threshold,
            dimming_threshold: self.dimming_threshold,
            cell_aspect_ratio: self.cell_aspect_ratio,
            sample_fps: self.fps,
            video_fps: self.video_fps,
            generate_video: if self.no_video { Some(false) } else { None },
        }
    }
}

/// Output location overrides.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct OutputArgs {
    /// Directory for generated `.c` tables
    #[arg(long)]
    pub table_dir: Option<PathBuf>,

    /// Declaration registry header
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Directory for preview images and videos
    #[arg(long)]
    pub preview_dir: Option<PathBuf>,

    /// Do not write preview images or video
    #[arg(long)]
    pub no_previews: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_defaults() {
        let args = Args::parse_from(["matrix-pixelator", "encode", "clip.mp4"]);
        assert!(args.config.is_none());
        match args.command {
            Command::Encode {
                input,
                name,
                settings_json,
                settings,
                output,
            } => {
                assert_eq!(input, PathBuf::from("clip.mp4"));
                assert!(name.is_none());
                assert!(settings_json.is_none());
                assert_eq!(settings.to_raw(), RawSettings::default());
                assert!(!output.no_previews);
            }
            _ => panic!("Expected Encode command"),
        }
    }

    #[test]
    fn test_encode_settings_flags() {
        let args = Args::parse_from([
            "matrix-pixelator",
            "encode",
            "frames/",
            "--name",
            "wave",
            "--grid-width",
            "16",
            "--no-contrast",
            "--filter-threshold",
            "8",
            "--fps",
            "12.5",
            "--no-video",
        ]);
        let Command::Encode { name, settings, .. } = args.command else {
            panic!("Expected Encode command");
        };
        assert_eq!(name.as_deref(), Some("wave"));
        let raw = settings.to_raw();
        assert_eq!(raw.grid_width, Some(16));
        assert_eq!(raw.enhance_contrast, Some(false));
        assert_eq!(raw.filter_threshold, Some(8));
        assert_eq!(raw.sample_fps, Some(12.5));
        assert_eq!(raw.generate_video, Some(false));
        assert_eq!(raw.dimming_threshold, None);
    }

    #[test]
    fn test_contrast_flags_conflict() {
        let result = Args::try_parse_from([
            "matrix-pixelator",
            "encode",
            "a.png",
            "--contrast",
            "--no-contrast",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_value_reaches_validation() {
        let args = Args::parse_from([
            "matrix-pixelator",
            "encode",
            "a.png",
            "--filter-threshold",
            "-1",
        ]);
        let Command::Encode { settings, .. } = args.command else {
            panic!("Expected Encode command");
        };
        assert_eq!(settings.to_raw().filter_threshold, Some(-1));
    }

    #[test]
    fn test_non_numeric_flag_is_rejected() {
        let result = Args::try_parse_from([
            "matrix-pixelator",
            "encode",
            "a.png",
            "--grid-width",
            "wide",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_preview_subcommand() {
        let args = Args::parse_from(["matrix-pixelator", "preview", "a.png", "-o", "out.png"]);
        match args.command {
            Command::Preview { input, output, .. } => {
                assert_eq!(input, PathBuf::from("a.png"));
                assert_eq!(output, PathBuf::from("out.png"));
            }
            _ => panic!("Expected Preview command"),
        }
    }

    #[test]
    fn test_config_option_is_global() {
        let args = Args::parse_from(["matrix-pixelator", "config", "show", "-c", "/tmp/c.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(
            args.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));
    }

    #[test]
    fn test_config_init_subcommand() {
        let args = Args::parse_from(["matrix-pixelator", "config", "init"]);
        assert!(matches!(
            args.command,
            Command::Config {
                action: ConfigAction::Init
            }
        ));
    }
}
