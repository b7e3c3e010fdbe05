//! Nearest-timestamp resampling of a video to a target frame rate.
//!
//! Output frame `i` sits at time `i / F` and takes the source frame nearest
//! to it, index `round(i * R / F)`. Frames are duplicated when `F > R` and
//! skipped when `F < R`. The output count is `floor(N / R * F)` and the loop
//! stops early, without clamping, once a source index reaches `N`.

use std::fmt;

use image::GrayImage;

use super::{VideoDecoder, VideoError, VideoInfo};

/// Slack added before flooring the output count so that `N * F / R` landing
/// a hair under an integer (e.g. 29.97 fps in and out) is not cut short.
const COUNT_EPSILON: f64 = 1e-9;

/// Source indices for a video of `frame_count` frames at `native_fps`,
/// resampled to `target_fps`.
///
/// Ties round to even, so `x.5` goes to the nearest even index.
pub fn sample_indices(native_fps: f64, frame_count: u64, target_fps: f64) -> Vec<u64> {
    if !(native_fps > 0.0) || frame_count == 0 || !(target_fps > 0.0) {
        return Vec::new();
    }
    let count = (frame_count as f64 * target_fps / native_fps + COUNT_EPSILON).floor();
    if !count.is_finite() || count < 1.0 {
        return Vec::new();
    }

    let mut indices = Vec::with_capacity(count as usize);
    for i in 0..count as u64 {
        let source = (i as f64 * native_fps / target_fps).round_ties_even();
        if source >= frame_count as f64 {
            break;
        }
        indices.push(source as u64);
    }
    indices
}

/// Shortfall when a decode fails partway through a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialExtraction {
    pub expected: usize,
    pub extracted: usize,
    pub failed_index: u64,
    pub reason: String,
}

impl fmt::Display for PartialExtraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Extracted {} of {} frames; stopped at source frame {}: {}",
            self.extracted, self.expected, self.failed_index, self.reason
        )
    }
}

/// What a sampling pass delivered.
#[derive(Debug)]
pub struct SampleSummary {
    pub info: VideoInfo,
    /// Source index of every frame handed out, in output order.
    pub source_indices: Vec<u64>,
    pub expected: usize,
    pub partial: Option<PartialExtraction>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SampleError {
    #[error("Video reports {frame_count} frames at {native_fps} fps; no frames can be extracted")]
    NoFrames { native_fps: f64, frame_count: u64 },
}

/// Stream the frames selected by [`sample_indices`] to `on_frame`, in
/// output order.
///
/// The decoder is read once from the start. Only the most recent source
/// frame is kept, so a duplicated index is handed out again without
/// decoding twice. A decode failure or an early end of stream stops the
/// pass; the shortfall is recorded in [`SampleSummary::partial`].
pub fn sample_frames<D, F>(
    decoder: &mut D,
    target_fps: f64,
    mut on_frame: F,
) -> Result<SampleSummary, SampleError>
where
    D: VideoDecoder + ?Sized,
    F: FnMut(&GrayImage),
{
    let info = decoder.info();
    log::info!(
        "Video info: {:.2} fps, {} frames, {:.2}s, {}x{}",
        info.native_fps,
        info.frame_count,
        info.duration_secs(),
        info.width,
        info.height
    );

    let indices = sample_indices(info.native_fps, info.frame_count, target_fps);
    if indices.is_empty() {
        return Err(SampleError::NoFrames {
            native_fps: info.native_fps,
            frame_count: info.frame_count,
        });
    }
    let expected = indices.len();
    log::info!("Sampling {} frames at {} fps", expected, target_fps);

    let mut source_indices = Vec::with_capacity(expected);
    let mut partial = None;
    // Number of source frames read so far; `current` is frame `position - 1`.
    let mut position: u64 = 0;
    let mut current: Option<GrayImage> = None;

    for &index in &indices {
        if let Err(e) = advance_to(decoder, index, &mut position, &mut current) {
            let shortfall = PartialExtraction {
                expected,
                extracted: source_indices.len(),
                failed_index: index,
                reason: e.to_string(),
            };
            log::warn!("{}", shortfall);
            partial = Some(shortfall);
            break;
        }
        if let Some(frame) = &current {
            on_frame(frame);
            source_indices.push(index);
        }
    }

    Ok(SampleSummary {
        info,
        source_indices,
        expected,
        partial,
    })
}

/// Read forward until `current` holds source frame `index`.
fn advance_to<D>(
    decoder: &mut D,
    index: u64,
    position: &mut u64,
    current: &mut Option<GrayImage>,
) -> Result<(), VideoError>
where
    D: VideoDecoder + ?Sized,
{
    while *position <= index {
        match decoder.next_frame()? {
            Some(frame) => {
                *current = Some(frame);
                *position += 1;
            }
            None => return Err(VideoError::EndOfStream { index }),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decoder whose frame `i` is filled with the low byte of `i`.
    struct ScriptedVideo {
        info: VideoInfo,
        fail_at: Option<u64>,
        /// Frames actually available, when fewer than the reported count.
        available: Option<u64>,
        next: u64,
    }

    impl ScriptedVideo {
        fn new(native_fps: f64, frame_count: u64) -> Self {
            Self {
                info: VideoInfo {
                    native_fps,
                    frame_count,
                    width: 2,
                    height: 2,
                },
                fail_at: None,
                available: None,
                next: 0,
            }
        }
    }

    impl VideoDecoder for ScriptedVideo {
        fn info(&self) -> VideoInfo {
            self.info
        }

        fn next_frame(&mut self) -> Result<Option<GrayImage>, VideoError> {
            let index = self.next;
            if index >= self.available.unwrap_or(self.info.frame_count) {
                return Ok(None);
            }
            if self.fail_at == Some(index) {
                return Err(VideoError::DecodeFailed {
                    index,
                    message: "corrupt packet".to_string(),
                });
            }
            self.next += 1;
            Ok(Some(GrayImage::from_pixel(2, 2, image::Luma([index as u8]))))
        }
    }

    #[test]
    fn test_downsample_skips_frames() {
        let indices = sample_indices(30.0, 90, 10.0);
        assert_eq!(indices.len(), 30);
        assert_eq!(indices, (0..30).map(|i| i * 3).collect::<Vec<u64>>());
    }

    #[test]
    fn test_same_rate_is_identity() {
        assert_eq!(sample_indices(25.0, 50, 25.0), (0..50).collect::<Vec<u64>>());
        assert_eq!(
            sample_indices(29.97, 120, 29.97),
            (0..120).collect::<Vec<u64>>()
        );
    }

    #[test]
    fn test_upsample_duplicates_frames() {
        assert_eq!(sample_indices(10.0, 3, 20.0), vec![0, 0, 1, 2, 2, 2]);
    }

    #[test]
    fn test_ties_round_to_even() {
        // 15 -> 10 fps: 0, 1.5, 3, 4.5
        assert_eq!(sample_indices(15.0, 6, 10.0), vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_stops_once_index_reaches_frame_count() {
        // 12 outputs planned; output 11 maps to 2.75 -> 3, past the last frame
        let indices = sample_indices(10.0, 3, 40.0);
        assert_eq!(indices, vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn test_degenerate_inputs_yield_nothing() {
        assert!(sample_indices(0.0, 90, 10.0).is_empty());
        assert!(sample_indices(-30.0, 90, 10.0).is_empty());
        assert!(sample_indices(30.0, 0, 10.0).is_empty());
        assert!(sample_indices(f64::NAN, 90, 10.0).is_empty());
        assert!(sample_indices(30.0, 1, 10.0).is_empty());
    }

    #[test]
    fn test_sample_frames_streams_selected_indices() {
        let mut video = ScriptedVideo::new(30.0, 90);
        let mut values = Vec::new();
        let summary =
            sample_frames(&mut video, 10.0, |f| values.push(f.get_pixel(0, 0).0[0])).unwrap();
        assert_eq!(summary.expected, 30);
        assert!(summary.partial.is_none());
        let expected: Vec<u64> = (0..30).map(|i| i * 3).collect();
        assert_eq!(summary.source_indices, expected);
        assert_eq!(values[2], 6);
        // Frames after the last selected index are never read
        assert_eq!(video.next, 88);
    }

    #[test]
    fn test_duplicated_index_is_decoded_once() {
        let mut video = ScriptedVideo::new(10.0, 3);
        let mut values = Vec::new();
        let summary =
            sample_frames(&mut video, 20.0, |f| values.push(f.get_pixel(0, 0).0[0])).unwrap();
        assert_eq!(values, vec![0, 0, 1, 2, 2, 2]);
        assert_eq!(summary.source_indices, vec![0, 0, 1, 2, 2, 2]);
        assert_eq!(video.next, 3);
    }

    #[test]
    fn test_decode_failure_returns_partial() {
        let mut video = ScriptedVideo::new(30.0, 90);
        video.fail_at = Some(30);
        let mut count = 0;
        let summary = sample_frames(&mut video, 10.0, |_| count += 1).unwrap();
        assert_eq!(count, 10);
        let partial = summary.partial.unwrap();
        assert_eq!(partial.expected, 30);
        assert_eq!(partial.extracted, 10);
        assert_eq!(partial.failed_index, 30);
        assert!(partial.to_string().contains("corrupt packet"));
    }

    #[test]
    fn test_short_stream_returns_partial() {
        // Frame count estimated from the duration overshoots the real stream
        let mut video = ScriptedVideo::new(30.0, 90);
        video.available = Some(40);
        let summary = sample_frames(&mut video, 10.0, |_| {}).unwrap();
        assert_eq!(summary.source_indices.len(), 14);
        let partial = summary.partial.unwrap();
        assert_eq!(partial.failed_index, 42);
        assert!(partial.reason.contains("ended"));
    }

    #[test]
    fn test_no_frames_is_distinct_error() {
        let mut video = ScriptedVideo::new(0.0, 90);
        assert_eq!(
            sample_frames(&mut video, 10.0, |_| {}).unwrap_err(),
            SampleError::NoFrames {
                native_fps: 0.0,
                frame_count: 90
            }
        );
        assert_eq!(video.next, 0);
    }
}
