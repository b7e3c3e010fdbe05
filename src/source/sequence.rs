//! Image-sequence directories and their ordering.
//!
//! Frames are ordered by the first run of ASCII digits in the file name,
//! read as an integer, so `frame_2.png` sorts before `frame_10.png`. Names
//! without any digit sort after every numbered name. Ties (equal numbers,
//! or two unnumbered names) fall back to the full file name.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use super::{IMAGE_EXTENSIONS, has_extension};
use crate::error::InputError;

/// Sort key for one file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceKey {
    /// First digit run, saturating at `u64::MAX`.
    pub number: Option<u64>,
    pub name: String,
}

impl Ord for SequenceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number, other.number) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for SequenceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compute the ordering key of a file name.
pub fn sequence_key(file_name: &str) -> SequenceKey {
    let number = file_name
        .find(|c: char| c.is_ascii_digit())
        .map(|start| {
            file_name[start..]
                .bytes()
                .take_while(u8::is_ascii_digit)
                .fold(0u64, |acc, d| {
                    acc.saturating_mul(10).saturating_add(u64::from(d - b'0'))
                })
        });
    SequenceKey {
        number,
        name: file_name.to_string(),
    }
}

/// Whether a path names a still image the sequence reader accepts.
pub fn is_supported_image(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

/// List the image files of a sequence directory in frame order.
///
/// Subdirectories and files with other extensions are ignored. An empty
/// result is an [`InputError::EmptySequence`].
pub fn list_sequence(dir: &Path) -> Result<Vec<PathBuf>, InputError> {
    let to_err = |source| InputError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries: Vec<(SequenceKey, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(to_err)? {
        let path = entry.map_err(to_err)?.path();
        if !path.is_file() || !is_supported_image(&path) {
            continue;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        entries.push((sequence_key(&name), path));
    }

    if entries.is_empty() {
        return Err(InputError::EmptySequence {
            path: dir.to_path_buf(),
        });
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    log::debug!("Found {} images in {}", entries.len(), dir.display());
    Ok(entries.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut keys: Vec<SequenceKey> = names.iter().map(|n| sequence_key(n)).collect();
        keys.sort();
        keys.into_iter().map(|k| k.name).collect()
    }

    #[test]
    fn test_key_uses_first_digit_run() {
        assert_eq!(sequence_key("frame_0042_v3.png").number, Some(42));
        assert_eq!(sequence_key("7.jpg").number, Some(7));
        assert_eq!(sequence_key("cover.png").number, None);
    }

    #[test]
    fn test_numeric_not_lexicographic_order() {
        assert_eq!(
            sorted(&["frame_10.png", "frame_2.png", "frame_1.png"]),
            vec!["frame_1.png", "frame_2.png", "frame_10.png"]
        );
    }

    #[test]
    fn test_unnumbered_names_sort_last() {
        assert_eq!(
            sorted(&["zeta.png", "b_3.png", "alpha.png", "a_1.png"]),
            vec!["a_1.png", "b_3.png", "alpha.png", "zeta.png"]
        );
    }

    #[test]
    fn test_equal_numbers_tie_break_on_name() {
        assert_eq!(
            sorted(&["b_01.png", "a_1.png"]),
            vec!["a_1.png", "b_01.png"]
        );
    }

    #[test]
    fn test_huge_digit_run_saturates() {
        let key = sequence_key("frame_99999999999999999999999.png");
        assert_eq!(key.number, Some(u64::MAX));
    }

    #[test]
    fn test_list_sequence_filters_and_orders() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["f10.png", "f2.JPG", "f1.jpeg", "notes.txt", "thumb.gif"] {
            std::fs::write(temp_dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(temp_dir.path().join("f0.png")).unwrap();

        let files = list_sequence(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["f1.jpeg", "f2.JPG", "f10.png"]);
    }

    #[test]
    fn test_empty_directory_is_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("readme.md"), b"").unwrap();
        assert!(matches!(
            list_sequence(temp_dir.path()),
            Err(InputError::EmptySequence { .. })
        ));
    }
}
