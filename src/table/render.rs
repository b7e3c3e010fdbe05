//! Table rendering and writing.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::SerializationError;
use crate::sparse::SparseFrame;

/// Struct type every table entry is declared as.
pub const STRUCT_TYPE: &str = "animation_frame";
/// Macro flattening `(y, x)` to `y * W + x` in the renderer.
pub const PIXEL_INDEX_MACRO: &str = "ANIMATION_PIXEL_INDEX";

/// Render the table for one animation.
///
/// `include` is the header file name placed in the `#include` line, i.e.
/// the declaration registry the renderer compiles against.
pub fn render_table(name: &str, frames: &[SparseFrame], include: &str) -> String {
    let mut out = String::new();
    out.push_str("// Generated by matrix-pixelator.\n");
    let _ = writeln!(out, "// Sparse brightness frames for animation `{}`.", name);
    let _ = writeln!(out, "#include \"{}\"", include);
    out.push('\n');
    let _ = writeln!(
        out,
        "const {} {}[{}] = {{",
        STRUCT_TYPE,
        name,
        frames.len()
    );

    for frame in frames {
        out.push_str("    {\n");
        let _ = writeln!(out, "        .frame_number = {},", frame.frame_number);
        let _ = writeln!(out, "        .num_pixels = {},", frame.num_pixels());
        out.push_str("        .brightness_levels = {\n");
        for cell in &frame.cells {
            let _ = writeln!(
                out,
                "            [{}({}, {})] = {},",
                PIXEL_INDEX_MACRO, cell.y, cell.x, cell.brightness
            );
        }
        out.push_str("        },\n");
        out.push_str("    },\n");
    }
    out.push_str("};\n");
    out
}

/// Location of the table for `name` inside `table_dir`.
pub fn table_path(table_dir: &Path, name: &str) -> PathBuf {
    table_dir.join(format!("{}.c", name))
}

/// Write a rendered table, replacing any previous version.
///
/// The contents go to a temporary sibling first and are then renamed into
/// place, so a failed write never leaves a truncated table behind.
pub fn write_table(path: &Path, contents: &str) -> Result<(), SerializationError> {
    let to_err = |source| SerializationError::Table {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(to_err)?;
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    std::fs::write(&tmp_path, contents).map_err(to_err)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(to_err(e));
    }
    log::info!("Table saved to '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::SparseCell;
    use tempfile::TempDir;

    fn frame(frame_number: u32, cells: &[(u32, u32, u8)]) -> SparseFrame {
        SparseFrame {
            frame_number,
            cells: cells
                .iter()
                .map(|&(x, y, brightness)| SparseCell { x, y, brightness })
                .collect(),
        }
    }

    #[test]
    fn test_render_exact_layout() {
        let frames = vec![frame(0, &[(1, 0, 7), (0, 2, 255)]), frame(1, &[])];
        let text = render_table("blink", &frames, "frames_as_c_code.h");
        let expected = "\
// Generated by matrix-pixelator.
// Sparse brightness frames for animation `blink`.
#include \"frames_as_c_code.h\"

const animation_frame blink[2] = {
    {
        .frame_number = 0,
        .num_pixels = 2,
        .brightness_levels = {
            [ANIMATION_PIXEL_INDEX(0, 1)] = 7,
            [ANIMATION_PIXEL_INDEX(2, 0)] = 255,
        },
    },
    {
        .frame_number = 1,
        .num_pixels = 0,
        .brightness_levels = {
        },
    },
};
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_table_path() {
        assert_eq!(
            table_path(Path::new("frames_as_c_code"), "wave"),
            PathBuf::from("frames_as_c_code/wave.c")
        );
    }

    #[test]
    fn test_write_creates_parent_and_leaves_no_tmp() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("wave.c");
        write_table(&path, "content\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content\n");
        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_replaces_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("wave.c");
        write_table(&path, "old\n").unwrap();
        write_table(&path, "new\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn test_write_to_unwritable_location_is_error() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where a directory is expected
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let result = write_table(&blocker.join("wave.c"), "x");
        assert!(matches!(result, Err(SerializationError::Table { .. })));
    }
}
