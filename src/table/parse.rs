//! Reading a rendered table back into sparse frames.

use super::render::{PIXEL_INDEX_MACRO, STRUCT_TYPE};
use crate::sparse::{SparseCell, SparseFrame};

/// Contents of a parsed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable {
    pub name: String,
    pub frames: Vec<SparseFrame>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TableParseError {
    #[error("No `animation_frame` array declaration found")]
    MissingDeclaration,

    #[error("Line {line_no}: cannot parse `{line}`")]
    Malformed { line_no: usize, line: String },

    #[error("Line {line_no}: pixel entry outside of a frame block")]
    CellOutsideFrame { line_no: usize },

    #[error("Frame {frame_number}: num_pixels is {declared} but {found} entries are listed")]
    PixelCountMismatch {
        frame_number: u32,
        declared: usize,
        found: usize,
    },

    #[error("Array declares {declared} frames but {found} are defined")]
    FrameCountMismatch { declared: usize, found: usize },
}

struct PendingFrame {
    frame: SparseFrame,
    num_pixels: Option<usize>,
}

/// Parse a table produced by [`render_table`](super::render_table).
pub fn parse_table(text: &str) -> Result<ParsedTable, TableParseError> {
    let mut declaration: Option<(String, usize)> = None;
    let mut frames: Vec<PendingFrame> = Vec::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        let malformed = || TableParseError::Malformed {
            line_no,
            line: line.to_string(),
        };

        if let Some(rest) = line
            .strip_prefix("const ")
            .and_then(|r| r.strip_prefix(STRUCT_TYPE))
        {
            declaration = Some(parse_declaration(rest.trim()).ok_or_else(malformed)?);
        } else if let Some(rest) = line.strip_prefix(".frame_number = ") {
            let frame_number = parse_value(rest).ok_or_else(malformed)?;
            frames.push(PendingFrame {
                frame: SparseFrame {
                    frame_number,
                    cells: Vec::new(),
                },
                num_pixels: None,
            });
        } else if let Some(rest) = line.strip_prefix(".num_pixels = ") {
            let num_pixels = parse_value(rest).ok_or_else(malformed)?;
            let pending = frames
                .last_mut()
                .ok_or(TableParseError::CellOutsideFrame { line_no })?;
            pending.num_pixels = Some(num_pixels as usize);
        } else if let Some(rest) = line
            .strip_prefix('[')
            .and_then(|r| r.strip_prefix(PIXEL_INDEX_MACRO))
        {
            let cell = parse_cell(rest).ok_or_else(malformed)?;
            let pending = frames
                .last_mut()
                .ok_or(TableParseError::CellOutsideFrame { line_no })?;
            pending.frame.cells.push(cell);
        }
    }

    let (name, declared) = declaration.ok_or(TableParseError::MissingDeclaration)?;
    if declared != frames.len() {
        return Err(TableParseError::FrameCountMismatch {
            declared,
            found: frames.len(),
        });
    }

    let mut out = Vec::with_capacity(frames.len());
    for pending in frames {
        let found = pending.frame.cells.len();
        let declared = pending.num_pixels.unwrap_or(found);
        if declared != found {
            return Err(TableParseError::PixelCountMismatch {
                frame_number: pending.frame.frame_number,
                declared,
                found,
            });
        }
        out.push(pending.frame);
    }

    Ok(ParsedTable { name, frames: out })
}

/// `name[count] = {`
fn parse_declaration(rest: &str) -> Option<(String, usize)> {
    let (name, tail) = rest.split_once('[')?;
    let (count, _) = tail.split_once(']')?;
    Some((name.trim().to_string(), count.trim().parse().ok()?))
}

/// `123,`
fn parse_value(rest: &str) -> Option<u32> {
    rest.trim_end_matches(',').trim().parse().ok()
}

/// `(y, x)] = b,`
fn parse_cell(rest: &str) -> Option<SparseCell> {
    let rest = rest.strip_prefix('(')?;
    let (coords, tail) = rest.split_once(")]")?;
    let (y, x) = coords.split_once(',')?;
    let value = tail.trim().strip_prefix('=')?;
    Some(SparseCell {
        x: x.trim().parse().ok()?,
        y: y.trim().parse().ok()?,
        brightness: value.trim_end_matches(',').trim().parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::render_table;

    #[test]
    fn test_parse_rendered_table() {
        let frames = vec![
            SparseFrame {
                frame_number: 0,
                cells: vec![
                    SparseCell {
                        x: 3,
                        y: 0,
                        brightness: 12,
                    },
                    SparseCell {
                        x: 17,
                        y: 10,
                        brightness: 255,
                    },
                ],
            },
            SparseFrame {
                frame_number: 1,
                cells: vec![],
            },
        ];
        let text = render_table("pulse", &frames, "frames_as_c_code.h");
        let parsed = parse_table(&text).unwrap();
        assert_eq!(parsed.name, "pulse");
        assert_eq!(parsed.frames, frames);
    }

    #[test]
    fn test_missing_declaration() {
        assert_eq!(
            parse_table("// nothing here\n"),
            Err(TableParseError::MissingDeclaration)
        );
    }

    #[test]
    fn test_pixel_count_mismatch() {
        let text = "\
const animation_frame a[1] = {
    {
        .frame_number = 0,
        .num_pixels = 2,
        .brightness_levels = {
            [ANIMATION_PIXEL_INDEX(0, 0)] = 5,
        },
    },
};
";
        assert_eq!(
            parse_table(text),
            Err(TableParseError::PixelCountMismatch {
                frame_number: 0,
                declared: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_frame_count_mismatch() {
        let text = "const animation_frame a[3] = {\n};\n";
        assert_eq!(
            parse_table(text),
            Err(TableParseError::FrameCountMismatch {
                declared: 3,
                found: 0
            })
        );
    }

    #[test]
    fn test_malformed_cell() {
        let text = "\
const animation_frame a[1] = {
    {
        .frame_number = 0,
            [ANIMATION_PIXEL_INDEX(0 0)] = 5,
";
        assert!(matches!(
            parse_table(text),
            Err(TableParseError::Malformed { line_no: 4, .. })
        ));
    }

    #[test]
    fn test_cell_before_any_frame() {
        let text = "[ANIMATION_PIXEL_INDEX(0, 0)] = 5,\n";
        assert_eq!(
            parse_table(text),
            Err(TableParseError::CellOutsideFrame { line_no: 1 })
        );
    }
}
