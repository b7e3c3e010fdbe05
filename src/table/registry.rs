//! Declaration registry: the shared header listing every emitted animation.
//!
//! The registry is append-only. Adding a declaration first checks whether
//! the exact declaration text is already somewhere in the file, so emitting
//! the same animation again is a no-op. The read-then-append sequence runs
//! under a process-wide lock so concurrent invocations in one process never
//! lose or duplicate lines.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::render::{PIXEL_INDEX_MACRO, STRUCT_TYPE};
use crate::error::SerializationError;

static REGISTRY_LOCK: Mutex<()> = Mutex::new(());

/// What [`DeclarationRegistry::ensure_declared`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryOutcome {
    Appended,
    AlreadyPresent,
}

/// The external-linkage line for one animation (without trailing newline).
pub fn declaration_line(name: &str, frame_count: usize) -> String {
    format!("extern const {} {}[{}];", STRUCT_TYPE, name, frame_count)
}

/// Matrix size from the `ANIMATION_MATRIX_WIDTH` and
/// `ANIMATION_MATRIX_HEIGHT` defines, when a registry carries both.
pub fn declared_matrix_size(content: &str) -> Option<(u32, u32)> {
    Some((
        define_value(content, "ANIMATION_MATRIX_WIDTH")?,
        define_value(content, "ANIMATION_MATRIX_HEIGHT")?,
    ))
}

fn define_value(content: &str, macro_name: &str) -> Option<u32> {
    content.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("#define")?;
        let value = rest.trim_start().strip_prefix(macro_name)?;
        // A longer macro sharing the prefix is not a match
        if !value.starts_with(char::is_whitespace) {
            return None;
        }
        value.trim().parse().ok()
    })
}

/// Handle on the registry header file.
#[derive(Debug, Clone)]
pub struct DeclarationRegistry {
    path: PathBuf,
}

impl DeclarationRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used in a table's `#include` line.
    pub fn include_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Append the declaration for `name` unless the identical line is
    /// already present.
    ///
    /// A missing registry is treated as empty and created, starting with the
    /// renderer preamble for a `grid_width x grid_height` matrix.
    pub fn ensure_declared(
        &self,
        name: &str,
        frame_count: usize,
        grid_width: u32,
        grid_height: u32,
    ) -> Result<RegistryOutcome, SerializationError> {
        let to_err = |source| SerializationError::Registry {
            path: self.path.clone(),
            source,
        };
        let declaration = declaration_line(name, frame_count);

        let _guard = REGISTRY_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let existing = self.read_existing()?;
        if let Some(content) = &existing {
            self.verify_matrix_size(content, grid_width, grid_height)?;
        }

        if let Some(content) = &existing
            && content.contains(&declaration)
        {
            log::info!(
                "Declaration for {} already in {}",
                name,
                self.path.display()
            );
            return Ok(RegistryOutcome::AlreadyPresent);
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(to_err)?;
        }

        let mut text = String::new();
        match &existing {
            None => text.push_str(&self.preamble(grid_width, grid_height)),
            Some(content) if !content.is_empty() && !content.ends_with('\n') => text.push('\n'),
            Some(_) => {}
        }
        text.push_str(&declaration);
        text.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(to_err)?;
        file.write_all(text.as_bytes()).map_err(to_err)?;
        file.flush().map_err(to_err)?;

        log::info!(
            "Appended extern declaration for {} to {}",
            name,
            self.path.display()
        );
        Ok(RegistryOutcome::Appended)
    }

    /// Fail if the registry already exists and was generated for a matrix
    /// of a different size.
    ///
    /// Tables index cells through the registry's `ANIMATION_MATRIX_WIDTH`,
    /// so an animation can only share a registry with others of its size.
    pub fn check_matrix_size(
        &self,
        grid_width: u32,
        grid_height: u32,
    ) -> Result<(), SerializationError> {
        let _guard = REGISTRY_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        match self.read_existing()? {
            Some(content) => self.verify_matrix_size(&content, grid_width, grid_height),
            None => Ok(()),
        }
    }

    fn read_existing(&self) -> Result<Option<String>, SerializationError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SerializationError::Registry {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn verify_matrix_size(
        &self,
        content: &str,
        grid_width: u32,
        grid_height: u32,
    ) -> Result<(), SerializationError> {
        match declared_matrix_size(content) {
            Some((width, height)) if (width, height) != (grid_width, grid_height) => {
                Err(SerializationError::MatrixMismatch {
                    path: self.path.clone(),
                    registry: (width, height),
                    animation: (grid_width, grid_height),
                })
            }
            _ => Ok(()),
        }
    }

    /// Header text written when the registry is first created.
    ///
    /// The include guard closes before the declaration section so that
    /// later appends land after `#endif`.
    pub fn preamble(&self, grid_width: u32, grid_height: u32) -> String {
        let guard = self.guard_name();
        format!(
            "#ifndef {guard}
#define {guard}

#include <stdint.h>

#define ANIMATION_MATRIX_WIDTH {grid_width}
#define ANIMATION_MATRIX_HEIGHT {grid_height}
#define ANIMATION_MAX_ACTIVE_PIXELS (ANIMATION_MATRIX_WIDTH * ANIMATION_MATRIX_HEIGHT)

// Row-major flattening of (y, x) into brightness_levels.
#define {PIXEL_INDEX_MACRO}(y, x) ((y) * ANIMATION_MATRIX_WIDTH + (x))

typedef struct {{
    uint8_t brightness_levels[ANIMATION_MAX_ACTIVE_PIXELS];
    uint32_t frame_number;
    uint32_t num_pixels;
}} {STRUCT_TYPE};

#endif // {guard}

// Animation declarations
"
        )
    }

    fn guard_name(&self) -> String {
        self.include_name()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry_in(dir: &TempDir) -> DeclarationRegistry {
        DeclarationRegistry::new(dir.path().join("frames_as_c_code.h"))
    }

    #[test]
    fn test_declaration_line() {
        assert_eq!(
            declaration_line("wave", 12),
            "extern const animation_frame wave[12];"
        );
    }

    #[test]
    fn test_missing_registry_is_created_with_preamble() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry_in(&temp_dir);
        let outcome = registry.ensure_declared("wave", 12, 18, 11).unwrap();
        assert_eq!(outcome, RegistryOutcome::Appended);

        let content = std::fs::read_to_string(registry.path()).unwrap();
        assert!(content.starts_with("#ifndef FRAMES_AS_C_CODE_H\n"));
        assert!(content.contains("#define ANIMATION_MATRIX_WIDTH 18\n"));
        assert!(content.contains("#define ANIMATION_MATRIX_HEIGHT 11\n"));
        assert!(content.ends_with("extern const animation_frame wave[12];\n"));
        let endif = content.find("#endif").unwrap();
        let decl = content.find("extern const").unwrap();
        assert!(endif < decl);
    }

    #[test]
    fn test_preamble_fields_hold_large_counts() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry_in(&temp_dir);
        let preamble = registry.preamble(256, 256);
        assert!(preamble.contains("    uint32_t frame_number;\n"));
        assert!(preamble.contains("    uint32_t num_pixels;\n"));
    }

    #[test]
    fn test_declared_matrix_size() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry_in(&temp_dir);
        assert_eq!(declared_matrix_size(&registry.preamble(32, 8)), Some((32, 8)));
        assert_eq!(declared_matrix_size("extern const animation_frame a[1];\n"), None);
        let lookalike = "#define ANIMATION_MATRIX_WIDTH_MM 4\n#define ANIMATION_MATRIX_HEIGHT 2\n";
        assert_eq!(declared_matrix_size(lookalike), None);
    }

    #[test]
    fn test_other_matrix_size_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry_in(&temp_dir);
        registry.ensure_declared("small", 1, 18, 11).unwrap();
        let before = std::fs::read_to_string(registry.path()).unwrap();

        assert!(registry.check_matrix_size(18, 11).is_ok());
        let result = registry.check_matrix_size(32, 11);
        assert!(matches!(
            result,
            Err(SerializationError::MatrixMismatch {
                registry: (18, 11),
                animation: (32, 11),
                ..
            })
        ));
        let result = registry.ensure_declared("wide", 1, 32, 11);
        assert!(matches!(result, Err(SerializationError::MatrixMismatch { .. })));
        assert_eq!(std::fs::read_to_string(registry.path()).unwrap(), before);
    }

    #[test]
    fn test_missing_registry_accepts_any_size() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry_in(&temp_dir);
        assert!(registry.check_matrix_size(64, 3).is_ok());
        assert!(!registry.path().exists());
    }

    #[test]
    fn test_repeated_declaration_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry_in(&temp_dir);
        registry.ensure_declared("wave", 12, 18, 11).unwrap();
        let outcome = registry.ensure_declared("wave", 12, 18, 11).unwrap();
        assert_eq!(outcome, RegistryOutcome::AlreadyPresent);

        let content = std::fs::read_to_string(registry.path()).unwrap();
        assert_eq!(content.matches("wave[12]").count(), 1);
    }

    #[test]
    fn test_different_names_each_get_a_line() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry_in(&temp_dir);
        registry.ensure_declared("wave", 12, 18, 11).unwrap();
        registry.ensure_declared("blink", 2, 18, 11).unwrap();
        let content = std::fs::read_to_string(registry.path()).unwrap();
        assert!(content.contains("extern const animation_frame wave[12];\n"));
        assert!(content.contains("extern const animation_frame blink[2];\n"));
        assert_eq!(content.matches("#ifndef").count(), 1);
    }

    #[test]
    fn test_existing_registry_without_trailing_newline() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry_in(&temp_dir);
        std::fs::write(registry.path(), "#endif // FRAMES_AS_C_CODE_H").unwrap();
        registry.ensure_declared("wave", 3, 18, 11).unwrap();
        let content = std::fs::read_to_string(registry.path()).unwrap();
        assert_eq!(
            content,
            "#endif // FRAMES_AS_C_CODE_H\nextern const animation_frame wave[3];\n"
        );
    }

    #[test]
    fn test_existing_hand_written_declaration_is_respected() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry_in(&temp_dir);
        std::fs::write(
            registry.path(),
            "// custom header\nextern const animation_frame wave[3];\n",
        )
        .unwrap();
        let outcome = registry.ensure_declared("wave", 3, 18, 11).unwrap();
        assert_eq!(outcome, RegistryOutcome::AlreadyPresent);
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("frames_as_c_code.h");
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let registry = DeclarationRegistry::new(path);
                    registry
                        .ensure_declared(&format!("anim_{}", i), 1, 18, 11)
                        .unwrap();
                    registry.ensure_declared("shared", 1, 18, 11).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        for i in 0..8 {
            assert_eq!(content.matches(&format!("anim_{}[1];", i)).count(), 1);
        }
        assert_eq!(content.matches("shared[1];").count(), 1);
        assert_eq!(content.matches("#ifndef").count(), 1);
    }

    #[test]
    fn test_unwritable_registry_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let registry = DeclarationRegistry::new(blocker.join("frames_as_c_code.h"));
        let result = registry.ensure_declared("wave", 1, 18, 11);
        assert!(matches!(result, Err(SerializationError::Registry { .. })));
    }
}
