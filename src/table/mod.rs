//! Serialized animation tables and the shared declaration registry.
//!
//! A table is a C source file holding one `animation_frame` array per
//! animation. The registry is a header that collects one `extern`
//! declaration per emitted animation; it is only ever appended to.

mod parse;
pub mod registry;
mod render;

pub use parse::{ParsedTable, TableParseError, parse_table};
pub use registry::{DeclarationRegistry, RegistryOutcome, declaration_line, declared_matrix_size};
pub use render::{PIXEL_INDEX_MACRO, STRUCT_TYPE, render_table, table_path, write_table};
