mod memory;

pub use memory::InMemoryMetaStore;

use serde::Serialize;
use ulid::Ulid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Mapping {
    pub start: u64,
    pub limit: u64,
    pub offset: u64,
    pub file: String,
    pub build_id: String,
    pub has_functions: bool,
    pub has_filenames: bool,
    pub has_line_numbers: bool,
    pub has_inline_frames: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Function {
    pub name: String,
    pub system_name: String,
    pub filename: String,
    pub start_line: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    /// `None` for a line without function information.
    pub function_id: Option<Ulid>,
    pub line: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub mapping_id: Option<Ulid>,
    pub address: u64,
    pub is_folded: bool,
    pub lines: Vec<Line>,
}

/// Deduplicates the symbol data referenced by stack frames across
/// submissions. Interning is additive: an id, once handed out, always refers
/// to the same content. Implementations must be safe to call from many
/// concurrent writers.
pub trait MetaStore: Send + Sync {
    fn get_or_create_mapping(&self, mapping: &Mapping) -> anyhow::Result<Ulid>;

    fn get_or_create_function(&self, function: &Function) -> anyhow::Result<Ulid>;

    /// `location` must only reference mapping and function ids previously
    /// returned by this store.
    fn get_or_create_location(&self, location: &Location) -> anyhow::Result<Ulid>;
}
