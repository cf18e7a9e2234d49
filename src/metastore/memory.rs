use super::{Function, Location, Mapping, MetaStore};
use anyhow::anyhow;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use ulid::Ulid;

#[derive(Serialize)]
struct MappingKey<'a> {
    size: u64,
    offset: u64,
    build_id_or_file: &'a str,
}

#[derive(Serialize)]
enum LocationKey<'a> {
    Address { mapping_id: Ulid, address: u64 },
    Content(&'a Location),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetaStoreStats {
    pub mappings: usize,
    pub functions: usize,
    pub locations: usize,
}

#[derive(Debug)]
struct Table<T> {
    name: &'static str,
    inner: RwLock<TableInner<T>>,
}

#[derive(Debug)]
struct TableInner<T> {
    ids: HashMap<Vec<u8>, Ulid>,
    values: HashMap<Ulid, T>,
}

impl<T: Clone> Table<T> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: RwLock::new(TableInner {
                ids: HashMap::new(),
                values: HashMap::new(),
            }),
        }
    }

    fn get_or_create(&self, key: Vec<u8>, value: &T) -> anyhow::Result<Ulid> {
        {
            let inner = self
                .inner
                .read()
                .map_err(|_| anyhow!("{} table lock poisoned", self.name))?;
            if let Some(id) = inner.ids.get(&key) {
                return Ok(*id);
            }
        }

        let mut inner = self
            .inner
            .write()
            .map_err(|_| anyhow!("{} table lock poisoned", self.name))?;

        // Another writer may have interned the same key between the two locks.
        if let Some(id) = inner.ids.get(&key) {
            return Ok(*id);
        }

        let id = Ulid::new();
        inner.ids.insert(key, id);
        inner.values.insert(id, value.clone());

        Ok(id)
    }

    #[cfg(test)]
    fn get_many(&self, ids: &[Ulid]) -> anyhow::Result<Vec<Option<T>>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| anyhow!("{} table lock poisoned", self.name))?;

        Ok(ids.iter().map(|id| inner.values.get(id).cloned()).collect())
    }

    fn len(&self) -> anyhow::Result<usize> {
        let inner = self
            .inner
            .read()
            .map_err(|_| anyhow!("{} table lock poisoned", self.name))?;
        Ok(inner.values.len())
    }
}

/// Content addressed, in-memory metadata store. Each table has its own lock
/// so interning functions doesn't contend with interning locations.
#[derive(Debug)]
pub struct InMemoryMetaStore {
    mappings: Table<Mapping>,
    functions: Table<Function>,
    locations: Table<Location>,
}

impl Default for InMemoryMetaStore {
    fn default() -> Self {
        Self {
            mappings: Table::new("mapping"),
            functions: Table::new("function"),
            locations: Table::new("location"),
        }
    }
}

impl InMemoryMetaStore {
    pub fn stats(&self) -> anyhow::Result<MetaStoreStats> {
        Ok(MetaStoreStats {
            mappings: self.mappings.len()?,
            functions: self.functions.len()?,
            locations: self.locations.len()?,
        })
    }

    #[cfg(test)]
    pub fn get_locations_by_ids(&self, ids: &[Ulid]) -> anyhow::Result<Vec<Option<Location>>> {
        self.locations.get_many(ids)
    }
}

impl MetaStore for InMemoryMetaStore {
    /// Mappings are keyed by size and offset rather than start address, so
    /// the same binary loaded at different addresses shares one id.
    fn get_or_create_mapping(&self, mapping: &Mapping) -> anyhow::Result<Ulid> {
        let build_id_or_file = if mapping.build_id.is_empty() {
            mapping.file.as_str()
        } else {
            mapping.build_id.as_str()
        };

        let key = bincode::serialize(&MappingKey {
            size: mapping.limit.saturating_sub(mapping.start),
            offset: mapping.offset,
            build_id_or_file,
        })?;

        self.mappings.get_or_create(key, mapping)
    }

    fn get_or_create_function(&self, function: &Function) -> anyhow::Result<Ulid> {
        let key = bincode::serialize(function)?;
        self.functions.get_or_create(key, function)
    }

    /// An address inside a known mapping identifies a location on its own;
    /// anything else is keyed by its full content.
    fn get_or_create_location(&self, location: &Location) -> anyhow::Result<Ulid> {
        let key = match location.mapping_id {
            Some(mapping_id) if location.address != 0 => LocationKey::Address {
                mapping_id,
                address: location.address,
            },
            _ => LocationKey::Content(location),
        };

        self.locations
            .get_or_create(bincode::serialize(&key)?, location)
    }
}
