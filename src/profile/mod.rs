mod decode;
mod validate;

#[cfg(test)]
pub(crate) mod testdata;

pub use decode::{DecodeError, ProfileDecoder, DEFAULT_MAX_PROFILE_SIZE};

use std::collections::HashMap;
use ulid::Ulid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueType {
    pub type_: String,
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub period_type: ValueType,
    pub sample_type: ValueType,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    pub duration: i64,
    pub period: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSample {
    /// Interned location ids, leaf first.
    pub location_ids: Vec<Ulid>,
    pub value: i64,
    pub label: HashMap<String, String>,
    pub num_label: HashMap<String, i64>,
}

/// A pprof profile restricted to a single sample type.
///
/// Every sample of the source profile is present, carrying only the value
/// of this profile's sample type. Stack frames reference the metadata
/// store's interned locations instead of the profile's own tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedProfile {
    pub samples: Vec<NormalizedSample>,
    pub meta: Meta,
}
