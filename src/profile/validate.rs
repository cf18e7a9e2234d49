use crate::pprofpb::Profile;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("first string table element is expected to be empty")]
    StringTableHead,

    #[error("profile has samples but no sample types")]
    MissingSampleType,

    #[error("{field} string index {index} out of bounds, string table has {len} entries")]
    StringIndex {
        field: &'static str,
        index: i64,
        len: usize,
    },

    #[error("{kind} has id 0, it must be non zero")]
    ZeroId { kind: &'static str },

    #[error("{kind} id {id} is not unique")]
    DuplicateId { kind: &'static str, id: u64 },

    #[error("sample {sample} has {got} values, expected {want}")]
    ValueCount {
        sample: usize,
        got: usize,
        want: usize,
    },

    #[error("sample {sample} references unknown location {id}")]
    UnknownLocation { sample: usize, id: u64 },

    #[error("location {location} references unknown mapping {id}")]
    UnknownMapping { location: u64, id: u64 },

    #[error("location {location} has a line with unknown function {id}")]
    UnknownFunction { location: u64, id: u64 },

    #[error("sample {sample} has label key 0 at index {index}, it must be non zero")]
    ZeroLabelKey { sample: usize, index: usize },
}

/// Checks the structural invariants of a decoded pprof profile: every string
/// index is in bounds, table ids are unique and non zero, and every
/// sample -> location -> mapping/function reference resolves.
pub(crate) fn validate_pprof_profile(profile: &Profile) -> Result<(), ValidationError> {
    if let Some(elem) = profile.string_table.first() {
        if !elem.is_empty() {
            return Err(ValidationError::StringTableHead);
        }
    }

    if profile.sample_type.is_empty() && !profile.sample.is_empty() {
        return Err(ValidationError::MissingSampleType);
    }

    let string_table_len = profile.string_table.len();
    let check = |field: &'static str, index: i64| string_index(field, index, string_table_len);

    for sample_type in profile.sample_type.iter() {
        check("sample_type.type", sample_type.r#type)?;
        check("sample_type.unit", sample_type.unit)?;
    }

    if let Some(period_type) = &profile.period_type {
        check("period_type.type", period_type.r#type)?;
        check("period_type.unit", period_type.unit)?;
    }

    check("drop_frames", profile.drop_frames)?;
    check("keep_frames", profile.keep_frames)?;
    check("default_sample_type", profile.default_sample_type)?;
    for comment in profile.comment.iter() {
        check("comment", *comment)?;
    }

    let mapping_ids = unique_ids("mapping", profile.mapping.iter().map(|m| m.id))?;
    for mapping in profile.mapping.iter() {
        check("mapping.filename", mapping.filename)?;
        check("mapping.build_id", mapping.build_id)?;
    }

    let function_ids = unique_ids("function", profile.function.iter().map(|f| f.id))?;
    for function in profile.function.iter() {
        check("function.name", function.name)?;
        check("function.system_name", function.system_name)?;
        check("function.filename", function.filename)?;
    }

    let location_ids = unique_ids("location", profile.location.iter().map(|l| l.id))?;
    for location in profile.location.iter() {
        if location.mapping_id != 0 && !mapping_ids.contains(&location.mapping_id) {
            return Err(ValidationError::UnknownMapping {
                location: location.id,
                id: location.mapping_id,
            });
        }

        // Function id 0 marks a line without function information.
        for line in location.line.iter() {
            if line.function_id != 0 && !function_ids.contains(&line.function_id) {
                return Err(ValidationError::UnknownFunction {
                    location: location.id,
                    id: line.function_id,
                });
            }
        }
    }

    let values_per_sample = profile.sample_type.len();
    for (i, sample) in profile.sample.iter().enumerate() {
        if sample.value.len() != values_per_sample {
            return Err(ValidationError::ValueCount {
                sample: i,
                got: sample.value.len(),
                want: values_per_sample,
            });
        }

        for id in sample.location_id.iter() {
            if !location_ids.contains(id) {
                return Err(ValidationError::UnknownLocation { sample: i, id: *id });
            }
        }

        for (j, label) in sample.label.iter().enumerate() {
            if label.key == 0 {
                return Err(ValidationError::ZeroLabelKey {
                    sample: i,
                    index: j,
                });
            }

            check("label.key", label.key)?;
            check("label.str", label.str)?;
            check("label.num_unit", label.num_unit)?;
        }
    }

    Ok(())
}

fn string_index(field: &'static str, index: i64, len: usize) -> Result<(), ValidationError> {
    // Index 0 is always the empty string, even for an empty table.
    if index == 0 || (index > 0 && (index as u64) < len as u64) {
        return Ok(());
    }

    Err(ValidationError::StringIndex { field, index, len })
}

fn unique_ids(
    kind: &'static str,
    ids: impl Iterator<Item = u64>,
) -> Result<HashSet<u64>, ValidationError> {
    let mut seen = HashSet::new();

    for id in ids {
        if id == 0 {
            return Err(ValidationError::ZeroId { kind });
        }
        if !seen.insert(id) {
            return Err(ValidationError::DuplicateId { kind, id });
        }
    }

    Ok(seen)
}
