use crate::metastore::{self, MetaStore};
use crate::pprofpb::{self, Profile};
use crate::profile::{Meta, NormalizedProfile, NormalizedSample, ValueType};
use anyhow::{anyhow, Context};
use std::collections::HashMap;
use ulid::Ulid;

const NANOS_PER_MILLI: i64 = 1_000_000;

/// Splits a validated pprof profile into one profile per sample type, in
/// sample type declaration order, interning its mappings, functions and
/// locations into `meta_store` along the way.
pub fn profiles_from_pprof(
    meta_store: &dyn MetaStore,
    p: &Profile,
) -> anyhow::Result<Vec<NormalizedProfile>> {
    let location_ids = intern_locations(meta_store, p)?;

    let mut profiles: Vec<NormalizedProfile> = (0..p.sample_type.len())
        .map(|i| NormalizedProfile {
            samples: Vec::with_capacity(p.sample.len()),
            meta: meta_from_pprof(p, i),
        })
        .collect();

    for sample in p.sample.iter() {
        let stacktrace = sample
            .location_id
            .iter()
            .map(|id| {
                location_ids
                    .get(id)
                    .copied()
                    .ok_or_else(|| anyhow!("sample references unknown location {}", id))
            })
            .collect::<anyhow::Result<Vec<Ulid>>>()?;

        let (labels, num_labels) = labels_from_sample(&p.string_table, &sample.label);

        for (profile, value) in profiles.iter_mut().zip(sample.value.iter()) {
            profile.samples.push(NormalizedSample {
                location_ids: stacktrace.clone(),
                value: *value,
                label: labels.clone(),
                num_label: num_labels.clone(),
            });
        }
    }

    Ok(profiles)
}

/// Returns the interned id of every pprof location, keyed by pprof location id.
fn intern_locations(
    meta_store: &dyn MetaStore,
    p: &Profile,
) -> anyhow::Result<HashMap<u64, Ulid>> {
    let strings = p.string_table.as_slice();

    let mut mappings = HashMap::with_capacity(p.mapping.len());
    for m in p.mapping.iter() {
        let id = meta_store
            .get_or_create_mapping(&metastore::Mapping {
                start: m.memory_start,
                limit: m.memory_limit,
                offset: m.file_offset,
                file: string(strings, m.filename),
                build_id: string(strings, m.build_id),
                has_functions: m.has_functions,
                has_filenames: m.has_filenames,
                has_line_numbers: m.has_line_numbers,
                has_inline_frames: m.has_inline_frames,
            })
            .with_context(|| format!("failed to intern mapping {}", m.id))?;
        mappings.insert(m.id, id);
    }

    let mut functions = HashMap::with_capacity(p.function.len());
    for f in p.function.iter() {
        let id = meta_store
            .get_or_create_function(&metastore::Function {
                name: string(strings, f.name),
                system_name: string(strings, f.system_name),
                filename: string(strings, f.filename),
                start_line: f.start_line,
            })
            .with_context(|| format!("failed to intern function {}", f.id))?;
        functions.insert(f.id, id);
    }

    let mut locations = HashMap::with_capacity(p.location.len());
    for l in p.location.iter() {
        let mapping_id = match l.mapping_id {
            0 => None,
            id => Some(*mappings.get(&id).ok_or_else(|| {
                anyhow!("location {} references unknown mapping {}", l.id, id)
            })?),
        };

        let mut lines = Vec::with_capacity(l.line.len());
        for line in l.line.iter() {
            let function_id = match line.function_id {
                0 => None,
                id => Some(*functions.get(&id).ok_or_else(|| {
                    anyhow!("location {} references unknown function {}", l.id, id)
                })?),
            };
            lines.push(metastore::Line {
                function_id,
                line: line.line,
            });
        }

        let id = meta_store
            .get_or_create_location(&metastore::Location {
                mapping_id,
                address: l.address,
                is_folded: l.is_folded,
                lines,
            })
            .with_context(|| format!("failed to intern location {}", l.id))?;
        locations.insert(l.id, id);
    }

    Ok(locations)
}

fn meta_from_pprof(p: &Profile, sample_index: usize) -> Meta {
    Meta {
        timestamp: p.time_nanos / NANOS_PER_MILLI,
        duration: p.duration_nanos,
        period: p.period,
        period_type: value_type(&p.string_table, p.period_type.as_ref()),
        sample_type: value_type(&p.string_table, p.sample_type.get(sample_index)),
    }
}

fn value_type(string_table: &[String], vt: Option<&pprofpb::ValueType>) -> ValueType {
    match vt {
        Some(vt) => ValueType {
            type_: string(string_table, vt.r#type),
            unit: string(string_table, vt.unit),
        },
        None => ValueType::default(),
    }
}

/// String labels keep the first value seen per key, numeric labels the
/// first non-zero one.
fn labels_from_sample(
    string_table: &[String],
    plabels: &[pprofpb::Label],
) -> (HashMap<String, String>, HashMap<String, i64>) {
    let mut labels: HashMap<String, String> = HashMap::new();
    let mut num_labels: HashMap<String, i64> = HashMap::new();

    for label in plabels.iter() {
        let key = string(string_table, label.key);

        if label.str != 0 {
            labels
                .entry(key)
                .or_insert_with(|| string(string_table, label.str));
        } else if label.num != 0 {
            num_labels.entry(key).or_insert(label.num);
        }
    }

    (labels, num_labels)
}

fn string(string_table: &[String], index: i64) -> String {
    usize::try_from(index)
        .ok()
        .and_then(|i| string_table.get(i))
        .cloned()
        .unwrap_or_default()
}
