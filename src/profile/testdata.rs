//! pprof fixtures built in code.

use crate::pprofpb::{Function, Label, Line, Location, Mapping, Profile, Sample, ValueType};
use flate2::{write::GzEncoder, Compression};
use prost::Message;
use std::io::Write;

pub struct ProfileBuilder {
    profile: Profile,
}

impl ProfileBuilder {
    pub fn new() -> Self {
        Self {
            profile: Profile {
                string_table: vec![String::new()],
                ..Default::default()
            },
        }
    }

    fn string(&mut self, s: &str) -> i64 {
        if let Some(i) = self.profile.string_table.iter().position(|e| e == s) {
            return i as i64;
        }
        self.profile.string_table.push(s.to_string());
        (self.profile.string_table.len() - 1) as i64
    }

    fn value_type(&mut self, type_: &str, unit: &str) -> ValueType {
        ValueType {
            r#type: self.string(type_),
            unit: self.string(unit),
        }
    }

    pub fn time_nanos(mut self, time_nanos: i64) -> Self {
        self.profile.time_nanos = time_nanos;
        self
    }

    pub fn duration_nanos(mut self, duration_nanos: i64) -> Self {
        self.profile.duration_nanos = duration_nanos;
        self
    }

    pub fn period(mut self, type_: &str, unit: &str, period: i64) -> Self {
        let vt = self.value_type(type_, unit);
        self.profile.period_type = Some(vt);
        self.profile.period = period;
        self
    }

    pub fn sample_type(mut self, type_: &str, unit: &str) -> Self {
        let vt = self.value_type(type_, unit);
        self.profile.sample_type.push(vt);
        self
    }

    pub fn mapping(mut self, id: u64, start: u64, limit: u64, file: &str, build_id: &str) -> Self {
        let mapping = Mapping {
            id,
            memory_start: start,
            memory_limit: limit,
            filename: self.string(file),
            build_id: self.string(build_id),
            ..Default::default()
        };
        self.profile.mapping.push(mapping);
        self
    }

    pub fn function(mut self, id: u64, name: &str, filename: &str) -> Self {
        let function = Function {
            id,
            name: self.string(name),
            system_name: self.string(name),
            filename: self.string(filename),
            start_line: 1,
        };
        self.profile.function.push(function);
        self
    }

    pub fn location(mut self, id: u64, mapping_id: u64, address: u64, function_ids: &[u64]) -> Self {
        self.profile.location.push(Location {
            id,
            mapping_id,
            address,
            line: function_ids
                .iter()
                .enumerate()
                .map(|(i, function_id)| Line {
                    function_id: *function_id,
                    line: 10 + i as i64,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        });
        self
    }

    pub fn sample(mut self, location_ids: &[u64], values: &[i64]) -> Self {
        self.profile.sample.push(Sample {
            location_id: location_ids.to_vec(),
            value: values.to_vec(),
            label: vec![],
        });
        self
    }

    pub fn sample_with_labels(
        mut self,
        location_ids: &[u64],
        values: &[i64],
        labels: &[(&str, &str)],
        num_labels: &[(&str, i64)],
    ) -> Self {
        let mut label = vec![];
        for (key, value) in labels {
            label.push(Label {
                key: self.string(key),
                str: self.string(value),
                ..Default::default()
            });
        }
        for (key, num) in num_labels {
            label.push(Label {
                key: self.string(key),
                num: *num,
                ..Default::default()
            });
        }

        self.profile.sample.push(Sample {
            location_id: location_ids.to_vec(),
            value: values.to_vec(),
            label,
        });
        self
    }

    pub fn build(self) -> Profile {
        self.profile
    }

    pub fn encode(self) -> Vec<u8> {
        self.profile.encode_to_vec()
    }

    pub fn encode_gzip(self) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&self.profile.encode_to_vec()).unwrap();
        encoder.finish().unwrap()
    }
}

/// A cpu profile with two sample types, samples/count and cpu/nanoseconds,
/// and two stacks sharing the `main` frame.
pub fn cpu_profile(time_nanos: i64) -> ProfileBuilder {
    ProfileBuilder::new()
        .sample_type("samples", "count")
        .sample_type("cpu", "nanoseconds")
        .period("cpu", "nanoseconds", 10_000_000)
        .time_nanos(time_nanos)
        .duration_nanos(10_000_000_000)
        .mapping(1, 0x400000, 0x800000, "/usr/bin/app", "2d6912fd3dd64542")
        .function(1, "main", "main.go")
        .function(2, "work", "work.go")
        .location(1, 1, 0x401000, &[2])
        .location(2, 1, 0x402000, &[1])
        .sample(&[1, 2], &[3, 30_000_000])
        .sample_with_labels(&[2], &[1, 10_000_000], &[("thread", "main")], &[("bytes", 512)])
}
