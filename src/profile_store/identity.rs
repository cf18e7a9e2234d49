use crate::profile::Meta;
use crate::storage::{Labels, METRIC_NAME_LABEL};

/// Derives the series a decomposed profile is written to.
///
/// The sample type and unit are folded into `__name__`, so a single client
/// supplied name fans out into one series per sample type, e.g. `myapp`
/// becomes `myapp_cpu_nanoseconds` and `myapp_alloc_objects`. Without a
/// `__name__` label the name is just `<type>_<unit>`. The result is sorted
/// by label name; `base` is left untouched.
pub fn series_labels(base: &Labels, meta: &Meta) -> Labels {
    let suffix = format!("{}_{}", meta.sample_type.type_, meta.sample_type.unit);

    let mut ls = base.clone();
    ls.upsert_with(METRIC_NAME_LABEL, |name| match name {
        Some(name) => format!("{}_{}", name, suffix),
        None => suffix,
    });
    ls.sort();

    ls
}
