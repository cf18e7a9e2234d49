use super::{Appendable, Appender, Labels};
use crate::profile::NormalizedProfile;
use anyhow::{anyhow, bail};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug)]
pub struct MemSeries {
    labels: Labels,
    profiles: Mutex<Vec<NormalizedProfile>>,
}

impl MemSeries {
    fn new(labels: Labels) -> Self {
        Self {
            labels,
            profiles: Mutex::new(vec![]),
        }
    }

    fn len(&self) -> anyhow::Result<usize> {
        let profiles = self
            .profiles
            .lock()
            .map_err(|_| anyhow!("series {} lock poisoned", self.labels))?;
        Ok(profiles.len())
    }
}

#[tonic::async_trait]
impl Appender for MemSeries {
    async fn append(&self, profile: NormalizedProfile) -> anyhow::Result<()> {
        let mut profiles = self
            .profiles
            .lock()
            .map_err(|_| anyhow!("series {} lock poisoned", self.labels))?;
        profiles.push(profile);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemDbStats {
    pub series: usize,
    pub profiles: usize,
}

/// In-memory series store. Each series keeps its profiles in commit order.
#[derive(Debug, Default)]
pub struct MemDb {
    series: RwLock<HashMap<Labels, Arc<MemSeries>>>,
    /// 0 means unlimited.
    max_series: usize,
}

impl MemDb {
    pub fn new(max_series: usize) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            max_series,
        }
    }

    pub fn stats(&self) -> anyhow::Result<MemDbStats> {
        let series = self
            .series
            .read()
            .map_err(|_| anyhow!("series index lock poisoned"))?;

        let mut profiles = 0;
        for s in series.values() {
            profiles += s.len()?;
        }

        Ok(MemDbStats {
            series: series.len(),
            profiles,
        })
    }
}

#[tonic::async_trait]
impl Appendable for MemDb {
    async fn appender(&self, labels: &Labels) -> anyhow::Result<Arc<dyn Appender>> {
        {
            let series = self
                .series
                .read()
                .map_err(|_| anyhow!("series index lock poisoned"))?;
            if let Some(s) = series.get(labels) {
                return Ok(Arc::clone(s) as Arc<dyn Appender>);
            }
        }

        let mut series = self
            .series
            .write()
            .map_err(|_| anyhow!("series index lock poisoned"))?;

        if let Some(s) = series.get(labels) {
            return Ok(Arc::clone(s) as Arc<dyn Appender>);
        }

        if self.max_series != 0 && series.len() >= self.max_series {
            bail!(
                "series limit of {} reached, refusing to create {}",
                self.max_series,
                labels
            );
        }

        log::debug!("creating series {}", labels);
        let s = Arc::new(MemSeries::new(labels.clone()));
        series.insert(labels.clone(), Arc::clone(&s));

        Ok(s as Arc<dyn Appender>)
    }
}
