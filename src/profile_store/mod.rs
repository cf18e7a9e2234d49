mod identity;

pub use identity::series_labels;

use crate::metastore::MetaStore;
use crate::normalizer;
use crate::profile::{DecodeError, ProfileDecoder};
use crate::profilestorepb::profile_store_service_server::ProfileStoreService;
use crate::profilestorepb::{LabelSet, WriteRawRequest, WriteRawResponse};
use crate::storage::{Appendable, Labels};
use std::sync::Arc;
use thiserror::Error;
use tonic::{Request, Response, Status};

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("invalid label set: {0}")]
    InvalidLabels(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("failed to normalize profile: {0:#}")]
    Normalize(anyhow::Error),

    #[error("failed to get appender for {labels}: {err:#}")]
    Appender { labels: Labels, err: anyhow::Error },

    #[error("failed to append sample: {0:#}")]
    Append(anyhow::Error),
}

impl From<WriteError> for Status {
    fn from(e: WriteError) -> Self {
        match e {
            WriteError::InvalidLabels(_) | WriteError::Decode(_) => {
                Status::invalid_argument(e.to_string())
            }
            WriteError::Normalize(_) | WriteError::Appender { .. } | WriteError::Append(_) => {
                Status::internal(e.to_string())
            }
        }
    }
}

pub struct ProfileStore {
    app: Arc<dyn Appendable>,
    meta_store: Arc<dyn MetaStore>,
    decoder: ProfileDecoder,
}

#[tonic::async_trait]
impl ProfileStoreService for ProfileStore {
    /// WriteRaw accepts a raw set of bytes of a pprof file
    async fn write_raw(
        &self,
        request: Request<WriteRawRequest>,
    ) -> Result<Response<WriteRawResponse>, Status> {
        match self.write_series(&request.into_inner()).await {
            Ok(()) => Ok(Response::new(WriteRawResponse {})),
            Err(e @ (WriteError::InvalidLabels(_) | WriteError::Decode(_))) => {
                log::warn!("rejected WriteRaw request: {}", e);
                Err(e.into())
            }
            Err(e) => {
                log::error!("failed to write WriteRaw request: {}", e);
                Err(e.into())
            }
        }
    }
}

impl ProfileStore {
    pub fn new(
        app: Arc<dyn Appendable>,
        meta_store: Arc<dyn MetaStore>,
        decoder: ProfileDecoder,
    ) -> Self {
        Self {
            app,
            meta_store,
            decoder,
        }
    }

    /// Writes every sample of every series, strictly in request order.
    ///
    /// The write is not atomic. The first error aborts the request, and
    /// everything appended before it stays appended: callers must assume
    /// any prefix of a failed request may have been written. Cancelling the
    /// returned future stops at the next append, with the same caveat.
    pub async fn write_series(&self, request: &WriteRawRequest) -> Result<(), WriteError> {
        for series in request.series.iter() {
            let ls = base_labels(series.labels.as_ref())?;

            for sample in series.samples.iter() {
                let p = self.decoder.decode(&sample.raw_profile)?;

                let profiles = normalizer::profiles_from_pprof(self.meta_store.as_ref(), &p)
                    .map_err(WriteError::Normalize)?;

                for prof in profiles {
                    let prof_labels = series_labels(&ls, &prof.meta);

                    log::debug!(
                        "writing sample label_set={} timestamp={}",
                        prof_labels,
                        prof.meta.timestamp
                    );

                    let app = self
                        .app
                        .appender(&prof_labels)
                        .await
                        .map_err(|err| WriteError::Appender {
                            labels: prof_labels.clone(),
                            err,
                        })?;

                    app.append(prof).await.map_err(WriteError::Append)?;
                }
            }
        }

        Ok(())
    }
}

/// Label names of a request series must be unique and non empty.
fn base_labels(label_set: Option<&LabelSet>) -> Result<Labels, WriteError> {
    let Some(label_set) = label_set else {
        return Ok(Labels::default());
    };

    let mut ls = Labels::with_capacity(label_set.labels.len() + 1);
    for label in label_set.labels.iter() {
        if label.name.is_empty() {
            return Err(WriteError::InvalidLabels("empty label name".to_string()));
        }

        if !ls.insert(label.name.as_str(), label.value.as_str()) {
            return Err(WriteError::InvalidLabels(format!(
                "duplicate label {}",
                label.name
            )));
        }
    }

    Ok(ls)
}
