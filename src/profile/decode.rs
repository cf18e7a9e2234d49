use super::validate::{validate_pprof_profile, ValidationError};
use crate::pprofpb::Profile;
use flate2::read::GzDecoder;
use prost::Message;
use std::io::Read;
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub const DEFAULT_MAX_PROFILE_SIZE: usize = 64 << 20;

/// Errors returned for a raw sample that can't be turned into a valid pprof
/// profile. All of them are the client's fault.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("empty input")]
    Empty,

    #[error("failed to decompress gzip: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("profile exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to parse profile: {0}")]
    Malformed(#[from] prost::DecodeError),

    #[error("invalid profile: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy)]
pub struct ProfileDecoder {
    max_size: usize,
}

impl Default for ProfileDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROFILE_SIZE)
    }
}

impl ProfileDecoder {
    /// `max_size` bounds the decoded protobuf payload, after gzip inflation.
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }

    /// Parses a raw pprof sample, gzip compressed or not, and checks that
    /// every reference inside it resolves.
    pub fn decode(&self, raw: &[u8]) -> Result<Profile, DecodeError> {
        if raw.is_empty() {
            return Err(DecodeError::Empty);
        }

        let profile = if is_gzip(raw) {
            let inflated = self.gunzip(raw)?;
            Profile::decode(inflated.as_slice())?
        } else {
            if raw.len() > self.max_size {
                return Err(DecodeError::TooLarge {
                    limit: self.max_size,
                });
            }
            Profile::decode(raw)?
        };

        validate_pprof_profile(&profile)?;

        Ok(profile)
    }

    fn gunzip(&self, raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let mut inflated = Vec::new();
        let limit = (self.max_size as u64).saturating_add(1);

        GzDecoder::new(raw)
            .take(limit)
            .read_to_end(&mut inflated)
            .map_err(DecodeError::Decompress)?;

        if inflated.len() > self.max_size {
            return Err(DecodeError::TooLarge {
                limit: self.max_size,
            });
        }

        Ok(inflated)
    }
}

fn is_gzip(raw: &[u8]) -> bool {
    raw.len() >= 2 && raw[..2] == GZIP_MAGIC
}
