pub mod base;
pub mod gcs;
pub mod local;

use crate::errors::{Result, DataHubError};
use std::fmt;
use std::path::PathBuf;

/// 一次运行唯一的持久化目标：本地目录或云存储桶，二者只能选其一
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Local { dir: PathBuf },
    Gcs { bucket: String, prefix: String },
}

impl Target {
    /// Resolve the target from the raw CLI values. Exactly one of `local`
    /// and `bucket` must be set; this runs before any network activity.
    pub fn from_args(local: Option<&str>, bucket: Option<&str>, prefix: Option<&str>) -> Result<Self> {
        let local = local.map(str::trim).filter(|s| !s.is_empty());
        let bucket = bucket.map(str::trim).filter(|s| !s.is_empty());

        match (local, bucket) {
            (Some(dir), None) => {
                if prefix.is_some() {
                    return Err(DataHubError::ConfigError(
                        "--prefix only applies to a cloud bucket target".to_string(),
                    ));
                }
                Ok(Target::Local { dir: PathBuf::from(dir) })
            }
            (None, Some(bucket)) => Ok(Target::Gcs {
                bucket: bucket.to_string(),
                prefix: prefix.unwrap_or_default().to_string(),
            }),
            (Some(_), Some(_)) => Err(DataHubError::ConfigError(
                "choose either a local path or a cloud bucket, not both".to_string(),
            )),
            (None, None) => Err(DataHubError::ConfigError(
                "no storage target: provide a local path or a cloud bucket".to_string(),
            )),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Local { dir } => write!(f, "local:{}", dir.display()),
            Target::Gcs { bucket, prefix } => write!(f, "gs://{}/{}", bucket, prefix),
        }
    }
}
