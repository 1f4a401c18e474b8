//! Object URIs
//!
//! Every durable artifact and every image is addressed as
//! `s3://<bucket>/<key>`. Keys are slash-delimited and never start with `/`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// URI scheme understood by the labeling-job service
pub const URI_SCHEME: &str = "s3";

/// Bucket + key pair addressing one stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectUri {
    pub bucket: String,
    pub key: String,
}

impl ObjectUri {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse a URI whose key may be empty (e.g. a listing prefix `s3://bucket/`)
    pub fn parse_prefix(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix(URI_SCHEME)
            .and_then(|r| r.strip_prefix("://"))
            .ok_or_else(|| Error::InvalidInput(format!("Not an {}:// URI: {}", URI_SCHEME, uri)))?;

        let (bucket, key) = match rest.split_once('/') {
            Some((bucket, key)) => (bucket, key),
            None => (rest, ""),
        };

        if bucket.is_empty() {
            return Err(Error::InvalidInput(format!("Missing bucket in URI: {}", uri)));
        }

        Ok(Self::new(bucket, key))
    }

    /// Last path segment of the key
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl FromStr for ObjectUri {
    type Err = Error;

    /// Parse a URI that must address an object (non-empty key)
    fn from_str(s: &str) -> Result<Self> {
        let uri = Self::parse_prefix(s)?;
        if uri.key.is_empty() {
            return Err(Error::InvalidInput(format!("Missing object key in URI: {}", s)));
        }
        Ok(uri)
    }
}

impl TryFrom<String> for ObjectUri {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ObjectUri> for String {
    fn from(uri: ObjectUri) -> Self {
        uri.to_string()
    }
}

impl fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", URI_SCHEME, self.bucket, self.key)
    }
}
