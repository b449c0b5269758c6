//! API version negotiation and attribute gating.
//!
//! During capability discovery the control plane and syncd negotiate a
//! common SAI API version. The [`AttrVersionChecker`] then filters out
//! attributes the negotiated version cannot safely use: attributes
//! introduced by a later release, and attributes flagged for the *next*
//! release relative to the compiled metadata.

use std::collections::HashSet;
use std::str::FromStr;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::meta::AttrMetadata;

/// Error type for version parsing and gating.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VersionError {
    /// Metadata was required but not supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Version string did not parse as `major.minor.revision`.
    #[error("invalid version string: {0}")]
    InvalidVersionString(String),
}

/// A SAI API version, `major.minor.revision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            revision,
        }
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}

impl FromStr for ApiVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let mut next = || {
            parts
                .next()
                .and_then(|p| p.parse::<u32>().ok())
                .ok_or_else(|| VersionError::InvalidVersionString(s.to_string()))
        };
        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(VersionError::InvalidVersionString(s.to_string()));
        }
        Ok(version)
    }
}

/// Gate deciding whether an attribute is usable under a negotiated
/// API version.
///
/// Disabled by default (everything passes). Rejections are logged once
/// per attribute name per session; [`AttrVersionChecker::reset`]
/// clears the tracking between discovery passes.
#[derive(Debug, Default)]
pub struct AttrVersionChecker {
    negotiated: Option<ApiVersion>,
    logged: HashSet<String>,
}

impl AttrVersionChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the gate with the negotiated version.
    pub fn enable(&mut self, version: ApiVersion) {
        self.negotiated = Some(version);
    }

    /// Disables the gate; every attribute passes.
    pub fn disable(&mut self) {
        self.negotiated = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.negotiated.is_some()
    }

    /// Clears the once-only log tracking.
    pub fn reset(&mut self) {
        self.logged.clear();
    }

    /// Returns true if the attribute is safe to use under the
    /// negotiated version.
    ///
    /// Decision is a pure function of (negotiated version, attribute
    /// release, next-release flag). A missing metadata reference is a
    /// hard error independent of enabled state.
    pub fn is_sufficient_version(
        &mut self,
        meta: Option<&AttrMetadata>,
    ) -> Result<bool, VersionError> {
        let meta = meta.ok_or(VersionError::InvalidArgument("attribute metadata is null"))?;

        let Some(negotiated) = self.negotiated else {
            return Ok(true);
        };

        let accepted = if meta.release > negotiated {
            false
        } else if meta.release < negotiated {
            true
        } else {
            !meta.is_next_release
        };

        if !accepted && self.logged.insert(meta.attr_id_name.clone()) {
            info!(
                "attribute {} (release {}, next_release={}) not available at negotiated version {}",
                meta.attr_id_name, meta.release, meta.is_next_release, negotiated
            );
        }

        Ok(accepted)
    }
}
