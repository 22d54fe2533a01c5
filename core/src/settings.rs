// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use davsync_dav::Url;
use regex::Regex;

use crate::{Config, Error, PreselectPolicy};

/// Settings snapshot carried by one discovery or refresh run.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    policy: PreselectPolicy,
    excluded: Option<Regex>,
}

impl Settings {
    /// Creates a snapshot from a policy and an optional exclusion pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Regex`] if the pattern does not compile.
    pub fn new(policy: PreselectPolicy, excluded: Option<&str>) -> Result<Self, Error> {
        let excluded = excluded
            .filter(|pattern| !pattern.is_empty())
            .map(Regex::new)
            .transpose()?;
        Ok(Self { policy, excluded })
    }

    /// Takes the preselection settings from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Regex`] if the exclusion pattern does not compile.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::new(config.preselect, config.preselect_excluded.as_deref())
    }

    /// The preselection policy.
    #[must_use]
    pub fn policy(&self) -> PreselectPolicy {
        self.policy
    }

    fn is_excluded(&self, url: &Url) -> bool {
        self.excluded
            .as_ref()
            .is_some_and(|regex| regex.is_match(url.as_str()))
    }

    /// Whether a newly discovered collection at `url` should have `sync` enabled.
    ///
    /// `personal_home_set` tells whether the collection was listed by a
    /// personal home-set.
    #[must_use]
    pub fn should_preselect(&self, url: &Url, personal_home_set: bool) -> bool {
        match self.policy {
            PreselectPolicy::All => !self.is_excluded(url),
            PreselectPolicy::Personal => personal_home_set && !self.is_excluded(url),
            PreselectPolicy::None => false,
        }
    }
}
