// SPDX-License-Identifier: AGPL-3.0-only

//! Various constraints as required for production environments

use crate::{curve::fixed_rate::FixedRateCurve, error::SwapError};

/// Encodes limits enforced when a facility is initialized
pub struct SwapConstraints<'a> {
    /// Smallest accepted rate
    pub min_rate: u64,
    /// Largest accepted rate
    pub max_rate: u64,
    /// Facility names that may be registered, any name if empty
    pub valid_names: &'a [&'a str],
}

impl<'a> SwapConstraints<'a> {
    /// Checks that the provided curve is valid for the given constraints
    pub fn validate_curve(&self, curve: &FixedRateCurve) -> Result<(), SwapError> {
        if curve.rate < self.min_rate || curve.rate > self.max_rate {
            Err(SwapError::UnsupportedRate)
        } else {
            Ok(())
        }
    }

    /// Checks that the provided name is allowed for the given constraints
    pub fn validate_name(&self, name: &str) -> Result<(), SwapError> {
        if self.valid_names.is_empty() || self.valid_names.contains(&name) {
            Ok(())
        } else {
            Err(SwapError::InvalidName)
        }
    }
}

#[cfg(feature = "production")]
const MAX_RATE: u64 = 1_000_000;
#[cfg(feature = "production")]
const VALID_NAMES: &[&str] = &[];

/// Limits defined by the program creator, only enforced when the program is
/// built with the `production` feature
pub const SWAP_CONSTRAINTS: Option<SwapConstraints> = {
    #[cfg(feature = "production")]
    {
        Some(SwapConstraints {
            min_rate: 1,
            max_rate: MAX_RATE,
            valid_names: VALID_NAMES,
        })
    }
    #[cfg(not(feature = "production"))]
    {
        None
    }
};
