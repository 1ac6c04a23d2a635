// SPDX-License-Identifier: AGPL-3.0-only

//! Curve invariant implementations

pub mod calculator;
pub mod fixed_rate;
