// SPDX-License-Identifier: AGPL-3.0-only

#![allow(clippy::arithmetic_side_effects)]
#![deny(missing_docs)]

//! A fixed-rate exchange between the native asset and a fungible token,
//! together with the token ledger it trades against.

pub mod client;
pub mod constraints;
pub mod curve;
pub mod error;
pub mod event;
pub mod instruction;
pub mod processor;
pub mod runtime;
pub mod state;
pub mod token;

// Export current sdk types for downstream users building with a different sdk
// version
pub use solana_program;

solana_program::declare_id!("GbTpyjUWVnULhkbz3dSyKuSCVak6ZjwhXBDXprAQ1YsT");
