// SPDX-License-Identifier: AGPL-3.0-only

//! An ERC20-like token ledger: a fixed supply minted once, balances keyed by
//! owner, and allowances keyed by owner and spender.

pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;

solana_program::declare_id!("H2ZFCfiG32hKiyPi7UE9HkNJgDzCoKxUnGFaDbZZzD24");

/// Decimals used by ledgers that mirror the native asset's precision
pub const DEFAULT_DECIMALS: u8 = 9;

/// Most decimals a ledger may declare: one base unit of a whole token must
/// still fit in a u64
pub const MAX_DECIMALS: u8 = 19;

/// Convert a UI representation of a token amount (using the decimals field
/// defined in its ledger) to the raw amount. Saturates at `u64::MAX`.
pub fn ui_amount_to_amount(ui_amount: f64, decimals: u8) -> u64 {
    (ui_amount * 10f64.powi(decimals as i32)) as u64
}

/// Convert a raw amount to its UI representation (using the decimals field
/// defined in its ledger)
pub fn amount_to_ui_amount(amount: u64, decimals: u8) -> f64 {
    amount as f64 / 10f64.powi(decimals as i32)
}
