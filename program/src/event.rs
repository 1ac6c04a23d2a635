// SPDX-License-Identifier: AGPL-3.0-only

//! Domain events emitted by the ledger and swap programs.
//!
//! Events are collected by the runtime while a transaction executes and are
//! handed back in its receipt once the transaction commits. Events emitted by
//! a failed instruction are discarded together with its state changes.

use solana_program::pubkey::Pubkey;

/// Payload shared by purchases and sales on the swap facility
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TradeEvent {
    /// The trader
    pub account: Pubkey,
    /// The ledger traded against
    pub token: Pubkey,
    /// Token amount bought or sold, in base units
    pub amount: u64,
    /// Tokens per native unit at the time of the trade
    pub rate: u64,
}

/// An event emitted by one of the programs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Tokens moved between two owners. `from` is `None` for the initial mint.
    Transfer {
        /// The ledger
        ledger: Pubkey,
        /// Debited owner
        from: Option<Pubkey>,
        /// Credited owner
        to: Pubkey,
        /// Amount moved
        amount: u64,
    },
    /// An allowance was set.
    Approval {
        /// The ledger
        ledger: Pubkey,
        /// Owner granting the allowance
        owner: Pubkey,
        /// Spender receiving the allowance
        spender: Pubkey,
        /// New allowance
        amount: u64,
    },
    /// Native asset was exchanged for tokens.
    Bought(TradeEvent),
    /// Tokens were exchanged for native asset.
    Sold(TradeEvent),
}

/// An event tagged with the program that emitted it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmittedEvent {
    /// Emitting program
    pub program_id: Pubkey,
    /// The event itself
    pub event: Event,
}
