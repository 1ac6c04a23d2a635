// SPDX-License-Identifier: AGPL-3.0-only

//! Read-only queries against committed runtime state

use {
    crate::{
        runtime::Runtime,
        state::SwapState,
        token::{
            self,
            error::LedgerError,
            state::{Allowance, Balance, Ledger},
        },
    },
    solana_program::{
        program_error::ProgramError,
        program_pack::{IsInitialized, Pack},
        pubkey::Pubkey,
    },
};

fn unpack_account<T: Pack + IsInitialized>(
    runtime: &Runtime,
    key: &Pubkey,
    program_id: &Pubkey,
) -> Result<T, ProgramError> {
    let account = runtime
        .get_account(key)
        .ok_or(ProgramError::UninitializedAccount)?;
    if account.owner != *program_id {
        return Err(ProgramError::IncorrectProgramId);
    }
    T::unpack(&account.data)
}

/// Loads a ledger account
pub fn ledger(runtime: &Runtime, ledger: &Pubkey) -> Result<Ledger, ProgramError> {
    unpack_account(runtime, ledger, &token::id())
}

/// Display name of a ledger
pub fn name(runtime: &Runtime, ledger_key: &Pubkey) -> Result<String, ProgramError> {
    Ok(ledger(runtime, ledger_key)?.name()?)
}

/// Ticker symbol of a ledger
pub fn symbol(runtime: &Runtime, ledger_key: &Pubkey) -> Result<String, ProgramError> {
    Ok(ledger(runtime, ledger_key)?.symbol()?)
}

/// Decimal places of a ledger's unit
pub fn decimals(runtime: &Runtime, ledger_key: &Pubkey) -> Result<u8, ProgramError> {
    Ok(ledger(runtime, ledger_key)?.decimals)
}

/// Fixed supply of a ledger
pub fn total_supply(runtime: &Runtime, ledger_key: &Pubkey) -> Result<u64, ProgramError> {
    Ok(ledger(runtime, ledger_key)?.supply)
}

/// Loads a single balance account
pub fn balance(runtime: &Runtime, balance: &Pubkey) -> Result<Balance, ProgramError> {
    unpack_account(runtime, balance, &token::id())
}

/// Address of the balance account of `owner` on `ledger`
pub fn balance_address(ledger: &Pubkey, owner: &Pubkey) -> Pubkey {
    Balance::derive_address(&token::id(), ledger, owner).0
}

/// Address of the allowance account of (owner, spender) on `ledger`
pub fn allowance_address(ledger: &Pubkey, owner: &Pubkey, spender: &Pubkey) -> Pubkey {
    Allowance::derive_address(&token::id(), ledger, owner, spender).0
}

/// Tokens held by `owner` on `ledger`. Zero if it has no balance account.
pub fn balance_of(runtime: &Runtime, ledger: &Pubkey, owner: &Pubkey) -> u64 {
    balance(runtime, &balance_address(ledger, owner))
        .ok()
        .filter(|balance| balance.ledger == *ledger && balance.owner == *owner)
        .map_or(0, |balance| balance.amount)
}

/// Amount `spender` may still move out of `owner`'s balance. Zero if no
/// allowance was ever granted.
pub fn allowance(runtime: &Runtime, ledger: &Pubkey, owner: &Pubkey, spender: &Pubkey) -> u64 {
    unpack_account::<Allowance>(runtime, &allowance_address(ledger, owner, spender), &token::id())
        .ok()
        .map_or(0, |allowance| allowance.amount)
}

/// Sum of every balance on `ledger`. Equals the supply unless the ledger is
/// corrupted.
pub fn circulating_supply(runtime: &Runtime, ledger: &Pubkey) -> u64 {
    runtime
        .program_accounts(&token::id())
        .filter(|account| account.data.len() == Balance::LEN)
        .filter_map(|account| Balance::unpack(&account.data).ok())
        .filter(|balance| balance.ledger == *ledger)
        .map(|balance| balance.amount)
        .fold(0u64, u64::saturating_add)
}

/// Loads a facility account
pub fn swap_state(runtime: &Runtime, facility: &Pubkey) -> Result<SwapState, ProgramError> {
    unpack_account(runtime, facility, &crate::id())
}

/// Display name of a facility
pub fn facility_name(runtime: &Runtime, facility: &Pubkey) -> Result<String, ProgramError> {
    Ok(swap_state(runtime, facility)?.name()?)
}

/// Tokens paid per native unit by a facility
pub fn facility_rate(runtime: &Runtime, facility: &Pubkey) -> Result<u64, ProgramError> {
    Ok(swap_state(runtime, facility)?.rate())
}

/// Ledger traded by a facility
pub fn facility_token(runtime: &Runtime, facility: &Pubkey) -> Result<Pubkey, ProgramError> {
    Ok(swap_state(runtime, facility)?.ledger)
}

/// Tokens a facility still has on offer
pub fn token_reserve(runtime: &Runtime, facility: &Pubkey) -> Result<u64, ProgramError> {
    let state = swap_state(runtime, facility)?;
    let reserve = balance(runtime, &state.token_reserve)?;
    if reserve.ledger != state.ledger {
        return Err(LedgerError::LedgerMismatch.into());
    }
    Ok(reserve.amount)
}

/// Native units a facility can pay out on sales
pub fn native_reserve(runtime: &Runtime, facility: &Pubkey) -> Result<u64, ProgramError> {
    swap_state(runtime, facility)?;
    Ok(SwapState::native_reserve(
        runtime.lamports(facility),
        runtime.rent(),
    ))
}

/// Address and bump seed of the authority that owns a facility's reserve
pub fn facility_authority(facility: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[&facility.to_bytes()], &crate::id())
}

