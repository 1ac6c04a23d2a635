// SPDX-License-Identifier: AGPL-3.0-only

//! Error types

use {
    num_derive::FromPrimitive,
    solana_program::{
        decode_error::DecodeError,
        msg,
        program_error::{PrintProgramError, ProgramError},
    },
    thiserror::Error,
};

/// Errors that may be returned by the token ledger program.
#[derive(Clone, Debug, Eq, Error, FromPrimitive, PartialEq)]
pub enum LedgerError {
    // 0.
    /// Debit exceeds the source balance.
    #[error("Insufficient balance")]
    InsufficientBalance,
    /// Transfer on behalf exceeds the granted allowance.
    #[error("Insufficient allowance")]
    InsufficientAllowance,
    /// Account does not hold the expected owner.
    #[error("Owner does not match")]
    OwnerMismatch,
    /// The two accounts belong to different ledgers.
    #[error("Account ledger does not match")]
    LedgerMismatch,
    /// The account cannot be initialized because it is already being used.
    #[error("Already in use")]
    AlreadyInUse,

    // 5.
    /// State is uninitialized.
    #[error("State is uninitialized")]
    UninitializedState,
    /// Instruction does not match any known ledger instruction.
    #[error("Invalid instruction")]
    InvalidInstruction,
    /// Name or symbol does not fit in its fixed-size field.
    #[error("Name or symbol is too long or not valid UTF-8")]
    InvalidName,
    /// Operation overflowed.
    #[error("Operation overflowed")]
    Overflow,
    /// The allowance account is bound to a different spender.
    #[error("Spender does not match")]
    SpenderMismatch,

    // 10.
    /// The account is not at the address derived for its keys.
    #[error("Account address is not the derived address")]
    InvalidAddress,
    /// The ledger's decimals exceed what a u64 amount can scale by.
    #[error("Invalid decimals")]
    InvalidDecimals,
}

impl From<LedgerError> for ProgramError {
    fn from(e: LedgerError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for LedgerError {
    fn type_of() -> &'static str {
        "LedgerError"
    }
}

impl PrintProgramError for LedgerError {
    fn print<E>(&self)
    where
        E: 'static + std::error::Error + DecodeError<E> + PrintProgramError + num_traits::FromPrimitive,
    {
        match self {
            LedgerError::InsufficientBalance => msg!("Error: insufficient balance"),
            LedgerError::InsufficientAllowance => msg!("Error: insufficient allowance"),
            LedgerError::OwnerMismatch => msg!("Error: owner does not match"),
            LedgerError::LedgerMismatch => msg!("Error: account ledger does not match"),
            LedgerError::AlreadyInUse => msg!("Error: account or ledger already in use"),
            LedgerError::UninitializedState => msg!("Error: State is uninitialized"),
            LedgerError::InvalidInstruction => msg!("Error: Invalid instruction"),
            LedgerError::InvalidName => msg!("Error: name or symbol is too long"),
            LedgerError::Overflow => msg!("Error: Operation overflowed"),
            LedgerError::SpenderMismatch => msg!("Error: spender does not match"),
            LedgerError::InvalidAddress => msg!("Error: account address is not the derived address"),
            LedgerError::InvalidDecimals => msg!("Error: decimals out of range"),
        }
    }
}

/// Decodes a custom program error code back into a `LedgerError`
pub fn decode_ledger_error(error: &ProgramError) -> Option<LedgerError> {
    match error {
        ProgramError::Custom(code) => num_traits::FromPrimitive::from_u32(*code),
        _ => None,
    }
}
