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

/// Errors that may be returned by the swap facility program.
#[derive(Clone, Debug, Eq, Error, FromPrimitive, PartialEq)]
pub enum SwapError {
    // 0.
    /// The facility account passed in is already initialized.
    #[error("Swap account already in use")]
    AlreadyInUse,
    /// The program address provided doesn't match the value generated by the program.
    #[error("Invalid program address generated from bump seed and key")]
    InvalidProgramAddress,
    /// The owner of the token reserve isn't set to the program address generated by the program.
    #[error("Input account owner is not the program address")]
    InvalidOwner,
    /// The token reserve belongs to a different ledger than the one provided.
    #[error("Token reserve ledger does not match the provided ledger")]
    IncorrectLedger,
    /// The token reserve does not unpack as a balance account.
    #[error("Deserialized account is not a token balance account")]
    ExpectedAccount,

    // 5.
    /// The facility's native reserve cannot cover the payout.
    #[error("Insufficient native balance in facility reserve")]
    InsufficientBalance,
    /// The rate is zero or otherwise unusable.
    #[error("Invalid rate")]
    InvalidRate,
    /// The rate is outside the bounds enforced by the program constraints.
    #[error("Rate does not satisfy program constraints")]
    UnsupportedRate,
    /// The instruction cannot be decoded.
    #[error("Invalid instruction")]
    InvalidInstruction,
    /// Address of the provided token reserve is incorrect.
    #[error("Address of the provided token reserve is incorrect")]
    IncorrectReserveAccount,

    // 10.
    /// The provided token program does not match the token program expected by the facility.
    #[error("The provided token program does not match the token program expected by the swap")]
    IncorrectTokenProgramId,
    /// The operation would produce zero tokens or zero native units.
    #[error("Given trade results in 0 tokens on the other side")]
    ZeroTradingTokens,
    /// The calculation failed.
    #[error("CalculationFailure")]
    CalculationFailure,
    /// The facility name is longer than the space reserved for it.
    #[error("Facility name is too long or not valid UTF-8")]
    InvalidName,
    /// The facility account has not been initialized.
    #[error("Swap account is not initialized")]
    UninitializedState,
}

impl From<SwapError> for ProgramError {
    fn from(e: SwapError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for SwapError {
    fn type_of() -> &'static str {
        "Swap Error"
    }
}

impl PrintProgramError for SwapError {
    fn print<E>(&self)
    where
        E: 'static + std::error::Error + DecodeError<E> + PrintProgramError + num_traits::FromPrimitive,
    {
        match self {
            SwapError::AlreadyInUse => msg!("Error: Swap account already in use"),
            SwapError::InvalidProgramAddress => {
                msg!("Error: Invalid program address generated from bump seed and key")
            }
            SwapError::InvalidOwner => {
                msg!("Error: The input account owner is not the program address")
            }
            SwapError::IncorrectLedger => {
                msg!("Error: Token reserve ledger does not match the provided ledger")
            }
            SwapError::ExpectedAccount => {
                msg!("Error: Deserialized account is not a token balance account")
            }
            SwapError::InsufficientBalance => {
                msg!("Error: Insufficient native balance in facility reserve")
            }
            SwapError::InvalidRate => msg!("Error: Invalid rate"),
            SwapError::UnsupportedRate => msg!("Error: Rate does not satisfy program constraints"),
            SwapError::InvalidInstruction => msg!("Error: InvalidInstruction"),
            SwapError::IncorrectReserveAccount => {
                msg!("Error: Address of the provided token reserve is incorrect")
            }
            SwapError::IncorrectTokenProgramId => {
                msg!("Error: The provided token program does not match the token program expected by the swap")
            }
            SwapError::ZeroTradingTokens => {
                msg!("Error: Given trade results in 0 tokens on the other side")
            }
            SwapError::CalculationFailure => msg!("Error: CalculationFailure"),
            SwapError::InvalidName => msg!("Error: Facility name is too long or not valid UTF-8"),
            SwapError::UninitializedState => msg!("Error: Swap account is not initialized"),
        }
    }
}

/// Decodes a custom program error code back into a `SwapError`
pub fn decode_swap_error(error: &ProgramError) -> Option<SwapError> {
    match error {
        ProgramError::Custom(code) => num_traits::FromPrimitive::from_u32(*code),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_code_round_trips() {
        let error: ProgramError = SwapError::ZeroTradingTokens.into();
        assert_eq!(error, ProgramError::Custom(11));
        assert_eq!(decode_swap_error(&error), Some(SwapError::ZeroTradingTokens));
        assert_eq!(decode_swap_error(&ProgramError::InvalidArgument), None);
    }
}
