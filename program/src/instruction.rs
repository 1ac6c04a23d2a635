// SPDX-License-Identifier: AGPL-3.0-only

//! Instruction types

#![allow(clippy::too_many_arguments)]

use {
    crate::{error::SwapError, token::state::pack_str},
    arrayref::array_ref,
    solana_program::{
        instruction::{AccountMeta, Instruction},
        program_error::ProgramError,
        pubkey::Pubkey,
        system_program,
    },
    std::mem::size_of,
};

/// Bytes reserved for a facility name
pub const NAME_LEN: usize = crate::token::state::NAME_LEN;

/// Initialize instruction data
#[repr(C)]
#[derive(Clone, Debug, PartialEq)]
pub struct Initialize {
    /// Token base units paid per native base unit
    pub rate: u64,
    /// Zero-padded display name
    pub name: [u8; NAME_LEN],
}

/// BuyTokens instruction data
#[repr(C)]
#[derive(Clone, Debug, PartialEq)]
pub struct BuyTokens {
    /// Native units paid by the buyer
    pub lamports: u64,
}

/// SellTokens instruction data
#[repr(C)]
#[derive(Clone, Debug, PartialEq)]
pub struct SellTokens {
    /// Token base units sold
    pub amount: u64,
}

/// Instructions supported by the swap facility program.
#[repr(C)]
#[derive(Debug, PartialEq)]
pub enum SwapInstruction {
    ///   Initializes a new facility bound to a ledger at a fixed rate.
    ///
    ///   0. `[writable]` Facility account, owned by this program and large
    ///      enough for `SwapState`.
    ///   1. `[]` Facility authority derived from `create_program_address(&[facility account])`
    ///   2. `[]` Ledger traded by the facility.
    ///   3. `[]` Token reserve. Must be a balance of the ledger owned by the authority.
    ///   4. `[]` Token program id
    Initialize(Initialize),

    ///   Buys tokens with native asset at the facility's rate.
    ///
    ///   0. `[writable]` Facility account, receives the payment.
    ///   1. `[]` Facility authority
    ///   2. `[writable]` Token reserve
    ///   3. `[writable, signer]` Buyer, pays the native asset
    ///   4. `[writable]` Buyer's balance on the ledger
    ///   5. `[]` Token program id
    ///   6. `[]` System program id
    BuyTokens(BuyTokens),

    ///   Sells tokens for native asset at the facility's rate. The seller
    ///   must have approved the facility authority for at least `amount`.
    ///
    ///   0. `[writable]` Facility account, pays out the native asset.
    ///   1. `[]` Facility authority
    ///   2. `[writable]` Token reserve
    ///   3. `[writable, signer]` Seller, receives the native asset
    ///   4. `[writable]` Seller's balance on the ledger
    ///   5. `[writable]` Allowance from the seller to the facility authority
    ///   6. `[]` Token program id
    SellTokens(SellTokens),
}

impl SwapInstruction {
    /// Unpacks a byte buffer into a [SwapInstruction](enum.SwapInstruction.html).
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&tag, rest) = input.split_first().ok_or(SwapError::InvalidInstruction)?;
        Ok(match tag {
            0 => {
                let (rate, rest) = Self::unpack_u64(rest)?;
                if rest.len() < NAME_LEN {
                    return Err(SwapError::InvalidInstruction.into());
                }
                let name = *array_ref![rest, 0, NAME_LEN];
                Self::Initialize(Initialize { rate, name })
            }
            1 => {
                let (lamports, _rest) = Self::unpack_u64(rest)?;
                Self::BuyTokens(BuyTokens { lamports })
            }
            2 => {
                let (amount, _rest) = Self::unpack_u64(rest)?;
                Self::SellTokens(SellTokens { amount })
            }
            _ => return Err(SwapError::InvalidInstruction.into()),
        })
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        if input.len() >= 8 {
            let (amount, rest) = input.split_at(8);
            let amount = amount
                .get(..8)
                .and_then(|slice| slice.try_into().ok())
                .map(u64::from_le_bytes)
                .ok_or(SwapError::InvalidInstruction)?;
            Ok((amount, rest))
        } else {
            Err(SwapError::InvalidInstruction.into())
        }
    }

    /// Packs a [SwapInstruction](enum.SwapInstruction.html) into a byte buffer.
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match &*self {
            Self::Initialize(Initialize { rate, name }) => {
                buf.push(0);
                buf.extend_from_slice(&rate.to_le_bytes());
                buf.extend_from_slice(name);
            }
            Self::BuyTokens(BuyTokens { lamports }) => {
                buf.push(1);
                buf.extend_from_slice(&lamports.to_le_bytes());
            }
            Self::SellTokens(SellTokens { amount }) => {
                buf.push(2);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
        }
        buf
    }
}

/// Creates an 'initialize' instruction.
pub fn initialize(
    program_id: &Pubkey,
    token_program_id: &Pubkey,
    swap_pubkey: &Pubkey,
    authority_pubkey: &Pubkey,
    ledger_pubkey: &Pubkey,
    token_reserve_pubkey: &Pubkey,
    rate: u64,
    name: &str,
) -> Result<Instruction, ProgramError> {
    let name = pack_str::<NAME_LEN>(name).ok_or(SwapError::InvalidName)?;
    let init_data = SwapInstruction::Initialize(Initialize { rate, name });
    let data = init_data.pack();

    let accounts = vec![
        AccountMeta::new(*swap_pubkey, false),
        AccountMeta::new_readonly(*authority_pubkey, false),
        AccountMeta::new_readonly(*ledger_pubkey, false),
        AccountMeta::new_readonly(*token_reserve_pubkey, false),
        AccountMeta::new_readonly(*token_program_id, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Creates a 'buy_tokens' instruction.
pub fn buy_tokens(
    program_id: &Pubkey,
    token_program_id: &Pubkey,
    swap_pubkey: &Pubkey,
    authority_pubkey: &Pubkey,
    token_reserve_pubkey: &Pubkey,
    buyer_pubkey: &Pubkey,
    buyer_balance_pubkey: &Pubkey,
    lamports: u64,
) -> Result<Instruction, ProgramError> {
    let data = SwapInstruction::BuyTokens(BuyTokens { lamports }).pack();

    let accounts = vec![
        AccountMeta::new(*swap_pubkey, false),
        AccountMeta::new_readonly(*authority_pubkey, false),
        AccountMeta::new(*token_reserve_pubkey, false),
        AccountMeta::new(*buyer_pubkey, true),
        AccountMeta::new(*buyer_balance_pubkey, false),
        AccountMeta::new_readonly(*token_program_id, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Creates a 'sell_tokens' instruction.
pub fn sell_tokens(
    program_id: &Pubkey,
    token_program_id: &Pubkey,
    swap_pubkey: &Pubkey,
    authority_pubkey: &Pubkey,
    token_reserve_pubkey: &Pubkey,
    seller_pubkey: &Pubkey,
    seller_balance_pubkey: &Pubkey,
    allowance_pubkey: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let data = SwapInstruction::SellTokens(SellTokens { amount }).pack();

    let accounts = vec![
        AccountMeta::new(*swap_pubkey, false),
        AccountMeta::new_readonly(*authority_pubkey, false),
        AccountMeta::new(*token_reserve_pubkey, false),
        AccountMeta::new(*seller_pubkey, true),
        AccountMeta::new(*seller_balance_pubkey, false),
        AccountMeta::new(*allowance_pubkey, false),
        AccountMeta::new_readonly(*token_program_id, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_initialize() {
        let name = pack_str::<NAME_LEN>("Instant Exchange").unwrap();
        let check = SwapInstruction::Initialize(Initialize { rate: 100, name });
        let packed = check.pack();
        let mut expect = vec![0u8];
        expect.extend_from_slice(&100u64.to_le_bytes());
        expect.extend_from_slice(&name);
        assert_eq!(packed, expect);
        let unpacked = SwapInstruction::unpack(&expect).unwrap();
        assert_eq!(unpacked, check);
    }

    #[test]
    fn pack_trades() {
        let check = SwapInstruction::BuyTokens(BuyTokens { lamports: 1_000_000_000 });
        let packed = check.pack();
        let mut expect = vec![1u8];
        expect.extend_from_slice(&1_000_000_000u64.to_le_bytes());
        assert_eq!(packed, expect);
        assert_eq!(SwapInstruction::unpack(&expect).unwrap(), check);

        let check = SwapInstruction::SellTokens(SellTokens { amount: 42 });
        let packed = check.pack();
        let mut expect = vec![2u8];
        expect.extend_from_slice(&42u64.to_le_bytes());
        assert_eq!(packed, expect);
        assert_eq!(SwapInstruction::unpack(&expect).unwrap(), check);
    }

    #[test]
    fn unpack_rejects_truncated_input() {
        let invalid: ProgramError = SwapError::InvalidInstruction.into();
        assert_eq!(SwapInstruction::unpack(&[]), Err(invalid.clone()));
        assert_eq!(SwapInstruction::unpack(&[1, 0, 0]), Err(invalid.clone()));
        assert_eq!(SwapInstruction::unpack(&[0, 100, 0, 0, 0, 0, 0, 0, 0]), Err(invalid.clone()));
        assert_eq!(SwapInstruction::unpack(&[7]), Err(invalid));
    }
}
