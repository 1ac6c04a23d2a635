// SPDX-License-Identifier: AGPL-3.0-only

//! Instruction types

use {
    crate::token::{
        error::LedgerError,
        state::{pack_str, Allowance, Balance, NAME_LEN, SYMBOL_LEN},
    },
    arrayref::array_ref,
    solana_program::{
        instruction::{AccountMeta, Instruction},
        program_error::ProgramError,
        pubkey::{Pubkey, PUBKEY_BYTES},
        system_program,
    },
    std::mem::size_of,
};

/// Instructions supported by the token ledger program.
#[repr(C)]
#[derive(Clone, Debug, PartialEq)]
pub enum LedgerInstruction {
    /// Initializes a new ledger and mints its whole supply into a fresh
    /// balance account.
    ///
    ///   0. `[writable]` The ledger to initialize.
    ///   1. `[writable]` The owner's derived balance account receiving the
    ///      supply.
    ///   2. `[]` The owner of the receiving balance.
    InitializeLedger {
        /// Number of base 10 digits to the right of the decimal place.
        decimals: u8,
        /// Fixed total supply.
        supply: u64,
        /// Display name.
        name: [u8; NAME_LEN],
        /// Ticker symbol.
        symbol: [u8; SYMBOL_LEN],
    },
    /// Opens an empty balance account for `owner`.
    ///
    ///   0. `[writable]` The owner's derived balance account.
    ///   1. `[]` The ledger.
    InitializeBalance {
        /// The owner of the new balance.
        owner: Pubkey,
    },
    /// Moves tokens from the signer's balance to another balance.
    ///
    ///   0. `[writable]` The source balance.
    ///   1. `[writable]` The destination balance.
    ///   2. `[signer]` The source balance's owner.
    Transfer {
        /// The amount of tokens to transfer.
        amount: u64,
    },
    /// Sets the allowance a spender holds over the signer's balance.
    /// The amount overwrites any previous allowance.
    ///
    ///   0. `[]` The ledger.
    ///   1. `[writable]` The derived allowance account for (owner, spender).
    ///   2. `[signer]` The owner.
    Approve {
        /// The account allowed to spend.
        spender: Pubkey,
        /// The maximum amount the spender may transfer.
        amount: u64,
    },
    /// Moves tokens out of an owner's balance on the owner's behalf,
    /// consuming allowance.
    ///
    ///   0. `[writable]` The owner's balance.
    ///   1. `[writable]` The destination balance.
    ///   2. `[writable]` The allowance account for (owner, spender).
    ///   3. `[signer]` The spender.
    TransferFrom {
        /// The amount of tokens to transfer.
        amount: u64,
    },
    /// Creates the balance account of `owner` at its derived address. The
    /// account is left uninitialized for `InitializeBalance` or
    /// `InitializeLedger`.
    ///
    ///   0. `[writable, signer]` The payer funding the account.
    ///   1. `[writable]` The derived balance address.
    ///   2. `[]` The ledger.
    ///   3. `[]` The system program.
    CreateBalance {
        /// The owner of the balance.
        owner: Pubkey,
    },
    /// Creates the allowance account of (owner, spender) at its derived
    /// address. The first `Approve` initializes it.
    ///
    ///   0. `[writable, signer]` The payer funding the account.
    ///   1. `[writable]` The derived allowance address.
    ///   2. `[]` The ledger.
    ///   3. `[]` The system program.
    CreateAllowance {
        /// The owner granting the allowance.
        owner: Pubkey,
        /// The account allowed to spend.
        spender: Pubkey,
    },
}

impl LedgerInstruction {
    /// Unpacks a byte buffer into a [LedgerInstruction](enum.LedgerInstruction.html).
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&tag, rest) = input
            .split_first()
            .ok_or(LedgerError::InvalidInstruction)?;
        Ok(match tag {
            0 => {
                if rest.len() < 1 + 8 + NAME_LEN + SYMBOL_LEN {
                    return Err(LedgerError::InvalidInstruction.into());
                }
                let decimals = rest[0];
                let (supply, rest) = Self::unpack_u64(&rest[1..])?;
                let name = *array_ref![rest, 0, NAME_LEN];
                let symbol = *array_ref![rest, NAME_LEN, SYMBOL_LEN];
                Self::InitializeLedger {
                    decimals,
                    supply,
                    name,
                    symbol,
                }
            }
            1 => {
                let (owner, _rest) = Self::unpack_pubkey(rest)?;
                Self::InitializeBalance { owner }
            }
            2 => {
                let (amount, _rest) = Self::unpack_u64(rest)?;
                Self::Transfer { amount }
            }
            3 => {
                let (spender, rest) = Self::unpack_pubkey(rest)?;
                let (amount, _rest) = Self::unpack_u64(rest)?;
                Self::Approve { spender, amount }
            }
            4 => {
                let (amount, _rest) = Self::unpack_u64(rest)?;
                Self::TransferFrom { amount }
            }
            5 => {
                let (owner, _rest) = Self::unpack_pubkey(rest)?;
                Self::CreateBalance { owner }
            }
            6 => {
                let (owner, rest) = Self::unpack_pubkey(rest)?;
                let (spender, _rest) = Self::unpack_pubkey(rest)?;
                Self::CreateAllowance { owner, spender }
            }
            _ => return Err(LedgerError::InvalidInstruction.into()),
        })
    }

    /// Packs a [LedgerInstruction](enum.LedgerInstruction.html) into a byte buffer.
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match self {
            Self::InitializeLedger {
                decimals,
                supply,
                name,
                symbol,
            } => {
                buf.push(0);
                buf.push(*decimals);
                buf.extend_from_slice(&supply.to_le_bytes());
                buf.extend_from_slice(name);
                buf.extend_from_slice(symbol);
            }
            Self::InitializeBalance { owner } => {
                buf.push(1);
                buf.extend_from_slice(owner.as_ref());
            }
            &Self::Transfer { amount } => {
                buf.push(2);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::Approve { spender, amount } => {
                buf.push(3);
                buf.extend_from_slice(spender.as_ref());
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            &Self::TransferFrom { amount } => {
                buf.push(4);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::CreateBalance { owner } => {
                buf.push(5);
                buf.extend_from_slice(owner.as_ref());
            }
            Self::CreateAllowance { owner, spender } => {
                buf.push(6);
                buf.extend_from_slice(owner.as_ref());
                buf.extend_from_slice(spender.as_ref());
            }
        };
        buf
    }

    fn unpack_pubkey(input: &[u8]) -> Result<(Pubkey, &[u8]), ProgramError> {
        if input.len() >= PUBKEY_BYTES {
            let (key, rest) = input.split_at(PUBKEY_BYTES);
            let pk = Pubkey::try_from(key).map_err(|_| LedgerError::InvalidInstruction)?;
            Ok((pk, rest))
        } else {
            Err(LedgerError::InvalidInstruction.into())
        }
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let value = input
            .get(..8)
            .and_then(|slice| slice.try_into().ok())
            .map(u64::from_le_bytes)
            .ok_or(LedgerError::InvalidInstruction)?;
        Ok((value, &input[8..]))
    }
}

/// Creates an `InitializeLedger` instruction.
#[allow(clippy::too_many_arguments)]
pub fn initialize_ledger(
    token_program_id: &Pubkey,
    ledger_pubkey: &Pubkey,
    balance_pubkey: &Pubkey,
    owner_pubkey: &Pubkey,
    decimals: u8,
    supply: u64,
    name: &str,
    symbol: &str,
) -> Result<Instruction, ProgramError> {
    let name = pack_str::<NAME_LEN>(name).ok_or(LedgerError::InvalidName)?;
    let symbol = pack_str::<SYMBOL_LEN>(symbol).ok_or(LedgerError::InvalidName)?;
    let data = LedgerInstruction::InitializeLedger {
        decimals,
        supply,
        name,
        symbol,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new(*ledger_pubkey, false),
        AccountMeta::new(*balance_pubkey, false),
        AccountMeta::new_readonly(*owner_pubkey, false),
    ];

    Ok(Instruction {
        program_id: *token_program_id,
        accounts,
        data,
    })
}

/// Creates an `InitializeBalance` instruction.
pub fn initialize_balance(
    token_program_id: &Pubkey,
    balance_pubkey: &Pubkey,
    ledger_pubkey: &Pubkey,
    owner_pubkey: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let data = LedgerInstruction::InitializeBalance {
        owner: *owner_pubkey,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new(*balance_pubkey, false),
        AccountMeta::new_readonly(*ledger_pubkey, false),
    ];

    Ok(Instruction {
        program_id: *token_program_id,
        accounts,
        data,
    })
}

/// Creates a `Transfer` instruction.
pub fn transfer(
    token_program_id: &Pubkey,
    source_pubkey: &Pubkey,
    destination_pubkey: &Pubkey,
    owner_pubkey: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let data = LedgerInstruction::Transfer { amount }.pack();

    let accounts = vec![
        AccountMeta::new(*source_pubkey, false),
        AccountMeta::new(*destination_pubkey, false),
        AccountMeta::new_readonly(*owner_pubkey, true),
    ];

    Ok(Instruction {
        program_id: *token_program_id,
        accounts,
        data,
    })
}

/// Creates an `Approve` instruction.
pub fn approve(
    token_program_id: &Pubkey,
    ledger_pubkey: &Pubkey,
    allowance_pubkey: &Pubkey,
    spender_pubkey: &Pubkey,
    owner_pubkey: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let data = LedgerInstruction::Approve {
        spender: *spender_pubkey,
        amount,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new_readonly(*ledger_pubkey, false),
        AccountMeta::new(*allowance_pubkey, false),
        AccountMeta::new_readonly(*owner_pubkey, true),
    ];

    Ok(Instruction {
        program_id: *token_program_id,
        accounts,
        data,
    })
}

/// Creates a `TransferFrom` instruction.
pub fn transfer_from(
    token_program_id: &Pubkey,
    source_pubkey: &Pubkey,
    destination_pubkey: &Pubkey,
    allowance_pubkey: &Pubkey,
    spender_pubkey: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let data = LedgerInstruction::TransferFrom { amount }.pack();

    let accounts = vec![
        AccountMeta::new(*source_pubkey, false),
        AccountMeta::new(*destination_pubkey, false),
        AccountMeta::new(*allowance_pubkey, false),
        AccountMeta::new_readonly(*spender_pubkey, true),
    ];

    Ok(Instruction {
        program_id: *token_program_id,
        accounts,
        data,
    })
}

/// Creates a `CreateBalance` instruction for the derived balance address of
/// `owner` on `ledger`.
pub fn create_balance(
    token_program_id: &Pubkey,
    payer_pubkey: &Pubkey,
    ledger_pubkey: &Pubkey,
    owner_pubkey: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let (balance_pubkey, _) = Balance::derive_address(token_program_id, ledger_pubkey, owner_pubkey);
    let data = LedgerInstruction::CreateBalance {
        owner: *owner_pubkey,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new(*payer_pubkey, true),
        AccountMeta::new(balance_pubkey, false),
        AccountMeta::new_readonly(*ledger_pubkey, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *token_program_id,
        accounts,
        data,
    })
}

/// Creates a `CreateAllowance` instruction for the derived allowance address
/// of (owner, spender) on `ledger`.
pub fn create_allowance(
    token_program_id: &Pubkey,
    payer_pubkey: &Pubkey,
    ledger_pubkey: &Pubkey,
    owner_pubkey: &Pubkey,
    spender_pubkey: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let (allowance_pubkey, _) =
        Allowance::derive_address(token_program_id, ledger_pubkey, owner_pubkey, spender_pubkey);
    let data = LedgerInstruction::CreateAllowance {
        owner: *owner_pubkey,
        spender: *spender_pubkey,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new(*payer_pubkey, true),
        AccountMeta::new(allowance_pubkey, false),
        AccountMeta::new_readonly(*ledger_pubkey, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *token_program_id,
        accounts,
        data,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_instruction_packing() {
        let check = LedgerInstruction::Transfer { amount: 1 };
        let packed = check.pack();
        let expect = vec![2u8, 1, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(packed, expect);
        let unpacked = LedgerInstruction::unpack(&expect).unwrap();
        assert_eq!(unpacked, check);

        let check = LedgerInstruction::Approve {
            spender: Pubkey::new_from_array([4u8; 32]),
            amount: 2,
        };
        let packed = check.pack();
        let mut expect = vec![3u8];
        expect.extend_from_slice(&[4u8; 32]);
        expect.extend_from_slice(&[2, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(packed, expect);
        let unpacked = LedgerInstruction::unpack(&expect).unwrap();
        assert_eq!(unpacked, check);

        let check = LedgerInstruction::InitializeLedger {
            decimals: 9,
            supply: 42,
            name: pack_str("DApp Token").unwrap(),
            symbol: pack_str("DAPP").unwrap(),
        };
        let packed = check.pack();
        assert_eq!(packed.len(), 1 + 1 + 8 + NAME_LEN + SYMBOL_LEN);
        let unpacked = LedgerInstruction::unpack(&packed).unwrap();
        assert_eq!(unpacked, check);

        let check = LedgerInstruction::CreateAllowance {
            owner: Pubkey::new_from_array([1u8; 32]),
            spender: Pubkey::new_from_array([2u8; 32]),
        };
        let packed = check.pack();
        let expect = [vec![6u8], vec![1; 32], vec![2; 32]].concat();
        assert_eq!(packed, expect);
        let unpacked = LedgerInstruction::unpack(&expect).unwrap();
        assert_eq!(unpacked, check);
    }

    #[test]
    fn test_create_balance_targets_derived_address() {
        let program_id = crate::token::id();
        let payer = Pubkey::new_unique();
        let ledger = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let ix = create_balance(&program_id, &payer, &ledger, &owner).unwrap();
        assert_eq!(
            ix.accounts[1].pubkey,
            Balance::derive_address(&program_id, &ledger, &owner).0
        );
        assert!(ix.accounts[0].is_signer);
    }

    #[test]
    fn test_unpack_rejects_short_or_unknown_input() {
        let invalid: ProgramError = LedgerError::InvalidInstruction.into();
        assert_eq!(LedgerInstruction::unpack(&[]), Err(invalid.clone()));
        assert_eq!(LedgerInstruction::unpack(&[2, 1, 0]), Err(invalid.clone()));
        assert_eq!(LedgerInstruction::unpack(&[9]), Err(invalid.clone()));
        assert_eq!(LedgerInstruction::unpack(&[0, 9]), Err(invalid));
    }

    #[test]
    fn test_initialize_ledger_rejects_long_name() {
        let key = Pubkey::new_unique();
        let name = "a name that is far too long to fit the field";
        assert_eq!(
            initialize_ledger(&crate::token::id(), &key, &key, &key, 9, 1, name, "X"),
            Err(LedgerError::InvalidName.into())
        );
    }
}
