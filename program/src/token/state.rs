// SPDX-License-Identifier: AGPL-3.0-only

//! State transition types

use {
    crate::token::error::LedgerError,
    arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs},
    solana_program::{
        program_error::ProgramError,
        program_pack::{IsInitialized, Pack, Sealed},
        pubkey::{Pubkey, PUBKEY_BYTES},
    },
};

/// Bytes reserved for a ledger name
pub const NAME_LEN: usize = 32;
/// Bytes reserved for a ledger symbol
pub const SYMBOL_LEN: usize = 10;

/// Copies `value` into a zero-padded fixed field.
/// Fails if the string does not fit.
pub fn pack_str<const N: usize>(value: &str) -> Option<[u8; N]> {
    let bytes = value.as_bytes();
    if bytes.len() > N {
        return None;
    }
    let mut field = [0u8; N];
    field[..bytes.len()].copy_from_slice(bytes);
    Some(field)
}

/// Reads a zero-padded fixed field back into a string
pub fn unpack_str(field: &[u8]) -> Option<String> {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end]).ok().map(str::to_owned)
}

/// Ledger data.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Ledger {
    /// Is `true` if this structure has been initialized
    pub is_initialized: bool,
    /// Number of base 10 digits to the right of the decimal place.
    pub decimals: u8,
    /// Total supply of tokens, minted once at initialization.
    pub supply: u64,
    /// Zero-padded UTF-8 display name
    pub name: [u8; NAME_LEN],
    /// Zero-padded UTF-8 ticker symbol
    pub symbol: [u8; SYMBOL_LEN],
}

impl Ledger {
    /// Display name of the ledger
    pub fn name(&self) -> Result<String, LedgerError> {
        unpack_str(&self.name).ok_or(LedgerError::InvalidName)
    }

    /// Ticker symbol of the ledger
    pub fn symbol(&self) -> Result<String, LedgerError> {
        unpack_str(&self.symbol).ok_or(LedgerError::InvalidName)
    }
}

impl Sealed for Ledger {}
impl IsInitialized for Ledger {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}
impl Pack for Ledger {
    const LEN: usize = 52;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, 52];
        let (is_initialized, decimals, supply, name, symbol) =
            array_refs![src, 1, 1, 8, NAME_LEN, SYMBOL_LEN];
        let is_initialized = match is_initialized {
            [0] => false,
            [1] => true,
            _ => return Err(ProgramError::InvalidAccountData),
        };
        Ok(Ledger {
            is_initialized,
            decimals: decimals[0],
            supply: u64::from_le_bytes(*supply),
            name: *name,
            symbol: *symbol,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, 52];
        let (is_initialized_dst, decimals_dst, supply_dst, name_dst, symbol_dst) =
            mut_array_refs![dst, 1, 1, 8, NAME_LEN, SYMBOL_LEN];
        is_initialized_dst[0] = self.is_initialized as u8;
        decimals_dst[0] = self.decimals;
        *supply_dst = self.supply.to_le_bytes();
        name_dst.copy_from_slice(&self.name);
        symbol_dst.copy_from_slice(&self.symbol);
    }
}

/// Balance data: the amount a single owner holds on a ledger.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Balance {
    /// Is `true` if this structure has been initialized
    pub is_initialized: bool,
    /// The ledger this balance belongs to
    pub ledger: Pubkey,
    /// The owner of this balance
    pub owner: Pubkey,
    /// The amount of tokens this balance holds
    pub amount: u64,
}

impl Balance {
    /// Seed for balance addresses
    pub const BALANCE_SEED: &'static [u8] = b"balance";

    /// Derives the single balance address of `owner` on `ledger`
    pub fn derive_address(program_id: &Pubkey, ledger: &Pubkey, owner: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[Self::BALANCE_SEED, &ledger.to_bytes(), &owner.to_bytes()],
            program_id,
        )
    }
}

impl Sealed for Balance {}
impl IsInitialized for Balance {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}
impl Pack for Balance {
    const LEN: usize = 73;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, 73];
        let (is_initialized, ledger, owner, amount) =
            array_refs![src, 1, PUBKEY_BYTES, PUBKEY_BYTES, 8];
        let is_initialized = match is_initialized {
            [0] => false,
            [1] => true,
            _ => return Err(ProgramError::InvalidAccountData),
        };
        Ok(Balance {
            is_initialized,
            ledger: Pubkey::new_from_array(*ledger),
            owner: Pubkey::new_from_array(*owner),
            amount: u64::from_le_bytes(*amount),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, 73];
        let (is_initialized_dst, ledger_dst, owner_dst, amount_dst) =
            mut_array_refs![dst, 1, PUBKEY_BYTES, PUBKEY_BYTES, 8];
        is_initialized_dst[0] = self.is_initialized as u8;
        ledger_dst.copy_from_slice(self.ledger.as_ref());
        owner_dst.copy_from_slice(self.owner.as_ref());
        *amount_dst = self.amount.to_le_bytes();
    }
}

/// Allowance data: what `spender` may still move out of `owner`'s balance.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Allowance {
    /// Is `true` if this structure has been initialized
    pub is_initialized: bool,
    /// The ledger this allowance belongs to
    pub ledger: Pubkey,
    /// The owner granting the allowance
    pub owner: Pubkey,
    /// The account allowed to transfer on the owner's behalf
    pub spender: Pubkey,
    /// Remaining amount the spender may transfer
    pub amount: u64,
}

impl Allowance {
    /// Seed for allowance addresses
    pub const ALLOWANCE_SEED: &'static [u8] = b"allowance";

    /// Derives the single allowance address of an (owner, spender) pair on
    /// `ledger`
    pub fn derive_address(
        program_id: &Pubkey,
        ledger: &Pubkey,
        owner: &Pubkey,
        spender: &Pubkey,
    ) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[
                Self::ALLOWANCE_SEED,
                &ledger.to_bytes(),
                &owner.to_bytes(),
                &spender.to_bytes(),
            ],
            program_id,
        )
    }
}

impl Sealed for Allowance {}
impl IsInitialized for Allowance {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}
impl Pack for Allowance {
    const LEN: usize = 105;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, 105];
        let (is_initialized, ledger, owner, spender, amount) =
            array_refs![src, 1, PUBKEY_BYTES, PUBKEY_BYTES, PUBKEY_BYTES, 8];
        let is_initialized = match is_initialized {
            [0] => false,
            [1] => true,
            _ => return Err(ProgramError::InvalidAccountData),
        };
        Ok(Allowance {
            is_initialized,
            ledger: Pubkey::new_from_array(*ledger),
            owner: Pubkey::new_from_array(*owner),
            spender: Pubkey::new_from_array(*spender),
            amount: u64::from_le_bytes(*amount),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, 105];
        let (is_initialized_dst, ledger_dst, owner_dst, spender_dst, amount_dst) =
            mut_array_refs![dst, 1, PUBKEY_BYTES, PUBKEY_BYTES, PUBKEY_BYTES, 8];
        is_initialized_dst[0] = self.is_initialized as u8;
        ledger_dst.copy_from_slice(self.ledger.as_ref());
        owner_dst.copy_from_slice(self.owner.as_ref());
        spender_dst.copy_from_slice(self.spender.as_ref());
        *amount_dst = self.amount.to_le_bytes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_ledger() {
        let check = Ledger {
            is_initialized: true,
            decimals: 9,
            supply: 1_000_000_000_000_000,
            name: pack_str("DApp Token").unwrap(),
            symbol: pack_str("DAPP").unwrap(),
        };
        let mut packed = vec![0; Ledger::get_packed_len() + 1];
        assert_eq!(
            Err(ProgramError::InvalidAccountData),
            Ledger::pack(check, &mut packed)
        );
        let mut packed = vec![0; Ledger::get_packed_len()];
        Ledger::pack(check, &mut packed).unwrap();
        let unpacked = Ledger::unpack(&packed).unwrap();
        assert_eq!(unpacked, check);
        assert_eq!(unpacked.name().unwrap(), "DApp Token");
        assert_eq!(unpacked.symbol().unwrap(), "DAPP");
    }

    #[test]
    fn test_unpack_rejects_bad_initialized_flag() {
        let mut packed = vec![0; Balance::get_packed_len()];
        packed[0] = 2;
        assert_eq!(
            Balance::unpack_unchecked(&packed),
            Err(ProgramError::InvalidAccountData)
        );
    }

    #[test]
    fn test_pack_unpack_allowance() {
        let check = Allowance {
            is_initialized: true,
            ledger: Pubkey::new_from_array([1; 32]),
            owner: Pubkey::new_from_array([2; 32]),
            spender: Pubkey::new_from_array([3; 32]),
            amount: 100,
        };
        let mut packed = vec![0; Allowance::get_packed_len()];
        Allowance::pack(check, &mut packed).unwrap();
        let expect = [vec![1u8], vec![1; 32], vec![2; 32], vec![3; 32], 100u64.to_le_bytes().to_vec()]
            .concat();
        assert_eq!(packed, expect);
        assert_eq!(Allowance::unpack(&packed).unwrap(), check);
    }

    #[test]
    fn test_derived_addresses_are_per_key() {
        let program_id = crate::token::id();
        let ledger = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();

        let (balance, _) = Balance::derive_address(&program_id, &ledger, &alice);
        assert_eq!(balance, Balance::derive_address(&program_id, &ledger, &alice).0);
        assert_ne!(balance, Balance::derive_address(&program_id, &ledger, &bob).0);
        assert_ne!(
            balance,
            Balance::derive_address(&program_id, &Pubkey::new_unique(), &alice).0
        );

        let (allowance, _) = Allowance::derive_address(&program_id, &ledger, &alice, &bob);
        assert_ne!(allowance, balance);
        assert_ne!(
            allowance,
            Allowance::derive_address(&program_id, &ledger, &bob, &alice).0
        );
    }

    #[test]
    fn test_pack_str_limits() {
        assert_eq!(pack_str::<4>("abcde"), None);
        let field = pack_str::<4>("ab").unwrap();
        assert_eq!(field, [b'a', b'b', 0, 0]);
        assert_eq!(unpack_str(&field).as_deref(), Some("ab"));
        assert_eq!(unpack_str(&[0xff, 0xfe]), None);
    }
}
