// SPDX-License-Identifier: AGPL-3.0-only

//! State transition types

use {
    crate::{
        curve::fixed_rate::FixedRateCurve,
        error::SwapError,
        token::state::{unpack_str, NAME_LEN},
    },
    arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs},
    solana_program::{
        program_error::ProgramError,
        program_pack::{IsInitialized, Pack, Sealed},
        pubkey::{Pubkey, PUBKEY_BYTES},
        rent::Rent,
    },
};

/// Program state.
///
/// The facility account's lamports above its rent-exempt minimum are the
/// native reserve paid out on sales.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SwapState {
    /// Initialized state.
    pub is_initialized: bool,
    /// Bump seed used in program address.
    /// The program address is created deterministically with the bump seed,
    /// facility account key, and program id
    pub bump_seed: u8,

    /// Program ID of the token ledger program.
    pub token_program_id: Pubkey,
    /// The ledger traded by this facility.
    pub ledger: Pubkey,
    /// Balance account holding the facility's tokens, owned by the
    /// facility authority.
    pub token_reserve: Pubkey,

    /// Conversion rate, fixed at initialization.
    pub curve: FixedRateCurve,
    /// Zero-padded UTF-8 display name.
    pub name: [u8; NAME_LEN],
}

impl SwapState {
    /// Display name of the facility
    pub fn name(&self) -> Result<String, SwapError> {
        unpack_str(&self.name).ok_or(SwapError::InvalidName)
    }

    /// Tokens paid per native unit
    pub fn rate(&self) -> u64 {
        self.curve.rate
    }

    /// Native units available for payouts, given the facility account's
    /// lamports
    pub fn native_reserve(lamports: u64, rent: &Rent) -> u64 {
        lamports.saturating_sub(rent.minimum_balance(Self::LEN))
    }
}

impl Sealed for SwapState {}
impl IsInitialized for SwapState {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for SwapState {
    const LEN: usize = 138;

    fn pack_into_slice(&self, output: &mut [u8]) {
        let output = array_mut_ref![output, 0, 138];
        let (is_initialized, bump_seed, token_program_id, ledger, token_reserve, curve, name) =
            mut_array_refs![
                output,
                1,
                1,
                PUBKEY_BYTES,
                PUBKEY_BYTES,
                PUBKEY_BYTES,
                FixedRateCurve::LEN,
                NAME_LEN
            ];
        is_initialized[0] = self.is_initialized as u8;
        bump_seed[0] = self.bump_seed;
        token_program_id.copy_from_slice(self.token_program_id.as_ref());
        ledger.copy_from_slice(self.ledger.as_ref());
        token_reserve.copy_from_slice(self.token_reserve.as_ref());
        self.curve.pack_into_slice(&mut curve[..]);
        name.copy_from_slice(&self.name);
    }

    /// Unpacks a byte buffer into a [SwapState](struct.SwapState.html).
    fn unpack_from_slice(input: &[u8]) -> Result<Self, ProgramError> {
        let input = array_ref![input, 0, 138];
        #[allow(clippy::ptr_offset_with_cast)]
        let (is_initialized, bump_seed, token_program_id, ledger, token_reserve, curve, name) =
            array_refs![
                input,
                1,
                1,
                PUBKEY_BYTES,
                PUBKEY_BYTES,
                PUBKEY_BYTES,
                FixedRateCurve::LEN,
                NAME_LEN
            ];
        Ok(Self {
            is_initialized: match is_initialized {
                [0] => false,
                [1] => true,
                _ => return Err(ProgramError::InvalidAccountData),
            },
            bump_seed: bump_seed[0],
            token_program_id: Pubkey::new_from_array(*token_program_id),
            ledger: Pubkey::new_from_array(*ledger),
            token_reserve: Pubkey::new_from_array(*token_reserve),
            curve: FixedRateCurve::unpack_from_slice(curve)?,
            name: *name,
        })
    }
}
