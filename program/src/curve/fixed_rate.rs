// SPDX-License-Identifier: AGPL-3.0-only

//! Fixed rate curve: one native unit always converts to `rate` tokens

use {
    crate::{
        curve::calculator::{map_zero_to_none, SwapResult, TradeDirection},
        error::SwapError,
    },
    arrayref::{array_mut_ref, array_ref},
    solana_program::{
        program_error::ProgramError,
        program_pack::{IsInitialized, Pack, Sealed},
    },
    spl_math::uint::U256,
};

/// FixedRateCurve struct, set at init and never updated
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FixedRateCurve {
    /// Token base units per native base unit
    pub rate: u64,
}

impl FixedRateCurve {
    /// Converts `source_amount` in the given direction.
    /// Buying multiplies by the rate; selling divides and drops the
    /// remainder, which stays with the facility.
    pub fn swap(&self, source_amount: u64, trade_direction: TradeDirection) -> Option<SwapResult> {
        let rate = U256::from(self.rate);
        let source = U256::from(source_amount);

        let destination = match trade_direction {
            TradeDirection::NativeToToken => source.checked_mul(rate)?,
            TradeDirection::TokenToNative => source.checked_div(rate)?,
        };
        let destination = u128::try_from(destination).ok()?;
        let destination_amount_swapped = map_zero_to_none(u64::try_from(destination).ok()?)?;

        Some(SwapResult {
            source_amount_swapped: source_amount,
            destination_amount_swapped,
        })
    }

    /// Validates that the curve can be used for trading
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.rate == 0 {
            Err(SwapError::InvalidRate)
        } else {
            Ok(())
        }
    }
}

/// IsInitialized is required to use `Pack::pack` and `Pack::unpack`
impl IsInitialized for FixedRateCurve {
    fn is_initialized(&self) -> bool {
        true
    }
}
impl Sealed for FixedRateCurve {}
impl Pack for FixedRateCurve {
    const LEN: usize = 8;

    fn pack_into_slice(&self, output: &mut [u8]) {
        let rate = array_mut_ref![output, 0, 8];
        *rate = self.rate.to_le_bytes();
    }

    fn unpack_from_slice(input: &[u8]) -> Result<FixedRateCurve, ProgramError> {
        let rate = array_ref![input, 0, 8];
        Ok(Self {
            rate: u64::from_le_bytes(*rate),
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, proptest::prelude::*, test_case::test_case};

    const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

    #[test_case(LAMPORTS_PER_SOL, 100, 100 * LAMPORTS_PER_SOL; "one native unit at rate 100")]
    #[test_case(1, 100, 100; "one lamport")]
    #[test_case(7, 1, 7; "unit rate")]
    fn buy_multiplies_by_rate(native: u64, rate: u64, expected: u64) {
        let curve = FixedRateCurve { rate };
        let result = curve.swap(native, TradeDirection::NativeToToken).unwrap();
        assert_eq!(result.source_amount_swapped, native);
        assert_eq!(result.destination_amount_swapped, expected);
    }

    #[test_case(100 * LAMPORTS_PER_SOL, 100, LAMPORTS_PER_SOL; "hundred tokens at rate 100")]
    #[test_case(150, 100, 1; "remainder is dropped")]
    #[test_case(500 * LAMPORTS_PER_SOL, 100, 5 * LAMPORTS_PER_SOL; "five hundred tokens")]
    fn sell_divides_by_rate(tokens: u64, rate: u64, expected: u64) {
        let curve = FixedRateCurve { rate };
        let result = curve.swap(tokens, TradeDirection::TokenToNative).unwrap();
        assert_eq!(result.source_amount_swapped, tokens);
        assert_eq!(result.destination_amount_swapped, expected);
    }

    #[test]
    fn zero_output_is_rejected() {
        let curve = FixedRateCurve { rate: 100 };
        assert!(curve.swap(99, TradeDirection::TokenToNative).is_none());
        assert!(curve.swap(0, TradeDirection::NativeToToken).is_none());
    }

    #[test]
    fn overflow_is_rejected() {
        let curve = FixedRateCurve { rate: u64::MAX };
        assert!(curve.swap(2, TradeDirection::NativeToToken).is_none());
        let result = curve.swap(1, TradeDirection::NativeToToken).unwrap();
        assert_eq!(result.destination_amount_swapped, u64::MAX);
    }

    #[test]
    fn zero_rate_is_invalid() {
        let curve = FixedRateCurve { rate: 0 };
        assert_eq!(curve.validate(), Err(SwapError::InvalidRate));
        assert!(curve.swap(10, TradeDirection::TokenToNative).is_none());
        assert!(FixedRateCurve { rate: 1 }.validate().is_ok());
    }

    #[test]
    fn pack_curve() {
        let curve = FixedRateCurve { rate: 100 };

        let mut packed = [0u8; FixedRateCurve::LEN];
        Pack::pack_into_slice(&curve, &mut packed[..]);
        let unpacked = FixedRateCurve::unpack(&packed).unwrap();
        assert_eq!(curve, unpacked);

        let packed = 100u64.to_le_bytes().to_vec();
        let unpacked = FixedRateCurve::unpack(&packed).unwrap();
        assert_eq!(curve, unpacked);
    }

    proptest! {
        #[test]
        fn round_trip_returns_native_amount(
            native in 1..u32::MAX as u64,
            rate in 1..u32::MAX as u64,
        ) {
            let curve = FixedRateCurve { rate };
            let direction = TradeDirection::NativeToToken;
            let bought = curve.swap(native, direction).unwrap();
            let sold = curve
                .swap(bought.destination_amount_swapped, direction.opposite())
                .unwrap();
            prop_assert_eq!(sold.destination_amount_swapped, native);
        }
    }

    proptest! {
        #[test]
        fn sale_never_pays_more_than_tokens_are_worth(
            tokens in 1..u64::MAX,
            rate in 1..u64::MAX,
        ) {
            let curve = FixedRateCurve { rate };
            prop_assume!(tokens >= rate);
            let sold = curve.swap(tokens, TradeDirection::TokenToNative).unwrap();
            let value = sold.destination_amount_swapped as u128 * rate as u128;
            prop_assert!(value <= tokens as u128);
            prop_assert!(tokens as u128 - value < rate as u128);
        }
    }
}
