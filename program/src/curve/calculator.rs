// SPDX-License-Identifier: AGPL-3.0-only

//! Swap calculations

/// Helper function for mapping to SwapError::CalculationFailure
pub fn map_zero_to_none(x: u64) -> Option<u64> {
    if x == 0 {
        None
    } else {
        Some(x)
    }
}

/// The direction of a trade, since curves can be specialized to treat each
/// token differently (by adding offsets or weights)
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TradeDirection {
    /// Native asset in, tokens out
    NativeToToken,
    /// Tokens in, native asset out
    TokenToNative,
}

impl TradeDirection {
    /// Given a trade direction, gives the opposite direction of the trade, so
    /// native-to-token becomes token-to-native, and vice versa
    pub fn opposite(&self) -> TradeDirection {
        match self {
            TradeDirection::NativeToToken => TradeDirection::TokenToNative,
            TradeDirection::TokenToNative => TradeDirection::NativeToToken,
        }
    }
}

/// Encodes results of a conversion
#[derive(Debug, PartialEq)]
pub struct SwapResult {
    /// Amount of source taken by the facility
    pub source_amount_swapped: u64,
    /// Amount of destination paid out by the facility
    pub destination_amount_swapped: u64,
}
