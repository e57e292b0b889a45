use ethers::types::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// USDC on the settlement network uses 6 decimals.
pub const USDC_DECIMALS: u32 = 6;

const SCALE: u64 = 1_000_000;

/// Convert a major-unit amount (e.g. `10.5` USDC) to token minor units.
///
/// Always floors: `1.2345679` becomes `1234567`, never `1234568`.
/// Returns `None` for negative amounts or values that do not fit in 128 bits.
pub fn to_minor_units(amount: Decimal) -> Option<U256> {
    if amount.is_sign_negative() {
        return None;
    }
    let scaled = amount.checked_mul(Decimal::from(SCALE))?.floor();
    scaled.to_u128().map(U256::from)
}

/// Convert token minor units back into a major-unit decimal for display.
pub fn from_minor_units(amount: U256) -> Decimal {
    let raw = if amount > U256::from(i128::MAX as u128) {
        i128::MAX
    } else {
        amount.as_u128() as i128
    };
    // Saturates past the 96-bit Decimal mantissa
    Decimal::try_from_i128_with_scale(raw, USDC_DECIMALS)
        .map(|d| d.normalize())
        .unwrap_or(Decimal::MAX)
}
