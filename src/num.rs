use alloy::primitives::U256;
use fastnum::{
    D256, UD256, bint,
    decimal::{Context, RoundingMode, UnsignedDecimal},
};

use crate::error::{Error, Result};

/// Decimals of the native coin (wei per ether).
pub const NATIVE_DECIMALS: u8 = 18;

/// Fixed-point to decimal converter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Converter {
    decimals: i32,
}

impl Converter {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals: decimals as i32,
        }
    }

    /// Converter for amounts in wei.
    pub fn native() -> Self {
        Self::new(NATIVE_DECIMALS)
    }

    pub fn from_unsigned<const N: usize>(&self, value: U256) -> UnsignedDecimal<N> {
        let unscaled = bint::UInt::<N>::from_le_slice(value.as_le_slice())
            .expect("Converter: U256 -> UInt::<N>");
        UnsignedDecimal::<N>::from_parts(
            unscaled,
            -self.decimals,
            Context::default().with_rounding_mode(RoundingMode::Floor),
        )
    }
}

/// Fiat value of `native` wei at `rate` fiat per native coin.
pub fn fiat_value(native: U256, rate: UD256) -> UD256 {
    Converter::native().from_unsigned::<4>(native) * rate
}

/// Parses a non-negative decimal string such as `"1800.25"`.
pub fn parse_decimal(value: &str) -> Result<UD256> {
    UD256::from_str(value.trim(), Context::default())
        .map_err(|e| Error::Decode(format!("invalid decimal {value:?}: {e}")))
}

/// Parses a base-10 integer string such as a gas price in wei.
pub fn parse_u256(value: &str) -> Result<U256> {
    U256::from_str_radix(value.trim(), 10)
        .map_err(|e| Error::Decode(format!("invalid integer {value:?}: {e}")))
}

/// Parses a base-10 `u64`, e.g. a block number or timestamp.
pub fn parse_u64(value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| Error::Decode(format!("invalid integer {value:?}: {e}")))
}

/// `gas_price * gas_used` in wei, both given as base-10 strings.
pub fn gas_fee(gas_price: &str, gas_used: &str) -> Result<U256> {
    parse_u256(gas_price)?
        .checked_mul(parse_u256(gas_used)?)
        .ok_or_else(|| Error::Decode(format!("gas fee overflow: {gas_price} * {gas_used}")))
}

/// Absolute ratio `|numerator / denominator|` of two signed decimal strings,
/// `None` when the denominator is zero.
pub fn abs_ratio(numerator: &str, denominator: &str) -> Result<Option<UD256>> {
    let parse = |value: &str| {
        D256::from_str(value.trim(), Context::default())
            .map_err(|e| Error::Decode(format!("invalid decimal {value:?}: {e}")))
    };
    let (numerator, denominator) = (parse(numerator)?, parse(denominator)?);
    if denominator.is_zero() {
        return Ok(None);
    }
    Ok(Some((numerator / denominator).unsigned_abs()))
}

#[cfg(test)]
mod tests {
    use fastnum::udec256;

    use super::*;

    #[test]
    fn test_numeric_converter_from_unsigned() {
        assert_eq!(
            Converter::new(0).from_unsigned::<4>(U256::from(1234567890)),
            udec256!(1234567890)
        );
        assert_eq!(
            Converter::new(6).from_unsigned::<4>(U256::from(1234567890)),
            udec256!(1234.56789)
        );
        assert_eq!(
            Converter::native().from_unsigned::<4>(U256::from(1234567890)),
            udec256!(0.00000000123456789)
        );
    }

    #[test]
    fn test_fiat_value_is_exact() {
        let native = parse_u256("22921930374619520").unwrap();
        assert_eq!(
            fiat_value(native, udec256!(1800)),
            udec256!(41.259474674315136)
        );
        assert_eq!(
            fiat_value(native, udec256!(1.8)),
            udec256!(0.041259474674315136)
        );
    }

    #[test]
    fn test_fiat_value_large_fee() {
        // Far beyond f64 integer precision.
        let native = parse_u256("123456789012345678901234567").unwrap();
        assert_eq!(
            fiat_value(native, udec256!(2)),
            udec256!(246913578.024691357802469134)
        );
    }

    #[test]
    fn test_gas_fee() {
        assert_eq!(
            gas_fee("33000000000", "694603950").unwrap(),
            U256::from(22921930350000000000u128)
        );
        assert!(matches!(gas_fee("abc", "1"), Err(Error::Decode(_))));
        assert!(matches!(
            gas_fee(&U256::MAX.to_string(), "2"),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_abs_ratio() {
        assert_eq!(
            abs_ratio("-3600.5", "2").unwrap(),
            Some(udec256!(1800.25))
        );
        assert_eq!(abs_ratio("10", "0").unwrap(), None);
        assert!(abs_ratio("ten", "1").is_err());
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(
            parse_decimal("47000.00000000").unwrap(),
            udec256!(47000)
        );
        assert!(parse_decimal("-1").is_err());
        assert!(parse_decimal("").is_err());
    }
}
