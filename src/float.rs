//! Floating-point signal formats.
//!
//! Every signal of one generated netlist shares a single IEEE-754-style
//! binary format: one sign bit, `exponent_bits` of biased exponent and the
//! remaining bits of significand. Constants (biases, multiplicands) are
//! encoded into that format's bit pattern before they reach the IR.

use std::fmt;

use crate::error::{Error, Result};
use crate::hdl::{Literal, ParamValue};

/// Bit layout shared by every signal of a netlist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FloatFormat {
    total_bits: u32,
    exponent_bits: u32,
}

/// Named formats accepted by `FloatFormat::from_name`.
pub const NAMED_FORMATS: [(&str, FloatFormat); 3] = [
    ("binary16", FloatFormat::BINARY16),
    ("binary32", FloatFormat::BINARY32),
    ("binary64", FloatFormat::BINARY64),
];

impl FloatFormat {
    pub const BINARY16: FloatFormat = FloatFormat {
        total_bits: 16,
        exponent_bits: 5,
    };
    pub const BINARY32: FloatFormat = FloatFormat {
        total_bits: 32,
        exponent_bits: 8,
    };
    pub const BINARY64: FloatFormat = FloatFormat {
        total_bits: 64,
        exponent_bits: 11,
    };

    /// Build a custom format. The significand gets whatever is left after
    /// the sign and exponent bits.
    ///
    /// Exponents are limited to 2..=11 bits and significands to 1..=52 bits
    /// so every value of the format is exactly representable as an `f64`.
    pub fn new(total_bits: u32, exponent_bits: u32) -> Result<Self> {
        if !(2..=11).contains(&exponent_bits) {
            return Err(Error::InvalidFloatFormat(format!(
                "exponent width {} outside 2..=11",
                exponent_bits
            )));
        }
        if total_bits > 64 || total_bits < exponent_bits + 2 {
            return Err(Error::InvalidFloatFormat(format!(
                "total width {} cannot hold a sign, {} exponent bits and a significand",
                total_bits, exponent_bits
            )));
        }
        let format = FloatFormat {
            total_bits,
            exponent_bits,
        };
        if format.significand_bits() > 52 {
            return Err(Error::InvalidFloatFormat(format!(
                "significand width {} exceeds 52",
                format.significand_bits()
            )));
        }
        Ok(format)
    }

    /// Look up a named format ("binary16", "binary32", "binary64").
    pub fn from_name(name: &str) -> Result<Self> {
        NAMED_FORMATS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, f)| *f)
            .ok_or_else(|| Error::UnknownFloatFormat(name.to_string()))
    }

    pub fn name(&self) -> Option<&'static str> {
        NAMED_FORMATS
            .iter()
            .find(|(_, f)| f == self)
            .map(|(n, _)| *n)
    }

    pub fn total_bits(&self) -> u32 {
        self.total_bits
    }

    pub fn exponent_bits(&self) -> u32 {
        self.exponent_bits
    }

    pub fn significand_bits(&self) -> u32 {
        self.total_bits - self.exponent_bits - 1
    }

    fn bias(&self) -> i32 {
        (1 << (self.exponent_bits - 1)) - 1
    }

    fn exponent_max(&self) -> u64 {
        (1u64 << self.exponent_bits) - 1
    }

    /// Number of hex digits needed for one value of this format.
    pub fn hex_digits(&self) -> usize {
        self.total_bits.div_ceil(4) as usize
    }

    /// Encode `value` into this format's bit pattern, rounding to nearest
    /// (ties to even). Out-of-range magnitudes become infinities.
    pub fn encode(&self, value: f64) -> u64 {
        let m = self.significand_bits();
        let exp_max = self.exponent_max();
        let sign = if value.is_sign_negative() {
            1u64 << (self.total_bits - 1)
        } else {
            0
        };

        if value.is_nan() {
            return (exp_max << m) | (1u64 << (m - 1));
        }
        if value.is_infinite() {
            return sign | (exp_max << m);
        }
        if value == 0.0 {
            return sign;
        }

        // value = sig * 2^exp2 with sig normalised into [2^52, 2^53)
        let bits = value.abs().to_bits();
        let raw_exp = ((bits >> 52) & 0x7ff) as i32;
        let frac = bits & ((1u64 << 52) - 1);
        let (mut sig, mut exp2) = if raw_exp == 0 {
            (frac, -1074)
        } else {
            (frac | (1u64 << 52), raw_exp - 1075)
        };
        while sig & (1u64 << 52) == 0 {
            sig <<= 1;
            exp2 -= 1;
        }

        let biased = exp2 + 52 + self.bias();
        if biased >= 1 {
            let mut q = round_shift(sig, 52 - m);
            let mut biased = biased as u64;
            if q >> (m + 1) != 0 {
                q >>= 1;
                biased += 1;
            }
            if biased >= exp_max {
                return sign | (exp_max << m);
            }
            return sign | (biased << m) | (q & ((1u64 << m) - 1));
        }

        // Subnormal: count units of 2^(1 - bias - m). A carry into bit m
        // lands in the exponent field and yields the smallest normal.
        let shift = (1 - self.bias() - m as i32) - exp2;
        sign | round_shift(sig, shift as u32)
    }

    /// Decode a bit pattern of this format back into an `f64` (exact).
    pub fn decode(&self, bits: u64) -> f64 {
        let m = self.significand_bits();
        let exp_max = self.exponent_max();
        let exp_field = (bits >> m) & exp_max;
        let frac = bits & ((1u64 << m) - 1);
        let negative = (bits >> (self.total_bits - 1)) & 1 == 1;

        let magnitude = if exp_field == exp_max {
            if frac == 0 {
                f64::INFINITY
            } else {
                return f64::NAN;
            }
        } else if exp_field == 0 {
            frac as f64 * exp2i(1 - self.bias() - m as i32)
        } else {
            (frac | (1u64 << m)) as f64 * exp2i(exp_field as i32 - self.bias() - m as i32)
        };

        if negative {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Zero-padded hex digits of `value` encoded in this format.
    pub fn to_hex(&self, value: f64) -> String {
        format!("{:0width$x}", self.encode(value), width = self.hex_digits())
    }

    /// An HDL literal carrying `value` in this format.
    pub fn literal(&self, value: f64) -> Literal {
        Literal::padded_hex(self.encode(value), self.hex_digits())
    }

    /// The `floatsize` / `exponentsize` parameters every primitive receives.
    pub fn base_params(&self) -> Vec<(String, ParamValue)> {
        vec![
            (
                "floatsize".to_string(),
                ParamValue::Int(self.total_bits as i64),
            ),
            (
                "exponentsize".to_string(),
                ParamValue::Int(self.exponent_bits as i64),
            ),
        ]
    }
}

impl Default for FloatFormat {
    fn default() -> Self {
        FloatFormat::BINARY16
    }
}

impl fmt::Display for FloatFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "float{}e{}", self.total_bits, self.exponent_bits),
        }
    }
}

/// Shift right by `shift` bits, rounding to nearest with ties to even.
fn round_shift(value: u64, shift: u32) -> u64 {
    if shift == 0 {
        return value;
    }
    if shift >= 128 {
        return 0;
    }
    let v = value as u128;
    let q = v >> shift;
    let rem = v & ((1u128 << shift) - 1);
    let half = 1u128 << (shift - 1);
    let round_up = rem > half || (rem == half && q & 1 == 1);
    (q + round_up as u128) as u64
}

/// Exact 2^k for any k an `f64` can represent, 0 or infinity beyond.
pub(crate) fn exp2i(k: i32) -> f64 {
    if k > 1023 {
        f64::INFINITY
    } else if k >= -1022 {
        f64::from_bits(((k + 1023) as u64) << 52)
    } else if k >= -1074 {
        f64::from_bits(1u64 << (k + 1074))
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary16_known_patterns() {
        let f = FloatFormat::BINARY16;
        assert_eq!(f.encode(1.0), 0x3c00);
        assert_eq!(f.encode(-2.0), 0xc000);
        assert_eq!(f.encode(0.5), 0x3800);
        assert_eq!(f.encode(65504.0), 0x7bff);
        assert_eq!(f.encode(0.0), 0x0000);
        assert_eq!(f.encode(-0.0), 0x8000);
        // smallest subnormal
        assert_eq!(f.encode(exp2i(-24)), 0x0001);
    }

    #[test]
    fn test_binary16_overflow_rounds_to_infinity() {
        let f = FloatFormat::BINARY16;
        assert_eq!(f.encode(65520.0), 0x7c00);
        assert_eq!(f.encode(-1e9), 0xfc00);
        assert_eq!(f.encode(f64::INFINITY), 0x7c00);
        assert!(f.decode(f.encode(f64::NAN)).is_nan());
    }

    #[test]
    fn test_binary32_matches_native_rounding() {
        let f = FloatFormat::BINARY32;
        for v in [0.1, -3.7, 1e-40, 123456.789, 1e39, -1e-45, 3.4028235e38] {
            assert_eq!(
                f.encode(v),
                (v as f32).to_bits() as u64,
                "binary32 encoding of {}",
                v
            );
        }
    }

    #[test]
    fn test_binary64_is_identity() {
        let f = FloatFormat::BINARY64;
        for v in [0.1, -2.5e-310, 1.7976931348623157e308] {
            assert_eq!(f.encode(v), v.to_bits());
            assert_eq!(f.decode(v.to_bits()), v);
        }
    }

    #[test]
    fn test_decode_inverts_exact_values() {
        let f = FloatFormat::BINARY16;
        for v in [1.0, -0.75, 1024.0, exp2i(-24), -65504.0] {
            assert_eq!(f.decode(f.encode(v)), v);
        }
        // 0.1 is not representable; decoding gives the nearest binary16
        let approx = f.decode(f.encode(0.1));
        assert!((approx - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_ties_round_to_even() {
        let f = FloatFormat::BINARY16;
        // 1 + 2^-11 lies halfway between 1.0 and 1 + 2^-10
        assert_eq!(f.encode(1.0 + exp2i(-11)), 0x3c00);
        // 1 + 3*2^-11 lies halfway between 1 + 2^-10 and 1 + 2^-9
        assert_eq!(f.encode(1.0 + 3.0 * exp2i(-11)), 0x3c02);
    }

    #[test]
    fn test_hex_and_literal() {
        let f = FloatFormat::BINARY16;
        assert_eq!(f.to_hex(1.0), "3c00");
        assert_eq!(f.to_hex(0.0), "0000");
        assert_eq!(f.literal(-2.0).to_string(), "'hc000");
        assert_eq!(FloatFormat::BINARY32.to_hex(1.0), "3f800000");
    }

    #[test]
    fn test_named_and_custom_formats() {
        assert_eq!(
            FloatFormat::from_name("binary32").unwrap(),
            FloatFormat::BINARY32
        );
        assert!(matches!(
            FloatFormat::from_name("bfloat16"),
            Err(Error::UnknownFloatFormat(_))
        ));
        let bf = FloatFormat::new(16, 8).unwrap();
        assert_eq!(bf.significand_bits(), 7);
        assert_eq!(bf.name(), None);
        assert_eq!(bf.to_string(), "float16e8");
        assert_eq!(bf.encode(1.0), 0x3f80);
        assert!(FloatFormat::new(8, 7).is_err());
        assert!(FloatFormat::new(16, 1).is_err());
        assert!(FloatFormat::new(80, 11).is_err());
    }

    #[test]
    fn test_base_params() {
        let params = FloatFormat::BINARY32.base_params();
        assert_eq!(params[0], ("floatsize".to_string(), ParamValue::Int(32)));
        assert_eq!(params[1], ("exponentsize".to_string(), ParamValue::Int(8)));
    }
}
