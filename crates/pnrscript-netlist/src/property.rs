//! Typed attribute and parameter values.
//!
//! A [`Property`] is either a string or a bit-vector of four-state bits.
//! Its textual form is what scripts and the JSON front end see:
//! bit-vectors print MSB first using `0 1 x z`, strings print as-is, and a
//! string that would otherwise read back as a bit-vector gets one trailing
//! space. [`Property::from_string`] undoes exactly that, so
//! `Property::from_string(&p.to_string()) == p` for every property.

use std::fmt;

use crate::assert::AssertionFailure;

/// One bit of a bit-vector property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyState {
    S0,
    S1,
    Sx,
    Sz,
}

impl PropertyState {
    pub fn as_char(self) -> char {
        match self {
            PropertyState::S0 => '0',
            PropertyState::S1 => '1',
            PropertyState::Sx => 'x',
            PropertyState::Sz => 'z',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(PropertyState::S0),
            '1' => Some(PropertyState::S1),
            'x' => Some(PropertyState::Sx),
            'z' => Some(PropertyState::Sz),
            _ => None,
        }
    }
}

/// An attribute or parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Property {
    /// Bits stored LSB first.
    Bits(Vec<PropertyState>),
    String(String),
}

impl Property {
    /// A `width`-bit two's complement encoding of `value`.
    pub fn from_int(value: i64, width: usize) -> Self {
        let bits = (0..width)
            .map(|i| {
                let set = if i < 64 { (value >> i) & 1 == 1 } else { value < 0 };
                if set { PropertyState::S1 } else { PropertyState::S0 }
            })
            .collect();
        Property::Bits(bits)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Property::String(s.into())
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Property::String(_))
    }

    pub fn width(&self) -> usize {
        match self {
            Property::Bits(bits) => bits.len(),
            Property::String(s) => s.len(),
        }
    }

    /// True if this is a bit-vector containing only `0` and `1`.
    pub fn is_fully_def(&self) -> bool {
        match self {
            Property::Bits(bits) => bits
                .iter()
                .all(|b| matches!(b, PropertyState::S0 | PropertyState::S1)),
            Property::String(_) => false,
        }
    }

    /// The low 64 bits as an integer; `x` and `z` read as zero.
    pub fn as_int64(&self) -> Result<i64, AssertionFailure> {
        let Property::Bits(bits) = self else {
            npnr_assert_false!("Assertion failure: !is_string");
        };
        Ok(bits
            .iter()
            .take(64)
            .enumerate()
            .filter(|(_, b)| **b == PropertyState::S1)
            .fold(0i64, |acc, (i, _)| acc | (1i64 << i)))
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Property::String(s) => !s.is_empty(),
            Property::Bits(bits) => bits.iter().any(|b| *b == PropertyState::S1),
        }
    }

    pub fn as_string(&self) -> Result<&str, AssertionFailure> {
        match self {
            Property::String(s) => Ok(s),
            Property::Bits(_) => npnr_assert_false!("Assertion failure: is_string"),
        }
    }

    /// Bits `offset..offset + len`, padded with `padding` past the end.
    pub fn extract(
        &self,
        offset: usize,
        len: usize,
        padding: PropertyState,
    ) -> Result<Property, AssertionFailure> {
        let Property::Bits(bits) = self else {
            npnr_assert_false!("Assertion failure: !is_string");
        };
        let out = (offset..offset + len)
            .map(|i| bits.get(i).copied().unwrap_or(padding))
            .collect();
        Ok(Property::Bits(out))
    }

    /// Parse the textual form produced by [`fmt::Display`].
    pub fn from_string(s: &str) -> Property {
        let cursor = s.find(|c| PropertyState::from_char(c).is_none());
        match cursor {
            None => Property::Bits(s.chars().rev().filter_map(PropertyState::from_char).collect()),
            Some(pos) if s[pos..].chars().all(|c| c == ' ') => {
                Property::String(s[..s.len() - 1].to_string())
            }
            Some(_) => Property::String(s.to_string()),
        }
    }

    /// Whether a string value needs the trailing-space marker to avoid
    /// reading back as a bit-vector.
    fn needs_marker(s: &str) -> bool {
        let mut in_trailing_spaces = false;
        for c in s.chars() {
            if in_trailing_spaces {
                if c != ' ' {
                    return false;
                }
            } else if c == ' ' {
                in_trailing_spaces = true;
            } else if PropertyState::from_char(c).is_none() {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Bits(bits) => {
                for bit in bits.iter().rev() {
                    write!(f, "{}", bit.as_char())?;
                }
                Ok(())
            }
            Property::String(s) => {
                f.write_str(s)?;
                if Self::needs_marker(s) {
                    f.write_str(" ")?;
                }
                Ok(())
            }
        }
    }
}

impl From<i64> for Property {
    fn from(value: i64) -> Self {
        Property::from_int(value, 32)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::string(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(p: &Property) -> Property {
        Property::from_string(&p.to_string())
    }

    #[test]
    fn int_prints_msb_first() {
        let p = Property::from_int(5, 4);
        assert_eq!(p.to_string(), "0101");
        assert_eq!(p.as_int64().unwrap(), 5);
        assert!(p.is_fully_def());
    }

    #[test]
    fn bit_strings_parse_as_bits() {
        let p = Property::from_string("1x0");
        assert_eq!(
            p,
            Property::Bits(vec![PropertyState::S0, PropertyState::Sx, PropertyState::S1])
        );
        assert!(!p.is_fully_def());
    }

    #[test]
    fn plain_strings_stay_strings() {
        let p = Property::from_string("LUT4");
        assert_eq!(p, Property::string("LUT4"));
        assert_eq!(p.to_string(), "LUT4");
    }

    #[test]
    fn bit_like_strings_get_marker() {
        let p = Property::string("0101");
        assert_eq!(p.to_string(), "0101 ");
        assert_eq!(roundtrip(&p), p);
    }

    #[test]
    fn edge_case_strings_roundtrip() {
        for s in ["", " ", "   ", "01 ", "01 a", "abc ", "x", "hello world"] {
            let p = Property::string(s);
            assert_eq!(roundtrip(&p), p, "string {s:?}");
        }
    }

    #[test]
    fn empty_bits_roundtrip() {
        let p = Property::Bits(Vec::new());
        assert_eq!(p.to_string(), "");
        assert_eq!(roundtrip(&p), p);
    }

    #[test]
    fn negative_ints_sign_extend() {
        let p = Property::from_int(-1, 8);
        assert_eq!(p.to_string(), "11111111");
    }

    #[test]
    fn string_is_not_an_int() {
        let err = Property::string("abc").as_int64().unwrap_err();
        assert!(err.message().contains("is_string"));
    }

    #[test]
    fn extract_pads() {
        let p = Property::from_int(0b11, 2);
        let e = p.extract(1, 3, PropertyState::Sx).unwrap();
        assert_eq!(e.to_string(), "xx1");
    }

    #[test]
    fn as_bool_follows_content() {
        assert!(Property::from_int(2, 4).as_bool());
        assert!(!Property::from_int(0, 4).as_bool());
        assert!(Property::string("x").as_bool());
        assert!(!Property::string("").as_bool());
    }
}
