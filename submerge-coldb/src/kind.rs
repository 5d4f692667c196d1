// The type registry (spec.md §4.1): the canonical mapping between a
// (kind, width-in-bits) pair and a concrete numeric type, plus the
// identifier-width rule for the 'U' text kind.

use crate::error::{coldb_err, Kind as EKind};
use submerge_base::Result;

/// One of the three numeric kinds a column payload can hold on disk.
/// The fourth wire kind code, `'U'` (fixed-width text), is never a column
/// kind — it only appears as the type of the identifier field and is
/// handled separately by `text_char_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Signed,
    Unsigned,
    Float,
}

impl Kind {
    pub fn to_char(self) -> char {
        match self {
            Kind::Signed => 'i',
            Kind::Unsigned => 'u',
            Kind::Float => 'f',
        }
    }

    pub fn to_byte(self) -> u8 {
        self.to_char() as u8
    }

    pub fn from_char(c: char) -> Result<Self> {
        match c {
            'i' => Ok(Kind::Signed),
            'u' => Ok(Kind::Unsigned),
            'f' => Ok(Kind::Float),
            _ => Err(coldb_err(
                EKind::UnsupportedKind,
                format!("kind code '{}' not in {{i,u,f}}", c),
            )),
        }
    }

    pub fn from_byte(b: u8) -> Result<Self> {
        Self::from_char(kind_code_from_int(b)?)
    }

    /// Validates that `bits` is an admissible width for this kind, per the
    /// canonical table in spec.md §4.1: integers allow 8/16/32/64, floats
    /// allow only 16/32/64.
    pub fn validate_bits(self, bits: u32) -> Result<()> {
        let ok = match self {
            Kind::Signed | Kind::Unsigned => matches!(bits, 8 | 16 | 32 | 64),
            Kind::Float => matches!(bits, 16 | 32 | 64),
        };
        if ok {
            Ok(())
        } else {
            Err(coldb_err(
                EKind::UnsupportedSize,
                format!("kind {:?} has no numeric type of width {} bits", self, bits),
            ))
        }
    }
}

/// `kind_code_to_int`: identity on a byte already in range, ASCII code-point
/// conversion from a `char`.
pub fn kind_code_to_int(c: char) -> Result<u8> {
    u8::try_from(c as u32).map_err(|_| {
        coldb_err(
            EKind::CharConversion,
            format!("char '{}' has no single-byte ASCII representation", c),
        )
    })
}

/// `kind_code_from_int`: ASCII code-point conversion from a byte to a `char`.
pub fn kind_code_from_int(b: u8) -> Result<char> {
    Ok(b as char)
}

/// Validates `bits` for the `'U'` (fixed-width text) kind used only by
/// identifiers, returning the character length (`bits / 32`).
pub fn text_char_len(bits: i64) -> Result<usize> {
    if bits <= 0 {
        return Err(coldb_err(
            EKind::SizeNotPositive,
            "text width in bits must be positive",
        ));
    }
    if bits % 32 != 0 {
        return Err(coldb_err(
            EKind::StringBitsNotMultipleOf32,
            format!("text width {} bits is not a multiple of 32", bits),
        ));
    }
    Ok((bits / 32) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_type_table() {
        assert!(Kind::Signed.validate_bits(8).is_ok());
        assert!(Kind::Signed.validate_bits(16).is_ok());
        assert!(Kind::Signed.validate_bits(32).is_ok());
        assert!(Kind::Signed.validate_bits(64).is_ok());
        assert!(Kind::Unsigned.validate_bits(8).is_ok());
        assert!(Kind::Float.validate_bits(16).is_ok());
        assert!(Kind::Float.validate_bits(32).is_ok());
        assert!(Kind::Float.validate_bits(64).is_ok());
        assert!(Kind::Float.validate_bits(8).is_err());
        assert!(Kind::Signed.validate_bits(24).is_err());
    }

    #[test]
    fn text_width_rules() {
        assert_eq!(text_char_len(128).unwrap(), 4);
        assert!(text_char_len(0).is_err());
        assert!(text_char_len(-32).is_err());
        assert!(text_char_len(33).is_err());
    }

    #[test]
    fn kind_code_round_trip() {
        for c in ['i', 'u', 'f', 'U'] {
            let b = kind_code_to_int(c).unwrap();
            assert_eq!(kind_code_from_int(b).unwrap(), c);
        }
    }

    #[test]
    fn unsupported_kind_rejected() {
        assert!(Kind::from_char('x').is_err());
    }
}
