// The error taxonomy for this crate. Each variant corresponds to one of the
// named failure modes a caller may need to branch on; everything else is
// surfaced as an opaque `submerge_base::Error` via `?`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    ShapeMismatch,
    UnsupportedKind,
    UnsupportedSize,
    SizeNotPositive,
    StringBitsNotMultipleOf32,
    CompressionModeInvalid,
    CompressionKindInvalid,
    NegativeUnsigned,
    ExceedsU64,
    ExceedsI64,
    NotInteger,
    NegativeDecimals,
    CouldNotAcquireLock,
    CharConversion,
    IdentifierByteRepresentation,
    HashTableNotImplemented,
    DuplicateIdentifier,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::ShapeMismatch => "ShapeMismatch",
            Kind::UnsupportedKind => "UnsupportedKind",
            Kind::UnsupportedSize => "UnsupportedSize",
            Kind::SizeNotPositive => "SizeNotPositive",
            Kind::StringBitsNotMultipleOf32 => "StringBitsNotMultipleOf32",
            Kind::CompressionModeInvalid => "CompressionModeInvalid",
            Kind::CompressionKindInvalid => "CompressionKindInvalid",
            Kind::NegativeUnsigned => "NegativeUnsigned",
            Kind::ExceedsU64 => "ExceedsU64",
            Kind::ExceedsI64 => "ExceedsI64",
            Kind::NotInteger => "NotInteger",
            Kind::NegativeDecimals => "NegativeDecimals",
            Kind::CouldNotAcquireLock => "CouldNotAcquireLock",
            Kind::CharConversion => "CharConversion",
            Kind::IdentifierByteRepresentation => "IdentifierByteRepresentation",
            Kind::HashTableNotImplemented => "HashTableNotImplemented",
            Kind::DuplicateIdentifier => "DuplicateIdentifier",
        }
    }
}

#[derive(Debug)]
pub struct ColdbError {
    kind: Kind,
    msg: String,
}

impl ColdbError {
    pub fn kind(&self) -> Kind {
        self.kind
    }
}

impl fmt::Display for ColdbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.msg)
    }
}

impl std::error::Error for ColdbError {
    fn description(&self) -> &str {
        &self.msg
    }
}

pub fn coldb_err(kind: Kind, msg: impl Into<String>) -> submerge_base::Error {
    submerge_base::Error::new(ColdbError {
        kind,
        msg: msg.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let e = ColdbError {
            kind: Kind::ShapeMismatch,
            msg: "row_count 3 != 4".into(),
        };
        assert_eq!(format!("{}", e), "ShapeMismatch: row_count 3 != 4");
    }
}
