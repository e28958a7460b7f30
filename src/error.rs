use thiserror::Error;

/// Reason a descriptor header could not be accepted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Malformation {
    /// bLength of zero would never advance the walk.
    ZeroLength,
    /// bLength of one leaves no room for a type byte.
    NoType,
    /// bLength claims more bytes than remain in the enclosing buffer.
    Overrun { length: u8, remaining: usize },
    /// wTotalLength is smaller than the configuration header itself.
    TotalLength { declared: u16 },
    /// A configuration buffer that does not start with a configuration
    /// descriptor.
    NotConfiguration { descriptor_type: u8 },
}

impl std::fmt::Display for Malformation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Malformation::*;
        match self {
            ZeroLength => write!(f, "bLength is zero"),
            NoType => write!(f, "bLength of 1 cannot hold a type"),
            Overrun { length, remaining } => write!(f,
                "bLength {length} exceeds remaining {remaining} bytes"),
            TotalLength { declared } => write!(f,
                "wTotalLength {declared} is shorter than the header"),
            NotConfiguration { descriptor_type } => write!(f,
                "expected a configuration descriptor, found type {descriptor_type}"),
        }
    }
}

/// Error type returned by the decoding engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Ran out of bytes before a required read.
    #[error("truncated at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    Truncated { offset: usize, needed: usize, remaining: usize },
    /// A descriptor declared an impossible length.
    #[error("malformed descriptor at offset {offset}: {problem}")]
    MalformedDescriptor { offset: usize, problem: Malformation },
    /// End Collection with no open Collection.
    #[error("end collection at offset {offset} with no open collection")]
    CollectionUnderflow { offset: usize },
}
