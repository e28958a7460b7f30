//! Splitting a configuration buffer into its descriptors.

use log::warn;

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, Malformation};
use crate::usb::{ConfigDescriptor, DescriptorType};

/// One descriptor as found in the buffer, before classification.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawDescriptor<'bytes> {
    /// Offset of the bLength byte within the walked buffer.
    pub offset: usize,
    pub length: u8,
    pub descriptor_type: u8,
    /// Present only for class-specific descriptor types.
    pub subtype: Option<u8>,
    /// The whole descriptor, header included.
    pub bytes: &'bytes [u8],
}

impl<'bytes> RawDescriptor<'bytes> {
    /// Cursor over the whole descriptor, header included.
    pub fn cursor(&self) -> ByteCursor<'bytes> {
        ByteCursor::at(self.bytes, self.offset)
    }

    /// The bytes following the two header bytes.
    pub fn payload(&self) -> &'bytes [u8] {
        &self.bytes[2 ..]
    }

    pub fn kind(&self) -> DescriptorType {
        DescriptorType::from(self.descriptor_type)
    }
}

/// Iterator over the descriptors in a bounded byte range.
///
/// Yields an error at most once, after which it is exhausted.
pub struct DescriptorStream<'bytes> {
    cursor: ByteCursor<'bytes>,
    failed: bool,
}

impl<'bytes> DescriptorStream<'bytes> {
    pub fn new(bytes: &'bytes [u8]) -> Self {
        DescriptorStream {
            cursor: ByteCursor::new(bytes),
            failed: false,
        }
    }

    /// Number of bytes consumed by the descriptors yielded so far.
    pub fn consumed(&self) -> usize {
        self.cursor.consumed()
    }

    fn next_descriptor(&mut self) -> Result<RawDescriptor<'bytes>, DecodeError> {
        let offset = self.cursor.position();
        let malformed = |problem| DecodeError::MalformedDescriptor {
            offset, problem
        };
        let length = self.cursor.peek_length()?;
        let remaining = self.cursor.remaining();
        match length {
            0 => return Err(malformed(Malformation::ZeroLength)),
            1 => return Err(malformed(Malformation::NoType)),
            n if n as usize > remaining =>
                return Err(malformed(
                    Malformation::Overrun { length, remaining })),
            _ => {}
        }
        let bytes = self.cursor.read(length as usize)?;
        let descriptor_type = bytes[1];
        let subtype = if DescriptorType::from(descriptor_type).is_class_specific() {
            bytes.get(2).copied()
        } else {
            None
        };
        Ok(RawDescriptor {
            offset,
            length,
            descriptor_type,
            subtype,
            bytes,
        })
    }
}

impl<'bytes> Iterator for DescriptorStream<'bytes> {
    type Item = Result<RawDescriptor<'bytes>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.is_empty() {
            return None;
        }
        let result = self.next_descriptor();
        self.failed = result.is_err();
        Some(result)
    }
}

impl std::iter::FusedIterator for DescriptorStream<'_> {}

/// Disagreement between wTotalLength and the bytes actually captured.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoundaryMismatch {
    pub declared: u16,
    pub available: usize,
}

/// A configuration descriptor together with everything it bounds.
#[derive(Clone, Debug)]
pub struct ConfigurationBytes<'bytes> {
    pub header: ConfigDescriptor,
    bytes: &'bytes [u8],
    pub mismatch: Option<BoundaryMismatch>,
}

impl<'bytes> ConfigurationBytes<'bytes> {
    pub fn parse(bytes: &'bytes [u8]) -> Result<Self, DecodeError> {
        let mut cursor = ByteCursor::new(bytes);
        let malformed = |problem| DecodeError::MalformedDescriptor {
            offset: 0, problem
        };
        match cursor.peek_length()? {
            0 => return Err(malformed(Malformation::ZeroLength)),
            1 => return Err(malformed(Malformation::NoType)),
            _ => {}
        }
        let header = cursor.read_pod::<ConfigDescriptor>()?;
        if DescriptorType::from(header.descriptor_type) != DescriptorType::Configuration {
            return Err(malformed(Malformation::NotConfiguration {
                descriptor_type: header.descriptor_type
            }));
        }
        let declared = header.total_length.get();
        if (declared as usize) < (header.length as usize).max(ConfigDescriptor::LENGTH) {
            return Err(malformed(Malformation::TotalLength { declared }));
        }
        let available = bytes.len();
        let mismatch = if declared as usize != available {
            warn!("configuration declares wTotalLength {declared} \
                   but {available} bytes were captured");
            Some(BoundaryMismatch { declared, available })
        } else {
            None
        };
        let bound = available.min(declared as usize);
        Ok(ConfigurationBytes {
            header,
            bytes: &bytes[.. bound],
            mismatch,
        })
    }

    /// The bytes the walk will cover.
    pub fn bytes(&self) -> &'bytes [u8] {
        self.bytes
    }

    /// All descriptors, starting with the configuration descriptor itself.
    pub fn descriptors(&self) -> DescriptorStream<'bytes> {
        DescriptorStream::new(self.bytes)
    }
}
