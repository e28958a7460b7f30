use num_enum::FromPrimitive;

use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::usb::BCDVersion;

/// Descriptor types a HID descriptor can list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum HidDescriptorType {
    Hid = 0x21,
    Report = 0x22,
    Physical = 0x23,
    #[num_enum(catch_all)]
    Other(u8),
}

impl From<HidDescriptorType> for u8 {
    fn from(kind: HidDescriptorType) -> u8 {
        match kind {
            HidDescriptorType::Hid => 0x21,
            HidDescriptorType::Report => 0x22,
            HidDescriptorType::Physical => 0x23,
            HidDescriptorType::Other(value) => value,
        }
    }
}

/// One (type, length) entry of a HID descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HidClassDescriptor {
    pub kind: HidDescriptorType,
    pub length: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HidDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub hid_version: BCDVersion,
    pub country_code: u8,
    pub descriptors: Vec<HidClassDescriptor>,
}

impl HidDescriptor {
    pub fn read(cursor: &mut ByteCursor) -> Result<Self, DecodeError> {
        let length = cursor.read_u8()?;
        let descriptor_type = cursor.read_u8()?;
        let hid_version = BCDVersion::from(cursor.read_u16_le()?);
        let country_code = cursor.read_u8()?;
        let count = cursor.read_u8()?;
        let mut descriptors = Vec::with_capacity(count as usize);
        for _ in 0 .. count {
            descriptors.push(HidClassDescriptor {
                kind: HidDescriptorType::from(cursor.read_u8()?),
                length: cursor.read_u16_le()?,
            });
        }
        Ok(HidDescriptor {
            length,
            descriptor_type,
            hid_version,
            country_code,
            descriptors,
        })
    }

    /// Entries of type Report, with their index in the descriptor list.
    pub fn reports(&self) -> impl Iterator<Item = (u8, u16)> + '_ {
        self.descriptors
            .iter()
            .enumerate()
            .filter(|(_, d)| d.kind == HidDescriptorType::Report)
            .map(|(i, d)| (i as u8, d.length))
    }
}
