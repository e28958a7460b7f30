//! Communications Device Class functional descriptors.

use num_enum::FromPrimitive;

use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::usb::{BCDVersion, ClassHeader};

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum CdcSubtype {
    Header = 0,
    CallManagement = 1,
    AbstractControlModel = 2,
    DirectLineManagement = 3,
    TelephoneRinger = 4,
    TelephoneCallLineState = 5,
    Union = 6,
    CountrySelection = 7,
    TelephoneOperationalModes = 8,
    UsbTerminal = 9,
    #[num_enum(catch_all)]
    Other(u8),
}

/// Name of a CDC functional descriptor subtype as shown in listings.
pub struct CdcSubtypeName(pub u8);

impl std::fmt::Display for CdcSubtypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use CdcSubtype::*;
        match CdcSubtype::from(self.0) {
            Header => write!(f, "header"),
            CallManagement => write!(f, "Call_Management"),
            AbstractControlModel => write!(f, "Abstract_Control_Model"),
            Union => write!(f, "union"),
            _ => write!(f, "CDC_subtype_{}", self.0),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CdcHeader {
    pub header: ClassHeader,
    pub cdc_version: BCDVersion,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CallManagement {
    pub header: ClassHeader,
    pub capabilities: u8,
    pub data_interface: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AbstractControl {
    pub header: ClassHeader,
    pub capabilities: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Union {
    pub header: ClassHeader,
    pub master_interface: u8,
    pub slave_interfaces: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cdc {
    Header(CdcHeader),
    CallManagement(CallManagement),
    Acm(AbstractControl),
    Union(Union),
}

impl Cdc {
    /// Decode a CS_INTERFACE descriptor of a CDC interface.
    ///
    /// Returns `None` for subtypes without a decoder.
    pub fn read(cursor: &mut ByteCursor) -> Result<Option<Self>, DecodeError> {
        let header = ClassHeader::read(cursor)?;
        Ok(Some(match CdcSubtype::from(header.subtype) {
            CdcSubtype::Header => Cdc::Header(CdcHeader {
                header,
                cdc_version: BCDVersion::from(cursor.read_u16_le()?),
            }),
            CdcSubtype::CallManagement => Cdc::CallManagement(CallManagement {
                header,
                capabilities: cursor.read_u8()?,
                data_interface: cursor.read_u8()?,
            }),
            CdcSubtype::AbstractControlModel => Cdc::Acm(AbstractControl {
                header,
                capabilities: cursor.read_u8()?,
            }),
            CdcSubtype::Union => {
                let master_interface = cursor.read_u8()?;
                let count = (header.length as usize).saturating_sub(4);
                Cdc::Union(Union {
                    header,
                    master_interface,
                    slave_interfaces: cursor.read_array(count)?,
                })
            },
            _ => return Ok(None),
        }))
    }

    pub fn header(&self) -> &ClassHeader {
        match self {
            Cdc::Header(d) => &d.header,
            Cdc::CallManagement(d) => &d.header,
            Cdc::Acm(d) => &d.header,
            Cdc::Union(d) => &d.header,
        }
    }
}
