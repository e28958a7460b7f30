use bytemuck_derive::{Pod, Zeroable};
use derive_more::{From, Into, Display};
use log::{debug, warn};
use num_enum::{IntoPrimitive, FromPrimitive};

use crate::cursor::ByteCursor;
use crate::error::DecodeError;

/// Interface and device class codes referenced by the classifier.
pub mod class_code {
    pub const UNSPECIFIED: u8 = 0x00;
    pub const AUDIO: u8 = 0x01;
    pub const CDC: u8 = 0x02;
    pub const HID: u8 = 0x03;
    pub const HUB: u8 = 0x09;
}

/// Audio class subclass codes.
pub mod audio_subclass {
    pub const CONTROL: u8 = 0x01;
    pub const STREAMING: u8 = 0x02;
}

/// Little-endian 16-bit field, as laid out on the wire.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(transparent)]
pub struct Word(pub [u8; 2]);

impl Word {
    pub fn get(self) -> u16 {
        u16::from_le_bytes(self.0)
    }
}

impl std::fmt::Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default,
         Pod, Zeroable, From, Into, Display)]
#[repr(transparent)]
pub struct StringId(pub u8);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default,
         Pod, Zeroable, From, Into, Display)]
#[repr(transparent)]
pub struct InterfaceNum(pub u8);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default,
         Pod, Zeroable, From, Into, Display)]
#[repr(transparent)]
pub struct EndpointNum(pub u8);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default,
         Pod, Zeroable, From, Into, Display)]
#[repr(transparent)]
pub struct EndpointAddr(pub u8);

impl EndpointAddr {
    pub fn number(&self) -> EndpointNum {
        EndpointNum(self.0 & 0x7F)
    }

    pub fn direction(&self) -> Direction {
        if self.0 & 0x80 == 0 {
            Direction::Out
        } else {
            Direction::In
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default,
         Pod, Zeroable, From, Into, Display)]
#[repr(transparent)]
pub struct EndpointAttr(pub u8);

impl EndpointAttr {
    pub fn endpoint_type(&self) -> EndpointType {
        EndpointType::from(self.0 & 0x03)
    }

    pub fn sync_type(&self) -> SyncType {
        SyncType::from((self.0 >> 2) & 0x03)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum EndpointType {
    #[default]
    Control     = 0,
    Isochronous = 1,
    Bulk        = 2,
    Interrupt   = 3,
}

impl std::fmt::Display for EndpointType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Control => write!(f, "control"),
            Self::Isochronous => write!(f, "isochronous"),
            Self::Bulk => write!(f, "bulk"),
            Self::Interrupt => write!(f, "interrupt"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum SyncType {
    #[default]
    None     = 0,
    Async    = 1,
    Adaptive = 2,
    Sync     = 3,
}

impl SyncType {
    /// Suffix appended to the transfer type name.
    pub fn suffix(self) -> &'static str {
        const STRINGS: [&str; 4] = ["", "-async", "-adaptive", "-sync"];
        STRINGS[self as usize]
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Direction {
    #[default]
    Out = 0,
    In = 1,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", match self {
            Direction::In  => "in",
            Direction::Out => "out"})
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct BCDVersion {
    pub minor: u8,
    pub major: u8,
}

impl std::fmt::Display for BCDVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:x}.{:02x}", self.major, self.minor)
    }
}

impl From<u16> for BCDVersion {
    fn from(value: u16) -> BCDVersion {
        BCDVersion {
            minor: value as u8,
            major: (value >> 8) as u8,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum DescriptorType {
    Device = 0x01,
    Configuration = 0x02,
    String = 0x03,
    Interface = 0x04,
    Endpoint = 0x05,
    DeviceQualifier = 0x06,
    OtherSpeedConfiguration = 0x07,
    InterfacePower = 0x08,
    ClassUndefined = 0x20,
    /// Also the HID descriptor type.
    ClassDevice = 0x21,
    ClassConfiguration = 0x22,
    ClassString = 0x23,
    ClassInterface = 0x24,
    ClassEndpoint = 0x25,
    Hub = 0x29,
    #[num_enum(catch_all)]
    Other(u8),
}

impl DescriptorType {
    pub fn name(self) -> Option<&'static str> {
        use DescriptorType::*;
        match self {
            Device => Some("device"),
            Configuration => Some("config"),
            String => Some("string"),
            Interface => Some("interface"),
            Endpoint => Some("endpoint"),
            ClassUndefined => Some("cs_undefined"),
            ClassDevice => Some("cs_device"),
            ClassConfiguration => Some("cs_config"),
            ClassString => Some("cs_string"),
            ClassInterface => Some("cs_interface"),
            ClassEndpoint => Some("cs_endpoint"),
            Hub => Some("hub"),
            _ => None,
        }
    }

    /// Whether descriptors of this type carry a bDescriptorSubtype.
    pub fn is_class_specific(self) -> bool {
        use DescriptorType::*;
        matches!(self, ClassDevice | ClassInterface | ClassEndpoint)
    }
}

/// Descriptor type rendered as `name(number)`, or just the number.
pub struct TypeName(pub u8);

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match DescriptorType::from(self.0).name() {
            Some(name) => write!(f, "{}({})", name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// The three header bytes shared by all class-specific descriptors.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ClassHeader {
    pub length: u8,
    pub descriptor_type: u8,
    pub subtype: u8,
}

impl ClassHeader {
    pub fn read(cursor: &mut ByteCursor) -> Result<Self, DecodeError> {
        cursor.read_pod::<ClassHeader>()
    }
}

fn check_type(found: u8, expected: DescriptorType, what: &str) {
    if DescriptorType::from(found) != expected {
        warn!("{what} descriptor has bDescriptorType {found}");
    }
}

fn ignore_trailing(cursor: &ByteCursor, what: &str) {
    if !cursor.is_empty() {
        debug!("ignoring {} trailing bytes of {what} descriptor at offset {}",
               cursor.remaining(), cursor.position());
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct DeviceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub usb_version: BCDVersion,
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    pub max_packet_size_0: u8,
    pub vendor_id: Word,
    pub product_id: Word,
    pub device_version: BCDVersion,
    pub manufacturer_str_id: StringId,
    pub product_str_id: StringId,
    pub serial_str_id: StringId,
    pub num_configurations: u8
}

impl DeviceDescriptor {
    pub const LENGTH: usize = 18;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::read(&mut ByteCursor::new(bytes))
    }

    pub fn read(cursor: &mut ByteCursor) -> Result<Self, DecodeError> {
        let desc = cursor.read_pod::<DeviceDescriptor>()?;
        check_type(desc.descriptor_type, DescriptorType::Device, "device");
        ignore_trailing(cursor, "device");
        Ok(desc)
    }

    pub fn string_ids(&self) -> [StringId; 3] {
        [self.manufacturer_str_id, self.product_str_id, self.serial_str_id]
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ConfigDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub total_length: Word,
    pub num_interfaces: u8,
    pub config_value: u8,
    pub config_str_id: StringId,
    pub attributes: u8,
    pub max_power: u8
}

impl ConfigDescriptor {
    pub const LENGTH: usize = 9;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::read(&mut ByteCursor::new(bytes))
    }

    pub fn read(cursor: &mut ByteCursor) -> Result<Self, DecodeError> {
        let desc = cursor.read_pod::<ConfigDescriptor>()?;
        check_type(desc.descriptor_type,
                   DescriptorType::Configuration, "configuration");
        ignore_trailing(cursor, "configuration");
        Ok(desc)
    }

    /// Maximum power draw in milliamps.
    pub fn max_power_ma(&self) -> u16 {
        self.max_power as u16 * 2
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct InterfaceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub interface_number: InterfaceNum,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
    pub interface_str_id: StringId,
}

impl InterfaceDescriptor {
    pub const LENGTH: usize = 9;

    pub fn read(cursor: &mut ByteCursor) -> Result<Self, DecodeError> {
        let desc = cursor.read_pod::<InterfaceDescriptor>()?;
        check_type(desc.descriptor_type, DescriptorType::Interface, "interface");
        ignore_trailing(cursor, "interface");
        Ok(desc)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct EndpointDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub endpoint_address: EndpointAddr,
    pub attributes: EndpointAttr,
    pub max_packet_size: Word,
    pub interval: u8,
}

/// Extra fields appended to endpoints of audio streaming interfaces.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AudioEndpointFields {
    pub refresh: u8,
    pub synch_address: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub descriptor: EndpointDescriptor,
    pub audio: Option<AudioEndpointFields>,
}

impl EndpointDescriptor {
    pub const LENGTH: usize = 7;

    pub fn read(cursor: &mut ByteCursor) -> Result<Endpoint, DecodeError> {
        let descriptor = cursor.read_pod::<EndpointDescriptor>()?;
        check_type(descriptor.descriptor_type,
                   DescriptorType::Endpoint, "endpoint");
        let audio = if cursor.remaining() >= 2 {
            Some(AudioEndpointFields {
                refresh: cursor.read_u8()?,
                synch_address: cursor.read_u8()?,
            })
        } else {
            None
        };
        ignore_trailing(cursor, "endpoint");
        Ok(Endpoint { descriptor, audio })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HubDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub num_ports: u8,
    pub characteristics: u16,
    pub power_on_to_good: u8,
    pub controller_current: u8,
    pub removable: Vec<u8>,
    pub port_power_mask: Vec<u8>,
}

impl HubDescriptor {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = ByteCursor::new(bytes);
        let length = cursor.peek_length()?;
        let mut body = cursor.take(length as usize)?;
        Self::read(&mut body)
    }

    pub fn read(cursor: &mut ByteCursor) -> Result<Self, DecodeError> {
        let length = cursor.read_u8()?;
        let descriptor_type = cursor.read_u8()?;
        check_type(descriptor_type, DescriptorType::Hub, "hub");
        let num_ports = cursor.read_u8()?;
        let characteristics = cursor.read_u16_le()?;
        let power_on_to_good = cursor.read_u8()?;
        let controller_current = cursor.read_u8()?;
        // One bit per port plus the reserved bit 0.
        let removable = cursor.read_array(num_ports as usize / 8 + 1)?;
        let port_power_mask = cursor.read_rest().to_vec();
        Ok(HubDescriptor {
            length,
            descriptor_type,
            num_ports,
            characteristics,
            power_on_to_good,
            controller_current,
            removable,
            port_power_mask,
        })
    }
}

/// Language ID used when a device lists none.
pub const US_ENGLISH: u16 = 0x0409;

/// Decode string descriptor zero into its list of language IDs.
pub fn decode_languages(bytes: &[u8]) -> Result<Vec<u16>, DecodeError> {
    let mut cursor = string_body(bytes)?;
    let mut languages = Vec::with_capacity(cursor.remaining() / 2);
    while cursor.remaining() >= 2 {
        languages.push(cursor.read_u16_le()?);
    }
    Ok(languages)
}

/// Decode a string descriptor into text.
pub fn decode_string(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut cursor = string_body(bytes)?;
    Ok(UTF16Bytes(cursor.read_rest()).to_string())
}

fn string_body(bytes: &[u8]) -> Result<ByteCursor<'_>, DecodeError> {
    let mut cursor = ByteCursor::new(bytes);
    let length = cursor.read_u8()? as usize;
    check_type(cursor.read_u8()?, DescriptorType::String, "string");
    // Devices may return a buffer longer than bLength.
    let body = length.saturating_sub(2).min(cursor.remaining());
    cursor.take(body)
}

pub struct UTF16Bytes<'b>(pub &'b [u8]);

impl UTF16Bytes<'_> {
    fn chars(&self) -> Vec<u16> {
        self.0.chunks_exact(2)
              .map(|a| u16::from_le_bytes([a[0], a[1]]))
              .collect()
    }
}

impl std::fmt::Display for UTF16Bytes<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let chars = self.chars();
        match String::from_utf16(&chars) {
            Ok(string) => write!(f, "{}", string.escape_default()),
            Err(_) => write!(f, "{}",
                String::from_utf16_lossy(&chars).escape_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_descriptor() {
        let bytes = [
            0x12, 0x01, 0x10, 0x01, 0x09, 0x00, 0x00, 0x08,
            0x51, 0x04, 0x46, 0x20, 0x00, 0x01, 0x00, 0x00,
            0x00, 0x01];
        let mut cursor = ByteCursor::new(&bytes);
        let desc = DeviceDescriptor::read(&mut cursor).unwrap();
        assert!(cursor.is_empty());
        assert_eq!(desc.length, 18);
        assert_eq!(desc.descriptor_type, 1);
        assert_eq!(desc.usb_version, BCDVersion::from(0x0110));
        assert_eq!(desc.usb_version.to_string(), "1.10");
        assert_eq!(desc.device_class, class_code::HUB);
        assert_eq!(desc.device_subclass, 0);
        assert_eq!(desc.device_protocol, 0);
        assert_eq!(desc.max_packet_size_0, 8);
        assert_eq!(desc.vendor_id.get(), 0x0451);
        assert_eq!(desc.product_id.get(), 0x2046);
        assert_eq!(desc.device_version, BCDVersion::from(0x0100));
        assert_eq!(desc.string_ids(), [StringId(0); 3]);
        assert_eq!(desc.num_configurations, 1);
    }

    #[test]
    fn test_short_device_descriptor() {
        let bytes = [0x12, 0x01, 0x10, 0x01];
        assert_eq!(DeviceDescriptor::from_bytes(&bytes),
            Err(DecodeError::Truncated { offset: 0, needed: 18, remaining: 4 }));
    }

    #[test]
    fn test_endpoint_fields() {
        let bytes = [0x07, 0x05, 0x81, 0x03, 0x08, 0x00, 0x0A];
        let ep = EndpointDescriptor::read(&mut ByteCursor::new(&bytes)).unwrap();
        let desc = ep.descriptor;
        assert_eq!(desc.endpoint_address.number(), EndpointNum(1));
        assert_eq!(desc.endpoint_address.direction(), Direction::In);
        assert_eq!(desc.attributes.endpoint_type(), EndpointType::Interrupt);
        assert_eq!(desc.attributes.sync_type().suffix(), "");
        assert_eq!(desc.max_packet_size.get(), 8);
        assert_eq!(ep.audio, None);

        let bytes = [0x09, 0x05, 0x01, 0x09, 0xC0, 0x00, 0x01, 0x00, 0x00];
        let ep = EndpointDescriptor::read(&mut ByteCursor::new(&bytes)).unwrap();
        assert_eq!(ep.descriptor.attributes.endpoint_type(),
                   EndpointType::Isochronous);
        assert_eq!(ep.descriptor.attributes.sync_type(), SyncType::Adaptive);
        assert_eq!(ep.audio, Some(AudioEndpointFields::default()));
    }

    #[test]
    fn test_hub_descriptor() {
        let bytes = [0x09, 0x29, 0x04, 0x09, 0x00, 0x32, 0x64, 0x00, 0xFF];
        let hub = HubDescriptor::from_bytes(&bytes).unwrap();
        assert_eq!(hub.num_ports, 4);
        assert_eq!(hub.characteristics, 0x0009);
        assert_eq!(hub.power_on_to_good, 0x32);
        assert_eq!(hub.controller_current, 0x64);
        assert_eq!(hub.removable, vec![0x00]);
        assert_eq!(hub.port_power_mask, vec![0xFF]);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(TypeName(2).to_string(), "config(2)");
        assert_eq!(TypeName(0x24).to_string(), "cs_interface(36)");
        assert_eq!(TypeName(0x42).to_string(), "66");
        assert!(DescriptorType::from(0x25).is_class_specific());
        assert!(!DescriptorType::from(0x04).is_class_specific());
    }

    #[test]
    fn test_strings() {
        let bytes = [0x04, 0x03, 0x09, 0x04];
        assert_eq!(decode_languages(&bytes), Ok(vec![US_ENGLISH]));
        let bytes = [0x08, 0x03, b'U', 0, b'S', 0, b'B', 0, 0xAA, 0xBB];
        assert_eq!(decode_string(&bytes).unwrap(), "USB");
    }
}
