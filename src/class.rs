//! Context-dependent classification of raw descriptors.

use log::{debug, info};

use crate::audio::{AudioControl, AudioStreaming, StreamingEndpoint};
use crate::cdc::Cdc;
use crate::error::DecodeError;
use crate::hid::HidDescriptor;
use crate::stream::RawDescriptor;
use crate::usb::{
    audio_subclass,
    class_code,
    ConfigDescriptor,
    DescriptorType,
    DeviceDescriptor,
    Endpoint,
    EndpointDescriptor,
    HubDescriptor,
    InterfaceDescriptor,
    StringId,
};

/// Class state accumulated while walking a configuration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassContext {
    pub device_class: u8,
    pub device_subclass: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    /// Count of interface descriptors seen in this configuration, less one.
    pub interface_index: Option<u8>,
    /// bInterfaceNumber of the most recent interface descriptor.
    pub interface_number: Option<u8>,
}

impl ClassContext {
    /// Starting context for walking the configurations of `device`.
    pub fn for_device(device: &DeviceDescriptor) -> Self {
        ClassContext {
            device_class: device.device_class,
            device_subclass: device.device_subclass,
            interface_class: device.device_class,
            interface_subclass: device.device_subclass,
            interface_index: None,
            interface_number: None,
        }
    }

    fn is_audio(&self, subclass: u8) -> bool {
        self.interface_class == class_code::AUDIO &&
            self.interface_subclass == subclass
    }

    fn configuration(self) -> Self {
        ClassContext {
            interface_index: None,
            interface_number: None,
            .. self
        }
    }

    fn interface(self, desc: &InterfaceDescriptor) -> Self {
        let mut next = ClassContext {
            interface_index: Some(self.interface_index
                .map_or(0, |i| i.saturating_add(1))),
            interface_number: Some(desc.interface_number.0),
            .. self
        };
        if desc.interface_class != class_code::UNSPECIFIED {
            next.interface_class = desc.interface_class;
            next.interface_subclass = desc.interface_subclass;
        }
        next
    }
}

/// Header of a descriptor that no decoder claimed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UnknownDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub subtype: Option<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypedDescriptor {
    Device(DeviceDescriptor),
    Configuration(ConfigDescriptor),
    Interface(InterfaceDescriptor),
    Endpoint(Endpoint),
    Hub(HubDescriptor),
    Hid(HidDescriptor),
    AudioControl(AudioControl),
    AudioStreaming(AudioStreaming),
    AudioStreamingEndpoint(StreamingEndpoint),
    Cdc(Cdc),
    Unknown(UnknownDescriptor),
}

impl TypedDescriptor {
    /// String descriptor indices referenced by this descriptor.
    pub fn string_ids(&self) -> Vec<StringId> {
        match self {
            TypedDescriptor::Device(d) => d.string_ids().to_vec(),
            TypedDescriptor::Configuration(c) => vec![c.config_str_id],
            TypedDescriptor::Interface(i) => vec![i.interface_str_id],
            TypedDescriptor::AudioControl(ac) => ac.string_ids(),
            _ => vec![],
        }
    }
}

/// Decode `raw` according to `context`, returning the context to use for
/// the next descriptor.
pub fn classify(raw: &RawDescriptor, context: &ClassContext)
    -> Result<(TypedDescriptor, ClassContext), DecodeError>
{
    let mut cursor = raw.cursor();
    let context = *context;
    // Class-specific dispatch needs a bDescriptorSubtype byte.
    let has_subtype = raw.subtype.is_some();
    let decoded = match raw.kind() {
        DescriptorType::Device =>
            Some(TypedDescriptor::Device(DeviceDescriptor::read(&mut cursor)?)),
        DescriptorType::Configuration => {
            let config = ConfigDescriptor::read(&mut cursor)?;
            return Ok((TypedDescriptor::Configuration(config),
                       context.configuration()))
        },
        DescriptorType::Interface => {
            let iface = InterfaceDescriptor::read(&mut cursor)?;
            let next = context.interface(&iface);
            return Ok((TypedDescriptor::Interface(iface), next))
        },
        DescriptorType::Endpoint =>
            Some(TypedDescriptor::Endpoint(EndpointDescriptor::read(&mut cursor)?)),
        DescriptorType::Hub =>
            Some(TypedDescriptor::Hub(HubDescriptor::read(&mut cursor)?)),
        DescriptorType::ClassDevice if context.interface_class == class_code::HID =>
            Some(TypedDescriptor::Hid(HidDescriptor::read(&mut cursor)?)),
        DescriptorType::ClassInterface if has_subtype && context.is_audio(audio_subclass::CONTROL) =>
            AudioControl::read(&mut cursor)?.map(TypedDescriptor::AudioControl),
        DescriptorType::ClassInterface if has_subtype && context.is_audio(audio_subclass::STREAMING) =>
            AudioStreaming::read(&mut cursor)?.map(TypedDescriptor::AudioStreaming),
        DescriptorType::ClassInterface if has_subtype && context.interface_class == class_code::CDC =>
            Cdc::read(&mut cursor)?.map(TypedDescriptor::Cdc),
        DescriptorType::ClassEndpoint if has_subtype && context.is_audio(audio_subclass::STREAMING) =>
            StreamingEndpoint::read(&mut cursor)?
                .map(TypedDescriptor::AudioStreamingEndpoint),
        _ => None,
    };
    let descriptor = match decoded {
        Some(descriptor) => {
            if !cursor.is_empty() {
                debug!("ignoring {} trailing bytes of descriptor at offset {}",
                       cursor.remaining(), raw.offset);
            }
            descriptor
        },
        None => {
            info!("unknown descriptor type {} subtype {:?} at offset {} \
                   (class {}/{})",
                  raw.descriptor_type, raw.subtype, raw.offset,
                  context.interface_class, context.interface_subclass);
            TypedDescriptor::Unknown(UnknownDescriptor {
                length: raw.length,
                descriptor_type: raw.descriptor_type,
                subtype: raw.subtype,
            })
        }
    };
    Ok((descriptor, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::DescriptorStream;

    fn raw(bytes: &[u8]) -> RawDescriptor<'_> {
        DescriptorStream::new(bytes).next().unwrap().unwrap()
    }

    fn context(class: u8, subclass: u8) -> ClassContext {
        ClassContext {
            interface_class: class,
            interface_subclass: subclass,
            interface_index: Some(0),
            interface_number: Some(0),
            .. ClassContext::default()
        }
    }

    const UNION: [u8; 6] = [0x06, 0x24, 0x06, 0x00, 0x01, 0x02];

    #[test]
    fn test_cs_interface_depends_on_class() {
        let (desc, _) = classify(&raw(&UNION), &context(class_code::HID, 0)).unwrap();
        assert_eq!(desc, TypedDescriptor::Unknown(UnknownDescriptor {
            length: 6, descriptor_type: 0x24, subtype: Some(6)
        }));
        let (desc, _) = classify(&raw(&UNION), &context(class_code::CDC, 2)).unwrap();
        match desc {
            TypedDescriptor::Cdc(Cdc::Union(u)) => {
                assert_eq!(u.slave_interfaces.len(), UNION.len() - 4);
            },
            other => panic!("Expected Union but got {:?}", other),
        }
    }

    #[test]
    fn test_interface_updates_context() {
        let iface = [0x09, 0x04, 0x02, 0x00, 0x01, 0x03, 0x01, 0x02, 0x00];
        let start = ClassContext::default();
        let (_, next) = classify(&raw(&iface), &start).unwrap();
        assert_eq!(next.interface_class, 3);
        assert_eq!(next.interface_subclass, 1);
        assert_eq!(next.interface_index, Some(0));
        assert_eq!(next.interface_number, Some(2));

        // Class zero keeps the previous class.
        let unspecified = [0x09, 0x04, 0x03, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00];
        let (_, after) = classify(&raw(&unspecified), &next).unwrap();
        assert_eq!(after.interface_class, 3);
        assert_eq!(after.interface_subclass, 1);
        assert_eq!(after.interface_index, Some(1));
        assert_eq!(after.interface_number, Some(3));

        let config = [0x09, 0x02, 0x09, 0x00, 0x01, 0x01, 0x00, 0x80, 0x32];
        let (desc, reset) = classify(&raw(&config), &after).unwrap();
        assert!(matches!(desc, TypedDescriptor::Configuration(_)));
        assert_eq!(reset.interface_index, None);
        assert_eq!(reset.interface_class, 3);
    }

    #[test]
    fn test_hid_only_under_hid_interface() {
        let hid = [0x09, 0x21, 0x11, 0x01, 0x00, 0x01, 0x22, 0x34, 0x00];
        let (desc, _) = classify(&raw(&hid), &context(class_code::HID, 1)).unwrap();
        match desc {
            TypedDescriptor::Hid(h) => assert_eq!(h.reports().count(), 1),
            other => panic!("Expected Hid but got {:?}", other),
        }
        let (desc, _) = classify(&raw(&hid), &context(class_code::AUDIO, 1)).unwrap();
        assert!(matches!(desc, TypedDescriptor::Unknown(_)));
    }

    #[test]
    fn test_audio_streaming_endpoint() {
        let ep = [0x07, 0x25, 0x01, 0x00, 0x00, 0x00, 0x00];
        let streaming = context(class_code::AUDIO, audio_subclass::STREAMING);
        let (desc, _) = classify(&raw(&ep), &streaming).unwrap();
        assert!(matches!(desc, TypedDescriptor::AudioStreamingEndpoint(_)));
        let control = context(class_code::AUDIO, audio_subclass::CONTROL);
        let (desc, _) = classify(&raw(&ep), &control).unwrap();
        assert!(matches!(desc, TypedDescriptor::Unknown(_)));
    }

    #[test]
    fn test_short_record_is_truncated() {
        let iface = [0x05, 0x04, 0x00, 0x00, 0x01];
        match classify(&raw(&iface), &ClassContext::default()) {
            Err(DecodeError::Truncated { offset: 0, needed: 9, remaining: 5 }) => {},
            other => panic!("Expected Truncated but got {:?}", other),
        }
    }

    #[test]
    fn test_class_descriptor_without_subtype() {
        let short = [0x02, 0x24];
        for ctx in [context(class_code::CDC, 2),
                    context(class_code::AUDIO, audio_subclass::CONTROL),
                    context(class_code::AUDIO, audio_subclass::STREAMING)] {
            let (desc, _) = classify(&raw(&short), &ctx).unwrap();
            assert_eq!(desc, TypedDescriptor::Unknown(UnknownDescriptor {
                length: 2, descriptor_type: 0x24, subtype: None
            }));
        }
        let streaming = context(class_code::AUDIO, audio_subclass::STREAMING);
        let (desc, _) = classify(&raw(&[0x02, 0x25]), &streaming).unwrap();
        assert!(matches!(desc, TypedDescriptor::Unknown(UnknownDescriptor {
            subtype: None, ..
        })));
    }

    #[test]
    fn test_walk_from_device_uses_device_class() {
        let mut device = crate::usb::DeviceDescriptor::default();
        device.device_class = class_code::HID;
        let ctx = ClassContext::for_device(&device);
        let hid = [0x06, 0x21, 0x00, 0x01, 0x00, 0x00];
        let (desc, _) = classify(&raw(&hid), &ctx).unwrap();
        assert!(matches!(desc, TypedDescriptor::Hid(_)));
    }
}
