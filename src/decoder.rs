//! Walking a whole device through a descriptor source.

use anyhow::{Context, Error};
use log::{debug, warn};

use crate::class::{classify, ClassContext, TypedDescriptor};
use crate::error::DecodeError;
use crate::hid::{HidDescriptor, HidDescriptorType};
use crate::report::{ReportDecoder, ReportEvent};
use crate::settings::Settings;
use crate::stream::{BoundaryMismatch, ConfigurationBytes};
use crate::usb::{
    class_code,
    decode_languages,
    decode_string,
    ConfigDescriptor,
    DeviceDescriptor,
    HubDescriptor,
    StringId,
    US_ENGLISH,
};

/// A descriptor buffer the inspector needs from the device.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DescriptorRequest {
    Device,
    Configuration { index: u8 },
    Hub,
    Report { interface: u8, index: u8, length: u16 },
    String { index: StringId, language: u16 },
}

impl std::fmt::Display for DescriptorRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use DescriptorRequest::*;
        match self {
            Device => write!(f, "device descriptor"),
            Configuration { index } => write!(f, "configuration descriptor {index}"),
            Hub => write!(f, "hub descriptor"),
            Report { interface, index, length } => write!(f,
                "report descriptor {index} of interface {interface} ({length} bytes)"),
            String { index, language } => write!(f,
                "string descriptor {index} (language 0x{language:04x})"),
        }
    }
}

/// Where descriptor buffers come from.
pub trait DescriptorSource {
    fn fetch(&mut self, request: &DescriptorRequest) -> Result<Vec<u8>, Error>;
}

/// String descriptors resolved for one descriptor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Strings(Vec<(StringId, String)>);

impl Strings {
    pub fn get(&self, id: StringId) -> Option<&str> {
        self.0.iter()
            .find(|(i, _)| *i == id)
            .map(|(_, s)| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Device {
        descriptor: DeviceDescriptor,
        strings: Strings,
    },
    ConfigurationStart {
        index: u8,
        descriptor: ConfigDescriptor,
        strings: Strings,
        mismatch: Option<BoundaryMismatch>,
    },
    Descriptor {
        descriptor: TypedDescriptor,
        context: ClassContext,
        strings: Strings,
    },
    ReportStart {
        interface: u8,
        index: u8,
        length: u16,
    },
    Report(ReportEvent),
    ReportError(DecodeError),
    ReportEnd {
        depth: usize,
    },
    HidPhysical {
        index: u8,
    },
    HidOther {
        index: u8,
        descriptor_type: u8,
    },
    Hub(HubDescriptor),
    WalkFailed {
        configuration: Option<u8>,
        error: DecodeError,
    },
    FetchFailed {
        request: DescriptorRequest,
        error: String,
    },
    DeviceEnd,
}

/// Receives the events of a walk, in order.
pub trait EventSink {
    fn event(&mut self, event: &Event) -> Result<(), Error>;
}

impl EventSink for Vec<Event> {
    fn event(&mut self, event: &Event) -> Result<(), Error> {
        self.push(event.clone());
        Ok(())
    }
}

/// Decode a report descriptor, sending its items to `sink`.
pub fn emit_report<S>(bytes: &[u8], sink: &mut S) -> Result<(), Error>
    where S: EventSink + ?Sized
{
    let mut decoder = ReportDecoder::new(bytes);
    for result in decoder.by_ref() {
        match result {
            Ok(item) => sink.event(&Event::Report(item))?,
            Err(error) => sink.event(&Event::ReportError(error))?,
        }
    }
    sink.event(&Event::ReportEnd { depth: decoder.depth() })
}

/// Drives a full device walk.
pub struct Inspector<Source> {
    source: Source,
    settings: Settings,
    language: Option<u16>,
    strings: Vec<(StringId, Option<String>)>,
}

impl<Source: DescriptorSource> Inspector<Source> {
    pub fn new(source: Source, settings: Settings) -> Self {
        Inspector {
            source,
            settings,
            language: None,
            strings: Vec::new(),
        }
    }

    pub fn into_source(self) -> Source {
        self.source
    }

    fn fetch<S>(&mut self, request: DescriptorRequest, sink: &mut S)
        -> Result<Option<Vec<u8>>, Error>
        where S: EventSink + ?Sized
    {
        debug!("fetching {request}");
        match self.source.fetch(&request) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) => {
                warn!("failed to fetch {request}: {error:#}");
                sink.event(&Event::FetchFailed {
                    request,
                    error: format!("{error:#}"),
                })?;
                Ok(None)
            }
        }
    }

    fn language<S>(&mut self, sink: &mut S) -> Result<u16, Error>
        where S: EventSink + ?Sized
    {
        if let Some(language) = self.language {
            return Ok(language);
        }
        let request = DescriptorRequest::String {
            index: StringId(0),
            language: 0,
        };
        let language = match self.fetch(request, sink)? {
            Some(bytes) => match decode_languages(&bytes) {
                Ok(languages) => languages.first().copied().unwrap_or(US_ENGLISH),
                Err(error) => {
                    warn!("invalid language list: {error}");
                    US_ENGLISH
                }
            },
            None => US_ENGLISH,
        };
        self.language = Some(language);
        Ok(language)
    }

    fn string<S>(&mut self, index: StringId, sink: &mut S)
        -> Result<Option<String>, Error>
        where S: EventSink + ?Sized
    {
        if let Some((_, cached)) = self.strings.iter().find(|(i, _)| *i == index) {
            return Ok(cached.clone());
        }
        let language = self.language(sink)?;
        let request = DescriptorRequest::String { index, language };
        let string = match self.fetch(request, sink)? {
            Some(bytes) => match decode_string(&bytes) {
                Ok(string) => Some(string),
                Err(error) => {
                    warn!("invalid string descriptor {index}: {error}");
                    None
                }
            },
            None => None,
        };
        self.strings.push((index, string.clone()));
        Ok(string)
    }

    fn resolve<S>(&mut self, ids: &[StringId], sink: &mut S)
        -> Result<Strings, Error>
        where S: EventSink + ?Sized
    {
        let mut strings = Strings::default();
        if !self.settings.fetch_strings {
            return Ok(strings);
        }
        for &id in ids {
            if id.0 == 0 || strings.get(id).is_some() {
                continue;
            }
            if let Some(string) = self.string(id, sink)? {
                strings.0.push((id, string));
            }
        }
        Ok(strings)
    }

    /// Walk the device: its descriptor, every configuration and, for hubs,
    /// the hub descriptor.
    pub fn run<S>(&mut self, sink: &mut S) -> Result<(), Error>
        where S: EventSink + ?Sized
    {
        let Some(bytes) = self.fetch(DescriptorRequest::Device, sink)? else {
            return Ok(());
        };
        let device = DeviceDescriptor::from_bytes(&bytes)
            .context("Invalid device descriptor")?;
        let strings = self.resolve(&device.string_ids(), sink)?;
        sink.event(&Event::Device { descriptor: device, strings })?;

        let context = ClassContext::for_device(&device);
        for index in 0 .. device.num_configurations {
            let request = DescriptorRequest::Configuration { index };
            if let Some(bytes) = self.fetch(request, sink)? {
                self.configuration(index, &bytes, context, sink)?;
            }
        }

        if device.device_class == class_code::HUB {
            if let Some(bytes) = self.fetch(DescriptorRequest::Hub, sink)? {
                match HubDescriptor::from_bytes(&bytes) {
                    Ok(hub) => sink.event(&Event::Hub(hub))?,
                    Err(error) => sink.event(&Event::WalkFailed {
                        configuration: None,
                        error,
                    })?,
                }
            }
        }
        sink.event(&Event::DeviceEnd)
    }

    /// Walk one configuration buffer, starting from `context`.
    pub fn configuration<S>(&mut self,
                            index: u8,
                            bytes: &[u8],
                            context: ClassContext,
                            sink: &mut S)
        -> Result<(), Error>
        where S: EventSink + ?Sized
    {
        let failed = |error| Event::WalkFailed {
            configuration: Some(index),
            error,
        };
        let config = match ConfigurationBytes::parse(bytes) {
            Ok(config) => config,
            Err(error) => return sink.event(&failed(error)),
        };
        let strings = self.resolve(&[config.header.config_str_id], sink)?;
        sink.event(&Event::ConfigurationStart {
            index,
            descriptor: config.header,
            strings,
            mismatch: config.mismatch,
        })?;

        let mut context = context;
        for result in config.descriptors() {
            let (descriptor, next) = match result.and_then(|raw| {
                classify(&raw, &context).map(|(d, c)| (raw.offset, d, c))
            }) {
                Ok((0, descriptor, next)) => {
                    // The configuration header itself, already announced.
                    context = next;
                    debug!("configuration {index} header: {descriptor:?}");
                    continue;
                },
                Ok((_, descriptor, next)) => (descriptor, next),
                Err(error) => {
                    warn!("configuration {index}: {error}");
                    return sink.event(&failed(error));
                }
            };
            context = next;
            let strings = self.resolve(&descriptor.string_ids(), sink)?;
            sink.event(&Event::Descriptor {
                descriptor: descriptor.clone(),
                context,
                strings,
            })?;
            if let TypedDescriptor::Hid(hid) = &descriptor {
                self.hid_descriptors(hid, &context, sink)?;
            }
        }
        Ok(())
    }

    fn hid_descriptors<S>(&mut self,
                          hid: &HidDescriptor,
                          context: &ClassContext,
                          sink: &mut S)
        -> Result<(), Error>
        where S: EventSink + ?Sized
    {
        let interface = context.interface_number.unwrap_or(0);
        for (index, entry) in hid.descriptors.iter().enumerate() {
            let index = index as u8;
            match entry.kind {
                HidDescriptorType::Report => {
                    if !self.settings.show_reports {
                        continue;
                    }
                    let length = entry.length;
                    let request = DescriptorRequest::Report {
                        interface, index, length
                    };
                    if let Some(bytes) = self.fetch(request, sink)? {
                        sink.event(&Event::ReportStart { interface, index, length })?;
                        let end = bytes.len().min(length as usize);
                        emit_report(&bytes[.. end], sink)?;
                    }
                },
                HidDescriptorType::Physical =>
                    sink.event(&Event::HidPhysical { index })?,
                other => sink.event(&Event::HidOther {
                    index,
                    descriptor_type: u8::from(other),
                })?,
            }
        }
        Ok(())
    }
}
