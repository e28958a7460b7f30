//! Plain text listing of inspection events.

use std::io::Write;

use anyhow::Error;
use itertools::Itertools;
use usb_ids::FromId;

use crate::audio::{
    AudioControl,
    AudioStreaming,
    ChannelCluster,
    ControlSubtype,
    SampleRates,
    StreamingEndpoint,
    StreamingSubtype,
};
use crate::cdc::{Cdc, CdcSubtypeName};
use crate::class::{ClassContext, TypedDescriptor, UnknownDescriptor};
use crate::decoder::{DescriptorRequest, Event, EventSink, Strings};
use crate::hid::HidDescriptor;
use crate::settings::Settings;
use crate::usb::{
    BCDVersion,
    ClassHeader,
    ConfigDescriptor,
    DeviceDescriptor,
    Endpoint,
    HubDescriptor,
    InterfaceDescriptor,
    StringId,
    TypeName,
};

/// String index followed by its text, or by nothing when unresolved.
struct StringField<'s>(&'s str, StringId, &'s Strings);

impl std::fmt::Display for StringField<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let StringField(name, id, strings) = self;
        write!(f, "{name}={id}({})", strings.get(*id).unwrap_or(""))
    }
}

/// Subtype number with its name, when it has one.
struct SubtypeName(Option<&'static str>, u8);

impl std::fmt::Display for SubtypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.0 {
            Some(name) => write!(f, "{}({})", name, self.1),
            None => write!(f, "{}", self.1),
        }
    }
}

fn bcd(version: BCDVersion) -> u16 {
    (version.major as u16) << 8 | version.minor as u16
}

fn class_names(class: u8, subclass: u8, protocol: u8) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(c) = usb_ids::Class::from_id(class) {
        names.push(format!("class=\"{}\"", c.name()));
    }
    if let Some(s) = usb_ids::SubClass::from_cid_scid(class, subclass) {
        names.push(format!("subclass=\"{}\"", s.name()));
    }
    if let Some(p) = usb_ids::Protocol::from_cid_scid_pid(class, subclass, protocol) {
        names.push(format!("protocol=\"{}\"", p.name()));
    }
    names
}

/// Writes events in the traditional usbctl layout.
pub struct TextRenderer<W> {
    out: W,
    settings: Settings,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, settings: Settings) -> Self {
        TextRenderer { out, settings }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn names(&mut self, names: Vec<String>) -> Result<(), Error> {
        if self.settings.lookup_names && !names.is_empty() {
            writeln!(self.out, "{}", names.iter().join(" "))?;
        }
        Ok(())
    }

    fn device(&mut self, d: &DeviceDescriptor, strings: &Strings)
        -> Result<(), Error>
    {
        writeln!(self.out, "DEVICE descriptor:")?;
        writeln!(self.out,
            "bLength={} bDescriptorType={} bcdUSB={} bDeviceClass={} \
             bDeviceSubClass={}",
            d.length, TypeName(d.descriptor_type), d.usb_version,
            d.device_class, d.device_subclass)?;
        writeln!(self.out,
            "bDeviceProtocol={} bMaxPacketSize={} idVendor=0x{:04x} \
             idProduct=0x{:04x} bcdDevice={:x}",
            d.device_protocol, d.max_packet_size_0, d.vendor_id.get(),
            d.product_id.get(), bcd(d.device_version))?;
        writeln!(self.out, "{} {} {} bNumConfigurations={}",
            StringField("iManufacturer", d.manufacturer_str_id, strings),
            StringField("iProduct", d.product_str_id, strings),
            StringField("iSerialNumber", d.serial_str_id, strings),
            d.num_configurations)?;
        let vendor_id = d.vendor_id.get();
        let product_id = d.product_id.get();
        let mut names = Vec::new();
        if let Some(v) = usb_ids::Vendor::from_id(vendor_id) {
            names.push(format!("vendor=\"{}\"", v.name()));
        }
        if let Some(p) = usb_ids::Device::from_vid_pid(vendor_id, product_id) {
            names.push(format!("product=\"{}\"", p.name()));
        }
        names.extend(class_names(
            d.device_class, d.device_subclass, d.device_protocol));
        self.names(names)
    }

    fn configuration(&mut self, c: &ConfigDescriptor, strings: &Strings)
        -> Result<(), Error>
    {
        writeln!(self.out,
            "bLength={} bDescriptorType={} wTotalLength={} bNumInterface={}",
            c.length, TypeName(c.descriptor_type), c.total_length,
            c.num_interfaces)?;
        writeln!(self.out,
            "bConfigurationValue={} {} bmAttributes={:x} bMaxPower={} mA",
            c.config_value,
            StringField("iConfiguration", c.config_str_id, strings),
            c.attributes, c.max_power_ma())?;
        Ok(())
    }

    fn interface(&mut self,
                 i: &InterfaceDescriptor,
                 context: &ClassContext,
                 strings: &Strings)
        -> Result<(), Error>
    {
        writeln!(self.out, "INTERFACE descriptor {}:",
                 context.interface_index.unwrap_or(0))?;
        writeln!(self.out,
            "bLength={} bDescriptorType={} bInterfaceNumber={} \
             bAlternateSetting={}",
            i.length, TypeName(i.descriptor_type), i.interface_number,
            i.alternate_setting)?;
        writeln!(self.out,
            "bNumEndpoints={} bInterfaceClass={} bInterfaceSubClass={}",
            i.num_endpoints, i.interface_class, i.interface_subclass)?;
        writeln!(self.out, "bInterfaceProtocol={} {}",
            i.interface_protocol,
            StringField("iInterface", i.interface_str_id, strings))?;
        self.names(class_names(
            i.interface_class, i.interface_subclass, i.interface_protocol))
    }

    fn endpoint(&mut self, ep: &Endpoint) -> Result<(), Error> {
        let d = &ep.descriptor;
        writeln!(self.out, "ENDPOINT descriptor:")?;
        writeln!(self.out, "bLength={} bDescriptorType={} bEndpointAddress={}-{}",
            d.length, TypeName(d.descriptor_type),
            d.endpoint_address.number(), d.endpoint_address.direction())?;
        writeln!(self.out, "bmAttributes={}{} wMaxPacketSize={} bInterval={}",
            d.attributes.endpoint_type(), d.attributes.sync_type().suffix(),
            d.max_packet_size, d.interval)?;
        if let Some(audio) = &ep.audio {
            writeln!(self.out, "bRefresh={} bSynchAddress={}",
                     audio.refresh, audio.synch_address)?;
        }
        Ok(())
    }

    fn hub(&mut self, h: &HubDescriptor) -> Result<(), Error> {
        writeln!(self.out, "HUB descriptor:")?;
        writeln!(self.out,
            "bDescLength={} bDescriptorType={} bNbrPorts={} \
             wHubCharacteristics={:02x}",
            h.length, TypeName(h.descriptor_type), h.num_ports,
            h.characteristics)?;
        writeln!(self.out,
            "bPwrOn2PwrGood={} bHubContrCurrent={} DeviceRemovable={:02x} \
             PortPwrCtrlMask={:02x}",
            h.power_on_to_good, h.controller_current,
            h.removable.iter().format(""), h.port_power_mask.iter().format(""))?;
        Ok(())
    }

    fn hid(&mut self, h: &HidDescriptor) -> Result<(), Error> {
        writeln!(self.out, "HID descriptor:")?;
        writeln!(self.out,
            "bLength={} bDescriptorType={} bcdHID={} bCountryCode={} \
             bNumDescriptors={}",
            h.length, TypeName(h.descriptor_type), h.hid_version,
            h.country_code, h.descriptors.len())?;
        for (i, entry) in h.descriptors.iter().enumerate() {
            writeln!(self.out, "bDescriptorType[{i}]={}, wDescriptorLength[{i}]={}",
                     TypeName(u8::from(entry.kind)), entry.length)?;
        }
        Ok(())
    }

    fn class_header(&mut self, h: &ClassHeader, subtype: SubtypeName)
        -> Result<(), Error>
    {
        writeln!(self.out, "bLength={} bDescriptorType={} bDescriptorSubtype={}",
                 h.length, TypeName(h.descriptor_type), subtype)?;
        Ok(())
    }

    fn cluster(&mut self, c: &ChannelCluster, strings: &Strings)
        -> Result<(), Error>
    {
        writeln!(self.out, "bNrChannels={} wChannelConfig={:04x} {}",
            c.nr_channels, c.channel_config,
            StringField("iChannelNames", c.channel_names, strings))?;
        Ok(())
    }

    fn sources(&mut self, sources: &[u8]) -> Result<(), Error> {
        writeln!(self.out, "baSourceID={}",
                 sources.iter().map(|s| format!(" {s}")).join(""))?;
        Ok(())
    }

    fn audio_control(&mut self, ac: &AudioControl, strings: &Strings)
        -> Result<(), Error>
    {
        let h = ac.header();
        if let AudioControl::Header(d) = ac {
            writeln!(self.out, "AC interface descriptor")?;
            writeln!(self.out,
                "bLength={} bDescriptorType={} bDescriptorSubtype={} bcdADC={}",
                h.length, TypeName(h.descriptor_type),
                SubtypeName(ControlSubtype::Header.name(), h.subtype),
                d.adc_version)?;
            writeln!(self.out, "wTotalLength={} bInCollection={:x}",
                     d.total_length, d.in_collection)?;
            for (i, number) in d.interface_numbers.iter().enumerate() {
                writeln!(self.out, "baInterfaceNr[{i}]={number}")?;
            }
            return Ok(())
        }
        writeln!(self.out, "AC unit descriptor")?;
        let title = match ac {
            AudioControl::InputTerminal(_) => "Input terminal",
            AudioControl::OutputTerminal(_) => "Output terminal",
            AudioControl::MixerUnit(_) => "Mixer unit",
            AudioControl::SelectorUnit(_) => "Selector unit",
            AudioControl::FeatureUnit(_) => "Feature unit",
            AudioControl::ProcessingUnit(_) => "Processing unit",
            AudioControl::ExtensionUnit(_) => "Extension unit",
            AudioControl::Header(_) => "Header",
        };
        writeln!(self.out, "{title} descriptor")?;
        writeln!(self.out, "bLength={} bDescriptorType={} bDescriptorSubtype={}",
                 h.length, TypeName(h.descriptor_type), h.subtype)?;
        match ac {
            AudioControl::InputTerminal(t) => {
                writeln!(self.out,
                    "bTerminalId={} wTerminalType={} bAssocTerminal={}",
                    t.terminal_id, t.terminal_type, t.assoc_terminal)?;
                self.cluster(&t.cluster, strings)?;
                writeln!(self.out, "{}", StringField("iTerminal", t.terminal, strings))?;
            },
            AudioControl::OutputTerminal(t) => {
                writeln!(self.out,
                    "bTerminalId={} wTerminalType={} bAssocTerminal={}",
                    t.terminal_id, t.terminal_type, t.assoc_terminal)?;
                writeln!(self.out, "bSourceId={} {}", t.source_id,
                         StringField("iTerminal", t.terminal, strings))?;
            },
            AudioControl::MixerUnit(m) => {
                writeln!(self.out, "bUnitId={} bNrInPins={}",
                         m.unit_id, m.source_ids.len())?;
                self.sources(&m.source_ids)?;
                self.cluster(&m.cluster, strings)?;
                writeln!(self.out, "bmControls={:02x} {}",
                         m.controls.iter().format(""),
                         StringField("iMixer", m.mixer, strings))?;
            },
            AudioControl::SelectorUnit(s) => {
                writeln!(self.out, "bUnitId={} bNrInPins={}",
                         s.unit_id, s.source_ids.len())?;
                self.sources(&s.source_ids)?;
                writeln!(self.out, "{}", StringField("iSelector", s.selector, strings))?;
            },
            AudioControl::FeatureUnit(f) => {
                writeln!(self.out, "bUnitId={} bSourceId={} bControlSize={}",
                         f.unit_id, f.source_id, f.control_size)?;
                for (i, control) in f.controls.iter().enumerate() {
                    writeln!(self.out, "bmaControls[{i}]={:02x}",
                             control.iter().rev().format(""))?;
                }
                writeln!(self.out, "{}", StringField("iFeature", f.feature, strings))?;
            },
            AudioControl::ProcessingUnit(p) => {
                writeln!(self.out, "bUnitId={} wProcessType={} bNrInPins={}",
                         p.unit_id, p.process_type, p.source_ids.len())?;
                self.sources(&p.source_ids)?;
                self.cluster(&p.cluster, strings)?;
                writeln!(self.out, "bControlSize={} bmControls={:02x} {}",
                         p.controls.len(), p.controls.iter().format(""),
                         StringField("iProcessing", p.processing, strings))?;
                if !p.specific.is_empty() {
                    writeln!(self.out, "specific={:02x}", p.specific.iter().format(" "))?;
                }
            },
            AudioControl::ExtensionUnit(e) => {
                writeln!(self.out, "bUnitId={} bNrInPins={} wExtensionCode={}",
                         e.unit_id, e.source_ids.len(), e.extension_code)?;
                self.sources(&e.source_ids)?;
                self.cluster(&e.cluster, strings)?;
                writeln!(self.out, "bControlSize={} bmControls={:02x} {}",
                         e.controls.len(), e.controls.iter().format(""),
                         StringField("iExtension", e.extension, strings))?;
            },
            AudioControl::Header(_) => {},
        }
        Ok(())
    }

    fn audio_streaming(&mut self, st: &AudioStreaming) -> Result<(), Error> {
        let h = st.header();
        let subtype = SubtypeName(StreamingSubtype::from(h.subtype).name(), h.subtype);
        self.class_header(h, subtype)?;
        match st {
            AudioStreaming::General(g) => {
                writeln!(self.out, "bTerminalLink={} bDelay={} wFormatTag={}",
                         g.terminal_link, g.delay, g.format_tag)?;
            },
            AudioStreaming::FormatType1(t) => {
                writeln!(self.out, "bFormatType={} bNrChannels={} bSubFrameSize={}",
                         t.format_type, t.nr_channels, t.subframe_size)?;
                writeln!(self.out, "bBitResolution={} bSamFreqType={}",
                         t.bit_resolution, t.sam_freq_type)?;
                match &t.sample_rates {
                    SampleRates::Continuous { low, high } => {
                        writeln!(self.out, "tSampLo={low}")?;
                        writeln!(self.out, "tSampHi={high}")?;
                    },
                    SampleRates::Discrete(rates) => {
                        for (i, rate) in rates.iter().enumerate() {
                            writeln!(self.out, "tSamFreq[{i}]={rate}")?;
                        }
                    },
                }
            },
            AudioStreaming::FormatSpecific(s) => {
                writeln!(self.out, "wFormatTag={} details={:02x}",
                         s.format_tag, s.details.iter().format(" "))?;
            },
        }
        Ok(())
    }

    fn streaming_endpoint(&mut self, ep: &StreamingEndpoint) -> Result<(), Error> {
        let h = &ep.header;
        writeln!(self.out,
            "bLength={} bDescriptorType={} bDescriptorSubtype={} bmAttributes={:x}",
            h.length, TypeName(h.descriptor_type),
            SubtypeName(StreamingSubtype::from(h.subtype).name(), h.subtype),
            ep.attributes)?;
        writeln!(self.out, "bLockDelayUnits={} wLockDelay={}",
                 ep.lock_delay_units, ep.lock_delay)?;
        Ok(())
    }

    fn cdc(&mut self, cdc: &Cdc) -> Result<(), Error> {
        let h = cdc.header();
        writeln!(self.out, "CDC INTERFACE descriptor:")?;
        writeln!(self.out, "bLength={} bDescriptorType={} bDescriptorSubtype={}",
                 h.length, TypeName(h.descriptor_type), CdcSubtypeName(h.subtype))?;
        match cdc {
            Cdc::Header(d) =>
                writeln!(self.out, "bcdCDC={}", d.cdc_version)?,
            Cdc::CallManagement(d) =>
                writeln!(self.out, "bmCapabilities=0x{:x} bDataInterface={}",
                         d.capabilities, d.data_interface)?,
            Cdc::Acm(d) =>
                writeln!(self.out, "bmCapabilities=0x{:x}", d.capabilities)?,
            Cdc::Union(d) => {
                write!(self.out, "bMasterInterface={}", d.master_interface)?;
                for (i, slave) in d.slave_interfaces.iter().enumerate() {
                    write!(self.out, " bSlaveInterface{i}={slave}")?;
                }
                writeln!(self.out)?;
            },
        }
        Ok(())
    }

    fn unknown(&mut self, u: &UnknownDescriptor, context: &ClassContext)
        -> Result<(), Error>
    {
        writeln!(self.out, "Unknown descriptor (class {}/{}):",
                 context.interface_class, context.interface_subclass)?;
        match u.subtype {
            Some(subtype) => writeln!(self.out,
                "bLength={} bDescriptorType={} bDescriptorSubtype={} ...",
                u.length, u.descriptor_type, subtype)?,
            None => writeln!(self.out, "bLength={} bDescriptorType={} ...",
                             u.length, u.descriptor_type)?,
        }
        Ok(())
    }

    fn descriptor(&mut self,
                  descriptor: &TypedDescriptor,
                  context: &ClassContext,
                  strings: &Strings)
        -> Result<(), Error>
    {
        match descriptor {
            TypedDescriptor::Device(d) => self.device(d, strings)?,
            TypedDescriptor::Configuration(c) => {
                writeln!(self.out, "CONFIGURATION descriptor:")?;
                self.configuration(c, strings)?;
            },
            TypedDescriptor::Interface(i) => self.interface(i, context, strings)?,
            TypedDescriptor::Endpoint(ep) => self.endpoint(ep)?,
            TypedDescriptor::Hub(h) => self.hub(h)?,
            TypedDescriptor::Hid(h) => self.hid(h)?,
            TypedDescriptor::AudioControl(ac) => self.audio_control(ac, strings)?,
            TypedDescriptor::AudioStreaming(st) => self.audio_streaming(st)?,
            TypedDescriptor::AudioStreamingEndpoint(ep) =>
                self.streaming_endpoint(ep)?,
            TypedDescriptor::Cdc(cdc) => self.cdc(cdc)?,
            TypedDescriptor::Unknown(u) => self.unknown(u, context)?,
        }
        writeln!(self.out)?;
        Ok(())
    }
}

impl<W: Write> EventSink for TextRenderer<W> {
    fn event(&mut self, event: &Event) -> Result<(), Error> {
        match event {
            Event::Device { descriptor, strings } => {
                self.device(descriptor, strings)?;
                writeln!(self.out)?;
            },
            Event::ConfigurationStart { index, descriptor, strings, mismatch } => {
                writeln!(self.out, "CONFIGURATION descriptor {index}:")?;
                self.configuration(descriptor, strings)?;
                if let Some(m) = mismatch {
                    writeln!(self.out, "wTotalLength={} but {} bytes were returned",
                             m.declared, m.available)?;
                }
                writeln!(self.out)?;
            },
            Event::Descriptor { descriptor, context, strings } =>
                self.descriptor(descriptor, context, strings)?,
            Event::ReportStart { .. } =>
                writeln!(self.out, "Report descriptor")?,
            Event::Report(item) => {
                let indent = item.depth * self.settings.indent;
                writeln!(self.out, "{:indent$}{}", "", item.item)?;
            },
            Event::ReportError(error) =>
                writeln!(self.out, "Error: {error}")?,
            Event::ReportEnd { depth } => {
                if *depth != 0 {
                    writeln!(self.out, "{depth} collections left open")?;
                }
                writeln!(self.out)?;
            },
            Event::HidPhysical { .. } =>
                writeln!(self.out, "Physical descriptor ...\n")?,
            Event::HidOther { descriptor_type, .. } =>
                writeln!(self.out, "Unknown HID descriptor type {descriptor_type}\n")?,
            Event::Hub(hub) => {
                self.hub(hub)?;
                writeln!(self.out)?;
            },
            Event::WalkFailed { configuration: Some(index), error } =>
                writeln!(self.out, "Error in configuration {index}: {error}\n")?,
            Event::WalkFailed { configuration: None, error } =>
                writeln!(self.out, "Error: {error}\n")?,
            Event::FetchFailed { request: DescriptorRequest::String { .. }, .. } => {},
            Event::FetchFailed { request, error } =>
                writeln!(self.out, "Failed to fetch {request}: {error}\n")?,
            Event::DeviceEnd =>
                writeln!(self.out, "----------")?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::emit_report;
    use crate::class::classify;
    use crate::stream::DescriptorStream;

    fn render(events: &[Event], settings: Settings) -> String {
        let mut renderer = TextRenderer::new(Vec::new(), settings);
        for event in events {
            renderer.event(event).unwrap();
        }
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    fn descriptor_text(bytes: &[u8], context: ClassContext) -> String {
        let raw = DescriptorStream::new(bytes).next().unwrap().unwrap();
        let (descriptor, context) = classify(&raw, &context).unwrap();
        render(&[Event::Descriptor {
            descriptor,
            context,
            strings: Strings::default(),
        }], Settings::default())
    }

    #[test]
    fn test_device_layout() {
        let bytes = [
            0x12, 0x01, 0x10, 0x01, 0x09, 0x00, 0x00, 0x08,
            0x51, 0x04, 0x46, 0x20, 0x00, 0x01, 0x00, 0x00,
            0x00, 0x01];
        let descriptor = DeviceDescriptor::from_bytes(&bytes).unwrap();
        let text = render(&[Event::Device {
            descriptor,
            strings: Strings::default(),
        }], Settings::default());
        assert_eq!(text, "\
DEVICE descriptor:
bLength=18 bDescriptorType=device(1) bcdUSB=1.10 bDeviceClass=9 bDeviceSubClass=0
bDeviceProtocol=0 bMaxPacketSize=8 idVendor=0x0451 idProduct=0x2046 bcdDevice=100
iManufacturer=0() iProduct=0() iSerialNumber=0() bNumConfigurations=1

");
    }

    #[test]
    fn test_endpoint_layout() {
        let text = descriptor_text(&[0x07, 0x05, 0x81, 0x03, 0x04, 0x00, 0x0A],
                                   ClassContext::default());
        assert_eq!(text, "\
ENDPOINT descriptor:
bLength=7 bDescriptorType=endpoint(5) bEndpointAddress=1-in
bmAttributes=interrupt wMaxPacketSize=4 bInterval=10

");
    }

    #[test]
    fn test_unknown_layout() {
        let context = ClassContext {
            interface_class: 3,
            .. ClassContext::default()
        };
        let text = descriptor_text(&[0x06, 0x24, 0x06, 0x00, 0x01, 0x02], context);
        assert_eq!(text, "\
Unknown descriptor (class 3/0):
bLength=6 bDescriptorType=36 bDescriptorSubtype=6 ...

");
    }

    #[test]
    fn test_union_layout() {
        let context = ClassContext {
            interface_class: 2,
            .. ClassContext::default()
        };
        let text = descriptor_text(&[0x06, 0x24, 0x06, 0x00, 0x01, 0x02], context);
        assert!(text.contains("bDescriptorSubtype=union"));
        assert!(text.contains("bMasterInterface=0 bSlaveInterface0=1 bSlaveInterface1=2\n"));
    }

    #[test]
    fn test_feature_unit_controls_msb_first() {
        let context = ClassContext {
            interface_class: 1,
            interface_subclass: 1,
            .. ClassContext::default()
        };
        let text = descriptor_text(
            &[0x0B, 0x24, 0x06, 0x02, 0x01, 0x02, 0x01, 0x00, 0x03, 0x01, 0x00],
            context);
        assert!(text.contains("Feature unit descriptor\n"));
        assert!(text.contains("bmaControls[0]=0001\n"));
        assert!(text.contains("bmaControls[1]=0103\n"));
    }

    #[test]
    fn test_hub_layout_shows_all_port_bytes() {
        // Nine ports need two DeviceRemovable bytes.
        let text = descriptor_text(
            &[0x0B, 0x29, 0x09, 0x09, 0x00, 0x32, 0x64, 0x02, 0x01, 0xFF, 0x03],
            ClassContext::default());
        assert_eq!(text, "\
HUB descriptor:
bDescLength=11 bDescriptorType=hub(41) bNbrPorts=9 wHubCharacteristics=09
bPwrOn2PwrGood=50 bHubContrCurrent=100 DeviceRemovable=0201 PortPwrCtrlMask=ff03

");
    }

    #[test]
    fn test_processing_unit_layout() {
        let context = ClassContext {
            interface_class: 1,
            interface_subclass: 1,
            .. ClassContext::default()
        };
        let text = descriptor_text(
            &[0x11, 0x24, 0x07, 0x06, 0x02, 0x00, 0x01, 0x05, 0x02, 0x03,
              0x00, 0x00, 0x01, 0x03, 0x00, 0x01, 0x02],
            context);
        assert!(text.contains("Processing unit descriptor\n"));
        assert!(text.contains("bUnitId=6 wProcessType=2 bNrInPins=1\n"));
        assert!(text.contains("baSourceID= 5\n"));
        assert!(text.contains("bNrChannels=2 wChannelConfig=0003 iChannelNames=0()\n"));
        assert!(text.contains("bControlSize=1 bmControls=03 iProcessing=0()\n"));
        assert!(text.contains("specific=01 02\n"));
    }

    #[test]
    fn test_streaming_general_and_format_specific_layout() {
        let context = ClassContext {
            interface_class: 1,
            interface_subclass: 2,
            .. ClassContext::default()
        };
        let text = descriptor_text(&[0x07, 0x24, 0x01, 0x01, 0x01, 0x01, 0x00], context);
        assert!(text.contains(
            "bDescriptorSubtype=as_general(1)\nbTerminalLink=1 bDelay=1 wFormatTag=1\n"));
        let text = descriptor_text(
            &[0x08, 0x24, 0x03, 0x01, 0x10, 0xAA, 0xBB, 0xCC], context);
        assert!(text.contains("bDescriptorSubtype=format_specific(3)\n"));
        assert!(text.contains("wFormatTag=4097 details=aa bb cc\n"));
    }

    #[test]
    fn test_report_indentation() {
        let mut events = vec![Event::ReportStart { interface: 0, index: 0, length: 9 }];
        emit_report(&[0x05, 0x01, 0x09, 0x02, 0xA1, 0x01, 0x09, 0x01, 0xC0],
                    &mut events).unwrap();
        let text = render(&events, Settings::default());
        assert_eq!(text, "\
Report descriptor
Usage Page(1)
Usage(2)
Collection (Application)
   Usage(1)
End Collection

");
        let narrow = Settings { indent: 1, .. Settings::default() };
        assert!(render(&events, narrow).contains("\n Usage(1)\n"));
    }
}
