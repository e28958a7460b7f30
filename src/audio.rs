//! USB Audio Class 1.0 class-specific descriptors.

use log::warn;
use num_enum::FromPrimitive;

use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::usb::{BCDVersion, ClassHeader, StringId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum ControlSubtype {
    Undefined = 0,
    Header = 1,
    InputTerminal = 2,
    OutputTerminal = 3,
    MixerUnit = 4,
    SelectorUnit = 5,
    FeatureUnit = 6,
    ProcessingUnit = 7,
    ExtensionUnit = 8,
    #[num_enum(catch_all)]
    Other(u8),
}

impl ControlSubtype {
    pub fn name(self) -> Option<&'static str> {
        use ControlSubtype::*;
        match self {
            Undefined => Some("ac_descriptor_undefined"),
            Header => Some("header"),
            InputTerminal => Some("input_terminal"),
            OutputTerminal => Some("output_terminal"),
            MixerUnit => Some("mixer_unit"),
            SelectorUnit => Some("selector_unit"),
            FeatureUnit => Some("feature_unit"),
            ProcessingUnit => Some("processing_unit"),
            ExtensionUnit => Some("extension_unit"),
            Other(_) => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum StreamingSubtype {
    Undefined = 0,
    General = 1,
    FormatType = 2,
    FormatSpecific = 3,
    #[num_enum(catch_all)]
    Other(u8),
}

impl StreamingSubtype {
    pub fn name(self) -> Option<&'static str> {
        use StreamingSubtype::*;
        match self {
            Undefined => Some("as_descriptor_undefined"),
            General => Some("as_general"),
            FormatType => Some("format_type"),
            FormatSpecific => Some("format_specific"),
            Other(_) => None,
        }
    }
}

/// Logical channel layout shared by several unit records.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelCluster {
    pub nr_channels: u8,
    pub channel_config: u16,
    pub channel_names: StringId,
}

impl ChannelCluster {
    fn read(cursor: &mut ByteCursor) -> Result<Self, DecodeError> {
        Ok(ChannelCluster {
            nr_channels: cursor.read_u8()?,
            channel_config: cursor.read_u16_le()?,
            channel_names: StringId(cursor.read_u8()?),
        })
    }
}

fn read_sources(cursor: &mut ByteCursor) -> Result<Vec<u8>, DecodeError> {
    let count = cursor.read_u8()?;
    cursor.read_array(count as usize)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlHeader {
    pub header: ClassHeader,
    pub adc_version: BCDVersion,
    pub total_length: u16,
    pub in_collection: u8,
    pub interface_numbers: Vec<u8>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InputTerminal {
    pub header: ClassHeader,
    pub terminal_id: u8,
    pub terminal_type: u16,
    pub assoc_terminal: u8,
    pub cluster: ChannelCluster,
    pub terminal: StringId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OutputTerminal {
    pub header: ClassHeader,
    pub terminal_id: u8,
    pub terminal_type: u16,
    pub assoc_terminal: u8,
    pub source_id: u8,
    pub terminal: StringId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MixerUnit {
    pub header: ClassHeader,
    pub unit_id: u8,
    pub source_ids: Vec<u8>,
    pub cluster: ChannelCluster,
    pub controls: Vec<u8>,
    pub mixer: StringId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorUnit {
    pub header: ClassHeader,
    pub unit_id: u8,
    pub source_ids: Vec<u8>,
    pub selector: StringId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureUnit {
    pub header: ClassHeader,
    pub unit_id: u8,
    pub source_id: u8,
    pub control_size: u8,
    /// One bitmap per channel, master channel first, each little-endian.
    pub controls: Vec<Vec<u8>>,
    pub feature: StringId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessingUnit {
    pub header: ClassHeader,
    pub unit_id: u8,
    pub process_type: u16,
    pub source_ids: Vec<u8>,
    pub cluster: ChannelCluster,
    pub controls: Vec<u8>,
    pub processing: StringId,
    pub specific: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionUnit {
    pub header: ClassHeader,
    pub unit_id: u8,
    pub extension_code: u16,
    pub source_ids: Vec<u8>,
    pub cluster: ChannelCluster,
    pub controls: Vec<u8>,
    pub extension: StringId,
}

/// Class-specific descriptors of an AudioControl interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioControl {
    Header(ControlHeader),
    InputTerminal(InputTerminal),
    OutputTerminal(OutputTerminal),
    MixerUnit(MixerUnit),
    SelectorUnit(SelectorUnit),
    FeatureUnit(FeatureUnit),
    ProcessingUnit(ProcessingUnit),
    ExtensionUnit(ExtensionUnit),
}

impl AudioControl {
    /// Decode a CS_INTERFACE descriptor of an AudioControl interface.
    ///
    /// Returns `None` for subtypes without a decoder.
    pub fn read(cursor: &mut ByteCursor) -> Result<Option<Self>, DecodeError> {
        let header = ClassHeader::read(cursor)?;
        use ControlSubtype::*;
        Ok(Some(match ControlSubtype::from(header.subtype) {
            Header => {
                let adc_version = BCDVersion::from(cursor.read_u16_le()?);
                let total_length = cursor.read_u16_le()?;
                let in_collection = cursor.read_u8()?;
                let count = (header.length as usize).saturating_sub(8);
                if count != in_collection as usize {
                    warn!("audio control header lists {} interfaces \
                           but has room for {}", in_collection, count);
                }
                let interface_numbers = cursor.read_array(count)?;
                AudioControl::Header(ControlHeader {
                    header,
                    adc_version,
                    total_length,
                    in_collection,
                    interface_numbers,
                })
            },
            InputTerminal => AudioControl::InputTerminal(self::InputTerminal {
                header,
                terminal_id: cursor.read_u8()?,
                terminal_type: cursor.read_u16_le()?,
                assoc_terminal: cursor.read_u8()?,
                cluster: ChannelCluster::read(cursor)?,
                terminal: StringId(cursor.read_u8()?),
            }),
            OutputTerminal => AudioControl::OutputTerminal(self::OutputTerminal {
                header,
                terminal_id: cursor.read_u8()?,
                terminal_type: cursor.read_u16_le()?,
                assoc_terminal: cursor.read_u8()?,
                source_id: cursor.read_u8()?,
                terminal: StringId(cursor.read_u8()?),
            }),
            MixerUnit => {
                let unit_id = cursor.read_u8()?;
                let source_ids = read_sources(cursor)?;
                let cluster = ChannelCluster::read(cursor)?;
                // bmControls fills the space before the final string index.
                let controls = cursor.read_array(
                    cursor.remaining().saturating_sub(1))?;
                let mixer = StringId(cursor.read_u8()?);
                AudioControl::MixerUnit(self::MixerUnit {
                    header, unit_id, source_ids, cluster, controls, mixer
                })
            },
            SelectorUnit => AudioControl::SelectorUnit(self::SelectorUnit {
                header,
                unit_id: cursor.read_u8()?,
                source_ids: read_sources(cursor)?,
                selector: StringId(cursor.read_u8()?),
            }),
            FeatureUnit => {
                let unit_id = cursor.read_u8()?;
                let source_id = cursor.read_u8()?;
                let control_size = cursor.read_u8()?;
                let count = if control_size == 0 {
                    warn!("feature unit {unit_id} has bControlSize of zero");
                    0
                } else {
                    (header.length as usize).saturating_sub(7)
                        / control_size as usize
                };
                let mut controls = Vec::with_capacity(count);
                for _ in 0 .. count {
                    controls.push(cursor.read_array(control_size as usize)?);
                }
                let feature = StringId(cursor.read_u8()?);
                AudioControl::FeatureUnit(self::FeatureUnit {
                    header, unit_id, source_id, control_size, controls, feature
                })
            },
            ProcessingUnit => {
                let unit_id = cursor.read_u8()?;
                let process_type = cursor.read_u16_le()?;
                let source_ids = read_sources(cursor)?;
                let cluster = ChannelCluster::read(cursor)?;
                let controls = read_sources(cursor)?;
                let processing = StringId(cursor.read_u8()?);
                let specific = cursor.read_rest().to_vec();
                AudioControl::ProcessingUnit(self::ProcessingUnit {
                    header, unit_id, process_type, source_ids, cluster,
                    controls, processing, specific
                })
            },
            ExtensionUnit => {
                let unit_id = cursor.read_u8()?;
                let extension_code = cursor.read_u16_le()?;
                let source_ids = read_sources(cursor)?;
                let cluster = ChannelCluster::read(cursor)?;
                let controls = read_sources(cursor)?;
                let extension = StringId(cursor.read_u8()?);
                AudioControl::ExtensionUnit(self::ExtensionUnit {
                    header, unit_id, extension_code, source_ids, cluster,
                    controls, extension
                })
            },
            Undefined | Other(_) => return Ok(None),
        }))
    }

    pub fn header(&self) -> &ClassHeader {
        use AudioControl::*;
        match self {
            Header(d) => &d.header,
            InputTerminal(d) => &d.header,
            OutputTerminal(d) => &d.header,
            MixerUnit(d) => &d.header,
            SelectorUnit(d) => &d.header,
            FeatureUnit(d) => &d.header,
            ProcessingUnit(d) => &d.header,
            ExtensionUnit(d) => &d.header,
        }
    }

    pub fn string_ids(&self) -> Vec<StringId> {
        use AudioControl::*;
        match self {
            Header(_) => vec![],
            InputTerminal(d) => vec![d.cluster.channel_names, d.terminal],
            OutputTerminal(d) => vec![d.terminal],
            MixerUnit(d) => vec![d.cluster.channel_names, d.mixer],
            SelectorUnit(d) => vec![d.selector],
            FeatureUnit(d) => vec![d.feature],
            ProcessingUnit(d) => vec![d.cluster.channel_names, d.processing],
            ExtensionUnit(d) => vec![d.cluster.channel_names, d.extension],
        }
    }
}

/// Supported sample rates of a Type I format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SampleRates {
    Continuous { low: u32, high: u32 },
    Discrete(Vec<u32>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StreamingGeneral {
    pub header: ClassHeader,
    pub terminal_link: u8,
    pub delay: u8,
    pub format_tag: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatType1 {
    pub header: ClassHeader,
    pub format_type: u8,
    pub nr_channels: u8,
    pub subframe_size: u8,
    pub bit_resolution: u8,
    pub sam_freq_type: u8,
    pub sample_rates: SampleRates,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatSpecific {
    pub header: ClassHeader,
    pub format_tag: u16,
    pub details: Vec<u8>,
}

/// Class-specific descriptors of an AudioStreaming interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioStreaming {
    General(StreamingGeneral),
    FormatType1(FormatType1),
    FormatSpecific(FormatSpecific),
}

impl AudioStreaming {
    /// Decode a CS_INTERFACE descriptor of an AudioStreaming interface.
    ///
    /// Returns `None` for subtypes without a decoder.
    pub fn read(cursor: &mut ByteCursor) -> Result<Option<Self>, DecodeError> {
        let header = ClassHeader::read(cursor)?;
        use StreamingSubtype::*;
        Ok(Some(match StreamingSubtype::from(header.subtype) {
            General => AudioStreaming::General(StreamingGeneral {
                header,
                terminal_link: cursor.read_u8()?,
                delay: cursor.read_u8()?,
                format_tag: cursor.read_u16_le()?,
            }),
            FormatType => {
                let format_type = cursor.read_u8()?;
                let nr_channels = cursor.read_u8()?;
                let subframe_size = cursor.read_u8()?;
                let bit_resolution = cursor.read_u8()?;
                let sam_freq_type = cursor.read_u8()?;
                let sample_rates = if sam_freq_type == 0 {
                    SampleRates::Continuous {
                        low: cursor.read_u24_le()?,
                        high: cursor.read_u24_le()?,
                    }
                } else {
                    let mut rates = Vec::with_capacity(sam_freq_type as usize);
                    for _ in 0 .. sam_freq_type {
                        rates.push(cursor.read_u24_le()?);
                    }
                    SampleRates::Discrete(rates)
                };
                AudioStreaming::FormatType1(self::FormatType1 {
                    header,
                    format_type,
                    nr_channels,
                    subframe_size,
                    bit_resolution,
                    sam_freq_type,
                    sample_rates,
                })
            },
            FormatSpecific => AudioStreaming::FormatSpecific(self::FormatSpecific {
                header,
                format_tag: cursor.read_u16_le()?,
                details: cursor.read_rest().to_vec(),
            }),
            Undefined | Other(_) => return Ok(None),
        }))
    }

    pub fn header(&self) -> &ClassHeader {
        match self {
            AudioStreaming::General(d) => &d.header,
            AudioStreaming::FormatType1(d) => &d.header,
            AudioStreaming::FormatSpecific(d) => &d.header,
        }
    }
}

/// Class-specific endpoint descriptor of an AudioStreaming interface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StreamingEndpoint {
    pub header: ClassHeader,
    pub attributes: u8,
    pub lock_delay_units: u8,
    pub lock_delay: u16,
}

impl StreamingEndpoint {
    pub fn read(cursor: &mut ByteCursor) -> Result<Option<Self>, DecodeError> {
        let header = ClassHeader::read(cursor)?;
        if StreamingSubtype::from(header.subtype) != StreamingSubtype::General {
            return Ok(None);
        }
        Ok(Some(StreamingEndpoint {
            header,
            attributes: cursor.read_u8()?,
            lock_delay_units: cursor.read_u8()?,
            lock_delay: cursor.read_u16_le()?,
        }))
    }
}
