//! Interpreter for HID report descriptors.
//!
//! A report descriptor is a sequence of items. Each short item starts with a
//! prefix byte holding its tag, type and data size; long items start with
//! [`LONG_ITEM_PREFIX`]. Main items describe report fields and open or close
//! collections, Global items set state that persists across Main items, and
//! Local items apply only to the next Main item.

use itertools::Itertools;
use log::{info, warn};
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::cursor::ByteCursor;
use crate::error::DecodeError;

pub const LONG_ITEM_PREFIX: u8 = 0xFE;

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ItemType {
    Main = 0,
    Global = 1,
    Local = 2,
    #[default]
    Reserved = 3,
}

bitfield! {
    #[derive(Copy, Clone)]
    struct ItemPrefix(u8);
    u8, size_code, _: 1, 0;
    u8, into ItemType, item_type, _: 3, 2;
    u8, tag, _: 7, 4;
}

impl ItemPrefix {
    fn data_size(&self) -> usize {
        match self.size_code() {
            3 => 4,
            code => code as usize,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShortItem {
    pub tag: u8,
    pub item_type: ItemType,
    /// Data size in bytes: 0, 1, 2 or 4.
    pub size: u8,
    /// Item data, little-endian and zero-extended.
    pub value: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LongItem {
    pub tag: u8,
    pub data: Vec<u8>,
}

pub mod main_tag {
    pub const INPUT: u8 = 8;
    pub const OUTPUT: u8 = 9;
    pub const COLLECTION: u8 = 10;
    pub const FEATURE: u8 = 11;
    pub const END_COLLECTION: u8 = 12;
}

pub mod global_tag {
    pub const USAGE_PAGE: u8 = 0;
    pub const LOGICAL_MINIMUM: u8 = 1;
    pub const LOGICAL_MAXIMUM: u8 = 2;
    pub const REPORT_SIZE: u8 = 7;
    pub const REPORT_ID: u8 = 8;
    pub const REPORT_COUNT: u8 = 9;
    pub const PUSH: u8 = 10;
    pub const POP: u8 = 11;
}

pub mod local_tag {
    pub const USAGE: u8 = 0;
    pub const USAGE_MINIMUM: u8 = 1;
    pub const USAGE_MAXIMUM: u8 = 2;
}

const GLOBAL_NAMES: [Option<&str>; 16] = [
    Some("Usage Page"),
    Some("Logical Min"), Some("Logical Max"),
    Some("Physical Min"), Some("Physical Max"),
    Some("Unit Exponent"), Some("Unit"),
    Some("Report size"), Some("Report ID"),
    Some("Report count"),
    Some("Push"), Some("Pop"),
    None, None, None, None,
];

const LOCAL_NAMES: [Option<&str>; 16] = [
    Some("Usage"),
    Some("Usage Min"), Some("Usage Max"),
    Some("Designator index"),
    Some("Designator Min"), Some("Designator Max"),
    None, Some("String index"),
    Some("String Min"), Some("String Max"),
    Some("Set delimiter"),
    None, None, None, None, None,
];

/// Names for the cleared and set states of each Main item data bit.
type FlagTable = [Option<(&'static str, &'static str)>; 9];

const INPUT_FLAGS: FlagTable = [
    Some(("Data", "Constant")),
    Some(("Array", "Variable")),
    Some(("Absolute", "Relative")),
    Some(("No wrap", "Wrap")),
    Some(("Linear", "Non linear")),
    Some(("Preferred state", "No Preferred")),
    Some(("No null position", "Null position")),
    None,
    Some(("Bit field", "Bufferred bytes")),
];

const OUTPUT_FLAGS: FlagTable = [
    Some(("Data", "Constant")),
    Some(("Array", "Variable")),
    Some(("Absolute", "Relative")),
    Some(("No wrap", "Wrap")),
    Some(("Linear", "Non linear")),
    Some(("Preferred state", "No Preferred")),
    Some(("No null position", "Null position")),
    Some(("Non volatile", "Volatile")),
    Some(("Bit field", "Bufferred bytes")),
];

fn table_name(table: &[Option<&str>; 16], tag: u8) -> String {
    match table.get(tag as usize).copied().flatten() {
        Some(name) => name.to_string(),
        None => format!("??{tag}"),
    }
}

pub fn global_name(tag: u8) -> String {
    table_name(&GLOBAL_NAMES, tag)
}

pub fn local_name(tag: u8) -> String {
    table_name(&LOCAL_NAMES, tag)
}

fn flag_names(table: &FlagTable, bits: u32) -> String {
    table.iter()
        .enumerate()
        .filter_map(|(i, names)| names.map(|(clear, set)|
            if bits & (1 << i) != 0 { set } else { clear }))
        .join(", ")
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CollectionKind {
    Physical,
    Application,
    Logical,
    Other(u32),
}

impl From<u32> for CollectionKind {
    fn from(value: u32) -> Self {
        use CollectionKind::*;
        match value {
            0 => Physical,
            1 => Application,
            2 => Logical,
            other => Other(other),
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use CollectionKind::*;
        match self {
            Physical => write!(f, "Physical"),
            Application => write!(f, "Application"),
            Logical => write!(f, "Logical"),
            Other(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MainItem {
    Input(u32),
    Output(u32),
    Feature(u32),
    Collection(CollectionKind),
    EndCollection,
    Unknown(u8),
}

impl MainItem {
    fn new(tag: u8, value: u32) -> MainItem {
        use main_tag::*;
        match tag {
            INPUT => MainItem::Input(value),
            OUTPUT => MainItem::Output(value),
            FEATURE => MainItem::Feature(value),
            COLLECTION => MainItem::Collection(CollectionKind::from(value)),
            END_COLLECTION => MainItem::EndCollection,
            other => MainItem::Unknown(other),
        }
    }
}

impl std::fmt::Display for MainItem {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use MainItem::*;
        match self {
            Input(bits) => write!(f, "Input ({})", flag_names(&INPUT_FLAGS, *bits)),
            Output(bits) => write!(f, "Output ({})", flag_names(&OUTPUT_FLAGS, *bits)),
            Feature(bits) => write!(f, "Feature ({})", flag_names(&OUTPUT_FLAGS, *bits)),
            Collection(kind) => write!(f, "Collection ({kind})"),
            EndCollection => write!(f, "End Collection"),
            Unknown(tag) => write!(f, "??Main bType={tag}"),
        }
    }
}

/// A decoded report descriptor item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    Main(MainItem),
    Global { tag: u8, value: u32 },
    Local { tag: u8, value: u32 },
    /// Short item of the reserved type.
    Reserved(ShortItem),
    Long(LongItem),
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Item::Main(main) => write!(f, "{main}"),
            Item::Global { tag, value } => write!(f, "{}({value})", global_name(*tag)),
            Item::Local { tag, value } => write!(f, "{}({value})", local_name(*tag)),
            Item::Reserved(_) => write!(f, "default"),
            Item::Long(long) => write!(f, "Long item tag={} ({} bytes)",
                                       long.tag, long.data.len()),
        }
    }
}

/// One item of a report descriptor, positioned for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportEvent {
    /// Offset of the item's prefix byte.
    pub offset: usize,
    /// Indentation level: collection depth before an open, after a close.
    pub depth: usize,
    pub item: Item,
}

/// Global item values, with the Push/Pop stack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalState {
    values: [Option<u32>; 16],
    stack: Vec<[Option<u32>; 16]>,
}

impl GlobalState {
    pub fn get(&self, tag: u8) -> Option<u32> {
        self.values.get(tag as usize).copied().flatten()
    }

    pub fn usage_page(&self) -> Option<u32> {
        self.get(global_tag::USAGE_PAGE)
    }

    pub fn report_size(&self) -> Option<u32> {
        self.get(global_tag::REPORT_SIZE)
    }

    pub fn report_count(&self) -> Option<u32> {
        self.get(global_tag::REPORT_COUNT)
    }

    pub fn report_id(&self) -> Option<u32> {
        self.get(global_tag::REPORT_ID)
    }

    /// Number of saved tables.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    fn apply(&mut self, tag: u8, value: u32, offset: usize) {
        match tag {
            global_tag::PUSH => self.stack.push(self.values),
            global_tag::POP => match self.stack.pop() {
                Some(values) => self.values = values,
                None => warn!("pop at offset {offset} with empty global stack"),
            },
            _ => if let Some(slot) = self.values.get_mut(tag as usize) {
                *slot = Some(value);
            },
        }
    }
}

/// Local items accumulated since the last Main item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalState {
    items: Vec<(u8, u32)>,
}

impl LocalState {
    pub fn items(&self) -> &[(u8, u32)] {
        &self.items
    }

    pub fn usages(&self) -> impl Iterator<Item = u32> + '_ {
        self.items.iter()
            .filter(|(tag, _)| *tag == local_tag::USAGE)
            .map(|(_, value)| *value)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Iterator over the items of a report descriptor.
///
/// A truncated item ends the sequence after its error. End Collection
/// without a matching Collection is yielded as an error but decoding
/// continues.
pub struct ReportDecoder<'bytes> {
    cursor: ByteCursor<'bytes>,
    collections: Vec<CollectionKind>,
    globals: GlobalState,
    locals: LocalState,
    failed: bool,
}

impl<'bytes> ReportDecoder<'bytes> {
    pub fn new(bytes: &'bytes [u8]) -> Self {
        ReportDecoder {
            cursor: ByteCursor::new(bytes),
            collections: Vec::new(),
            globals: GlobalState::default(),
            locals: LocalState::default(),
            failed: false,
        }
    }

    /// Current collection nesting depth.
    pub fn depth(&self) -> usize {
        self.collections.len()
    }

    /// Kinds of the currently open collections, outermost first.
    pub fn collections(&self) -> &[CollectionKind] {
        &self.collections
    }

    pub fn globals(&self) -> &GlobalState {
        &self.globals
    }

    pub fn locals(&self) -> &LocalState {
        &self.locals
    }

    fn read_item(&mut self) -> Result<Item, DecodeError> {
        let first = self.cursor.read_u8()?;
        if first == LONG_ITEM_PREFIX {
            let size = self.cursor.read_u16_le()?;
            let tag = self.cursor.read_u8()?;
            let data = self.cursor.read_array(size as usize)?;
            return Ok(Item::Long(LongItem { tag, data }));
        }
        let prefix = ItemPrefix(first);
        let size = prefix.data_size();
        let value = self.cursor.read_uint_le(size)?;
        let tag = prefix.tag();
        Ok(match prefix.item_type() {
            ItemType::Main => Item::Main(MainItem::new(tag, value)),
            ItemType::Global => Item::Global { tag, value },
            ItemType::Local => Item::Local { tag, value },
            ItemType::Reserved => Item::Reserved(ShortItem {
                tag,
                item_type: ItemType::Reserved,
                size: size as u8,
                value,
            }),
        })
    }

    fn apply(&mut self, offset: usize, item: Item)
        -> Result<ReportEvent, DecodeError>
    {
        let mut depth = self.depth();
        match &item {
            Item::Main(main) => {
                self.locals.items.clear();
                match main {
                    MainItem::Collection(kind) => self.collections.push(*kind),
                    MainItem::EndCollection => {
                        if self.collections.pop().is_none() {
                            warn!("end collection at offset {offset} \
                                   with no open collection");
                            return Err(DecodeError::CollectionUnderflow { offset });
                        }
                        depth = self.depth();
                    },
                    MainItem::Unknown(tag) =>
                        info!("unknown main item tag {tag} at offset {offset}"),
                    _ => {},
                }
            },
            Item::Global { tag, value } => self.globals.apply(*tag, *value, offset),
            Item::Local { tag, value } => self.locals.items.push((*tag, *value)),
            Item::Reserved(short) =>
                info!("reserved item type with tag {} at offset {offset}", short.tag),
            Item::Long(_) => {},
        }
        Ok(ReportEvent { offset, depth, item })
    }
}

impl Iterator for ReportDecoder<'_> {
    type Item = Result<ReportEvent, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.is_empty() {
            return None;
        }
        let offset = self.cursor.position();
        Some(match self.read_item() {
            Ok(item) => self.apply(offset, item),
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        })
    }
}

impl std::iter::FusedIterator for ReportDecoder<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(bytes: &[u8]) -> Vec<Result<ReportEvent, DecodeError>> {
        ReportDecoder::new(bytes).collect()
    }

    fn lines(bytes: &[u8]) -> Vec<String> {
        events(bytes)
            .into_iter()
            .map(|e| match e {
                Ok(e) => format!("{}{}", " ".repeat(e.depth * 3), e.item),
                Err(e) => panic!("Expected item but got {:?}", e),
            })
            .collect()
    }

    #[test]
    fn test_application_collection() {
        let bytes = [0x05, 0x01, 0x09, 0x02, 0xA1, 0x01, 0xC0];
        let mut decoder = ReportDecoder::new(&bytes);
        let events: Vec<_> = decoder.by_ref().map(Result::unwrap).collect();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].item, Item::Global { tag: 0, value: 1 });
        assert_eq!(events[1].item, Item::Local { tag: 0, value: 2 });
        assert_eq!(events[2].item,
                   Item::Main(MainItem::Collection(CollectionKind::Application)));
        assert_eq!(events[2].offset, 4);
        assert_eq!(events[3].item, Item::Main(MainItem::EndCollection));
        assert_eq!(events[3].depth, 0);
        assert_eq!(decoder.depth(), 0);
        assert_eq!(lines(&bytes), vec![
            "Usage Page(1)",
            "Usage(2)",
            "Collection (Application)",
            "End Collection",
        ]);
    }

    #[test]
    fn test_nested_indentation() {
        let bytes = [0xA1, 0x01, 0x09, 0x01, 0xA1, 0x00, 0x81, 0x02,
                     0xC0, 0xC0];
        assert_eq!(lines(&bytes), vec![
            "Collection (Application)",
            "   Usage(1)",
            "   Collection (Physical)",
            "      Input (Data, Variable, Absolute, No wrap, Linear, \
             Preferred state, No null position, Bit field)",
            "   End Collection",
            "End Collection",
        ]);
    }

    #[test]
    fn test_output_flags_include_volatile() {
        let bytes = [0x91, 0x83];
        assert_eq!(lines(&bytes), vec![
            "Output (Constant, Variable, Absolute, No wrap, Linear, \
             Preferred state, No null position, Volatile, Bit field)",
        ]);
        let bytes = [0xB1, 0x00];
        assert!(lines(&bytes)[0].contains("Non volatile"));
    }

    #[test]
    fn test_underflow_continues() {
        let bytes = [0xC0, 0x05, 0x01];
        let events = events(&bytes);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Err(DecodeError::CollectionUnderflow { offset: 0 }));
        match &events[1] {
            Ok(ReportEvent { depth: 0, item: Item::Global { tag: 0, value: 1 }, .. }) => {},
            other => panic!("Expected Usage Page but got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_item_ends_sequence() {
        let bytes = [0x05, 0x01, 0x27, 0xFF, 0xFF];
        let events = events(&bytes);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1],
            Err(DecodeError::Truncated { offset: 3, needed: 4, remaining: 2 }));
    }

    #[test]
    fn test_four_byte_values_are_unsigned() {
        let bytes = [0x17, 0x00, 0x00, 0x00, 0x80];
        match &events(&bytes)[0] {
            Ok(ReportEvent { item: Item::Global { tag: 1, value }, .. }) =>
                assert_eq!(*value, 0x8000_0000),
            other => panic!("Expected Logical Min but got {:?}", other),
        }
        assert_eq!(lines(&[0x15, 0xFF]), vec!["Logical Min(255)"]);
    }

    #[test]
    fn test_unnamed_and_reserved_items() {
        assert_eq!(lines(&[0xC4]), vec!["??12(0)"]);
        assert_eq!(lines(&[0x68]), vec!["??6(0)"]);
        assert_eq!(lines(&[0xD0]), vec!["??Main bType=13"]);
        assert_eq!(lines(&[0x0C]), vec!["default"]);
        assert_eq!(lines(&[0xA1, 0x80, 0xC0]),
                   vec!["Collection (128)", "End Collection"]);
    }

    #[test]
    fn test_long_item() {
        let bytes = [0xFE, 0x02, 0x00, 0xF1, 0xAA, 0xBB, 0x05, 0x01];
        let events = events(&bytes);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap().item,
                   Item::Long(LongItem { tag: 0xF1, data: vec![0xAA, 0xBB] }));
        assert_eq!(events[1].as_ref().unwrap().offset, 6);
    }

    #[test]
    fn test_push_pop() {
        // Report size 8, push, report size 16, pop.
        let bytes = [0x75, 0x08, 0xA4, 0x75, 0x10, 0xB4];
        let mut decoder = ReportDecoder::new(&bytes);
        decoder.by_ref().take(3).for_each(drop);
        assert_eq!(decoder.globals().report_size(), Some(16));
        assert_eq!(decoder.globals().stack_depth(), 1);
        assert!(decoder.next().unwrap().is_ok());
        assert_eq!(decoder.globals().report_size(), Some(8));
        assert_eq!(decoder.globals().stack_depth(), 0);
        // Unmatched pop leaves the table alone.
        let mut decoder = ReportDecoder::new(&[0x75, 0x08, 0xB4]);
        assert!(decoder.by_ref().all(|e| e.is_ok()));
        assert_eq!(decoder.globals().report_size(), Some(8));
    }

    #[test]
    fn test_global_and_collection_state() {
        // Usage Page 1, Report ID 2, Report count 3, Application, Logical.
        let bytes = [0x05, 0x01, 0x85, 0x02, 0x95, 0x03,
                     0xA1, 0x01, 0xA1, 0x02, 0xC0];
        let mut decoder = ReportDecoder::new(&bytes);
        decoder.by_ref().take(5).for_each(drop);
        assert_eq!(decoder.globals().usage_page(), Some(1));
        assert_eq!(decoder.globals().report_id(), Some(2));
        assert_eq!(decoder.globals().report_count(), Some(3));
        assert_eq!(decoder.globals().report_size(), None);
        assert_eq!(decoder.collections(),
                   &[CollectionKind::Application, CollectionKind::Logical]);
        decoder.next();
        assert_eq!(decoder.collections(), &[CollectionKind::Application]);
        assert_eq!(decoder.depth(), 1);
    }

    #[test]
    fn test_locals_cleared_by_main() {
        let bytes = [0x09, 0x30, 0x09, 0x31, 0x81, 0x02];
        let mut decoder = ReportDecoder::new(&bytes);
        decoder.by_ref().take(2).for_each(drop);
        assert_eq!(decoder.locals().usages().collect::<Vec<_>>(), vec![0x30, 0x31]);
        decoder.next();
        assert!(decoder.locals().is_empty());
    }
}
