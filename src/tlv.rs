//! The GCD TLV record family.
//!
//! Grounded in `examples/original_source/grmn/tlv.py`: a `TLV` base with a
//! `type_id`-keyed factory, specialized into a handful of variants. Type 6
//! (schema) and type 7 (descriptor) are a two-level meta-format — the
//! schema enumerates field ids whose types (from a fixed table) describe
//! the byte layout of the following descriptor — which in turn declares
//! the type id and cumulative length of the binary region records that
//! follow it.
//!
//! Cross-record bindings (descriptor -> schema, binary -> descriptor) are
//! stored as plain `usize` indices into the owning [`crate::gcd::Gcd`]'s
//! record vector rather than references, per spec.md §9: the language's
//! ownership model can't express "non-owning sibling reference" directly,
//! so an index that's resolved on demand stands in for it.

use crate::device_names::{self, DeviceNameLookup};
use crate::error::TlvError;

/// Schema (type 6) field_id that terminates the field list.
pub const SCHEMA_TERMINATOR: u16 = 0x5003;

/// Scalar types a schema field can declare for the bound descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    U8,
    U16,
    U32,
    /// A 31-byte opaque blob (field 0x4007). Preserved byte-for-byte;
    /// its semantics are unconfirmed (spec.md §9).
    Blob31,
}

impl FieldType {
    pub const fn size(self) -> usize {
        match self {
            FieldType::U8 => 1,
            FieldType::U16 => 2,
            FieldType::U32 => 4,
            FieldType::Blob31 => 31,
        }
    }
}

/// Look up the fixed field_id -> (type, description) table (spec.md §4.2).
///
/// Returns `None` for any field_id outside the known table, which is
/// fatal per spec.md §9: "reject unknown field_ids rather than skipping
/// them — the layout is unrecoverable without the full table."
pub fn field_type(field_id: u16) -> Option<(FieldType, &'static str)> {
    use FieldType::*;
    Some(match field_id {
        0x000a => (U8, "XOR flag/value"),
        0x000b => (U8, "Reset/Downgrade flag"),
        0x000c => (U8, "Field 000c"),
        0x0020 => (U8, "Field 0020"),
        0x1009 => (U16, "Device hw_id"),
        0x100a => (U16, "Block type"),
        0x100c => (U16, "Field 100c"),
        0x100d => (U16, "Firmware version"),
        0x100e => (U16, "Field 100e"),
        0x100f => (U16, "Field 100f"),
        0x1010 => (U16, "Field 1010"),
        0x1011 => (U16, "Field 1011"),
        0x1012 => (U16, "Field 1012"),
        0x1013 => (U16, "Field 1013"),
        0x1014 => (U16, "Field 1014"),
        0x1015 => (U16, "Field 1015"),
        0x1016 => (U16, "Field 1016 (WiFi fw)"),
        0x2015 => (U32, "Binary length"),
        0x2017 => (U32, "Field 2017"),
        0x2018 => (U32, "Field 2018"),
        0x2019 => (U32, "Field 2019"),
        0x201a => (U32, "Field 201a"),
        0x4007 => (Blob31, "Opaque 31-byte blob"),
        _ => return None,
    })
}

/// Human-readable description for a GCD record type_id, matching the
/// Python original's `TLV_TYPES` comment table.
pub fn describe_type_id(type_id: u16) -> String {
    match type_id {
        0x0001 => "Checksum rectifier".to_string(),
        0x0002 => "Padding".to_string(),
        0x0003 => "Part number?".to_string(),
        0x0005 => "Copyright notice".to_string(),
        0x0006 => "Block Type 7 format definition".to_string(),
        0x0007 => "Binary descriptor".to_string(),
        0x0008 => "Binary Region 08 (boot.bin)".to_string(),
        0x0401 => "Binary Component Firmware (SensorHub, ANT_BLE_BT, GPS, WiFi)".to_string(),
        0x0505 => "Binary Region 05".to_string(),
        0x0555 => "Binary Region 55".to_string(),
        0x02bd => "Binary Region 0E (fw_all.bin)".to_string(),
        0xffff => "EOF marker".to_string(),
        other if is_binary_type_id(other) => format!("Binary Region {other:04x}"),
        other => format!("Type {other:04x} / {other}"),
    }
}

/// Type ids that carry binary firmware region payloads (spec.md §3/§4.2),
/// excluding 0x0401 which gets its own variant with header semantics.
pub fn is_binary_type_id(type_id: u16) -> bool {
    matches!(
        type_id,
        0x0008 | 0x02bd | 0x0505 | 0x0510 | 0x051b | 0x052b | 0x0533 | 0x0549
    ) || (0x0555..=0x05fe).contains(&type_id)
        || (0x07d1..=0x07d3).contains(&type_id)
}

fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn un_hex_dump(s: &str) -> Option<Vec<u8>> {
    s.split_whitespace()
        .map(|tok| u8::from_str_radix(tok, 16).ok())
        .collect()
}

/// One `(key, value, comment)` triple as emitted into a recipe `[BLOCK_n]`
/// section, matching `TLV.dump()` in the Python original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpEntry {
    pub key: String,
    pub value: String,
    pub comment: Option<String>,
}

impl DumpEntry {
    fn new(key: impl Into<String>, value: impl Into<String>, comment: Option<&str>) -> Self {
        DumpEntry {
            key: key.into(),
            value: value.into(),
            comment: comment.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RectifierRecord {
    pub offset: Option<u32>,
    pub value: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddingRecord {
    pub offset: Option<u32>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartNumberRecord {
    pub offset: Option<u32>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyrightRecord {
    pub offset: Option<u32>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub field_id: u16,
    pub kind: FieldType,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRecord {
    pub offset: Option<u32>,
    /// Data fields in order, excluding the terminator.
    pub fields: Vec<SchemaField>,
}

impl SchemaRecord {
    /// Total byte length a descriptor bound to this schema must have.
    pub fn format_len(&self) -> usize {
        self.fields.iter().map(|f| f.kind.size()).sum()
    }

    pub fn parse(value: &[u8], offset: Option<u32>) -> Result<SchemaRecord, TlvError> {
        if value.len() % 2 != 0 {
            log::error!(
                "schema at 0x{:x} has odd length {}",
                offset.unwrap_or(0),
                value.len()
            );
            return Err(TlvError::InvalidSchemaLength {
                offset: offset.unwrap_or(0),
                length: value.len(),
            });
        }
        let chunk_count = value.len() / 2;
        let mut fields = Vec::with_capacity(chunk_count.saturating_sub(1));
        for (i, chunk) in value.chunks_exact(2).enumerate() {
            let field_id = u16::from_le_bytes([chunk[0], chunk[1]]);
            let is_last = i == chunk_count - 1;
            if field_id == SCHEMA_TERMINATOR {
                if !is_last {
                    log::error!(
                        "schema at 0x{:x} has terminator before its last field",
                        offset.unwrap_or(0)
                    );
                    return Err(TlvError::InvalidSchemaLength {
                        offset: offset.unwrap_or(0),
                        length: value.len(),
                    });
                }
                break;
            }
            if is_last {
                // Ran off the end without ever seeing the terminator.
                log::error!(
                    "schema at 0x{:x} missing terminator field 0x5003",
                    offset.unwrap_or(0)
                );
                return Err(TlvError::InvalidSchemaLength {
                    offset: offset.unwrap_or(0),
                    length: value.len(),
                });
            }
            let (kind, description) = field_type(field_id).ok_or_else(|| {
                log::error!(
                    "schema at 0x{:x} has unknown field_id 0x{field_id:04x}",
                    offset.unwrap_or(0)
                );
                TlvError::UnknownFieldId {
                    offset: offset.unwrap_or(0),
                    field_id,
                }
            })?;
            fields.push(SchemaField {
                field_id,
                kind,
                description,
            });
        }
        Ok(SchemaRecord { offset, fields })
    }

    pub fn serialize_value(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.fields.len() * 2 + 2);
        for f in &self.fields {
            out.extend_from_slice(&f.field_id.to_le_bytes());
        }
        out.extend_from_slice(&SCHEMA_TERMINATOR.to_le_bytes());
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    Blob31(Box<[u8; 31]>),
}

impl FieldValue {
    fn serialize(&self, out: &mut Vec<u8>) {
        match self {
            FieldValue::U8(v) => out.push(*v),
            FieldValue::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::Blob31(v) => out.extend_from_slice(v.as_ref()),
        }
    }

    /// Render like the Python dump: `0x..` hex, width matching the type.
    pub fn dump_value(&self) -> String {
        match self {
            FieldValue::U8(v) => format!("0x{v:02x}"),
            FieldValue::U16(v) => format!("0x{v:04x}"),
            FieldValue::U32(v) => format!("0x{v:08x}"),
            FieldValue::Blob31(v) => hex_dump(v.as_ref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorField {
    pub field_id: u16,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorRecord {
    pub offset: Option<u32>,
    /// Index of the bound schema (type 6) record in the container.
    pub schema_index: usize,
    pub fields: Vec<DescriptorField>,
}

impl DescriptorRecord {
    pub fn parse(
        value: &[u8],
        schema: &SchemaRecord,
        schema_index: usize,
        offset: Option<u32>,
    ) -> Result<DescriptorRecord, TlvError> {
        let expected = schema.format_len();
        if value.len() != expected {
            log::error!(
                "descriptor at 0x{:x} expected {expected} bytes per bound schema, got {}",
                offset.unwrap_or(0),
                value.len()
            );
            return Err(TlvError::TruncatedDescriptor {
                offset: offset.unwrap_or(0),
                expected,
                actual: value.len(),
            });
        }
        let mut fields = Vec::with_capacity(schema.fields.len());
        let mut pos = 0;
        for sf in &schema.fields {
            let size = sf.kind.size();
            let slot = &value[pos..pos + size];
            let fv = match sf.kind {
                FieldType::U8 => FieldValue::U8(slot[0]),
                FieldType::U16 => FieldValue::U16(u16::from_le_bytes([slot[0], slot[1]])),
                FieldType::U32 => {
                    FieldValue::U32(u32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]))
                }
                FieldType::Blob31 => {
                    let mut buf = [0u8; 31];
                    buf.copy_from_slice(slot);
                    FieldValue::Blob31(Box::new(buf))
                }
            };
            fields.push(DescriptorField {
                field_id: sf.field_id,
                value: fv,
            });
            pos += size;
        }
        Ok(DescriptorRecord {
            offset,
            schema_index,
            fields,
        })
    }

    pub fn serialize_value(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for f in &self.fields {
            f.value.serialize(&mut out);
        }
        out
    }

    /// The binary type id declared by field 0x100a, if present.
    pub fn binary_type_id(&self) -> Option<u16> {
        self.fields.iter().find_map(|f| match (f.field_id, &f.value) {
            (0x100a, FieldValue::U16(v)) => Some(*v),
            _ => None,
        })
    }

    /// The cumulative binary length declared by field 0x2015, if present.
    pub fn binary_length(&self) -> Option<u32> {
        self.fields.iter().find_map(|f| match (f.field_id, &f.value) {
            (0x2015, FieldValue::U32(v)) => Some(*v),
            _ => None,
        })
    }

    /// The device hw_id declared by field 0x1009, if present.
    pub fn device_hw_id(&self) -> Option<u16> {
        self.fields.iter().find_map(|f| match (f.field_id, &f.value) {
            (0x1009, FieldValue::U16(v)) => Some(*v),
            _ => None,
        })
    }

    /// Rewrite the 0x2015 slot in place, preserving every other slot
    /// (spec.md §4.2 `set_binary_length`).
    pub fn set_binary_length(&mut self, n: u32) {
        if let Some(f) = self.fields.iter_mut().find(|f| f.field_id == 0x2015) {
            f.value = FieldValue::U32(n);
        } else {
            log::warn!("descriptor has no 0x2015 slot to set binary length on");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryRecord {
    pub offset: Option<u32>,
    pub type_id: u16,
    /// Index of the bound descriptor (type 7) record in the container.
    pub descriptor_index: usize,
    pub data: Vec<u8>,
}

/// Parsed header of a type-0x0401 "component firmware" binary: a small
/// fixed prefix ahead of the raw firmware blob (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentFirmwareHeader {
    pub marker_valid: bool,
    pub version: u16,
    pub sku: [u8; 10],
}

impl ComponentFirmwareHeader {
    pub fn sku_str(&self) -> String {
        String::from_utf8_lossy(&self.sku)
            .trim_end_matches('\0')
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentFirmwareRecord {
    pub offset: Option<u32>,
    pub descriptor_index: usize,
    pub data: Vec<u8>,
}

impl ComponentFirmwareRecord {
    /// Parse the fixed header, if the payload is long enough to contain
    /// one. Never fails: a short/garbled component firmware payload just
    /// reports `None`, matching this whole field's best-effort status
    /// (spec.md §9).
    pub fn header(&self) -> Option<ComponentFirmwareHeader> {
        if self.data.len() < 20 {
            return None;
        }
        let marker_valid = self.data[0..4] == [0xff, 0xff, 0xff, 0xff];
        let version = u16::from_le_bytes([self.data[4], self.data[5]]);
        let mut sku = [0u8; 10];
        sku.copy_from_slice(&self.data[10..20]);
        Some(ComponentFirmwareHeader {
            marker_valid,
            version,
            sku,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericRecord {
    pub offset: Option<u32>,
    pub type_id: u16,
    pub data: Vec<u8>,
}

/// One record in a GCD record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tlv {
    Rectifier(RectifierRecord),
    Padding(PaddingRecord),
    PartNumber(PartNumberRecord),
    Copyright(CopyrightRecord),
    Schema(SchemaRecord),
    Descriptor(DescriptorRecord),
    Binary(BinaryRecord),
    ComponentFirmware(ComponentFirmwareRecord),
    Eof { offset: Option<u32> },
    Generic(GenericRecord),
}

impl Tlv {
    pub fn type_id(&self) -> u16 {
        match self {
            Tlv::Rectifier(_) => 0x0001,
            Tlv::Padding(_) => 0x0002,
            Tlv::PartNumber(_) => 0x0003,
            Tlv::Copyright(_) => 0x0005,
            Tlv::Schema(_) => 0x0006,
            Tlv::Descriptor(_) => 0x0007,
            Tlv::Binary(b) => b.type_id,
            Tlv::ComponentFirmware(_) => 0x0401,
            Tlv::Eof { .. } => 0xffff,
            Tlv::Generic(g) => g.type_id,
        }
    }

    pub fn offset(&self) -> Option<u32> {
        match self {
            Tlv::Rectifier(r) => r.offset,
            Tlv::Padding(p) => p.offset,
            Tlv::PartNumber(p) => p.offset,
            Tlv::Copyright(c) => c.offset,
            Tlv::Schema(s) => s.offset,
            Tlv::Descriptor(d) => d.offset,
            Tlv::Binary(b) => b.offset,
            Tlv::ComponentFirmware(c) => c.offset,
            Tlv::Eof { offset } => *offset,
            Tlv::Generic(g) => g.offset,
        }
    }

    pub fn value(&self) -> Vec<u8> {
        match self {
            Tlv::Rectifier(r) => vec![r.value],
            Tlv::Padding(p) => p.data.clone(),
            Tlv::PartNumber(p) => p.data.clone(),
            Tlv::Copyright(c) => c.text.as_bytes().to_vec(),
            Tlv::Schema(s) => s.serialize_value(),
            Tlv::Descriptor(d) => d.serialize_value(),
            Tlv::Binary(b) => b.data.clone(),
            Tlv::ComponentFirmware(c) => c.data.clone(),
            Tlv::Eof { .. } => Vec::new(),
            Tlv::Generic(g) => g.data.clone(),
        }
    }

    /// `u16 type | u16 length | value` (spec.md §6). Little-endian.
    pub fn serialize(&self) -> Vec<u8> {
        let value = self.value();
        let mut out = Vec::with_capacity(4 + value.len());
        out.extend_from_slice(&self.type_id().to_le_bytes());
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
        out.extend_from_slice(&value);
        out
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Tlv::Binary(_) | Tlv::ComponentFirmware(_))
    }

    /// Index of the binding record (schema for a descriptor, descriptor
    /// for a binary region), if this variant has one.
    pub fn bound_index(&self) -> Option<usize> {
        match self {
            Tlv::Descriptor(d) => Some(d.schema_index),
            Tlv::Binary(b) => Some(b.descriptor_index),
            Tlv::ComponentFirmware(c) => Some(c.descriptor_index),
            _ => None,
        }
    }

    /// Entries for a recipe `[BLOCK_n]` section (non-binary records only;
    /// binary-bearing records are dumped by `Gcd::dump_to_recipe`, which
    /// needs the bound descriptor alongside the side-file name).
    pub fn dump(&self) -> Vec<DumpEntry> {
        let mut data = vec![DumpEntry::new(
            "type",
            format!("0x{:04x}", self.type_id()),
            Some(&describe_type_id(self.type_id())),
        )];
        match self {
            Tlv::Rectifier(_) => {}
            Tlv::Padding(p) => {
                data.push(DumpEntry::new(
                    "length",
                    p.data.len().to_string(),
                    Some("Length of padding block"),
                ));
            }
            Tlv::PartNumber(p) => {
                data.push(DumpEntry::new("length", p.data.len().to_string(), None));
                data.push(DumpEntry::new("value", hex_dump(&p.data), None));
            }
            Tlv::Copyright(c) => {
                data.push(DumpEntry::new("length", c.text.len().to_string(), None));
                data.push(DumpEntry::new("text", c.text.clone(), None));
            }
            Tlv::Schema(_) | Tlv::Descriptor(_) => {
                // Chained into the binary region's dump instead.
            }
            Tlv::Binary(_) | Tlv::ComponentFirmware(_) => {
                // Handled by Gcd::dump_to_recipe (needs side-file naming).
            }
            Tlv::Eof { .. } => {}
            Tlv::Generic(g) => {
                data.push(DumpEntry::new("length", g.data.len().to_string(), None));
                data.push(DumpEntry::new("value", hex_dump(&g.data), None));
            }
        }
        data
    }

    /// Reconstruct a non-binding, non-binary record from its recipe dump
    /// entries (spec.md §4.3 `TLV.create_from_dump`).
    pub fn create_from_dump(entries: &[DumpEntry]) -> Option<Tlv> {
        let type_str = entries.iter().find(|e| e.key == "type")?.value.clone();
        let type_id = u16::from_str_radix(type_str.trim_start_matches("0x"), 16).ok()?;
        match type_id {
            0x0001 => Some(Tlv::Rectifier(RectifierRecord {
                offset: None,
                value: 0, // computed in Gcd::fix_checksums
            })),
            0x0002 => {
                let len: usize = entries.iter().find(|e| e.key == "length")?.value.parse().ok()?;
                Some(Tlv::Padding(PaddingRecord {
                    offset: None,
                    data: vec![0u8; len],
                }))
            }
            0x0003 => {
                let hex = entries.iter().find(|e| e.key == "value")?.value.clone();
                Some(Tlv::PartNumber(PartNumberRecord {
                    offset: None,
                    data: un_hex_dump(&hex)?,
                }))
            }
            0x0005 => {
                let text = entries.iter().find(|e| e.key == "text")?.value.clone();
                Some(Tlv::Copyright(CopyrightRecord { offset: None, text }))
            }
            0xffff => Some(Tlv::Eof { offset: None }),
            other => {
                let hex = entries.iter().find(|e| e.key == "value")?.value.clone();
                Some(Tlv::Generic(GenericRecord {
                    offset: None,
                    type_id: other,
                    data: un_hex_dump(&hex)?,
                }))
            }
        }
    }
}

impl Tlv {
    /// Like [`Display`](std::fmt::Display), but a descriptor record that
    /// declares field 0x1009 also resolves that device hw_id through
    /// `lookup`, falling back to [`device_names::UNKNOWN_DEVICE`] (matching
    /// the Python original's `TLV7.__str__`, `grmn/tlv.py`).
    pub fn describe(&self, lookup: &dyn DeviceNameLookup) -> String {
        match self {
            Tlv::Descriptor(d) => match d.device_hw_id() {
                Some(hw_id) => format!(
                    "{self} - device 0x{hw_id:04x}: {}",
                    device_names::describe(lookup, hw_id)
                ),
                None => self.to_string(),
            },
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for Tlv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.value().len();
        let plural = if len == 1 { "" } else { "s" };
        let offset = match self.offset() {
            Some(o) => format!(" at 0x{o:x}"),
            None => String::new(),
        };
        write!(
            f,
            "TLV Type {:04x}{offset}, {len} Byte{plural} - {}",
            self.type_id(),
            describe_type_id(self.type_id())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_with_only_terminator_is_zero_slot() {
        let schema = SchemaRecord::parse(&0x5003u16.to_le_bytes(), None).unwrap();
        assert!(schema.fields.is_empty());
        assert_eq!(schema.format_len(), 0);
    }

    #[test]
    fn schema_rejects_odd_length() {
        let err = SchemaRecord::parse(&[0x0a], None).unwrap_err();
        assert!(matches!(err, TlvError::InvalidSchemaLength { .. }));
    }

    #[test]
    fn schema_rejects_unknown_field_id() {
        let mut payload = 0xdeadu16.to_le_bytes().to_vec();
        payload.extend_from_slice(&SCHEMA_TERMINATOR.to_le_bytes());
        let err = SchemaRecord::parse(&payload, None).unwrap_err();
        assert!(matches!(err, TlvError::UnknownFieldId { field_id: 0xdead, .. }));
    }

    #[test]
    fn schema_requires_trailing_terminator() {
        // 0x000a then garbage that never terminates with 0x5003.
        let payload = 0x000au16.to_le_bytes().to_vec();
        let err = SchemaRecord::parse(&payload, None).unwrap_err();
        assert!(matches!(err, TlvError::InvalidSchemaLength { .. }));
    }

    #[test]
    fn descriptor_parses_per_schema_format() {
        // Schema: 0x000a (B), 0x2015 (L), terminator -- spec.md §8 scenario 3.
        let schema_payload = [
            0x0a, 0x00, // 0x000a
            0x15, 0x20, // 0x2015
            0x03, 0x50, // terminator
        ];
        let schema = SchemaRecord::parse(&schema_payload, None).unwrap();
        assert_eq!(schema.format_len(), 5);

        let descriptor_payload = [0x01, 0x44, 0x33, 0x22, 0x11];
        let descriptor = DescriptorRecord::parse(&descriptor_payload, &schema, 0, None).unwrap();
        assert_eq!(descriptor.fields[0].value, FieldValue::U8(0x01));
        assert_eq!(descriptor.fields[1].value, FieldValue::U32(0x11223344));
        assert_eq!(descriptor.binary_length(), Some(0x11223344));
    }

    #[test]
    fn descriptor_exposes_binary_type_id_and_length() {
        // Schema: 0x100a (H, block type), 0x2015 (L, binary length).
        let schema_payload = [0x0a, 0x10, 0x15, 0x20, 0x03, 0x50];
        let schema = SchemaRecord::parse(&schema_payload, None).unwrap();
        let descriptor_payload = [0x08, 0x00, 0x01, 0x02, 0x03, 0x04];
        let mut descriptor = DescriptorRecord::parse(&descriptor_payload, &schema, 0, None).unwrap();
        assert_eq!(descriptor.binary_type_id(), Some(0x0008));
        assert_eq!(descriptor.binary_length(), Some(0x04030201));

        descriptor.set_binary_length(0x1ff01);
        assert_eq!(descriptor.binary_length(), Some(0x1ff01));
        // Other slot untouched.
        assert_eq!(descriptor.binary_type_id(), Some(0x0008));
    }

    #[test]
    fn descriptor_truncated_payload_is_rejected() {
        let schema_payload = [0x0a, 0x10, 0x15, 0x20, 0x03, 0x50];
        let schema = SchemaRecord::parse(&schema_payload, None).unwrap();
        let err = DescriptorRecord::parse(&[0x01, 0x02], &schema, 0, None).unwrap_err();
        assert!(matches!(err, TlvError::TruncatedDescriptor { expected: 6, actual: 2, .. }));
    }

    #[test]
    fn serialize_round_trips_header_and_value() {
        let rec = Tlv::Rectifier(RectifierRecord {
            offset: None,
            value: 0xab,
        });
        let bytes = rec.serialize();
        assert_eq!(bytes, vec![0x01, 0x00, 0x01, 0x00, 0xab]);
    }

    #[test]
    fn component_firmware_header_parses_marker_version_sku() {
        let mut data = vec![0xffu8; 4];
        data.extend_from_slice(&0x0102u16.to_le_bytes());
        data.extend_from_slice(&[0u8; 4]); // offsets 6..10 unspecified
        data.extend_from_slice(b"HX30-BOARD");
        let rec = ComponentFirmwareRecord {
            offset: None,
            descriptor_index: 0,
            data,
        };
        let header = rec.header().unwrap();
        assert!(header.marker_valid);
        assert_eq!(header.version, 0x0102);
        assert_eq!(header.sku_str(), "HX30-BOARD");
    }

    #[test]
    fn component_firmware_header_none_when_too_short() {
        let rec = ComponentFirmwareRecord {
            offset: None,
            descriptor_index: 0,
            data: vec![0xff; 10],
        };
        assert!(rec.header().is_none());
    }

    #[test]
    fn describe_resolves_device_name_from_descriptor_hw_id() {
        use crate::device_names::UNKNOWN_DEVICE;
        use std::collections::HashMap;

        // Schema: 0x1009 (H, device hw_id).
        let schema = SchemaRecord::parse(&[0x09, 0x10, 0x03, 0x50], None).unwrap();
        let descriptor = DescriptorRecord::parse(&[0x34, 0x12], &schema, 0, None).unwrap();
        let tlv = Tlv::Descriptor(descriptor);

        let mut names = HashMap::new();
        names.insert(0x1234u16, "Edge 530".to_string());
        assert!(tlv.describe(&names).contains("Edge 530"));
        assert!(tlv.describe(&()).contains(UNKNOWN_DEVICE));
    }

    #[test]
    fn binary_type_id_set_matches_spec_ranges() {
        assert!(is_binary_type_id(0x0008));
        assert!(is_binary_type_id(0x02bd));
        assert!(is_binary_type_id(0x0560));
        assert!(is_binary_type_id(0x07d2));
        assert!(!is_binary_type_id(0x0401)); // own variant, not generic binary
        assert!(!is_binary_type_id(0x0006));
    }
}
