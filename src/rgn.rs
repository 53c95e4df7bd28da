//! The outer RGN record stream: a thin framing layer that wraps either a
//! nested RGN or a raw BIN firmware image (spec.md §3/§4.4).
//!
//! Grounded in `examples/original_source/grmn/rgn.py`'s `Rgn` class: a
//! 4-byte `KpGr` signature, a version word, then `length(4) | type(1) |
//! payload` records dispatched on an ASCII type tag (`D`/`A`/`R`). Only
//! `R` records carry a nested region (another RGN or a BIN); payload
//! identification is done the way `FrameworkComputer-framework-system`'s
//! `capsule.rs` sniffs a nested capsule header before deciding how to
//! descend into it.

use crate::error::RgnError;
use crate::rgn_bin::RgnBin;

/// `K p G r`
pub const RGN_SIGNATURE: [u8; 4] = *b"KpGr";

/// What a region (`R`) record's contents turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RgnPayload {
    Nested(Rgn),
    Bin(RgnBin),
}

/// The type-specific body of one RGN record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RgnRecordKind {
    /// `D`: a bare 2-byte data version.
    Data { version: u16 },
    /// `A`: an application version plus three NUL-delimited strings
    /// (builder, date, time).
    App {
        version: u16,
        builder: String,
        date: String,
        time: String,
    },
    /// `R`: a named region carrying either a nested RGN or a BIN image.
    Region {
        region_id: u16,
        delay_ms: u32,
        size: u32,
        payload: RgnPayload,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgnRecord {
    pub offset: u32,
    pub record_type: u8,
    pub kind: RgnRecordKind,
}

/// A parsed RGN record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rgn {
    pub version: u16,
    pub records: Vec<RgnRecord>,
}

impl Rgn {
    /// Parse a full in-memory RGN buffer.
    pub fn parse(data: &[u8]) -> Result<Rgn, RgnError> {
        if data.len() < 4 || data[0..4] != RGN_SIGNATURE {
            let mut found = [0u8; 4];
            let n = data.len().min(4);
            found[..n].copy_from_slice(&data[..n]);
            log::error!("RGN signature mismatch, found {found:02x?}");
            return Err(RgnError::SignatureMismatch { found });
        }
        if data.len() < 6 {
            log::error!("RGN stream truncated before the version field");
            return Err(RgnError::TruncatedStream {
                offset: 4,
                expected: 2,
                actual: data.len().saturating_sub(4),
            });
        }
        let version = u16::from_le_bytes([data[4], data[5]]);
        let mut pos = 6usize;
        let mut records = Vec::new();

        while pos < data.len() {
            let offset = pos as u32;
            if pos + 5 > data.len() {
                log::error!(
                    "RGN stream truncated at 0x{offset:x}: need 5-byte header, {} bytes remain",
                    data.len() - pos
                );
                return Err(RgnError::TruncatedStream {
                    offset,
                    expected: 5,
                    actual: data.len() - pos,
                });
            }
            let length = u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
            let record_type = data[pos + 4];
            pos += 5;

            let payload_len = length as usize;
            if pos + payload_len > data.len() {
                log::error!(
                    "RGN record type {:?} at 0x{offset:x} declares {length} bytes, only {} remain",
                    record_type as char,
                    data.len() - pos
                );
                return Err(RgnError::TruncatedStream {
                    offset,
                    expected: length,
                    actual: data.len() - pos,
                });
            }
            let payload = &data[pos..pos + payload_len];
            pos += payload_len;

            let kind = Self::parse_record(offset, record_type, length, payload)?;
            records.push(RgnRecord {
                offset,
                record_type,
                kind,
            });
        }

        Ok(Rgn { version, records })
    }

    fn parse_record(
        offset: u32,
        record_type: u8,
        length: u32,
        payload: &[u8],
    ) -> Result<RgnRecordKind, RgnError> {
        match record_type {
            b'D' => {
                if payload.len() < 2 {
                    log::error!("RGN 'D' record at 0x{offset:x} shorter than 2 bytes");
                    return Err(RgnError::TruncatedStream {
                        offset,
                        expected: 2,
                        actual: payload.len(),
                    });
                }
                Ok(RgnRecordKind::Data {
                    version: u16::from_le_bytes([payload[0], payload[1]]),
                })
            }
            b'A' => {
                if payload.len() < 2 {
                    log::error!("RGN 'A' record at 0x{offset:x} shorter than 2 bytes");
                    return Err(RgnError::TruncatedStream {
                        offset,
                        expected: 2,
                        actual: payload.len(),
                    });
                }
                let version = u16::from_le_bytes([payload[0], payload[1]]);
                let mut parts = payload[2..]
                    .split(|&b| b == 0)
                    .map(|s| String::from_utf8_lossy(s).to_string());
                let builder = parts.next().unwrap_or_default();
                let date = parts.next().unwrap_or_default();
                let time = parts.next().unwrap_or_default();
                Ok(RgnRecordKind::App {
                    version,
                    builder,
                    date,
                    time,
                })
            }
            b'R' => {
                if payload.len() < 10 {
                    log::error!("RGN 'R' record at 0x{offset:x} shorter than the 10-byte header");
                    return Err(RgnError::TruncatedStream {
                        offset,
                        expected: 10,
                        actual: payload.len(),
                    });
                }
                let region_id = u16::from_le_bytes([payload[0], payload[1]]);
                let delay_ms =
                    u32::from_le_bytes([payload[2], payload[3], payload[4], payload[5]]);
                let size = u32::from_le_bytes([payload[6], payload[7], payload[8], payload[9]]);
                if size.checked_add(10) != Some(length) {
                    log::error!(
                        "RGN region 0x{region_id:04x} at 0x{offset:x} declares size {size}, record length is {length}"
                    );
                    return Err(RgnError::RegionSizeMismatch {
                        offset,
                        record_length: length,
                        declared_size: size,
                    });
                }
                let contents = &payload[10..];
                let nested = if contents.len() >= 4 && contents[0..4] == RGN_SIGNATURE {
                    log::debug!("RGN region 0x{region_id:04x} at 0x{offset:x} nests another RGN stream");
                    RgnPayload::Nested(Rgn::parse(contents)?)
                } else {
                    RgnPayload::Bin(RgnBin::analyze(contents))
                };
                Ok(RgnRecordKind::Region {
                    region_id,
                    delay_ms,
                    size,
                    payload: nested,
                })
            }
            other => {
                log::error!("RGN record at 0x{offset:x} has unknown type 0x{other:02x}");
                Err(RgnError::UnknownRecordType {
                    offset,
                    type_id: other,
                })
            }
        }
    }

    /// Pretty-print, one line per record, descending into nested RGNs
    /// with indentation (spec.md §4.4). A BIN region's recovered hw_id is
    /// resolved through `lookup`, falling back to `"Unknown device"`.
    pub fn print_struct(&self, lookup: &dyn crate::device_names::DeviceNameLookup) {
        self.print_struct_indented(0, lookup);
    }

    fn print_struct_indented(&self, depth: usize, lookup: &dyn crate::device_names::DeviceNameLookup) {
        let pad = "  ".repeat(depth);
        println!("{pad}RGN version {}, {} record(s)", self.version, self.records.len());
        for rec in &self.records {
            match &rec.kind {
                RgnRecordKind::Data { version } => {
                    println!("{pad}  D at 0x{:x}: version {version}", rec.offset);
                }
                RgnRecordKind::App {
                    version,
                    builder,
                    date,
                    time,
                } => {
                    println!(
                        "{pad}  A at 0x{:x}: version {version}, {builder} {date} {time}",
                        rec.offset
                    );
                }
                RgnRecordKind::Region {
                    region_id,
                    size,
                    payload,
                    ..
                } => {
                    println!(
                        "{pad}  R at 0x{:x}: region 0x{region_id:04x}, {size} bytes",
                        rec.offset
                    );
                    match payload {
                        RgnPayload::Nested(inner) => inner.print_struct_indented(depth + 2, lookup),
                        RgnPayload::Bin(bin) => {
                            let device = bin
                                .hw_id()
                                .map(|id| crate::device_names::describe(lookup, id))
                                .unwrap_or(crate::device_names::UNKNOWN_DEVICE);
                            println!(
                                "{pad}    BIN hw_id={:?} ({device}) version={:?} checksum_valid={}",
                                bin.hw_id(),
                                bin.version(),
                                bin.checksum_valid()
                            );
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn record_bytes(record_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = (payload.len() as u32).to_le_bytes().to_vec();
        out.push(record_type);
        out.extend_from_slice(payload);
        out
    }

    fn region_bytes(region_id: u16, delay_ms: u32, contents: &[u8]) -> Vec<u8> {
        let mut payload = region_id.to_le_bytes().to_vec();
        payload.extend_from_slice(&delay_ms.to_le_bytes());
        payload.extend_from_slice(&(contents.len() as u32).to_le_bytes());
        payload.extend_from_slice(contents);
        record_bytes(b'R', &payload)
    }

    fn rgn_stream(version: u16, records: &[Vec<u8>]) -> Vec<u8> {
        let mut out = RGN_SIGNATURE.to_vec();
        out.extend_from_slice(&version.to_le_bytes());
        for r in records {
            out.extend_from_slice(r);
        }
        out
    }

    #[test]
    fn signature_mismatch_is_rejected() {
        init_logger();
        let err = Rgn::parse(b"NOPE").unwrap_err();
        assert!(matches!(err, RgnError::SignatureMismatch { .. }));
    }

    #[test]
    fn empty_stream_parses_with_zero_records() {
        init_logger();
        let data = rgn_stream(1, &[]);
        let rgn = Rgn::parse(&data).unwrap();
        assert_eq!(rgn.version, 1);
        assert!(rgn.records.is_empty());
    }

    #[test]
    fn data_record_exposes_version() {
        init_logger();
        let data = rgn_stream(1, &[record_bytes(b'D', &0x0102u16.to_le_bytes())]);
        let rgn = Rgn::parse(&data).unwrap();
        assert_eq!(rgn.records.len(), 1);
        assert!(matches!(
            rgn.records[0].kind,
            RgnRecordKind::Data { version: 0x0102 }
        ));
    }

    #[test]
    fn app_record_splits_three_nul_strings() {
        init_logger();
        let mut payload = 7u16.to_le_bytes().to_vec();
        payload.extend_from_slice(b"builder\0v1.0\012:00\0");
        let data = rgn_stream(1, &[record_bytes(b'A', &payload)]);
        let rgn = Rgn::parse(&data).unwrap();
        match &rgn.records[0].kind {
            RgnRecordKind::App {
                version,
                builder,
                date,
                time,
            } => {
                assert_eq!(*version, 7);
                assert_eq!(builder, "builder");
                assert_eq!(date, "v1.0");
                assert_eq!(time, "12:00");
            }
            _ => panic!("expected App record"),
        }
    }

    #[test]
    fn scenario_6_flat_bin_region_is_identified() {
        init_logger();
        let contents = vec![0xAAu8; 32];
        let data = rgn_stream(2, &[region_bytes(0x0008, 0, &contents)]);
        let rgn = Rgn::parse(&data).unwrap();
        assert_eq!(rgn.records.len(), 1);
        match &rgn.records[0].kind {
            RgnRecordKind::Region { payload, .. } => {
                assert!(matches!(payload, RgnPayload::Bin(_)));
            }
            _ => panic!("expected Region record"),
        }
    }

    #[test]
    fn scenario_6_nested_rgn_is_identified_and_recursed() {
        init_logger();
        let inner_contents = vec![0x11u8; 16];
        let inner = rgn_stream(9, &[region_bytes(0x0009, 5, &inner_contents)]);
        let data = rgn_stream(1, &[region_bytes(0x0001, 0, &inner)]);
        let rgn = Rgn::parse(&data).unwrap();
        match &rgn.records[0].kind {
            RgnRecordKind::Region { payload, .. } => match payload {
                RgnPayload::Nested(nested) => {
                    assert_eq!(nested.version, 9);
                    assert_eq!(nested.records.len(), 1);
                }
                RgnPayload::Bin(_) => panic!("expected nested RGN"),
            },
            _ => panic!("expected Region record"),
        }
    }

    #[test]
    fn region_size_mismatch_is_rejected() {
        init_logger();
        let mut payload = 1u16.to_le_bytes().to_vec(); // region_id
        payload.extend_from_slice(&0u32.to_le_bytes()); // delay_ms
        payload.extend_from_slice(&5u32.to_le_bytes()); // size, but only 0 content bytes follow
        let record = record_bytes(b'R', &payload);
        let data = rgn_stream(1, &[record]);
        let err = Rgn::parse(&data).unwrap_err();
        assert!(matches!(err, RgnError::RegionSizeMismatch { .. }));
    }

    #[test]
    fn unknown_record_type_is_rejected() {
        init_logger();
        let data = rgn_stream(1, &[record_bytes(b'Z', &[0, 0])]);
        let err = Rgn::parse(&data).unwrap_err();
        assert!(matches!(err, RgnError::UnknownRecordType { type_id: b'Z', .. }));
    }

    #[test]
    fn truncated_record_header_is_rejected() {
        init_logger();
        let mut data = RGN_SIGNATURE.to_vec();
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&[0x01, 0x02]);
        let err = Rgn::parse(&data).unwrap_err();
        assert!(matches!(err, RgnError::TruncatedStream { .. }));
    }

    #[test]
    fn multiple_records_parse_in_order() {
        init_logger();
        let data = rgn_stream(
            3,
            &[
                record_bytes(b'D', &1u16.to_le_bytes()),
                record_bytes(b'D', &2u16.to_le_bytes()),
            ],
        );
        let rgn = Rgn::parse(&data).unwrap();
        assert_eq!(rgn.records.len(), 2);
        assert!(matches!(rgn.records[0].kind, RgnRecordKind::Data { version: 1 }));
        assert!(matches!(rgn.records[1].kind, RgnRecordKind::Data { version: 2 }));
    }
}
