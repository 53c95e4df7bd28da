//! Heuristic metadata recovery for a raw BIN firmware payload (spec.md
//! §4.5).
//!
//! There's no known original-source algorithm for this layer — the
//! original's `grmn/rgnbin.py` is an empty stub — so the five
//! first-word-dispatched variants and the 252/256, 508/512, and
//! last-6-bytes fallbacks below are built directly off the
//! specification's table, in the offset-arithmetic style
//! `ec_binary.rs`/`ccgx/binary.rs` use to recover metadata from a fixed
//! firmware header: small helper reads, `Option`-returning lookups,
//! nothing that aborts the whole parse on a miss.

use crate::chksum::ChkSum;
use crate::error::RgnBinWarning;

/// The 8-byte pattern marking the end of the firmware image within a
/// BIN payload (spec.md §4.5/Glossary).
pub const END_MARKER: [u8; 8] = [0xff, 0xff, 0x5a, 0xa5, 0xff, 0xff, 0xff, 0xff];

/// A BIN firmware payload with its (best-effort) recovered metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgnBin {
    data: Vec<u8>,
    hw_id: Option<u16>,
    version: Option<u16>,
    checksum_valid: bool,
    end_marker_offset: Option<usize>,
    warnings: Vec<RgnBinWarning>,
}

impl RgnBin {
    /// Analyze a raw BIN payload. Never fails: an unrecognized layout or
    /// out-of-bounds offset just leaves `hw_id`/`version` unset and
    /// records a warning (spec.md §9 "Heuristic BIN metadata").
    pub fn analyze(data: &[u8]) -> RgnBin {
        let mut csum = ChkSum::new();
        csum.add(data);
        let checksum_valid = csum.valid();

        let end_marker_offset = find_end_marker(data);
        let mut warnings = Vec::new();
        let mut hw_id = None;
        let mut version = None;

        if data.len() >= 4 {
            let first_word = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
            let outcome = match first_word {
                0xe59ff008 => variant_1(data),
                0xe59ff00c => variant_2(data),
                0xea000002 | 0xea000003 => variant_3(data, end_marker_offset, first_word),
                0xea000004 => Err(RgnBinWarning::LayoutUnrecognized { first_word }),
                other => Err(RgnBinWarning::LayoutUnrecognized { first_word: other }),
            };
            match outcome {
                Ok((h, v)) => {
                    hw_id = Some(h);
                    version = Some(v);
                }
                Err(w) => {
                    log::debug!("BIN layout dispatch failed: {w}");
                    warnings.push(w);
                }
            }
        }

        if hw_id.is_none() || version.is_none() {
            if let Some((h, v)) = fixed_offset_heuristic(data, 252, 256)
                .or_else(|| fixed_offset_heuristic(data, 508, 512))
                .or_else(|| last_six_bytes_heuristic(data))
            {
                hw_id = Some(h);
                version = Some(v);
            }
        }

        if hw_id.is_none() || version.is_none() {
            log::warn!("BIN metadata could not be recovered by any heuristic");
        }

        RgnBin {
            data: data.to_vec(),
            hw_id,
            version,
            checksum_valid,
            end_marker_offset,
            warnings,
        }
    }

    pub fn hw_id(&self) -> Option<u16> {
        self.hw_id
    }

    pub fn version(&self) -> Option<u16> {
        self.version
    }

    pub fn checksum_valid(&self) -> bool {
        self.checksum_valid
    }

    pub fn end_marker_offset(&self) -> Option<usize> {
        self.end_marker_offset
    }

    pub fn warnings(&self) -> &[RgnBinWarning] {
        &self.warnings
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

fn find_end_marker(data: &[u8]) -> Option<usize> {
    if data.len() < END_MARKER.len() {
        return None;
    }
    (0..=data.len() - END_MARKER.len())
        .rev()
        .find(|&i| data[i..i + END_MARKER.len()] == END_MARKER)
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    if offset + 4 > data.len() {
        return None;
    }
    Some(u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]))
}

fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    if offset + 2 > data.len() {
        return None;
    }
    Some(u16::from_le_bytes([data[offset], data[offset + 1]]))
}

/// Read a `u16` at a signed, possibly out-of-range computed offset
/// (spec.md §4.5 "Bounds": outside `[0, len-2]` is reported, not fatal).
fn read_u16_signed(data: &[u8], offset: i64) -> Result<u16, RgnBinWarning> {
    if offset < 0 {
        return Err(RgnBinWarning::OffsetOutOfBounds {
            offset,
            len: data.len(),
        });
    }
    read_u16(data, offset as usize).ok_or(RgnBinWarning::OffsetOutOfBounds {
        offset,
        len: data.len(),
    })
}

fn header_u32(data: &[u8], offset: usize) -> Result<u32, RgnBinWarning> {
    read_u32(data, offset).ok_or(RgnBinWarning::OffsetOutOfBounds {
        offset: offset as i64,
        len: data.len(),
    })
}

/// `0xe59ff008`, variant 1a/1b.
fn variant_1(data: &[u8]) -> Result<(u16, u16), RgnBinWarning> {
    let x1 = header_u32(data, 4)?;
    let x2 = header_u32(data, 8)?;
    let x3 = header_u32(data, 12)?;
    let entry_addr = header_u32(data, 16)? as i64;

    let (hw_id_va, swver_va) = if (x2 as i64 - x1 as i64).abs() == 2 {
        (x1, x2)
    } else {
        (x2, x3)
    };
    let delta = 20i64 - entry_addr;
    let hw_id = read_u16_signed(data, hw_id_va as i64 + delta)?;
    let version = read_u16_signed(data, swver_va as i64 + delta)?;
    Ok((hw_id, version))
}

/// `0xe59ff00c`, variant 2.
fn variant_2(data: &[u8]) -> Result<(u16, u16), RgnBinWarning> {
    let _end_va = header_u32(data, 4)?;
    let hwid_va = header_u32(data, 8)?;
    let swver_va = header_u32(data, 12)?;
    let lend_va = header_u32(data, 16)? as i32 as i64;
    let entry_va = header_u32(data, 20)? as i64;

    let delta = if lend_va < 0 {
        24 - (-lend_va)
    } else {
        24 - entry_va
    };
    let hw_id = read_u16_signed(data, hwid_va as i64 + delta)?;
    let version = read_u16_signed(data, swver_va as i64 + delta)?;
    Ok((hw_id, version))
}

/// `0xea000002` / `0xea000003`, variants 3/4 (identical recovery).
fn variant_3(
    data: &[u8],
    end_loc: Option<usize>,
    first_word: u32,
) -> Result<(u16, u16), RgnBinWarning> {
    let end_loc = end_loc.ok_or(RgnBinWarning::LayoutUnrecognized { first_word })?;
    let end_va = header_u32(data, 4)?;
    let hwid_va = header_u32(data, 8)?;
    let swver_va = header_u32(data, 12)?;

    let delta = end_loc as i64 + 2 - end_va as i64;
    let hw_id = read_u16_signed(data, hwid_va as i64 + delta)?;
    let version = read_u16_signed(data, swver_va as i64 + delta)?;
    Ok((hw_id, version))
}

/// The `payload[check..check+4] == ff ff ff ff` ⇒ hw_id/version at
/// `value`/`value+2` heuristics (spec.md §4.5, used for both 252/256 and
/// 508/512).
fn fixed_offset_heuristic(data: &[u8], check: usize, value: usize) -> Option<(u16, u16)> {
    if check + 4 > data.len() {
        return None;
    }
    if data[check..check + 4] != [0xff, 0xff, 0xff, 0xff] {
        return None;
    }
    let hw_id = read_u16(data, value)?;
    let version = read_u16(data, value + 2)?;
    Some((hw_id, version))
}

/// Last-resort fallback: the final 6 bytes minus the last 2, read as two
/// `u16`s, accepted only if neither looks like a `0xffff` filler value.
fn last_six_bytes_heuristic(data: &[u8]) -> Option<(u16, u16)> {
    if data.len() < 6 {
        return None;
    }
    let base = data.len() - 6;
    let hw_id = u16::from_le_bytes([data[base], data[base + 1]]);
    let version = u16::from_le_bytes([data[base + 2], data[base + 3]]);
    if hw_id < 0xffff && version < 0xffff {
        Some((hw_id, version))
    } else {
        None
    }
}
