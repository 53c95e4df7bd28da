//! Error types for every container layer.
//!
//! Flat, hand-rolled enums in the style of `chromium_ec::EcError` — no
//! `thiserror`/`anyhow`. Unlike `EcError` (which never implements
//! `std::error::Error`), these do: this codec is meant to be driven by
//! arbitrary host tools across a crate boundary, so a real `Display` +
//! `Error` impl earns its keep here.

use std::fmt;

/// Errors from parsing or constraining a single TLV record.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TlvError {
    /// A type-6 schema payload wasn't an even number of bytes.
    InvalidSchemaLength { offset: u32, length: usize },
    /// A field_id in a type-6 schema isn't in the known field-type table.
    UnknownFieldId { offset: u32, field_id: u16 },
    /// A type-7 descriptor's payload was shorter than its bound schema's
    /// format requires.
    TruncatedDescriptor {
        offset: u32,
        expected: usize,
        actual: usize,
    },
    /// A type-7 descriptor appeared with no preceding type-6 schema, or a
    /// binary region appeared with no preceding type-7 descriptor.
    BindingMissing { offset: u32, type_id: u16 },
}

impl fmt::Display for TlvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlvError::InvalidSchemaLength { offset, length } => write!(
                f,
                "schema record at offset 0x{offset:x} has odd payload length {length}"
            ),
            TlvError::UnknownFieldId { offset, field_id } => write!(
                f,
                "schema record at offset 0x{offset:x} references unknown field_id 0x{field_id:04x}"
            ),
            TlvError::TruncatedDescriptor {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "descriptor at offset 0x{offset:x} expected {expected} bytes per its schema, got {actual}"
            ),
            TlvError::BindingMissing { offset, type_id } => write!(
                f,
                "record 0x{type_id:04x} at offset 0x{offset:x} has no preceding binding record"
            ),
        }
    }
}

impl std::error::Error for TlvError {}

/// Errors from parsing, validating, or compiling a GCD container.
#[derive(Debug)]
pub enum GcdError {
    SignatureMismatch { found: [u8; 8] },
    TruncatedStream { offset: u32, expected: u16, actual: usize },
    UnknownRecordType { offset: u32, type_id: u16 },
    Tlv(TlvError),
    Io(std::io::Error),
}

impl fmt::Display for GcdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GcdError::SignatureMismatch { found } => {
                write!(f, "GCD signature mismatch, found {found:02x?}")
            }
            GcdError::TruncatedStream {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "record at offset 0x{offset:x} declared {expected} bytes but only {actual} remained"
            ),
            GcdError::UnknownRecordType { offset, type_id } => write!(
                f,
                "unknown GCD record type 0x{type_id:04x} at offset 0x{offset:x}"
            ),
            GcdError::Tlv(e) => write!(f, "{e}"),
            GcdError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GcdError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GcdError::Tlv(e) => Some(e),
            GcdError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TlvError> for GcdError {
    fn from(e: TlvError) -> Self {
        GcdError::Tlv(e)
    }
}

impl From<std::io::Error> for GcdError {
    fn from(e: std::io::Error) -> Self {
        GcdError::Io(e)
    }
}

/// Errors from parsing an RGN record stream.
#[derive(Debug)]
pub enum RgnError {
    SignatureMismatch { found: [u8; 4] },
    TruncatedStream { offset: u32, expected: u32, actual: usize },
    UnknownRecordType { offset: u32, type_id: u8 },
    RegionSizeMismatch {
        offset: u32,
        record_length: u32,
        declared_size: u32,
    },
    Io(std::io::Error),
}

impl fmt::Display for RgnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RgnError::SignatureMismatch { found } => {
                write!(f, "RGN signature mismatch, found {found:02x?}")
            }
            RgnError::TruncatedStream {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "record at offset 0x{offset:x} declared {expected} bytes but only {actual} remained"
            ),
            RgnError::UnknownRecordType { offset, type_id } => write!(
                f,
                "unknown RGN record type {:?} at offset 0x{offset:x}",
                *type_id as char
            ),
            RgnError::RegionSizeMismatch {
                offset,
                record_length,
                declared_size,
            } => write!(
                f,
                "region record at offset 0x{offset:x} has length {record_length} but declares size {declared_size} (expected length - 10)"
            ),
            RgnError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RgnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RgnError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RgnError {
    fn from(e: std::io::Error) -> Self {
        RgnError::Io(e)
    }
}

/// Errors from reading or compiling a recipe.
#[derive(Debug)]
pub enum RecipeError {
    VersionMismatch { found: String, expected: &'static str },
    MissingSection { name: String },
    MissingKey { section: String, key: &'static str },
    MalformedLine { line_no: usize, line: String },
    Io(std::io::Error),
}

impl fmt::Display for RecipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeError::VersionMismatch { found, expected } => write!(
                f,
                "recipe dump_ver {found} doesn't match supported version {expected}"
            ),
            RecipeError::MissingSection { name } => write!(f, "recipe is missing section [{name}]"),
            RecipeError::MissingKey { section, key } => {
                write!(f, "section [{section}] is missing key {key}")
            }
            RecipeError::MalformedLine { line_no, line } => {
                write!(f, "malformed recipe line {line_no}: {line:?}")
            }
            RecipeError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RecipeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecipeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RecipeError {
    fn from(e: std::io::Error) -> Self {
        RecipeError::Io(e)
    }
}

/// Non-fatal findings from analyzing a BIN image's heuristic metadata.
///
/// Unlike the other error types, this never aborts a parse: spec.md §4.5
/// requires that unrecognized layouts or out-of-bounds offsets simply leave
/// `hw_id`/`version` unset rather than failing the whole container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RgnBinWarning {
    LayoutUnrecognized { first_word: u32 },
    OffsetOutOfBounds { offset: i64, len: usize },
}

impl fmt::Display for RgnBinWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RgnBinWarning::LayoutUnrecognized { first_word } => {
                write!(f, "BIN layout unrecognized, first word 0x{first_word:08x}")
            }
            RgnBinWarning::OffsetOutOfBounds { offset, len } => write!(
                f,
                "computed BIN metadata offset {offset} out of bounds for payload length {len}"
            ),
        }
    }
}
