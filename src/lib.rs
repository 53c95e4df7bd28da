//! Codec for nested Garmin-style GPS/wearable firmware containers.
//!
//! An RGN record stream ([`rgn`]) carries either another nested RGN or a
//! raw firmware image ([`rgn_bin`]); a GCD record stream ([`gcd`]) is a
//! checksummed TLV sequence ([`tlv`]) that can be disassembled to and
//! reassembled from an editable text [`recipe`].

pub mod chksum;
pub mod config;
pub mod device_names;
pub mod error;
pub mod gcd;
pub mod recipe;
pub mod rgn;
pub mod rgn_bin;
pub mod tlv;

pub use config::CodecConfig;
pub use device_names::DeviceNameLookup;
pub use gcd::Gcd;
pub use rgn::Rgn;
pub use rgn_bin::RgnBin;
