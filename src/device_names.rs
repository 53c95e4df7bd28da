//! The seam for an external `hw_id -> device name` table.
//!
//! The table's contents are an external collaborator (spec.md §1); this
//! crate only defines how pretty-printing asks for a name, matching the
//! Python original's `devices.DEVICES.get(v, "Unknown device")` lookup in
//! `grmn/tlv.py`.

use std::collections::HashMap;

/// Resolve a `hw_id` to a human-readable device name.
pub trait DeviceNameLookup {
    fn name(&self, hw_id: u16) -> Option<&str>;
}

/// No lookup available: every `hw_id` resolves to `None`.
impl DeviceNameLookup for () {
    fn name(&self, _hw_id: u16) -> Option<&str> {
        None
    }
}

impl DeviceNameLookup for HashMap<u16, String> {
    fn name(&self, hw_id: u16) -> Option<&str> {
        self.get(&hw_id).map(|s| s.as_str())
    }
}

impl DeviceNameLookup for &HashMap<u16, String> {
    fn name(&self, hw_id: u16) -> Option<&str> {
        self.get(&hw_id).map(|s| s.as_str())
    }
}

pub const UNKNOWN_DEVICE: &str = "Unknown device";

/// Convenience formatting used by the pretty-printers: resolves through a
/// `&dyn DeviceNameLookup`, falling back to [`UNKNOWN_DEVICE`].
pub fn describe(lookup: &dyn DeviceNameLookup, hw_id: u16) -> &str {
    lookup.name(hw_id).unwrap_or(UNKNOWN_DEVICE)
}
