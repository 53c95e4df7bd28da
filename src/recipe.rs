//! Section-based key/value text format used to round-trip a GCD as a
//! recipe plus sibling binary files (spec.md §4.6).
//!
//! Grounded in the general shape of `.ini`-style configs the wider
//! example pack reaches for (section headers, `#` comments, `key = value`
//! pairs) and in `grmn/tlv.py`'s `dump()`/`load_dump()`/`create_from_dump()`
//! round-trip contract. Parsing uses precompiled `regex` patterns the way
//! `framework_lib` keeps `Regex::new` calls out of hot loops, via
//! `lazy_static`.

use crate::error::RecipeError;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SECTION_RE: Regex = Regex::new(r"^\[(.+)\]$").unwrap();
}

/// One `[SECTION]` block: an ordered, possibly-repeating list of
/// `key = value` pairs. Keys are case-preserving.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecipeSection {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl RecipeSection {
    pub fn new(name: impl Into<String>) -> Self {
        RecipeSection {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every `0x....` prefixed key, parsed to a `u16` field_id, in file
    /// order (spec.md §4.3: schema field order for a recompiled binary
    /// block is the order its `0x..` keys appear in the recipe).
    pub fn field_entries(&self) -> Vec<(u16, &str)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| {
                if let Some(hex) = k.strip_prefix("0x") {
                    u16::from_str_radix(hex, 16).ok().map(|fid| (fid, v.as_str()))
                } else {
                    None
                }
            })
            .collect()
    }
}

/// A parsed recipe: an ordered list of sections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Recipe {
    pub sections: Vec<RecipeSection>,
}

impl Recipe {
    pub fn new() -> Self {
        Recipe::default()
    }

    pub fn section(&self, name: &str) -> Option<&RecipeSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn push(&mut self, section: RecipeSection) {
        self.sections.push(section);
    }

    pub fn parse(text: &str) -> Result<Recipe, RecipeError> {
        let mut recipe = Recipe::new();
        let mut current: Option<RecipeSection> = None;
        for (i, raw_line) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = match raw_line.split_once('#') {
                Some((before, _)) => before,
                None => raw_line,
            }
            .trim();
            if line.is_empty() {
                continue;
            }
            if let Some(caps) = SECTION_RE.captures(line) {
                if let Some(section) = current.take() {
                    recipe.push(section);
                }
                current = Some(RecipeSection::new(caps[1].to_string()));
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) => {
                    let section = current.as_mut().ok_or_else(|| {
                        log::error!("recipe line {line_no} has a key outside any section: {raw_line:?}");
                        RecipeError::MalformedLine {
                            line_no,
                            line: raw_line.to_string(),
                        }
                    })?;
                    section.push(key.trim().to_string(), value.trim().to_string());
                }
                None => {
                    log::error!("recipe line {line_no} has no '=' separator: {raw_line:?}");
                    return Err(RecipeError::MalformedLine {
                        line_no,
                        line: raw_line.to_string(),
                    });
                }
            }
        }
        if let Some(section) = current.take() {
            recipe.push(section);
        }
        Ok(recipe)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push('[');
            out.push_str(&section.name);
            out.push_str("]\n");
            for (k, v) in &section.entries {
                out.push_str(k);
                out.push_str(" = ");
                out.push_str(v);
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}

/// Required `[GCD_DUMP]` header fields (spec.md §4.6).
pub const DUMP_SECTION: &str = "GCD_DUMP";
pub const DUMP_BY: &str = "grmn-gcd";
pub const DUMP_VER: &str = "1";

pub fn check_dump_header(recipe: &Recipe) -> Result<(), RecipeError> {
    let section = recipe.section(DUMP_SECTION).ok_or_else(|| {
        log::error!("recipe has no [{DUMP_SECTION}] section");
        RecipeError::MissingSection {
            name: DUMP_SECTION.to_string(),
        }
    })?;
    let ver = section.get("dump_ver").ok_or_else(|| {
        log::error!("recipe [{DUMP_SECTION}] section has no dump_ver key");
        RecipeError::MissingKey {
            section: DUMP_SECTION.to_string(),
            key: "dump_ver",
        }
    })?;
    if ver != DUMP_VER {
        log::error!("recipe dump_ver {ver} does not match supported version {DUMP_VER}");
        return Err(RecipeError::VersionMismatch {
            found: ver.to_string(),
            expected: DUMP_VER,
        });
    }
    Ok(())
}
