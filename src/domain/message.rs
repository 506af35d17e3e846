//! Tokenized HL7 v2.x message view
//!
//! Veil's de-identification core operates on a field-decomposed view of a
//! message: a sequence of field locations and string values. This module
//! provides that view for pipe-delimited HL7 v2.x content. Parsing never
//! fails; lines that don't look like segments are carried through and
//! flagged so the scanner can report them as warnings instead of aborting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location of a field within a message
///
/// Identifies a field by segment id, the repeat index of that segment
/// within the message (0-based), and the HL7 field number (1-based,
/// with the MSH field-separator convention applied).
///
/// # Examples
///
/// ```
/// use veil::domain::message::FieldLocation;
///
/// let loc = FieldLocation::new("PID", 0, 5);
/// assert_eq!(loc.to_string(), "PID[0]-5");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldLocation {
    /// Segment identifier, e.g. "PID"
    pub segment: String,
    /// Occurrence index of this segment id within the message
    pub repeat: usize,
    /// HL7 field number (1-based)
    pub field: usize,
}

impl FieldLocation {
    /// Create a new field location
    pub fn new(segment: impl Into<String>, repeat: usize, field: usize) -> Self {
        Self {
            segment: segment.into(),
            repeat,
            field,
        }
    }
}

impl fmt::Display for FieldLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]-{}", self.segment, self.repeat, self.field)
    }
}

/// One segment of an HL7 message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Segment id ("PID", "OBX", ...)
    pub id: String,
    /// Occurrence index of this id within the message
    pub repeat: usize,
    /// Field values, index 0 holding the segment id itself
    fields: Vec<String>,
    /// Original line for lines that didn't tokenize as a segment
    pub raw: String,
    /// True when the line could not be tokenized
    pub malformed: bool,
}

impl Segment {
    /// Get a field value by HL7 field number
    ///
    /// MSH-1 is the field separator itself per the HL7 convention; fields
    /// beyond the segment's length return `None`.
    pub fn field(&self, number: usize) -> Option<&str> {
        if self.malformed || number == 0 {
            return None;
        }
        if self.id == "MSH" {
            if number == 1 {
                return Some("|");
            }
            return self.fields.get(number - 1).map(String::as_str);
        }
        self.fields.get(number).map(String::as_str)
    }

    /// Replace a field value by HL7 field number
    ///
    /// Returns false if the field doesn't exist in this segment.
    pub fn set_field(&mut self, number: usize, value: impl Into<String>) -> bool {
        if self.malformed || number == 0 {
            return false;
        }
        let index = if self.id == "MSH" {
            if number == 1 {
                return false; // the separator itself is not replaceable
            }
            number - 1
        } else {
            number
        };
        match self.fields.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// Number of fields present (highest addressable field number)
    pub fn field_count(&self) -> usize {
        if self.malformed {
            return 0;
        }
        if self.id == "MSH" {
            self.fields.len()
        } else {
            self.fields.len().saturating_sub(1)
        }
    }

    fn render(&self) -> String {
        if self.malformed {
            self.raw.clone()
        } else {
            self.fields.join("|")
        }
    }
}

/// Field-decomposed HL7 v2.x message
///
/// Holds segments in document order and re-renders them with the original
/// line terminator style. Component (`^`) and repetition (`~`) structure
/// inside a field is left to the consumers that need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hl7Message {
    segments: Vec<Segment>,
    terminator: String,
    trailing_terminator: bool,
}

impl Hl7Message {
    /// Parse message content into segments
    ///
    /// Never fails: lines that don't tokenize as segments are kept as
    /// malformed segments so downstream scanning can flag them.
    pub fn parse(content: &str) -> Self {
        let terminator = if content.contains("\r\n") {
            "\r\n".to_string()
        } else if content.contains('\r') {
            "\r".to_string()
        } else {
            "\n".to_string()
        };
        let trailing_terminator = content.ends_with(&terminator);

        let mut segments = Vec::new();
        let mut repeats: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

        for line in content.split(['\r', '\n']).filter(|l| !l.is_empty()) {
            let fields: Vec<String> = line.split('|').map(str::to_string).collect();
            let id = fields[0].clone();
            let well_formed = fields.len() > 1
                && id.len() >= 2
                && id.len() <= 3
                && id.chars().all(|c| c.is_ascii_alphanumeric());

            if well_formed {
                let repeat = *repeats
                    .entry(id.clone())
                    .and_modify(|r| *r += 1)
                    .or_insert(0);
                segments.push(Segment {
                    id,
                    repeat,
                    fields,
                    raw: line.to_string(),
                    malformed: false,
                });
            } else {
                segments.push(Segment {
                    id: String::new(),
                    repeat: 0,
                    fields: Vec::new(),
                    raw: line.to_string(),
                    malformed: true,
                });
            }
        }

        Self {
            segments,
            terminator,
            trailing_terminator,
        }
    }

    /// All segments in document order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the message contains no segments at all
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Look up a field value by location
    pub fn field(&self, location: &FieldLocation) -> Option<&str> {
        self.segments
            .iter()
            .find(|s| !s.malformed && s.id == location.segment && s.repeat == location.repeat)
            .and_then(|s| s.field(location.field))
    }

    /// Replace a field value by location
    pub fn set_field(&mut self, location: &FieldLocation, value: impl Into<String>) -> bool {
        match self
            .segments
            .iter_mut()
            .find(|s| !s.malformed && s.id == location.segment && s.repeat == location.repeat)
        {
            Some(segment) => segment.set_field(location.field, value),
            None => false,
        }
    }

    /// Replace the first occurrence of `original` inside the field at
    /// `location`, used for pattern matches inside free-text fields.
    pub fn replace_in_field(
        &mut self,
        location: &FieldLocation,
        original: &str,
        replacement: &str,
    ) -> bool {
        let current = match self.field(location) {
            Some(v) => v.to_string(),
            None => return false,
        };
        if !current.contains(original) {
            return false;
        }
        let updated = current.replacen(original, replacement, 1);
        self.set_field(location, updated)
    }

    /// Render the message back to its wire form
    pub fn render(&self) -> String {
        let mut rendered = self
            .segments
            .iter()
            .map(Segment::render)
            .collect::<Vec<_>>()
            .join(&self.terminator);
        if self.trailing_terminator && !rendered.is_empty() {
            rendered.push_str(&self.terminator);
        }
        rendered
    }
}

/// First `^`-delimited component of a field value
///
/// HL7 composite fields put the primary identifier in the first component
/// (e.g. the id part of a CX or XCN value).
pub fn first_component(value: &str) -> &str {
    value.split(['^', '~']).next().unwrap_or(value)
}
