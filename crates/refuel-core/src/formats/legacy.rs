//! # Legacy Text Format
//!
//! Line-oriented shuffle history, one stanza per cycle:
//!
//! ```text
//! Before cycle 1:
//! 002-001 moved to SFP with assembly type feed fuel with enrich list:
//! 001-001 moved to 002-001 with assembly type feed fuel with enrich list:
//! LoadQueue moved to 001-001 with assembly type feed fuel with enrich list: 12.5 14
//!
//! Before cycle 2:
//! ...
//! ```
//!
//! Two body grammars are accepted:
//! - current: `<from> moved to <to> with assembly type <type> [ANAME=<name> ]with enrich list: <floats>`
//! - oldest: `<from> moved to <to> with enrich list: <floats>` (no type, warned once per read)
//!
//! Either may end in ` with rotation: <radians>`.

use crate::primitives::LEGACY_FILE_SUFFIX;
use crate::{Location, MoveRecord, RefuelError, ShuffleSequence};
use regex::Regex;
use tracing::warn;

const HEADER_PATTERN: &str = r"^Before cycle (\d+)";
const CURRENT_PATTERN: &str = r"^(\S+) moved to (\S+) with assembly type (.+?) (?:ANAME=(\S+) )?with enrich list: ?(.*?)(?: with rotation: (\S+))?$";
const OLDEST_PATTERN: &str =
    r"^(\S+) moved to (\S+) with enrich list: ?(.*?)(?: with rotation: (\S+))?$";

struct Patterns {
    header: Regex,
    current: Regex,
    oldest: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, RefuelError> {
        let build = |pattern: &str| {
            Regex::new(pattern).map_err(|e| RefuelError::InvalidSequence(e.to_string()))
        };
        Ok(Self {
            header: build(HEADER_PATTERN)?,
            current: build(CURRENT_PATTERN)?,
            oldest: build(OLDEST_PATTERN)?,
        })
    }
}

/// `<case_title>-SHUFFLES.txt`
#[must_use]
pub fn legacy_file_name(case_title: &str) -> String {
    format!("{case_title}{LEGACY_FILE_SUFFIX}")
}

// =============================================================================
// READER
// =============================================================================

/// Parse legacy shuffle text into a validated sequence.
pub fn parse_legacy(text: &str) -> Result<ShuffleSequence, RefuelError> {
    let patterns = Patterns::compile()?;
    let mut sequence = ShuffleSequence::new();
    let mut cycle: Option<u32> = None;
    let mut warned_oldest = false;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let line_error = || RefuelError::ParseLine {
            line: index + 1,
            content: line.to_string(),
        };

        if let Some(caps) = patterns.header.captures(line) {
            let number = caps[1].parse::<u32>().map_err(|_| line_error())?;
            sequence.ensure_cycle(number);
            cycle = Some(number);
            continue;
        }

        let Some(current_cycle) = cycle else {
            return Err(line_error());
        };

        let record = if let Some(caps) = patterns.current.captures(line) {
            let mut record = MoveRecord::new(
                parse_location(&caps[1]).ok_or_else(line_error)?,
                parse_location(&caps[2]).ok_or_else(line_error)?,
            )
            .with_type(caps[3].trim())
            .with_enrichment(parse_floats(&caps[5]).ok_or_else(line_error)?);
            if let Some(name) = caps.get(4) {
                record = record.with_name(name.as_str());
            }
            if let Some(rotation) = caps.get(6) {
                record =
                    record.with_rotation(rotation.as_str().parse().map_err(|_| line_error())?);
            }
            record
        } else if let Some(caps) = patterns.oldest.captures(line) {
            if !warned_oldest {
                warn!(
                    line = index + 1,
                    "shuffle history uses the oldest text format; charge types will be inferred"
                );
                warned_oldest = true;
            }
            let mut record = MoveRecord::new(
                parse_location(&caps[1]).ok_or_else(line_error)?,
                parse_location(&caps[2]).ok_or_else(line_error)?,
            )
            .with_enrichment(parse_floats(&caps[3]).ok_or_else(line_error)?);
            if let Some(rotation) = caps.get(4) {
                record =
                    record.with_rotation(rotation.as_str().parse().map_err(|_| line_error())?);
            }
            record
        } else {
            return Err(line_error());
        };

        sequence.push(current_cycle, record);
    }

    sequence.validate()?;
    Ok(sequence)
}

fn parse_location(label: &str) -> Option<Location> {
    label.parse().ok()
}

fn parse_floats(list: &str) -> Option<Vec<f64>> {
    list.split_whitespace().map(|v| v.parse().ok()).collect()
}

// =============================================================================
// WRITER
// =============================================================================

/// Render a sequence as legacy text.
///
/// Records without type and name use the oldest grammar; a name without a
/// type cannot be expressed.
pub fn write_legacy(sequence: &ShuffleSequence) -> Result<String, RefuelError> {
    let mut stanzas = Vec::with_capacity(sequence.len());
    for (cycle, records) in sequence.iter() {
        let mut stanza = format!("Before cycle {cycle}:\n");
        for record in records {
            stanza.push_str(&format_record(record)?);
            stanza.push('\n');
        }
        stanzas.push(stanza);
    }
    Ok(stanzas.join("\n"))
}

fn format_record(record: &MoveRecord) -> Result<String, RefuelError> {
    let enrich = record
        .enrich_list()
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    let mut line = match (record.assem_type(), record.name_at_discharge()) {
        (None, None) => format!(
            "{} moved to {} with enrich list: {}",
            record.from(),
            record.to(),
            enrich
        ),
        (Some(kind), name) => {
            if kind.trim().is_empty() || kind.trim() != kind {
                return Err(RefuelError::Unrepresentable(format!(
                    "assembly type {kind:?} cannot be written as legacy text"
                )));
            }
            if let Some(n) = name
                && (n.is_empty() || n.contains(char::is_whitespace))
            {
                return Err(RefuelError::Unrepresentable(format!(
                    "assembly name {n:?} cannot be written as legacy text"
                )));
            }
            let aname = name.map(|n| format!("ANAME={n} ")).unwrap_or_default();
            format!(
                "{} moved to {} with assembly type {} {}with enrich list: {}",
                record.from(),
                record.to(),
                kind,
                aname,
                enrich
            )
        }
        (None, Some(name)) => {
            return Err(RefuelError::Unrepresentable(format!(
                "move {} -> {} names {name:?} but has no assembly type",
                record.from(),
                record.to()
            )));
        }
    };

    if let Some(rotation) = record.rotation() {
        line.push_str(&format!(" with rotation: {rotation}"));
    }
    Ok(line)
}

// =============================================================================
// TESTS
// =============================================================================
