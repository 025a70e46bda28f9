//! # YAML Shuffle Format
//!
//! Structured shuffle sequences:
//!
//! ```yaml
//! sequence:
//!   1:
//!     - cascade: ["feed fuel", "001-001", "002-001", "003-001"]
//!       fuelEnrichment: [12.5, 14.0]
//!     - misloadSwap: ["004-001", "004-002"]
//!     - extraRotations: {"002-001": 60.0}
//!   2: []
//! ```
//!
//! Each action carries exactly one of `cascade`, `misloadSwap`,
//! `extraRotations`. `fuelEnrichment` only rides along with `cascade`.
//! Rotations are written in degrees and held in radians.

use crate::chain::process_move_list;
use crate::primitives::{MAX_ENRICHMENT, MIN_ENRICHMENT};
use crate::{Location, MoveRecord, RefuelError, ShuffleSequence};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const CASCADE: &str = "cascade";
const FUEL_ENRICHMENT: &str = "fuelEnrichment";
const MISLOAD_SWAP: &str = "misloadSwap";
const EXTRA_ROTATIONS: &str = "extraRotations";

// =============================================================================
// RAW DOCUMENT
// =============================================================================

type RawAction = BTreeMap<String, serde_yaml::Value>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFile {
    sequence: BTreeMap<i64, Option<Vec<RawAction>>>,
}

#[derive(Debug, Serialize)]
struct OutFile {
    sequence: BTreeMap<u32, Vec<OutAction>>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    cascade: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fuel_enrichment: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    misload_swap: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra_rotations: Option<BTreeMap<String, f64>>,
}

fn invalid(message: impl Into<String>) -> RefuelError {
    RefuelError::InvalidSequence(message.into())
}

fn payload<T: serde::de::DeserializeOwned>(
    key: &str,
    value: &serde_yaml::Value,
) -> Result<T, RefuelError> {
    serde_yaml::from_value(value.clone()).map_err(|e| invalid(format!("{key}: {e}")))
}

// =============================================================================
// READER
// =============================================================================

/// Tracks grid locations claimed by cascades and swaps within one cycle.
struct CycleClaims {
    cycle: u32,
    used: BTreeSet<Location>,
}

impl CycleClaims {
    fn claim(&mut self, location: Location) -> Result<(), RefuelError> {
        if location.is_sentinel() {
            return Ok(());
        }
        if !self.used.insert(location) {
            return Err(RefuelError::LocationReused {
                cycle: self.cycle,
                location,
            });
        }
        Ok(())
    }
}

/// Parse a YAML shuffle document into a validated sequence.
pub fn parse_yaml(text: &str) -> Result<ShuffleSequence, RefuelError> {
    let raw: RawFile = serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()))?;
    let mut sequence = ShuffleSequence::new();

    for (cycle, actions) in raw.sequence {
        let cycle = u32::try_from(cycle)
            .map_err(|_| invalid(format!("cycle {cycle} is not a valid cycle number")))?;
        sequence.ensure_cycle(cycle);

        let mut claims = CycleClaims {
            cycle,
            used: BTreeSet::new(),
        };
        for action in actions.unwrap_or_default() {
            for record in expand_action(&action, &mut claims)? {
                sequence.push(cycle, record);
            }
        }
    }

    sequence.validate()?;
    Ok(sequence)
}

fn expand_action(
    action: &RawAction,
    claims: &mut CycleClaims,
) -> Result<Vec<MoveRecord>, RefuelError> {
    for key in action.keys() {
        if ![CASCADE, FUEL_ENRICHMENT, MISLOAD_SWAP, EXTRA_ROTATIONS].contains(&key.as_str()) {
            return Err(RefuelError::UnknownAction(key.clone()));
        }
    }

    let primary: Vec<&str> = [CASCADE, MISLOAD_SWAP, EXTRA_ROTATIONS]
        .into_iter()
        .filter(|k| action.contains_key(*k))
        .collect();
    if primary.len() != 1 {
        return Err(invalid(format!(
            "each action needs exactly one of cascade, misloadSwap, extraRotations; found {primary:?}"
        )));
    }
    if action.contains_key(FUEL_ENRICHMENT) && primary[0] != CASCADE {
        return Err(invalid("fuelEnrichment is only valid with cascade"));
    }

    match primary[0] {
        CASCADE => {
            let items: Vec<String> = payload(CASCADE, &action[CASCADE])?;
            let enrichment = match action.get(FUEL_ENRICHMENT) {
                Some(value) => payload::<Vec<f64>>(FUEL_ENRICHMENT, value)?,
                None => Vec::new(),
            };
            expand_cascade(&items, enrichment, claims)
        }
        MISLOAD_SWAP => {
            let items: Vec<String> = payload(MISLOAD_SWAP, &action[MISLOAD_SWAP])?;
            expand_misload(&items, claims)
        }
        _ => {
            let rotations: BTreeMap<String, f64> =
                payload(EXTRA_ROTATIONS, &action[EXTRA_ROTATIONS])?;
            let mut records = Vec::with_capacity(rotations.len());
            for (label, degrees) in rotations {
                let location: Location = label.parse()?;
                if location.is_sentinel() {
                    return Err(invalid(format!("cannot rotate at {location}")));
                }
                records.push(MoveRecord::rotation_at(location, degrees.to_radians()));
            }
            Ok(records)
        }
    }
}

fn expand_cascade(
    items: &[String],
    enrichment: Vec<f64>,
    claims: &mut CycleClaims,
) -> Result<Vec<MoveRecord>, RefuelError> {
    if items.len() < 2 {
        return Err(invalid("cascade needs an assembly type and at least one location"));
    }
    for value in &enrichment {
        if !(MIN_ENRICHMENT..=MAX_ENRICHMENT).contains(value) {
            return Err(RefuelError::EnrichmentOutOfRange(*value));
        }
    }

    let assem_type = &items[0];
    let locations = items[1..]
        .iter()
        .map(|label| label.parse::<Location>())
        .collect::<Result<Vec<_>, _>>()?;

    let last = locations.len() - 1;
    for (i, location) in locations.iter().enumerate() {
        if location.is_load_queue() {
            return Err(invalid("LoadQueue cannot appear inside a cascade"));
        }
        if location.is_discharge() && (i != last || i == 0) {
            return Err(invalid(format!(
                "{location} may only end a cascade that moves at least one location"
            )));
        }
        claims.claim(*location)?;
    }

    let mut records = Vec::with_capacity(locations.len() + 1);
    records.push(
        MoveRecord::new(Location::LoadQueue, locations[0])
            .with_enrichment(enrichment)
            .with_type(assem_type.as_str()),
    );
    for pair in locations.windows(2) {
        records.push(MoveRecord::new(pair[0], pair[1]));
    }
    if !locations[last].is_discharge() {
        records.push(MoveRecord::new(locations[last], Location::Sfp));
    }
    Ok(records)
}

fn expand_misload(
    items: &[String],
    claims: &mut CycleClaims,
) -> Result<Vec<MoveRecord>, RefuelError> {
    let [first, second] = items else {
        return Err(invalid("misloadSwap needs exactly two locations"));
    };
    let first: Location = first.parse()?;
    let second: Location = second.parse()?;
    if first == second {
        return Err(invalid(format!("misloadSwap locations must differ, got {first} twice")));
    }
    if first.is_sentinel() || second.is_sentinel() {
        return Err(invalid("misloadSwap only swaps core locations"));
    }
    claims.claim(first)?;
    claims.claim(second)?;
    Ok(vec![
        MoveRecord::new(first, second),
        MoveRecord::new(second, first),
    ])
}

// =============================================================================
// WRITER
// =============================================================================

/// Render a sequence as YAML by rebuilding each cycle's actions from its chains.
pub fn write_yaml(sequence: &ShuffleSequence) -> Result<String, RefuelError> {
    let mut out = OutFile {
        sequence: BTreeMap::new(),
    };

    for (cycle, records) in sequence.iter() {
        let processed = process_move_list(records)?;
        let mut actions = Vec::new();

        for chain in &processed.load_chains {
            if chain.charge.source != Location::LoadQueue || chain.charge.load_name.is_some() {
                return Err(RefuelError::Unrepresentable(format!(
                    "cycle {cycle}: reloading into {} from {} has no YAML form",
                    chain.locations.first().map(ToString::to_string).unwrap_or_default(),
                    chain.charge.source
                )));
            }
            let Some(assem_type) = chain.charge.assem_type.clone() else {
                return Err(RefuelError::Unrepresentable(format!(
                    "cycle {cycle}: a cascade charge has no assembly type"
                )));
            };
            let mut cascade = vec![assem_type];
            cascade.extend(chain.locations.iter().map(ToString::to_string));
            if chain.discharge_to == Location::ExCore {
                cascade.push(Location::ExCore.to_string());
            }
            actions.push(OutAction {
                cascade: Some(cascade),
                fuel_enrichment: (!chain.charge.enrich_list.is_empty())
                    .then(|| chain.charge.enrich_list.clone()),
                ..OutAction::default()
            });
        }

        for chain in &processed.loop_chains {
            if chain.len() != 2 {
                return Err(RefuelError::Unrepresentable(format!(
                    "cycle {cycle}: a {}-location loop cannot be written as a misloadSwap",
                    chain.len()
                )));
            }
            actions.push(OutAction {
                misload_swap: Some(chain.iter().map(ToString::to_string).collect()),
                ..OutAction::default()
            });
        }

        if !processed.rotations.is_empty() {
            let mut radians_at: BTreeMap<String, f64> = BTreeMap::new();
            for (location, radians) in &processed.rotations {
                *radians_at.entry(location.to_string()).or_default() += radians;
            }
            let rotations = radians_at
                .into_iter()
                .map(|(label, radians)| (label, radians.to_degrees()))
                .collect();
            actions.push(OutAction {
                extra_rotations: Some(rotations),
                ..OutAction::default()
            });
        }

        out.sequence.insert(cycle, actions);
    }

    serde_yaml::to_string(&out).map_err(|e| RefuelError::Unrepresentable(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
sequence:
  1:
    - cascade: ["feed fuel", "001-001", "002-001", "003-001"]
      fuelEnrichment: [12.5, 14.0]
    - misloadSwap: ["004-001", "004-002"]
    - extraRotations: {"002-001": 60.0}
  2:
    - cascade: ["igniter fuel", "005-001", "ExCore"]
  3: []
"#;

    #[test]
    fn expands_cascade_swap_and_rotation() {
        let seq = parse_yaml(SAMPLE).expect("parse");
        assert_eq!(seq.len(), 3);

        let first = seq.moves_for(1).expect("cycle 1");
        assert_eq!(first[0].from(), Location::LoadQueue);
        assert_eq!(first[0].to(), Location::grid(1, 1));
        assert_eq!(first[0].assem_type(), Some("feed fuel"));
        assert_eq!(first[0].enrich_list(), &[12.5, 14.0]);
        assert_eq!(first[1], MoveRecord::new(Location::grid(1, 1), Location::grid(2, 1)));
        assert_eq!(first[3], MoveRecord::new(Location::grid(3, 1), Location::Sfp));
        assert_eq!(first[4].to(), Location::grid(4, 2));
        assert_eq!(first[5].to(), Location::grid(4, 1));
        assert!(first[6].is_self_move());
        let rotation = first[6].rotation().expect("rotation");
        assert!((rotation - std::f64::consts::FRAC_PI_3).abs() < 1e-12);

        let second = seq.moves_for(2).expect("cycle 2");
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].to(), Location::ExCore);

        assert!(seq.moves_for(3).expect("cycle 3").is_empty());
    }

    #[test]
    fn rejects_cycle_zero() {
        let text = "sequence:\n  0:\n    - cascade: [\"fuel\", \"001-001\"]\n";
        assert!(matches!(parse_yaml(text), Err(RefuelError::ReservedCycle)));
    }

    #[test]
    fn rejects_negative_cycle() {
        let text = "sequence:\n  -1: []\n";
        assert!(matches!(parse_yaml(text), Err(RefuelError::InvalidSequence(_))));
    }

    #[test]
    fn rejects_cycle_gap() {
        let text = "sequence:\n  1: []\n  3: []\n";
        assert!(matches!(parse_yaml(text), Err(RefuelError::MissingCycle(2))));
    }

    #[test]
    fn rejects_reused_location() {
        let text = r#"
sequence:
  1:
    - cascade: ["fuel", "001-001", "002-001"]
    - cascade: ["fuel", "002-001", "003-001"]
"#;
        assert!(matches!(
            parse_yaml(text),
            Err(RefuelError::LocationReused { cycle: 1, .. })
        ));
    }

    #[test]
    fn misload_cannot_overlap_cascade() {
        let text = r#"
sequence:
  1:
    - cascade: ["fuel", "001-001", "002-001"]
    - misloadSwap: ["002-001", "003-001"]
"#;
        assert!(matches!(
            parse_yaml(text),
            Err(RefuelError::LocationReused { .. })
        ));
    }

    #[test]
    fn rejects_enrichment_out_of_range() {
        let text = r#"
sequence:
  1:
    - cascade: ["fuel", "001-001"]
      fuelEnrichment: [150]
"#;
        assert!(matches!(
            parse_yaml(text),
            Err(RefuelError::EnrichmentOutOfRange(v)) if v == 150.0
        ));
    }

    #[test]
    fn rejects_unknown_action() {
        let text = "sequence:\n  1:\n    - teleport: [\"001-001\"]\n";
        assert!(matches!(parse_yaml(text), Err(RefuelError::UnknownAction(k)) if k == "teleport"));
    }

    #[test]
    fn rejects_malformed_actions() {
        for body in [
            "- cascade: [\"fuel\"]",
            "- misloadSwap: [\"001-001\"]",
            "- misloadSwap: [\"001-001\", \"001-001\"]",
            "- cascade: [\"fuel\", \"SFP\", \"001-001\"]",
            "- cascade: [\"fuel\", \"001-001\", \"LoadQueue\"]",
            "- extraRotations: {\"001-001\": 30}\n      fuelEnrichment: [1]",
            "- cascade: [\"fuel\", \"001-001\"]\n      misloadSwap: [\"002-001\", \"002-002\"]",
        ] {
            let text = format!("sequence:\n  1:\n    {body}\n");
            assert!(parse_yaml(&text).is_err(), "should reject: {body}");
        }
    }

    #[test]
    fn writer_rebuilds_actions() {
        let seq = parse_yaml(SAMPLE).expect("parse");
        let text = write_yaml(&seq).expect("write");
        assert!(text.contains("cascade"));
        assert!(text.contains("misloadSwap"));
        assert!(text.contains("extraRotations"));
        assert!(text.contains("ExCore"));

        let reparsed = parse_yaml(&text).expect("reparse");
        assert_eq!(reparsed.len(), seq.len());
        for (cycle, records) in seq.iter() {
            let again = reparsed.moves_for(cycle).expect("cycle");
            assert_eq!(again.len(), records.len());
        }
    }

    #[test]
    fn writer_sums_rotations_at_one_location() {
        let a = Location::grid(1, 1);
        let mut seq = ShuffleSequence::new();
        seq.set_cycle(
            1,
            vec![MoveRecord::rotation_at(a, 1.0), MoveRecord::rotation_at(a, 2.0)],
        );

        let reparsed = parse_yaml(&write_yaml(&seq).expect("write")).expect("reparse");
        let records = reparsed.moves_for(1).expect("cycle 1");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].to(), a);
        let total = records[0].rotation().expect("rotation");
        assert!((total - 3.0).abs() < 1e-9);
    }

    #[test]
    fn writer_rejects_long_loops_and_named_reloads() {
        let (a, b, c) = (Location::grid(1, 1), Location::grid(2, 1), Location::grid(3, 1));
        let mut looped = ShuffleSequence::new();
        looped.set_cycle(
            1,
            vec![MoveRecord::new(a, b), MoveRecord::new(b, c), MoveRecord::new(c, a)],
        );
        assert!(matches!(write_yaml(&looped), Err(RefuelError::Unrepresentable(_))));

        let mut reload = ShuffleSequence::new();
        reload.set_cycle(
            1,
            vec![
                MoveRecord::new(a, Location::Sfp),
                MoveRecord::new(Location::Sfp, a).with_type("fuel").with_name("A0001"),
            ],
        );
        assert!(matches!(write_yaml(&reload), Err(RefuelError::Unrepresentable(_))));
    }
}
