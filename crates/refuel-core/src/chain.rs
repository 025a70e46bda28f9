//! # Chain Reconstruction
//!
//! Rebuilds load chains and loop chains from a flat list of recorded moves.
//!
//! Orientation: every chain is returned charge end first and `chain[i]` moves
//! to `chain[i + 1]`. The last element of a load chain leaves the core; the
//! last element of a loop chain moves to the first.

use crate::primitives::MAX_CHAIN_STEPS;
use crate::{Location, MoveRecord, RefuelError};
use std::collections::BTreeSet;
use tracing::debug;

/// What gets loaded at the charge end of a load chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeDescriptor {
    /// `LoadQueue` for fresh assemblies, `SFP` or `ExCore` for reloads.
    pub source: Location,
    pub enrich_list: Vec<f64>,
    pub assem_type: Option<String>,
    pub load_name: Option<String>,
}

impl ChargeDescriptor {
    fn from_record(record: &MoveRecord) -> Self {
        Self {
            source: record.from(),
            enrich_list: record.enrich_list().to_vec(),
            assem_type: record.assem_type().map(str::to_string),
            load_name: record.name_at_discharge().map(str::to_string),
        }
    }
}

/// A chain that charges at one end and discharges at the other.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadChain {
    pub locations: Vec<Location>,
    pub charge: ChargeDescriptor,
    /// `SFP` or `ExCore`.
    pub discharge_to: Location,
}

/// Everything reconstructed from one cycle's records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedMoves {
    pub load_chains: Vec<LoadChain>,
    pub loop_chains: Vec<Vec<Location>>,
    /// `(location, radians)` for every record carrying a rotation, keyed by
    /// where the assembly ends up.
    pub rotations: Vec<(Location, f64)>,
    /// Grid locations that belong to a chain.
    pub visited: BTreeSet<Location>,
}

impl ProcessedMoves {
    /// Charge enrichments, one per load chain.
    pub fn enriches(&self) -> impl Iterator<Item = &[f64]> {
        self.load_chains
            .iter()
            .map(|c| c.charge.enrich_list.as_slice())
    }

    /// Charge assembly types, one per load chain.
    pub fn load_types(&self) -> impl Iterator<Item = Option<&str>> {
        self.load_chains
            .iter()
            .map(|c| c.charge.assem_type.as_deref())
    }

    /// Reloaded pool assembly names, one per load chain.
    pub fn load_names(&self) -> impl Iterator<Item = Option<&str>> {
        self.load_chains
            .iter()
            .map(|c| c.charge.load_name.as_deref())
    }
}

/// Walk backward from `starting_at` to rebuild one chain.
///
/// Stops at a `LoadQueue`/discharge source (returning its charge descriptor)
/// or on returning to `starting_at` (a loop).
pub fn track_chain(
    moves: &[MoveRecord],
    starting_at: Location,
) -> Result<(Vec<Location>, Option<ChargeDescriptor>), RefuelError> {
    let mut chain = vec![starting_at];
    let mut tail = starting_at;
    let mut charge = None;

    loop {
        if chain.len() > MAX_CHAIN_STEPS {
            return Err(RefuelError::ChainBoundsExceeded {
                limit: MAX_CHAIN_STEPS,
                partial: chain,
            });
        }

        let Some(previous) = moves.iter().find(|m| m.to() == tail && !m.is_self_move()) else {
            return Err(RefuelError::BrokenChain {
                tail,
                partial: chain,
            });
        };

        let from = previous.from();
        chain.push(from);
        if from.is_load_queue() || from.is_discharge() {
            charge = Some(ChargeDescriptor::from_record(previous));
            break;
        }
        if from == starting_at {
            break;
        }
        tail = from;
    }

    chain.pop();
    chain.reverse();
    Ok((chain, charge))
}

fn claim(visited: &mut BTreeSet<Location>, chain: &[Location]) -> Result<(), RefuelError> {
    for location in chain {
        if !visited.insert(*location) {
            return Err(RefuelError::ChainConflict(*location));
        }
    }
    Ok(())
}

/// Split a cycle's records into load chains, loop chains and rotations.
pub fn process_move_list(moves: &[MoveRecord]) -> Result<ProcessedMoves, RefuelError> {
    let mut processed = ProcessedMoves::default();

    // Pass 1: everything that ends in a discharge.
    for record in moves {
        if !record.to().is_discharge() || record.from().is_sentinel() {
            continue;
        }
        let (locations, charge) = track_chain(moves, record.from())?;
        let Some(charge) = charge else {
            return Err(RefuelError::InvalidSequence(format!(
                "discharge from {} has no charge",
                record.from()
            )));
        };
        claim(&mut processed.visited, &locations)?;
        debug!(?locations, discharge = %record.to(), "load chain");
        processed.load_chains.push(LoadChain {
            locations,
            charge,
            discharge_to: record.to(),
        });
    }

    // Pass 2: what is left must close on itself.
    for record in moves {
        if record.is_self_move()
            || record.from().is_sentinel()
            || record.to().is_sentinel()
            || processed.visited.contains(&record.from())
        {
            continue;
        }
        let (mut locations, charge) = track_chain(moves, record.from())?;
        if charge.is_some() {
            return Err(RefuelError::InvalidSequence(format!(
                "chain through {} is charged but never discharges",
                record.from()
            )));
        }
        // Start the loop where it was found.
        locations.rotate_right(1);
        claim(&mut processed.visited, &locations)?;
        debug!(?locations, "loop chain");
        processed.loop_chains.push(locations);
    }

    for record in moves {
        if !record.is_self_move() {
            for location in [record.from(), record.to()] {
                if !location.is_sentinel() && !processed.visited.contains(&location) {
                    return Err(RefuelError::InvalidSequence(format!(
                        "location {location} is moved but belongs to no chain"
                    )));
                }
            }
        }
        if let Some(rotation) = record.rotation() {
            processed.rotations.push((record.to(), rotation));
        }
    }

    Ok(processed)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(ring: u32, pos: u32) -> Location {
        Location::grid(ring, pos)
    }

    #[test]
    fn reconstructs_load_chain_charge_end_first() {
        let (a, b, c) = (loc(1, 1), loc(2, 1), loc(3, 1));
        let moves = vec![
            MoveRecord::new(a, b),
            MoveRecord::new(b, c),
            MoveRecord::new(c, Location::Sfp),
            MoveRecord::new(Location::LoadQueue, a)
                .with_enrichment(vec![1.0])
                .with_type("fuel"),
        ];

        let processed = process_move_list(&moves).expect("process");
        assert_eq!(processed.load_chains.len(), 1);
        let chain = &processed.load_chains[0];
        assert_eq!(chain.locations, vec![a, b, c]);
        assert_eq!(chain.discharge_to, Location::Sfp);
        assert_eq!(chain.charge.source, Location::LoadQueue);
        assert_eq!(processed.enriches().collect::<Vec<_>>(), vec![&[1.0][..]]);
        assert_eq!(processed.load_types().collect::<Vec<_>>(), vec![Some("fuel")]);
        assert!(processed.loop_chains.is_empty());
    }

    #[test]
    fn reconstructs_loop_chain() {
        let (a, b, c) = (loc(1, 1), loc(2, 1), loc(3, 1));
        let moves = vec![
            MoveRecord::new(a, b),
            MoveRecord::new(b, c),
            MoveRecord::new(c, a),
        ];
        let processed = process_move_list(&moves).expect("process");
        assert_eq!(processed.loop_chains, vec![vec![a, b, c]]);
        assert_eq!(processed.visited.len(), 3);
    }

    #[test]
    fn pool_reload_is_captured() {
        let a = loc(2, 2);
        let moves = vec![
            MoveRecord::new(a, Location::ExCore),
            MoveRecord::new(Location::Sfp, a)
                .with_type("fuel")
                .with_name("A0009"),
        ];
        let processed = process_move_list(&moves).expect("process");
        let chain = &processed.load_chains[0];
        assert_eq!(chain.charge.source, Location::Sfp);
        assert_eq!(chain.discharge_to, Location::ExCore);
        assert_eq!(processed.load_names().collect::<Vec<_>>(), vec![Some("A0009")]);
    }

    #[test]
    fn rotations_are_collected() {
        let a = loc(1, 1);
        let moves = vec![MoveRecord::rotation_at(a, 0.5)];
        let processed = process_move_list(&moves).expect("process");
        assert_eq!(processed.rotations, vec![(a, 0.5)]);
        assert!(processed.visited.is_empty());
    }

    #[test]
    fn missing_predecessor_is_broken_chain() {
        let moves = vec![MoveRecord::new(loc(1, 1), Location::Sfp)];
        assert!(matches!(
            process_move_list(&moves),
            Err(RefuelError::BrokenChain { .. })
        ));
    }

    #[test]
    fn long_chain_hits_step_bound() {
        let mut moves = Vec::new();
        for pos in 1..=150 {
            moves.push(MoveRecord::new(loc(1, pos), loc(1, pos + 1)));
        }
        moves.push(MoveRecord::new(loc(1, 151), Location::Sfp));
        let result = track_chain(&moves, loc(1, 151));
        match result {
            Err(RefuelError::ChainBoundsExceeded { limit, partial }) => {
                assert_eq!(limit, MAX_CHAIN_STEPS);
                assert!(partial.len() > MAX_CHAIN_STEPS);
            }
            other => unreachable!("expected bound error, got {other:?}"),
        }
    }

    #[test]
    fn location_in_two_chains_conflicts() {
        let (a, b) = (loc(1, 1), loc(2, 1));
        let moves = vec![
            MoveRecord::new(a, Location::Sfp),
            MoveRecord::new(a, Location::ExCore),
            MoveRecord::new(Location::LoadQueue, a).with_type("fuel"),
            MoveRecord::new(b, b),
        ];
        assert!(matches!(
            process_move_list(&moves),
            Err(RefuelError::ChainConflict(_))
        ));
    }

    #[test]
    fn charge_without_discharge_is_rejected() {
        let (a, b) = (loc(1, 1), loc(2, 1));
        let moves = vec![
            MoveRecord::new(Location::LoadQueue, a).with_type("fuel"),
            MoveRecord::new(a, b),
        ];
        assert!(matches!(
            process_move_list(&moves),
            Err(RefuelError::InvalidSequence(_))
        ));
    }
}
