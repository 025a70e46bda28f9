//! # Reactor Collaborator
//!
//! The core-model interface the shuffle engine consumes.
//!
//! The engine never owns assemblies. It addresses them by `AssemblyId` and asks
//! a `CoreStore` to look them up, move them, discharge them to the spent fuel
//! pool, or build fresh ones. Ring/position arithmetic lives behind this trait.
//!
//! `Core` is the deterministic in-memory implementation, used by tests, the
//! CLI, and callers that do not bring their own model.

use crate::{Assembly, AssemblyId, Location, RefuelError, TypeFilter};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// CORESTORE TRAIT
// =============================================================================

/// The CoreStore trait defines everything the engine needs from a core model.
///
/// Implementations must be deterministic: list-returning methods return items
/// in a stable order.
pub trait CoreStore {
    /// Outermost ring index.
    fn max_ring(&self) -> u32;

    /// Borrow an assembly wherever it is (core, pool, or unplaced).
    fn assembly(&self, id: AssemblyId) -> Option<&Assembly>;

    /// Mutably borrow an assembly.
    fn assembly_mut(&mut self, id: AssemblyId) -> Option<&mut Assembly>;

    /// The assembly occupying a core location.
    fn assembly_at(&self, location: &Location) -> Option<AssemblyId>;

    /// The core location of an assembly, `None` if it is not in the core.
    fn location_of(&self, id: AssemblyId) -> Option<Location>;

    /// `(ring, position)` of an assembly in the core.
    fn ring_position_of(&self, id: AssemblyId) -> Option<(u32, u32)>;

    /// Assemblies in a ring matching `filter`, ordered by location.
    ///
    /// `circular` selects circular rings (radial distance bands) instead of
    /// the grid's native rings.
    fn assemblies_in_ring(&self, ring: u32, filter: &TypeFilter, circular: bool)
    -> Vec<AssemblyId>;

    /// Every occupied core location, ordered by location.
    fn occupied_locations(&self) -> Vec<(Location, AssemblyId)>;

    /// Number of symmetric copies of `location` outside the modeled sector.
    fn symmetric_equivalent_count(&self, location: &Location) -> u32;

    /// Take the assembly out of `location` and put it in the spent fuel pool.
    fn remove_assembly(&mut self, location: &Location) -> Result<AssemblyId, RefuelError>;

    /// Put an out-of-core assembly at an empty core location.
    fn place_assembly(&mut self, id: AssemblyId, location: &Location) -> Result<(), RefuelError>;

    /// Swap the core locations of two placed assemblies.
    fn exchange_locations(&mut self, first: AssemblyId, second: AssemblyId)
    -> Result<(), RefuelError>;

    /// Build an unplaced assembly of `assem_type` with the given fuel enrichments.
    ///
    /// `enrich_list` holds one value per fuel block, or one per block with
    /// non-fuel entries ignored. An empty list keeps the type's defaults.
    fn create_assembly(
        &mut self,
        assem_type: &str,
        enrich_list: &[f64],
    ) -> Result<AssemblyId, RefuelError>;

    /// Look up a pool assembly by name.
    fn sfp_get_by_name(&self, name: &str) -> Option<AssemblyId>;

    /// True if the assembly is in the pool.
    fn sfp_contains(&self, id: AssemblyId) -> bool;

    /// Remove from the pool. Returns whether it was there.
    fn sfp_remove(&mut self, id: AssemblyId) -> bool;

    /// Every pool assembly, ordered by id.
    fn sfp_list(&self) -> Vec<AssemblyId>;
}

// =============================================================================
// IN-MEMORY CORE
// =============================================================================

/// In-memory core model.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct Core {
    max_ring: u32,

    /// All known assemblies regardless of where they are.
    assemblies: BTreeMap<AssemblyId, Assembly>,

    /// Core location -> assembly.
    positions: BTreeMap<Location, AssemblyId>,

    /// Reverse lookup: assembly -> core location.
    locations: BTreeMap<AssemblyId, Location>,

    /// Spent fuel pool membership.
    sfp: BTreeSet<AssemblyId>,

    /// Circular ring overrides per location.
    circular_rings: BTreeMap<Location, u32>,

    /// Symmetric-equivalent counts per location (default 0).
    symmetry: BTreeMap<Location, u32>,

    /// Templates for fresh assemblies, keyed by assembly type.
    templates: BTreeMap<String, Assembly>,

    next_id: u64,
}

impl Core {
    /// Create an empty core with rings `1..=max_ring`.
    #[must_use]
    pub fn new(max_ring: u32) -> Self {
        Self {
            max_ring,
            next_id: 1,
            ..Self::default()
        }
    }

    fn allocate_id(&mut self) -> AssemblyId {
        let id = AssemblyId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn check_in_grid(&self, location: &Location) -> Result<(), RefuelError> {
        match location.ring() {
            Some(ring) if ring <= self.max_ring => Ok(()),
            _ => Err(RefuelError::InvalidLocation(location.to_string())),
        }
    }

    /// Add an assembly at a core location. The assembly's id is reassigned.
    pub fn add_assembly(
        &mut self,
        mut assembly: Assembly,
        location: Location,
    ) -> Result<AssemblyId, RefuelError> {
        self.check_in_grid(&location)?;
        if self.positions.contains_key(&location) {
            return Err(RefuelError::OccupiedLocation(location));
        }
        let id = self.allocate_id();
        assembly.id = id;
        self.assemblies.insert(id, assembly);
        self.positions.insert(location, id);
        self.locations.insert(id, location);
        Ok(id)
    }

    /// Add an assembly directly to the spent fuel pool. The id is reassigned.
    pub fn add_to_sfp(&mut self, mut assembly: Assembly) -> AssemblyId {
        let id = self.allocate_id();
        assembly.id = id;
        self.assemblies.insert(id, assembly);
        self.sfp.insert(id);
        id
    }

    /// Register the template used by `create_assembly` for its type.
    pub fn register_template(&mut self, template: Assembly) {
        self.templates.insert(template.assem_type.clone(), template);
    }

    /// Override the circular ring of a location.
    pub fn set_circular_ring(&mut self, location: Location, ring: u32) {
        self.circular_rings.insert(location, ring);
    }

    /// Set the symmetric-equivalent count of a location.
    pub fn set_symmetric_equivalents(&mut self, location: Location, count: u32) {
        self.symmetry.insert(location, count);
    }

    /// Location -> assembly name, for comparing layouts.
    #[must_use]
    pub fn layout(&self) -> BTreeMap<Location, String> {
        self.positions
            .iter()
            .filter_map(|(loc, id)| self.assemblies.get(id).map(|a| (*loc, a.name.clone())))
            .collect()
    }

    /// Number of assemblies placed in the core.
    #[must_use]
    pub fn placed_count(&self) -> usize {
        self.positions.len()
    }

    fn ring_of(&self, location: &Location, circular: bool) -> Option<u32> {
        if circular && let Some(ring) = self.circular_rings.get(location) {
            return Some(*ring);
        }
        location.ring()
    }
}

impl CoreStore for Core {
    fn max_ring(&self) -> u32 {
        self.max_ring
    }

    fn assembly(&self, id: AssemblyId) -> Option<&Assembly> {
        self.assemblies.get(&id)
    }

    fn assembly_mut(&mut self, id: AssemblyId) -> Option<&mut Assembly> {
        self.assemblies.get_mut(&id)
    }

    fn assembly_at(&self, location: &Location) -> Option<AssemblyId> {
        self.positions.get(location).copied()
    }

    fn location_of(&self, id: AssemblyId) -> Option<Location> {
        self.locations.get(&id).copied()
    }

    fn ring_position_of(&self, id: AssemblyId) -> Option<(u32, u32)> {
        match self.locations.get(&id)? {
            Location::Grid { ring, pos, .. } => Some((*ring, *pos)),
            _ => None,
        }
    }

    fn assemblies_in_ring(
        &self,
        ring: u32,
        filter: &TypeFilter,
        circular: bool,
    ) -> Vec<AssemblyId> {
        self.positions
            .iter()
            .filter(|(loc, _)| self.ring_of(loc, circular) == Some(ring))
            .filter(|(_, id)| {
                self.assemblies
                    .get(id)
                    .is_some_and(|a| filter.matches(&a.flags))
            })
            .map(|(_, id)| *id)
            .collect()
    }

    fn occupied_locations(&self) -> Vec<(Location, AssemblyId)> {
        self.positions.iter().map(|(l, id)| (*l, *id)).collect()
    }

    fn symmetric_equivalent_count(&self, location: &Location) -> u32 {
        self.symmetry.get(location).copied().unwrap_or(0)
    }

    fn remove_assembly(&mut self, location: &Location) -> Result<AssemblyId, RefuelError> {
        let id = self
            .positions
            .remove(location)
            .ok_or(RefuelError::EmptyLocation(*location))?;
        self.locations.remove(&id);
        self.sfp.insert(id);
        Ok(id)
    }

    fn place_assembly(&mut self, id: AssemblyId, location: &Location) -> Result<(), RefuelError> {
        self.check_in_grid(location)?;
        if !self.assemblies.contains_key(&id) {
            return Err(RefuelError::AssemblyNotFound(id));
        }
        if self.positions.contains_key(location) {
            return Err(RefuelError::OccupiedLocation(*location));
        }
        if let Some(previous) = self.locations.remove(&id) {
            self.positions.remove(&previous);
        }
        self.positions.insert(*location, id);
        self.locations.insert(id, *location);
        Ok(())
    }

    fn exchange_locations(
        &mut self,
        first: AssemblyId,
        second: AssemblyId,
    ) -> Result<(), RefuelError> {
        let first_loc = self
            .locations
            .get(&first)
            .copied()
            .ok_or(RefuelError::NotInCore(first))?;
        let second_loc = self
            .locations
            .get(&second)
            .copied()
            .ok_or(RefuelError::NotInCore(second))?;
        self.positions.insert(first_loc, second);
        self.positions.insert(second_loc, first);
        self.locations.insert(first, second_loc);
        self.locations.insert(second, first_loc);
        Ok(())
    }

    fn create_assembly(
        &mut self,
        assem_type: &str,
        enrich_list: &[f64],
    ) -> Result<AssemblyId, RefuelError> {
        let mut assembly = self
            .templates
            .get(assem_type)
            .cloned()
            .ok_or_else(|| RefuelError::UnknownAssemblyType(assem_type.to_string()))?;

        if !enrich_list.is_empty() {
            let fuel_blocks = assembly.blocks.iter().filter(|b| b.is_fuel()).count();
            if fuel_blocks == enrich_list.len() {
                for (block, enrichment) in assembly
                    .blocks
                    .iter_mut()
                    .filter(|b| b.is_fuel())
                    .zip(enrich_list)
                {
                    block.enrichment = *enrichment;
                }
            } else if assembly.blocks.len() == enrich_list.len() {
                // One value per block; non-fuel entries are ignored.
                for (block, enrichment) in assembly.blocks.iter_mut().zip(enrich_list) {
                    if block.is_fuel() {
                        block.enrichment = *enrichment;
                    }
                }
            } else {
                return Err(RefuelError::Config(format!(
                    "Assembly type {:?} has {} fuel blocks of {} but {} enrichments were given",
                    assem_type,
                    fuel_blocks,
                    assembly.blocks.len(),
                    enrich_list.len()
                )));
            }
        }

        let id = self.allocate_id();
        assembly.id = id;
        assembly.name = format!("A{:04}", id.0);
        assembly.multiplicity = 1;
        self.assemblies.insert(id, assembly);
        Ok(id)
    }

    fn sfp_get_by_name(&self, name: &str) -> Option<AssemblyId> {
        self.sfp
            .iter()
            .copied()
            .find(|id| self.assemblies.get(id).is_some_and(|a| a.name == name))
    }

    fn sfp_contains(&self, id: AssemblyId) -> bool {
        self.sfp.contains(&id)
    }

    fn sfp_remove(&mut self, id: AssemblyId) -> bool {
        self.sfp.remove(&id)
    }

    fn sfp_list(&self) -> Vec<AssemblyId> {
        self.sfp.iter().copied().collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Block, Flags};

    fn fuel(name: &str) -> Assembly {
        let mut a = Assembly::new(AssemblyId(0), name, "fuel", Flags::from_names(["fuel"]));
        a.blocks = vec![
            Block::new("f1", Flags::from_names(["fuel"]), 50.0).with_enrichment(10.0),
            Block::new("f2", Flags::from_names(["fuel"]), 100.0).with_enrichment(11.0),
        ];
        a
    }

    #[test]
    fn add_and_lookup() {
        let mut core = Core::new(3);
        let id = core.add_assembly(fuel("A"), Location::grid(2, 1)).expect("add");

        assert_eq!(core.assembly_at(&Location::grid(2, 1)), Some(id));
        assert_eq!(core.location_of(id), Some(Location::grid(2, 1)));
        assert_eq!(core.ring_position_of(id), Some((2, 1)));
    }

    #[test]
    fn add_rejects_occupied_and_out_of_grid() {
        let mut core = Core::new(3);
        core.add_assembly(fuel("A"), Location::grid(1, 1)).expect("add");

        assert!(matches!(
            core.add_assembly(fuel("B"), Location::grid(1, 1)),
            Err(RefuelError::OccupiedLocation(_))
        ));
        assert!(matches!(
            core.add_assembly(fuel("B"), Location::grid(4, 1)),
            Err(RefuelError::InvalidLocation(_))
        ));
        assert!(matches!(
            core.add_assembly(fuel("B"), Location::Sfp),
            Err(RefuelError::InvalidLocation(_))
        ));
    }

    #[test]
    fn remove_goes_to_pool() {
        let mut core = Core::new(3);
        let id = core.add_assembly(fuel("A"), Location::grid(2, 1)).expect("add");

        let removed = core.remove_assembly(&Location::grid(2, 1)).expect("remove");
        assert_eq!(removed, id);
        assert!(core.sfp_contains(id));
        assert_eq!(core.location_of(id), None);
        assert_eq!(core.sfp_get_by_name("A"), Some(id));
    }

    #[test]
    fn exchange_requires_both_in_core() {
        let mut core = Core::new(3);
        let a = core.add_assembly(fuel("A"), Location::grid(1, 1)).expect("add");
        let b = core.add_assembly(fuel("B"), Location::grid(2, 1)).expect("add");
        let pooled = core.add_to_sfp(fuel("P"));

        core.exchange_locations(a, b).expect("exchange");
        assert_eq!(core.location_of(a), Some(Location::grid(2, 1)));
        assert_eq!(core.location_of(b), Some(Location::grid(1, 1)));

        assert!(matches!(
            core.exchange_locations(a, pooled),
            Err(RefuelError::NotInCore(_))
        ));
    }

    #[test]
    fn create_assembly_applies_enrichment() {
        let mut core = Core::new(3);
        core.register_template(fuel("template"));

        let id = core.create_assembly("fuel", &[4.5, 5.5]).expect("create");
        let a = core.assembly(id).expect("assembly");
        assert_eq!(a.enrich_list(), vec![4.5, 5.5]);
        assert_eq!(core.location_of(id), None);

        assert!(matches!(
            core.create_assembly("fuel", &[1.0]),
            Err(RefuelError::Config(_))
        ));
        assert!(matches!(
            core.create_assembly("control", &[]),
            Err(RefuelError::UnknownAssemblyType(_))
        ));
    }

    #[test]
    fn create_assembly_accepts_per_block_enrichment() {
        let mut core = Core::new(3);
        let mut template = fuel("template");
        template
            .blocks
            .insert(0, Block::new("plate", Flags::from_names(["grid plate"]), 10.0));
        core.register_template(template);

        let id = core.create_assembly("fuel", &[0.0, 4.5, 5.5]).expect("per block");
        assert_eq!(core.assembly(id).expect("assembly").enrich_list(), vec![4.5, 5.5]);

        let id = core.create_assembly("fuel", &[6.0, 7.0]).expect("fuel only");
        assert_eq!(core.assembly(id).expect("assembly").enrich_list(), vec![6.0, 7.0]);

        assert!(matches!(
            core.create_assembly("fuel", &[1.0, 2.0, 3.0, 4.0]),
            Err(RefuelError::Config(_))
        ));
    }

    #[test]
    fn circular_rings_override_native_rings() {
        let mut core = Core::new(4);
        let a = core.add_assembly(fuel("A"), Location::grid(3, 1)).expect("add");
        let b = core.add_assembly(fuel("B"), Location::grid(3, 2)).expect("add");
        core.set_circular_ring(Location::grid(3, 2), 4);

        let native = core.assemblies_in_ring(3, &TypeFilter::any(), false);
        let circular = core.assemblies_in_ring(3, &TypeFilter::any(), true);
        assert_eq!(native, vec![a, b]);
        assert_eq!(circular, vec![a]);
    }
}
