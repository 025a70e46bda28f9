//! # Assembly Search
//!
//! Multi-criteria candidate selection over rings.
//!
//! A query names a target ring and a width; the search walks the resulting
//! candidate rings in priority order, filters assemblies by type, location and
//! parameter bounds, and ranks survivors by `|param(a) - compare_to|`.
//!
//! ## Determinism
//!
//! Distances within `TIE_TOLERANCE` of each other are ties, and ties go to the
//! lower `AssemblyId` whatever order the rings were walked in.

use crate::primitives::TIE_TOLERANCE;
use crate::reactor::CoreStore;
use crate::{AssemblyId, Location, RefuelError, TypeFilter};
use std::collections::BTreeSet;
use tracing::debug;

// =============================================================================
// BOUNDS
// =============================================================================

/// What a bound or comparison value is measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reference {
    /// A literal value.
    Value(f64),
    /// The same parameter read from another assembly.
    Assembly(AssemblyId),
}

/// A reference scaled by a multiplier, resolved before comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub reference: Reference,
    pub multiplier: f64,
}

impl Bound {
    /// A plain value.
    #[must_use]
    pub const fn value(value: f64) -> Self {
        Self {
            reference: Reference::Value(value),
            multiplier: 1.0,
        }
    }

    /// `multiplier * param(other)`.
    #[must_use]
    pub const fn relative_to(other: AssemblyId, multiplier: f64) -> Self {
        Self {
            reference: Reference::Assembly(other),
            multiplier,
        }
    }

    fn resolve<S: CoreStore>(&self, store: &S, param: &str) -> Result<f64, RefuelError> {
        let base = match self.reference {
            Reference::Value(v) => v,
            Reference::Assembly(id) => store
                .assembly(id)
                .ok_or(RefuelError::AssemblyNotFound(id))?
                .param(param),
        };
        Ok(base * self.multiplier)
    }
}

/// A min or max constraint on one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBound {
    pub param: String,
    pub bound: Bound,
}

impl ParamBound {
    #[must_use]
    pub fn new(param: impl Into<String>, bound: Bound) -> Self {
        Self {
            param: param.into(),
            bound,
        }
    }
}

/// Restrict candidates to one side of `compare_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Strictly greater than the comparison value.
    Above,
    /// Strictly less than the comparison value.
    Below,
}

// =============================================================================
// QUERY
// =============================================================================

/// A search request. Build with the chained setters.
#[derive(Debug, Clone, Default)]
pub struct AssemblyQuery {
    target_ring: Option<u32>,
    width: (u32, i32),
    type_filter: TypeFilter,
    param: Option<String>,
    compare_to: Option<Bound>,
    force_side: Option<Side>,
    exclusions: BTreeSet<AssemblyId>,
    mandatory_locations: Option<BTreeSet<Location>>,
    excluded_locations: BTreeSet<Location>,
    min_constraints: Vec<ParamBound>,
    max_constraints: Vec<ParamBound>,
    max_num_assems: Option<usize>,
    accept_first_candidate_ring: bool,
    circular_rings: bool,
}

impl AssemblyQuery {
    /// Match any assembly anywhere in the core.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the search at `ring`.
    #[must_use]
    pub fn target_ring(mut self, ring: u32) -> Self {
        self.target_ring = Some(ring);
        self
    }

    /// Extend the search `count` rings; `side <= 0` adds inner, `side >= 0` outer.
    #[must_use]
    pub fn width(mut self, count: u32, side: i32) -> Self {
        self.width = (count, side);
        self
    }

    #[must_use]
    pub fn type_filter(mut self, filter: TypeFilter) -> Self {
        self.type_filter = filter;
        self
    }

    /// Rank by this parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.param = Some(name.into());
        self
    }

    /// Rank by distance to this value (default 0.0).
    #[must_use]
    pub fn compare_to(mut self, bound: Bound) -> Self {
        self.compare_to = Some(bound);
        self
    }

    #[must_use]
    pub fn force_side(mut self, side: Side) -> Self {
        self.force_side = Some(side);
        self
    }

    #[must_use]
    pub fn exclude<I: IntoIterator<Item = AssemblyId>>(mut self, ids: I) -> Self {
        self.exclusions.extend(ids);
        self
    }

    /// Only consider assemblies at these locations (a zone).
    #[must_use]
    pub fn mandatory_locations<I: IntoIterator<Item = Location>>(mut self, locations: I) -> Self {
        self.mandatory_locations = Some(locations.into_iter().collect());
        self
    }

    #[must_use]
    pub fn exclude_locations<I: IntoIterator<Item = Location>>(mut self, locations: I) -> Self {
        self.excluded_locations.extend(locations);
        self
    }

    /// Require `param(a) >= bound`.
    #[must_use]
    pub fn min(mut self, constraint: ParamBound) -> Self {
        self.min_constraints.push(constraint);
        self
    }

    /// Require `param(a) <= bound`.
    #[must_use]
    pub fn max(mut self, constraint: ParamBound) -> Self {
        self.max_constraints.push(constraint);
        self
    }

    /// Cap the `find_assemblies` result length.
    #[must_use]
    pub fn max_num_assems(mut self, count: usize) -> Self {
        self.max_num_assems = Some(count);
        self
    }

    /// Stop at the first candidate ring that has any match.
    #[must_use]
    pub fn accept_first_candidate_ring(mut self, accept: bool) -> Self {
        self.accept_first_candidate_ring = accept;
        self
    }

    #[must_use]
    pub fn circular_rings(mut self, circular: bool) -> Self {
        self.circular_rings = circular;
        self
    }

    /// Rings to scan, in priority order.
    #[must_use]
    pub fn candidate_rings(&self, max_ring: u32) -> Vec<u32> {
        let Some(target) = self.target_ring else {
            return (1..=max_ring).collect();
        };
        let (count, side) = self.width;
        let mut rings = vec![target];
        for step in 1..=count {
            if side <= 0 && target > step {
                rings.push(target - step);
            }
            if side >= 0 {
                let outer = target.saturating_add(step);
                if outer <= max_ring {
                    rings.push(outer);
                } else {
                    debug!(ring = outer, max_ring, "candidate ring outside the core, skipped");
                }
            }
        }
        rings
    }
}

// =============================================================================
// SEARCH
// =============================================================================

/// Two distances are ties when they agree to `TIE_TOLERANCE`, relatively or absolutely.
fn is_close(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs());
    (a - b).abs() <= (TIE_TOLERANCE * scale).max(TIE_TOLERANCE)
}

/// Collect `(id, distance)` for every surviving candidate.
fn survivors<S: CoreStore>(
    store: &S,
    query: &AssemblyQuery,
) -> Result<Vec<(AssemblyId, f64)>, RefuelError> {
    let target = match (&query.param, &query.compare_to) {
        (Some(param), Some(bound)) => bound.resolve(store, param)?,
        _ => 0.0,
    };

    let mut min_limits = Vec::with_capacity(query.min_constraints.len());
    for c in &query.min_constraints {
        min_limits.push((c.param.as_str(), c.bound.resolve(store, &c.param)?));
    }
    let mut max_limits = Vec::with_capacity(query.max_constraints.len());
    for c in &query.max_constraints {
        max_limits.push((c.param.as_str(), c.bound.resolve(store, &c.param)?));
    }

    let mut seen = BTreeSet::new();
    let mut found = Vec::new();

    for ring in query.candidate_rings(store.max_ring()) {
        let mut in_ring = 0usize;
        let ring_members = store.assemblies_in_ring(ring, &query.type_filter, query.circular_rings);
        if ring_members.is_empty() {
            debug!(ring, "candidate ring is not populated");
        }

        for id in ring_members {
            if !seen.insert(id) || query.exclusions.contains(&id) {
                continue;
            }
            let Some(assembly) = store.assembly(id) else {
                continue;
            };
            let Some(location) = store.location_of(id) else {
                continue;
            };
            if query.excluded_locations.contains(&location) {
                continue;
            }
            if let Some(zone) = &query.mandatory_locations
                && !zone.contains(&location)
            {
                continue;
            }
            if min_limits.iter().any(|(p, v)| assembly.param(p) < *v)
                || max_limits.iter().any(|(p, v)| assembly.param(p) > *v)
            {
                continue;
            }

            let distance = match &query.param {
                Some(param) => {
                    let value = assembly.param(param);
                    match query.force_side {
                        Some(Side::Above) if value <= target => continue,
                        Some(Side::Below) if value >= target => continue,
                        _ => {}
                    }
                    (value - target).abs()
                }
                None => 0.0,
            };

            found.push((id, distance));
            in_ring += 1;
        }

        if query.accept_first_candidate_ring && in_ring > 0 {
            debug!(ring, candidates = in_ring, "accepting first candidate ring");
            break;
        }
    }

    Ok(found)
}

/// Find the single best assembly, or `None` when nothing qualifies.
pub fn find_assembly<S: CoreStore>(
    store: &S,
    query: &AssemblyQuery,
) -> Result<Option<AssemblyId>, RefuelError> {
    let mut best: Option<(AssemblyId, f64)> = None;
    for (id, distance) in survivors(store, query)? {
        best = match best {
            None => Some((id, distance)),
            Some((best_id, best_distance)) => {
                if is_close(distance, best_distance) {
                    if id < best_id {
                        Some((id, distance))
                    } else {
                        Some((best_id, best_distance))
                    }
                } else if distance < best_distance {
                    Some((id, distance))
                } else {
                    Some((best_id, best_distance))
                }
            }
        };
    }
    Ok(best.map(|(id, _)| id))
}

/// Find every qualifying assembly, nearest first, capped at `max_num_assems`.
///
/// Near-equal distances are ordered by ascending id.
pub fn find_assemblies<S: CoreStore>(
    store: &S,
    query: &AssemblyQuery,
) -> Result<Vec<AssemblyId>, RefuelError> {
    let mut found = survivors(store, query)?;
    found.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    // Regroup runs of ties by id.
    let mut ordered = Vec::with_capacity(found.len());
    let mut start = 0;
    while start < found.len() {
        let anchor = found[start].1;
        let mut end = start + 1;
        while end < found.len() && is_close(found[end].1, anchor) {
            end += 1;
        }
        let mut group: Vec<AssemblyId> = found[start..end].iter().map(|(id, _)| *id).collect();
        group.sort();
        ordered.extend(group);
        start = end;
    }

    if let Some(limit) = query.max_num_assems {
        ordered.truncate(limit);
    }
    Ok(ordered)
}

// =============================================================================
// TESTS
// =============================================================================
