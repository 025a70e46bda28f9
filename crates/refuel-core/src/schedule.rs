//! # Ring Schedule Builder
//!
//! Ordered ring lists (with search widths) that a shuffle strategy walks from
//! the discharge end to the charge end.

use crate::RefuelError;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Rings to visit in order, with a search width per ring.
///
/// `widths[i]` is the number of rings on either side of `rings[i]` the search
/// may widen to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RingSchedule {
    pub rings: Vec<u32>,
    pub widths: Vec<u32>,
}

impl RingSchedule {
    /// Iterate `(ring, width)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.rings.iter().copied().zip(self.widths.iter().copied())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }
}

fn clamp_ring(name: &str, ring: u32, max_ring: u32) -> u32 {
    if ring > max_ring {
        warn!(ring, max_ring, "{name} is beyond the outermost ring, clamping");
        max_ring
    } else {
        ring
    }
}

fn check_coarse(coarse_factor: f64) -> Result<(), RefuelError> {
    if !(0.0..1.0).contains(&coarse_factor) {
        return Err(RefuelError::InvalidSchedule(format!(
            "coarse factor {coarse_factor} is outside [0, 1)"
        )));
    }
    Ok(())
}

/// `num` evenly spaced integers from `start` to `end`, truncated, de-duplicated.
fn sampled_rings(start: u32, end: u32, num: usize) -> Vec<u32> {
    let start = i64::from(start);
    let span = i64::from(end) - start;
    let intervals = (num.max(2) - 1) as i64;

    let mut rings: Vec<u32> = Vec::with_capacity(num);
    for i in 0..=intervals {
        let ring = (start + (span * i).div_euclid(intervals)) as u32;
        if !rings.contains(&ring) {
            rings.push(ring);
        }
    }
    rings
}

fn closest_index(rings: &[u32], target: u32) -> usize {
    let mut best = 0;
    for (i, ring) in rings.iter().enumerate() {
        if ring.abs_diff(target) < rings[best].abs_diff(target) {
            best = i;
        }
    }
    best
}

/// Build the ring schedule for a shuffle.
///
/// - `charge_ring` defaults to `max_ring`, `discharge_ring` to 1.
/// - Convergent when `charge_ring > discharge_ring`, divergent otherwise.
/// - `jump_ring_to` defaults to 1 (convergent) or `max_ring` (divergent).
/// - With `jump_ring_from`, the rings between the two jump indices are
///   visited in reverse.
pub fn build_ring_schedule(
    max_ring: u32,
    charge_ring: Option<u32>,
    discharge_ring: Option<u32>,
    jump_ring_from: Option<u32>,
    jump_ring_to: Option<u32>,
    coarse_factor: f64,
) -> Result<RingSchedule, RefuelError> {
    if max_ring == 0 {
        return Err(RefuelError::InvalidSchedule("max ring must be at least 1".into()));
    }
    check_coarse(coarse_factor)?;

    let charge = clamp_ring("charge ring", charge_ring.unwrap_or(max_ring), max_ring);
    let discharge = clamp_ring("discharge ring", discharge_ring.unwrap_or(1), max_ring);
    if charge == 0 || discharge == 0 {
        return Err(RefuelError::InvalidSchedule("rings are numbered from 1".into()));
    }

    let convergent = charge > discharge;
    let jump_to = clamp_ring(
        "jump-to ring",
        jump_ring_to.unwrap_or(if convergent { 1 } else { max_ring }),
        max_ring,
    );
    let jump_ring_from = jump_ring_from.map(|ring| clamp_ring("jump-from ring", ring, max_ring));
    if let Some(jump_from) = jump_ring_from {
        if convergent && jump_from < jump_to {
            return Err(RefuelError::InvalidSchedule(format!(
                "convergent schedule cannot jump from ring {jump_from} out to ring {jump_to}"
            )));
        }
        if !convergent && jump_from > jump_to {
            return Err(RefuelError::InvalidSchedule(format!(
                "divergent schedule cannot jump from ring {jump_from} in to ring {jump_to}"
            )));
        }
    }

    let span = f64::from(charge.abs_diff(discharge) + 1);
    let num_steps = ((span * (1.0 - coarse_factor)).round() as usize).max(2);
    let base = sampled_rings(discharge, charge, num_steps);

    let mut widths: Vec<u32> = base
        .windows(2)
        .map(|pair| pair[0].abs_diff(pair[1]).saturating_sub(1))
        .collect();
    widths.push(0);

    let Some(jump_from) = jump_ring_from else {
        return Ok(RingSchedule {
            rings: base,
            widths,
        });
    };

    let from_index = closest_index(&base, jump_from);
    let to_index = closest_index(&base, jump_to);
    let (lo, hi) = (from_index.min(to_index), from_index.max(to_index));

    let mut rings = base;
    rings[lo..hi].reverse();
    widths[lo..hi].reverse();
    Ok(RingSchedule { rings, widths })
}

/// Convergent schedule: unique rings from `discharge_ring` out to `charge_ring`.
///
/// Widths are the gaps to the next ring; the last width is 1.
pub fn build_convergent_ring_schedule(
    charge_ring: u32,
    discharge_ring: u32,
    coarse_factor: f64,
) -> Result<RingSchedule, RefuelError> {
    check_coarse(coarse_factor)?;
    if charge_ring == 0 || discharge_ring == 0 {
        return Err(RefuelError::InvalidSchedule("rings are numbered from 1".into()));
    }

    let span = f64::from(charge_ring.abs_diff(discharge_ring) + 1);
    let num_steps = ((span * (1.0 - coarse_factor)).round() as usize).max(2);
    let rings: Vec<u32> = sampled_rings(discharge_ring, charge_ring, num_steps)
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut widths: Vec<u32> = rings.windows(2).map(|pair| pair[1] - pair[0]).collect();
    widths.push(1);
    Ok(RingSchedule { rings, widths })
}

// =============================================================================
// TESTS
// =============================================================================
