// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Resolution State Machine
//!
//! The protocol state is carried entirely by `(mutation_cases, origin,
//! mutations)` in the batch `Meta` — no in-memory session. This module is the
//! pure state-transition function: given a flagged batch and its meta, apply
//! the next unused mitigation strategy and produce the batch and meta to hand
//! back to the Detector. Transport is the caller's concern.
//!
//! # Transition table (batch-level mask)
//!
//! | mask  | strategy                            | next  |
//! |-------|-------------------------------------|-------|
//! | `000` | reduce speed of lowest priority 25% | `001` |
//! | `001` | random bounded heading change       | `011` |
//! | `011` | altitude step (v_sep + 10 m)        | `111` |
//! | other | passthrough for re-evaluation       | same  |
//!
//! "Lowest priority" is the conflicting aircraft with the greatest `uav_id`
//! among those currently flagged — a cheap, order-independent tie-break, not
//! a right-of-way rule.

use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::abilities::AbilityTable;
use crate::domain::envelope::{Meta, ProtocolError, StrategyMask};
use crate::domain::trajectory::{Origin, Trajectory, UavId};

/// Escalation ceiling: maximum permitted resolution attempts per lineage.
pub const MAX_MUTATIONS: u32 = 100;

/// Minimum heading change, so a maneuver is never a no-op.
const MIN_BEARING: f64 = 5.0;

/// Heading authority used when a type has none configured.
const DEFAULT_MAX_BEARING: f64 = 15.0;

/// Extra margin added on top of the vertical separation for the altitude step.
const ALTITUDE_MARGIN_M: f64 = 10.0;

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Strategies that pick a loser out of a pair need at least two flagged
    /// aircraft to compare.
    #[error("({strategy}) not enough flagged conflicts to determine lower priority UAV: {flagged}")]
    NotEnoughConflicts {
        strategy: &'static str,
        flagged: usize,
    },

    #[error("no uav_type found on trajectory {uav_id}")]
    UnknownUavType { uav_id: UavId },

    #[error("(altitude step) no flagged conflicts in batch")]
    NoConflicts,
}

/// Guard clause run before any strategy: enforce the escalation protocol and
/// return the updated meta.
///
/// - `origin == system` with an existing count: abort past the ceiling,
///   otherwise increment.
/// - `origin == self_report` with no count yet: initialize to 1.
/// - Anything else is a fatal protocol violation for this lineage.
pub fn check_escalation(meta: &Meta, ceiling: u32) -> Result<Meta, ProtocolError> {
    let mut meta = meta.clone();
    match (meta.origin, meta.mutations) {
        (Origin::System, Some(count)) => {
            info!(mutations = count, "trajectory was previously mutated");
            if count > ceiling {
                warn!(ceiling, "mutation ceiling exceeded, abandoning lineage");
                return Err(ProtocolError::CeilingExceeded { ceiling });
            }
            meta.mutations = Some(count + 1);
        }
        (Origin::SelfReport, None) => {
            info!("first mutation for this lineage");
            meta.mutations = Some(1);
        }
        (origin, mutations) => {
            return Err(ProtocolError::InvalidEscalation { origin, mutations });
        }
    }
    Ok(meta)
}

/// Apply the next unused strategy (or pass through) and stamp the outgoing
/// meta: `origin` forced to `system`, `mutation_cases` advanced per the
/// transition table. The returned batch has all conflict flags consumed.
pub fn resolve<R: Rng>(
    data: &[Trajectory],
    meta: &Meta,
    abilities: &AbilityTable,
    vertical_separation: f64,
    ceiling: u32,
    rng: &mut R,
) -> Result<(Vec<Trajectory>, Meta), ResolutionError> {
    let mut meta = check_escalation(meta, ceiling)?;

    let mask = meta.mutation_cases.unwrap_or_default();
    let (mutated, next_mask) = match mask.bits() {
        0b000 => (
            reduce_speed_of_lowest_priority(data)?,
            mask.union(StrategyMask::REDUCE_SPEED),
        ),
        0b001 => (
            change_heading_of_lowest_priority(data, abilities, rng)?,
            mask.union(StrategyMask::CHANGE_HEADING),
        ),
        0b011 => (
            climb_lowest_priority(data, vertical_separation)?,
            StrategyMask::EXHAUSTED,
        ),
        _ => {
            // No new strategy remains. Carry the batch forward unchanged so
            // the Detector can re-check and, if safe, release.
            info!(%mask, "all mutation cases applied, re-checking collisions");
            (data.to_vec(), mask)
        }
    };

    meta.origin = Origin::System;
    meta.mutation_cases = Some(next_mask);
    Ok((mutated, meta))
}

/// The flagged aircraft with the greatest id, i.e. the one that absorbs the
/// maneuver.
fn lowest_priority(data: &[Trajectory]) -> Option<&Trajectory> {
    data.iter()
        .filter(|t| t.in_conflict())
        .max_by(|a, b| a.uav_id.cmp(&b.uav_id))
}

fn flagged_count(data: &[Trajectory]) -> usize {
    data.iter().filter(|t| t.in_conflict()).count()
}

/// Rebuild the batch with `mutate` applied to the selected aircraft and the
/// conflict flag cleared from everything that carried it.
fn apply_to_target(
    data: &[Trajectory],
    target: &UavId,
    mutate: impl Fn(&Trajectory) -> Trajectory,
) -> Vec<Trajectory> {
    data.iter()
        .map(|t| {
            let t = if &t.uav_id == target { mutate(t) } else { t.clone() };
            if t.in_conflict() {
                t.cleared()
            } else {
                t
            }
        })
        .collect()
}

/// Case `000`: reduce the lowest-priority collider's speed by 25%.
fn reduce_speed_of_lowest_priority(data: &[Trajectory]) -> Result<Vec<Trajectory>, ResolutionError> {
    let flagged = flagged_count(data);
    let target = match lowest_priority(data) {
        Some(t) if flagged > 1 => t.clone(),
        _ => return Err(ResolutionError::NotEnoughConflicts { strategy: "case1", flagged }),
    };
    let reduced = target.speed * 0.75;
    info!(uav_id = %target.uav_id, from = target.speed, to = reduced, "reducing speed of lowest-priority UAV");

    Ok(apply_to_target(data, &target.uav_id, |t| {
        t.with_speed(reduced).stamped_mutated(StrategyMask::REDUCE_SPEED)
    }))
}

/// Case `001`: turn the lowest-priority collider by a random offset bounded
/// by its type's heading authority, random sign, never below `MIN_BEARING`.
fn change_heading_of_lowest_priority<R: Rng>(
    data: &[Trajectory],
    abilities: &AbilityTable,
    rng: &mut R,
) -> Result<Vec<Trajectory>, ResolutionError> {
    let flagged = flagged_count(data);
    let target = match lowest_priority(data) {
        Some(t) if flagged > 1 => t.clone(),
        _ => return Err(ResolutionError::NotEnoughConflicts { strategy: "case2", flagged }),
    };
    if target.uav_type.is_empty() {
        return Err(ResolutionError::UnknownUavType { uav_id: target.uav_id });
    }

    let max_bearing = abilities
        .max_bearing_for(&target.uav_type)
        .unwrap_or(DEFAULT_MAX_BEARING);
    let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
    let change = sign * rng.random_range(0.0..max_bearing).max(MIN_BEARING);
    let heading = target.direction + change;
    info!(uav_id = %target.uav_id, from = target.direction, by = change, "changing heading of lowest-priority UAV");

    Ok(apply_to_target(data, &target.uav_id, |t| {
        t.with_direction(heading).stamped_mutated(StrategyMask::CHANGE_HEADING)
    }))
}

/// Case `011`: step the lowest-priority collider's altitude above the
/// vertical separation. Selection spans *all* currently flagged aircraft,
/// not just the pair that re-triggered — the same global tie-break as the
/// other cases.
fn climb_lowest_priority(
    data: &[Trajectory],
    vertical_separation: f64,
) -> Result<Vec<Trajectory>, ResolutionError> {
    let target = lowest_priority(data).ok_or(ResolutionError::NoConflicts)?.clone();
    let altitude = target.altitude + vertical_separation + ALTITUDE_MARGIN_M;
    info!(uav_id = %target.uav_id, from = target.altitude, to = altitude, "stepping altitude of lowest-priority UAV");

    Ok(apply_to_target(data, &target.uav_id, |t| {
        t.with_altitude(altitude).stamped_mutated(StrategyMask::EXHAUSTED)
    }))
}
