// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Trajectory Domain Model
//!
//! One aircraft's kinematic snapshot plus the transient resolution
//! bookkeeping that rides along while a batch moves through the pipeline.
//!
//! # Design Principles
//!
//! 1. **Immutability:** a `Trajectory` is a value. Strategies produce a new
//!    record for the same `UavId`, never an in-place mutation of shared state.
//! 2. **Identity:** `UavId` is the only stable identity; a later snapshot with
//!    the same id supersedes an earlier one (last write wins).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::envelope::StrategyMask;

/// Unique aircraft identifier.
///
/// Ordering is the pipeline's priority tie-break: the *greatest* id among a
/// set of conflicting aircraft is the lowest-priority one and absorbs the
/// maneuver.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UavId(String);

impl UavId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UavId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provenance tag describing *why* a batch (or a single trajectory) is moving
/// through the pipeline — not who sent it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// A fresh external report from the aircraft itself.
    SelfReport,
    /// Produced by the pipeline during a resolution cycle.
    System,
    /// This specific trajectory was changed by a mitigation strategy.
    Mutate,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::SelfReport => write!(f, "self_report"),
            Origin::System => write!(f, "system"),
            Origin::Mutate => write!(f, "mutate"),
        }
    }
}

/// One aircraft's kinematic snapshot.
///
/// Units: `latitude`/`longitude` in degrees, `altitude` in meters, `speed`
/// horizontal in km/h, `direction` in degrees (0 = north, clockwise),
/// `vertical_speed` in m/s.
///
/// `collision`, `origin`, and `mutation_cases` are transient processing
/// fields: the conflict flag is set by the Detector and consumed by the
/// Resolver; the per-aircraft mask records which strategies have already been
/// applied to *this* aircraft, independent of the batch-level mask in `Meta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub uav_id: UavId,
    pub uav_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f64,
    pub direction: f64,
    pub vertical_speed: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_cases: Option<StrategyMask>,
}

impl Trajectory {
    pub fn new(
        uav_id: impl Into<String>,
        uav_type: impl Into<String>,
        latitude: f64,
        longitude: f64,
        altitude: f64,
        speed: f64,
        direction: f64,
        vertical_speed: f64,
    ) -> Self {
        Self {
            uav_id: UavId::new(uav_id),
            uav_type: uav_type.into(),
            latitude,
            longitude,
            altitude,
            speed,
            direction,
            vertical_speed,
            collision: None,
            origin: None,
            mutation_cases: None,
        }
    }

    /// Whether the Detector has flagged this trajectory as conflicting.
    pub fn in_conflict(&self) -> bool {
        self.collision.unwrap_or(false)
    }

    /// New value with the conflict flag set.
    pub fn flagged(&self) -> Self {
        Self {
            collision: Some(true),
            ..self.clone()
        }
    }

    /// New value with the conflict flag removed (consumed by the Resolver).
    pub fn cleared(&self) -> Self {
        Self {
            collision: None,
            ..self.clone()
        }
    }

    /// New value with a changed horizontal speed (km/h).
    pub fn with_speed(&self, speed: f64) -> Self {
        Self {
            speed,
            ..self.clone()
        }
    }

    /// New value with a changed heading, normalized to [0, 360).
    pub fn with_direction(&self, direction: f64) -> Self {
        Self {
            direction: direction.rem_euclid(360.0),
            ..self.clone()
        }
    }

    /// New value with a changed altitude (meters).
    pub fn with_altitude(&self, altitude: f64) -> Self {
        Self {
            altitude,
            ..self.clone()
        }
    }

    /// New value stamped as mutated, with the given strategy bit OR-ed into
    /// the aircraft's own accumulated mask.
    pub fn stamped_mutated(&self, bit: StrategyMask) -> Self {
        let mask = self.mutation_cases.unwrap_or_default().union(bit);
        Self {
            origin: Some(Origin::Mutate),
            mutation_cases: Some(mask),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_helpers_do_not_alias() {
        let a = Trajectory::new("uav-1", "quad", 0.0, 0.0, 1000.0, 50.0, 90.0, 0.0);
        let b = a.with_speed(37.5);
        assert_eq!(a.speed, 50.0);
        assert_eq!(b.speed, 37.5);
        assert_eq!(a.uav_id, b.uav_id);
    }

    #[test]
    fn direction_is_normalized() {
        let a = Trajectory::new("uav-1", "quad", 0.0, 0.0, 1000.0, 50.0, 350.0, 0.0);
        assert_eq!(a.with_direction(372.0).direction, 12.0);
        assert_eq!(a.with_direction(-10.0).direction, 350.0);
    }

    #[test]
    fn stamping_accumulates_local_mask() {
        let a = Trajectory::new("uav-1", "quad", 0.0, 0.0, 1000.0, 50.0, 0.0, 0.0);
        let b = a.stamped_mutated(StrategyMask::REDUCE_SPEED);
        let c = b.stamped_mutated(StrategyMask::CHANGE_HEADING);
        assert_eq!(b.origin, Some(Origin::Mutate));
        assert_eq!(c.mutation_cases.unwrap().bits(), 0b011);
    }

    #[test]
    fn id_ordering_backs_priority_tiebreak() {
        assert!(UavId::new("uav-9") > UavId::new("uav-2"));
    }

    #[test]
    fn transient_fields_stay_off_the_wire_when_absent() {
        let a = Trajectory::new("uav-1", "quad", 0.0, 0.0, 1000.0, 50.0, 0.0, 0.0);
        let json = serde_json::to_value(&a).unwrap();
        assert!(json.get("collision").is_none());
        assert!(json.get("origin").is_none());
    }
}
