// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Geometry & Prediction
//!
//! Spherical-Earth helpers (mean radius 6371 km) for near-future position
//! prediction and pairwise separation checks. Bearings follow the aviation
//! convention: 0° = north, 90° = east, measured clockwise.

use crate::domain::trajectory::Trajectory;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A predicted point on an aircraft's future path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictedPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters.
    pub altitude: f64,
}

/// Great-circle distance between two coordinates, in kilometers.
///
/// Standard haversine formula. Always >= 0; 0 iff the coordinates coincide
/// (modulo floating tolerance), and numerically stable near antipodal points.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Great-circle destination point: start coordinate projected `distance_km`
/// along `bearing_deg` (0 = north, clockwise) on a spherical Earth.
fn destination_point(lat: f64, lon: f64, bearing_deg: f64, distance_km: f64) -> (f64, f64) {
    let delta = distance_km / EARTH_RADIUS_KM;
    let theta = bearing_deg.to_radians();
    let phi1 = lat.to_radians();
    let lambda1 = lon.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    (phi2.to_degrees(), lambda2.to_degrees())
}

/// Predict `steps` future positions at `time_interval`-second spacing.
///
/// Step 0 is the current position. Horizontal motion follows the current
/// heading and speed (km/h) along a great circle; altitude advances linearly
/// by vertical speed (m/s) times elapsed time.
pub fn predict_future_positions(
    aircraft: &Trajectory,
    time_interval: f64,
    steps: usize,
) -> Vec<PredictedPosition> {
    let speed_kms = aircraft.speed / 3600.0;
    (0..steps)
        .map(|step| {
            let elapsed = step as f64 * time_interval;
            let (latitude, longitude) = destination_point(
                aircraft.latitude,
                aircraft.longitude,
                aircraft.direction,
                speed_kms * elapsed,
            );
            PredictedPosition {
                latitude,
                longitude,
                altitude: aircraft.altitude + aircraft.vertical_speed * elapsed,
            }
        })
        .collect()
}

/// Whether two predicted paths violate separation at any matched time step.
///
/// A conflict requires horizontal distance < `horizontal_separation` (km)
/// **and** vertical distance < `vertical_separation` (m) at the *same* step —
/// two independent violations, not a 3-D distance threshold. Short-circuits
/// on the first violating step. Sequences are zipped, so callers must pass
/// equal step counts.
pub fn check_for_conflict(
    positions1: &[PredictedPosition],
    positions2: &[PredictedPosition],
    horizontal_separation: f64,
    vertical_separation: f64,
) -> bool {
    positions1.iter().zip(positions2.iter()).any(|(p1, p2)| {
        let horizontal = haversine(p1.latitude, p1.longitude, p2.latitude, p2.longitude);
        let vertical = (p1.altitude - p2.altitude).abs();
        horizontal < horizontal_separation && vertical < vertical_separation
    })
}

/// Detect conflicts over every unordered pair (i < j) in the batch.
///
/// Returns the aggregate result and the batch with both members of each
/// conflicting pair flagged. On the first conflicting partner for aircraft
/// `i`, the inner scan breaks: an aircraft found in one conflict is not
/// re-tested against later partners in the same outer iteration, though a
/// later outer iteration may still flag it as the inner element. Kept
/// deliberately — downstream strategy selection depends on this flagging
/// pattern.
pub fn detect_collisions(
    aircraft_list: &[Trajectory],
    time_interval: f64,
    steps: usize,
    horizontal_separation: f64,
    vertical_separation: f64,
) -> (bool, Vec<Trajectory>) {
    let mut flagged: Vec<Trajectory> = aircraft_list.to_vec();
    let mut collision = false;

    for i in 0..flagged.len() {
        let positions1 = predict_future_positions(&flagged[i], time_interval, steps);
        for j in (i + 1)..flagged.len() {
            let positions2 = predict_future_positions(&flagged[j], time_interval, steps);
            if check_for_conflict(
                &positions1,
                &positions2,
                horizontal_separation,
                vertical_separation,
            ) {
                collision = true;
                flagged[i] = flagged[i].flagged();
                flagged[j] = flagged[j].flagged();
                break;
            }
        }
    }

    (collision, flagged)
}
