// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Message Envelope
//!
//! The shared wire contract between stages: `{"data": [...], "meta": {...}}`.
//! Every stage recovers the full protocol state from this payload alone — no
//! in-memory session exists anywhere in the pipeline.
//!
//! The strategy mask is a typed 3-bit integer internally and is marshalled as
//! a zero-padded binary string (`"000"`..`"111"`) only at the boundary.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use crate::domain::trajectory::{Origin, Trajectory};

/// 3-bit record of which mitigation strategies have been tried for the
/// current conflict instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StrategyMask(u8);

impl StrategyMask {
    pub const REDUCE_SPEED: StrategyMask = StrategyMask(0b001);
    pub const CHANGE_HEADING: StrategyMask = StrategyMask(0b010);
    pub const CLIMB_ALTITUDE: StrategyMask = StrategyMask(0b100);
    pub const EXHAUSTED: StrategyMask = StrategyMask(0b111);

    /// Build from raw bits; anything above 3 bits is rejected.
    pub fn from_bits(bits: u8) -> Result<Self, ProtocolError> {
        if bits > 0b111 {
            return Err(ProtocolError::InvalidMask(format!("{bits:#05b}")));
        }
        Ok(Self(bits))
    }

    /// Parse the wire form, a zero-padded 3-character binary string.
    pub fn parse(s: &str) -> Result<Self, ProtocolError> {
        if s.len() != 3 {
            return Err(ProtocolError::InvalidMask(s.to_string()));
        }
        let bits =
            u8::from_str_radix(s, 2).map_err(|_| ProtocolError::InvalidMask(s.to_string()))?;
        Self::from_bits(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn union(self, other: StrategyMask) -> StrategyMask {
        StrategyMask(self.0 | other.0)
    }
}

impl fmt::Display for StrategyMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03b}", self.0)
    }
}

impl Serialize for StrategyMask {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for StrategyMask {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        StrategyMask::parse(&s).map_err(D::Error::custom)
    }
}

/// Batch-level protocol metadata attached to every message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Why this batch is moving through the pipeline.
    pub origin: Origin,

    /// How many times this lineage has been mutated. Present only once the
    /// chain has begun escalating; the sole loop-termination guard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutations: Option<u32>,

    /// Which strategies have been tried for the current conflict instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_cases: Option<StrategyMask>,

    /// Correlation token, generated once per externally triggered cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Stamped by the report ingester; carried opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingest_timestamp: Option<String>,
}

impl Meta {
    pub fn new(origin: Origin) -> Self {
        Self {
            origin,
            mutations: None,
            mutation_cases: None,
            request_id: None,
            ingest_timestamp: None,
        }
    }
}

/// The message moved between stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub data: Vec<Trajectory>,
    pub meta: Meta,
}

impl Envelope {
    pub fn new(data: Vec<Trajectory>, meta: Meta) -> Self {
        Self { data, meta }
    }
}

/// Protocol violations: malformed envelopes and origin combinations no stage
/// may accept. Always terminal for the current cycle, never a crash.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unexpected origin `{origin}` at stage {stage}")]
    UnexpectedOrigin { stage: &'static str, origin: Origin },

    #[error("unexpected origin/mutations combination: origin `{origin}`, mutations {mutations:?}")]
    InvalidEscalation {
        origin: Origin,
        mutations: Option<u32>,
    },

    #[error("trajectory mutated more than {ceiling} times, abandoning lineage")]
    CeilingExceeded { ceiling: u32 },

    #[error("invalid mutation_cases mask `{0}`")]
    InvalidMask(String),
}
