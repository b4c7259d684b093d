// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0
//! # Veer Pipeline Core
//!
//! Domain logic, stage services, and infrastructure adapters for the Veer
//! UAV trajectory deconfliction pipeline.
//!
//! # Architecture
//!
//! - **domain** — trajectories, the message envelope, geometry, and the
//!   resolution state machine. Pure, transport-independent.
//! - **application** — the five pipeline stages (Detect, Mutate, Release,
//!   Update, Trigger), each a stateless function of one envelope.
//! - **infrastructure** — PostgreSQL/in-memory repositories, the HTTP
//!   stage client, and the MQTT publisher/ingester.
//! - **presentation** — the axum API exposing one endpoint per stage.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
