// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0
//! # Application Layer — the five pipeline stages
//!
//! Each stage is a stateless function of one envelope plus exactly one
//! side-effecting action. Control flows in a cycle with no central
//! coordinator:
//!
//! ```text
//! external report -> Update -> Trigger -> Detect
//!     Detect -(conflict)-> Mutate -> Detect ... -> Release -> Update (terminal)
//!     Detect -(safe, system)-> Release
//!     Detect -(safe, self_report)-> stop
//! ```
//!
//! All inter-stage hops are fire-and-forget: a stage only ever sees the next
//! hop's "accepted" acknowledgement, never its business result.

pub mod activator;
pub mod detector;
pub mod dispatch;
pub mod persister;
pub mod releaser;
pub mod resolver;

pub use activator::ActivatorService;
pub use detector::DetectorService;
pub use dispatch::{ReleasePublisher, StageClient};
pub use persister::PersisterService;
pub use releaser::ReleaserService;
pub use resolver::ResolverService;

#[cfg(test)]
pub(crate) mod testing;
