// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Core Connection Management
//!
//! Protocol state machines and the infrastructure they run on.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `acmp` | Frame dispatch, command tracking, controller role |
//! | `bridge` | [`bridge::AcmpHost`] trait: the platform seam |
//! | `descriptors` | Static stream configuration and binding parameters |
//! | `entity` | Local entity: id, profile, lock, command context |
//! | `ids` | EUI-64 / stream id / MAC newtypes |
//! | `ieee` | Legacy IEEE 1722.1 listener and talker machines |
//! | `inflight` | Retransmit tracking for issued commands |
//! | `milan` | MILAN binding, probing and SRP coupling machines |
//! | `timers` | Per-stream software timers |
//!
//! Everything here is synchronous and single-threaded by construction;
//! the [`crate::engine`] serializes events onto these machines.

/// Frame dispatch and the shared send/track/respond primitives.
pub mod acmp;
/// Host platform trait (network, SRP/MAAP stack, IPC, persistence).
pub mod bridge;
/// Stream descriptors and binding parameter records.
pub mod descriptors;
/// Local entity model (profile, lock state, sequence ids).
pub mod entity;
/// Identifier newtypes shared across the crate.
pub mod ids;
/// IEEE 1722.1 legacy connection state machines (Sec.8.2.2.5-6).
pub mod ieee;
/// In-flight command tracker.
pub mod inflight;
/// MILAN stream binding machines (AVNU.IO.CONTROL Sec.8.3).
pub mod milan;
/// Monotonic software timers for listener sinks and talker sources.
pub mod timers;
