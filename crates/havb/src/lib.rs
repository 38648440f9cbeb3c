// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HAVB - AVB/TSN Stream Connection Management
//!
//! A pure Rust implementation of the IEEE 1722.1 ACMP (AVDECC Connection
//! Management Protocol), covering both the legacy IEEE connection model
//! and the MILAN (AVNU.IO.CONTROL) binding/probing model, for endpoint
//! devices on AVB/TSN networks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use havb::{ConnectionEngine, Entity};
//! use havb::core::descriptors::{StreamInputConfig, StreamOutputConfig};
//! use havb::core::ids::EntityId;
//! use std::time::Instant;
//!
//! # fn host() -> Box<dyn havb::AcmpHost> { unimplemented!() }
//! let mut host = host();
//!
//! // One MILAN entity with a listener sink and a talker source
//! let mut engine = ConnectionEngine::new();
//! engine.add_entity(Entity::new_milan(
//!     EntityId::from_u64(0x0011_22ff_fe33_4455),
//!     vec![StreamInputConfig::default()],
//!     vec![StreamOutputConfig::default()],
//! ))?;
//! engine.start(host.as_mut());
//!
//! // Producers (network rx, SRP/MAAP callbacks, IPC) submit events
//! let handle = engine.handle();
//!
//! // The platform loop drives the engine
//! while engine.is_running() {
//!     engine.poll(host.as_mut(), Instant::now());
//!     // ... wait until engine.next_deadline() or new input ...
//! }
//! # Ok::<(), havb::AcmpError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                        Engine Layer                          |
//! |   ConnectionEngine - event channel, entity map, timer drive  |
//! +--------------------------------------------------------------+
//! |                         Core Layer                           |
//! |   IEEE SMs | MILAN SMs | inflight tracking | entity model    |
//! +--------------------------------------------------------------+
//! |                       Protocol Layer                         |
//! |   AVTP control header | ACMP PDU codec | status/flag tables  |
//! +--------------------------------------------------------------+
//! |                     Platform (AcmpHost)                      |
//! |   raw Ethernet tx | SRP/MAAP stack | IPC | persistence       |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConnectionEngine`] | Event loop core, owns the local entities |
//! | [`Entity`] | One local AVDECC entity (IEEE or MILAN profile) |
//! | [`AcmpHost`] | Platform seam: network, SRP/MAAP, IPC, storage |
//! | [`EngineEvent`] | Any input: frames, discovery, SRP, MAAP, IPC |
//! | [`AcmpError`] | Local faults (protocol rejections are PDU status) |
//!
//! ## Profiles
//!
//! - **IEEE**: controller-mediated CONNECT/DISCONNECT with per-talker
//!   connection counting and optional fast connect on talker discovery.
//! - **MILAN**: listener-driven bind/probe with SRP coupling; talkers
//!   declare streams from MAAP state and probe recency, never counting
//!   listeners.
//!
//! Profiles never mix within an entity; the profile is fixed at
//! [`Entity`] construction.
//!
//! ## See Also
//!
//! - IEEE Std 1722.1-2013, Clause 8 (ACMP)
//! - AVNU Alliance MILAN, AVNU.IO.CONTROL Sec.8.3

/// Wire and timing constants (frame layout, timeouts, pool sizes).
pub mod config;
/// Protocol state machines and the entity/command infrastructure.
pub mod core;
/// Event intake and dispatch loop.
pub mod engine;
/// Error types for local faults.
pub mod error;
/// ACMP wire protocol (header codec, PDU codec, status tables).
pub mod protocol;

pub use crate::core::acmp::ControllerRequest;
pub use crate::core::bridge::{
    AcmpHost, SrClass, StreamConnectParams, StreamDirection, StreamDisconnectParams,
};
pub use crate::core::entity::{Entity, LockState, Profile};
pub use crate::core::ids::{EntityId, MacAddr, PortId, StreamId};
pub use crate::core::inflight::ReplyRoute;
pub use crate::engine::{ConnectionEngine, EngineEvent, EngineHandle};
pub use crate::error::{AcmpError, AcmpResult};
pub use crate::protocol::{AcmpStatus, MessageType};
