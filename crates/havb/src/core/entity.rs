// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! AVDECC entity: profile selection, lock state, ACMP context and the
//! per-profile stream state arrays.
//!
//! The profile is fixed at construction. Per-stream arrays are sized from
//! the configuration handed in and never resized afterwards.

use std::time::{Duration, Instant};

use crate::config;
use crate::core::bridge::AcmpHost;
use crate::core::descriptors::{StreamInputConfig, StreamOutputConfig};
use crate::core::ids::EntityId;
use crate::core::ieee::IeeeEntityState;
use crate::core::inflight::InflightTable;
use crate::core::milan::MilanEntityState;
use crate::protocol::MessageType;

/// Connection-management profile of an entity, resolved once at
/// configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Ieee,
    Milan,
}

impl Profile {
    /// Per-command inflight timeout (IEEE 1722.1 Table 8.4; MILAN uses a
    /// flat timeout for every command).
    #[must_use]
    pub fn command_timeout(self, msg_type: MessageType) -> Duration {
        let ms = match self {
            Self::Milan => config::MILAN_TMO_FLAT_MS,
            Self::Ieee => match msg_type {
                MessageType::ConnectTxCommand => config::IEEE_TMO_CONNECT_TX_MS,
                MessageType::DisconnectTxCommand => config::IEEE_TMO_DISCONNECT_TX_MS,
                MessageType::GetTxStateCommand => config::IEEE_TMO_GET_TX_STATE_MS,
                MessageType::ConnectRxCommand => config::IEEE_TMO_CONNECT_RX_MS,
                MessageType::DisconnectRxCommand => config::IEEE_TMO_DISCONNECT_RX_MS,
                MessageType::GetRxStateCommand => config::IEEE_TMO_GET_RX_STATE_MS,
                MessageType::GetTxConnectionCommand => config::IEEE_TMO_GET_TX_CONNECTION_MS,
                // responses are never tracked; keep the shortest timeout
                _ => config::IEEE_TMO_GET_RX_STATE_MS,
            },
        };
        Duration::from_millis(ms)
    }

    /// Profile-aware message type name for log output.
    #[must_use]
    pub fn message_type_name(self, msg_type: MessageType) -> &'static str {
        match self {
            Self::Ieee => msg_type.ieee_name(),
            Self::Milan => msg_type.milan_name(),
        }
    }
}

/// AECP lock state of the entity. A lock held by one controller rejects
/// connection commands from every other controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Unlocked,
    LockedBy(EntityId),
}

/// ACMP bookkeeping owned by one entity: the wire sequence counter and the
/// in-flight command arena.
#[derive(Debug)]
pub struct AcmpContext {
    sequence_id: u16,
    pub inflight: InflightTable,
}

impl AcmpContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sequence_id: 0,
            inflight: InflightTable::new(config::INFLIGHT_SLOTS),
        }
    }

    /// Claim the next wire sequence id (wraps at 16 bits).
    pub fn next_sequence_id(&mut self) -> u16 {
        let id = self.sequence_id;
        self.sequence_id = self.sequence_id.wrapping_add(1);
        id
    }
}

impl Default for AcmpContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The per-profile dynamic state arrays. Exactly one variant exists per
/// entity; there is no shared layout between the two profiles.
#[derive(Debug)]
pub enum ProfileState {
    Ieee(IeeeEntityState),
    Milan(MilanEntityState),
}

/// One AVDECC-addressable device.
#[derive(Debug)]
pub struct Entity {
    pub id: EntityId,
    pub lock: LockState,
    pub acmp: AcmpContext,
    pub profile: ProfileState,
}

impl Entity {
    /// Build an IEEE-profile entity with the given stream configurations.
    #[must_use]
    pub fn new_ieee(
        id: EntityId,
        listeners: Vec<StreamInputConfig>,
        talkers: Vec<StreamOutputConfig>,
    ) -> Self {
        Self {
            id,
            lock: LockState::Unlocked,
            acmp: AcmpContext::new(),
            profile: ProfileState::Ieee(IeeeEntityState::new(listeners, talkers)),
        }
    }

    /// Build a MILAN-profile entity with the given stream configurations.
    #[must_use]
    pub fn new_milan(
        id: EntityId,
        listeners: Vec<StreamInputConfig>,
        talkers: Vec<StreamOutputConfig>,
    ) -> Self {
        Self {
            id,
            lock: LockState::Unlocked,
            acmp: AcmpContext::new(),
            profile: ProfileState::Milan(MilanEntityState::new(listeners, talkers)),
        }
    }

    #[must_use]
    pub fn profile_kind(&self) -> Profile {
        match self.profile {
            ProfileState::Ieee(_) => Profile::Ieee,
            ProfileState::Milan(_) => Profile::Milan,
        }
    }

    /// True when `controller` may not issue connection commands because a
    /// different controller holds the lock.
    #[must_use]
    pub fn is_locked_against(&self, controller: EntityId) -> bool {
        match self.lock {
            LockState::Unlocked => false,
            LockState::LockedBy(owner) => owner != controller,
        }
    }

    /// Startup effects: MILAN talkers claim their MAAP ranges.
    pub fn start(&mut self, host: &mut dyn AcmpHost) {
        if let ProfileState::Milan(milan) = &mut self.profile {
            milan.start(self.id, host);
        }
    }

    /// Teardown: stop timers, cancel in-flight commands (failing any
    /// waiting IPC clients), disconnect settled/connected streams and
    /// release MAAP ranges.
    pub fn shutdown(&mut self, host: &mut dyn AcmpHost, now: Instant) {
        for entry in self.acmp.inflight.drain() {
            if let Some(route) = entry.reply_route {
                host.ipc_response(
                    route,
                    entry.msg_type.response(),
                    crate::protocol::AcmpStatus::ListenerTalkerTimeout,
                    &entry.pdu,
                );
            }
        }
        match &mut self.profile {
            ProfileState::Ieee(ieee) => ieee.shutdown(self.id, host),
            ProfileState::Milan(milan) => milan.shutdown(self.id, host, now),
        }
    }
}
