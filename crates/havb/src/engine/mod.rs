// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection management engine: event intake and dispatch loop.
//!
//! Every input to the protocol machines arrives as one [`EngineEvent`] on
//! a crossbeam channel: received Ethernet frames, ADP discovery edges,
//! SRP and MAAP indications from the platform stack, and controller
//! requests from local IPC clients. The engine drains the channel onto
//! the per-entity state machines, then services their timers; all state
//! machine code runs on the draining thread.
//!
//! # Architecture
//!
//! ```text
//! network rx ---\
//! ADP/SRP/MAAP --+--> EngineHandle.submit() -> channel
//! IPC clients ---/                               |
//!                                                v
//!                    ConnectionEngine.poll() -> dispatch -> Entity SMs
//!                                                |            |
//!                                                v            v
//!                                        service timers    AcmpHost
//! ```
//!
//! The engine does not own a thread; the embedding platform calls
//! [`ConnectionEngine::poll`] from its own loop (or blocks in
//! [`ConnectionEngine::run`]) with its [`AcmpHost`] implementation.

use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::core::acmp::{self, ControllerRequest};
use crate::core::bridge::AcmpHost;
use crate::core::descriptors::BindingParams;
use crate::core::entity::{Entity, ProfileState};
use crate::core::ids::{EntityId, MacAddr, PortId};
use crate::core::inflight::ReplyRoute;
use crate::core::milan::{self, ListenerEvent, SrpListenerStatus, SrpStreamStatus, TalkerDeclaration};
use crate::core::{ieee, milan::MilanEntityState};
use crate::error::{AcmpError, AcmpResult};
use crate::protocol::pdu::{self, AcmpFrame};
use crate::protocol::Role;

/// Default event channel depth; senders get backpressure beyond this.
pub const EVENT_QUEUE_DEPTH: usize = 256;

/// One input to the connection engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A received Ethernet frame (AVTP EtherType, already demuxed).
    Frame { port: PortId, data: Vec<u8> },
    /// ADP discovered (or re-advertised) a remote talker entity.
    TalkerAvailable { talker_id: EntityId, port: PortId },
    /// ADP lost a remote talker entity.
    TalkerDeparted { talker_id: EntityId },
    /// SRP talker attribute status at a listener port.
    ListenerSrpStatus {
        entity_id: EntityId,
        stream_index: u16,
        status: SrpStreamStatus,
        stream_id: crate::core::ids::StreamId,
        dest_mac: MacAddr,
        vlan_id: u16,
    },
    /// Local SRP layer declared (or failed to declare) a talker stream.
    TalkerSrpDeclaration {
        entity_id: EntityId,
        stream_index: u16,
        declaration: TalkerDeclaration,
    },
    /// SRP listener attribute registration at a talker port.
    TalkerSrpStatus {
        entity_id: EntityId,
        stream_index: u16,
        status: SrpListenerStatus,
    },
    /// MAAP acquired (or defended) a destination address range.
    MaapValid {
        entity_id: EntityId,
        port: PortId,
        range_id: u32,
        base: MacAddr,
    },
    /// MAAP lost a destination address range.
    MaapConflict {
        entity_id: EntityId,
        port: PortId,
        range_id: u32,
    },
    /// Binding parameters restored from persistent storage (MILAN) at
    /// startup.
    SavedBinding {
        entity_id: EntityId,
        stream_index: u16,
        params: BindingParams,
    },
    /// Fast-connect restore for an IEEE listener sink.
    FastConnect {
        entity_id: EntityId,
        stream_index: u16,
        talker_id: Option<EntityId>,
        talker_unique_id: u16,
        back_to_back: bool,
    },
    /// A connection-management request from a local IPC client.
    Controller {
        entity_id: EntityId,
        request: ControllerRequest,
        route: ReplyRoute,
    },
    /// Stop the engine loop; entities are shut down cleanly.
    Shutdown,
}

/// Cloneable submission side of the engine channel.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: Sender<EngineEvent>,
}

impl EngineHandle {
    /// Queue an event; fails when the engine stopped or the queue is full.
    pub fn submit(&self, event: EngineEvent) -> AcmpResult<()> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(AcmpError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(AcmpError::EngineStopped),
        }
    }
}

/// The connection management engine: owns the local entities and the
/// event channel feeding them.
pub struct ConnectionEngine {
    entities: Vec<Entity>,
    rx: Receiver<EngineEvent>,
    tx: Sender<EngineEvent>,
    running: bool,
}

impl Default for ConnectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::with_queue_depth(EVENT_QUEUE_DEPTH)
    }

    #[must_use]
    pub fn with_queue_depth(depth: usize) -> Self {
        let (tx, rx) = bounded(depth);
        Self {
            entities: Vec::new(),
            rx,
            tx,
            running: false,
        }
    }

    /// Submission handle for producers (network rx, stack callbacks, IPC).
    #[must_use]
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            tx: self.tx.clone(),
        }
    }

    /// Register a local entity. Ids must be unique.
    pub fn add_entity(&mut self, entity: Entity) -> AcmpResult<()> {
        if self.entities.iter().any(|e| e.id == entity.id) {
            return Err(AcmpError::DuplicateEntity(entity.id));
        }
        log::info!(
            "[ConnectionEngine::add_entity] {} profile {:?}",
            entity.id,
            entity.profile_kind()
        );
        self.entities.push(entity);
        Ok(())
    }

    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    /// Run startup effects for every entity (stream id assignment, MAAP
    /// range claims) and mark the engine running.
    pub fn start(&mut self, host: &mut dyn AcmpHost) {
        for entity in &mut self.entities {
            entity.start(host);
        }
        self.running = true;
        log::info!(
            "[ConnectionEngine::start] {} entities",
            self.entities.len()
        );
    }

    /// True until a [`EngineEvent::Shutdown`] is processed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Drain every queued event, then service timers and retransmits.
    ///
    /// Returns the number of events processed. The caller decides how to
    /// wait between polls; [`Self::next_deadline`] bounds the sleep.
    pub fn poll(&mut self, host: &mut dyn AcmpHost, now: Instant) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(host, event, now);
            processed += 1;
            if !self.running {
                return processed;
            }
        }
        self.tick(host, now);
        processed
    }

    /// Block on the channel until shutdown, waking for timer deadlines.
    ///
    /// Convenience loop for platforms that dedicate a thread to the
    /// engine; everything it does is also reachable through
    /// [`Self::poll`].
    pub fn run(&mut self, host: &mut dyn AcmpHost) {
        while self.running {
            let now = Instant::now();
            self.tick(host, now);
            let wait = self
                .next_deadline()
                .map(|d| d.saturating_duration_since(now))
                .unwrap_or_else(|| Duration::from_millis(crate::config::ENGINE_IDLE_WAIT_MS));
            match self.rx.recv_timeout(wait) {
                Ok(event) => self.handle_event(host, event, Instant::now()),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log::warn!("[ConnectionEngine::run] all handles dropped, stopping");
                    self.shutdown(host, Instant::now());
                }
            }
        }
    }

    /// Service timer expiry and command retransmission for every entity.
    pub fn tick(&mut self, host: &mut dyn AcmpHost, now: Instant) {
        for entity in &mut self.entities {
            acmp::service_inflight(entity, host, now);
            let Entity {
                id,
                acmp,
                profile: state,
                ..
            } = entity;
            if let ProfileState::Milan(milan) = state {
                milan::service_timers(milan, acmp, *id, host, now);
            }
        }
    }

    /// Earliest pending deadline over all entities, for the caller's
    /// sleep.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entities
            .iter()
            .filter_map(|e| {
                let inflight = e.acmp.inflight.next_deadline();
                let timers = match &e.profile {
                    ProfileState::Milan(milan) => milan.next_deadline(),
                    ProfileState::Ieee(_) => None,
                };
                inflight.into_iter().chain(timers).min()
            })
            .min()
    }

    /// Tear down every entity: pending commands answered with a timeout,
    /// settled streams disconnected, MAAP ranges released.
    pub fn shutdown(&mut self, host: &mut dyn AcmpHost, now: Instant) {
        if !self.running && self.entities.iter().all(|e| e.acmp.inflight.active() == 0) {
            return;
        }
        log::info!("[ConnectionEngine::shutdown] stopping");
        for entity in &mut self.entities {
            entity.shutdown(host, now);
        }
        self.running = false;
    }

    fn handle_event(&mut self, host: &mut dyn AcmpHost, event: EngineEvent, now: Instant) {
        match event {
            EngineEvent::Frame { port, data } => self.handle_frame(host, port, &data, now),
            EngineEvent::TalkerAvailable { talker_id, port } => {
                for entity in &mut self.entities {
                    let Entity {
                        id,
                        acmp,
                        profile: state,
                        ..
                    } = entity;
                    match state {
                        ProfileState::Ieee(ieee) => {
                            ieee::talker_discovered(ieee, acmp, *id, host, talker_id, port, now);
                        }
                        ProfileState::Milan(milan) => {
                            milan_discovery_edge(milan, acmp, *id, host, talker_id, true, now);
                        }
                    }
                }
            }
            EngineEvent::TalkerDeparted { talker_id } => {
                for entity in &mut self.entities {
                    let Entity {
                        id,
                        acmp,
                        profile: state,
                        ..
                    } = entity;
                    match state {
                        ProfileState::Ieee(ieee) => {
                            ieee::talker_departed(ieee, *id, host, talker_id);
                        }
                        ProfileState::Milan(milan) => {
                            milan_discovery_edge(milan, acmp, *id, host, talker_id, false, now);
                        }
                    }
                }
            }
            EngineEvent::ListenerSrpStatus {
                entity_id,
                stream_index,
                status,
                stream_id,
                dest_mac,
                vlan_id,
            } => {
                if let Some((id, acmp, milan)) = self.milan_entity(entity_id, "ListenerSrpStatus") {
                    milan::listener_srp_status(
                        milan,
                        acmp,
                        id,
                        host,
                        stream_index,
                        status,
                        stream_id,
                        dest_mac,
                        vlan_id,
                        now,
                    );
                }
            }
            EngineEvent::TalkerSrpDeclaration {
                entity_id,
                stream_index,
                declaration,
            } => {
                if let Some((_, _, milan)) = self.milan_entity(entity_id, "TalkerSrpDeclaration") {
                    milan::talker_declaration(milan, stream_index, declaration, now);
                }
            }
            EngineEvent::TalkerSrpStatus {
                entity_id,
                stream_index,
                status,
            } => {
                if let Some((id, _, milan)) = self.milan_entity(entity_id, "TalkerSrpStatus") {
                    milan::talker_srp_status(milan, id, host, stream_index, status, now);
                }
            }
            EngineEvent::MaapValid {
                entity_id,
                port,
                range_id,
                base,
            } => {
                if let Some((id, _, milan)) = self.milan_entity(entity_id, "MaapValid") {
                    milan::maap_valid(milan, id, host, port, range_id, base, now);
                }
            }
            EngineEvent::MaapConflict {
                entity_id,
                port,
                range_id,
            } => {
                if let Some((id, _, milan)) = self.milan_entity(entity_id, "MaapConflict") {
                    milan::maap_conflict(milan, id, host, port, range_id, now);
                }
            }
            EngineEvent::SavedBinding {
                entity_id,
                stream_index,
                params,
            } => {
                if let Some((id, acmp, milan)) = self.milan_entity(entity_id, "SavedBinding") {
                    milan::listener_saved_binding(
                        milan,
                        acmp,
                        id,
                        host,
                        stream_index,
                        params,
                        now,
                    );
                }
            }
            EngineEvent::FastConnect {
                entity_id,
                stream_index,
                talker_id,
                talker_unique_id,
                back_to_back,
            } => match self.entity_mut(entity_id) {
                Some(Entity {
                    profile: ProfileState::Ieee(ieee),
                    ..
                }) => {
                    ieee.enable_fast_connect(stream_index, talker_unique_id, talker_id, back_to_back);
                }
                Some(_) => {
                    log::warn!(
                        "[ConnectionEngine::handle_event] FastConnect: {} is not an IEEE entity",
                        entity_id
                    );
                }
                None => {
                    log::warn!(
                        "[ConnectionEngine::handle_event] FastConnect: no entity {}",
                        entity_id
                    );
                }
            },
            EngineEvent::Controller {
                entity_id,
                request,
                route,
            } => {
                let Some(entity) = self.entities.iter_mut().find(|e| e.id == entity_id) else {
                    log::warn!(
                        "[ConnectionEngine::handle_event] Controller: no entity {}",
                        entity_id
                    );
                    return;
                };
                if let Err(e) = acmp::controller_command(entity, host, &request, route, now) {
                    log::warn!(
                        "[ConnectionEngine::handle_event] controller command rejected: {}",
                        e
                    );
                    host.ipc_response(
                        route,
                        request.msg_type.response(),
                        crate::protocol::AcmpStatus::NotSupported,
                        &pdu::AcmpPdu::default(),
                    );
                }
            }
            EngineEvent::Shutdown => self.shutdown(host, now),
        }
    }

    /// Parse an Ethernet frame and hand it to the entity it addresses.
    ///
    /// The addressed entity depends on the message type: commands toward
    /// a listener match `listener_entity_id`, commands toward a talker
    /// match `talker_entity_id`, and responses to controller queries
    /// match `controller_entity_id`. Frames for entities we do not host
    /// are normal on a shared medium and are dropped silently.
    fn handle_frame(&mut self, host: &mut dyn AcmpHost, port: PortId, data: &[u8], now: Instant) {
        let frame = match pdu::parse_frame(data) {
            Ok(f) => f,
            Err(e) => {
                log::debug!("[ConnectionEngine::handle_frame] unparseable frame: {}", e);
                return;
            }
        };
        let target = target_entity_id(&frame);
        let Some(entity) = self.entities.iter_mut().find(|e| e.id == target) else {
            return;
        };
        acmp::dispatch(entity, host, &frame, port, now);
    }

    fn milan_entity(
        &mut self,
        entity_id: EntityId,
        what: &str,
    ) -> Option<(EntityId, &mut crate::core::entity::AcmpContext, &mut MilanEntityState)> {
        match self.entities.iter_mut().find(|e| e.id == entity_id) {
            Some(Entity {
                id,
                acmp,
                profile: ProfileState::Milan(milan),
                ..
            }) => Some((*id, acmp, milan)),
            Some(_) => {
                log::warn!(
                    "[ConnectionEngine::milan_entity] {}: {} is not a MILAN entity",
                    what,
                    entity_id
                );
                None
            }
            None => {
                log::warn!(
                    "[ConnectionEngine::milan_entity] {}: no entity {}",
                    what,
                    entity_id
                );
                None
            }
        }
    }
}

/// Entity id a received frame is addressed to, per message type role.
fn target_entity_id(frame: &AcmpFrame) -> EntityId {
    match frame.message_type.role() {
        Role::Listener => frame.pdu.listener_entity_id,
        Role::Talker => frame.pdu.talker_entity_id,
        Role::Controller => frame.pdu.controller_entity_id,
    }
}

/// Feed an ADP discovery edge into every MILAN sink bound to the talker.
fn milan_discovery_edge(
    milan: &mut MilanEntityState,
    acmp: &mut crate::core::entity::AcmpContext,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    talker_id: EntityId,
    available: bool,
    now: Instant,
) {
    let indices: Vec<u16> = milan
        .listeners
        .iter()
        .enumerate()
        .filter(|(_, s)| s.binding.talker_id == talker_id && s.is_bound())
        .map(|(i, _)| i as u16)
        .collect();
    for index in indices {
        let event = if available {
            ListenerEvent::TalkerDiscovered
        } else {
            ListenerEvent::TalkerDeparted
        };
        milan::listener_event(milan, acmp, entity_id, host, index, event, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageType;

    #[test]
    fn test_target_entity_selection() {
        let mut frame = AcmpFrame {
            message_type: MessageType::ConnectRxCommand,
            status: crate::protocol::AcmpStatus::Success,
            pdu: pdu::AcmpPdu {
                controller_entity_id: EntityId::from_u64(1),
                talker_entity_id: EntityId::from_u64(2),
                listener_entity_id: EntityId::from_u64(3),
                ..pdu::AcmpPdu::default()
            },
        };
        assert_eq!(target_entity_id(&frame), EntityId::from_u64(3));
        frame.message_type = MessageType::ConnectTxCommand;
        assert_eq!(target_entity_id(&frame), EntityId::from_u64(2));
        frame.message_type = MessageType::GetRxStateResponse;
        assert_eq!(target_entity_id(&frame), EntityId::from_u64(1));
    }

    #[test]
    fn test_handle_rejects_when_queue_full() {
        let engine = ConnectionEngine::with_queue_depth(1);
        let handle = engine.handle();
        handle
            .submit(EngineEvent::TalkerDeparted {
                talker_id: EntityId::from_u64(9),
            })
            .unwrap();
        let err = handle.submit(EngineEvent::Shutdown).unwrap_err();
        assert!(matches!(err, AcmpError::QueueFull));
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut engine = ConnectionEngine::new();
        engine
            .add_entity(Entity::new_ieee(EntityId::from_u64(7), Vec::new(), Vec::new()))
            .unwrap();
        let err = engine
            .add_entity(Entity::new_ieee(EntityId::from_u64(7), Vec::new(), Vec::new()))
            .unwrap_err();
        assert!(matches!(err, AcmpError::DuplicateEntity(_)));
    }
}
