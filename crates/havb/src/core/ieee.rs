// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! IEEE 1722.1 legacy connection state machines (listener 8.2.2.5, talker
//! 8.2.2.6).
//!
//! State is binary per object: a listener sink is connected or not; a
//! talker stream holds a bounded pool of listener pairs with a connection
//! count. The non-standard fast-connect extension reconnects previously
//! saved (controller, talker) pairs when the talker is discovered, without
//! any controller round-trip.

use std::time::Instant;

use crate::core::acmp::{self, log_send_err, reply_template};
use crate::core::bridge::{
    AcmpHost, StreamConnectParams, StreamDirection, StreamDisconnectParams,
};
use crate::core::descriptors::{StreamInputConfig, StreamOutputConfig};
use crate::core::entity::{AcmpContext, LockState, Profile};
use crate::core::ids::{EntityId, MacAddr, PortId, StreamId};
use crate::protocol::pdu::{AcmpFrame, AcmpPdu};
use crate::protocol::{flags, AcmpStatus, MessageType};

// ============================================================================
// STATE
// ============================================================================

/// Fast-connect bookkeeping of one listener sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastConnect {
    /// Sink participates in fast-connect.
    pub enabled: bool,
    /// Saved talker information is complete; connect on discovery.
    pub pending: bool,
    /// Back-to-back mode: adopt the first talker discovered on the port.
    pub btb: bool,
}

/// Dynamic state of one IEEE listener sink.
#[derive(Debug)]
pub struct IeeeListenerSink {
    pub cfg: StreamInputConfig,
    pub connected: bool,
    pub controller_id: EntityId,
    pub talker_id: EntityId,
    pub talker_unique_id: u16,
    /// Flags of the connect that established the stream.
    pub flags: u16,
    pub stream_id: StreamId,
    pub dest_mac: MacAddr,
    pub vlan_id: u16,
    pub fast: FastConnect,
}

impl IeeeListenerSink {
    fn new(cfg: StreamInputConfig) -> Self {
        Self {
            cfg,
            connected: false,
            controller_id: EntityId::ZERO,
            talker_id: EntityId::ZERO,
            talker_unique_id: 0,
            flags: 0,
            stream_id: StreamId::ZERO,
            dest_mac: MacAddr::ZERO,
            vlan_id: 0,
            fast: FastConnect::default(),
        }
    }

    /// Connected to a talker other than the one the PDU names
    /// (8.2.2.5.2.2). Not-connected counts as "not other".
    fn connected_to_other(&self, p: &AcmpPdu) -> bool {
        self.connected
            && !(self.talker_id == p.talker_entity_id
                && self.talker_unique_id == p.talker_unique_id)
    }

    /// Connected to exactly the talker the PDU names (8.2.2.5.2.3).
    fn connected_to(&self, p: &AcmpPdu) -> bool {
        self.connected
            && self.talker_id == p.talker_entity_id
            && self.talker_unique_id == p.talker_unique_id
    }

    /// Fill a response with this sink's stream parameters.
    fn copy_info(&self, p: &mut AcmpPdu) {
        p.stream_id = self.stream_id;
        p.talker_entity_id = self.talker_id;
        p.talker_unique_id = self.talker_unique_id;
        p.stream_dest_mac = self.dest_mac;
        p.flags = self.flags;
        p.stream_vlan_id = self.vlan_id;
        p.connection_count = u16::from(self.connected);
    }
}

/// One (listener entity, listener unique id) registration on a talker
/// stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenerPair {
    pub listener_id: EntityId,
    pub listener_unique_id: u16,
    pub connected: bool,
}

/// Dynamic state of one IEEE talker stream.
#[derive(Debug)]
pub struct IeeeTalkerSource {
    pub cfg: StreamOutputConfig,
    pub stream_id: StreamId,
    pub dest_mac: MacAddr,
    pub vlan_id: u16,
    pub class_b: bool,
    pub connection_count: u16,
    pub pairs: Vec<ListenerPair>,
}

impl IeeeTalkerSource {
    fn new(cfg: StreamOutputConfig, pair_slots: usize) -> Self {
        Self {
            cfg,
            stream_id: StreamId::ZERO,
            dest_mac: MacAddr::ZERO,
            vlan_id: 0,
            class_b: false,
            connection_count: 0,
            pairs: vec![ListenerPair::default(); pair_slots],
        }
    }

    fn pair_index_for(&self, p: &AcmpPdu) -> Option<usize> {
        self.pairs.iter().position(|l| {
            l.connected
                && l.listener_id == p.listener_entity_id
                && l.listener_unique_id == p.listener_unique_id
        })
    }

    fn free_pair_index(&self) -> Option<usize> {
        if usize::from(self.connection_count) >= self.pairs.len() {
            return None;
        }
        self.pairs.iter().position(|l| !l.connected)
    }

    /// Fill a response with the stream parameters, but only once the
    /// stream exists (8.2.2.6.2.2 note: no info before first connection).
    fn copy_info(&self, p: &mut AcmpPdu) {
        if self.connection_count > 0 {
            p.stream_id = self.stream_id;
            p.stream_dest_mac = self.dest_mac;
            p.stream_vlan_id = self.vlan_id;
            p.connection_count = self.connection_count;
        }
    }
}

/// Per-entity IEEE profile state.
#[derive(Debug)]
pub struct IeeeEntityState {
    pub listeners: Vec<IeeeListenerSink>,
    pub talkers: Vec<IeeeTalkerSource>,
}

impl IeeeEntityState {
    #[must_use]
    pub fn new(listeners: Vec<StreamInputConfig>, talkers: Vec<StreamOutputConfig>) -> Self {
        Self {
            listeners: listeners.into_iter().map(IeeeListenerSink::new).collect(),
            talkers: talkers
                .into_iter()
                .map(|cfg| IeeeTalkerSource::new(cfg, crate::config::IEEE_LISTENER_PAIRS))
                .collect(),
        }
    }

    /// Configure a sink for fast-connect. With a concrete talker id the
    /// sink is immediately pending; without one, back-to-back mode adopts
    /// the first talker discovered on the sink's port.
    pub fn enable_fast_connect(
        &mut self,
        stream_index: u16,
        talker_unique_id: u16,
        talker_id: Option<EntityId>,
        btb: bool,
    ) {
        let Some(sink) = self.listeners.get_mut(usize::from(stream_index)) else {
            log::warn!(
                "[IeeeEntityState::enable_fast_connect] no sink {}",
                stream_index
            );
            return;
        };
        sink.talker_unique_id = talker_unique_id;
        sink.fast.enabled = true;
        match talker_id {
            Some(id) => {
                sink.talker_id = id;
                sink.fast.pending = true;
            }
            None => sink.fast.btb = btb,
        }
    }

    /// Entity teardown: disconnect every connected sink (telling the
    /// talker when fast-connect drove the connection) and every talker
    /// stream with remaining listeners.
    pub fn shutdown(&mut self, entity_id: EntityId, host: &mut dyn AcmpHost) {
        for (i, sink) in self.listeners.iter_mut().enumerate() {
            if !sink.connected {
                continue;
            }
            let index = i as u16;
            listener_stack_disconnect(entity_id, index, sink, host);
            let mut p = AcmpPdu {
                controller_entity_id: sink.controller_id,
                talker_entity_id: sink.talker_id,
                talker_unique_id: sink.talker_unique_id,
                listener_entity_id: entity_id,
                listener_unique_id: index,
                ..AcmpPdu::default()
            };
            sink.copy_info(&mut p);
            // best effort, no tracking: the entity is going away
            if let Err(e) =
                acmp::resend_command(host, sink.cfg.port, MessageType::DisconnectTxCommand, &p)
            {
                log::warn!("[IeeeEntityState::shutdown] disconnect tx failed: {}", e);
            }
            sink.connected = false;
        }
        for (i, talker) in self.talkers.iter_mut().enumerate() {
            if talker.connection_count == 0 {
                continue;
            }
            for pair in &mut talker.pairs {
                pair.connected = false;
            }
            talker.connection_count = 0;
            host.stack_disconnect(&StreamDisconnectParams {
                entity_id,
                direction: StreamDirection::Output,
                stream_index: i as u16,
                port: talker.cfg.port,
                stream_id: talker.stream_id,
            });
        }
    }
}

// ============================================================================
// LISTENER
// ============================================================================

fn listener_stack_connect(
    entity_id: EntityId,
    stream_index: u16,
    sink: &IeeeListenerSink,
    host: &mut dyn AcmpHost,
) {
    host.stack_connect(&StreamConnectParams {
        entity_id,
        direction: StreamDirection::Input,
        stream_index,
        port: sink.cfg.port,
        stream_id: sink.stream_id,
        dest_mac: sink.dest_mac,
        vlan_id: sink.vlan_id,
        class: sink.cfg.class_for_flags(sink.flags),
        clock_domain_index: sink.cfg.clock_domain_index,
    });
}

fn listener_stack_disconnect(
    entity_id: EntityId,
    stream_index: u16,
    sink: &IeeeListenerSink,
    host: &mut dyn AcmpHost,
) {
    host.stack_disconnect(&StreamDisconnectParams {
        entity_id,
        direction: StreamDirection::Input,
        stream_index,
        port: sink.cfg.port,
        stream_id: sink.stream_id,
    });
}

/// Local connect effect (8.2.2.5.2.6): save stream parameters from the
/// talker's response and bring the stream up. Idempotent.
fn listener_connect(
    entity_id: EntityId,
    stream_index: u16,
    sink: &mut IeeeListenerSink,
    p: &AcmpPdu,
    host: &mut dyn AcmpHost,
) -> AcmpStatus {
    if sink.connected {
        return AcmpStatus::Success;
    }
    sink.controller_id = p.controller_entity_id;
    sink.flags = p.flags;
    sink.dest_mac = p.stream_dest_mac;
    sink.stream_id = p.stream_id;
    sink.vlan_id = p.stream_vlan_id;
    sink.talker_id = p.talker_entity_id;
    sink.talker_unique_id = p.talker_unique_id;
    listener_stack_connect(entity_id, stream_index, sink, host);
    sink.connected = true;
    log::info!(
        "[ieee::listener_connect] {} sink {} connected to talker ({}, {})",
        entity_id,
        stream_index,
        sink.talker_id,
        sink.talker_unique_id
    );
    AcmpStatus::Success
}

/// Local disconnect effect (8.2.2.5.2.7).
fn listener_disconnect(
    entity_id: EntityId,
    stream_index: u16,
    sink: &mut IeeeListenerSink,
    host: &mut dyn AcmpHost,
) -> AcmpStatus {
    listener_stack_disconnect(entity_id, stream_index, sink, host);
    sink.connected = false;
    sink.flags = 0;
    AcmpStatus::Success
}

/// IEEE listener receive (8.2.2.5.3).
#[allow(clippy::too_many_arguments)]
pub fn listener_rcv(
    state: &mut IeeeEntityState,
    acmp: &mut AcmpContext,
    entity_id: EntityId,
    lock: LockState,
    host: &mut dyn AcmpHost,
    frame: &AcmpFrame,
    arrival_port: PortId,
    now: Instant,
) {
    let p = &frame.pdu;
    let unique = p.listener_unique_id;
    let Some(sink) = state.listeners.get_mut(usize::from(unique)) else {
        if !frame.message_type.is_response() {
            let rsp = reply_template(p, true);
            log_send_err(
                "ieee::listener_rcv",
                acmp::send_response(
                    host,
                    arrival_port,
                    frame.message_type.response(),
                    AcmpStatus::ListenerUnknownId,
                    &rsp,
                ),
            );
        }
        return;
    };
    let stream_index = unique;

    match frame.message_type {
        MessageType::ConnectRxCommand => {
            let locked = match lock {
                LockState::Unlocked => false,
                LockState::LockedBy(owner) => owner != p.controller_entity_id,
            };
            if locked {
                let mut rsp = reply_template(p, true);
                rsp.flags = p.flags;
                log_send_err(
                    "ieee::listener_rcv",
                    acmp::send_response(
                        host,
                        arrival_port,
                        MessageType::ConnectRxResponse,
                        AcmpStatus::ControllerNotAuthorized,
                        &rsp,
                    ),
                );
            } else if sink.connected_to_other(p) {
                let rsp = reply_template(p, true);
                log_send_err(
                    "ieee::listener_rcv",
                    acmp::send_response(
                        host,
                        arrival_port,
                        MessageType::ConnectRxResponse,
                        AcmpStatus::ListenerExclusive,
                        &rsp,
                    ),
                );
            } else {
                // forward to the talker, out the port of this sink's
                // stream input, and remember the controller's sequence id
                let mut cmd = reply_template(p, false);
                cmd.flags = p.flags;
                let port_cmd = sink.cfg.port;
                // an explicit controller command always wins over any
                // saved fast-connect state
                sink.fast.enabled = false;
                if let Err(e) = acmp::send_command(
                    acmp,
                    Profile::Ieee,
                    host,
                    port_cmd,
                    MessageType::ConnectTxCommand,
                    cmd,
                    p.sequence_id,
                    None,
                    now,
                ) {
                    log::warn!("[ieee::listener_rcv] connect forward failed: {}", e);
                }
            }
        }

        MessageType::ConnectTxResponse => {
            let status_rsp = if frame.status.is_success() {
                listener_connect(entity_id, stream_index, sink, p, host)
            } else {
                frame.status
            };
            let mut rsp = reply_template(p, false);
            sink.copy_info(&mut rsp);
            match acmp.inflight.cancel(p.sequence_id) {
                Some(entry) => rsp.sequence_id = entry.orig_sequence_id,
                None => log::warn!(
                    "[ieee::listener_rcv] no inflight entry for seq {}",
                    p.sequence_id
                ),
            }
            // fast-connect has no controller waiting on a response
            if !sink.fast.enabled {
                log_send_err(
                    "ieee::listener_rcv",
                    acmp::send_response(
                        host,
                        arrival_port,
                        MessageType::ConnectRxResponse,
                        status_rsp,
                        &rsp,
                    ),
                );
            }
        }

        MessageType::DisconnectRxCommand => {
            let locked = match lock {
                LockState::Unlocked => false,
                LockState::LockedBy(owner) => owner != p.controller_entity_id,
            };
            if locked {
                let mut rsp = reply_template(p, true);
                rsp.flags = p.flags;
                log_send_err(
                    "ieee::listener_rcv",
                    acmp::send_response(
                        host,
                        arrival_port,
                        MessageType::DisconnectRxResponse,
                        AcmpStatus::ControllerNotAuthorized,
                        &rsp,
                    ),
                );
            } else if sink.connected_to(p) {
                let status = listener_disconnect(entity_id, stream_index, sink, host);
                if status.is_success() {
                    let mut cmd = reply_template(p, false);
                    cmd.flags = p.flags;
                    let port_cmd = sink.cfg.port;
                    if let Err(e) = acmp::send_command(
                        acmp,
                        Profile::Ieee,
                        host,
                        port_cmd,
                        MessageType::DisconnectTxCommand,
                        cmd,
                        p.sequence_id,
                        None,
                        now,
                    ) {
                        log::warn!("[ieee::listener_rcv] disconnect forward failed: {}", e);
                    }
                    return;
                }
                let rsp = reply_template(p, true);
                log_send_err(
                    "ieee::listener_rcv",
                    acmp::send_response(
                        host,
                        arrival_port,
                        MessageType::DisconnectRxResponse,
                        status,
                        &rsp,
                    ),
                );
            } else {
                let rsp = reply_template(p, true);
                log_send_err(
                    "ieee::listener_rcv",
                    acmp::send_response(
                        host,
                        arrival_port,
                        MessageType::DisconnectRxResponse,
                        AcmpStatus::NotConnected,
                        &rsp,
                    ),
                );
            }
        }

        MessageType::DisconnectTxResponse => {
            let mut rsp = reply_template(p, false);
            match acmp.inflight.cancel(p.sequence_id) {
                Some(entry) => rsp.sequence_id = entry.orig_sequence_id,
                None => log::warn!(
                    "[ieee::listener_rcv] no inflight entry for seq {}",
                    p.sequence_id
                ),
            }
            log_send_err(
                "ieee::listener_rcv",
                acmp::send_response(
                    host,
                    arrival_port,
                    MessageType::DisconnectRxResponse,
                    frame.status,
                    &rsp,
                ),
            );
        }

        MessageType::GetRxStateCommand => {
            let mut rsp = reply_template(p, true);
            sink.copy_info(&mut rsp);
            log_send_err(
                "ieee::listener_rcv",
                acmp::send_response(
                    host,
                    arrival_port,
                    MessageType::GetRxStateResponse,
                    AcmpStatus::Success,
                    &rsp,
                ),
            );
        }

        other => log::warn!("[ieee::listener_rcv] unexpected message type {:?}", other),
    }
}

// ============================================================================
// TALKER
// ============================================================================

/// Talker-side connect (8.2.2.6.2.2): allocate a listener pair, check
/// class compatibility, and bring the stream up on the first connection.
fn talker_connect(
    entity_id: EntityId,
    stream_index: u16,
    talker: &mut IeeeTalkerSource,
    p: &AcmpPdu,
    host: &mut dyn AcmpHost,
) -> AcmpStatus {
    let Some(free) = talker.free_pair_index() else {
        log::warn!(
            "[ieee::talker_connect] {} stream {} listener pool exhausted",
            entity_id,
            stream_index
        );
        return AcmpStatus::TalkerMisbehaving;
    };

    if !talker.cfg.class_compatible(p.flags) {
        log::warn!(
            "[ieee::talker_connect] incompatible class request from {}",
            p.listener_entity_id
        );
        return AcmpStatus::IncompatibleRequest;
    }
    let req_class_b = p.flags & flags::CLASS_B != 0;

    if talker.connection_count == 0 {
        // first listener: derive stream identity and bring the stream up
        talker.class_b = req_class_b;
        talker.dest_mac = MacAddr::derived_for_talker(entity_id, stream_index);
        talker.vlan_id = 0; // default SRP domain VLAN
        talker.stream_id = StreamId::from_mac(&host.port_mac(talker.cfg.port), stream_index);
        host.stack_connect(&StreamConnectParams {
            entity_id,
            direction: StreamDirection::Output,
            stream_index,
            port: talker.cfg.port,
            stream_id: talker.stream_id,
            dest_mac: talker.dest_mac,
            vlan_id: talker.vlan_id,
            class: talker.cfg.class_for_flags(p.flags),
            clock_domain_index: talker.cfg.clock_domain_index,
        });
    } else if req_class_b != talker.class_b {
        log::warn!(
            "[ieee::talker_connect] incompatible class on stream {}",
            talker.stream_id
        );
        return AcmpStatus::IncompatibleRequest;
    }

    let pair = &mut talker.pairs[free];
    pair.listener_id = p.listener_entity_id;
    pair.listener_unique_id = p.listener_unique_id;
    pair.connected = true;
    talker.connection_count += 1;
    AcmpStatus::Success
}

/// Talker-side disconnect (8.2.2.6.2.4): release the pair; the stream
/// goes down when the last listener leaves.
fn talker_disconnect(
    entity_id: EntityId,
    stream_index: u16,
    talker: &mut IeeeTalkerSource,
    pair_index: usize,
    host: &mut dyn AcmpHost,
) -> AcmpStatus {
    talker.pairs[pair_index].connected = false;
    talker.connection_count -= 1;
    if talker.connection_count == 0 {
        host.stack_disconnect(&StreamDisconnectParams {
            entity_id,
            direction: StreamDirection::Output,
            stream_index,
            port: talker.cfg.port,
            stream_id: talker.stream_id,
        });
    }
    AcmpStatus::Success
}

/// IEEE talker receive (8.2.2.6.3). Talkers only ever send responses.
pub fn talker_rcv(
    state: &mut IeeeEntityState,
    _acmp: &mut AcmpContext,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    frame: &AcmpFrame,
    arrival_port: PortId,
    _now: Instant,
) {
    let p = &frame.pdu;
    let unique = p.talker_unique_id;
    let Some(talker) = state.talkers.get_mut(usize::from(unique)) else {
        if !frame.message_type.is_response() {
            let rsp = reply_template(p, true);
            log_send_err(
                "ieee::talker_rcv",
                acmp::send_response(
                    host,
                    arrival_port,
                    frame.message_type.response(),
                    AcmpStatus::TalkerUnknownId,
                    &rsp,
                ),
            );
        }
        return;
    };
    let stream_index = unique;

    match frame.message_type {
        MessageType::ConnectTxCommand => {
            let status = if talker.pair_index_for(p).is_some() {
                // idempotent: the pair is already registered
                AcmpStatus::Success
            } else {
                talker_connect(entity_id, stream_index, talker, p, host)
            };
            let mut rsp = reply_template(p, true);
            talker.copy_info(&mut rsp);
            rsp.flags = p.flags;
            log_send_err(
                "ieee::talker_rcv",
                acmp::send_response(
                    host,
                    arrival_port,
                    MessageType::ConnectTxResponse,
                    status,
                    &rsp,
                ),
            );
        }

        MessageType::DisconnectTxCommand => {
            let mut rsp = reply_template(p, true);
            let status = match talker.pair_index_for(p) {
                Some(i) => {
                    let s = talker_disconnect(entity_id, stream_index, talker, i, host);
                    talker.copy_info(&mut rsp);
                    s
                }
                None => AcmpStatus::NoSuchConnection,
            };
            log_send_err(
                "ieee::talker_rcv",
                acmp::send_response(
                    host,
                    arrival_port,
                    MessageType::DisconnectTxResponse,
                    status,
                    &rsp,
                ),
            );
        }

        MessageType::GetTxStateCommand => {
            let mut rsp = reply_template(p, true);
            talker.copy_info(&mut rsp);
            log_send_err(
                "ieee::talker_rcv",
                acmp::send_response(
                    host,
                    arrival_port,
                    MessageType::GetTxStateResponse,
                    AcmpStatus::Success,
                    &rsp,
                ),
            );
        }

        MessageType::GetTxConnectionCommand => {
            // connection_count of the command is the requested pair slot
            let slot = usize::from(p.connection_count);
            let mut rsp = reply_template(p, true);
            let status = match talker.pairs.get(slot) {
                Some(pair) if pair.connected => {
                    rsp.listener_entity_id = pair.listener_id;
                    rsp.listener_unique_id = pair.listener_unique_id;
                    talker.copy_info(&mut rsp);
                    AcmpStatus::Success
                }
                _ => AcmpStatus::NoSuchConnection,
            };
            log_send_err(
                "ieee::talker_rcv",
                acmp::send_response(
                    host,
                    arrival_port,
                    MessageType::GetTxConnectionResponse,
                    status,
                    &rsp,
                ),
            );
        }

        other => log::warn!("[ieee::talker_rcv] unexpected message type {:?}", other),
    }
}

// ============================================================================
// FAST-CONNECT
// ============================================================================

/// Talker appeared on the network: seed back-to-back sinks on its port,
/// then fire pending fast-connects targeting it (8.2.2.1.1).
pub fn talker_discovered(
    state: &mut IeeeEntityState,
    acmp: &mut AcmpContext,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    talker_id: EntityId,
    port: PortId,
    now: Instant,
) {
    // back-to-back: adopt the talker for sinks with no saved identity
    for sink in &mut state.listeners {
        if sink.fast.btb
            && sink.cfg.port == port
            && !sink.connected
            && !sink.fast.pending
        {
            sink.talker_id = talker_id;
            sink.fast.pending = true;
            sink.fast.enabled = true;
            log::info!(
                "[ieee::talker_discovered] {} adopted talker ({}, {})",
                entity_id,
                talker_id,
                sink.talker_unique_id
            );
        }
    }

    for (i, sink) in state.listeners.iter_mut().enumerate() {
        if !sink.fast.enabled
            || sink.connected
            || !sink.fast.pending
            || sink.talker_id != talker_id
            || sink.cfg.port != port
        {
            continue;
        }
        let mut cmd = AcmpPdu {
            listener_entity_id: entity_id,
            listener_unique_id: i as u16,
            controller_entity_id: sink.controller_id,
            ..AcmpPdu::default()
        };
        sink.copy_info(&mut cmd);
        cmd.flags |= flags::FAST_CONNECT;
        if let Err(e) = acmp::send_command(
            acmp,
            Profile::Ieee,
            host,
            port,
            MessageType::ConnectTxCommand,
            cmd,
            0,
            None,
            now,
        ) {
            log::warn!("[ieee::talker_discovered] fast-connect send failed: {}", e);
        }
    }
}

/// Talker left the network: locally disconnect the fast-connected sinks
/// bound to it so they reconnect on its return.
pub fn talker_departed(
    state: &mut IeeeEntityState,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    talker_id: EntityId,
) {
    for (i, sink) in state.listeners.iter_mut().enumerate() {
        if sink.connected && sink.fast.enabled && sink.talker_id == talker_id {
            listener_disconnect(entity_id, i as u16, sink, host);
            if sink.fast.btb {
                // re-arm adoption of the next talker on this port
                sink.fast.pending = false;
            }
        }
    }
}
