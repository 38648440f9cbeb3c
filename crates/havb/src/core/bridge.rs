// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host collaborator contract.
//!
//! Everything the engine does to the outside world goes through one trait:
//! frame transmit, AVTP stack connect/disconnect (which carries SRP
//! registration on the host side), MAAP range management, IPC replies to
//! local controller clients, coalesced stream-info notifications, and the
//! ADP talker discovery watch. Calls are requests, not guarantees - their
//! completion, where observable, arrives later as an engine event.

use crate::core::descriptors::BindingParams;
use crate::core::ids::{EntityId, MacAddr, PortId, StreamId};
use crate::core::inflight::ReplyRoute;
use crate::error::AcmpResult;
use crate::protocol::pdu::AcmpPdu;
use crate::protocol::{AcmpStatus, MessageType};

/// SR traffic class of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrClass {
    A,
    B,
}

/// Direction of a stack connect/disconnect, from the local entity's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    /// Local listener sink receiving from a remote talker.
    Input,
    /// Local talker source transmitting to listeners.
    Output,
}

/// Parameters of a stack connect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConnectParams {
    pub entity_id: EntityId,
    pub direction: StreamDirection,
    pub stream_index: u16,
    pub port: PortId,
    pub stream_id: StreamId,
    pub dest_mac: MacAddr,
    pub vlan_id: u16,
    pub class: SrClass,
    pub clock_domain_index: u16,
}

/// Parameters of a stack disconnect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDisconnectParams {
    pub entity_id: EntityId,
    pub direction: StreamDirection,
    pub stream_index: u16,
    pub port: PortId,
    pub stream_id: StreamId,
}

/// The engine's window on the rest of the system.
///
/// Implementations must not block; failures are returned so the engine can
/// log and, for transmit, roll back local state - never half-applied.
pub trait AcmpHost {
    /// Transmit a fully framed ACMP message on a port.
    fn send_frame(&mut self, port: PortId, frame: &[u8]) -> AcmpResult<()>;

    /// Source MAC of a port, used for frame headers and IEEE stream ids.
    fn port_mac(&self, port: PortId) -> MacAddr;

    /// Request AVTP stream creation (and SRP registration where enabled).
    fn stack_connect(&mut self, params: &StreamConnectParams);

    /// Request AVTP stream teardown (and SRP deregistration).
    fn stack_disconnect(&mut self, params: &StreamDisconnectParams);

    /// Request a MAAP address range for a talker stream.
    fn maap_start_range(&mut self, entity_id: EntityId, port: PortId, range_id: u32);

    /// Release a talker stream's MAAP range.
    fn maap_stop_range(&mut self, entity_id: EntityId, port: PortId, range_id: u32);

    /// Deliver the outcome of a locally requested operation to its IPC
    /// client.
    fn ipc_response(
        &mut self,
        route: ReplyRoute,
        msg_type: MessageType,
        status: AcmpStatus,
        pdu: &AcmpPdu,
    );

    /// A listener sink's binding parameters changed; `None` means the sink
    /// was unbound. The host persists these for replay after a restart.
    fn binding_changed(
        &mut self,
        entity_id: EntityId,
        stream_index: u16,
        binding: Option<&BindingParams>,
    );

    /// Coalesced unsolicited notification: the visible state of a stream
    /// changed at some point in the elapsed window.
    fn stream_info_changed(
        &mut self,
        entity_id: EntityId,
        direction: StreamDirection,
        stream_index: u16,
    );

    /// (Re)arm the ADP discovery watch of a listener sink on a talker.
    fn watch_talker(&mut self, entity_id: EntityId, stream_index: u16, talker: EntityId);

    /// Drop the discovery watch of a listener sink.
    fn unwatch_talker(&mut self, entity_id: EntityId, stream_index: u16);
}
