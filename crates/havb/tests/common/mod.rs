// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared test host: records every side effect the engine asks for.

#![allow(dead_code)] // Each test binary uses a subset of the helpers.

use havb::core::descriptors::BindingParams;
use havb::protocol::pdu::{self, AcmpFrame, AcmpPdu};
use havb::{
    AcmpHost, AcmpResult, AcmpStatus, EntityId, MacAddr, MessageType, PortId, ReplyRoute,
    StreamConnectParams, StreamDirection, StreamDisconnectParams,
};

/// Test double for the platform seam. Transmitted frames are parsed back
/// so assertions read decoded PDUs instead of raw bytes.
#[derive(Default)]
pub struct RecordingHost {
    pub sent: Vec<(PortId, AcmpFrame)>,
    pub connects: Vec<StreamConnectParams>,
    pub disconnects: Vec<StreamDisconnectParams>,
    pub ipc: Vec<(ReplyRoute, MessageType, AcmpStatus, AcmpPdu)>,
    pub maap_started: Vec<(EntityId, PortId, u32)>,
    pub maap_stopped: Vec<(EntityId, PortId, u32)>,
    pub bindings: Vec<(EntityId, u16, Option<BindingParams>)>,
    pub info_changes: Vec<(EntityId, StreamDirection, u16)>,
    pub watches: Vec<(EntityId, u16, EntityId)>,
    pub unwatches: Vec<(EntityId, u16)>,
    /// When set, send_frame fails; exercises the transmit-error paths.
    pub fail_sends: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// All sent frames of one message type, in order.
    pub fn sent_of(&self, msg_type: MessageType) -> Vec<&AcmpFrame> {
        self.sent
            .iter()
            .filter(|(_, f)| f.message_type == msg_type)
            .map(|(_, f)| f)
            .collect()
    }

    /// The single sent frame of a message type; panics on zero or many.
    pub fn only_sent(&self, msg_type: MessageType) -> AcmpFrame {
        let frames = self.sent_of(msg_type);
        assert_eq!(
            frames.len(),
            1,
            "expected exactly one {:?}, got {}",
            msg_type,
            frames.len()
        );
        *frames[0]
    }

    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }
}

impl AcmpHost for RecordingHost {
    fn send_frame(&mut self, port: PortId, frame: &[u8]) -> AcmpResult<()> {
        if self.fail_sends {
            return Err(havb::AcmpError::send_failed("test transport down"));
        }
        let parsed = pdu::parse_frame(frame).expect("engine sent an unparseable frame");
        self.sent.push((port, parsed));
        Ok(())
    }

    fn port_mac(&self, port: PortId) -> MacAddr {
        MacAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x10 + port.0 as u8])
    }

    fn stack_connect(&mut self, params: &StreamConnectParams) {
        self.connects.push(*params);
    }

    fn stack_disconnect(&mut self, params: &StreamDisconnectParams) {
        self.disconnects.push(*params);
    }

    fn maap_start_range(&mut self, entity_id: EntityId, port: PortId, range_id: u32) {
        self.maap_started.push((entity_id, port, range_id));
    }

    fn maap_stop_range(&mut self, entity_id: EntityId, port: PortId, range_id: u32) {
        self.maap_stopped.push((entity_id, port, range_id));
    }

    fn ipc_response(
        &mut self,
        route: ReplyRoute,
        msg_type: MessageType,
        status: AcmpStatus,
        pdu: &AcmpPdu,
    ) {
        self.ipc.push((route, msg_type, status, *pdu));
    }

    fn binding_changed(
        &mut self,
        entity_id: EntityId,
        stream_index: u16,
        binding: Option<&BindingParams>,
    ) {
        self.bindings.push((entity_id, stream_index, binding.copied()));
    }

    fn stream_info_changed(
        &mut self,
        entity_id: EntityId,
        direction: StreamDirection,
        stream_index: u16,
    ) {
        self.info_changes.push((entity_id, direction, stream_index));
    }

    fn watch_talker(&mut self, entity_id: EntityId, stream_index: u16, talker: EntityId) {
        self.watches.push((entity_id, stream_index, talker));
    }

    fn unwatch_talker(&mut self, entity_id: EntityId, stream_index: u16) {
        self.unwatches.push((entity_id, stream_index));
    }
}

/// Encode a frame as it would arrive off the wire.
pub fn wire_frame(msg_type: MessageType, status: AcmpStatus, p: &AcmpPdu) -> Vec<u8> {
    let src = MacAddr::new([0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee]);
    pdu::encode_frame(&src, msg_type, status, p).expect("frame encoding")
}
