// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::unreadable_literal)] // Large test constants

//! MILAN listener binding lifecycle: bind, probe, settle, SRP coupling,
//! unbind, and the timeout ladders in between. The remote talker is
//! simulated by crafting PROBE_TX responses against the sequence ids the
//! engine emits.

mod common;

use std::time::{Duration, Instant};

use common::{wire_frame, RecordingHost};
use havb::core::descriptors::{BindingParams, StreamInputConfig};
use havb::core::entity::ProfileState;
use havb::core::milan::{ProbingStatus, SinkState, SrpStreamStatus};
use havb::protocol::flags;
use havb::protocol::pdu::AcmpPdu;
use havb::{
    AcmpStatus, ConnectionEngine, EngineEvent, Entity, EntityId, MacAddr, MessageType, PortId,
    StreamDirection, StreamId,
};

const CONTROLLER: EntityId = EntityId::from_u64(0xC0C0_0000_0000_0011);
const LISTENER: EntityId = EntityId::from_u64(0x1111_0000_0000_0012);
const TALKER: EntityId = EntityId::from_u64(0x7A7A_0000_0000_0013);
const PORT: PortId = PortId(0);

const STREAM: StreamId = StreamId::from_u64(0x0200_0000_0000_1000);
const DEST: MacAddr = MacAddr::new([0x91, 0xe0, 0xf0, 0x00, 0x11, 0x22]);
const VLAN: u16 = 2;

fn listener_engine(sinks: usize) -> (ConnectionEngine, RecordingHost) {
    let mut engine = ConnectionEngine::new();
    engine
        .add_entity(Entity::new_milan(
            LISTENER,
            vec![StreamInputConfig::default(); sinks],
            Vec::new(),
        ))
        .unwrap();
    let mut host = RecordingHost::new();
    engine.start(&mut host);
    (engine, host)
}

fn bind_pdu(stream_index: u16, sequence_id: u16) -> AcmpPdu {
    AcmpPdu {
        controller_entity_id: CONTROLLER,
        talker_entity_id: TALKER,
        talker_unique_id: 0,
        listener_entity_id: LISTENER,
        listener_unique_id: stream_index,
        sequence_id,
        ..AcmpPdu::default()
    }
}

fn submit_frame(engine: &mut ConnectionEngine, host: &mut RecordingHost, data: Vec<u8>, now: Instant) {
    engine
        .handle()
        .submit(EngineEvent::Frame { port: PORT, data })
        .unwrap();
    engine.poll(host, now);
}

fn sink_state(engine: &ConnectionEngine, index: usize) -> SinkState {
    let ProfileState::Milan(milan) = &engine.entity(LISTENER).unwrap().profile else {
        panic!("listener entity must be MILAN");
    };
    milan.listeners[index].state
}

fn sink_probing(engine: &ConnectionEngine, index: usize) -> ProbingStatus {
    let ProfileState::Milan(milan) = &engine.entity(LISTENER).unwrap().profile else {
        panic!("listener entity must be MILAN");
    };
    milan.listeners[index].probing
}

/// Bind sink 0 and answer its probe with a successful PROBE_TX response.
fn settle(engine: &mut ConnectionEngine, host: &mut RecordingHost, now: Instant) {
    submit_frame(
        engine,
        host,
        wire_frame(
            MessageType::ConnectRxCommand,
            AcmpStatus::Success,
            &bind_pdu(0, 0x0010),
        ),
        now,
    );
    let probe = host.only_sent(MessageType::ConnectTxCommand);
    let rsp = AcmpPdu {
        stream_id: STREAM,
        stream_dest_mac: DEST,
        stream_vlan_id: VLAN,
        ..probe.pdu
    };
    submit_frame(
        engine,
        host,
        wire_frame(MessageType::ConnectTxResponse, AcmpStatus::Success, &rsp),
        now,
    );
    assert_eq!(sink_state(engine, 0), SinkState::SettledNoRsv);
}

#[test]
fn test_bind_probes_and_settles() {
    let (mut engine, mut host) = listener_engine(1);
    let t0 = Instant::now();

    submit_frame(
        &mut engine,
        &mut host,
        wire_frame(
            MessageType::ConnectRxCommand,
            AcmpStatus::Success,
            &bind_pdu(0, 0x0010),
        ),
        t0,
    );

    // the bind is acknowledged immediately, before any probe outcome
    let ack = host.only_sent(MessageType::ConnectRxResponse);
    assert_eq!(ack.status, AcmpStatus::Success);
    assert_eq!(ack.pdu.sequence_id, 0x0010);
    assert_eq!(ack.pdu.connection_count, 1);

    // binding persisted and the talker watched
    assert!(matches!(host.bindings.last(), Some((_, 0, Some(b))) if b.talker_id == TALKER));
    assert!(host.watches.contains(&(LISTENER, 0, TALKER)));

    // a probe went out toward the talker
    let probe = host.only_sent(MessageType::ConnectTxCommand);
    assert_eq!(probe.pdu.talker_entity_id, TALKER);
    assert_eq!(probe.pdu.listener_entity_id, LISTENER);
    assert_eq!(sink_state(&engine, 0), SinkState::PrbWResp);

    // talker answers with the stream parameters
    let rsp = AcmpPdu {
        stream_id: STREAM,
        stream_dest_mac: DEST,
        stream_vlan_id: VLAN,
        ..probe.pdu
    };
    submit_frame(
        &mut engine,
        &mut host,
        wire_frame(MessageType::ConnectTxResponse, AcmpStatus::Success, &rsp),
        t0,
    );

    assert_eq!(sink_state(&engine, 0), SinkState::SettledNoRsv);
    assert_eq!(sink_probing(&engine, 0), ProbingStatus::Completed);
    let connect = host
        .connects
        .iter()
        .find(|c| c.direction == StreamDirection::Input)
        .expect("listener stream must come up");
    assert_eq!(connect.stream_id, STREAM);
    assert_eq!(connect.dest_mac, DEST);
    assert_eq!(connect.vlan_id, VLAN);
}

#[test]
fn test_srp_registration_completes_settling() {
    let (mut engine, mut host) = listener_engine(1);
    let t0 = Instant::now();
    settle(&mut engine, &mut host, t0);

    engine
        .handle()
        .submit(EngineEvent::ListenerSrpStatus {
            entity_id: LISTENER,
            stream_index: 0,
            status: SrpStreamStatus::Active,
            stream_id: STREAM,
            dest_mac: DEST,
            vlan_id: VLAN,
        })
        .unwrap();
    engine.poll(&mut host, t0);
    assert_eq!(sink_state(&engine, 0), SinkState::SettledRsvOk);

    // losing the talker attribute drops the stream and restarts probing
    host.disconnects.clear();
    engine
        .handle()
        .submit(EngineEvent::ListenerSrpStatus {
            entity_id: LISTENER,
            stream_index: 0,
            status: SrpStreamStatus::NoTalker,
            stream_id: StreamId::ZERO,
            dest_mac: MacAddr::ZERO,
            vlan_id: 0,
        })
        .unwrap();
    engine.poll(&mut host, t0);
    assert!(!host.disconnects.is_empty());
    // talker was never ADP-discovered here, so probing goes passive
    assert_eq!(sink_state(&engine, 0), SinkState::PrbWAvail);
}

#[test]
fn test_srp_status_for_wrong_stream_is_ignored() {
    let (mut engine, mut host) = listener_engine(1);
    let t0 = Instant::now();
    settle(&mut engine, &mut host, t0);

    engine
        .handle()
        .submit(EngineEvent::ListenerSrpStatus {
            entity_id: LISTENER,
            stream_index: 0,
            status: SrpStreamStatus::Active,
            stream_id: StreamId::from_u64(0xdead),
            dest_mac: DEST,
            vlan_id: VLAN,
        })
        .unwrap();
    engine.poll(&mut host, t0);
    assert_eq!(sink_state(&engine, 0), SinkState::SettledNoRsv);
}

#[test]
fn test_bind_same_talker_elsewhere_is_exclusive() {
    let (mut engine, mut host) = listener_engine(2);
    let t0 = Instant::now();
    submit_frame(
        &mut engine,
        &mut host,
        wire_frame(
            MessageType::ConnectRxCommand,
            AcmpStatus::Success,
            &bind_pdu(0, 0x0010),
        ),
        t0,
    );
    host.clear_sent();

    submit_frame(
        &mut engine,
        &mut host,
        wire_frame(
            MessageType::ConnectRxCommand,
            AcmpStatus::Success,
            &bind_pdu(1, 0x0011),
        ),
        t0,
    );
    let rsp = host.only_sent(MessageType::ConnectRxResponse);
    assert_eq!(rsp.status, AcmpStatus::TalkerExclusive);
    assert_eq!(sink_state(&engine, 1), SinkState::Unbound);
}

#[test]
fn test_unbind_tears_down_and_clears_binding() {
    let (mut engine, mut host) = listener_engine(1);
    let t0 = Instant::now();
    settle(&mut engine, &mut host, t0);
    host.clear_sent();
    host.disconnects.clear();

    submit_frame(
        &mut engine,
        &mut host,
        wire_frame(
            MessageType::DisconnectRxCommand,
            AcmpStatus::Success,
            &bind_pdu(0, 0x0020),
        ),
        t0,
    );

    let rsp = host.only_sent(MessageType::DisconnectRxResponse);
    assert_eq!(rsp.status, AcmpStatus::Success);
    assert_eq!(rsp.pdu.connection_count, 0);
    assert_eq!(sink_state(&engine, 0), SinkState::Unbound);
    assert!(!host.disconnects.is_empty());
    assert!(matches!(host.bindings.last(), Some((_, 0, None))));
    assert!(host.unwatches.contains(&(LISTENER, 0)));
}

#[test]
fn test_unbind_during_probe_delay_drops_pending_probe() {
    let (mut engine, mut host) = listener_engine(1);
    let t0 = Instant::now();

    engine
        .handle()
        .submit(EngineEvent::SavedBinding {
            entity_id: LISTENER,
            stream_index: 0,
            params: BindingParams {
                controller_id: CONTROLLER,
                talker_id: TALKER,
                talker_unique_id: 0,
                streaming_wait: false,
            },
        })
        .unwrap();
    engine
        .handle()
        .submit(EngineEvent::TalkerAvailable {
            talker_id: TALKER,
            port: PORT,
        })
        .unwrap();
    engine.poll(&mut host, t0);
    assert_eq!(sink_state(&engine, 0), SinkState::PrbWDelay);
    host.clear_sent();

    submit_frame(
        &mut engine,
        &mut host,
        wire_frame(
            MessageType::DisconnectRxCommand,
            AcmpStatus::Success,
            &bind_pdu(0, 0x0031),
        ),
        t0,
    );
    assert_eq!(sink_state(&engine, 0), SinkState::Unbound);
    host.clear_sent();

    // the armed probe delay must not fire after the unbind
    engine.poll(&mut host, t0 + Duration::from_millis(1_100));
    assert!(host.sent_of(MessageType::ConnectTxCommand).is_empty());
    assert_eq!(sink_state(&engine, 0), SinkState::Unbound);
}

#[test]
fn test_probe_timeout_ladder() {
    let (mut engine, mut host) = listener_engine(1);
    let t0 = Instant::now();
    submit_frame(
        &mut engine,
        &mut host,
        wire_frame(
            MessageType::ConnectRxCommand,
            AcmpStatus::Success,
            &bind_pdu(0, 0x0010),
        ),
        t0,
    );
    assert_eq!(host.sent_of(MessageType::ConnectTxCommand).len(), 1);

    // first expiry: silent retransmission of the same probe
    engine.poll(&mut host, t0 + Duration::from_millis(250));
    let probes = host.sent_of(MessageType::ConnectTxCommand);
    assert_eq!(probes.len(), 2);
    assert_eq!(probes[0].pdu.sequence_id, probes[1].pdu.sequence_id);
    assert_eq!(sink_state(&engine, 0), SinkState::PrbWResp2);

    // second expiry: give up and hold off for the retry period
    engine.poll(&mut host, t0 + Duration::from_millis(500));
    assert_eq!(sink_state(&engine, 0), SinkState::PrbWRetry);

    // retry expiry with the talker still undiscovered: passive waiting
    engine.poll(&mut host, t0 + Duration::from_millis(4_600));
    assert_eq!(sink_state(&engine, 0), SinkState::PrbWAvail);
    assert_eq!(sink_probing(&engine, 0), ProbingStatus::Passive);
    // no third probe went out
    assert_eq!(host.sent_of(MessageType::ConnectTxCommand).len(), 2);
}

#[test]
fn test_failed_probe_response_enters_retry() {
    let (mut engine, mut host) = listener_engine(1);
    let t0 = Instant::now();
    submit_frame(
        &mut engine,
        &mut host,
        wire_frame(
            MessageType::ConnectRxCommand,
            AcmpStatus::Success,
            &bind_pdu(0, 0x0010),
        ),
        t0,
    );
    let probe = host.only_sent(MessageType::ConnectTxCommand);
    submit_frame(
        &mut engine,
        &mut host,
        wire_frame(
            MessageType::ConnectTxResponse,
            AcmpStatus::TalkerNoBandwidth,
            &probe.pdu,
        ),
        t0,
    );
    assert_eq!(sink_state(&engine, 0), SinkState::PrbWRetry);
    assert!(host.connects.is_empty());
}

#[test]
fn test_saved_binding_probes_after_discovery() {
    let (mut engine, mut host) = listener_engine(1);
    let t0 = Instant::now();

    engine
        .handle()
        .submit(EngineEvent::SavedBinding {
            entity_id: LISTENER,
            stream_index: 0,
            params: BindingParams {
                controller_id: CONTROLLER,
                talker_id: TALKER,
                talker_unique_id: 0,
                streaming_wait: false,
            },
        })
        .unwrap();
    engine.poll(&mut host, t0);
    assert_eq!(sink_state(&engine, 0), SinkState::PrbWAvail);
    assert_eq!(sink_probing(&engine, 0), ProbingStatus::Passive);
    assert!(host.watches.contains(&(LISTENER, 0, TALKER)));
    // no probe until the talker is actually present
    assert!(host.sent_of(MessageType::ConnectTxCommand).is_empty());

    engine
        .handle()
        .submit(EngineEvent::TalkerAvailable {
            talker_id: TALKER,
            port: PORT,
        })
        .unwrap();
    engine.poll(&mut host, t0);
    assert_eq!(sink_state(&engine, 0), SinkState::PrbWDelay);

    // after the randomized delay (bounded by 1s) the probe goes out
    engine.poll(&mut host, t0 + Duration::from_millis(1_100));
    assert_eq!(sink_state(&engine, 0), SinkState::PrbWResp);
    let probe = host.only_sent(MessageType::ConnectTxCommand);
    assert_eq!(probe.pdu.controller_entity_id, CONTROLLER);
}

#[test]
fn test_no_talker_attribute_timeout_reprobes() {
    let (mut engine, mut host) = listener_engine(1);
    let t0 = Instant::now();
    settle(&mut engine, &mut host, t0);
    host.disconnects.clear();

    engine.poll(&mut host, t0 + Duration::from_millis(10_100));
    assert!(!host.disconnects.is_empty());
    assert_eq!(sink_state(&engine, 0), SinkState::PrbWAvail);
}

#[test]
fn test_get_rx_state_reports_binding_and_stream() {
    let (mut engine, mut host) = listener_engine(1);
    let t0 = Instant::now();
    settle(&mut engine, &mut host, t0);
    host.clear_sent();

    submit_frame(
        &mut engine,
        &mut host,
        wire_frame(
            MessageType::GetRxStateCommand,
            AcmpStatus::Success,
            &bind_pdu(0, 0x0030),
        ),
        t0,
    );
    let rsp = host.only_sent(MessageType::GetRxStateResponse);
    assert_eq!(rsp.status, AcmpStatus::Success);
    assert_eq!(rsp.pdu.connection_count, 1);
    assert_eq!(rsp.pdu.talker_entity_id, TALKER);
    assert_eq!(rsp.pdu.stream_id, STREAM);
    assert_eq!(rsp.pdu.stream_dest_mac, DEST);
    assert!(rsp.pdu.has_flag(flags::FAST_CONNECT));
}

#[test]
fn test_rebind_same_talker_does_not_reprobe() {
    let (mut engine, mut host) = listener_engine(1);
    let t0 = Instant::now();
    settle(&mut engine, &mut host, t0);
    host.clear_sent();

    submit_frame(
        &mut engine,
        &mut host,
        wire_frame(
            MessageType::ConnectRxCommand,
            AcmpStatus::Success,
            &bind_pdu(0, 0x0040),
        ),
        t0,
    );
    let ack = host.only_sent(MessageType::ConnectRxResponse);
    assert_eq!(ack.status, AcmpStatus::Success);
    // same talker: the settled stream stays untouched
    assert!(host.sent_of(MessageType::ConnectTxCommand).is_empty());
    assert_eq!(sink_state(&engine, 0), SinkState::SettledNoRsv);
}

#[test]
fn test_rebind_other_talker_restarts_probing() {
    let (mut engine, mut host) = listener_engine(1);
    let t0 = Instant::now();
    settle(&mut engine, &mut host, t0);
    host.clear_sent();
    host.disconnects.clear();

    let mut p = bind_pdu(0, 0x0041);
    p.talker_entity_id = EntityId::from_u64(0x7A7A_0000_0000_00EE);
    submit_frame(
        &mut engine,
        &mut host,
        wire_frame(MessageType::ConnectRxCommand, AcmpStatus::Success, &p),
        t0,
    );

    // old stream torn down, new probe toward the new talker
    assert!(!host.disconnects.is_empty());
    let probe = host.only_sent(MessageType::ConnectTxCommand);
    assert_eq!(
        probe.pdu.talker_entity_id,
        EntityId::from_u64(0x7A7A_0000_0000_00EE)
    );
    assert_eq!(sink_state(&engine, 0), SinkState::PrbWResp);
}
