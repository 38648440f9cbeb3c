// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::unreadable_literal)] // Large test constants

//! MILAN talker lifecycle: MAAP address acquisition, PROBE_TX handling,
//! the probe window, SRP listener coupling and withdraw debouncing.

mod common;

use std::time::{Duration, Instant};

use common::{wire_frame, RecordingHost};
use havb::core::descriptors::StreamOutputConfig;
use havb::core::entity::ProfileState;
use havb::core::milan::{maap_range_id, SrpListenerStatus};
use havb::protocol::flags;
use havb::protocol::pdu::AcmpPdu;
use havb::{
    AcmpStatus, ConnectionEngine, EngineEvent, Entity, EntityId, MacAddr, MessageType, PortId,
    StreamDirection,
};

const CONTROLLER: EntityId = EntityId::from_u64(0xC0C0_0000_0000_0021);
const LISTENER: EntityId = EntityId::from_u64(0x1111_0000_0000_0022);
const TALKER: EntityId = EntityId::from_u64(0x7A7A_0000_0000_0023);
const PORT: PortId = PortId(0);

const MAAP_BASE: MacAddr = MacAddr::new([0x91, 0xe0, 0xf0, 0x00, 0x77, 0x00]);

fn talker_engine() -> (ConnectionEngine, RecordingHost) {
    let mut engine = ConnectionEngine::new();
    engine
        .add_entity(Entity::new_milan(
            TALKER,
            Vec::new(),
            vec![StreamOutputConfig::default()],
        ))
        .unwrap();
    let mut host = RecordingHost::new();
    engine.start(&mut host);
    (engine, host)
}

fn probe_pdu(sequence_id: u16) -> AcmpPdu {
    AcmpPdu {
        controller_entity_id: CONTROLLER,
        talker_entity_id: TALKER,
        talker_unique_id: 0,
        listener_entity_id: LISTENER,
        listener_unique_id: 0,
        sequence_id,
        ..AcmpPdu::default()
    }
}

fn submit_on(
    engine: &mut ConnectionEngine,
    host: &mut RecordingHost,
    port: PortId,
    data: Vec<u8>,
    now: Instant,
) {
    engine
        .handle()
        .submit(EngineEvent::Frame { port, data })
        .unwrap();
    engine.poll(host, now);
}

fn acquire_maap(engine: &mut ConnectionEngine, host: &mut RecordingHost, now: Instant) {
    engine
        .handle()
        .submit(EngineEvent::MaapValid {
            entity_id: TALKER,
            port: PORT,
            range_id: maap_range_id(0),
            base: MAAP_BASE,
        })
        .unwrap();
    engine.poll(host, now);
}

fn talker_connected(engine: &ConnectionEngine) -> bool {
    let ProfileState::Milan(milan) = &engine.entity(TALKER).unwrap().profile else {
        panic!("talker entity must be MILAN");
    };
    milan.talkers[0].connected
}

fn talker_withdrawing(engine: &ConnectionEngine) -> bool {
    let ProfileState::Milan(milan) = &engine.entity(TALKER).unwrap().profile else {
        panic!("talker entity must be MILAN");
    };
    milan.talkers[0].withdraw_in_progress
}

#[test]
fn test_start_claims_maap_range_and_stream_id() {
    let (engine, host) = talker_engine();
    assert_eq!(host.maap_started, vec![(TALKER, PORT, maap_range_id(0))]);

    let ProfileState::Milan(milan) = &engine.entity(TALKER).unwrap().profile else {
        panic!("talker entity must be MILAN");
    };
    // stream id derives from the port MAC, stable across restarts
    assert!(!milan.talkers[0].stream_id.is_zero());
    assert!(milan.talkers[0].dest_mac.is_zero());
}

#[test]
fn test_probe_without_maap_address_fails() {
    let (mut engine, mut host) = talker_engine();
    let t0 = Instant::now();
    submit_on(
        &mut engine,
        &mut host,
        PORT,
        wire_frame(
            MessageType::ConnectTxCommand,
            AcmpStatus::Success,
            &probe_pdu(0x0001),
        ),
        t0,
    );
    let rsp = host.only_sent(MessageType::ConnectTxResponse);
    assert_eq!(rsp.status, AcmpStatus::TalkerDestMacFail);
    assert!(host.connects.is_empty());
}

#[test]
fn test_probe_with_maap_address_connects_and_answers() {
    let (mut engine, mut host) = talker_engine();
    let t0 = Instant::now();
    acquire_maap(&mut engine, &mut host, t0);

    let mut p = probe_pdu(0x0002);
    p.flags = flags::STREAMING_WAIT;
    submit_on(
        &mut engine,
        &mut host,
        PORT,
        wire_frame(MessageType::ConnectTxCommand, AcmpStatus::Success, &p),
        t0,
    );

    let rsp = host.only_sent(MessageType::ConnectTxResponse);
    assert_eq!(rsp.status, AcmpStatus::Success);
    assert_eq!(rsp.pdu.stream_dest_mac, MAAP_BASE);
    assert!(!rsp.pdu.stream_id.is_zero());
    assert_eq!(rsp.pdu.connection_count, 0);
    // only the listener-relevant flags are echoed
    assert!(rsp.pdu.has_flag(flags::STREAMING_WAIT));

    let connect = host
        .connects
        .iter()
        .find(|c| c.direction == StreamDirection::Output)
        .expect("talker stream must come up");
    assert_eq!(connect.dest_mac, MAAP_BASE);
    assert!(talker_connected(&engine));
}

#[test]
fn test_probe_on_wrong_port_is_incompatible() {
    let (mut engine, mut host) = talker_engine();
    let t0 = Instant::now();
    acquire_maap(&mut engine, &mut host, t0);
    submit_on(
        &mut engine,
        &mut host,
        PortId(3),
        wire_frame(
            MessageType::ConnectTxCommand,
            AcmpStatus::Success,
            &probe_pdu(0x0003),
        ),
        t0,
    );
    let rsp = host.only_sent(MessageType::ConnectTxResponse);
    assert_eq!(rsp.status, AcmpStatus::IncompatibleRequest);
    assert!(host.connects.is_empty());
}

#[test]
fn test_probe_window_expiry_withdraws_stream() {
    let (mut engine, mut host) = talker_engine();
    let t0 = Instant::now();
    acquire_maap(&mut engine, &mut host, t0);
    submit_on(
        &mut engine,
        &mut host,
        PORT,
        wire_frame(
            MessageType::ConnectTxCommand,
            AcmpStatus::Success,
            &probe_pdu(0x0004),
        ),
        t0,
    );
    assert!(talker_connected(&engine));

    // no re-probe within the window: the stream is withdrawn, debounced
    engine.poll(&mut host, t0 + Duration::from_millis(15_100));
    assert!(!talker_connected(&engine));
    assert!(talker_withdrawing(&engine));
    assert!(host
        .disconnects
        .iter()
        .any(|d| d.direction == StreamDirection::Output));

    // withdraw period ends without new interest: stays down
    engine.poll(&mut host, t0 + Duration::from_millis(45_200));
    assert!(!talker_withdrawing(&engine));
    assert!(!talker_connected(&engine));
}

#[test]
fn test_registered_listener_outlives_probe_window() {
    let (mut engine, mut host) = talker_engine();
    let t0 = Instant::now();
    acquire_maap(&mut engine, &mut host, t0);
    submit_on(
        &mut engine,
        &mut host,
        PORT,
        wire_frame(
            MessageType::ConnectTxCommand,
            AcmpStatus::Success,
            &probe_pdu(0x0005),
        ),
        t0,
    );
    engine
        .handle()
        .submit(EngineEvent::TalkerSrpStatus {
            entity_id: TALKER,
            stream_index: 0,
            status: SrpListenerStatus::Active,
        })
        .unwrap();
    engine.poll(&mut host, t0);

    engine.poll(&mut host, t0 + Duration::from_millis(15_100));
    assert!(talker_connected(&engine));
    assert!(host.disconnects.is_empty());

    // the listener deregistering is what finally takes it down
    engine
        .handle()
        .submit(EngineEvent::TalkerSrpStatus {
            entity_id: TALKER,
            stream_index: 0,
            status: SrpListenerStatus::NoListener,
        })
        .unwrap();
    engine.poll(&mut host, t0 + Duration::from_millis(15_200));
    assert!(!talker_connected(&engine));
}

#[test]
fn test_maap_conflict_tears_down() {
    let (mut engine, mut host) = talker_engine();
    let t0 = Instant::now();
    acquire_maap(&mut engine, &mut host, t0);
    submit_on(
        &mut engine,
        &mut host,
        PORT,
        wire_frame(
            MessageType::ConnectTxCommand,
            AcmpStatus::Success,
            &probe_pdu(0x0006),
        ),
        t0,
    );
    assert!(talker_connected(&engine));

    engine
        .handle()
        .submit(EngineEvent::MaapConflict {
            entity_id: TALKER,
            port: PORT,
            range_id: maap_range_id(0),
        })
        .unwrap();
    engine.poll(&mut host, t0);
    assert!(!talker_connected(&engine));
    assert!(talker_withdrawing(&engine));
}

#[test]
fn test_get_tx_state_hides_params_until_declared() {
    let (mut engine, mut host) = talker_engine();
    let t0 = Instant::now();
    acquire_maap(&mut engine, &mut host, t0);

    submit_on(
        &mut engine,
        &mut host,
        PORT,
        wire_frame(
            MessageType::GetTxStateCommand,
            AcmpStatus::Success,
            &probe_pdu(0x0007),
        ),
        t0,
    );
    let rsp = host.only_sent(MessageType::GetTxStateResponse);
    assert_eq!(rsp.status, AcmpStatus::Success);
    assert!(rsp.pdu.stream_id.is_zero());
    assert!(rsp.pdu.listener_entity_id.is_zero());
    host.clear_sent();

    engine
        .handle()
        .submit(EngineEvent::TalkerSrpDeclaration {
            entity_id: TALKER,
            stream_index: 0,
            declaration: havb::core::milan::TalkerDeclaration::Advertise,
        })
        .unwrap();
    engine.poll(&mut host, t0);

    submit_on(
        &mut engine,
        &mut host,
        PORT,
        wire_frame(
            MessageType::GetTxStateCommand,
            AcmpStatus::Success,
            &probe_pdu(0x0008),
        ),
        t0,
    );
    let rsp = host.only_sent(MessageType::GetTxStateResponse);
    assert!(!rsp.pdu.stream_id.is_zero());
    assert_eq!(rsp.pdu.stream_dest_mac, MAAP_BASE);
}

#[test]
fn test_get_tx_connection_not_supported() {
    let (mut engine, mut host) = talker_engine();
    let t0 = Instant::now();
    submit_on(
        &mut engine,
        &mut host,
        PORT,
        wire_frame(
            MessageType::GetTxConnectionCommand,
            AcmpStatus::Success,
            &probe_pdu(0x0009),
        ),
        t0,
    );
    let rsp = host.only_sent(MessageType::GetTxConnectionResponse);
    assert_eq!(rsp.status, AcmpStatus::NotSupported);
}

#[test]
fn test_disconnect_tx_always_succeeds() {
    let (mut engine, mut host) = talker_engine();
    let t0 = Instant::now();
    submit_on(
        &mut engine,
        &mut host,
        PORT,
        wire_frame(
            MessageType::DisconnectTxCommand,
            AcmpStatus::Success,
            &probe_pdu(0x000A),
        ),
        t0,
    );
    let rsp = host.only_sent(MessageType::DisconnectTxResponse);
    assert_eq!(rsp.status, AcmpStatus::Success);
}
