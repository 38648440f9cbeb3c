// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MILAN talker source handling (AVNU.IO.CONTROL 8.3.6).
//!
//! The talker has no binding state machine; its SRP talker declaration is
//! a pure function of the stream parameters at hand (a MAAP address plus
//! either a recent probe or a registered listener). Every input that can
//! change those parameters funnels through [`update`].

use std::time::{Duration, Instant};

use crate::config;
use crate::core::acmp::{self, log_send_err, reply_template};
use crate::core::bridge::{AcmpHost, SrClass, StreamConnectParams, StreamDirection, StreamDisconnectParams};
use crate::core::ids::{EntityId, MacAddr, PortId};
use crate::core::milan::{
    maap_stream_index, MilanEntityState, MilanTalkerSource, SrpListenerStatus, TalkerDeclaration,
};
use crate::core::timers::TalkerTimer;
use crate::protocol::pdu::AcmpFrame;
use crate::protocol::{flags, AcmpStatus, MessageType};

/// MILAN talker receive: PROBE_TX, state queries, and the DISCONNECT_TX
/// kept for IEEE interoperability.
pub fn talker_rcv(
    milan: &mut MilanEntityState,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    frame: &AcmpFrame,
    arrival_port: PortId,
    now: Instant,
) {
    let p = &frame.pdu;
    let index = p.talker_unique_id;

    let Some(talker) = milan.talkers.get_mut(usize::from(index)) else {
        // the aggregate connection query has no MILAN answer at all
        if !frame.message_type.is_response()
            && frame.message_type != MessageType::GetTxConnectionCommand
        {
            log_send_err(
                "milan::talker_rcv",
                acmp::send_response(
                    host,
                    arrival_port,
                    frame.message_type.response(),
                    AcmpStatus::TalkerUnknownId,
                    &reply_template(p, true),
                ),
            );
        }
        return;
    };

    match frame.message_type {
        MessageType::ConnectTxCommand => {
            if arrival_port != talker.cfg.port {
                log::warn!(
                    "[milan::talker_rcv] {} stream {}: PROBE_TX on {}, stream lives on {}",
                    entity_id,
                    index,
                    arrival_port,
                    talker.cfg.port
                );
                log_send_err(
                    "milan::talker_rcv",
                    acmp::send_response(
                        host,
                        arrival_port,
                        MessageType::ConnectTxResponse,
                        AcmpStatus::IncompatibleRequest,
                        &reply_template(p, true),
                    ),
                );
                return;
            }

            talker.timers.arm(
                TalkerTimer::ProbeWindow,
                now,
                Duration::from_millis(config::MILAN_TALKER_PROBE_WINDOW_MS),
            );
            talker.probe_valid = true;

            if !talker.has_valid_srp_params() {
                // no MAAP address yet; the listener will retry
                log_send_err(
                    "milan::talker_rcv",
                    acmp::send_response(
                        host,
                        arrival_port,
                        MessageType::ConnectTxResponse,
                        AcmpStatus::TalkerDestMacFail,
                        &reply_template(p, true),
                    ),
                );
                return;
            }

            let status = update(entity_id, index, talker, host, now);
            let mut rsp = reply_template(p, true);
            rsp.flags = p.flags & (flags::STREAMING_WAIT | flags::FAST_CONNECT);
            rsp.connection_count = 0;
            rsp.stream_id = talker.stream_id;
            rsp.stream_dest_mac = talker.dest_mac;
            rsp.stream_vlan_id = talker.vlan_id;
            log_send_err(
                "milan::talker_rcv",
                acmp::send_response(host, arrival_port, MessageType::ConnectTxResponse, status, &rsp),
            );
        }

        MessageType::DisconnectTxCommand => {
            // MILAN talkers track listeners through SRP, not counts
            log_send_err(
                "milan::talker_rcv",
                acmp::send_response(
                    host,
                    arrival_port,
                    MessageType::DisconnectTxResponse,
                    AcmpStatus::Success,
                    &reply_template(p, true),
                ),
            );
        }

        MessageType::GetTxStateCommand => {
            let mut rsp = reply_template(p, true);
            rsp.listener_entity_id = EntityId::ZERO;
            rsp.listener_unique_id = 0;
            if talker.declaration != TalkerDeclaration::None {
                rsp.stream_id = talker.stream_id;
                rsp.stream_dest_mac = talker.dest_mac;
                rsp.stream_vlan_id = talker.vlan_id;
            }
            if talker.listener_status == SrpListenerStatus::Failed {
                rsp.flags |= flags::REGISTERING_FAILED;
            }
            log_send_err(
                "milan::talker_rcv",
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
            log_send_err(
                "milan::talker_rcv",
                acmp::send_response(
                    host,
                    arrival_port,
                    MessageType::GetTxConnectionResponse,
                    AcmpStatus::NotSupported,
                    &reply_template(p, true),
                ),
            );
        }

        other => {
            log::warn!(
                "[milan::talker_rcv] unexpected message type {}",
                other.milan_name()
            );
        }
    }
}

/// MAAP allocation succeeded (or survived a re-probe) for a range.
pub fn maap_valid(
    milan: &mut MilanEntityState,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    port: PortId,
    range_id: u32,
    base: MacAddr,
    now: Instant,
) {
    let Some(index) = maap_stream_index(range_id, milan.talkers.len()) else {
        log::warn!("[milan::maap_valid] unknown MAAP range {}", range_id);
        return;
    };
    let talker = &mut milan.talkers[usize::from(index)];
    if port != talker.cfg.port {
        log::warn!(
            "[milan::maap_valid] range {} acquired on {}, stream lives on {}",
            range_id,
            port,
            talker.cfg.port
        );
        return;
    }
    log::info!(
        "[milan::maap_valid] {} stream {}: destination {}",
        entity_id,
        index,
        base
    );
    talker.dest_mac = base;
    update(entity_id, index, talker, host, now);
    talker.timers.arm_notify(now);
}

/// MAAP lost the range to a conflicting claimant; drop the address and
/// withdraw until a new one is acquired.
pub fn maap_conflict(
    milan: &mut MilanEntityState,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    port: PortId,
    range_id: u32,
    now: Instant,
) {
    let Some(index) = maap_stream_index(range_id, milan.talkers.len()) else {
        log::warn!("[milan::maap_conflict] unknown MAAP range {}", range_id);
        return;
    };
    let talker = &mut milan.talkers[usize::from(index)];
    if port != talker.cfg.port {
        return;
    }
    log::warn!(
        "[milan::maap_conflict] {} stream {}: destination lost",
        entity_id,
        index
    );
    talker.dest_mac = MacAddr::ZERO;
    update(entity_id, index, talker, host, now);
    talker.timers.arm_notify(now);
}

/// Local SRP layer reported the talker attribute declared or failed.
pub fn talker_declaration(
    milan: &mut MilanEntityState,
    stream_index: u16,
    declaration: TalkerDeclaration,
    now: Instant,
) {
    let Some(talker) = milan.talkers.get_mut(usize::from(stream_index)) else {
        log::warn!("[milan::talker_declaration] no stream {}", stream_index);
        return;
    };
    if talker.declaration != declaration {
        talker.declaration = declaration;
        talker.timers.arm_notify(now);
    }
}

/// SRP listener registration update for a talker stream.
pub fn talker_srp_status(
    milan: &mut MilanEntityState,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    stream_index: u16,
    status: SrpListenerStatus,
    now: Instant,
) {
    let Some(talker) = milan.talkers.get_mut(usize::from(stream_index)) else {
        log::warn!("[milan::talker_srp_status] no stream {}", stream_index);
        return;
    };
    if talker.listener_status == status {
        return;
    }
    talker.listener_status = status;
    update(entity_id, stream_index, talker, host, now);
    talker.timers.arm_notify(now);
}

/// Recompute the stream declaration from the current parameters.
///
/// Without valid parameters the stream is withdrawn; the withdraw debounce
/// keeps it down for two SRP LeaveAll periods so peers observe the edge.
pub(super) fn update(
    entity_id: EntityId,
    stream_index: u16,
    talker: &mut MilanTalkerSource,
    host: &mut dyn AcmpHost,
    now: Instant,
) -> AcmpStatus {
    if !talker.has_valid_srp_params() {
        stack_disconnect(entity_id, stream_index, talker, host, true, now);
        AcmpStatus::TalkerDestMacFail
    } else if !talker.withdraw_in_progress {
        stack_connect(entity_id, stream_index, talker, host);
        AcmpStatus::Success
    } else {
        AcmpStatus::Success
    }
}

pub(super) fn stack_connect(
    entity_id: EntityId,
    stream_index: u16,
    talker: &mut MilanTalkerSource,
    host: &mut dyn AcmpHost,
) {
    if talker.connected {
        return;
    }
    host.stack_connect(&StreamConnectParams {
        entity_id,
        direction: StreamDirection::Output,
        stream_index,
        port: talker.cfg.port,
        stream_id: talker.stream_id,
        dest_mac: talker.dest_mac,
        vlan_id: talker.vlan_id,
        class: SrClass::A,
        clock_domain_index: talker.cfg.clock_domain_index,
    });
    talker.connected = true;
}

pub(super) fn stack_disconnect(
    entity_id: EntityId,
    stream_index: u16,
    talker: &mut MilanTalkerSource,
    host: &mut dyn AcmpHost,
    perform_withdraw: bool,
    now: Instant,
) {
    if !talker.connected {
        return;
    }
    host.stack_disconnect(&StreamDisconnectParams {
        entity_id,
        direction: StreamDirection::Output,
        stream_index,
        port: talker.cfg.port,
        stream_id: talker.stream_id,
    });
    talker.connected = false;
    if perform_withdraw {
        talker.withdraw_in_progress = true;
        talker.timers.arm(
            TalkerTimer::Withdraw,
            now,
            Duration::from_millis(config::MILAN_TALKER_WITHDRAW_MS),
        );
    }
}
