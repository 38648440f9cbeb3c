// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Profile-independent ACMP transport helper.
//!
//! Builds and transmits command/response frames, assigns sequence ids, arms
//! in-flight tracking with the profile's timeout, dispatches received
//! frames to the profile state machines and turns in-flight expiry into
//! retries, timeout responses or state-machine events.

use std::time::Instant;

use crate::core::bridge::AcmpHost;
use crate::core::entity::{AcmpContext, Entity, Profile, ProfileState};
use crate::core::ids::PortId;
use crate::core::ieee;
use crate::core::inflight::{ReplyRoute, TimeoutKind};
use crate::core::milan::{self, ListenerEvent};
use crate::error::{AcmpError, AcmpResult};
use crate::protocol::pdu::{self, AcmpFrame, AcmpPdu};
use crate::protocol::{flags, AcmpStatus, MessageType, Role};

/// Encode and transmit one ACMP message on `port`.
fn transmit(
    host: &mut dyn AcmpHost,
    port: PortId,
    msg_type: MessageType,
    status: AcmpStatus,
    p: &AcmpPdu,
) -> AcmpResult<()> {
    let src = host.port_mac(port);
    let frame = pdu::encode_frame(&src, msg_type, status, p)?;
    host.send_frame(port, &frame)
}

/// Send a command and start tracking it.
///
/// Assigns the next sequence id, arms an in-flight entry with the
/// profile-specific timeout, then transmits. A transmit failure rolls the
/// tracking back so no entry outlives a command that never hit the wire.
pub fn send_command(
    acmp: &mut AcmpContext,
    profile: Profile,
    host: &mut dyn AcmpHost,
    port: PortId,
    msg_type: MessageType,
    mut p: AcmpPdu,
    orig_sequence_id: u16,
    reply_route: Option<ReplyRoute>,
    now: Instant,
) -> AcmpResult<u16> {
    p.sequence_id = acmp.next_sequence_id();
    let timeout = profile.command_timeout(msg_type);
    acmp.inflight
        .start(msg_type, p, orig_sequence_id, port, reply_route, now, timeout)?;
    if let Err(e) = transmit(host, port, msg_type, AcmpStatus::Success, &p) {
        let _ = acmp.inflight.cancel(p.sequence_id);
        return Err(e);
    }
    log::debug!(
        "[acmp::send_command] {} seq {} on {}",
        profile.message_type_name(msg_type),
        p.sequence_id,
        port
    );
    Ok(p.sequence_id)
}

/// Retransmit a tracked command verbatim (sequence numbering untouched).
pub fn resend_command(
    host: &mut dyn AcmpHost,
    port: PortId,
    msg_type: MessageType,
    p: &AcmpPdu,
) -> AcmpResult<()> {
    transmit(host, port, msg_type, AcmpStatus::Success, p)
}

/// Response/command template from a received PDU: identity fields only,
/// sequence id copied for responses.
#[must_use]
pub(crate) fn reply_template(p: &AcmpPdu, is_resp: bool) -> AcmpPdu {
    AcmpPdu {
        controller_entity_id: p.controller_entity_id,
        talker_entity_id: p.talker_entity_id,
        listener_entity_id: p.listener_entity_id,
        talker_unique_id: p.talker_unique_id,
        listener_unique_id: p.listener_unique_id,
        sequence_id: if is_resp { p.sequence_id } else { 0 },
        ..AcmpPdu::default()
    }
}

pub(crate) fn log_send_err(tag: &str, r: AcmpResult<()>) {
    if let Err(e) = r {
        log::warn!("[{}] transmit failed: {}", tag, e);
    }
}

/// Send a response immediately; responses are never tracked.
pub fn send_response(
    host: &mut dyn AcmpHost,
    port: PortId,
    msg_type: MessageType,
    status: AcmpStatus,
    p: &AcmpPdu,
) -> AcmpResult<()> {
    transmit(host, port, msg_type, status, p)
}

/// Dispatch a received frame into the owning entity.
///
/// The caller has already matched `entity` against the role-specific
/// entity id of the frame (listener_entity_id, talker_entity_id or
/// controller_entity_id depending on message type).
pub fn dispatch(
    entity: &mut Entity,
    host: &mut dyn AcmpHost,
    frame: &AcmpFrame,
    arrival_port: PortId,
    now: Instant,
) {
    let profile = entity.profile_kind();
    log::debug!(
        "[acmp::dispatch] {} {} status {:?} on {}",
        entity.id,
        profile.message_type_name(frame.message_type),
        frame.status,
        arrival_port
    );
    let Entity {
        id,
        lock,
        acmp,
        profile: state,
    } = entity;
    match frame.message_type.role() {
        Role::Listener => match state {
            ProfileState::Ieee(ieee) => {
                ieee::listener_rcv(ieee, acmp, *id, *lock, host, frame, arrival_port, now);
            }
            ProfileState::Milan(milan) => {
                milan::listener_rcv(milan, acmp, *id, *lock, host, frame, arrival_port, now);
            }
        },
        Role::Talker => match state {
            ProfileState::Ieee(ieee) => {
                ieee::talker_rcv(ieee, acmp, *id, host, frame, arrival_port, now);
            }
            ProfileState::Milan(milan) => {
                milan::talker_rcv(milan, *id, host, frame, arrival_port, now);
            }
        },
        Role::Controller => controller_rcv(acmp, host, frame),
    }
}

/// Correlate a response to a command this entity issued on behalf of a
/// local IPC client, and route the outcome back to that client.
fn controller_rcv(acmp: &mut AcmpContext, host: &mut dyn AcmpHost, frame: &AcmpFrame) {
    match acmp.inflight.cancel(frame.pdu.sequence_id) {
        Some(entry) => {
            if let Some(route) = entry.reply_route {
                host.ipc_response(route, frame.message_type, frame.status, &frame.pdu);
            } else {
                log::debug!(
                    "[acmp::controller_rcv] seq {} had no reply route",
                    frame.pdu.sequence_id
                );
            }
        }
        None => {
            // stale or duplicate response; nothing waits on it
            log::warn!(
                "[acmp::controller_rcv] no inflight entry for seq {} ({:?})",
                frame.pdu.sequence_id,
                frame.message_type
            );
        }
    }
}

/// A locally requested connection-management operation.
#[derive(Debug, Clone, Copy)]
pub struct ControllerRequest {
    pub msg_type: MessageType,
    /// Egress port toward the target entity.
    pub port: PortId,
    pub talker_entity_id: crate::core::ids::EntityId,
    pub talker_unique_id: u16,
    pub listener_entity_id: crate::core::ids::EntityId,
    pub listener_unique_id: u16,
    pub connection_count: u16,
    pub flags: u16,
}

/// Issue a controller command on behalf of a local IPC client.
///
/// Only the five controller-originated command types are accepted.
pub fn controller_command(
    entity: &mut Entity,
    host: &mut dyn AcmpHost,
    req: &ControllerRequest,
    route: ReplyRoute,
    now: Instant,
) -> AcmpResult<()> {
    match req.msg_type {
        MessageType::ConnectRxCommand
        | MessageType::DisconnectRxCommand
        | MessageType::GetRxStateCommand
        | MessageType::GetTxStateCommand
        | MessageType::GetTxConnectionCommand => {}
        other => {
            return Err(AcmpError::BadIpcRequest(format!(
                "message type {:?} is not a controller command",
                other
            )));
        }
    }
    let p = AcmpPdu {
        controller_entity_id: entity.id,
        talker_entity_id: req.talker_entity_id,
        talker_unique_id: req.talker_unique_id,
        listener_entity_id: req.listener_entity_id,
        listener_unique_id: req.listener_unique_id,
        connection_count: req.connection_count,
        flags: req.flags,
        ..AcmpPdu::default()
    };
    let profile = entity.profile_kind();
    send_command(
        &mut entity.acmp,
        profile,
        host,
        req.port,
        req.msg_type,
        p,
        0,
        Some(route),
        now,
    )?;
    Ok(())
}

/// Service in-flight expiry for one entity.
///
/// First expiry of an entry retransmits it (and, under MILAN, also feeds a
/// TMR_NO_RESP event into the listener machine, which treats the first and
/// second timeout differently). Second expiry is terminal: the original
/// requester gets a LISTENER_TALKER_TIMEOUT outcome.
pub fn service_inflight(entity: &mut Entity, host: &mut dyn AcmpHost, now: Instant) {
    let Entity {
        id,
        acmp,
        profile: state,
        ..
    } = entity;
    for expired in acmp.inflight.take_expired(now) {
        let entry = expired.inflight;
        match expired.kind {
            TimeoutKind::Retry => {
                if let (ProfileState::Milan(milan), MessageType::ConnectTxCommand) =
                    (&mut *state, entry.msg_type)
                {
                    milan::listener_event(
                        milan,
                        acmp,
                        *id,
                        host,
                        entry.pdu.listener_unique_id,
                        ListenerEvent::TmrNoResp,
                        now,
                    );
                }
                log::debug!(
                    "[acmp::service_inflight] retry seq {} ({:?})",
                    entry.sequence_id,
                    entry.msg_type
                );
                if let Err(e) = resend_command(host, entry.port, entry.msg_type, &entry.pdu) {
                    log::warn!(
                        "[acmp::service_inflight] retry transmit failed for seq {}: {}",
                        entry.sequence_id,
                        e
                    );
                }
            }
            TimeoutKind::Final => match entry.msg_type {
                MessageType::ConnectTxCommand | MessageType::DisconnectTxCommand => match state {
                    ProfileState::Ieee(_) => {
                        // listener-forwarded command timed out: tell the
                        // controller, unless this was a fast-connect with
                        // no controller waiting
                        if !entry.pdu.has_flag(flags::FAST_CONNECT) {
                            let mut p = entry.pdu;
                            p.sequence_id = entry.orig_sequence_id;
                            let rsp = if entry.msg_type == MessageType::ConnectTxCommand {
                                MessageType::ConnectRxResponse
                            } else {
                                MessageType::DisconnectRxResponse
                            };
                            if let Err(e) = send_response(
                                host,
                                entry.port,
                                rsp,
                                AcmpStatus::ListenerTalkerTimeout,
                                &p,
                            ) {
                                log::warn!(
                                    "[acmp::service_inflight] timeout response failed: {}",
                                    e
                                );
                            }
                        }
                    }
                    ProfileState::Milan(milan) => {
                        milan::listener_event(
                            milan,
                            acmp,
                            *id,
                            host,
                            entry.pdu.listener_unique_id,
                            ListenerEvent::TmrNoResp,
                            now,
                        );
                    }
                },
                _ => {
                    // controller command: fail the waiting IPC client
                    if let Some(route) = entry.reply_route {
                        host.ipc_response(
                            route,
                            entry.msg_type.response(),
                            AcmpStatus::ListenerTalkerTimeout,
                            &entry.pdu,
                        );
                    } else {
                        log::debug!(
                            "[acmp::service_inflight] terminal timeout for untracked requester, seq {}",
                            entry.sequence_id
                        );
                    }
                }
            },
        }
    }
}
