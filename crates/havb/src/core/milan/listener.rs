// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MILAN listener sink state machine (AVNU.IO.CONTROL 8.3.5).
//!
//! All events, network and local, funnel into [`listener_event`]: binding
//! commands, probe responses, timer expiry, ADP discovery edges and SRP
//! registration edges. Transitions re-arm or stop the sink's timers and
//! drive the host's stack connect/disconnect.

use std::time::{Duration, Instant};

use crate::config;
use crate::core::acmp::{self, log_send_err, reply_template};
use crate::core::bridge::{AcmpHost, StreamConnectParams, StreamDirection, StreamDisconnectParams};
use crate::core::descriptors::BindingParams;
use crate::core::entity::{AcmpContext, LockState, Profile};
use crate::core::ids::{EntityId, MacAddr, PortId, StreamId};
use crate::core::milan::{MilanEntityState, MilanListenerSink, ProbingStatus, SinkState, SrpStreamStatus};
use crate::core::timers::{ListenerTimer, probe_delay};
use crate::protocol::pdu::{AcmpFrame, AcmpPdu};
use crate::protocol::{flags, AcmpStatus, MessageType};

/// One input to the listener sink state machine. Network events carry the
/// received PDU and the port to respond on.
#[derive(Debug, Clone, Copy)]
pub enum ListenerEvent<'a> {
    /// BIND_RX_COMMAND received.
    BindCmd(&'a AcmpPdu, PortId),
    /// UNBIND_RX_COMMAND received.
    UnbindCmd(&'a AcmpPdu, PortId),
    /// PROBE_TX_RESPONSE received, with the header status.
    ProbeResponse(&'a AcmpPdu, AcmpStatus),
    /// An outstanding PROBE_TX expired once (retransmit) or twice (final).
    TmrNoResp,
    /// Pre-probe randomized delay elapsed.
    TmrDelay,
    /// Post-failure retry period elapsed.
    TmrRetry,
    /// No SRP talker attribute appeared while settled.
    TmrNoTalker,
    /// ADP discovered the bound talker.
    TalkerDiscovered,
    /// ADP lost the bound talker.
    TalkerDeparted,
    /// SRP registered the talker attribute for the settled stream.
    TalkerRegistered,
    /// SRP dropped the talker attribute for the settled stream.
    TalkerUnregistered,
    /// Binding parameters restored from persistent storage.
    SavedBinding,
}

impl ListenerEvent<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::BindCmd(..) => "BIND_RX_COMMAND",
            Self::UnbindCmd(..) => "UNBIND_RX_COMMAND",
            Self::ProbeResponse(..) => "PROBE_TX_RESPONSE",
            Self::TmrNoResp => "TMR_NO_RESP",
            Self::TmrDelay => "TMR_DELAY",
            Self::TmrRetry => "TMR_RETRY",
            Self::TmrNoTalker => "TMR_NO_TK",
            Self::TalkerDiscovered => "TK_DISCOVERED",
            Self::TalkerDeparted => "TK_DEPARTED",
            Self::TalkerRegistered => "TK_REGISTERED",
            Self::TalkerUnregistered => "TK_UNREGISTERED",
            Self::SavedBinding => "SAVED_BINDING_PARAMS",
        }
    }
}

/// MILAN listener receive: map the frame onto a sink event.
#[allow(clippy::too_many_arguments)]
pub fn listener_rcv(
    milan: &mut MilanEntityState,
    acmp: &mut AcmpContext,
    entity_id: EntityId,
    lock: LockState,
    host: &mut dyn AcmpHost,
    frame: &AcmpFrame,
    arrival_port: PortId,
    now: Instant,
) {
    let p = &frame.pdu;
    let index = p.listener_unique_id;

    if milan.listeners.get(usize::from(index)).is_none() {
        if !frame.message_type.is_response() {
            log_send_err(
                "milan::listener_rcv",
                acmp::send_response(
                    host,
                    arrival_port,
                    frame.message_type.response(),
                    AcmpStatus::ListenerUnknownId,
                    &reply_template(p, true),
                ),
            );
        }
        return;
    }

    let event = match frame.message_type {
        MessageType::ConnectRxCommand => ListenerEvent::BindCmd(p, arrival_port),
        MessageType::DisconnectRxCommand => ListenerEvent::UnbindCmd(p, arrival_port),
        MessageType::GetRxStateCommand => {
            // state query; answered directly, no transition
            let sink = &mut milan.listeners[usize::from(index)];
            send_get_rx_state_response(host, arrival_port, p, sink);
            return;
        }
        MessageType::ConnectTxResponse => ListenerEvent::ProbeResponse(p, frame.status),
        other => {
            log::warn!(
                "[milan::listener_rcv] unexpected message type {}",
                other.milan_name()
            );
            return;
        }
    };

    // a binding command from anyone but the lock owner is rejected
    if matches!(
        event,
        ListenerEvent::BindCmd(..) | ListenerEvent::UnbindCmd(..)
    ) {
        let locked = match lock {
            LockState::Unlocked => false,
            LockState::LockedBy(owner) => owner != p.controller_entity_id,
        };
        if locked {
            log::info!(
                "[milan::listener_rcv] {} sink {}: entity locked, rejecting {}",
                entity_id,
                index,
                frame.message_type.milan_name()
            );
            log_send_err(
                "milan::listener_rcv",
                acmp::send_response(
                    host,
                    arrival_port,
                    frame.message_type.response(),
                    AcmpStatus::ControllerNotAuthorized,
                    &reply_template(p, true),
                ),
            );
            return;
        }
    }

    listener_event(milan, acmp, entity_id, host, index, event, now);
}

/// Binding parameters restored from the host's persistent storage; starts
/// the sink in passive probing (8.3.5.2).
#[allow(clippy::too_many_arguments)]
pub fn listener_saved_binding(
    milan: &mut MilanEntityState,
    acmp: &mut AcmpContext,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    stream_index: u16,
    params: BindingParams,
    now: Instant,
) {
    if params.controller_id.is_zero() || params.talker_id.is_zero() {
        log::warn!(
            "[milan::listener_saved_binding] sink {}: incomplete saved binding, ignored",
            stream_index
        );
        return;
    }
    let Some(sink) = milan.listeners.get_mut(usize::from(stream_index)) else {
        log::warn!("[milan::listener_saved_binding] no sink {}", stream_index);
        return;
    };
    sink.binding = params;
    listener_event(
        milan,
        acmp,
        entity_id,
        host,
        stream_index,
        ListenerEvent::SavedBinding,
        now,
    );
}

/// SRP listener registration update for a sink.
///
/// Only settled sinks care, and a talker attribute (advertise or failed)
/// must match the settled stream's id, destination MAC and VLAN exactly.
/// Edges of the registration state feed TK_REGISTERED / TK_UNREGISTERED
/// into the state machine.
#[allow(clippy::too_many_arguments)]
pub fn listener_srp_status(
    milan: &mut MilanEntityState,
    acmp: &mut AcmpContext,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    stream_index: u16,
    status: SrpStreamStatus,
    stream_id: StreamId,
    dest_mac: MacAddr,
    vlan_id: u16,
    now: Instant,
) {
    let Some(sink) = milan.listeners.get_mut(usize::from(stream_index)) else {
        log::warn!("[milan::listener_srp_status] no sink {}", stream_index);
        return;
    };
    if !sink.state.is_settled() {
        return;
    }
    if status != SrpStreamStatus::NoTalker && !sink.srp.matches(stream_id, &dest_mac, vlan_id) {
        return;
    }

    sink.srp_stream_status = status;

    let edge = match (sink.srp_registering, status) {
        (false, SrpStreamStatus::Active | SrpStreamStatus::Failed) => {
            sink.srp_registering = true;
            Some(ListenerEvent::TalkerRegistered)
        }
        (true, SrpStreamStatus::NoTalker) => {
            sink.srp_registering = false;
            Some(ListenerEvent::TalkerUnregistered)
        }
        _ => None,
    };
    sink.timers.arm_notify(now);

    if let Some(event) = edge {
        listener_event(milan, acmp, entity_id, host, stream_index, event, now);
    }
}

/// The listener sink state machine proper.
pub fn listener_event(
    milan: &mut MilanEntityState,
    acmp: &mut AcmpContext,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    stream_index: u16,
    event: ListenerEvent<'_>,
    now: Instant,
) {
    let idx = usize::from(stream_index);

    // one talker stream cannot feed two local sinks
    let exclusive = match event {
        ListenerEvent::BindCmd(p, _) => milan
            .listeners
            .iter()
            .enumerate()
            .any(|(j, s)| j != idx && s.binding.same_talker(p.talker_entity_id, p.talker_unique_id)),
        _ => false,
    };

    let Some(sink) = milan.listeners.get_mut(idx) else {
        log::warn!(
            "[milan::listener_event] event {} for unknown sink {}",
            event.name(),
            stream_index
        );
        return;
    };

    match event {
        ListenerEvent::TalkerDiscovered => sink.talker_discovered = true,
        ListenerEvent::TalkerDeparted => sink.talker_discovered = false,
        _ => {}
    }

    if let ListenerEvent::BindCmd(p, port) = event {
        if exclusive {
            log_send_err(
                "milan::listener_event",
                acmp::send_response(
                    host,
                    port,
                    MessageType::ConnectRxResponse,
                    AcmpStatus::TalkerExclusive,
                    &reply_template(p, true),
                ),
            );
            return;
        }
    }

    let prev = sink.state;
    let next = match prev {
        SinkState::Unbound => match event {
            ListenerEvent::BindCmd(p, port) => {
                apply_bind(sink, acmp, entity_id, host, stream_index, p, port, now);
                host.watch_talker(entity_id, stream_index, sink.binding.talker_id);
                SinkState::PrbWResp
            }
            ListenerEvent::UnbindCmd(p, port) => {
                apply_unbind(sink, entity_id, host, stream_index, p, port, now);
                SinkState::Unbound
            }
            ListenerEvent::SavedBinding => {
                host.watch_talker(entity_id, stream_index, sink.binding.talker_id);
                sink.probing = ProbingStatus::Passive;
                sink.acmp_status = AcmpStatus::Success;
                SinkState::PrbWAvail
            }
            other => invalid(entity_id, stream_index, prev, &other),
        },

        SinkState::PrbWAvail => match event {
            ListenerEvent::BindCmd(p, port) => {
                let restart = binding_restart(sink, p);
                apply_bind(sink, acmp, entity_id, host, stream_index, p, port, now);
                if restart {
                    host.watch_talker(entity_id, stream_index, sink.binding.talker_id);
                    SinkState::PrbWResp
                } else {
                    prev
                }
            }
            ListenerEvent::UnbindCmd(p, port) => {
                apply_unbind(sink, entity_id, host, stream_index, p, port, now);
                SinkState::Unbound
            }
            ListenerEvent::TalkerDiscovered => {
                sink.timers.arm(ListenerTimer::Delay, now, probe_delay());
                sink.probing = ProbingStatus::Active;
                sink.acmp_status = AcmpStatus::Success;
                SinkState::PrbWDelay
            }
            ListenerEvent::TalkerDeparted | ListenerEvent::SavedBinding => prev,
            other => invalid(entity_id, stream_index, prev, &other),
        },

        SinkState::PrbWDelay => match event {
            ListenerEvent::TmrDelay => {
                send_probe(sink, acmp, entity_id, host, stream_index, now);
                SinkState::PrbWResp
            }
            ListenerEvent::BindCmd(p, port) => {
                let restart = binding_restart(sink, p);
                apply_bind(sink, acmp, entity_id, host, stream_index, p, port, now);
                if restart {
                    sink.timers.stop(ListenerTimer::Delay);
                    host.watch_talker(entity_id, stream_index, sink.binding.talker_id);
                    SinkState::PrbWResp
                } else {
                    prev
                }
            }
            ListenerEvent::UnbindCmd(p, port) => {
                apply_unbind(sink, entity_id, host, stream_index, p, port, now);
                SinkState::Unbound
            }
            ListenerEvent::TalkerDeparted => {
                sink.timers.stop(ListenerTimer::Delay);
                sink.probing = ProbingStatus::Passive;
                sink.acmp_status = AcmpStatus::Success;
                SinkState::PrbWAvail
            }
            ListenerEvent::TalkerDiscovered | ListenerEvent::SavedBinding => prev,
            other => invalid(entity_id, stream_index, prev, &other),
        },

        SinkState::PrbWResp | SinkState::PrbWResp2 => match event {
            ListenerEvent::TmrNoResp => {
                if prev == SinkState::PrbWResp {
                    // the inflight tracker retransmits; just mark the
                    // second attempt
                    SinkState::PrbWResp2
                } else {
                    sink.timers.arm(
                        ListenerTimer::Retry,
                        now,
                        Duration::from_millis(config::MILAN_TMR_RETRY_MS),
                    );
                    sink.acmp_status = AcmpStatus::ListenerTalkerTimeout;
                    SinkState::PrbWRetry
                }
            }
            ListenerEvent::ProbeResponse(p, status) => {
                if acmp.inflight.cancel(p.sequence_id).is_none() {
                    log::warn!(
                        "[milan::listener_event] sink {}: no inflight probe with seq {}",
                        stream_index,
                        p.sequence_id
                    );
                    return;
                }
                if status.is_success() {
                    sink.srp.stream_id = p.stream_id;
                    sink.srp.dest_mac = p.stream_dest_mac;
                    sink.srp.vlan_id = p.stream_vlan_id;
                    sink.timers.arm_notify(now);
                    stack_connect(entity_id, stream_index, sink, host, p.flags);
                    sink.timers.arm(
                        ListenerTimer::NoTalker,
                        now,
                        Duration::from_millis(config::MILAN_TMR_NO_TK_MS),
                    );
                    sink.probing = ProbingStatus::Completed;
                    sink.acmp_status = AcmpStatus::Success;
                    SinkState::SettledNoRsv
                } else {
                    sink.acmp_status = status;
                    sink.timers.arm(
                        ListenerTimer::Retry,
                        now,
                        Duration::from_millis(config::MILAN_TMR_RETRY_MS),
                    );
                    SinkState::PrbWRetry
                }
            }
            ListenerEvent::BindCmd(p, port) => {
                let restart = binding_restart(sink, p);
                if restart {
                    cancel_probe(sink, acmp, stream_index);
                }
                apply_bind(sink, acmp, entity_id, host, stream_index, p, port, now);
                if restart {
                    host.watch_talker(entity_id, stream_index, sink.binding.talker_id);
                    SinkState::PrbWResp
                } else {
                    prev
                }
            }
            ListenerEvent::UnbindCmd(p, port) => {
                cancel_probe(sink, acmp, stream_index);
                apply_unbind(sink, entity_id, host, stream_index, p, port, now);
                SinkState::Unbound
            }
            ListenerEvent::TalkerDeparted => {
                cancel_probe(sink, acmp, stream_index);
                sink.probing = ProbingStatus::Passive;
                sink.acmp_status = AcmpStatus::Success;
                SinkState::PrbWAvail
            }
            ListenerEvent::TalkerDiscovered | ListenerEvent::SavedBinding => prev,
            other => invalid(entity_id, stream_index, prev, &other),
        },

        SinkState::PrbWRetry => match event {
            ListenerEvent::TmrRetry => {
                if sink.talker_discovered {
                    sink.timers.arm(ListenerTimer::Delay, now, probe_delay());
                    SinkState::PrbWDelay
                } else {
                    sink.probing = ProbingStatus::Passive;
                    sink.acmp_status = AcmpStatus::Success;
                    SinkState::PrbWAvail
                }
            }
            ListenerEvent::BindCmd(p, port) => {
                let restart = binding_restart(sink, p);
                apply_bind(sink, acmp, entity_id, host, stream_index, p, port, now);
                if restart {
                    sink.timers.stop(ListenerTimer::Retry);
                    host.watch_talker(entity_id, stream_index, sink.binding.talker_id);
                    SinkState::PrbWResp
                } else {
                    prev
                }
            }
            ListenerEvent::UnbindCmd(p, port) => {
                apply_unbind(sink, entity_id, host, stream_index, p, port, now);
                SinkState::Unbound
            }
            ListenerEvent::TalkerDeparted => {
                sink.timers.stop(ListenerTimer::Retry);
                sink.probing = ProbingStatus::Passive;
                sink.acmp_status = AcmpStatus::Success;
                SinkState::PrbWAvail
            }
            ListenerEvent::TalkerDiscovered | ListenerEvent::SavedBinding => prev,
            other => invalid(entity_id, stream_index, prev, &other),
        },

        SinkState::SettledNoRsv => match event {
            ListenerEvent::TmrNoTalker => {
                stack_disconnect(entity_id, stream_index, sink, host);
                srp_clear(sink, now);
                if sink.talker_discovered {
                    sink.probing = ProbingStatus::Active;
                    sink.acmp_status = AcmpStatus::Success;
                    sink.timers.arm(ListenerTimer::Delay, now, probe_delay());
                    SinkState::PrbWDelay
                } else {
                    sink.probing = ProbingStatus::Passive;
                    sink.acmp_status = AcmpStatus::Success;
                    SinkState::PrbWAvail
                }
            }
            ListenerEvent::BindCmd(p, port) => {
                let restart = binding_restart(sink, p);
                apply_bind(sink, acmp, entity_id, host, stream_index, p, port, now);
                if restart {
                    stack_disconnect(entity_id, stream_index, sink, host);
                    srp_clear(sink, now);
                    sink.timers.stop(ListenerTimer::NoTalker);
                    host.watch_talker(entity_id, stream_index, sink.binding.talker_id);
                    SinkState::PrbWResp
                } else {
                    prev
                }
            }
            ListenerEvent::UnbindCmd(p, port) => {
                stack_disconnect(entity_id, stream_index, sink, host);
                srp_clear(sink, now);
                apply_unbind(sink, entity_id, host, stream_index, p, port, now);
                SinkState::Unbound
            }
            ListenerEvent::TalkerRegistered => {
                sink.timers.stop(ListenerTimer::NoTalker);
                SinkState::SettledRsvOk
            }
            ListenerEvent::TalkerDiscovered
            | ListenerEvent::TalkerDeparted
            | ListenerEvent::SavedBinding => prev,
            other => invalid(entity_id, stream_index, prev, &other),
        },

        SinkState::SettledRsvOk => match event {
            ListenerEvent::BindCmd(p, port) => {
                let restart = binding_restart(sink, p);
                apply_bind(sink, acmp, entity_id, host, stream_index, p, port, now);
                if restart {
                    stack_disconnect(entity_id, stream_index, sink, host);
                    srp_clear(sink, now);
                    host.watch_talker(entity_id, stream_index, sink.binding.talker_id);
                    SinkState::PrbWResp
                } else {
                    prev
                }
            }
            ListenerEvent::UnbindCmd(p, port) => {
                stack_disconnect(entity_id, stream_index, sink, host);
                srp_clear(sink, now);
                apply_unbind(sink, entity_id, host, stream_index, p, port, now);
                SinkState::Unbound
            }
            ListenerEvent::TalkerUnregistered => {
                stack_disconnect(entity_id, stream_index, sink, host);
                srp_clear(sink, now);
                if sink.talker_discovered {
                    sink.probing = ProbingStatus::Active;
                    sink.acmp_status = AcmpStatus::Success;
                    sink.timers.arm(ListenerTimer::Delay, now, probe_delay());
                    SinkState::PrbWDelay
                } else {
                    sink.probing = ProbingStatus::Passive;
                    sink.acmp_status = AcmpStatus::Success;
                    SinkState::PrbWAvail
                }
            }
            ListenerEvent::TalkerDiscovered
            | ListenerEvent::TalkerDeparted
            | ListenerEvent::SavedBinding => prev,
            other => invalid(entity_id, stream_index, prev, &other),
        },
    };

    if next != prev {
        log::debug!(
            "[milan::listener_event] {} sink {}: {} moved {:?} -> {:?}",
            entity_id,
            stream_index,
            event.name(),
            prev,
            next
        );
    }
    sink.state = next;
}

fn invalid(
    entity_id: EntityId,
    stream_index: u16,
    state: SinkState,
    event: &ListenerEvent<'_>,
) -> SinkState {
    log::warn!(
        "[milan::listener_event] {} sink {} state {:?}: invalid event {}",
        entity_id,
        stream_index,
        state,
        event.name()
    );
    state
}

/// Per AVNU.IO.CONTROL corrigendum 1: a bind restarts the probing process
/// only when it names a different talker than the current binding.
fn binding_restart(sink: &MilanListenerSink, p: &AcmpPdu) -> bool {
    !sink.binding.same_talker(p.talker_entity_id, p.talker_unique_id)
}

/// Accept a BIND_RX_COMMAND: save the binding, respond, and on a talker
/// change kick off a fresh probe.
#[allow(clippy::too_many_arguments)]
fn apply_bind(
    sink: &mut MilanListenerSink,
    acmp: &mut AcmpContext,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    stream_index: u16,
    p: &AcmpPdu,
    port: PortId,
    now: Instant,
) {
    let restart = binding_restart(sink, p);
    let streaming_wait = p.has_flag(flags::STREAMING_WAIT);
    let streaming_changed = sink.binding.streaming_wait != streaming_wait;
    let controller_changed = sink.binding.controller_id != p.controller_entity_id;

    sink.binding = BindingParams {
        controller_id: p.controller_entity_id,
        talker_id: p.talker_entity_id,
        talker_unique_id: p.talker_unique_id,
        streaming_wait,
    };

    let mut rsp = reply_template(p, true);
    rsp.flags = p.flags & flags::STREAMING_WAIT;
    rsp.connection_count = 1;
    log_send_err(
        "milan::apply_bind",
        acmp::send_response(
            host,
            port,
            MessageType::ConnectRxResponse,
            AcmpStatus::Success,
            &rsp,
        ),
    );

    if restart {
        send_probe(sink, acmp, entity_id, host, stream_index, now);
        sink.probing = ProbingStatus::Active;
        sink.acmp_status = AcmpStatus::Success;
    }

    if restart || streaming_changed || controller_changed {
        host.binding_changed(entity_id, stream_index, Some(&sink.binding));
    }
    if streaming_changed || controller_changed {
        sink.timers.arm_notify(now);
    }
}

/// Accept an UNBIND_RX_COMMAND: clear the binding and respond.
fn apply_unbind(
    sink: &mut MilanListenerSink,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    stream_index: u16,
    p: &AcmpPdu,
    port: PortId,
    now: Instant,
) {
    sink.binding.clear();
    sink.probing = ProbingStatus::Disabled;
    sink.acmp_status = AcmpStatus::Success;
    sink.timers.stop_phase_timers();

    let mut rsp = reply_template(p, true);
    copy_common_params(&mut rsp, sink);
    rsp.connection_count = 0;
    log_send_err(
        "milan::apply_unbind",
        acmp::send_response(
            host,
            port,
            MessageType::DisconnectRxResponse,
            AcmpStatus::Success,
            &rsp,
        ),
    );

    host.binding_changed(entity_id, stream_index, None);
    host.unwatch_talker(entity_id, stream_index);
    sink.timers.arm_notify(now);
}

/// Issue a PROBE_TX_COMMAND toward the bound talker, remembering the
/// sequence id so a later bind/unbind can drop the tracking.
fn send_probe(
    sink: &mut MilanListenerSink,
    acmp: &mut AcmpContext,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    stream_index: u16,
    now: Instant,
) {
    let p = AcmpPdu {
        controller_entity_id: sink.binding.controller_id,
        talker_entity_id: sink.binding.talker_id,
        talker_unique_id: sink.binding.talker_unique_id,
        listener_entity_id: entity_id,
        listener_unique_id: stream_index,
        ..AcmpPdu::default()
    };
    match acmp::send_command(
        acmp,
        Profile::Milan,
        host,
        sink.cfg.port,
        MessageType::ConnectTxCommand,
        p,
        0,
        None,
        now,
    ) {
        Ok(seq) => sink.probe_seq_id = seq,
        Err(e) => log::warn!(
            "[milan::send_probe] sink {}: probe send failed: {}",
            stream_index,
            e
        ),
    }
}

fn cancel_probe(sink: &MilanListenerSink, acmp: &mut AcmpContext, stream_index: u16) {
    if acmp.inflight.cancel(sink.probe_seq_id).is_none() {
        log::warn!(
            "[milan::cancel_probe] sink {}: no inflight probe with seq {}",
            stream_index,
            sink.probe_seq_id
        );
    }
}

/// Fill a response with the sink's stream and binding parameters.
fn copy_common_params(p: &mut AcmpPdu, sink: &MilanListenerSink) {
    p.stream_id = sink.srp.stream_id;
    p.talker_entity_id = sink.binding.talker_id;
    p.talker_unique_id = sink.binding.talker_unique_id;
    p.stream_dest_mac = sink.srp.dest_mac;
    p.stream_vlan_id = sink.srp.vlan_id;
    p.flags = if sink.binding.streaming_wait {
        flags::STREAMING_WAIT
    } else {
        0
    };
}

fn send_get_rx_state_response(
    host: &mut dyn AcmpHost,
    port: PortId,
    p: &AcmpPdu,
    sink: &MilanListenerSink,
) {
    let mut rsp = reply_template(p, true);
    copy_common_params(&mut rsp, sink);
    if sink.is_bound() {
        rsp.connection_count = 1;
        rsp.flags |= flags::FAST_CONNECT;
    } else {
        rsp.connection_count = 0;
    }
    if sink.state == SinkState::SettledRsvOk && sink.srp_stream_status == SrpStreamStatus::Failed {
        rsp.flags |= flags::REGISTERING_FAILED;
    }
    log_send_err(
        "milan::send_get_rx_state_response",
        acmp::send_response(
            host,
            port,
            MessageType::GetRxStateResponse,
            AcmpStatus::Success,
            &rsp,
        ),
    );
}

pub(super) fn stack_connect(
    entity_id: EntityId,
    stream_index: u16,
    sink: &MilanListenerSink,
    host: &mut dyn AcmpHost,
    pdu_flags: u16,
) {
    host.stack_connect(&StreamConnectParams {
        entity_id,
        direction: StreamDirection::Input,
        stream_index,
        port: sink.cfg.port,
        stream_id: sink.srp.stream_id,
        dest_mac: sink.srp.dest_mac,
        vlan_id: sink.srp.vlan_id,
        class: sink.cfg.class_for_flags(pdu_flags),
        clock_domain_index: sink.cfg.clock_domain_index,
    });
}

pub(super) fn stack_disconnect(
    entity_id: EntityId,
    stream_index: u16,
    sink: &MilanListenerSink,
    host: &mut dyn AcmpHost,
) {
    host.stack_disconnect(&StreamDisconnectParams {
        entity_id,
        direction: StreamDirection::Input,
        stream_index,
        port: sink.cfg.port,
        stream_id: sink.srp.stream_id,
    });
}

/// Clear the settled stream's SRP parameters and registration tracking.
fn srp_clear(sink: &mut MilanListenerSink, now: Instant) {
    sink.srp.clear();
    sink.srp_registering = false;
    sink.srp_stream_status = SrpStreamStatus::NoTalker;
    sink.timers.arm_notify(now);
}
