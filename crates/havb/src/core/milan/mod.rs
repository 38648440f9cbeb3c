// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MILAN (AVNU.IO.CONTROL) connection state machines.
//!
//! A MILAN listener sink moves through an eight-state binding/probing
//! machine (8.3.5):
//!
//! ```text
//!   UNBOUND --bind--> PRB_W_RESP --resp ok--> SETTLED_NO_RSV --srp--> SETTLED_RSV_OK
//!      ^                  | timeouts              | TMR_NO_TK
//!      |                  v                       v
//!      +-unbind--- PRB_W_RETRY <---> PRB_W_DELAY <---> PRB_W_AVAIL
//! ```
//!
//! A MILAN talker declares its SRP attribute whenever it holds a valid
//! MAAP destination address and has seen a PROBE_TX in the last probe
//! window or still registers a listener attribute; teardown is debounced
//! by a withdraw timer.

mod listener;
mod talker;

pub use listener::{
    listener_event, listener_rcv, listener_saved_binding, listener_srp_status, ListenerEvent,
};
pub use talker::{maap_conflict, maap_valid, talker_declaration, talker_rcv, talker_srp_status};

use std::time::Instant;

use crate::config;
use crate::core::bridge::{AcmpHost, StreamDirection};
use crate::core::descriptors::{
    BindingParams, SrpStreamParams, StreamInputConfig, StreamOutputConfig,
};
use crate::core::entity::AcmpContext;
use crate::core::ids::{EntityId, MacAddr, StreamId};
use crate::core::timers::{ListenerTimer, ListenerTimers, TalkerTimer, TalkerTimers};
use crate::protocol::AcmpStatus;

/// Listener sink binding/probing state (AVNU.IO.CONTROL 8.3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkState {
    #[default]
    Unbound,
    /// Bound, waiting for ADP to discover the talker.
    PrbWAvail,
    /// Talker discovered, waiting the randomized delay before probing.
    PrbWDelay,
    /// First probe sent, waiting for the response.
    PrbWResp,
    /// First probe timed out, retransmission outstanding.
    PrbWResp2,
    /// Both probes failed, waiting the retry period.
    PrbWRetry,
    /// Probe succeeded, stream params saved, waiting the SRP talker
    /// attribute.
    SettledNoRsv,
    /// Settled with a registered SRP talker attribute.
    SettledRsvOk,
}

impl SinkState {
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, Self::SettledNoRsv | Self::SettledRsvOk)
    }
}

/// Probing status exposed in GET_STREAM_INFO (AVNU.IO.CONTROL 7.3.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbingStatus {
    /// Not bound, not probing.
    #[default]
    Disabled,
    /// Bound but the talker is not discovered.
    Passive,
    /// Actively probing the talker.
    Active,
    /// Probing finished, stream params acquired.
    Completed,
}

/// SRP talker attribute as registered at the listener port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SrpStreamStatus {
    #[default]
    NoTalker,
    Active,
    Failed,
}

/// SRP talker attribute declaration state of a local talker stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TalkerDeclaration {
    #[default]
    None,
    Advertise,
    Failed,
}

/// SRP listener attribute registration seen by a local talker stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SrpListenerStatus {
    #[default]
    NoListener,
    Active,
    Failed,
}

/// Dynamic state of one MILAN listener sink.
#[derive(Debug)]
pub struct MilanListenerSink {
    pub cfg: StreamInputConfig,
    pub state: SinkState,
    pub binding: BindingParams,
    pub srp: SrpStreamParams,
    pub probing: ProbingStatus,
    /// Status of the last failed probe, for GET_STREAM_INFO reporting.
    pub acmp_status: AcmpStatus,
    /// SRP edge tracking: a talker attribute is currently registered.
    srp_registering: bool,
    pub srp_stream_status: SrpStreamStatus,
    /// ADP discovery state of the bound talker.
    pub talker_discovered: bool,
    /// Sequence id of the outstanding PROBE_TX command.
    probe_seq_id: u16,
    pub timers: ListenerTimers,
}

impl MilanListenerSink {
    fn new(cfg: StreamInputConfig) -> Self {
        Self {
            cfg,
            state: SinkState::Unbound,
            binding: BindingParams::default(),
            srp: SrpStreamParams::default(),
            probing: ProbingStatus::Disabled,
            acmp_status: AcmpStatus::Success,
            srp_registering: false,
            srp_stream_status: SrpStreamStatus::NoTalker,
            talker_discovered: false,
            probe_seq_id: 0,
            timers: ListenerTimers::new(),
        }
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.binding.is_set()
    }
}

/// Dynamic state of one MILAN talker stream.
#[derive(Debug)]
pub struct MilanTalkerSource {
    pub cfg: StreamOutputConfig,
    /// Fixed stream id (port MAC + stream index), assigned at start.
    pub stream_id: StreamId,
    /// MAAP-allocated destination address; zero while unallocated.
    pub dest_mac: MacAddr,
    pub vlan_id: u16,
    pub declaration: TalkerDeclaration,
    pub listener_status: SrpListenerStatus,
    /// A PROBE_TX was received within the probe window.
    pub probe_valid: bool,
    /// SRP withdraw debounce in progress; no re-declare until it ends.
    pub withdraw_in_progress: bool,
    pub connected: bool,
    maap_started: bool,
    pub timers: TalkerTimers,
}

impl MilanTalkerSource {
    fn new(cfg: StreamOutputConfig) -> Self {
        let vlan_id = cfg.default_vlan_id;
        Self {
            cfg,
            stream_id: StreamId::ZERO,
            dest_mac: MacAddr::ZERO,
            vlan_id,
            declaration: TalkerDeclaration::None,
            listener_status: SrpListenerStatus::NoListener,
            probe_valid: false,
            withdraw_in_progress: false,
            connected: false,
            maap_started: false,
            timers: TalkerTimers::new(),
        }
    }

    /// AVNU.IO.BASELINE 6.3.1: the talker attribute may be declared once a
    /// MAAP address is held and either a recent PROBE_TX was seen or a
    /// listener attribute is still registered.
    #[must_use]
    pub fn has_valid_srp_params(&self) -> bool {
        !self.dest_mac.is_zero()
            && (self.probe_valid || self.listener_status != SrpListenerStatus::NoListener)
    }
}

/// Per-entity MILAN profile state.
#[derive(Debug)]
pub struct MilanEntityState {
    pub listeners: Vec<MilanListenerSink>,
    pub talkers: Vec<MilanTalkerSource>,
}

impl MilanEntityState {
    #[must_use]
    pub fn new(listeners: Vec<StreamInputConfig>, talkers: Vec<StreamOutputConfig>) -> Self {
        Self {
            listeners: listeners.into_iter().map(MilanListenerSink::new).collect(),
            talkers: talkers.into_iter().map(MilanTalkerSource::new).collect(),
        }
    }

    /// Startup effects: assign talker stream ids and claim one MAAP range
    /// per talker stream.
    pub fn start(&mut self, entity_id: EntityId, host: &mut dyn AcmpHost) {
        for (i, talker) in self.talkers.iter_mut().enumerate() {
            let index = i as u16;
            talker.stream_id = StreamId::from_mac(&host.port_mac(talker.cfg.port), index);
            if !talker.maap_started {
                host.maap_start_range(entity_id, talker.cfg.port, maap_range_id(index));
                talker.maap_started = true;
            }
        }
    }

    /// Teardown: disconnect settled sinks and connected talker streams,
    /// release MAAP ranges, drop all timers.
    pub fn shutdown(&mut self, entity_id: EntityId, host: &mut dyn AcmpHost, now: Instant) {
        for (i, sink) in self.listeners.iter_mut().enumerate() {
            if sink.state.is_settled() {
                listener::stack_disconnect(entity_id, i as u16, sink, host);
            }
            sink.timers = ListenerTimers::new();
        }
        for (i, talker) in self.talkers.iter_mut().enumerate() {
            talker::stack_disconnect(entity_id, i as u16, talker, host, false, now);
            if talker.maap_started {
                host.maap_stop_range(entity_id, talker.cfg.port, maap_range_id(i as u16));
                talker.maap_started = false;
            }
            talker.timers = TalkerTimers::new();
        }
    }

    /// Listener sink whose settled stream id matches, for SRP indication
    /// routing.
    #[must_use]
    pub fn listener_index_by_stream_id(&self, stream_id: StreamId) -> Option<u16> {
        self.listeners
            .iter()
            .position(|s| !stream_id.is_zero() && s.srp.stream_id == stream_id)
            .map(|i| i as u16)
    }

    /// Talker stream whose stream id matches, for SRP indication routing.
    #[must_use]
    pub fn talker_index_by_stream_id(&self, stream_id: StreamId) -> Option<u16> {
        self.talkers
            .iter()
            .position(|t| !stream_id.is_zero() && t.stream_id == stream_id)
            .map(|i| i as u16)
    }

    /// Earliest pending deadline across every stream's timers.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        let l = self.listeners.iter().filter_map(|s| s.timers.next_deadline());
        let t = self.talkers.iter().filter_map(|s| s.timers.next_deadline());
        l.chain(t).min()
    }
}

/// MAAP range id of a talker stream index.
#[must_use]
pub fn maap_range_id(stream_index: u16) -> u32 {
    config::MAAP_BASE_RANGE_ID + u32::from(stream_index)
}

/// Talker stream index of a MAAP range id, when it falls in our block.
#[must_use]
pub fn maap_stream_index(range_id: u32, num_talkers: usize) -> Option<u16> {
    let index = range_id.checked_sub(config::MAAP_BASE_RANGE_ID)?;
    if (index as usize) < num_talkers {
        Some(index as u16)
    } else {
        None
    }
}

/// Fire every expired MILAN timer for one entity, feeding the listener
/// machine and the talker update path.
pub fn service_timers(
    milan: &mut MilanEntityState,
    acmp: &mut AcmpContext,
    entity_id: EntityId,
    host: &mut dyn AcmpHost,
    now: Instant,
) {
    let mut fired = Vec::new();
    let mut listener_due: Vec<(u16, ListenerTimer)> = Vec::new();
    for (i, sink) in milan.listeners.iter_mut().enumerate() {
        fired.clear();
        sink.timers.take_expired(now, &mut fired);
        listener_due.extend(fired.iter().map(|t| (i as u16, *t)));
    }
    for (index, timer) in listener_due {
        match timer {
            ListenerTimer::Delay => {
                listener_event(milan, acmp, entity_id, host, index, ListenerEvent::TmrDelay, now);
            }
            ListenerTimer::Retry => {
                listener_event(milan, acmp, entity_id, host, index, ListenerEvent::TmrRetry, now);
            }
            ListenerTimer::NoTalker => {
                listener_event(
                    milan,
                    acmp,
                    entity_id,
                    host,
                    index,
                    ListenerEvent::TmrNoTalker,
                    now,
                );
            }
            ListenerTimer::Notify => {
                host.stream_info_changed(entity_id, StreamDirection::Input, index);
            }
            ListenerTimer::NoResp => {}
        }
    }

    let mut talker_fired = Vec::new();
    let mut talker_due: Vec<(u16, TalkerTimer)> = Vec::new();
    for (i, talker) in milan.talkers.iter_mut().enumerate() {
        talker_fired.clear();
        talker.timers.take_expired(now, &mut talker_fired);
        talker_due.extend(talker_fired.iter().map(|t| (i as u16, *t)));
    }
    for (index, timer) in talker_due {
        let talker = &mut milan.talkers[usize::from(index)];
        match timer {
            TalkerTimer::ProbeWindow => {
                // no PROBE_TX for a whole window; withdraw unless a
                // listener attribute keeps the stream alive
                talker.probe_valid = false;
                talker::update(entity_id, index, talker, host, now);
            }
            TalkerTimer::Withdraw => {
                talker.withdraw_in_progress = false;
                talker::update(entity_id, index, talker, host, now);
            }
            TalkerTimer::Notify => {
                host.stream_info_changed(entity_id, StreamDirection::Output, index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::PortId;

    #[test]
    fn test_maap_range_mapping() {
        assert_eq!(maap_range_id(0), config::MAAP_BASE_RANGE_ID);
        assert_eq!(maap_stream_index(maap_range_id(3), 4), Some(3));
        assert_eq!(maap_stream_index(maap_range_id(4), 4), None);
        assert_eq!(maap_stream_index(config::MAAP_BASE_RANGE_ID - 1, 4), None);
    }

    #[test]
    fn test_talker_srp_params_gate() {
        let mut t = MilanTalkerSource::new(StreamOutputConfig {
            port: PortId(0),
            ..StreamOutputConfig::default()
        });
        assert!(!t.has_valid_srp_params());
        t.probe_valid = true;
        // probe alone is not enough without a MAAP address
        assert!(!t.has_valid_srp_params());
        t.dest_mac = MacAddr::new([0x91, 0xe0, 0xf0, 0, 0, 1]);
        assert!(t.has_valid_srp_params());
        t.probe_valid = false;
        assert!(!t.has_valid_srp_params());
        t.listener_status = SrpListenerStatus::Active;
        assert!(t.has_valid_srp_params());
    }

    #[test]
    fn test_stream_id_lookup_ignores_zero() {
        let state = MilanEntityState::new(vec![StreamInputConfig::default()], vec![]);
        assert_eq!(state.listener_index_by_stream_id(StreamId::ZERO), None);
    }
}
