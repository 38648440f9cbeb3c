// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-stream static configuration and the dynamic parameter blocks shared
//! by both profiles.
//!
//! The static structs are the accessor contract over descriptor storage:
//! the engine never walks an AECP descriptor tree, it reads these fields,
//! filled in by the host at entity configuration time.

use crate::core::bridge::SrClass;
use crate::core::ids::{EntityId, MacAddr, PortId, StreamId};
use crate::protocol::flags;

/// Static configuration of one STREAM_INPUT (listener sink).
#[derive(Debug, Clone, Copy)]
pub struct StreamInputConfig {
    /// AVB interface the sink is attached to. Commands for this sink go
    /// out this port, regardless of the port they arrived on.
    pub port: PortId,
    pub clock_domain_index: u16,
    pub supports_class_a: bool,
    pub supports_class_b: bool,
}

impl StreamInputConfig {
    /// SR class selected by the command flags (CLASS_B bit), when the sink
    /// supports it.
    #[must_use]
    pub fn class_for_flags(&self, pdu_flags: u16) -> SrClass {
        if pdu_flags & flags::CLASS_B != 0 {
            SrClass::B
        } else {
            SrClass::A
        }
    }
}

impl Default for StreamInputConfig {
    fn default() -> Self {
        Self {
            port: PortId(0),
            clock_domain_index: 0,
            supports_class_a: true,
            supports_class_b: true,
        }
    }
}

/// Static configuration of one STREAM_OUTPUT (talker source).
#[derive(Debug, Clone, Copy)]
pub struct StreamOutputConfig {
    pub port: PortId,
    pub clock_domain_index: u16,
    pub supports_class_a: bool,
    pub supports_class_b: bool,
    /// VLAN the stream is tagged with when SRP has not supplied one.
    pub default_vlan_id: u16,
}

impl StreamOutputConfig {
    /// Class-compatibility gate for CONNECT_TX: the class requested via
    /// the CLASS_B flag must be one the descriptor advertises.
    #[must_use]
    pub fn class_compatible(&self, pdu_flags: u16) -> bool {
        if pdu_flags & flags::CLASS_B != 0 {
            self.supports_class_b
        } else {
            self.supports_class_a
        }
    }

    /// Stream class requested by the CLASS_B flag.
    #[must_use]
    pub fn class_for_flags(&self, pdu_flags: u16) -> SrClass {
        if pdu_flags & flags::CLASS_B != 0 {
            SrClass::B
        } else {
            SrClass::A
        }
    }
}

impl Default for StreamOutputConfig {
    fn default() -> Self {
        Self {
            port: PortId(0),
            clock_domain_index: 0,
            supports_class_a: true,
            supports_class_b: true,
            default_vlan_id: crate::config::DEFAULT_VLAN_ID,
        }
    }
}

/// Binding parameters of a listener sink. Valid only while the sink is
/// bound (MILAN: state != UNBOUND; IEEE: connected or pending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindingParams {
    pub controller_id: EntityId,
    pub talker_id: EntityId,
    pub talker_unique_id: u16,
    pub streaming_wait: bool,
}

impl BindingParams {
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.talker_id.is_zero()
    }

    /// Same (talker, unique id) target - a repeat of this binding never
    /// restarts probing.
    #[must_use]
    pub fn same_talker(&self, talker_id: EntityId, talker_unique_id: u16) -> bool {
        self.talker_id == talker_id && self.talker_unique_id == talker_unique_id
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// SRP-derived stream parameters of a listener sink. Valid only while
/// settled (MILAN) or connected (IEEE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SrpStreamParams {
    pub stream_id: StreamId,
    pub dest_mac: MacAddr,
    pub vlan_id: u16,
}

impl SrpStreamParams {
    /// Defensive identity match before an SRP notification is applied:
    /// stale notifications for a previous binding must not leak in.
    #[must_use]
    pub fn matches(&self, stream_id: StreamId, dest_mac: &MacAddr, vlan_id: u16) -> bool {
        self.stream_id == stream_id && self.dest_mac == *dest_mac && self.vlan_id == vlan_id
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
