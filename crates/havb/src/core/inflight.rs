// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-flight command tracker.
//!
//! One entry per command this entity sent and is still awaiting a response
//! for. Entries live in a fixed-capacity slot arena; lookup by sequence id
//! is a scan over active slots (the arena is small, 16 entries). A first
//! timeout re-arms the same entry with `retried` set so the caller can
//! resend the stored PDU verbatim; a second timeout removes the entry and
//! surfaces it as terminal. Correlation of a response cancels the entry and
//! hands back the original PDU plus the caller context it was started with.

use std::time::{Duration, Instant};

use crate::core::ids::PortId;
use crate::error::{AcmpError, AcmpResult};
use crate::protocol::pdu::AcmpPdu;
use crate::protocol::MessageType;

/// Opaque route back to the local IPC client that asked for the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyRoute {
    pub channel: u32,
    pub slot: u32,
}

/// One tracked command.
#[derive(Debug, Clone)]
pub struct Inflight {
    pub msg_type: MessageType,
    /// Sequence id of the command as sent on the wire.
    pub sequence_id: u16,
    /// Sequence id of the triggering command (e.g. the controller's
    /// CONNECT_RX) that the final response must echo.
    pub orig_sequence_id: u16,
    /// Set after the first timeout; a second timeout is terminal.
    pub retried: bool,
    /// Port the command went out on; retries use the same port.
    pub port: PortId,
    /// The command PDU, stored verbatim for retry and response building.
    pub pdu: AcmpPdu,
    /// Reply route when a local IPC client is waiting on the outcome.
    pub reply_route: Option<ReplyRoute>,
    deadline: Instant,
    timeout: Duration,
}

/// What the caller must do with an expired entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// First expiry: resend the stored PDU; the entry stays tracked.
    Retry,
    /// Second expiry: the entry has been removed, notify the requester.
    Final,
}

/// An expired entry popped by [`InflightTable::take_expired`].
#[derive(Debug, Clone)]
pub struct ExpiredCommand {
    pub inflight: Inflight,
    pub kind: TimeoutKind,
}

/// Fixed-capacity arena of in-flight commands, one per entity.
#[derive(Debug)]
pub struct InflightTable {
    slots: Vec<Option<Inflight>>,
}

impl InflightTable {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    /// Begin tracking a command. Fails with `InflightExhausted` when every
    /// slot is taken; the caller must treat the command as untrackable.
    pub fn start(
        &mut self,
        msg_type: MessageType,
        pdu: AcmpPdu,
        orig_sequence_id: u16,
        port: PortId,
        reply_route: Option<ReplyRoute>,
        now: Instant,
        timeout: Duration,
    ) -> AcmpResult<()> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.is_none())
            .ok_or(AcmpError::InflightExhausted)?;
        *slot = Some(Inflight {
            msg_type,
            sequence_id: pdu.sequence_id,
            orig_sequence_id,
            retried: false,
            port,
            pdu,
            reply_route,
            deadline: now + timeout,
            timeout,
        });
        Ok(())
    }

    /// Remove and return the entry matching `sequence_id`.
    ///
    /// `None` is not an error: it means the response correlates to nothing
    /// we still track (stale, duplicate, or superseded) and the caller
    /// logs and drops it.
    pub fn cancel(&mut self, sequence_id: u16) -> Option<Inflight> {
        self.slots
            .iter_mut()
            .find(|s| matches!(s, Some(e) if e.sequence_id == sequence_id))
            .and_then(Option::take)
    }

    #[must_use]
    pub fn active(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Pop every entry whose deadline has passed.
    ///
    /// First expiry: the entry is re-armed with `retried` set and returned
    /// as [`TimeoutKind::Retry`] (the stored copy keeps tracking). Second
    /// expiry: the entry is removed and returned as [`TimeoutKind::Final`].
    pub fn take_expired(&mut self, now: Instant) -> Vec<ExpiredCommand> {
        let mut out = Vec::new();
        for slot in &mut self.slots {
            let due_retried = match slot {
                Some(e) if e.deadline <= now => Some(e.retried),
                _ => None,
            };
            match due_retried {
                None => {}
                Some(true) => {
                    if let Some(inflight) = slot.take() {
                        out.push(ExpiredCommand {
                            inflight,
                            kind: TimeoutKind::Final,
                        });
                    }
                }
                Some(false) => {
                    if let Some(e) = slot.as_mut() {
                        e.retried = true;
                        e.deadline = now + e.timeout;
                        out.push(ExpiredCommand {
                            inflight: e.clone(),
                            kind: TimeoutKind::Retry,
                        });
                    }
                }
            }
        }
        out
    }

    /// Earliest deadline over all tracked entries.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.iter().flatten().map(|e| e.deadline).min()
    }

    /// Drain every entry (entity teardown); callers deliver failure
    /// responses to any reply routes found.
    pub fn drain(&mut self) -> Vec<Inflight> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdu_with_seq(seq: u16) -> AcmpPdu {
        AcmpPdu {
            sequence_id: seq,
            ..AcmpPdu::default()
        }
    }

    fn table_with_one(seq: u16, now: Instant) -> InflightTable {
        let mut t = InflightTable::new(4);
        t.start(
            MessageType::ConnectTxCommand,
            pdu_with_seq(seq),
            7,
            PortId(0),
            None,
            now,
            Duration::from_millis(200),
        )
        .unwrap();
        t
    }

    #[test]
    fn test_cancel_returns_entry_once() {
        let now = Instant::now();
        let mut t = table_with_one(42, now);
        let e = t.cancel(42).unwrap();
        assert_eq!(e.orig_sequence_id, 7);
        assert!(t.cancel(42).is_none());
        assert_eq!(t.active(), 0);
    }

    #[test]
    fn test_cancel_unknown_is_none() {
        let now = Instant::now();
        let mut t = table_with_one(42, now);
        assert!(t.cancel(43).is_none());
        assert_eq!(t.active(), 1);
    }

    #[test]
    fn test_single_retry_then_terminal() {
        let now = Instant::now();
        let mut t = table_with_one(42, now);

        let first = t.take_expired(now + Duration::from_millis(200));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind, TimeoutKind::Retry);
        assert!(first[0].inflight.retried);
        assert_eq!(t.active(), 1);

        // not due again until a full timeout later
        assert!(t.take_expired(now + Duration::from_millis(300)).is_empty());

        let second = t.take_expired(now + Duration::from_millis(400));
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].kind, TimeoutKind::Final);
        assert_eq!(t.active(), 0);

        // no third notification ever
        assert!(t.take_expired(now + Duration::from_millis(800)).is_empty());
    }

    #[test]
    fn test_exhaustion() {
        let now = Instant::now();
        let mut t = InflightTable::new(2);
        for seq in 0..2 {
            t.start(
                MessageType::ConnectRxCommand,
                pdu_with_seq(seq),
                seq,
                PortId(0),
                None,
                now,
                Duration::from_millis(200),
            )
            .unwrap();
        }
        let err = t.start(
            MessageType::ConnectRxCommand,
            pdu_with_seq(9),
            9,
            PortId(0),
            None,
            now,
            Duration::from_millis(200),
        );
        assert!(matches!(err, Err(AcmpError::InflightExhausted)));
        // cancelling frees a slot
        t.cancel(0).unwrap();
        assert!(t
            .start(
                MessageType::ConnectRxCommand,
                pdu_with_seq(9),
                9,
                PortId(0),
                None,
                now,
                Duration::from_millis(200),
            )
            .is_ok());
    }

    #[test]
    fn test_next_deadline() {
        let now = Instant::now();
        let mut t = InflightTable::new(4);
        assert!(t.next_deadline().is_none());
        t.start(
            MessageType::ConnectTxCommand,
            pdu_with_seq(1),
            1,
            PortId(0),
            None,
            now,
            Duration::from_millis(500),
        )
        .unwrap();
        t.start(
            MessageType::GetTxStateCommand,
            pdu_with_seq(2),
            2,
            PortId(0),
            None,
            now,
            Duration::from_millis(200),
        )
        .unwrap();
        assert_eq!(t.next_deadline(), Some(now + Duration::from_millis(200)));
    }
}
