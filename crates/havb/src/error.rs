// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the connection-management engine.
//!
//! Protocol-level rejections (LISTENER_EXCLUSIVE, NO_SUCH_CONNECTION, ...)
//! are NOT errors: they travel as status codes inside response PDUs. This
//! module only covers local faults: malformed input at the boundary,
//! exhausted tracking resources, transmit failures.

use std::fmt;

use crate::core::ids::EntityId;

/// Result type for engine operations
pub type AcmpResult<T> = Result<T, AcmpError>;

/// Errors that can occur inside the ACMP engine
#[derive(Debug)]
pub enum AcmpError {
    /// Received buffer shorter than the fixed ACMP frame
    PduTooShort { len: usize, need: usize },

    /// Control header carried a subtype other than ACMP
    BadSubtype(u8),

    /// Message type outside the 0..=13 range
    UnknownMessageType(u8),

    /// No free in-flight slot; the command cannot be tracked
    InflightExhausted,

    /// Host transport refused the frame
    SendFailed(String),

    /// IPC payload failed validation
    BadIpcRequest(String),

    /// Engine event queue is at capacity; the producer must back off
    QueueFull,

    /// Engine channel closed; no events can be submitted anymore
    EngineStopped,

    /// An entity with the same id is already registered
    DuplicateEntity(EntityId),
}

impl AcmpError {
    /// Short-buffer error with the required length filled in
    pub fn too_short(len: usize, need: usize) -> Self {
        Self::PduTooShort { len, need }
    }

    pub fn send_failed(msg: impl Into<String>) -> Self {
        Self::SendFailed(msg.into())
    }
}

impl fmt::Display for AcmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PduTooShort { len, need } => {
                write!(f, "ACMP PDU too short: {} bytes, need {}", len, need)
            }
            Self::BadSubtype(s) => write!(f, "not an ACMP control frame: subtype {:#04x}", s),
            Self::UnknownMessageType(t) => write!(f, "unknown ACMP message type {}", t),
            Self::InflightExhausted => write!(f, "no free in-flight command slot"),
            Self::SendFailed(msg) => write!(f, "frame transmit failed: {}", msg),
            Self::BadIpcRequest(msg) => write!(f, "bad IPC request: {}", msg),
            Self::QueueFull => write!(f, "engine event queue full"),
            Self::EngineStopped => write!(f, "engine stopped, channel closed"),
            Self::DuplicateEntity(id) => write!(f, "entity {} already registered", id),
        }
    }
}

impl std::error::Error for AcmpError {}
