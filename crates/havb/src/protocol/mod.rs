// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ACMP wire protocol: message types, status codes, flags and the AVTP
//! control header enclosing every ACMP PDU.
//!
//! Control header layout (4 bytes, after the Ethernet header):
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    subtype    |s| ver | m_type|  status |  control_data_length|
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! subtype = 0xFC (ACMP), sv = 0, version = 0, message type 4 bits (low bit
//! is the command/response parity), status 5 bits, control_data_length 11
//! bits (always 44 for ACMP).

pub mod pdu;

use crate::config;
use crate::error::{AcmpError, AcmpResult};

/// ACMP message types (IEEE 1722.1 Table 8.1).
///
/// MILAN reuses the same wire values under different names: PROBE_TX is
/// CONNECT_TX, BIND_RX is CONNECT_RX, UNBIND_RX is DISCONNECT_RX. The
/// [`MessageType::name`] accessor is profile-aware for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    ConnectTxCommand = 0,
    ConnectTxResponse = 1,
    DisconnectTxCommand = 2,
    DisconnectTxResponse = 3,
    GetTxStateCommand = 4,
    GetTxStateResponse = 5,
    ConnectRxCommand = 6,
    ConnectRxResponse = 7,
    DisconnectRxCommand = 8,
    DisconnectRxResponse = 9,
    GetRxStateCommand = 10,
    GetRxStateResponse = 11,
    GetTxConnectionCommand = 12,
    GetTxConnectionResponse = 13,
}

impl MessageType {
    pub fn from_u8(v: u8) -> AcmpResult<Self> {
        Ok(match v {
            0 => Self::ConnectTxCommand,
            1 => Self::ConnectTxResponse,
            2 => Self::DisconnectTxCommand,
            3 => Self::DisconnectTxResponse,
            4 => Self::GetTxStateCommand,
            5 => Self::GetTxStateResponse,
            6 => Self::ConnectRxCommand,
            7 => Self::ConnectRxResponse,
            8 => Self::DisconnectRxCommand,
            9 => Self::DisconnectRxResponse,
            10 => Self::GetRxStateCommand,
            11 => Self::GetRxStateResponse,
            12 => Self::GetTxConnectionCommand,
            13 => Self::GetTxConnectionResponse,
            other => return Err(AcmpError::UnknownMessageType(other)),
        })
    }

    /// Wire value (low bit set = response).
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// True for response message types (odd wire values).
    #[must_use]
    pub fn is_response(self) -> bool {
        self.as_u8() & 1 == 1
    }

    /// The response type paired with this command type.
    #[must_use]
    pub fn response(self) -> Self {
        match self {
            Self::ConnectTxCommand => Self::ConnectTxResponse,
            Self::DisconnectTxCommand => Self::DisconnectTxResponse,
            Self::GetTxStateCommand => Self::GetTxStateResponse,
            Self::ConnectRxCommand => Self::ConnectRxResponse,
            Self::DisconnectRxCommand => Self::DisconnectRxResponse,
            Self::GetRxStateCommand => Self::GetRxStateResponse,
            Self::GetTxConnectionCommand => Self::GetTxConnectionResponse,
            resp => resp,
        }
    }

    /// Which local role a received message is addressed to. Selects the
    /// entity-id field used to find the owning entity.
    #[must_use]
    pub fn role(self) -> Role {
        match self {
            Self::ConnectRxCommand
            | Self::DisconnectRxCommand
            | Self::GetRxStateCommand
            | Self::ConnectTxResponse
            | Self::DisconnectTxResponse => Role::Listener,
            Self::ConnectTxCommand
            | Self::DisconnectTxCommand
            | Self::GetTxStateCommand
            | Self::GetTxConnectionCommand => Role::Talker,
            Self::ConnectRxResponse
            | Self::DisconnectRxResponse
            | Self::GetRxStateResponse
            | Self::GetTxStateResponse
            | Self::GetTxConnectionResponse => Role::Controller,
        }
    }

    /// IEEE 1722.1 name of the message type.
    #[must_use]
    pub fn ieee_name(self) -> &'static str {
        match self {
            Self::ConnectTxCommand => "CONNECT_TX_COMMAND",
            Self::ConnectTxResponse => "CONNECT_TX_RESPONSE",
            Self::DisconnectTxCommand => "DISCONNECT_TX_COMMAND",
            Self::DisconnectTxResponse => "DISCONNECT_TX_RESPONSE",
            Self::GetTxStateCommand => "GET_TX_STATE_COMMAND",
            Self::GetTxStateResponse => "GET_TX_STATE_RESPONSE",
            Self::ConnectRxCommand => "CONNECT_RX_COMMAND",
            Self::ConnectRxResponse => "CONNECT_RX_RESPONSE",
            Self::DisconnectRxCommand => "DISCONNECT_RX_COMMAND",
            Self::DisconnectRxResponse => "DISCONNECT_RX_RESPONSE",
            Self::GetRxStateCommand => "GET_RX_STATE_COMMAND",
            Self::GetRxStateResponse => "GET_RX_STATE_RESPONSE",
            Self::GetTxConnectionCommand => "GET_TX_CONNECTION_COMMAND",
            Self::GetTxConnectionResponse => "GET_TX_CONNECTION_RESPONSE",
        }
    }

    /// MILAN name of the same wire value.
    #[must_use]
    pub fn milan_name(self) -> &'static str {
        match self {
            Self::ConnectTxCommand => "PROBE_TX_COMMAND",
            Self::ConnectTxResponse => "PROBE_TX_RESPONSE",
            Self::ConnectRxCommand => "BIND_RX_COMMAND",
            Self::ConnectRxResponse => "BIND_RX_RESPONSE",
            Self::DisconnectRxCommand => "UNBIND_RX_COMMAND",
            Self::DisconnectRxResponse => "UNBIND_RX_RESPONSE",
            other => other.ieee_name(),
        }
    }
}

/// Local role a received ACMP message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Listener,
    Talker,
    Controller,
}

/// ACMP status codes (IEEE 1722.1 Table 8.2, 5-bit field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AcmpStatus {
    Success = 0,
    ListenerUnknownId = 1,
    TalkerUnknownId = 2,
    TalkerDestMacFail = 3,
    TalkerNoStreamIndex = 4,
    TalkerNoBandwidth = 5,
    TalkerExclusive = 6,
    ListenerTalkerTimeout = 7,
    ListenerExclusive = 8,
    StateUnavailable = 9,
    NotConnected = 10,
    NoSuchConnection = 11,
    CouldNotSendMessage = 12,
    TalkerMisbehaving = 13,
    ListenerMisbehaving = 14,
    ControllerNotAuthorized = 16,
    IncompatibleRequest = 17,
    NotSupported = 31,
}

impl AcmpStatus {
    /// Decode a 5-bit status field; unassigned values map to NotSupported.
    #[must_use]
    pub fn from_u8(v: u8) -> Self {
        match v & 0x1f {
            0 => Self::Success,
            1 => Self::ListenerUnknownId,
            2 => Self::TalkerUnknownId,
            3 => Self::TalkerDestMacFail,
            4 => Self::TalkerNoStreamIndex,
            5 => Self::TalkerNoBandwidth,
            6 => Self::TalkerExclusive,
            7 => Self::ListenerTalkerTimeout,
            8 => Self::ListenerExclusive,
            9 => Self::StateUnavailable,
            10 => Self::NotConnected,
            11 => Self::NoSuchConnection,
            12 => Self::CouldNotSendMessage,
            13 => Self::TalkerMisbehaving,
            14 => Self::ListenerMisbehaving,
            16 => Self::ControllerNotAuthorized,
            17 => Self::IncompatibleRequest,
            _ => Self::NotSupported,
        }
    }

    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// ACMP flag bits (flags field of the PDU).
pub mod flags {
    pub const CLASS_B: u16 = 1 << 0;
    pub const FAST_CONNECT: u16 = 1 << 1;
    pub const SAVED_STATE: u16 = 1 << 2;
    pub const STREAMING_WAIT: u16 = 1 << 3;
    pub const SUPPORTS_ENCRYPTED: u16 = 1 << 4;
    pub const ENCRYPTED_PDU: u16 = 1 << 5;
    pub const TALKER_FAILED: u16 = 1 << 6;
    /// MILAN reuse of bit 6 on GET_RX_STATE responses: SRP registration
    /// failed while the sink is settled.
    pub const REGISTERING_FAILED: u16 = 1 << 6;
}

/// Decoded AVTP control header fields relevant to ACMP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlHeader {
    pub message_type: MessageType,
    pub status: AcmpStatus,
    pub length: u16,
}

/// Encode the 4-byte AVTP control header into `buf[offset..]`.
///
/// Returns the number of bytes written.
pub fn encode_control_header(
    buf: &mut [u8],
    offset: usize,
    message_type: MessageType,
    status: AcmpStatus,
) -> AcmpResult<usize> {
    if buf.len() < offset + config::AVTP_CTRL_HDR_LEN {
        return Err(AcmpError::too_short(
            buf.len(),
            offset + config::AVTP_CTRL_HDR_LEN,
        ));
    }
    let status_len = (u16::from(status.as_u8()) << 11) | (config::ACMP_CDL & 0x07ff);
    buf[offset] = config::AVTP_SUBTYPE_ACMP;
    // sv = 0, version = 0, message type in the low 4 bits
    buf[offset + 1] = message_type.as_u8() & 0x0f;
    buf[offset + 2] = (status_len >> 8) as u8;
    buf[offset + 3] = (status_len & 0xff) as u8;
    Ok(config::AVTP_CTRL_HDR_LEN)
}

/// Parse the AVTP control header at `buf[offset..]`.
pub fn parse_control_header(buf: &[u8], offset: usize) -> AcmpResult<ControlHeader> {
    if buf.len() < offset + config::AVTP_CTRL_HDR_LEN {
        return Err(AcmpError::too_short(
            buf.len(),
            offset + config::AVTP_CTRL_HDR_LEN,
        ));
    }
    if buf[offset] != config::AVTP_SUBTYPE_ACMP {
        return Err(AcmpError::BadSubtype(buf[offset]));
    }
    let message_type = MessageType::from_u8(buf[offset + 1] & 0x0f)?;
    let status_len = (u16::from(buf[offset + 2]) << 8) | u16::from(buf[offset + 3]);
    Ok(ControlHeader {
        message_type,
        status: AcmpStatus::from_u8((status_len >> 11) as u8),
        length: status_len & 0x07ff,
    })
}

/// Encode the Ethernet header (AVDECC multicast dst, given src, AVTP
/// EtherType) into `buf[..14]`.
pub fn encode_eth_header(buf: &mut [u8], src_mac: &[u8; 6]) -> AcmpResult<usize> {
    if buf.len() < config::ETH_HDR_LEN {
        return Err(AcmpError::too_short(buf.len(), config::ETH_HDR_LEN));
    }
    buf[0..6].copy_from_slice(&config::AVDECC_MULTICAST_MAC);
    buf[6..12].copy_from_slice(src_mac);
    buf[12] = (config::AVTP_ETHERTYPE >> 8) as u8;
    buf[13] = (config::AVTP_ETHERTYPE & 0xff) as u8;
    Ok(config::ETH_HDR_LEN)
}
