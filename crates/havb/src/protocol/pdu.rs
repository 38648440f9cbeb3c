// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ACMP PDU codec.
//!
//! 52-byte payload following the AVTP control header (stream_id plus the 44
//! octets counted by control_data_length), all multi-byte fields big-endian:
//!
//! ```text
//! offset  size  field
//!      0     8  stream_id
//!      8     8  controller_entity_id
//!     16     8  talker_entity_id
//!     24     8  listener_entity_id
//!     32     2  talker_unique_id
//!     34     2  listener_unique_id
//!     36     6  stream_dest_mac
//!     42     2  connection_count
//!     44     2  sequence_id
//!     46     2  flags
//!     48     2  stream_vlan_id
//!     50     2  reserved
//! ```

use crate::config;
use crate::core::ids::{EntityId, MacAddr, StreamId};
use crate::error::{AcmpError, AcmpResult};
use crate::protocol::{self, AcmpStatus, MessageType};

/// In-memory form of the ACMP PDU payload.
///
/// Stored verbatim in in-flight entries so retries and responses can be
/// rebuilt without re-deriving any field. `reserved` is never carried:
/// it encodes as zero and is ignored on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcmpPdu {
    pub stream_id: StreamId,
    pub controller_entity_id: EntityId,
    pub talker_entity_id: EntityId,
    pub listener_entity_id: EntityId,
    pub talker_unique_id: u16,
    pub listener_unique_id: u16,
    pub stream_dest_mac: MacAddr,
    pub connection_count: u16,
    pub sequence_id: u16,
    pub flags: u16,
    pub stream_vlan_id: u16,
}

impl AcmpPdu {
    /// Encode this PDU into `buf[offset..offset + 52]`.
    ///
    /// Returns the number of bytes written.
    pub fn encode(&self, buf: &mut [u8], offset: usize) -> AcmpResult<usize> {
        if buf.len() < offset + config::ACMP_PDU_LEN {
            return Err(AcmpError::too_short(
                buf.len(),
                offset + config::ACMP_PDU_LEN,
            ));
        }
        let b = &mut buf[offset..offset + config::ACMP_PDU_LEN];
        b[0..8].copy_from_slice(&self.stream_id.as_u64().to_be_bytes());
        b[8..16].copy_from_slice(&self.controller_entity_id.as_u64().to_be_bytes());
        b[16..24].copy_from_slice(&self.talker_entity_id.as_u64().to_be_bytes());
        b[24..32].copy_from_slice(&self.listener_entity_id.as_u64().to_be_bytes());
        b[32..34].copy_from_slice(&self.talker_unique_id.to_be_bytes());
        b[34..36].copy_from_slice(&self.listener_unique_id.to_be_bytes());
        b[36..42].copy_from_slice(self.stream_dest_mac.as_bytes());
        b[42..44].copy_from_slice(&self.connection_count.to_be_bytes());
        b[44..46].copy_from_slice(&self.sequence_id.to_be_bytes());
        b[46..48].copy_from_slice(&self.flags.to_be_bytes());
        b[48..50].copy_from_slice(&self.stream_vlan_id.to_be_bytes());
        b[50] = 0;
        b[51] = 0;
        Ok(config::ACMP_PDU_LEN)
    }

    /// Decode a PDU from `buf[offset..offset + 52]`.
    pub fn decode(buf: &[u8], offset: usize) -> AcmpResult<Self> {
        if buf.len() < offset + config::ACMP_PDU_LEN {
            return Err(AcmpError::too_short(
                buf.len(),
                offset + config::ACMP_PDU_LEN,
            ));
        }
        let b = &buf[offset..offset + config::ACMP_PDU_LEN];
        Ok(Self {
            stream_id: StreamId::from_u64(u64::from_be_bytes(
                b[0..8].try_into().expect("stream id bytes"),
            )),
            controller_entity_id: EntityId::from_u64(u64::from_be_bytes(
                b[8..16].try_into().expect("controller id bytes"),
            )),
            talker_entity_id: EntityId::from_u64(u64::from_be_bytes(
                b[16..24].try_into().expect("talker id bytes"),
            )),
            listener_entity_id: EntityId::from_u64(u64::from_be_bytes(
                b[24..32].try_into().expect("listener id bytes"),
            )),
            talker_unique_id: u16::from_be_bytes(b[32..34].try_into().expect("unique id bytes")),
            listener_unique_id: u16::from_be_bytes(b[34..36].try_into().expect("unique id bytes")),
            stream_dest_mac: MacAddr::new(b[36..42].try_into().expect("dest mac bytes")),
            connection_count: u16::from_be_bytes(b[42..44].try_into().expect("count bytes")),
            sequence_id: u16::from_be_bytes(b[44..46].try_into().expect("sequence bytes")),
            flags: u16::from_be_bytes(b[46..48].try_into().expect("flags bytes")),
            stream_vlan_id: u16::from_be_bytes(b[48..50].try_into().expect("vlan bytes")),
        })
    }

    /// True if a flag bit is set.
    #[must_use]
    pub fn has_flag(&self, bit: u16) -> bool {
        self.flags & bit != 0
    }
}

/// A decoded ACMP frame: control header fields plus payload.
#[derive(Debug, Clone, Copy)]
pub struct AcmpFrame {
    pub message_type: MessageType,
    pub status: AcmpStatus,
    pub pdu: AcmpPdu,
}

/// Build a complete Ethernet frame for one ACMP message.
pub fn encode_frame(
    src_mac: &MacAddr,
    message_type: MessageType,
    status: AcmpStatus,
    pdu: &AcmpPdu,
) -> AcmpResult<Vec<u8>> {
    let mut buf = vec![0u8; config::ACMP_FRAME_LEN];
    let mut off = protocol::encode_eth_header(&mut buf, src_mac.as_bytes())?;
    off += protocol::encode_control_header(&mut buf, off, message_type, status)?;
    off += pdu.encode(&mut buf, off)?;
    debug_assert_eq!(off, config::ACMP_FRAME_LEN);
    Ok(buf)
}

/// Parse a received Ethernet frame into an [`AcmpFrame`].
///
/// The EtherType is not re-checked here: the host demux already selected
/// AVTP frames for us. Subtype and length are validated.
pub fn parse_frame(buf: &[u8]) -> AcmpResult<AcmpFrame> {
    if buf.len() < config::ACMP_FRAME_LEN {
        return Err(AcmpError::too_short(buf.len(), config::ACMP_FRAME_LEN));
    }
    let hdr = protocol::parse_control_header(buf, config::ETH_HDR_LEN)?;
    let pdu = AcmpPdu::decode(buf, config::ETH_HDR_LEN + config::AVTP_CTRL_HDR_LEN)?;
    Ok(AcmpFrame {
        message_type: hdr.message_type,
        status: hdr.status,
        pdu,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pdu() -> AcmpPdu {
        AcmpPdu {
            stream_id: StreamId::from_u64(0x0011_2233_4455_6677),
            controller_entity_id: EntityId::from_u64(0xC0C0_0000_0000_0001),
            talker_entity_id: EntityId::from_u64(0x7A7A_0000_0000_0002),
            listener_entity_id: EntityId::from_u64(0x1111_0000_0000_0003),
            talker_unique_id: 4,
            listener_unique_id: 5,
            stream_dest_mac: MacAddr::new([0x91, 0xe0, 0xf0, 0x00, 0x0e, 0x80]),
            connection_count: 1,
            sequence_id: 0xBEEF,
            flags: super::super::flags::STREAMING_WAIT,
            stream_vlan_id: 2,
        }
    }

    #[test]
    fn test_pdu_round() {
        let pdu = sample_pdu();
        let mut buf = [0u8; 52];
        assert_eq!(pdu.encode(&mut buf, 0).unwrap(), 52);
        assert_eq!(AcmpPdu::decode(&buf, 0).unwrap(), pdu);
        // reserved stays zero
        assert_eq!(&buf[50..52], &[0, 0]);
    }

    #[test]
    fn test_pdu_field_offsets() {
        let pdu = sample_pdu();
        let mut buf = [0u8; 52];
        pdu.encode(&mut buf, 0).unwrap();
        // spot-check wire placement against the layout table
        assert_eq!(&buf[0..2], &[0x00, 0x11]); // stream_id msb
        assert_eq!(&buf[32..34], &[0x00, 0x04]); // talker_unique_id
        assert_eq!(&buf[44..46], &[0xBE, 0xEF]); // sequence_id
    }

    #[test]
    fn test_frame_round() {
        let src = MacAddr::new([2, 0, 0, 0, 0, 9]);
        let pdu = sample_pdu();
        let frame = encode_frame(
            &src,
            MessageType::ConnectTxCommand,
            AcmpStatus::Success,
            &pdu,
        )
        .unwrap();
        assert_eq!(frame.len(), config::ACMP_FRAME_LEN);
        assert_eq!(&frame[0..6], &config::AVDECC_MULTICAST_MAC);
        let parsed = parse_frame(&frame).unwrap();
        assert_eq!(parsed.message_type, MessageType::ConnectTxCommand);
        assert_eq!(parsed.status, AcmpStatus::Success);
        assert_eq!(parsed.pdu, pdu);
    }

    #[test]
    fn test_parse_frame_too_short() {
        assert!(parse_frame(&[0u8; 40]).is_err());
    }

    #[test]
    fn test_encode_offset_out_of_range() {
        let mut buf = [0u8; 52];
        assert!(sample_pdu().encode(&mut buf, 4).is_err());
    }
}
