// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Protocol constants - Single Source of Truth
//!
//! Every timeout, timer period, wire constant and pool size used by the
//! connection-management engine lives here. Other modules reference these by
//! name; no magic numbers at call sites.

/// AVDECC ADP/ACMP multicast destination MAC (IEEE 1722.1 Table 6.1).
pub const AVDECC_MULTICAST_MAC: [u8; 6] = [0x91, 0xe0, 0xf0, 0x01, 0x00, 0x00];

/// AVTP EtherType.
pub const AVTP_ETHERTYPE: u16 = 0x22F0;

/// AVTP control subtype for ACMP PDUs.
pub const AVTP_SUBTYPE_ACMP: u8 = 0xFC;

/// control_data_length value for ACMP: octets following stream_id.
pub const ACMP_CDL: u16 = 44;

/// ACMP payload length, stream_id through reserved, bytes.
pub const ACMP_PDU_LEN: usize = 52;

/// Ethernet header length, bytes.
pub const ETH_HDR_LEN: usize = 14;

/// AVTP control header length, bytes.
pub const AVTP_CTRL_HDR_LEN: usize = 4;

/// Full ACMP frame length on the wire (no VLAN tag, no FCS).
pub const ACMP_FRAME_LEN: usize = ETH_HDR_LEN + AVTP_CTRL_HDR_LEN + ACMP_PDU_LEN;

// ---------------------------------------------------------------------------
// Command timeouts (IEEE 1722.1 Table 8.4 / MILAN v1.2 section 5.5)
// ---------------------------------------------------------------------------

/// IEEE CONNECT_TX_COMMAND timeout, ms.
pub const IEEE_TMO_CONNECT_TX_MS: u64 = 2_000;
/// IEEE DISCONNECT_TX_COMMAND timeout, ms.
pub const IEEE_TMO_DISCONNECT_TX_MS: u64 = 200;
/// IEEE GET_TX_STATE_COMMAND timeout, ms.
pub const IEEE_TMO_GET_TX_STATE_MS: u64 = 200;
/// IEEE CONNECT_RX_COMMAND timeout, ms.
pub const IEEE_TMO_CONNECT_RX_MS: u64 = 4_500;
/// IEEE DISCONNECT_RX_COMMAND timeout, ms.
pub const IEEE_TMO_DISCONNECT_RX_MS: u64 = 500;
/// IEEE GET_RX_STATE_COMMAND timeout, ms.
pub const IEEE_TMO_GET_RX_STATE_MS: u64 = 200;
/// IEEE GET_TX_CONNECTION_COMMAND timeout, ms.
pub const IEEE_TMO_GET_TX_CONNECTION_MS: u64 = 200;

/// MILAN uses a flat timeout for every ACMP command, ms.
pub const MILAN_TMO_FLAT_MS: u64 = 200;

// ---------------------------------------------------------------------------
// MILAN listener sink timers (MILAN v1.2 section 5.5.6)
// ---------------------------------------------------------------------------

/// Lower bound of the randomized probe delay, ms.
pub const MILAN_TMR_DELAY_MIN_MS: u64 = 200;
/// Upper bound of the randomized probe delay, ms.
pub const MILAN_TMR_DELAY_MAX_MS: u64 = 1_000;
/// Retry period after a failed probe cycle, ms.
pub const MILAN_TMR_RETRY_MS: u64 = 4_000;
/// Grace period for the SRP talker attribute to appear once settled, ms.
pub const MILAN_TMR_NO_TK_MS: u64 = 10_000;
/// Coalescing window for unsolicited listener stream-info notifications, ms.
pub const MILAN_LISTENER_NOTIFY_MS: u64 = 100;

// ---------------------------------------------------------------------------
// MILAN talker timers
// ---------------------------------------------------------------------------

/// PROBE_TX reception liveness window, ms.
pub const MILAN_TALKER_PROBE_WINDOW_MS: u64 = 15_000;
/// SRP talker-attribute withdraw debounce: 2 x MSRP LeaveAll period, ms.
pub const MILAN_TALKER_WITHDRAW_MS: u64 = 30_000;
/// Coalescing window for unsolicited talker stream-info notifications, ms.
pub const MILAN_TALKER_NOTIFY_MS: u64 = 1_000;

// ---------------------------------------------------------------------------
// Pools and identifiers
// ---------------------------------------------------------------------------

/// Maximum simultaneously tracked in-flight commands per entity.
pub const INFLIGHT_SLOTS: usize = 16;

/// IEEE listener pairs per talker stream (fan-out bound).
pub const IEEE_LISTENER_PAIRS: usize = 8;

/// Base MAAP range id; a talker stream uses `base + stream_index`.
pub const MAAP_BASE_RANGE_ID: u32 = 0x4156_0000;

/// Default VLAN id used when SRP has not supplied one.
pub const DEFAULT_VLAN_ID: u16 = 2;

/// Engine idle wake interval when no timer or command is pending.
pub const ENGINE_IDLE_WAIT_MS: u64 = 250;
