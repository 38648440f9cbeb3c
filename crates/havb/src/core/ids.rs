// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Identifier newtypes shared across the engine: 64-bit AVDECC entity
//! GUIDs, 64-bit stream ids, MAC addresses and logical port numbers.

use std::fmt;

/// 64-bit AVDECC entity GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_u64(v: u64) -> Self {
        Self(v)
    }

    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// 64-bit AVTP stream id: talker port MAC in the upper 48 bits, stream
/// unique id in the lower 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StreamId(u64);

impl StreamId {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_u64(v: u64) -> Self {
        Self(v)
    }

    /// Compose from the talker's port MAC and the stream unique id.
    #[must_use]
    pub fn from_mac(mac: &MacAddr, unique_id: u16) -> Self {
        let mut v: u64 = 0;
        for b in mac.as_bytes() {
            v = (v << 8) | u64::from(*b);
        }
        Self((v << 16) | u64::from(unique_id))
    }

    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// 48-bit Ethernet MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub const ZERO: Self = Self([0; 6]);

    #[must_use]
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }

    #[must_use]
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 1 == 1
    }

    /// Deterministic per-stream destination MAC in the MAAP dynamic range,
    /// used by IEEE talkers when no MAAP allocation is running. Hashes
    /// (entity id, stream index) into the low 22 bits of 91:E0:F0:00:00:00.
    #[must_use]
    pub fn derived_for_talker(entity: EntityId, unique_id: u16) -> Self {
        let mut h = entity.as_u64() ^ (u64::from(unique_id).rotate_left(48));
        // xor-fold 64 -> 22 bits
        h ^= h >> 32;
        h ^= h >> 11;
        let low = (h & 0x003f_ffff) as u32;
        Self([
            0x91,
            0xe0,
            0xf0,
            ((low >> 16) & 0x3f) as u8,
            ((low >> 8) & 0xff) as u8,
            (low & 0xff) as u8,
        ])
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// Logical port (AVB interface) number on the local host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PortId(pub u16);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port{}", self.0)
    }
}
