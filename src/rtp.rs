// Copyright (C) 2026 the Vigil authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTP fixed-header handling as described in
//! [RFC 3550 section 5.1](https://datatracker.ietf.org/doc/html/rfc3550#section-5.1).

use bytes::{BufMut, Bytes, BytesMut};

use crate::Error;

/// Version bits expected in the first header byte.
const VERSION: u8 = 2 << 6;

/// Length of the fixed part of the header, through the SSRC.
pub const HEADER_SIZE: usize = 12;

/// A parsed RTP packet.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       sequence number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |           synchronization source (SSRC) identifier            |
/// +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// |            contributing source (CSRC) identifiers             |
/// |                             ....                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, Debug)]
pub struct Packet {
    /// Version, padding, extension, CSRC count.
    pub vpxcc: u8,
    /// Marker and payload type.
    pub mpt: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    pub extension: Option<Extension>,
    pub payload: Bytes,
}

/// A profile-specific header extension (RFC 3550 section 5.3.1).
#[derive(Clone, Debug)]
pub struct Extension {
    pub id: u16,
    /// Opaque extension words; the wire length field counts these in
    /// 32-bit units.
    pub data: Bytes,
}

impl Packet {
    /// Validates and unpacks a wire packet. The buffer is consumed so the
    /// payload can alias it without a copy.
    pub fn unpack(buf: Bytes) -> Result<Packet, Error> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::PacketTooShort);
        }
        if buf[0] & 0xc0 != VERSION {
            return Err(Error::InvalidVersion);
        }
        let mut pkt = Packet {
            vpxcc: buf[0],
            mpt: buf[1],
            sequence_number: u16::from_be_bytes([buf[2], buf[3]]),
            timestamp: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            ssrc: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            csrc: Vec::new(),
            extension: None,
            payload: Bytes::new(),
        };
        let mut off = HEADER_SIZE;
        for _ in 0..pkt.csrc_count() {
            if buf.len() < off + 4 {
                return Err(Error::PacketTooShort);
            }
            pkt.csrc
                .push(u32::from_be_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]]));
            off += 4;
        }
        if pkt.has_extension() {
            if buf.len() < off + 4 {
                return Err(Error::PacketTooShort);
            }
            let id = u16::from_be_bytes([buf[off], buf[off + 1]]);
            let words = usize::from(u16::from_be_bytes([buf[off + 2], buf[off + 3]]));
            off += 4;
            if buf.len() < off + words * 4 {
                return Err(Error::PacketTooShort);
            }
            pkt.extension = Some(Extension {
                id,
                data: buf.slice(off..off + words * 4),
            });
            off += words * 4;
        }
        pkt.payload = buf.slice(off..);
        Ok(pkt)
    }

    /// Packs the header (fixed part, CSRCs, extension). The payload is the
    /// caller's to append.
    pub fn pack_header(&self) -> Bytes {
        let ext_len = self.extension.as_ref().map(|e| 4 + e.data.len()).unwrap_or(0);
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.csrc.len() * 4 + ext_len);
        buf.put_u8(self.vpxcc);
        buf.put_u8(self.mpt);
        buf.put_u16(self.sequence_number);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);
        for csrc in &self.csrc {
            buf.put_u32(*csrc);
        }
        if let Some(ext) = &self.extension {
            buf.put_u16(ext.id);
            buf.put_u16((ext.data.len() / 4) as u16);
            buf.put_slice(&ext.data);
        }
        buf.freeze()
    }

    /// Padding flag.
    #[inline]
    pub fn padding(&self) -> bool {
        self.vpxcc & 0x20 != 0
    }

    /// Extension flag.
    #[inline]
    pub fn has_extension(&self) -> bool {
        self.vpxcc & 0x10 != 0
    }

    /// Contributing source count.
    #[inline]
    pub fn csrc_count(&self) -> u8 {
        self.vpxcc & 0x0f
    }

    /// Marker flag.
    #[inline]
    pub fn mark(&self) -> bool {
        self.mpt & 0x80 != 0
    }

    /// Payload type.
    #[inline]
    pub fn payload_type(&self) -> u8 {
        self.mpt & 0x7f
    }
}
