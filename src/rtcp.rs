// Copyright (C) 2026 the Vigil authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTCP header handling as described in
//! [RFC 3550 section 6](https://datatracker.ietf.org/doc/html/rfc3550#section-6).
//!
//! Only the Sender Report body is materialized; report blocks are length
//! validated but left to the (out of scope) report arithmetic. Other packet
//! types parse to their four-byte header.

use bytes::{BufMut, Bytes, BytesMut};

use crate::Error;

/// Version bits expected in the first header byte.
const VERSION: u8 = 2 << 6;

/// Length of the common packet header.
pub const HEADER_SIZE: usize = 4;

/// Packet type of a Sender Report.
pub const PT_SENDER_REPORT: u8 = 200;

/// Packet type of a Receiver Report.
pub const PT_RECEIVER_REPORT: u8 = 201;

/// A parsed RTCP packet.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|    C    |      PT       |             length            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// :                              ...                              :
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, Debug)]
pub struct Packet {
    /// Version, padding, report count.
    pub vpc: u8,
    /// Packet type.
    pub pt: u8,
    /// Packet length in 32-bit units, excluding this header.
    pub length: u16,
    /// Sender info, present iff `pt` is [`PT_SENDER_REPORT`].
    pub sender_report: Option<SenderInfo>,
}

/// The sender-info block of a Sender Report
/// ([RFC 3550 section 6.4.1](https://datatracker.ietf.org/doc/html/rfc3550#section-6.4.1)).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SenderInfo {
    pub ssrc: u32,
    pub ntp_timestamp: u64,
    pub rtp_timestamp: u32,
    pub packet_count: u32,
    pub octet_count: u32,
}

impl Packet {
    /// Validates and unpacks a wire packet.
    pub fn unpack(buf: &[u8]) -> Result<Packet, Error> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::PacketTooShort);
        }
        if buf[0] & 0xc0 != VERSION {
            return Err(Error::InvalidVersion);
        }
        let mut pkt = Packet {
            vpc: buf[0],
            pt: buf[1],
            length: u16::from_be_bytes([buf[2], buf[3]]),
            sender_report: None,
        };
        if pkt.pt == PT_SENDER_REPORT {
            // Header + SSRC + sender info, then one 24-byte block per
            // advertised report.
            if buf.len() < 28 + usize::from(pkt.count()) * 24 {
                return Err(Error::PacketTooShort);
            }
            pkt.sender_report = Some(SenderInfo {
                ssrc: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
                ntp_timestamp: u64::from_be_bytes([
                    buf[8], buf[9], buf[10], buf[11], buf[12], buf[13], buf[14], buf[15],
                ]),
                rtp_timestamp: u32::from_be_bytes([buf[16], buf[17], buf[18], buf[19]]),
                packet_count: u32::from_be_bytes([buf[20], buf[21], buf[22], buf[23]]),
                octet_count: u32::from_be_bytes([buf[24], buf[25], buf[26], buf[27]]),
            });
        }
        Ok(pkt)
    }

    /// Packs the header and, for a Sender Report, the sender-info block.
    pub fn pack(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + 24);
        buf.put_u8(self.vpc);
        buf.put_u8(self.pt);
        buf.put_u16(self.length);
        if let Some(sr) = &self.sender_report {
            buf.put_u32(sr.ssrc);
            buf.put_u64(sr.ntp_timestamp);
            buf.put_u32(sr.rtp_timestamp);
            buf.put_u32(sr.packet_count);
            buf.put_u32(sr.octet_count);
        }
        buf.freeze()
    }

    /// Padding flag.
    #[inline]
    pub fn padding(&self) -> bool {
        self.vpc & 0x20 != 0
    }

    /// Report (or source) count.
    #[inline]
    pub fn count(&self) -> u8 {
        self.vpc & 0x1f
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A live camera sender report with one SDES packet behind it.
    const SENDER_REPORT: &[u8] = &[
        0x80, 0xc8, 0x00, 0x06, 0x66, 0x42, 0x6a, 0xe1, 0xe4, 0x36, 0x2f, 0x99, 0xcc, 0xcc, 0xcc,
        0xcc, 0x85, 0x2e, 0xf8, 0x07, 0x00, 0x2a, 0x43, 0x33, 0x2f, 0x4c, 0x34, 0x1d,
    ];

    #[test]
    fn unpack_sender_report() {
        let pkt = Packet::unpack(SENDER_REPORT).unwrap();
        assert_eq!(pkt.pt, PT_SENDER_REPORT);
        assert_eq!(pkt.length, 6);
        assert_eq!(pkt.count(), 0);
        let sr = pkt.sender_report.as_ref().unwrap();
        assert_eq!(sr.ssrc, 0x66426ae1);
        assert_eq!(sr.ntp_timestamp, 0xe4362f99cccccccc);
        assert_eq!(sr.rtp_timestamp, 0x852ef807);
        assert_eq!(sr.packet_count, 0x002a4333);
        assert_eq!(sr.octet_count, 0x2f4c341d);
    }

    #[test]
    fn header_round_trip() {
        let pkt = Packet::unpack(SENDER_REPORT).unwrap();
        assert_eq!(&pkt.pack()[..], SENDER_REPORT);
    }

    #[test]
    fn other_types_parse_header_only() {
        let bye: &[u8] = &[0x81, 0xcb, 0x00, 0x01, 0x66, 0x42, 0x6a, 0xe1];
        let pkt = Packet::unpack(bye).unwrap();
        assert_eq!(pkt.pt, 203);
        assert_eq!(pkt.count(), 1);
        assert!(pkt.sender_report.is_none());
    }

    #[test]
    fn sender_report_length_check() {
        // Claims two report blocks but carries none.
        let mut short = SENDER_REPORT.to_vec();
        short[0] = 0x82;
        assert!(matches!(
            Packet::unpack(&short),
            Err(Error::PacketTooShort)
        ));
    }

    #[test]
    fn rejects_wrong_version() {
        let wire: &[u8] = &[0x00, 0xc8, 0x00, 0x00];
        assert!(matches!(Packet::unpack(wire), Err(Error::InvalidVersion)));
    }
}
