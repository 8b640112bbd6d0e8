// Copyright (C) 2026 the Vigil authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [H.264](https://www.itu.int/rec/T-REC-H.264-201906-I/en) network layer:
//! Annex B handling, SPS/PPS parsing, and an [RFC
//! 6184](https://tools.ietf.org/html/rfc6184) depacketizer that accepts RTP
//! payloads and emits complete NAL units.

use bytes::Bytes;

use crate::Error;

pub mod annexb;
mod params;
pub mod pps;
pub mod sps;

pub use params::ParameterSets;

/// NAL unit types this crate dispatches on. The full table lives in
/// ITU-T H.264 section 7.4.1 and RFC 6184 section 5.2.
pub const NAL_NON_IDR: u8 = 1;
pub const NAL_IDR: u8 = 5;
pub const NAL_SEI: u8 = 6;
pub const NAL_SPS: u8 = 7;
pub const NAL_PPS: u8 = 8;
pub const NAL_STAP_A: u8 = 24;
pub const NAL_STAP_B: u8 = 25;
pub const NAL_MTAP16: u8 = 26;
pub const NAL_MTAP24: u8 = 27;
pub const NAL_FU_A: u8 = 28;
pub const NAL_FU_B: u8 = 29;

/// One complete NAL unit recovered from the RTP stream.
///
/// ```text
/// +---------------+
/// |0|1|2|3|4|5|6|7|
/// +-+-+-+-+-+-+-+-+
/// |F|NRI|  Type   |
/// +---------------+
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NalUnit {
    pub header: u8,
    /// Decoding order number, for reorder recovery via [`don_diff`].
    pub don: u16,
    /// RTP timestamp of the packet(s) carrying this unit.
    pub timestamp: u32,
    /// Unit payload, excluding the header byte.
    pub data: Bytes,
}

impl NalUnit {
    /// True when the forbidden zero bit is actually zero.
    #[inline]
    pub fn zero_bit_valid(&self) -> bool {
        self.header & 0x80 == 0
    }

    /// Reference importance, 0 meaning disposable.
    #[inline]
    pub fn ref_idc(&self) -> u8 {
        (self.header & 0x60) >> 5
    }

    #[inline]
    pub fn unit_type(&self) -> u8 {
        self.header & 0x1f
    }
}

/// One fragment of a fragmented NAL, with its FU header flags.
///
/// ```text
/// +---------------+
/// |0|1|2|3|4|5|6|7|
/// +-+-+-+-+-+-+-+-+
/// |S|E|R|  Type   |
/// +---------------+
/// ```
#[derive(Clone, Debug)]
struct NalFragment {
    unit: NalUnit,
    flags: u8,
}

impl NalFragment {
    #[inline]
    fn is_start(&self) -> bool {
        self.flags & 0x80 != 0
    }

    #[inline]
    fn is_end(&self) -> bool {
        self.flags & 0x40 != 0
    }
}

/// Depacketizer state: accepts RTP payloads via [`NalSink::push`] and
/// collects completed units in [`NalSink::units`].
///
/// The unit buffer is reset on every push, so callers drain it between
/// pushes. Fragments accumulate across pushes until an End-flagged fragment
/// completes the series; a new Start-flagged fragment discards any
/// incomplete series.
#[derive(Debug, Default)]
pub struct NalSink {
    /// Units completed by the most recent push.
    pub units: Vec<NalUnit>,
    fragments: Vec<NalFragment>,
    don: u16,
}

impl NalSink {
    pub fn new() -> Self {
        NalSink {
            units: Vec::with_capacity(20),
            fragments: Vec::with_capacity(20),
            don: 0,
        }
    }

    /// Pushes one RTP payload. The payload may be a bare RFC 6184 packet or
    /// an Annex B sequence of them; units completed by this payload are left
    /// in [`Self::units`].
    pub fn push(&mut self, payload: &[u8], timestamp: u32) -> Result<(), Error> {
        self.units.clear();
        for unit in annexb::split(payload) {
            self.parse_nal(unit, timestamp)?;
        }
        Ok(())
    }

    fn parse_nal(&mut self, buf: Vec<u8>, timestamp: u32) -> Result<(), Error> {
        let Some(&header) = buf.first() else {
            return Err(Error::PacketTooShort);
        };
        match header & 0x1f {
            NAL_STAP_A | NAL_STAP_B => {
                self.parse_stap(header & 0x1f, &buf[1..], timestamp)
            }
            NAL_MTAP16 | NAL_MTAP24 => {
                self.parse_mtap(header & 0x1f, &buf[1..], timestamp)
            }
            NAL_FU_A => {
                // Outer byte carries NRI, byte 1 the fragment flags and the
                // original type.
                if buf.len() < 2 {
                    return Err(Error::PacketTooShort);
                }
                let nri = header & 0x60;
                let reconstructed = nri | (buf[1] & 0x1f);
                let flags = buf[1];
                let don = self.don;
                self.add_fragment(reconstructed, flags, don, timestamp, &buf[2..]);
                Ok(())
            }
            NAL_FU_B => {
                // FU-B additionally carries an explicit 16-bit DON.
                if buf.len() < 4 {
                    return Err(Error::PacketTooShort);
                }
                let nri = header & 0x60;
                let reconstructed = nri | (buf[1] & 0x1f);
                let flags = buf[1];
                let don = u16::from_be_bytes([buf[2], buf[3]]);
                self.add_fragment(reconstructed, flags, don, timestamp, &buf[4..]);
                Ok(())
            }
            _ => {
                // Types 1-23 (and anything unrecognized) travel whole.
                let mut data = Bytes::from(buf);
                let _ = data.split_to(1);
                self.units.push(NalUnit {
                    header,
                    don: self.don,
                    timestamp,
                    data,
                });
                self.don = self.don.wrapping_add(1);
                Ok(())
            }
        }
    }

    /// Single-time aggregation packets: STAP-B leads with a DON base, then
    /// both forms repeat {16-bit size, unit}.
    fn parse_stap(&mut self, typ: u8, mut buf: &[u8], timestamp: u32) -> Result<(), Error> {
        if typ == NAL_STAP_B {
            if buf.len() < 2 {
                return Err(Error::PacketTooShort);
            }
            self.don = u16::from_be_bytes([buf[0], buf[1]]);
            buf = &buf[2..];
        }
        loop {
            if buf.len() < 2 {
                // Trailing remnant too short for a size field; not an error.
                return Ok(());
            }
            let size = usize::from(u16::from_be_bytes([buf[0], buf[1]]));
            if size == 0 || buf.len() < size + 2 {
                return Err(Error::PacketTooShort);
            }
            self.units.push(NalUnit {
                header: buf[2],
                don: self.don,
                timestamp,
                data: Bytes::copy_from_slice(&buf[3..size + 2]),
            });
            self.don = self.don.wrapping_add(1);
            buf = &buf[size + 2..];
        }
    }

    /// Multi-time aggregation packets: a DON base, then repeated
    /// {16-bit size, 8-bit DON offset, 16- or 24-bit timestamp offset,
    /// unit}; offsets add to the base DON and the packet timestamp.
    fn parse_mtap(&mut self, typ: u8, mut buf: &[u8], timestamp: u32) -> Result<(), Error> {
        if buf.len() < 2 {
            return Err(Error::PacketTooShort);
        }
        self.don = u16::from_be_bytes([buf[0], buf[1]]);
        buf = &buf[2..];
        let head = if typ == NAL_MTAP24 { 6 } else { 5 };
        loop {
            if buf.len() < head {
                return Ok(());
            }
            let size = usize::from(u16::from_be_bytes([buf[0], buf[1]]));
            let dond = u16::from(buf[2]);
            let ts_offset = if typ == NAL_MTAP24 {
                u32::from(buf[3]) << 16 | u32::from(buf[4]) << 8 | u32::from(buf[5])
            } else {
                u32::from(buf[3]) << 8 | u32::from(buf[4])
            };
            if size == 0 || buf.len() < size + head {
                return Err(Error::PacketTooShort);
            }
            self.units.push(NalUnit {
                header: buf[head],
                don: self.don.wrapping_add(dond),
                timestamp: timestamp.wrapping_add(ts_offset),
                data: Bytes::copy_from_slice(&buf[head + 1..size + head]),
            });
            self.don = self.don.wrapping_add(1);
            buf = &buf[size + head..];
        }
    }

    /// Queues a fragment; a Start flag resets the series and an End flag
    /// concatenates the series into one unit under the reconstructed header.
    fn add_fragment(&mut self, header: u8, flags: u8, don: u16, timestamp: u32, data: &[u8]) {
        let fragment = NalFragment {
            unit: NalUnit {
                header,
                don,
                timestamp,
                data: Bytes::copy_from_slice(data),
            },
            flags,
        };
        if fragment.is_start() {
            self.fragments.clear();
        }
        let complete = fragment.is_end();
        self.fragments.push(fragment);
        if complete {
            let len = self.fragments.iter().map(|f| f.unit.data.len()).sum();
            let mut data = Vec::with_capacity(len);
            for frag in &self.fragments {
                data.extend_from_slice(&frag.unit.data);
            }
            self.fragments.clear();
            self.units.push(NalUnit {
                header,
                don,
                timestamp,
                data: data.into(),
            });
        }
    }
}

/// Signed distance from `a` to `b` on the circular 16-bit decoding-order
/// space, in `[-32768, 32767]`.
#[inline]
pub fn don_diff(a: u16, b: u16) -> i32 {
    i32::from(b.wrapping_sub(a) as i16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_nals_from_annex_b() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x80, 0x20, 0xda, 0x01, 0x40, 0x16, 0xe8, 0x06,
            0xd0, 0xa1, 0x35, 0x00, 0x00, 0x00, 0x01, 0x68, 0xce, 0x06, 0xe2, 0x00, 0x00, 0x00,
            0x01, 0x65, 0xb8, 0x40, 0xf0, 0x8c, 0x03, 0xf2, 0x75, 0x67, 0xad, 0x41, 0x64, 0x24,
            0x0e, 0xa0, 0xb2, 0x12, 0x1e, 0xf8,
        ];
        let mut sink = NalSink::new();
        sink.push(data, 3000).unwrap();
        assert_eq!(sink.units.len(), 3);
        let types: Vec<u8> = sink.units.iter().map(|u| u.unit_type()).collect();
        assert_eq!(types, vec![NAL_SPS, NAL_PPS, NAL_IDR]);
        let dons: Vec<u16> = sink.units.iter().map(|u| u.don).collect();
        assert_eq!(dons, vec![0, 1, 2]);
        assert!(sink.units.iter().all(|u| u.timestamp == 3000));
        assert_eq!(sink.units[2].ref_idc(), 3);
        assert_eq!(sink.units[2].data.len(), 18);
    }

    #[test]
    fn units_reset_per_push() {
        let mut sink = NalSink::new();
        sink.push(&[0x06, 0xaa], 1).unwrap();
        assert_eq!(sink.units.len(), 1);
        sink.push(&[0x06, 0xbb], 2).unwrap();
        assert_eq!(sink.units.len(), 1);
        assert_eq!(&sink.units[0].data[..], &[0xbb]);
    }

    #[test]
    fn stap_a() {
        let payload = b"\x18\x00\x09\x06stap-a 1\x00\x09\x06stap-a 2";
        let mut sink = NalSink::new();
        sink.push(payload, 1234).unwrap();
        assert_eq!(sink.units.len(), 2);
        assert_eq!(sink.units[0].unit_type(), NAL_SEI);
        assert_eq!(&sink.units[0].data[..], b"stap-a 1");
        assert_eq!(&sink.units[1].data[..], b"stap-a 2");
        assert_eq!(sink.units[1].don, sink.units[0].don + 1);
    }

    #[test]
    fn stap_b_sets_don_base() {
        // DON base 0x0102, then one 4-byte unit.
        let payload: &[u8] = &[0x19, 0x01, 0x02, 0x00, 0x04, 0x41, 0xaa, 0xbb, 0xcc];
        let mut sink = NalSink::new();
        sink.push(payload, 0).unwrap();
        assert_eq!(sink.units.len(), 1);
        assert_eq!(sink.units[0].don, 0x0102);
    }

    #[test]
    fn stap_trailing_remnant_is_ignored() {
        let payload: &[u8] = &[0x18, 0x00, 0x02, 0x41, 0xaa, 0x00];
        let mut sink = NalSink::new();
        sink.push(payload, 0).unwrap();
        assert_eq!(sink.units.len(), 1);
    }

    #[test]
    fn stap_size_overrun_errors() {
        let payload: &[u8] = &[0x18, 0x00, 0x09, 0x41, 0xaa];
        let mut sink = NalSink::new();
        assert!(matches!(sink.push(payload, 0), Err(Error::PacketTooShort)));
    }

    #[test]
    fn mtap16_offsets() {
        // DON base 5; one unit with DOND 2 and TS offset 0x0100.
        let payload: &[u8] = &[
            0x1a, 0x00, 0x05, 0x00, 0x03, 0x02, 0x01, 0x00, 0x61, 0xde, 0xad,
        ];
        let mut sink = NalSink::new();
        sink.push(payload, 1000).unwrap();
        assert_eq!(sink.units.len(), 1);
        assert_eq!(sink.units[0].don, 7);
        assert_eq!(sink.units[0].timestamp, 1256);
        assert_eq!(&sink.units[0].data[..], &[0xde, 0xad]);
    }

    #[test]
    fn mtap24_reads_full_offset() {
        // TS offset 0x010000 spans all three offset bytes; the unit is a
        // bare header.
        let payload: &[u8] = &[
            0x1b, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x61,
        ];
        let mut sink = NalSink::new();
        sink.push(payload, 7).unwrap();
        assert_eq!(sink.units.len(), 1);
        assert_eq!(sink.units[0].don, 1);
        assert_eq!(sink.units[0].timestamp, 65543);
        assert!(sink.units[0].data.is_empty());
    }

    #[test]
    fn fu_a_reassembly() {
        let mut sink = NalSink::new();
        // Outer NRI 0b11, inner type 5: reconstructed header 0x65.
        sink.push(b"\x7c\x85first ", 90).unwrap();
        assert!(sink.units.is_empty());
        sink.push(b"\x7c\x05middle ", 90).unwrap();
        assert!(sink.units.is_empty());
        sink.push(b"\x7c\x45last", 90).unwrap();
        assert_eq!(sink.units.len(), 1);
        let unit = &sink.units[0];
        assert_eq!(unit.header, 0x65);
        assert_eq!(unit.ref_idc(), 3);
        assert_eq!(unit.unit_type(), NAL_IDR);
        assert_eq!(&unit.data[..], b"first middle last");
    }

    #[test]
    fn fu_a_new_start_discards_incomplete_series() {
        let mut sink = NalSink::new();
        sink.push(b"\x7c\x85stale", 1).unwrap();
        sink.push(b"\x7c\x81fresh ", 2).unwrap();
        sink.push(b"\x7c\x41nal", 2).unwrap();
        assert_eq!(sink.units.len(), 1);
        assert_eq!(sink.units[0].header, 0x61);
        assert_eq!(&sink.units[0].data[..], b"fresh nal");
    }

    #[test]
    fn fu_b_carries_don() {
        let mut sink = NalSink::new();
        let mut payload = vec![0x7d, 0x85, 0x00, 0x2a];
        payload.extend_from_slice(b"one ");
        sink.push(&payload, 5).unwrap();
        let mut payload = vec![0x7d, 0x45, 0x00, 0x2b];
        payload.extend_from_slice(b"two");
        sink.push(&payload, 5).unwrap();
        assert_eq!(sink.units.len(), 1);
        assert_eq!(sink.units[0].don, 0x2b);
        assert_eq!(&sink.units[0].data[..], b"one two");
    }

    #[test]
    fn fu_too_short() {
        let mut sink = NalSink::new();
        assert!(matches!(sink.push(&[0x7c], 0), Err(Error::PacketTooShort)));
        assert!(matches!(
            sink.push(&[0x7d, 0x85, 0x00], 0),
            Err(Error::PacketTooShort)
        ));
    }

    #[test]
    fn don_diff_wraps() {
        assert_eq!(don_diff(0, 1), 1);
        assert_eq!(don_diff(1, 0), -1);
        assert_eq!(don_diff(0xffff, 0x0001), 2);
        assert_eq!(don_diff(0x0001, 0xffff), -2);
        assert_eq!(don_diff(0, 0x8000), -32768);
        assert_eq!(don_diff(0x8000, 0), -32768);
    }
}
