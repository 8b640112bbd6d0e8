// Copyright (C) 2026 the Vigil authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Id-indexed storage for sequence and picture parameter sets.

use std::collections::HashMap;

use super::{pps, pps::PpsInfo, sps, sps::SpsInfo, NAL_PPS, NAL_SPS};
use crate::Error;

/// The current parameter sets, indexed by id for quick slice-time lookup.
/// Redelivery of an id replaces the previous set; readers always see the
/// most recent one.
#[derive(Debug, Default)]
pub struct ParameterSets {
    sps: HashMap<u32, SpsInfo>,
    pps: HashMap<u32, PpsInfo>,
}

impl ParameterSets {
    pub fn new() -> Self {
        ParameterSets::default()
    }

    /// Parses and stores an SPS from RBSP bytes (no NAL header).
    pub fn parse_sps(&mut self, buf: &[u8]) -> Result<(), Error> {
        let sps = sps::parse(buf)?;
        self.sps.insert(sps.id, sps);
        Ok(())
    }

    /// Parses and stores a PPS from RBSP bytes (no NAL header).
    ///
    /// The scaling-list count depends on the chroma format of the SPS this
    /// PPS references; when that SPS has not been delivered yet, 3 (4:4:4)
    /// is assumed, which selects the largest count.
    pub fn parse_pps(&mut self, buf: &[u8]) -> Result<(), Error> {
        let mut chroma_format_idc = 3;
        let r = &mut crate::bits::BitReader::new(buf);
        r.read_ue()?; // pic_parameter_set_id
        if let Some(sps) = self.sps.get(&r.read_ue()?) {
            chroma_format_idc = sps.chroma_format_idc;
        }
        let pps = pps::parse(buf, chroma_format_idc)?;
        self.pps.insert(pps.id, pps);
        Ok(())
    }

    /// Ingests one NAL from an SDP `sprop-parameter-sets` value (or an
    /// in-band parameter-set NAL): the first byte is the NAL header, and
    /// types other than SPS/PPS are ignored. The body is EBSP and gets its
    /// emulation prevention bytes stripped before parsing.
    pub fn ingest_sprop(&mut self, buf: &[u8]) -> Result<(), Error> {
        let Some((&header, body)) = buf.split_first() else {
            return Ok(());
        };
        match header & 0x1f {
            NAL_SPS => self.parse_sps(&super::annexb::ebsp_to_rbsp(body)),
            NAL_PPS => self.parse_pps(&super::annexb::ebsp_to_rbsp(body)),
            _ => Ok(()),
        }
    }

    pub fn sps(&self, id: u32) -> Option<&SpsInfo> {
        self.sps.get(&id)
    }

    pub fn pps(&self, id: u32) -> Option<&PpsInfo> {
        self.pps.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPS_NAL: &[u8] = &[
        0x67, 0x7a, 0x00, 0x1f, 0xbc, 0xd9, 0x40, 0x50, 0x05, 0xba, 0x10, 0x00, 0x00, 0x03, 0x00,
        0xc0, 0x00, 0x00, 0x2a, 0xe0, 0xf1, 0x83, 0x19, 0x60,
    ];
    const PPS_NAL: &[u8] = &[0x68, 0xee, 0x3c, 0x80];

    #[test]
    fn ingest_by_nal_type() {
        let mut sets = ParameterSets::new();
        sets.ingest_sprop(SPS_NAL).unwrap();
        sets.ingest_sprop(PPS_NAL).unwrap();
        // An SEI NAL is ignored without error.
        sets.ingest_sprop(&[0x06, 0x05, 0x01, 0x00]).unwrap();

        let sps = sets.sps(0).expect("sps 0 stored");
        assert_eq!((sps.width, sps.height), (1280, 720));
        let pps = sets.pps(0).expect("pps 0 stored");
        assert_eq!(pps.sps_id, 0);
        assert!(sets.sps(1).is_none());
        assert!(sets.pps(1).is_none());
    }

    #[test]
    fn redelivery_replaces() {
        let mut sets = ParameterSets::new();
        sets.ingest_sprop(SPS_NAL).unwrap();
        assert_eq!(sets.sps(0).unwrap().width, 1280);

        let smaller: &[u8] = &[
            0x67, 0x7a, 0x00, 0x1e, 0xbc, 0xd9, 0x40, 0xa0, 0x2f, 0xf8, 0x98, 0x40, 0x00, 0x00,
            0x03, 0x01, 0x80, 0x00, 0x00, 0x56, 0x83, 0xc5, 0x8b, 0x65, 0x80,
        ];
        sets.ingest_sprop(smaller).unwrap();
        assert_eq!(sets.sps(0).unwrap().width, 640);
    }

    #[test]
    fn empty_sprop_is_ignored() {
        let mut sets = ParameterSets::new();
        sets.ingest_sprop(&[]).unwrap();
        assert!(sets.sps(0).is_none());
    }
}
