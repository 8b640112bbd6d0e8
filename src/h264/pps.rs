// Copyright (C) 2026 the Vigil authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Picture parameter set parsing (ITU-T H.264 section 7.3.2.2).

use crate::bits::BitReader;
use crate::Error;

use super::sps::{read_scaling_lists, SCALING_LIST_LEN};

/// Upper bound on slice groups (`num_slice_groups_minus1` is 0..=7).
const MAX_SLICE_GROUPS: usize = 8;

/// A parsed picture parameter set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PpsInfo {
    pub id: u32,
    pub sps_id: u32,
    pub entropy_coding_mode: bool,
    pub bottom_field_pic_order_in_frame_present: bool,
    pub num_slice_groups_minus1: u32,
    pub slice_group_map_type: u32,
    pub run_length_minus1: [u32; MAX_SLICE_GROUPS],
    pub top_left: [u32; MAX_SLICE_GROUPS],
    pub bottom_right: [u32; MAX_SLICE_GROUPS],
    pub slice_group_change_direction: bool,
    pub slice_group_change_rate_minus1: u32,
    pub pic_size_in_map_units_minus1: u32,
    pub slice_group_id: Vec<u8>,
    pub num_ref_idx_l0_default_active_minus1: u32,
    pub num_ref_idx_l1_default_active_minus1: u32,
    pub weighted_pred: bool,
    pub weighted_bipred_idc: u8,
    pub pic_init_qp_minus26: i32,
    pub pic_init_qs_minus26: i32,
    pub chroma_qp_index_offset: i32,
    pub deblocking_filter_control_present: bool,
    pub constrained_intra_pred: bool,
    pub redundant_pic_cnt_present: bool,
    pub transform_8x8_mode: bool,
    pub scaling_matrix_present: bool,
    pub scaling_list_present: u32,
    pub scaling_list: Box<[i32; SCALING_LIST_LEN]>,
    pub use_default_scaling_matrix: [bool; 12],
    pub second_chroma_qp_index_offset: i32,
}

impl Default for PpsInfo {
    fn default() -> Self {
        PpsInfo {
            id: 0,
            sps_id: 0,
            entropy_coding_mode: false,
            bottom_field_pic_order_in_frame_present: false,
            num_slice_groups_minus1: 0,
            slice_group_map_type: 0,
            run_length_minus1: [0; MAX_SLICE_GROUPS],
            top_left: [0; MAX_SLICE_GROUPS],
            bottom_right: [0; MAX_SLICE_GROUPS],
            slice_group_change_direction: false,
            slice_group_change_rate_minus1: 0,
            pic_size_in_map_units_minus1: 0,
            slice_group_id: Vec::new(),
            num_ref_idx_l0_default_active_minus1: 0,
            num_ref_idx_l1_default_active_minus1: 0,
            weighted_pred: false,
            weighted_bipred_idc: 0,
            pic_init_qp_minus26: 0,
            pic_init_qs_minus26: 0,
            chroma_qp_index_offset: 0,
            deblocking_filter_control_present: false,
            constrained_intra_pred: false,
            redundant_pic_cnt_present: false,
            transform_8x8_mode: false,
            scaling_matrix_present: false,
            scaling_list_present: 0,
            scaling_list: Box::new([0; SCALING_LIST_LEN]),
            use_default_scaling_matrix: [false; 12],
            second_chroma_qp_index_offset: 0,
        }
    }
}

/// Parses a PPS from RBSP bytes, excluding the NAL header byte.
///
/// `chroma_format_idc` comes from the SPS this PPS references and drives
/// the scaling-list count when `transform_8x8_mode` is on.
pub fn parse(buf: &[u8], chroma_format_idc: u32) -> Result<PpsInfo, Error> {
    let mut pps = PpsInfo::default();
    let r = &mut BitReader::new(buf);
    pps.id = r.read_ue()?;
    pps.sps_id = r.read_ue()?;
    pps.entropy_coding_mode = r.read_flag()?;
    pps.bottom_field_pic_order_in_frame_present = r.read_flag()?;
    pps.num_slice_groups_minus1 = r.read_ue()?;
    if pps.num_slice_groups_minus1 as usize >= MAX_SLICE_GROUPS {
        return Err(Error::InvalidParameter(format!(
            "num_slice_groups_minus1 {} out of range",
            pps.num_slice_groups_minus1
        )));
    }
    if pps.num_slice_groups_minus1 > 0 {
        pps.slice_group_map_type = r.read_ue()?;
        match pps.slice_group_map_type {
            0 => {
                for i in 0..=pps.num_slice_groups_minus1 as usize {
                    pps.run_length_minus1[i] = r.read_ue()?;
                }
            }
            2 => {
                for i in 0..pps.num_slice_groups_minus1 as usize {
                    pps.top_left[i] = r.read_ue()?;
                    pps.bottom_right[i] = r.read_ue()?;
                }
            }
            3..=5 => {
                pps.slice_group_change_direction = r.read_flag()?;
                pps.slice_group_change_rate_minus1 = r.read_ue()?;
            }
            6 => {
                pps.pic_size_in_map_units_minus1 = r.read_ue()?;
                let n = pps.pic_size_in_map_units_minus1 as usize + 1;
                let bits = u64::from(u32::BITS - pps.num_slice_groups_minus1.leading_zeros());
                pps.slice_group_id = Vec::with_capacity(n);
                for _ in 0..n {
                    pps.slice_group_id.push(r.read_byte(bits)?);
                }
            }
            _ => {}
        }
    }
    pps.num_ref_idx_l0_default_active_minus1 = r.read_ue()?;
    pps.num_ref_idx_l1_default_active_minus1 = r.read_ue()?;
    pps.weighted_pred = r.read_flag()?;
    pps.weighted_bipred_idc = r.read_byte(2)?;
    pps.pic_init_qp_minus26 = r.read_se()?;
    pps.pic_init_qs_minus26 = r.read_se()?;
    pps.chroma_qp_index_offset = r.read_se()?;
    pps.deblocking_filter_control_present = r.read_flag()?;
    pps.constrained_intra_pred = r.read_flag()?;
    pps.redundant_pic_cnt_present = r.read_flag()?;
    if r.has_more_rbsp_data() {
        pps.transform_8x8_mode = r.read_flag()?;
        pps.scaling_matrix_present = r.read_flag()?;
        if pps.scaling_matrix_present {
            let nlists = match (pps.transform_8x8_mode, chroma_format_idc) {
                (false, _) => 6,
                (true, 3) => 12,
                (true, _) => 8,
            };
            pps.use_default_scaling_matrix = read_scaling_lists(
                r,
                nlists,
                &mut pps.scaling_list,
                &mut pps.scaling_list_present,
            )?;
        }
        pps.second_chroma_qp_index_offset = r.read_se()?;
    }
    Ok(pps)
}
