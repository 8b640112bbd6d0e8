// Copyright (C) 2026 the Vigil authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequence parameter set parsing (ITU-T H.264 section 7.3.2.1.1).

use crate::bits::BitReader;
use crate::Error;

/// Profiles that carry the chroma/bit-depth/scaling-matrix block.
const HIGH_PROFILES: [u8; 10] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138];

/// A parsed sequence parameter set.
///
/// Fields keep the standard's names, raw values as read. `width` and
/// `height` are computed afterwards from the macroblock counts,
/// interlacing, chroma subsampling, and cropping window. VUI parameters
/// are not parsed beyond their presence flag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpsInfo {
    pub profile_idc: u8,
    pub constraint_set: u8,
    pub level_idc: u8,
    pub id: u32,
    pub chroma_format_idc: u32,
    pub separate_colour_plane: bool,
    pub bit_depth_luma: u32,
    pub bit_depth_chroma: u32,
    pub zero_transform_bypass: bool,
    pub scaling_matrix_present: bool,
    pub scaling_list_present: u32,
    pub log2_max_frame_num: u32,
    pub pic_order_cnt_type: u32,
    pub log2_max_pic_order_cnt: u32,
    pub delta_pic_order_always_zero: bool,
    pub offset_for_non_ref_pic: i32,
    pub offset_for_top_to_bottom_field: i32,
    pub num_ref_frames_in_pic_order_cnt_cycle: u32,
    pub max_num_ref_frames: u32,
    pub gaps_in_frame_num_value_allowed: bool,
    pub pic_width_in_mbs_minus1: u32,
    pub pic_height_in_map_units_minus1: u32,
    pub frame_mbs_only: bool,
    pub mb_adaptive_frame_field: bool,
    pub direct_8x8_inference: bool,
    pub frame_cropping: bool,
    pub frame_crop_left_offset: u32,
    pub frame_crop_right_offset: u32,
    pub frame_crop_top_offset: u32,
    pub frame_crop_bottom_offset: u32,
    pub vui_parameters_present: bool,
    pub width: u32,
    pub height: u32,
}

/// Scaling list storage shared by SPS and PPS: six 4x4 lists then six 8x8.
pub(crate) const SCALING_LIST_LEN: usize = 6 * 16 + 6 * 64;

impl SpsInfo {
    /// Chroma sampling divisors per ITU-T H.264 table 6-1.
    /// `separate_colour_plane` forces (1, 1) since each plane is then coded
    /// as its own monochrome picture.
    pub(crate) fn sub_dimensions(chroma_format_idc: u32, separate_colour_plane: bool) -> (u32, u32) {
        if separate_colour_plane {
            return (1, 1);
        }
        match chroma_format_idc {
            1 => (2, 2),
            2 => (2, 1),
            _ => (1, 1),
        }
    }
}

/// Parses an SPS from RBSP bytes, excluding the NAL header byte.
pub fn parse(buf: &[u8]) -> Result<SpsInfo, Error> {
    let mut sps = SpsInfo {
        chroma_format_idc: 1,
        ..SpsInfo::default()
    };
    let r = &mut BitReader::new(buf);
    sps.profile_idc = r.read_byte(8)?;
    sps.constraint_set = r.read_byte(8)?;
    sps.level_idc = r.read_byte(8)?;
    sps.id = r.read_ue()?;
    if HIGH_PROFILES.contains(&sps.profile_idc) {
        sps.chroma_format_idc = r.read_ue()?;
        if sps.chroma_format_idc == 3 {
            sps.separate_colour_plane = r.read_flag()?;
        }
        sps.bit_depth_luma = r.read_ue()?;
        sps.bit_depth_chroma = r.read_ue()?;
        sps.zero_transform_bypass = r.read_flag()?;
        sps.scaling_matrix_present = r.read_flag()?;
        if sps.scaling_matrix_present {
            let nlists = if sps.chroma_format_idc == 3 { 12 } else { 8 };
            let mut scratch = [0i32; SCALING_LIST_LEN];
            read_scaling_lists(r, nlists, &mut scratch, &mut sps.scaling_list_present)?;
        }
    }
    sps.log2_max_frame_num = r.read_ue()?;
    sps.pic_order_cnt_type = r.read_ue()?;
    if sps.pic_order_cnt_type == 0 {
        sps.log2_max_pic_order_cnt = r.read_ue()?;
    } else {
        sps.delta_pic_order_always_zero = r.read_flag()?;
        sps.offset_for_non_ref_pic = r.read_se()?;
        sps.offset_for_top_to_bottom_field = r.read_se()?;
        sps.num_ref_frames_in_pic_order_cnt_cycle = r.read_ue()?;
        for _ in 0..sps.num_ref_frames_in_pic_order_cnt_cycle {
            r.read_se()?;
        }
    }
    sps.max_num_ref_frames = r.read_ue()?;
    sps.gaps_in_frame_num_value_allowed = r.read_flag()?;
    sps.pic_width_in_mbs_minus1 = r.read_ue()?;
    sps.pic_height_in_map_units_minus1 = r.read_ue()?;
    sps.frame_mbs_only = r.read_flag()?;
    if !sps.frame_mbs_only {
        sps.mb_adaptive_frame_field = r.read_flag()?;
    }
    sps.direct_8x8_inference = r.read_flag()?;
    sps.frame_cropping = r.read_flag()?;
    if sps.frame_cropping {
        sps.frame_crop_left_offset = r.read_ue()?;
        sps.frame_crop_right_offset = r.read_ue()?;
        sps.frame_crop_top_offset = r.read_ue()?;
        sps.frame_crop_bottom_offset = r.read_ue()?;
    }
    sps.vui_parameters_present = r.read_flag()?;

    let (sub_width_c, sub_height_c) =
        SpsInfo::sub_dimensions(sps.chroma_format_idc, sps.separate_colour_plane);
    // A field-coded sequence holds half a frame per map unit.
    let frame_mbs_only = u32::from(sps.frame_mbs_only);
    sps.width = (sps.pic_width_in_mbs_minus1 + 1) * 16;
    sps.height =
        (2 - frame_mbs_only) * (sps.pic_height_in_map_units_minus1 + 1) * 16 / sub_height_c;
    let crop_unit_x = sub_width_c;
    let crop_unit_y = (2 - frame_mbs_only) * sub_height_c;
    sps.width = sps
        .width
        .saturating_sub((sps.frame_crop_left_offset + sps.frame_crop_right_offset) * crop_unit_x);
    sps.height = sps
        .height
        .saturating_sub((sps.frame_crop_top_offset + sps.frame_crop_bottom_offset) * crop_unit_y);
    Ok(sps)
}

/// Reads up to `nlists` optional scaling lists, recording presence in a
/// bitmask. Lists 0-5 are 4x4, the rest 8x8.
pub(crate) fn read_scaling_lists(
    r: &mut BitReader,
    nlists: usize,
    lists: &mut [i32; SCALING_LIST_LEN],
    present_mask: &mut u32,
) -> Result<[bool; 12], Error> {
    let mut use_default = [false; 12];
    let mut off = 0;
    for i in 0..nlists {
        let size = if i < 6 { 16 } else { 64 };
        if r.read_flag()? {
            *present_mask |= 1 << i;
            use_default[i] = r.read_scaling_list(&mut lists[off..off + size])?;
        }
        off += size;
    }
    Ok(use_default)
}
