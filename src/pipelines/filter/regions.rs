// SPDX-License-Identifier: GPL-3.0-only

//! Face mesh landmark regions used by makeup
//!
//! Indices refer to the 468-point face mesh topology. Outlines are listed
//! in drawing order.

/// Outer lip contour, closed
pub const LIPS_OUTER: &[usize] = &[
    61, 146, 91, 181, 84, 17, 314, 405, 321, 375, 291, 409, 270, 269, 267, 0, 37, 39, 40, 185,
];

/// Upper lid of the left eye, outer to inner corner
pub const LEFT_EYE_UPPER: &[usize] = &[33, 246, 161, 160, 159, 158, 157, 173, 133];

/// Upper lid of the right eye, outer to inner corner
pub const RIGHT_EYE_UPPER: &[usize] = &[263, 466, 388, 387, 386, 385, 384, 398, 362];

/// Lower edge of the left brow, inner to outer
pub const LEFT_BROW_LOWER: &[usize] = &[55, 65, 52, 53, 46];

/// Lower edge of the right brow, inner to outer
pub const RIGHT_BROW_LOWER: &[usize] = &[285, 295, 282, 283, 276];

/// Highest landmark index a region refers to, plus one
pub fn required_len(region: &[usize]) -> usize {
    region.iter().max().map_or(0, |max| max + 1)
}

/// Closed eyeshadow outline: upper lid followed by the brow walked back
///
/// The lid runs outer to inner and the brow inner to outer, so
/// concatenating them gives a simple polygon between lid and brow.
pub fn eyeshadow_outline(lid: &[usize], brow: &[usize]) -> Vec<usize> {
    lid.iter().chain(brow.iter()).copied().collect()
}
