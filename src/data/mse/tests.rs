#![allow(clippy::unwrap_used, reason = "allow in test files")]

use v_frame::pixel::Pixel;

use super::*;
use crate::data::{block::BlockOffset, frame::Frame};

// Generate frame data for get_mse tests
fn setup_frames<T: Pixel>(max_value: u32) -> (Frame<T>, Frame<T>) {
    let mut org = Frame::new(32, 16, 3, max_value);
    let mut rf = org.new_like();

    for c in 0..3 {
        for r in 0..16 {
            for (j, pixel) in org.row_mut(c, r).iter_mut().enumerate() {
                let val = ((j * 7 + r * 3 + c * 11) as u32 % (max_value + 1)) as i32;
                *pixel = T::cast_from(val);
            }
            for (j, pixel) in rf.row_mut(c, r).iter_mut().enumerate() {
                let val = ((j * 5 + r * 13 + c) as u32 % (max_value + 1)) as i32;
                *pixel = T::cast_from(val);
            }
        }
    }

    (org, rf)
}

fn region<T: Pixel>(frame: &Frame<T>, row: usize, col: usize, w: usize, h: usize) -> BlockRegion<'_, T> {
    BlockRegion::new(frame, BlockOffset { row, col }, w, h)
}

fn mse_same_block_inner<T: Pixel>(max_value: u32) {
    let (org, rf) = setup_frames::<T>(max_value);
    for &(row, col, w, h) in &[(0, 0, 8, 8), (4, 12, 16, 8), (8, 24, 8, 8), (0, 0, 32, 16)] {
        assert_eq!(get_mse(&region(&org, row, col, w, h), &region(&org, row, col, w, h)), 0.0);
        assert_eq!(get_sse(&region(&rf, row, col, w, h), &region(&rf, row, col, w, h)), 0);
    }
}

#[test]
fn mse_same_block_u8() {
    mse_same_block_inner::<u8>(255);
}

#[test]
fn mse_same_block_u16() {
    mse_same_block_inner::<u16>(1023);
}

fn mse_is_symmetric_inner<T: Pixel>(max_value: u32) {
    let (org, rf) = setup_frames::<T>(max_value);
    for &(r1, c1, r2, c2) in &[(0, 0, 0, 0), (0, 0, 8, 24), (3, 5, 7, 1), (8, 16, 0, 8)] {
        let a = region(&org, r1, c1, 8, 8);
        let b = region(&rf, r2, c2, 8, 8);
        assert_eq!(get_mse(&a, &b), get_mse(&b, &a));
        assert_eq!(get_sse(&a, &b), get_sse(&b, &a));
    }
}

#[test]
fn mse_is_symmetric_u8() {
    mse_is_symmetric_inner::<u8>(255);
}

#[test]
fn mse_is_symmetric_u16() {
    mse_is_symmetric_inner::<u16>(4095);
}

#[test]
fn mse_is_normalized_over_channels() {
    let a = Frame::<u8>::new(4, 4, 3, 255);
    let mut b = a.new_like();
    // one sample differs by 6 in a single channel: 36 / (3 * 4 * 4)
    b.set(1, 2, 3, 6).unwrap();
    let mse = get_mse(&region(&a, 0, 0, 4, 4), &region(&b, 0, 0, 4, 4));
    assert!((mse - 36.0 / 48.0).abs() < f64::EPSILON);
}

#[test]
fn mse_full_range_u16() {
    let mut a = Frame::<u16>::new(2, 2, 1, 65535);
    let b = a.new_like();
    for r in 0..2 {
        a.row_mut(0, r).fill(65535);
    }
    let mse = get_mse(&region(&a, 0, 0, 2, 2), &region(&b, 0, 0, 2, 2));
    assert_eq!(mse, 65535.0 * 65535.0);
}

#[test]
#[should_panic]
fn mse_rejects_mismatched_blocks() {
    let a = Frame::<u8>::new(16, 16, 1, 255);
    get_mse(&region(&a, 0, 0, 8, 8), &region(&a, 0, 0, 8, 4));
}
