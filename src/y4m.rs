//! YUV4MPEG2 clip support.
//!
//! Only colorspaces whose planes all share one extent can be matched, so
//! monochrome and 4:4:4 clips are accepted and subsampled chroma is not.

use std::io::{Read, Write};

use anyhow::{Context, bail};
use v_frame::pixel::Pixel;

use crate::Frame;

/// Properties of a clip that are needed to read its frames and to write a
/// predicted frame back out.
#[derive(Debug, Clone, Copy)]
pub struct ClipDetails {
    /// Frame width.
    pub width: usize,
    /// Frame height.
    pub height: usize,
    /// Sample bit depth.
    pub bit_depth: usize,
    /// Planes per frame: 1 for monochrome, 3 for 4:4:4.
    pub channels: usize,
    /// The clip's colorspace.
    pub colorspace: ::y4m::Colorspace,
    /// The clip's frame rate.
    pub framerate: ::y4m::Ratio,
}

impl ClipDetails {
    /// Largest sample value at this bit depth.
    pub const fn max_value(&self) -> u32 {
        (1 << self.bit_depth) - 1
    }
}

/// # Errors
///
/// - If the clip uses chroma subsampling.
pub fn get_clip_details<R: Read>(dec: &::y4m::Decoder<R>) -> anyhow::Result<ClipDetails> {
    use ::y4m::Colorspace::{C444, C444p10, C444p12, Cmono, Cmono12};

    let colorspace = dec.get_colorspace();
    let channels = match colorspace {
        Cmono | Cmono12 => 1,
        C444 | C444p10 | C444p12 => 3,
        other => bail!("unsupported colorspace {other:?}, planes must share one size"),
    };

    Ok(ClipDetails {
        width: dec.get_width(),
        height: dec.get_height(),
        bit_depth: colorspace.get_bit_depth(),
        channels,
        colorspace,
        framerate: dec.get_framerate(),
    })
}

/// Reads the next frame of the clip.
///
/// # Errors
///
/// - If the clip ends or a frame cannot be decoded.
pub fn read_video_frame<R: Read, T: Pixel>(
    dec: &mut ::y4m::Decoder<R>,
    cfg: &ClipDetails,
) -> anyhow::Result<Frame<T>> {
    let bytes = dec.get_bytes_per_sample();
    let frame = dec.read_frame()?;
    let mut f: Frame<T> = Frame::new(cfg.width, cfg.height, cfg.channels, cfg.max_value());

    let planes = [frame.get_y_plane(), frame.get_u_plane(), frame.get_v_plane()];
    for (plane, src) in f.planes_mut().iter_mut().zip(planes) {
        plane.copy_from_raw_u8(src, cfg.width * bytes, bytes);
    }

    Ok(f)
}

/// Reads frame `index` and the frame following it, as the reference and
/// target of a prediction.
///
/// # Errors
///
/// - If the clip holds fewer than `index + 2` frames.
pub fn read_frame_pair<R: Read, T: Pixel>(
    dec: &mut ::y4m::Decoder<R>,
    cfg: &ClipDetails,
    index: usize,
) -> anyhow::Result<(Frame<T>, Frame<T>)> {
    for skipped in 0..index {
        dec.read_frame()
            .with_context(|| format!("clip ends at frame {skipped}"))?;
    }
    let reference = read_video_frame(dec, cfg)
        .with_context(|| format!("failed to read reference frame {index}"))?;
    let target = read_video_frame(dec, cfg)
        .with_context(|| format!("failed to read target frame {}", index + 1))?;

    Ok((reference, target))
}

/// Writes `frame` as a single frame clip with the colorspace and frame rate
/// of `cfg`.
///
/// # Errors
///
/// - If the frame does not match `cfg` or writing fails.
pub fn write_video_frame<W: Write, T: Pixel>(
    writer: W,
    frame: &Frame<T>,
    cfg: &ClipDetails,
) -> anyhow::Result<()> {
    if frame.cols() != cfg.width || frame.rows() != cfg.height || frame.channels() != cfg.channels
    {
        bail!(
            "{}x{}x{} frame does not fit a {}x{} {:?} clip",
            frame.cols(),
            frame.rows(),
            frame.channels(),
            cfg.width,
            cfg.height,
            cfg.colorspace
        );
    }

    let bytes = if cfg.bit_depth > 8 { 2 } else { 1 };
    let stride = cfg.width * bytes;
    let mut raw: Vec<Vec<u8>> = vec![Vec::new(); 3];
    for (dst, plane) in raw.iter_mut().zip(frame.planes()) {
        dst.resize(stride * cfg.height, 0);
        plane.copy_to_raw_u8(dst, stride, bytes);
    }

    let mut enc = ::y4m::encode(cfg.width, cfg.height, cfg.framerate)
        .with_colorspace(cfg.colorspace)
        .write_header(writer)?;
    enc.write_frame(&::y4m::Frame::new([&raw[0], &raw[1], &raw[2]], None))?;

    Ok(())
}
