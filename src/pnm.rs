//! Netpbm graymap and pixmap support.
//!
//! Plain (`P2`, `P3`) and raw (`P5`, `P6`) files are read; raw files are
//! written. Samples wider than a byte are stored most significant byte
//! first, as Netpbm requires.

use std::io::{BufRead, Read, Write};

use anyhow::{Context, bail, ensure};
use v_frame::pixel::Pixel;

use crate::Frame;

// Largest image accepted, in samples across all channels.
const MAX_SAMPLES: u64 = 1 << 28;

/// The Netpbm variants this module understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnmFormat {
    /// `P2`: plain graymap.
    PlainGraymap,
    /// `P3`: plain pixmap.
    PlainPixmap,
    /// `P5`: raw graymap.
    RawGraymap,
    /// `P6`: raw pixmap.
    RawPixmap,
}

impl PnmFormat {
    fn from_magic(magic: &str) -> anyhow::Result<Self> {
        Ok(match magic {
            "P2" => PnmFormat::PlainGraymap,
            "P3" => PnmFormat::PlainPixmap,
            "P5" => PnmFormat::RawGraymap,
            "P6" => PnmFormat::RawPixmap,
            "P1" | "P4" => bail!("bitmaps ({magic}) are not supported"),
            _ => bail!("not a Netpbm file (magic {magic:?})"),
        })
    }

    /// Number of channels per pixel.
    pub const fn channels(self) -> usize {
        match self {
            PnmFormat::PlainGraymap | PnmFormat::RawGraymap => 1,
            PnmFormat::PlainPixmap | PnmFormat::RawPixmap => 3,
        }
    }

    const fn is_raw(self) -> bool {
        matches!(self, PnmFormat::RawGraymap | PnmFormat::RawPixmap)
    }
}

/// Image properties read from a Netpbm header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PnmHeader {
    /// The file variant.
    pub format: PnmFormat,
    /// Image width.
    pub width: usize,
    /// Image height.
    pub height: usize,
    /// Largest sample value, between 1 and 65535.
    pub max_value: u32,
}

impl PnmHeader {
    /// Bits needed to store one sample: 8 or 16.
    pub const fn bit_depth(&self) -> usize {
        if self.max_value > 255 { 16 } else { 8 }
    }
}

/// Reads one Netpbm image.
pub struct Decoder<R: BufRead> {
    reader: R,
    header: PnmHeader,
}

impl<R: BufRead> Decoder<R> {
    /// Parses the header, leaving the reader at the first sample.
    ///
    /// # Errors
    ///
    /// - If the header is malformed or describes an unsupported variant.
    /// - If the image holds more samples than this decoder accepts.
    pub fn new(mut reader: R) -> anyhow::Result<Self> {
        let magic = read_token(&mut reader).context("failed to read Netpbm magic")?;
        let format = PnmFormat::from_magic(&magic)?;
        let width = read_number(&mut reader).context("failed to read image width")?;
        let height = read_number(&mut reader).context("failed to read image height")?;
        let max_value = read_number(&mut reader).context("failed to read max value")?;
        ensure!(width > 0 && height > 0, "empty {width}x{height} image");
        let samples = u64::from(width)
            .checked_mul(u64::from(height))
            .and_then(|n| n.checked_mul(format.channels() as u64))
            .filter(|&n| n <= MAX_SAMPLES);
        ensure!(
            samples.is_some(),
            "{width}x{height} image exceeds the {MAX_SAMPLES} sample limit"
        );
        ensure!(
            (1..=65535).contains(&max_value),
            "max value {max_value} outside 1..=65535"
        );

        Ok(Self {
            reader,
            header: PnmHeader {
                format,
                width: width as usize,
                height: height as usize,
                max_value,
            },
        })
    }

    /// The parsed header.
    pub const fn header(&self) -> &PnmHeader {
        &self.header
    }

    /// Reads the samples into a frame.
    ///
    /// # Errors
    ///
    /// - If `T` is too narrow for the image's max value.
    /// - If the data is truncated or holds a sample above the max value.
    pub fn read_frame<T: Pixel>(mut self) -> anyhow::Result<Frame<T>> {
        let PnmHeader {
            format,
            width,
            height,
            max_value,
        } = self.header;
        ensure!(
            size_of::<T>() * 8 >= self.header.bit_depth(),
            "max value {max_value} does not fit in {}-bit samples",
            size_of::<T>() * 8
        );

        let channels = format.channels();
        let mut frame = Frame::new(width, height, channels, max_value);
        let bytes = self.header.bit_depth() / 8;
        let mut raw_row = vec![0u8; width * channels * bytes];
        let mut samples = vec![0u32; width * channels];

        for r in 0..height {
            if format.is_raw() {
                self.reader
                    .read_exact(&mut raw_row)
                    .with_context(|| format!("image data ends before row {r}"))?;
                for (sample, raw) in samples.iter_mut().zip(raw_row.chunks_exact(bytes)) {
                    *sample = raw.iter().fold(0, |acc, &b| (acc << 8) | b as u32);
                }
            } else {
                for sample in samples.iter_mut() {
                    *sample = read_number(&mut self.reader)
                        .with_context(|| format!("image data ends before row {r}"))?;
                }
            }

            for (i, &sample) in samples.iter().enumerate() {
                ensure!(
                    sample <= max_value,
                    "sample {sample} in row {r} exceeds max value {max_value}"
                );
                frame.row_mut(i % channels, r)[i / channels] = T::cast_from(sample as i32);
            }
        }

        Ok(frame)
    }
}

/// Writes `frame` as a raw graymap (one channel) or pixmap (three channels).
///
/// # Errors
///
/// - If the frame has a channel count other than 1 or 3, or a max value of 0.
/// - If writing fails.
pub fn write_frame<W: Write, T: Pixel>(mut writer: W, frame: &Frame<T>) -> anyhow::Result<()> {
    let magic = match frame.channels() {
        1 => "P5",
        3 => "P6",
        n => bail!("cannot store {n} channels in a Netpbm file"),
    };
    let max_value = frame.max_value();
    ensure!(
        (1..=65535).contains(&max_value),
        "max value {max_value} outside 1..=65535"
    );
    write!(
        writer,
        "{magic}\n{} {}\n{max_value}\n",
        frame.cols(),
        frame.rows()
    )?;

    let channels = frame.channels();
    let wide = max_value > 255;
    let mut raw_row = Vec::with_capacity(frame.cols() * channels * if wide { 2 } else { 1 });
    for r in 0..frame.rows() {
        raw_row.clear();
        for x in 0..frame.cols() {
            for c in 0..channels {
                let sample: u32 = frame.row(c, r)[x].into();
                if wide {
                    raw_row.extend_from_slice(&(sample as u16).to_be_bytes());
                } else {
                    raw_row.push(sample as u8);
                }
            }
        }
        writer.write_all(&raw_row)?;
    }
    writer.flush()?;

    Ok(())
}

// Reads one whitespace-delimited header token, skipping `#` comments. The
// single whitespace byte ending the token is consumed.
fn read_token<R: Read>(reader: &mut R) -> anyhow::Result<String> {
    let mut token = String::new();
    let mut in_comment = false;
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte)? == 0 {
            ensure!(!token.is_empty(), "unexpected end of file");
            return Ok(token);
        }
        let b = byte[0];
        if in_comment {
            in_comment = b != b'\n' && b != b'\r';
        } else if b == b'#' && token.is_empty() {
            in_comment = true;
        } else if b.is_ascii_whitespace() {
            if !token.is_empty() {
                return Ok(token);
            }
        } else {
            token.push(b as char);
        }
    }
}

fn read_number<R: Read>(reader: &mut R) -> anyhow::Result<u32> {
    let token = read_token(reader)?;
    token
        .parse()
        .with_context(|| format!("expected a number, found {token:?}"))
}
