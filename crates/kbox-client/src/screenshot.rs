//! Screen capture reassembly.
//!
//! The device streams its framebuffer as RGB565 in whatever number of rows
//! fits a frame. [`ScreenChunk::decode`] validates one reply and the device
//! facade stitches chunks into a [`Screenshot`].

use serde::Serialize;

use crate::error::{ClientError, Result};

/// One 8-bit-per-channel pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Expand an RGB565 pixel. The low bits of each channel stay zero.
pub fn rgb565_to_rgb(pixel: u16) -> Rgb {
    Rgb {
        r: ((pixel >> 8) & 0xF8) as u8,
        g: ((pixel >> 3) & 0xFC) as u8,
        b: ((pixel << 3) & 0xF8) as u8,
    }
}

/// Pack a `0xRRGGBB` color as RGB565.
pub fn rgb888_to_rgb565(rgb: u32) -> u16 {
    let r = ((rgb >> 16) & 0xFF) as u16;
    let g = ((rgb >> 8) & 0xFF) as u16;
    let b = (rgb & 0xFF) as u16;
    ((r >> 3) << 11) | ((g >> 2) << 5) | (b >> 3)
}

/// Rows carried by one `SCREENSHOT_REPLY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenChunk {
    pub start_line: u16,
    /// Row-major pixels, always a whole number of rows.
    pub pixels: Vec<Rgb>,
    pub width: u16,
}

impl ScreenChunk {
    /// Decode a reply payload: `u16 start_line` then LE RGB565 pixels.
    pub fn decode(payload: &[u8], requested_line: u16, width: u16) -> Result<Self> {
        if payload.len() < 2 {
            return Err(ClientError::protocol(
                "screenshot reply without start line",
                payload.to_vec(),
            ));
        }
        let start_line = u16::from_le_bytes([payload[0], payload[1]]);
        let data = &payload[2..];

        if start_line != requested_line {
            return Err(ClientError::protocol(
                format!("screenshot reply starts at line {start_line}, requested {requested_line}"),
                payload.to_vec(),
            ));
        }
        if data.is_empty() {
            return Err(ClientError::protocol(
                "screenshot reply carries no pixels",
                payload.to_vec(),
            ));
        }
        if data.len() % 2 != 0 {
            return Err(ClientError::protocol(
                format!("odd screenshot pixel data length {}", data.len()),
                payload.to_vec(),
            ));
        }
        let count = data.len() / 2;
        if width == 0 || count % usize::from(width) != 0 {
            return Err(ClientError::protocol(
                format!("{count} pixels is not a whole number of {width}-pixel rows"),
                payload.to_vec(),
            ));
        }

        let pixels = data
            .chunks_exact(2)
            .map(|p| rgb565_to_rgb(u16::from_le_bytes([p[0], p[1]])))
            .collect();
        Ok(Self {
            start_line,
            pixels,
            width,
        })
    }

    pub fn rows(&self) -> usize {
        self.pixels.len() / usize::from(self.width)
    }
}

/// A full-screen capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub width: u16,
    pub height: u16,
    pixels: Vec<Rgb>,
}

impl Screenshot {
    pub(crate) fn with_capacity(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: Vec::with_capacity(usize::from(width) * usize::from(height)),
        }
    }

    /// Rows gathered so far.
    pub fn rows(&self) -> u16 {
        if self.width == 0 {
            return 0;
        }
        // Never exceeds `height`, which is a u16.
        (self.pixels.len() / usize::from(self.width)) as u16
    }

    pub fn is_complete(&self) -> bool {
        self.rows() >= self.height
    }

    /// Append a chunk, dropping rows beyond the screen height.
    pub(crate) fn push_chunk(&mut self, chunk: ScreenChunk) {
        let room = usize::from(self.height - self.rows().min(self.height));
        let take = chunk.rows().min(room) * usize::from(self.width);
        self.pixels.extend_from_slice(&chunk.pixels[..take]);
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<Rgb> {
        if x >= self.width || y >= self.rows() {
            return None;
        }
        self.pixels
            .get(usize::from(y) * usize::from(self.width) + usize::from(x))
            .copied()
    }

    /// Packed `RGBRGB...` bytes, row-major.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| [p.r, p.g, p.b]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(line: u16, pixels: &[u16]) -> Vec<u8> {
        let mut out = line.to_le_bytes().to_vec();
        for p in pixels {
            out.extend_from_slice(&p.to_le_bytes());
        }
        out
    }

    #[test]
    fn converts_565_both_ways() {
        assert_eq!(rgb888_to_rgb565(0xFF8040), 0xFC08);
        assert_eq!(rgb565_to_rgb(0xFC08), Rgb { r: 0xF8, g: 0x80, b: 0x40 });
        assert_eq!(rgb565_to_rgb(0xFFFF), Rgb { r: 0xF8, g: 0xFC, b: 0xF8 });
        assert_eq!(rgb565_to_rgb(0), Rgb::default());
    }

    #[test]
    fn decodes_two_rows() {
        let chunk = ScreenChunk::decode(&reply(4, &[0xF800, 0x07E0, 0x001F, 0]), 4, 2).unwrap();
        assert_eq!(chunk.start_line, 4);
        assert_eq!(chunk.rows(), 2);
        assert_eq!(chunk.pixels[0], Rgb { r: 0xF8, g: 0, b: 0 });
        assert_eq!(chunk.pixels[1], Rgb { r: 0, g: 0xFC, b: 0 });
        assert_eq!(chunk.pixels[2], Rgb { r: 0, g: 0, b: 0xF8 });
    }

    #[test]
    fn rejects_malformed_replies() {
        let protocol = |r: Result<ScreenChunk>| matches!(r, Err(ClientError::Protocol { .. }));

        assert!(protocol(ScreenChunk::decode(&[0], 0, 2)));
        assert!(protocol(ScreenChunk::decode(&reply(0, &[]), 0, 2)));
        assert!(protocol(ScreenChunk::decode(&[0, 0, 1, 2, 3], 0, 2)));
        assert!(protocol(ScreenChunk::decode(&reply(0, &[1, 2, 3]), 0, 2)));
        assert!(protocol(ScreenChunk::decode(&reply(5, &[1, 2]), 0, 2)));
    }

    #[test]
    fn assembly_drops_extra_rows() {
        let mut shot = Screenshot::with_capacity(2, 3);
        shot.push_chunk(ScreenChunk::decode(&reply(0, &[1, 1, 2, 2]), 0, 2).unwrap());
        assert_eq!(shot.rows(), 2);
        assert!(!shot.is_complete());

        shot.push_chunk(ScreenChunk::decode(&reply(2, &[3, 3, 4, 4]), 2, 2).unwrap());
        assert_eq!(shot.rows(), 3);
        assert!(shot.is_complete());
        assert_eq!(shot.pixels().len(), 6);
        assert_eq!(shot.pixel(0, 2), Some(rgb565_to_rgb(3)));
        assert_eq!(shot.pixel(2, 0), None);
        assert_eq!(shot.to_rgb8().len(), 18);
    }
}
