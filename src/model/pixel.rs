use std::fmt::Debug;

use super::PixelType;

/// Element types a level can hold. `Default::default()` is the out-of-bounds fill value.
pub trait Pixel: Copy + Default + PartialOrd + Debug + Send + Sync + 'static {
    const PIXEL_TYPE: PixelType;

    /// Decodes one big-endian sample; `bytes` is exactly `PIXEL_TYPE.bytes()` long.
    fn from_be_slice(bytes: &[u8]) -> Self;

    fn extend_be(self, out: &mut Vec<u8>);

    fn to_f32(self) -> f32;
}

impl Pixel for u8 {
    const PIXEL_TYPE: PixelType = PixelType::U8;

    fn from_be_slice(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn extend_be(self, out: &mut Vec<u8>) {
        out.push(self);
    }

    fn to_f32(self) -> f32 {
        f32::from(self)
    }
}

impl Pixel for u16 {
    const PIXEL_TYPE: PixelType = PixelType::U16;

    fn from_be_slice(bytes: &[u8]) -> Self {
        u16::from_be_bytes([bytes[0], bytes[1]])
    }

    fn extend_be(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }

    fn to_f32(self) -> f32 {
        f32::from(self)
    }
}

impl Pixel for f32 {
    const PIXEL_TYPE: PixelType = PixelType::F32;

    fn from_be_slice(bytes: &[u8]) -> Self {
        f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn extend_be(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }

    fn to_f32(self) -> f32 {
        self
    }
}
