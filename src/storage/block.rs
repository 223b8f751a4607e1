use crate::model::Pixel;

/// A decoded block: its actual extent (edge blocks may be truncated) and big-endian samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBlock {
    pub size: Vec<u32>,
    pub data: Vec<u8>,
}

impl DataBlock {
    pub fn num_elements(&self) -> usize {
        self.size.iter().map(|value| *value as usize).product()
    }

    /// Encodes samples given in x-fastest order.
    pub fn from_samples<T: Pixel>(size: Vec<u32>, samples: &[T]) -> Self {
        let mut data = Vec::with_capacity(samples.len() * T::PIXEL_TYPE.bytes());
        for sample in samples {
            sample.extend_be(&mut data);
        }
        Self { size, data }
    }

    /// Samples in x-fastest order, or `None` when the payload is too short for the extent.
    pub fn samples<T: Pixel>(&self) -> Option<Vec<T>> {
        let width = T::PIXEL_TYPE.bytes();
        let count = self.num_elements();
        if self.data.len() < count * width {
            return None;
        }
        Some(
            self.data
                .chunks_exact(width)
                .take(count)
                .map(T::from_be_slice)
                .collect(),
        )
    }
}

/// Parses an N5 block file: u16 mode, u16 ndim, ndim u32 sizes, then the payload.
pub(crate) fn decode_n5_block(bytes: &[u8]) -> Result<DataBlock, String> {
    let mut cursor = 0_usize;
    let mode = read_u16(bytes, &mut cursor)?;
    let ndim = read_u16(bytes, &mut cursor)?;
    let mut size = Vec::with_capacity(ndim as usize);
    for _ in 0..ndim {
        size.push(read_u32(bytes, &mut cursor)?);
    }
    match mode {
        0 => {}
        1 => {
            // varlength blocks carry an element count that raw numeric data does not need
            read_u32(bytes, &mut cursor)?;
        }
        other => return Err(format!("unsupported block mode {other}")),
    }
    Ok(DataBlock {
        size,
        data: bytes[cursor..].to_vec(),
    })
}

fn read_u16(bytes: &[u8], cursor: &mut usize) -> Result<u16, String> {
    let raw = bytes
        .get(*cursor..*cursor + 2)
        .ok_or_else(|| format!("truncated header at byte {cursor}"))?;
    *cursor += 2;
    Ok(u16::from_be_bytes([raw[0], raw[1]]))
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, String> {
    let raw = bytes
        .get(*cursor..*cursor + 4)
        .ok_or_else(|| format!("truncated header at byte {cursor}"))?;
    *cursor += 4;
    Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
}
