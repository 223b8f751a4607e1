use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisKind {
    X,
    Y,
    Z,
    Channel,
    Time,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PixelType {
    U8,
    U16,
    #[default]
    F32,
}

impl PixelType {
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
        }
    }
}

/// Crops are laid out x-fastest, so the first three axes are spatial in x, y, z order.
pub fn default_axis_for_index(index: usize) -> AxisKind {
    match index {
        0 => AxisKind::X,
        1 => AxisKind::Y,
        2 => AxisKind::Z,
        3 => AxisKind::Channel,
        4 => AxisKind::Time,
        _ => AxisKind::Unknown,
    }
}
