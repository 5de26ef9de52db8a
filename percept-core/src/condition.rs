use serde::{Deserialize, Serialize};

/// Per-stimulus metadata from a condition sheet
/// (`item_number,letter_name,rotation_angle,mirrored,block`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRow {
    pub item_number: u32,
    pub letter_name: String,
    pub rotation_angle: i32,
    pub mirrored: u8,
    pub block: String,
}
