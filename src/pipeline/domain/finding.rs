use std::fmt;

use serde::{Deserialize, Serialize};

/// Kinds of skin issue the detectors can report.
///
/// Declaration order is the emission order of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Acne,
    DarkSpots,
    Redness,
    OilySkin,
    Dryness,
    Wrinkles,
}

impl IssueType {
    pub const ALL: [IssueType; 6] = [
        IssueType::Acne,
        IssueType::DarkSpots,
        IssueType::Redness,
        IssueType::OilySkin,
        IssueType::Dryness,
        IssueType::Wrinkles,
    ];

    /// Wire name, as used in serialized findings.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Acne => "acne",
            IssueType::DarkSpots => "dark_spots",
            IssueType::Redness => "redness",
            IssueType::OilySkin => "oily_skin",
            IssueType::Dryness => "dryness",
            IssueType::Wrinkles => "wrinkles",
        }
    }

    /// Prefix of the finding ids produced for this kind.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            IssueType::Acne => "acne",
            IssueType::DarkSpots => "dark_spot",
            IssueType::Redness => "redness",
            IssueType::OilySkin => "oily",
            IssueType::Dryness => "dryness",
            IssueType::Wrinkles => "wrinkles",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned box in the coordinate space of the original frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn translate(self, dx: u32, dy: u32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }
}

/// A single localized skin issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Finding {
    /// Builds a finding, forcing the confidence into [0, 1]. NaN becomes 0.
    pub fn new(id: String, issue_type: IssueType, confidence: f32, bbox: BoundingBox) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            id,
            issue_type,
            confidence,
            bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped_on_construction() {
        let bbox = BoundingBox::new(0, 0, 1, 1);
        assert_eq!(
            Finding::new("a".into(), IssueType::Acne, 1.7, bbox).confidence,
            1.0
        );
        assert_eq!(
            Finding::new("b".into(), IssueType::Acne, -0.2, bbox).confidence,
            0.0
        );
        assert_eq!(
            Finding::new("c".into(), IssueType::Acne, f32::NAN, bbox).confidence,
            0.0
        );
    }

    #[test]
    fn finding_serializes_with_plain_numbers() {
        let finding = Finding::new(
            "oily_0_3_4".into(),
            IssueType::OilySkin,
            0.5,
            BoundingBox::new(13, 14, 5, 6),
        );
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["type"], "oily_skin");
        assert_eq!(json["confidence"], 0.5);
        assert_eq!(json["bbox"]["x"], 13);
        assert_eq!(json["bbox"]["height"], 6);
    }
}
