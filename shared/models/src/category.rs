use serde::{Deserialize, Serialize};
use std::fmt;

/// Material category of a BOM, decided by its marker column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BomCategory {
    PrimaryA,
    PrimaryB,
    Secondary,
    Unclassified,
}

/// Output table a category is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryFamily {
    Primary,
    Secondary,
}

/// Marker column names in classification priority order
pub const CATEGORY_MARKERS: [(&str, BomCategory); 3] = [
    ("H [mm]", BomCategory::PrimaryA),
    ("T [mm]", BomCategory::PrimaryB),
    ("Dia [mm]", BomCategory::Secondary),
];

impl BomCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryA => "primary_a",
            Self::PrimaryB => "primary_b",
            Self::Secondary => "secondary",
            Self::Unclassified => "unclassified",
        }
    }

    /// `None` for unclassified BOMs, which never reach an output table
    pub fn family(&self) -> Option<CategoryFamily> {
        match self {
            Self::PrimaryA | Self::PrimaryB => Some(CategoryFamily::Primary),
            Self::Secondary => Some(CategoryFamily::Secondary),
            Self::Unclassified => None,
        }
    }
}

impl fmt::Display for BomCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CategoryFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names() {
        assert_eq!(BomCategory::PrimaryA.as_str(), "primary_a");
        assert_eq!(BomCategory::PrimaryB.to_string(), "primary_b");
        assert_eq!(BomCategory::Secondary.as_str(), "secondary");
    }

    #[test]
    fn test_category_families() {
        assert_eq!(BomCategory::PrimaryA.family(), Some(CategoryFamily::Primary));
        assert_eq!(BomCategory::PrimaryB.family(), Some(CategoryFamily::Primary));
        assert_eq!(BomCategory::Secondary.family(), Some(CategoryFamily::Secondary));
        assert_eq!(BomCategory::Unclassified.family(), None);
    }
}
