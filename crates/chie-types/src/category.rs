//! The fixed list of question categories.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category a question is filed under.
///
/// Stored by its stable code (see [`Category::as_str`]); the localized
/// [`Category::label`] is for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Water treatment technology.
    WaterTreatment,
    /// Mechanical: design, procurement, commissioning, maintenance.
    Mechanical,
    /// Electrical: design, procurement, maintenance.
    Electrical,
    /// Civil and building works: design, structure, construction.
    Civil,
    /// Site management.
    SiteManagement,
    /// Project management.
    ProjectManagement,
    /// Anything else.
    Other,
}

/// Error returned when a string is neither a category code nor a label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category: {0}")]
pub struct ParseCategoryError(pub String);

impl Category {
    /// Every category, in the order they are offered to users.
    pub const ALL: [Category; 7] = [
        Category::WaterTreatment,
        Category::Mechanical,
        Category::Electrical,
        Category::Civil,
        Category::SiteManagement,
        Category::ProjectManagement,
        Category::Other,
    ];

    /// Returns the stable code persisted in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WaterTreatment => "water_treatment",
            Self::Mechanical => "mechanical",
            Self::Electrical => "electrical",
            Self::Civil => "civil",
            Self::SiteManagement => "site_management",
            Self::ProjectManagement => "project_management",
            Self::Other => "other",
        }
    }

    /// Returns the display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::WaterTreatment => "水処理技術",
            Self::Mechanical => "機械（設計、調達、試運転、メンテ）",
            Self::Electrical => "電気（設計、調達、メンテ）",
            Self::Civil => "土木建築（設計、構造、施工）",
            Self::SiteManagement => "現場管理",
            Self::ProjectManagement => "プロジェクト管理",
            Self::Other => "その他",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = ParseCategoryError;

    /// Accepts either the code or the display label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s || c.label() == s)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}
