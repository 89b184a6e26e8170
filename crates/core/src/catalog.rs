//! Contractor category table and default search locations.
//!
//! Mirrors the seed configuration exposed to the frontend via
//! `/api/config/categories` and `/api/config/locations`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The closed set of contractor categories the platform scrapes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractorCategory {
    Plumber,
    Electrician,
    Roofer,
    Hvac,
    Painter,
    Carpenter,
    GeneralContractor,
    Landscaper,
    Mason,
    Mechanic,
    AutoRepair,
    AutoBody,
    TireShop,
}

impl ContractorCategory {
    /// Every category, in display order.
    pub const ALL: &'static [ContractorCategory] = &[
        Self::Plumber,
        Self::Electrician,
        Self::Roofer,
        Self::Hvac,
        Self::Painter,
        Self::Carpenter,
        Self::GeneralContractor,
        Self::Landscaper,
        Self::Mason,
        Self::Mechanic,
        Self::AutoRepair,
        Self::AutoBody,
        Self::TireShop,
    ];

    /// Stable snake_case identifier, matching the wire format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plumber => "plumber",
            Self::Electrician => "electrician",
            Self::Roofer => "roofer",
            Self::Hvac => "hvac",
            Self::Painter => "painter",
            Self::Carpenter => "carpenter",
            Self::GeneralContractor => "general_contractor",
            Self::Landscaper => "landscaper",
            Self::Mason => "mason",
            Self::Mechanic => "mechanic",
            Self::AutoRepair => "auto_repair",
            Self::AutoBody => "auto_body",
            Self::TireShop => "tire_shop",
        }
    }

    /// Human-readable label for UI display.
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Search terms used to build discovery queries for this category.
    pub fn search_terms(&self) -> &'static [&'static str] {
        match self {
            Self::Plumber => &["plumber", "plumbing"],
            Self::Electrician => &["electrician", "electrical contractor"],
            Self::Roofer => &["roofer", "roofing contractor"],
            Self::Hvac => &["hvac", "heating and cooling", "air conditioning"],
            Self::Painter => &["painter", "painting contractor"],
            Self::Carpenter => &["carpenter", "carpentry"],
            Self::GeneralContractor => &["general contractor", "home builder"],
            Self::Landscaper => &["landscaper", "landscaping", "lawn care"],
            Self::Mason => &["mason", "masonry", "concrete contractor"],
            Self::Mechanic => &["mechanic", "auto mechanic"],
            Self::AutoRepair => &["auto repair", "car repair"],
            Self::AutoBody => &["auto body", "body shop", "collision repair"],
            Self::TireShop => &["tire shop", "tire dealer"],
        }
    }

    /// Parse a wire identifier back into a category.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == value)
            .ok_or_else(|| CoreError::Validation(format!("Unknown contractor category '{value}'")))
    }
}

impl std::fmt::Display for ContractorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A default search location offered by the UI.
#[derive(Debug, Clone, Serialize)]
pub struct DefaultLocation {
    pub id: i64,
    pub name: &'static str,
    pub city: &'static str,
    pub state: &'static str,
}

impl DefaultLocation {
    /// The `"City, ST"` string passed to search queries.
    pub fn search_string(&self) -> String {
        format!("{}, {}", self.city, self.state)
    }
}

/// Seed locations for the tri-state service area.
pub const DEFAULT_LOCATIONS: &[DefaultLocation] = &[
    DefaultLocation {
        id: 1,
        name: "Berkeley County, WV",
        city: "Martinsburg",
        state: "WV",
    },
    DefaultLocation {
        id: 2,
        name: "Jefferson County, WV",
        city: "Charles Town",
        state: "WV",
    },
    DefaultLocation {
        id: 3,
        name: "Frederick County, VA",
        city: "Winchester",
        state: "VA",
    },
    DefaultLocation {
        id: 4,
        name: "Washington County, MD",
        city: "Hagerstown",
        state: "MD",
    },
];
