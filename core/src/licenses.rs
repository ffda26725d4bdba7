use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::SearchError;

/// Coarse license taxonomy derived from hosting-platform license names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LicenseCategory {
    Apache,
    Bsd,
    CreativeCommons,
    Eclipse,
    GnuAgpl,
    GnuGpl,
    GnuLgpl,
    Mit,
    Other,
    #[default]
    Unknown,
}

impl LicenseCategory {
    pub const ALL: [LicenseCategory; 10] = [
        LicenseCategory::Apache,
        LicenseCategory::Bsd,
        LicenseCategory::CreativeCommons,
        LicenseCategory::Eclipse,
        LicenseCategory::GnuAgpl,
        LicenseCategory::GnuGpl,
        LicenseCategory::GnuLgpl,
        LicenseCategory::Mit,
        LicenseCategory::Other,
        LicenseCategory::Unknown,
    ];

    /// Map a platform license name to its category. Total: names outside the
    /// known set fall back to `Unknown` (with a warning), never an error.
    pub fn from_license_name(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return LicenseCategory::Unknown;
        };
        match name {
            "Apache License 2.0" => LicenseCategory::Apache,
            "BSD 2-Clause \"Simplified\" License"
            | "BSD 3-Clause Clear License"
            | "BSD 3-Clause \"New\" or \"Revised\" License" => LicenseCategory::Bsd,
            "Creative Commons Attribution 4.0 International"
            | "Creative Commons Attribution Share Alike 4.0 International"
            | "Creative Commons Attribution Non Commercial No Derivatives 4.0 International"
            | "Creative Commons Zero v1.0 Universal" => LicenseCategory::CreativeCommons,
            "Eclipse Public License 1.0" | "Eclipse Public License 2.0" => {
                LicenseCategory::Eclipse
            }
            "GNU Affero General Public License v3.0" => LicenseCategory::GnuAgpl,
            "GNU General Public License v2.0"
            | "GNU General Public License v3.0"
            | "GNU General Public License v3.0 only"
            | "GNU General Public License v3.0 or later" => LicenseCategory::GnuGpl,
            "GNU Lesser General Public License v2.1"
            | "GNU Lesser General Public License v2.1 only"
            | "GNU Lesser General Public License v3.0" => LicenseCategory::GnuLgpl,
            "MIT License" | "MIT No Attribution" => LicenseCategory::Mit,
            "Academic Free License v3.0"
            | "Artistic License 2.0"
            | "Boost Software License 1.0"
            | "European Union Public License 1.1"
            | "European Union Public License 1.2"
            | "ISC License"
            | "Mozilla Public License 2.0"
            | "Other"
            | "The Unlicense" => LicenseCategory::Other,
            other => {
                warn!(license = other, "license not covered by category taxonomy");
                LicenseCategory::Unknown
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseCategory::Apache => "apache",
            LicenseCategory::Bsd => "bsd",
            LicenseCategory::CreativeCommons => "creative_commons",
            LicenseCategory::Eclipse => "eclipse",
            LicenseCategory::GnuAgpl => "gnu_agpl",
            LicenseCategory::GnuGpl => "gnu_gpl",
            LicenseCategory::GnuLgpl => "gnu_lgpl",
            LicenseCategory::Mit => "mit",
            LicenseCategory::Other => "other",
            LicenseCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LicenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseCategory {
    type Err = SearchError;

    /// Parse a filter value. Unlike `from_license_name`, an unrecognized
    /// value is a caller error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LicenseCategory::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| SearchError::InvalidFilter {
                field: "license_category",
                value: s.to_owned(),
            })
    }
}
