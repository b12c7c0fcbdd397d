use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{deserialize_opt_u32_from_number, deserialize_u32_from_number};

/// Anti-waste business policies. Every threshold is optional; an absent
/// threshold leaves its rule inactive. Nothing applies unless `enabled`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AntiWaste {
    #[serde(default)]
    pub enabled: bool,
    /// Never cut pieces whose length is at or below this.
    #[serde(default, deserialize_with = "deserialize_opt_u32_from_number")]
    pub min_l_no_cut: Option<u32>,
    /// Donor cap applies only when the width being closed exceeds this.
    #[serde(default, deserialize_with = "deserialize_opt_u32_from_number")]
    pub limit_merge_b: Option<u32>,
    /// Maximum number of foreign-length donors once the cap is active.
    /// Unset means zero.
    #[serde(default, deserialize_with = "deserialize_opt_u32_from_number")]
    pub max_merge_k: Option<u32>,
    /// Largest missing width (mm) that may be sourced from scrap instead of
    /// cutting the last incomplete sheet.
    #[serde(default, deserialize_with = "deserialize_opt_u32_from_number")]
    pub last_no_cut_b: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutOptions {
    #[serde(default = "default_sheet_width", deserialize_with = "deserialize_u32_from_number")]
    pub sheet_width: u32,
    #[serde(
        rename = "toleranceL",
        default = "default_tolerance",
        deserialize_with = "deserialize_u32_from_number"
    )]
    pub tolerance_l: u32,
    #[serde(default)]
    pub allow_fallback: bool,
    #[serde(default, deserialize_with = "deserialize_u32_from_number")]
    pub min_leftover: u32,
    /// Tails at or below this width are sourced from scrap. 0 disables.
    #[serde(
        rename = "tailWantedB",
        default,
        deserialize_with = "deserialize_u32_from_number"
    )]
    pub tail_wanted_b: u32,
    /// Order widths by `W mod B` ascending instead of widest first.
    #[serde(default)]
    pub order_by_remainder: bool,
    #[serde(default)]
    pub use_patterns: bool,
    #[serde(default)]
    pub anti: AntiWaste,
}

fn default_sheet_width() -> u32 {
    1000
}

fn default_tolerance() -> u32 {
    2
}

impl Default for CutOptions {
    fn default() -> Self {
        Self {
            sheet_width: default_sheet_width(),
            tolerance_l: default_tolerance(),
            allow_fallback: false,
            min_leftover: 0,
            tail_wanted_b: 0,
            order_by_remainder: false,
            use_patterns: false,
            anti: AntiWaste::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}

impl CutOptions {
    pub fn new(sheet_width: u32) -> Self {
        Self {
            sheet_width,
            ..Self::default()
        }
    }

    /// Loads a persisted settings document. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let opts: CutOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, CutOptions::default());
        assert_eq!(opts.sheet_width, 1000);
        assert_eq!(opts.tolerance_l, 2);
        assert!(!opts.anti.enabled);
    }

    #[test]
    fn test_camel_case_document() {
        let opts: CutOptions = serde_json::from_str(
            r#"{
                "sheetWidth": 1250,
                "toleranceL": 5.0,
                "allowFallback": true,
                "minLeftover": 40,
                "tailWantedB": 150,
                "orderByRemainder": true,
                "anti": { "enabled": true, "limitMergeB": 300, "maxMergeK": null, "lastNoCutB": 20 }
            }"#,
        )
        .unwrap();
        assert_eq!(opts.sheet_width, 1250);
        assert_eq!(opts.tolerance_l, 5);
        assert!(opts.allow_fallback);
        assert_eq!(opts.min_leftover, 40);
        assert_eq!(opts.tail_wanted_b, 150);
        assert!(opts.order_by_remainder);
        assert_eq!(opts.anti.limit_merge_b, Some(300));
        assert_eq!(opts.anti.max_merge_k, None);
        assert_eq!(opts.anti.last_no_cut_b, Some(20));
        assert_eq!(opts.anti.min_l_no_cut, None);
    }

    #[test]
    fn test_negative_width_rejected() {
        let res: Result<CutOptions, _> = serde_json::from_str(r#"{"sheetWidth": -5}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_missing_settings_file() {
        let err = CutOptions::from_json_file("/nonexistent/strip_planner.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
