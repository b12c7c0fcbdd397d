use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Accepts any JSON number and rounds it to the nearest whole millimetre.
/// Non-finite values map to 0 so the row is dropped during validation.
pub fn deserialize_i64_from_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = f64::deserialize(deserializer)?;
    if !v.is_finite() {
        return Ok(0);
    }
    Ok(v.round() as i64)
}

pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let v = f64::deserialize(deserializer)?;
    to_u32(v).map_err(D::Error::custom)
}

pub fn deserialize_opt_u32_from_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        Some(v) => to_u32(v).map(Some).map_err(D::Error::custom),
        None => Ok(None),
    }
}

fn to_u32(v: f64) -> Result<u32, String> {
    if !v.is_finite() || v < 0.0 || v > u32::MAX as f64 {
        return Err(format!("expected a non-negative number, got {}", v));
    }
    Ok(v.round() as u32)
}

/// One ordered position as it arrives from the order source.
///
/// Dimensions are signed so that bad rows survive deserialization and can be
/// counted when they are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "L", deserialize_with = "deserialize_i64_from_number")]
    pub length: i64,
    #[serde(rename = "B", deserialize_with = "deserialize_i64_from_number")]
    pub width: i64,
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub count: i64,
    /// Material kind ("Typ"). Only used by grouped calculation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Order {
    pub fn new(length: i64, width: i64, count: i64) -> Self {
        Self {
            length,
            width,
            count,
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}:{}", self.length, self.width, self.count)
    }
}

/// Where a normalized row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    /// Width already fits the sheet.
    Native,
    /// Full sheet-width strips extracted from an oversize order.
    SplitFull,
    /// The `B mod W` remainder of an oversize order.
    SplitRest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedOrder {
    pub length: u32,
    pub width: u32,
    pub count: u32,
    pub origin: Origin,
    /// Number of full strips extracted from the source order; 0 for native rows.
    pub strips: u32,
}

impl NormalizedOrder {
    pub fn native(length: u32, width: u32, count: u32) -> Self {
        Self {
            length,
            width,
            count,
            origin: Origin::Native,
            strips: 0,
        }
    }

    /// Width of the order this row was cut from: `strips * W + B` for tails.
    pub fn original_width(&self, sheet_width: u32) -> u32 {
        match self.origin {
            Origin::SplitRest => self.strips * sheet_width + self.width,
            Origin::Native | Origin::SplitFull => self.width,
        }
    }
}

/// A reusable offcut strip in the remnant pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Remnant {
    pub id: u32,
    #[serde(rename = "L")]
    pub length: u32,
    #[serde(rename = "B")]
    pub width: u32,
}

/// One remnant consumed (fully or partly) to close a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DonorPick {
    pub id: u32,
    #[serde(rename = "L")]
    pub length: u32,
    /// Remnant width before this pick was taken.
    #[serde(rename = "B")]
    pub width_before: u32,
    #[serde(rename = "usedB")]
    pub width_used: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageItem {
    #[serde(rename = "B")]
    pub width: u32,
    pub count: u32,
}

/// Sheets cut for one length, with the pieces taken from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetUsageGroup {
    #[serde(rename = "L")]
    pub length: u32,
    pub sheet_width: u32,
    pub sheet_count: u32,
    pub items: Vec<UsageItem>,
}

/// One piece closed from remnants instead of a fresh sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedFromLeftover {
    #[serde(rename = "L")]
    pub length: u32,
    #[serde(rename = "B")]
    pub width: u32,
    pub parts: Vec<DonorPick>,
    pub uses_length_fallback: bool,
    /// Width left to be sourced from scrap by a no-cut closure.
    pub missing: u32,
    pub count: u32,
}

/// Tail demand routed to external scrap sourcing instead of a cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapNeed {
    #[serde(rename = "L")]
    pub length: u32,
    pub rest_b: u32,
    pub count: u32,
    pub k: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrapProduced {
    #[serde(rename = "L")]
    pub length: u32,
    #[serde(rename = "B")]
    pub width: u32,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OffcutFate {
    Remnant,
    Scrap,
    None,
}

/// A batch of identically cut sheets. Items are per sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetCut {
    #[serde(rename = "L")]
    pub length: u32,
    pub sheets: u32,
    pub items: Vec<UsageItem>,
    #[serde(rename = "offcutB")]
    pub offcut_width: u32,
    pub offcut: OffcutFate,
}

impl SheetCut {
    pub fn used_width(&self) -> u32 {
        self.items.iter().map(|i| i.width * i.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CutPlan {
    pub sheet_usage: Vec<SheetUsageGroup>,
    pub leftovers: Vec<Remnant>,
    pub used_from_leftovers: Vec<UsedFromLeftover>,
    pub scrap_needs: Vec<ScrapNeed>,
    pub scrap_produced: Vec<ScrapProduced>,
    #[serde(rename = "wantedScrapB")]
    pub wanted_scrap_b: u32,
    /// "LxB" -> pieces excluded from cutting by the no-cut length rule.
    pub forced_map: BTreeMap<String, u32>,
    pub cut_log: Vec<SheetCut>,
    pub dropped_rows: u32,
}

impl CutPlan {
    pub fn empty(wanted_scrap_b: u32) -> Self {
        Self {
            sheet_usage: Vec::new(),
            leftovers: Vec::new(),
            used_from_leftovers: Vec::new(),
            scrap_needs: Vec::new(),
            scrap_produced: Vec::new(),
            wanted_scrap_b,
            forced_map: BTreeMap::new(),
            cut_log: Vec::new(),
            dropped_rows: 0,
        }
    }

    pub fn sheet_count(&self) -> u32 {
        self.sheet_usage
            .iter()
            .fold(0, |n, g| n.saturating_add(g.sheet_count))
    }

    pub fn sheets_for_length(&self, length: u32) -> u32 {
        self.sheet_usage
            .iter()
            .filter(|g| g.length == length)
            .fold(0, |n, g| n.saturating_add(g.sheet_count))
    }

    /// Share of cut sheet width that ended up as scrap offcuts.
    pub fn waste_percent(&self) -> f64 {
        let total: u64 = self
            .cut_log
            .iter()
            .map(|c| (c.used_width() + c.offcut_width) as u64 * c.sheets as u64)
            .sum();
        if total == 0 {
            return 0.0;
        }
        let scrap: u64 = self
            .cut_log
            .iter()
            .filter(|c| c.offcut == OffcutFate::Scrap)
            .map(|c| c.offcut_width as u64 * c.sheets as u64)
            .sum();
        scrap as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CutError {
    #[error("piece {length}x{width} does not fit sheet width {sheet_width}")]
    TooWide {
        #[serde(rename = "L")]
        length: u32,
        #[serde(rename = "B")]
        width: u32,
        #[serde(rename = "sheetWidth")]
        sheet_width: u32,
    },
}

/// Wire form of a calculation: a plan, or empty collections plus the error.
#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    #[serde(flatten)]
    pub plan: CutPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CutError>,
}

impl PlanResponse {
    pub fn from_result(result: Result<CutPlan, CutError>, wanted_scrap_b: u32) -> Self {
        match result {
            Ok(plan) => Self { plan, error: None },
            Err(e) => Self {
                plan: CutPlan::empty(wanted_scrap_b),
                error: Some(e),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KindPlan {
    pub kind: String,
    pub result: PlanResponse,
}
