//! Invoice tax aggregation.
//!
//! Collapses line items into buckets keyed by tax rate or by HSN code and
//! splits each bucket's tax between IGST (inter-state) or CGST+SGST
//! (intra-state). Pure and synchronous.
//!
//! Values accumulate unrounded; rounding to 2 dp happens once, on emission.
//! Totals are summed from the unrounded buckets.

use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::models::tax::TaxType;

/// Captions for the rate-keyed table.
pub const RATE_HEADERS: [&str; 6] = [
    "Tax Rate (%)",
    "Taxable Value",
    "IGST",
    "CGST",
    "SGST",
    "Total Tax",
];

/// Captions for the HSN-keyed table.
pub const HSN_HEADERS: [&str; 6] = [
    "HSN/SAC",
    "Taxable Value",
    "IGST",
    "CGST",
    "SGST",
    "Total Tax",
];

/// Accept numbers and numeric strings; anything else (missing, null,
/// non-numeric, non-finite) is `0.0`.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| v.is_finite()).unwrap_or(0.0))
}

/// Accept strings and numbers as an HSN tag; anything else is `""`.
fn lenient_tag<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// One invoice line as far as tax is concerned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Percent.
    #[serde(default, deserialize_with = "lenient_number")]
    pub tax_rate: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub tax_amount: f64,
    /// Tax-inclusive line total.
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_amount: f64,
    #[serde(default, deserialize_with = "lenient_tag")]
    pub hsn: String,
}

/// Grouping key for buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Rate,
    Hsn,
}

impl GroupBy {
    pub fn headers(&self) -> Vec<String> {
        let captions = match self {
            GroupBy::Rate => RATE_HEADERS,
            GroupBy::Hsn => HSN_HEADERS,
        };
        captions.iter().map(|c| c.to_string()).collect()
    }
}

/// The five accumulated figures of a bucket or of the whole invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TaxBreakdown {
    pub igst: f64,
    pub sgst: f64,
    pub cgst: f64,
    pub taxable_value: f64,
    pub tax_amount: f64,
}

impl TaxBreakdown {
    fn add_line(&mut self, tax: f64, total: f64, intra: bool) {
        if intra {
            self.sgst += tax / 2.0;
            self.cgst += tax / 2.0;
        } else {
            self.igst += tax;
        }
        self.taxable_value += total - tax;
        self.tax_amount += tax;
    }

    fn accumulate(&mut self, other: &TaxBreakdown) {
        self.igst += other.igst;
        self.sgst += other.sgst;
        self.cgst += other.cgst;
        self.taxable_value += other.taxable_value;
        self.tax_amount += other.tax_amount;
    }

    fn rounded(&self) -> Self {
        Self {
            igst: round2(self.igst),
            sgst: round2(self.sgst),
            cgst: round2(self.cgst),
            taxable_value: round2(self.taxable_value),
            tax_amount: round2(self.tax_amount),
        }
    }
}

/// Round half away from zero to 2 dp. `+ 0.0` folds negative zero.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0 + 0.0
}

/// A bucket key: the rate itself or the HSN tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BucketKey {
    Rate(f64),
    Hsn(String),
}

/// One emitted bucket: `{entity, igst, sgst, cgst, taxable_value, tax_amount}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketEntry {
    pub entity: BucketKey,
    #[serde(flatten)]
    pub breakdown: TaxBreakdown,
}

/// Aggregated GST tables for one invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GstSummary {
    pub totals: TaxBreakdown,
    pub entries: Vec<BucketEntry>,
    pub headers: Vec<String>,
}

/// Result of aggregating under a jurisdiction.
///
/// Serializes as a 4-tuple `(totals, entries, headers, tax_type)`. Non-GST
/// jurisdictions are not itemized and serialize as `("", "", "", tax_type)`;
/// invoice rendering relies on that shape.
#[derive(Debug, Clone, PartialEq)]
pub enum TaxSummary {
    Itemized(GstSummary),
    NotApplicable(TaxType),
}

impl TaxSummary {
    pub fn tax_type(&self) -> TaxType {
        match self {
            TaxSummary::Itemized(_) => TaxType::Gst,
            TaxSummary::NotApplicable(t) => *t,
        }
    }
}

impl Serialize for TaxSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(4)?;
        match self {
            TaxSummary::Itemized(summary) => {
                tuple.serialize_element(&summary.totals)?;
                tuple.serialize_element(&summary.entries)?;
                tuple.serialize_element(&summary.headers)?;
            }
            TaxSummary::NotApplicable(_) => {
                tuple.serialize_element("")?;
                tuple.serialize_element("")?;
                tuple.serialize_element("")?;
            }
        }
        tuple.serialize_element(self.tax_type().as_str())?;
        tuple.end()
    }
}

/// Aggregate `items` into GST buckets.
///
/// Intra-state iff `party_state == company_state` (exact string match).
/// Buckets are emitted in order of first appearance.
pub fn aggregate(
    items: &[LineItem],
    party_state: &str,
    company_state: &str,
    group_by: GroupBy,
) -> GstSummary {
    let intra = party_state == company_state;
    let mut buckets: Vec<(BucketKey, TaxBreakdown)> = Vec::new();

    for item in items {
        let key = match group_by {
            GroupBy::Rate => BucketKey::Rate(item.tax_rate),
            GroupBy::Hsn => BucketKey::Hsn(item.hsn.clone()),
        };
        let slot = match buckets.iter().position(|(k, _)| *k == key) {
            Some(i) => i,
            None => {
                buckets.push((key, TaxBreakdown::default()));
                buckets.len() - 1
            }
        };
        buckets[slot]
            .1
            .add_line(item.tax_amount, item.total_amount, intra);
    }

    let mut totals = TaxBreakdown::default();
    for (_, breakdown) in &buckets {
        totals.accumulate(breakdown);
    }

    GstSummary {
        totals: totals.rounded(),
        entries: buckets
            .into_iter()
            .map(|(entity, breakdown)| BucketEntry {
                entity,
                breakdown: breakdown.rounded(),
            })
            .collect(),
        headers: group_by.headers(),
    }
}
