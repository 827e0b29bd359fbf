//! Tax model domain types and the built-in seed records.

use serde::{Deserialize, Serialize};
use uuid::{Uuid, uuid};

/// Id of the seeded GST model.
pub const GST_MODEL_ID: Uuid = uuid!("01920000-0000-7000-8000-000000000091");
/// Id of the seeded VAT model.
pub const VAT_MODEL_ID: Uuid = uuid!("01920000-0000-7000-8000-000000000001");

/// Family a tax model belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxType {
    #[serde(rename = "GST")]
    Gst,
    #[serde(rename = "VAT")]
    Vat,
    #[serde(rename = "Service Tax")]
    ServiceTax,
    #[serde(rename = "Cess")]
    Cess,
    #[serde(rename = "Custom Duty")]
    CustomDuty,
    #[serde(rename = "Excise Duty")]
    ExciseDuty,
    #[serde(rename = "Sales Tax")]
    SalesTax,
    #[serde(rename = "Other")]
    Other,
}

impl TaxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxType::Gst => "GST",
            TaxType::Vat => "VAT",
            TaxType::ServiceTax => "Service Tax",
            TaxType::Cess => "Cess",
            TaxType::CustomDuty => "Custom Duty",
            TaxType::ExciseDuty => "Excise Duty",
            TaxType::SalesTax => "Sales Tax",
            TaxType::Other => "Other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "GST" => TaxType::Gst,
            "VAT" => TaxType::Vat,
            "Service Tax" => TaxType::ServiceTax,
            "Cess" => TaxType::Cess,
            "Custom Duty" => TaxType::CustomDuty,
            "Excise Duty" => TaxType::ExciseDuty,
            "Sales Tax" => TaxType::SalesTax,
            "Other" => TaxType::Other,
            _ => return None,
        })
    }
}

/// How a rate is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateType {
    Percentage,
    Fixed,
}

impl RateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateType::Percentage => "percentage",
            RateType::Fixed => "fixed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "percentage" => Some(RateType::Percentage),
            "fixed" => Some(RateType::Fixed),
            _ => None,
        }
    }
}

/// A named share of the model's rate (e.g. CGST = 50%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxComponent {
    pub name: String,
    pub rate: f64,
    pub rate_type: RateType,
}

/// Whether a dependent tax is charged on the base or on another tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    OnBase,
    OnTaxAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxDependency {
    pub tax_id: Uuid,
    pub dependency_type: DependencyType,
}

/// Stored tax model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxModel {
    pub id: Uuid,
    pub tax_code: String,
    pub tax_name: String,
    pub tax_type: TaxType,
    /// Dial codes the model applies to, e.g. `["+91"]`.
    pub jurisdiction: Vec<String>,
    pub tax_rate: f64,
    pub tax_rate_type: RateType,
    #[serde(default)]
    pub components: Vec<TaxComponent>,
    #[serde(default)]
    pub dependencies: Vec<TaxDependency>,
}

/// Input for creating or replacing a tax model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxModelInput {
    pub tax_code: String,
    pub tax_name: String,
    pub tax_type: TaxType,
    #[serde(default)]
    pub jurisdiction: Vec<String>,
    pub tax_rate: f64,
    pub tax_rate_type: RateType,
    #[serde(default)]
    pub components: Vec<TaxComponent>,
    #[serde(default)]
    pub dependencies: Vec<TaxDependency>,
}

impl TaxModelInput {
    pub fn into_model(self, id: Uuid) -> TaxModel {
        TaxModel {
            id,
            tax_code: self.tax_code,
            tax_name: self.tax_name,
            tax_type: self.tax_type,
            jurisdiction: self.jurisdiction,
            tax_rate: self.tax_rate,
            tax_rate_type: self.tax_rate_type,
            components: self.components,
            dependencies: self.dependencies,
        }
    }
}

/// Built-in GST model: IGST takes the full rate, CGST and SGST half each.
pub fn gst_seed() -> TaxModel {
    TaxModel {
        id: GST_MODEL_ID,
        tax_code: "GST".into(),
        tax_name: "Goods and Services Tax".into(),
        tax_type: TaxType::Gst,
        jurisdiction: vec!["+91".into()],
        tax_rate: 0.0,
        tax_rate_type: RateType::Percentage,
        components: vec![
            TaxComponent {
                name: "IGST".into(),
                rate: 100.0,
                rate_type: RateType::Percentage,
            },
            TaxComponent {
                name: "CGST".into(),
                rate: 50.0,
                rate_type: RateType::Percentage,
            },
            TaxComponent {
                name: "SGST".into(),
                rate: 50.0,
                rate_type: RateType::Percentage,
            },
        ],
        dependencies: Vec::new(),
    }
}

/// Built-in VAT model.
pub fn vat_seed() -> TaxModel {
    TaxModel {
        id: VAT_MODEL_ID,
        tax_code: "VAT".into(),
        tax_name: "Value Added Tax".into(),
        tax_type: TaxType::Vat,
        jurisdiction: vec!["+1".into()],
        tax_rate: 0.0,
        tax_rate_type: RateType::Percentage,
        components: Vec::new(),
        dependencies: Vec::new(),
    }
}

/// Records upserted at bootstrap.
pub fn seed_models() -> Vec<TaxModel> {
    vec![gst_seed(), vat_seed()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gst_seed_splits_components() {
        let gst = gst_seed();
        let rates: Vec<(&str, f64)> = gst
            .components
            .iter()
            .map(|c| (c.name.as_str(), c.rate))
            .collect();
        assert_eq!(rates, vec![("IGST", 100.0), ("CGST", 50.0), ("SGST", 50.0)]);
        assert_eq!(gst.jurisdiction, vec!["+91".to_string()]);
    }

    #[test]
    fn vat_seed_has_no_components() {
        let vat = vat_seed();
        assert!(vat.components.is_empty());
        assert_eq!(vat.tax_type, TaxType::Vat);
    }

    #[test]
    fn tax_type_uses_display_names_on_the_wire() {
        let json = serde_json::to_string(&TaxType::CustomDuty).unwrap();
        assert_eq!(json, "\"Custom Duty\"");
        assert_eq!(TaxType::parse("Sales Tax"), Some(TaxType::SalesTax));
        assert_eq!(TaxType::parse("sales tax"), None);
    }
}
