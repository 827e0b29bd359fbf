//! Tax model resolution by the user's phone dial code.

use std::sync::Arc;

use tracing::debug;

use super::TaxError;
use super::aggregate::{GroupBy, LineItem, TaxSummary, aggregate};
use crate::auth::store::UserStore;
use crate::models::auth::Principal;
use crate::models::tax::{TaxModel, TaxType, gst_seed, vat_seed};

/// The tax regime an invoice is computed under.
#[derive(Debug, Clone, PartialEq)]
pub enum Jurisdiction {
    Gst(TaxModel),
    Vat(TaxModel),
    Other(TaxModel),
}

impl Jurisdiction {
    /// Classify a model by its tax type.
    pub fn from_model(model: TaxModel) -> Self {
        match model.tax_type {
            TaxType::Gst => Jurisdiction::Gst(model),
            TaxType::Vat => Jurisdiction::Vat(model),
            _ => Jurisdiction::Other(model),
        }
    }

    /// Any dial code containing `91` is India (GST); everything else is VAT.
    ///
    /// The stored `jurisdiction` lists are deliberately not consulted here.
    pub fn for_dial_code(dial_code: &str) -> Self {
        if dial_code.contains("91") {
            Self::from_model(gst_seed())
        } else {
            Self::from_model(vat_seed())
        }
    }

    pub fn model(&self) -> &TaxModel {
        match self {
            Jurisdiction::Gst(m) | Jurisdiction::Vat(m) | Jurisdiction::Other(m) => m,
        }
    }

    pub fn tax_type(&self) -> TaxType {
        self.model().tax_type
    }

    /// Aggregate invoice lines under this regime. Only GST is itemized.
    pub fn summarize(
        &self,
        items: &[LineItem],
        party_state: &str,
        company_state: &str,
        group_by: GroupBy,
    ) -> TaxSummary {
        match self {
            Jurisdiction::Gst(_) => {
                TaxSummary::Itemized(aggregate(items, party_state, company_state, group_by))
            }
            Jurisdiction::Vat(m) | Jurisdiction::Other(m) => TaxSummary::NotApplicable(m.tax_type),
        }
    }
}

/// Picks the jurisdiction for an authenticated principal.
#[derive(Clone)]
pub struct TaxModelResolver {
    users: Arc<dyn UserStore>,
}

impl TaxModelResolver {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn resolve(&self, principal: &Principal) -> Result<Jurisdiction, TaxError> {
        let user = self
            .users
            .get_by_id(&principal.user_id)
            .await?
            .ok_or_else(|| TaxError::NotFound(format!("user {}", principal.user_id)))?;
        let jurisdiction = Jurisdiction::for_dial_code(&user.dial_code);
        debug!(
            user_id = %user.id,
            dial_code = %user.dial_code,
            tax_type = jurisdiction.tax_type().as_str(),
            "resolved tax jurisdiction"
        );
        Ok(jurisdiction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::MemoryUserStore;
    use crate::models::auth::{User, UserType};

    fn resolver_with(dial_code: &str) -> TaxModelResolver {
        let users = Arc::new(MemoryUserStore::new());
        users.put(
            User {
                id: "u1".into(),
                email: "u1@example.com".into(),
                name: None,
                user_type: UserType::User,
                dial_code: dial_code.into(),
                current_company_id: None,
                email_verified: true,
            },
            None,
        );
        TaxModelResolver::new(users)
    }

    fn principal() -> Principal {
        Principal::login("u1", UserType::User, "web")
    }

    #[tokio::test]
    async fn indian_dial_code_resolves_gst() {
        let j = resolver_with("+91").resolve(&principal()).await.unwrap();
        assert!(matches!(j, Jurisdiction::Gst(_)));
        assert_eq!(j.model().tax_code, "GST");
    }

    #[tokio::test]
    async fn other_dial_codes_resolve_vat() {
        for code in ["+1", "+44", ""] {
            let j = resolver_with(code).resolve(&principal()).await.unwrap();
            assert_eq!(j.tax_type(), TaxType::Vat);
        }
    }

    #[tokio::test]
    async fn substring_match_is_coarse() {
        // Any code containing "91" counts, not just "+91".
        for code in ["+291", "+1919"] {
            let j = resolver_with(code).resolve(&principal()).await.unwrap();
            assert_eq!(j.tax_type(), TaxType::Gst, "{code}");
        }
        let j = resolver_with("+971").resolve(&principal()).await.unwrap();
        assert_eq!(j.tax_type(), TaxType::Vat);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let resolver = resolver_with("+91");
        let stranger = Principal::login("ghost", UserType::User, "web");
        assert!(matches!(
            resolver.resolve(&stranger).await.unwrap_err(),
            TaxError::NotFound(_)
        ));
    }

    #[test]
    fn vat_summary_is_not_itemized() {
        let items = vec![LineItem {
            tax_rate: 18.0,
            tax_amount: 18.0,
            total_amount: 118.0,
            hsn: String::new(),
        }];
        let summary = Jurisdiction::for_dial_code("+1").summarize(&items, "A", "A", GroupBy::Rate);
        assert_eq!(summary, TaxSummary::NotApplicable(TaxType::Vat));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json, serde_json::json!(["", "", "", "VAT"]));
    }

    #[test]
    fn other_models_are_not_itemized() {
        let mut cess = vat_seed();
        cess.tax_type = TaxType::Cess;
        let j = Jurisdiction::from_model(cess);
        assert!(matches!(j, Jurisdiction::Other(_)));
        assert_eq!(
            j.summarize(&[], "A", "A", GroupBy::Hsn),
            TaxSummary::NotApplicable(TaxType::Cess)
        );
    }
}
