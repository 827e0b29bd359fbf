//! In-memory tax model store.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::TaxError;
use super::store::TaxModelStore;
use crate::models::tax::TaxModel;

#[derive(Default)]
pub struct MemoryTaxModelStore {
    models: DashMap<Uuid, TaxModel>,
}

impl MemoryTaxModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn code_taken(&self, model: &TaxModel) -> bool {
        self.models
            .iter()
            .any(|m| m.id != model.id && m.tax_code == model.tax_code)
    }
}

#[async_trait]
impl TaxModelStore for MemoryTaxModelStore {
    async fn list(&self) -> Result<Vec<TaxModel>, TaxError> {
        let mut models: Vec<TaxModel> = self.models.iter().map(|m| m.value().clone()).collect();
        models.sort_by(|a, b| (&a.tax_code, &a.tax_name).cmp(&(&b.tax_code, &b.tax_name)));
        Ok(models)
    }

    async fn get(&self, id: Uuid) -> Result<Option<TaxModel>, TaxError> {
        Ok(self.models.get(&id).map(|m| m.value().clone()))
    }

    async fn create(&self, model: &TaxModel) -> Result<(), TaxError> {
        if self.models.contains_key(&model.id) || self.code_taken(model) {
            return Err(TaxError::Conflict(format!(
                "tax model {} already exists",
                model.tax_code
            )));
        }
        self.models.insert(model.id, model.clone());
        Ok(())
    }

    async fn replace(&self, model: &TaxModel) -> Result<bool, TaxError> {
        if self.code_taken(model) {
            return Err(TaxError::Conflict(format!(
                "tax model {} already exists",
                model.tax_code
            )));
        }
        Ok(match self.models.get_mut(&model.id) {
            Some(mut existing) => {
                *existing = model.clone();
                true
            }
            None => false,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<bool, TaxError> {
        Ok(self.models.remove(&id).is_some())
    }

    async fn upsert(&self, model: &TaxModel) -> Result<bool, TaxError> {
        if self.code_taken(model) {
            return Ok(false);
        }
        self.models.insert(model.id, model.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tax::{GST_MODEL_ID, gst_seed, seed_models};
    use crate::tax::store::seed;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = MemoryTaxModelStore::new();
        seed(&store, &seed_models()).await.unwrap();
        seed(&store, &seed_models()).await.unwrap();
        let models = store.list().await.unwrap();
        let codes: Vec<&str> = models.iter().map(|m| m.tax_code.as_str()).collect();
        assert_eq!(codes, vec!["GST", "VAT"]);
    }

    #[tokio::test]
    async fn duplicate_code_conflicts() {
        let store = MemoryTaxModelStore::new();
        store.create(&gst_seed()).await.unwrap();
        let mut dup = gst_seed();
        dup.id = crate::uuid::uuidv7();
        assert!(matches!(
            store.create(&dup).await.unwrap_err(),
            TaxError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn seed_skips_code_recreated_under_new_id() {
        let store = MemoryTaxModelStore::new();
        seed(&store, &seed_models()).await.unwrap();
        assert!(store.delete(GST_MODEL_ID).await.unwrap());

        let mut recreated = gst_seed();
        recreated.id = crate::uuid::uuidv7();
        recreated.tax_rate = 12.0;
        store.create(&recreated).await.unwrap();

        seed(&store, &seed_models()).await.unwrap();
        assert!(store.get(GST_MODEL_ID).await.unwrap().is_none());
        let kept = store.get(recreated.id).await.unwrap().unwrap();
        assert_eq!(kept.tax_rate, 12.0);
        assert!(!store.upsert(&gst_seed()).await.unwrap());
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn replace_and_delete_report_existence() {
        let store = MemoryTaxModelStore::new();
        let mut gst = gst_seed();
        assert!(!store.replace(&gst).await.unwrap());
        store.create(&gst).await.unwrap();
        gst.tax_rate = 18.0;
        assert!(store.replace(&gst).await.unwrap());
        assert_eq!(store.get(GST_MODEL_ID).await.unwrap().unwrap().tax_rate, 18.0);
        assert!(store.delete(GST_MODEL_ID).await.unwrap());
        assert!(!store.delete(GST_MODEL_ID).await.unwrap());
    }
}
