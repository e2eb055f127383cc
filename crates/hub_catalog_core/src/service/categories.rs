use std::sync::Arc;

use tracing::info;

use crate::error::HubError;
use crate::ports::{CategoryStore, Result, Stores};
use crate::types::{Category, CategoryInput};

const CATEGORY_NOT_FOUND: &str = "Category not found";

pub struct CategoryService {
    categories: Arc<dyn CategoryStore>,
}

impl CategoryService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            categories: stores.categories.clone(),
        }
    }

    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        self.categories.list().await
    }

    pub async fn get_category(&self, id: i64) -> Result<Category> {
        self.categories
            .find(id)
            .await?
            .ok_or_else(|| HubError::not_found(CATEGORY_NOT_FOUND))
    }

    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category> {
        if input.name.trim().is_empty() {
            return Err(HubError::InvalidInput("category name is required".into()));
        }
        let category = self.categories.insert(input).await?;
        info!(category_id = category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn update_category(&self, id: i64, input: &CategoryInput) -> Result<Category> {
        self.categories
            .update(id, input)
            .await?
            .ok_or_else(|| HubError::not_found(CATEGORY_NOT_FOUND))
    }

    /// Detaches the category from its bundle groups before deleting it.
    pub async fn delete_category(&self, id: i64) -> Result<()> {
        if !self.categories.delete(id).await? {
            return Err(HubError::not_found(CATEGORY_NOT_FOUND));
        }
        info!(category_id = id, "category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fixtures;

    #[tokio::test]
    async fn delete_detaches_from_groups() {
        let stores = fixtures::stores();
        let svc = CategoryService::new(&stores);
        let cat = svc
            .create_category(&CategoryInput {
                name: "Components".into(),
                description: None,
            })
            .await
            .unwrap();
        let group = fixtures::group(&stores, "Payments", None, None, true, vec![cat.id]).await;

        svc.delete_category(cat.id).await.unwrap();
        let group = stores.bundle_groups.find(group.id).await.unwrap().unwrap();
        assert!(group.category_ids.is_empty());
        assert!(matches!(
            svc.delete_category(cat.id).await.unwrap_err(),
            HubError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let stores = fixtures::stores();
        let err = CategoryService::new(&stores)
            .update_category(
                3,
                &CategoryInput {
                    name: "x".into(),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::NotFound(_)));
    }
}
