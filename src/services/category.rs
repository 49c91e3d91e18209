//! Category service
//!
//! Income and expense registries. Ledger records keep the name they were
//! written with, so renames and deletes here never touch history.

use chrono::Utc;

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Category, CategoryId, CategoryKind};
use crate::storage::{ChangeKind, Collection, Storage};

/// Service for category management
pub struct CategoryService<'a> {
    storage: &'a Storage,
}

fn collection_of(kind: CategoryKind) -> Collection {
    match kind {
        CategoryKind::Income => Collection::IncomeCategories,
        CategoryKind::Expense => Collection::ExpenseCategories,
    }
}

impl<'a> CategoryService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a category; the name must be unique within its kind
    pub fn create(
        &self,
        kind: CategoryKind,
        name: &str,
        color: Option<&str>,
        description: &str,
    ) -> LedgerResult<Category> {
        let name = name.trim();
        let lock = self.storage.write_lock()?;
        self.ensure_unique(kind, name, None)?;

        let mut category = Category::new(kind, name);
        if let Some(color) = color {
            category.color = color.trim().to_string();
        }
        category.description = description.trim().to_string();
        category
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        let op = lock.begin_operation("create_category", vec![category.id.key()])?;
        self.storage.categories(kind).upsert(category.clone())?;
        op.commit(&[collection_of(kind)])?;
        self.storage.publish(
            collection_of(kind),
            ChangeKind::Inserted,
            Some(category.id.key()),
        );

        self.storage.log_create(
            EntityType::Category,
            category.id.key(),
            Some(category.name.clone()),
            &category,
        )?;

        Ok(category)
    }

    pub fn get(&self, kind: CategoryKind, id: CategoryId) -> LedgerResult<Option<Category>> {
        self.storage.categories(kind).get(id)
    }

    /// Look up by name (case-insensitive)
    pub fn get_by_name(&self, kind: CategoryKind, name: &str) -> LedgerResult<Option<Category>> {
        let needle = name.trim().to_lowercase();
        Ok(self
            .storage
            .categories(kind)
            .find(|c| c.name.to_lowercase() == needle)?
            .into_iter()
            .next())
    }

    /// Find by name or ID string
    pub fn find(&self, kind: CategoryKind, identifier: &str) -> LedgerResult<Option<Category>> {
        if let Some(category) = self.get_by_name(kind, identifier)? {
            return Ok(Some(category));
        }
        match identifier.parse::<CategoryId>() {
            Ok(id) => self.get(kind, id),
            Err(_) => Ok(None),
        }
    }

    /// Find or fail with `NotFound`
    pub fn resolve(&self, kind: CategoryKind, identifier: &str) -> LedgerResult<Category> {
        self.find(kind, identifier)?
            .ok_or_else(|| LedgerError::category_not_found(identifier))
    }

    pub fn list(&self, kind: CategoryKind) -> LedgerResult<Vec<Category>> {
        let mut categories = self.storage.categories(kind).get_all()?;
        categories.sort_by_key(|c| c.name.to_lowercase());
        Ok(categories)
    }

    /// Update name, color or description
    pub fn update(
        &self,
        kind: CategoryKind,
        id: CategoryId,
        name: Option<&str>,
        color: Option<&str>,
        description: Option<&str>,
    ) -> LedgerResult<Category> {
        let lock = self.storage.write_lock()?;
        let registry = self.storage.categories(kind);
        let before = registry
            .get(id)?
            .ok_or_else(|| LedgerError::category_not_found(id.to_string()))?;

        let mut category = before.clone();
        if let Some(name) = name {
            let name = name.trim();
            self.ensure_unique(kind, name, Some(id))?;
            category.name = name.to_string();
        }
        if let Some(color) = color {
            category.color = color.trim().to_string();
        }
        if let Some(description) = description {
            category.description = description.trim().to_string();
        }
        category
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;
        category.updated_at = Utc::now();

        let op = lock.begin_operation("update_category", vec![id.key()])?;
        registry.upsert(category.clone())?;
        op.commit(&[collection_of(kind)])?;
        self.storage
            .publish(collection_of(kind), ChangeKind::Updated, Some(id.key()));

        self.storage.log_update(
            EntityType::Category,
            id.key(),
            Some(category.name.clone()),
            &before,
            &category,
        )?;

        Ok(category)
    }

    /// Delete a category; items and transactions keep their name snapshot
    pub fn delete(&self, kind: CategoryKind, id: CategoryId) -> LedgerResult<Category> {
        let lock = self.storage.write_lock()?;
        let registry = self.storage.categories(kind);
        if !registry.exists(id)? {
            return Err(LedgerError::category_not_found(id.to_string()));
        }

        let op = lock.begin_operation("delete_category", vec![id.key()])?;
        let category = registry
            .remove(id)?
            .ok_or_else(|| LedgerError::category_not_found(id.to_string()))?;
        op.commit(&[collection_of(kind)])?;
        self.storage
            .publish(collection_of(kind), ChangeKind::Removed, Some(id.key()));

        self.storage.log_delete(
            EntityType::Category,
            id.key(),
            Some(category.name.clone()),
            &category,
        )?;

        Ok(category)
    }

    fn ensure_unique(
        &self,
        kind: CategoryKind,
        name: &str,
        exclude: Option<CategoryId>,
    ) -> LedgerResult<()> {
        match self.get_by_name(kind, name)? {
            Some(existing) if Some(existing.id) != exclude => Err(LedgerError::Validation(
                format!("A {} category named '{}' already exists", kind, name),
            )),
            _ => Ok(()),
        }
    }
}
