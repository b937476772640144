use crate::{
    error::{AppError, AppResult},
    models::{category, Category, CategoryColor, CategoryModel},
    utils::slug::resolve_slug,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

pub struct CategoryService {
    db: DatabaseConnection,
}

impl CategoryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<CategoryModel>> {
        let categories = Category::find()
            .order_by_asc(category::Column::Name)
            .all(&self.db)
            .await?;
        Ok(categories)
    }

    pub async fn get_by_slug(&self, slug: &str) -> AppResult<CategoryModel> {
        Category::find()
            .filter(category::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// The slug is derived from the name when not supplied.
    pub async fn create(
        &self,
        name: &str,
        slug: Option<&str>,
        description: &str,
        color: CategoryColor,
    ) -> AppResult<CategoryModel> {
        let name = name.trim();
        let slug = resolve_slug(name, slug)?;

        let clash = Category::find()
            .filter(
                Condition::any()
                    .add(category::Column::Name.eq(name))
                    .add(category::Column::Slug.eq(slug.as_str())),
            )
            .count(&self.db)
            .await?;
        if clash > 0 {
            return Err(AppError::Conflict("Category already exists".to_string()));
        }

        let created = category::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug),
            description: Set(description.to_string()),
            color: Set(color),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        tracing::info!(category_id = created.id, slug = %created.slug, "category created");
        Ok(created)
    }

    /// Renames and recolors; the slug is left alone so existing links keep working.
    pub async fn update(
        &self,
        slug: &str,
        name: &str,
        description: &str,
        color: CategoryColor,
    ) -> AppResult<CategoryModel> {
        let existing = self.get_by_slug(slug).await?;
        let name = name.trim();

        let clash = Category::find()
            .filter(category::Column::Id.ne(existing.id))
            .filter(category::Column::Name.eq(name))
            .count(&self.db)
            .await?;
        if clash > 0 {
            return Err(AppError::Conflict("Category already exists".to_string()));
        }

        let mut active: category::ActiveModel = existing.into();
        active.name = Set(name.to_string());
        active.description = Set(description.to_string());
        active.color = Set(color);
        Ok(active.update(&self.db).await?)
    }

    pub async fn delete(&self, slug: &str) -> AppResult<()> {
        let existing = self.get_by_slug(slug).await?;
        existing.delete(&self.db).await?;
        Ok(())
    }

    /// Load categories by id, failing on any id that does not exist.
    pub async fn find_all_by_ids(&self, ids: &[i32]) -> AppResult<Vec<CategoryModel>> {
        let mut wanted: Vec<i32> = ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let found = Category::find()
            .filter(category::Column::Id.is_in(wanted.clone()))
            .order_by_asc(category::Column::Name)
            .all(&self.db)
            .await?;

        if found.len() != wanted.len() {
            return Err(AppError::NotFound);
        }
        Ok(found)
    }
}
