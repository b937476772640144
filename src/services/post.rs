use crate::{
    error::{AppError, AppResult},
    models::{
        category, post, post_category, Category, CategoryModel, Post, PostCategory, PostModel,
        PostStatus,
    },
    services::category::CategoryService,
    utils::{search::contains_ci, slug::resolve_slug},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use std::collections::HashMap;

/// Fields of a post as submitted by its author.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    /// Only honoured on creation; derived from the title when absent.
    pub slug: Option<String>,
    pub body: String,
    pub featured_image: Option<String>,
    pub status: PostStatus,
    pub category_ids: Vec<i32>,
}

pub struct PostService {
    db: DatabaseConnection,
}

impl PostService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_published(
        &self,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<PostModel>, u64)> {
        let paginator = Post::find()
            .filter(post::Column::Status.eq(PostStatus::Published))
            .order_by_desc(post::Column::PublishedAt)
            .order_by_desc(post::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let posts = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((posts, total))
    }

    pub async fn get_by_slug(&self, slug: &str) -> AppResult<PostModel> {
        Post::find()
            .filter(post::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Drafts are reported as missing.
    pub async fn get_published(&self, slug: &str) -> AppResult<PostModel> {
        let post = self.get_by_slug(slug).await?;
        if !post.is_published() {
            return Err(AppError::NotFound);
        }
        Ok(post)
    }

    pub async fn create(&self, author_id: Option<i32>, draft: PostDraft) -> AppResult<PostModel> {
        let author_id = author_id
            .ok_or_else(|| AppError::LoginRequired("You must be logged in to write a post.".into()))?;
        let (title, body) = validate_content(&draft.title, &draft.body)?;
        let slug = resolve_slug(title, draft.slug.as_deref())?;

        let clash = Post::find()
            .filter(post::Column::Slug.eq(slug.as_str()))
            .count(&self.db)
            .await?;
        if clash > 0 {
            return Err(AppError::Conflict(format!(
                "A post with slug '{}' already exists",
                slug
            )));
        }

        let categories = CategoryService::new(self.db.clone())
            .find_all_by_ids(&draft.category_ids)
            .await?;

        let now = chrono::Utc::now().naive_utc();
        let published_at = (draft.status == PostStatus::Published).then_some(now);

        let txn = self.db.begin().await?;

        let created = post::ActiveModel {
            author_id: Set(Some(author_id)),
            title: Set(title.to_string()),
            slug: Set(slug),
            body: Set(body.to_string()),
            featured_image: Set(normalize_optional(draft.featured_image)),
            status: Set(draft.status),
            created_at: Set(now),
            updated_at: Set(now),
            published_at: Set(published_at),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        link_categories(&txn, created.id, &categories).await?;
        txn.commit().await?;

        tracing::info!(post_id = created.id, slug = %created.slug, "post created");
        Ok(created)
    }

    /// Only the author may edit. The slug never changes.
    pub async fn update(&self, slug: &str, editor_id: i32, draft: PostDraft) -> AppResult<PostModel> {
        let existing = self.get_by_slug(slug).await?;
        if !existing.is_authored_by(editor_id) {
            return Err(AppError::Forbidden);
        }

        let (title, body) = validate_content(&draft.title, &draft.body)?;
        let categories = CategoryService::new(self.db.clone())
            .find_all_by_ids(&draft.category_ids)
            .await?;

        let now = chrono::Utc::now().naive_utc();
        let published_at = match (draft.status, existing.published_at) {
            (PostStatus::Published, None) => Some(now),
            (_, previous) => previous,
        };
        let post_id = existing.id;

        let txn = self.db.begin().await?;

        let mut active: post::ActiveModel = existing.into();
        active.title = Set(title.to_string());
        active.body = Set(body.to_string());
        active.featured_image = Set(normalize_optional(draft.featured_image));
        active.status = Set(draft.status);
        active.published_at = Set(published_at);
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        PostCategory::delete_many()
            .filter(post_category::Column::PostId.eq(post_id))
            .exec(&txn)
            .await?;
        link_categories(&txn, post_id, &categories).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Case-insensitive substring match on title or body, published posts only.
    pub async fn search(
        &self,
        query: &str,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<PostModel>, u64)> {
        let query = query.trim();
        if query.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let matches = Condition::any()
            .add(contains_ci(post::Column::Title, query))
            .add(contains_ci(post::Column::Body, query));

        let paginator = Post::find()
            .filter(post::Column::Status.eq(PostStatus::Published))
            .filter(matches)
            .order_by_desc(post::Column::PublishedAt)
            .order_by_desc(post::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let posts = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((posts, total))
    }

    pub async fn list_by_category(
        &self,
        category_slug: &str,
        page: u64,
        per_page: u64,
    ) -> AppResult<(CategoryModel, Vec<PostModel>, u64)> {
        let category = CategoryService::new(self.db.clone())
            .get_by_slug(category_slug)
            .await?;

        let paginator = Post::find()
            .join(JoinType::InnerJoin, post::Relation::PostCategory.def())
            .filter(post_category::Column::CategoryId.eq(category.id))
            .filter(post::Column::Status.eq(PostStatus::Published))
            .order_by_desc(post::Column::PublishedAt)
            .order_by_desc(post::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let posts = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((category, posts, total))
    }

    /// Every post of the user, drafts included, newest first.
    pub async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<PostModel>> {
        let posts = Post::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .all(&self.db)
            .await?;
        Ok(posts)
    }

    /// Batch-load categories for a page of posts.
    pub async fn categories_for_posts(
        &self,
        post_ids: &[i32],
    ) -> AppResult<HashMap<i32, Vec<CategoryModel>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let links = PostCategory::find()
            .filter(post_category::Column::PostId.is_in(post_ids.to_vec()))
            .all(&self.db)
            .await?;
        if links.is_empty() {
            return Ok(HashMap::new());
        }

        let mut category_ids: Vec<i32> = links.iter().map(|l| l.category_id).collect();
        category_ids.sort_unstable();
        category_ids.dedup();

        let categories: HashMap<i32, CategoryModel> = Category::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut map: HashMap<i32, Vec<CategoryModel>> = HashMap::new();
        for link in links {
            if let Some(c) = categories.get(&link.category_id) {
                map.entry(link.post_id).or_default().push(c.clone());
            }
        }
        for list in map.values_mut() {
            list.sort_by(|a, b| a.name.cmp(&b.name));
        }

        Ok(map)
    }
}

async fn link_categories<C: ConnectionTrait>(
    db: &C,
    post_id: i32,
    categories: &[CategoryModel],
) -> AppResult<()> {
    for c in categories {
        post_category::ActiveModel {
            post_id: Set(post_id),
            category_id: Set(c.id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

fn validate_content<'a>(title: &'a str, body: &'a str) -> AppResult<(&'a str, &'a str)> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 200 {
        return Err(AppError::Validation(
            "Title must be 1-200 characters".to_string(),
        ));
    }
    if body.trim().is_empty() {
        return Err(AppError::Validation("Body must not be empty".to_string()));
    }
    Ok((title, body))
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_trimmed_and_checked() {
        let (title, _) = validate_content("  Hello  ", "body").unwrap();
        assert_eq!(title, "Hello");
        assert!(validate_content("   ", "body").is_err());
        assert!(validate_content("Title", " \n ").is_err());
        assert!(validate_content(&"x".repeat(201), "body").is_err());
    }

    #[test]
    fn optional_strings_are_normalized() {
        assert_eq!(normalize_optional(Some("  ".into())), None);
        assert_eq!(
            normalize_optional(Some(" /img/a.png ".into())),
            Some("/img/a.png".to_string())
        );
        assert_eq!(normalize_optional(None), None);
    }
}
