use crate::{
    error::{AppError, AppResult},
    models::{comment, user, Comment, CommentModel, Post, User, UserModel},
    utils::search::contains_ci,
};
use sea_orm::{
    sea_query::Query, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Select, Set,
    TransactionTrait,
};
use std::collections::HashMap;

pub const LOGIN_REQUIRED_MESSAGE: &str = "You must be logged in to comment.";

/// A comment together with its author, `None` once the account is gone.
#[derive(Debug, Clone)]
pub struct CommentEntry {
    pub comment: CommentModel,
    pub author: Option<UserModel>,
}

/// A visible top-level comment and its visible replies, both newest first.
#[derive(Debug, Clone)]
pub struct CommentThread {
    pub root: CommentEntry,
    pub replies: Vec<CommentEntry>,
}

#[derive(Debug, Default, Clone)]
pub struct ModerationFilter {
    pub active: Option<bool>,
    pub query: Option<String>,
}

pub struct CommentService {
    db: DatabaseConnection,
}

impl CommentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Store a new comment on a published post.
    ///
    /// A reply to a reply is attached to the reply's parent, so stored
    /// threads never go deeper than one level of replies.
    pub async fn create(
        &self,
        post_id: i32,
        author_id: Option<i32>,
        body: &str,
        parent_id: Option<i32>,
    ) -> AppResult<CommentModel> {
        let author_id =
            author_id.ok_or_else(|| AppError::LoginRequired(LOGIN_REQUIRED_MESSAGE.to_string()))?;

        let body = body.trim();
        if body.is_empty() {
            return Err(AppError::Validation("Comment body must not be empty".to_string()));
        }

        let txn = self.db.begin().await?;

        let post = Post::find_by_id(post_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        if !post.is_published() {
            return Err(AppError::NotFound);
        }

        let parent_id = match parent_id {
            Some(target_id) => Some(resolve_parent(&txn, post.id, target_id).await?),
            None => None,
        };

        let created = comment::ActiveModel {
            post_id: Set(post.id),
            author_id: Set(Some(author_id)),
            parent_id: Set(parent_id),
            body: Set(body.to_string()),
            active: Set(true),
            created_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        tracing::info!(
            comment_id = created.id,
            post_id = created.post_id,
            parent_id = ?created.parent_id,
            "comment created"
        );
        Ok(created)
    }

    /// Visible threads of a post.
    ///
    /// Hidden top-level comments take their replies with them, whatever the
    /// replies' own state.
    pub async fn list_visible(&self, post_id: i32) -> AppResult<Vec<CommentThread>> {
        let roots = newest_first(Comment::find())
            .filter(comment::Column::PostId.eq(post_id))
            .filter(comment::Column::ParentId.is_null())
            .filter(comment::Column::Active.eq(true))
            .all(&self.db)
            .await?;
        if roots.is_empty() {
            return Ok(Vec::new());
        }

        let root_ids: Vec<i32> = roots.iter().map(|c| c.id).collect();
        let replies = newest_first(Comment::find())
            .filter(comment::Column::ParentId.is_in(root_ids))
            .filter(comment::Column::Active.eq(true))
            .all(&self.db)
            .await?;

        let author_ids: Vec<i32> = roots
            .iter()
            .chain(replies.iter())
            .filter_map(|c| c.author_id)
            .collect();
        let authors = self.load_authors(author_ids).await?;

        Ok(assemble_threads(roots, replies, &authors))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<CommentModel> {
        Comment::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Show or hide a single comment. Replies keep their own flag.
    pub async fn set_active(&self, id: i32, active: bool) -> AppResult<CommentModel> {
        let existing = self.get_by_id(id).await?;
        if existing.active == active {
            return Ok(existing);
        }

        let mut model: comment::ActiveModel = existing.into();
        model.active = Set(active);
        let updated = model.update(&self.db).await?;

        tracing::info!(comment_id = id, visibility = ?updated.visibility(), "comment moderated");
        Ok(updated)
    }

    /// Comments across all posts for the moderation queue, newest first.
    pub async fn list_for_moderation(
        &self,
        filter: &ModerationFilter,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<CommentEntry>, u64)> {
        let mut select = newest_first(Comment::find());
        if let Some(active) = filter.active {
            select = select.filter(comment::Column::Active.eq(active));
        }
        if let Some(q) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let matching_authors = Query::select()
                .column(user::Column::Id)
                .from(User)
                .and_where(contains_ci(user::Column::Username, q))
                .to_owned();
            select = select.filter(
                Condition::any()
                    .add(contains_ci(comment::Column::Body, q))
                    .add(comment::Column::AuthorId.in_subquery(matching_authors)),
            );
        }

        let paginator = select.paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let comments = paginator.fetch_page(page.saturating_sub(1)).await?;

        let authors = self
            .load_authors(comments.iter().filter_map(|c| c.author_id).collect())
            .await?;
        let entries = comments
            .into_iter()
            .map(|c| entry(c, &authors))
            .collect();

        Ok((entries, total))
    }

    /// One query for every author on the page.
    async fn load_authors(&self, mut ids: Vec<i32>) -> AppResult<HashMap<i32, UserModel>> {
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = User::find()
            .filter(user::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }
}

fn newest_first(select: Select<Comment>) -> Select<Comment> {
    select
        .order_by_desc(comment::Column::CreatedAt)
        .order_by_desc(comment::Column::Id)
}

/// Parent id for a reply aimed at `target_id`, which must live on `post_id`.
async fn resolve_parent<C: ConnectionTrait>(db: &C, post_id: i32, target_id: i32) -> AppResult<i32> {
    let target = Comment::find_by_id(target_id)
        .filter(comment::Column::PostId.eq(post_id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(target.reply_anchor())
}

fn entry(comment: CommentModel, authors: &HashMap<i32, UserModel>) -> CommentEntry {
    let author = comment.author_id.and_then(|id| authors.get(&id).cloned());
    CommentEntry { comment, author }
}

/// Group already-ordered replies under their roots. Replies whose parent is
/// not among `roots` are dropped.
pub fn assemble_threads(
    roots: Vec<CommentModel>,
    replies: Vec<CommentModel>,
    authors: &HashMap<i32, UserModel>,
) -> Vec<CommentThread> {
    let mut by_parent: HashMap<i32, Vec<CommentEntry>> = HashMap::new();
    for reply in replies {
        if let Some(parent_id) = reply.parent_id {
            by_parent
                .entry(parent_id)
                .or_default()
                .push(entry(reply, authors));
        }
    }

    roots
        .into_iter()
        .map(|root| {
            let replies = by_parent.remove(&root.id).unwrap_or_default();
            CommentThread {
                root: entry(root, authors),
                replies,
            }
        })
        .collect()
}
