//! Postgres storage

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use crate::config::StorageConfig;
use crate::config::required_env_var;
use crate::forum_topics::ForumPost;
use crate::forum_topics::ForumTopic;
use crate::tag_aliases::Status;
use crate::tag_aliases::TagAlias;

use super::Error;
use super::ForumReferenceValues;
use super::Result;
use super::Storage;
use super::Transaction;

/// Migrator to run migrations on startup
static MIGRATOR: Migrator = sqlx::migrate!();

/// Columns of a tag alias, in the order of [`SqlxTagAlias`]
const TAG_ALIAS_COLUMNS: &str = r"
    id,
    antecedent_name,
    consequent_name,
    skip_secondary_validations,
    status,
    forum_topic_id,
    forum_post_id,
    created_at,
    updated_at
";

/// `SQLx` type for tag alias status
#[derive(PartialEq, Debug, sqlx::Type)]
#[sqlx(type_name = "tag_alias_status_type")]
#[sqlx(rename_all = "kebab-case")]
enum TagAliasStatusType {
    /// Pending
    Pending,

    /// Queued
    Queued,

    /// Processing
    Processing,

    /// Active
    Active,

    /// Deleted
    Deleted,
}

impl TagAliasStatusType {
    /// Create status type from status
    fn from_status(status: Status) -> Self {
        match status {
            Status::Pending => TagAliasStatusType::Pending,
            Status::Queued => TagAliasStatusType::Queued,
            Status::Processing => TagAliasStatusType::Processing,
            Status::Active => TagAliasStatusType::Active,
            Status::Deleted => TagAliasStatusType::Deleted,
        }
    }

    /// Create status from status type
    fn to_status(&self) -> Status {
        match self {
            TagAliasStatusType::Pending => Status::Pending,
            TagAliasStatusType::Queued => Status::Queued,
            TagAliasStatusType::Processing => Status::Processing,
            TagAliasStatusType::Active => Status::Active,
            TagAliasStatusType::Deleted => Status::Deleted,
        }
    }
}

/// `SQLx` version of tag alias
#[derive(sqlx::FromRow)]
struct SqlxTagAlias {
    id: i64,
    antecedent_name: String,
    consequent_name: String,
    skip_secondary_validations: bool,
    status: TagAliasStatusType,
    forum_topic_id: Option<i64>,
    forum_post_id: Option<i64>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TagAlias {
    /// Create tag alias from `SQLx` version
    fn from_sqlx_tag_alias(tag_alias: SqlxTagAlias) -> Self {
        Self {
            id: Some(tag_alias.id),
            antecedent_name: tag_alias.antecedent_name,
            consequent_name: tag_alias.consequent_name,
            skip_secondary_validations: tag_alias.skip_secondary_validations,
            status: tag_alias.status.to_status(),
            forum_topic_id: tag_alias.forum_topic_id,
            forum_post_id: tag_alias.forum_post_id,
            created_at: Some(tag_alias.created_at),
            updated_at: Some(tag_alias.updated_at),
        }
    }
}

/// `SQLx` version of forum topic, without its posts
#[derive(sqlx::FromRow)]
struct SqlxForumTopic {
    id: i64,
    title: String,
    category_id: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// `SQLx` version of forum post
#[derive(sqlx::FromRow)]
struct SqlxForumPost {
    id: i64,
    topic_id: i64,
    body: String,
}

impl ForumTopic {
    /// Create forum topic from `SQLx` versions
    fn from_sqlx_forum_topic(topic: SqlxForumTopic, posts: Vec<SqlxForumPost>) -> Self {
        Self {
            id: Some(topic.id),
            title: topic.title,
            category_id: topic.category_id,
            posts: posts
                .into_iter()
                .map(|post| ForumPost {
                    id: Some(post.id),
                    topic_id: Some(post.topic_id),
                    body: post.body,
                })
                .collect(),
            created_at: Some(topic.created_at),
            updated_at: Some(topic.updated_at),
        }
    }
}

/// Postgres storage
#[derive(Clone)]
pub struct Database {
    /// Pool of connections
    connection_pool: PgPool,
}

impl Database {
    /// Create a new Postgres storage
    ///
    /// # Errors
    ///
    /// Will return `Err` when no connection can be made or the migrations fail
    pub async fn from_config(config: StorageConfig) -> anyhow::Result<Self> {
        match config {
            StorageConfig::DetectConfig => Self::new().await,
            StorageConfig::ExistingConnection(pool) => Self::new_with_pool(pool).await,
        }
    }

    /// Create Postgres storage
    ///
    /// Use the `DATABASE_URL` environment variable
    ///
    /// Migrations will be run
    async fn new() -> anyhow::Result<Self> {
        let database_connection_string = required_env_var("DATABASE_URL")?;

        let connection_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_connection_string)
            .await
            .context("Could not connect to the database")?;

        Self::new_with_pool(connection_pool).await
    }

    /// Create Postgres storage with existing pool
    ///
    /// Migrations will be run
    async fn new_with_pool(connection_pool: PgPool) -> anyhow::Result<Self> {
        MIGRATOR
            .run(&connection_pool)
            .await
            .context("Migrations could not run")?;

        Ok(Self { connection_pool })
    }
}

#[async_trait]
impl Storage for Database {
    type Transaction = DatabaseTransaction;

    async fn begin(&self) -> Result<DatabaseTransaction> {
        let transaction = self
            .connection_pool
            .begin()
            .await
            .map_err(connection_error)?;

        Ok(DatabaseTransaction { transaction })
    }

    async fn find_tag_alias_by_id(&self, id: i64) -> Result<Option<TagAlias>> {
        let tag_alias = sqlx::query_as::<_, SqlxTagAlias>(&format!(
            "SELECT {TAG_ALIAS_COLUMNS} FROM tag_aliases WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?
        .map(TagAlias::from_sqlx_tag_alias);

        Ok(tag_alias)
    }

    async fn find_tag_aliases_by_antecedent_name(&self, name: &str) -> Result<Vec<TagAlias>> {
        let tag_aliases = sqlx::query_as::<_, SqlxTagAlias>(&format!(
            "SELECT {TAG_ALIAS_COLUMNS} FROM tag_aliases WHERE antecedent_name = $1 ORDER BY id"
        ))
        .bind(name)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?
        .into_iter()
        .map(TagAlias::from_sqlx_tag_alias)
        .collect();

        Ok(tag_aliases)
    }

    async fn find_forum_topic_by_id(&self, id: i64) -> Result<Option<ForumTopic>> {
        let topic = sqlx::query_as::<_, SqlxForumTopic>(
            r"
            SELECT id, title, category_id, created_at, updated_at
            FROM forum_topics
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        let Some(topic) = topic else {
            return Ok(None);
        };

        let posts = sqlx::query_as::<_, SqlxForumPost>(
            r"
            SELECT id, topic_id, body
            FROM forum_posts
            WHERE topic_id = $1
            ORDER BY id
            ",
        )
        .bind(topic.id)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(Some(ForumTopic::from_sqlx_forum_topic(topic, posts)))
    }
}

/// Transaction on the Postgres storage
///
/// Rolled back by the driver when dropped without a commit
pub struct DatabaseTransaction {
    /// The open transaction
    transaction: sqlx::Transaction<'static, sqlx::Postgres>,
}

#[async_trait]
impl Transaction for DatabaseTransaction {
    async fn find_tag_aliases_by_antecedent_name(&mut self, name: &str) -> Result<Vec<TagAlias>> {
        let tag_aliases = sqlx::query_as::<_, SqlxTagAlias>(&format!(
            "SELECT {TAG_ALIAS_COLUMNS} FROM tag_aliases WHERE antecedent_name = $1 ORDER BY id"
        ))
        .bind(name)
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(connection_error)?
        .into_iter()
        .map(TagAlias::from_sqlx_tag_alias)
        .collect();

        Ok(tag_aliases)
    }

    async fn create_tag_alias(&mut self, tag_alias: &TagAlias) -> Result<TagAlias> {
        if tag_alias.is_persisted() {
            return Err(Error::Connection(String::from(
                "Tag alias is already persisted",
            )));
        }

        let tag_alias = sqlx::query_as::<_, SqlxTagAlias>(&format!(
            r"
            INSERT INTO tag_aliases (
                antecedent_name,
                consequent_name,
                skip_secondary_validations,
                status,
                forum_topic_id,
                forum_post_id
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TAG_ALIAS_COLUMNS}
            "
        ))
        .bind(&tag_alias.antecedent_name)
        .bind(&tag_alias.consequent_name)
        .bind(tag_alias.skip_secondary_validations)
        .bind(TagAliasStatusType::from_status(tag_alias.status))
        .bind(tag_alias.forum_topic_id)
        .bind(tag_alias.forum_post_id)
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(connection_error)?;

        Ok(TagAlias::from_sqlx_tag_alias(tag_alias))
    }

    async fn update_tag_alias_forum_references(
        &mut self,
        tag_alias: &TagAlias,
        values: &ForumReferenceValues,
    ) -> Result<TagAlias> {
        let Some(id) = tag_alias.id else {
            return Err(Error::Connection(String::from(
                "Tag alias is not persisted",
            )));
        };

        let tag_alias = sqlx::query_as::<_, SqlxTagAlias>(&format!(
            r"
            UPDATE tag_aliases
            SET forum_topic_id = $2,
                forum_post_id = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING {TAG_ALIAS_COLUMNS}
            "
        ))
        .bind(id)
        .bind(*values.forum_topic_id)
        .bind(*values.forum_post_id)
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(connection_error)?;

        Ok(TagAlias::from_sqlx_tag_alias(tag_alias))
    }

    async fn create_forum_topic(&mut self, forum_topic: &ForumTopic) -> Result<ForumTopic> {
        let topic = sqlx::query_as::<_, SqlxForumTopic>(
            r"
            INSERT INTO forum_topics (title, category_id)
            VALUES ($1, $2)
            RETURNING id, title, category_id, created_at, updated_at
            ",
        )
        .bind(&forum_topic.title)
        .bind(forum_topic.category_id)
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(connection_error)?;

        let mut posts = Vec::with_capacity(forum_topic.posts.len());

        for post in &forum_topic.posts {
            let post = sqlx::query_as::<_, SqlxForumPost>(
                r"
                INSERT INTO forum_posts (topic_id, body)
                VALUES ($1, $2)
                RETURNING id, topic_id, body
                ",
            )
            .bind(topic.id)
            .bind(&post.body)
            .fetch_one(&mut *self.transaction)
            .await
            .map_err(connection_error)?;

            posts.push(post);
        }

        Ok(ForumTopic::from_sqlx_forum_topic(topic, posts))
    }

    async fn commit(self) -> Result<()> {
        self.transaction.commit().await.map_err(connection_error)
    }

    async fn rollback(self) -> Result<()> {
        self.transaction.rollback().await.map_err(connection_error)
    }
}

fn connection_error<E>(err: E) -> Error
where
    E: std::error::Error,
{
    Error::Connection(err.to_string())
}
