//! All things related to the storage of tag aliases and forum topics

use core::fmt;

use async_trait::async_trait;

use crate::forum_topics::ForumTopic;
use crate::tag_aliases::TagAlias;

#[cfg(feature = "postgres")]
pub use postgres::Database;
pub use memory::Memory;
pub use memory::MemoryTransaction;
#[cfg(feature = "postgres")]
pub use postgres::DatabaseTransaction;

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

/// Storage errors
#[derive(Debug)]
pub enum Error {
    /// A connection error with the storage
    Connection(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Connection(error) => write!(f, "Connection error: {error}"),
        }
    }
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Values to link a tag alias to its discussion
pub struct ForumReferenceValues<'a> {
    /// The topic discussing the alias
    pub forum_topic_id: &'a i64,

    /// The first post of that topic
    pub forum_post_id: &'a i64,
}

/// Storage with all supported read operations
///
/// Writes only happen through a [`Transaction`]
#[async_trait]
pub trait Storage: Clone + Send + Sync + 'static {
    /// Transaction type of this storage
    type Transaction: Transaction;

    /// Open a new transaction
    ///
    /// Nothing written through the transaction is visible to others until it is committed
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Find a single tag alias by its ID
    async fn find_tag_alias_by_id(&self, id: i64) -> Result<Option<TagAlias>>;

    /// Find all tag aliases with the given antecedent, whatever their status
    async fn find_tag_aliases_by_antecedent_name(&self, name: &str) -> Result<Vec<TagAlias>>;

    /// Find a single forum topic by its ID, posts included
    async fn find_forum_topic_by_id(&self, id: i64) -> Result<Option<ForumTopic>>;
}

/// A single unit of work
///
/// Dropping a transaction without committing it discards everything written through it
#[async_trait]
pub trait Transaction: Send {
    /// Find all tag aliases with the given antecedent, including writes of this transaction
    async fn find_tag_aliases_by_antecedent_name(&mut self, name: &str) -> Result<Vec<TagAlias>>;

    /// Persist a new tag alias, assigning its ID
    async fn create_tag_alias(&mut self, tag_alias: &TagAlias) -> Result<TagAlias>;

    /// Point a persisted tag alias to its forum topic and post
    async fn update_tag_alias_forum_references(
        &mut self,
        tag_alias: &TagAlias,
        values: &ForumReferenceValues,
    ) -> Result<TagAlias>;

    /// Persist a new forum topic together with its original post
    async fn create_forum_topic(&mut self, forum_topic: &ForumTopic) -> Result<ForumTopic>;

    /// Make all writes visible
    async fn commit(self) -> Result<()>;

    /// Discard all writes
    async fn rollback(self) -> Result<()>;
}
