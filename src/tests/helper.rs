use async_trait::async_trait;
use serde_json::Value;

use crate::TagAliasRequest;
use crate::TagAliasRequestForm;
use crate::forum_topics::ForumTopic;
use crate::storage::Error;
use crate::storage::ForumReferenceValues;
use crate::storage::Memory;
use crate::storage::MemoryTransaction;
use crate::storage::Result;
use crate::storage::Storage;
use crate::storage::Transaction;
use crate::tag_aliases::Status;
use crate::tag_aliases::TagAlias;

/// Build a request, panics on blank names
pub fn request(antecedent_name: &str, consequent_name: &str) -> TagAliasRequest {
    request_with_flags(antecedent_name, consequent_name, Value::Null, Value::Null)
}

/// Build a request with the flags as submitted
pub fn request_with_flags(
    antecedent_name: &str,
    consequent_name: &str,
    skip_secondary_validations: Value,
    skip_forum: Value,
) -> TagAliasRequest {
    TagAliasRequest::new(TagAliasRequestForm {
        antecedent_name: antecedent_name.to_string(),
        consequent_name: consequent_name.to_string(),
        reason: "they are the same".to_string(),
        skip_secondary_validations,
        skip_forum,
    })
    .unwrap()
}

/// Store an alias directly, bypassing the request
pub async fn seed_tag_alias<S: Storage>(
    storage: &S,
    antecedent_name: &str,
    consequent_name: &str,
    status: Status,
) -> TagAlias {
    let mut transaction = storage.begin().await.unwrap();

    let tag_alias = transaction
        .create_tag_alias(&TagAlias::new(
            antecedent_name,
            consequent_name,
            false,
            status,
        ))
        .await
        .unwrap();

    transaction.commit().await.unwrap();

    tag_alias
}

/// Step at which [`FailingStorage`] gives up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailAt {
    CreateForumTopic,
    UpdateTagAliasForumReferences,
    Commit,
}

/// Memory storage with one broken write
#[derive(Clone, Debug)]
pub struct FailingStorage {
    pub inner: Memory,
    fail_at: FailAt,
}

impl FailingStorage {
    pub fn new(fail_at: FailAt) -> Self {
        Self {
            inner: Memory::new(),
            fail_at,
        }
    }
}

#[async_trait]
impl Storage for FailingStorage {
    type Transaction = FailingTransaction;

    async fn begin(&self) -> Result<FailingTransaction> {
        Ok(FailingTransaction {
            inner: self.inner.begin().await?,
            fail_at: self.fail_at,
        })
    }

    async fn find_tag_alias_by_id(&self, id: i64) -> Result<Option<TagAlias>> {
        self.inner.find_tag_alias_by_id(id).await
    }

    async fn find_tag_aliases_by_antecedent_name(&self, name: &str) -> Result<Vec<TagAlias>> {
        self.inner.find_tag_aliases_by_antecedent_name(name).await
    }

    async fn find_forum_topic_by_id(&self, id: i64) -> Result<Option<ForumTopic>> {
        self.inner.find_forum_topic_by_id(id).await
    }
}

pub struct FailingTransaction {
    inner: MemoryTransaction,
    fail_at: FailAt,
}

fn broken() -> Error {
    Error::Connection("broken pipe".to_string())
}

#[async_trait]
impl Transaction for FailingTransaction {
    async fn find_tag_aliases_by_antecedent_name(&mut self, name: &str) -> Result<Vec<TagAlias>> {
        self.inner.find_tag_aliases_by_antecedent_name(name).await
    }

    async fn create_tag_alias(&mut self, tag_alias: &TagAlias) -> Result<TagAlias> {
        self.inner.create_tag_alias(tag_alias).await
    }

    async fn update_tag_alias_forum_references(
        &mut self,
        tag_alias: &TagAlias,
        values: &ForumReferenceValues,
    ) -> Result<TagAlias> {
        if self.fail_at == FailAt::UpdateTagAliasForumReferences {
            return Err(broken());
        }

        self.inner
            .update_tag_alias_forum_references(tag_alias, values)
            .await
    }

    async fn create_forum_topic(&mut self, forum_topic: &ForumTopic) -> Result<ForumTopic> {
        if self.fail_at == FailAt::CreateForumTopic {
            return Err(broken());
        }

        self.inner.create_forum_topic(forum_topic).await
    }

    async fn commit(self) -> Result<()> {
        if self.fail_at == FailAt::Commit {
            return Err(broken());
        }

        self.inner.commit().await
    }

    async fn rollback(self) -> Result<()> {
        self.inner.rollback().await
    }
}

/// Memory storage whose lookups yield first, like a round trip to a database would
#[derive(Clone, Debug, Default)]
pub struct YieldingStorage {
    pub inner: Memory,
}

#[async_trait]
impl Storage for YieldingStorage {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction> {
        self.inner.begin().await
    }

    async fn find_tag_alias_by_id(&self, id: i64) -> Result<Option<TagAlias>> {
        tokio::task::yield_now().await;
        self.inner.find_tag_alias_by_id(id).await
    }

    async fn find_tag_aliases_by_antecedent_name(&self, name: &str) -> Result<Vec<TagAlias>> {
        tokio::task::yield_now().await;
        self.inner.find_tag_aliases_by_antecedent_name(name).await
    }

    async fn find_forum_topic_by_id(&self, id: i64) -> Result<Option<ForumTopic>> {
        tokio::task::yield_now().await;
        self.inner.find_forum_topic_by_id(id).await
    }
}
