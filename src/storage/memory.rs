//! Memory storage
//!
//! Will be destroyed on system shutdown

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::forum_topics::ForumTopic;
use crate::tag_aliases::TagAlias;

use super::Error;
use super::ForumReferenceValues;
use super::Result;
use super::Storage;
use super::Transaction;

/// Everything that is stored
#[derive(Clone, Debug, Default)]
struct State {
    /// All tag aliases in storage
    tag_aliases: BTreeMap<i64, TagAlias>,

    /// All forum topics in storage, posts included
    forum_topics: BTreeMap<i64, ForumTopic>,

    /// Last handed out tag alias ID
    last_tag_alias_id: i64,

    /// Last handed out forum topic ID
    last_forum_topic_id: i64,

    /// Last handed out forum post ID
    last_forum_post_id: i64,
}

/// An in-memory storage
///
/// Will be destroyed on system shutdown
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Committed state
    state: Arc<Mutex<State>>,
}

impl Memory {
    /// Create a new empty Memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for Memory {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction> {
        let committed = Arc::clone(&self.state).lock_owned().await;
        let working = committed.clone();

        Ok(MemoryTransaction { committed, working })
    }

    async fn find_tag_alias_by_id(&self, id: i64) -> Result<Option<TagAlias>> {
        Ok(self.state.lock().await.tag_aliases.get(&id).cloned())
    }

    async fn find_tag_aliases_by_antecedent_name(&self, name: &str) -> Result<Vec<TagAlias>> {
        Ok(self
            .state
            .lock()
            .await
            .tag_aliases
            .values()
            .filter(|tag_alias| tag_alias.antecedent_name == name)
            .cloned()
            .collect())
    }

    async fn find_forum_topic_by_id(&self, id: i64) -> Result<Option<ForumTopic>> {
        Ok(self.state.lock().await.forum_topics.get(&id).cloned())
    }
}

/// Transaction on the memory storage
///
/// Holds the storage lock for its whole lifetime, so transactions are serialized. Writes go to
/// a working copy that only replaces the committed state on commit.
#[derive(Debug)]
pub struct MemoryTransaction {
    /// Lock on the committed state
    committed: OwnedMutexGuard<State>,

    /// State including the writes of this transaction
    working: State,
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn find_tag_aliases_by_antecedent_name(&mut self, name: &str) -> Result<Vec<TagAlias>> {
        Ok(self
            .working
            .tag_aliases
            .values()
            .filter(|tag_alias| tag_alias.antecedent_name == name)
            .cloned()
            .collect())
    }

    async fn create_tag_alias(&mut self, tag_alias: &TagAlias) -> Result<TagAlias> {
        if tag_alias.is_persisted() {
            return Err(Error::Connection(String::from(
                "Tag alias is already persisted",
            )));
        }

        self.working.last_tag_alias_id += 1;

        let now = Utc::now().naive_utc();

        let tag_alias = TagAlias {
            id: Some(self.working.last_tag_alias_id),
            created_at: Some(now),
            updated_at: Some(now),
            ..tag_alias.clone()
        };

        self.working
            .tag_aliases
            .insert(self.working.last_tag_alias_id, tag_alias.clone());

        Ok(tag_alias)
    }

    async fn update_tag_alias_forum_references(
        &mut self,
        tag_alias: &TagAlias,
        values: &ForumReferenceValues,
    ) -> Result<TagAlias> {
        tag_alias
            .id
            .and_then(|id| self.working.tag_aliases.get_mut(&id))
            .map(|tag_alias| {
                tag_alias.forum_topic_id = Some(*values.forum_topic_id);
                tag_alias.forum_post_id = Some(*values.forum_post_id);
                tag_alias.updated_at = Some(Utc::now().naive_utc());

                tag_alias.clone()
            })
            .ok_or_else(|| Error::Connection(String::from("Tag alias not found")))
    }

    async fn create_forum_topic(&mut self, forum_topic: &ForumTopic) -> Result<ForumTopic> {
        if forum_topic.id.is_some() {
            return Err(Error::Connection(String::from(
                "Forum topic is already persisted",
            )));
        }

        self.working.last_forum_topic_id += 1;
        let topic_id = self.working.last_forum_topic_id;

        let now = Utc::now().naive_utc();

        let mut forum_topic = ForumTopic {
            id: Some(topic_id),
            created_at: Some(now),
            updated_at: Some(now),
            ..forum_topic.clone()
        };

        for post in &mut forum_topic.posts {
            self.working.last_forum_post_id += 1;

            post.id = Some(self.working.last_forum_post_id);
            post.topic_id = Some(topic_id);
        }

        self.working
            .forum_topics
            .insert(topic_id, forum_topic.clone());

        Ok(forum_topic)
    }

    async fn commit(self) -> Result<()> {
        let Self {
            mut committed,
            working,
        } = self;

        *committed = working;

        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
