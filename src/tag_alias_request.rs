//! Tag alias requests
//!
//! A request validates a proposed [`TagAlias`], optionally opens a [`ForumTopic`] to discuss
//! it, and creates both in one transaction.

use core::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::forum_topics::Category;
use crate::forum_topics::ForumTopic;
use crate::storage;
use crate::storage::ForumReferenceValues;
use crate::storage::Storage;
use crate::storage::Transaction;
use crate::tag_aliases::Status;
use crate::tag_aliases::TagAlias;
use crate::truthy::truthy;

/// Request errors
#[derive(Debug)]
pub enum Error {
    /// A required name is blank after normalization
    Blank(&'static str),

    /// The alias or its topic is invalid, one message per failed check
    Invalid(Vec<String>),

    /// Storage failed, nothing of the request was persisted
    Storage(storage::Error),

    /// The request was created before
    AlreadyCreated,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Storage(err) => Some(err),
            Error::Blank(_) | Error::Invalid(_) | Error::AlreadyCreated => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Blank(field) => write!(f, "{field} can't be blank"),
            Error::Invalid(errors) => write!(f, "Invalid tag alias request: {}", errors.join("; ")),
            Error::Storage(err) => write!(f, "Storage error: {err}"),
            Error::AlreadyCreated => f.write_str("Tag alias request is already created"),
        }
    }
}

impl From<storage::Error> for Error {
    fn from(err: storage::Error) -> Self {
        Error::Storage(err)
    }
}

/// Create tag alias request form
///
/// Fields to request an alias, as submitted
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagAliasRequestForm {
    /// The tag being replaced
    pub antecedent_name: String,

    /// The tag to replace it with
    pub consequent_name: String,

    /// Why the alias is wanted
    #[serde(default)]
    pub reason: String,

    /// Anything truthy skips the non-critical alias checks
    #[serde(default)]
    pub skip_secondary_validations: Value,

    /// Anything truthy skips the forum topic
    #[serde(default)]
    pub skip_forum: Value,
}

/// A request to alias one tag to another
#[derive(Debug)]
pub struct TagAliasRequest {
    antecedent_name: String,
    consequent_name: String,
    reason: String,
    skip_secondary_validations: bool,
    skip_forum: bool,

    /// Candidate alias, persisted after a successful create
    tag_alias: Option<TagAlias>,

    /// Candidate topic, persisted after a successful create
    forum_topic: Option<ForumTopic>,

    /// Messages of the last validation
    errors: Vec<String>,
}

impl TagAliasRequest {
    /// Title of the topic discussing an alias
    ///
    /// ```rust
    /// use tag_alias_request::TagAliasRequest;
    ///
    /// assert_eq!(
    ///     "Tag alias: big_cat -> large_cat",
    ///     TagAliasRequest::topic_title("big_cat", "large_cat")
    /// );
    /// ```
    pub fn topic_title(antecedent_name: &str, consequent_name: &str) -> String {
        format!("Tag alias: {antecedent_name} -> {consequent_name}")
    }

    /// Command referencing an alias in a forum post
    ///
    /// Refers to the alias by ID once it has one, by its names before that.
    ///
    /// ```rust
    /// use tag_alias_request::TagAliasRequest;
    ///
    /// assert_eq!("[ta:42]", TagAliasRequest::command_string("a", "b", Some(42)));
    /// assert_eq!(
    ///     "create alias [[a]] -> [[b]]",
    ///     TagAliasRequest::command_string("a", "b", None)
    /// );
    /// ```
    pub fn command_string(
        antecedent_name: &str,
        consequent_name: &str,
        tag_alias_id: Option<i64>,
    ) -> String {
        match tag_alias_id {
            Some(id) => format!("[ta:{id}]"),
            None => format!("create alias [[{antecedent_name}]] -> [[{consequent_name}]]"),
        }
    }

    /// Create a request from a submitted form
    ///
    /// Names are trimmed and spaces become underscores.
    ///
    /// # Errors
    ///
    /// Will return `Err` when a name is blank
    pub fn new(form: TagAliasRequestForm) -> Result<Self, Error> {
        let antecedent_name = normalize_tag_name(&form.antecedent_name);
        if antecedent_name.is_empty() {
            return Err(Error::Blank("Antecedent name"));
        }

        let consequent_name = normalize_tag_name(&form.consequent_name);
        if consequent_name.is_empty() {
            return Err(Error::Blank("Consequent name"));
        }

        Ok(Self {
            antecedent_name,
            consequent_name,
            reason: form.reason,
            skip_secondary_validations: truthy(&form.skip_secondary_validations),
            skip_forum: truthy(&form.skip_forum),
            tag_alias: None,
            forum_topic: None,
            errors: Vec::new(),
        })
    }

    pub fn antecedent_name(&self) -> &str {
        &self.antecedent_name
    }

    pub fn consequent_name(&self) -> &str {
        &self.consequent_name
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn skip_secondary_validations(&self) -> bool {
        self.skip_secondary_validations
    }

    pub fn skip_forum(&self) -> bool {
        self.skip_forum
    }

    /// The alias, a candidate before [`create`](Self::create) succeeds
    pub fn tag_alias(&self) -> Option<&TagAlias> {
        self.tag_alias.as_ref()
    }

    /// The topic, never set when the forum is skipped
    pub fn forum_topic(&self) -> Option<&ForumTopic> {
        self.forum_topic.as_ref()
    }

    /// Messages of the last validation, empty when it passed
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Build an unsaved, pending alias from the request
    pub fn build_tag_alias(&self) -> TagAlias {
        candidate_tag_alias(
            &self.antecedent_name,
            &self.consequent_name,
            self.skip_secondary_validations,
        )
    }

    /// Build an unsaved topic discussing the alias
    ///
    /// Without an alias ID the post describes the alias by its names.
    pub fn build_forum_topic(&self, tag_alias_id: Option<i64>) -> ForumTopic {
        candidate_forum_topic(
            &self.antecedent_name,
            &self.consequent_name,
            &self.reason,
            tag_alias_id,
        )
    }

    /// Validate the alias and, unless skipped, its topic
    ///
    /// Every check runs, so all problems are reported together in [`errors`](Self::errors).
    ///
    /// # Errors
    ///
    /// Will return `Err` when storage fails while looking up existing aliases
    pub async fn validate<S: Storage>(&mut self, storage: &S) -> Result<bool, Error> {
        self.errors.clear();

        if let Some(error) = self.validate_tag_alias(storage).await? {
            self.errors.push(error);
        }

        if let Some(error) = self.validate_forum_topic() {
            self.errors.push(error);
        }

        if !self.errors.is_empty() {
            tracing::debug!(
                "Tag alias request {} -> {} is invalid: {:?}",
                self.antecedent_name,
                self.consequent_name,
                self.errors
            );
        }

        Ok(self.errors.is_empty())
    }

    async fn validate_tag_alias<S: Storage>(
        &mut self,
        storage: &S,
    ) -> Result<Option<String>, Error> {
        let tag_alias = self.tag_alias.get_or_insert_with(|| {
            candidate_tag_alias(
                &self.antecedent_name,
                &self.consequent_name,
                self.skip_secondary_validations,
            )
        });

        let errors = tag_alias.validate(storage).await?;

        Ok((!errors.is_empty()).then(|| errors.join("; ")))
    }

    fn validate_forum_topic(&mut self) -> Option<String> {
        if self.skip_forum {
            return None;
        }

        // no alias ID exists before creation
        let errors = self
            .forum_topic
            .get_or_insert_with(|| {
                candidate_forum_topic(
                    &self.antecedent_name,
                    &self.consequent_name,
                    &self.reason,
                    None,
                )
            })
            .validate();

        (!errors.is_empty()).then(|| errors.join("; "))
    }

    /// Create the alias and, unless skipped, its topic
    ///
    /// Nothing is written when the request is invalid. All writes happen in one transaction:
    /// the alias is checked again against what the transaction sees and stored, then the topic
    /// referencing the alias ID, then the alias is pointed to the topic and its first post.
    ///
    /// # Errors
    ///
    /// Will return `Err(Error::Invalid)` when validation fails, `Err(Error::Storage)` when
    /// persisting fails, in which case the transaction is rolled back, and
    /// `Err(Error::AlreadyCreated)` when the request was created before
    pub async fn create<S: Storage>(&mut self, storage: &S) -> Result<(), Error> {
        if self.tag_alias.as_ref().is_some_and(TagAlias::is_persisted) {
            return Err(Error::AlreadyCreated);
        }

        if !self.validate(storage).await? {
            return Err(Error::Invalid(self.errors.clone()));
        }

        let mut transaction = storage.begin().await?;

        match self.persist(&mut transaction).await {
            Ok((tag_alias, forum_topic)) => {
                if let Err(err) = transaction.commit().await {
                    tracing::warn!(
                        "Could not commit tag alias {} -> {}: {err}",
                        self.antecedent_name,
                        self.consequent_name
                    );

                    return Err(Error::Storage(err));
                }

                tracing::info!(
                    "Created tag alias {} -> {} with ID {:?}",
                    tag_alias.antecedent_name,
                    tag_alias.consequent_name,
                    tag_alias.id
                );

                self.tag_alias = Some(tag_alias);
                self.forum_topic = forum_topic;

                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    "Could not create tag alias {} -> {}, rolling back: {err}",
                    self.antecedent_name,
                    self.consequent_name
                );

                if let Err(rollback_err) = transaction.rollback().await {
                    tracing::error!("Rollback failed: {rollback_err}");
                }

                if let Error::Invalid(errors) = &err {
                    self.errors.clone_from(errors);
                }

                Err(err)
            }
        }
    }

    /// Write everything to the transaction
    ///
    /// The candidates of the request stay untouched, so a failed transaction leaves no IDs
    /// behind on them.
    async fn persist<T: Transaction>(
        &self,
        transaction: &mut T,
    ) -> Result<(TagAlias, Option<ForumTopic>), Error> {
        let candidate = self
            .tag_alias
            .clone()
            .unwrap_or_else(|| self.build_tag_alias());

        // others may have committed since validation
        let errors = candidate.validate_in_transaction(transaction).await?;
        if !errors.is_empty() {
            return Err(Error::Invalid(errors));
        }

        let tag_alias = transaction.create_tag_alias(&candidate).await?;

        if self.skip_forum {
            return Ok((tag_alias, None));
        }

        let forum_topic = self.build_forum_topic(tag_alias.id);
        let forum_topic = transaction.create_forum_topic(&forum_topic).await?;

        let (Some(forum_topic_id), Some(forum_post_id)) = (
            forum_topic.id,
            forum_topic.original_post().and_then(|post| post.id),
        ) else {
            return Err(Error::Storage(storage::Error::Connection(String::from(
                "Forum topic was stored without IDs",
            ))));
        };

        let values = ForumReferenceValues {
            forum_topic_id: &forum_topic_id,
            forum_post_id: &forum_post_id,
        };

        let tag_alias = transaction
            .update_tag_alias_forum_references(&tag_alias, &values)
            .await?;

        Ok((tag_alias, Some(forum_topic)))
    }
}

/// Pending alias for the given names
fn candidate_tag_alias(
    antecedent_name: &str,
    consequent_name: &str,
    skip_secondary_validations: bool,
) -> TagAlias {
    TagAlias::new(
        antecedent_name,
        consequent_name,
        skip_secondary_validations,
        Status::Pending,
    )
}

/// Topic discussing the alias, referring to it by ID once it has one
fn candidate_forum_topic(
    antecedent_name: &str,
    consequent_name: &str,
    reason: &str,
    tag_alias_id: Option<i64>,
) -> ForumTopic {
    let body = format!(
        "{}\n\nReason: {reason}",
        TagAliasRequest::command_string(antecedent_name, consequent_name, tag_alias_id),
    );

    ForumTopic::new(
        &TagAliasRequest::topic_title(antecedent_name, consequent_name),
        &body,
        Category::Tags.id(),
    )
}

/// Trim a tag name and replace its spaces with underscores
fn normalize_tag_name(name: &str) -> String {
    name.trim().replace(' ', "_")
}
