//! Tag aliases
//!
//! An alias states that one tag (the antecedent) should be replaced by another (the
//! consequent). The business rules of an alias live here, the request only orchestrates them.

use core::fmt;
use std::str::FromStr;

use chrono::naive::NaiveDateTime;

use crate::storage::Result;
use crate::storage::Storage;
use crate::storage::Transaction;

/// Longest tag name that is accepted
const MAX_TAG_NAME_LENGTH: usize = 170;

/// Moderation status of a tag alias
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Waiting for approval
    Pending,
    /// Approved, waiting to be processed
    Queued,
    /// Tags are being moved
    Processing,
    /// In effect
    Active,
    /// Rejected or removed
    Deleted,
}

impl Status {
    /// String representation, as stored
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Queued => "queued",
            Status::Processing => "processing",
            Status::Active => "active",
            Status::Deleted => "deleted",
        }
    }

    /// Does an alias with this status still claim its antecedent?
    pub fn is_open(self) -> bool {
        !matches!(self, Status::Deleted)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status string
#[derive(Debug, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl std::error::Error for UnknownStatus {}

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Unknown tag alias status: {}", self.0)
    }
}

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> core::result::Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Status::Pending),
            "queued" => Ok(Status::Queued),
            "processing" => Ok(Status::Processing),
            "active" => Ok(Status::Active),
            "deleted" => Ok(Status::Deleted),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Alias of one tag to another
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagAlias {
    /// Tag alias ID, `None` until persisted
    pub id: Option<i64>,

    /// The tag being replaced
    pub antecedent_name: String,

    /// The tag it is replaced with
    pub consequent_name: String,

    /// Skip the non-critical checks of [`TagAlias::validate`]
    pub skip_secondary_validations: bool,

    /// Moderation status
    pub status: Status,

    /// Topic discussing the alias
    pub forum_topic_id: Option<i64>,

    /// First post of that topic
    pub forum_post_id: Option<i64>,

    /// Creation date
    pub created_at: Option<NaiveDateTime>,

    /// Last updated at
    pub updated_at: Option<NaiveDateTime>,
}

impl TagAlias {
    /// Create an unsaved tag alias
    pub fn new(
        antecedent_name: &str,
        consequent_name: &str,
        skip_secondary_validations: bool,
        status: Status,
    ) -> Self {
        Self {
            id: None,
            antecedent_name: antecedent_name.to_string(),
            consequent_name: consequent_name.to_string(),
            skip_secondary_validations,
            status,
            forum_topic_id: None,
            forum_post_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Is the alias persisted?
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Check the alias against its business rules
    ///
    /// Returns every broken rule as a message, an empty list means the alias is valid
    ///
    /// # Errors
    ///
    /// Will return `Err` when the existing aliases can not be looked up
    pub async fn validate<S: Storage>(&self, storage: &S) -> Result<Vec<String>> {
        let errors = self.validate_names();

        // lookups are meaningless for malformed names
        if !errors.is_empty() {
            return Ok(errors);
        }

        let antecedent_aliases = storage
            .find_tag_aliases_by_antecedent_name(&self.antecedent_name)
            .await?;
        let consequent_aliases = storage
            .find_tag_aliases_by_antecedent_name(&self.consequent_name)
            .await?;

        Ok(self.validate_against(&antecedent_aliases, &consequent_aliases))
    }

    /// Same as [`TagAlias::validate`], looking at what the transaction sees
    ///
    /// # Errors
    ///
    /// Will return `Err` when the existing aliases can not be looked up
    pub async fn validate_in_transaction<T: Transaction>(
        &self,
        transaction: &mut T,
    ) -> Result<Vec<String>> {
        let errors = self.validate_names();

        if !errors.is_empty() {
            return Ok(errors);
        }

        let antecedent_aliases = transaction
            .find_tag_aliases_by_antecedent_name(&self.antecedent_name)
            .await?;
        let consequent_aliases = transaction
            .find_tag_aliases_by_antecedent_name(&self.consequent_name)
            .await?;

        Ok(self.validate_against(&antecedent_aliases, &consequent_aliases))
    }

    /// Rules on the names alone
    fn validate_names(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(validate_tag_name("Antecedent name", &self.antecedent_name));
        errors.extend(validate_tag_name("Consequent name", &self.consequent_name));

        if errors.is_empty() && self.antecedent_name == self.consequent_name {
            errors.push(String::from("Cannot alias a tag to itself"));
        }

        errors
    }

    /// Rules against the aliases starting at either name
    fn validate_against(
        &self,
        antecedent_aliases: &[TagAlias],
        consequent_aliases: &[TagAlias],
    ) -> Vec<String> {
        let mut errors = Vec::new();

        let taken = antecedent_aliases
            .iter()
            .any(|other| other.status.is_open() && other.id != self.id);

        if taken {
            errors.push(String::from("Antecedent name has already been taken"));
        }

        let circular = consequent_aliases.iter().any(|other| {
            other.status.is_open() && other.consequent_name == self.antecedent_name
        });

        if circular {
            errors.push(format!(
                "Tag alias {} -> {} would create a circular relation",
                self.antecedent_name, self.consequent_name
            ));
        } else if !self.skip_secondary_validations
            && consequent_aliases
                .iter()
                .any(|other| other.status == Status::Active)
        {
            errors.push(format!(
                "A tag alias for {} already exists",
                self.consequent_name
            ));
        }

        errors
    }
}

/// Check a single tag name, reporting the first problem found
fn validate_tag_name(label: &str, name: &str) -> Option<String> {
    if name.is_empty() {
        return Some(format!("{label} can't be blank"));
    }

    if name.chars().count() > MAX_TAG_NAME_LENGTH {
        return Some(format!(
            "{label} is too long (maximum is {MAX_TAG_NAME_LENGTH} characters)"
        ));
    }

    if name.starts_with('-') || name.starts_with('~') {
        return Some(format!("'{name}' cannot begin with '-' or '~'"));
    }

    for ch in name.chars() {
        if ch == '*' {
            return Some(format!("'{name}' cannot contain asterisks"));
        }

        if ch == ',' {
            return Some(format!("'{name}' cannot contain commas"));
        }

        if ch.is_whitespace() {
            return Some(format!("'{name}' cannot contain whitespace"));
        }
    }

    None
}
