//! Forum topics
//!
//! Discussions about changes to the tags, each one a title with an ordered list of posts

use chrono::naive::NaiveDateTime;

/// Longest title that is accepted
const MAX_TITLE_LENGTH: usize = 255;

/// Forum categories
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    /// Anything
    General,
    /// Tag changes, aliases included
    Tags,
    /// Site issues
    BugsAndFeatures,
}

impl Category {
    /// Category ID, as stored
    pub fn id(self) -> i64 {
        match self {
            Category::General => 0,
            Category::Tags => 1,
            Category::BugsAndFeatures => 2,
        }
    }

    /// Category by its ID
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Category::General),
            1 => Some(Category::Tags),
            2 => Some(Category::BugsAndFeatures),
            _ => None,
        }
    }
}

/// Post within a forum topic
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForumPost {
    /// Forum post ID, `None` until persisted
    pub id: Option<i64>,

    /// Topic of the post, `None` until persisted
    pub topic_id: Option<i64>,

    /// Content
    pub body: String,
}

/// Forum topic with its posts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForumTopic {
    /// Forum topic ID, `None` until persisted
    pub id: Option<i64>,

    /// Title
    pub title: String,

    /// See [`Category`]
    pub category_id: i64,

    /// Posts in order, the first one opened the topic
    pub posts: Vec<ForumPost>,

    /// Creation date
    pub created_at: Option<NaiveDateTime>,

    /// Last updated at
    pub updated_at: Option<NaiveDateTime>,
}

impl ForumTopic {
    /// Create an unsaved topic with its original post
    pub fn new(title: &str, original_post_body: &str, category_id: i64) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            category_id,
            posts: vec![ForumPost {
                id: None,
                topic_id: None,
                body: original_post_body.to_string(),
            }],
            created_at: None,
            updated_at: None,
        }
    }

    /// The post that opened the topic
    pub fn original_post(&self) -> Option<&ForumPost> {
        self.posts.first()
    }

    /// Check the topic against its rules
    ///
    /// Returns every broken rule as a message, an empty list means the topic is valid
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push(String::from("Title can't be blank"));
        } else if self.title.chars().count() > MAX_TITLE_LENGTH {
            errors.push(format!(
                "Title is too long (maximum is {MAX_TITLE_LENGTH} characters)"
            ));
        }

        if Category::from_id(self.category_id).is_none() {
            errors.push(String::from("Category is not included in the list"));
        }

        match self.original_post() {
            Some(post) if post.body.trim().is_empty() => {
                errors.push(String::from("Original post body can't be blank"));
            }
            Some(_) => {}
            None => errors.push(String::from("Original post can't be blank")),
        }

        errors
    }
}
