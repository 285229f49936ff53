//! Records returned by board operations.

use chie_types::{split_tags, Category, LdapId};
use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub ldap_id: LdapId,
    /// Display name.
    pub name: String,
    /// Signup timestamp (RFC 3339).
    pub created_at: String,
}

/// Parameters for posting a new question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    pub title: String,
    pub content: String,
    pub category: Category,
    /// Individual tags; stored comma-joined.
    pub tags: Vec<String>,
    /// Asker.
    pub author: LdapId,
}

/// A question as shown in listings and search results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionSummary {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: Category,
    /// Comma-joined tags, empty when the question has none.
    pub tags: String,
    /// Asker.
    pub ldap_id: LdapId,
    /// Asker's display name, or `"Unknown"` if the user record is missing.
    pub user_name: String,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    pub resolved: bool,
    pub best_answer_id: Option<i64>,
    /// Optional thank-you note left by the asker on resolution.
    pub thank_message: Option<String>,
    pub answer_count: i64,
}

impl QuestionSummary {
    /// The individual tags.
    pub fn tag_list(&self) -> Vec<String> {
        split_tags(&self.tags)
    }
}

/// Which questions a listing should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedFilter {
    All,
    /// Questions still accepting answers.
    #[default]
    Open,
    Resolved,
}

/// An answer to a question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub content: String,
    /// Answerer.
    pub ldap_id: LdapId,
    /// When the answer was first posted (RFC 3339). Never changes.
    pub posted_at: String,
    /// When the content last changed (RFC 3339).
    pub updated_at: String,
    pub is_best: bool,
}

/// An answer joined with its author's display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerView {
    #[serde(flatten)]
    pub answer: Answer,
    /// Answerer's display name, or `"Unknown"`.
    pub user_name: String,
}
