//! Interaction domain model — the tenant record itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed set of interaction types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionKind {
    Meeting,
    Call,
    Email,
    Update,
    Training,
    Review,
    Presentation,
    Conference,
    Workshop,
    Other,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 10] = [
        InteractionKind::Meeting,
        InteractionKind::Call,
        InteractionKind::Email,
        InteractionKind::Update,
        InteractionKind::Training,
        InteractionKind::Review,
        InteractionKind::Presentation,
        InteractionKind::Conference,
        InteractionKind::Workshop,
        InteractionKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Meeting => "Meeting",
            InteractionKind::Call => "Call",
            InteractionKind::Email => "Email",
            InteractionKind::Update => "Update",
            InteractionKind::Training => "Training",
            InteractionKind::Review => "Review",
            InteractionKind::Presentation => "Presentation",
            InteractionKind::Conference => "Conference",
            InteractionKind::Workshop => "Workshop",
            InteractionKind::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// An interaction record. `site_id` is set once at creation from the
/// active site context and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub site_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub lead: String,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: Option<DateTime<Utc>>,
    /// IANA zone name the record's times are presented in.
    pub timezone: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Client payload for creating an interaction.
///
/// `kind` and `timezone` arrive as raw strings so the validation pass
/// can report every bad field at once instead of failing at
/// deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInteraction {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub lead: String,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: Option<DateTime<Utc>>,
    pub timezone: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

/// Partial update payload. `None` fields are left untouched. Audit
/// fields are stamped server-side and never accepted from the client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateInteraction {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub lead: Option<String>,
    pub start_datetime: Option<DateTime<Utc>>,
    /// `Some(None)` clears the end datetime, `Some(Some(v))` sets it.
    pub end_datetime: Option<Option<DateTime<Utc>>>,
    pub timezone: Option<String>,
    pub location: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}
