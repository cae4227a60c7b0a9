//! Chat-facing glue: inbound event shape, eligibility gates, operator
//! commands, and the outbound summary string
//!
//! The chat platform itself (gateway, permissions, routing) stays outside
//! this crate; events arrive already shaped as [`ChatEvent`] and the only
//! thing we owe the platform back is a human-readable summary.

use serde::Deserialize;

use crate::config::UploadPreferences;
use crate::session::{AuthorBatch, SessionReport};
use crate::upload::Attachment;

/// Author of an inbound message
#[derive(Debug, Clone, Deserialize)]
pub struct ChatAuthor {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub bot: bool,
}

/// One attachment on an inbound message
#[derive(Debug, Clone, Deserialize)]
pub struct ChatAttachment {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Inbound chat event, as delivered by the platform adapter
#[derive(Debug, Clone, Deserialize)]
pub struct ChatEvent {
    pub id: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub content: String,
    pub author: ChatAuthor,
    #[serde(default)]
    pub attachments: Vec<ChatAttachment>,
}

/// Operator commands recognized in message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    /// `!clearcache` - evict the whole folder cache
    ClearCache,
    /// `!clearusercache <user>` - evict entries whose key contains the user
    ClearUserCache { user: String },
    /// `!forcereset <user>` - same eviction, phrased as a reset
    ForceReset { user: String },
}

/// Parse an operator command from message text
pub fn parse_command(content: &str) -> Option<OperatorCommand> {
    let content = content.trim();

    if content.starts_with("!clearcache") {
        return Some(OperatorCommand::ClearCache);
    }
    if let Some(rest) = content.strip_prefix("!clearusercache") {
        let user = rest.trim();
        if !user.is_empty() {
            return Some(OperatorCommand::ClearUserCache {
                user: user.to_string(),
            });
        }
    }
    if let Some(rest) = content.strip_prefix("!forcereset") {
        let user = rest.trim();
        if !user.is_empty() {
            return Some(OperatorCommand::ForceReset {
                user: user.to_string(),
            });
        }
    }
    None
}

/// Filter one event's attachments down to accepted image types
pub fn eligible_attachments(event: &ChatEvent, prefs: &UploadPreferences) -> Vec<Attachment> {
    event
        .attachments
        .iter()
        .filter(|a| {
            a.content_type
                .as_deref()
                .is_some_and(|ct| prefs.accepted_types.iter().any(|t| t == ct))
        })
        .map(|a| Attachment {
            id: a.id.clone(),
            url: a.url.clone(),
            file_name: a
                .file_name
                .clone()
                .unwrap_or_else(|| "photo.jpg".to_string()),
            content_type: a.content_type.clone().unwrap_or_default(),
        })
        .collect()
}

/// Group eligible attachments from a set of events into per-author batches,
/// preserving first-seen author order. Bot authors are dropped.
pub fn collect_batches(events: &[ChatEvent], prefs: &UploadPreferences) -> Vec<AuthorBatch> {
    let mut batches: Vec<AuthorBatch> = Vec::new();

    for event in events {
        if event.author.bot {
            continue;
        }
        let attachments = eligible_attachments(event, prefs);
        if attachments.is_empty() {
            continue;
        }

        match batches
            .iter_mut()
            .find(|b| b.author_id == event.author.id)
        {
            Some(batch) => batch.attachments.extend(attachments),
            None => batches.push(AuthorBatch {
                author_id: event.author.id.clone(),
                display_name: event.author.display_name.clone(),
                attachments,
            }),
        }
    }

    batches
}

/// Total eligible attachments across all batches
pub fn eligible_total(batches: &[AuthorBatch]) -> usize {
    batches.iter().map(|b| b.attachments.len()).sum()
}

/// Whether the eligible set is large enough to trigger a session
pub fn meets_minimum(batches: &[AuthorBatch], prefs: &UploadPreferences) -> bool {
    eligible_total(batches) >= prefs.min_photos
}

/// Render the end-of-session summary posted back to the channel.
///
/// Distinguishes full success, partial success with counts, and total
/// failure; a report with zero items means nothing eligible was processed.
pub fn summarize(report: &SessionReport) -> String {
    let mut summary = if report.total == 0 {
        "No eligible photos were processed.".to_string()
    } else if report.all_succeeded() {
        format!(
            "Success: All {} photos uploaded successfully.",
            report.success_count
        )
    } else if report.total_failure() {
        "Error: Failed to upload all photos. Please try again.".to_string()
    } else {
        format!(
            "Partial success: {} photos uploaded, {} photos failed.",
            report.success_count, report.failure_count
        )
    };

    if report.per_user.len() > 1 {
        for user in &report.per_user {
            summary.push_str(&format!(
                "\n{}: {} uploaded, {} failed",
                user.folder_name, user.success_count, user.failure_count
            ));
        }
    }

    summary
}
