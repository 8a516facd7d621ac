/// The shared moderation workflow. Every moderated kind (tributes, gallery
/// images, videos, audio recordings) moves through the same three statuses,
/// and every decision goes through [moderate], which enforces the transition
/// table, guards against two moderators deciding the same item at once, and
/// appends to the audit log in the same transaction as the update.
use anyhow::Context;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Lifecycle of a submitted content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "content_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentStatus {
    Pending,
    Published,
    Archived,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Pending => "pending",
            ContentStatus::Published => "published",
            ContentStatus::Archived => "archived",
        }
    }
}

/// Actions a moderator can take on a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Approve,
    Reject,
    Archive,
    Republish,
    Feature,
    Unfeature,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
            ModerationAction::Archive => "archive",
            ModerationAction::Republish => "republish",
            ModerationAction::Feature => "feature",
            ModerationAction::Unfeature => "unfeature",
        }
    }

    fn touches_featured(&self) -> bool {
        matches!(self, ModerationAction::Feature | ModerationAction::Unfeature)
    }
}

/// The moderated content kinds. Also doubles as the URL segment under
/// /admin/content/ via the serde renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    #[serde(rename = "tributes")]
    Tribute,
    #[serde(rename = "gallery")]
    Gallery,
    #[serde(rename = "videos")]
    Video,
    #[serde(rename = "audio")]
    Audio,
}

impl ContentKind {
    /// Table names come from this fixed set, never from user input, which is
    /// why interpolating them into SQL below is fine.
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Tribute => "tribute",
            ContentKind::Gallery => "gallery_image",
            ContentKind::Video => "video",
            ContentKind::Audio => "audio_recording",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Tribute => "tribute",
            ContentKind::Gallery => "gallery image",
            ContentKind::Video => "video",
            ContentKind::Audio => "audio recording",
        }
    }

    /// Audio recordings have no featured slot on the site.
    pub fn supports_featured(&self) -> bool {
        !matches!(self, ContentKind::Audio)
    }
}

/// Where a row lands after a legal action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Moderated {
    pub status: ContentStatus,
    pub featured: bool,
}

/// The transition table. Returns None for illegal (status, action) pairs.
/// Invariant: featured implies published, so everything leaving Published
/// drops the flag.
pub fn transition(
    status: ContentStatus,
    featured: bool,
    action: ModerationAction,
) -> Option<Moderated> {
    use ContentStatus::*;
    use ModerationAction::*;
    match (status, action) {
        (Pending, Approve) => Some(Moderated {
            status: Published,
            featured,
        }),
        (Pending, Reject) => Some(Moderated {
            status: Archived,
            featured: false,
        }),
        (Published, Archive) => Some(Moderated {
            status: Archived,
            featured: false,
        }),
        (Published, Feature) => Some(Moderated {
            status: Published,
            featured: true,
        }),
        (Published, Unfeature) => Some(Moderated {
            status: Published,
            featured: false,
        }),
        (Archived, Republish) => Some(Moderated {
            status: Published,
            featured: false,
        }),
        _ => None,
    }
}

/// Apply one moderation action to one content item.
pub async fn moderate(
    db_pool: &sqlx::postgres::PgPool,
    uuid_seed: &[u8; 6],
    kind: ContentKind,
    id: Uuid,
    action: ModerationAction,
    actor: Uuid,
) -> Result<Moderated> {
    if action.touches_featured() && !kind.supports_featured() {
        return Err(Error::AppError(format!(
            "A {} cannot be featured.",
            kind.label()
        )));
    }

    let mut transaction = db_pool
        .begin()
        .await
        .context("Failed to create moderation transaction")?;

    let (status, featured): (ContentStatus, bool) = match sqlx::query_as(&format!(
        r#"
        select status, featured
        from {}
        where id = $1
        "#,
        kind.table()
    ))
    .bind(id)
    .fetch_optional(&mut *transaction)
    .await
    .context("Failed to fetch moderation target")?
    {
        Some(row) => row,
        None => {
            return Err(Error::AppError(format!("No such {}.", kind.label())));
        }
    };

    let next = transition(status, featured, action).ok_or_else(|| {
        Error::AppError(format!(
            "Cannot {} a {} {}.",
            action.as_str(),
            status.as_str(),
            kind.label()
        ))
    })?;

    // Conditioned on the status we just read: if another moderator got there
    // first, zero rows change and the caller sees a conflict instead of a
    // silently repeated decision.
    let updated = sqlx::query(&format!(
        r#"
        update {}
        set status = $1, featured = $2, moderated_by = $3, moderated_at = now()
        where id = $4 and status = $5
        "#,
        kind.table()
    ))
    .bind(next.status)
    .bind(next.featured)
    .bind(actor)
    .bind(id)
    .bind(status)
    .execute(&mut *transaction)
    .await
    .context("Failed to update moderation status")?;

    if updated.rows_affected() <= 0 {
        return Err(Error::ConflictError(format!(
            "Someone else moderated this {} just now. Reload and try again.",
            kind.label()
        )));
    }

    sqlx::query(
        r#"
        insert into moderation_log (id, kind, entity_id, actor, action, from_status, to_status)
        values ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::now_v6(uuid_seed))
    .bind(kind.table())
    .bind(id)
    .bind(actor)
    .bind(action.as_str())
    .bind(status)
    .bind(next.status)
    .execute(&mut *transaction)
    .await
    .context("Failed to record moderation action")?;

    transaction
        .commit()
        .await
        .context("Failed to commit moderation")?;

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ContentStatus::*;
    use ModerationAction::*;

    #[test]
    fn exactly_the_legal_pairs() {
        let statuses = [Pending, Published, Archived];
        let actions = [Approve, Reject, Archive, Republish, Feature, Unfeature];
        let mut legal = Vec::new();
        for status in statuses {
            for action in actions {
                if transition(status, false, action).is_some() {
                    legal.push((status, action));
                }
            }
        }
        assert_eq!(
            legal,
            vec![
                (Pending, Approve),
                (Pending, Reject),
                (Published, Archive),
                (Published, Feature),
                (Published, Unfeature),
                (Archived, Republish),
            ]
        );
    }

    #[test]
    fn approve_publishes() {
        assert_eq!(
            transition(Pending, false, Approve),
            Some(Moderated {
                status: Published,
                featured: false
            })
        );
    }

    #[test]
    fn feature_keeps_status() {
        assert_eq!(
            transition(Published, false, Feature),
            Some(Moderated {
                status: Published,
                featured: true
            })
        );
        assert_eq!(
            transition(Published, true, Unfeature),
            Some(Moderated {
                status: Published,
                featured: false
            })
        );
    }

    #[test]
    fn leaving_published_drops_featured() {
        let archived = transition(Published, true, Archive).unwrap();
        assert_eq!(archived.status, Archived);
        assert!(!archived.featured);
    }

    #[test]
    fn republish_is_not_refeature() {
        let republished = transition(Archived, false, Republish).unwrap();
        assert_eq!(republished.status, Published);
        assert!(!republished.featured);
    }

    #[test]
    fn no_featuring_off_the_site() {
        assert_eq!(transition(Pending, false, Feature), None);
        assert_eq!(transition(Archived, false, Feature), None);
        assert_eq!(transition(Archived, true, Unfeature), None);
    }

    #[test]
    fn no_double_decisions() {
        // The pairs a stale moderation tab would produce.
        assert_eq!(transition(Published, false, Approve), None);
        assert_eq!(transition(Archived, false, Reject), None);
        assert_eq!(transition(Archived, false, Archive), None);
        assert_eq!(transition(Published, false, Republish), None);
    }

    #[test]
    fn kind_segments_round_trip() {
        for (segment, kind) in [
            ("tributes", ContentKind::Tribute),
            ("gallery", ContentKind::Gallery),
            ("videos", ContentKind::Video),
            ("audio", ContentKind::Audio),
        ] {
            let parsed: ContentKind =
                serde_json::from_str(&format!("\"{segment}\"")).expect("segment should parse");
            assert_eq!(parsed, kind);
        }
        assert!(serde_json::from_str::<ContentKind>("\"accounts\"").is_err());
    }

    #[test]
    fn audio_is_never_featured() {
        assert!(!ContentKind::Audio.supports_featured());
        assert!(ContentKind::Tribute.supports_featured());
        assert!(ContentKind::Gallery.supports_featured());
        assert!(ContentKind::Video.supports_featured());
    }
}
