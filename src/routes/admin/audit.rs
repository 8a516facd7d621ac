use serde::Serialize;

use crate::moderation::{ContentKind, ContentStatus};
use crate::roles::Role;
use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(list)
}

const PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
struct LogQuery {
    kind: Option<ContentKind>,
    entity: Option<Uuid>,
    page: Option<u32>,
}

#[derive(sqlx::FromRow, Serialize, Debug)]
struct LogEntry {
    id: Uuid,
    kind: String,
    entity_id: Uuid,
    actor: String,
    action: String,
    from_status: ContentStatus,
    to_status: ContentStatus,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[get("/log")]
async fn list(
    app_state: web::Data<AppState>,
    query: web::Query<LogQuery>,
    request: HttpRequest,
) -> Result<impl Responder> {
    app_state.require_role(request, Role::Editor).await?;

    let page = query.page.unwrap_or(1).max(1);
    let entries: Vec<LogEntry> = sqlx::query_as(
        r#"
        select moderation_log.id, moderation_log.kind, moderation_log.entity_id,
               account.username as actor, moderation_log.action,
               moderation_log.from_status, moderation_log.to_status,
               moderation_log.created_at
        from moderation_log
          join account on moderation_log.actor = account.id
        where ($1::text is null or moderation_log.kind = $1)
          and ($2::uuid is null or moderation_log.entity_id = $2)
        order by moderation_log.created_at desc
        limit $3 offset $4
        "#,
    )
    .bind(query.kind.map(|kind| kind.table()))
    .bind(query.entity)
    .bind(PAGE_SIZE)
    .bind((page as i64 - 1) * PAGE_SIZE)
    .fetch_all(&app_state.db_pool)
    .await
    .context("Failed to fetch moderation log")?;

    Ok(web::Json(entries))
}
