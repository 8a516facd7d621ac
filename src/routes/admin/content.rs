use serde::Serialize;

use crate::moderation::{self, ContentKind, ContentStatus, ModerationAction};
use crate::roles::Role;
use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(queue).service(act)
}

const PAGE_SIZE: i64 = 50;

#[derive(Debug, Deserialize)]
struct QueueQuery {
    status: Option<ContentStatus>,
    page: Option<u32>,
}

/// One moderation queue row, the same shape for every kind.
#[derive(sqlx::FromRow, Serialize, Debug)]
struct QueueItem {
    id: Uuid,
    title: String,
    status: ContentStatus,
    featured: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    submitted_by: String,
}

#[get("/content/{kind}")]
async fn queue(
    app_state: web::Data<AppState>,
    info: web::Path<(ContentKind,)>,
    query: web::Query<QueueQuery>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (kind,) = info.into_inner();
    app_state
        .require_role(request, Role::required_to_moderate(kind))
        .await?;

    let status = query.status.unwrap_or(ContentStatus::Pending);
    let page = query.page.unwrap_or(1).max(1);
    // The pending queue drains oldest-first so the backlog is fair; decided
    // content reads newest-first.
    let order = match status {
        ContentStatus::Pending => "asc",
        _ => "desc",
    };
    // Tributes have no title; their queue shows the opening of the body.
    let title = match kind {
        ContentKind::Tribute => "left(tribute.body, 120)",
        ContentKind::Gallery => "gallery_image.title",
        ContentKind::Video => "video.title",
        ContentKind::Audio => "audio_recording.title",
    };
    let table = kind.table();

    let items: Vec<QueueItem> = sqlx::query_as(&format!(
        r#"
        select {table}.id, {title} as title, {table}.status, {table}.featured,
               {table}.created_at, account.username as submitted_by
        from {table}
          join account on {table}.account_id = account.id
        where {table}.status = $1
        order by {table}.created_at {order}
        limit $2 offset $3
        "#
    ))
    .bind(status)
    .bind(PAGE_SIZE)
    .bind((page as i64 - 1) * PAGE_SIZE)
    .fetch_all(&app_state.db_pool)
    .await
    .context("Failed to fetch moderation queue")?;

    Ok(web::Json(items))
}

#[post("/content/{kind}/{id}/{action}")]
async fn act(
    app_state: web::Data<AppState>,
    info: web::Path<(ContentKind, Uuid, ModerationAction)>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (kind, id, action) = info.into_inner();
    let (session_info, _) = app_state
        .require_role(request, Role::required_to_moderate(kind))
        .await?;

    let outcome = moderation::moderate(
        &app_state.db_pool,
        &app_state.uuid_seed,
        kind,
        id,
        action,
        session_info.account_id,
    )
    .await?;

    info!(
        "Moderation: {} {} {} -> {}",
        action.as_str(),
        kind.label(),
        id,
        outcome.status.as_str()
    );
    Ok(web::Json(outcome))
}
