use actix_web::delete;
use serde::Serialize;

use crate::roles::Role;
use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope
        .service(inbox)
        .service(mark_read)
        .service(mark_unread)
        .service(remove)
}

const PAGE_SIZE: i64 = 50;

#[derive(Debug, Deserialize)]
struct InboxQuery {
    unread: Option<bool>,
    page: Option<u32>,
}

#[derive(sqlx::FromRow, Serialize, Debug)]
struct ContactMessage {
    id: Uuid,
    name: String,
    email: String,
    subject: String,
    body: String,
    read: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[get("/messages")]
async fn inbox(
    app_state: web::Data<AppState>,
    query: web::Query<InboxQuery>,
    request: HttpRequest,
) -> Result<impl Responder> {
    app_state.require_role(request, Role::Manager).await?;

    let page = query.page.unwrap_or(1).max(1);
    let messages: Vec<ContactMessage> = sqlx::query_as(
        r#"
        select id, name, email, subject, body, read, created_at
        from contact_message
        where ($1::boolean is null or read <> $1)
        order by created_at desc
        limit $2 offset $3
        "#,
    )
    .bind(query.unread)
    .bind(PAGE_SIZE)
    .bind((page as i64 - 1) * PAGE_SIZE)
    .fetch_all(&app_state.db_pool)
    .await
    .context("Failed to fetch contact messages")?;

    Ok(web::Json(messages))
}

#[derive(Serialize, Debug)]
struct ReadState {
    id: Uuid,
    read: bool,
}

async fn mark(app_state: &AppState, id: Uuid, read: bool) -> Result<ReadState> {
    if sqlx::query(
        r#"
        update contact_message
        set read = $1
        where id = $2
        "#,
    )
    .bind(read)
    .bind(id)
    .execute(&app_state.db_pool)
    .await
    .context("Failed to update message read state")?
    .rows_affected()
        <= 0
    {
        return Err(Error::AppError("No such message.".to_string()));
    }
    Ok(ReadState { id, read })
}

#[post("/messages/{id}/read")]
async fn mark_read(
    app_state: web::Data<AppState>,
    info: web::Path<(Uuid,)>,
    request: HttpRequest,
) -> Result<impl Responder> {
    app_state.require_role(request, Role::Manager).await?;
    let (id,) = info.into_inner();
    Ok(web::Json(mark(&app_state, id, true).await?))
}

#[post("/messages/{id}/unread")]
async fn mark_unread(
    app_state: web::Data<AppState>,
    info: web::Path<(Uuid,)>,
    request: HttpRequest,
) -> Result<impl Responder> {
    app_state.require_role(request, Role::Manager).await?;
    let (id,) = info.into_inner();
    Ok(web::Json(mark(&app_state, id, false).await?))
}

#[delete("/messages/{id}")]
async fn remove(
    app_state: web::Data<AppState>,
    info: web::Path<(Uuid,)>,
    request: HttpRequest,
) -> Result<impl Responder> {
    app_state.require_role(request, Role::Manager).await?;
    let (id,) = info.into_inner();

    if sqlx::query(
        r#"
        delete from contact_message
        where id = $1
        "#,
    )
    .bind(id)
    .execute(&app_state.db_pool)
    .await
    .context("Failed to delete message")?
    .rows_affected()
        <= 0
    {
        return Err(Error::AppError("No such message.".to_string()));
    }

    Ok(HttpResponse::NoContent().finish())
}
