use serde::Serialize;

use crate::roles::Role;
use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(list).service(change_role)
}

const PAGE_SIZE: i64 = 50;

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u32>,
}

#[derive(sqlx::FromRow, Serialize, Debug)]
struct AccountListing {
    id: Uuid,
    username: String,
    display_name: String,
    email: String,
    role: Role,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[get("/users")]
async fn list(
    app_state: web::Data<AppState>,
    query: web::Query<PageQuery>,
    request: HttpRequest,
) -> Result<impl Responder> {
    app_state.require_role(request, Role::Admin).await?;

    let page = query.page.unwrap_or(1).max(1);
    let accounts: Vec<AccountListing> = sqlx::query_as(
        r#"
        select id, username, display_name, email, role, created_at
        from account
        order by created_at desc
        limit $1 offset $2
        "#,
    )
    .bind(PAGE_SIZE)
    .bind((page as i64 - 1) * PAGE_SIZE)
    .fetch_all(&app_state.db_pool)
    .await
    .context("Failed to fetch accounts")?;

    Ok(web::Json(accounts))
}

#[derive(Debug, Deserialize)]
struct RoleChange {
    role: Role,
}

#[derive(Serialize, Debug)]
struct RoleState {
    id: Uuid,
    role: Role,
}

#[post("/users/{id}/role")]
async fn change_role(
    app_state: web::Data<AppState>,
    info: web::Path<(Uuid,)>,
    body: web::Json<RoleChange>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (session_info, actor_role) = app_state.require_role(request, Role::Admin).await?;
    let (target_id,) = info.into_inner();
    let new_role = body.into_inner().role;

    if target_id == session_info.account_id {
        return Err(Error::AppError(
            "You cannot change your own role.".to_string(),
        ));
    }

    let current = match sqlx::query_as::<_, (Role,)>(
        r#"
        select role
        from account
        where id = $1
        limit 1
        "#,
    )
    .bind(target_id)
    .fetch_optional(&app_state.db_pool)
    .await
    .context("Failed to look up target account")?
    {
        Some((role,)) => role,
        None => return Err(Error::AppError("No such account.".to_string())),
    };

    if !actor_role.can_assign(current, new_role) {
        return Err(Error::AuthorizationError(
            "You cannot assign that role.".to_string(),
        ));
    }

    // Conditioned on the role we just read, same as content moderation: a
    // concurrent change surfaces as a conflict instead of a silent overwrite.
    if sqlx::query(
        r#"
        update account
        set role = $1
        where id = $2 and role = $3
        "#,
    )
    .bind(new_role)
    .bind(target_id)
    .bind(current)
    .execute(&app_state.db_pool)
    .await
    .context("Failed to update role")?
    .rows_affected()
        <= 0
    {
        return Err(Error::ConflictError(
            "That account's role just changed. Reload and try again.".to_string(),
        ));
    }

    info!(
        "Role change: {} set {:?} on account {}",
        session_info.account_id, new_role, target_id
    );
    Ok(web::Json(RoleState {
        id: target_id,
        role: new_role,
    }))
}
