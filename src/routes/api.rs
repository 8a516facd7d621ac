/// Small JSON endpoints for in-page toggles.
use serde::Serialize;

use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(follow_state).service(follow_toggle)
}

#[derive(Serialize, Debug)]
struct FollowState {
    following: bool,
}

#[get("/follow")]
async fn follow_state(
    app_state: web::Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let session_info = app_state.require_session(request).await?;

    let (following,): (bool,) = sqlx::query_as(
        r#"
        select exists(
          select 1
          from follower
          where account_id = $1
        )
        "#,
    )
    .bind(session_info.account_id)
    .fetch_one(&app_state.db_pool)
    .await
    .context("Failed to check follow state")?;

    Ok(web::Json(FollowState { following }))
}

/// Idempotent toggle: inserting an existing row deletes it instead. The
/// client applies the flip optimistically and reconciles with whatever this
/// returns.
#[post("/follow")]
async fn follow_toggle(
    app_state: web::Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let session_info = app_state.require_session(request).await?;

    let inserted = sqlx::query(
        r#"
        insert into follower (account_id)
        values ($1)
        on conflict (account_id) do nothing
        "#,
    )
    .bind(session_info.account_id)
    .execute(&app_state.db_pool)
    .await
    .context("Failed to record follow")?;

    let following = if inserted.rows_affected() > 0 {
        true
    } else {
        sqlx::query(
            r#"
            delete from follower
            where account_id = $1
            "#,
        )
        .bind(session_info.account_id)
        .execute(&app_state.db_pool)
        .await
        .context("Failed to remove follow")?;
        false
    };

    Ok(web::Json(FollowState { following }))
}
