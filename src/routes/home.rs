use crate::routes::prelude::*;

/// Output object for the tribute cards on the landing page.
#[derive(sqlx::FromRow, Debug)]
pub struct TributeCard {
    pub id: Uuid,
    pub author_name: String,
    pub body_html: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    config: &'a AppConfig,
    logged_in: bool,
    viewer: &'a Option<Viewer>,
    featured: &'a Vec<TributeCard>,
    recent: &'a Vec<TributeCard>,
    following: bool,
}

#[get("/")]
pub async fn index(app_state: web::Data<AppState>, request: HttpRequest) -> Result<impl Responder> {
    let session_info = app_state.get_session(request).await.transpose()?;

    let (featured, recent): (Vec<TributeCard>, Vec<TributeCard>) = try_join!(
        sqlx::query_as(
            r#"
            select id, author_name, body_html, created_at
            from tribute
            where status = 'published'::content_status and featured
            order by created_at desc
            limit 3
            "#,
        )
        .fetch_all(&app_state.db_pool),
        sqlx::query_as(
            r#"
            select id, author_name, body_html, created_at
            from tribute
            where status = 'published'::content_status
            order by created_at desc
            limit 6
            "#,
        )
        .fetch_all(&app_state.db_pool)
    )
    .context("Failed to fetch tributes for the landing page")?;

    let following = match &session_info {
        Some(session_info) => {
            sqlx::query_as::<_, (bool,)>(
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
            .context("Failed to check follow state")?
            .0
        }
        None => false,
    };

    Ok(IndexTemplate {
        config: &app_state.config,
        logged_in: session_info.is_some(),
        viewer: &session_info.and_then(|x| x.viewer),
        featured: &featured,
        recent: &recent,
        following,
    }
    .to_response())
}

#[derive(Template)]
#[template(path = "biography.html")]
struct BiographyTemplate<'a> {
    config: &'a AppConfig,
    logged_in: bool,
    viewer: &'a Option<Viewer>,
}

#[get("/biography")]
pub async fn biography(
    app_state: web::Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let session_info = app_state.get_session(request).await.transpose()?;

    Ok(BiographyTemplate {
        config: &app_state.config,
        logged_in: session_info.is_some(),
        viewer: &session_info.and_then(|x| x.viewer),
    }
    .to_response())
}
