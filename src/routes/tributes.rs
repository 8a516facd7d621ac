use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(list).service(view)
}

const PAGE_SIZE: i64 = 20;

/// Output object for the tribute wall query.
#[derive(sqlx::FromRow, Debug)]
struct TributeListing {
    id: Uuid,
    author_name: String,
    body_html: String,
    featured: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u32>,
}

#[derive(Template)]
#[template(path = "tributes/list.html")]
struct TributeListTemplate<'a> {
    config: &'a AppConfig,
    logged_in: bool,
    viewer: &'a Option<Viewer>,
    tributes: &'a Vec<TributeListing>,
    page: u32,
    has_more: bool,
}

#[get("/")]
async fn list(
    app_state: web::Data<AppState>,
    query: web::Query<PageQuery>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let session_info = app_state.get_session(request).await.transpose()?;
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page as i64 - 1) * PAGE_SIZE;

    // Fetch one extra row to know whether a next page exists.
    let mut tributes: Vec<TributeListing> = sqlx::query_as(
        r#"
        select id, author_name, body_html, featured, created_at
        from tribute
        where status = 'published'::content_status
        order by created_at desc
        limit $1 offset $2
        "#,
    )
    .bind(PAGE_SIZE + 1)
    .bind(offset)
    .fetch_all(&app_state.db_pool)
    .await
    .context("Failed to fetch tributes")?;

    let has_more = tributes.len() > PAGE_SIZE as usize;
    tributes.truncate(PAGE_SIZE as usize);

    Ok(TributeListTemplate {
        config: &app_state.config,
        logged_in: session_info.is_some(),
        viewer: &session_info.and_then(|x| x.viewer),
        tributes: &tributes,
        page,
        has_more,
    }
    .to_response())
}

#[derive(Template)]
#[template(path = "tributes/view.html")]
struct TributeViewTemplate<'a> {
    config: &'a AppConfig,
    logged_in: bool,
    viewer: &'a Option<Viewer>,
    tribute: &'a TributeListing,
}

#[get("/{id}")]
async fn view(
    app_state: web::Data<AppState>,
    info: web::Path<(Uuid,)>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (id,) = info.into_inner();
    let session_info = app_state.get_session(request).await.transpose()?;

    // Unpublished tributes 404 rather than 403: their existence isn't public.
    let tribute: TributeListing = sqlx::query_as(
        r#"
        select id, author_name, body_html, featured, created_at
        from tribute
        where id = $1 and status = 'published'::content_status
        "#,
    )
    .bind(id)
    .fetch_optional(&app_state.db_pool)
    .await
    .context("Failed to fetch tribute")?
    .ok_or_else(|| Error::NotFoundError("That tribute doesn't exist.".to_string()))?;

    Ok(TributeViewTemplate {
        config: &app_state.config,
        logged_in: session_info.is_some(),
        viewer: &session_info.and_then(|x| x.viewer),
        tribute: &tribute,
    }
    .to_response())
}
