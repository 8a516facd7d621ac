use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(list)
}

/// Output object for the gallery query.
#[derive(sqlx::FromRow, Debug)]
struct GalleryItem {
    title: String,
    caption: String,
    image_url: String,
    featured: bool,
}

#[derive(Template)]
#[template(path = "gallery.html")]
struct GalleryTemplate<'a> {
    config: &'a AppConfig,
    logged_in: bool,
    viewer: &'a Option<Viewer>,
    images: &'a Vec<GalleryItem>,
}

#[get("/")]
async fn list(app_state: web::Data<AppState>, request: HttpRequest) -> Result<impl Responder> {
    let session_info = app_state.get_session(request).await.transpose()?;

    let images: Vec<GalleryItem> = sqlx::query_as(
        r#"
        select title, caption, image_url, featured
        from gallery_image
        where status = 'published'::content_status
        order by featured desc, created_at desc
        "#,
    )
    .fetch_all(&app_state.db_pool)
    .await
    .context("Failed to fetch gallery")?;

    Ok(GalleryTemplate {
        config: &app_state.config,
        logged_in: session_info.is_some(),
        viewer: &session_info.and_then(|x| x.viewer),
        images: &images,
    }
    .to_response())
}
