/// The poet's recordings: readings on the audio page, filmed appearances on
/// the video page. Both lists are published-only; the rows arrive through the
/// same submission and moderation pipeline as everything else.
use crate::routes::prelude::*;

/// Output object shared by the audio and video list queries.
#[derive(sqlx::FromRow, Debug)]
struct Recording {
    title: String,
    description: String,
    media_url: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Template)]
#[template(path = "audio.html")]
struct AudioTemplate<'a> {
    config: &'a AppConfig,
    logged_in: bool,
    viewer: &'a Option<Viewer>,
    recordings: &'a Vec<Recording>,
}

#[get("/audio")]
pub async fn audio(app_state: web::Data<AppState>, request: HttpRequest) -> Result<impl Responder> {
    let session_info = app_state.get_session(request).await.transpose()?;

    let recordings: Vec<Recording> = sqlx::query_as(
        r#"
        select title, description, audio_url as media_url, created_at
        from audio_recording
        where status = 'published'::content_status
        order by created_at desc
        "#,
    )
    .fetch_all(&app_state.db_pool)
    .await
    .context("Failed to fetch recordings")?;

    Ok(AudioTemplate {
        config: &app_state.config,
        logged_in: session_info.is_some(),
        viewer: &session_info.and_then(|x| x.viewer),
        recordings: &recordings,
    }
    .to_response())
}

#[derive(Template)]
#[template(path = "video.html")]
struct VideoTemplate<'a> {
    config: &'a AppConfig,
    logged_in: bool,
    viewer: &'a Option<Viewer>,
    videos: &'a Vec<Recording>,
}

#[get("/video")]
pub async fn video_page(app_state: web::Data<AppState>, request: HttpRequest) -> Result<impl Responder> {
    let session_info = app_state.get_session(request).await.transpose()?;

    let videos: Vec<Recording> = sqlx::query_as(
        r#"
        select title, description, video_url as media_url, created_at
        from video
        where status = 'published'::content_status
        order by featured desc, created_at desc
        "#,
    )
    .fetch_all(&app_state.db_pool)
    .await
    .context("Failed to fetch videos")?;

    Ok(VideoTemplate {
        config: &app_state.config,
        logged_in: session_info.is_some(),
        viewer: &session_info.and_then(|x| x.viewer),
        videos: &videos,
    }
    .to_response())
}
