/// The submission flow: pick a kind, fill the kind's form, land in the
/// moderation queue as PENDING. Everything here requires login.
use crate::routes::prelude::*;
use crate::verse;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope
        .service(choose)
        .service(preview)
        .service(submit_tribute)
        .service(form_page)
        .service(submit_media)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SubmissionKind {
    Tribute,
    Photo,
    Video,
    Audio,
}

impl SubmissionKind {
    fn segment(&self) -> &'static str {
        match self {
            SubmissionKind::Tribute => "tribute",
            SubmissionKind::Photo => "photo",
            SubmissionKind::Video => "video",
            SubmissionKind::Audio => "audio",
        }
    }
}

#[derive(Template)]
#[template(path = "submit/choose.html")]
struct ChooseTemplate<'a> {
    config: &'a AppConfig,
    logged_in: bool,
    viewer: &'a Option<Viewer>,
}

#[get("/")]
async fn choose(app_state: web::Data<AppState>, request: HttpRequest) -> Result<impl Responder> {
    let session_info = app_state.require_session(request).await?;

    Ok(ChooseTemplate {
        config: &app_state.config,
        logged_in: true,
        viewer: &session_info.viewer,
    }
    .to_response())
}

#[derive(Template)]
#[template(path = "submit/tribute.html")]
struct TributeFormTemplate<'a> {
    config: &'a AppConfig,
    logged_in: bool,
    viewer: &'a Option<Viewer>,
}

#[derive(Template)]
#[template(path = "submit/media.html")]
struct MediaFormTemplate<'a> {
    config: &'a AppConfig,
    logged_in: bool,
    viewer: &'a Option<Viewer>,
    kind: &'a str,
    heading: &'a str,
    url_label: &'a str,
}

#[get("/{kind}")]
async fn form_page(
    app_state: web::Data<AppState>,
    info: web::Path<(SubmissionKind,)>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (kind,) = info.into_inner();
    let session_info = app_state.require_session(request).await?;

    if kind == SubmissionKind::Tribute {
        return Ok(TributeFormTemplate {
            config: &app_state.config,
            logged_in: true,
            viewer: &session_info.viewer,
        }
        .to_response());
    }

    let (heading, url_label) = match kind {
        SubmissionKind::Photo => ("Share a photograph", "Image URL"),
        SubmissionKind::Video => ("Share a video", "Video URL"),
        SubmissionKind::Audio => ("Share a recording", "Audio URL"),
        SubmissionKind::Tribute => unreachable!(),
    };
    Ok(MediaFormTemplate {
        config: &app_state.config,
        logged_in: true,
        viewer: &session_info.viewer,
        kind: kind.segment(),
        heading,
        url_label,
    }
    .to_response())
}

#[derive(Template)]
#[template(source = "<pre>{{ pre_text }}</pre>", ext = "html")]
struct PreTemplate<'a> {
    pre_text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PreviewForm {
    body: String,
}

/// Live preview fragment for the tribute form. Parse errors come back as
/// text rather than an error page, since this is injected into the form.
#[post("/preview")]
async fn preview(preview_form: web::Form<PreviewForm>) -> impl Responder {
    match verse::to_html(preview_form.body.as_str()) {
        Ok(html) => html,
        Err(err) => PreTemplate {
            pre_text: format!("{}", err).as_str(),
        }
        .to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct TributeForm {
    author_name: String,
    body: String,
}

#[post("/tribute")]
async fn submit_tribute(
    app_state: web::Data<AppState>,
    form: web::Form<TributeForm>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let session_info = app_state.require_session(request).await?;

    validation::bounded("name", &form.author_name, 1, 100)?;
    validation::bounded("tribute", &form.body, 1, 4000)?;
    // Render at submission time so moderators review exactly what would be
    // published.
    let body_html = verse::to_html(&form.body)
        .map_err(|err| Error::AppError(format!("Your tribute couldn't be formatted:\n{err}")))?;

    sqlx::query(
        r#"
        insert into tribute (id, account_id, author_name, body, body_html)
        values ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::now_v6(&app_state.uuid_seed))
    .bind(session_info.account_id)
    .bind(&form.author_name)
    .bind(&form.body)
    .bind(&body_html)
    .execute(&app_state.db_pool)
    .await
    .context("Failed to store tribute")?;

    Ok(MessagePageTemplate {
        config: &app_state.config,
        logged_in: true,
        viewer: &session_info.viewer,
        page_title: &Some("Tribute received"),
        message: "Thank you. Your tribute has been received and will appear once a caretaker approves it.",
    }
    .to_response())
}

#[derive(Debug, Deserialize)]
struct MediaForm {
    title: String,
    description: String,
    url: String,
}

#[post("/{kind}")]
async fn submit_media(
    app_state: web::Data<AppState>,
    info: web::Path<(SubmissionKind,)>,
    form: web::Form<MediaForm>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (kind,) = info.into_inner();
    let session_info = app_state.require_session(request).await?;

    validation::bounded("title", &form.title, 1, 200)?;
    validation::bounded("description", &form.description, 0, 2000)?;
    validation::media_url(&form.url)?;

    let query = match kind {
        // /submit/tribute is its own handler, registered ahead of this one.
        SubmissionKind::Tribute => {
            return Err(Error::AppError(
                "Tributes go through their own form.".to_string(),
            ));
        }
        SubmissionKind::Photo => sqlx::query(
            r#"
            insert into gallery_image (id, account_id, title, caption, image_url)
            values ($1, $2, $3, $4, $5)
            "#,
        ),
        SubmissionKind::Video => sqlx::query(
            r#"
            insert into video (id, account_id, title, description, video_url)
            values ($1, $2, $3, $4, $5)
            "#,
        ),
        SubmissionKind::Audio => sqlx::query(
            r#"
            insert into audio_recording (id, account_id, title, description, audio_url)
            values ($1, $2, $3, $4, $5)
            "#,
        ),
    };

    query
        .bind(Uuid::now_v6(&app_state.uuid_seed))
        .bind(session_info.account_id)
        .bind(&form.title)
        .bind(&form.description)
        .bind(&form.url)
        .execute(&app_state.db_pool)
        .await
        .context("Failed to store submission")?;

    Ok(MessagePageTemplate {
        config: &app_state.config,
        logged_in: true,
        viewer: &session_info.viewer,
        page_title: &Some("Submission received"),
        message: "Thank you. Your submission has been received and will appear once a caretaker approves it.",
    }
    .to_response())
}
