use fred::interfaces::HashesInterface;

use crate::key;
use crate::moderation::ContentStatus;
use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(view).service(update)
}

/// Output object for the profile query.
#[derive(sqlx::FromRow, Debug, PartialEq, Eq)]
struct Profile {
    username: String,
    display_name: String,
    bio: String,
}

/// One row of the viewer's own submissions, whatever the kind.
#[derive(sqlx::FromRow, Debug)]
struct Submission {
    kind: String,
    title: String,
    status: ContentStatus,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Template)]
#[template(path = "settings/view.html")]
struct SettingsTemplate<'a> {
    config: &'a AppConfig,
    logged_in: bool,
    viewer: &'a Option<Viewer>,
    profile: &'a Profile,
    submissions: &'a Vec<Submission>,
    messages: &'a Vec<String>,
}

#[get("/")]
async fn view(app_state: web::Data<AppState>, request: HttpRequest) -> Result<impl Responder> {
    let session_info = app_state.require_session(request).await?;
    view_fn(app_state, session_info, &Vec::new()).await
}

async fn view_fn(
    app_state: web::Data<AppState>,
    session_info: SessionInfo,
    messages: &Vec<String>,
) -> Result<impl Responder> {
    let (profile, submissions): (Profile, Vec<Submission>) = try_join!(
        sqlx::query_as(
            r#"
            select username, display_name, bio
            from account
            where id = $1
            "#,
        )
        .bind(session_info.account_id)
        .fetch_one(&app_state.db_pool),
        sqlx::query_as(
            r#"
            select kind, title, status, created_at
            from (
              select 'tribute' as kind, left(body, 80) as title, status, created_at, account_id
              from tribute
              union all
              select 'photo', title, status, created_at, account_id
              from gallery_image
              union all
              select 'video', title, status, created_at, account_id
              from video
              union all
              select 'audio', title, status, created_at, account_id
              from audio_recording
            ) submissions
            where account_id = $1
            order by created_at desc
            "#,
        )
        .bind(session_info.account_id)
        .fetch_all(&app_state.db_pool)
    )
    .context("Failed to fetch profile")?;

    Ok(SettingsTemplate {
        config: &app_state.config,
        logged_in: true,
        viewer: &session_info.viewer,
        profile: &profile,
        submissions: &submissions,
        messages,
    }
    .to_response())
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum SettingsForm {
    /// Display fields change.
    Details { display_name: String, bio: String },
    /// Username change.
    Username { username: String },
}

#[post("/")]
async fn update(
    app_state: web::Data<AppState>,
    request: HttpRequest,
    form: web::Form<SettingsForm>,
) -> Result<impl Responder> {
    let mut session_info = app_state.require_session(request).await?;

    let mut messages = Vec::new();
    match form.into_inner() {
        SettingsForm::Details { display_name, bio } => {
            validation::bounded("display name", &display_name, 1, 100)?;
            validation::bounded("bio", &bio, 0, 1000)?;
            if sqlx::query(
                r#"
                update account
                set display_name = $1, bio = $2
                where id = $3
                "#,
            )
            .bind(&display_name)
            .bind(&bio)
            .bind(session_info.account_id)
            .execute(&app_state.db_pool)
            .await
            .context("Failed to update profile details")?
            .rows_affected()
                <= 0
            {
                return Err(sqlx::Error::RowNotFound).context("Failed to find account to update")?;
            }

            refresh_session_profile(&app_state, &session_info, None, Some(&display_name)).await?;
            if let Some(viewer) = session_info.viewer.as_mut() {
                viewer.display_name = display_name;
            }
            messages.push("Updated your display name and bio.".to_string());
        }
        SettingsForm::Username { username } => {
            validation::username(&username)?;
            let (taken,): (bool,) = sqlx::query_as(
                r#"
                select exists(
                  select 1
                  from account
                  where username = $1 and id <> $2
                  limit 1
                )
                "#,
            )
            .bind(&username)
            .bind(session_info.account_id)
            .fetch_one(&app_state.db_pool)
            .await
            .context("Failed to check username availability")?;
            if taken {
                return Err(Error::AppError(format!("@{username} is already taken")));
            }

            if sqlx::query(
                r#"
                update account
                set username = $1
                where id = $2
                "#,
            )
            .bind(&username)
            .bind(session_info.account_id)
            .execute(&app_state.db_pool)
            .await
            .context("Failed to update username")?
            .rows_affected()
                <= 0
            {
                return Err(sqlx::Error::RowNotFound).context("Failed to find account to update")?;
            }

            refresh_session_profile(&app_state, &session_info, Some(&username), None).await?;
            if let Some(viewer) = session_info.viewer.as_mut() {
                viewer.username = username.clone();
            }
            messages.push(format!("Changed username to @{}", username));
        }
    }

    view_fn(app_state, session_info, &messages).await
}

/// The session hash carries the profile fields used to render the header, so
/// profile edits have to touch it too.
async fn refresh_session_profile(
    app_state: &web::Data<AppState>,
    session_info: &SessionInfo,
    username: Option<&str>,
    display_name: Option<&str>,
) -> Result<()> {
    let mut fields: std::collections::HashMap<&str, String> = std::collections::HashMap::new();
    if let Some(username) = username {
        fields.insert("username", username.to_string());
    }
    if let Some(display_name) = display_name {
        fields.insert("display_name", display_name.to_string());
    }
    let _: () = app_state
        .redis_pool
        .hset(key::session(session_info.session_id.as_str()), fields)
        .await
        .context("Failed to refresh session profile info")?;
    Ok(())
}
