use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(form_page).service(submit)
}

#[derive(Template)]
#[template(path = "contact.html")]
struct ContactTemplate<'a> {
    config: &'a AppConfig,
    logged_in: bool,
    viewer: &'a Option<Viewer>,
}

#[get("/")]
async fn form_page(app_state: web::Data<AppState>, request: HttpRequest) -> Result<impl Responder> {
    let session_info = app_state.get_session(request).await.transpose()?;

    Ok(ContactTemplate {
        config: &app_state.config,
        logged_in: session_info.is_some(),
        viewer: &session_info.and_then(|x| x.viewer),
    }
    .to_response())
}

#[derive(Debug, Deserialize)]
struct ContactForm {
    name: String,
    email: String,
    subject: String,
    body: String,
}

#[post("/")]
async fn submit(
    app_state: web::Data<AppState>,
    form: web::Form<ContactForm>,
    request: HttpRequest,
) -> Result<impl Responder> {
    // Works logged out; the session only dresses the confirmation page.
    let session_info = app_state.get_session(request).await.transpose()?;

    validation::bounded("name", &form.name, 1, 100)?;
    validation::email(&form.email)?;
    validation::bounded("subject", &form.subject, 1, 200)?;
    validation::bounded("message", &form.body, 1, 4000)?;

    sqlx::query(
        r#"
        insert into contact_message (id, name, email, subject, body)
        values ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::now_v6(&app_state.uuid_seed))
    .bind(&form.name)
    .bind(&form.email)
    .bind(&form.subject)
    .bind(&form.body)
    .execute(&app_state.db_pool)
    .await
    .context("Failed to store contact message")?;

    Ok(MessagePageTemplate {
        config: &app_state.config,
        logged_in: session_info.is_some(),
        viewer: &session_info.and_then(|x| x.viewer),
        page_title: &Some("Message sent"),
        message: "Thank you. Your message has been passed on to the archive's caretakers.",
    }
    .to_response())
}
