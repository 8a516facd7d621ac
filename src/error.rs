use std::backtrace::Backtrace;
use std::fmt::Display;

/// Error handling code, specifically for actix-web. Without this, we won't be
/// able to use '?' to return errors and will have to construct responses for
/// all of them manually. Some general info on error handling in actix-web can
/// be found at:
/// https://woile.github.io/actix-website/docs/errors/
use actix_web::{
    cookie::Cookie,
    error,
    http::{header::ContentType, StatusCode},
    middleware::ErrorHandlerResponse,
    HttpResponse,
};
use askama::Template;

use crate::app_state::SESSION_ID_COOKIE;

/// Common errors that can be unwrapped in handlers.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // We can't use #[error] because of special handling for InternalError.
    InternalError(#[from] anyhow::Error),
    /// The visitor isn't (validly) logged in. Responding also clears the
    /// session cookie so a corrupted session doesn't loop forever.
    AuthenticationError(String),
    /// Logged in, but not allowed to do that.
    AuthorizationError(String),
    /// The row doesn't exist, or the viewer isn't allowed to know it does.
    NotFoundError(String),
    /// Someone else changed the row first.
    ConflictError(String),
    AppError(String),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InternalError(err) => {
                // Internal details don't belong in production responses:
                // https://owasp.org/www-community/Improper_Error_Handling
                if cfg!(debug_assertions) {
                    write!(f, "Internal error: {:?}", err)
                } else {
                    write!(f, "An internal error occurred.")
                }
            }
            Error::AuthenticationError(err)
            | Error::AuthorizationError(err)
            | Error::NotFoundError(err)
            | Error::ConflictError(err)
            | Error::AppError(err) => write!(f, "{err}"),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub backtrace: &'a Backtrace,
    pub status: &'a StatusCode,
    pub message: &'a String,
}

impl error::ResponseError for Error {
    fn error_response(&self) -> HttpResponse {
        let disabled = Backtrace::disabled();
        let backtrace: &Backtrace = match self {
            Error::InternalError(err) => err.backtrace(),
            _ => &disabled,
        };
        let status_code = self.status_code();
        let mut response = HttpResponse::build(status_code)
            .content_type(ContentType::html())
            .body(
                ErrorTemplate {
                    backtrace,
                    status: &status_code,
                    message: &self.to_string(),
                }
                .to_string(),
            );

        if matches!(self, Error::AuthenticationError(_)) {
            let mut cookie = Cookie::new(SESSION_ID_COOKIE, "");
            cookie.set_path("/");
            if let Err(err) = response.add_removal_cookie(&cookie) {
                log::warn!("Ignored error clearing session cookie: {err}");
            }
        }

        response
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Error::AuthorizationError(_) => StatusCode::FORBIDDEN,
            Error::NotFoundError(_) => StatusCode::NOT_FOUND,
            Error::ConflictError(_) => StatusCode::CONFLICT,
            Error::AppError(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Magic function to serve a custom 404 page.
pub fn custom_404<B>(
    res: actix_web::dev::ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    // Decompose the existing response, override the body, and reconstruct it.
    let (req, res) = res.into_parts();
    let res = res.set_body(
        ErrorTemplate {
            backtrace: &Backtrace::disabled(),
            status: &StatusCode::NOT_FOUND,
            message: &format!("The page \"{}\" doesn't exist.", req.path()),
        }
        .to_string(),
    );

    let res = actix_web::dev::ServiceResponse::new(req, res)
        .map_into_boxed_body()
        .map_into_right_body();

    Ok(ErrorHandlerResponse::Response(res))
}
