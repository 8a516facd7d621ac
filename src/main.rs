use actix_web::http::StatusCode;
use actix_web::middleware::ErrorHandlers;
use actix_web::{get, middleware, web, App, HttpResponse, HttpServer, Responder};
use concat_arrays::concat_arrays;
use env_logger::Env;
use fred::interfaces::ClientLike;
use fred::types::{Builder, RedisConfig};
use log::info;

use crate::app_state::{AppConfig, AppState, CompiledRegexes};

mod app_state;
mod error;
mod key;
mod moderation;
mod oauth;
mod partials;
mod roles;
mod routes;
pub mod validation;
mod verse;

#[get("/assets/style.css")]
async fn stylesheet() -> impl Responder {
    HttpResponse::Ok()
        .content_type(mime::TEXT_CSS.as_ref())
        .body(include_str!("../assets/style.css"))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config: AppConfig = app_state::config_with_defaults()?
        .add_source(config::Environment::default())
        .build()?
        .try_deserialize()?;

    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url.as_str())
        .await?;

    let redis_pool =
        Builder::from_config(RedisConfig::from_url(config.redis_url.as_str())?).build_pool(4)?;
    redis_pool.init().await?;

    let uuid_seed = concat_arrays!(std::process::id().to_ne_bytes(), [0; 2]);

    let oauth_client = oauth::oauth_client(&config);

    let regex = CompiledRegexes {
        alphanumeric: regex::Regex::new("^[0-9A-Za-z]+$")?,
        oauth_state_ok: regex::Regex::new("^[-_.0-9A-Za-z]+$")?,
    };

    let port = config.port;
    let app_state = AppState {
        config,
        db_pool,
        redis_pool,
        oauth_client,
        regex,
        uuid_seed,
    };

    info!("Listening on port {port}");
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Compress::default())
            .app_data(web::Data::new(app_state.clone()))
            .service(stylesheet)
            .service(routes::home::index)
            .service(routes::home::biography)
            .service(routes::media::audio)
            .service(routes::media::video_page)
            .service(routes::auth::add_routes(web::scope("/auth")))
            .service(routes::tributes::add_routes(web::scope("/tributes")))
            .service(routes::gallery::add_routes(web::scope("/gallery")))
            .service(routes::contact::add_routes(web::scope("/contact")))
            .service(routes::submit::add_routes(web::scope("/submit")))
            .service(routes::settings::add_routes(web::scope("/settings")))
            .service(routes::api::add_routes(web::scope("/api")))
            .service(routes::admin::add_routes(web::scope("/admin")))
            .wrap(middleware::Logger::default())
            .wrap(ErrorHandlers::new().handler(StatusCode::NOT_FOUND, error::custom_404))
    })
    .bind(("127.0.0.1", port))?
    .run()
    .await?;

    Ok(())
}
