/// The back office. Everything under /admin speaks JSON and is role-gated
/// per handler; the public site never links here.
pub mod audit;
pub mod content;
pub mod messages;
pub mod users;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    let scope = content::add_routes(scope);
    let scope = audit::add_routes(scope);
    let scope = messages::add_routes(scope);
    users::add_routes(scope)
}
