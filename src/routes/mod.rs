pub mod admin;
pub mod api;
pub mod auth;
pub mod contact;
pub mod gallery;
pub mod home;
pub mod media;
pub mod prelude;
pub mod settings;
pub mod submit;
pub mod tributes;
