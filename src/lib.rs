#[macro_use]
extern crate rocket;

use rocket::fairing::AdHoc;
use rocket::fs::{FileServer, relative};
use rocket::Build;
use rocket_dyn_templates::Template;

pub mod auth_utils;
pub mod config;
pub mod controllers;
pub mod csrf;
pub mod db;
pub mod entities;
pub mod errors;
pub mod fairings;
pub mod guards;
pub mod services;
pub mod session;
pub mod validation;
pub mod views;

use crate::config::Settings;
use crate::fairings::context::ContextFairing;

/// Rocketインスタンスを構築する関数。
/// 設定は環境変数 (.env を含む) から読み込みます。
pub fn build_rocket() -> rocket::Rocket<Build> {
    // .envファイルを読み込む (環境変数の読み込み)
    dotenvy::dotenv().ok();
    build_rocket_with(Settings::from_env())
}

/// 設定を明示して Rocket インスタンスを構築します。
/// テスト時はインメモリDBの設定を渡して利用します。
pub fn build_rocket_with(settings: Settings) -> rocket::Rocket<Build> {
    if settings.uses_default_secret() {
        tracing::warn!("SECRET_KEY is not set, using the development default");
    }

    // private cookie の鍵は SECRET_KEY から導出する
    let figment = rocket::Config::figment().merge(("secret_key", settings.rocket_secret_key()));

    rocket::custom(figment)
        .manage(settings)
        // DB接続とマイグレーションは起動 (ignite) 時に行う
        .attach(AdHoc::try_on_ignite("Database", |rocket| async move {
            let db_url = match rocket.state::<Settings>() {
                Some(settings) => settings.database_url.clone(),
                None => return Err(rocket),
            };
            match db::init_db(&db_url).await {
                Ok(db) => Ok(rocket.manage(db)),
                Err(e) => {
                    tracing::error!(error = %e, "failed to initialize database");
                    Err(rocket)
                }
            }
        }))
        .attach(Template::fairing())
        .attach(ContextFairing)
        .mount("/", routes![
            controllers::home::index,
            controllers::auth::register_form,
            controllers::auth::register,
            controllers::auth::login_form,
            controllers::auth::login,
            controllers::auth::logout,
            controllers::todo::list_todos,
            controllers::todo::add_todo_form,
            controllers::todo::add_todo,
            controllers::todo::edit_todo_form,
            controllers::todo::edit_todo,
            controllers::todo::delete_todo,
            controllers::todo::update_status,
        ])
        .mount("/static", FileServer::from(relative!("static")))
        .register("/", catchers![controllers::auth::unauthorized])
}
