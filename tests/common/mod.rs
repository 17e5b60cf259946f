#![allow(dead_code)]

use rocket::http::{ContentType, Status};
use rocket::local::blocking::{Client, LocalResponse};
use sea_orm::DatabaseConnection;

use todo_tracker::build_rocket_with;
use todo_tracker::config::Settings;
use todo_tracker::csrf::CSRF_COOKIE;
use todo_tracker::db::init_db;
use todo_tracker::entities::user;
use todo_tracker::services::user_service::UserService;

pub const PASSWORD: &str = "secret123";

/// テスト用の設定。DBはテストごとに独立したインメモリSQLiteです。
pub fn test_settings() -> Settings {
    Settings {
        secret_key: "integration-test-secret-key".to_string(),
        database_url: "sqlite::memory:".to_string(),
        session_ttl_hours: 1,
    }
}

/// HTTPレベルのテスト用クライアント。Cookie は自動で引き継がれます。
pub fn setup() -> Client {
    Client::tracked(build_rocket_with(test_settings())).expect("valid rocket instance")
}

/// サービスレベルのテスト用DB (マイグレーション適用済み)
pub async fn setup_db() -> DatabaseConnection {
    init_db("sqlite::memory:").await.expect("in-memory database")
}

pub async fn create_user(db: &DatabaseConnection, username: &str) -> user::Model {
    UserService::register(db, username, &format!("{}@example.com", username), PASSWORD)
        .await
        .expect("user registration")
}

/// GET して CSRF クッキーを発行させ、その値を返します。
pub fn csrf_token(client: &Client, path: &str) -> String {
    let response = client.get(path).dispatch();
    assert_eq!(response.status(), Status::Ok);
    client
        .cookies()
        .get(CSRF_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .expect("csrf cookie")
}

pub fn post_form<'c>(client: &'c Client, path: &str, body: String) -> LocalResponse<'c> {
    client
        .post(path.to_string())
        .header(ContentType::Form)
        .body(body)
        .dispatch()
}

pub fn register(client: &Client, username: &str) {
    let token = csrf_token(client, "/register");
    let body = format!(
        "username={u}&email={u}%40example.com&password={p}&confirm_password={p}&csrf_token={t}",
        u = username,
        p = PASSWORD,
        t = token
    );
    let response = post_form(client, "/register", body);
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(response.headers().get_one("Location"), Some("/login"));
}

pub fn login(client: &Client, username: &str) {
    let token = csrf_token(client, "/login");
    let body = format!("email={}%40example.com&password={}&csrf_token={}", username, PASSWORD, token);
    let response = post_form(client, "/login", body);
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(response.headers().get_one("Location"), Some("/todos"));
}

pub fn register_and_login(client: &Client, username: &str) {
    register(client, username);
    login(client, username);
}

pub fn add_todo(client: &Client, title: &str, status: &str) {
    let token = csrf_token(client, "/todo/add");
    let body = format!("title={}&description=&status={}&csrf_token={}", title, status, token);
    let response = post_form(client, "/todo/add", body);
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(response.headers().get_one("Location"), Some("/todos"));
}
