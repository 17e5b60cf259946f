use tracing_subscriber::EnvFilter;

/// アプリケーションのメインエントリーポイント。
/// Djangoの `manage.py runserver` 実行時の動きに相当します。
#[rocket::launch]
fn rocket() -> _ {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    todo_tracker::build_rocket()
}
