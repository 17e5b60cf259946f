use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// インメモリDBの接続を事実上作り直さないための寿命 (100年)。
/// sea-orm では `None` を渡せず、未設定だと sqlx の既定値で接続が回収される。
const IN_MEMORY_CONN_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 100);

/// 接続プールの設定
pub fn connect_options(db_url: &str) -> ConnectOptions {
    let mut options = ConnectOptions::new(db_url.to_owned());
    options.sqlx_logging(false);

    // インメモリSQLiteは接続ごとに別DBになり、接続を閉じると中身も消える。
    // プールを1本に絞り、アイドル回収と寿命による再接続も起こさない
    if is_in_memory_sqlite(db_url) {
        options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(IN_MEMORY_CONN_LIFETIME)
            .max_lifetime(IN_MEMORY_CONN_LIFETIME);
    }

    options
}

/// データベース接続をセットアップします。
/// Djangoでは `settings.py` の `DATABASES` 設定に相当します。
pub async fn set_up_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    // Database::connect は接続プールを自動的に作成します。
    let db = Database::connect(connect_options(db_url)).await?;
    tracing::info!("connected to database");

    Ok(db)
}

/// 接続してマイグレーションを適用します。
/// Djangoの `migrate` コマンドを起動時に自動実行するのに相当します。
pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = set_up_db(db_url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

fn is_in_memory_sqlite(db_url: &str) -> bool {
    db_url.starts_with("sqlite") && (db_url.contains(":memory:") || db_url.contains("mode=memory"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_detection() {
        assert!(is_in_memory_sqlite("sqlite::memory:"));
        assert!(is_in_memory_sqlite("sqlite://file:todo?mode=memory&cache=shared"));
        assert!(!is_in_memory_sqlite("sqlite://todo.db?mode=rwc"));
        assert!(!is_in_memory_sqlite("postgres://localhost/todo"));
    }

    #[test]
    fn test_in_memory_connection_is_never_recycled() {
        let options = connect_options("sqlite::memory:");
        assert_eq!(options.get_max_connections(), Some(1));
        assert_eq!(options.get_min_connections(), Some(1));
        assert_eq!(options.get_idle_timeout(), Some(IN_MEMORY_CONN_LIFETIME));
        assert_eq!(options.get_max_lifetime(), Some(IN_MEMORY_CONN_LIFETIME));

        // ファイルDBは sqlx の既定値のまま
        let options = connect_options("sqlite://todo.db?mode=rwc");
        assert_eq!(options.get_max_connections(), None);
        assert_eq!(options.get_idle_timeout(), None);
        assert_eq!(options.get_max_lifetime(), None);
    }
}
