use rocket::response::Redirect;

use crate::controllers::{LISTING_URL, LOGIN_URL};
use crate::guards::auth::CurrentUser;

/// トップページ。ログイン状態に応じて一覧かログイン画面へ振り分けます。
#[get("/")]
pub fn index(current: CurrentUser) -> Redirect {
    if current.is_authenticated() {
        Redirect::to(LISTING_URL)
    } else {
        Redirect::to(LOGIN_URL)
    }
}
