//! Cookie service: set and clear the httpOnly session cookies.
//!
//! Both cookies are `Secure` with `SameSite=None` so a separately hosted
//! frontend can send them cross-site.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use khata_core::auth::session::SessionSettings;
use khata_core::models::auth::TokenPair;
use time::Duration;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "access_token";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

fn build(name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Access token cookie living `ttl_minutes`.
pub fn access_cookie(token: &str, ttl_minutes: i64) -> Cookie<'static> {
    build(ACCESS_COOKIE, token.to_string(), Duration::minutes(ttl_minutes))
}

/// Refresh token cookie living `ttl_minutes`.
pub fn refresh_cookie(token: &str, ttl_minutes: i64) -> Cookie<'static> {
    build(REFRESH_COOKIE, token.to_string(), Duration::minutes(ttl_minutes))
}

/// Add both cookies for a freshly issued pair.
pub fn set_session(jar: CookieJar, pair: &TokenPair, settings: &SessionSettings) -> CookieJar {
    jar.add(access_cookie(&pair.access_token, settings.access_ttl_minutes))
        .add(refresh_cookie(&pair.refresh_token, settings.refresh_ttl_minutes))
}

/// Overwrite both cookies with expired blanks.
pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.add(build(ACCESS_COOKIE, String::new(), Duration::ZERO))
        .add(build(REFRESH_COOKIE, String::new(), Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_cookie_attributes() {
        let c = access_cookie("abc", 30);
        assert_eq!(c.name(), "access_token");
        assert_eq!(c.value(), "abc");
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.secure(), Some(true));
        assert_eq!(c.same_site(), Some(SameSite::None));
        assert_eq!(c.max_age(), Some(Duration::seconds(30 * 60)));
    }

    #[test]
    fn refresh_cookie_max_age_follows_ttl() {
        let c = refresh_cookie("r", 43_200);
        assert_eq!(c.name(), "refresh_token");
        assert_eq!(c.max_age(), Some(Duration::seconds(43_200 * 60)));
    }

    #[test]
    fn clearing_expires_both() {
        let jar = clear_session(CookieJar::new());
        for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
            let c = jar.get(name).unwrap();
            assert_eq!(c.value(), "");
            assert_eq!(c.max_age(), Some(Duration::ZERO));
        }
    }
}
