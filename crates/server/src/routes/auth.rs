use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Extension,
};
use axum_extra::extract::{cookie::{Cookie, CookieJar, SameSite}, Form, Query};
use minijinja::context;
use serde::Deserialize;
use tracing::warn;

use service::auth::{domain::LoginInput, errors::AuthError, service::verify_token};
use service::permissions::{load_principal, CurrentUser, Principal};

use crate::errors::ViewError;
use crate::routes::helpers::{base_ctx, render};
use crate::state::ServerState;

pub const AUTH_COOKIE: &str = "auth_token";
const DEFAULT_NEXT: &str = "/tenancy/tenants/";

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: String,
}

/// Only same-site paths are followed after login. Browsers read `\` as `/`,
/// so backslashes and control characters are refused outright.
fn safe_next(next: &str) -> &str {
    let local = next.starts_with('/') && !next.starts_with("//");
    let clean = !next.chars().any(|c| c == '\\' || c.is_control());
    if local && clean { next } else { DEFAULT_NEXT }
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::from(AUTH_COOKIE);
    cookie.set_path("/");
    cookie
}

pub async fn login_page(Extension(user): Extension<CurrentUser>, Query(q): Query<LoginQuery>) -> Result<Html<String>, ViewError> {
    render("login.html", context! { next => q.next, username => "", error => "", ..base_ctx(&user) })
}

pub async fn login(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ViewError> {
    let input = LoginInput { username: form.username.trim().to_string(), password: form.password.clone() };
    match state.auth_service().login(input).await {
        Ok(session) => {
            let mut cookie = Cookie::new(AUTH_COOKIE, session.token);
            cookie.set_path("/");
            cookie.set_http_only(true);
            cookie.set_secure(false);
            cookie.set_same_site(SameSite::Lax);
            Ok((jar.add(cookie), Redirect::to(safe_next(&form.next))).into_response())
        }
        Err(AuthError::Unauthorized) | Err(AuthError::Validation(_)) => {
            warn!(username = %form.username, "login failed");
            let page = render(
                "login.html",
                context! {
                    next => form.next,
                    username => form.username,
                    error => "Please enter a correct username and password.",
                    ..base_ctx(&user)
                },
            )?;
            Ok(page.into_response())
        }
        Err(e) => Err(ViewError::Internal(e.to_string())),
    }
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (jar.remove(removal_cookie()), Redirect::to("/login/"))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

// Paths reachable with a stale token, so the user can log in again.
fn is_public(path: &str) -> bool {
    matches!(path, "/login/" | "/logout/" | "/health")
}

async fn resolve(state: &ServerState, token: &str) -> Result<Option<Principal>, ViewError> {
    let Ok(user_id) = verify_token(&state.auth.jwt_secret, token) else { return Ok(None) };
    Ok(load_principal(&state.db, user_id).await?)
}

/// Attach the requesting user to the request.
///
/// No token means an anonymous user. A Bearer header wins over the cookie.
/// A token that fails verification, or names a missing or disabled user,
/// is answered with 401 and the cookie is cleared.
pub async fn identify_user(
    State(state): State<ServerState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ViewError> {
    let token = bearer_token(req.headers())
        .or_else(|| jar.get(AUTH_COOKIE).map(|c| c.value().to_string()))
        .filter(|t| !t.is_empty());
    let user = match token {
        None => CurrentUser::Anonymous,
        Some(token) => match resolve(&state, &token).await? {
            Some(principal) => CurrentUser::User(principal),
            None if is_public(req.uri().path()) => CurrentUser::Anonymous,
            None => {
                warn!(path = %req.uri().path(), "rejected invalid auth token");
                return Ok((jar.remove(removal_cookie()), ViewError::Unauthenticated).into_response());
            }
        },
    };
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_must_stay_on_site() {
        assert_eq!(safe_next("/tenancy/tenant-groups/"), "/tenancy/tenant-groups/");
        assert_eq!(safe_next("//evil.example"), DEFAULT_NEXT);
        assert_eq!(safe_next("https://evil.example"), DEFAULT_NEXT);
        assert_eq!(safe_next(""), DEFAULT_NEXT);
        assert_eq!(safe_next("/\\evil.example"), DEFAULT_NEXT);
        assert_eq!(safe_next("/tenancy\\..\\x"), DEFAULT_NEXT);
        assert_eq!(safe_next("/\t/evil.example"), DEFAULT_NEXT);
        assert_eq!(safe_next("/tenancy/tenants/?q=a%20b"), "/tenancy/tenants/?q=a%20b");
    }

    #[test]
    fn bearer_header_is_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));
        headers.insert(header::AUTHORIZATION, "Basic xyz".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
