//! Shared helpers: an in-memory app and a tiny cookie-aware request helper.

#![allow(dead_code)]

use std::collections::HashMap;

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use khata_api::config::ApiConfig;
use khata_api::{AppState, router};
use khata_core::auth::jwt::TokenSecrets;
use khata_core::auth::session::SessionSettings;
use khata_core::models::tax::seed_models;
use khata_core::stores::Stores;
use khata_core::tax::store::seed;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const PREFIX: &str = "/api/v1";
pub const PASSWORD: &str = "correct horse";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    /// `name -> value` for every Set-Cookie header.
    pub fn cookies(&self) -> HashMap<String, String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|raw| {
                let pair = raw.split(';').next()?;
                let (name, value) = pair.split_once('=')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }

    pub fn raw_cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|raw| raw.starts_with(&format!("{name}=")))
            .map(str::to_string)
    }
}

/// Cookie header for a session, as a browser would send it.
pub fn session_cookies(access: &str, refresh: &str) -> String {
    format!("access_token={access}; refresh_token={refresh}")
}

pub fn test_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: "postgres://unused".into(),
        api_prefix: PREFIX.into(),
        secrets: TokenSecrets::new("access-secret", "refresh-secret", "oob-secret"),
        session: SessionSettings::default(),
    }
}

pub async fn app() -> TestApp {
    let stores = Stores::in_memory();
    seed(stores.tax_models.as_ref(), &seed_models())
        .await
        .expect("seed tax models");
    let state = AppState::new(test_config(), stores);
    TestApp {
        router: router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("{PREFIX}{path}"));
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let body = match body {
            Some(v) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        self.send_request(builder.body(body).expect("request")).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> Reply {
        let resp = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    /// Register and return `(access, refresh)`.
    pub async fn register(&self, email: &str, dial_code: &str, device: &str) -> (String, String) {
        let reply = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": PASSWORD,
                    "dial_code": dial_code,
                    "device_type": device,
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "register: {}", reply.body);
        tokens(&reply)
    }

    /// Log in and return `(access, refresh)`.
    pub async fn login(&self, email: &str, device: &str) -> (String, String) {
        let reply = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({"email": email, "password": PASSWORD, "device_type": device})),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "login: {}", reply.body);
        tokens(&reply)
    }

    pub async fn me_status(&self, access: &str) -> StatusCode {
        self.send(
            Method::GET,
            "/auth/me",
            Some(&format!("access_token={access}")),
            None,
        )
        .await
        .status
    }
}

pub fn tokens(reply: &Reply) -> (String, String) {
    let cookies = reply.cookies();
    (
        cookies.get("access_token").cloned().expect("access cookie"),
        cookies.get("refresh_token").cloned().expect("refresh cookie"),
    )
}
