#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use satchel::{
    config::Config,
    db::DbActorHandle,
    server::{AppState, satchel_router},
};
use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

pub const BOUNDARY: &str = "satchel-test-boundary";

/// Unique path under the system temp dir.
pub fn temp_path(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}-{}-{}", std::process::id(), nanos))
}

pub fn test_config(prefix: &str) -> Config {
    let root = temp_path(prefix);
    let mut cfg = Config::default();
    cfg.storage.data_dir = root.join("data");
    cfg.storage.database_path = root.join("messages.db");
    cfg.basic.secret_key = "integration-test-secret".to_string();
    cfg.limits.enabled = false;
    cfg
}

pub struct TestApp {
    pub app: Router,
    pub db: DbActorHandle,
    pub config: Arc<Config>,
    pub cookies: BTreeMap<String, String>,
}

impl TestApp {
    pub async fn new(cfg: Config) -> Self {
        satchel::bootstrap::prepare(&cfg.storage)
            .await
            .expect("bootstrap failed");
        let db = satchel::db::spawn(&cfg.storage.database_url())
            .await
            .expect("failed to spawn db actor");
        let config = Arc::new(cfg);
        let app = satchel_router(AppState::new(db.clone(), config.clone()));
        Self {
            app,
            db,
            config,
            cookies: BTreeMap::new(),
        }
    }

    fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Sends a request with the stored cookies and records any `Set-Cookie` in the reply.
    pub async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> Response<Body> {
        let builder = if self.cookies.is_empty() {
            builder
        } else {
            builder.header(header::COOKIE, self.cookie_header())
        };
        let req: Request<Body> = builder.body(body).expect("failed to build request");
        let resp = self.app.clone().oneshot(req).await.expect("request failed");

        for value in resp.headers().get_all(header::SET_COOKIE) {
            let raw = value.to_str().expect("set-cookie was not ascii");
            let pair = raw.split(';').next().unwrap_or_default();
            let (name, val) = pair.split_once('=').expect("malformed set-cookie");
            let removed = val.is_empty() || raw.contains("Max-Age=0");
            if removed {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), val.to_string());
            }
        }
        resp
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Request::builder().method("GET").uri(uri), Body::empty())
            .await
    }

    /// Fetches the upload form and returns its CSRF token.
    pub async fn csrf_token(&mut self) -> String {
        let resp = self.get("/upload").await;
        let html = body_string(resp).await;
        extract_csrf(&html)
    }

    pub async fn post_upload(&mut self, parts: &[Part<'_>]) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                ),
            Body::from(multipart_body(parts)),
        )
        .await
    }

    pub async fn post_form(&mut self, uri: &str, body: String) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
            Body::from(body),
        )
        .await
    }

    /// Uploads `content` as `filename` and returns the new file id.
    pub async fn upload(&mut self, filename: &str, content: &[u8], extra: &[(&str, &str)]) -> String {
        let token = self.csrf_token().await;
        let mut parts = vec![
            Part::Text("csrf_token", token.as_str()),
            Part::File("file", filename, content),
        ];
        if !extra.iter().any(|(k, _)| *k == "expiry") {
            parts.push(Part::Text("expiry", "1d"));
        }
        parts.extend(extra.iter().map(|(k, v)| Part::Text(k, v)));

        let resp = self.post_upload(&parts).await;
        assert_eq!(location(&resp), "/", "upload should redirect home");

        let html = body_string(self.get("/").await).await;
        extract_file_id(&html)
    }

    pub fn blob_path(&self, id: &str) -> PathBuf {
        self.config.storage.data_dir.join(id)
    }
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, content) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body")
        .to_vec()
}

pub async fn body_string(resp: Response<Body>) -> String {
    String::from_utf8(body_bytes(resp).await).expect("response body was not utf-8")
}

pub fn location(resp: &Response<Body>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn extract_csrf(html: &str) -> String {
    let marker = r#"name="csrf_token" value=""#;
    let start = html.find(marker).expect("page has no csrf field") + marker.len();
    let end = html[start..].find('"').expect("unterminated csrf value");
    html[start..start + end].to_string()
}

pub fn extract_file_id(html: &str) -> String {
    let marker = "/download/";
    let start = html.find(marker).expect("page has no download link") + marker.len();
    html[start..start + 36].to_string()
}
