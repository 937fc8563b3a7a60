//! `Json`, `Query` and `Path` extractors whose rejections render through
//! [`AppError`], so malformed input always gets a 400 with an `{"error"}` body.

use axum::extract::{FromRequest, FromRequestParts};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode, routing::post, Router};
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;
    use uuid::Uuid;

    #[derive(Deserialize)]
    struct Named {
        name: String,
    }

    #[derive(Deserialize)]
    struct Paging {
        #[allow(dead_code)]
        page: i64,
    }

    async fn echo(Path(id): Path<Uuid>, Query(_): Query<Paging>, Json(body): Json<Named>) -> Json<String> {
        Json(format!("{id}:{}", body.name))
    }

    async fn call(uri: &str, content_type: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let app = Router::new().route("/items/:id", post(echo));
        let req = Request::post(uri)
            .header("content-type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn valid_input_passes_through() {
        let id = Uuid::nil();
        let (status, body) = call(
            &format!("/items/{id}?page=1"),
            "application/json",
            r#"{"name":"kai"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!("{id}:kai"));
    }

    #[tokio::test]
    async fn rejections_are_json_bad_requests() {
        let id = Uuid::nil();
        for (uri, content_type, body) in [
            (format!("/items/{id}?page=1"), "application/json", r#"{"name":5}"#),
            (format!("/items/{id}?page=1"), "application/json", "{not json"),
            (format!("/items/{id}?page=1"), "text/plain", r#"{"name":"kai"}"#),
            (format!("/items/{id}?page=abc"), "application/json", r#"{"name":"kai"}"#),
            ("/items/not-a-uuid?page=1".to_string(), "application/json", r#"{"name":"kai"}"#),
        ] {
            let (status, json) = call(&uri, content_type, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {content_type} {body}");
            assert!(json["error"].is_string(), "{uri} {content_type} {body}");
        }
    }
}
