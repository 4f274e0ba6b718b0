use askama::Template;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_cookies::{
    cookie::{Cookie, SameSite},
    Cookies,
};

use crate::{
    auth::IdentityGate,
    models::{Post, PostInput, SessionContext, StoredFile},
    Error, Result,
};

use super::{
    extract::{JsonBody, PathParam, QueryParams},
    AppState, LoginPayload, PublishedQuery, SESSION_COOKIE,
};

const INDEX_POST_LIMIT: u32 = 10;
const MAX_PUBLISHED_LIMIT: u32 = 100;

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    posts: Vec<Post>,
}

#[derive(Template)]
#[template(path = "post.html")]
struct PostTemplate {
    post: Post,
    body: String,
}

#[derive(Serialize)]
pub struct PostResponse {
    post: Post,
}

#[derive(Serialize)]
pub struct PostsResponse {
    posts: Vec<Post>,
}

#[derive(Serialize)]
pub struct FilesResponse {
    files: Vec<StoredFile>,
}

fn session_context(cookies: &Cookies) -> SessionContext {
    SessionContext {
        token: cookies
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string()),
    }
}

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub async fn index(State(state): State<Arc<AppState>>) -> Result<Response> {
    let posts = state.posts.list_published(INDEX_POST_LIMIT).await?;

    let template = IndexTemplate { posts };
    Ok(Html(template.render()?).into_response())
}

pub async fn blog_post(
    State(state): State<Arc<AppState>>,
    PathParam(slug): PathParam<String>,
) -> Result<Response> {
    let post = state.posts.get_published_by_slug(&slug).await?;

    let template = PostTemplate {
        body: post.html(),
        post,
    };
    Ok(Html(template.render()?).into_response())
}

pub async fn api_list_posts(State(state): State<Arc<AppState>>) -> Result<Json<PostsResponse>> {
    let posts = state.posts.list_posts().await?;
    Ok(Json(PostsResponse { posts }))
}

pub async fn api_list_published(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<PublishedQuery>,
) -> Result<Json<PostsResponse>> {
    let limit = query
        .limit
        .unwrap_or(INDEX_POST_LIMIT)
        .clamp(1, MAX_PUBLISHED_LIMIT);

    let posts = state.posts.list_published(limit).await?;
    Ok(Json(PostsResponse { posts }))
}

pub async fn api_get_post(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<PostResponse>> {
    let post = state.posts.get_post(id).await?;
    Ok(Json(PostResponse { post }))
}

pub async fn api_create_post(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    JsonBody(payload): JsonBody<PostInput>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    let post = state
        .posts
        .create_post(&session_context(&cookies), payload)
        .await?;

    Ok((StatusCode::CREATED, Json(PostResponse { post })))
}

pub async fn api_update_post(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    PathParam(id): PathParam<i64>,
    JsonBody(payload): JsonBody<PostInput>,
) -> Result<Json<PostResponse>> {
    let post = state
        .posts
        .update_post(&session_context(&cookies), id, payload)
        .await?;

    Ok(Json(PostResponse { post }))
}

pub async fn api_delete_post(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    PathParam(id): PathParam<i64>,
) -> Result<Json<PostResponse>> {
    let post = state
        .posts
        .delete_post(&session_context(&cookies), id)
        .await?;

    Ok(Json(PostResponse { post }))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    JsonBody(payload): JsonBody<LoginPayload>,
) -> Result<Json<serde_json::Value>> {
    let token = state.gate.login(&payload.email, &payload.password).await?;
    cookies.add(session_cookie(token));

    Ok(Json(json!({ "message": "Signed in" })))
}

pub async fn logout(State(state): State<Arc<AppState>>, cookies: Cookies) -> Result<StatusCode> {
    state.gate.logout(&session_context(&cookies)).await?;
    cookies.remove(session_cookie(String::new()));

    Ok(StatusCode::NO_CONTENT)
}

pub async fn api_list_files(State(state): State<Arc<AppState>>) -> Result<Json<FilesResponse>> {
    let files = state.files.list_files().await?;
    Ok(Json(FilesResponse { files }))
}

pub async fn api_upload_file(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    state.gate.require_session(&session_context(&cookies)).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| Error::invalid("Uploaded file has no name"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::invalid(e.body_text()))?;

        let key = state.files.upload_file(&bytes, &name).await?;
        return Ok((
            StatusCode::CREATED,
            Json(json!({ "message": "File uploaded successfully", "key": key })),
        ));
    }

    Err(Error::invalid("No file provided"))
}

pub async fn api_delete_file(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    PathParam(key): PathParam<String>,
) -> Result<StatusCode> {
    state.gate.require_session(&session_context(&cookies)).await?;
    state.files.delete_file(&key).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
