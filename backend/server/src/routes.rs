use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use chrono::Utc;
use deck::{
    ClickEvent, Comment, PromptStats, SheetData,
    catalog::{self, DEFAULT_PER_PAGE, Page},
};
use futures::{
    Stream, StreamExt,
    stream::{self, unfold},
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    events::PromptEvent,
    sheets::{SheetKind, fetch_sheet, load_feed},
    state::AppState,
    utils::{AppJson, AppQuery, ClientId, client_id, comment_content},
};

type SharedState = State<Arc<AppState>>;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CardsQuery {
    pub q: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Serialize, Debug)]
pub struct CardsResponse {
    #[serde(flatten)]
    pub page: Page,
    pub redeemed: bool,
}

#[derive(Deserialize, Debug)]
pub struct RedeemRequest {
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct RedeemStatus {
    pub activated: bool,
}

#[derive(Deserialize, Debug)]
pub struct NewComment {
    pub content: String,
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn sheets_handler(State(state): SharedState) -> Result<Json<SheetData>, AppError> {
    fetch_sheet(&state, SheetKind::Primary).await.map(Json)
}

pub async fn special_sheets_handler(
    State(state): SharedState,
) -> Result<Json<SheetData>, AppError> {
    fetch_sheet(&state, SheetKind::Special).await.map(Json)
}

pub async fn cards_handler(
    State(state): SharedState,
    headers: HeaderMap,
    AppQuery(query): AppQuery<CardsQuery>,
) -> Result<Json<CardsResponse>, AppError> {
    let redeemed = match client_id(&headers) {
        Some(id) => state.redeem.is_activated(&id).await?,
        None => false,
    };

    let cards = load_feed(&state, redeemed).await?;
    let cards = catalog::filter(cards, query.q.as_deref().unwrap_or_default());
    let page = catalog::paginate(
        cards,
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PER_PAGE),
    )?;

    Ok(Json(CardsResponse { page, redeemed }))
}

pub async fn redeem_status_handler(
    State(state): SharedState,
    ClientId(client): ClientId,
) -> Result<Json<RedeemStatus>, AppError> {
    let activated = state.redeem.is_activated(&client).await?;

    Ok(Json(RedeemStatus { activated }))
}

pub async fn redeem_handler(
    State(state): SharedState,
    ClientId(client): ClientId,
    AppJson(payload): AppJson<RedeemRequest>,
) -> Result<Json<RedeemStatus>, AppError> {
    if !state.redeem.activate(&client, &payload.code).await? {
        warn!("Rejected redeem code from {client}");
        return Err(AppError::InvalidRedeemCode);
    }

    Ok(Json(RedeemStatus { activated: true }))
}

pub async fn click_handler(
    State(state): SharedState,
    Path(prompt_id): Path<String>,
    ClientId(client): ClientId,
) -> Result<Json<PromptStats>, AppError> {
    let event = ClickEvent {
        prompt_id: prompt_id.clone(),
        user_id: client,
        timestamp: Utc::now(),
    };

    let stats = state.store.record_click(&event).await?;
    state
        .events
        .publish(&prompt_id, PromptEvent::Stats(Some(stats.clone())));

    Ok(Json(stats))
}

pub async fn stats_handler(
    State(state): SharedState,
    Path(prompt_id): Path<String>,
) -> Result<Json<Option<PromptStats>>, AppError> {
    Ok(Json(state.store.stats(&prompt_id).await?))
}

pub async fn comments_handler(
    State(state): SharedState,
    Path(prompt_id): Path<String>,
) -> Result<Json<Vec<Comment>>, AppError> {
    Ok(Json(state.store.comments(&prompt_id).await?))
}

pub async fn add_comment_handler(
    State(state): SharedState,
    Path(prompt_id): Path<String>,
    ClientId(client): ClientId,
    AppJson(payload): AppJson<NewComment>,
) -> Result<impl IntoResponse, AppError> {
    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        prompt_id: prompt_id.clone(),
        user_id: client,
        content: comment_content(&payload.content)?,
        timestamp: Utc::now(),
    };

    state.store.add_comment(&comment).await?;
    info!("New comment {} on {prompt_id}", comment.id);

    let comments = state.store.comments(&prompt_id).await?;
    state
        .events
        .publish(&prompt_id, PromptEvent::Comments(comments));

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Current stats and comments first, then every update until the client disconnects.
pub async fn events_handler(
    State(state): SharedState,
    Path(prompt_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let receiver = state.events.subscribe(&prompt_id);

    let snapshot = vec![
        PromptEvent::Stats(state.store.stats(&prompt_id).await?),
        PromptEvent::Comments(state.store.comments(&prompt_id).await?),
    ];

    let updates = unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => return Some((event, receiver)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscriber lagged, skipped {skipped} events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    let stream = stream::iter(snapshot)
        .chain(updates)
        .map(PromptEvent::into_sse);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
