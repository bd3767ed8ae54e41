use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use tracing::{error, info};

use freed_core::{CreateError, DestroyOutcome, PollOutcome};
use freed_types::api::{
    CreateFeedRequest, CreateFeedResponse, DeleteResponse, DeleteStatus, FeedSummary, SigQuery,
};
use freed_types::feed::NewFeed;

use crate::state::AppState;

fn internal(e: impl std::fmt::Display) -> StatusCode {
    error!("Store error: {}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// GET / — every live feed, most recently checked first.
pub async fn list_feeds(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let feeds = state.lifecycle.list().await.map_err(internal)?;
    let summaries: Vec<FeedSummary> = feeds.iter().map(FeedSummary::from).collect();
    Ok(Json(summaries))
}

/// POST /feed — form fields `feed_url`, `notify_email`, optional `frequency`.
pub async fn create_feed(
    State(state): State<AppState>,
    Form(req): Form<CreateFeedRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let params = NewFeed::new(&req.feed_url, &req.notify_email, req.frequency()).map_err(|e| {
        info!("Rejected new feed: {}", e);
        StatusCode::UNPROCESSABLE_ENTITY
    })?;

    match state.lifecycle.create(params).await {
        Ok(feed) => Ok((StatusCode::CREATED, Json(CreateFeedResponse { id: feed.id }))),
        Err(e @ CreateError::Unreachable(_)) => {
            info!("Rejected new feed {}: {}", req.feed_url, e);
            Err(StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(e) => Err(internal(e)),
    }
}

/// GET /feed/{id}/verify?sig= — emailed link. Always lands back on the index;
/// a bad token is ignored without saying so.
pub async fn verify_feed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SigQuery>,
) -> Result<Redirect, StatusCode> {
    state
        .lifecycle
        .verify(&id, query.sig.as_deref())
        .await
        .map_err(internal)?;
    Ok(Redirect::to("/"))
}

/// PUT /feed/{id}?sig= — check the page now.
pub async fn refresh_feed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SigQuery>,
) -> Result<StatusCode, StatusCode> {
    let outcome = state
        .lifecycle
        .refresh(&id, query.sig.as_deref())
        .await
        .map_err(internal)?;

    match outcome {
        PollOutcome::NotFound => Err(StatusCode::NOT_FOUND),
        _ => Ok(StatusCode::NO_CONTENT),
    }
}

/// DELETE /feed/{id}?sig= — deletes with a valid token, otherwise mails the
/// owner a confirmation link.
pub async fn delete_feed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SigQuery>,
) -> Result<Json<DeleteResponse>, StatusCode> {
    let outcome = state
        .lifecycle
        .destroy(&id, query.sig.as_deref())
        .await
        .map_err(internal)?;

    let status = match outcome {
        DestroyOutcome::Deleted => DeleteStatus::Deleted,
        DestroyOutcome::ConfirmationRequested(_) => DeleteStatus::ConfirmationSent,
        DestroyOutcome::NotFound => return Err(StatusCode::NOT_FOUND),
    };
    Ok(Json(DeleteResponse { status }))
}

/// GET /feed/{id}/delete?sig= — emailed link; same two-way logic as DELETE.
pub async fn delete_feed_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SigQuery>,
) -> Result<Redirect, StatusCode> {
    state
        .lifecycle
        .destroy(&id, query.sig.as_deref())
        .await
        .map_err(internal)?;
    Ok(Redirect::to("/"))
}
