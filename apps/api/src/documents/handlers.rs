use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::stream::{self, Stream};
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::models::{AuthEvent, Role};
use crate::auth::session::CurrentPrincipal;
use crate::documents::storage::ProgressFn;
use crate::documents::store::{DocumentQuery, ReviewDecision};
use crate::documents::subscription::{subscribe, Snapshot, Subscription};
use crate::documents::upload::{review_document, upload_document, UploadForm, UploadedFile};
use crate::errors::AppError;
use crate::models::document::DocumentRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: ReviewDecision,
}

/// Employees only ever see their own documents; HR sees everyone's, or one user's on request.
fn scope_for(caller: &CurrentPrincipal, requested: Option<Uuid>) -> Result<DocumentQuery, AppError> {
    if caller.principal.is_hr() {
        return Ok(DocumentQuery { owner: requested });
    }
    match requested {
        Some(id) if id != caller.principal.user_id => Err(AppError::Forbidden),
        _ => Ok(DocumentQuery::owned_by(caller.principal.user_id)),
    }
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("category") => form.category = Some(field_text(field).await?),
            Some("description") => form.description = Some(field_text(field).await?),
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;
                form.file = Some(UploadedFile {
                    file_name,
                    mime_type,
                    bytes,
                });
            }
            other => debug!("Ignoring multipart field {other:?}"),
        }
    }
    Ok(form)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed form field: {e}")))
}

/// POST /api/v1/documents
pub async fn handle_upload(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentRecord>), AppError> {
    caller.require_role(Role::Employee)?;
    let form = read_form(multipart).await?;
    let user_id = caller.principal.user_id;
    let progress: ProgressFn = Arc::new(move |pct| debug!("Upload for {user_id}: {pct}%"));
    let record = upload_document(
        state.documents.as_ref(),
        state.storage.as_ref(),
        user_id,
        form,
        Some(progress),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/v1/documents
pub async fn handle_list(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<DocumentRecord>>, AppError> {
    let query = scope_for(&caller, params.user_id)?;
    Ok(Json(state.documents.query(query).await?))
}

/// PATCH /api/v1/documents/:id/review
pub async fn handle_review(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<DocumentRecord>, AppError> {
    caller.require_role(Role::Hr)?;
    let record = review_document(
        state.documents.as_ref(),
        id,
        req.status,
        caller.principal.user_id,
    )
    .await?;
    Ok(Json(record))
}

struct LiveFeed {
    subscription: Subscription,
    auth_events: broadcast::Receiver<AuthEvent>,
    token: Uuid,
}

enum Next {
    Snapshot(Snapshot),
    Ended,
}

impl LiveFeed {
    async fn next(&mut self) -> Next {
        loop {
            tokio::select! {
                snapshot = self.subscription.next_snapshot() => {
                    return match snapshot {
                        Some(s) => Next::Snapshot(s),
                        None => Next::Ended,
                    };
                }
                event = self.auth_events.recv() => match event {
                    Ok(AuthEvent::SignedOut { token, .. }) if token == self.token => return Next::Ended,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(n)) => {
                        warn!("Live feed missed {n} auth events");
                        continue;
                    }
                    Err(RecvError::Closed) => return Next::Ended,
                },
            }
        }
    }
}

fn snapshot_event(snapshot: Snapshot) -> Event {
    match snapshot {
        Ok(records) => Event::default()
            .event("snapshot")
            .json_data(&records)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
        Err(e) => {
            warn!("Live document query failed: {e}");
            Event::default()
                .event("error")
                .data("Failed to load documents")
        }
    }
}

/// GET /api/v1/documents/stream
///
/// Server-sent snapshots of the caller's visible documents. The stream ends
/// when the caller's session signs out; disconnecting drops the subscription.
pub async fn handle_stream(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    Query(params): Query<ListQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let query = scope_for(&caller, params.user_id)?;
    let feed = LiveFeed {
        auth_events: state.auth.subscribe(),
        subscription: subscribe(state.documents.clone(), query),
        token: caller.token,
    };

    let events = stream::unfold(feed, |mut feed| async move {
        match feed.next().await {
            Next::Snapshot(s) => Some((Ok(snapshot_event(s)), feed)),
            Next::Ended => {
                feed.subscription.unsubscribe();
                None
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
