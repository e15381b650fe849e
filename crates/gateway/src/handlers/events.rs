//! Realtime table-change stream

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::time::Duration;

use crate::AppState;
use rkive_common::{
    errors::{AppError, Result},
    Session,
};

/// Tables clients may watch
pub const SUBSCRIBABLE_TABLES: &[&str] = &["papers", "citations"];

/// Open a subscription on `table` and stream its events until the client leaves
pub async fn subscribe(
    State(state): State<AppState>,
    session: Session,
    Path(table): Path<String>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    if !SUBSCRIBABLE_TABLES.contains(&table.as_str()) {
        return Err(AppError::NotFound {
            resource_type: "table".to_string(),
            id: table,
        });
    }

    let subscription = state.events.subscribe(table.as_str());
    tracing::info!(
        table = %table,
        user_id = %session.user_id,
        live = state.events.live_subscriptions(),
        "Realtime subscription opened"
    );

    // The subscription moves into the stream and is released when the
    // response body is dropped
    let events = stream::unfold(subscription, |mut subscription| async move {
        let change = subscription.recv().await?;
        let event = match serde_json::to_string(&change) {
            Ok(data) => Event::default().event("change").data(data),
            Err(e) => Event::default().event("error").data(e.to_string()),
        };
        Some((Ok(event), subscription))
    });

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(state.config.events.keep_alive_secs.max(1)))
            .text("ping"),
    ))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use rkive_common::events::{ChangeAction, TableEvent};
    use rkive_common::Role;
    use tower::ServiceExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_unknown_table() {
        let state = empty_state();
        let auth = token(&state, Role::Student);

        let response = router(state)
            .oneshot(
                Request::get("/v1/events/users")
                    .header("authorization", auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stream_lifecycle() {
        let state = empty_state();
        let auth = token(&state, Role::Student);

        let response = router(state.clone())
            .oneshot(
                Request::get("/v1/events/citations")
                    .header("authorization", auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );
        assert_eq!(state.events.live_subscriptions(), 1);

        let delivered = state.events.publish(TableEvent::new(
            "citations",
            ChangeAction::Insert,
            Uuid::from_u128(1),
        ));
        assert_eq!(delivered, 1);

        drop(response);
        assert_eq!(state.events.live_subscriptions(), 0);
    }
}
