// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SSE STREAMING - Bridge RunEvent → Server-Sent Events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// O canal é criado ANTES de spawnar a execução, então nenhum evento se
// perde. Quando a execução termina o callback é descartado, o sender fecha
// e o stream acaba.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::convert::Infallible;
use std::sync::Arc;

use axum::response::{
    sse::{Event, KeepAlive, Sse},
    IntoResponse, Response,
};
use futures::stream::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::AppState;
use crate::orchestrator::{ProgressCallback, RunEvent, RunState};
use crate::types::ResearchQuery;

/// Spawna a execução e devolve a resposta SSE com os eventos dela.
pub fn stream_run(state: Arc<AppState>, query: ResearchQuery) -> Response {
    let (tx, rx) = mpsc::unbounded_channel::<RunEvent>();

    // Callback síncrono → mpsc::send (non-blocking)
    let progress: ProgressCallback = Arc::new(move |event: RunEvent| {
        let _ = tx.send(event);
    });

    tokio::spawn(async move {
        let outcome = state.manager.run_with_progress(query, progress).await;
        log::info!("[SSE] Run {} finished: {}", outcome.run_id, describe_finish(&outcome.state));
    });

    Sse::new(event_stream(rx))
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn event_stream(
    rx: mpsc::UnboundedReceiver<RunEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    UnboundedReceiverStream::new(rx).map(|event| Ok(to_sse_event(&event)))
}

/// Linha de log do fim da execução
fn describe_finish(state: &RunState) -> String {
    match state {
        RunState::Done { delivery } if delivery.is_delivered() => "done, email sent".to_string(),
        RunState::Done { .. } => "done, email not sent".to_string(),
        RunState::Failed { stage, reason } => format!("failed while {}: {}", stage, reason),
        other => other.name().to_string(),
    }
}

/// Cada evento vira um `data:` com o JSON marcado por `type`
fn to_sse_event(event: &RunEvent) -> Event {
    Event::default().data(serde_json::to_string(event).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_ends_when_sender_drops() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(RunEvent::Status {
            message: "Searching...".into(),
        })
        .unwrap();
        tx.send(RunEvent::Warning {
            message: "Email delivery failed".into(),
        })
        .unwrap();
        drop(tx);

        let events: Vec<_> = event_stream(rx).collect().await;
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_describe_finish() {
        use crate::orchestrator::{DeliveryOutcome, Stage};

        let sent = RunState::Done {
            delivery: DeliveryOutcome::Delivered { message_id: None },
        };
        let not_sent = RunState::Done {
            delivery: DeliveryOutcome::Failed {
                reason: "auth".into(),
            },
        };
        let failed = RunState::Failed {
            stage: Stage::Searching,
            reason: "timeout".into(),
        };

        assert_eq!(describe_finish(&sent), "done, email sent");
        assert_eq!(describe_finish(&not_sent), "done, email not sent");
        assert!(describe_finish(&failed).ends_with(": timeout"));
    }
}
