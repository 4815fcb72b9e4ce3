//! Submission lifecycle controller.
//!
//! Runs network round trips as tasks, supports cancelling the in-flight one, and
//! emits completion events for presentation layers.

use crate::client::ProcessClient;
use crate::error::ClientError;
use crate::model::{AppEvent, InfoEvent, ProcessResponse, ProcessedImage, SubmitRequest, Ticket};
use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Submit(SubmitRequest),
    Cancel(Ticket),
    CheckHealth,
    Save {
        image: ProcessedImage,
        dest: Option<PathBuf>,
    },
    Quit,
}

/// Internal handle for the in-flight submission.
struct InFlight {
    ticket: Ticket,
    handle: Option<JoinHandle<Result<ProcessResponse, ClientError>>>,
}

fn start_submit(client: &ProcessClient, req: SubmitRequest) -> InFlight {
    let client = client.clone();
    let ticket = req.ticket;
    let handle = tokio::spawn(async move { client.process(&req.file, req.phase).await });
    InFlight {
        ticket,
        handle: Some(handle),
    }
}

/// Serve UI commands until `Quit` or the command channel closes.
pub(crate) async fn run_controller(
    client: ProcessClient,
    event_tx: UnboundedSender<AppEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut in_flight: Option<InFlight> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Submit(req)) => {
                        // One round trip at a time; a newer ticket supersedes an older one.
                        if let Some(prev) = in_flight.take() {
                            abort(prev);
                        }
                        let _ = event_tx.send(AppEvent::Info(InfoEvent::Submitting {
                            name: req.file.name.clone(),
                            phase: req.phase,
                        }));
                        in_flight = Some(start_submit(&client, req));
                    }
                    Some(UiCommand::Cancel(ticket)) => {
                        if in_flight.as_ref().is_some_and(|f| f.ticket == ticket) {
                            if let Some(f) = in_flight.take() {
                                abort(f);
                            }
                            let _ = event_tx.send(AppEvent::Info(InfoEvent::Cancelling));
                            let _ = event_tx.send(AppEvent::SubmitCompleted {
                                ticket,
                                outcome: Err(ClientError::Cancelled),
                            });
                        }
                    }
                    Some(UiCommand::CheckHealth) => {
                        let client = client.clone();
                        let tx = event_tx.clone();
                        tokio::spawn(async move {
                            let _ = tx.send(AppEvent::Health(client.health().await));
                        });
                    }
                    Some(UiCommand::Save { image, dest }) => {
                        let client = client.clone();
                        let tx = event_tx.clone();
                        tokio::spawn(async move {
                            let res = crate::output::save_processed(&client, &image, dest.as_deref())
                                .await
                                .map_err(|e| format!("{e:#}"));
                            let _ = tx.send(AppEvent::Saved(res));
                        });
                    }
                    Some(UiCommand::Quit) | None => {
                        if let Some(f) = in_flight.take() {
                            abort(f);
                        }
                        break Ok(());
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it can be dropped
            // if another select branch is chosen, and we'll never observe completion.
            maybe_done = async {
                if let Some(f) = &mut in_flight {
                    if let Some(h) = f.handle.as_mut() {
                        return Some(h.await);
                    }
                }
                futures::future::pending().await
            } => {
                if let (Some(join_res), Some(f)) = (maybe_done, in_flight.take()) {
                    let outcome = join_outcome(join_res);
                    let _ = event_tx.send(AppEvent::SubmitCompleted {
                        ticket: f.ticket,
                        outcome,
                    });
                }
            }
        }
    }
}

fn join_outcome(
    join_res: std::result::Result<Result<ProcessResponse, ClientError>, JoinError>,
) -> Result<ProcessResponse, ClientError> {
    match join_res {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "submission task failed");
            Err(ClientError::TaskFailed(e.to_string()))
        }
    }
}

fn abort(mut f: InFlight) {
    if let Some(h) = f.handle.take() {
        debug!(ticket = f.ticket.0, "aborting in-flight submission");
        h.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use crate::model::{MediaType, Phase, SelectedFile};
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(ticket: u64) -> SubmitRequest {
        SubmitRequest {
            ticket: Ticket(ticket),
            file: SelectedFile {
                name: "scan.png".into(),
                media_type: MediaType::Png,
                bytes: Bytes::from_static(b"png"),
            },
            phase: Phase::Arterial,
        }
    }

    async fn next_completion(
        rx: &mut mpsc::UnboundedReceiver<AppEvent>,
    ) -> (Ticket, Result<ProcessResponse, ClientError>) {
        loop {
            let ev = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("event within timeout")
                .expect("channel open");
            if let AppEvent::SubmitCompleted { ticket, outcome } = ev {
                return (ticket, outcome);
            }
        }
    }

    fn spawn_controller(
        server: &MockServer,
    ) -> (
        mpsc::UnboundedSender<UiCommand>,
        mpsc::UnboundedReceiver<AppEvent>,
        JoinHandle<Result<()>>,
    ) {
        let client = ProcessClient::new(&ClientConfig {
            base_url: server.uri(),
            timeout: None,
            user_agent: "phase-viewer-test".into(),
        })
        .unwrap();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_controller(client, event_tx, cmd_rx));
        (cmd_tx, event_rx, handle)
    }

    #[tokio::test]
    async fn reports_completion_with_ticket() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "processed_image": "X"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (cmd_tx, mut event_rx, handle) = spawn_controller(&server);
        cmd_tx.send(UiCommand::Submit(request(7))).unwrap();
        let (ticket, outcome) = next_completion(&mut event_rx).await;
        assert_eq!(ticket, Ticket(7));
        assert_eq!(outcome.unwrap().processed_image.as_deref(), Some("X"));

        cmd_tx.send(UiCommand::Quit).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cancel_reports_cancelled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(10))
                    .set_body_json(serde_json::json!({"success": true})),
            )
            .mount(&server)
            .await;

        let (cmd_tx, mut event_rx, handle) = spawn_controller(&server);
        cmd_tx.send(UiCommand::Submit(request(1))).unwrap();
        cmd_tx.send(UiCommand::Cancel(Ticket(1))).unwrap();
        let (ticket, outcome) = next_completion(&mut event_rx).await;
        assert_eq!(ticket, Ticket(1));
        assert!(matches!(outcome, Err(ClientError::Cancelled)));

        drop(cmd_tx);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn panicked_submission_is_a_generic_failure() {
        let handle = tokio::spawn(async {
            if true {
                panic!("boom");
            }
            Ok::<ProcessResponse, ClientError>(ProcessResponse::default())
        });
        let outcome = join_outcome(handle.await);
        let err = outcome.unwrap_err();
        assert!(matches!(err, ClientError::TaskFailed(_)));
        assert_eq!(err.user_message(), "Processing failed");
    }

    #[tokio::test]
    async fn health_command_emits_health_event() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "healthy"})),
            )
            .mount(&server)
            .await;

        let (cmd_tx, mut event_rx, handle) = spawn_controller(&server);
        cmd_tx.send(UiCommand::CheckHealth).unwrap();
        let ev = tokio::time::timeout(Duration::from_secs(5), event_rx.recv())
            .await
            .unwrap()
            .unwrap();
        match ev {
            AppEvent::Health(Ok(h)) => assert!(h.is_healthy()),
            other => panic!("unexpected event: {other:?}"),
        }
        cmd_tx.send(UiCommand::Quit).unwrap();
        handle.await.unwrap().unwrap();
    }
}
