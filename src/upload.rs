//! Upload controller.
//!
//! Owns the pending selection and every piece of UI-bound state. Presentation
//! layers call the handler methods and render [`ViewState`]; the network round
//! trip happens elsewhere and reports back through [`UploadController::finish_submit`].

use crate::client::interpret_response;
use crate::error::{failure_alert, ClientError, SelectionError, SubmitError};
use crate::model::{
    CandidateFile, Phase, ProcessResponse, ProcessedImage, SelectedFile, SubmitRequest, Ticket,
};
use crate::output::decode_data_uri;
use crate::preview::Preview;
use crate::selection;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitState {
    #[default]
    Idle,
    Submitting,
    Displayed,
    Failed,
}

/// Content of the upload box.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusIndicator {
    #[default]
    AwaitingFile,
    Uploaded { name: String },
}

impl StatusIndicator {
    pub fn headline(&self) -> &'static str {
        match self {
            StatusIndicator::AwaitingFile => "Drop an image here or press o to open one",
            StatusIndicator::Uploaded { .. } => "Image Uploaded Successfully",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub submit_state: SubmitState,
    pub phase: Phase,
    pub trigger_enabled: bool,
    pub busy: bool,
    pub results_visible: bool,
    pub status: StatusIndicator,
    pub preview: Option<Preview>,
    pub processed: Option<ProcessedImage>,
    /// Preview of the processed image, when its source is an inline data URI.
    pub processed_preview: Option<Preview>,
    /// Pending modal alert; cleared by [`UploadController::dismiss_alert`].
    pub alert: Option<String>,
}

/// What happened to a completion handed to [`UploadController::finish_submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Displayed,
    /// The cycle failed; carries the message inside the alert.
    Failed(String),
    /// The ticket is not the in-flight one; nothing changed.
    Stale,
}

#[derive(Debug, Default)]
pub struct UploadController {
    pending: Option<SelectedFile>,
    view: ViewState,
    next_ticket: u64,
    in_flight: Option<(Ticket, Phase)>,
}

impl UploadController {
    pub fn new(phase: Phase) -> Self {
        Self {
            view: ViewState {
                phase,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn pending(&self) -> Option<&SelectedFile> {
        self.pending.as_ref()
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.view.phase = phase;
    }

    pub fn toggle_phase(&mut self) {
        self.set_phase(self.view.phase.toggled());
    }

    /// Offer a candidate as the new pending selection.
    ///
    /// A rejected candidate leaves every piece of state untouched except the alert.
    pub fn select(&mut self, candidate: CandidateFile) -> Result<(), SelectionError> {
        match selection::validate(candidate) {
            Ok((file, preview)) => {
                info!(name = %file.name, media_type = file.media_type.as_mime(), "image selected");
                self.view.status = StatusIndicator::Uploaded {
                    name: file.name.clone(),
                };
                self.view.preview = Some(preview);
                self.view.trigger_enabled = self.in_flight.is_none();
                self.pending = Some(file);
                Ok(())
            }
            Err(e) => {
                warn!("selection rejected: {e}");
                self.view.alert = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Record a failure to even produce a candidate (unreadable path).
    pub fn reject(&mut self, err: SelectionError) {
        warn!("selection rejected: {err}");
        self.view.alert = Some(err.to_string());
    }

    /// Start a submission cycle for the pending selection.
    pub fn begin_submit(&mut self) -> Result<SubmitRequest, SubmitError> {
        if self.in_flight.is_some() {
            return Err(SubmitError::InFlight);
        }
        let Some(file) = self.pending.clone() else {
            self.view.alert = Some(SubmitError::NoSelection.to_string());
            return Err(SubmitError::NoSelection);
        };

        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        let phase = self.view.phase;
        self.in_flight = Some((ticket, phase));

        self.view.submit_state = SubmitState::Submitting;
        self.view.results_visible = false;
        self.view.busy = true;
        self.view.trigger_enabled = false;
        debug!(ticket = ticket.0, %phase, "submission started");

        Ok(SubmitRequest {
            ticket,
            file,
            phase,
        })
    }

    /// Apply the outcome of the round trip started with `ticket`.
    pub fn finish_submit(
        &mut self,
        ticket: Ticket,
        outcome: Result<ProcessResponse, ClientError>,
    ) -> Completion {
        let phase = match self.in_flight {
            Some((t, phase)) if t == ticket => phase,
            _ => {
                debug!(ticket = ticket.0, "ignoring stale completion");
                return Completion::Stale;
            }
        };
        self.in_flight = None;
        self.view.busy = false;
        self.view.trigger_enabled = self.pending.is_some();

        match outcome.and_then(|resp| interpret_response(resp, phase)) {
            Ok(processed) => {
                info!(ticket = ticket.0, %phase, "processed image received");
                self.view.processed_preview = processed_preview(&processed.source);
                self.view.processed = Some(processed);
                self.view.results_visible = true;
                self.view.submit_state = SubmitState::Displayed;
                Completion::Displayed
            }
            Err(e) => self.fail(ticket, &e),
        }
    }

    /// Abandon the in-flight submission, if any.
    pub fn cancel(&mut self) -> Option<Ticket> {
        let (ticket, _) = self.in_flight?;
        self.in_flight = None;
        self.view.busy = false;
        self.view.trigger_enabled = self.pending.is_some();
        self.fail(ticket, &ClientError::Cancelled);
        Some(ticket)
    }

    /// Dismiss the modal alert. A failed cycle returns to idle.
    pub fn dismiss_alert(&mut self) -> Option<String> {
        if self.view.submit_state == SubmitState::Failed {
            self.view.submit_state = SubmitState::Idle;
        }
        self.view.alert.take()
    }

    fn fail(&mut self, ticket: Ticket, err: &ClientError) -> Completion {
        let message = err.user_message();
        warn!(ticket = ticket.0, error = %err, "submission failed");
        self.view.alert = Some(failure_alert(&message));
        self.view.submit_state = SubmitState::Failed;
        Completion::Failed(message)
    }
}

fn processed_preview(source: &str) -> Option<Preview> {
    let (_, bytes) = decode_data_uri(source).ok()?;
    Preview::decode(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::tests::png_bytes;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use bytes::Bytes;

    fn png(name: &str) -> CandidateFile {
        CandidateFile {
            name: name.into(),
            declared_type: "image/png".into(),
            bytes: Bytes::from(png_bytes(3, 3, [200, 10, 10])),
        }
    }

    fn gif(name: &str) -> CandidateFile {
        CandidateFile {
            name: name.into(),
            declared_type: "image/gif".into(),
            bytes: Bytes::from_static(b"GIF89a"),
        }
    }

    fn ok_response(image: &str) -> Result<ProcessResponse, ClientError> {
        Ok(ProcessResponse {
            success: true,
            processed_image: Some(image.into()),
            ..Default::default()
        })
    }

    #[test]
    fn starts_idle_with_trigger_disabled() {
        let c = UploadController::new(Phase::Arterial);
        assert_eq!(c.view().submit_state, SubmitState::Idle);
        assert!(!c.view().trigger_enabled);
        assert!(!c.view().busy);
        assert!(c.pending().is_none());
        assert_eq!(c.view().status, StatusIndicator::AwaitingFile);
    }

    #[test]
    fn invalid_type_changes_nothing_but_the_alert() {
        let mut c = UploadController::new(Phase::Arterial);
        assert!(c.select(gif("a.gif")).is_err());
        assert!(c.pending().is_none());
        assert!(!c.view().trigger_enabled);
        assert_eq!(
            c.view().alert.as_deref(),
            Some("Please select a JPG or PNG image file.")
        );

        c.dismiss_alert();
        c.select(png("first.png")).unwrap();
        assert!(c.view().trigger_enabled);
        assert!(c.select(gif("b.gif")).is_err());
        assert_eq!(c.pending().map(|f| f.name.as_str()), Some("first.png"));
        assert!(c.view().trigger_enabled);
        assert_eq!(
            c.view().status,
            StatusIndicator::Uploaded {
                name: "first.png".into()
            }
        );
    }

    #[test]
    fn undecodable_file_is_rejected_without_state_change() {
        let mut c = UploadController::new(Phase::Arterial);
        let broken = CandidateFile {
            name: "broken.png".into(),
            declared_type: "image/png".into(),
            bytes: Bytes::from_static(b"not a png"),
        };
        assert!(matches!(
            c.select(broken),
            Err(SelectionError::Undecodable { .. })
        ));
        assert!(c.pending().is_none());
        assert!(c.view().preview.is_none());
        assert!(!c.view().trigger_enabled);
    }

    #[test]
    fn new_selection_replaces_previous() {
        let mut c = UploadController::new(Phase::Arterial);
        c.select(png("one.png")).unwrap();
        c.select(png("two.png")).unwrap();
        assert_eq!(c.pending().map(|f| f.name.as_str()), Some("two.png"));
        assert_eq!(
            c.view().status,
            StatusIndicator::Uploaded {
                name: "two.png".into()
            }
        );
        assert!(c.view().preview.is_some());
    }

    #[test]
    fn submit_without_selection_alerts() {
        let mut c = UploadController::new(Phase::Arterial);
        assert_eq!(c.begin_submit().unwrap_err(), SubmitError::NoSelection);
        assert_eq!(c.view().alert.as_deref(), Some("Please select an image first."));
        assert_eq!(c.view().submit_state, SubmitState::Idle);
        assert!(!c.view().busy);
    }

    #[test]
    fn submit_enters_submitting() {
        let mut c = UploadController::new(Phase::Venous);
        c.select(png("scan.png")).unwrap();
        let req = c.begin_submit().unwrap();
        assert_eq!(req.phase, Phase::Venous);
        assert_eq!(req.file.name, "scan.png");
        let v = c.view();
        assert_eq!(v.submit_state, SubmitState::Submitting);
        assert!(v.busy);
        assert!(!v.trigger_enabled);
        assert!(!v.results_visible);
        assert_eq!(c.begin_submit().unwrap_err(), SubmitError::InFlight);
    }

    #[test]
    fn arterial_success_displays_result() {
        let mut c = UploadController::new(Phase::Arterial);
        c.select(png("scan.png")).unwrap();
        let req = c.begin_submit().unwrap();
        assert_eq!(c.finish_submit(req.ticket, ok_response("X")), Completion::Displayed);

        let v = c.view();
        let processed = v.processed.as_ref().unwrap();
        assert!(processed.title.contains("Arterial Phase"));
        assert_eq!(processed.source, "X");
        assert!(v.results_visible);
        assert!(v.trigger_enabled);
        assert!(!v.busy);
        assert_eq!(v.submit_state, SubmitState::Displayed);
        assert!(v.processed_preview.is_none());
    }

    #[test]
    fn venous_success_uses_venous_label() {
        let mut c = UploadController::new(Phase::Venous);
        c.select(png("scan.png")).unwrap();
        let req = c.begin_submit().unwrap();
        let uri = format!(
            "data:image/png;base64,{}",
            STANDARD.encode(png_bytes(2, 2, [0, 0, 255]))
        );
        c.finish_submit(req.ticket, ok_response(&uri));
        let processed = c.view().processed.as_ref().unwrap();
        assert_eq!(processed.title, "Processed Image (Venous Phase)");
        assert!(c.view().processed_preview.is_some());
    }

    #[test]
    fn phase_is_captured_at_submit_time() {
        let mut c = UploadController::new(Phase::Arterial);
        c.select(png("scan.png")).unwrap();
        let req = c.begin_submit().unwrap();
        c.set_phase(Phase::Venous);
        c.finish_submit(req.ticket, ok_response("X"));
        assert!(c.view().processed.as_ref().unwrap().title.contains("Arterial Phase"));
    }

    #[test]
    fn application_failure_alerts_server_message() {
        let mut c = UploadController::new(Phase::Arterial);
        c.select(png("scan.png")).unwrap();
        let req = c.begin_submit().unwrap();
        let outcome = Ok(ProcessResponse {
            success: false,
            error: Some("E".into()),
            ..Default::default()
        });
        assert_eq!(c.finish_submit(req.ticket, outcome), Completion::Failed("E".into()));
        assert_eq!(c.view().alert.as_deref(), Some("Error processing image: E"));
        assert_eq!(c.view().submit_state, SubmitState::Failed);
        assert!(c.view().trigger_enabled);
        assert!(!c.view().results_visible);
    }

    #[test]
    fn application_failure_without_message_uses_default() {
        let mut c = UploadController::new(Phase::Arterial);
        c.select(png("scan.png")).unwrap();
        let req = c.begin_submit().unwrap();
        let outcome = Ok(ProcessResponse::default());
        assert_eq!(
            c.finish_submit(req.ticket, outcome),
            Completion::Failed("Processing failed".into())
        );
    }

    #[test]
    fn transport_failure_resets_trigger_and_busy() {
        let mut c = UploadController::new(Phase::Arterial);
        c.select(png("scan.png")).unwrap();
        let req = c.begin_submit().unwrap();
        let completion = c.finish_submit(req.ticket, Err(ClientError::Status(502)));
        assert_eq!(completion, Completion::Failed("Processing failed".into()));
        assert!(c.view().trigger_enabled);
        assert!(!c.view().busy);

        assert!(c.dismiss_alert().is_some());
        assert_eq!(c.view().submit_state, SubmitState::Idle);
        assert!(c.begin_submit().is_ok());
    }

    #[test]
    fn stale_completion_is_ignored() {
        let mut c = UploadController::new(Phase::Arterial);
        c.select(png("scan.png")).unwrap();
        let first = c.begin_submit().unwrap();
        assert_eq!(c.cancel(), Some(first.ticket));
        assert_eq!(c.view().alert.as_deref(), Some("Error processing image: Cancelled"));
        assert!(!c.view().busy);
        c.dismiss_alert();

        let second = c.begin_submit().unwrap();
        assert_ne!(first.ticket, second.ticket);
        assert_eq!(c.finish_submit(first.ticket, ok_response("old")), Completion::Stale);
        assert_eq!(c.view().submit_state, SubmitState::Submitting);
        assert!(c.view().busy);

        c.finish_submit(second.ticket, ok_response("new"));
        assert_eq!(c.view().processed.as_ref().unwrap().source, "new");
    }

    #[test]
    fn selection_during_submission_keeps_trigger_disabled() {
        let mut c = UploadController::new(Phase::Arterial);
        c.select(png("one.png")).unwrap();
        let req = c.begin_submit().unwrap();
        c.select(png("two.png")).unwrap();
        assert!(!c.view().trigger_enabled);
        c.finish_submit(req.ticket, ok_response("X"));
        assert!(c.view().trigger_enabled);
        assert_eq!(c.pending().map(|f| f.name.as_str()), Some("two.png"));
    }
}
