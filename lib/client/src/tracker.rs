use crate::api::encode;
use crate::{STATUS_OK, STATUS_SESSION_EXPIRED, STATUS_UNAUTHENTICATED, STATUS_UNREACHABLE};
use std::time::Duration;
use tracing::warn;

/// How long to wait before navigating to the login view on session expiry.
pub const REDIRECT_DELAY: Duration = Duration::from_millis(1500);

/// Severity of a user-facing notice.
///
/// The tracker itself only ever raises [MessageKind::Error]; pages report the
/// happy path of their own operations with [MessageKind::Success].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

/// The page-side collaborator of an [OperationTracker].
///
/// In the browser this is backed by the DOM, in a terminal by stderr, in tests by a
/// recorder. The tracker guarantees `show_busy`/`clear_busy` pair up exactly once
/// per logical operation.
pub trait StatusSink {
    /// Shows the busy indicator with the given message.
    fn show_busy(&mut self, message: &str);
    /// Clears the busy indicator.
    fn clear_busy(&mut self);
    /// Displays a notice to the user.
    fn display(&mut self, kind: MessageKind, message: &str);
    /// Schedules a navigation to `target` after `delay`.
    fn schedule_redirect(&mut self, target: &str, delay: Duration);
}

#[derive(Debug)]
struct Busy {
    remaining: u32,
}

/// Coordinates the busy state of one page.
///
/// A page declares up front how many concurrent exchanges make up one logical
/// operation; the tracker keeps a single busy indicator alive until the last of
/// them completes, in whatever order the completions arrive. Starting a second
/// operation while one is outstanding is rejected, never queued.
pub struct OperationTracker<S> {
    sink: S,
    busy: Option<Busy>,
    redirect_scheduled: bool,
    login_page: String,
    location: String,
}

impl<S: StatusSink> OperationTracker<S> {
    /// Creates a tracker for a page.
    ///
    /// `login_page` is the navigation target on session expiry and `location` the
    /// page's own address, carried along so the user comes back after logging in.
    pub fn new(sink: S, login_page: impl Into<String>, location: impl Into<String>) -> Self {
        OperationTracker {
            sink,
            busy: None,
            redirect_scheduled: false,
            login_page: login_page.into(),
            location: location.into(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_some()
    }

    /// Starts a logical operation made of `expected` concurrent exchanges.
    ///
    /// Returns `false` without touching the current state when an operation is
    /// already under way.
    pub fn begin(&mut self, message: &str, expected: u32) -> bool {
        if self.busy.is_some() {
            self.sink
                .display(MessageKind::Error, "Another operation is going on ...");
            return false;
        }
        self.sink.show_busy(message);
        self.busy = Some(Busy {
            remaining: expected.max(1),
        });
        self.redirect_scheduled = false;
        true
    }

    /// Records the completion of one exchange of the current operation.
    ///
    /// Returns whether `status` indicates success. On failure a user-facing message
    /// is derived from the status catalog (or taken from `override_message`), and a
    /// session-expiry status schedules a single redirect to the login view.
    pub fn complete(&mut self, status: u16, body: &str, override_message: Option<&str>) -> bool {
        let Some(busy) = &mut self.busy else {
            warn!(status, "completion received while idle");
            self.sink
                .display(MessageKind::Error, "No on-going operation ...");
            return false;
        };
        busy.remaining -= 1;
        if busy.remaining == 0 {
            self.sink.clear_busy();
            self.busy = None;
        }
        if status != STATUS_OK {
            match override_message {
                Some(message) => self.sink.display(MessageKind::Error, message),
                None => {
                    let message = http_error_message(status, body);
                    self.sink.display(MessageKind::Error, &message);
                }
            }
            if (status == STATUS_UNAUTHENTICATED || status == STATUS_SESSION_EXPIRED)
                && !self.redirect_scheduled
            {
                self.redirect_scheduled = true;
                let target = format!("{}?next={}", self.login_page, encode(&self.location));
                self.sink.schedule_redirect(&target, REDIRECT_DELAY);
            }
        }
        status == STATUS_OK
    }

    /// Records a locally failed exchange, one that never reached the network
    /// because a precondition did not hold.
    ///
    /// Decrements the same counter as [OperationTracker::complete] so a partially
    /// issued batch still drains to idle. Always returns `false`.
    pub fn abort(&mut self, message: &str) -> bool {
        let Some(busy) = &mut self.busy else {
            warn!("abort received while idle");
            self.sink
                .display(MessageKind::Error, "No on-going operation ...");
            return false;
        };
        busy.remaining -= 1;
        if busy.remaining == 0 {
            self.sink.clear_busy();
            self.busy = None;
        }
        self.sink.display(MessageKind::Error, message);
        false
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

/// Maps a terminal status to its user-facing message, with the response body
/// appended verbatim when present.
pub fn http_error_message(status: u16, body: &str) -> String {
    let mut message = match status {
        STATUS_UNREACHABLE => "The server cannot be reached.".to_owned(),
        400 => "There is a problem with the request, see details.".to_owned(),
        401 => "You must be logged in to perform this operation.".to_owned(),
        403 => "You are not authorized to perform this operation.".to_owned(),
        404 => "Can't find the requested data.".to_owned(),
        440 => "The session has expired, login again to continue.".to_owned(),
        461 => "The SPARQL query failed.".to_owned(),
        500 => "An unexpected error occurred on the server.".to_owned(),
        501 => "This operation is not supported.".to_owned(),
        560 => "An unknown error occurred on the server.".to_owned(),
        _ => format!("The connection failed. ({status})"),
    };
    if !body.is_empty() {
        message.push('\n');
        message.push_str(body);
    }
    message
}
