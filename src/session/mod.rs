use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Identifies one submitted query. Later submissions get larger tickets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Something shown while at least one query is in flight.
pub trait LoadingIndicator: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

impl<T: LoadingIndicator> LoadingIndicator for Arc<T> {
    fn show(&self) {
        self.as_ref().show()
    }

    fn hide(&self) {
        self.as_ref().hide()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoIndicator;

impl LoadingIndicator for NoIndicator {
    fn show(&self) {}
    fn hide(&self) {}
}

/// Terminal spinner drawn on stderr.
#[derive(Default)]
pub struct Spinner {
    message: String,
    bar: Mutex<Option<ProgressBar>>,
}

impl Spinner {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            bar: Mutex::new(None),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.bar.lock().map(|b| b.is_some()).unwrap_or(false)
    }

    /// Prints a line above the spinner without tearing it.
    pub fn println(&self, line: impl AsRef<str>) {
        match self.bar.lock().ok().as_deref().and_then(Option::as_ref) {
            Some(bar) => bar.println(line.as_ref()),
            None => eprintln!("{}", line.as_ref()),
        }
    }
}

impl LoadingIndicator for Spinner {
    fn show(&self) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        if slot.is_some() {
            return;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.blue} {elapsed} {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(self.message.clone());
        pb.enable_steady_tick(Duration::from_millis(100));
        *slot = Some(pb);
    }

    fn hide(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }
}

struct Shared {
    issued: AtomicU64,
    in_flight: AtomicUsize,
    indicator: Box<dyn LoadingIndicator>,
}

/// Issues request tickets and keeps the loading indicator in step with the
/// number of queries still in flight.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("issued", &self.shared.issued.load(Ordering::SeqCst))
            .field("in_flight", &self.shared.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(NoIndicator)
    }
}

impl Session {
    pub fn new(indicator: impl LoadingIndicator + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                issued: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                indicator: Box::new(indicator),
            }),
        }
    }

    /// Starts a new query: issues the next ticket and shows the indicator.
    /// The indicator is hidden again once every returned guard is dropped.
    pub fn begin(&self) -> InFlight {
        let ticket = RequestTicket(self.shared.issued.fetch_add(1, Ordering::SeqCst) + 1);
        if self.shared.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            self.shared.indicator.show();
        }
        InFlight {
            ticket,
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn latest(&self) -> Option<RequestTicket> {
        match self.shared.issued.load(Ordering::SeqCst) {
            0 => None,
            n => Some(RequestTicket(n)),
        }
    }

    pub fn is_latest(&self, ticket: RequestTicket) -> bool {
        self.latest() == Some(ticket)
    }

    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }
}

/// Outcome of settling a request against the newest issued ticket.
#[derive(Debug, PartialEq, Eq)]
pub enum Settled<T> {
    Current(RequestTicket, T),
    Stale {
        ticket: RequestTicket,
        latest: RequestTicket,
    },
}

/// Guard for one in-flight query.
pub struct InFlight {
    ticket: RequestTicket,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for InFlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight")
            .field("ticket", &self.ticket)
            .finish()
    }
}

impl InFlight {
    pub fn ticket(&self) -> RequestTicket {
        self.ticket
    }

    /// Ends the request. `value` is handed back only when no newer query
    /// was issued in the meantime.
    pub fn settle<T>(self, value: T) -> Settled<T> {
        let ticket = self.ticket;
        let latest = RequestTicket(self.shared.issued.load(Ordering::SeqCst));
        drop(self);
        if ticket == latest {
            Settled::Current(ticket, value)
        } else {
            Settled::Stale { ticket, latest }
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.shared.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.shared.indicator.hide();
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::LoadingIndicator;

    /// Indicator that records its state for assertions.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingIndicator {
        pub(crate) visible: Arc<AtomicBool>,
        pub(crate) shows: Arc<AtomicUsize>,
    }

    impl RecordingIndicator {
        pub(crate) fn is_visible(&self) -> bool {
            self.visible.load(Ordering::SeqCst)
        }

        pub(crate) fn show_count(&self) -> usize {
            self.shows.load(Ordering::SeqCst)
        }
    }

    impl LoadingIndicator for RecordingIndicator {
        fn show(&self) {
            self.visible.store(true, Ordering::SeqCst);
            self.shows.fetch_add(1, Ordering::SeqCst);
        }

        fn hide(&self) {
            self.visible.store(false, Ordering::SeqCst);
        }
    }
}
