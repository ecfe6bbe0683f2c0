use std::sync::Arc;
use std::time::{Duration, Instant};

use binroute_core::{
    dispatch::FieldWorker,
    model::ScoredBin,
    ports::PortError,
    service::{CollectionService, CycleSnapshot},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    Bins,
    Map,
    Routes,
    Analytics,
    Dispatch,
}

impl Screen {
    pub(crate) const ALL: [Self; 5] = [
        Self::Bins,
        Self::Map,
        Self::Routes,
        Self::Analytics,
        Self::Dispatch,
    ];

    pub(crate) fn title(self) -> &'static str {
        match self {
            Self::Bins => "Bins",
            Self::Map => "Map",
            Self::Routes => "Routes",
            Self::Analytics => "Analytics",
            Self::Dispatch => "Dispatch",
        }
    }

    pub(crate) fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|screen| *screen == self)
            .unwrap_or(0)
    }

    pub(crate) fn next(self) -> Self {
        let index = (self.position() + 1) % Self::ALL.len();
        Self::ALL.get(index).copied().unwrap_or(Self::Bins)
    }

    pub(crate) fn previous(self) -> Self {
        let index = (self.position() + Self::ALL.len() - 1) % Self::ALL.len();
        Self::ALL.get(index).copied().unwrap_or(Self::Bins)
    }
}

pub(crate) struct App {
    pub service: Arc<CollectionService>,

    pub screen: Screen,
    pub snapshot: Option<CycleSnapshot>,
    pub bin_list_index: usize,

    pub workers: Vec<FieldWorker>,
    pub worker_index: usize,

    pub refresh_interval: Option<Duration>,
    pub last_refresh: Option<Instant>,

    pub is_loading: bool,
    pub error_message: Option<String>,
    pub status_message: Option<String>,
}

impl App {
    pub(crate) fn new(
        service: Arc<CollectionService>,
        workers: Vec<FieldWorker>,
        refresh_interval: Option<Duration>,
    ) -> Self {
        Self {
            service,
            screen: Screen::Bins,
            snapshot: None,
            bin_list_index: 0,
            workers,
            worker_index: 0,
            refresh_interval,
            last_refresh: None,
            is_loading: false,
            error_message: None,
            status_message: None,
        }
    }

    /// True before the first cycle and whenever the refresh interval has elapsed.
    pub(crate) fn refresh_due(&self, now: Instant) -> bool {
        match (self.last_refresh, self.refresh_interval) {
            (None, _) => true,
            (Some(last), Some(interval)) => now.duration_since(last) >= interval,
            (Some(_), None) => false,
        }
    }

    /// Store the outcome of a cycle. A failed cycle keeps the previous snapshot.
    pub(crate) fn apply_cycle(&mut self, result: Result<CycleSnapshot, PortError>, now: Instant) {
        self.last_refresh = Some(now);
        match result {
            Ok(snapshot) => {
                let selected = self.selected_bin().map(|scored| scored.bin.id.clone());
                self.bin_list_index = selected
                    .and_then(|id| snapshot.bins.iter().position(|scored| scored.bin.id == id))
                    .unwrap_or(0);
                self.snapshot = Some(snapshot);
                self.error_message = None;
            }
            Err(err) => {
                let stale = if self.snapshot.is_some() {
                    ", showing previous data"
                } else {
                    ""
                };
                self.error_message = Some(format!("Refresh failed: {err}{stale}"));
            }
        }
    }

    pub(crate) fn bins(&self) -> &[ScoredBin] {
        self.snapshot
            .as_ref()
            .map(|snapshot| snapshot.bins.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn selected_bin(&self) -> Option<&ScoredBin> {
        self.bins().get(self.bin_list_index)
    }

    pub(crate) fn selected_worker(&self) -> Option<&FieldWorker> {
        self.workers.get(self.worker_index)
    }

    pub(crate) fn move_up(&mut self) {
        self.bin_list_index = self.bin_list_index.saturating_sub(1);
    }

    pub(crate) fn move_down(&mut self) {
        if self.bin_list_index + 1 < self.bins().len() {
            self.bin_list_index += 1;
        }
    }

    pub(crate) fn cycle_worker(&mut self) {
        if !self.workers.is_empty() {
            self.worker_index = (self.worker_index + 1) % self.workers.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screens_wrap_in_both_directions() {
        assert_eq!(Screen::Dispatch.next(), Screen::Bins);
        assert_eq!(Screen::Bins.previous(), Screen::Dispatch);
        assert_eq!(Screen::Map.next().previous(), Screen::Map);
    }
}
