// Video list state shared by the Feed and Search tabs.
// Tracks in-flight fetches and folds fetch outcomes into the grid.

use chrono::{DateTime, Utc};

use crate::feed::{FetchOutcome, VideoSummary};

use super::grid::{GridState, LoadingState};

#[derive(Debug, Clone)]
pub struct VideoListState {
    pub grid: GridState<VideoSummary>,
    /// When the grid was last filled from a successful fetch.
    pub loaded_at: Option<DateTime<Utc>>,
    in_flight: usize,
}

impl VideoListState {
    pub fn new(columns: usize) -> Self {
        Self {
            grid: GridState::new(columns),
            loaded_at: None,
            in_flight: 0,
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight > 0
    }

    /// Record a fetch start. Loaded videos stay visible during a refresh.
    pub fn begin_fetch(&mut self) {
        self.in_flight += 1;
        if !self.grid.data.is_loaded() {
            self.grid.set_loading();
        }
    }

    /// Record a fetch end and apply its outcome.
    pub fn finish_fetch(&mut self, outcome: &FetchOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);

        match outcome {
            FetchOutcome::Success(items) => {
                self.grid.set_loaded(items.clone());
                self.loaded_at = Some(Utc::now());
            }
            FetchOutcome::EmptyOrAuthError(err) => self.grid.set_error(err.message()),
            FetchOutcome::AuthExpired => self.clear(),
            FetchOutcome::TransientFailure(message) => {
                self.grid
                    .set_error(format!("Failed to fetch videos: {}", message));
            }
        }
    }

    /// Drop results, e.g. after logout or credential expiry.
    /// Fetches still running are abandoned.
    pub fn clear(&mut self) {
        self.grid.clear();
        self.loaded_at = None;
        self.in_flight = 0;
    }

    pub fn selected_video(&self) -> Option<&VideoSummary> {
        self.grid.selected_item()
    }

    pub fn status(&self) -> &LoadingState<Vec<VideoSummary>> {
        &self.grid.data
    }
}
