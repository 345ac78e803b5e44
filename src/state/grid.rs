// Grid state for card views.
// Loading state plus a two-dimensional selection over a flat item list.

/// Loading state for async data.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadingState<T> {
    #[default]
    Idle,
    Loading,
    Loaded(T),
    Error(String),
}

impl<T> LoadingState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadingState::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadingState::Loaded(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            LoadingState::Loaded(data) => Some(data),
            _ => None,
        }
    }
}

/// Items laid out row-major in a fixed number of columns.
#[derive(Debug, Clone)]
pub struct GridState<T> {
    pub data: LoadingState<Vec<T>>,
    selected: Option<usize>,
    columns: usize,
}

impl<T> GridState<T> {
    pub fn new(columns: usize) -> Self {
        Self {
            data: LoadingState::Idle,
            selected: None,
            columns: columns.max(1),
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn len(&self) -> usize {
        self.data.data().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the selected item.
    pub fn selected_item(&self) -> Option<&T> {
        self.data.data()?.get(self.selected?)
    }

    /// Row of the selected item, for scrolling.
    pub fn selected_row(&self) -> Option<usize> {
        self.selected.map(|i| i / self.columns)
    }

    pub fn rows(&self) -> usize {
        self.len().div_ceil(self.columns)
    }

    pub fn move_right(&mut self) {
        self.move_to(|i, len, _| (i + 1).min(len - 1));
    }

    pub fn move_left(&mut self) {
        self.move_to(|i, _, _| i.saturating_sub(1));
    }

    pub fn move_down(&mut self) {
        self.move_to(|i, len, cols| {
            if i + cols < len {
                i + cols
            } else if i / cols < (len - 1) / cols {
                // Partial last row: land on its last item
                len - 1
            } else {
                i
            }
        });
    }

    pub fn move_up(&mut self) {
        self.move_to(|i, _, cols| if i >= cols { i - cols } else { i });
    }

    fn move_to(&mut self, step: impl Fn(usize, usize, usize) -> usize) {
        let len = self.len();
        if len == 0 {
            return;
        }
        let next = match self.selected {
            Some(i) => step(i, len, self.columns),
            None => 0,
        };
        self.selected = Some(next);
    }

    /// Reset selection to first item.
    pub fn reset_selection(&mut self) {
        self.selected = if self.is_empty() { None } else { Some(0) };
    }

    /// Set loaded data.
    pub fn set_loaded(&mut self, items: Vec<T>) {
        self.data = LoadingState::Loaded(items);
        self.reset_selection();
    }

    /// Set loading state, keeping nothing from the previous load.
    pub fn set_loading(&mut self) {
        self.data = LoadingState::Loading;
        self.selected = None;
    }

    /// Set error state.
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.data = LoadingState::Error(error.into());
        self.selected = None;
    }

    /// Drop all data.
    pub fn clear(&mut self) {
        self.data = LoadingState::Idle;
        self.selected = None;
    }
}
