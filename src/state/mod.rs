// State management module.
// Grid selection, video lists, search input, mock subscriptions and the console log.

pub mod console;
pub mod grid;
pub mod search;
pub mod subscriptions;
pub mod videos;

pub use console::{ConsoleLevel, ConsoleMessage, ConsoleState};
pub use grid::{GridState, LoadingState};
pub use search::SearchTabState;
pub use subscriptions::{Channel, ChannelFilter, SubscriptionsTabState};
pub use videos::VideoListState;
