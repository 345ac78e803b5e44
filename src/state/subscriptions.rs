// Subscriptions tab state.
// A static mock channel grid with a subscribe toggle and a popularity filter.

use std::collections::BTreeSet;

use super::grid::GridState;

/// A channel card in the mock subscriptions grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: u32,
    pub name: &'static str,
    pub subscribers: &'static str,
    pub icon: &'static str,
}

const CHANNELS: [Channel; 8] = [
    Channel { id: 1, name: "TechChannel", subscribers: "2.5M", icon: "💻" },
    Channel { id: 2, name: "Gaming Pro", subscribers: "1.8M", icon: "🎮" },
    Channel { id: 3, name: "Music Daily", subscribers: "5.2M", icon: "🎵" },
    Channel { id: 4, name: "Fitness Guru", subscribers: "890K", icon: "💪" },
    Channel { id: 5, name: "Cooking Secrets", subscribers: "3.1M", icon: "🍳" },
    Channel { id: 6, name: "Travel Vlog", subscribers: "1.5M", icon: "✈" },
    Channel { id: 7, name: "Dev Tutorials", subscribers: "456K", icon: "🧑" },
    Channel { id: 8, name: "Movie Reviews", subscribers: "2.2M", icon: "🎬" },
];

/// Number of leading channels shown under the Popular filter.
const POPULAR_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelFilter {
    #[default]
    All,
    Popular,
    New,
}

impl ChannelFilter {
    pub fn title(&self) -> &'static str {
        match self {
            ChannelFilter::All => "All",
            ChannelFilter::Popular => "Popular",
            ChannelFilter::New => "New",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            ChannelFilter::All => ChannelFilter::Popular,
            ChannelFilter::Popular => ChannelFilter::New,
            ChannelFilter::New => ChannelFilter::All,
        }
    }

    fn apply(&self) -> Vec<Channel> {
        match self {
            ChannelFilter::All => CHANNELS.to_vec(),
            ChannelFilter::Popular => CHANNELS[..POPULAR_COUNT].to_vec(),
            ChannelFilter::New => CHANNELS[POPULAR_COUNT..].to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubscriptionsTabState {
    pub grid: GridState<Channel>,
    pub filter: ChannelFilter,
    subscribed: BTreeSet<u32>,
}

impl SubscriptionsTabState {
    pub fn new(columns: usize) -> Self {
        let mut grid = GridState::new(columns);
        grid.set_loaded(ChannelFilter::All.apply());
        Self {
            grid,
            filter: ChannelFilter::All,
            subscribed: BTreeSet::from([1, 3, 5, 7]),
        }
    }

    pub fn is_subscribed(&self, channel: &Channel) -> bool {
        self.subscribed.contains(&channel.id)
    }

    /// Toggle the subscription of the selected channel.
    pub fn toggle_selected(&mut self) -> Option<bool> {
        let id = self.grid.selected_item()?.id;
        if self.subscribed.remove(&id) {
            Some(false)
        } else {
            self.subscribed.insert(id);
            Some(true)
        }
    }

    pub fn cycle_filter(&mut self) {
        self.filter = self.filter.next();
        self.grid.set_loaded(self.filter.apply());
    }
}
