use shared::{domain::ProductId, error::UserNotice};
use tokio::sync::broadcast;

pub const EVENT_BUS_CAPACITY: usize = 256;

pub type EventBus = broadcast::Sender<StoreEvent>;

pub fn event_bus() -> EventBus {
    let (events, _) = broadcast::channel(EVENT_BUS_CAPACITY);
    events
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChanged {
    pub count: usize,
    pub selected: Vec<ProductId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    CatalogLoaded {
        laptops: usize,
        accessories: usize,
    },
    CatalogUnavailable {
        reason: String,
    },
    SelectionChanged(SelectionChanged),
    CartUpdated {
        item_count: u32,
    },
    LoginStatusChanged {
        logged_in: bool,
        display_name: String,
    },
    Notice(UserNotice),
}
