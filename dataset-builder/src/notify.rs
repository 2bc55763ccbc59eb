//! Change notification for collaborators that mirror the selection state (UI, viewer).
//!
//! Subscribers receive typed `Change` events over unbounded channels, optionally filtered to one
//! `Category`. Events are sent only after a mutation has been fully applied. A subscriber that has
//! gone away is dropped from the list without affecting delivery to the others.
//!
use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::{
    channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender},
    Stream,
};
use tracing::warn;

use crate::axes::Axis;

/// The part of the selection state an event concerns
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Dataset,
    Variable,
    AxisMapping,
    Slice,
    Ui,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    /// A new dataset was opened
    Dataset { path: String },

    /// The active variable changed
    Variable { name: String },

    AxisMapping {
        axis: Axis,
        coordinate: Option<String>,
    },

    Slice { coordinate: String },

    TimeIndex { index: usize },

    Ui,

    /// A configuration was imported, replacing the whole state
    Imported { path: String },
}

impl Change {
    /// The category of this change, or `None` if it concerns every category
    pub fn category(&self) -> Option<Category> {
        match self {
            Change::Dataset { .. } => Some(Category::Dataset),
            Change::Variable { .. } => Some(Category::Variable),
            Change::AxisMapping { .. } => Some(Category::AxisMapping),
            Change::Slice { .. } | Change::TimeIndex { .. } => Some(Category::Slice),
            Change::Ui => Some(Category::Ui),
            Change::Imported { .. } => None,
        }
    }

    pub fn concerns(&self, category: Category) -> bool {
        self.category().map_or(true, |c| c == category)
    }
}

struct Subscriber {
    filter: Option<Category>,
    sender: UnboundedSender<Change>,
}

#[derive(Default)]
pub struct Notifier {
    subscribers: Vec<Subscriber>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to changes, all of them or only those concerning `filter`.
    ///
    pub fn subscribe(&mut self, filter: Option<Category>) -> Subscription {
        let (sender, receiver) = unbounded();
        self.subscribers.push(Subscriber { filter, sender });

        Subscription { receiver }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn notify(&mut self, change: Change) {
        self.subscribers.retain(|subscriber| {
            let wanted = subscriber
                .filter
                .map_or(true, |category| change.concerns(category));
            if !wanted {
                return true;
            }

            match subscriber.sender.unbounded_send(change.clone()) {
                Ok(()) => true,
                Err(_) => {
                    warn!(?change, "dropping disconnected subscriber");
                    false
                }
            }
        });
    }
}

/// The receiving end of a subscription. Dropping it unsubscribes.
///
pub struct Subscription {
    receiver: UnboundedReceiver<Change>,
}

impl Subscription {
    /// Next pending change, if any, without waiting
    pub fn try_next(&mut self) -> Option<Change> {
        self.receiver.try_next().ok().flatten()
    }

    /// All pending changes, without waiting
    pub fn drain(&mut self) -> Vec<Change> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

impl Stream for Subscription {
    type Item = Change;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures::StreamExt;

    fn slice_change() -> Change {
        Change::Slice {
            coordinate: String::from("lat"),
        }
    }

    #[test]
    fn test_notify_all() {
        let mut notifier = Notifier::new();
        let mut a = notifier.subscribe(None);
        let mut b = notifier.subscribe(None);

        notifier.notify(slice_change());
        notifier.notify(Change::Ui);

        assert_eq!(a.drain(), vec![slice_change(), Change::Ui]);
        assert_eq!(b.drain(), vec![slice_change(), Change::Ui]);
        assert_eq!(a.try_next(), None);
    }

    #[test]
    fn test_filter() {
        let mut notifier = Notifier::new();
        let mut ui = notifier.subscribe(Some(Category::Ui));
        let mut slices = notifier.subscribe(Some(Category::Slice));

        notifier.notify(slice_change());
        notifier.notify(Change::TimeIndex { index: 3 });
        notifier.notify(Change::Ui);

        assert_eq!(ui.drain(), vec![Change::Ui]);
        assert_eq!(
            slices.drain(),
            vec![slice_change(), Change::TimeIndex { index: 3 }]
        );
    }

    #[test]
    fn test_imported_reaches_every_filter() {
        let mut notifier = Notifier::new();
        let mut ui = notifier.subscribe(Some(Category::Ui));
        let mut axes = notifier.subscribe(Some(Category::AxisMapping));

        let imported = Change::Imported {
            path: String::from("sst.zarr"),
        };
        notifier.notify(imported.clone());

        assert_eq!(ui.drain(), vec![imported.clone()]);
        assert_eq!(axes.drain(), vec![imported]);
    }

    #[test]
    fn test_dropped_subscriber() {
        let mut notifier = Notifier::new();
        let dropped = notifier.subscribe(None);
        let mut kept = notifier.subscribe(None);
        drop(dropped);

        notifier.notify(Change::Ui);
        assert_eq!(notifier.len(), 1);
        assert_eq!(kept.drain(), vec![Change::Ui]);
    }

    #[tokio::test]
    async fn test_stream() {
        let mut notifier = Notifier::new();
        let subscription = notifier.subscribe(Some(Category::Variable));
        notifier.notify(Change::Variable {
            name: String::from("sst"),
        });
        drop(notifier);

        let changes: Vec<Change> = subscription.collect().await;
        assert_eq!(
            changes,
            vec![Change::Variable {
                name: String::from("sst")
            }]
        );
    }
}
