use crate::grammar::NodeId;
use std::collections::BTreeMap;

/// Something that happened during a transformation run.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The run started and will visit these layers in order.
    Started { layers: Vec<u32> },
    /// The engine moved on to a layer.
    LayerEntered { layer: u32 },
    /// A rule was applied at a match. `nodes` maps pattern ids to the host nodes matched.
    RuleApplied {
        rule: String,
        layer: u32,
        step: usize,
        nodes: BTreeMap<i32, NodeId>,
    },
    /// No rule of the layer applies any more.
    LayerFinished { layer: u32, applications: usize },
    /// The run ended normally after `steps` rule applications.
    Finished { steps: usize },
    /// The run stopped early.
    Aborted { reason: String },
}

/// Receives events while a transformation runs.
/// Events are only borrowed for the duration of the call.
pub trait EventListener {
    fn on_event(&mut self, event: &Event);
}

impl<F> EventListener for F
where
    F: FnMut(&Event),
{
    fn on_event(&mut self, event: &Event) {
        self(event)
    }
}

/// Writes every event to the log.
#[derive(Debug, Default)]
pub struct LoggingListener;

impl EventListener for LoggingListener {
    fn on_event(&mut self, event: &Event) {
        match event {
            Event::Started { layers } => log::info!("Transformation started, layers {:?}", layers),
            Event::LayerEntered { layer } => log::info!("Entering layer {}", layer),
            Event::RuleApplied {
                rule,
                layer,
                step,
                nodes,
            } => log::debug!("Step {}: applied {} (layer {}) at {:?}", step, rule, layer, nodes),
            Event::LayerFinished {
                layer,
                applications,
            } => log::info!("Layer {} done after {} applications", layer, applications),
            Event::Finished { steps } => log::info!("Transformation finished after {} steps", steps),
            Event::Aborted { reason } => log::warn!("Transformation aborted: {}", reason),
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(usize);

/// Registered listeners, notified in subscription order.
#[derive(Default)]
pub struct Subscribers<'a> {
    listeners: Vec<(SubscriptionId, Box<dyn EventListener + 'a>)>,
    next_id: usize,
}

impl<'a> Subscribers<'a> {
    pub fn subscribe(&mut self, listener: Box<dyn EventListener + 'a>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn notify(&mut self, event: &Event) {
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_delivery_order_and_unsubscribe() {
        let seen = RefCell::new(Vec::new());
        let mut subscribers = Subscribers::default();
        assert!(subscribers.is_empty());
        let first = subscribers.subscribe(Box::new(|e: &Event| seen.borrow_mut().push((1, e.clone()))));
        subscribers.subscribe(Box::new(|e: &Event| seen.borrow_mut().push((2, e.clone()))));

        subscribers.notify(&Event::Finished { steps: 0 });
        assert!(subscribers.unsubscribe(first));
        assert!(!subscribers.unsubscribe(first));
        assert_eq!(subscribers.len(), 1);
        subscribers.notify(&Event::Finished { steps: 1 });
        drop(subscribers);

        let seen = seen.into_inner();
        let order: Vec<i32> = seen.iter().map(|(who, _)| *who).collect();
        assert_eq!(order, vec![1, 2, 2]);
        assert_eq!(seen[2].1, Event::Finished { steps: 1 });
    }
}
