//! Priority-ordered publish/subscribe for model events.

/// Delivery tier. Higher tiers run first; equal tiers run in subscription order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
	Lowest,
	Low,
	#[default]
	Normal,
	High,
	Highest,
}

/// Handle returned by [`Emitter::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber<E> {
	id: SubscriptionId,
	priority: Priority,
	handler: Box<dyn FnMut(&E)>,
}

/// Event topic with prioritized handlers.
pub struct Emitter<E> {
	subscribers: Vec<Subscriber<E>>,
	next_id: u64,
}

impl<E> Default for Emitter<E> {
	fn default() -> Self {
		Self {
			subscribers: Vec::new(),
			next_id: 0,
		}
	}
}

impl<E> std::fmt::Debug for Emitter<E> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Emitter")
			.field("subscribers", &self.subscribers.len())
			.finish()
	}
}

impl<E> Emitter<E> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handler` at `priority`.
	pub fn subscribe(&mut self, priority: Priority, handler: impl FnMut(&E) + 'static) -> SubscriptionId {
		let id = SubscriptionId(self.next_id);
		self.next_id += 1;
		// Insert after every subscriber of the same or a higher tier.
		let at = self
			.subscribers
			.iter()
			.position(|s| s.priority < priority)
			.unwrap_or(self.subscribers.len());
		self.subscribers.insert(
			at,
			Subscriber {
				id,
				priority,
				handler: Box::new(handler),
			},
		);
		id
	}

	/// Removes a subscription. Returns `false` if it was already gone.
	pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
		let before = self.subscribers.len();
		self.subscribers.retain(|s| s.id != id);
		before != self.subscribers.len()
	}

	pub fn emit(&mut self, event: &E) {
		for subscriber in &mut self.subscribers {
			(subscriber.handler)(event);
		}
	}

	pub fn is_empty(&self) -> bool {
		self.subscribers.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;

	use super::*;

	#[test]
	fn tiers_run_high_to_low_in_subscription_order() {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let mut emitter = Emitter::<u32>::new();
		for (label, priority) in [
			("normal-1", Priority::Normal),
			("lowest", Priority::Lowest),
			("highest", Priority::Highest),
			("normal-2", Priority::Normal),
			("high", Priority::High),
		] {
			let seen = Rc::clone(&seen);
			emitter.subscribe(priority, move |_| seen.borrow_mut().push(label));
		}
		emitter.emit(&1);
		assert_eq!(
			*seen.borrow(),
			["highest", "high", "normal-1", "normal-2", "lowest"]
		);
	}

	#[test]
	fn unsubscribed_handlers_stop_receiving() {
		let count = Rc::new(RefCell::new(0));
		let mut emitter = Emitter::<()>::new();
		let id = {
			let count = Rc::clone(&count);
			emitter.subscribe(Priority::Normal, move |_| *count.borrow_mut() += 1)
		};
		emitter.emit(&());
		assert!(emitter.unsubscribe(id));
		assert!(!emitter.unsubscribe(id));
		emitter.emit(&());
		assert_eq!(*count.borrow(), 1);
	}
}
