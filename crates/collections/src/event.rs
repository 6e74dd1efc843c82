//! Collection events and the per-attribute listener chain.
//!
//! Listeners run synchronously in registration order. `append` and `set` listeners may replace
//! the value being added or abort the mutation; every other hook can only abort. An abort stops
//! the chain and propagates to the caller as [`CollectionError::Listener`].
//!
//! [`CollectionError::Listener`]: crate::error::CollectionError::Listener

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use strum::Display;
use tracing::trace;

use crate::error::{ListenerError, Result};
use crate::instance::Instance;
use crate::member::Member;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
	Append,
	AppendWoMutation,
	Remove,
	Set,
	BulkReplace,
	InitCollection,
	DisposeCollection,
}

/// Token identifying the attribute and operation that triggered an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Initiator {
	attribute: Arc<str>,
	kind: EventKind,
}

impl Initiator {
	pub fn new(attribute: impl Into<Arc<str>>, kind: EventKind) -> Self {
		Self {
			attribute: attribute.into(),
			kind,
		}
	}

	/// Qualified attribute name, `Class.key`.
	pub fn attribute(&self) -> &str {
		&self.attribute
	}

	pub fn kind(&self) -> EventKind {
		self.kind
	}

	pub fn with_kind(&self, kind: EventKind) -> Self {
		Self {
			attribute: self.attribute.clone(),
			kind,
		}
	}
}

impl fmt::Display for Initiator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({})", self.attribute, self.kind)
	}
}

/// Verdict of an `append` or `set` listener.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventFlow<V> {
	#[default]
	Continue,
	/// Store this value instead; later listeners see the replacement.
	Replace(V),
	Abort(ListenerError),
}

impl<V> EventFlow<V> {
	pub fn abort(message: impl Into<String>) -> Self {
		EventFlow::Abort(ListenerError::new(message))
	}
}

/// Receiver of collection events for one attribute.
///
/// Every hook defaults to a no-op so implementors override only what they observe.
#[allow(unused_variables)]
pub trait CollectionListener<V: Member>: Send + Sync {
	fn append(&self, owner: &Instance, value: &V, initiator: &Initiator) -> EventFlow<V> {
		EventFlow::Continue
	}

	fn append_wo_mutation(&self, owner: &Instance, value: &V, initiator: &Initiator) -> Result<(), ListenerError> {
		Ok(())
	}

	fn remove(&self, owner: &Instance, value: &V, initiator: &Initiator) -> Result<(), ListenerError> {
		Ok(())
	}

	fn set(&self, owner: &Instance, value: &V, old: Option<&V>, initiator: &Initiator) -> EventFlow<V> {
		EventFlow::Continue
	}

	fn bulk_replace(&self, owner: &Instance, values: &[V], initiator: &Initiator) -> Result<(), ListenerError> {
		Ok(())
	}

	fn init_collection(&self, owner: &Instance, initiator: &Initiator) -> Result<(), ListenerError> {
		Ok(())
	}

	fn dispose_collection(&self, owner: &Instance, values: &[V], initiator: &Initiator) -> Result<(), ListenerError> {
		Ok(())
	}
}

type Chain<V> = Vec<Arc<dyn CollectionListener<V>>>;

/// Ordered listener chain, read lock-free during dispatch.
pub struct Listeners<V: Member> {
	chain: ArcSwap<Chain<V>>,
}

impl<V: Member> Default for Listeners<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V: Member> fmt::Debug for Listeners<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Listeners").field("len", &self.len()).finish()
	}
}

impl<V: Member> Listeners<V> {
	pub fn new() -> Self {
		Self {
			chain: ArcSwap::from_pointee(Vec::new()),
		}
	}

	pub fn listen(&self, listener: Arc<dyn CollectionListener<V>>) {
		self.chain.rcu(|cur| {
			let mut next = (**cur).clone();
			next.push(listener.clone());
			next
		});
	}

	pub fn on_append<F>(&self, f: F)
	where
		F: Fn(&Instance, &V, &Initiator) -> EventFlow<V> + Send + Sync + 'static,
	{
		self.listen(Arc::new(OnAppend(f)));
	}

	pub fn on_append_wo_mutation<F>(&self, f: F)
	where
		F: Fn(&Instance, &V, &Initiator) -> Result<(), ListenerError> + Send + Sync + 'static,
	{
		self.listen(Arc::new(OnAppendWoMutation(f)));
	}

	pub fn on_remove<F>(&self, f: F)
	where
		F: Fn(&Instance, &V, &Initiator) -> Result<(), ListenerError> + Send + Sync + 'static,
	{
		self.listen(Arc::new(OnRemove(f)));
	}

	pub fn on_set<F>(&self, f: F)
	where
		F: Fn(&Instance, &V, Option<&V>, &Initiator) -> EventFlow<V> + Send + Sync + 'static,
	{
		self.listen(Arc::new(OnSet(f)));
	}

	pub fn len(&self) -> usize {
		self.chain.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub(crate) fn dispatch_append(&self, owner: &Instance, value: V, initiator: &Initiator) -> Result<V> {
		trace!(attribute = initiator.attribute(), kind = %initiator.kind(), ?value, "append");
		let chain = self.chain.load();
		let mut value = value;
		for listener in chain.iter() {
			match listener.append(owner, &value, initiator) {
				EventFlow::Continue => {}
				EventFlow::Replace(replacement) => value = replacement,
				EventFlow::Abort(err) => return Err(err.into()),
			}
		}
		Ok(value)
	}

	pub(crate) fn dispatch_set(&self, owner: &Instance, value: V, old: Option<&V>, initiator: &Initiator) -> Result<V> {
		trace!(attribute = initiator.attribute(), ?value, ?old, "set");
		let chain = self.chain.load();
		let mut value = value;
		for listener in chain.iter() {
			match listener.set(owner, &value, old, initiator) {
				EventFlow::Continue => {}
				EventFlow::Replace(replacement) => value = replacement,
				EventFlow::Abort(err) => return Err(err.into()),
			}
		}
		Ok(value)
	}

	pub(crate) fn dispatch_append_wo_mutation(&self, owner: &Instance, value: &V, initiator: &Initiator) -> Result<()> {
		trace!(attribute = initiator.attribute(), ?value, "append_wo_mutation");
		self.each(|l| l.append_wo_mutation(owner, value, initiator))
	}

	pub(crate) fn dispatch_remove(&self, owner: &Instance, value: &V, initiator: &Initiator) -> Result<()> {
		trace!(attribute = initiator.attribute(), kind = %initiator.kind(), ?value, "remove");
		self.each(|l| l.remove(owner, value, initiator))
	}

	pub(crate) fn dispatch_bulk_replace(&self, owner: &Instance, values: &[V], initiator: &Initiator) -> Result<()> {
		trace!(attribute = initiator.attribute(), count = values.len(), "bulk_replace");
		self.each(|l| l.bulk_replace(owner, values, initiator))
	}

	pub(crate) fn dispatch_init(&self, owner: &Instance, initiator: &Initiator) -> Result<()> {
		self.each(|l| l.init_collection(owner, initiator))
	}

	pub(crate) fn dispatch_dispose(&self, owner: &Instance, values: &[V], initiator: &Initiator) -> Result<()> {
		trace!(attribute = initiator.attribute(), count = values.len(), "dispose_collection");
		self.each(|l| l.dispose_collection(owner, values, initiator))
	}

	fn each(&self, mut f: impl FnMut(&dyn CollectionListener<V>) -> Result<(), ListenerError>) -> Result<()> {
		let chain = self.chain.load();
		for listener in chain.iter() {
			f(listener.as_ref())?;
		}
		Ok(())
	}
}

struct OnAppend<F>(F);

impl<V, F> CollectionListener<V> for OnAppend<F>
where
	V: Member,
	F: Fn(&Instance, &V, &Initiator) -> EventFlow<V> + Send + Sync,
{
	fn append(&self, owner: &Instance, value: &V, initiator: &Initiator) -> EventFlow<V> {
		(self.0)(owner, value, initiator)
	}
}

struct OnAppendWoMutation<F>(F);

impl<V, F> CollectionListener<V> for OnAppendWoMutation<F>
where
	V: Member,
	F: Fn(&Instance, &V, &Initiator) -> Result<(), ListenerError> + Send + Sync,
{
	fn append_wo_mutation(&self, owner: &Instance, value: &V, initiator: &Initiator) -> Result<(), ListenerError> {
		(self.0)(owner, value, initiator)
	}
}

struct OnRemove<F>(F);

impl<V, F> CollectionListener<V> for OnRemove<F>
where
	V: Member,
	F: Fn(&Instance, &V, &Initiator) -> Result<(), ListenerError> + Send + Sync,
{
	fn remove(&self, owner: &Instance, value: &V, initiator: &Initiator) -> Result<(), ListenerError> {
		(self.0)(owner, value, initiator)
	}
}

struct OnSet<F>(F);

impl<V, F> CollectionListener<V> for OnSet<F>
where
	V: Member,
	F: Fn(&Instance, &V, Option<&V>, &Initiator) -> EventFlow<V> + Send + Sync,
{
	fn set(&self, owner: &Instance, value: &V, old: Option<&V>, initiator: &Initiator) -> EventFlow<V> {
		(self.0)(owner, value, old, initiator)
	}
}
