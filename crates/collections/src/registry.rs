//! Process-wide cache of classified container types.
//!
//! Reads load an immutable snapshot without locking. Publication clones the snapshot, inserts the
//! new table and installs it with a compare-and-swap; when two threads classify the same type
//! concurrently the first published table wins and the loser adopts it.

use std::any::{Any, TypeId};
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap as HashMap;
use tracing::{debug, warn};

use crate::classify::{RoleTable, classify};
use crate::descriptor::Container;
use crate::error::ConfigurationError;

type ErasedTable = Arc<dyn Any + Send + Sync>;

#[derive(Clone, Default)]
struct RolesSnapshot {
	by_type: HashMap<TypeId, ErasedTable>,
}

pub struct RoleRegistry {
	snap: ArcSwap<RolesSnapshot>,
}

impl Default for RoleRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl RoleRegistry {
	pub fn new() -> Self {
		Self {
			snap: ArcSwap::from_pointee(RolesSnapshot::default()),
		}
	}

	/// Cached table for `C`, if it has been classified.
	pub fn get<C: Container>(&self) -> Option<Arc<RoleTable<C>>> {
		let snap = self.snap.load();
		snap.by_type.get(&TypeId::of::<C>()).cloned().and_then(downcast)
	}

	/// Returns the cached table for `C`, classifying and publishing it on first use.
	///
	/// Classification failures are returned every time and never cached.
	pub fn resolve<C: Container>(&self) -> Result<Arc<RoleTable<C>>, ConfigurationError> {
		if let Some(table) = self.get::<C>() {
			return Ok(table);
		}
		let table = Arc::new(classify::<C>()?);
		Ok(self.publish(table))
	}

	pub fn len(&self) -> usize {
		self.snap.load().by_type.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn publish<C: Container>(&self, table: Arc<RoleTable<C>>) -> Arc<RoleTable<C>> {
		let key = TypeId::of::<C>();
		let mut attempts = 0usize;
		loop {
			let cur = self.snap.load_full();
			if let Some(existing) = cur.by_type.get(&key).cloned().and_then(downcast) {
				return existing;
			}

			let mut next = (*cur).clone();
			next.by_type.insert(key, table.clone() as ErasedTable);

			let next_arc = Arc::new(next);
			let prev = self.snap.compare_and_swap(&cur, next_arc);
			if Arc::ptr_eq(&prev, &cur) {
				debug!(type_name = table.type_name(), types = cur.by_type.len() + 1, "published role table");
				return table;
			}

			attempts += 1;
			if attempts % 64 == 0 {
				warn!(type_name = table.type_name(), attempts, "role registry publication still contended");
			}
		}
	}
}

fn downcast<C: Container>(erased: ErasedTable) -> Option<Arc<RoleTable<C>>> {
	erased.downcast::<RoleTable<C>>().ok()
}

static ROLES: LazyLock<RoleRegistry> = LazyLock::new(RoleRegistry::new);

/// Resolves `C` through the process-wide registry.
pub fn roles_for<C: Container>() -> Result<Arc<RoleTable<C>>, ConfigurationError> {
	ROLES.resolve::<C>()
}
