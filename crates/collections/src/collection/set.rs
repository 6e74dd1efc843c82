//! Set-shaped proxy surface.

use rustc_hash::FxHashSet as HashSet;
use tracing::debug;

use super::{Collection, first_member};
use crate::capability::Shape;
use crate::descriptor::{Container, MemberOf, MethodCall, SetOps};
use crate::error::{CollectionError, Result};

/// Right-hand side of a compound set operator.
pub enum SetOperand<'a, C: Container> {
	Set(Vec<MemberOf<C>>),
	/// Sequence-shaped values; compound operators reject these.
	Sequence(Vec<MemberOf<C>>),
	Collection(&'a Collection<C>),
}

/// Instrumented mutation surface of set-shaped collections.
///
/// The `*_update` methods accept any iterable like their native counterparts. The `*_assign`
/// forms model the compound operators: they require a set-shaped operand and treat the
/// collection itself as a no-op operand.
pub trait SetProxy {
	type Raw: SetOps;

	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn contains(&self, value: &MemberOf<Self::Raw>) -> bool;

	/// Adds `value`, firing `append_wo_mutation` instead of `append` if it is already present.
	fn add(&self, value: MemberOf<Self::Raw>) -> Result<()>;

	fn discard(&self, value: &MemberOf<Self::Raw>) -> Result<()>;

	fn remove(&self, value: &MemberOf<Self::Raw>) -> Result<()>;

	fn pop(&self) -> Result<MemberOf<Self::Raw>>;

	fn clear(&self) -> Result<()>;

	fn update(&self, values: impl IntoIterator<Item = MemberOf<Self::Raw>>) -> Result<()>;

	fn difference_update(&self, values: impl IntoIterator<Item = MemberOf<Self::Raw>>) -> Result<()>;

	fn intersection_update(&self, values: impl IntoIterator<Item = MemberOf<Self::Raw>>) -> Result<()>;

	fn symmetric_difference_update(&self, values: impl IntoIterator<Item = MemberOf<Self::Raw>>) -> Result<()>;

	/// `|=`: adds only the members not already present.
	fn union_assign(&self, operand: SetOperand<'_, Self::Raw>) -> Result<()>;

	/// `-=`
	fn difference_assign(&self, operand: SetOperand<'_, Self::Raw>) -> Result<()>;

	/// `&=`
	fn intersection_assign(&self, operand: SetOperand<'_, Self::Raw>) -> Result<()>;

	/// `^=`
	fn symmetric_difference_assign(&self, operand: SetOperand<'_, Self::Raw>) -> Result<()>;
}

impl<C: SetOps> SetProxy for Collection<C> {
	type Raw = C;

	fn len(&self) -> usize {
		self.raw().len()
	}

	fn contains(&self, value: &MemberOf<C>) -> bool {
		self.raw().contains(value)
	}

	fn add(&self, value: MemberOf<C>) -> Result<()> {
		if self.contains(&value) {
			return self.fire_append_wo_mutation(&value);
		}
		let value = self.fire_append(value)?;
		self.raw().add(value);
		Ok(())
	}

	fn discard(&self, value: &MemberOf<C>) -> Result<()> {
		if self.contains(value) {
			self.fire_remove(value)?;
			self.raw().discard(value);
		}
		Ok(())
	}

	fn remove(&self, value: &MemberOf<C>) -> Result<()> {
		if !self.contains(value) {
			return Err(CollectionError::not_found(value));
		}
		self.fire_remove(value)?;
		self.raw().discard(value);
		Ok(())
	}

	fn pop(&self) -> Result<MemberOf<C>> {
		let first = self.raw().members().into_iter().next();
		let item = first.ok_or(CollectionError::Empty("pop"))?;
		self.fire_remove(&item)?;
		self.raw().discard(&item);
		Ok(item)
	}

	fn clear(&self) -> Result<()> {
		let doomed = self.raw().members();
		for item in &doomed {
			self.remove(item)?;
		}
		Ok(())
	}

	fn update(&self, values: impl IntoIterator<Item = MemberOf<C>>) -> Result<()> {
		for value in values {
			self.add(value)?;
		}
		Ok(())
	}

	fn difference_update(&self, values: impl IntoIterator<Item = MemberOf<C>>) -> Result<()> {
		for value in values {
			self.discard(&value)?;
		}
		Ok(())
	}

	fn intersection_update(&self, values: impl IntoIterator<Item = MemberOf<C>>) -> Result<()> {
		let keep: HashSet<MemberOf<C>> = values.into_iter().collect();
		let have = self.raw().members();
		for item in have.iter().filter(|item| !keep.contains(*item)) {
			self.remove(item)?;
		}
		Ok(())
	}

	fn symmetric_difference_update(&self, values: impl IntoIterator<Item = MemberOf<C>>) -> Result<()> {
		let mut seen = HashSet::default();
		let (shared, fresh): (Vec<_>, Vec<_>) = values
			.into_iter()
			.filter(|value| seen.insert(value.clone()))
			.partition(|value| self.contains(value));
		for item in &shared {
			self.remove(item)?;
		}
		for item in fresh {
			self.add(item)?;
		}
		Ok(())
	}

	fn union_assign(&self, operand: SetOperand<'_, C>) -> Result<()> {
		let Some(values) = operand_members(self, operand)? else {
			return Ok(());
		};
		for value in values {
			if !self.contains(&value) {
				self.add(value)?;
			}
		}
		Ok(())
	}

	fn difference_assign(&self, operand: SetOperand<'_, C>) -> Result<()> {
		match operand_members(self, operand)? {
			Some(values) => self.difference_update(values),
			None => Ok(()),
		}
	}

	fn intersection_assign(&self, operand: SetOperand<'_, C>) -> Result<()> {
		match operand_members(self, operand)? {
			Some(values) => self.intersection_update(values),
			None => Ok(()),
		}
	}

	fn symmetric_difference_assign(&self, operand: SetOperand<'_, C>) -> Result<()> {
		match operand_members(self, operand)? {
			Some(values) => self.symmetric_difference_update(values),
			None => Ok(()),
		}
	}
}

/// Members of a compound operand; `None` when the operand is the target itself.
fn operand_members<C: SetOps>(target: &Collection<C>, operand: SetOperand<'_, C>) -> Result<Option<Vec<MemberOf<C>>>> {
	match operand {
		SetOperand::Set(values) => Ok(Some(values)),
		SetOperand::Sequence(_) => Err(CollectionError::TypeMismatch {
			given: Shape::List,
			wanted: Shape::Set,
		}),
		SetOperand::Collection(other) if other.ptr_eq(target) => {
			debug!(type_name = target.roles().type_name(), "compound set operator on itself skipped");
			Ok(None)
		}
		SetOperand::Collection(other) => Ok(Some(other.members())),
	}
}

pub(crate) fn append_member<C: SetOps>(collection: &Collection<C>, call: MethodCall<MemberOf<C>>) -> Result<Option<MemberOf<C>>> {
	collection.add(first_member(call, "add")?)?;
	Ok(None)
}

pub(crate) fn remove_member<C: SetOps>(collection: &Collection<C>, call: MethodCall<MemberOf<C>>) -> Result<Option<MemberOf<C>>> {
	collection.remove(&first_member(call, "remove")?)?;
	Ok(None)
}
