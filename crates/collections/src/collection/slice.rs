use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::error::{CollectionError, Result};

/// Slice bounds over a sequence. Negative indices count from the end and out-of-range bounds
/// clamp. A negative step walks backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
	pub start: Option<isize>,
	pub stop: Option<isize>,
	pub step: Option<isize>,
}

impl Slice {
	pub const fn new(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
		Self { start, stop, step }
	}

	pub const fn full() -> Self {
		Self::new(None, None, None)
	}

	pub const fn range(start: isize, stop: isize) -> Self {
		Self::new(Some(start), Some(stop), None)
	}

	pub const fn with_step(self, step: isize) -> Self {
		Self { step: Some(step), ..self }
	}

	/// Whether the slice has a step other than 1, which forbids resizing on assignment.
	pub fn is_extended(&self) -> bool {
		!matches!(self.step, None | Some(1))
	}

	/// Resolves `(start, stop, step)` against a sequence of `len` elements.
	pub fn indices(&self, len: usize) -> Result<(isize, isize, isize)> {
		let len = len as isize;
		let step = self.step.unwrap_or(1);
		if step == 0 {
			return Err(CollectionError::ZeroSliceStep);
		}
		let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };
		let clamp = |bound: isize| {
			if bound < 0 {
				(bound + len).max(lower)
			} else {
				bound.min(upper)
			}
		};
		let start = self.start.map_or(if step < 0 { upper } else { lower }, clamp);
		let stop = self.stop.map_or(if step < 0 { lower } else { upper }, clamp);
		Ok((start, stop, step))
	}

	/// Positions selected by the slice, in slice order.
	pub fn positions(&self, len: usize) -> Result<Vec<usize>> {
		let (start, stop, step) = self.indices(len)?;
		let mut positions = Vec::new();
		let mut i = start;
		while (step > 0 && i < stop) || (step < 0 && i > stop) {
			positions.push(i as usize);
			let Some(next) = i.checked_add(step) else { break };
			i = next;
		}
		Ok(positions)
	}
}

impl From<Range<isize>> for Slice {
	fn from(range: Range<isize>) -> Self {
		Self::range(range.start, range.end)
	}
}

impl From<RangeFrom<isize>> for Slice {
	fn from(range: RangeFrom<isize>) -> Self {
		Self::new(Some(range.start), None, None)
	}
}

impl From<RangeTo<isize>> for Slice {
	fn from(range: RangeTo<isize>) -> Self {
		Self::new(None, Some(range.end), None)
	}
}

impl From<RangeFull> for Slice {
	fn from(_: RangeFull) -> Self {
		Self::full()
	}
}
