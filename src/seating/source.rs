use rand::Rng;
use rand::rngs::{StdRng, ThreadRng};

/// Must return a uniform index in `[0, bound)`. `bound` is never zero.
pub trait IndexSource {
	fn next_index(&mut self, bound: usize) -> usize;
}

impl IndexSource for StdRng {
	fn next_index(&mut self, bound: usize) -> usize {
		self.random_range(0..bound)
	}
}

impl IndexSource for ThreadRng {
	fn next_index(&mut self, bound: usize) -> usize {
		self.random_range(0..bound)
	}
}

impl<S: IndexSource + ?Sized> IndexSource for &mut S {
	fn next_index(&mut self, bound: usize) -> usize {
		(**self).next_index(bound)
	}
}

impl<S: IndexSource + ?Sized> IndexSource for Box<S> {
	fn next_index(&mut self, bound: usize) -> usize {
		(**self).next_index(bound)
	}
}

pub struct IndexFn<F>(pub F);

impl<F: FnMut(usize) -> usize> IndexSource for IndexFn<F> {
	fn next_index(&mut self, bound: usize) -> usize {
		(self.0)(bound)
	}
}
