use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;

use super::source::IndexSource;
use super::{PlayerId, SeatingAssignment, SeatingError, SeatingRequest};
use crate::logging;

/// Checks, in order: non-empty roster, at least one table, no more tables
/// than players, no repeated ids. Draws no randomness.
pub fn validate(player_ids: &[PlayerId], number_of_tables: u32) -> Result<(), SeatingError> {
	if player_ids.is_empty() {
		return Err(SeatingError::EmptyRoster);
	}
	if number_of_tables < 1 {
		return Err(SeatingError::NoTables);
	}
	if number_of_tables as usize > player_ids.len() {
		return Err(SeatingError::MoreTablesThanPlayers {
			tables: number_of_tables,
			players: player_ids.len(),
		});
	}

	let mut seen = HashSet::with_capacity(player_ids.len());
	for &id in player_ids {
		if !seen.insert(id) {
			return Err(SeatingError::DuplicatePlayer(id));
		}
	}
	Ok(())
}

pub fn fisher_yates<T, S: IndexSource + ?Sized>(items: &mut [T], source: &mut S) -> Result<(), SeatingError> {
	for i in (1..items.len()).rev() {
		let j = source.next_index(i + 1);
		if j > i {
			return Err(SeatingError::SourceOutOfRange { index: j, bound: i + 1 });
		}
		items.swap(i, j);
	}
	Ok(())
}

/// Shuffle, deal round-robin into one bucket per table, shuffle each bucket
/// for seat order. Output is ordered by table, then seat.
pub fn generate<S: IndexSource + ?Sized>(
	player_ids: &[PlayerId],
	number_of_tables: u32,
	source: &mut S,
) -> Result<Vec<SeatingAssignment>, SeatingError> {
	validate(player_ids, number_of_tables)?;

	let mut order = player_ids.to_vec();
	fisher_yates(&mut order, source)?;

	let tables = number_of_tables as usize;
	let per_table = order.len().div_ceil(tables);
	let mut buckets: Vec<Vec<PlayerId>> = (0..tables).map(|_| Vec::with_capacity(per_table)).collect();
	for (k, player_id) in order.into_iter().enumerate() {
		buckets[k % tables].push(player_id);
	}

	let mut assignments = Vec::with_capacity(player_ids.len());
	for (index, mut bucket) in buckets.into_iter().enumerate() {
		fisher_yates(&mut bucket, source)?;
		for (position, player_id) in bucket.into_iter().enumerate() {
			assignments.push(SeatingAssignment {
				table_number: index as u32 + 1,
				seat_position: position as u32 + 1,
				player_id,
			});
		}
	}

	Ok(assignments)
}

pub struct SeatingEngine<S = StdRng> {
	source: S,
}

impl SeatingEngine<StdRng> {
	pub fn new(seed: Option<u64>) -> Self {
		let rng = match seed {
			Some(s) => StdRng::seed_from_u64(s),
			None => StdRng::from_os_rng(),
		};
		Self::with_source(rng)
	}

	pub fn seeded(seed: u64) -> Self {
		Self::new(Some(seed))
	}
}

impl Default for SeatingEngine<StdRng> {
	fn default() -> Self {
		Self::new(None)
	}
}

impl<S: IndexSource> SeatingEngine<S> {
	pub fn with_source(source: S) -> Self {
		Self { source }
	}

	pub fn generate(
		&mut self,
		player_ids: &[PlayerId],
		number_of_tables: u32,
	) -> Result<Vec<SeatingAssignment>, SeatingError> {
		match generate(player_ids, number_of_tables, &mut self.source) {
			Ok(assignments) => {
				logging::seating::generated(player_ids.len(), number_of_tables);
				Ok(assignments)
			}
			Err(e) => {
				logging::seating::rejected(&e);
				Err(e)
			}
		}
	}

	pub fn generate_request(&mut self, request: &SeatingRequest) -> Result<Vec<SeatingAssignment>, SeatingError> {
		self.generate(&request.player_ids, request.number_of_tables)
	}

	pub fn into_source(self) -> S {
		self.source
	}
}
