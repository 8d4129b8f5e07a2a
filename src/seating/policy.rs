use serde::{Deserialize, Serialize};

/// Players-per-table bounds checked by callers before seating, 2 to 10 by
/// default. The engine itself only needs one player per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatingPolicy {
	#[serde(default = "default_min_per_table")]
	pub min_per_table: usize,
	#[serde(default = "default_max_per_table")]
	pub max_per_table: usize,
	#[serde(default = "default_enforce")]
	pub enforce: bool,
}

fn default_min_per_table() -> usize {
	2
}

fn default_max_per_table() -> usize {
	10
}

fn default_enforce() -> bool {
	true
}

impl Default for SeatingPolicy {
	fn default() -> Self {
		Self {
			min_per_table: default_min_per_table(),
			max_per_table: default_max_per_table(),
			enforce: default_enforce(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
	#[error("{players} players at {tables} tables leaves a table with {smallest}, fewer than the minimum of {min}")]
	TooFewPerTable { players: usize, tables: u32, smallest: usize, min: usize },
	#[error("{players} players at {tables} tables puts {largest} at a table, more than the maximum of {max}")]
	TooManyPerTable { players: usize, tables: u32, largest: usize, max: usize },
}

impl SeatingPolicy {
	pub fn relaxed() -> Self {
		Self {
			enforce: false,
			..Self::default()
		}
	}

	// Empty rosters and zero tables pass; the engine reports those.
	pub fn check(&self, players: usize, tables: u32) -> Result<(), PolicyViolation> {
		if !self.enforce || players == 0 || tables == 0 {
			return Ok(());
		}

		let n = tables as usize;
		let smallest = players / n;
		let largest = players.div_ceil(n);

		if players >= 2 && smallest < self.min_per_table {
			return Err(PolicyViolation::TooFewPerTable {
				players,
				tables,
				smallest,
				min: self.min_per_table,
			});
		}
		if largest > self.max_per_table {
			return Err(PolicyViolation::TooManyPerTable {
				players,
				tables,
				largest,
				max: self.max_per_table,
			});
		}
		Ok(())
	}

	pub fn suggested_tables(&self, players: usize) -> u32 {
		let max = self.max_per_table.max(1);
		players.div_ceil(max).max(1) as u32
	}
}
