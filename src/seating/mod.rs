pub mod engine;
pub mod policy;
pub mod source;

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub use engine::{SeatingEngine, fisher_yates, generate, validate};
pub use policy::{PolicyViolation, SeatingPolicy};
pub use source::{IndexFn, IndexSource};

pub type PlayerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatingAssignment {
	pub table_number: u32,
	pub seat_position: u32,
	pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatingRequest {
	pub player_ids: Vec<PlayerId>,
	#[serde(deserialize_with = "table_count")]
	pub number_of_tables: u32,
}

// Non-positive counts read as zero and fail validation as `NoTables`.
fn table_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
	let count = i64::deserialize(deserializer)?;
	Ok(u32::try_from(count.max(0)).unwrap_or(u32::MAX))
}

impl SeatingRequest {
	pub fn new(player_ids: Vec<PlayerId>, number_of_tables: u32) -> Self {
		Self { player_ids, number_of_tables }
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeatingError {
	#[error("player list is empty")]
	EmptyRoster,
	#[error("number of tables must be at least 1")]
	NoTables,
	#[error("cannot seat {players} players at {tables} tables: more tables than players")]
	MoreTablesThanPlayers { tables: u32, players: usize },
	#[error("player {0} appears more than once")]
	DuplicatePlayer(PlayerId),
	#[error("random source returned index {index} outside [0, {bound})")]
	SourceOutOfRange { index: usize, bound: usize },
}

pub fn group_by_table(assignments: &[SeatingAssignment]) -> BTreeMap<u32, Vec<SeatingAssignment>> {
	let mut tables: BTreeMap<u32, Vec<SeatingAssignment>> = BTreeMap::new();
	for assignment in assignments {
		tables.entry(assignment.table_number).or_default().push(*assignment);
	}
	for seats in tables.values_mut() {
		seats.sort_by_key(|a| a.seat_position);
	}
	tables
}

pub fn table_sizes(assignments: &[SeatingAssignment]) -> BTreeMap<u32, usize> {
	let mut sizes = BTreeMap::new();
	for assignment in assignments {
		*sizes.entry(assignment.table_number).or_insert(0) += 1;
	}
	sizes
}

#[cfg(test)]
mod tests {
	use super::*;

	fn seat(table_number: u32, seat_position: u32, player_id: PlayerId) -> SeatingAssignment {
		SeatingAssignment { table_number, seat_position, player_id }
	}

	#[test]
	fn test_group_by_table_orders_seats() {
		let assignments = vec![seat(2, 2, 5), seat(1, 2, 3), seat(2, 1, 4), seat(1, 1, 9)];
		let grouped = group_by_table(&assignments);

		assert_eq!(grouped.len(), 2);
		let first: Vec<PlayerId> = grouped[&1].iter().map(|a| a.player_id).collect();
		let second: Vec<PlayerId> = grouped[&2].iter().map(|a| a.player_id).collect();
		assert_eq!(first, vec![9, 3]);
		assert_eq!(second, vec![4, 5]);
	}

	#[test]
	fn test_table_sizes() {
		let assignments = vec![seat(1, 1, 1), seat(1, 2, 2), seat(2, 1, 3)];
		let sizes = table_sizes(&assignments);
		assert_eq!(sizes[&1], 2);
		assert_eq!(sizes[&2], 1);
	}

	#[test]
	fn test_assignment_json_shape() {
		let json = serde_json::to_string(&seat(1, 3, 42)).unwrap();
		assert_eq!(json, r#"{"tableNumber":1,"seatPosition":3,"playerId":42}"#);
	}

	#[test]
	fn test_request_json_shape() {
		let request: SeatingRequest =
			serde_json::from_str(r#"{"playerIds":[1,2,3],"numberOfTables":2}"#).unwrap();
		assert_eq!(request, SeatingRequest::new(vec![1, 2, 3], 2));
	}

	#[test]
	fn test_request_negative_tables_reads_as_zero() {
		let request: SeatingRequest =
			serde_json::from_str(r#"{"playerIds":[1,2],"numberOfTables":-1}"#).unwrap();
		assert_eq!(request.number_of_tables, 0);
		assert_eq!(engine::validate(&request.player_ids, request.number_of_tables), Err(SeatingError::NoTables));
	}

	#[test]
	fn test_request_rejects_fractional_tables() {
		let result = serde_json::from_str::<SeatingRequest>(r#"{"playerIds":[1,2],"numberOfTables":1.5}"#);
		assert!(result.is_err());
	}

	#[test]
	fn test_error_messages_name_the_constraint() {
		assert!(SeatingError::EmptyRoster.to_string().contains("empty"));
		assert!(SeatingError::NoTables.to_string().contains("at least 1"));
		let msg = SeatingError::MoreTablesThanPlayers { tables: 5, players: 3 }.to_string();
		assert!(msg.contains("more tables than players"));
		assert!(msg.contains('5'));
	}
}
