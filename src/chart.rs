use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::logging;
use crate::seating::{
	IndexSource, SeatingAssignment, SeatingEngine, SeatingPolicy, SeatingRequest, group_by_table,
};
use crate::session::SessionId;
use crate::store::StoreError;

pub type ChartId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatingChart {
	pub id: ChartId,
	pub name: String,
	#[serde(default)]
	pub session_id: Option<SessionId>,
	pub number_of_tables: u32,
	pub created_at: DateTime<Utc>,
	pub assignments: Vec<SeatingAssignment>,
}

impl SeatingChart {
	pub fn tables(&self) -> BTreeMap<u32, Vec<SeatingAssignment>> {
		group_by_table(&self.assignments)
	}

	pub fn player_count(&self) -> usize {
		self.assignments.len()
	}

	pub fn seat_of(&self, player_id: u64) -> Option<SeatingAssignment> {
		self.assignments.iter().find(|a| a.player_id == player_id).copied()
	}

	pub fn summary(&self) -> ChartSummary {
		ChartSummary {
			id: self.id,
			name: self.name.clone(),
			session_id: self.session_id,
			number_of_tables: self.number_of_tables,
			players: self.player_count(),
			created_at: self.created_at,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSummary {
	pub id: ChartId,
	pub name: String,
	pub session_id: Option<SessionId>,
	pub number_of_tables: u32,
	pub players: usize,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartBook {
	#[serde(default)]
	charts: BTreeMap<ChartId, SeatingChart>,
	#[serde(default = "first_id")]
	next_id: ChartId,
}

fn first_id() -> ChartId {
	1
}

impl Default for ChartBook {
	fn default() -> Self {
		Self {
			charts: BTreeMap::new(),
			next_id: first_id(),
		}
	}
}

impl ChartBook {
	pub fn create<S: IndexSource>(
		&mut self,
		name: &str,
		session_id: Option<SessionId>,
		request: &SeatingRequest,
		policy: &SeatingPolicy,
		engine: &mut SeatingEngine<S>,
	) -> Result<&SeatingChart, StoreError> {
		if let Err(violation) = policy.check(request.player_ids.len(), request.number_of_tables) {
			logging::seating::policy(&violation.to_string());
			return Err(violation.into());
		}
		let assignments = engine.generate_request(request)?;

		let id = self.next_id;
		self.next_id += 1;
		let chart = SeatingChart {
			id,
			name: name.to_string(),
			session_id,
			number_of_tables: request.number_of_tables,
			created_at: Utc::now(),
			assignments,
		};
		logging::seating::chart_created(id, name, chart.assignments.len());

		Ok(self.charts.entry(id).or_insert(chart))
	}

	pub fn get(&self, id: ChartId) -> Result<&SeatingChart, StoreError> {
		self.charts.get(&id).ok_or(StoreError::ChartNotFound(id))
	}

	pub fn rename(&mut self, id: ChartId, name: &str) -> Result<(), StoreError> {
		let chart = self.charts.get_mut(&id).ok_or(StoreError::ChartNotFound(id))?;
		chart.name = name.to_string();
		logging::seating::chart_renamed(id, name);
		Ok(())
	}

	pub fn delete(&mut self, id: ChartId) -> Result<SeatingChart, StoreError> {
		let chart = self.charts.remove(&id).ok_or(StoreError::ChartNotFound(id))?;
		logging::seating::chart_deleted(id);
		Ok(chart)
	}

	pub fn delete_for_session(&mut self, session_id: SessionId) -> usize {
		let ids: Vec<ChartId> = self
			.charts
			.values()
			.filter(|c| c.session_id == Some(session_id))
			.map(|c| c.id)
			.collect();
		for id in &ids {
			self.charts.remove(id);
			logging::seating::chart_deleted(*id);
		}
		ids.len()
	}

	pub fn list(&self) -> Vec<&SeatingChart> {
		self.charts.values().collect()
	}

	pub fn for_session(&self, session_id: SessionId) -> Vec<&SeatingChart> {
		self.charts
			.values()
			.filter(|c| c.session_id == Some(session_id))
			.collect()
	}

	pub fn len(&self) -> usize {
		self.charts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.charts.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::seating::SeatingError;
	use std::collections::HashSet;

	fn request(players: u64, tables: u32) -> SeatingRequest {
		SeatingRequest::new((1..=players).collect(), tables)
	}

	#[test]
	fn test_create_assigns_ids() {
		let mut book = ChartBook::default();
		let mut engine = SeatingEngine::seeded(1);
		let policy = SeatingPolicy::default();

		let first = book.create("Week 1", Some(4), &request(8, 2), &policy, &mut engine).unwrap().id;
		let second = book.create("Week 2", None, &request(6, 1), &policy, &mut engine).unwrap().id;

		assert_eq!((first, second), (1, 2));
		let chart = book.get(first).unwrap();
		assert_eq!(chart.session_id, Some(4));
		assert_eq!(chart.number_of_tables, 2);
		assert_eq!(chart.player_count(), 8);
	}

	#[test]
	fn test_table_seat_pairs_unique() {
		let mut book = ChartBook::default();
		let mut engine = SeatingEngine::seeded(9);
		let chart = book
			.create("Big night", None, &request(19, 3), &SeatingPolicy::default(), &mut engine)
			.unwrap();

		let pairs: HashSet<(u32, u32)> = chart
			.assignments
			.iter()
			.map(|a| (a.table_number, a.seat_position))
			.collect();
		assert_eq!(pairs.len(), 19);
		assert_eq!(chart.tables().len(), 3);
	}

	#[test]
	fn test_failed_generation_stores_nothing() {
		let mut book = ChartBook::default();
		let mut engine = SeatingEngine::seeded(1);
		let err = book
			.create("Bad", None, &request(3, 4), &SeatingPolicy::relaxed(), &mut engine)
			.unwrap_err();
		assert_eq!(
			err,
			StoreError::Seating(SeatingError::MoreTablesThanPlayers { tables: 4, players: 3 })
		);
		assert!(book.is_empty());

		let next = book
			.create("Good", None, &request(3, 1), &SeatingPolicy::relaxed(), &mut engine)
			.unwrap();
		assert_eq!(next.id, 1);
	}

	#[test]
	fn test_policy_violation_stores_nothing() {
		let mut book = ChartBook::default();
		let mut engine = SeatingEngine::seeded(1);
		let err = book
			.create("Sparse", None, &request(5, 3), &SeatingPolicy::default(), &mut engine)
			.unwrap_err();
		assert!(matches!(err, StoreError::Policy(_)));
		assert!(book.is_empty());
	}

	#[test]
	fn test_rename_and_delete() {
		let mut book = ChartBook::default();
		let mut engine = SeatingEngine::seeded(2);
		let id = book
			.create("Draft", None, &request(4, 2), &SeatingPolicy::default(), &mut engine)
			.unwrap()
			.id;

		book.rename(id, "Final").unwrap();
		assert_eq!(book.get(id).unwrap().name, "Final");

		let removed = book.delete(id).unwrap();
		assert_eq!(removed.assignments.len(), 4);
		assert!(matches!(book.get(id), Err(StoreError::ChartNotFound(_))));
		assert!(matches!(book.delete(id), Err(StoreError::ChartNotFound(_))));
	}

	#[test]
	fn test_delete_for_session() {
		let mut book = ChartBook::default();
		let mut engine = SeatingEngine::seeded(3);
		let policy = SeatingPolicy::default();
		book.create("a", Some(1), &request(4, 1), &policy, &mut engine).unwrap();
		book.create("b", Some(1), &request(4, 2), &policy, &mut engine).unwrap();
		book.create("c", Some(2), &request(4, 1), &policy, &mut engine).unwrap();

		assert_eq!(book.for_session(1).len(), 2);
		assert_eq!(book.delete_for_session(1), 2);
		assert_eq!(book.len(), 1);
		assert!(book.for_session(1).is_empty());
	}

	#[test]
	fn test_seat_of() {
		let mut book = ChartBook::default();
		let mut engine = SeatingEngine::seeded(4);
		let chart = book
			.create("x", None, &request(6, 2), &SeatingPolicy::default(), &mut engine)
			.unwrap();
		let seat = chart.seat_of(5).unwrap();
		assert_eq!(seat.player_id, 5);
		assert!(chart.seat_of(99).is_none());
	}
}
