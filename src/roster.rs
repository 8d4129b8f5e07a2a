use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::seating::PlayerId;
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
	pub id: PlayerId,
	pub name: String,
	#[serde(default)]
	pub email: Option<String>,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
	#[serde(default)]
	players: BTreeMap<PlayerId, Player>,
	#[serde(default = "first_id")]
	next_id: PlayerId,
}

fn first_id() -> PlayerId {
	1
}

fn normalize_name(name: &str) -> String {
	name.trim().to_lowercase()
}

impl Default for Roster {
	fn default() -> Self {
		Self {
			players: BTreeMap::new(),
			next_id: first_id(),
		}
	}
}

impl Roster {
	pub fn add(&mut self, name: &str, email: Option<String>) -> Result<PlayerId, StoreError> {
		let name = name.trim();
		if self.find_by_name(name).is_some() {
			return Err(StoreError::PlayerNameTaken(name.to_string()));
		}

		let id = self.next_id;
		self.next_id += 1;
		self.players.insert(
			id,
			Player {
				id,
				name: name.to_string(),
				email,
				created_at: Utc::now(),
			},
		);
		Ok(id)
	}

	pub fn get(&self, id: PlayerId) -> Option<&Player> {
		self.players.get(&id)
	}

	pub fn require(&self, id: PlayerId) -> Result<&Player, StoreError> {
		self.players.get(&id).ok_or(StoreError::PlayerNotFound(id))
	}

	pub fn contains(&self, id: PlayerId) -> bool {
		self.players.contains_key(&id)
	}

	pub fn find_by_name(&self, name: &str) -> Option<&Player> {
		let wanted = normalize_name(name);
		self.players.values().find(|p| normalize_name(&p.name) == wanted)
	}

	pub fn resolve(&self, key: &str) -> Result<&Player, StoreError> {
		if let Ok(id) = key.trim().parse::<PlayerId>() {
			if let Some(player) = self.players.get(&id) {
				return Ok(player);
			}
		}
		self.find_by_name(key)
			.ok_or_else(|| StoreError::UnknownPlayer(key.to_string()))
	}

	pub fn rename(&mut self, id: PlayerId, name: &str) -> Result<(), StoreError> {
		let name = name.trim();
		if let Some(existing) = self.find_by_name(name) {
			if existing.id != id {
				return Err(StoreError::PlayerNameTaken(name.to_string()));
			}
		}
		let player = self.players.get_mut(&id).ok_or(StoreError::PlayerNotFound(id))?;
		player.name = name.to_string();
		Ok(())
	}

	pub fn remove(&mut self, id: PlayerId) -> Result<Player, StoreError> {
		self.players.remove(&id).ok_or(StoreError::PlayerNotFound(id))
	}

	pub fn list(&self) -> Vec<&Player> {
		self.players.values().collect()
	}

	pub fn name_of(&self, id: PlayerId) -> String {
		self.players
			.get(&id)
			.map(|p| p.name.clone())
			.unwrap_or_else(|| format!("#{}", id))
	}

	pub fn len(&self) -> usize {
		self.players.len()
	}

	pub fn is_empty(&self) -> bool {
		self.players.is_empty()
	}
}
