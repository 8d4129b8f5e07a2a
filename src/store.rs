use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::chart::{ChartBook, ChartId, SeatingChart};
use crate::logging;
use crate::roster::{Player, Roster};
use crate::seating::{
	IndexSource, PlayerId, PolicyViolation, SeatingEngine, SeatingError, SeatingPolicy, SeatingRequest,
};
use crate::session::{RsvpChange, RsvpStatus, Session, SessionId};

pub const STORE_FILE: &str = "poker-night.json";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
	#[error("player {0} not found")]
	PlayerNotFound(PlayerId),
	#[error("no player matches '{0}'")]
	UnknownPlayer(String),
	#[error("a player named '{0}' already exists")]
	PlayerNameTaken(String),
	#[error("player {0} has buy-ins recorded and cannot be removed")]
	PlayerHasHistory(PlayerId),
	#[error("session {0} not found")]
	SessionNotFound(SessionId),
	#[error("chart {0} not found")]
	ChartNotFound(ChartId),
	#[error("invalid amount: {0}")]
	InvalidAmount(f32),
	#[error("player {player_id} is not on the list for session {session_id}")]
	NotInSession { session_id: SessionId, player_id: PlayerId },
	#[error("session {session_id} is full ({max} seats)")]
	SessionFull { session_id: SessionId, max: usize },
	#[error("player {player_id} has not bought in to session {session_id}")]
	NotBoughtIn { session_id: SessionId, player_id: PlayerId },
	#[error(transparent)]
	Seating(#[from] SeatingError),
	#[error(transparent)]
	Policy(#[from] PolicyViolation),
}

#[derive(Debug, Clone)]
pub struct NewSession {
	pub name: String,
	pub scheduled_for: NaiveDateTime,
	pub location: Option<String>,
	pub buy_in: f32,
	pub max_players: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreFile {
	#[serde(default)]
	roster: Roster,
	#[serde(default)]
	sessions: BTreeMap<SessionId, Session>,
	#[serde(default = "first_id")]
	next_session_id: SessionId,
	#[serde(default)]
	charts: ChartBook,
}

fn first_id() -> SessionId {
	1
}

#[derive(Clone)]
pub struct Store {
	roster: Roster,
	sessions: BTreeMap<SessionId, Session>,
	next_session_id: SessionId,
	charts: ChartBook,
	path: Option<PathBuf>,
}

impl Store {
	pub fn in_memory() -> Self {
		Self {
			roster: Roster::default(),
			sessions: BTreeMap::new(),
			next_session_id: first_id(),
			charts: ChartBook::default(),
			path: None,
		}
	}

	/// Opens the store file at `path`; a missing file yields an empty store
	/// that will be written there on the first save.
	pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, String> {
		let path = path.as_ref();

		let file: StoreFile = if path.exists() {
			let content = fs::read_to_string(path)
				.map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
			serde_json::from_str(&content)
				.map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?
		} else {
			StoreFile {
				roster: Roster::default(),
				sessions: BTreeMap::new(),
				next_session_id: first_id(),
				charts: ChartBook::default(),
			}
		};

		Ok(Self {
			roster: file.roster,
			sessions: file.sessions,
			next_session_id: file.next_session_id,
			charts: file.charts,
			path: Some(path.to_path_buf()),
		})
	}

	pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, String> {
		Self::load_from(dir.as_ref().join(STORE_FILE))
	}

	pub fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}

	pub fn save(&self) -> Result<(), String> {
		match &self.path {
			Some(path) => self.save_to(path),
			None => Ok(()),
		}
	}

	pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
		let path = path.as_ref();
		let file = StoreFile {
			roster: self.roster.clone(),
			sessions: self.sessions.clone(),
			next_session_id: self.next_session_id,
			charts: self.charts.clone(),
		};

		let content = serde_json::to_string_pretty(&file)
			.map_err(|e| format!("Failed to serialize store: {}", e))?;

		if let Some(parent) = path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent)
					.map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
			}
		}
		fs::write(path, content)
			.map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;

		Ok(())
	}

	pub fn roster(&self) -> &Roster {
		&self.roster
	}

	pub fn charts(&self) -> &ChartBook {
		&self.charts
	}

	pub fn add_player(&mut self, name: &str, email: Option<String>) -> Result<PlayerId, StoreError> {
		let id = self.roster.add(name, email)?;
		logging::ledger::player_added(id, name);
		Ok(id)
	}

	pub fn rename_player(&mut self, id: PlayerId, name: &str) -> Result<(), StoreError> {
		self.roster.rename(id, name)
	}

	pub fn remove_player(&mut self, id: PlayerId) -> Result<Player, StoreError> {
		self.roster.require(id)?;
		let has_history = self
			.sessions
			.values()
			.any(|s| s.player(id).map(|p| p.has_bookkeeping()).unwrap_or(false));
		if has_history {
			return Err(StoreError::PlayerHasHistory(id));
		}

		for session in self.sessions.values_mut() {
			session.players.remove(&id);
		}
		self.roster.remove(id)
	}

	pub fn create_session(&mut self, details: NewSession) -> SessionId {
		let id = self.next_session_id;
		self.next_session_id += 1;

		let mut session = Session::new(id, &details.name, details.scheduled_for, details.buy_in);
		session.location = details.location;
		session.max_players = details.max_players;
		self.sessions.insert(id, session);
		id
	}

	pub fn session(&self, id: SessionId) -> Result<&Session, StoreError> {
		self.sessions.get(&id).ok_or(StoreError::SessionNotFound(id))
	}

	fn session_mut(&mut self, id: SessionId) -> Result<&mut Session, StoreError> {
		self.sessions.get_mut(&id).ok_or(StoreError::SessionNotFound(id))
	}

	pub fn sessions(&self) -> Vec<&Session> {
		let mut sessions: Vec<&Session> = self.sessions.values().collect();
		sessions.sort_by_key(|s| (s.scheduled_for, s.id));
		sessions
	}

	pub fn delete_session(&mut self, id: SessionId) -> Result<Session, StoreError> {
		let session = self.sessions.remove(&id).ok_or(StoreError::SessionNotFound(id))?;
		self.charts.delete_for_session(id);
		Ok(session)
	}

	pub fn invite(&mut self, session_id: SessionId, player_id: PlayerId) -> Result<bool, StoreError> {
		self.roster.require(player_id)?;
		Ok(self.session_mut(session_id)?.invite(player_id))
	}

	pub fn set_rsvp(
		&mut self,
		session_id: SessionId,
		player_id: PlayerId,
		status: RsvpStatus,
	) -> Result<RsvpChange, StoreError> {
		self.roster.require(player_id)?;
		Ok(self.session_mut(session_id)?.set_rsvp(player_id, status))
	}

	pub fn buy_in(
		&mut self,
		session_id: SessionId,
		player_id: PlayerId,
		amount: Option<f32>,
	) -> Result<f32, StoreError> {
		let session = self.session_mut(session_id)?;
		let amount = amount.unwrap_or(session.buy_in);
		session.buy_in(player_id, amount)
	}

	pub fn cash_out(&mut self, session_id: SessionId, player_id: PlayerId, amount: f32) -> Result<f32, StoreError> {
		self.session_mut(session_id)?.cash_out(player_id, amount)
	}

	pub fn create_chart<S: IndexSource>(
		&mut self,
		name: &str,
		session_id: Option<SessionId>,
		request: &SeatingRequest,
		policy: &SeatingPolicy,
		engine: &mut SeatingEngine<S>,
	) -> Result<&SeatingChart, StoreError> {
		if let Some(id) = session_id {
			self.session(id)?;
		}
		for &player_id in &request.player_ids {
			self.roster.require(player_id)?;
		}
		self.charts.create(name, session_id, request, policy, engine)
	}

	pub fn seat_session<S: IndexSource>(
		&mut self,
		session_id: SessionId,
		name: Option<&str>,
		tables: Option<u32>,
		policy: &SeatingPolicy,
		engine: &mut SeatingEngine<S>,
	) -> Result<&SeatingChart, StoreError> {
		let session = self.session(session_id)?;
		let players = session.confirmed_players();
		let tables = tables.unwrap_or_else(|| policy.suggested_tables(players.len()));
		let name = match name {
			Some(n) => n.to_string(),
			None => format!("{} seating #{}", session.name, self.charts.for_session(session_id).len() + 1),
		};

		let request = SeatingRequest::new(players, tables);
		self.charts.create(&name, Some(session_id), &request, policy, engine)
	}

	pub fn chart(&self, id: ChartId) -> Result<&SeatingChart, StoreError> {
		self.charts.get(id)
	}

	pub fn rename_chart(&mut self, id: ChartId, name: &str) -> Result<(), StoreError> {
		self.charts.rename(id, name)
	}

	pub fn delete_chart(&mut self, id: ChartId) -> Result<SeatingChart, StoreError> {
		self.charts.delete(id)
	}

	pub fn list_charts(&self, session_id: Option<SessionId>) -> Vec<&SeatingChart> {
		match session_id {
			Some(id) => self.charts.for_session(id),
			None => self.charts.list(),
		}
	}
}
