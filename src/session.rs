use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::logging;
use crate::seating::PlayerId;
use crate::store::StoreError;

pub type SessionId = u64;

const CENT: f32 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RsvpStatus {
	Invited,
	Confirmed,
	Maybe,
	Declined,
	Waitlisted,
}

impl std::fmt::Display for RsvpStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			RsvpStatus::Invited => write!(f, "invited"),
			RsvpStatus::Confirmed => write!(f, "confirmed"),
			RsvpStatus::Maybe => write!(f, "maybe"),
			RsvpStatus::Declined => write!(f, "declined"),
			RsvpStatus::Waitlisted => write!(f, "waitlisted"),
		}
	}
}

impl std::str::FromStr for RsvpStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"invited" => Ok(RsvpStatus::Invited),
			"confirmed" | "yes" => Ok(RsvpStatus::Confirmed),
			"maybe" => Ok(RsvpStatus::Maybe),
			"declined" | "no" => Ok(RsvpStatus::Declined),
			"waitlisted" => Ok(RsvpStatus::Waitlisted),
			other => Err(format!("Unknown RSVP status '{}'", other)),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlayer {
	pub status: RsvpStatus,
	pub responded_at: DateTime<Utc>,
	#[serde(default)]
	pub buy_ins: Vec<f32>,
	#[serde(default)]
	pub cash_out: Option<f32>,
}

impl SessionPlayer {
	fn new(status: RsvpStatus) -> Self {
		Self {
			status,
			responded_at: Utc::now(),
			buy_ins: Vec::new(),
			cash_out: None,
		}
	}

	pub fn total_buy_in(&self) -> f32 {
		self.buy_ins.iter().sum()
	}

	pub fn net(&self) -> Option<f32> {
		self.cash_out.map(|c| c - self.total_buy_in())
	}

	pub fn has_bookkeeping(&self) -> bool {
		!self.buy_ins.is_empty() || self.cash_out.is_some()
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
	pub id: SessionId,
	pub name: String,
	pub scheduled_for: NaiveDateTime,
	#[serde(default)]
	pub location: Option<String>,
	pub buy_in: f32,
	#[serde(default)]
	pub max_players: Option<usize>,
	#[serde(default)]
	pub players: BTreeMap<PlayerId, SessionPlayer>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RsvpCounts {
	pub invited: usize,
	pub confirmed: usize,
	pub maybe: usize,
	pub declined: usize,
	pub waitlisted: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsvpChange {
	pub status: RsvpStatus,
	pub promoted: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerResult {
	pub player_id: PlayerId,
	pub buy_in: f32,
	pub cash_out: Option<f32>,
	pub net: Option<f32>,
}

impl Session {
	pub fn new(id: SessionId, name: &str, scheduled_for: NaiveDateTime, buy_in: f32) -> Self {
		Self {
			id,
			name: name.to_string(),
			scheduled_for,
			location: None,
			buy_in,
			max_players: None,
			players: BTreeMap::new(),
		}
	}

	pub fn player(&self, player_id: PlayerId) -> Option<&SessionPlayer> {
		self.players.get(&player_id)
	}

	pub fn invite(&mut self, player_id: PlayerId) -> bool {
		if self.players.contains_key(&player_id) {
			return false;
		}
		self.players.insert(player_id, SessionPlayer::new(RsvpStatus::Invited));
		logging::ledger::rsvp(self.id, player_id, "invited");
		true
	}

	pub fn set_rsvp(&mut self, player_id: PlayerId, status: RsvpStatus) -> RsvpChange {
		let was_confirmed = self.status_of(player_id) == Some(RsvpStatus::Confirmed);

		let applied = match (status, self.max_players) {
			(RsvpStatus::Confirmed, Some(max)) if !was_confirmed && self.confirmed_count() >= max => {
				RsvpStatus::Waitlisted
			}
			_ => status,
		};

		let entry = self
			.players
			.entry(player_id)
			.or_insert_with(|| SessionPlayer::new(applied));
		if entry.status != applied {
			entry.status = applied;
			entry.responded_at = Utc::now();
		}
		logging::ledger::rsvp(self.id, player_id, &applied.to_string());

		let promoted = if was_confirmed && applied != RsvpStatus::Confirmed {
			self.promote_waitlisted()
		} else {
			None
		};

		RsvpChange { status: applied, promoted }
	}

	fn promote_waitlisted(&mut self) -> Option<PlayerId> {
		if let Some(max) = self.max_players {
			if self.confirmed_count() >= max {
				return None;
			}
		}
		let (&next, _) = self
			.players
			.iter()
			.filter(|(_, p)| p.status == RsvpStatus::Waitlisted)
			.min_by_key(|(id, p)| (p.responded_at, **id))?;

		let entry = self.players.get_mut(&next)?;
		entry.status = RsvpStatus::Confirmed;
		entry.responded_at = Utc::now();
		logging::ledger::rsvp(self.id, next, "confirmed (from waitlist)");
		Some(next)
	}

	pub fn status_of(&self, player_id: PlayerId) -> Option<RsvpStatus> {
		self.players.get(&player_id).map(|p| p.status)
	}

	fn confirmed_count(&self) -> usize {
		self.players.values().filter(|p| p.status == RsvpStatus::Confirmed).count()
	}

	pub fn confirmed_players(&self) -> Vec<PlayerId> {
		self.players
			.iter()
			.filter(|(_, p)| p.status == RsvpStatus::Confirmed)
			.map(|(&id, _)| id)
			.collect()
	}

	pub fn counts(&self) -> RsvpCounts {
		let mut counts = RsvpCounts::default();
		for player in self.players.values() {
			match player.status {
				RsvpStatus::Invited => counts.invited += 1,
				RsvpStatus::Confirmed => counts.confirmed += 1,
				RsvpStatus::Maybe => counts.maybe += 1,
				RsvpStatus::Declined => counts.declined += 1,
				RsvpStatus::Waitlisted => counts.waitlisted += 1,
			}
		}
		counts
	}

	pub fn buy_in(&mut self, player_id: PlayerId, amount: f32) -> Result<f32, StoreError> {
		if !amount.is_finite() || amount <= 0.0 {
			return Err(StoreError::InvalidAmount(amount));
		}
		let session_id = self.id;
		let status = self
			.status_of(player_id)
			.ok_or(StoreError::NotInSession { session_id, player_id })?;
		if let Some(max) = self.max_players {
			if status != RsvpStatus::Confirmed && self.confirmed_count() >= max {
				return Err(StoreError::SessionFull { session_id, max });
			}
		}

		let entry = self
			.players
			.get_mut(&player_id)
			.ok_or(StoreError::NotInSession { session_id, player_id })?;
		entry.buy_ins.push(amount);
		entry.status = RsvpStatus::Confirmed;
		let total = entry.total_buy_in();
		logging::ledger::buy_in(session_id, player_id, amount, total);
		Ok(total)
	}

	pub fn cash_out(&mut self, player_id: PlayerId, amount: f32) -> Result<f32, StoreError> {
		if !amount.is_finite() || amount < 0.0 {
			return Err(StoreError::InvalidAmount(amount));
		}
		let session_id = self.id;
		let entry = self
			.players
			.get_mut(&player_id)
			.ok_or(StoreError::NotInSession { session_id, player_id })?;
		if entry.buy_ins.is_empty() {
			return Err(StoreError::NotBoughtIn { session_id, player_id });
		}

		entry.cash_out = Some(amount);
		let net = amount - entry.total_buy_in();
		logging::ledger::cash_out(session_id, player_id, amount, net);
		Ok(net)
	}

	pub fn total_buy_in(&self, player_id: PlayerId) -> f32 {
		self.players.get(&player_id).map(|p| p.total_buy_in()).unwrap_or(0.0)
	}

	pub fn net(&self, player_id: PlayerId) -> Option<f32> {
		self.players.get(&player_id).and_then(|p| p.net())
	}

	pub fn results(&self) -> Vec<PlayerResult> {
		let mut results: Vec<PlayerResult> = self
			.players
			.iter()
			.filter(|(_, p)| !p.buy_ins.is_empty())
			.map(|(&player_id, p)| PlayerResult {
				player_id,
				buy_in: p.total_buy_in(),
				cash_out: p.cash_out,
				net: p.net(),
			})
			.collect();

		results.sort_by(|a, b| {
			let a_net = a.net.unwrap_or(f32::NEG_INFINITY);
			let b_net = b.net.unwrap_or(f32::NEG_INFINITY);
			b_net.total_cmp(&a_net).then(a.player_id.cmp(&b.player_id))
		});
		results
	}

	pub fn total_buy_ins(&self) -> f32 {
		self.players.values().map(|p| p.total_buy_in()).sum()
	}

	pub fn total_cash_outs(&self) -> f32 {
		self.players.values().filter_map(|p| p.cash_out).sum()
	}

	pub fn discrepancy(&self) -> f32 {
		self.total_cash_outs() - self.total_buy_ins()
	}

	pub fn is_balanced(&self) -> bool {
		self.discrepancy().abs() < CENT
	}

	pub fn has_bookkeeping(&self) -> bool {
		self.players.values().any(|p| p.has_bookkeeping())
	}
}
