use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

struct LogState {
	dir: Option<PathBuf>,
	file: Option<std::fs::File>,
	current_date: String,
	session_id: Option<u64>,
}

static LOG_STATE: Mutex<LogState> = Mutex::new(LogState {
	dir: None,
	file: None,
	current_date: String::new(),
	session_id: None,
});

pub fn init<P: AsRef<Path>>(dir: P) {
	if let Ok(mut state) = LOG_STATE.lock() {
		state.dir = Some(dir.as_ref().to_path_buf());
		state.file = None;
		state.current_date.clear();
	}
}

pub fn set_session(session_id: Option<u64>) {
	if let Ok(mut state) = LOG_STATE.lock() {
		state.session_id = session_id;
	}
}

fn ensure_log_file(state: &mut LogState) {
	let Some(dir) = state.dir.clone() else {
		return;
	};
	let date = Local::now().format("%Y-%m-%d").to_string();
	if state.current_date != date || state.file.is_none() {
		let _ = fs::create_dir_all(&dir);
		let path = dir.join(format!("poker-night-{}.log", date));
		if let Ok(file) = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&path)
		{
			state.file = Some(file);
			state.current_date = date;
		}
	}
}

pub fn log(module: &str, log_type: &str, message: &str) {
	if let Ok(mut state) = LOG_STATE.lock() {
		ensure_log_file(&mut state);

		let session = match state.session_id {
			Some(id) => format!("S{}", id),
			None => "S-".to_string(),
		};
		let line = format!(
			"[{}][{}][{}:{}] {}\n",
			Local::now().format("%H:%M:%S%.3f"),
			session,
			module,
			log_type,
			message
		);

		if let Some(ref mut file) = state.file {
			let _ = file.write_all(line.as_bytes());
			let _ = file.flush();
		}
	}
}

pub mod seating {
	use super::log;
	use crate::seating::SeatingError;

	pub fn generated(players: usize, tables: u32) {
		log("Seating", "GENERATE", &format!("{} players at {} tables", players, tables));
	}

	pub fn rejected(error: &SeatingError) {
		log("Seating", "REJECT", &error.to_string());
	}

	pub fn policy(message: &str) {
		log("Seating", "POLICY", message);
	}

	pub fn chart_created(chart_id: u64, name: &str, assignments: usize) {
		log("Seating", "CHART", &format!("#{} '{}' created with {} seats", chart_id, name, assignments));
	}

	pub fn chart_renamed(chart_id: u64, name: &str) {
		log("Seating", "CHART", &format!("#{} renamed to '{}'", chart_id, name));
	}

	pub fn chart_deleted(chart_id: u64) {
		log("Seating", "CHART", &format!("#{} deleted", chart_id));
	}
}

pub mod ledger {
	use super::log;

	pub fn player_added(player_id: u64, name: &str) {
		log("Ledger", "PLAYER", &format!("{}: {}", player_id, name));
	}

	pub fn rsvp(session_id: u64, player_id: u64, status: &str) {
		log("Ledger", "RSVP", &format!("session {} player {} -> {}", session_id, player_id, status));
	}

	pub fn buy_in(session_id: u64, player_id: u64, amount: f32, total: f32) {
		log(
			"Ledger",
			"BUYIN",
			&format!("session {} player {}: ${:.2} (total: ${:.2})", session_id, player_id, amount, total),
		);
	}

	pub fn cash_out(session_id: u64, player_id: u64, amount: f32, net: f32) {
		log(
			"Ledger",
			"CASHOUT",
			&format!("session {} player {}: ${:.2} (net: {:+.2})", session_id, player_id, amount, net),
		);
	}
}

pub mod server {
	use super::log;

	pub fn listening(addr: &str) {
		log("Server", "LISTEN", addr);
	}

	pub fn connected(conn_id: u64, peer: &str) {
		log("Server", "CONNECT", &format!("client {} from {}", conn_id, peer));
	}

	pub fn disconnected(conn_id: u64) {
		log("Server", "DISCONNECT", &format!("client {}", conn_id));
	}

	pub fn request(conn_id: u64, kind: &str) {
		log("Server", "REQUEST", &format!("client {}: {}", conn_id, kind));
	}

	pub fn error(conn_id: u64, message: &str) {
		log("Server", "ERROR", &format!("client {}: {}", conn_id, message));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_log_without_init_is_silent() {
		log("Test", "NOOP", "nothing to see");
	}
}
