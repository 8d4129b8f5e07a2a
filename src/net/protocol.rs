use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::chart::{ChartId, ChartSummary, SeatingChart};
use crate::seating::{SeatingAssignment, SeatingError, SeatingRequest};
use crate::session::SessionId;
use crate::store::StoreError;

// Cap on request frames a server accepts. Replies are not capped.
pub const MAX_FRAME: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
	Ping,
	Generate {
		#[serde(flatten)]
		request: SeatingRequest,
		#[serde(default)]
		enforce_policy: bool,
	},
	CreateChart {
		name: String,
		#[serde(default)]
		session_id: Option<SessionId>,
		#[serde(flatten)]
		request: SeatingRequest,
	},
	SeatSession {
		session_id: SessionId,
		#[serde(default)]
		name: Option<String>,
		#[serde(default)]
		tables: Option<u32>,
	},
	ListCharts {
		#[serde(default)]
		session_id: Option<SessionId>,
	},
	GetChart {
		chart_id: ChartId,
	},
	RenameChart {
		chart_id: ChartId,
		name: String,
	},
	DeleteChart {
		chart_id: ChartId,
	},
}

impl ClientMessage {
	pub fn kind(&self) -> &'static str {
		match self {
			ClientMessage::Ping => "ping",
			ClientMessage::Generate { .. } => "generate",
			ClientMessage::CreateChart { .. } => "create_chart",
			ClientMessage::SeatSession { .. } => "seat_session",
			ClientMessage::ListCharts { .. } => "list_charts",
			ClientMessage::GetChart { .. } => "get_chart",
			ClientMessage::RenameChart { .. } => "rename_chart",
			ClientMessage::DeleteChart { .. } => "delete_chart",
		}
	}

	pub fn mutates(&self) -> bool {
		matches!(
			self,
			ClientMessage::CreateChart { .. }
				| ClientMessage::SeatSession { .. }
				| ClientMessage::RenameChart { .. }
				| ClientMessage::DeleteChart { .. }
		)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
	Pong,
	Assignments {
		assignments: Vec<SeatingAssignment>,
	},
	Chart {
		chart: SeatingChart,
	},
	Charts {
		charts: Vec<ChartSummary>,
	},
	Renamed {
		chart_id: ChartId,
		name: String,
	},
	Deleted {
		chart_id: ChartId,
	},
	Error {
		kind: ErrorKind,
		message: String,
	},
}

impl ServerMessage {
	pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
		ServerMessage::Error {
			kind,
			message: message.into(),
		}
	}
}

impl From<StoreError> for ServerMessage {
	fn from(e: StoreError) -> Self {
		ServerMessage::error(ErrorKind::from(&e), e.to_string())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	EmptyRoster,
	NoTables,
	MoreTablesThanPlayers,
	DuplicatePlayer,
	Policy,
	NotFound,
	BadRequest,
	Internal,
}

impl From<&SeatingError> for ErrorKind {
	fn from(e: &SeatingError) -> Self {
		match e {
			SeatingError::EmptyRoster => ErrorKind::EmptyRoster,
			SeatingError::NoTables => ErrorKind::NoTables,
			SeatingError::MoreTablesThanPlayers { .. } => ErrorKind::MoreTablesThanPlayers,
			SeatingError::DuplicatePlayer(_) => ErrorKind::DuplicatePlayer,
			SeatingError::SourceOutOfRange { .. } => ErrorKind::Internal,
		}
	}
}

impl From<&StoreError> for ErrorKind {
	fn from(e: &StoreError) -> Self {
		match e {
			StoreError::Seating(inner) => ErrorKind::from(inner),
			StoreError::Policy(_) => ErrorKind::Policy,
			StoreError::PlayerNotFound(_)
			| StoreError::UnknownPlayer(_)
			| StoreError::SessionNotFound(_)
			| StoreError::ChartNotFound(_) => ErrorKind::NotFound,
			_ => ErrorKind::BadRequest,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
	#[error("frame of {len} bytes exceeds the {limit} byte limit")]
	TooLarge { len: usize, limit: usize },
	#[error("malformed message: {0}")]
	Malformed(String),
}

pub fn encode_message<T: Serialize>(msg: &T) -> serde_json::Result<Vec<u8>> {
	let json = serde_json::to_string(msg)?;
	let len = json.len() as u32;
	let mut buf = len.to_be_bytes().to_vec();
	buf.extend(json.as_bytes());
	Ok(buf)
}

pub fn decode_length(buf: &[u8]) -> Option<u32> {
	if buf.len() < 4 {
		return None;
	}
	Some(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

pub fn try_decode_message<T: DeserializeOwned>(buf: &mut Vec<u8>, limit: usize) -> Option<Result<T, FrameError>> {
	let len = decode_length(buf)? as usize;
	if len > limit {
		return Some(Err(FrameError::TooLarge { len, limit }));
	}
	if buf.len() < 4 + len {
		return None;
	}
	let decoded = serde_json::from_slice(&buf[4..4 + len])
		.map_err(|e| FrameError::Malformed(e.to_string()));
	buf.drain(..4 + len);
	Some(decoded)
}
