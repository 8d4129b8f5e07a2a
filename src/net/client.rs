use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::chart::{ChartId, ChartSummary, SeatingChart};
use crate::net::protocol::*;
use crate::seating::{PlayerId, SeatingAssignment, SeatingRequest};
use crate::session::SessionId;

pub struct SeatingClient {
	stream: TcpStream,
	pending: Vec<u8>,
}

fn unexpected(reply: ServerMessage) -> io::Error {
	match reply {
		ServerMessage::Error { kind, message } => {
			io::Error::new(io::ErrorKind::InvalidInput, format!("{:?}: {}", kind, message))
		}
		other => io::Error::new(io::ErrorKind::InvalidData, format!("unexpected reply: {:?}", other)),
	}
}

impl SeatingClient {
	pub fn connect(addr: &str) -> io::Result<Self> {
		let stream = TcpStream::connect(addr)?;
		stream.set_read_timeout(Some(Duration::from_secs(10)))?;
		Ok(Self {
			stream,
			pending: Vec::new(),
		})
	}

	pub fn send(&mut self, msg: &ClientMessage) -> io::Result<()> {
		let data = encode_message(msg).map_err(io::Error::other)?;
		self.stream.write_all(&data)
	}

	pub fn recv(&mut self) -> io::Result<ServerMessage> {
		let mut buf = vec![0u8; 4096];
		loop {
			if let Some(decoded) = try_decode_message::<ServerMessage>(&mut self.pending, usize::MAX) {
				return decoded.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
			}
			let n = self.stream.read(&mut buf)?;
			if n == 0 {
				return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "server closed the connection"));
			}
			self.pending.extend_from_slice(&buf[..n]);
		}
	}

	/// Sends one request and waits for its reply. Error replies come back as
	/// `Ok(ServerMessage::Error { .. })`.
	pub fn request(&mut self, msg: &ClientMessage) -> io::Result<ServerMessage> {
		self.send(msg)?;
		self.recv()
	}

	pub fn ping(&mut self) -> io::Result<()> {
		match self.request(&ClientMessage::Ping)? {
			ServerMessage::Pong => Ok(()),
			other => Err(unexpected(other)),
		}
	}

	pub fn generate(
		&mut self,
		player_ids: Vec<PlayerId>,
		number_of_tables: u32,
		enforce_policy: bool,
	) -> io::Result<Vec<SeatingAssignment>> {
		let msg = ClientMessage::Generate {
			request: SeatingRequest::new(player_ids, number_of_tables),
			enforce_policy,
		};
		match self.request(&msg)? {
			ServerMessage::Assignments { assignments } => Ok(assignments),
			other => Err(unexpected(other)),
		}
	}

	pub fn create_chart(
		&mut self,
		name: &str,
		session_id: Option<SessionId>,
		request: SeatingRequest,
	) -> io::Result<SeatingChart> {
		let msg = ClientMessage::CreateChart {
			name: name.to_string(),
			session_id,
			request,
		};
		match self.request(&msg)? {
			ServerMessage::Chart { chart } => Ok(chart),
			other => Err(unexpected(other)),
		}
	}

	pub fn seat_session(
		&mut self,
		session_id: SessionId,
		name: Option<String>,
		tables: Option<u32>,
	) -> io::Result<SeatingChart> {
		match self.request(&ClientMessage::SeatSession { session_id, name, tables })? {
			ServerMessage::Chart { chart } => Ok(chart),
			other => Err(unexpected(other)),
		}
	}

	pub fn list_charts(&mut self, session_id: Option<SessionId>) -> io::Result<Vec<ChartSummary>> {
		match self.request(&ClientMessage::ListCharts { session_id })? {
			ServerMessage::Charts { charts } => Ok(charts),
			other => Err(unexpected(other)),
		}
	}

	pub fn get_chart(&mut self, chart_id: ChartId) -> io::Result<SeatingChart> {
		match self.request(&ClientMessage::GetChart { chart_id })? {
			ServerMessage::Chart { chart } => Ok(chart),
			other => Err(unexpected(other)),
		}
	}

	pub fn rename_chart(&mut self, chart_id: ChartId, name: &str) -> io::Result<()> {
		let msg = ClientMessage::RenameChart {
			chart_id,
			name: name.to_string(),
		};
		match self.request(&msg)? {
			ServerMessage::Renamed { .. } => Ok(()),
			other => Err(unexpected(other)),
		}
	}

	pub fn delete_chart(&mut self, chart_id: ChartId) -> io::Result<()> {
		match self.request(&ClientMessage::DeleteChart { chart_id })? {
			ServerMessage::Deleted { .. } => Ok(()),
			other => Err(unexpected(other)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::net::TcpListener;
	use std::thread;

	#[test]
	fn test_recv_accepts_reply_over_request_cap() {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap().to_string();
		let reply = ServerMessage::error(ErrorKind::Internal, "y".repeat(MAX_FRAME * 2));
		let sent = reply.clone();

		let handle = thread::spawn(move || {
			let (mut stream, _) = listener.accept().unwrap();
			stream.write_all(&encode_message(&sent).unwrap()).unwrap();
		});

		let mut client = SeatingClient::connect(&addr).unwrap();
		assert_eq!(client.recv().unwrap(), reply);
		handle.join().unwrap();
	}
}
