use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::logging;
use crate::net::protocol::*;
use crate::seating::{SeatingEngine, SeatingPolicy};
use crate::store::{Store, StoreError};

type ConnectionId = u64;

pub struct SeatingServer {
	store: Arc<Mutex<Store>>,
	policy: SeatingPolicy,
	next_conn_id: AtomicU64,
}

impl SeatingServer {
	pub fn new(store: Store, policy: SeatingPolicy) -> Self {
		Self {
			store: Arc::new(Mutex::new(store)),
			policy,
			next_conn_id: AtomicU64::new(1),
		}
	}

	pub fn store(&self) -> Arc<Mutex<Store>> {
		Arc::clone(&self.store)
	}

	pub async fn run(self: Arc<Self>, addr: &str) -> std::io::Result<()> {
		let listener = TcpListener::bind(addr).await?;
		self.run_with_listener(listener).await
	}

	pub async fn run_with_listener(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
		let local = listener.local_addr()?;
		logging::server::listening(&local.to_string());

		loop {
			match listener.accept().await {
				Ok((stream, peer)) => {
					let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
					let server = Arc::clone(&self);
					tokio::spawn(async move {
						server.handle_connection(conn_id, stream, peer).await;
					});
				}
				Err(e) => {
					logging::server::error(0, &format!("accept failed: {}", e));
				}
			}
		}
	}

	async fn handle_connection(&self, conn_id: ConnectionId, mut stream: TcpStream, peer: SocketAddr) {
		logging::server::connected(conn_id, &peer.to_string());

		let mut buf = vec![0u8; 4096];
		let mut pending = Vec::new();

		'read: loop {
			match stream.read(&mut buf).await {
				Ok(0) => break,
				Ok(n) => {
					pending.extend_from_slice(&buf[..n]);
					while let Some(decoded) = try_decode_message::<ClientMessage>(&mut pending, MAX_FRAME) {
						let (reply, fatal) = match decoded {
							Ok(msg) => (self.process_message(conn_id, msg).await, false),
							Err(e @ FrameError::TooLarge { .. }) => {
								(ServerMessage::error(ErrorKind::BadRequest, e.to_string()), true)
							}
							Err(e) => (ServerMessage::error(ErrorKind::BadRequest, e.to_string()), false),
						};

						if let Err(e) = send(&mut stream, &reply).await {
							logging::server::error(conn_id, &e.to_string());
							break 'read;
						}
						if fatal {
							break 'read;
						}
					}
				}
				Err(_) => break,
			}
		}

		logging::server::disconnected(conn_id);
	}

	async fn process_message(&self, conn_id: ConnectionId, msg: ClientMessage) -> ServerMessage {
		logging::server::request(conn_id, msg.kind());

		if let ClientMessage::Generate { request, enforce_policy } = &msg {
			return generate(request, *enforce_policy, &self.policy);
		}

		let mut store = self.store.lock().await;
		let snapshot = msg.mutates().then(|| store.clone());
		let reply = handle_message(&mut store, &self.policy, msg);

		if let Some(snapshot) = snapshot {
			if !matches!(reply, ServerMessage::Error { .. }) {
				if let Err(e) = store.save() {
					// Memory must not keep a change the client was told failed.
					*store = snapshot;
					logging::server::error(conn_id, &e);
					return ServerMessage::error(ErrorKind::Internal, e);
				}
			}
		}
		reply
	}
}

async fn send(stream: &mut TcpStream, msg: &ServerMessage) -> std::io::Result<()> {
	let data = encode_message(msg).map_err(std::io::Error::other)?;
	stream.write_all(&data).await
}

fn generate(
	request: &crate::seating::SeatingRequest,
	enforce_policy: bool,
	policy: &SeatingPolicy,
) -> ServerMessage {
	if enforce_policy {
		if let Err(violation) = policy.check(request.player_ids.len(), request.number_of_tables) {
			return StoreError::from(violation).into();
		}
	}
	match SeatingEngine::default().generate_request(request) {
		Ok(assignments) => ServerMessage::Assignments { assignments },
		Err(e) => StoreError::from(e).into(),
	}
}

pub fn handle_message(store: &mut Store, policy: &SeatingPolicy, msg: ClientMessage) -> ServerMessage {
	let mut engine = SeatingEngine::default();

	let result = match msg {
		ClientMessage::Ping => Ok(ServerMessage::Pong),

		ClientMessage::Generate { request, enforce_policy } => Ok(generate(&request, enforce_policy, policy)),

		ClientMessage::CreateChart { name, session_id, request } => store
			.create_chart(&name, session_id, &request, policy, &mut engine)
			.map(|chart| ServerMessage::Chart { chart: chart.clone() }),

		ClientMessage::SeatSession { session_id, name, tables } => store
			.seat_session(session_id, name.as_deref(), tables, policy, &mut engine)
			.map(|chart| ServerMessage::Chart { chart: chart.clone() }),

		ClientMessage::ListCharts { session_id } => Ok(ServerMessage::Charts {
			charts: store.list_charts(session_id).into_iter().map(|c| c.summary()).collect(),
		}),

		ClientMessage::GetChart { chart_id } => store
			.chart(chart_id)
			.map(|chart| ServerMessage::Chart { chart: chart.clone() }),

		ClientMessage::RenameChart { chart_id, name } => store
			.rename_chart(chart_id, &name)
			.map(|_| ServerMessage::Renamed { chart_id, name }),

		ClientMessage::DeleteChart { chart_id } => store
			.delete_chart(chart_id)
			.map(|_| ServerMessage::Deleted { chart_id }),
	};

	result.unwrap_or_else(ServerMessage::from)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::seating::SeatingRequest;

	fn store_with_players(n: usize) -> Store {
		let mut store = Store::in_memory();
		for i in 0..n {
			store.add_player(&format!("P{}", i + 1), None).unwrap();
		}
		store
	}

	#[test]
	fn test_ping() {
		let mut store = Store::in_memory();
		let reply = handle_message(&mut store, &SeatingPolicy::default(), ClientMessage::Ping);
		assert_eq!(reply, ServerMessage::Pong);
	}

	#[test]
	fn test_generate_does_not_store() {
		let mut store = Store::in_memory();
		let msg = ClientMessage::Generate {
			request: SeatingRequest::new(vec![1, 2, 3, 4, 5, 6, 7], 2),
			enforce_policy: true,
		};
		let reply = handle_message(&mut store, &SeatingPolicy::default(), msg);
		match reply {
			ServerMessage::Assignments { assignments } => assert_eq!(assignments.len(), 7),
			other => panic!("unexpected reply: {:?}", other),
		}
		assert!(store.list_charts(None).is_empty());
	}

	#[test]
	fn test_generate_maps_validation_errors() {
		let mut store = Store::in_memory();
		let policy = SeatingPolicy::default();
		let cases = [
			(SeatingRequest::new(vec![], 1), ErrorKind::EmptyRoster),
			(SeatingRequest::new(vec![1, 2], 0), ErrorKind::NoTables),
			(SeatingRequest::new(vec![1, 2, 3], 4), ErrorKind::MoreTablesThanPlayers),
			(SeatingRequest::new(vec![1, 1], 1), ErrorKind::DuplicatePlayer),
		];
		for (request, expected) in cases {
			let msg = ClientMessage::Generate { request, enforce_policy: false };
			match handle_message(&mut store, &policy, msg) {
				ServerMessage::Error { kind, .. } => assert_eq!(kind, expected),
				other => panic!("expected {:?}, got {:?}", expected, other),
			}
		}
	}

	#[test]
	fn test_generate_negative_tables_is_no_tables() {
		let mut store = Store::in_memory();
		let msg: ClientMessage =
			serde_json::from_str(r#"{"type":"generate","playerIds":[1,2],"numberOfTables":-1}"#).unwrap();
		match handle_message(&mut store, &SeatingPolicy::default(), msg) {
			ServerMessage::Error { kind, .. } => assert_eq!(kind, ErrorKind::NoTables),
			other => panic!("unexpected reply: {:?}", other),
		}
	}

	#[test]
	fn test_generate_policy_opt_in() {
		let mut store = Store::in_memory();
		let policy = SeatingPolicy::default();
		let request = SeatingRequest::new(vec![1, 2, 3], 3);

		let strict = ClientMessage::Generate { request: request.clone(), enforce_policy: true };
		assert!(matches!(
			handle_message(&mut store, &policy, strict),
			ServerMessage::Error { kind: ErrorKind::Policy, .. }
		));

		let loose = ClientMessage::Generate { request, enforce_policy: false };
		assert!(matches!(handle_message(&mut store, &policy, loose), ServerMessage::Assignments { .. }));
	}

	#[test]
	fn test_chart_lifecycle() {
		let mut store = store_with_players(6);
		let policy = SeatingPolicy::default();

		let created = handle_message(
			&mut store,
			&policy,
			ClientMessage::CreateChart {
				name: "Tonight".to_string(),
				session_id: None,
				request: SeatingRequest::new(vec![1, 2, 3, 4, 5, 6], 2),
			},
		);
		let chart_id = match created {
			ServerMessage::Chart { chart } => chart.id,
			other => panic!("unexpected reply: {:?}", other),
		};

		let renamed = handle_message(
			&mut store,
			&policy,
			ClientMessage::RenameChart { chart_id, name: "Final".to_string() },
		);
		assert_eq!(renamed, ServerMessage::Renamed { chart_id, name: "Final".to_string() });

		match handle_message(&mut store, &policy, ClientMessage::ListCharts { session_id: None }) {
			ServerMessage::Charts { charts } => {
				assert_eq!(charts.len(), 1);
				assert_eq!(charts[0].name, "Final");
				assert_eq!(charts[0].players, 6);
			}
			other => panic!("unexpected reply: {:?}", other),
		}

		let deleted = handle_message(&mut store, &policy, ClientMessage::DeleteChart { chart_id });
		assert_eq!(deleted, ServerMessage::Deleted { chart_id });

		let missing = handle_message(&mut store, &policy, ClientMessage::GetChart { chart_id });
		assert!(matches!(missing, ServerMessage::Error { kind: ErrorKind::NotFound, .. }));
	}

	#[tokio::test]
	async fn test_failed_save_rolls_back() {
		let base = std::env::temp_dir().join(format!("poker-night-unwritable-{}", std::process::id()));
		let _ = std::fs::remove_dir_all(&base);
		std::fs::create_dir_all(&base).unwrap();
		let blocker = base.join("not-a-dir");
		std::fs::write(&blocker, "").unwrap();

		let mut store = Store::load_from(blocker.join("sub").join("store.json")).unwrap();
		for i in 0..4 {
			store.add_player(&format!("P{}", i + 1), None).unwrap();
		}
		let server = SeatingServer::new(store, SeatingPolicy::default());

		let reply = server
			.process_message(
				1,
				ClientMessage::CreateChart {
					name: "Lost".to_string(),
					session_id: None,
					request: SeatingRequest::new(vec![1, 2, 3, 4], 2),
				},
			)
			.await;
		assert!(matches!(reply, ServerMessage::Error { kind: ErrorKind::Internal, .. }));

		match server.process_message(2, ClientMessage::ListCharts { session_id: None }).await {
			ServerMessage::Charts { charts } => assert!(charts.is_empty()),
			other => panic!("unexpected reply: {:?}", other),
		}
		assert_eq!(server.store().lock().await.roster().len(), 4);
		let _ = std::fs::remove_dir_all(&base);
	}

	#[test]
	fn test_seat_unknown_session() {
		let mut store = Store::in_memory();
		let reply = handle_message(
			&mut store,
			&SeatingPolicy::default(),
			ClientMessage::SeatSession { session_id: 42, name: None, tables: None },
		);
		assert!(matches!(reply, ServerMessage::Error { kind: ErrorKind::NotFound, .. }));
	}
}
