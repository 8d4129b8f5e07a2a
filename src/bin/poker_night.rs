use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};

use poker_night::chart::SeatingChart;
use poker_night::config::{self, AppConfig};
use poker_night::defaults;
use poker_night::logging;
use poker_night::net::{SeatingClient, SeatingServer};
use poker_night::roster::Roster;
use poker_night::seating::{PlayerId, SeatingEngine, SeatingPolicy};
use poker_night::session::{RsvpStatus, SessionId};
use poker_night::store::{NewSession, Store};

#[derive(Parser)]
#[command(name = "poker-night")]
#[command(about = "Plan home poker games and seat the players")]
struct Cli {
	/// Config file to use instead of the usual search path
	#[arg(long, env = "POKER_NIGHT_CONFIG")]
	config: Option<PathBuf>,

	/// Directory holding the data file
	#[arg(long)]
	data: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Manage the player roster
	#[command(subcommand)]
	Player(PlayerCommand),

	/// Schedule games, track RSVPs and money
	#[command(subcommand)]
	Session(SessionCommand),

	/// Seat a session's confirmed players and save the chart
	Seat {
		session: SessionId,
		#[arg(short, long)]
		tables: Option<u32>,
		#[arg(short, long)]
		name: Option<String>,
		#[arg(long)]
		seed: Option<u64>,
		/// Skip the per-table size limits
		#[arg(long)]
		no_policy: bool,
	},

	/// Seat an ad-hoc list of player ids and print the assignments as JSON
	Shuffle {
		#[arg(short, long, value_delimiter = ',', required = true)]
		players: Vec<PlayerId>,
		#[arg(short, long)]
		tables: u32,
		#[arg(long)]
		seed: Option<u64>,
	},

	/// Inspect saved seating charts
	#[command(subcommand)]
	Chart(ChartCommand),

	/// Run the seating service
	Serve {
		#[arg(short, long)]
		addr: Option<String>,
	},

	/// Talk to a running seating service
	Remote {
		#[arg(short, long)]
		addr: Option<String>,

		#[command(subcommand)]
		command: RemoteCommand,
	},
}

#[derive(Subcommand)]
enum PlayerCommand {
	Add {
		name: String,
		#[arg(long)]
		email: Option<String>,
	},
	List,
	Rename {
		player: String,
		name: String,
	},
	Remove {
		player: String,
	},
}

#[derive(Subcommand)]
enum SessionCommand {
	Create {
		name: String,
		/// Start time, "YYYY-MM-DD HH:MM"
		#[arg(long)]
		at: String,
		#[arg(long)]
		location: Option<String>,
		#[arg(long)]
		buy_in: Option<f32>,
		#[arg(long)]
		max_players: Option<usize>,
	},
	List,
	Show {
		session: SessionId,
	},
	Invite {
		session: SessionId,
		#[arg(required = true)]
		players: Vec<String>,
	},
	Rsvp {
		session: SessionId,
		player: String,
		status: RsvpStatus,
	},
	BuyIn {
		session: SessionId,
		player: String,
		amount: Option<f32>,
	},
	CashOut {
		session: SessionId,
		player: String,
		amount: f32,
	},
	Results {
		session: SessionId,
	},
	Delete {
		session: SessionId,
	},
}

impl SessionCommand {
	fn session_id(&self) -> Option<SessionId> {
		match self {
			SessionCommand::Create { .. } | SessionCommand::List => None,
			SessionCommand::Show { session }
			| SessionCommand::Invite { session, .. }
			| SessionCommand::Rsvp { session, .. }
			| SessionCommand::BuyIn { session, .. }
			| SessionCommand::CashOut { session, .. }
			| SessionCommand::Results { session }
			| SessionCommand::Delete { session } => Some(*session),
		}
	}
}

#[derive(Subcommand)]
enum ChartCommand {
	List {
		#[arg(long)]
		session: Option<SessionId>,
	},
	Show {
		chart: u64,
	},
	Rename {
		chart: u64,
		name: String,
	},
	Delete {
		chart: u64,
	},
}

#[derive(Subcommand)]
enum RemoteCommand {
	Ping,
	Shuffle {
		#[arg(short, long, value_delimiter = ',', required = true)]
		players: Vec<PlayerId>,
		#[arg(short, long)]
		tables: u32,
		#[arg(long)]
		enforce_policy: bool,
	},
	Seat {
		session: SessionId,
		#[arg(short, long)]
		tables: Option<u32>,
		#[arg(short, long)]
		name: Option<String>,
	},
	Charts {
		#[arg(long)]
		session: Option<SessionId>,
	},
}

fn main() {
	let cli = Cli::parse();

	if let Err(e) = run(cli) {
		eprintln!("Error: {}", e);
		std::process::exit(1);
	}
}

fn load_config(cli: &Cli) -> Result<AppConfig, String> {
	let mut config = match &cli.config {
		Some(path) => config::load_from(path)?,
		None => {
			defaults::ensure_config();
			config::load()?
		}
	};
	if let Some(dir) = &cli.data {
		config.data_dir = Some(dir.clone());
	}
	Ok(config)
}

fn run(cli: Cli) -> Result<(), String> {
	let config = load_config(&cli)?;
	logging::init(config.log_path());

	match cli.command {
		Command::Shuffle { players, tables, seed } => {
			let assignments = SeatingEngine::new(seed)
				.generate(&players, tables)
				.map_err(|e| e.to_string())?;
			let json = serde_json::to_string_pretty(&assignments).map_err(|e| e.to_string())?;
			println!("{}", json);
			Ok(())
		}
		Command::Serve { addr } => {
			let addr = addr.unwrap_or_else(|| config.server.addr.clone());
			let store = Store::load_from(config.store_path())?;
			serve(store, config.seating, &addr)
		}
		Command::Remote { addr, command } => {
			let addr = addr.unwrap_or_else(|| config.server.addr.clone());
			remote(&addr, command).map_err(|e| e.to_string())
		}
		command => {
			let mut store = Store::load_from(config.store_path())?;
			local(&mut store, &config, command)?;
			store.save()
		}
	}
}

fn serve(store: Store, policy: SeatingPolicy, addr: &str) -> Result<(), String> {
	let runtime = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
	let server = Arc::new(SeatingServer::new(store, policy));
	println!("Listening on {}", addr);
	runtime.block_on(server.run(addr)).map_err(|e| format!("Server error: {}", e))
}

fn local(store: &mut Store, config: &AppConfig, command: Command) -> Result<(), String> {
	match command {
		Command::Player(cmd) => player(store, cmd),
		Command::Session(cmd) => session(store, config, cmd),
		Command::Chart(cmd) => chart(store, cmd),
		Command::Seat {
			session,
			tables,
			name,
			seed,
			no_policy,
		} => {
			let policy = if no_policy {
				SeatingPolicy::relaxed()
			} else {
				config.seating
			};
			logging::set_session(Some(session));
			let mut engine = SeatingEngine::new(seed);
			let chart = store
				.seat_session(session, name.as_deref(), tables, &policy, &mut engine)
				.map_err(|e| e.to_string())?
				.clone();
			print_chart(&chart, store.roster());
			Ok(())
		}
		Command::Shuffle { .. } | Command::Serve { .. } | Command::Remote { .. } => Ok(()),
	}
}

fn resolve(store: &Store, key: &str) -> Result<PlayerId, String> {
	store.roster().resolve(key).map(|p| p.id).map_err(|e| e.to_string())
}

fn player(store: &mut Store, cmd: PlayerCommand) -> Result<(), String> {
	match cmd {
		PlayerCommand::Add { name, email } => {
			let id = store.add_player(&name, email).map_err(|e| e.to_string())?;
			println!("Added {} as player #{}", name.trim(), id);
		}
		PlayerCommand::List => {
			if store.roster().is_empty() {
				println!("No players yet");
			}
			for p in store.roster().list() {
				match &p.email {
					Some(email) => println!("{:>4}  {} <{}>", p.id, p.name, email),
					None => println!("{:>4}  {}", p.id, p.name),
				}
			}
		}
		PlayerCommand::Rename { player, name } => {
			let id = resolve(store, &player)?;
			store.rename_player(id, &name).map_err(|e| e.to_string())?;
		}
		PlayerCommand::Remove { player } => {
			let id = resolve(store, &player)?;
			let removed = store.remove_player(id).map_err(|e| e.to_string())?;
			println!("Removed {}", removed.name);
		}
	}
	Ok(())
}

fn session(store: &mut Store, config: &AppConfig, cmd: SessionCommand) -> Result<(), String> {
	logging::set_session(cmd.session_id());

	match cmd {
		SessionCommand::Create {
			name,
			at,
			location,
			buy_in,
			max_players,
		} => {
			let scheduled_for = NaiveDateTime::parse_from_str(&at, "%Y-%m-%d %H:%M")
				.map_err(|e| format!("Bad start time '{}': {}", at, e))?;
			let id = store.create_session(NewSession {
				name,
				scheduled_for,
				location,
				buy_in: buy_in.unwrap_or(config.default_buy_in),
				max_players,
			});
			println!("Created session #{}", id);
		}
		SessionCommand::List => {
			for s in store.sessions() {
				let counts = s.counts();
				println!(
					"{:>4}  {}  {}  ({} confirmed, {} waitlisted)",
					s.id,
					s.scheduled_for.format("%Y-%m-%d %H:%M"),
					s.name,
					counts.confirmed,
					counts.waitlisted
				);
			}
		}
		SessionCommand::Show { session } => {
			let s = store.session(session).map_err(|e| e.to_string())?;
			println!("{} ({})", s.name, s.scheduled_for.format("%Y-%m-%d %H:%M"));
			if let Some(location) = &s.location {
				println!("At: {}", location);
			}
			println!("Buy-in: {:.2}", s.buy_in);
			if let Some(max) = s.max_players {
				println!("Seats: {}", max);
			}
			for (id, entry) in &s.players {
				println!("  {:<20} {}", store.roster().name_of(*id), entry.status);
			}
		}
		SessionCommand::Invite { session, players } => {
			for key in &players {
				let id = resolve(store, key)?;
				if !store.invite(session, id).map_err(|e| e.to_string())? {
					println!("{} was already on the list", store.roster().name_of(id));
				}
			}
		}
		SessionCommand::Rsvp { session, player, status } => {
			let id = resolve(store, &player)?;
			let change = store.set_rsvp(session, id, status).map_err(|e| e.to_string())?;
			println!("{} is {}", store.roster().name_of(id), change.status);
			if let Some(promoted) = change.promoted {
				println!("{} moved off the waitlist", store.roster().name_of(promoted));
			}
		}
		SessionCommand::BuyIn { session, player, amount } => {
			let id = resolve(store, &player)?;
			let total = store.buy_in(session, id, amount).map_err(|e| e.to_string())?;
			println!("{} is in for {:.2}", store.roster().name_of(id), total);
		}
		SessionCommand::CashOut { session, player, amount } => {
			let id = resolve(store, &player)?;
			let net = store.cash_out(session, id, amount).map_err(|e| e.to_string())?;
			println!("{} net {:+.2}", store.roster().name_of(id), net);
		}
		SessionCommand::Results { session } => {
			let s = store.session(session).map_err(|e| e.to_string())?;
			for r in s.results() {
				let name = store.roster().name_of(r.player_id);
				match (r.cash_out, r.net) {
					(Some(out), Some(net)) => {
						println!("{:<20} in {:>8.2}  out {:>8.2}  {:>+9.2}", name, r.buy_in, out, net)
					}
					_ => println!("{:<20} in {:>8.2}  (still playing)", name, r.buy_in),
				}
			}
			if !s.is_balanced() {
				println!("Books are off by {:+.2}", s.discrepancy());
			}
		}
		SessionCommand::Delete { session } => {
			let removed = store.delete_session(session).map_err(|e| e.to_string())?;
			println!("Deleted {}", removed.name);
		}
	}
	Ok(())
}

fn chart(store: &mut Store, cmd: ChartCommand) -> Result<(), String> {
	match cmd {
		ChartCommand::List { session } => {
			for c in store.list_charts(session) {
				println!(
					"{:>4}  {}  {} players at {} tables",
					c.id,
					c.name,
					c.player_count(),
					c.number_of_tables
				);
			}
		}
		ChartCommand::Show { chart } => {
			let c = store.chart(chart).map_err(|e| e.to_string())?;
			print_chart(c, store.roster());
		}
		ChartCommand::Rename { chart, name } => {
			store.rename_chart(chart, &name).map_err(|e| e.to_string())?;
		}
		ChartCommand::Delete { chart } => {
			store.delete_chart(chart).map_err(|e| e.to_string())?;
		}
	}
	Ok(())
}

fn print_chart(chart: &SeatingChart, roster: &Roster) {
	println!("#{} {}", chart.id, chart.name);
	for (table, seats) in chart.tables() {
		println!("Table {}", table);
		for a in seats {
			println!("  Seat {:>2}: {}", a.seat_position, roster.name_of(a.player_id));
		}
	}
}

fn remote(addr: &str, command: RemoteCommand) -> std::io::Result<()> {
	let mut client = SeatingClient::connect(addr)?;
	match command {
		RemoteCommand::Ping => {
			client.ping()?;
			println!("pong from {}", addr);
		}
		RemoteCommand::Shuffle {
			players,
			tables,
			enforce_policy,
		} => {
			let assignments = client.generate(players, tables, enforce_policy)?;
			let json = serde_json::to_string_pretty(&assignments).map_err(std::io::Error::other)?;
			println!("{}", json);
		}
		RemoteCommand::Seat { session, tables, name } => {
			let chart = client.seat_session(session, name, tables)?;
			for a in &chart.assignments {
				println!("Table {} seat {}: player #{}", a.table_number, a.seat_position, a.player_id);
			}
		}
		RemoteCommand::Charts { session } => {
			for c in client.list_charts(session)? {
				println!("{:>4}  {}  {} players at {} tables", c.id, c.name, c.players, c.number_of_tables);
			}
		}
	}
	Ok(())
}
