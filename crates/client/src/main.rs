//! Clocktower headless client - terminal composition root binary.

use std::io::Write;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clocktower_client::config::load_dotenv;
use clocktower_client::{ClientConfig, ClientState, CommandEncoder, DebugLog, GameClient, StateReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    load_dotenv(&cwd);

    // Logs go to stderr so they do not interleave with the game transcript.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clocktower_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Clocktower client");

    let config = ClientConfig::from_env().context("Invalid client configuration")?;
    tracing::info!(
        endpoint = %config.endpoint,
        player_id = %config.player_id,
        reconnect = config.reconnect,
        "Configuration loaded"
    );

    let mut client = GameClient::connect(config)
        .await
        .context("Failed to connect to game server")?;

    let printer = tokio::spawn(print_updates(client.state()));
    let result = run_prompt(&client).await;

    client.shutdown().await;
    printer.abort();
    result
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Start,
    Join,
    Nominate(String),
    Vote(bool),
    Night(String),
    Players,
    State,
    Private,
    Debug {
        agent: Option<String>,
        filter: String,
    },
    Quit,
    Chat(String),
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Chat(line.to_string()));
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        let arg = words.next().map(str::to_string);

        match (name, arg) {
            ("start", None) => Ok(Command::Start),
            ("join", None) => Ok(Command::Join),
            ("nominate", Some(id)) => Ok(Command::Nominate(id)),
            ("vote", Some(vote)) => match vote.to_ascii_lowercase().as_str() {
                "yes" | "y" => Ok(Command::Vote(true)),
                "no" | "n" => Ok(Command::Vote(false)),
                _ => Err("usage: /vote yes|no".to_string()),
            },
            ("night", Some(id)) => Ok(Command::Night(id)),
            ("players", None) => Ok(Command::Players),
            ("state", None) => Ok(Command::State),
            ("private", None) => Ok(Command::Private),
            ("debug", agent) => Ok(Command::Debug {
                agent,
                filter: words.collect::<Vec<_>>().join(" "),
            }),
            ("quit" | "exit", None) => Ok(Command::Quit),
            ("nominate" | "night", None) => Err(format!("usage: /{name} <player id>")),
            ("vote", None) => Err("usage: /vote yes|no".to_string()),
            _ => Err(format!("unknown command: /{name}")),
        }
    }
}

async fn run_prompt(client: &GameClient) -> anyhow::Result<()> {
    let commands = client.commands();
    let state = client.state();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(usage) => {
                println!("{usage}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        execute(command, &commands, &state, client.identity());
        let _ = std::io::stdout().flush();
    }
    Ok(())
}

fn execute(command: Command, commands: &CommandEncoder, state: &StateReader, identity: &str) {
    let sent = match command {
        Command::Start => commands.request_game_start(),
        Command::Join => commands.join_game(),
        Command::Nominate(id) => commands.nominate(id),
        Command::Vote(vote) => commands.cast_vote(vote),
        Command::Night(id) => commands.night_action(id),
        Command::Chat(text) => commands.send_chat(text),
        Command::Players => {
            state.with(print_players);
            Ok(())
        }
        Command::State => {
            state.with(print_summary);
            Ok(())
        }
        Command::Private => {
            state.with(|s| print_private(s, identity));
            Ok(())
        }
        Command::Debug { agent, filter } => {
            state.with(|s| print_debug(s, agent.as_deref(), &filter));
            Ok(())
        }
        Command::Quit => Ok(()),
    };
    if let Err(e) = sent {
        println!("! {e}");
    }
}

/// Print chat lines and phase changes as snapshots arrive.
async fn print_updates(mut state: StateReader) {
    let mut epoch = 0;
    let mut printed = 0;
    let mut phase = None;
    let mut connection = None;

    loop {
        let snapshot = state.latest();
        if snapshot.epoch != epoch {
            epoch = snapshot.epoch;
            printed = 0;
        }
        if connection != Some(snapshot.connection) {
            connection = Some(snapshot.connection);
            println!("-- connection {:?}", snapshot.connection);
        }
        if phase != Some(snapshot.game.current_phase) {
            phase = Some(snapshot.game.current_phase);
            println!(
                "-- phase {} (day {})",
                snapshot.game.current_phase, snapshot.game.day_number
            );
        }
        for message in snapshot.chat.iter().skip(printed) {
            println!("[{}] {}", message.sender, message.text);
        }
        printed = snapshot.chat.len();
        let _ = std::io::stdout().flush();

        if !state.changed().await {
            break;
        }
    }
}

fn print_players(state: &ClientState) {
    if state.players.is_empty() {
        println!("no players yet");
        return;
    }
    for player in &state.players {
        let status = if player.is_alive { "alive" } else { "dead" };
        println!("  {:<16} {:<20} {status}", player.id, player.display_name());
    }
}

fn print_summary(state: &ClientState) {
    println!(
        "connection {:?}, epoch {}, phase {}, day {}",
        state.connection, state.epoch, state.game.current_phase, state.game.day_number
    );
    if let Some(nominee) = state.nominee() {
        println!("nominee: {} ({})", nominee.display_name(), nominee.id);
    }
    if let Some(error) = &state.last_error {
        println!("last error: {error}");
    }
}

fn print_private(state: &ClientState, identity: &str) {
    let Some(info) = &state.private_info else {
        println!("no private info for {identity} yet");
        return;
    };
    println!(
        "role: {}  alignment: {}",
        info.role.as_deref().unwrap_or("?"),
        info.alignment.as_deref().unwrap_or("?")
    );
    if let Some(description) = &info.description {
        println!("  {description}");
    }
    for clue in &info.clues {
        match clue.night {
            Some(night) => println!("  night {night}: {}", clue.text),
            None => println!("  {}", clue.text),
        }
    }
    if let Some(demon) = &info.known_demon {
        println!("  demon: {demon}");
    }
    if !info.known_minions.is_empty() {
        println!("  minions: {}", info.known_minions.join(", "));
    }
    if !info.demon_bluffs.is_empty() {
        println!("  bluffs: {}", info.demon_bluffs.join(", "));
    }
}

fn print_debug(state: &ClientState, agent: Option<&str>, filter: &str) {
    let Some(agent) = agent else {
        for agent in state.debug.agents(&state.players) {
            let count = state
                .debug
                .bucket(&agent)
                .map_or(0, |b| b.prompts().len() + b.responses().len());
            println!(
                "  {:<16} {:<28} {count} entries",
                agent,
                DebugLog::display_name(&agent, &state.players)
            );
        }
        return;
    };

    let Some(bucket) = state.debug.bucket(agent) else {
        println!("no traces for {agent}");
        return;
    };
    println!("{}", DebugLog::display_name(agent, &state.players));
    for thought in bucket.search(filter) {
        println!(
            "  #{} {}: {}",
            thought.index + 1,
            thought.kind.label(),
            thought.entry.content
        );
    }
}
