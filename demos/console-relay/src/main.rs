//! Console relay: the terminal plays the chat channel.
//!
//! Notifications print to stdout. Lines typed on stdin are chat messages
//! in the bound channel, except lines starting with the bot prefix,
//! which are operator commands (`!help` lists them).
//!
//! ```text
//! RUST_LOG=debug cargo run -p console-relay -- config.json
//! ```

use realmrelay::prelude::*;
use realmrelay::transport::TransportError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Chat side
// ---------------------------------------------------------------------------

/// Prints notifications instead of posting them.
struct StdoutSink;

impl NotificationSink for StdoutSink {
    async fn send(&self, channel: &ChannelId, notification: &Notification) -> Result<(), TransportError> {
        println!("{channel} {notification}");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Operator commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Command {
    Setup(String),
    Connect,
    Disconnect,
    Players,
    Say(String),
    Adjust { list: ModerationList, value: String, present: bool },
    Status,
    Help,
    Quit,
}

const HELP: &str = "\
setup <channel>            bind the relay channel
connect / disconnect       join or leave the realm
players                    list who is online
say <text>                 speak in game
whitelist|block|devices add|remove <value>
status / quit";

/// `None` means the line is chat, not a command.
fn parse(line: &str, prefix: &str) -> Option<Result<Command, String>> {
    let rest = line.trim().strip_prefix(prefix)?;
    let (word, args) = rest.split_once(' ').unwrap_or((rest, ""));
    let args = args.trim();

    let cmd = match word {
        "setup" if !args.is_empty() => Command::Setup(args.to_string()),
        "setup" => return Some(Err("usage: setup <channel>".into())),
        "connect" => Command::Connect,
        "disconnect" => Command::Disconnect,
        "players" => Command::Players,
        "say" => Command::Say(args.to_string()),
        "status" => Command::Status,
        "help" => Command::Help,
        "quit" => Command::Quit,
        list => {
            let list = match ModerationList::from_name(list) {
                Ok(list) => list,
                Err(_) => return Some(Err(format!("unknown command: {word}"))),
            };
            let (action, value) = args.split_once(' ').unwrap_or((args, ""));
            let present = match action {
                "add" => true,
                "remove" => false,
                _ => return Some(Err(format!("usage: {word} add|remove <value>"))),
            };
            Command::Adjust { list, value: value.trim().to_string(), present }
        }
    };
    Some(Ok(cmd))
}

/// Runs one command. Returns `false` on quit.
async fn run_command(handle: &RelayHandle, cmd: Command) -> Result<bool, RelayError> {
    match cmd {
        Command::Setup(channel) => handle.bind_channel(ChannelId::new(channel)).await?,
        Command::Connect => {
            handle.connect().await?;
            println!("connecting...");
        }
        Command::Disconnect => handle.disconnect().await?,
        Command::Players => {
            let players = handle.participants().await?;
            println!("{} online", players.len());
            for p in players {
                println!("  {} ({}) {}", p.display_name, p.device, p.id);
            }
        }
        Command::Say(text) => handle.send_raw(text).await?,
        Command::Adjust { list, value, present } => {
            handle.adjust_moderation(list, value, present).await?;
            println!("updated");
        }
        Command::Status => {
            let s = handle.status().await?;
            let channel = s.channel.map(|c| c.to_string()).unwrap_or_else(|| "unbound".into());
            println!(
                "{} (attempts {}/{}), {} online, channel {channel}",
                s.state, s.attempts, s.max_attempts, s.participants
            );
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "config.json".into());
    let config = RelayConfig::from_file(&path)?;
    tracing::info!(%path, realm = %config.realm_code, "config loaded");

    let store = JsonFileStore::new(
        &config.relay_channel_file,
        &config.player_log_file,
        &config.moderation_file,
    );
    let connector = WebSocketConnector::new(&config.bridge_url);
    let (engine, handle) = RelayEngineBuilder::new()
        .config(&config)
        .build(connector, StdoutSink, store)
        .await?;
    let engine = engine.spawn();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse(&line, &config.bot_prefix) {
            Some(Ok(cmd)) => match run_command(&handle, cmd).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => println!("error: {e}"),
            },
            Some(Err(usage)) => println!("{usage}"),
            None => {
                let Some(channel) = handle.status().await?.channel else {
                    println!("no relay channel; use {}setup <channel>", config.bot_prefix);
                    continue;
                };
                handle
                    .gateway_message(GatewayMessage {
                        channel,
                        author_tag: "console".into(),
                        from_bot: false,
                        content: line,
                    })
                    .await?;
            }
        }
    }

    handle.shutdown().await?;
    engine.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_line_is_chat() {
        assert_eq!(parse("hello everyone", "!"), None);
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse("!connect", "!"), Some(Ok(Command::Connect)));
        assert_eq!(parse("  !players ", "!"), Some(Ok(Command::Players)));
        assert_eq!(parse("!say hi there", "!"), Some(Ok(Command::Say("hi there".into()))));
    }

    #[test]
    fn test_parse_setup_requires_channel() {
        assert_eq!(parse("!setup relay", "!"), Some(Ok(Command::Setup("relay".into()))));
        assert!(matches!(parse("!setup", "!"), Some(Err(_))));
    }

    #[test]
    fn test_parse_list_adjustments() {
        assert_eq!(
            parse("!devices add Windows x64", "!"),
            Some(Ok(Command::Adjust {
                list: ModerationList::BannedDevices,
                value: "Windows x64".into(),
                present: true,
            }))
        );
        assert_eq!(
            parse("!whitelist remove Steve", "!"),
            Some(Ok(Command::Adjust {
                list: ModerationList::AllowList,
                value: "Steve".into(),
                present: false,
            }))
        );
        assert!(matches!(parse("!block toggle Steve", "!"), Some(Err(_))));
    }

    #[test]
    fn test_parse_unknown_command_reported() {
        assert!(matches!(parse("!dance", "!"), Some(Err(e)) if e.contains("dance")));
    }

    #[test]
    fn test_parse_respects_custom_prefix() {
        assert_eq!(parse("!connect", "?"), None);
        assert_eq!(parse("?connect", "?"), Some(Ok(Command::Connect)));
    }
}
