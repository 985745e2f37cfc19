use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{Mutex, mpsc};
use tracing_subscriber::EnvFilter;

use kyra_assistant::chat::{ChatService, ChatStore, FileStorage, Role};
use kyra_assistant::notify::StderrNotifier;
use kyra_assistant::voice::console::{
    ConsoleSpeechInput, ConsoleSpeechOutput, DEFAULT_LISTEN_TIMEOUT,
};
use kyra_assistant::voice::native::{DevicePermission, NativeSpeechInput, NativeSpeechOutput};
use kyra_assistant::voice::{
    AlwaysGranted, Orb, OrbState, OrbTimings, VoiceHandle, VoicePorts, VoiceSession,
};
use kyra_assistant::weather::{WeatherClient, WeatherReport};
use kyra_assistant::widgets::system::SystemMonitor;
use kyra_assistant::{Config, GeminiClient, PromptBuilder};

/// Kyra - personal assistant with a voice orb and chat sessions
#[derive(Parser)]
#[command(name = "kyra", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive text chat in the current session (default)
    Chat,
    /// Send one message and print the reply
    Ask {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Manage saved chat sessions
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },
    /// Show current weather and forecast
    Weather {
        /// City name (e.g. "London" or "Paris, FR")
        #[arg(num_args = 0..)]
        city: Vec<String>,
        /// Latitude (with --lon)
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude (with --lat)
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },
    /// Start a voice orb session
    Voice {
        /// Type utterances and read replies instead of using the microphone
        #[arg(long)]
        console: bool,
    },
    /// Print one host metrics sample
    System,
}

#[derive(Subcommand)]
enum SessionsCommand {
    /// List sessions, newest first
    List,
    /// Print a session transcript
    Show {
        /// Session id
        id: String,
    },
    /// Create a new session
    New,
    /// Delete a session
    Delete {
        /// Session id
        id: String,
    },
    /// Delete every session
    Clear,
    /// Export all sessions to a dated JSON file
    Export {
        /// Target directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Replace all sessions from an export file
    Import {
        /// Export file path
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,kyra_assistant=info",
        1 => "info,kyra_assistant=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load();
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => cmd_chat(&config).await,
        Command::Ask { text } => cmd_ask(&config, &text.join(" ")).await,
        Command::Sessions { command } => cmd_sessions(&config, command),
        Command::Weather { city, lat, lon } => cmd_weather(&config, &city.join(" "), lat.zip(lon)).await,
        Command::Voice { console } => cmd_voice(&config, console).await,
        Command::System => cmd_system().await,
    }
}

/// Build the chat service over the on-disk session store
fn open_chat(config: &Config) -> ChatService {
    let storage = Arc::new(FileStorage::new(&config.data_dir));
    let store = ChatStore::load(storage);
    let generator = Arc::new(GeminiClient::new(
        config.api_keys.gemini.clone(),
        &config.model,
    ));

    ChatService::new(store, generator, Arc::new(StderrNotifier))
        .with_prompts(PromptBuilder::new(&config.assistant_name))
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

async fn cmd_chat(config: &Config) -> anyhow::Result<()> {
    let mut chat = open_chat(config);
    let name = config.assistant_name.as_str();

    if let Some(greeting) = chat.current().and_then(|s| s.last_message()) {
        println!("{name}: {}", greeting.content);
    }
    println!("(/new starts a new chat, /quit exits)\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/new" => {
                let session = chat.new_chat();
                println!("{name}: {}", session.messages[0].content);
            }
            text => {
                if let Some(reply) = chat.send_text(text).await? {
                    println!("{name}: {}\n", reply.content);
                }
            }
        }
        prompt();
    }

    Ok(())
}

async fn cmd_ask(config: &Config, text: &str) -> anyhow::Result<()> {
    let mut chat = open_chat(config);
    chat.new_chat();
    if let Some(reply) = chat.send_text(text).await? {
        println!("{}", reply.content);
    }
    Ok(())
}

fn cmd_sessions(config: &Config, command: SessionsCommand) -> anyhow::Result<()> {
    let mut chat = open_chat(config);

    match command {
        SessionsCommand::List => {
            for session in chat.store().sessions() {
                println!(
                    "{}  {:<50}  {:>3} msgs  {}",
                    session.id,
                    session.title,
                    session.messages.len(),
                    session.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        SessionsCommand::Show { id } => {
            let session = chat
                .store()
                .get(&id)
                .with_context(|| format!("no session with id {id}"))?;
            println!("# {}\n", session.title);
            for message in &session.messages {
                let speaker = match message.role {
                    Role::User => "You",
                    Role::Assistant => config.assistant_name.as_str(),
                };
                let mode = if message.is_voice { " (voice)" } else { "" };
                println!("{speaker}{mode}: {}", message.content);
            }
        }
        SessionsCommand::New => {
            let session = chat.new_chat();
            println!("created session {}", session.id);
        }
        SessionsCommand::Delete { id } => {
            chat.delete(&id)?;
            println!("deleted session {id}");
        }
        SessionsCommand::Clear => {
            chat.clear_all()?;
            println!("cleared all sessions");
        }
        SessionsCommand::Export { dir } => {
            let path = chat.export_to_dir(&dir)?;
            println!("exported to {}", path.display());
        }
        SessionsCommand::Import { path } => {
            let count = chat.import_file(&path)?;
            println!("imported {count} sessions");
        }
    }

    Ok(())
}

async fn cmd_weather(
    config: &Config,
    city: &str,
    coordinates: Option<(f64, f64)>,
) -> anyhow::Result<()> {
    let client = WeatherClient::new(config.api_keys.openweather.clone());
    let report = match coordinates {
        Some((lat, lon)) => client.by_coordinates(lat, lon).await?,
        None if city.trim().is_empty() => anyhow::bail!("pass a city name or --lat/--lon"),
        None => client.by_city(city).await?,
    };
    print_weather(&report);
    Ok(())
}

fn print_weather(report: &WeatherReport) {
    let now = &report.current;
    println!("{}", report.location);
    println!("  {}°C (feels like {}°C), {}", now.temp, now.feels_like, now.description);
    println!(
        "  humidity {}%  wind {} mph  pressure {} hPa  visibility {} mi",
        now.humidity, now.wind_speed, now.pressure, now.visibility
    );

    println!("\nNext hours");
    for hour in &report.hourly {
        println!("  {:>5}  {:>3}°C  {}", hour.time, hour.temp, hour.description);
    }

    println!("\nForecast");
    for day in &report.daily {
        println!(
            "  {:<5}  {:>3}° / {:>3}°  {:>3}% rain  {}",
            day.day, day.high, day.low, day.precipitation, day.description
        );
    }
}

async fn cmd_system() -> anyhow::Result<()> {
    let mut monitor = SystemMonitor::new();
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
    let sample = monitor.sample();

    println!("CPU          {:>5.1}%  {}", sample.cpu, sample.cpu_health());
    println!("Memory       {:>5.1}%  {}", sample.memory, sample.memory_health());
    if let (Some(disk), Some(health)) = (sample.disk, sample.disk_health()) {
        println!("Disk         {disk:>5.1}%  {health}");
    }
    if let (Some(temp), Some(health)) = (sample.temperature, sample.temperature_health()) {
        println!("Temperature  {temp:>5.1}°C {health}");
    }
    println!("Processes    {}", sample.processes);
    println!("Uptime       {}", sample.uptime_text());
    Ok(())
}

async fn cmd_voice(config: &Config, console: bool) -> anyhow::Result<()> {
    let chat = Arc::new(Mutex::new(open_chat(config)));
    let generator = Arc::new(GeminiClient::new(
        config.api_keys.gemini.clone(),
        &config.model,
    ));

    let (typed, ports) = if console {
        let (typed, input) = ConsoleSpeechInput::channel(DEFAULT_LISTEN_TIMEOUT);
        let ports = VoicePorts {
            input: Arc::new(input),
            output: Arc::new(ConsoleSpeechOutput::new(&config.assistant_name, false)),
            permission: Arc::new(AlwaysGranted),
            notifier: Arc::new(StderrNotifier),
            generator,
            log: chat.clone(),
        };
        (Some(typed), ports)
    } else {
        let key = native_key(config.api_keys.openai.clone())?;
        let ports = VoicePorts {
            input: Arc::new(NativeSpeechInput::new(key.clone())?),
            output: Arc::new(NativeSpeechOutput::new(key)?),
            permission: Arc::new(DevicePermission),
            notifier: Arc::new(StderrNotifier),
            generator,
            log: chat.clone(),
        };
        (None, ports)
    };

    let orb = Orb::new(config.voice.clone(), OrbTimings::default());
    let (handle, task) =
        VoiceSession::spawn(orb, ports, PromptBuilder::new(&config.assistant_name));
    chat.lock()
        .await
        .attach_speaker(handle.clone(), config.voice.auto_speak);

    let mut status = handle.subscribe();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            eprintln!("[orb: {}, queued: {}]", current.state, current.queued);
        }
    });

    println!("Voice session started.");
    println!("  Enter or /toggle  press the orb");
    println!("  /stop             stop speaking    /clear   clear the speech queue");
    println!("  /speak <text>     say something    /quit    exit");
    if typed.is_some() {
        println!("  While listening, typed lines are heard as speech.");
    }
    println!("  Other lines are sent as typed chat.\n");

    voice_loop(&handle, typed.as_ref(), &chat, &config.assistant_name).await?;

    let _ = handle.shutdown().await;
    let _ = task.await;
    Ok(())
}

fn native_key(key: Option<SecretString>) -> anyhow::Result<SecretString> {
    key.context("native voice needs an OpenAI API key (set OPENAI_API_KEY), or use --console")
}

/// Route stdin lines to the orb, the console recognizer, or the chat
async fn voice_loop(
    handle: &VoiceHandle,
    typed: Option<&mpsc::Sender<String>>,
    chat: &Mutex<ChatService>,
    name: &str,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "" | "/toggle" => handle.toggle().await?,
            "/stop" => handle.stop_speaking().await?,
            "/clear" => handle.clear_queue().await?,
            "/speak" => handle.speak(rest.trim()).await?,
            "/quit" | "/exit" => break,
            _ => {
                let listening = handle.status().state == OrbState::Listening;
                match typed.filter(|_| listening) {
                    Some(typed) => typed.send(line.to_string()).await?,
                    None => {
                        let reply = chat.lock().await.send_text(line).await?;
                        if let Some(reply) = reply {
                            println!("{name}: {}", reply.content);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
