//! RAGCHAT CLI Client
//!
//! Interactive command-line client for a running RAGCHAT server.

use clap::Parser;
use serde_json::Value;
use std::io::{self, Write};
use std::time::Duration;

/// RAGCHAT CLI - Interactive Client
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server base URL
    #[arg(short, long, env = "RAGCHAT_URL", default_value = "http://127.0.0.1:8080")]
    url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 600)]
    timeout: u64,
}

#[derive(Debug)]
enum Command {
    Ingest(String),
    Ask(String),
    Health,
    Metrics,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let base = args.url.trim_end_matches('/').to_string();
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .build()?;

    println!("Using RAGCHAT at {}", base);
    println!("Type 'help' for available commands, 'quit' to exit.\n");

    loop {
        print!("ragchat> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("help") {
            print_help();
            continue;
        }

        match parse_command(input) {
            Ok(cmd) => {
                if let Err(e) = execute(&http, &base, cmd).await {
                    eprintln!("Error: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
            }
        }
    }

    Ok(())
}

fn parse_command(input: &str) -> anyhow::Result<Command> {
    let (head, rest) = match input.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (input, ""),
    };

    match head.to_uppercase().as_str() {
        "INGEST" => {
            if rest.is_empty() {
                anyhow::bail!("INGEST requires text: INGEST <text>");
            }
            Ok(Command::Ingest(rest.to_string()))
        }

        "ASK" => {
            if rest.is_empty() {
                anyhow::bail!("ASK requires a question: ASK <question>");
            }
            Ok(Command::Ask(rest.to_string()))
        }

        "HEALTH" => Ok(Command::Health),

        "METRICS" => Ok(Command::Metrics),

        _ => anyhow::bail!("Unknown command: {}. Type 'help' for available commands.", head),
    }
}

async fn execute(http: &reqwest::Client, base: &str, cmd: Command) -> anyhow::Result<()> {
    let response = match &cmd {
        Command::Ingest(text) => {
            http.post(format!("{}/chatbot/embedding", base))
                .json(text)
                .send()
                .await?
        }
        Command::Ask(question) => {
            http.post(format!("{}/chatbot/ask", base))
                .json(question)
                .send()
                .await?
        }
        Command::Health => http.get(format!("{}/health", base)).send().await?,
        Command::Metrics => http.get(format!("{}/metrics", base)).send().await?,
    };

    let status = response.status();
    let body: Value = response.json().await?;

    if let Some(error) = body.get("error").and_then(Value::as_str) {
        if body.get("no_context").and_then(Value::as_bool) == Some(true) {
            println!("{}", error);
            return Ok(());
        }
        anyhow::bail!("{} ({})", error, status);
    }

    match cmd {
        Command::Ingest(_) => println!("Stored as #{}", body["id"]),
        Command::Ask(_) => println!("{}", body["answer"].as_str().unwrap_or_default()),
        Command::Health | Command::Metrics => println!("{}", serde_json::to_string_pretty(&body)?),
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"
Available commands:
  INGEST <text>      Embed and store a message
  ASK <question>     Ask a question grounded in stored messages
  HEALTH             Show server health
  METRICS            Show request counters and latency
  HELP               Show this help
  QUIT / EXIT        Exit the client
"#
    );
}
