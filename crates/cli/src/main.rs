//! A small terminal front end for one-api, showing how to use
//! `oneapi-client` as a library.
//!
//! ```text
//! oneapi chat              # streaming chat, history kept across turns
//! oneapi embed <text>...   # prints the vector of each text
//! ```
//!
//! The service is configured with `ONEAPI_BASE_URL`, `ONEAPI_API_KEY`,
//! `ONEAPI_MODEL` and optionally `ONEAPI_EMBEDDING_MODEL` and
//! `ONEAPI_TIMEOUT` (seconds).

#[macro_use]
extern crate tracing;

use std::env;
use std::error::Error as StdError;
use std::io::Write as _;
use std::process::ExitCode;
use std::time::Duration;

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use oneapi_client::model::ChatMessage;
use oneapi_client::{
    ChatClient, ClientConfig, ClientConfigBuilder, EmbeddingClient,
};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};

type BoxError = Box<dyn StdError>;

const USAGE: &str = "usage: oneapi chat | oneapi embed <text>...";
const BAR_CHAR: &str = "▎";
const PREVIEW_DIMS: usize = 4;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        None | Some("chat") => run_chat().await,
        Some("embed") if args.len() > 1 => run_embed(&args[1..]).await,
        Some(_) => {
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("{}", err.to_string().bright_red());
            ExitCode::FAILURE
        }
    }
}

fn config_from_env(model_var: &str) -> Result<ClientConfig, BoxError> {
    let Ok(api_key) = env::var("ONEAPI_API_KEY") else {
        return Err("ONEAPI_API_KEY environment variable is not set".into());
    };
    let Ok(base_url) = env::var("ONEAPI_BASE_URL") else {
        return Err("ONEAPI_BASE_URL environment variable is not set".into());
    };
    let Ok(model) = env::var(model_var).or_else(|_| env::var("ONEAPI_MODEL"))
    else {
        return Err(format!("{model_var} environment variable is not set").into());
    };

    let mut builder = ClientConfigBuilder::with_api_key(api_key)
        .with_base_url(base_url)
        .with_model(model);
    if let Ok(timeout) = env::var("ONEAPI_TIMEOUT") {
        let secs: u64 = timeout
            .parse()
            .map_err(|err| format!("invalid ONEAPI_TIMEOUT: {err}"))?;
        builder = builder.with_timeout(Duration::from_secs(secs));
    }
    Ok(builder.build())
}

async fn run_chat() -> Result<(), BoxError> {
    let client = ChatClient::new(config_from_env("ONEAPI_MODEL")?)?;
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")?
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let mut history: Vec<ChatMessage> = Vec::new();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = read_line().await else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🤔 Thinking...");
        progress_bar.enable_steady_tick(Duration::from_millis(100));

        let stream = client.send_stream(prompt, Some(&history[..])).await;
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                progress_bar.finish_and_clear();
                // Keep the session alive, the next prompt may succeed.
                eprintln!("{}", err.to_string().bright_red());
                continue;
            }
        };

        let mut transcript = String::new();
        while let Some(fragment) = stream.next().await {
            // Finish the progress bar before printing anything else.
            if !progress_bar.is_finished() {
                progress_bar.finish_and_clear();
                print!("{}🤖 ", BAR_CHAR.bright_cyan());
            }
            match fragment {
                Ok(fragment) => {
                    print!("{}", fragment.bright_white());
                    std::io::stdout().flush()?;
                    transcript.push_str(&fragment);
                }
                Err(err) => {
                    eprintln!("\n{}", err.to_string().bright_red());
                    break;
                }
            }
        }
        progress_bar.finish_and_clear();
        println!();

        debug!("got {} bytes of transcript", transcript.len());
        history.push(ChatMessage::user(prompt));
        history.push(ChatMessage::assistant(transcript));
    }

    Ok(())
}

async fn run_embed(texts: &[String]) -> Result<(), BoxError> {
    let client =
        EmbeddingClient::new(config_from_env("ONEAPI_EMBEDDING_MODEL")?)?;
    let vectors = client.embed_batch(texts).await?;
    for (text, vector) in texts.iter().zip(&vectors) {
        let preview: Vec<String> = vector
            .iter()
            .take(PREVIEW_DIMS)
            .map(|v| format!("{v:.4}"))
            .collect();
        let ellipsis = if vector.len() > PREVIEW_DIMS { ", ..." } else { "" };
        println!(
            "{}{} {}",
            BAR_CHAR.bright_cyan(),
            text.bright_white().bold(),
            format!("dim={} [{}{ellipsis}]", vector.len(), preview.join(", "))
                .dimmed()
        );
    }
    Ok(())
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
