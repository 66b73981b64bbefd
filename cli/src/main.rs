mod args;
mod console;
mod telemetry;

use std::{
    future::Future,
    io::{self, BufRead, IsTerminal, Write},
    process::ExitCode,
};

use anyhow::Context;
use args::{BootstrapArgs, Cli, Command, SendArgs};
use chrono::Local;
use clap::Parser;
use replay::{
    config::{DatabaseConfig, ReplayConfig},
    db::bootstrap,
    ReplayApi,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Every request succeeded, or the run was cancelled at the prompt.
const EXIT_OK: u8 = 0;
/// Configuration, input or database errors.
const EXIT_FATAL: u8 = 1;
/// The run finished but at least one request failed or was never sent.
const EXIT_FAILED_REQUESTS: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("⚠️  Could not read .env: {}", e);
        }
    }
    let cli = Cli::parse();
    telemetry::init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Send(args) => send(args).await,
        Command::BootstrapDb(args) => bootstrap_db(args).await,
    };
    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn send(args: SendArgs) -> anyhow::Result<u8> {
    let config = args.apply(ReplayConfig::load()?);
    let api = ReplayApi::new(&config)?;

    println!(
        "{}\n",
        console::banner(&config.api_url, &config.requests_file, Local::now())
    );
    let descriptors = ReplayApi::load_descriptors(&config.requests_file)
        .context("could not load test requests")?;
    println!("{}\n", console::loaded(descriptors.len()));

    if !args.yes && io::stdin().is_terminal() && !confirm("Do you want to send all requests?")? {
        println!("Cancelled.");
        return Ok(EXIT_OK);
    }
    println!();

    let cancel = CancellationToken::new();
    tokio::spawn(watch_for_interrupt(cancel.clone(), tokio::signal::ctrl_c));

    let summary = api.run(descriptors, &cancel, console::print_event).await;
    if summary.all_succeeded() {
        Ok(EXIT_OK)
    } else {
        Ok(EXIT_FAILED_REQUESTS)
    }
}

/// The first interrupt stops the run once the request in flight has
/// finished. Later interrupts only report that it is still running: the
/// request timeout bounds the wait.
async fn watch_for_interrupt<S, Fut>(cancel: CancellationToken, mut next_interrupt: S)
where
    S: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if next_interrupt().await.is_err() {
        warn!("could not install Ctrl+C handler");
        return;
    }
    eprintln!("\n🛑 Interrupt received, finishing the current request before stopping.");
    cancel.cancel();
    while next_interrupt().await.is_ok() {
        eprintln!("⏳ Still waiting for the request in flight to finish.");
    }
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{} (y/n): ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

async fn bootstrap_db(args: BootstrapArgs) -> anyhow::Result<u8> {
    let mut config = DatabaseConfig::load()?;
    if let Some(name) = args.name {
        config.name = name;
    }

    if args.print {
        println!("{};", bootstrap::create_database_statement(&config)?);
        return Ok(EXIT_OK);
    }

    bootstrap::create_database(&config)
        .await
        .with_context(|| format!("could not create database {:?}", config.name))?;
    info!(database = %config.name, "bootstrap finished");
    println!("✅ Database `{}` is ready", config.name);
    Ok(EXIT_OK)
}
