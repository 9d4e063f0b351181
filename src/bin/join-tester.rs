//! Join Tester CLI Tool
//!
//! Command-line tool for exercising a running matchmaking service over TCP.
//!
//! Usage:
//!   cargo run --bin join-tester -- --help
//!   cargo run --bin join-tester join --id "player1" --level 5
//!   cargo run --bin join-tester scenario --name fill --players 10
//!   cargo run --bin join-tester run-all-scenarios
//!   cargo run --bin join-tester send-raw --line "not json"

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use level_matchmaker::client::{MatchmakingClient, ServerLine};
use level_matchmaker::types::{CompetitionState, Notification};
use std::collections::HashSet;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "join-tester")]
#[command(about = "Exercise a running level-matchmaker service over TCP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Address of the matchmaking service
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Join as one player and print every notification
    Join {
        /// Player ID
        #[arg(short, long)]
        id: String,
        /// Player level
        #[arg(short, long, default_value = "1")]
        level: i64,
    },
    /// Run a predefined scenario
    Scenario {
        /// Scenario name (fill, timeout, split)
        #[arg(short, long)]
        name: String,
        /// Players used by the fill scenario; match the server's max players
        #[arg(short, long, default_value = "10")]
        players: usize,
    },
    /// Run every scenario
    RunAllScenarios {
        /// Players used by the fill scenario; match the server's max players
        #[arg(short, long, default_value = "10")]
        players: usize,
    },
    /// Send one raw line and print the reply
    SendRaw {
        /// Line to send
        #[arg(short, long)]
        line: String,
    },
}

/// Join with a fresh connection and wait for the terminal notification
async fn join_player(addr: &str, id: String, level: i64) -> Result<Vec<Notification>> {
    let mut client = MatchmakingClient::connect(addr).await?;
    client.join_and_wait(&id, level).await
}

fn terminal(notifications: &[Notification]) -> Result<Notification> {
    notifications
        .last()
        .copied()
        .filter(Notification::is_terminal)
        .ok_or_else(|| anyhow!("No terminal notification received"))
}

/// `players` players at the same level fill one competition
async fn scenario_fill(addr: &str, players: usize) -> Result<()> {
    let run = format!("fill-{}", uuid::Uuid::new_v4().simple());
    let handles: Vec<_> = (0..players)
        .map(|i| {
            let addr = addr.to_string();
            let id = format!("{}-{}", run, i);
            tokio::spawn(async move { join_player(&addr, id, 5).await })
        })
        .collect();

    let mut competitions = HashSet::new();
    for handle in handles {
        let outcome = terminal(&handle.await??)?;
        if outcome.state != CompetitionState::Started {
            return Err(anyhow!(
                "Expected started, got {} for competition {}",
                outcome.state,
                outcome.competition_id
            ));
        }
        competitions.insert(outcome.competition_id);
    }

    if competitions.len() != 1 {
        return Err(anyhow!(
            "Expected one competition, players were spread over {:?}",
            competitions
        ));
    }
    Ok(())
}

/// A lone player is aborted once the timeout elapses
async fn scenario_timeout(addr: &str) -> Result<()> {
    let id = format!("timeout-{}", uuid::Uuid::new_v4().simple());
    let outcome = terminal(&join_player(addr, id, 500).await?)?;

    match outcome.state {
        CompetitionState::Aborted => Ok(()),
        state => Err(anyhow!("Expected aborted, got {}", state)),
    }
}

/// Players far apart in level end up in different competitions
async fn scenario_split(addr: &str) -> Result<()> {
    let run = uuid::Uuid::new_v4().simple().to_string();
    let (low, high) = tokio::join!(
        join_player(addr, format!("split-low-{}", run), 1),
        join_player(addr, format!("split-high-{}", run), 1000)
    );

    let low = terminal(&low?)?;
    let high = terminal(&high?)?;
    if low.competition_id == high.competition_id {
        return Err(anyhow!(
            "Expected different competitions, both joined {}",
            low.competition_id
        ));
    }
    Ok(())
}

async fn run_scenario(addr: &str, name: &str, players: usize) -> Result<()> {
    match name {
        "fill" => scenario_fill(addr, players).await,
        "timeout" => scenario_timeout(addr).await,
        "split" => scenario_split(addr).await,
        other => Err(anyhow!(
            "Unknown scenario '{}'. Available: fill, timeout, split",
            other
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    println!("🎯 Level matchmaker join tester - target: {}", cli.addr);

    match cli.command {
        Commands::Join { id, level } => {
            let mut client = MatchmakingClient::connect(&cli.addr).await?;
            client.join(&id, level).await?;
            println!("✅ Joined as '{}' at level {}", id, level);

            let started = Instant::now();
            loop {
                match client.next_line().await? {
                    Some(ServerLine::Notification(notification)) => {
                        println!(
                            "  [{:>6}ms] competition {}: {}",
                            started.elapsed().as_millis(),
                            notification.competition_id,
                            notification.state
                        );
                        if notification.is_terminal() {
                            break;
                        }
                    }
                    Some(ServerLine::Farewell) => {
                        eprintln!("❌ Server rejected the request");
                        break;
                    }
                    None => {
                        eprintln!("❌ Server closed the connection");
                        break;
                    }
                }
            }
        }
        Commands::Scenario { name, players } => {
            println!("🧪 Running scenario: {}", name);
            match run_scenario(&cli.addr, &name, players).await {
                Ok(()) => println!("✅ Scenario completed successfully!"),
                Err(e) => {
                    eprintln!("❌ Scenario failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::RunAllScenarios { players } => {
            println!("🧪 Running all scenarios...\n");
            let mut passed = 0;
            let mut failed = 0;

            for name in ["fill", "timeout", "split"] {
                print!("  {} ... ", name);
                match run_scenario(&cli.addr, name, players).await {
                    Ok(()) => {
                        println!("✅ PASSED");
                        passed += 1;
                    }
                    Err(e) => {
                        println!("❌ FAILED ({})", e);
                        failed += 1;
                    }
                }
            }

            println!("\n📊 Results: {} passed, {} failed", passed, failed);
            if failed > 0 {
                std::process::exit(1);
            }
        }
        Commands::SendRaw { line } => {
            let mut client = MatchmakingClient::connect(&cli.addr).await?;
            client.send_raw(&line).await?;
            match client.next_line().await? {
                Some(ServerLine::Notification(notification)) => println!(
                    "📨 competition {}: {}",
                    notification.competition_id, notification.state
                ),
                Some(ServerLine::Farewell) => println!("👋 Server closed the connection: bye"),
                None => println!("🔌 Server closed the connection"),
            }
        }
    }

    Ok(())
}
