/*
    spotify-roast-rs | Rust CLI tool to log in with Spotify and roast your music taste.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use log::debug;
use roast_core::{AccessToken, AppConfig, Session, TimeRange};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::process;

#[derive(Parser)]
#[command(name = "spotify-roast")]
#[command(about = "Log in with Spotify, list your top artists and tracks, and get roasted", long_about = None)]
struct Cli {
    /// Use an existing access token instead of running the login flow
    #[arg(long, global = true, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TopArgs {
    /// Number of items to fetch (1-50)
    #[arg(long, short = 'n', default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..=50))]
    limit: u32,

    /// Time window: short_term, medium_term or long_term
    #[arg(long, short = 'r', default_value_t = TimeRange::LongTerm)]
    range: TimeRange,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the PKCE login and prints the access token
    Login,
    /// Lists your top artists
    Artists {
        #[command(flatten)]
        top: TopArgs,
        /// Output the list to a JSON file (e.g., --json=artists.json)
        #[arg(long)]
        json: Option<String>,
    },
    /// Lists your top tracks
    Tracks {
        #[command(flatten)]
        top: TopArgs,
        /// Output the list to a JSON file (e.g., --json=tracks.json)
        #[arg(long)]
        json: Option<String>,
    },
    /// Roasts your music taste based on your top artists
    Roast {
        #[command(flatten)]
        top: TopArgs,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if dotenv().is_err() {
        // Silently ignore
    }

    let cli = Cli::parse();
    let token = cli.token.as_deref();

    match &cli.command {
        Commands::Login => handle_login().await,
        Commands::Artists { top, json } => handle_artists(token, top, json.as_deref()).await,
        Commands::Tracks { top, json } => handle_tracks(token, top, json.as_deref()).await,
        Commands::Roast { top } => handle_roast(token, top).await,
    }
}

fn load_config() -> AppConfig {
    match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            eprintln!("Set RSPOTIFY_CLIENT_ID and RSPOTIFY_REDIRECT_URI (a .env file works too).");
            process::exit(1);
        }
    }
}

/// Returns an authenticated session, logging in interactively if needed.
async fn get_session(token: Option<&str>) -> Session {
    let config = load_config();

    let session = match token {
        Some(token) => Session::with_token(&config, AccessToken::new(token))
            .map_err(anyhow::Error::from),
        None => login(&config).await,
    };

    match session {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error logging in to Spotify: {:#}", e);
            process::exit(1);
        }
    }
}

async fn login(config: &AppConfig) -> anyhow::Result<Session> {
    let mut session = Session::new(config)?;
    let url = session.begin_login();

    println!("Open this URL in your browser and approve access:");
    println!();
    println!("    {}", url);
    println!();
    println!(
        "After approving, your browser is sent to {}?code=...",
        config.redirect_uri
    );
    println!("Paste that full address here and press Enter:");

    let redirect = read_line().await?;
    debug!("Received redirect of {} bytes", redirect.len());

    session
        .complete_login(&redirect)
        .await
        .context("Login did not complete")?;
    println!();
    println!("[OK] Logged in.");
    Ok(session)
}

async fn read_line() -> anyhow::Result<String> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok::<_, io::Error>(line.trim().to_string())
    })
    .await?
    .context("Failed to read redirect URI from stdin")
}

async fn handle_login() {
    let session = get_session(None).await;
    if let Some(token) = session.access_token() {
        println!();
        println!("Access token (valid for about an hour, reuse with --token):");
        println!("{}", token.as_str());
    }
}

async fn handle_artists(token: Option<&str>, top: &TopArgs, json_path: Option<&str>) {
    let session = get_session(token).await;
    println!("Fetching your top {} artists ({})...", top.limit, top.range);

    match session.top_artists(top.limit, top.range).await {
        Ok(artists) => {
            println!();
            println!("---------------------------------------------------");
            println!("TOP ARTISTS");
            println!("---------------------------------------------------");
            if artists.is_empty() {
                println!("No listening history for this time range yet.");
            }
            for (i, artist) in artists.iter().enumerate() {
                println!("{:>2}. {}", i + 1, artist);
            }

            if let Some(path) = json_path {
                write_json(path, &artists);
            }
        }
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Failed to fetch top artists: {}", e);
            process::exit(1);
        }
    }
}

async fn handle_tracks(token: Option<&str>, top: &TopArgs, json_path: Option<&str>) {
    let session = get_session(token).await;
    println!("Fetching your top {} tracks ({})...", top.limit, top.range);

    match session.top_tracks(top.limit, top.range).await {
        Ok(tracks) => {
            println!();
            println!("---------------------------------------------------");
            println!("TOP TRACKS");
            println!("---------------------------------------------------");
            if tracks.is_empty() {
                println!("No listening history for this time range yet.");
            }
            for (i, track) in tracks.iter().enumerate() {
                println!("{:>2}. {}", i + 1, track);
            }

            if let Some(path) = json_path {
                write_json(path, &tracks);
            }
        }
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Failed to fetch top tracks: {}", e);
            process::exit(1);
        }
    }
}

async fn handle_roast(token: Option<&str>, top: &TopArgs) {
    let session = get_session(token).await;
    println!("Reading your top {} artists and warming up the critic...", top.limit);

    match session.roast_top_artists(top.limit, top.range).await {
        Ok(roast) => {
            println!();
            println!("---------------------------------------------------");
            println!("YOUR ROAST");
            println!("---------------------------------------------------");
            println!("{}", roast);
        }
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Roast failed: {}", e);
            process::exit(1);
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &str, value: &T) {
    match File::create(path) {
        Ok(mut file) => {
            let json_content = serde_json::to_string_pretty(value).unwrap_or_default();
            if let Err(e) = file.write_all(json_content.as_bytes()) {
                eprintln!();
                eprintln!("[ERROR] Failed to write report to file: {}", e);
            } else {
                println!();
                println!("[SAVED] Saved to: {}", path);
            }
        }
        Err(e) => eprintln!("[ERROR] Failed to create file '{}': {}", path, e),
    }
}
