// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

/// This is the main entry point for the erasure code CLI application.
///
/// The application validates erasure code profiles and reports the chunk geometry they lead to.
/// It uses the `clap` crate for command-line argument parsing and `stderrlog` for logging.
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde_json::json;
use stderrlog::Timestamp;

use recall_erasure::{alignment, Profile, Scheme, Technique};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase logging verbosity, repeat for more.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a profile and print it as corrected.
    Check(ProfileArgs),
    /// Print the chunk size of an object.
    ChunkSize(ChunkSizeArgs),
}

#[derive(Args)]
struct ProfileArgs {
    #[arg(short, long, env = "ERASURE_TECHNIQUE")]
    technique: Technique,

    /// Profile entries such as `-p k=4 -p m=2`.
    #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
    params: Vec<(String, String)>,
}

impl ProfileArgs {
    fn profile(&self) -> Profile {
        self.params.iter().cloned().collect()
    }
}

#[derive(Args)]
struct ChunkSizeArgs {
    #[command(flatten)]
    profile: ProfileArgs,

    #[arg(long)]
    object_size: usize,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {s}"))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

fn check(args: &ProfileArgs) -> anyhow::Result<()> {
    let mut profile = args.profile();
    let validation = Scheme::validate(args.technique, &mut profile);
    println!("{}", serde_json::to_string_pretty(&profile)?);

    if !validation.is_ok() {
        for message in &validation.messages {
            eprintln!("{message}");
        }
        bail!("{} profile is invalid", args.technique);
    }
    let params = &validation.params;
    let summary = json!({
        "technique": args.technique,
        "k": params.k,
        "m": params.m,
        "w": params.w,
        "packetsize": params.packet_size,
        "chunk_count": params.chunk_count(),
        "alignment": alignment::alignment(args.technique, params),
        "per_chunk_alignment": params.per_chunk_alignment,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn chunk_size(args: &ChunkSizeArgs) -> anyhow::Result<()> {
    let mut profile = args.profile.profile();
    let scheme = Scheme::init(args.profile.technique, &mut profile)
        .with_context(|| format!("cannot use the {} profile", args.profile.technique))?;

    let params = scheme.params();
    let alignment = scheme.get_alignment();
    let naive = args.object_size.div_ceil(params.k);
    if params.per_chunk_alignment && alignment > naive {
        bail!(
            "per chunk alignment {alignment} exceeds the {naive} byte chunks of a {} byte object",
            args.object_size
        );
    }
    let chunk_size = scheme.get_chunk_size(args.object_size);
    info!("alignment {alignment}, chunk size {chunk_size}");
    println!("{chunk_size}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    stderrlog::new()
        .module(module_path!())
        .module("recall_erasure")
        .verbosity(cli.verbose as usize + 1)
        .timestamp(Timestamp::Millisecond)
        .init()?;

    match &cli.command {
        Commands::Check(args) => check(args),
        Commands::ChunkSize(args) => chunk_size(args),
    }
}
