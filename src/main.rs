//! Votectl - Election Administration Client
//!
//! Usage:
//!   votectl login --email <EMAIL>    - Sign in as an election official
//!   votectl elections list           - List elections
//!   votectl start <ID>               - Start an election
//!   votectl verify <TOKEN>           - Verify a vote by hash or receipt

use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use votectl::client::AdminClient;
use votectl::config::VotectlConfig;
use votectl::election::{
    Candidate, Election, ElectionStatus, ElectionType, LifecycleAction, NewElection, Party,
};
use votectl::error::{Error, Result};
use votectl::verification::{LedgerStats, VerificationResult, VerifyMode};

/// Votectl - Election Administration Client
#[derive(Parser)]
#[command(name = "votectl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults apply when missing)
    #[arg(short, long, default_value = "votectl.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides config
    #[arg(short, long)]
    log_level: Option<String>,

    /// Backend API base URL (overrides config)
    #[arg(short, long)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and persist the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "VOTECTL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the persisted session
    Logout,
    /// Show the signed-in official
    Whoami,
    /// Exchange the refresh token for a new access token
    Refresh,
    /// Browse elections
    Elections {
        #[command(subcommand)]
        what: ElectionsCommand,
    },
    /// Create a new election
    Create {
        #[arg(long)]
        name: String,
        /// PARLIAMENTARY or LOCAL_GOVERNMENT
        #[arg(long = "type")]
        election_type: ElectionType,
        /// Election day, e.g. 2026-04-25T07:00:00
        #[arg(long)]
        date: String,
        /// Voter registration deadline
        #[arg(long)]
        deadline: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// External candidate data source
        #[arg(long)]
        data_source: Option<String>,
    },
    /// Import candidates (CREATED -> CANDIDATES_IMPORTED)
    Import {
        id: String,
        /// Override the election's external data source
        #[arg(long)]
        data_source: Option<String>,
        /// Send even if the current status does not allow it
        #[arg(long)]
        force: bool,
    },
    /// Start voting (CANDIDATES_IMPORTED -> STARTED)
    Start {
        id: String,
        #[arg(long)]
        force: bool,
    },
    /// Close voting (STARTED -> CLOSED)
    Close {
        id: String,
        #[arg(long)]
        force: bool,
    },
    /// List an election's candidates
    Candidates { id: String },
    /// List an election's parties
    Parties { id: String },
    /// Verify a vote by hash, or by receipt token with --receipt
    Verify {
        token: String,
        #[arg(long)]
        receipt: bool,
    },
    /// Inspect an election's ledger
    Ledger {
        #[command(subcommand)]
        what: LedgerCommand,
    },
    /// Write a default configuration file
    Init {
        #[arg(short, long, default_value = "votectl.toml")]
        output: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Validate configuration file
    Validate,
}

#[derive(Subcommand)]
enum ElectionsCommand {
    /// List all elections, one page at a time
    List {
        /// Zero-based page number
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        size: u32,
    },
    /// List elections currently open for voting
    Active,
    /// List elections in one status
    Status { status: ElectionStatus },
    /// Show one election
    Show { id: String },
}

#[derive(Subcommand)]
enum LedgerCommand {
    /// Show block and transaction counts
    Stats { id: String },
    /// Run a full chain validation
    Validate { id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(endpoint) = &cli.endpoint {
        config.api.base_url = endpoint.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    init_logging(&config.logging.level, &config.logging.format);

    let result = match cli.command {
        Commands::Init { output, force } => run_init(&output, force),
        Commands::Validate => run_validate(&cli.config),
        command => run_command(&config, command).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if e.requires_login() {
            eprintln!("Run `votectl login` to sign in again");
        }
        std::process::exit(1);
    }
}

fn init_logging(level: &str, format: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: &Path) -> Result<VotectlConfig> {
    if path.exists() {
        VotectlConfig::from_file(path)
    } else {
        Ok(VotectlConfig::default())
    }
}

async fn run_command(config: &VotectlConfig, command: Commands) -> Result<()> {
    let client = AdminClient::open(config).await?;

    match command {
        Commands::Login { email, password } => {
            let session = client.session().login(&email, &password).await?;
            println!("✓ Signed in as {} ({})", session.user.full_name, session.user.role);
            Ok(())
        }
        Commands::Logout => {
            client.session().logout().await;
            println!("✓ Signed out");
            Ok(())
        }
        Commands::Whoami => {
            show_session(&client);
            Ok(())
        }
        Commands::Refresh => {
            let session = client.session().refresh().await?;
            println!("✓ Session refreshed, access token valid until {}", session.expires_at());
            Ok(())
        }
        Commands::Elections { what } => run_elections(&client, what).await,
        Commands::Create {
            name,
            election_type,
            date,
            deadline,
            description,
            start,
            end,
            data_source,
        } => {
            let request = NewElection {
                name,
                description,
                election_type,
                election_date: date,
                registration_deadline: deadline,
                start_date: start,
                end_date: end,
                external_data_source: data_source,
            };
            let election = client.elections().create(&request).await?;
            println!("✓ Created election {}", election.id);
            print_election(&election);
            Ok(())
        }
        Commands::Import { id, data_source, force } => {
            run_transition(&client, &id, LifecycleAction::ImportCandidates, data_source.as_deref(), force).await
        }
        Commands::Start { id, force } => {
            run_transition(&client, &id, LifecycleAction::Start, None, force).await
        }
        Commands::Close { id, force } => {
            run_transition(&client, &id, LifecycleAction::Close, None, force).await
        }
        Commands::Candidates { id } => {
            let candidates = client.elections().candidates(&id).await?;
            print_candidates(&candidates);
            Ok(())
        }
        Commands::Parties { id } => {
            let parties = client.elections().parties(&id).await?;
            print_parties(&parties);
            Ok(())
        }
        Commands::Verify { token, receipt } => {
            let mode = if receipt { VerifyMode::Receipt } else { VerifyMode::Hash };
            let result = client.verifier().verify(&token, mode).await?;
            print_verification(&result);
            Ok(())
        }
        Commands::Ledger { what } => {
            let (id, stats) = match what {
                LedgerCommand::Stats { id } => {
                    let stats = client.ledger().stats(&id).await?;
                    (id, stats)
                }
                LedgerCommand::Validate { id } => {
                    let stats = client.ledger().validate(&id).await?;
                    (id, stats)
                }
            };
            print_ledger_stats(&id, &stats);
            Ok(())
        }
        Commands::Init { .. } | Commands::Validate => Ok(()),
    }
}

async fn run_elections(client: &AdminClient, what: ElectionsCommand) -> Result<()> {
    let elections = client.elections();
    match what {
        ElectionsCommand::List { page, size } => {
            let page = elections.list(page, size).await?;
            print_election_table(&page.content);
            println!(
                "Page {} of {}  |  {} elections",
                page.number + 1,
                page.total_pages.max(1),
                page.total_elements
            );
        }
        ElectionsCommand::Active => print_election_table(&elections.active().await?),
        ElectionsCommand::Status { status } => {
            print_election_table(&elections.by_status(status).await?)
        }
        ElectionsCommand::Show { id } => {
            let controller = client.lifecycle(id);
            let election = controller.load().await?;
            print_election(&election);
            if election.status.has_ledger() {
                if let Some(stats) = controller.wait_for_ledger_stats().await {
                    print_ledger_stats(controller.election_id(), &stats);
                }
            }
        }
    }
    Ok(())
}

/// Run one lifecycle action through a controller
async fn run_transition(
    client: &AdminClient,
    id: &str,
    action: LifecycleAction,
    data_source: Option<&str>,
    force: bool,
) -> Result<()> {
    let controller = client.lifecycle(id);
    let current = controller.load().await?;

    if !current.status.permits(action) && !force {
        return Err(Error::InvalidTransition(format!(
            "cannot {} an election that is {} (needs {}); use --force to send anyway",
            action,
            current.status.label(),
            action.required_status().label()
        )));
    }

    let election = match action {
        LifecycleAction::ImportCandidates => controller.import_candidates(data_source).await?,
        LifecycleAction::Start => controller.start_election().await?,
        LifecycleAction::Close => controller.close_election().await?,
    };
    println!("✓ {} is now {}", election.name, election.status.label());

    if election.status.has_ledger() {
        if let Some(stats) = controller.wait_for_ledger_stats().await {
            print_ledger_stats(id, &stats);
        }
    }
    Ok(())
}

fn run_init(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists; use --force to overwrite",
            output.display()
        )));
    }

    let content = format!(
        "# Votectl Configuration\n# Generated configuration file\n\n{}",
        VotectlConfig::default().to_toml()?
    );
    std::fs::write(output, content)?;

    println!("Configuration written to {:?}", output);
    println!();
    println!("Next steps:");
    println!("  1. Set api.base_url to your backend");
    println!("  2. Sign in: votectl login --email <EMAIL>");
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<()> {
    match VotectlConfig::from_file(config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Backend:      {}", config.api.base_url);
            println!("  Timeouts:     connect {}s, request {}s",
                config.api.connect_timeout_secs,
                config.api.request_timeout_secs);
            println!("  Session data: {}", config.session.data_dir.display());
            println!("  Logging:      {} ({})", config.logging.level, config.logging.format);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

// ============ Output ============

fn show_session(client: &AdminClient) {
    let Some(session) = client.session().current() else {
        println!("Not signed in");
        return;
    };

    println!();
    println!("Signed In");
    println!("=========");
    println!();
    println!("Name:        {}", session.user.full_name);
    println!("Email:       {}", session.user.email);
    println!("Role:        {}", session.user.role);
    println!("Signed in:   {}", session.login_time);
    let expiry = if session.is_access_token_expired(Utc::now()) {
        " (expired, refreshed on next call)"
    } else {
        ""
    };
    println!("Token until: {}{}", session.expires_at(), expiry);
    println!();
}

fn print_election_table(elections: &[Election]) {
    println!();
    println!("{:<38} {:<36} {:<20} {:>8}", "ID", "NAME", "STATUS", "TURNOUT");
    println!("{}", "-".repeat(105));

    for election in elections {
        // Pad before adding color codes
        let status_padded = format!("{:<20}", election.status.label());
        let status_colored = match election.status {
            ElectionStatus::Started => format!("\x1b[32m{}\x1b[0m", status_padded),
            ElectionStatus::Closed => format!("\x1b[33m{}\x1b[0m", status_padded),
            ElectionStatus::ResultsPublished => format!("\x1b[1;34m{}\x1b[0m", status_padded),
            _ => status_padded,
        };

        println!(
            "{:<38} {:<36} {} {:>8}",
            election.id,
            truncate(&election.name, 36),
            status_colored,
            election.turnout().to_string()
        );
    }
    println!();
}

fn print_election(election: &Election) {
    println!();
    println!("{}", election.name);
    println!("{}", "=".repeat(election.name.chars().count()));
    println!();
    println!("ID:            {}", election.id);
    if let Some(election_type) = election.election_type {
        println!("Type:          {}", election_type.label());
    }
    println!("Status:        {}", election.status.label());
    println!("Election date: {}", election.election_date);
    println!("Registration:  until {}", election.registration_deadline);
    if let Some(start) = &election.start_date {
        println!("Voting opens:  {}", start);
    }
    if let Some(end) = &election.end_date {
        println!("Voting closes: {}", end);
    }
    println!("Votes cast:    {}", election.total_votes_cast);
    if election.total_eligible_voters > 0 {
        println!("Turnout:       {} of {} eligible", election.turnout(), election.total_eligible_voters);
    } else {
        println!("Turnout:       {}", election.turnout());
    }
    println!("Candidates:    {}", election.candidate_count);
    println!("Parties:       {}", election.party_count);

    let actions: Vec<String> = election
        .available_actions()
        .iter()
        .map(|a| a.to_string())
        .collect();
    if !actions.is_empty() {
        println!("Next step:     {}", actions.join(", "));
    }
    println!();
}

fn print_candidates(candidates: &[Candidate]) {
    println!();
    println!("{:<4} {:<32} {:<10} {:<20}", "#", "NAME", "PARTY", "REGION");
    println!("{}", "-".repeat(70));
    for candidate in candidates {
        let position = candidate
            .position_in_list
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let party = if candidate.independent {
            "IND".to_string()
        } else {
            candidate.party_code.clone().unwrap_or_default()
        };
        let region = candidate
            .municipality_name
            .as_deref()
            .or(candidate.county_name.as_deref())
            .unwrap_or("");
        println!("{:<4} {:<32} {:<10} {:<20}", position, truncate(&candidate.full_name, 32), party, region);
    }
    println!();
    println!("{} candidates", candidates.len());
}

fn print_parties(parties: &[Party]) {
    println!();
    println!("{:<4} {:<10} {:<36} {:<24} {:>10}", "#", "CODE", "NAME", "LEADER", "CANDIDATES");
    println!("{}", "-".repeat(88));
    for party in parties {
        let number = party
            .list_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<4} {:<10} {:<36} {:<24} {:>10}",
            number,
            party.code,
            truncate(&party.name, 36),
            party.leader.as_deref().unwrap_or(""),
            party.candidate_count
        );
    }
    println!();
}

fn print_verification(result: &VerificationResult) {
    let headline = result.outcome().to_string();
    let colored = match (result.verified, result.blockchain_consistent) {
        (true, true) => format!("\x1b[1;32m✓ {}\x1b[0m", headline),
        (true, false) => format!("\x1b[1;33m● {}\x1b[0m", headline),
        (false, _) => format!("\x1b[1;31m✗ {}\x1b[0m", headline),
    };

    println!();
    println!("{}", colored);
    println!();
    if let Some(hash) = &result.vote_hash {
        println!("Vote hash:        {}", hash);
    }
    if let Some(name) = &result.election_name {
        println!("Election:         {}", name);
    }
    if let Some(block) = result.block_number {
        println!("Block:            #{}", block);
    }
    if let Some(block_hash) = &result.block_hash {
        println!("Block hash:       {}", block_hash);
    }
    if let Some(tx) = &result.blockchain_transaction_id {
        println!("Transaction:      {}", tx);
    }
    if let Some(cast) = &result.vote_timestamp {
        println!("Recorded at:      {}", cast);
    }
    println!("Verified at:      {}", result.verification_timestamp);
    if result.verified {
        println!("Ledger confirmed: {}", if result.blockchain_consistent { "yes" } else { "pending" });
    }
    if let Some(message) = &result.message {
        println!("Message:          {}", message);
    }
    println!();
}

fn print_ledger_stats(election_id: &str, stats: &LedgerStats) {
    let valid = match stats.chain_valid() {
        Some(true) => "\x1b[32mvalid\x1b[0m",
        Some(false) => "\x1b[31mINVALID\x1b[0m",
        None => "unknown",
    };

    println!("Ledger for {}", stats.election_id().unwrap_or(election_id));
    println!("  Blocks:       {}", stats.block_count().map_or("-".to_string(), |n| n.to_string()));
    println!("  Transactions: {}", stats.total_transactions().map_or("-".to_string(), |n| n.to_string()));
    println!("  Chain:        {}", valid);
    println!();
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
