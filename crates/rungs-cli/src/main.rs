#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use rungs_core::config;
use std::env;
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "rungs: XP, badges, ranks and boss battles for sales reps",
    long_about = None
)]
struct Cli {
    /// Output format. Defaults to pretty on a terminal and text when piped.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Project root holding `.rungs/`. Defaults to the current directory.
    #[arg(long, global = true, env = "RUNGS_ROOT")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags, environment and user config.
    fn output_mode(&self) -> OutputMode {
        let user_default = match config::load_user_config() {
            Ok(user) => user.output,
            Err(e) => {
                warn!("ignoring user config: {e:#}");
                None
            }
        };
        output::resolve_output_mode(self.format, self.json, user_default.as_deref())
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Lifecycle",
        about = "Create a rep's progression record",
        long_about = "Create a rep's progression record at the first rank. Creates the store on first use; an existing rep is left untouched.",
        after_help = "EXAMPLES:\n    # Start tracking a rep\n    rungs init rep-17 --name \"Casey Park\"\n\n    # Emit machine-readable output\n    rungs init rep-17 --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Activity",
        about = "Ingest an inbound event",
        long_about = "Award XP for an inbound event and bump its daily counter. Unknown event types earn nothing unless --amount is given.",
        after_help = "EXAMPLES:\n    # A booked appointment\n    rungs event rep-17 appointment_set\n\n    # Explicit amount with an extra multiplier\n    rungs event rep-17 backfill --amount 250 -m double_xp=2\n\n    # Emit machine-readable output\n    rungs event rep-17 dial --json"
    )]
    Event(cmd::event::EventArgs),

    #[command(
        next_help_heading = "Activity",
        about = "Record a finished call's length",
        long_about = "Classify a finished call into the under-30s or over-2min daily counters.",
        after_help = "EXAMPLES:\n    # A call that dropped quickly\n    rungs call rep-17 --seconds 12"
    )]
    Call(cmd::event::CallArgs),

    #[command(
        next_help_heading = "Activity",
        about = "Record a closed deal",
        long_about = "Award deal_closed XP and increment the rep's closed-deal counter.",
        after_help = "EXAMPLES:\n    # Close a deal\n    rungs deal rep-17 --details \"Acme renewal\""
    )]
    Deal(cmd::event::DealArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show a rep's progression",
        long_about = "Show level progress, rank, streak, badges and everything else on the rep's record.",
        after_help = "EXAMPLES:\n    # Dashboard view\n    rungs show rep-17\n\n    # Emit machine-readable output\n    rungs show rep-17 --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show efficiency rates",
        long_about = "Aggregate recent daily counters into efficiency rates and tiers.",
        after_help = "EXAMPLES:\n    rungs efficiency rep-17"
    )]
    Efficiency(cmd::show::EfficiencyArgs),

    #[command(
        next_help_heading = "Read",
        about = "List tracked reps",
        after_help = "EXAMPLES:\n    rungs users --format text"
    )]
    Users,

    #[command(
        next_help_heading = "Read",
        about = "Show recent XP, activity or boss history",
        after_help = "EXAMPLES:\n    # Latest activity\n    rungs log rep-17\n\n    # Last 5 XP ledger rows\n    rungs log rep-17 --kind xp -n 5"
    )]
    Log(cmd::log::LogArgs),

    #[command(
        next_help_heading = "Read",
        about = "List the rule catalog",
        after_help = "EXAMPLES:\n    rungs catalog ranks\n    rungs catalog bosses --json"
    )]
    Catalog(cmd::catalog::CatalogArgs),

    #[command(
        next_help_heading = "Progression",
        about = "Check or perform a rank promotion",
        after_help = "EXAMPLES:\n    # What is missing for the next rank?\n    rungs rank check rep-17\n\n    # Promote, guarding against the wrong target\n    rungs rank promote rep-17 --to sdr_2"
    )]
    Rank {
        #[command(subcommand)]
        command: cmd::rank::RankCommand,
    },

    #[command(
        next_help_heading = "Progression",
        about = "Record boss battle outcomes",
        after_help = "EXAMPLES:\n    rungs boss status rep-17 redhawk\n    rungs boss attempt rep-17 redhawk\n    rungs boss defeat rep-17 redhawk"
    )]
    Boss {
        #[command(subcommand)]
        command: cmd::boss::BossCommand,
    },

    #[command(
        next_help_heading = "Progression",
        about = "Grant or evaluate badges",
        after_help = "EXAMPLES:\n    rungs badge add rep-17 opener_elite.silver\n    rungs badge evaluate rep-17 -m dials=900 -m appointments=12"
    )]
    Badge {
        #[command(subcommand)]
        command: cmd::badge::BadgeCommand,
    },

    #[command(
        next_help_heading = "Progression",
        about = "Update specialization, titles, exams, modules and mentees",
        after_help = "EXAMPLES:\n    rungs profile spec rep-17 closer\n    rungs profile module rep-17 module_0\n    rungs profile exam rep-17 operative_certification\n    rungs profile title rep-17 \"RedHawk Conqueror\""
    )]
    Profile {
        #[command(subcommand)]
        command: cmd::profile::ProfileCommand,
    },

    #[command(
        next_help_heading = "Admin",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    rungs completions bash > /etc/bash_completion.d/rungs"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RUNGS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "rungs=debug,info"
        } else {
            "rungs=info,warn"
        })
    });

    let format = env::var("RUNGS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run_with_engine(
    command: Commands,
    output: OutputMode,
    engine: &rungs_core::ProgressionEngine,
) -> anyhow::Result<()> {
    match command {
        Commands::Init(args) => cmd::init::run_init(&args, output, engine),
        Commands::Event(args) => cmd::event::run_event(&args, output, engine),
        Commands::Call(args) => cmd::event::run_call(&args, output, engine),
        Commands::Deal(args) => cmd::event::run_deal(&args, output, engine),
        Commands::Show(args) => cmd::show::run_show(&args, output, engine),
        Commands::Efficiency(args) => cmd::show::run_efficiency(&args, output, engine),
        Commands::Users => cmd::show::run_users(output, engine),
        Commands::Log(args) => cmd::log::run_log(&args, output, engine),
        Commands::Rank { command } => cmd::rank::run_rank(&command, output, engine),
        Commands::Boss { command } => cmd::boss::run_boss(&command, output, engine),
        Commands::Badge { command } => cmd::badge::run_badge(&command, output, engine),
        Commands::Profile { command } => cmd::profile::run_profile(&command, output, engine),
        Commands::Catalog(_) | Commands::Completions(_) => {
            anyhow::bail!("command does not use the progression store")
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let output = cli.output_mode();
    let project_root = match cli.root {
        Some(root) => root,
        None => env::current_dir()?,
    };

    match cli.command {
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
        Commands::Catalog(args) => cmd::catalog::run_catalog(&args, output, &project_root),
        command => {
            let create = matches!(command, Commands::Init(_));
            let engine = cmd::open_engine(&project_root, output, create)?;
            let result = run_with_engine(command, output, &engine);
            let flushed = engine.flush_sync().await;
            if flushed > 0 {
                debug!(flushed, "flushed pending syncs before exit");
            }
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_sets_output_mode() {
        let cli = Cli::parse_from(["rungs", "--json", "users"]);
        assert!(cli.json);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["rungs", "show", "rep-1", "--json"]);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn format_flag_parses() {
        let cli = Cli::parse_from(["rungs", "users", "--format", "text"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }

    #[test]
    fn root_flag_parsed() {
        let cli = Cli::parse_from(["rungs", "--root", "/tmp/team", "users"]);
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/team")));
    }

    #[test]
    fn event_parses_amount_and_multipliers() {
        let cli = Cli::parse_from([
            "rungs",
            "event",
            "rep-1",
            "backfill",
            "--amount",
            "-50",
            "-m",
            "double_xp=2",
            "--multiplier",
            "weekend=1.5",
        ]);
        let Commands::Event(args) = cli.command else {
            panic!("expected event command");
        };
        assert_eq!(args.amount, Some(-50));
        assert_eq!(
            args.multipliers,
            vec![
                ("double_xp".to_string(), 2.0),
                ("weekend".to_string(), 1.5)
            ]
        );
    }

    #[test]
    fn malformed_multiplier_is_rejected() {
        let result = Cli::try_parse_from(["rungs", "event", "rep-1", "dial", "-m", "double_xp"]);
        assert!(result.is_err());
    }

    #[test]
    fn rank_promote_parses_target() {
        let cli = Cli::parse_from(["rungs", "rank", "promote", "rep-1", "--to", "sdr_2"]);
        assert!(matches!(
            cli.command,
            Commands::Rank {
                command: cmd::rank::RankCommand::Promote(ref args)
            } if args.target.as_deref() == Some("sdr_2")
        ));
    }

    #[test]
    fn boss_subcommands_parse() {
        for action in ["defeat", "attempt", "status"] {
            let cli = Cli::parse_from(["rungs", "boss", action, "rep-1", "redhawk"]);
            assert!(matches!(cli.command, Commands::Boss { .. }));
        }
    }

    #[test]
    fn log_defaults_to_activity() {
        let cli = Cli::parse_from(["rungs", "log", "rep-1"]);
        let Commands::Log(args) = cli.command else {
            panic!("expected log command");
        };
        assert_eq!(args.kind, cmd::log::LogKind::Activity);
        assert_eq!(args.limit, 20);
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["rungs", "completions", "bash"]);
        assert!(matches!(cli.command, Commands::Completions(_)));
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
