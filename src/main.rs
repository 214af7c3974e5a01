//! points-admin - command-line console for the points platform
//!
//! Plays the dashboard's composition root: loads config, opens the persisted
//! session, wires the terminal notifier/navigator into the API client and
//! renders backend records as tables.
//!
//! Module structure:
//! - `domain/` - Envelope protocol, error taxonomy, backend records
//! - `io/` - Transport, interceptor pipeline, API client, token store
//! - `services/` - Session context and endpoint groups
//! - `infra/` - Config, logging

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use points_admin::domain::types::{
    AdjustKind, AdjustPoints, Page, PointTypeCreate, PointTypeUpdate, RewardDraft,
    DEFAULT_PAGE_LIMIT,
};
use points_admin::domain::ApiError;
use points_admin::infra::{logging, Config};
use points_admin::io::{
    table, ApiClient, FileTokenStore, HttpTransport, TerminalNavigator, TerminalNotifier,
};
use points_admin::services::{
    AuthApi, LeaderboardApi, PointTypesApi, RewardsApi, Session, UserPointsApi,
};
use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

const PROGRAM: &str = "points-admin";
/// Read before prompting; the prompt itself echoes what is typed
const PASSWORD_ENV: &str = "POINTS_ADMIN_PASSWORD";

/// Points platform admin console
#[derive(Parser, Debug)]
#[command(
    name = "points-admin",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"),
    about
)]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE or config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the backend base URL
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session token
    Login {
        #[arg(short, long)]
        username: String,
        /// Password. Prefer $POINTS_ADMIN_PASSWORD: a flag value lands in shell history,
        /// and without either the password is prompted for with echo on
        #[arg(short, long)]
        password: Option<String>,
    },
    /// End the session
    Logout,
    /// Show whether a session is active
    Whoami,
    /// Manage point-type definitions
    #[command(subcommand)]
    PointTypes(PointTypesCmd),
    /// View and adjust user balances
    #[command(subcommand)]
    UserPoints(UserPointsCmd),
    /// Show the leaderboard of a point type
    Leaderboard {
        point_type: String,
        /// Only show the first N rows
        #[arg(long)]
        top: Option<usize>,
    },
    /// Manage rewards
    #[command(subcommand)]
    Rewards(RewardsCmd),
}

#[derive(Subcommand, Debug)]
enum PointTypesCmd {
    List {
        /// Rows per page
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u32,
        /// Rows to skip
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    Show {
        id: String,
    },
    Create {
        uri: String,
        #[arg(long)]
        display_name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Update {
        id: String,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
    },
    Delete {
        id: String,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum AdjustArg {
    Add,
    Subtract,
}

impl From<AdjustArg> for AdjustKind {
    fn from(arg: AdjustArg) -> Self {
        match arg {
            AdjustArg::Add => AdjustKind::Add,
            AdjustArg::Subtract => AdjustKind::Subtract,
        }
    }
}

#[derive(Subcommand, Debug)]
enum UserPointsCmd {
    List {
        point_type: String,
    },
    Adjust {
        point_type: String,
        user_id: String,
        #[arg(value_enum)]
        kind: AdjustArg,
        amount: i64,
        #[arg(long)]
        reason: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct RewardFields {
    #[arg(long)]
    name: String,
    #[arg(long)]
    cost: i64,
    #[arg(long)]
    stock: i64,
    /// Reward type label shown to users
    #[arg(long = "type")]
    kind: String,
    #[arg(long, default_value = "")]
    description: String,
}

impl From<RewardFields> for RewardDraft {
    fn from(f: RewardFields) -> Self {
        RewardDraft {
            name: f.name,
            cost: f.cost,
            stock: f.stock,
            kind: f.kind,
            description: f.description,
        }
    }
}

#[derive(Subcommand, Debug)]
enum RewardsCmd {
    List {
        point_type: String,
    },
    /// Redemption history
    Records {
        point_type: String,
    },
    Create {
        point_type: String,
        #[command(flatten)]
        fields: RewardFields,
    },
    Update {
        point_type: String,
        reward_id: String,
        #[command(flatten)]
        fields: RewardFields,
    },
    Delete {
        point_type: String,
        reward_id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Config::default_config_path);
    let mut config = Config::load_from_path(&config_path);
    if let Some(url) = &args.base_url {
        config = config.with_api_base_url(url.as_str());
    }
    logging::init(&config);

    info!(
        config_file = %config.config_file(),
        api_base_url = %config.api_base_url(),
        api_timeout_ms = %config.api_timeout_ms(),
        token_file = %config.token_file(),
        "config_loaded"
    );

    let client = match build_client(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::from(2);
        }
    };

    match run(&client, args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // API failures were already shown by the notifier
            match e.downcast_ref::<ApiError>() {
                Some(api_error) => debug!(kind = api_error.kind(), "command_failed"),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn build_client(config: &Config) -> anyhow::Result<ApiClient> {
    let transport = HttpTransport::from_config(config).context("cannot build HTTP transport")?;
    let session = Arc::new(Session::new(FileTokenStore::new(config.token_file())));
    let client = ApiClient::new(
        Arc::new(transport),
        session,
        Arc::new(TerminalNotifier),
        Arc::new(TerminalNavigator::new(PROGRAM)),
    )
    .with_login_route(config.login_route());
    Ok(client)
}

async fn run(client: &ApiClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { username, password } => {
            let env = std::env::var(PASSWORD_ENV).ok();
            let password = match password_source(password, env) {
                Some(p) => p,
                None => prompt_password()?,
            };
            let user = AuthApi::new(client).login(&username, &password).await?;
            println!("Logged in as {}", user.username);
        }
        Command::Logout => {
            AuthApi::new(client).logout().await?;
            println!("Logged out");
        }
        Command::Whoami => {
            let state = client.session().snapshot();
            if state.is_authenticated {
                println!("Session active");
            } else {
                println!("Not logged in");
            }
        }
        Command::PointTypes(cmd) => run_point_types(client, cmd).await?,
        Command::UserPoints(cmd) => run_user_points(client, cmd).await?,
        Command::Leaderboard { point_type, top } => {
            let api = LeaderboardApi::new(client);
            let rows = match top {
                Some(n) => api.top(&point_type, n).await?,
                None => api.list(&point_type).await?,
            };
            print!("{}", table::leaderboard(&rows).render());
        }
        Command::Rewards(cmd) => run_rewards(client, cmd).await?,
    }
    Ok(())
}

async fn run_point_types(client: &ApiClient, cmd: PointTypesCmd) -> anyhow::Result<()> {
    let api = PointTypesApi::new(client);
    match cmd {
        PointTypesCmd::List { limit, offset } => {
            let items = api.list(Page::new(limit, offset)).await?;
            print!("{}", table::point_types(&items).render());
        }
        PointTypesCmd::Show { id } => {
            let item = api.detail(&id).await?;
            print!("{}", table::point_types(std::slice::from_ref(&item)).render());
        }
        PointTypesCmd::Create { uri, display_name, description } => {
            let created = api.create(&PointTypeCreate { uri, display_name, description }).await?;
            println!("Created point type {} ({})", created.uri, created.id);
        }
        PointTypesCmd::Update { id, display_name, description, enable, disable } => {
            let enabled = match (enable, disable) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let update = PointTypeUpdate { display_name, description, enabled };
            if update.is_empty() {
                bail!(
                    "nothing to update: pass --display-name, --description, --enable or --disable"
                );
            }
            api.update(&id, &update).await?;
            println!("Updated point type {}", id);
        }
        PointTypesCmd::Delete { id } => {
            api.delete(&id).await?;
            println!("Deleted point type {}", id);
        }
    }
    Ok(())
}

async fn run_user_points(client: &ApiClient, cmd: UserPointsCmd) -> anyhow::Result<()> {
    let api = UserPointsApi::new(client);
    match cmd {
        UserPointsCmd::List { point_type } => {
            let rows = api.list(&point_type).await?;
            print!("{}", table::user_points(&rows).render());
        }
        UserPointsCmd::Adjust { point_type, user_id, kind, amount, reason } => {
            if amount <= 0 {
                bail!("amount must be a positive number of points");
            }
            let kind = AdjustKind::from(kind);
            let adjust = AdjustPoints { user_id: user_id.clone(), kind, amount, reason };
            api.adjust(&point_type, &adjust).await?;
            println!("Applied {} {} points for user {}", kind.as_str(), amount, user_id);
        }
    }
    Ok(())
}

async fn run_rewards(client: &ApiClient, cmd: RewardsCmd) -> anyhow::Result<()> {
    let api = RewardsApi::new(client);
    match cmd {
        RewardsCmd::List { point_type } => {
            let items = api.list(&point_type).await?;
            print!("{}", table::rewards(&items).render());
        }
        RewardsCmd::Records { point_type } => {
            let items = api.records(&point_type).await?;
            print!("{}", table::reward_records(&items).render());
        }
        RewardsCmd::Create { point_type, fields } => {
            let reward = api.create(&point_type, &fields.into()).await?;
            println!("Created reward {} ({})", reward.name, reward.id);
        }
        RewardsCmd::Update { point_type, reward_id, fields } => {
            api.update(&point_type, &reward_id, &fields.into()).await?;
            println!("Updated reward {}", reward_id);
        }
        RewardsCmd::Delete { point_type, reward_id } => {
            api.delete(&point_type, &reward_id).await?;
            println!("Deleted reward {}", reward_id);
        }
    }
    Ok(())
}

/// `--password` wins over the environment; an empty value counts as unset
fn password_source(flag: Option<String>, env: Option<String>) -> Option<String> {
    flag.into_iter().chain(env).find(|p| !p.is_empty())
}

/// Reads one line from stdin. There is no terminal echo control here, so the
/// operator is told to use the environment variable instead.
fn prompt_password() -> anyhow::Result<String> {
    eprintln!("note: input is echoed; set {} to avoid typing the password", PASSWORD_ENV);
    eprint!("Password: ");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line).context("failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("empty password");
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_source_order() {
        let some = |s: &str| Some(s.to_string());
        assert_eq!(password_source(some("flag"), some("env")), some("flag"));
        assert_eq!(password_source(None, some("env")), some("env"));
        assert_eq!(password_source(some(""), some("env")), some("env"));
        assert_eq!(password_source(None, some("")), None);
        assert_eq!(password_source(None, None), None);
    }

    #[test]
    fn test_point_types_list_paging_flags() {
        let args = Args::parse_from(["points-admin", "point-types", "list"]);
        match args.command {
            Command::PointTypes(PointTypesCmd::List { limit, offset }) => {
                assert_eq!(Page::new(limit, offset), Page::default());
            }
            other => panic!("unexpected command {:?}", other),
        }

        let args = Args::parse_from([
            "points-admin",
            "point-types",
            "list",
            "--limit",
            "5",
            "--offset",
            "15",
        ]);
        match args.command {
            Command::PointTypes(PointTypesCmd::List { limit, offset }) => {
                assert_eq!((limit, offset), (5, 15));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
