use balanced_mirror::application::mirror::Mirror;
use balanced_mirror::application::payouts::BulkPayoutFormSet;
use balanced_mirror::application::provisioner::AccountProvisioner;
use balanced_mirror::application::sync::{SyncTarget, Synchronizer};
use balanced_mirror::config::Config;
use balanced_mirror::domain::ports::{MirrorStores, PaymentGatewayRef};
use balanced_mirror::domain::user::User;
use balanced_mirror::infrastructure::balanced::BalancedClient;
use balanced_mirror::infrastructure::in_memory::in_memory_stores;
use balanced_mirror::interfaces::csv::credit_writer::CreditWriter;
use balanced_mirror::interfaces::csv::payout_reader::PayoutReader;
use balanced_mirror::interfaces::http::{self, State};
use clap::{Parser, Subcommand};
use log::info;
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Payments API base URL, overriding BALANCED_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log level, overriding LOG_LEVEL.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the admin web surface.
    Serve {
        /// Address to listen on, overriding BIND_ADDRESS.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Re-scan remote resources into the local tables.
    Sync {
        /// accounts, bank-accounts, cards, credits, debits or all.
        #[arg(default_value = "all")]
        target: SyncTarget,
    },
    /// Validate and execute a batch of payouts from a CSV file with
    /// `bank_account,amount,description` columns.
    Payout {
        input: PathBuf,

        /// Validate only; issue no credits.
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the post-creation hook for a user.
    Provision {
        #[arg(long)]
        user_id: u64,

        #[arg(long)]
        username: String,

        /// Provision even when AUTO_CREATE_BALANCED_ACCOUNT is off.
        #[arg(long)]
        force: bool,
    },
}

fn open_stores(db_path: Option<PathBuf>) -> Result<MirrorStores> {
    match db_path {
        Some(db_path) => persistent_stores(db_path),
        None => Ok(in_memory_stores()),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn persistent_stores(db_path: PathBuf) -> Result<MirrorStores> {
    let store = balanced_mirror::infrastructure::rocksdb::RocksDBStore::open(db_path).into_diagnostic()?;
    Ok(store.stores())
}

#[cfg(not(feature = "storage-rocksdb"))]
fn persistent_stores(db_path: PathBuf) -> Result<MirrorStores> {
    log::warn!("ignoring --db-path {}", db_path.display());
    eprintln!(
        "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
    );
    Ok(in_memory_stores())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }
    let level = config
        .log_level
        .parse::<log::LevelFilter>()
        .map_err(|_| miette!("invalid log level '{}'", config.log_level))?;
    tide::log::with_level(level);
    config.report();

    let gateway: PaymentGatewayRef = Arc::new(BalancedClient::new(&config));
    let stores = open_stores(cli.db_path)?;
    let mirror = Arc::new(Mirror::new(gateway.clone(), stores.clone()));

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            let address = config.bind_address.clone();
            let app = http::app(State::new(mirror, config)).into_diagnostic()?;
            info!("admin listening on http://{}", address);
            app.listen(address).await.into_diagnostic()?;
        }
        Command::Sync { target } => {
            let synchronizer = Synchronizer::new(gateway, stores);
            for report in synchronizer.run(target).await.into_diagnostic()? {
                println!("{}", report);
            }
        }
        Command::Payout { input, dry_run } => {
            let file = File::open(input).into_diagnostic()?;
            let mut rows = Vec::new();
            for row in PayoutReader::new(file).payouts() {
                rows.push(row.into_diagnostic()?);
            }

            let formset = BulkPayoutFormSet::bind(rows, &mirror).await.into_diagnostic()?;
            if !formset.is_valid() {
                for message in formset.non_form_errors() {
                    eprintln!("Error: {}", message);
                }
                for (line, form) in formset.forms().iter().enumerate() {
                    if !form.errors().is_empty() {
                        eprintln!("Row {}: {}", line + 1, form.errors());
                    }
                }
                return Err(miette!("payout batch rejected, no credits were issued"));
            }
            if dry_run {
                println!(
                    "{} payouts totalling {} cents are covered by escrow",
                    formset.forms().len(),
                    formset.total().into_diagnostic()?
                );
                return Ok(());
            }

            let credits = formset.execute(&mirror).await.into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = CreditWriter::new(stdout.lock());
            writer.write_credits(&credits).into_diagnostic()?;
        }
        Command::Provision {
            user_id,
            username,
            force,
        } => {
            let provisioner = AccountProvisioner::new(mirror, &config);
            let user = User::new(user_id, username);
            let account = if force {
                Some(provisioner.ensure_account(&user).await.into_diagnostic()?)
            } else {
                provisioner.on_user_created(&user).await.into_diagnostic()?
            };
            match account {
                Some(account) => println!("{}", account.uri),
                None => eprintln!("Account provisioning is disabled; set AUTO_CREATE_BALANCED_ACCOUNT or pass --force"),
            }
        }
    }

    Ok(())
}
