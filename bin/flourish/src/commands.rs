//! Command dispatch.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use eyre::{Result, WrapErr, bail};
use flourish_app::{Session, SessionState, SubmitError};
use flourish_garden::{Flower, PLOT_COUNT};
use flourish_leaderboard::{ChannelObserver, LeaderboardEvent, LeaderboardFeed, LeaderboardSnapshot};
use flourish_ledger::{
    AnonymousIdentity, IdentityProvider, RenameOutcome, ScoreLedger, StaticIdentity,
};
use flourish_oracle::build_oracle;
use flourish_primitives::{RecordPresence, UserId};
use flourish_store::{DocumentStore, FileDocumentStore};
use tracing::{debug, info, warn};

use crate::cli::{Cli, Commands};
use crate::config::FlourishConfig;
use crate::dirs::DataDirs;

/// Everything a command needs, built once per invocation.
struct Context {
    dirs: DataDirs,
    config: FlourishConfig,
    store: Arc<FileDocumentStore>,
    user_id: UserId,
    ledger: Arc<ScoreLedger>,
}

impl Context {
    fn build(cli: &Cli) -> Result<Self> {
        let dirs = DataDirs::new(cli.datadir.clone())?;
        let mut config = FlourishConfig::load(Some(&dirs.config_file()))?;

        if let Some(user) = &cli.user {
            config.identity.user_id = Some(user.clone());
        }
        if cli.offline {
            config.oracle.offline = true;
        }

        let store_path = config.store.path.clone().unwrap_or_else(|| dirs.store_file());
        let store = Arc::new(
            FileDocumentStore::open_with_create_dir(&store_path)
                .wrap_err_with(|| format!("Failed to open store {}", store_path.display()))?,
        );

        let identity = resolve_identity(&config, &dirs.user_id_file())?;
        let user_id = identity
            .current_user_id()
            .ok_or_else(|| eyre::eyre!("no user identity available"))?;
        debug!(%user_id, datadir = %dirs.root().display(), "context ready");

        let ledger = Arc::new(ScoreLedger::new(
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            identity,
            config.ledger.clone(),
        ));

        Ok(Self {
            dirs,
            config,
            store,
            user_id,
            ledger,
        })
    }

    fn feed(&self) -> LeaderboardFeed {
        LeaderboardFeed::new(
            Arc::clone(&self.store) as Arc<dyn DocumentStore>,
            self.config.leaderboard.clone(),
        )
    }

    fn session(&self) -> Result<Session> {
        let oracle = build_oracle(&self.config.oracle).wrap_err("Failed to set up scoring oracle")?;
        let state = load_state(&self.dirs.session_file())?;
        Ok(Session::with_state(oracle, Arc::clone(&self.ledger), state))
    }

    fn save(&self, session: &Session) -> Result<()> {
        save_state(&self.dirs.session_file(), session.state())
    }

    fn flush(&self) -> Result<()> {
        self.store.flush().wrap_err("Failed to persist scores")
    }
}

/// A configured id wins; otherwise the saved anonymous id, minted and saved
/// on first use.
fn resolve_identity(config: &FlourishConfig, id_file: &Path) -> Result<Arc<dyn IdentityProvider>> {
    if let Some(id) = &config.identity.user_id {
        return Ok(Arc::new(StaticIdentity::signed_in(id.as_str())));
    }

    let identity = match fs::read_to_string(id_file) {
        Ok(saved) if !saved.trim().is_empty() => {
            AnonymousIdentity::restore(UserId::new(saved.trim()))
        }
        Ok(_) => AnonymousIdentity::new(),
        Err(e) if e.kind() == ErrorKind::NotFound => AnonymousIdentity::new(),
        Err(e) => return Err(e).wrap_err("Failed to read saved user id"),
    };

    let id = identity.sign_in();
    fs::write(id_file, id.as_str()).wrap_err("Failed to save user id")?;
    Ok(Arc::new(identity))
}

fn load_state(path: &Path) -> Result<SessionState> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .wrap_err_with(|| format!("Corrupt session state {}", path.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(SessionState::default()),
        Err(e) => Err(e).wrap_err("Failed to read session state"),
    }
}

/// Written to a temp file, then renamed into place.
fn save_state(path: &Path, state: &SessionState) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_vec_pretty(state)?;
    fs::write(&tmp, json).wrap_err("Failed to write session state")?;
    fs::rename(&tmp, path).wrap_err("Failed to write session state")?;
    Ok(())
}

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::build(&cli)?;

    match cli.command {
        Commands::Whoami => whoami(&ctx).await?,
        Commands::Record { points, name } => {
            let total = ctx.ledger.record_points(points, name.as_deref()).await?;
            println!("recorded {total} points");
        }
        Commands::Rename { name } => match ctx.ledger.rename_user(&name).await? {
            RenameOutcome::Renamed => println!("display name set to {name}"),
            RenameOutcome::Unchanged => println!("display name unchanged (blank name)"),
        },
        Commands::Leaderboard => {
            let snapshot = ctx.feed().fetch().await?;
            print_snapshot(&snapshot, &ctx.user_id);
        }
        Commands::Watch => watch(&ctx).await?,
        Commands::Submit { title, body } => submit(&ctx, title, body).await?,
        Commands::Stats => stats(&ctx)?,
        Commands::Buy { flower } => buy(&ctx, flower)?,
        Commands::Plant { plot } => plant(&ctx, usize::from(plot))?,
        Commands::Advance => {
            let mut session = ctx.session()?;
            let theme = session.advance_garden()?;
            ctx.save(&session)?;
            println!("welcome to the {theme}!");
        }
    }

    ctx.flush()
}

async fn whoami(ctx: &Context) -> Result<()> {
    println!("user id: {}", ctx.user_id);
    match ctx.ledger.current_record().await? {
        RecordPresence::Absent => println!("no score published yet"),
        RecordPresence::Present(record) => println!(
            "{} with {} points",
            record.display_name.as_deref().unwrap_or("(no display name)"),
            record.points
        ),
        RecordPresence::Malformed(e) => println!("stored score is unreadable: {}", e.reason),
    }
    Ok(())
}

fn print_snapshot(snapshot: &LeaderboardSnapshot, me: &UserId) {
    if snapshot.is_empty() {
        println!("the leaderboard is empty");
    }
    for (rank, entry) in snapshot.entries().iter().enumerate() {
        println!("{:>2}. {:<28} {:>6}", rank + 1, entry.label(Some(me)), entry.points);
    }
    if snapshot.dropped() > 0 {
        println!("({} unreadable records skipped)", snapshot.dropped());
    }
}

async fn watch(ctx: &Context) -> Result<()> {
    let feed = ctx.feed();
    let (observer, mut rx) = ChannelObserver::new();
    feed.start_listening(observer)?;
    info!("watching leaderboard, press ctrl-c to stop");

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(LeaderboardEvent::Snapshot(snapshot)) => {
                    println!();
                    print_snapshot(&snapshot, &ctx.user_id);
                }
                Some(LeaderboardEvent::Error(e)) => warn!(error = %e, "leaderboard feed error"),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    feed.stop_listening();
    Ok(())
}

async fn submit(ctx: &Context, title: String, body: String) -> Result<()> {
    let mut session = ctx.session()?;

    match session.submit(title, body).await {
        Ok(submission) => {
            ctx.save(&session)?;
            let category = submission
                .entry
                .category
                .map_or("uncategorised", |c| c.as_str());
            println!(
                "+{} points ({category}); {} points on the leaderboard",
                submission.entry.points, submission.total
            );
            Ok(())
        }
        Err(SubmitError::Ledger { entry, source }) => {
            ctx.save(&session)?;
            println!("+{} points saved locally", entry.points);
            Err(source).wrap_err("Leaderboard not updated; run `flourish record` or submit again")
        }
        Err(e @ SubmitError::Scoring(_)) => Err(e.into()),
    }
}

fn stats(ctx: &Context) -> Result<()> {
    let session = ctx.session()?;
    let state = session.state();

    println!("{} days in a row!", session.streak(&Local));
    println!(
        "{} entries, {} points earned",
        state.journal.len(),
        state.journal.total_points()
    );
    for (category, count) in state.journal.tally().distribution() {
        println!("  {:<20} {count}", category.as_str());
    }
    println!(
        "balance {} (lifetime {})",
        state.wallet.balance, state.wallet.lifetime
    );
    println!(
        "{} garden: {}/{PLOT_COUNT} planted{}",
        state.garden.theme(),
        state.garden.planted(),
        state
            .garden
            .pending()
            .map(|f| format!(", {f} waiting to be planted"))
            .unwrap_or_default()
    );
    Ok(())
}

fn buy(ctx: &Context, flower: Flower) -> Result<()> {
    let mut session = ctx.session()?;
    session.purchase(flower)?;
    ctx.save(&session)?;
    println!(
        "bought a {flower} for {}; balance {}",
        flower.cost(),
        session.state().wallet.balance
    );
    Ok(())
}

fn plant(ctx: &Context, plot: usize) -> Result<()> {
    let Some(index) = plot.checked_sub(1) else {
        bail!("plots are numbered 1 to {PLOT_COUNT}");
    };

    let mut session = ctx.session()?;
    let complete = session.plant(index)?;
    ctx.save(&session)?;

    if complete {
        println!("garden complete! run `flourish advance` for the next theme");
    } else {
        println!("planted in plot {plot}");
    }
    Ok(())
}
