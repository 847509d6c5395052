//! Wiring of one CLI invocation.
//!
//! A session discovers the local checkout, resolves the repository and
//! author, opens the cache store, and builds the GitHub gateways before
//! dispatching the command.

use std::io::{self, Write};
use std::path::Path;

use pullman::local::{Git2Repository, LocalRepository, NoRepository};
use pullman::persistence::{DisabledStore, PullRequestStore, SqlitePullRequestStore};
use pullman::telemetry::{NoopTelemetrySink, StderrJsonlTelemetrySink, TelemetrySink};
use pullman::{
    OctocrabPullRequestGateway, OctocrabWorkflowGateway, PullRequestIndex, PullmanConfig,
    PullmanError, RepositoryLocator, Resolver, UrlBuilder,
};
use tracing::{debug, warn};

use super::errors::ErrorsOptions;
use super::list::ListOptions;
use super::show::Shown;
use super::{Command, errors, list, show};

/// Runs `command` for `token` with the loaded configuration.
///
/// `errors` re-fetches the resolved pull request so CI runs pushed since it
/// was cached are seen.
///
/// # Errors
///
/// Returns configuration, authentication, resolution, and I/O errors.
pub async fn run(
    config: &PullmanConfig,
    command: Command,
    token: &str,
) -> Result<(), PullmanError> {
    let checkout = Git2Repository::discover(Path::new(".")).ok();
    if checkout.is_none() {
        debug!("not inside a git checkout; local resolution is disabled");
    }
    let locator = config.repository_locator(checkout.as_ref())?;
    let author = config.resolve_user(checkout.as_ref())?;
    let access_token = config.access_token();

    let telemetry: Box<dyn TelemetrySink> = if config.verbose {
        Box::new(StderrJsonlTelemetrySink)
    } else {
        Box::new(NoopTelemetrySink)
    };
    let store = open_store(config, &locator, telemetry.as_ref());
    let gateway = OctocrabPullRequestGateway::for_token(
        access_token.as_ref(),
        locator.clone(),
        config.remote(),
        config.workflows(),
    )?;
    let mut index = PullRequestIndex::new(&gateway, store.as_ref(), telemetry.as_ref(), author);
    if config.rewrite_cache {
        index.refresh();
    }

    let fallback = NoRepository;
    let local: &dyn LocalRepository = match &checkout {
        Some(repository) => repository,
        None => &fallback,
    };
    let urls = UrlBuilder::new(&locator, config.hud_url());
    let mut stdout = io::stdout().lock();

    match command {
        Command::List => list::run(&mut index, token, ListOptions::from(config), &mut stdout).await,
        Command::Url(kind) => {
            show::run(&mut index, local, &urls, token, Shown::Url(kind), &mut stdout).await
        }
        Command::Ref => show::run(&mut index, local, &urls, token, Shown::Ref, &mut stdout).await,
        Command::Errors => {
            let resolved = Resolver::new(&mut index, local).resolve(token).await?;
            let pull_request = match index.by_id_fresh(resolved.id).await? {
                Some(current) => current,
                None => {
                    warn!(pull_request = resolved.id, "no longer open; using the cached record");
                    resolved
                }
            };
            let workflows = OctocrabWorkflowGateway::for_token(access_token.as_ref(), locator)?;
            let mut stderr = io::stderr();
            let outcome = errors::run(
                &pull_request,
                &workflows,
                &urls,
                &ErrorsOptions::from(config),
                &mut stdout,
                &mut stderr,
            )
            .await;
            stdout.flush().map_err(|error| super::output::io_error(&error))?;
            outcome
        }
    }
}

/// Opens the cache store, falling back to no caching when it is disabled
/// or cannot be opened.
fn open_store(
    config: &PullmanConfig,
    locator: &RepositoryLocator,
    telemetry: &dyn TelemetrySink,
) -> Box<dyn PullRequestStore> {
    if config.ignore_cache {
        return Box::new(DisabledStore);
    }
    let opened = config.cache_path().and_then(|path| {
        debug!(%path, "opening pull request cache");
        SqlitePullRequestStore::open(&path, locator.slug(), telemetry).map_err(|error| {
            PullmanError::Configuration {
                message: format!("cache '{path}': {error}"),
            }
        })
    });
    match opened {
        Ok(store) => Box::new(store),
        Err(error) => {
            warn!(%error, "continuing without the pull request cache");
            Box::new(DisabledStore)
        }
    }
}
