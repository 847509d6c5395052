//! Read-through index over the current user's open pull requests.
//!
//! The listing of open pull requests is requested once per session. Full
//! records are hydrated on demand through [`PullRequestIndex::load`], the
//! single place that decides between the session, the cache store, and a
//! remote fetch. Store failures are logged and treated as misses so a broken
//! cache degrades to "always ask GitHub" instead of refusing to run.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::error::PullmanError;
use crate::github::PullRequestGateway;
use crate::persistence::PullRequestStore;
use crate::telemetry::{TelemetryEvent, TelemetrySink};

use super::{PullRequest, PullRequestSummary};

/// Outcome of hydrating every open pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexPopulation {
    /// Successfully loaded pull requests, ordered by id ascending.
    pub pull_requests: Vec<PullRequest>,
    /// Ids whose metadata could not be fetched, ascending.
    pub failed: Vec<u64>,
}

impl IndexPopulation {
    /// Returns true when at least one pull request could not be loaded.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Converts a degraded population into [`PullmanError::Degraded`].
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError::Degraded`] naming the failed ids.
    pub fn into_complete(self) -> Result<Vec<PullRequest>, PullmanError> {
        if self.is_degraded() {
            return Err(PullmanError::Degraded {
                failed: self.failed,
            });
        }
        Ok(self.pull_requests)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadSource {
    Session,
    Cache,
    Remote,
}

/// Per-session index of open pull requests backed by a cache store.
///
/// Ordering: every sequence returned is sorted by pull request id ascending.
pub struct PullRequestIndex<'a, G: ?Sized, S: ?Sized> {
    gateway: &'a G,
    store: &'a S,
    telemetry: &'a dyn TelemetrySink,
    author: String,
    listing: Option<Vec<PullRequestSummary>>,
    loaded: BTreeMap<u64, PullRequest>,
    failed: BTreeSet<u64>,
    fetched_remotely: BTreeSet<u64>,
    population: Option<IndexPopulation>,
}

impl<'a, G, S> PullRequestIndex<'a, G, S>
where
    G: PullRequestGateway + ?Sized,
    S: PullRequestStore + ?Sized,
{
    /// Creates an empty index for pull requests authored by `author`.
    #[must_use]
    pub fn new(
        gateway: &'a G,
        store: &'a S,
        telemetry: &'a dyn TelemetrySink,
        author: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            telemetry,
            author: author.into(),
            listing: None,
            loaded: BTreeMap::new(),
            failed: BTreeSet::new(),
            fetched_remotely: BTreeSet::new(),
            population: None,
        }
    }

    /// Hydrates every open pull request.
    ///
    /// Per-PR fetch failures are collected in [`IndexPopulation::failed`]
    /// rather than aborting the population; previously cached entries are
    /// left untouched. The result is memoised for the rest of the session.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError`] when the listing itself cannot be fetched or
    /// GitHub rejects the token.
    pub async fn all(&mut self) -> Result<IndexPopulation, PullmanError> {
        if let Some(population) = &self.population {
            return Ok(population.clone());
        }

        let listing = self.listing().await?.to_vec();
        let mut population = IndexPopulation::default();
        let mut cached = 0_u64;
        let mut fetched = 0_u64;

        for summary in &listing {
            match self.load(summary.id, Some(summary)).await {
                Ok(Some((pull_request, source))) => {
                    if source == LoadSource::Remote {
                        fetched = fetched.saturating_add(1);
                    } else {
                        cached = cached.saturating_add(1);
                    }
                    population.pull_requests.push(pull_request);
                }
                Ok(None) => {}
                Err(error @ PullmanError::Authentication { .. }) => return Err(error),
                Err(error) => {
                    warn!(pull_request = summary.id, %error, "could not load pull request");
                    self.failed.insert(summary.id);
                    population.failed.push(summary.id);
                }
            }
        }

        self.telemetry.record(TelemetryEvent::IndexPopulated {
            cached,
            fetched,
            failed: u64::try_from(population.failed.len()).unwrap_or(u64::MAX),
        });
        self.population = Some(population.clone());
        Ok(population)
    }

    /// Looks up a pull request by number.
    ///
    /// A cached record is returned without consulting GitHub; otherwise the
    /// number must appear in the open listing to be fetched.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError`] when the listing or the metadata fetch fails.
    pub async fn by_id(&mut self, id: u64) -> Result<Option<PullRequest>, PullmanError> {
        Ok(self
            .load(id, None)
            .await?
            .map(|(pull_request, _source)| pull_request))
    }

    /// Finds the pull request whose commits include `hash`.
    ///
    /// Exact membership in `commit_hashes` wins; failing that, a hash of at
    /// least [`super::MIN_COMMIT_PREFIX_LEN`] characters matches as a prefix.
    /// Ties go to the lowest id.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError`] when the index cannot be populated.
    pub async fn by_commit(&mut self, hash: &str) -> Result<Option<PullRequest>, PullmanError> {
        let population = self.all().await?;
        let exact = population
            .pull_requests
            .iter()
            .find(|pull_request| pull_request.contains_commit(hash));
        let found = exact.or_else(|| {
            population
                .pull_requests
                .iter()
                .find(|pull_request| pull_request.matches_commit_prefix(hash))
        });
        Ok(found.cloned())
    }

    /// Listing entries whose titles contain `text`, case-insensitively.
    ///
    /// Nothing is hydrated, so a match that would fail to load is still
    /// counted.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError`] when the listing cannot be fetched.
    pub async fn title_matches(
        &mut self,
        text: &str,
    ) -> Result<Vec<PullRequestSummary>, PullmanError> {
        let needle = text.to_lowercase();
        Ok(self
            .listing()
            .await?
            .iter()
            .filter(|summary| summary.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    /// Hydrates one listing entry.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError::Authentication`] unchanged. Any other fetch
    /// failure records the id in [`Self::failed`] and becomes
    /// [`PullmanError::Degraded`].
    pub async fn hydrate(
        &mut self,
        summary: &PullRequestSummary,
    ) -> Result<Option<PullRequest>, PullmanError> {
        match self.load(summary.id, Some(summary)).await {
            Ok(loaded) => Ok(loaded.map(|(pull_request, _source)| pull_request)),
            Err(error @ PullmanError::Authentication { .. }) => Err(error),
            Err(error) => {
                warn!(pull_request = summary.id, %error, "could not load pull request");
                self.failed.insert(summary.id);
                Err(PullmanError::Degraded {
                    failed: vec![summary.id],
                })
            }
        }
    }

    /// Case-insensitive substring search over pull request titles.
    ///
    /// Only matching pull requests are hydrated. Matches that cannot be
    /// loaded are logged and omitted; [`Self::failed`] reports them.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError`] when the listing cannot be fetched or GitHub
    /// rejects the token.
    pub async fn search(&mut self, text: &str) -> Result<Vec<PullRequest>, PullmanError> {
        let matches = self.title_matches(text).await?;
        let mut found = Vec::with_capacity(matches.len());
        for summary in &matches {
            match self.hydrate(summary).await {
                Ok(Some(pull_request)) => found.push(pull_request),
                Ok(None) | Err(PullmanError::Degraded { .. }) => {}
                Err(error) => return Err(error),
            }
        }
        Ok(found)
    }

    /// Ids that could not be loaded during this session.
    #[must_use]
    pub fn failed(&self) -> Vec<u64> {
        self.failed.iter().copied().collect()
    }

    /// Returns `id` as GitHub reports it now.
    ///
    /// A record already fetched from GitHub in this session is reused;
    /// anything older is dropped from the cache and fetched again.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError`] when the listing or the metadata fetch fails.
    pub async fn by_id_fresh(&mut self, id: u64) -> Result<Option<PullRequest>, PullmanError> {
        if !self.fetched_remotely.contains(&id) {
            if let Err(error) = self.store.invalidate(id) {
                warn!(pull_request = id, %error, "could not drop cached pull request");
            }
            self.loaded.remove(&id);
            self.population = None;
        }
        self.by_id(id).await
    }

    /// Discards the session state and every cached record.
    ///
    /// The next lookup repopulates from GitHub.
    pub fn refresh(&mut self) {
        if let Err(error) = self.store.invalidate_all() {
            warn!(%error, "could not clear the pull request cache");
        }
        self.listing = None;
        self.loaded.clear();
        self.failed.clear();
        self.fetched_remotely.clear();
        self.population = None;
    }

    async fn listing(&mut self) -> Result<&[PullRequestSummary], PullmanError> {
        if self.listing.is_none() {
            let mut summaries = self.gateway.list_open_pull_requests(&self.author).await?;
            summaries.sort_by_key(|summary| summary.id);
            summaries.dedup_by_key(|summary| summary.id);
            debug!(count = summaries.len(), author = %self.author, "listed open pull requests");
            self.listing = Some(summaries);
        }
        Ok(self.listing.as_deref().unwrap_or_default())
    }

    /// Single chokepoint for hydrating one pull request.
    ///
    /// Order: session, cache store, then GitHub. A fetched record is written
    /// back to the store; write failures are logged and otherwise ignored.
    async fn load(
        &mut self,
        id: u64,
        summary: Option<&PullRequestSummary>,
    ) -> Result<Option<(PullRequest, LoadSource)>, PullmanError> {
        if let Some(pull_request) = self.loaded.get(&id) {
            return Ok(Some((pull_request.clone(), LoadSource::Session)));
        }

        match self.store.get(id) {
            Ok(Some(entry)) => {
                debug!(pull_request = id, "cache hit");
                self.loaded.insert(id, entry.pull_request.clone());
                return Ok(Some((entry.pull_request, LoadSource::Cache)));
            }
            Ok(None) => debug!(pull_request = id, "cache miss"),
            Err(error) => warn!(pull_request = id, %error, "cache read failed; treating as miss"),
        }

        let listed = match summary {
            Some(listed) => listed.clone(),
            None => {
                let Some(listed) = self
                    .listing()
                    .await?
                    .iter()
                    .find(|candidate| candidate.id == id)
                    .cloned()
                else {
                    return Ok(None);
                };
                listed
            }
        };

        let metadata = self.gateway.get_stack_metadata(id).await?;
        let pull_request = metadata.into_pull_request(&listed);
        if let Err(error) = self.store.put(&pull_request) {
            warn!(pull_request = id, %error, "cache write failed");
        }
        self.loaded.insert(id, pull_request.clone());
        self.fetched_remotely.insert(id);
        Ok(Some((pull_request, LoadSource::Remote)))
    }
}

#[cfg(test)]
mod tests;
