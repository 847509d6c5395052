//! Resolution of loose user tokens to exactly one pull request.
//!
//! A token is first classified into an ordered plan of [`Strategy`] values
//! (see [`classify`]). Strategies are tried in order and the first one that
//! yields a pull request wins. Title search is the only strategy that can
//! produce several candidates; it fails with [`PullmanError::Ambiguous`]
//! instead of picking one.

mod classify;

pub use classify::{FORCE_SEARCH_PREFIX, Strategy, classify, is_commit_shaped};

use tracing::{debug, warn};

use crate::error::{MatchSummary, PullmanError};
use crate::github::PullRequestGateway;
use crate::local::{CommitSha, EmbeddedReference, LocalRepository};
use crate::persistence::PullRequestStore;
use crate::pulls::{PullRequest, PullRequestIndex};

/// Resolves tokens against an index and the local checkout.
pub struct Resolver<'i, 'a, G: ?Sized, S: ?Sized, L: ?Sized> {
    index: &'i mut PullRequestIndex<'a, G, S>,
    local: &'i L,
}

impl<'i, 'a, G, S, L> Resolver<'i, 'a, G, S, L>
where
    G: PullRequestGateway + ?Sized,
    S: PullRequestStore + ?Sized,
    L: LocalRepository + ?Sized,
{
    /// Creates a resolver over `index`, reading context from `local`.
    #[must_use]
    pub const fn new(index: &'i mut PullRequestIndex<'a, G, S>, local: &'i L) -> Self {
        Self { index, local }
    }

    /// Resolves `token` to a single open pull request.
    ///
    /// An empty token resolves from the stacking metadata of the commit at
    /// `HEAD`.
    ///
    /// # Errors
    ///
    /// - [`PullmanError::Ambiguous`] when a title search matches several
    ///   pull requests.
    /// - [`PullmanError::Degraded`] when nothing matched but some pull
    ///   requests could not be loaded.
    /// - [`PullmanError::NotFound`] when every strategy came up empty.
    /// - Remote and local repository errors from the collaborators.
    pub async fn resolve(&mut self, token: &str) -> Result<PullRequest, PullmanError> {
        let plan = classify(token);
        for strategy in &plan {
            debug!(%strategy, "trying resolution strategy");
            if let Some(found) = self.attempt(token, strategy).await? {
                return Ok(found);
            }
        }

        let failed = self.index.failed();
        if !failed.is_empty() {
            return Err(PullmanError::Degraded { failed });
        }
        Err(PullmanError::NotFound {
            token: token.trim().to_owned(),
            strategies: plan.iter().map(ToString::to_string).collect(),
        })
    }

    async fn attempt(
        &mut self,
        token: &str,
        strategy: &Strategy,
    ) -> Result<Option<PullRequest>, PullmanError> {
        match strategy {
            Strategy::ByContext => {
                let head = self.local.current_head_commit()?;
                self.from_commit(&head).await
            }
            Strategy::ById(id) => self.index.by_id(*id).await,
            Strategy::ByCommit(revision) => self.from_revision(revision).await,
            Strategy::BySearch(text) => self.from_search(token, text).await,
        }
    }

    async fn from_revision(&mut self, revision: &str) -> Result<Option<PullRequest>, PullmanError> {
        match self.local.resolve_revision(revision) {
            Ok(Some(commit)) => self.from_commit(&commit).await,
            Ok(None) if is_commit_shaped(revision) => self.index.by_commit(revision).await,
            Ok(None) => Ok(None),
            Err(error) => {
                warn!(%revision, %error, "could not resolve revision");
                Ok(None)
            }
        }
    }

    /// Looks `commit` up through the reference in its message, falling back
    /// to its hash.
    ///
    /// A pull request number in the message only needs that one record, so
    /// it is tried before anything that hydrates the whole index.
    async fn from_commit(
        &mut self,
        commit: &CommitSha,
    ) -> Result<Option<PullRequest>, PullmanError> {
        let reference = match self.local.extract_embedded_pr_reference(commit) {
            Ok(reference) => reference,
            Err(error) => {
                warn!(%commit, %error, "could not read commit message");
                None
            }
        };
        if let Some(EmbeddedReference::PullRequest(id)) = reference
            && let Some(found) = self.index.by_id(id).await?
        {
            return Ok(Some(found));
        }
        if let Some(found) = self.index.by_commit(commit.as_str()).await? {
            return Ok(Some(found));
        }
        match reference {
            Some(EmbeddedReference::Commit(embedded)) if embedded != *commit => {
                self.index.by_commit(embedded.as_str()).await
            }
            _ => Ok(None),
        }
    }

    /// Title matches are counted on the listing, so a match that fails to
    /// load still makes the search ambiguous.
    async fn from_search(
        &mut self,
        token: &str,
        text: &str,
    ) -> Result<Option<PullRequest>, PullmanError> {
        let mut matches = self.index.title_matches(text).await?;
        if matches.len() > 1 {
            return Err(PullmanError::Ambiguous {
                token: token.trim().to_owned(),
                matches: matches
                    .into_iter()
                    .map(|summary| MatchSummary {
                        id: summary.id,
                        title: summary.title,
                    })
                    .collect(),
            });
        }
        match matches.pop() {
            Some(summary) => self.index.hydrate(&summary).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests;
