//! Folder resolution: logical name + parent id -> verified Drive folder id
//!
//! Resolution order is strict: cache (with an existence probe on every hit),
//! then backend search, then creation. A cached id that fails its probe is
//! invalidated and the resolution falls through; callers never see the stale
//! id or an error caused by it.
//!
//! Two concurrent first resolutions of the same key can both miss and both
//! create, leaving duplicate same-named folders; Drive has no
//! compare-and-create, so this race is accepted and the duplicate rule makes
//! later reads converge on a single id.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::FolderCache;
use crate::drive::{DriveApi, FileMetadata};
use crate::error::{ResolveError, StorageError};

/// Retry budget for `resolve_with_recovery`: one plain attempt, one forced
const MAX_ATTEMPTS: usize = 2;

/// Which folder wins when the backend holds duplicates of the same name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateRule {
    /// Take the first folder the backend lists (the source behavior)
    #[default]
    FirstListed,
    /// Take the oldest folder by creation time; entries without a creation
    /// time sort last
    OldestCreated,
}

impl DuplicateRule {
    fn pick<'a>(&self, matches: &'a [FileMetadata]) -> &'a FileMetadata {
        match self {
            DuplicateRule::FirstListed => &matches[0],
            DuplicateRule::OldestCreated => matches
                .iter()
                .min_by_key(|m| m.created_time.unwrap_or(DateTime::<Utc>::MAX_UTC))
                .expect("pick called with matches"),
        }
    }
}

/// Outcome of one resolution call. Only the id is cached; this struct is
/// rebuilt on every call.
#[derive(Debug, Clone)]
pub struct ResolvedFolder {
    pub folder_id: String,
    pub parent_id: String,
    pub name: String,
    /// True when existence was confirmed by a read (probe or search);
    /// false for a folder this call just created.
    pub verified: bool,
}

/// Resolves logical folder names against the backend through the shared
/// cache.
pub struct FolderResolver<C: DriveApi> {
    drive: Arc<C>,
    cache: Arc<FolderCache>,
    duplicate_rule: DuplicateRule,
}

impl<C: DriveApi> FolderResolver<C> {
    pub fn new(drive: Arc<C>, cache: Arc<FolderCache>) -> Self {
        Self {
            drive,
            cache,
            duplicate_rule: DuplicateRule::default(),
        }
    }

    pub fn with_duplicate_rule(mut self, rule: DuplicateRule) -> Self {
        self.duplicate_rule = rule;
        self
    }

    /// Resolve `name` under `parent_id` to a live folder id.
    ///
    /// With `force_refresh` the cached entry is bypassed entirely; the entry
    /// is snapshotted and restored if the refreshed resolution fails, so a
    /// failed refresh cannot lose a possibly-good hint.
    pub async fn resolve(
        &self,
        name: &str,
        parent_id: &str,
        force_refresh: bool,
    ) -> Result<ResolvedFolder, ResolveError> {
        let snapshot = if force_refresh {
            let removed = self.cache.invalidate(parent_id, name);
            if removed.is_some() {
                log::debug!(
                    "Force refresh for '{}' under {}: cleared cache entry",
                    name,
                    parent_id
                );
            }
            removed
        } else {
            None
        };

        let result = self.resolve_inner(name, parent_id).await;

        if result.is_err()
            && let Some(previous) = snapshot
            && self.cache.get(parent_id, name).is_none()
        {
            self.cache.put(parent_id, name, &previous);
        }

        result
    }

    /// Resolve with the uniform bounded-retry policy: a failed attempt is
    /// retried exactly once with `force_refresh`. `AmbiguousState` is never
    /// retried; it signals a malformed backend, not a transient fault.
    pub async fn resolve_with_recovery(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<ResolvedFolder, ResolveError> {
        let mut last_err = None;

        for attempt in 0..MAX_ATTEMPTS {
            let force = attempt > 0;
            match self.resolve(name, parent_id, force).await {
                Ok(folder) => return Ok(folder),
                Err(err @ ResolveError::AmbiguousState { .. }) => return Err(err),
                Err(err) => {
                    log::warn!(
                        "Resolution attempt {} for '{}' under {} failed: {}",
                        attempt + 1,
                        name,
                        parent_id,
                        err
                    );
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.expect("at least one attempt ran"))
    }

    async fn resolve_inner(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<ResolvedFolder, ResolveError> {
        // Cache hit: probe the id before trusting it
        if let Some(cached) = self.cache.get(parent_id, name) {
            match self.drive.get_metadata(&cached).await {
                Ok(_) => {
                    log::debug!("Verified cached folder '{}' with id {}", name, cached);
                    return Ok(ResolvedFolder {
                        folder_id: cached,
                        parent_id: parent_id.to_string(),
                        name: name.to_string(),
                        verified: true,
                    });
                }
                Err(err) if is_stale_signal(&err) => {
                    log::warn!(
                        "Cached folder '{}' with id {} failed verification ({}); invalidating",
                        name,
                        cached,
                        err
                    );
                    self.cache.invalidate(parent_id, name);
                    // fall through to search; the stale id is never retried
                }
                Err(err) => return Err(ResolveError::from_storage(err, name, parent_id)),
            }
        }

        // Backend search for an existing folder; the query already filters
        // by type and trash state, but the response is not trusted blindly
        let matches: Vec<_> = self
            .drive
            .list_children(parent_id, name)
            .await
            .map_err(|err| ResolveError::from_storage(err, name, parent_id))?
            .into_iter()
            .filter(|m| m.is_folder() && !m.trashed)
            .collect();

        if !matches.is_empty() {
            if matches.len() > 1 {
                log::warn!(
                    "{} folders named '{}' under {}; applying {:?}",
                    matches.len(),
                    name,
                    parent_id,
                    self.duplicate_rule
                );
            }
            let chosen = self.duplicate_rule.pick(&matches);
            self.cache.put(parent_id, name, &chosen.id);
            return Ok(ResolvedFolder {
                folder_id: chosen.id.clone(),
                parent_id: parent_id.to_string(),
                name: name.to_string(),
                verified: true,
            });
        }

        // Nothing there: create it
        let created = self
            .drive
            .create_folder(name, parent_id)
            .await
            .map_err(|err| ResolveError::from_storage(err, name, parent_id))?;

        self.cache.put(parent_id, name, &created);
        Ok(ResolvedFolder {
            folder_id: created,
            parent_id: parent_id.to_string(),
            name: name.to_string(),
            verified: false,
        })
    }
}

/// Probe failures that mean the cached id is stale rather than the backend
/// being down. Transport-level failures propagate instead; invalidating on
/// those would discard a possibly-good hint.
fn is_stale_signal(err: &StorageError) -> bool {
    matches!(
        err,
        StorageError::NotFound(_)
            | StorageError::Forbidden(_)
            | StorageError::BadRequest(_)
            | StorageError::InvalidResponse(_)
    )
}
