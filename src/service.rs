//! Project Service
//!
//! The request-facing API: create, get, update, delete, list and the search
//! index lifecycle. Each call is a stateless unit of work scoped by its
//! `RequestContext`.
//!
//! ## Request Routing
//! - Mutations → `DualWriteCoordinator` (one write-set per call)
//! - Point reads → `RecordStoreAdapter` (primary store, read-your-write)
//! - Lists → query translation → `SearchShadowAdapter` (eventually consistent)

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapter::{bounded, RecordStoreAdapter, SearchShadowAdapter};
use crate::backend::KeyValueBackend;
use crate::config::Config;
use crate::coordinator::DualWriteCoordinator;
use crate::error::{Error, Result};
use crate::keys::Scope;
use crate::model::{
    Clock, IdGenerator, Identity, Project, ProjectInput, ProjectPatch, SystemClock,
    UuidIdGenerator, ENTITY_NAME,
};
use crate::query::{decode_cursor, translate_filter, translate_sort, ListWhere};
use crate::search::SearchEngine;

/// Per-request inputs supplied by the calling layer
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Partition scope; required by every operation
    pub tenant: Option<String>,
    /// Recorded as `createdBy` / `savedBy`
    pub identity: Option<Identity>,
    /// Bound on each store call; `Config::store_timeout` when absent
    pub timeout: Option<Duration>,
}

impl RequestContext {
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: Some(tenant.into()),
            ..Self::default()
        }
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Arguments of a list request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListArgs {
    #[serde(default, rename = "where")]
    pub where_: Option<ListWhere>,
    /// `field_ASC` / `field_DESC` tokens
    #[serde(default)]
    pub sort: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Cursor from a previous page
    #[serde(default)]
    pub after: Option<String>,
}

impl ListArgs {
    pub fn filter(mut self, filter: ListWhere) -> Self {
        self.where_ = Some(filter);
        self
    }

    pub fn sort<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }
}

/// One page of a list response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub items: Vec<Project>,
    /// Pass as `after` to fetch the next page; present only with `has_more`
    pub cursor: Option<String>,
    pub has_more: bool,
    pub total_count: u64,
}

/// Project CRUD over a primary store and its search shadow
#[derive(Clone)]
pub struct ProjectService {
    config: Arc<Config>,
    records: RecordStoreAdapter,
    shadow: SearchShadowAdapter,
    coordinator: DualWriteCoordinator,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl ProjectService {
    /// Build a service over the given stores
    ///
    /// Fails with `VALIDATION_ERROR` on an unusable configuration.
    pub fn new(
        config: Config,
        backend: Arc<dyn KeyValueBackend>,
        engine: Arc<dyn SearchEngine>,
    ) -> Result<Self> {
        config.validate()?;

        let records =
            RecordStoreAdapter::new(backend.clone(), &config.primary_table, &config.app_version);
        let shadow = SearchShadowAdapter::new(
            backend.clone(),
            engine,
            &config.shadow_table,
            &config.app_version,
        );
        let coordinator = DualWriteCoordinator::new(
            backend,
            records.clone(),
            shadow.clone(),
            &config.entity_type,
        );

        Ok(Self {
            config: Arc::new(config),
            records,
            shadow,
            coordinator,
            clock: Arc::new(SystemClock::new()),
            ids: Arc::new(UuidIdGenerator),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a project with a fresh id
    pub async fn create(&self, ctx: &RequestContext, input: ProjectInput) -> Result<Project> {
        let scope = Scope::resolve(ctx.tenant.as_deref())?;
        let project =
            Project::create(self.ids.generate(), input, ctx.identity.clone(), self.clock.now());

        self.coordinator
            .apply_create(&scope, &project, self.limit(ctx))
            .await?;
        Ok(project)
    }

    /// Merge `patch` into an existing project
    ///
    /// An empty patch writes nothing and returns the stored project.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        patch: ProjectPatch,
    ) -> Result<Project> {
        let scope = Scope::resolve(ctx.tenant.as_deref())?;
        if patch.is_empty() {
            tracing::debug!(%scope, id, "empty patch, nothing to write");
            return self.get(ctx, id).await;
        }

        let identity = ctx.identity.clone();
        let now = self.clock.now();
        self.coordinator
            .apply_update(
                &scope,
                id,
                |existing| existing.merged(patch, identity, now),
                self.limit(ctx),
            )
            .await
    }

    /// Delete a project; `NOT_FOUND` if it does not exist
    pub async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<bool> {
        let scope = Scope::resolve(ctx.tenant.as_deref())?;
        self.coordinator.apply_delete(&scope, id, self.limit(ctx)).await?;
        Ok(true)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Point read from the primary store
    pub async fn get(&self, ctx: &RequestContext, id: &str) -> Result<Project> {
        let scope = Scope::resolve(ctx.tenant.as_deref())?;
        let key = scope.primary_key(&self.config.entity_type, id);

        bounded("get", self.limit(ctx), self.records.get(&key))
            .await?
            .ok_or_else(|| Error::not_found(ENTITY_NAME, id))
    }

    /// Filtered, sorted, paginated read from the search store
    pub async fn list(&self, ctx: &RequestContext, args: ListArgs) -> Result<ListPage> {
        let scope = Scope::resolve(ctx.tenant.as_deref())?;
        let limit = self.page_size(args.limit)?;
        let sort = translate_sort(args.sort.as_deref())?;
        let after = decode_cursor(args.after.as_deref())?;
        if let Some(marker) = &after {
            if marker.len() != sort.len() {
                return Err(Error::validation(
                    "cursor does not belong to a list with this sort",
                ));
            }
        }
        let query = translate_filter(args.where_.as_ref());

        let index = scope.routing_index(&self.config.entity_type);
        let page = bounded(
            "list",
            self.limit(ctx),
            self.shadow.query(&index, query, sort, after, limit),
        )
        .await?;

        Ok(ListPage {
            items: page.items,
            cursor: page.next_cursor,
            has_more: page.has_more,
            total_count: page.total,
        })
    }

    // =========================================================================
    // Index Lifecycle
    // =========================================================================

    /// Create the scope's search index; `false` if it already existed
    pub async fn ensure_index(&self, ctx: &RequestContext) -> Result<bool> {
        let scope = Scope::resolve(ctx.tenant.as_deref())?;
        let index = scope.routing_index(&self.config.entity_type);
        let limit = self.limit(ctx);

        if bounded("index_exists", limit, self.shadow.index_exists(&index)).await? {
            return Ok(false);
        }
        // Another caller may create it between the check and here
        bounded("create_index", limit, self.shadow.create_index(&index)).await
    }

    /// Drop the scope's search index; `false` if there was none
    pub async fn drop_index(&self, ctx: &RequestContext) -> Result<bool> {
        let scope = Scope::resolve(ctx.tenant.as_deref())?;
        let index = scope.routing_index(&self.config.entity_type);

        match bounded("drop_index", self.limit(ctx), self.shadow.drop_index(&index)).await {
            Ok(()) => Ok(true),
            Err(Error::IndexNotReady { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether the scope's search index exists
    pub async fn is_installed(&self, ctx: &RequestContext) -> Result<bool> {
        let scope = Scope::resolve(ctx.tenant.as_deref())?;
        let index = scope.routing_index(&self.config.entity_type);
        bounded("index_exists", self.limit(ctx), self.shadow.index_exists(&index)).await
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    fn limit(&self, ctx: &RequestContext) -> Duration {
        ctx.timeout.unwrap_or_else(|| self.config.store_timeout())
    }

    /// Default when absent, clamped to the configured maximum
    fn page_size(&self, requested: Option<usize>) -> Result<usize> {
        match requested {
            None => Ok(self.config.default_list_limit),
            Some(0) => Err(Error::validation("limit must be at least 1")),
            Some(n) => Ok(n.min(self.config.max_list_limit)),
        }
    }
}
