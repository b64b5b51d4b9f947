//! Recursive batch import.
//!
//! One call walks the requested ids in fixed-size batches. For each batch
//! the ids that need work are fetched, badge items they link to are
//! imported first, and every unmapped entity gets a local copy without
//! statements. Once all batches are done, the stashed remote entities are
//! reconciled: with statement import on, their dependencies are imported
//! (statements off), their statements localized and attached together with
//! the back-reference statement; with it off, only the back-reference
//! statement is attached.
//!
//! An in-flight set per top-level call keeps reference and badge cycles
//! from recursing forever. Badge items fetched in the same batch as the
//! items linking to them are created first within that batch.

use crate::badges::badge_ids;
use crate::bootstrap::{self, BootstrapOutcome};
use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::ports::{
    BadgeUpdater, EditContext, EntityFetcher, EntityStore, FetchedEntities, MappedBadgeUpdater,
    MappingOutcome, MappingStore, StatementCountLookup, StatementsImporter,
};
use crate::references::{ReferenceExtractor, ReferenceSet};
use crate::report::{CancellationToken, CreatedEntity, ImportReport};
use crate::rewrite::Rewriter;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use wbimport_model::{DataValue, Entity, EntityId, Snak, Statement, StatementList};

/// Collaborators the importer drives.
pub struct ImportServices {
    pub fetcher: Arc<dyn EntityFetcher>,
    pub mappings: Arc<dyn MappingStore>,
    pub entities: Arc<dyn EntityStore>,
    pub statements: Arc<dyn StatementsImporter>,
    pub statement_counts: Arc<dyn StatementCountLookup>,
    /// Defaults to [`MappedBadgeUpdater`] over `mappings`.
    pub badges: Option<Arc<dyn BadgeUpdater>>,
}

impl ImportServices {
    /// Wire a single local store that persists entities, attaches
    /// statements and counts them.
    pub fn with_local_store<S>(
        fetcher: Arc<dyn EntityFetcher>,
        mappings: Arc<dyn MappingStore>,
        store: Arc<S>,
    ) -> Self
    where
        S: EntityStore + StatementsImporter + StatementCountLookup + 'static,
    {
        Self {
            fetcher,
            mappings,
            entities: store.clone(),
            statements: store.clone(),
            statement_counts: store,
            badges: None,
        }
    }

    pub fn with_badge_updater(mut self, badges: Arc<dyn BadgeUpdater>) -> Self {
        self.badges = Some(badges);
        self
    }
}

#[derive(Default)]
struct ImportRun {
    in_flight: HashSet<EntityId>,
    report: ImportReport,
}

pub struct EntityImporter {
    fetcher: Arc<dyn EntityFetcher>,
    mappings: Arc<dyn MappingStore>,
    entities: Arc<dyn EntityStore>,
    statements: Arc<dyn StatementsImporter>,
    statement_counts: Arc<dyn StatementCountLookup>,
    badges: Arc<dyn BadgeUpdater>,
    config: ImportConfig,
    back_reference: EntityId,
    cancel: CancellationToken,
}

impl EntityImporter {
    /// Sets up the back-reference property, then returns a ready importer.
    ///
    /// Fails only if the property can neither be created nor found under
    /// its sentinel mapping.
    pub fn new(services: ImportServices, config: ImportConfig) -> Result<Self, ImportError> {
        let sentinel = config.back_reference.sentinel;
        let ctx = config.edit_context(false);
        let outcome = bootstrap::create_or_get_existing(
            &config.back_reference,
            services.entities.as_ref(),
            services.mappings.as_ref(),
            &ctx,
        );

        let back_reference = match outcome {
            BootstrapOutcome::Created(id) | BootstrapOutcome::AlreadyExists(id) => id,
            BootstrapOutcome::Failed(err) => {
                warn!(error = %err, "back-reference bootstrap failed, looking up sentinel mapping");
                match services.mappings.local_id(&sentinel) {
                    Ok(Some(id)) => id,
                    Ok(None) => return Err(ImportError::Bootstrap { sentinel, source: err }),
                    Err(lookup) => {
                        return Err(ImportError::Bootstrap {
                            sentinel,
                            source: lookup,
                        })
                    }
                }
            }
        };

        let badges = services
            .badges
            .unwrap_or_else(|| {
                Arc::new(MappedBadgeUpdater::new(services.mappings.clone())) as Arc<dyn BadgeUpdater>
            });

        Ok(Self {
            fetcher: services.fetcher,
            mappings: services.mappings,
            entities: services.entities,
            statements: services.statements,
            statement_counts: services.statement_counts,
            badges,
            config,
            back_reference,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Local id of the back-reference property.
    pub fn back_reference_property(&self) -> EntityId {
        self.back_reference
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn import_entities(&self, ids: &[String], import_statements: bool) -> ImportReport {
        info!(count = ids.len(), import_statements, "importing entities");
        let mut run = ImportRun::default();
        self.import_with(&mut run, ids, import_statements);
        info!(
            created = run.report.created.len(),
            already_mapped = run.report.already_mapped,
            failed = run.report.failed.len(),
            "import finished"
        );
        run.report
    }

    fn import_with(&self, run: &mut ImportRun, ids: &[String], import_statements: bool) {
        let mut stashed: Vec<(EntityId, Entity)> = Vec::new();

        for batch in ids.chunks(self.config.batch_size.max(1)) {
            if self.check_cancelled(run) {
                return;
            }
            let working = self.working_set(run, batch, import_statements);
            if working.is_empty() {
                continue;
            }

            run.in_flight.extend(working.iter().copied());
            let requested: Vec<String> = working.iter().map(EntityId::to_string).collect();
            run.report.batches += 1;

            match self.fetcher.fetch_entities(&requested) {
                Ok(fetched) if fetched.is_empty() => {
                    error!(batch = ?requested, "no entities returned for batch");
                    run.report.fetch_failures += 1;
                }
                Ok(fetched) => {
                    let fetched = self.import_badges(run, fetched);
                    stashed.extend(self.import_batch(run, fetched));
                }
                Err(err) => {
                    error!(batch = ?requested, error = %err, "failed to retrieve entities for batch");
                    run.report.fetch_failures += 1;
                }
            }

            for id in &working {
                run.in_flight.remove(id);
            }
        }

        for (remote, entity) in stashed {
            if self.check_cancelled(run) {
                return;
            }
            if import_statements {
                self.reconcile_statements(run, remote, entity);
            } else {
                self.stamp_back_reference(run, remote);
            }
        }
    }

    fn check_cancelled(&self, run: &mut ImportRun) -> bool {
        if self.cancel.is_cancelled() {
            if !run.report.cancelled {
                warn!("import cancelled");
            }
            run.report.cancelled = true;
        }
        run.report.cancelled
    }

    /// Ids of `batch` that need fetching. Already-mapped ids are only kept
    /// when statements are imported, so their statements can be reconciled.
    fn working_set(
        &self,
        run: &mut ImportRun,
        batch: &[String],
        import_statements: bool,
    ) -> Vec<EntityId> {
        let mut seen = HashSet::new();
        let mut working = Vec::with_capacity(batch.len());

        for raw in batch {
            let id = match EntityId::parse(raw.trim()) {
                Ok(id) => id,
                Err(err) => {
                    warn!(id = %raw, error = %err, "skipping malformed id");
                    run.report.invalid_ids.push(raw.clone());
                    continue;
                }
            };
            if !seen.insert(id) {
                continue;
            }
            if run.in_flight.contains(&id) {
                debug!(remote_id = %id, "already being imported");
                run.report.cycle_skips += 1;
                continue;
            }
            if !import_statements {
                match self.mappings.local_id(&id) {
                    Ok(Some(local)) => {
                        debug!(remote_id = %id, local_id = %local, "already imported");
                        run.report.already_mapped += 1;
                        continue;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        error!(remote_id = %id, error = %err, "mapping lookup failed");
                        run.report.failed.push(id.to_string());
                        continue;
                    }
                }
            }
            working.push(id);
        }
        working
    }

    /// Makes sure badge items exist before the items linking to them.
    /// Badges fetched in this same batch are moved to its front; the others
    /// go through a nested import.
    fn import_badges(&self, run: &mut ImportRun, fetched: FetchedEntities) -> FetchedEntities {
        let badges = badge_ids(&fetched);
        if badges.is_empty() {
            return fetched;
        }

        let (in_batch, elsewhere): (Vec<String>, Vec<String>) = badges
            .into_iter()
            .partition(|badge| fetched.iter().any(|(requested, _)| requested == badge));
        if !elsewhere.is_empty() {
            debug!(count = elsewhere.len(), "importing badge items");
            self.import_with(run, &elsewhere, false);
        }
        if in_batch.is_empty() {
            return fetched;
        }

        debug!(count = in_batch.len(), "creating badge items of this batch first");
        let (mut ordered, rest): (FetchedEntities, FetchedEntities) = fetched
            .into_iter()
            .partition(|(requested, _)| in_batch.contains(requested));
        ordered.extend(rest);
        ordered
    }

    /// Creates local copies of unmapped entities. Returns every fetched
    /// entity, untouched, for the reconciliation pass.
    fn import_batch(&self, run: &mut ImportRun, fetched: FetchedEntities) -> Vec<(EntityId, Entity)> {
        let ctx = self.config.edit_context(true);
        let mut stashed = Vec::with_capacity(fetched.len());

        for (requested, entity) in fetched {
            let remote = match EntityId::parse(&requested) {
                Ok(id) => id,
                Err(err) => {
                    warn!(id = %requested, error = %err, "fetcher returned a malformed id");
                    run.report.invalid_ids.push(requested);
                    continue;
                }
            };
            stashed.push((remote, entity.clone()));

            match self.mappings.local_id(&remote) {
                Ok(Some(local)) => {
                    info!(remote_id = %remote, local_id = %local, "already imported");
                    run.report.already_mapped += 1;
                }
                Ok(None) => self.create_local_copy(run, remote, entity, &ctx),
                Err(err) => {
                    error!(remote_id = %remote, error = %err, "mapping lookup failed");
                    run.report.failed.push(remote.to_string());
                }
            }
        }
        stashed
    }

    fn create_local_copy(
        &self,
        run: &mut ImportRun,
        remote: EntityId,
        mut entity: Entity,
        ctx: &EditContext,
    ) {
        info!(remote_id = %remote, "creating");
        entity.set_id(None);
        entity.set_statements(StatementList::new());
        if let Some(item) = entity.as_item_mut() {
            let links = std::mem::take(&mut item.site_links);
            item.site_links = self.badges.replace_badges(links);
        }

        let local = match self.entities.create_entity(entity, ctx) {
            Ok(local) => local,
            Err(err) => {
                error!(remote_id = %remote, error = %err, "failed to create local entity");
                run.report.failed.push(remote.to_string());
                return;
            }
        };

        match self.mappings.add_mapping(&remote, &local) {
            Ok(MappingOutcome::Inserted) => {
                run.report.created.push(CreatedEntity { remote, local });
            }
            Ok(MappingOutcome::AlreadyMapped(existing)) => {
                warn!(
                    remote_id = %remote,
                    local_id = %local,
                    existing = %existing,
                    "mapped by another importer in the meantime, new local entity is orphaned"
                );
                run.report.already_mapped += 1;
            }
            Err(err) => {
                error!(remote_id = %remote, local_id = %local, error = %err, "failed to record mapping");
                run.report.failed.push(remote.to_string());
            }
        }
    }

    fn mapped_local_id(&self, run: &mut ImportRun, remote: &EntityId) -> Option<EntityId> {
        match self.mappings.local_id(remote) {
            Ok(Some(local)) => Some(local),
            Ok(None) => {
                warn!(remote_id = %remote, "no local copy, statements not reconciled");
                run.report.unreconciled += 1;
                None
            }
            Err(err) => {
                error!(remote_id = %remote, error = %err, "mapping lookup failed");
                run.report.failed.push(remote.to_string());
                None
            }
        }
    }

    fn reconcile_statements(&self, run: &mut ImportRun, remote: EntityId, entity: Entity) {
        let Some(local) = self.mapped_local_id(run, &remote) else {
            return;
        };

        let count = match self.statement_counts.statement_count(&local) {
            Ok(count) => count,
            Err(err) => {
                error!(remote_id = %remote, local_id = %local, error = %err, "statement count lookup failed");
                run.report.failed.push(remote.to_string());
                return;
            }
        };
        if count >= self.config.statement_threshold {
            info!(remote_id = %remote, local_id = %local, count, "statements already imported");
            run.report.skipped_with_statements += 1;
            return;
        }

        let references = ReferenceExtractor::new(
            self.fetcher.as_ref(),
            &self.config.source_concept_base_uri,
        )
        .referenced_entities(&entity);
        if !references.is_empty() {
            debug!(remote_id = %remote, count = references.len(), "importing referenced entities");
            self.import_with(run, &references.serializations(), false);
            self.map_redirect_sources(run, &references);
        }

        let rewritten = Rewriter::new(
            self.mappings.as_ref(),
            &self.config.source_concept_base_uri,
            &self.config.concept_base_uri,
        )
        .rewrite_entity_values(self.config.rewrite_entity_values)
        .rewrite_statements(entity.statements());
        run.report.unresolved_values += rewritten.unresolved.len();

        let mut statements = rewritten.statements;
        statements.push(self.back_reference_statement(&remote));
        if self.attach(run, &remote, &local, statements) {
            run.report.reconciled += 1;
        }
    }

    /// Points each redirect source at the local copy of its target, so
    /// values still naming the old id can be localized.
    fn map_redirect_sources(&self, run: &mut ImportRun, references: &ReferenceSet) {
        for (source, target) in references.redirects() {
            let local = match self.mappings.local_id(target) {
                Ok(Some(local)) => local,
                Ok(None) => {
                    warn!(source = %source, target = %target, "redirect target has no local copy");
                    continue;
                }
                Err(err) => {
                    error!(source = %source, target = %target, error = %err, "mapping lookup failed");
                    continue;
                }
            };
            match self.mappings.add_mapping(source, &local) {
                Ok(MappingOutcome::Inserted) => {
                    debug!(source = %source, target = %target, local_id = %local, "redirect source mapped");
                    run.report.redirects_mapped += 1;
                }
                Ok(MappingOutcome::AlreadyMapped(_)) => {}
                Err(err) => {
                    error!(source = %source, local_id = %local, error = %err, "failed to record redirect mapping");
                }
            }
        }
    }

    fn stamp_back_reference(&self, run: &mut ImportRun, remote: EntityId) {
        let Some(local) = self.mapped_local_id(run, &remote) else {
            return;
        };
        let statements = StatementList::from(vec![self.back_reference_statement(&remote)]);
        self.attach(run, &remote, &local, statements);
    }

    fn back_reference_statement(&self, remote: &EntityId) -> Statement {
        Statement::new(Snak::Value {
            property: self.back_reference,
            value: DataValue::String(remote.to_string()),
            datatype: Some(self.config.back_reference.datatype.clone()),
        })
    }

    fn attach(
        &self,
        run: &mut ImportRun,
        remote: &EntityId,
        local: &EntityId,
        statements: StatementList,
    ) -> bool {
        let ctx = self.config.edit_context(true);
        match self.statements.import_statements(local, statements, &ctx) {
            Ok(attached) => {
                debug!(remote_id = %remote, local_id = %local, attached, "statements attached");
                run.report.statements_attached += attached;
                true
            }
            Err(err) => {
                error!(remote_id = %remote, local_id = %local, error = %err, "failed to attach statements");
                run.report.failed.push(remote.to_string());
                false
            }
        }
    }
}
