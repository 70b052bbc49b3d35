//! Engine session
//!
//! A [`Session`] ties a compiled catalog to a configuration and a random
//! source, runs the initial pass over a document and then keeps the document
//! up to date as mutation batches arrive.
//!
//! # Example
//!
//! ```ignore
//! use context_lingo::{Catalog, Session, SessionConfig};
//! use context_lingo::dom::Document;
//!
//! let catalog = Catalog::from_pairs(vec![("hello".into(), vec!["bonjour".into()])]);
//! let mut session = Session::with_seed(&catalog, SessionConfig::default(), 7)?;
//! let mut doc = Document::parse("<body><p>Hello there</p></body>");
//!
//! let report = session.run_initial_pass(&mut doc);
//! assert_eq!(report.substituted, 1);
//!
//! doc.append_html(doc.body(), "<p>hello again</p>")?;
//! let report = session.settle(&mut doc);
//! assert_eq!(report.substituted, 1);
//! ```

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::dom::{Document, NodeId};
use crate::error::{SwapError, SwapResult};
use crate::exclusion::ExclusionRules;
use crate::markup::StyleTokens;
use crate::pattern::CompiledCatalog;
use crate::region::RegionSelector;
use crate::substitute::{SubstitutionDecision, Substituter};
use crate::watcher::{MutationWatcher, WatcherState};

/// Upper bound on batches drained by one [`Session::settle`] call
pub const MAX_SETTLE_ROUNDS: usize = 8;

/// Upper bound on selection rounds in one [`Session::scan`]
pub const MAX_SCAN_ROUNDS: usize = 16;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Share of matches replaced, 0 to 100
    pub replacement_percentage: u8,
    pub styles: StyleTokens,
    pub exclusions: ExclusionRules,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            replacement_percentage: 100,
            styles: StyleTokens::default(),
            exclusions: ExclusionRules::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_percentage(mut self, percentage: u8) -> Self {
        self.replacement_percentage = percentage;
        self
    }

    pub fn validate(&self) -> SwapResult<()> {
        validate_percentage(self.replacement_percentage)
    }
}

fn validate_percentage(percentage: u8) -> SwapResult<()> {
    if percentage > 100 {
        return Err(SwapError::Config(format!(
            "replacement percentage must be between 0 and 100, got {}",
            percentage
        )));
    }
    Ok(())
}

/// Summary of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Regions rewritten
    pub regions: usize,
    pub substituted: usize,
    /// Matches wrapped but left in the original language
    pub kept: usize,
    pub unresolved: usize,
    /// Candidates or regions left untouched because they could not be processed
    pub skipped_regions: usize,
    pub decisions: Vec<SubstitutionDecision>,
}

impl PassReport {
    pub fn merge(&mut self, other: PassReport) {
        self.regions += other.regions;
        self.substituted += other.substituted;
        self.kept += other.kept;
        self.unresolved += other.unresolved;
        self.skipped_regions += other.skipped_regions;
        self.decisions.extend(other.decisions);
    }

    /// Whether the pass made no decisions at all
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

/// A running substitution session over one document
pub struct Session {
    compiled: Arc<CompiledCatalog>,
    config: SessionConfig,
    rng: StdRng,
    watcher: MutationWatcher,
}

impl Session {
    /// Compile `catalog` and create a session with an entropy-seeded RNG
    ///
    /// # Errors
    ///
    /// `SwapError::Config` for an out-of-range percentage, `SwapError::Pattern`
    /// if the catalog does not compile.
    pub fn new(catalog: &Catalog, config: SessionConfig) -> SwapResult<Self> {
        let compiled = Arc::new(CompiledCatalog::compile(catalog)?);
        Self::from_compiled(compiled, config, None)
    }

    /// Like [`Session::new`] with a fixed seed, for reproducible passes
    pub fn with_seed(catalog: &Catalog, config: SessionConfig, seed: u64) -> SwapResult<Self> {
        let compiled = Arc::new(CompiledCatalog::compile(catalog)?);
        Self::from_compiled(compiled, config, Some(seed))
    }

    /// Create a session over an already compiled, possibly shared catalog
    pub fn from_compiled(
        compiled: Arc<CompiledCatalog>,
        config: SessionConfig,
        seed: Option<u64>,
    ) -> SwapResult<Self> {
        config.validate()?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Session {
            compiled,
            config,
            rng,
            watcher: MutationWatcher::new(),
        })
    }

    pub fn compiled(&self) -> &Arc<CompiledCatalog> {
        &self.compiled
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn watcher_state(&self) -> WatcherState {
        self.watcher.state()
    }

    /// Scan the document body, then start observing mutations
    pub fn run_initial_pass(&mut self, doc: &mut Document) -> PassReport {
        let body = doc.body();
        let report = self.scan(doc, body);
        doc.observe();
        // The initial pass already covers everything written so far
        doc.take_records();
        self.watcher.start();
        info!(
            "Initial pass: {} region(s), {} substituted, {} kept",
            report.regions, report.substituted, report.kept
        );
        report
    }

    /// Select regions below `root` and substitute inside each
    ///
    /// Matches in an ancestor of a region only become reachable once the
    /// region's own matches are wrapped, so selection repeats until a round
    /// makes no decisions (at most [`MAX_SCAN_ROUNDS`] rounds). Failures are
    /// contained per region and counted in the report.
    pub fn scan(&mut self, doc: &mut Document, root: NodeId) -> PassReport {
        let mut report = PassReport::default();
        if self.compiled.is_empty() {
            return report;
        }

        for round in 0..MAX_SCAN_ROUNDS {
            let decided = report.decisions.len();
            let selection =
                RegionSelector::new(&self.compiled, &self.config.exclusions).select(doc, root);
            if round == 0 {
                report.skipped_regions += selection.malformed;
            }

            let substituter = Substituter::new(
                &self.compiled,
                &self.config.styles,
                self.config.replacement_percentage,
            );
            for region in &selection.regions {
                match substituter.apply(doc, region, &mut self.rng) {
                    Ok(outcome) => {
                        if !outcome.decisions.is_empty() {
                            report.regions += 1;
                        }
                        report.unresolved += outcome.unresolved;
                        for decision in outcome.decisions {
                            if decision.did_substitute {
                                report.substituted += 1;
                            } else {
                                report.kept += 1;
                            }
                            report.decisions.push(decision);
                        }
                    }
                    Err(e) => {
                        warn!("Region {} skipped: {}", region.node.index(), e);
                        report.skipped_regions += 1;
                    }
                }
            }

            if report.decisions.len() == decided {
                break;
            }
        }
        report
    }

    /// Drain one batch of mutation records and scan the added subtrees
    ///
    /// Does nothing before the initial pass has started observation.
    pub fn process_mutations(&mut self, doc: &mut Document) -> PassReport {
        if !self.watcher.is_started() {
            debug!("Mutation batch ignored, observation has not started");
            return PassReport::default();
        }
        let records = doc.take_records();
        if records.is_empty() {
            return PassReport::default();
        }

        let roots = self
            .watcher
            .begin_batch(doc, &records, &self.config.exclusions);
        let mut report = PassReport::default();
        for root in roots {
            // An earlier root in this batch may have replaced this one
            if !doc.is_attached(root) {
                continue;
            }
            report.merge(self.scan(doc, root));
        }
        self.watcher.finish_batch();

        if !report.is_empty() {
            info!(
                "Mutation batch: {} region(s), {} substituted, {} kept",
                report.regions, report.substituted, report.kept
            );
        }
        report
    }

    /// Process batches until the document stops changing
    ///
    /// The engine's own writes produce one more batch, which rescans to no
    /// decisions. At most [`MAX_SETTLE_ROUNDS`] batches are drained.
    pub fn settle(&mut self, doc: &mut Document) -> PassReport {
        let mut report = PassReport::default();
        for _ in 0..MAX_SETTLE_ROUNDS {
            if !doc.has_pending_records() {
                break;
            }
            report.merge(self.process_mutations(doc));
        }
        report
    }

    /// Replace the catalog and rebuild all patterns
    pub fn reload(&mut self, catalog: &Catalog) -> SwapResult<()> {
        self.compiled = Arc::new(CompiledCatalog::compile(catalog)?);
        info!("Catalog reloaded with {} entries", self.compiled.len());
        Ok(())
    }

    pub fn set_replacement_percentage(&mut self, percentage: u8) -> SwapResult<()> {
        validate_percentage(percentage)?;
        self.config.replacement_percentage = percentage;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(pairs: &[(&str, &str)]) -> Catalog {
        Catalog::from_pairs(
            pairs
                .iter()
                .map(|(s, t)| (s.to_string(), vec![t.to_string()])),
        )
    }

    #[test]
    fn test_config_rejects_large_percentage() {
        let config = SessionConfig::default().with_percentage(150);
        assert!(matches!(
            Session::new(&catalog(&[("a", "b")]), config),
            Err(SwapError::Config(_))
        ));
    }

    #[test]
    fn test_set_replacement_percentage() {
        let mut session =
            Session::with_seed(&catalog(&[("a", "b")]), SessionConfig::default(), 1).unwrap();
        assert!(session.set_replacement_percentage(101).is_err());
        session.set_replacement_percentage(0).unwrap();
        assert_eq!(session.config().replacement_percentage, 0);
    }

    #[test]
    fn test_initial_pass_starts_watcher() {
        let mut session =
            Session::with_seed(&catalog(&[("hello", "bonjour")]), SessionConfig::default(), 1)
                .unwrap();
        let mut doc = Document::parse("<body><p>hello</p></body>");
        assert_eq!(session.watcher_state(), WatcherState::Dormant);
        let report = session.run_initial_pass(&mut doc);
        assert_eq!(report.substituted, 1);
        assert_eq!(session.watcher_state(), WatcherState::Idle);
        assert!(doc.is_observing());
        assert!(!doc.has_pending_records());
    }

    #[test]
    fn test_mutations_ignored_before_initial_pass() {
        let mut session =
            Session::with_seed(&catalog(&[("hello", "bonjour")]), SessionConfig::default(), 1)
                .unwrap();
        let mut doc = Document::parse("<body></body>");
        doc.observe();
        let body = doc.body();
        doc.append_html(body, "<p>hello</p>").unwrap();
        assert!(session.process_mutations(&mut doc).is_empty());
        assert!(doc.has_pending_records());
    }

    #[test]
    fn test_settle_drains_own_writes() {
        let mut session =
            Session::with_seed(&catalog(&[("hello", "bonjour")]), SessionConfig::default(), 1)
                .unwrap();
        let mut doc = Document::parse("<body><p>x</p></body>");
        session.run_initial_pass(&mut doc);

        let body = doc.body();
        doc.append_html(body, "<p>hello</p>").unwrap();
        let report = session.settle(&mut doc);
        assert_eq!(report.substituted, 1);
        assert!(!doc.has_pending_records());
        assert_eq!(session.watcher_state(), WatcherState::Idle);
    }

    #[test]
    fn test_reload_changes_matches() {
        let mut session =
            Session::with_seed(&catalog(&[("hello", "bonjour")]), SessionConfig::default(), 1)
                .unwrap();
        session.reload(&catalog(&[("world", "monde")])).unwrap();
        let mut doc = Document::parse("<body><p>hello world</p></body>");
        let report = session.run_initial_pass(&mut doc);
        assert_eq!(report.decisions.len(), 1);
        assert_eq!(report.decisions[0].source_phrase, "world");
    }

    #[test]
    fn test_empty_catalog_scans_nothing() {
        let mut session = Session::with_seed(&Catalog::new(), SessionConfig::default(), 1).unwrap();
        let mut doc = Document::parse("<body><p>hello</p></body>");
        assert!(session.run_initial_pass(&mut doc).is_empty());
        assert_eq!(doc.inner_html(doc.body()), "<p>hello</p>");
    }

    #[test]
    fn test_shared_compiled_catalog() {
        let compiled = Arc::new(CompiledCatalog::compile(&catalog(&[("cat", "chat")])).unwrap());
        let mut first =
            Session::from_compiled(Arc::clone(&compiled), SessionConfig::default(), Some(1)).unwrap();
        let second =
            Session::from_compiled(Arc::clone(&compiled), SessionConfig::default(), Some(2)).unwrap();
        assert!(Arc::ptr_eq(first.compiled(), second.compiled()));

        let mut doc = Document::parse("<body><p>a cat</p></body>");
        assert_eq!(first.run_initial_pass(&mut doc).substituted, 1);
    }
}
