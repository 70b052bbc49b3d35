//! Markup-aware phrase substitution for live document trees
//!
//! This crate finds phrases from a dictionary inside an HTML document, even
//! when inline formatting splits them, and swaps a random share of them for
//! a target-language rendering wrapped in tooltip markup. It keeps working
//! as the document changes: new subtrees are picked up from mutation batches
//! while injected markup and excluded elements are never touched twice.
//!
//! # Workflow Example
//!
//! ```ignore
//! use context_lingo::{Catalog, Session, SessionConfig};
//! use context_lingo::dom::Document;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. Build the catalog
//!     let catalog = Catalog::from_pairs(vec![
//!         ("good morning".to_string(), vec!["bonjour".to_string()]),
//!         ("thank you".to_string(), vec!["merci".to_string(), "merci bien".to_string()]),
//!     ]);
//!
//!     // 2. Start a session and run the initial pass
//!     let mut session = Session::new(&catalog, SessionConfig::default().with_percentage(50))?;
//!     let mut doc = Document::parse("<body><p>Good <b>mor</b>ning!</p></body>");
//!     let report = session.run_initial_pass(&mut doc);
//!     println!("{} substituted, {} kept", report.substituted, report.kept);
//!
//!     // 3. Feed later changes through the watcher
//!     let body = doc.body();
//!     doc.append_html(body, "<p>Thank you</p>")?;
//!     session.settle(&mut doc);
//!
//!     println!("{}", doc.inner_html(doc.body()));
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod dom;
pub mod error;
pub mod exclusion;
pub mod markup;
pub mod pattern;
pub mod region;
pub mod session;
pub mod substitute;
pub mod watcher;


// Re-export main types for convenient access
pub use catalog::{Catalog, DEFAULT_WORKING_SET_SIZE, PhraseEntry};
pub use dom::{Document, MutationRecord, NodeId};
pub use error::{SwapError, SwapResult};
pub use exclusion::{ExclusionRules, INJECTED_CLASSES};
pub use markup::{ReplacementMarkup, StyleTokens};
pub use pattern::{CompiledCatalog, MatchSpan};
pub use region::{Region, RegionSelector, Selection};
pub use session::{PassReport, Session, SessionConfig};
pub use substitute::{RegionOutcome, SubstitutionDecision, Substituter};
pub use watcher::{MutationWatcher, WatcherState};
