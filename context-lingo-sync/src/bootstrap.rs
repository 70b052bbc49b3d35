//! Session start-up from persisted state

use std::sync::Arc;

use context_lingo::{Catalog, Session};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::SyncResult;
use crate::settings::Settings;
use crate::source::{CatalogSource, spawn_refresh};
use crate::store::CatalogStore;

/// Load the snapshot and sample the session's working set from it
pub fn load_working_set<R: Rng + ?Sized>(
    store: &CatalogStore,
    settings: &Settings,
    rng: &mut R,
) -> SyncResult<Catalog> {
    let snapshot = store.load()?;
    let working_set = snapshot.sample(settings.working_set_size, rng);
    info!(
        "Working set: {} of {} snapshot entries",
        working_set.len(),
        snapshot.len()
    );
    Ok(working_set)
}

/// Build a session over a working set sampled from `store`
///
/// With a seed, both sampling and substitution decisions are reproducible.
pub fn start_session(
    store: &CatalogStore,
    settings: &Settings,
    seed: Option<u64>,
) -> SyncResult<Session> {
    settings.validate()?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let working_set = load_working_set(store, settings, &mut rng)?;
    let session = match seed {
        Some(seed) => Session::with_seed(&working_set, settings.session_config(), seed)?,
        None => Session::new(&working_set, settings.session_config())?,
    };
    Ok(session)
}

/// Start a session from the current snapshot, then refresh the snapshot in
/// the background for the next run
///
/// The working set is sampled before the refresh task is spawned, so the
/// session never sees a half-written or newer snapshot.
pub fn start_session_with_refresh(
    store: &CatalogStore,
    settings: &Settings,
    seed: Option<u64>,
    source: Arc<dyn CatalogSource>,
) -> SyncResult<(Session, JoinHandle<Option<usize>>)> {
    let session = start_session(store, settings, seed)?;
    let refresh = spawn_refresh(source, store.clone(), settings.username.clone());
    Ok((session, refresh))
}
