//! Sessions and the registry that owns them.
//!
//! A session moves through `Created -> Streaming -> {Completed | Cancelled}`.
//! While `Created`, the [`Session`] itself sits in the registry. Attaching a
//! stream moves it out into its own task, leaving only the cancellation
//! handle behind; from then on the registry lock never touches the field or
//! frontier. Finished ids are remembered in a bounded retired set so that a
//! cancel arriving after natural completion is still acknowledged.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};
use wildfire_types::{
    CancelOutcome, Coord, CreateSessionRequest, DeltaPayload, ParamsError, SessionId,
    SimulationParameters, SparseField,
};
use wildfire_world::{
    Field, FlammableFrontier, GridError, ReconstructionConfig, initial_frontier,
    reconstruct_dense_field,
};

use crate::cancel::CancelSignal;
use crate::config::SessionsConfig;
use crate::generation::{EngineError, advance_generation};
use crate::stream::{DeltaStream, HANDOFF_CAPACITY, SessionEnd, run_session};

/// Errors surfaced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A required part of the creation request is absent.
    #[error("missing required input: {0}")]
    MissingInput(&'static str),

    /// The creation request is present but inconsistent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The simulation parameters are out of range.
    #[error("invalid parameters: {source}")]
    Params {
        /// The underlying validation error.
        #[from]
        source: ParamsError,
    },

    /// The field could not be reconstructed.
    #[error("invalid field: {source}")]
    Grid {
        /// The underlying grid error.
        source: GridError,
    },

    /// The registry already holds `sessions.max_live` sessions.
    #[error("session limit of {limit} reached")]
    AtCapacity {
        /// The configured limit.
        limit: usize,
    },

    /// An internal invariant failed while building the session.
    #[error("internal error: {0}")]
    Internal(String),

    /// No live session has this id.
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),

    /// A stream is already attached to this session.
    #[error("session {0} is already streaming")]
    AlreadyStreaming(SessionId),
}

impl From<GridError> for SessionError {
    fn from(source: GridError) -> Self {
        match source {
            // The dense index is built from enumerated coordinates, so a
            // duplicate there is never the client's doing.
            GridError::DuplicateCoordinate(_) => Self::Internal(source.to_string()),
            source => Self::Grid { source },
        }
    }
}

/// One simulation instance: its field, parameters, frontier, and RNG.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    field: Field,
    params: SimulationParameters,
    frontier: FlammableFrontier,
    rng: SmallRng,
    generation: u64,
    created_at: DateTime<Utc>,
}

impl Session {
    /// Validate a creation request and build the session it describes.
    pub fn from_request(
        id: SessionId,
        request: CreateSessionRequest,
        reconstruction: &ReconstructionConfig,
    ) -> Result<Self, SessionError> {
        let field = request.field.ok_or(SessionError::MissingInput("field"))?;
        let params = request.params.ok_or(SessionError::MissingInput("params"))?;
        let coords = request.coords.ok_or(SessionError::MissingInput("coords"))?;
        check_coords(&field, &coords)?;
        Self::build(id, field, params, reconstruction)
    }

    /// Build a session from an already-assembled field and parameters.
    pub fn build(
        id: SessionId,
        field: SparseField,
        params: SimulationParameters,
        reconstruction: &ReconstructionConfig,
    ) -> Result<Self, SessionError> {
        params.validate()?;
        let field = reconstruct_dense_field(&field, reconstruction)?;
        let frontier = initial_frontier(&field);
        let rng = params
            .seed
            .map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);

        Ok(Self {
            id,
            field,
            params,
            frontier,
            rng,
            generation: 0,
            created_at: Utc::now(),
        })
    }

    /// The session's id.
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// The session's parameters.
    pub const fn params(&self) -> &SimulationParameters {
        &self.params
    }

    /// The current field.
    pub const fn field(&self) -> &Field {
        &self.field
    }

    /// Cells to be evaluated next generation.
    pub const fn frontier(&self) -> &FlammableFrontier {
        &self.frontier
    }

    /// Number of generations computed so far.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// When the session was created.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the fire has burned out.
    pub fn is_exhausted(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Advance one generation and return its delta.
    pub fn step(&mut self) -> Result<DeltaPayload, EngineError> {
        let outcome =
            advance_generation(&mut self.field, &self.params, &self.frontier, &mut self.rng)?;
        let delta = outcome.delta_payload();
        self.frontier = outcome.next_frontier;
        self.generation = self.generation.saturating_add(1);
        Ok(delta)
    }
}

/// Check the client's coordinate index against the cells it describes.
fn check_coords(field: &SparseField, coords: &BTreeMap<String, usize>) -> Result<(), SessionError> {
    for (key, &position) in coords {
        let coord = Coord::parse_key(key).map_err(|e| SessionError::InvalidInput(e.to_string()))?;
        let cell = field.cells.get(position).ok_or_else(|| {
            SessionError::InvalidInput(format!(
                "coords[{key}] = {position} is past the end of {} cells",
                field.cells.len()
            ))
        })?;
        if cell.coord() != coord {
            return Err(SessionError::InvalidInput(format!(
                "coords[{key}] = {position} points at cell {}",
                cell.coord()
            )));
        }
    }
    Ok(())
}

/// Lifecycle phase of a live session, as reported to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    /// Created, no stream attached yet.
    Created,
    /// A stream is attached and the loop is running.
    Streaming,
}

/// Operator view of one live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// The session's id.
    pub session_id: SessionId,
    /// Current phase.
    pub phase: SessionPhase,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
enum Slot {
    Created(Box<Session>),
    Streaming {
        cancel: CancelSignal,
        created_at: DateTime<Utc>,
    },
}

/// Finished ids, oldest evicted first once `capacity` is reached.
#[derive(Debug)]
struct RetiredSet {
    order: VecDeque<SessionId>,
    members: HashSet<SessionId>,
    capacity: usize,
}

impl RetiredSet {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            capacity,
        }
    }

    fn insert(&mut self, id: SessionId) {
        if self.capacity == 0 || !self.members.insert(id) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
    }

    fn contains(&self, id: SessionId) -> bool {
        self.members.contains(&id)
    }
}

#[derive(Debug)]
struct Registry {
    live: HashMap<SessionId, Slot>,
    retired: RetiredSet,
}

impl Registry {
    fn retire(&mut self, id: SessionId) {
        self.live.remove(&id);
        self.retired.insert(id);
    }
}

/// Owns every session in the process.
///
/// Cheap to clone; clones share the same registry.
#[derive(Debug, Clone)]
pub struct SessionManager {
    registry: Arc<Mutex<Registry>>,
    reconstruction: ReconstructionConfig,
    max_live: usize,
}

impl SessionManager {
    /// Create an empty manager.
    pub fn new(config: &SessionsConfig) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                live: HashMap::new(),
                retired: RetiredSet::new(config.retired_capacity),
            })),
            reconstruction: config.reconstruction(),
            max_live: config.max_live,
        }
    }

    /// Validate `request`, build the session, and register it.
    ///
    /// Refused with [`SessionError::AtCapacity`] while `max_live` sessions
    /// are already held.
    pub async fn create(&self, request: CreateSessionRequest) -> Result<SessionId, SessionError> {
        self.check_capacity(&*self.registry.lock().await)?;

        let id = SessionId::new();
        let session = Session::from_request(id, request, &self.reconstruction)?;

        info!(
            session_id = %id,
            width = session.field().width(),
            height = session.field().height(),
            frontier = session.frontier().len(),
            update_interval_seconds = session.params().update_interval_seconds,
            "Session created"
        );

        let mut registry = self.registry.lock().await;
        self.check_capacity(&registry)?;
        registry.live.insert(id, Slot::Created(Box::new(session)));
        Ok(id)
    }

    fn check_capacity(&self, registry: &Registry) -> Result<(), SessionError> {
        if registry.live.len() >= self.max_live {
            warn!(limit = self.max_live, "Session limit reached, refusing create");
            return Err(SessionError::AtCapacity {
                limit: self.max_live,
            });
        }
        Ok(())
    }

    /// Start the session's loop and return the stream of its events.
    ///
    /// Only one stream may ever attach to a session. When the loop stops,
    /// for whatever reason, the session leaves the registry.
    pub async fn attach_stream(&self, id: SessionId) -> Result<DeltaStream, SessionError> {
        let mut registry = self.registry.lock().await;

        let mut session = match registry.live.remove(&id) {
            None => return Err(SessionError::UnknownSession(id)),
            Some(slot @ Slot::Streaming { .. }) => {
                registry.live.insert(id, slot);
                return Err(SessionError::AlreadyStreaming(id));
            }
            Some(Slot::Created(session)) => session,
        };

        let cancel = CancelSignal::new();
        registry.live.insert(
            id,
            Slot::Streaming {
                cancel: cancel.clone(),
                created_at: session.created_at(),
            },
        );
        drop(registry);

        let (tx, rx) = mpsc::channel(HANDOFF_CAPACITY);
        let loop_cancel = cancel.clone();
        let registry = Arc::clone(&self.registry);

        tokio::spawn(async move {
            info!(session_id = %id, "Session streaming");
            let end = run_session(&mut session, &tx, &loop_cancel).await;
            registry.lock().await.retire(id);

            match end {
                SessionEnd::Failed(ref e) => warn!(
                    session_id = %id,
                    generation = session.generation(),
                    error = %e,
                    "Session stopped by engine error"
                ),
                _ => info!(
                    session_id = %id,
                    generation = session.generation(),
                    end = ?end,
                    "Session ended"
                ),
            }
        });

        Ok(DeltaStream::new(id, rx, cancel))
    }

    /// Stop a session.
    ///
    /// Succeeds for live sessions and for sessions that already finished;
    /// fails only for ids this process has never issued (or has forgotten).
    pub async fn cancel(&self, id: SessionId) -> Result<CancelOutcome, SessionError> {
        let mut registry = self.registry.lock().await;
        match registry.live.remove(&id) {
            Some(Slot::Created(_)) => {
                registry.retire(id);
                info!(session_id = %id, "Session cancelled before streaming");
                Ok(CancelOutcome::Cancelled)
            }
            Some(Slot::Streaming { cancel, .. }) => {
                cancel.cancel();
                registry.retire(id);
                info!(session_id = %id, "Session cancelled");
                Ok(CancelOutcome::Cancelled)
            }
            None if registry.retired.contains(id) => Ok(CancelOutcome::AlreadyFinished),
            None => Err(SessionError::UnknownSession(id)),
        }
    }

    /// Whether `id` is a live (created or streaming) session.
    pub async fn contains(&self, id: SessionId) -> bool {
        self.registry.lock().await.live.contains_key(&id)
    }

    /// Number of live sessions.
    pub async fn live_count(&self) -> usize {
        self.registry.lock().await.live.len()
    }

    /// Operator view of every live session, oldest first.
    pub async fn summaries(&self) -> Vec<SessionSummary> {
        let registry = self.registry.lock().await;
        let mut summaries: Vec<SessionSummary> = registry
            .live
            .iter()
            .map(|(&session_id, slot)| match slot {
                Slot::Created(session) => SessionSummary {
                    session_id,
                    phase: SessionPhase::Created,
                    created_at: session.created_at(),
                },
                Slot::Streaming { created_at, .. } => SessionSummary {
                    session_id,
                    phase: SessionPhase::Streaming,
                    created_at: *created_at,
                },
            })
            .collect();
        summaries.sort_by_key(|s| s.session_id);
        summaries
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt as _;
    use wildfire_types::{Cell, CellState};

    use super::*;
    use crate::stream::StreamEvent;

    fn manager() -> SessionManager {
        SessionManager::new(&SessionsConfig::default())
    }

    fn request(cells: Vec<Cell>, interval: f64) -> CreateSessionRequest {
        let coords = cells
            .iter()
            .enumerate()
            .map(|(i, c)| (c.coord().key(), i))
            .collect();
        CreateSessionRequest {
            field: Some(SparseField {
                width: 5,
                height: 5,
                cells,
            }),
            params: Some(SimulationParameters {
                seed: Some(11),
                ..SimulationParameters::with_interval(interval)
            }),
            coords: Some(coords),
        }
    }

    fn slow_line_request(width: i32) -> CreateSessionRequest {
        let cells = vec![Cell::new(Coord::new(0, 0), CellState::Burning)];
        CreateSessionRequest {
            field: Some(SparseField {
                width,
                height: 1,
                cells,
            }),
            params: Some(SimulationParameters {
                burn_duration: 100,
                seed: Some(3),
                ..SimulationParameters::with_interval(0.1)
            }),
            coords: Some([(String::from("0,0"), 0)].into_iter().collect()),
        }
    }

    fn fire_at_origin() -> Vec<Cell> {
        vec![Cell::new(Coord::new(0, 0), CellState::Burning)]
    }

    #[tokio::test]
    async fn create_requires_every_part() {
        let manager = manager();
        let full = request(fire_at_origin(), 1.0);

        for (missing, req) in [
            ("field", CreateSessionRequest { field: None, ..full.clone() }),
            ("params", CreateSessionRequest { params: None, ..full.clone() }),
            ("coords", CreateSessionRequest { coords: None, ..full.clone() }),
        ] {
            let err = manager.create(req).await.unwrap_err();
            assert!(matches!(err, SessionError::MissingInput(name) if name == missing));
        }
        assert_eq!(manager.live_count().await, 0);
    }

    #[tokio::test]
    async fn create_rejects_inconsistent_coords() {
        let manager = manager();
        let mut req = request(fire_at_origin(), 1.0);
        req.coords = Some([(String::from("1,1"), 0)].into_iter().collect());
        assert!(matches!(
            manager.create(req).await,
            Err(SessionError::InvalidInput(_))
        ));

        let mut req = request(fire_at_origin(), 1.0);
        req.coords = Some([(String::from("0,0"), 5)].into_iter().collect());
        assert!(matches!(
            manager.create(req).await,
            Err(SessionError::InvalidInput(_))
        ));

        let mut req = request(fire_at_origin(), 1.0);
        req.coords = Some([(String::from("zero"), 0)].into_iter().collect());
        assert!(matches!(
            manager.create(req).await,
            Err(SessionError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn create_surfaces_grid_and_param_errors() {
        let manager = manager();

        let mut req = request(fire_at_origin(), 1.0);
        if let Some(field) = req.field.as_mut() {
            field.width = 0;
        }
        assert!(matches!(
            manager.create(req).await,
            Err(SessionError::Grid {
                source: GridError::InvalidDimensions { .. }
            })
        ));

        let req = request(vec![Cell::new(Coord::new(9, 9), CellState::Burning)], 1.0);
        assert!(matches!(
            manager.create(req).await,
            Err(SessionError::Grid {
                source: GridError::OutOfBounds(_)
            })
        ));

        let req = request(fire_at_origin(), -1.0);
        assert!(matches!(
            manager.create(req).await,
            Err(SessionError::Params { .. })
        ));
    }

    #[tokio::test]
    async fn created_session_is_listed() {
        let manager = manager();
        let id = manager.create(request(fire_at_origin(), 1.0)).await.unwrap();
        assert!(manager.contains(id).await);

        let summaries = manager.summaries().await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries.first().map(|s| s.phase), Some(SessionPhase::Created));
    }

    #[tokio::test]
    async fn attach_unknown_session_fails() {
        let manager = manager();
        let err = manager.attach_stream(SessionId::new()).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownSession(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn stream_runs_to_completion_and_releases_session() {
        let manager = manager();
        let id = manager.create(request(fire_at_origin(), 0.5)).await.unwrap();
        let stream = manager.attach_stream(id).await.unwrap();
        assert_eq!(stream.session_id(), id);

        let events: Vec<StreamEvent> = stream.collect().await;
        assert_eq!(events.last(), Some(&StreamEvent::Complete));
        assert_eq!(
            events.iter().filter(|e| **e == StreamEvent::Complete).count(),
            1
        );

        // The event channel closes only after the session was retired.
        assert!(!manager.contains(id).await);
        assert!(matches!(
            manager.attach_stream(id).await,
            Err(SessionError::UnknownSession(_))
        ));
        assert_eq!(manager.cancel(id).await.unwrap(), CancelOutcome::AlreadyFinished);
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_stream_per_session() {
        let manager = manager();
        let id = manager.create(request(fire_at_origin(), 1.0)).await.unwrap();
        let _stream = manager.attach_stream(id).await.unwrap();

        assert!(matches!(
            manager.attach_stream(id).await,
            Err(SessionError::AlreadyStreaming(_))
        ));
        assert_eq!(
            manager.summaries().await.first().map(|s| s.phase),
            Some(SessionPhase::Streaming)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_a_streaming_session() {
        let manager = manager();
        let id = manager.create(request(fire_at_origin(), 3600.0)).await.unwrap();
        let mut stream = manager.attach_stream(id).await.unwrap();

        assert_eq!(manager.cancel(id).await.unwrap(), CancelOutcome::Cancelled);
        assert!(!manager.contains(id).await);

        // The stream ends without a completion event.
        assert_eq!(stream.next_event().await, None);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let manager = manager();
        let id = manager.create(request(fire_at_origin(), 1.0)).await.unwrap();

        assert_eq!(manager.cancel(id).await.unwrap(), CancelOutcome::Cancelled);
        assert_eq!(manager.cancel(id).await.unwrap(), CancelOutcome::AlreadyFinished);
        assert!(matches!(
            manager.attach_stream(id).await,
            Err(SessionError::UnknownSession(_))
        ));
    }

    #[tokio::test]
    async fn cancel_unknown_session_always_fails() {
        let manager = manager();
        let id = SessionId::new();
        for _ in 0..2 {
            assert!(matches!(
                manager.cancel(id).await,
                Err(SessionError::UnknownSession(_))
            ));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_stream_releases_session() {
        let manager = manager();
        let id = manager.create(request(fire_at_origin(), 3600.0)).await.unwrap();
        let stream = manager.attach_stream(id).await.unwrap();
        drop(stream);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!manager.contains(id).await);
        assert_eq!(manager.cancel(id).await.unwrap(), CancelOutcome::AlreadyFinished);
    }

    #[tokio::test]
    async fn create_refuses_beyond_max_live() {
        let manager = SessionManager::new(&SessionsConfig {
            max_live: 2,
            ..SessionsConfig::default()
        });
        let first = manager.create(request(fire_at_origin(), 1.0)).await.unwrap();
        manager.create(request(fire_at_origin(), 1.0)).await.unwrap();

        assert!(matches!(
            manager.create(request(fire_at_origin(), 1.0)).await,
            Err(SessionError::AtCapacity { limit: 2 })
        ));
        assert_eq!(manager.live_count().await, 2);

        manager.cancel(first).await.unwrap();
        assert!(manager.create(request(fire_at_origin(), 1.0)).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_delivered_after_cancel_is_acknowledged() {
        let manager = manager();
        let id = manager.create(slow_line_request(61)).await.unwrap();
        let mut stream = manager.attach_stream(id).await.unwrap();

        // Many intervals pass while the consumer reads nothing.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(manager.cancel(id).await.unwrap(), CancelOutcome::Cancelled);

        assert_eq!(stream.next_event().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn engine_failure_retires_session_without_completion() {
        let manager = manager();
        let reconstruction = ReconstructionConfig::default();
        let mut broken = Session::build(
            SessionId::new(),
            SparseField {
                width: 3,
                height: 1,
                cells: fire_at_origin(),
            },
            SimulationParameters::with_interval(0.5),
            &reconstruction,
        )
        .unwrap();
        broken.frontier = [99].into_iter().collect();
        let broken_id = broken.id();
        manager
            .registry
            .lock()
            .await
            .live
            .insert(broken_id, Slot::Created(Box::new(broken)));

        let healthy_id = manager.create(request(fire_at_origin(), 0.5)).await.unwrap();
        let healthy = manager.attach_stream(healthy_id).await.unwrap();
        let failed = manager.attach_stream(broken_id).await.unwrap();

        let failed_events: Vec<StreamEvent> = failed.collect().await;
        assert!(failed_events.is_empty());
        assert!(!manager.contains(broken_id).await);
        assert_eq!(
            manager.cancel(broken_id).await.unwrap(),
            CancelOutcome::AlreadyFinished
        );

        let healthy_events: Vec<StreamEvent> = healthy.collect().await;
        assert_eq!(healthy_events.last(), Some(&StreamEvent::Complete));
    }

    #[test]
    fn duplicate_dense_coordinate_is_internal() {
        let err = SessionError::from(GridError::DuplicateCoordinate(Coord::new(0, 0)));
        assert!(matches!(err, SessionError::Internal(_)));

        let err = SessionError::from(GridError::OutOfBounds(Coord::new(9, 9)));
        assert!(matches!(err, SessionError::Grid { .. }));
    }

    #[test]
    fn retired_set_evicts_oldest() {
        let mut retired = RetiredSet::new(2);
        let (a, b, c) = (SessionId::new(), SessionId::new(), SessionId::new());
        retired.insert(a);
        retired.insert(b);
        retired.insert(b);
        retired.insert(c);
        assert!(!retired.contains(a));
        assert!(retired.contains(b));
        assert!(retired.contains(c));
    }
}
