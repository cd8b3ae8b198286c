use std::sync::Arc;

use sqlx::SqlitePool;

use crate::cancel::CancelToken;
use crate::canvas::CanvasTransport;
use crate::connectivity::Connectivity;
use crate::data_source::{LocalDataSource, NetworkDataSource};
use crate::filter::CourseFilter;
use crate::repository::CourseRepository;
use crate::services::CourseSyncService;
use crate::session::Session;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub repository: Arc<CourseRepository>,
    pub sync: Arc<CourseSyncService>,
    pub local: LocalDataSource,
    pub session: Arc<Session>,
    pub connectivity: Arc<dyn Connectivity>,
    pub shutdown: CancelToken,
}

impl AppState {
    /// Wires both data sources, the repository and the sync service around one transport.
    pub fn new(
        db: SqlitePool,
        transport: Arc<dyn CanvasTransport>,
        session: Arc<Session>,
        connectivity: Arc<dyn Connectivity>,
        filter: Arc<dyn CourseFilter>,
        shutdown: CancelToken,
    ) -> Self {
        let local = LocalDataSource::new(db.clone());
        let network = Arc::new(NetworkDataSource::new(transport));

        let repository = Arc::new(CourseRepository::new(
            network.clone(),
            Arc::new(local.clone()),
            connectivity.clone(),
            filter,
        ));
        let sync = Arc::new(CourseSyncService::new(
            network,
            local.clone(),
            session.clone(),
        ));

        Self {
            db,
            repository,
            sync,
            local,
            session,
            connectivity,
            shutdown,
        }
    }
}
