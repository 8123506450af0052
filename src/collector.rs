use std::future::Future;

use geo::Point;
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::config::CollectorConfig;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::generate_point::{random_point_in_polygon, try_random_point_in_polygon};
use crate::polygon::Polygon;
use crate::record::RawRecord;

/// Something that can fetch transit and driving directions between two points.
///
/// Implementations return the seven-field tuple described on [`RawRecord`];
/// the collector validates it before storing anything.
pub trait DirectionsProvider {
    fn directions(
        &mut self,
        origin: Point<f64>,
        destination: Point<f64>,
    ) -> impl Future<Output = Result<RawRecord>> + Send;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub recorded: usize,
    pub rejected: usize,
}

/// Samples origin/destination pairs inside a region, asks the provider for
/// directions, and stores the answers.
pub struct Collector<P> {
    config: CollectorConfig,
    polygon: Polygon,
    provider: P,
    database: Database,
}

impl<P: DirectionsProvider> Collector<P> {
    pub fn new(config: CollectorConfig, polygon: Polygon, provider: P) -> Result<Self> {
        let database = Database::open(&config.database_path, config.buffer_size)?;
        Ok(Self::with_database(config, polygon, provider, database))
    }

    pub fn with_database(
        config: CollectorConfig,
        polygon: Polygon,
        provider: P,
        database: Database,
    ) -> Self {
        Self {
            config,
            polygon,
            provider,
            database,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Collects `config.samples` pairs, sleeping `config.delay()` between
    /// them, then flushes.
    ///
    /// Invalid records are counted and skipped. Any other error stops the run
    /// after flushing what was already collected.
    pub async fn run<R: Rng>(&mut self, rng: &mut R) -> Result<CollectionReport> {
        info!(
            samples = self.config.samples,
            acceptance_ratio = self.polygon.acceptance_ratio(),
            "starting collection"
        );

        let mut report = CollectionReport::default();
        for n in 0..self.config.samples {
            match self.collect_one(rng).await {
                Ok(()) => report.recorded += 1,
                Err(Error::RecordValidation(_)) => report.rejected += 1,
                Err(err) => {
                    if let Err(flush_err) = self.database.flush() {
                        error!(%flush_err, "could not save collected records");
                    }
                    return Err(err);
                }
            }
            if n + 1 < self.config.samples {
                tokio::time::sleep(self.config.delay()).await;
            }
        }

        self.database.flush()?;
        if report.rejected > 0 {
            warn!(rejected = report.rejected, "some records were invalid");
        }
        info!(recorded = report.recorded, "collection done");
        Ok(report)
    }

    async fn collect_one<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        let origin = self.sample(rng)?;
        let destination = self.sample(rng)?;
        debug!(
            from = ?origin.x_y(),
            to = ?destination.x_y(),
            "fetching directions"
        );
        let raw = self.provider.directions(origin, destination).await?;
        self.database.record(raw)
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Result<Point<f64>> {
        match self.config.max_attempts {
            Some(max_attempts) => try_random_point_in_polygon(rng, &self.polygon, max_attempts),
            None => Ok(random_point_in_polygon(rng, &self.polygon)),
        }
    }
}
