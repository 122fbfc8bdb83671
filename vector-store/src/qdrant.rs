//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! Concentrates all Qdrant interactions behind a minimal API so the manager
//! stays decoupled from the builder-heavy client surface.

use crate::errors::{Result, VectorError};
use crate::point::{VectorPoint, qpayload_to_json, to_point_struct};
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
    points_selector::PointsSelectorOneOf, vectors_config,
};
use tracing::{debug, info, warn};

pub struct QdrantStore {
    client: Qdrant,
}

impl QdrantStore {
    /// Build the client; supports optional API-key authentication.
    pub fn connect(url: &str, api_key: Option<&str>) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(VectorError::Config("empty qdrant url".into()));
        }
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key.to_string());
        }
        let client = builder
            .build()
            .map_err(|e| VectorError::Qdrant(e.to_string()))?;
        Ok(Self { client })
    }

    /// Dimensions and point count of an existing collection, `None` when the
    /// collection does not exist.
    pub async fn collection_info(&self, name: &str) -> Result<Option<(usize, u64)>> {
        let info = match self.client.collection_info(name).await {
            Ok(info) => info,
            Err(_) => return Ok(None),
        };
        let Some(result) = info.result else {
            return Ok(None);
        };
        let points = result.points_count.unwrap_or(0);
        let dims = result
            .config
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|c| match c {
                vectors_config::Config::Params(params) => Some(params.size as usize),
                vectors_config::Config::ParamsMap(_) => None,
            })
            .unwrap_or(0);
        Ok(Some((dims, points)))
    }

    /// Create the collection when missing (cosine distance). Existing
    /// collections are left untouched, whatever their dimensions.
    pub async fn ensure_collection(&self, name: &str, dims: usize) -> Result<()> {
        if let Some((existing, _)) = self.collection_info(name).await? {
            if existing != dims {
                warn!(
                    "collection '{name}' has dimension {existing}, current model needs {dims}; \
                     explicit migration required"
                );
            } else {
                debug!("collection '{name}' already exists");
            }
            return Ok(());
        }

        info!("creating collection '{name}' (size={dims}, cosine)");
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dims as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| VectorError::Qdrant(e.to_string()))?;
        Ok(())
    }

    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        warn!("deleting collection '{name}'");
        self.client
            .delete_collection(name)
            .await
            .map_err(|e| VectorError::Qdrant(e.to_string()))?;
        Ok(())
    }

    /// Upsert a batch of points; returns the number submitted.
    pub async fn upsert(&self, name: &str, points: Vec<VectorPoint>) -> Result<usize> {
        if points.is_empty() {
            return Ok(0);
        }
        let count = points.len();
        let structs: Vec<_> = points.into_iter().map(to_point_struct).collect();

        debug!("upserting {count} points into '{name}'");
        self.client
            .upsert_points(UpsertPointsBuilder::new(name, structs))
            .await
            .map_err(|e| VectorError::Qdrant(e.to_string()))?;
        Ok(count)
    }

    /// k-NN search; returns `(score, payload-json)` sorted by the server.
    pub async fn search(
        &self,
        name: &str,
        vector: Vec<f32>,
        limit: u64,
        filter: Option<Filter>,
    ) -> Result<Vec<(f32, serde_json::Value)>> {
        let mut builder = SearchPointsBuilder::new(name, vector, limit).with_payload(true);
        if let Some(f) = filter {
            builder = builder.filter(f);
        }

        let res = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| VectorError::Qdrant(e.to_string()))?;

        let mut out = Vec::with_capacity(res.result.len());
        for r in res.result {
            out.push((r.score, qpayload_to_json(r.payload)));
        }
        debug!("search in '{name}' returned {} hits", out.len());
        Ok(out)
    }

    /// Delete every point matching the filter.
    pub async fn delete_by_filter(&self, name: &str, filter: Filter) -> Result<()> {
        let selector = PointsSelectorOneOf::Filter(filter);
        self.client
            .delete_points(DeletePointsBuilder::new(name).points(selector))
            .await
            .map_err(|e| VectorError::Qdrant(e.to_string()))?;
        Ok(())
    }

    /// Exact point count, optionally filtered.
    pub async fn count(&self, name: &str, filter: Option<Filter>) -> Result<u64> {
        let mut builder = CountPointsBuilder::new(name).exact(true);
        if let Some(f) = filter {
            builder = builder.filter(f);
        }
        let res = self
            .client
            .count(builder)
            .await
            .map_err(|e| VectorError::Qdrant(e.to_string()))?;
        Ok(res.result.map(|r| r.count).unwrap_or(0))
    }
}
