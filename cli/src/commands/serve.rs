use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sectorgrid::store::{tables, GeometryStore, SqliteStore};
use serde_json::{json, Map, Value};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};

type SharedStore = Arc<Mutex<dyn GeometryStore + Send>>;

/// `GET /` lists stored layers with row counts; `GET /api/{layer}` returns one layer as GeoJSON.
pub fn router<S: GeometryStore + Send + 'static>(store: S) -> Router {
    let store: SharedStore = Arc::new(Mutex::new(store));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/api/:layer", get(layer_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::ServeArgs) -> Result<()> {
    let store = SqliteStore::open(&args.database)
        .with_context(|| format!("[serve] opening {}", args.database.display()))?;
    let addr: SocketAddr = args.listen.parse()
        .with_context(|| format!("[serve] invalid listen address {}", args.listen))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("[serve] starting the async runtime")?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr).await
            .with_context(|| format!("[serve] binding {addr}"))?;
        tracing::info!(%addr, database = %args.database.display(), "serving layers");
        println!("[serve] listening on http://{addr}");

        axum::serve(listener, router(store))
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "cannot listen for ctrl-c");
                }
            })
            .await
            .context("[serve] server error")
    })
}

/// Run a store read off the async workers; the store is synchronous.
async fn with_store<T, F>(store: SharedStore, read: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn GeometryStore) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let store = store.lock().map_err(|_| anyhow!("store lock poisoned"))?;
        read(&*store)
    })
    .await
    .context("store task failed")?
}

fn internal_error(error: anyhow::Error) -> Response {
    tracing::warn!(error = %format!("{error:#}"), "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{error:#}")).into_response()
}

async fn index_handler(State(store): State<SharedStore>) -> Response {
    let counts = with_store(store, |store| {
        let mut layers = Map::new();
        for table in tables::ALL {
            if store.table_exists(table)? {
                layers.insert(table.to_string(), store.row_count(table)?.into());
            }
        }
        Ok(layers)
    }).await;

    match counts {
        Ok(layers) => Json(json!({ "layers": Value::Object(layers) })).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn layer_handler(State(store): State<SharedStore>, Path(layer): Path<String>) -> Response {
    let Some(&table) = tables::ALL.iter().find(|&&t| t == layer) else {
        return (StatusCode::NOT_FOUND, format!("unknown layer {layer}")).into_response()
    };

    let encoded = with_store(store, move |store| {
        if !store.table_exists(table)? {
            return Ok(None)
        }
        Ok(Some(store.read_geometries(table)?.to_geojson()?))
    }).await;

    match encoded {
        Ok(Some(bytes)) => ([(header::CONTENT_TYPE, "application/json")], bytes).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, format!("layer {table} has not been generated")).into_response(),
        Err(e) => internal_error(e),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use geo::polygon;
    use sectorgrid::store::{Feature, Layer, MemStore, WriteMode};
    use tower::ServiceExt;

    use super::*;

    fn store_with_cells() -> MemStore {
        let mut store = MemStore::new();
        let cell = Feature::new(7, polygon![(x: 30.0, y: 50.0), (x: 30.1, y: 50.0), (x: 30.1, y: 50.1), (x: 30.0, y: 50.1)]);
        store.write_geometries(tables::GRID_CELLS, &Layer::new(4326, vec![cell]), WriteMode::Replace).unwrap();
        store
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(Request::get(uri).body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn stored_layer_is_served_as_feature_collection() {
        let (status, body) = get(router(store_with_cells()), "/api/grid_cells").await;
        assert_eq!(status, StatusCode::OK);

        let doc: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(doc["type"], "FeatureCollection");
        assert_eq!(doc["features"].as_array().unwrap().len(), 1);
        assert_eq!(doc["features"][0]["id"], 7);
        assert_eq!(doc["features"][0]["geometry"]["type"], "Polygon");
    }

    #[tokio::test]
    async fn missing_and_unknown_layers_are_not_found() {
        let (status, _) = get(router(store_with_cells()), "/api/sectors").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get(router(store_with_cells()), "/api/layers").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn index_lists_row_counts() {
        let (status, body) = get(router(store_with_cells()), "/").await;
        assert_eq!(status, StatusCode::OK);
        let doc: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(doc, json!({ "layers": { "grid_cells": 1 } }));
    }
}
