// web-server/src/static_files.rs
use actix_files::{Files, NamedFile};
use actix_web::dev::{fn_service, ServiceRequest, ServiceResponse};
use actix_web::{web, Error, HttpResponse};
use common::StaticFilesConfig;
use std::path::PathBuf;

// Unmatched routes get the index file so client-side routing works
async fn spa_index(req: ServiceRequest, index_path: PathBuf) -> Result<ServiceResponse, Error> {
    let (req, _) = req.into_parts();

    // Don't serve index.html for API routes
    if req.path().starts_with("/api/") {
        return Ok(ServiceResponse::new(req, HttpResponse::NotFound().finish()));
    }

    let res = match NamedFile::open(&index_path) {
        Ok(file) => file.into_response(&req),
        Err(e) => {
            tracing::warn!("Index file {} unavailable: {}", index_path.display(), e);
            HttpResponse::NotFound().finish()
        }
    };
    Ok(ServiceResponse::new(req, res))
}

/// Serve the built Mini App bundle with SPA fallback
pub fn configure(cfg: &mut web::ServiceConfig, config: &StaticFilesConfig) {
    if !config.enabled {
        tracing::info!("Static file serving disabled");
        return;
    }

    let root_path = PathBuf::from(&config.path);
    let index_path = root_path.join(&config.index);

    cfg.service(
        Files::new("/", root_path)
            .index_file(config.index.clone())
            .prefer_utf8(true)
            .use_etag(true)
            .use_last_modified(true)
            .default_handler(fn_service(move |req: ServiceRequest| {
                spa_index(req, index_path.clone())
            })),
    );
}
