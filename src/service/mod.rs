//! Documentation REST Service
//!
//! Exposes the kernel over HTTP. Callers identify themselves with the
//! `X-Docs-User`/`X-Docs-Groups` headers and select a version with
//! `X-Docs-Version`.
//!
//! ## Endpoints
//!
//! - `GET /api/manuals/:version` - Manuals with a TOC for a version
//! - `GET /api/topics` - Source topics with conflicts against a target (authors)
//! - `POST /api/jobs` - Issue a job id (authors)
//! - `GET /api/jobs/:id` - Job progress text
//! - `POST /api/jobs/:id/process` - Run a branch/inherit batch (authors)
//! - `GET /api/conflicts` - Units already serving a target version
//! - `POST /api/tags/detach` - Detach version tags from a unit (authors)
//! - `POST /api/toc` - Save a TOC document (authors)
//! - `GET /api/nav/:version` - Navigation summary
//! - `POST /api/reload` - Re-read definitions (authors)
//! - `GET /resolve?path=` - Resolve a documentation path
//! - `GET /Documentation/*path` - Serve or redirect a documentation path
//! - `GET /health`, `/health/live`, `/health/ready` - Health probes

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_batch_metrics, record_resolution};
pub use routes::{create_router, AppState};
pub use state::{request_context, ServiceState};
