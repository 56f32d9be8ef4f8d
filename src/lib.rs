//! # CMS Gateway Library
//!
//! The CMS access layer of the API gateway: a caching client for a headless
//! CMS (Strapi REST v4/v5 or GraphQL) and one service per content type that
//! normalizes upstream records into stable response contracts.
//!
//! ## Modules
//! - [`core`]: error type, configuration and the per-request context
//! - [`caching`]: cache stores, cache keys and single-flight deduplication
//! - [`cms`]: transport client, models and resource services
//! - [`observability`]: structured logging setup
//!
//! ## Usage Example
//! ```rust,no_run
//! use cms_gateway::{CmsServices, GatewayCmsConfig, RequestContext};
//!
//! # async fn example() -> cms_gateway::CmsResult<()> {
//! let config = GatewayCmsConfig::load_from_file("config/cms.yaml").await?;
//! cms_gateway::observability::init_logging(&config.logging);
//!
//! let services = CmsServices::connect(&config).await?;
//! let ctx = RequestContext::new();
//! let model = services.car_models.get_detailed_by_id(&ctx, "42", true).await?;
//! println!("{} from {}", model.title, model.price_from);
//! # Ok(())
//! # }
//! ```

pub mod caching;
pub mod cms;
pub mod core;
pub mod observability;

/// Error type shared by every CMS operation
pub use core::error::{CmsError, CmsResult};

pub use core::config::{CmsConfig, GatewayCmsConfig, UpstreamFlavor};
pub use core::context::RequestContext;

/// Transport client and the service bundle built on it
pub use cms::{CmsClient, CmsServices, CmsTransport};
