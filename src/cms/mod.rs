//! # CMS Access Module
//!
//! Client and resource services for the upstream headless CMS.
//!
//! ## Architecture
//! 1. **Transport** ([`client`]): REST and GraphQL requests with cache-around-fetch
//! 2. **Models** ([`models`]): upstream envelopes and records, response contracts
//! 3. **Services** ([`services`]): one service per resource plus aggregate views
//!
//! ## Usage Example
//! ```rust,no_run
//! use cms_gateway::cms::CmsServices;
//! use cms_gateway::core::config::GatewayCmsConfig;
//! use cms_gateway::core::context::RequestContext;
//!
//! # async fn example() -> cms_gateway::core::error::CmsResult<()> {
//! let config = GatewayCmsConfig::from_env()?;
//! let services = CmsServices::connect(&config).await?;
//!
//! let ctx = RequestContext::new().with_locale("ar");
//! let brands = services.brands.get_simplified(&ctx, true).await?;
//! println!("{} brands", brands.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod models;
pub mod queries;
pub mod services;

pub use crate::core::config::UpstreamFlavor;
pub use client::{CmsClient, CmsTransport, GraphQlRequest};
pub use services::CmsServices;
