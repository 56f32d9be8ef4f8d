//! Application version single type (`application-version`)

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::ResourceClient;
use crate::cms::client::CmsTransport;
use crate::cms::models::{ApplicationVersion, ApplicationVersionRecord, ItemQuery};
use crate::cms::queries;
use crate::core::config::UpstreamFlavor;
use crate::core::context::RequestContext;
use crate::core::error::CmsResult;

pub const APP_VERSION_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Clone)]
pub struct AppVersionService {
    resource: ResourceClient,
}

impl AppVersionService {
    pub const ENDPOINT: &'static str = "application-version";

    pub fn new(transport: Arc<dyn CmsTransport>) -> Self {
        Self {
            resource: ResourceClient::new(transport, Self::ENDPOINT, APP_VERSION_CACHE_TTL),
        }
    }

    /// Current mobile and web versions
    #[instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn get(&self, ctx: &RequestContext, use_cache: bool) -> CmsResult<ApplicationVersion> {
        let entry = match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                self.resource
                    .rest_singleton::<ApplicationVersionRecord>(ctx, ItemQuery::new(), use_cache)
                    .await?
            }
            UpstreamFlavor::GraphQl => {
                self.resource
                    .graphql_item::<ApplicationVersionRecord>(
                        ctx,
                        queries::APPLICATION_VERSION,
                        "applicationVersion",
                        Self::ENDPOINT,
                        json!({}),
                        use_cache,
                    )
                    .await?
            }
        };

        let version = entry.attributes;
        Ok(ApplicationVersion {
            mobile_app_version: version.mobile_app_version,
            mobile_app_build_number: version.mobile_app_build_number,
            web_version: version.web_version,
        })
    }

    pub async fn invalidate_cache(&self, ctx: &RequestContext) -> CmsResult<()> {
        self.resource.invalidate(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::services::testing::{Call, FakeTransport};
    use crate::core::error::CmsError;
    use serde_json::json;

    #[tokio::test]
    async fn test_rest_singleton_numeric_build_number() {
        let transport = Arc::new(FakeTransport::new(UpstreamFlavor::Rest).rest(
            "application-version",
            Ok(json!({"data": {"id": 1, "attributes": {
                "MobileAppVersion": "2.4.0",
                "MobileAppBuildNumber": 87,
                "WebVersion": "1.9.2"
            }}})),
        ));
        let service = AppVersionService::new(transport.clone());

        let version = service.get(&RequestContext::new(), true).await.unwrap();
        assert_eq!(
            version,
            ApplicationVersion {
                mobile_app_version: "2.4.0".to_string(),
                mobile_app_build_number: "87".to_string(),
                web_version: "1.9.2".to_string(),
            }
        );
        assert_eq!(
            transport.calls()[0],
            Call::Singleton {
                endpoint: "application-version".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_graphql_missing_version_is_not_found() {
        let transport = FakeTransport::new(UpstreamFlavor::GraphQl)
            .graphql(queries::APPLICATION_VERSION, Ok(json!({"applicationVersion": null})));
        let service = AppVersionService::new(Arc::new(transport));

        let err = service.get(&RequestContext::new(), true).await.unwrap_err();
        assert_eq!(err, CmsError::not_found("application-version", "application-version"));
    }
}
