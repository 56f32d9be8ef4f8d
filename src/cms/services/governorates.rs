//! Governorate service (`governorates`)

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::aggregate::graphql_variables;
use super::cities::city_ref;
use super::ResourceClient;
use crate::cms::client::CmsTransport;
use crate::cms::models::{CollectionQuery, Entry, Governorate, GovernorateRecord, ItemQuery, Paginated, PlaceRef};
use crate::cms::queries;
use crate::core::config::UpstreamFlavor;
use crate::core::context::RequestContext;
use crate::core::error::CmsResult;

/// Reference data, effectively static
pub const GOVERNORATE_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
pub struct GovernorateService {
    resource: ResourceClient,
}

impl GovernorateService {
    pub const ENDPOINT: &'static str = "governorates";

    pub fn new(transport: Arc<dyn CmsTransport>) -> Self {
        Self {
            resource: ResourceClient::new(transport, Self::ENDPOINT, GOVERNORATE_CACHE_TTL),
        }
    }

    /// Governorates with their cities
    #[instrument(skip(self, ctx, query), fields(trace_id = %ctx.trace_id))]
    pub async fn get_all(
        &self,
        ctx: &RequestContext,
        query: CollectionQuery,
        use_cache: bool,
    ) -> CmsResult<Paginated<Governorate>> {
        match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                let envelope = self
                    .resource
                    .rest_collection::<GovernorateRecord>(ctx, query.or_populate("cities"), use_cache)
                    .await?;
                let pagination = envelope.pagination();
                Ok(Paginated::new(envelope.data.iter().map(governorate).collect(), pagination))
            }
            UpstreamFlavor::GraphQl => {
                let governorates = self
                    .resource
                    .graphql_list::<GovernorateRecord>(
                        ctx,
                        queries::GOVERNORATES,
                        "governorates",
                        graphql_variables(&query),
                        use_cache,
                    )
                    .await?;
                Ok(Paginated::new(governorates.iter().map(governorate).collect(), None))
            }
        }
    }

    #[instrument(skip(self, ctx, query), fields(trace_id = %ctx.trace_id))]
    pub async fn get_by_id(
        &self,
        ctx: &RequestContext,
        id: &str,
        query: ItemQuery,
        use_cache: bool,
    ) -> CmsResult<Governorate> {
        let entry = match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                self.resource
                    .rest_item::<GovernorateRecord>(ctx, id, query.or_populate("cities"), use_cache)
                    .await?
            }
            UpstreamFlavor::GraphQl => {
                self.resource
                    .graphql_item::<GovernorateRecord>(
                        ctx,
                        queries::GOVERNORATE_BY_ID,
                        "governorate",
                        id,
                        json!({ "documentId": id }),
                        use_cache,
                    )
                    .await?
            }
        };
        Ok(governorate(&entry))
    }

    pub async fn invalidate_cache(&self, ctx: &RequestContext) -> CmsResult<()> {
        self.resource.invalidate(ctx).await
    }
}

fn governorate(entry: &Entry<GovernorateRecord>) -> Governorate {
    Governorate {
        id: entry.identifier(),
        name: entry.attributes.name.clone(),
        cities: entry.attributes.cities.iter().map(city_ref).collect(),
    }
}

pub(crate) fn governorate_ref(entry: &Entry<GovernorateRecord>) -> PlaceRef {
    PlaceRef {
        id: entry.identifier(),
        name: entry.attributes.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::services::testing::{Call, FakeTransport};
    use serde_json::json;

    #[tokio::test]
    async fn test_rest_governorates_with_cities() {
        let transport = Arc::new(FakeTransport::new(UpstreamFlavor::Rest).rest(
            "governorates",
            Ok(json!({
                "data": [{
                    "id": 1,
                    "attributes": {
                        "Name": "Giza",
                        "cities": {"data": [
                            {"id": 10, "attributes": {"Name": "Dokki"}},
                            {"id": 11, "attributes": {"Name": "Sheikh Zayed"}}
                        ]}
                    }
                }],
                "meta": {"pagination": {"page": 1, "pageSize": 25, "pageCount": 1, "total": 1}}
            })),
        ));
        let service = GovernorateService::new(transport.clone());

        let page = service
            .get_all(&RequestContext::new(), CollectionQuery::new(), true)
            .await
            .unwrap();

        let giza = &page.data[0];
        assert_eq!(giza.name, "Giza");
        assert_eq!(
            giza.cities,
            vec![
                PlaceRef { id: "10".to_string(), name: "Dokki".to_string() },
                PlaceRef { id: "11".to_string(), name: "Sheikh Zayed".to_string() },
            ]
        );

        match &transport.calls()[0] {
            Call::Collection { query, .. } => assert_eq!(query.populate, "cities"),
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_graphql_governorate_by_id() {
        let transport = FakeTransport::new(UpstreamFlavor::GraphQl).graphql(
            queries::GOVERNORATE_BY_ID,
            Ok(json!({"governorate": {"documentId": "g1", "Name": "Alexandria", "cities": []}})),
        );
        let service = GovernorateService::new(Arc::new(transport));

        let governorate = service
            .get_by_id(&RequestContext::new(), "g1", ItemQuery::new(), true)
            .await
            .unwrap();
        assert_eq!(governorate.id, "g1");
        assert!(governorate.cities.is_empty());
    }
}
