//! Election endpoints

use crate::api::{ApiRequest, RequestPipeline};
use crate::error::{Error, Result};

use super::model::{Candidate, Election, ElectionStatus, LifecycleAction, NewElection, Page, Party};

/// Stateless access to `/elections`
#[derive(Clone)]
pub struct ElectionService {
    api: RequestPipeline,
}

impl ElectionService {
    pub fn new(api: RequestPipeline) -> Self {
        Self { api }
    }

    /// One page of all elections, `page` zero-based
    pub async fn list(&self, page: u32, size: u32) -> Result<Page<Election>> {
        let request = ApiRequest::get(["elections"])
            .with_query("page", page.to_string())
            .with_query("size", size.to_string());
        self.api.send_json(request).await
    }

    pub async fn active(&self) -> Result<Vec<Election>> {
        self.api.send_json(ApiRequest::get(["elections", "active"])).await
    }

    pub async fn by_status(&self, status: ElectionStatus) -> Result<Vec<Election>> {
        self.api
            .send_json(ApiRequest::get(["elections", "status", status.as_str()]))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Election> {
        self.api.send_json(ApiRequest::get(["elections", id])).await
    }

    /// Create an election; the backend sets its status to `CREATED`
    pub async fn create(&self, request: &NewElection) -> Result<Election> {
        request.validate()?;
        let body = serde_json::to_value(request)?;
        let election: Election = self
            .api
            .send_json(ApiRequest::post(["elections"]).with_json(body))
            .await?;

        tracing::info!("Created election {} ({})", election.name, election.id);
        Ok(election)
    }

    pub async fn candidates(&self, id: &str) -> Result<Vec<Candidate>> {
        self.api
            .send_json(ApiRequest::get(["elections", id, "candidates"]))
            .await
    }

    pub async fn parties(&self, id: &str) -> Result<Vec<Party>> {
        self.api
            .send_json(ApiRequest::get(["elections", id, "parties"]))
            .await
    }

    /// `CREATED -> CANDIDATES_IMPORTED`, optionally from an external source
    pub async fn import_candidates(&self, id: &str, data_source_url: Option<&str>) -> Result<Election> {
        self.transition(id, LifecycleAction::ImportCandidates, data_source_url)
            .await
    }

    /// `CANDIDATES_IMPORTED -> STARTED`
    pub async fn start_election(&self, id: &str) -> Result<Election> {
        self.transition(id, LifecycleAction::Start, None).await
    }

    /// `STARTED -> CLOSED`
    pub async fn close_election(&self, id: &str) -> Result<Election> {
        self.transition(id, LifecycleAction::Close, None).await
    }

    /// Issue a transition. The backend is authoritative: its domain
    /// rejections come back as [`Error::InvalidTransition`].
    pub(crate) async fn transition(
        &self,
        id: &str,
        action: LifecycleAction,
        data_source_url: Option<&str>,
    ) -> Result<Election> {
        let mut request = ApiRequest::post(["elections", id, action.endpoint()]);
        if let Some(url) = data_source_url {
            request = request.with_query("dataSourceUrl", url);
        }

        match self.api.send_json::<Election>(request).await {
            Ok(election) => {
                tracing::info!("Election {}: {} -> {}", id, action, election.status);
                Ok(election)
            }
            Err(Error::ServerError { status: 400 | 409 | 422, message }) => {
                tracing::warn!("Election {}: {} rejected: {}", id, action, message);
                Err(Error::InvalidTransition(message))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{election_body, respond, seeded_session, ScriptedTransport};
    use crate::election::ElectionType;
    use serde_json::json;

    async fn service(transport: std::sync::Arc<ScriptedTransport>) -> ElectionService {
        let session = seeded_session(transport.clone(), "access-1", "refresh-1").await;
        ElectionService::new(RequestPipeline::new(transport, session))
    }

    #[tokio::test]
    async fn test_list_pages() {
        let transport = ScriptedTransport::new(|req| {
            assert_eq!(req.query, vec![("page".to_string(), "1".to_string()), ("size".to_string(), "20".to_string())]);
            respond(200, json!({
                "content": [election_body("e-21", "CREATED")],
                "totalElements": 21, "totalPages": 2, "number": 1, "size": 20
            }))
        });
        let service = service(transport).await;

        let page = service.list(1, 20).await.unwrap();
        assert_eq!(page.content.len(), 1);
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn test_by_status_path() {
        let transport = ScriptedTransport::new(|_| respond(200, json!([election_body("e-1", "CLOSED")])));
        let service = service(transport.clone()).await;

        let closed = service.by_status(ElectionStatus::Closed).await.unwrap();
        assert_eq!(closed[0].status, ElectionStatus::Closed);
        assert_eq!(transport.requests()[0].path(), "/elections/status/CLOSED");
    }

    #[tokio::test]
    async fn test_import_with_data_source() {
        let transport = ScriptedTransport::new(|req| {
            assert_eq!(req.path(), "/elections/e-1/import-candidates");
            assert_eq!(req.query, vec![("dataSourceUrl".to_string(), "https://cec.example/lists".to_string())]);
            respond(200, election_body("e-1", "CANDIDATES_IMPORTED"))
        });
        let service = service(transport).await;

        let election = service
            .import_candidates("e-1", Some("https://cec.example/lists"))
            .await
            .unwrap();
        assert_eq!(election.status, ElectionStatus::CandidatesImported);
    }

    #[tokio::test]
    async fn test_backend_rejection_is_invalid_transition() {
        let transport = ScriptedTransport::new(|_| {
            respond(400, json!({
                "status": 400,
                "error": "Election error",
                "message": "Election must have candidates imported before starting"
            }))
        });
        let service = service(transport).await;

        let err = service.start_election("e-1").await.unwrap_err();
        assert_eq!(
            err,
            Error::InvalidTransition("Election must have candidates imported before starting".into())
        );
    }

    #[tokio::test]
    async fn test_missing_election_is_not_found() {
        let transport = ScriptedTransport::new(|_| respond(404, json!({ "message": "Election not found: nope" })));
        let service = service(transport).await;

        assert!(matches!(service.close_election("nope").await, Err(Error::NotFound(_))));
        assert!(matches!(service.get("nope").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_validates_before_sending() {
        let transport = ScriptedTransport::new(|req| {
            assert_eq!(req.body.as_ref().unwrap()["name"], "Local Elections 2027");
            respond(201, election_body("e-9", "CREATED"))
        });
        let service = service(transport.clone()).await;

        let mut request = NewElection {
            name: String::new(),
            description: None,
            election_type: ElectionType::LocalGovernment,
            election_date: "2027-05-10T07:00:00".into(),
            registration_deadline: "2027-04-10T23:59:00".into(),
            start_date: None,
            end_date: None,
            external_data_source: None,
        };
        assert!(matches!(service.create(&request).await, Err(Error::Validation(_))));
        assert_eq!(transport.total_calls(), 0);

        request.name = "Local Elections 2027".into();
        let created = service.create(&request).await.unwrap();
        assert_eq!(created.status, ElectionStatus::Created);
    }
}
