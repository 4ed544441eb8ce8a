use navgraph_types::api::{
    ActionDefinition, AvailableActionsResponse, ExecuteActionsRequest, StatusResponse,
    VerificationDefinition, VerificationTypesResponse,
};
use std::collections::BTreeMap;
use tracing::info;
use urlencoding::encode;

use super::*;

impl ApiClient {
    /// Execute actions on a device (`/server/action/execute`).
    pub async fn execute_actions(&self, request: &ExecuteActionsRequest) -> ApiResult<()> {
        info!(
            "Executing {} actions on {}/{}",
            request.actions.len(),
            request.host_name,
            request.device_id
        );
        let _: StatusResponse = self
            .post_json("/server/action/execute", request, "executing actions")
            .await?;
        Ok(())
    }

    /// Actions a host supports, grouped by category.
    pub async fn get_available_actions(
        &self,
        host_name: &str,
    ) -> ApiResult<BTreeMap<String, Vec<ActionDefinition>>> {
        let url = self.url(&format!(
            "/server/system/getAvailableActions?host_name={}",
            encode(host_name)
        ));
        let response: AvailableActionsResponse = self
            .send(self.client.get(&url), "loading available actions")
            .await?;
        info!(
            "Loaded {} action categories for host {}",
            response.actions.len(),
            host_name
        );
        Ok(response.actions)
    }

    /// Verification types a host supports, grouped by category.
    pub async fn get_verification_types(
        &self,
        host_name: &str,
    ) -> ApiResult<BTreeMap<String, Vec<VerificationDefinition>>> {
        let url = self.url(&format!(
            "/server/verification/getVerificationTypes?host_name={}",
            encode(host_name)
        ));
        let response: VerificationTypesResponse = self
            .send(self.client.get(&url), "loading verification types")
            .await?;
        info!(
            "Loaded {} verification categories for host {}",
            response.verifications.len(),
            host_name
        );
        Ok(response.verifications)
    }
}
