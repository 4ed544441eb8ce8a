use navgraph_types::api::{ExplorationStepRequest, ExplorationStepResponse};

use super::*;

impl ApiClient {
    /// Advance an exploration/validation run by one item.
    pub async fn exploration_step(
        &self,
        request: &ExplorationStepRequest,
    ) -> ApiResult<ExplorationStepResponse> {
        self.post_json("/server/exploration/next", request, "advancing exploration")
            .await
    }
}
