//! `/rw/rapid`: execution state and RAPID program control.

use crate::catalog::{RAPIDExecutionState, RAPIDTaskExecutionState};
use crate::error::{Error, Result};

use super::panel::find_class_text;
use super::Client;

impl Client {
    /// `GET /rw/rapid/execution`. Whether any RAPID task is currently
    /// running.
    pub async fn get_rapid_execution_state(&self) -> Result<RAPIDExecutionState> {
        let response = self.decode_get("/rw/rapid/execution").await?;
        let doc = response.document()?;
        let text = find_class_text(&doc, "ctrlexecstate")
            .ok_or_else(|| Error::protocol_simple("ctrlexecstate element missing from response"))?;
        RAPIDExecutionState::parse(text)
    }

    /// `GET /rw/rapid/tasks/{task}`. The execution state of one RAPID task.
    pub async fn get_rapid_task_execution_state(&self, task: &str) -> Result<RAPIDTaskExecutionState> {
        let path = format!("/rw/rapid/tasks/{task}");
        let response = self.decode_get(&path).await?;
        let doc = response.document()?;
        let text = find_class_text(&doc, "excstate")
            .ok_or_else(|| Error::protocol_simple("excstate element missing from response"))?;
        RAPIDTaskExecutionState::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_client;

    #[tokio::test]
    async fn get_rapid_execution_state_needs_a_live_controller() {
        let client = test_client();
        assert!(client.get_rapid_execution_state().await.is_err());
    }
}
