//! `/rw/panel`: controller state, operation mode, and speed ratio.

use crate::catalog::{ControllerState, OperationMode};
use crate::error::{Error, Result};

use super::Client;

impl Client {
    /// `GET /rw/panel/ctrlstate`.
    pub async fn get_controller_state(&self) -> Result<ControllerState> {
        let response = self.decode_get("/rw/panel/ctrlstate").await?;
        let doc = response.document()?;
        let text = find_class_text(&doc, "ctrlstate")
            .ok_or_else(|| Error::protocol_simple("ctrlstate element missing from response"))?;
        ControllerState::parse(text)
    }

    /// `POST /rw/panel/ctrlstate?action=setctrlstate`.
    pub async fn set_controller_state(&self, state: ControllerState) -> Result<()> {
        let body = format!("ctrl-state={}", state.to_wire_str());
        self.decode_post(
            "/rw/panel/ctrlstate?action=setctrlstate",
            Some((body.into_bytes(), "application/x-www-form-urlencoded")),
        )
        .await?;
        Ok(())
    }

    /// `GET /rw/panel/opmode`.
    pub async fn get_operation_mode(&self) -> Result<OperationMode> {
        let response = self.decode_get("/rw/panel/opmode").await?;
        let doc = response.document()?;
        let text = find_class_text(&doc, "opmode")
            .ok_or_else(|| Error::protocol_simple("opmode element missing from response"))?;
        OperationMode::parse(text)
    }

    /// `GET /rw/panel/speedratio`.
    pub async fn get_speed_ratio(&self) -> Result<u8> {
        let response = self.decode_get("/rw/panel/speedratio").await?;
        let doc = response.document()?;
        let text = find_class_text(&doc, "speedratio")
            .ok_or_else(|| Error::protocol_simple("speedratio element missing from response"))?;
        text.parse::<u8>()
            .map_err(|_| Error::protocol_simple(format!("speedratio value {text:?} is not an integer")))
    }

    /// `POST /rw/panel/speedratio?action=setspeedratio`. `ratio` must be
    /// between 0 and 100 inclusive; out-of-range values never reach the
    /// network.
    pub async fn set_speed_ratio(&self, ratio: u8) -> Result<()> {
        if ratio > 100 {
            return Err(Error::invalid_argument(format!(
                "speed ratio {ratio} is out of range 0..=100"
            )));
        }
        let body = format!("speed-ratio={ratio}");
        self.decode_post(
            "/rw/panel/speedratio?action=setspeedratio",
            Some((body.into_bytes(), "application/x-www-form-urlencoded")),
        )
        .await?;
        Ok(())
    }
}

/// Find the text of the first `<span class="{class}">` (or any element
/// carrying that class) under the response body.
pub(super) fn find_class_text<'d>(doc: &'d roxmltree::Document<'d>, class: &str) -> Option<&'d str> {
    doc.descendants()
        .find(|n| n.attribute("class") == Some(class))
        .and_then(|n| n.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_client;

    #[test]
    fn finds_class_text() {
        let xml = r#"<html><body><div><span class="ctrlstate">motoron</span></div></body></html>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        assert_eq!(find_class_text(&doc, "ctrlstate"), Some("motoron"));
        assert_eq!(find_class_text(&doc, "missing"), None);
    }

    #[tokio::test]
    async fn set_speed_ratio_rejects_out_of_range_before_any_request() {
        let client = test_client();
        let err = client.set_speed_ratio(101).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
