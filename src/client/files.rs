//! `/fileservice`: reading, writing, and deleting files on the controller.

use crate::catalog::FileResource;
use crate::error::Result;

use super::Client;

impl Client {
    /// `GET /fileservice/{directory}/{filename}`. The response body is the
    /// file's raw bytes, not an XML fragment.
    pub async fn get_file(&self, file: &FileResource) -> Result<Vec<u8>> {
        let response = self.decode_get(&file.uri()).await?;
        Ok(response.body_bytes().to_vec())
    }

    /// `PUT /fileservice/{directory}/{filename}`. Creates the file if it does
    /// not exist, and overwrites it if it does.
    pub async fn upload_file(&self, file: &FileResource, content: Vec<u8>) -> Result<()> {
        self.decode_put(&file.uri(), Some((content, "application/octet-stream")))
            .await?;
        Ok(())
    }

    /// `DELETE /fileservice/{directory}/{filename}`.
    pub async fn delete_file(&self, file: &FileResource) -> Result<()> {
        self.decode_delete(&file.uri()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_client;

    #[tokio::test]
    async fn get_file_needs_a_live_controller() {
        let client = test_client();
        let file = FileResource::new("HOME", "module.mod");
        assert!(client.get_file(&file).await.is_err());
    }
}
