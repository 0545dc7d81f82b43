use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response, StatusCode,
};
use shared::{
    domain::{ImageId, ImageRecord},
    error::{ApiError, ApiException},
    protocol::{ImageUpload, ListImagesQuery},
};
use tracing::debug;
use url::Url;

use crate::{ImageStore, StoreError, StoreResult};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Image store backed by an HTTP image service.
pub struct RemoteStore {
    http: Client,
    api_url: Url,
}

impl RemoteStore {
    pub fn new(api_url: &str) -> StoreResult<Self> {
        Self::with_client(Client::new(), api_url)
    }

    pub fn with_client(http: Client, api_url: &str) -> StoreResult<Self> {
        let api_url = Url::parse(api_url)
            .map_err(|err| StoreError::InvalidEndpoint(format!("{api_url}: {err}")))?;
        if api_url.cannot_be_a_base() {
            return Err(StoreError::InvalidEndpoint(api_url.to_string()));
        }
        Ok(Self { http, api_url })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Appends `segments` to the API path, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidEndpoint(self.api_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => StoreError::Api {
            status: status.as_u16(),
            source: ApiException::from(api_error),
        },
        Err(_) => StoreError::Status {
            status: status.as_u16(),
            body,
        },
    })
}

fn upload_form(upload: ImageUpload) -> StoreResult<Form> {
    let mime_type = upload
        .image
        .mime_type
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
    let image = Part::bytes(upload.image.bytes)
        .file_name(upload.image.filename)
        .mime_str(&mime_type)?;

    let form = upload
        .tags
        .into_iter()
        .fold(Form::new().text("title", upload.title), |form, tag| {
            form.text("tags", tag)
        });
    Ok(form.part("image", image))
}

#[async_trait]
impl ImageStore for RemoteStore {
    async fn list(&self, tag: Option<&str>) -> StoreResult<Vec<ImageRecord>> {
        let query = ListImagesQuery {
            tag: tag.map(str::to_string),
        };
        let response = self
            .http
            .get(self.endpoint(&["images"])?)
            .query(&query)
            .send()
            .await?;
        let records: Vec<ImageRecord> = check_status(response).await?.json().await?;
        debug!(tag = ?tag, count = records.len(), "remote: listed images");
        Ok(records)
    }

    async fn create(&self, upload: ImageUpload) -> StoreResult<ImageRecord> {
        let form = upload_form(upload)?;
        let response = self
            .http
            .post(self.endpoint(&["images"])?)
            .multipart(form)
            .send()
            .await?;
        let record: ImageRecord = check_status(response).await?.json().await?;
        debug!(id = %record.id, "remote: created image");
        Ok(record)
    }

    async fn delete(&self, id: &ImageId) -> StoreResult<()> {
        let response = self
            .http
            .delete(self.endpoint(&["images", id.as_str()])?)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(%id, "remote: delete of unknown image treated as success");
            return Ok(());
        }
        check_status(response).await?;
        debug!(%id, "remote: deleted image");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
