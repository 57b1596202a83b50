// src/db/storage_repo.rs

use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;

use crate::common::error::AppError;

/// Bucket de objetos onde os relatórios gerados ficam publicados.
#[async_trait]
pub trait ReportStorage: Send + Sync {
    /// Sobe (ou sobrescreve) o arquivo e devolve a URL pública dele.
    async fn upload(&self, file_name: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, AppError>;

    fn public_url(&self, file_name: &str) -> String;
}

// Storage REST da Supabase: /storage/v1/object/{bucket}/{arquivo}
#[derive(Clone)]
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, service_key: &str, bucket: &str) -> Result<Self, AppError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            bucket: bucket.to_string(),
        })
    }
}

#[async_trait]
impl ReportStorage for SupabaseStorage {
    async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, file_name);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("x-upsert", "true")
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Remote(format!(
                "no se pudo subir {file_name} ({status}): {detail}"
            )));
        }

        Ok(self.public_url(file_name))
    }

    fn public_url(&self, file_name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, file_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_points_at_the_public_bucket_path() {
        let storage = SupabaseStorage::new("https://demo.supabase.co/", "key", "reportes").unwrap();

        assert_eq!(
            storage.public_url("inventario_2025_12_12.pdf"),
            "https://demo.supabase.co/storage/v1/object/public/reportes/inventario_2025_12_12.pdf"
        );
    }
}
