// src/services/notification_service.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::error::AppError;

const EMAILJS_SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";
const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

pub const REPORT_EMAIL_SUBJECT: &str = "Reporte generado";
pub const REPORT_EMAIL_MESSAGE: &str = "Adjunto tu reporte en PDF";

fn http_client() -> Result<Client, AppError> {
    Ok(Client::builder().timeout(Duration::from_secs(30)).build()?)
}

// ---
// E-mail
// ---

#[async_trait]
pub trait ReportMailer: Send + Sync {
    async fn send_report(&self, to: &str, attachment_url: &str) -> Result<(), AppError>;
}

#[derive(Debug, Serialize)]
struct EmailTemplateParams<'a> {
    to_email: &'a str,
    subject: &'a str,
    message: &'a str,
    attachment: &'a str,
}

#[derive(Debug, Serialize)]
struct EmailSendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: EmailTemplateParams<'a>,
}

/// Envio pela API REST da EmailJS (o template monta o corpo do e-mail).
#[derive(Clone)]
pub struct EmailJsMailer {
    client: Client,
    service_id: String,
    template_id: String,
    public_key: String,
}

impl EmailJsMailer {
    pub fn new(service_id: &str, template_id: &str, public_key: &str) -> Result<Self, AppError> {
        Ok(Self {
            client: http_client()?,
            service_id: service_id.to_string(),
            template_id: template_id.to_string(),
            public_key: public_key.to_string(),
        })
    }

    fn request<'a>(&'a self, to: &'a str, attachment_url: &'a str) -> EmailSendRequest<'a> {
        EmailSendRequest {
            service_id: &self.service_id,
            template_id: &self.template_id,
            user_id: &self.public_key,
            template_params: EmailTemplateParams {
                to_email: to,
                subject: REPORT_EMAIL_SUBJECT,
                message: REPORT_EMAIL_MESSAGE,
                attachment: attachment_url,
            },
        }
    }
}

#[async_trait]
impl ReportMailer for EmailJsMailer {
    async fn send_report(&self, to: &str, attachment_url: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(EMAILJS_SEND_URL)
            .json(&self.request(to, attachment_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("EmailJS respondeu {}: {}", status, text);
            return Err(AppError::Remote(format!("EmailJS ({status}): {text}")));
        }

        tracing::info!("📧 Reporte enviado por correo a {}", to);
        Ok(())
    }
}

// ---
// WhatsApp
// ---

#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// Envia a mídia e devolve o identificador da mensagem no provedor.
    async fn send_media(&self, to: &str, media_url: &str) -> Result<String, AppError>;
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioError {
    message: String,
}

#[derive(Clone)]
pub struct TwilioWhatsApp {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioWhatsApp {
    pub fn new(account_sid: &str, auth_token: &str, from_number: &str) -> Result<Self, AppError> {
        Ok(Self {
            client: http_client()?,
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
        })
    }

    fn form(&self, to: &str, media_url: &str) -> Vec<(&'static str, String)> {
        vec![
            ("From", format!("whatsapp:{}", self.from_number)),
            ("To", format!("whatsapp:{to}")),
            ("MediaUrl", media_url.to_string()),
        ]
    }
}

#[async_trait]
impl MessagingProvider for TwilioWhatsApp {
    async fn send_media(&self, to: &str, media_url: &str) -> Result<String, AppError> {
        let url = format!("{}/Accounts/{}/Messages.json", TWILIO_API_BASE, self.account_sid);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&self.form(to, media_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TwilioError>(&text)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(AppError::Remote(message));
        }

        let message: TwilioMessage = response.json().await?;
        tracing::info!("📲 WhatsApp enviado a {} (sid {})", to, message.sid);
        Ok(message.sid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_request_uses_the_fixed_template_texts() {
        let mailer = EmailJsMailer::new("service_x", "template_y", "public_z").unwrap();

        let body = serde_json::to_value(mailer.request("ana@limpieza.com", "https://files/r.pdf")).unwrap();

        assert_eq!(body["user_id"], "public_z");
        assert_eq!(body["template_params"]["to_email"], "ana@limpieza.com");
        assert_eq!(body["template_params"]["subject"], "Reporte generado");
        assert_eq!(body["template_params"]["message"], "Adjunto tu reporte en PDF");
        assert_eq!(body["template_params"]["attachment"], "https://files/r.pdf");
    }

    #[test]
    fn whatsapp_numbers_get_the_channel_prefix() {
        let twilio = TwilioWhatsApp::new("AC123", "token", "+14155238886").unwrap();

        let form = twilio.form("+51999999999", "https://files/r.pdf");

        assert_eq!(form[0], ("From", "whatsapp:+14155238886".to_string()));
        assert_eq!(form[1], ("To", "whatsapp:+51999999999".to_string()));
        assert_eq!(form[2], ("MediaUrl", "https://files/r.pdf".to_string()));
    }
}
