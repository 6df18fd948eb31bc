use reqwest::Client;
use serde::Serialize;

#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

#[derive(Debug, Serialize)]
struct SendRequest {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
}

impl EmailClient {
    pub fn new(api_key: &str, from_email: &str, from_name: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        }
    }

    pub async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), String> {
        let request = SendRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            html: html.to_string(),
        };

        let response = self
            .client
            .post("https://api.resend.com/emails")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("email send failed: {e}"))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("email API error: {body}"));
        }

        tracing::debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }

    /// Confirmation email carrying a link to `GET /api/auth/confirmed_email/{token}`.
    pub async fn send_confirmation_email(
        &self,
        to: &str,
        base_url: &str,
        token: &str,
    ) -> Result<(), String> {
        let link = format!("{base_url}/api/auth/confirmed_email/{token}");
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2>Confirm your email</h2>
            <p>Click the link below to confirm your email address:</p>
            <p><a href="{link}">{link}</a></p>
            <p style="color: #666; margin-top: 20px;">This link expires in 24 hours. If you did not sign up, please ignore this email.</p>
            </div>"#
        );

        self.send_email(to, "Confirm your email", &html).await
    }
}
