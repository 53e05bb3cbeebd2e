use anyhow::Context;
use async_trait::async_trait;

use super::MessagingProvider;

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v17.0";

pub struct WhatsAppProvider {
    token: String,
    phone_number_id: String,
    client: reqwest::Client,
}

impl WhatsAppProvider {
    pub fn new(token: String, phone_number_id: String) -> Self {
        Self {
            token,
            phone_number_id,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MessagingProvider for WhatsAppProvider {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()> {
        let url = format!("{GRAPH_API_BASE}/{}/messages", self.phone_number_id);

        self.client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "text",
                "text": { "body": body },
            }))
            .send()
            .await
            .context("failed to send WhatsApp message")?
            .error_for_status()
            .context("WhatsApp API returned error")?;

        Ok(())
    }
}
