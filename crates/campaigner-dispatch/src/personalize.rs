// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-recipient content rendering.
//!
//! `{name}` and `{email}` placeholders are substituted in the subject and the
//! HTML body, and a compliance footer with an unsubscribe link is appended.
//! Rendering is pure: the same campaign, recipient, and attempt always produce
//! the same message.

use std::collections::BTreeMap;

use campaigner_config::model::ContentConfig;
use campaigner_core::{Campaign, CampaignerError, IDEMPOTENCY_KEY_ARG, OutboundEmail, Recipient};
use reqwest::Url;

/// Renders campaign content for one recipient.
#[derive(Debug, Clone)]
pub struct Personalizer {
    default_from: String,
    unsubscribe_base: Url,
}

impl Personalizer {
    pub fn new(content: &ContentConfig) -> Result<Self, CampaignerError> {
        let unsubscribe_base = Url::parse(&content.unsubscribe_base_url).map_err(|e| {
            CampaignerError::Config(format!(
                "invalid content.unsubscribe_base_url {:?}: {e}",
                content.unsubscribe_base_url
            ))
        })?;
        Ok(Self {
            default_from: content.from_address.clone(),
            unsubscribe_base,
        })
    }

    /// Unsubscribe link keyed by address and campaign.
    pub fn unsubscribe_url(&self, address: &str, campaign_id: &str) -> String {
        let mut url = self.unsubscribe_base.clone();
        url.query_pairs_mut()
            .append_pair("email", address)
            .append_pair("campaign", campaign_id);
        url.into()
    }

    /// Build the outbound message for the recipient's next attempt.
    pub fn render(&self, campaign: &Campaign, recipient: &Recipient) -> OutboundEmail {
        let name = recipient.name.as_deref().unwrap_or_default();
        let subject = substitute(&campaign.subject, name, &recipient.address);
        let body = substitute(
            &campaign.html_body,
            &escape_html(name),
            &escape_html(&recipient.address),
        );
        let footer = format!(
            "<p style=\"font-size:12px;color:#888\">You are receiving this email because \
             you subscribed to updates. <a href=\"{}\">Unsubscribe</a></p>",
            escape_html(&self.unsubscribe_url(&recipient.address, &campaign.id))
        );
        let html_body = match body.rfind("</body>") {
            Some(idx) => format!("{}{footer}{}", &body[..idx], &body[idx..]),
            None => format!("{body}{footer}"),
        };

        let attempt = recipient.attempt_count + 1;
        let mut custom_args = BTreeMap::new();
        custom_args.insert("campaign_id".to_string(), campaign.id.clone());
        custom_args.insert("recipient_id".to_string(), recipient.id.to_string());
        custom_args.insert(
            IDEMPOTENCY_KEY_ARG.to_string(),
            format!("{}-{}-{attempt}", campaign.id, recipient.id),
        );

        OutboundEmail {
            to: recipient.address.clone(),
            from: campaign
                .from_address
                .clone()
                .unwrap_or_else(|| self.default_from.clone()),
            subject,
            html_body,
            custom_args,
        }
    }
}

fn substitute(template: &str, name: &str, email: &str) -> String {
    template.replace("{name}", name).replace("{email}", email)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
