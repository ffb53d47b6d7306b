//! Operator-initiated sends. These are the only paths that push or multicast;
//! webhook traffic is answered with replies alone.

use std::{sync::Arc, time::Duration};

use {
    anyhow::{Context, Result},
    linebot_config::LineBotConfig,
    linebot_line::{
        ApiError, ChannelCredentials, DeliveryRequest, LineClient, MessagingApi,
        OutboundMessage, SendOptions, redact::mask_id,
    },
    tracing::info,
    uuid::Uuid,
};

fn client_from(config: &LineBotConfig) -> Result<LineClient> {
    let (token, secret) = config
        .channel
        .credentials()
        .context("set CHANNEL_ACCESS_TOKEN and CHANNEL_SECRET (or [channel] in linebot.toml)")?;
    let credentials = Arc::new(ChannelCredentials::from_secrets(token, secret));
    Ok(LineClient::with_base_url(
        credentials,
        &config.api.base_url,
        Duration::from_secs(config.api.timeout_secs),
    )?)
}

fn options(silent: bool, retry_key: Uuid) -> SendOptions {
    let options = SendOptions::keyed(retry_key);
    if silent { options.silent() } else { options }
}

/// Deliver once. On an ambiguous failure, tell the operator which retry key to
/// pass back so LINE can drop the duplicate.
async fn send(client: &LineClient, request: &DeliveryRequest, retry_key: Uuid) -> Result<()> {
    match client.deliver(request).await {
        Ok(()) => Ok(()),
        Err(e @ ApiError::AmbiguousFailure { .. }) => {
            eprintln!("Delivery outcome unknown. Re-run with `--retry-key {retry_key}` to retry safely.");
            Err(e.into())
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn push(
    config: &LineBotConfig,
    to: String,
    message: String,
    silent: bool,
    retry_key: Option<Uuid>,
) -> Result<()> {
    let client = client_from(config)?;
    let retry_key = retry_key.unwrap_or_else(Uuid::new_v4);
    let request = DeliveryRequest::push(to.clone(), vec![OutboundMessage::text(message)])
        .with_options(options(silent, retry_key));
    send(&client, &request, retry_key).await?;
    info!(to = %mask_id(&to), %retry_key, "push sent");
    eprintln!("Sent.");
    Ok(())
}

pub async fn multicast(
    config: &LineBotConfig,
    to: Vec<String>,
    message: String,
    silent: bool,
    retry_key: Option<Uuid>,
) -> Result<()> {
    let client = client_from(config)?;
    let recipients = to.len();
    let retry_key = retry_key.unwrap_or_else(Uuid::new_v4);
    let request = DeliveryRequest::multicast(to, vec![OutboundMessage::text(message)])
        .with_options(options(silent, retry_key));
    send(&client, &request, retry_key).await?;
    info!(recipients, %retry_key, "multicast sent");
    eprintln!("Sent to {recipients} recipient(s).");
    Ok(())
}

pub async fn profile(config: &LineBotConfig, user_id: String) -> Result<()> {
    let client = client_from(config)?;
    let profile = client.fetch_profile(&user_id).await?;
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}
