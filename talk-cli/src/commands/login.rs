//! Log in with a pincode confirmed on another device.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use talk_client::{ClientConfig, HttpTransport, TalkClient, Transport};
use tracing::info;

use crate::config::Settings;

/// Run the login command.
pub async fn run(
    data_dir: &Path,
    config: ClientConfig,
    id: Option<String>,
    remember: bool,
) -> Result<()> {
    let mut settings = Settings::load(data_dir).await?;

    let identifier = match id.or_else(|| settings.identifier.clone()) {
        Some(identifier) => identifier,
        None => prompt_line("E-mail or user id: ")?,
    };
    let secret = match settings.remembered_secret(&identifier) {
        Some(secret) => secret.to_string(),
        None => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    let transport = HttpTransport::new(&config);
    let client = TalkClient::new(config, transport);

    let token = execute(&client, &identifier, &secret, |pincode| {
        println!("Enter pincode {} on your phone (Ctrl-C to cancel)", pincode);
    })
    .await?;

    settings.record_login(&identifier, &secret, token, remember);
    settings.save(data_dir).await?;

    println!("Logged in as {}", identifier);
    Ok(())
}

/// Request a pincode, show it, and wait for confirmation.
///
/// Ctrl-C cancels the wait. Returns the session token.
pub async fn execute<T, F>(
    client: &TalkClient<T>,
    identifier: &str,
    secret: &str,
    show_pincode: F,
) -> Result<String>
where
    T: Transport + 'static,
    F: FnOnce(&str),
{
    let pending = client
        .login(identifier, secret)
        .await
        .context("Login failed")?;
    show_pincode(pending.pincode());

    let cancel = pending.cancel_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = pending.wait().await;
    ctrl_c.abort();

    let token = result.context("Login failed")?;
    info!("Login complete");
    Ok(token)
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;
    let line = line.trim().to_string();
    if line.is_empty() {
        anyhow::bail!("No identifier given");
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use talk_client::{DeviceInfo, MockTransport};
    use talk_types::{LoginResult, LoginResultType, Reply};

    // 512-bit modulus, exponent 65537
    const TEST_MODULUS: &str = "c5062b58d8539c765e1e5dbaf14cf75dd56c2e13105fecfd1a930bbb5948ff32\
                                8f126abe779359ca59bca752c308d110cf5ef8b0c9e1c7ebb5d4c08d1d3f4f7f";

    fn script(transport: &MockTransport, final_result: LoginResultType) {
        transport.queue_json(
            "http://gd2.line.naver.jp/authct/v1/keys/line",
            serde_json::json!({
                "session_key": "sk",
                "rsa_key": format!("k,{},10001", TEST_MODULUS),
            }),
        );
        transport.queue_reply(
            "loginWithIdentityCredentialForCertificate",
            Reply::Login(LoginResult {
                result_type: LoginResultType::Success,
                auth_token: None,
                verifier: Some("v1".into()),
                pin_code: Some("1234".into()),
            }),
        );
        transport.queue_json(
            "http://gd2.line.naver.jp/Q",
            serde_json::json!({"result": {"verifier": "v2"}}),
        );
        transport.queue_reply(
            "loginWithVerifierForCertificate",
            Reply::Login(LoginResult {
                result_type: final_result,
                auth_token: Some("new-token".into()),
                verifier: None,
                pin_code: None,
            }),
        );
    }

    #[tokio::test]
    async fn login_shows_pincode_and_returns_token() {
        let transport = MockTransport::new();
        let client = crate::commands::testing::client(&transport).await;
        client.logout().await;
        script(&transport, LoginResultType::Success);

        let mut shown = None;
        let token = execute(&client, "me@example.com", "pw", |pin| {
            shown = Some(pin.to_string())
        })
        .await
        .unwrap();

        assert_eq!(shown.as_deref(), Some("1234"));
        assert_eq!(token, "new-token");
        assert!(client.session().is_authenticated().await);
    }

    #[tokio::test]
    async fn rejected_login_is_an_error() {
        let transport = MockTransport::new();
        let client = TalkClient::new(ClientConfig::default(), transport.clone())
            .with_device(DeviceInfo::new("10.0.0.1", "test"));
        script(&transport, LoginResultType::RequireDeviceConfirm);

        let result = execute(&client, "me@example.com", "pw", |_| {}).await;

        assert!(result.is_err());
        assert!(!client.session().is_authenticated().await);
    }
}
