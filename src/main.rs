use gatekeeper::application_port::AuthError;
use gatekeeper::client::AuthClient;
use gatekeeper::domain_model::Credentials;
use gatekeeper::logger::*;
use gatekeeper::settings::*;
use serde_json::Value;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    logger.reload_from_config(&LogConfig::from(&project_settings))?;

    let client = AuthClient::try_new(&project_settings)?;
    client.session.initialize().await;

    let outcome = run(&client, cli.command).await;
    match outcome {
        Ok(code) => Ok(code),
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(client: &AuthClient, command: Command) -> Result<ExitCode, AuthError> {
    let gateway = &client.gateway;

    let response: Option<Value> = match command {
        Command::Login { email, password } => {
            let session = client.session.login(Credentials { email, password }).await?;
            session.user.map(|user| serde_json::json!(user))
        }
        Command::Whoami => match client.session.current_user() {
            Some(user) => Some(serde_json::json!(user)),
            None => return Err(AuthError::Unauthorized),
        },
        Command::HasRole { role } => {
            return Ok(if client.session.has_role(&role) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        Command::Get { path } => gateway.get(&path).await?,
        Command::Post { path, body } => gateway.post(&path, &parse_body(body)?).await?,
        Command::Put { path, body } => gateway.put(&path, &parse_body(body)?).await?,
        Command::Delete { path } => gateway.delete(&path).await?,
        Command::Logout => {
            client.session.logout().await;
            None
        }
    };

    if let Some(value) = response {
        let pretty = serde_json::to_string_pretty(&value)
            .map_err(|e| AuthError::Decode(e.to_string()))?;
        println!("{pretty}");
    }
    Ok(ExitCode::SUCCESS)
}

fn parse_body(body: Option<String>) -> Result<Value, AuthError> {
    match body {
        None => Ok(Value::Null),
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| AuthError::Encode(format!("--body is not valid JSON: {e}"))),
    }
}
