use super::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(name = "gatekeeper", version, about = "Token-authenticated API client")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and store the issued tokens
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "GATEKEEPER_PASSWORD")]
        password: String,
    },
    /// Show the signed-in user
    Whoami,
    /// Exit with status 0 when the signed-in user has the role
    HasRole { role: String },
    Get { path: String },
    Post {
        path: String,
        #[arg(long)]
        body: Option<String>,
    },
    Put {
        path: String,
        #[arg(long)]
        body: Option<String>,
    },
    Delete { path: String },
    /// Revoke the refresh token and forget the session
    Logout,
}
