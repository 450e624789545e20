use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::auth::FlowError;
use crate::core::models::{AuthorizationRequest, Credentials};
use crate::core::types::{ClientId, ClientSecret, RedirectUri, Scope};
use crate::flow::{browser_authorize, FlowSettings};
use crate::http::client::{ApiClient, RequestError};
use crate::store::{ConfigError, ConfigFile, DEFAULT_PATH};

#[derive(Parser)]
#[clap(
    name = "simple-oauthclient",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS")
)]
pub struct Options {
    /// Use the config file specified
    #[clap(long, global = true, env = "SIMPLE_OAUTHCLIENT_CONFIG", default_value = DEFAULT_PATH)]
    config: PathBuf,
    #[clap(subcommand)]
    command: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
    Authorize(Authorize),
    Show(Show),
    Get(Get),
}

/// Authorize in the browser and store the resulting access token
#[derive(Parser)]
struct Authorize {
    /// App key of your app
    #[clap(long = "client_id", env = "SIMPLE_OAUTHCLIENT_CLIENT_ID")]
    client_id: String,
    /// App secret of your app
    #[clap(long = "client_secret", env = "SIMPLE_OAUTHCLIENT_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,
    /// Authorize URI of your app
    #[clap(long = "authorize_uri", env = "SIMPLE_OAUTHCLIENT_AUTHORIZE_URI")]
    authorize_uri: String,
    /// Fetch token URI of your app
    #[clap(long = "fetch_token_uri", env = "SIMPLE_OAUTHCLIENT_FETCH_TOKEN_URI")]
    fetch_token_uri: String,
    /// Scopes of your app, repeated or separated by commas
    #[clap(
        long,
        required = true,
        multiple_occurrences = true,
        use_value_delimiter = true,
        env = "SIMPLE_OAUTHCLIENT_SCOPE"
    )]
    scope: Vec<String>,
    /// Redirect URI of your app
    #[clap(long = "redirect_uri", env = "SIMPLE_OAUTHCLIENT_REDIRECT_URI", default_value = "http://127.0.0.1:8080/")]
    redirect_uri: String,
    /// Seconds to wait for the browser callback
    #[clap(long, env = "SIMPLE_OAUTHCLIENT_TIMEOUT", default_value = "300")]
    timeout: u64,
    /// Only print the authorization URL
    #[clap(long, env = "SIMPLE_OAUTHCLIENT_NO_BROWSER")]
    no_browser: bool,
    /// Skip TLS certificate verification of the token endpoint
    #[clap(long, env = "SIMPLE_OAUTHCLIENT_INSECURE")]
    insecure: bool,
}

/// Print the stored credentials
#[derive(Parser)]
struct Show;

/// GET a URL with the stored access token
#[derive(Parser)]
struct Get {
    url: String,
    /// Skip TLS certificate verification
    #[clap(long)]
    insecure: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("We were unable to authorize to use the API: {0}")]
    Authorize(#[from] FlowError),
    #[error("Missing config information, please run \"simple-oauthclient authorize\" ({0})")]
    MissingConfig(ConfigError),
    #[error(transparent)]
    Config(ConfigError),
    #[error(transparent)]
    Request(#[from] RequestError),
}

async fn authorize(c: &Authorize, opts: &Options) -> Result<(), CliError> {
    let request = AuthorizationRequest {
        client_id: ClientId(c.client_id.to_string()),
        client_secret: ClientSecret(c.client_secret.to_string()),
        authorize_endpoint: c.authorize_uri.to_string(),
        token_endpoint: c.fetch_token_uri.to_string(),
        scope: Scope::from_parts(c.scope.clone()),
        redirect_uri: RedirectUri(c.redirect_uri.to_string()),
    };

    let settings = FlowSettings {
        verify_tls: !c.insecure,
        timeout: Duration::from_secs(c.timeout),
        open_browser: !c.no_browser,
        ..FlowSettings::default()
    };

    let token = browser_authorize(request.clone(), &settings, |url| {
        println!("Open the following URL to authorize:\n\n    {}\n", url);
    })
    .await?;

    let credentials = Credentials {
        client_id: request.client_id,
        client_secret: request.client_secret,
        access_token: token.access_token,
    };
    let config = ConfigFile::new(&opts.config);
    config.write(&credentials).map_err(CliError::Config)?;

    println!("Credentials written to {}", config.path().display());
    println!("Access token: {}", credentials.access_token.as_ref());
    Ok(())
}

fn read_credentials(opts: &Options) -> Result<Credentials, CliError> {
    ConfigFile::new(&opts.config)
        .read()
        .map_err(CliError::MissingConfig)
}

fn show(_c: &Show, opts: &Options) -> Result<(), CliError> {
    let credentials = read_credentials(opts)?;
    println!("client_id: {}", credentials.client_id);
    println!("access_token: {}", credentials.access_token.as_ref());
    Ok(())
}

async fn get(c: &Get, opts: &Options) -> Result<(), CliError> {
    let credentials = read_credentials(opts)?;
    let client = ApiClient::from_credentials(&credentials, !c.insecure)?;
    let body = client.get(&c.url).await?;
    println!("{}", body);
    Ok(())
}

pub async fn run_cli_action(opts: Options) -> Result<(), CliError> {
    use SubCommand::*;

    match &opts.command {
        Authorize(c) => authorize(c, &opts).await,
        Show(c) => show(c, &opts),
        Get(c) => get(c, &opts).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_arguments() {
        let opts = Options::try_parse_from(&[
            "simple-oauthclient",
            "authorize",
            "--client_id=id1",
            "--client_secret=sec1",
            "--authorize_uri=https://auth.example.com/authorize",
            "--fetch_token_uri=https://auth.example.com/token",
            "--scope=read,write",
            "--scope=admin",
            "--config=/tmp/creds.cfg",
        ])
        .unwrap();

        assert_eq!(opts.config, PathBuf::from("/tmp/creds.cfg"));
        match opts.command {
            SubCommand::Authorize(a) => {
                assert_eq!(a.client_id, "id1");
                assert_eq!(a.redirect_uri, "http://127.0.0.1:8080/");
                assert_eq!(a.timeout, 300);
                assert_eq!(Scope::from_parts(a.scope).as_joined(), "read write admin");
                assert!(!a.no_browser);
            }
            _ => panic!("expected authorize"),
        }
    }

    #[test]
    fn scope_is_required() {
        let result = Options::try_parse_from(&[
            "simple-oauthclient",
            "authorize",
            "--client_id=id1",
            "--client_secret=sec1",
            "--authorize_uri=https://auth.example.com/authorize",
            "--fetch_token_uri=https://auth.example.com/token",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn show_without_config_asks_to_authorize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.cfg");
        let opts = Options::try_parse_from(&[
            "simple-oauthclient",
            "show",
            "--config",
            path.to_str().unwrap(),
        ])
        .unwrap();

        let err = read_credentials(&opts).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Missing config information, please run \"simple-oauthclient authorize\""));
    }

    #[test]
    fn unreadable_config_asks_to_authorize() {
        // a directory cannot be read as a file
        let dir = tempfile::tempdir().unwrap();
        let opts = Options::try_parse_from(&[
            "simple-oauthclient",
            "show",
            "--config",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();

        let err = read_credentials(&opts).unwrap_err();
        assert!(matches!(err, CliError::MissingConfig(ConfigError::Io { .. })));
    }

    #[test]
    fn authorize_flags_read_the_environment() {
        use clap::CommandFactory;

        let command = Options::command();
        let authorize = command.find_subcommand("authorize").unwrap();
        for arg in authorize.get_arguments() {
            if matches!(arg.get_id(), "help" | "version") {
                continue;
            }
            assert!(arg.get_env().is_some(), "--{} has no environment variable", arg.get_id());
        }
    }
}
