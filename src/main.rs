//! Purpose: `baasbox` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Payloads go to stdout; diagnostics and errors go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]

use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;

use baasbox::api::{
    Client, ClientConfig, Error, ErrorKind, ListOptions, Permission, default_session_path,
    to_exit_code,
};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "baasbox",
    version,
    about = "Client for a BaasBox backend instance"
)]
struct Cli {
    #[arg(
        long,
        env = "BAASBOX_ENDPOINT",
        help = "Backend endpoint URL, e.g. https://api.example.com"
    )]
    endpoint: Option<String>,
    #[arg(
        long,
        env = "BAASBOX_APPCODE",
        help = "Application code scoping every request"
    )]
    appcode: Option<String>,
    #[arg(
        long,
        help = "Session file (default: ~/.baasbox/session.json)",
        value_hint = ValueHint::FilePath
    )]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PermissionArg {
    Read,
    Delete,
    Update,
    All,
}

impl From<PermissionArg> for Permission {
    fn from(arg: PermissionArg) -> Self {
        match arg {
            PermissionArg::Read => Permission::Read,
            PermissionArg::Delete => Permission::Delete,
            PermissionArg::Update => Permission::Update,
            PermissionArg::All => Permission::All,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Log in and store the issued session")]
    Login { username: String, password: String },
    #[command(about = "Log out and clear the stored session")]
    Logout,
    #[command(about = "Create a user account and store the issued session")]
    Signup { username: String, password: String },
    #[command(about = "Show the stored session, or the server profile with --remote")]
    Whoami {
        #[arg(long, help = "Ask the backend instead of reading the session file")]
        remote: bool,
    },
    #[command(subcommand, about = "Document collection operations")]
    Doc(DocCommand),
    #[command(subcommand, about = "File operations")]
    File(FileCommand),
    #[command(about = "Follow a user as the logged-in user")]
    Follow { username: String },
    #[command(about = "Stop following a user")]
    Unfollow { username: String },
    #[command(about = "List the followers of a user")]
    Followers { username: String },
    #[command(about = "List the users a user follows")]
    Following { username: String },
    #[command(about = "Send a push notification (JSON payload argument or stdin)")]
    Push { payload: Option<String> },
    #[command(about = "Invoke a named server-side plugin")]
    Plugin {
        name: String,
        #[arg(long, default_value = "POST", help = "HTTP method: GET|POST|PUT|DELETE")]
        method: String,
        payload: Option<String>,
    },
    #[command(about = "Generate shell completions")]
    Completions { shell: Shell },
}

#[derive(Subcommand)]
enum DocCommand {
    #[command(about = "List documents in a collection")]
    List {
        collection: String,
        #[arg(long)]
        page: Option<u64>,
        #[arg(long)]
        per_page: Option<u64>,
        #[arg(long = "where", help = "Server-side where filter")]
        where_filter: Option<String>,
        #[arg(long)]
        order_by: Option<String>,
    },
    #[command(about = "Fetch one document")]
    Get { collection: String, id: String },
    #[command(about = "Create or update a document (JSON argument or stdin)")]
    Save {
        collection: String,
        payload: Option<String>,
    },
    #[command(about = "Delete one document")]
    Delete { collection: String, id: String },
    #[command(about = "Count the documents visible in a collection")]
    Count { collection: String },
    #[command(about = "Update a single field of a document")]
    UpdateField {
        collection: String,
        id: String,
        field: String,
        #[arg(help = "New value, parsed as JSON when possible")]
        value: String,
    },
    #[command(
        about = "Grant a permission on a document to a user or role",
        group = clap::ArgGroup::new("target").required(true).args(["user", "role"])
    )]
    Grant {
        collection: String,
        id: String,
        #[arg(value_enum)]
        permission: PermissionArg,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    #[command(
        about = "Revoke a permission on a document from a user or role",
        group = clap::ArgGroup::new("target").required(true).args(["user", "role"])
    )]
    Revoke {
        collection: String,
        id: String,
        #[arg(value_enum)]
        permission: PermissionArg,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
}

#[derive(Subcommand)]
enum FileCommand {
    #[command(about = "Upload a local file")]
    Upload {
        #[arg(value_hint = ValueHint::FilePath)]
        path: PathBuf,
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,
    },
    #[command(about = "Fetch a file's content")]
    Get {
        id: String,
        #[arg(long, help = "Write content here instead of stdout", value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
    #[command(about = "Fetch a file's metadata")]
    Details { id: String },
    #[command(about = "Delete a file")]
    Delete { id: String },
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(*shell, &mut command, "baasbox", &mut io::stdout());
            return Ok(());
        }
        Command::Whoami { remote: false } => {
            // reads only the session file, no endpoint needed
            let path = cli
                .session_file
                .clone()
                .unwrap_or_else(default_session_path);
            let store = baasbox::api::SessionStore::open(path);
            let session = store
                .current()
                .ok_or_else(|| Error::new(ErrorKind::NotFound).with_message("no stored session"))?;
            return emit_json(&serde_json::to_value(session).map_err(internal_json_error)?);
        }
        _ => {}
    }

    let client = client_from(&cli)?;
    match cli.command {
        Command::Completions { .. } | Command::Whoami { remote: false } => Ok(()),
        Command::Login { username, password } => {
            let session = client.login(&username, &password)?;
            emit_json(&serde_json::to_value(session).map_err(internal_json_error)?)
        }
        Command::Logout => {
            client.logout()?;
            emit_json(&json!({"logout": "ok"}))
        }
        Command::Signup { username, password } => {
            let session = client.signup(&username, &password, None)?;
            emit_json(&serde_json::to_value(session).map_err(internal_json_error)?)
        }
        Command::Whoami { remote: true } => emit_json(&client.fetch_current_user()?),
        Command::Doc(doc) => run_doc(&client, doc),
        Command::File(file) => run_file(&client, file),
        Command::Follow { username } => emit_json(&client.follow(&username)?),
        Command::Unfollow { username } => {
            client.unfollow(&username)?;
            emit_json(&json!({"unfollow": "ok"}))
        }
        Command::Followers { username } => emit_json(&Value::Array(client.fetch_followers(&username)?)),
        Command::Following { username } => emit_json(&Value::Array(client.fetch_following(&username)?)),
        Command::Push { payload } => {
            let payload = payload_value(payload)?;
            emit_json(&client.send_push_notification(&payload)?)
        }
        Command::Plugin {
            name,
            method,
            payload,
        } => {
            let payload = match payload {
                Some(raw) => Some(parse_json(&raw)?),
                None => None,
            };
            emit_json(&client.call_plugin(&name, &method, payload.as_ref())?)
        }
    }
}

fn run_doc(client: &Client, command: DocCommand) -> Result<(), Error> {
    match command {
        DocCommand::List {
            collection,
            page,
            per_page,
            where_filter,
            order_by,
        } => {
            let options = ListOptions {
                page,
                records_per_page: per_page,
                where_filter,
                order_by,
            };
            let documents = if options.page.is_none()
                && options.records_per_page.is_none()
                && options.where_filter.is_none()
                && options.order_by.is_none()
            {
                client.load_collection(&collection)?
            } else {
                client.load_collection_with_options(&collection, &options)?
            };
            emit_json(&Value::Array(documents))
        }
        DocCommand::Get { collection, id } => emit_json(&client.load_object(&collection, &id)?),
        DocCommand::Save {
            collection,
            payload,
        } => {
            let object = payload_value(payload)?;
            emit_json(&client.save(&collection, &object)?)
        }
        DocCommand::Delete { collection, id } => {
            client.delete_object(&collection, &id)?;
            emit_json(&json!({"delete": "ok"}))
        }
        DocCommand::Count { collection } => {
            emit_json(&json!({"count": client.count(&collection)?}))
        }
        DocCommand::UpdateField {
            collection,
            id,
            field,
            value,
        } => {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            emit_json(&client.update_field(&collection, &id, &field, &value)?)
        }
        DocCommand::Grant {
            collection,
            id,
            permission,
            user,
            role,
        } => {
            match (user, role) {
                (Some(user), _) => client.grant_user_access_to_object(
                    &collection,
                    &id,
                    permission.into(),
                    &user,
                )?,
                (None, Some(role)) => client.grant_role_access_to_object(
                    &collection,
                    &id,
                    permission.into(),
                    &role,
                )?,
                (None, None) => unreachable!("clap group requires one target"),
            }
            emit_json(&json!({"grant": "ok"}))
        }
        DocCommand::Revoke {
            collection,
            id,
            permission,
            user,
            role,
        } => {
            match (user, role) {
                (Some(user), _) => client.revoke_user_access_to_object(
                    &collection,
                    &id,
                    permission.into(),
                    &user,
                )?,
                (None, Some(role)) => client.revoke_role_access_to_object(
                    &collection,
                    &id,
                    permission.into(),
                    &role,
                )?,
                (None, None) => unreachable!("clap group requires one target"),
            }
            emit_json(&json!({"revoke": "ok"}))
        }
    }
}

fn run_file(client: &Client, command: FileCommand) -> Result<(), Error> {
    match command {
        FileCommand::Upload { path, content_type } => {
            let bytes = std::fs::read(&path).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read upload file")
                    .with_path(&path)
                    .with_source(err)
            })?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());
            emit_json(&client.upload_file(&filename, &content_type, &bytes)?)
        }
        FileCommand::Get { id, output } => {
            let bytes = client.fetch_file(&id)?;
            match output {
                Some(path) => std::fs::write(&path, bytes).map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write output file")
                        .with_path(&path)
                        .with_source(err)
                }),
                None => io::stdout().write_all(&bytes).map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write to stdout")
                        .with_source(err)
                }),
            }
        }
        FileCommand::Details { id } => emit_json(&client.fetch_file_details(&id)?),
        FileCommand::Delete { id } => {
            client.delete_file(&id)?;
            emit_json(&json!({"delete": "ok"}))
        }
    }
}

fn client_from(cli: &Cli) -> Result<Client, Error> {
    let endpoint = cli.endpoint.as_deref().ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message("no endpoint configured")
            .with_hint("Pass --endpoint or set BAASBOX_ENDPOINT.")
    })?;
    let appcode = cli.appcode.as_deref().ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message("no appcode configured")
            .with_hint("Pass --appcode or set BAASBOX_APPCODE.")
    })?;
    let config = ClientConfig::new(endpoint, appcode)?;
    let session_file = cli
        .session_file
        .clone()
        .unwrap_or_else(default_session_path);
    Ok(Client::with_session_path(config, session_file))
}

/// JSON payload from an argument, or from stdin when the argument is absent.
fn payload_value(arg: Option<String>) -> Result<Value, Error> {
    match arg {
        Some(raw) => parse_json(&raw),
        None => {
            let mut raw = String::new();
            io::stdin().read_to_string(&mut raw).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read payload from stdin")
                    .with_source(err)
            })?;
            parse_json(&raw)
        }
    }
}

fn parse_json(raw: &str) -> Result<Value, Error> {
    serde_json::from_str(raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("payload is not valid json")
            .with_source(err)
    })
}

fn internal_json_error(err: serde_json::Error) -> Error {
    Error::new(ErrorKind::Internal)
        .with_message("failed to encode json output")
        .with_source(err)
}

fn emit_json(value: &Value) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(value).map_err(internal_json_error)?;
    println!("{json}");
    Ok(())
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    if let Some(message) = err.message() {
        inner.insert("message".to_string(), json!(message));
    }
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    if let Some(body) = err.body() {
        inner.insert("body".to_string(), body.clone());
    }
    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {err}");
        return;
    }
    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}
