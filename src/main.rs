//! Purpose: `lcwire` CLI entry point for inspecting polymorphic chat payloads.
//! Role: Binary crate root; parses args, reads input bytes, emits JSON on stdout.
//! Invariants: Commands emit stable JSON envelopes on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr; notices never touch stdout.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::ffi::OsString;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use lcwire::api::{
    Chat, Error, ErrorKind, Event, EventBatch, EventVariant, Participants, PartitionPolicy,
    Skipped, User, UserVariant, decode_events, promote_event, promote_user, to_exit_code,
};
use lcwire::notice::{Notice, notice_json, skipped_notice};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Run `lcwire --help` for usage."));
            }
        },
    };

    command_dispatch::dispatch_command(cli.command, cli.pretty)
}

#[derive(Parser)]
#[command(
    name = "lcwire",
    version,
    about = "Decode polymorphic chat users and events from JSON payloads",
    long_about = None,
    after_help = r#"EXAMPLES
  $ lcwire user agent.json
  $ echo '[{"type":"agent","id":"a1","routing_status":"accepting_chats"}]' | lcwire participants
  $ lcwire event --list thread_events.json --strict
  $ lcwire chat chat.json --pretty

Inputs are read from a file path, or from stdin when the path is omitted or `-`.
Set RUST_LOG=debug to see every skipped element."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, global = true, help = "Pretty-print JSON output")]
    pretty: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode one user and promote it to agent or customer.
    User {
        #[arg(value_hint = ValueHint::FilePath, help = "Input file (default: stdin)")]
        input: Option<PathBuf>,
    },
    /// Decode one event (or an array of events with --list) and promote it.
    Event {
        #[arg(value_hint = ValueHint::FilePath, help = "Input file (default: stdin)")]
        input: Option<PathBuf>,
        #[arg(long, help = "Input is an array of events")]
        list: bool,
        #[arg(long, help = "Fail on unknown or malformed events instead of skipping them")]
        strict: bool,
    },
    /// Partition an array of users into agents and customers keyed by id.
    Participants {
        #[arg(value_hint = ValueHint::FilePath, help = "Input file (default: stdin)")]
        input: Option<PathBuf>,
        #[arg(long, help = "Fail on unknown or malformed users instead of skipping them")]
        strict: bool,
    },
    /// Decode a chat object and partition its users.
    Chat {
        #[arg(value_hint = ValueHint::FilePath, help = "Input file (default: stdin)")]
        input: Option<PathBuf>,
        #[arg(long, help = "Fail on unknown or malformed users instead of skipping them")]
        strict: bool,
    },
    /// Generate shell completion scripts.
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn policy_from_flag(strict: bool) -> PartitionPolicy {
    if strict {
        PartitionPolicy::Strict
    } else {
        PartitionPolicy::Lenient
    }
}

fn input_label(path: Option<&Path>) -> String {
    match path {
        Some(path) if path != Path::new("-") => path.display().to_string(),
        _ => "-".to_string(),
    }
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>, Error> {
    match path {
        Some(path) if path != Path::new("-") => fs::read(path).map_err(|err| {
            let kind = if err.kind() == io::ErrorKind::NotFound {
                ErrorKind::Usage
            } else {
                ErrorKind::Io
            };
            Error::new(kind)
                .with_message(format!("failed to read {}", path.display()))
                .with_hint("Check the input path, or pipe the payload on stdin.")
                .with_source(err)
        }),
        _ => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read stdin")
                    .with_source(err)
            })?;
            Ok(buf)
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("json encode failed")
            .with_source(err)
    })
}

fn user_variant_json(variant: &UserVariant) -> Result<Value, Error> {
    match variant {
        UserVariant::Agent(agent) => Ok(json!({ "kind": "agent", "user": to_json(agent)? })),
        UserVariant::Customer(customer) => {
            Ok(json!({ "kind": "customer", "user": to_json(customer)? }))
        }
        UserVariant::Unknown(user) => unknown_json(user.tag.as_str(), &**user, user.fragments()),
    }
}

fn event_variant_json(variant: &EventVariant) -> Result<Value, Error> {
    let kind = variant.kind().as_str();
    let event = match variant {
        EventVariant::Message(v) => to_json(v)?,
        EventVariant::File(v) => to_json(v)?,
        EventVariant::FilledForm(v) => to_json(v)?,
        EventVariant::SystemMessage(v) => to_json(v)?,
        EventVariant::RichMessage(v) => to_json(v)?,
        EventVariant::Unknown(event) => {
            return unknown_json(event.tag.as_str(), &**event, event.fragments());
        }
    };
    Ok(json!({ "kind": kind, "event": event }))
}

fn unknown_json<T: Serialize>(
    tag: &str,
    common: &T,
    fragments: &lcwire::api::Fragments,
) -> Result<Value, Error> {
    Ok(json!({
        "kind": "unknown",
        "tag": tag,
        "common": to_json(common)?,
        "fragments": to_json(fragments)?,
    }))
}

fn skipped_json(skipped: &[Skipped]) -> Result<Value, Error> {
    to_json(skipped)
}

fn participants_json(participants: &Participants) -> Result<Value, Error> {
    let mut agents = Map::new();
    for (id, agent) in participants.agents() {
        agents.insert(id.to_string(), to_json(agent)?);
    }
    let mut customers = Map::new();
    for (id, customer) in participants.customers() {
        customers.insert(id.to_string(), to_json(customer)?);
    }
    let order: Vec<Value> = participants
        .members()
        .iter()
        .map(|member| json!({ "id": member.user().id, "kind": member.kind().as_str() }))
        .collect();

    let mut map = Map::new();
    map.insert("agents".to_string(), Value::Object(agents));
    map.insert("customers".to_string(), Value::Object(customers));
    map.insert("order".to_string(), Value::Array(order));
    map.insert("skipped".to_string(), skipped_json(participants.skipped())?);
    Ok(Value::Object(map))
}

fn event_batch_json(batch: &EventBatch) -> Result<Value, Error> {
    let events = batch
        .events()
        .iter()
        .map(event_variant_json)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({
        "events": events,
        "skipped": skipped_json(batch.skipped())?,
    }))
}

fn chat_json(chat: &Chat) -> Result<Value, Error> {
    let mut map = Map::new();
    map.insert("id".to_string(), json!(chat.id));
    map.insert("is_followed".to_string(), json!(chat.is_followed));
    if !chat.properties.is_empty() {
        map.insert(
            "properties".to_string(),
            Value::Object(chat.properties.clone()),
        );
    }
    if let Some(thread) = &chat.thread {
        map.insert("thread".to_string(), thread.clone());
    }
    if let Value::Object(participants) = participants_json(chat.participants())? {
        map.extend(participants);
    }
    Ok(Value::Object(map))
}

fn emit_json(value: Value, pretty: bool) {
    let encoded = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    match encoded {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

fn notice_time_now() -> String {
    use time::format_description::well_known::Rfc3339;
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

fn emit_skipped_notice(cmd: &str, path: Option<&Path>, skipped: &[Skipped]) {
    if skipped.is_empty() {
        return;
    }
    let notice = skipped_notice(cmd, &input_label(path), notice_time_now(), skipped);
    emit_notice(&notice);
}

fn emit_notice(notice: &Notice) {
    if io::stderr().is_terminal() {
        eprintln!("notice: {} (input: {})", notice.message, notice.input);
        return;
    }
    let json = serde_json::to_string(&notice_json(notice)).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", err.kind()))
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        causes.push(source.to_string());
        current = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(err.kind().label()));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(field) = err.field() {
        inner.insert("field".to_string(), json!(field));
    }
    if let Some(index) = err.index() {
        inner.insert("index".to_string(), json!(index));
    }
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(field) = err.field() {
        lines.push(format!("field: {field}"));
    }
    if let Some(index) = err.index() {
        lines.push(format!("index: {index}"));
    }
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error:").trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, error_json, input_label, policy_from_flag};
    use clap::{CommandFactory, Parser};
    use lcwire::api::{Error, ErrorKind, PartitionPolicy};
    use std::path::Path;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn strict_flag_selects_policy() {
        assert_eq!(policy_from_flag(true), PartitionPolicy::Strict);
        assert_eq!(policy_from_flag(false), PartitionPolicy::Lenient);
        let cli = Cli::try_parse_from(["lcwire", "participants", "--strict", "users.json"])
            .expect("parse");
        assert!(matches!(cli.command, Command::Participants { strict: true, .. }));
    }

    #[test]
    fn error_json_carries_field_and_index() {
        let err = Error::new(ErrorKind::MalformedCommon)
            .with_message("user decode failed")
            .with_field("id")
            .with_index(3);
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "malformed-common");
        assert_eq!(value["error"]["field"], "id");
        assert_eq!(value["error"]["index"], 3);
    }

    #[test]
    fn stdin_label_for_missing_or_dash() {
        assert_eq!(input_label(None), "-");
        assert_eq!(input_label(Some(Path::new("-"))), "-");
        assert_eq!(input_label(Some(Path::new("a.json"))), "a.json");
    }
}
