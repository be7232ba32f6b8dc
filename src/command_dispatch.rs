//! Purpose: Hold top-level CLI command dispatch for `lcwire`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Each command writes exactly one JSON value to stdout on success.
//! Invariants: Helpers in `main.rs` remain the source of output shaping.

use super::*;

pub(super) fn dispatch_command(command: Command, pretty: bool) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "lcwire", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::User { input } => {
            let bytes = read_input(input.as_deref())?;
            let user = Arc::new(User::decode(&bytes)?);
            let variant = promote_user(&user)?;
            tracing::debug!(id = %user.id, kind = variant.kind().as_str(), "decoded user");
            emit_json(user_variant_json(&variant)?, pretty);
            Ok(RunOutcome::ok())
        }
        Command::Event {
            input,
            list,
            strict,
        } => {
            let bytes = read_input(input.as_deref())?;
            if list {
                let batch = decode_events(&bytes, policy_from_flag(strict))?;
                emit_skipped_notice("event", input.as_deref(), batch.skipped());
                emit_json(event_batch_json(&batch)?, pretty);
                return Ok(RunOutcome::ok());
            }
            let event = Arc::new(Event::decode(&bytes)?);
            let variant = promote_event(&event)?;
            if strict && matches!(variant, EventVariant::Unknown(_)) {
                return Err(Error::new(ErrorKind::UnrecognizedVariant)
                    .with_message(format!("unrecognized event type {:?}", event.tag))
                    .with_field("type")
                    .with_hint("Drop --strict to print unknown events with their raw fragments."));
            }
            emit_json(event_variant_json(&variant)?, pretty);
            Ok(RunOutcome::ok())
        }
        Command::Participants { input, strict } => {
            let bytes = read_input(input.as_deref())?;
            let participants = Participants::decode(&bytes, policy_from_flag(strict))?;
            emit_skipped_notice("participants", input.as_deref(), participants.skipped());
            emit_json(participants_json(&participants)?, pretty);
            Ok(RunOutcome::ok())
        }
        Command::Chat { input, strict } => {
            let bytes = read_input(input.as_deref())?;
            let chat = Chat::decode(&bytes, policy_from_flag(strict))?;
            emit_skipped_notice("chat", input.as_deref(), chat.participants().skipped());
            emit_json(chat_json(&chat)?, pretty);
            Ok(RunOutcome::ok())
        }
    }
}
