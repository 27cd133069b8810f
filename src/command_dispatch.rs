//! Purpose: Hold top-level CLI command dispatch for `sheetmap`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Each command opens the table file once and issues only mapping operations.
//! Invariants: Output envelopes are stable JSON objects; `dump` prints plain text.

use super::*;
use clap::CommandFactory;
use sheetmap::api::Result as ApiResult;

pub(super) fn dispatch_command(
    command: Command,
    file: PathBuf,
    codec: CodecChoice,
) -> Result<RunOutcome, Error> {
    match &command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(*shell, &mut cmd, "sheetmap", &mut io::stdout());
            return Ok(RunOutcome::ok());
        }
        Command::Version => {
            emit_json(json!({
                "name": "sheetmap",
                "version": env!("CARGO_PKG_VERSION"),
            }));
            return Ok(RunOutcome::ok());
        }
        _ => {}
    }

    let table = FileTable::open_or_create(&file)?;
    let mut map: CliMap = SheetMap::with_codec(table, CliCodec(codec));
    tracing::debug!(path = %file.display(), codec = map.describe_codec(), "table opened");
    let arg = |raw: &str| parse_arg(raw, codec);

    match command {
        Command::Get { key, default } => {
            let key = arg(&key);
            let value = match default {
                Some(default) => map.get_or(&key, arg(&default))?,
                None => map.get(&key)?,
            };
            emit_json(json!({ "key": key, "value": value }));
        }
        Command::Set { key, value } => {
            let (key, value) = (arg(&key), arg(&value));
            map.set(&key, &value)?;
            emit_json(json!({ "key": key, "value": value }));
        }
        Command::Del { key } => {
            let key = arg(&key);
            map.delete(&key)?;
            emit_json(json!({ "deleted": key }));
        }
        Command::Has { key } => {
            let key = arg(&key);
            let present = map.contains(&key)?;
            emit_json(json!({ "key": key, "present": present }));
        }
        Command::Len => {
            emit_json(json!({ "len": map.len()? }));
        }
        Command::Keys { reverse } => {
            let keys = if reverse {
                map.reversed_keys()?.collect::<ApiResult<Vec<_>>>()?
            } else {
                map.keys()?.collect::<ApiResult<Vec<_>>>()?
            };
            emit_json(json!({ "keys": keys }));
        }
        Command::Values => {
            let values = map.values()?.collect::<ApiResult<Vec<_>>>()?;
            emit_json(json!({ "values": values }));
        }
        Command::Items => {
            let items = map
                .items()?
                .map(|entry| entry.map(|(key, value)| json!([key, value])))
                .collect::<ApiResult<Vec<_>>>()?;
            emit_json(json!({ "items": items }));
        }
        Command::Pop => {
            let (key, value) = map.pop_last()?;
            emit_json(json!({ "key": key, "value": value }));
        }
        Command::Clear => {
            map.clear()?;
            emit_json(json!({ "cleared": true }));
        }
        Command::Setdefault { key, value } => {
            let key = arg(&key);
            let value = map.set_default(&key, arg(&value))?;
            emit_json(json!({ "key": key, "value": value }));
        }
        Command::Update { entries } => {
            let entries = parse_object(&entries)?;
            let count = entries.len();
            map.update(
                entries
                    .into_iter()
                    .map(|(key, value)| (Value::String(key), value)),
            )?;
            emit_json(json!({ "updated": count }));
        }
        Command::Dump => {
            // JSON text for each side; `render` would print `Value`'s Debug form.
            println!("{}", map.render_with(|key, value| format!("{key}: {value}"))?);
        }
        Command::Completion { .. } | Command::Version => {}
    }
    Ok(RunOutcome::ok())
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, Error> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(entries)) => Ok(entries),
        Ok(_) => Err(Error::new(ErrorKind::Usage)
            .with_message("update expects a JSON object")
            .with_hint("Example: sheetmap update '{\"a\": 1, \"b\": 2}'")),
        Err(err) => Err(Error::new(ErrorKind::Usage)
            .with_message("update argument is not valid JSON")
            .with_source(err)),
    }
}
