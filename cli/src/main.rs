//! Interactive shell over a local file trie.

use std::env;
use std::io::{self, BufRead, Write};

use filetrie::{FileTrie, SortMode, StoreError, Trie};
use log::{error, info};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("usage: {}", .0)]
    Usage(&'static str),

    #[error("invalid limit '{}'", .0)]
    Limit(String),
}

type Result<T> = std::result::Result<T, CliError>;

fn help(out: &mut impl Write) -> Result<()> {
    writeln!(out, "help  -- show help")?;
    writeln!(out, "set   -- insert key value, by: <key> <value>")?;
    writeln!(out, "get   -- get key value, by: <key>")?;
    writeln!(out, "has   -- check key exists, by: <key>")?;
    writeln!(out, "count -- show insert count, by: <key>")?;
    writeln!(out, "rm    -- remove key value, by: <key>")?;
    writeln!(out, "ls    -- list prefixed keys, by: <prefix> [limit] [sort]")?;
    writeln!(out, "len   -- show number of distinct keys")?;
    writeln!(out, "exit  -- exit command")?;
    writeln!(
        out,
        "sorts: none random count-asc count-desc key-asc key-desc value-asc value-desc"
    )?;
    Ok(())
}

/// Values are JSON when they parse as JSON, plain strings otherwise.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn process_command(out: &mut impl Write, trie: &mut FileTrie, line: &str) -> Result<()> {
    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match cmd {
        "help" => help(out)?,
        "set" => {
            // keys may contain spaces, so the value is the last word.
            let (key, value) = rest
                .rsplit_once(' ')
                .ok_or(CliError::Usage("set <key> <value>"))?;
            trie.insert(key.trim(), parse_value(value))?;
        }
        "get" => {
            if let Some(v) = trie.get(rest)? {
                writeln!(out, "{}", v)?;
            }
        }
        "has" => writeln!(out, "{}", trie.has(rest)?)?,
        "count" => writeln!(out, "{}", trie.count(rest)?)?,
        "rm" => writeln!(out, "{}", trie.remove(rest)?)?,
        "len" => writeln!(out, "{}", trie.key_count())?,
        "ls" => {
            let mut args = rest.split_whitespace();
            let prefix = args.next().unwrap_or("");
            let limit = match args.next() {
                Some(raw) => raw.parse::<usize>().map_err(|_| CliError::Limit(raw.to_string()))?,
                None => 0,
            };
            let sort = match args.next() {
                Some(raw) => raw.parse::<SortMode>()?,
                None => SortMode::None,
            };

            for entry in trie.prefixed(prefix, limit, sort)? {
                writeln!(out, "{} ({}) => {}", entry.key, entry.count, entry.value)?;
            }
        }
        "" => {}
        _ => writeln!(out, "unknown command '{}', try help", cmd)?,
    }

    Ok(())
}

fn main() -> Result<()> {
    // Init log config from env.
    env_logger::init();

    let path = env::args().nth(1).unwrap_or_else(|| "database".to_string());
    info!("Opening store at {path} ...");

    let mut trie = FileTrie::open(&path)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let line = line.trim();

        if line == "exit" {
            break;
        }

        if let Err(e) = process_command(&mut stdout, &mut trie, line) {
            error!("{:?}", e);
            writeln!(stdout, "error: {}", e)?;
        }
    }

    trie.close()?;

    Ok(())
}
