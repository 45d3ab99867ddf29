//! Line-oriented SQL shell over a single borrowed connection.
//!
//! Input accumulates until a line ends with `;`, then the statement runs.
//! Query rows print `|`-separated, one per line. Lines starting with `.` at
//! the start of a statement are meta commands.

use std::io::{BufRead, Write};

use anyhow::Result;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use tracing::warn;

const PROMPT: &str = "arrmate> ";
const CONTINUATION: &str = "    ...> ";

const HELP: &str = "\
.help      Show this message
.tables    List tables
.version   Show schema and SQLite versions
.quit      Exit the shell
";

/// Run the shell until `.quit` or end of input.
///
/// Statement errors are printed and the shell keeps going; only I/O errors on
/// `output` end the session. A transaction left open is rolled back before
/// returning, so the connection goes back to its owner in autocommit mode.
pub fn run_shell<R: BufRead, W: Write>(
    conn: &Connection,
    input: R,
    output: &mut W,
    interactive: bool,
) -> Result<()> {
    let result = read_eval(conn, input, output, interactive);
    if !conn.is_autocommit() {
        warn!("Rolling back transaction left open in the shell");
        conn.execute_batch("ROLLBACK")?;
    }
    result
}

fn read_eval<R: BufRead, W: Write>(
    conn: &Connection,
    input: R,
    output: &mut W,
    interactive: bool,
) -> Result<()> {
    let mut pending = String::new();

    if interactive {
        write!(output, "{}", PROMPT)?;
        output.flush()?;
    }

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();

        if pending.is_empty() && trimmed.starts_with('.') {
            if !meta_command(conn, trimmed, output)? {
                return Ok(());
            }
        } else if !trimmed.is_empty() || !pending.is_empty() {
            pending.push_str(&line);
            pending.push('\n');
            if trimmed.ends_with(';') {
                if let Err(e) = execute(conn, &pending, output) {
                    writeln!(output, "Error: {}", e)?;
                }
                pending.clear();
            }
        }

        if interactive {
            let prompt = if pending.is_empty() { PROMPT } else { CONTINUATION };
            write!(output, "{}", prompt)?;
            output.flush()?;
        }
    }

    if !pending.trim().is_empty() {
        writeln!(output, "Error: incomplete statement (missing ';')")?;
    }
    Ok(())
}

/// Returns `false` when the shell should exit.
fn meta_command<W: Write>(conn: &Connection, command: &str, output: &mut W) -> Result<bool> {
    match command {
        ".quit" | ".exit" => return Ok(false),
        ".help" => write!(output, "{}", HELP)?,
        ".tables" => match table_names(conn) {
            Ok(names) => {
                for name in names {
                    writeln!(output, "{}", name)?;
                }
            }
            Err(e) => writeln!(output, "Error: {}", e)?,
        },
        ".version" => {
            let version: rusqlite::Result<i64> =
                conn.pragma_query_value(None, "user_version", |row| row.get(0));
            match version {
                Ok(v) => writeln!(output, "schema {} (sqlite {})", v, rusqlite::version())?,
                Err(e) => writeln!(output, "Error: {}", e)?,
            }
        }
        other => writeln!(output, "Error: unknown command '{}' (try .help)", other)?,
    }
    Ok(true)
}

fn table_names(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

fn execute<W: Write>(conn: &Connection, sql: &str, output: &mut W) -> Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let columns = stmt.column_count();

    if columns == 0 {
        let changed = stmt.execute([])?;
        if changed > 0 {
            writeln!(output, "{} row(s) changed", changed)?;
        }
        return Ok(());
    }

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut fields = Vec::with_capacity(columns);
        for idx in 0..columns {
            fields.push(render(row.get_ref(idx)?));
        }
        writeln!(output, "{}", fields.join("|"))?;
    }
    Ok(())
}

fn render(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrmate_core::testing::fixtures;
    use arrmate_core::{Pool, PoolOptions, Schema};

    fn run(script: &str) -> String {
        let pool = fixtures::memory_pool();
        let mut out = Vec::new();
        pool.with_connection(|conn| run_shell(conn, script.as_bytes(), &mut out, false))
            .unwrap()
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_tables_lists_schema() {
        assert_eq!(run(".tables\n"), "config\nsonarr\n");
    }

    #[test]
    fn test_version() {
        let out = run(".version\n");
        assert!(out.starts_with("schema 2 (sqlite "));
    }

    #[test]
    fn test_insert_and_select() {
        let out = run(
            "INSERT INTO config (key, value) VALUES ('a', '1');\n\
             INSERT INTO config (key, value)\n  VALUES ('b', NULL);\n\
             SELECT key, value FROM config\n ORDER BY key;\n",
        );
        // The second insert violates NOT NULL.
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "1 row(s) changed");
        assert!(lines[1].starts_with("Error: "));
        assert_eq!(lines[2], "a|1");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_null_and_numbers_render() {
        assert_eq!(run("SELECT NULL, 1, 2.5, 'x';\n"), "|1|2.5|x\n");
    }

    #[test]
    fn test_quit_stops_reading() {
        assert_eq!(run(".quit\nSELECT 1;\n"), "");
    }

    #[test]
    fn test_unknown_meta_and_incomplete_statement() {
        let out = run(".nope\nSELECT 1\n");
        assert!(out.contains("unknown command '.nope'"));
        assert!(out.ends_with("Error: incomplete statement (missing ';')\n"));
    }

    #[test]
    fn test_interactive_prompts() {
        let out = run_interactive("SELECT\n1;\n");
        assert_eq!(out, format!("{PROMPT}{CONTINUATION}1\n{PROMPT}"));
    }

    #[test]
    fn test_open_transaction_is_rolled_back_on_exit() {
        let pool = Pool::open_in_memory(&Schema::bundled(), PoolOptions::default().with_max_size(1))
            .unwrap();
        let script = "BEGIN;\nINSERT INTO config (key, value) VALUES ('a', '1');\n.quit\n";
        let mut out = Vec::new();
        pool.with_connection(|conn| run_shell(conn, script.as_bytes(), &mut out, false))
            .unwrap()
            .unwrap();

        // Same physical connection, back in autocommit with nothing written.
        let (autocommit, rows) = pool
            .with_connection(|conn| {
                let rows: i64 = conn
                    .query_row("SELECT COUNT(*) FROM config", [], |row| row.get(0))
                    .unwrap();
                (conn.is_autocommit(), rows)
            })
            .unwrap();
        assert!(autocommit);
        assert_eq!(rows, 0);
    }

    fn run_interactive(script: &str) -> String {
        let pool = fixtures::memory_pool();
        let mut out = Vec::new();
        pool.with_connection(|conn| run_shell(conn, script.as_bytes(), &mut out, true))
            .unwrap()
            .unwrap();
        String::from_utf8(out).unwrap()
    }
}
