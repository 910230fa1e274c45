//! Status command for showing stored event volume by action.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use hw_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    let summaries = db.action_summaries()?;

    writeln!(writer, "Client analytics status")?;
    writeln!(writer, "Database: {}", database_path.display())?;

    if summaries.is_empty() {
        writeln!(writer, "No geo events recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Actions:")?;
    for summary in summaries {
        writeln!(
            writer,
            "- {}: {} events, {} clients, last {}",
            summary.action, summary.events, summary.clients, summary.last_event
        )?;
    }

    Ok(())
}
