use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

use jsonpad::config::RcConfig;
use jsonpad::session::{DocumentSession, ToggleOutcome};
use jsonpad::settings::SettingsEntry;
use jsonpad::store::FileStore;
use jsonpad::validate::validate;

fn cli() -> Command {
    Command::new("jsonpad")
        .version(env!("BUILD_VERSION"))
        .about("JSON document editor with automatic timestamped backups")
        .arg(Arg::new("file").help("JSON document in the data directory").index(1))
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .help("Data directory (overrides ~/.jsonpadrc)")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .help("List documents in the data directory")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("validate")
                .long("validate")
                .help("Check the document for JSON syntax errors")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("delete")
                .long("delete")
                .help("Mark a path (e.g. a.b[2].c) for deletion; repeatable")
                .value_name("PATH")
                .action(clap::ArgAction::Append),
        )
        .arg(
            Arg::new("apply")
                .long("apply")
                .help("Apply marked deletions and the name sort, then save")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("stdout")
                .long("stdout")
                .help("Print the result of --apply instead of saving")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("backups")
                .long("backups")
                .help("List the document's backups, newest first")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("restore")
                .long("restore")
                .help("Restore the document from a named backup")
                .value_name("BACKUP"),
        )
        .arg(
            Arg::new("title")
                .long("title")
                .help("Set the document's display title")
                .value_name("TITLE"),
        )
        .arg(
            Arg::new("url")
                .long("url")
                .help("Set the document's external URL")
                .value_name("URL"),
        )
}

// --delete only marks paths; writing the result must be asked for
// explicitly with --apply.
fn delete_without_apply(matches: &ArgMatches) -> bool {
    !matches.get_flag("apply") && matches.contains_id("delete")
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config = RcConfig::load();
    let data_dir = matches
        .get_one::<String>("data-dir")
        .map(Into::into)
        .unwrap_or_else(|| config.resolved_data_dir());
    let store = FileStore::open(data_dir)?.with_keep_backups(config.keep_backups);

    if matches.get_flag("list") {
        return list_files(&store);
    }

    let Some(file) = matches.get_one::<String>("file") else {
        eprintln!("Error: No input file specified");
        std::process::exit(1);
    };

    if matches.get_flag("validate") {
        return validate_file(&store, file);
    }
    if matches.get_flag("backups") {
        return list_backups(&store, file);
    }
    if let Some(backup) = matches.get_one::<String>("restore") {
        let receipt = store.restore(file, backup)?;
        match receipt.backup {
            Some(pre) => println!("Restored {} (pre-restore backup: {})", receipt.filename, pre),
            None => println!("Restored {}", receipt.filename),
        }
        return Ok(());
    }

    let title = matches.get_one::<String>("title");
    let url = matches.get_one::<String>("url");
    if title.is_some() || url.is_some() {
        return update_settings(&store, file, title.cloned(), url.cloned());
    }

    if delete_without_apply(&matches) {
        eprintln!("Error: --delete marks paths but does not save; add --apply (use --stdout to preview)");
        std::process::exit(1);
    }

    if matches.get_flag("apply") {
        let deletes: Vec<String> = matches
            .get_many::<String>("delete")
            .map(|v| v.cloned().collect())
            .unwrap_or_default();
        return apply(&store, file, &deletes, matches.get_flag("stdout"));
    }

    // Default: print the document as stored.
    print!("{}", store.load_raw(file)?);
    Ok(())
}

fn list_files(store: &FileStore) -> Result<()> {
    for entry in store.list_files()? {
        let modified = entry
            .modified
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let mut line = format!("{}\t{}\t{}", entry.name, entry.size, modified);
        if let Some(title) = entry.title {
            line.push_str(&format!("\t{}", title));
        }
        if let Some(url) = entry.url {
            line.push_str(&format!("\t{}", url));
        }
        println!("{}", line);
    }
    Ok(())
}

fn validate_file(store: &FileStore, file: &str) -> Result<()> {
    let raw = store.load_raw(file)?;
    let report = validate(&raw);
    if report.valid {
        println!("{}: valid JSON", file);
        Ok(())
    } else {
        eprintln!(
            "{}: {} (line {}, column {})",
            file,
            report.error.unwrap_or_else(|| "invalid JSON".to_string()),
            report.line,
            report.column
        );
        std::process::exit(1);
    }
}

fn list_backups(store: &FileStore, file: &str) -> Result<()> {
    for entry in store.list_backups(file)? {
        let created = entry
            .created
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!("{}\t{}\t{}", entry.name, entry.size, created);
    }
    Ok(())
}

fn apply(store: &FileStore, file: &str, deletes: &[String], to_stdout: bool) -> Result<()> {
    let doc = store.load(file)?;
    let mut session = DocumentSession::open(&doc.filename, &doc.raw, doc.value);

    for path in deletes {
        match session.toggle_mark_rendered(path) {
            ToggleOutcome::Marked => {}
            ToggleOutcome::Unmarked => {
                // Repeating a path on the command line un-marks it.
                eprintln!("Warning: '{}' was given twice; mark removed", path);
            }
            ToggleOutcome::Protected => {
                eprintln!("Error: '{}' is protected and cannot be deleted", path);
                std::process::exit(1);
            }
        }
    }

    let plan = match session.prepare_save() {
        Ok(plan) => plan,
        Err(report) => {
            eprintln!(
                "{}: {} (line {}, column {})",
                file,
                report.error.unwrap_or_else(|| "invalid JSON".to_string()),
                report.line,
                report.column
            );
            std::process::exit(1);
        }
    };

    if to_stdout {
        println!("{}", plan.text);
        return Ok(());
    }

    let receipt = store.save(&doc.filename, &plan.text)?;
    session.commit_saved(plan);
    match receipt.backup {
        Some(backup) => println!("Saved {} (backup: {})", receipt.filename, backup),
        None => println!("Saved {}", receipt.filename),
    }
    Ok(())
}

fn update_settings(
    store: &FileStore,
    file: &str,
    title: Option<String>,
    url: Option<String>,
) -> Result<()> {
    let mut settings = store.settings()?;
    let mut entry = settings
        .entry_for(file)
        .cloned()
        .unwrap_or_else(|| SettingsEntry {
            filename: file.to_string(),
            title: None,
            url: None,
        });
    if title.is_some() {
        entry.title = title;
    }
    if url.is_some() {
        entry.url = url;
    }
    settings.set_entry(entry);
    store.save_settings(&settings)?;
    println!("Updated settings for {}", file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_alone_is_refused() {
        let matches = cli().get_matches_from(["jsonpad", "doc.json", "--delete", "a.b[2]"]);
        assert!(delete_without_apply(&matches));
    }

    #[test]
    fn test_delete_with_apply_proceeds() {
        let matches =
            cli().get_matches_from(["jsonpad", "doc.json", "--delete", "a.b[2]", "--apply"]);
        assert!(!delete_without_apply(&matches));
    }

    #[test]
    fn test_apply_without_deletes_proceeds() {
        let matches = cli().get_matches_from(["jsonpad", "doc.json", "--apply"]);
        assert!(!delete_without_apply(&matches));
    }
}
