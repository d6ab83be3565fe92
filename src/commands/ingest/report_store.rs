use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction, params};

use super::aggregate::{Aggregates, Records};
use super::types::{Dataset, ProgramType};

const SCHEMA: &str = "
    CREATE TABLE program_types (
      id INTEGER PRIMARY KEY,
      name TEXT NOT NULL
    );

    CREATE TABLE sections (
      id INTEGER PRIMARY KEY,
      name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE clubs (
      id INTEGER PRIMARY KEY,
      name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE competitors (
      id INTEGER PRIMARY KEY,
      name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE competitions (
      id INTEGER PRIMARY KEY,
      name TEXT NOT NULL UNIQUE,
      start_date TEXT NOT NULL,
      season TEXT,
      is_championship INTEGER NOT NULL
    );

    CREATE TABLE categories (
      id INTEGER PRIMARY KEY,
      name TEXT NOT NULL UNIQUE,
      category_type TEXT NOT NULL,
      program_type_id INTEGER NOT NULL,
      FOREIGN KEY(program_type_id) REFERENCES program_types(id)
    );

    CREATE TABLE results (
      id INTEGER PRIMARY KEY,
      competition_id INTEGER NOT NULL,
      category_id INTEGER NOT NULL,
      club_id INTEGER,
      competitor_id INTEGER,
      section_id INTEGER,
      rank INTEGER NOT NULL CHECK (rank >= 1),
      points REAL NOT NULL,
      rank_bin TEXT NOT NULL,
      FOREIGN KEY(competition_id) REFERENCES competitions(id),
      FOREIGN KEY(category_id) REFERENCES categories(id),
      FOREIGN KEY(club_id) REFERENCES clubs(id),
      FOREIGN KEY(competitor_id) REFERENCES competitors(id),
      FOREIGN KEY(section_id) REFERENCES sections(id)
    );

    CREATE TABLE personal_bests (
      competitor_id INTEGER NOT NULL,
      program_type_id INTEGER NOT NULL,
      result_id INTEGER NOT NULL,
      PRIMARY KEY (competitor_id, program_type_id),
      FOREIGN KEY(competitor_id) REFERENCES competitors(id),
      FOREIGN KEY(program_type_id) REFERENCES program_types(id),
      FOREIGN KEY(result_id) REFERENCES results(id)
    );

    CREATE TABLE section_records (
      section_id INTEGER NOT NULL,
      category_id INTEGER NOT NULL,
      result_id INTEGER NOT NULL,
      PRIMARY KEY (section_id, category_id),
      FOREIGN KEY(section_id) REFERENCES sections(id),
      FOREIGN KEY(category_id) REFERENCES categories(id),
      FOREIGN KEY(result_id) REFERENCES results(id)
    );

    CREATE TABLE club_records (
      club_id INTEGER NOT NULL,
      category_id INTEGER NOT NULL,
      result_id INTEGER NOT NULL,
      PRIMARY KEY (club_id, category_id),
      FOREIGN KEY(club_id) REFERENCES clubs(id),
      FOREIGN KEY(category_id) REFERENCES categories(id),
      FOREIGN KEY(result_id) REFERENCES results(id)
    );
";

/// Tables in the order they are written, dimensions first.
pub const REPORT_TABLES: [&str; 10] = [
    "program_types",
    "sections",
    "clubs",
    "competitors",
    "competitions",
    "categories",
    "results",
    "personal_bests",
    "section_records",
    "club_records",
];

/// Opens a fresh store at `db_path`, discarding whatever a previous run left.
pub fn create_report_store(db_path: &Path) -> Result<Connection> {
    remove_store_files(db_path)?;

    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    Ok(connection)
}

/// Deletes the database together with its `-wal` and `-shm` sidecars, so a
/// journal left by an interrupted run cannot attach to the new file.
fn remove_store_files(db_path: &Path) -> Result<()> {
    for suffix in ["", "-wal", "-shm"] {
        let mut name = db_path.as_os_str().to_owned();
        name.push(suffix);
        let path = PathBuf::from(name);

        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove previous store {}", path.display()))?;
        }
    }
    Ok(())
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    enable_foreign_keys(connection)
}

fn enable_foreign_keys(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to set foreign_keys=ON")
}

/// Writes the whole dataset and its aggregates in one transaction.
pub fn write_report(connection: &mut Connection, dataset: &Dataset, aggregates: &Aggregates) -> Result<()> {
    let tx = connection.transaction()?;
    tx.execute_batch(SCHEMA).context("failed to create report schema")?;

    {
        let mut statement = tx.prepare("INSERT INTO program_types(id, name) VALUES (?1, ?2)")?;
        for program_type in ProgramType::ALL {
            statement.execute(params![program_type.id(), program_type.as_str()])?;
        }
    }

    insert_names(&tx, "sections", dataset.sections.rows())?;
    insert_names(&tx, "clubs", dataset.clubs.rows())?;
    insert_names(&tx, "competitors", dataset.competitors.rows())?;

    {
        let mut statement = tx.prepare(
            "INSERT INTO competitions(id, name, start_date, season, is_championship)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (id, competition) in dataset.competitions.rows().iter().enumerate() {
            statement.execute(params![
                id,
                competition.name,
                competition.start_date,
                competition.season,
                competition.is_championship,
            ])?;
        }
    }

    {
        let mut statement = tx.prepare(
            "INSERT INTO categories(id, name, category_type, program_type_id)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (id, category) in dataset.categories.rows().iter().enumerate() {
            statement.execute(params![
                id,
                category.name,
                category.category_type.as_str(),
                category.program_type.id(),
            ])?;
        }
    }

    {
        let mut statement = tx.prepare(
            "INSERT INTO results(
               id, competition_id, category_id, club_id, competitor_id, section_id,
               rank, points, rank_bin
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for (id, (row, bin)) in dataset
            .results
            .iter()
            .zip(&aggregates.rank_bins)
            .enumerate()
        {
            statement.execute(params![
                id,
                row.competition_id,
                row.category_id,
                row.club_id,
                row.competitor_id,
                row.section_id,
                row.rank,
                row.points,
                bin.label(),
            ])?;
        }
    }

    insert_best_rows(
        &tx,
        "INSERT INTO personal_bests(competitor_id, program_type_id, result_id) VALUES (?1, ?2, ?3)",
        &aggregates.personal_bests,
    )?;
    insert_best_rows(
        &tx,
        "INSERT INTO section_records(section_id, category_id, result_id) VALUES (?1, ?2, ?3)",
        &aggregates.section_records,
    )?;
    insert_best_rows(
        &tx,
        "INSERT INTO club_records(club_id, category_id, result_id) VALUES (?1, ?2, ?3)",
        &aggregates.club_records,
    )?;

    tx.commit().context("failed to commit report transaction")?;
    Ok(())
}

fn insert_names(tx: &Transaction<'_>, table: &str, names: &[String]) -> Result<()> {
    let mut statement = tx.prepare(&format!("INSERT INTO {table}(id, name) VALUES (?1, ?2)"))?;
    for (id, name) in names.iter().enumerate() {
        statement
            .execute(params![id, name])
            .with_context(|| format!("failed to insert into {table}: {name}"))?;
    }
    Ok(())
}

fn insert_best_rows(tx: &Transaction<'_>, sql: &str, rows: &Records) -> Result<()> {
    let mut statement = tx.prepare(sql)?;
    for ((group_id, dimension_id), result_id) in rows {
        statement.execute(params![group_id, dimension_id, result_id])?;
    }
    Ok(())
}

pub fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
