//! Terminal formatting for query results

use crate::query::{PlayerLookup, PrefixLookup, PrefixResult};
use crate::snapshot::types::{CategoryRank, PlayerRecord, PointsEntry};
use serde::Serialize;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

const NO_DATA: &str = "No ranking data loaded yet";

fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Print any result as a single line of JSON
pub fn print_json(value: &impl Serialize) -> io::Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer(&mut out, value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(out)
}

pub fn print_player(lookup: &PlayerLookup, color: bool) -> io::Result<()> {
    write_player(&mut stdout(color), lookup)
}

pub fn print_prefix(lookup: &PrefixLookup, color: bool) -> io::Result<()> {
    write_prefix(&mut stdout(color), lookup)
}

pub fn write_player<W: WriteColor>(out: &mut W, lookup: &PlayerLookup) -> io::Result<()> {
    match lookup {
        PlayerLookup::NoData => writeln!(out, "{}", NO_DATA),
        PlayerLookup::NotFound => {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            writeln!(out, "Player not found")?;
            out.reset()
        }
        PlayerLookup::Found(record) => write_record(out, record),
    }
}

pub fn write_prefix<W: WriteColor>(out: &mut W, lookup: &PrefixLookup) -> io::Result<()> {
    let PrefixLookup::Found(PrefixResult { player, top10 }) = lookup else {
        return writeln!(out, "{}", NO_DATA);
    };

    if let Some(record) = player {
        write_record(out, record)?;
        writeln!(out)?;
    }

    if top10.is_empty() {
        return writeln!(out, "No players with this prefix");
    }

    for (i, entry) in top10.iter().enumerate() {
        write_top_entry(out, i + 1, entry)?;
    }
    Ok(())
}

fn write_record<W: WriteColor>(out: &mut W, record: &PlayerRecord) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
    writeln!(out, "{}", record.name)?;
    out.reset()?;

    let rows: [(&str, CategoryRank); 6] = [
        ("points", record.points),
        ("rank", record.rank),
        ("team", record.team),
        ("weekly", record.weekly),
        ("monthly", record.monthly),
        ("yearly", record.yearly),
    ];
    for (label, category) in rows {
        write!(out, "  {:<8}", label)?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{:>10}", category.points)?;
        out.reset()?;
        if category.rank > 0 {
            writeln!(out, "  #{}", category.rank)?;
        } else {
            writeln!(out, "  unranked")?;
        }
    }
    Ok(())
}

fn write_top_entry<W: WriteColor>(out: &mut W, place: usize, entry: &PointsEntry) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
    write!(out, "{:>3}.", place)?;
    out.reset()?;
    write!(out, " {:<24}", entry.name)?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    writeln!(out, "{:>10}", entry.points)?;
    out.reset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::Buffer;

    fn render(f: impl FnOnce(&mut Buffer) -> io::Result<()>) -> String {
        let mut buf = Buffer::no_color();
        f(&mut buf).unwrap();
        String::from_utf8(buf.into_inner()).unwrap()
    }

    #[test]
    fn test_player_states() {
        assert_eq!(render(|b| write_player(b, &PlayerLookup::NoData)), format!("{}\n", NO_DATA));
        assert_eq!(render(|b| write_player(b, &PlayerLookup::NotFound)), "Player not found\n");

        let record = PlayerRecord::from_pairs(
            "ana".to_string(),
            [
                CategoryRank { points: 120, rank: 3 },
                CategoryRank::default(),
                CategoryRank::default(),
                CategoryRank::default(),
                CategoryRank::default(),
                CategoryRank::default(),
            ],
        );
        let text = render(|b| write_player(b, &PlayerLookup::Found(record)));
        assert!(text.starts_with("ana\n"));
        assert!(text.contains("120  #3"));
        assert!(text.contains("unranked"));
    }

    #[test]
    fn test_prefix_listing() {
        let lookup = PrefixLookup::Found(PrefixResult {
            player: None,
            top10: vec![PointsEntry::new("alice", 90), PointsEntry::new("albert", 70)],
        });
        let text = render(|b| write_prefix(b, &lookup));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  1. alice"));
        assert!(lines[1].trim_end().ends_with("70"));

        let empty = PrefixLookup::Found(PrefixResult {
            player: None,
            top10: Vec::new(),
        });
        assert_eq!(render(|b| write_prefix(b, &empty)), "No players with this prefix\n");
    }
}
