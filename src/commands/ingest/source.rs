use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};

use super::classify::read_head;
use super::types::PageRegion;

/// Where the pipeline gets document bytes and text from.
pub trait DocumentSource {
    /// Leading bytes used for media-type sniffing.
    fn head_bytes(&self, path: &Path) -> std::io::Result<Vec<u8>>;

    /// First page in reading order, blank lines removed.
    fn first_page_text(&self, path: &Path) -> Result<String>;

    /// Every page cropped to `region`, with column layout preserved.
    fn table_region_pages(&self, path: &Path, region: PageRegion) -> Result<Vec<String>>;
}

/// Text extraction through poppler's `pdftotext`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pdftotext;

/// Crop coordinates are given in pixels at this resolution, i.e. PDF points.
const RESOLUTION_DPI: u32 = 72;

impl DocumentSource for Pdftotext {
    fn head_bytes(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        read_head(path)
    }

    fn first_page_text(&self, path: &Path) -> Result<String> {
        let mut command = Command::new("pdftotext");
        command
            .arg("-enc")
            .arg("UTF-8")
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg("1")
            .arg(path)
            .arg("-");

        let pages = run_pdftotext(command, path)?;
        let first = pages.into_iter().next().unwrap_or_default();
        Ok(drop_blank_lines(&first))
    }

    fn table_region_pages(&self, path: &Path, region: PageRegion) -> Result<Vec<String>> {
        let mut command = Command::new("pdftotext");
        command
            .arg("-enc")
            .arg("UTF-8")
            .arg("-layout")
            .arg("-r")
            .arg(RESOLUTION_DPI.to_string())
            .arg("-x")
            .arg(format!("{:.0}", region.left))
            .arg("-y")
            .arg(format!("{:.0}", region.top))
            .arg("-W")
            .arg(format!("{:.0}", region.right - region.left))
            .arg("-H")
            .arg(format!("{:.0}", region.bottom - region.top))
            .arg(path)
            .arg("-");

        run_pdftotext(command, path)
    }
}

fn run_pdftotext(mut command: Command, pdf_path: &Path) -> Result<Vec<String>> {
    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    Ok(split_pages(&String::from_utf8_lossy(&output.stdout)))
}

/// Splits pdftotext output on form feeds, dropping trailing empty pages.
fn split_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() {
            pages.pop();
            continue;
        }
        break;
    }

    pages
}

fn drop_blank_lines(page: &str) -> String {
    page.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}

/// First line of `pdftotext -v`, which poppler prints on stderr.
pub fn pdftotext_version() -> Result<String> {
    let output = Command::new("pdftotext")
        .arg("-v")
        .output()
        .context("failed to run pdftotext -v; is poppler-utils installed?")?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .context("pdftotext -v printed no version")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_pages_drops_trailing_blank_pages() {
        let pages = split_pages("page one\n\u{000C}page\u{0000} two\n\u{000C}\n\u{000C}");
        assert_eq!(pages, vec!["page one\n".to_string(), "page two\n".to_string()]);
    }

    #[test]
    fn drop_blank_lines_keeps_line_order() {
        assert_eq!(
            drop_blank_lines("Competition\n\n  \nNovember 2023\nSenior Women\n"),
            "Competition\nNovember 2023\nSenior Women"
        );
    }
}
