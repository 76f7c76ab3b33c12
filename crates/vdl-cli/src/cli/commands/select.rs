//! Choosing a rendition for each resolved job.

use std::io::{BufRead, Write};

use anyhow::{bail, Result};
use vdl_core::catalog::resolution_key;
use vdl_core::{DownloadJob, Rendition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Highest,
    /// Exact label, else the highest resolution below it, else the lowest.
    Quality(String),
    /// 1-based, in ascending resolution order.
    Index(usize),
    Interactive,
}

/// Index into `renditions` (ascending) for a non-interactive selection.
pub fn choose(renditions: &[Rendition], selection: &Selection) -> Result<usize> {
    if renditions.is_empty() {
        bail!("no renditions to choose from");
    }
    match selection {
        Selection::Highest | Selection::Interactive => Ok(renditions.len() - 1),
        Selection::Index(n) => {
            if *n == 0 || *n > renditions.len() {
                bail!("index {} out of range (1-{})", n, renditions.len());
            }
            Ok(n - 1)
        }
        Selection::Quality(label) => {
            if let Some(i) = renditions
                .iter()
                .rposition(|r| r.resolution_label.eq_ignore_ascii_case(label))
            {
                return Ok(i);
            }
            let wanted = resolution_key(label);
            Ok(renditions
                .iter()
                .rposition(|r| r.resolution_key() <= wanted)
                .unwrap_or(0))
        }
    }
}

/// Lists the job's renditions on `out` and reads a 1-based choice from
/// `input`. An empty line picks the highest.
pub fn prompt<R: BufRead, W: Write>(job: &DownloadJob, input: &mut R, out: &mut W) -> Result<usize> {
    let labels = job.rendition_labels();
    let title = job.metadata().map(|m| m.title.as_str()).unwrap_or("");
    writeln!(out, "{}", title)?;
    for (i, label) in labels.iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, label)?;
    }
    loop {
        write!(out, "Choose 1-{} [{}]: ", labels.len(), labels.len())?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("no selection made (end of input)");
        }
        let line = line.trim();
        if line.is_empty() {
            return choose(job.renditions(), &Selection::Highest);
        }
        match line.parse::<usize>() {
            Ok(n) if (1..=labels.len()).contains(&n) => return Ok(n - 1),
            _ => writeln!(out, "  not a valid choice: {}", line)?,
        }
    }
}
