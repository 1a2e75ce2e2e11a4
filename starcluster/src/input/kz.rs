//! KZ option flag lists

use crate::error::{Error, Result};
use crate::input::version::IntegratorVersion;

/// Flags per line when writing an input file
pub const KZ_PER_LINE: usize = 10;

fn check_len(kz: &[i64], version: IntegratorVersion) -> Result<()> {
    if kz.len() == version.kz_len() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "KZ length should be {} for {version}, len={} is given",
            version.kz_len(),
            kz.len()
        )))
    }
}

/// Integer flags, exactly as many as `version` expects
pub fn parse_kz_tokens<'a>(
    tokens: impl Iterator<Item = &'a str>,
    version: IntegratorVersion,
) -> Result<Vec<i64>> {
    let kz = tokens
        .map(|tok| {
            tok.trim()
                .parse::<i64>()
                .map_err(|_| Error::Validation(format!("KZ value '{tok}' is not an integer")))
        })
        .collect::<Result<Vec<_>>>()?;
    check_len(&kz, version)?;
    Ok(kz)
}

/// Comma-separated flags as given on the command line (`--kz 1,0,2,...`)
pub fn parse_kz_list(text: &str, version: IntegratorVersion) -> Result<Vec<i64>> {
    parse_kz_tokens(text.split(','), version)
}

/// Flags as input-file lines of ten
pub fn format_kz_lines(kz: &[i64]) -> Vec<String> {
    kz.chunks(KZ_PER_LINE)
        .map(|chunk| {
            chunk
                .iter()
                .map(|k| k.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}
