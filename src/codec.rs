use std::str;

use crate::exceptions::AllowlistException;

/// Strips the surrounding double quotes off a compact form, e.g.
/// `"10.0.0.1,10.0.0.2"`. Anything not quote-delimited is rejected.
pub(crate) fn unquote(input: &[u8]) -> Result<&str, AllowlistException> {
    let s = str::from_utf8(input).map_err(|_| AllowlistException::invalid_format())?;
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(AllowlistException::invalid_format)
}

pub(crate) fn compact_tokens(inner: &str) -> impl Iterator<Item = &str> {
    inner.trim()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub(crate) fn dump_lines(input: &[u8]) -> Result<impl Iterator<Item = &str>, AllowlistException> {
    let s = str::from_utf8(input).map_err(|_| AllowlistException::invalid_format())?;
    Ok(s.lines().map(str::trim).filter(|l| !l.is_empty()))
}

pub(crate) fn quote(entries: &[String]) -> String {
    format!("\"{}\"", entries.join(","))
}
