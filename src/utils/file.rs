use anyhow::{Context, Result, bail};
use content_inspector::{ContentType, inspect};
use glob::Pattern;
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

/// Check if a path should be excluded based on a list of glob patterns.
pub fn is_path_excluded(path: &Path, exclude_patterns: &[Pattern]) -> bool {
    let path_str = path.to_string_lossy();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();

    exclude_patterns
        .iter()
        .any(|pattern| pattern.matches(&path_str) || pattern.matches(&file_name))
}

/// Compile glob patterns, skipping invalid ones.
pub fn compile_exclude_patterns(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|pattern| Pattern::new(pattern).ok())
        .collect()
}

/// List the files under `path` in a platform-independent order.
///
/// Entries of each directory are sorted by name; its files come first, then
/// its sub-directories recursively. A plain file yields itself.
pub fn files_from_path(path: &Path, exclude_patterns: &[Pattern]) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("Not a file or a directory: {}", path.display());
    }

    let mut files = Vec::new();
    collect_files(path, exclude_patterns, &mut files)?;
    Ok(files)
}

fn collect_files(dir: &Path, exclude_patterns: &[Pattern], files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| !is_path_excluded(path, exclude_patterns))
        .collect();
    entries.sort();

    files.extend(entries.iter().filter(|path| path.is_file()).cloned());
    for subdir in entries.iter().filter(|path| path.is_dir()) {
        if is_symlink(subdir) {
            warn!("Skipping symlinked directory: {}", subdir.display());
            continue;
        }
        collect_files(subdir, exclude_patterns, files)?;
    }
    Ok(())
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|metadata| metadata.file_type().is_symlink())
        .unwrap_or(false)
}

/// Split raw file content into decoded lines and byte offsets into `buffer`.
///
/// A UTF-8/16/32 byte order mark selects the decoding and is skipped, so the
/// first offset is the BOM length. Anything else is read as UTF-8 with
/// invalid sequences replaced. Offsets always count the raw bytes of each
/// line, terminator included, whatever its decoded length.
pub fn split_lines_offsets(buffer: &[u8]) -> (Vec<String>, Vec<usize>) {
    match inspect(buffer) {
        ContentType::UTF_8_BOM => split_raw_lines(buffer, 3, b"\n", decode_utf8),
        ContentType::UTF_16LE => split_raw_lines(buffer, 2, b"\n\0", |raw| {
            decode_utf16(raw, u16::from_le_bytes)
        }),
        ContentType::UTF_16BE => split_raw_lines(buffer, 2, b"\0\n", |raw| {
            decode_utf16(raw, u16::from_be_bytes)
        }),
        ContentType::UTF_32LE => split_raw_lines(buffer, 4, b"\n\0\0\0", |raw| {
            decode_utf32(raw, u32::from_le_bytes)
        }),
        ContentType::UTF_32BE => split_raw_lines(buffer, 4, b"\0\0\0\n", |raw| {
            decode_utf32(raw, u32::from_be_bytes)
        }),
        _ => split_raw_lines(buffer, 0, b"\n", decode_utf8),
    }
}

/// Split after every code unit equal to `newline`; a trailing partial unit
/// stays with the last line.
fn split_raw_lines(
    buffer: &[u8],
    bom_len: usize,
    newline: &[u8],
    decode: impl Fn(&[u8]) -> String,
) -> (Vec<String>, Vec<usize>) {
    let body = &buffer[bom_len..];
    let unit = newline.len();
    let mut lines = Vec::new();
    let mut offsets = vec![bom_len];

    let mut line_start = 0;
    let mut pos = 0;
    while pos + unit <= body.len() {
        pos += unit;
        if &body[pos - unit..pos] == newline {
            lines.push(strip_terminator(decode(&body[line_start..pos])));
            offsets.push(bom_len + pos);
            line_start = pos;
        }
    }
    if line_start < body.len() {
        lines.push(strip_terminator(decode(&body[line_start..])));
        offsets.push(buffer.len());
    }

    (lines, offsets)
}

fn strip_terminator(line: String) -> String {
    line.trim_end_matches(['\r', '\n']).to_string()
}

fn decode_utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn decode_utf16(bytes: &[u8], from_bytes: fn([u8; 2]) -> u16) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| from_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

fn decode_utf32(bytes: &[u8], from_bytes: fn([u8; 4]) -> u32) -> String {
    bytes
        .chunks_exact(4)
        .map(|quad| {
            char::from_u32(from_bytes([quad[0], quad[1], quad[2], quad[3]]))
                .unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect()
}

/// Read a text file into newline-stripped lines and cumulative byte offsets
/// into the file.
pub fn read_lines_offsets(path: &Path) -> Result<(Vec<String>, Vec<usize>)> {
    let buffer =
        fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(split_lines_offsets(&buffer))
}
