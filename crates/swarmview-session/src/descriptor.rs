//! Torrent identifier parsing.
//!
//! Accepts magnet URIs and bare info hashes. Everything the session needs
//! (display name, selected file, info hash) is read once at session start.

use thiserror::Error;
use url::Url;

const MAGNET_SCHEME: &str = "magnet";
const BTIH_PREFIX: &str = "urn:btih:";

/// Metadata derived from the torrent identifier. Immutable for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDescriptor {
    /// Identifier exactly as supplied.
    pub raw: String,
    /// Display name (`dn`), when present.
    pub name: Option<String>,
    /// File to open in the media view (`ix`), when present.
    pub selected_file_index: Option<usize>,
    /// Info hash, lower-cased.
    pub info_hash: Option<String>,
    /// Tracker announce URLs (`tr`).
    pub trackers: Vec<String>,
}

/// Reasons an identifier is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// Identifier was empty or whitespace.
    #[error("identifier is empty")]
    Empty,
    /// Identifier is neither a URI nor a bare info hash.
    #[error("identifier is not a valid uri")]
    InvalidUri {
        /// Underlying URL parse failure.
        source: url::ParseError,
    },
    /// URI scheme other than `magnet`.
    #[error("identifier scheme is not supported")]
    UnsupportedScheme {
        /// Scheme that was found.
        scheme: String,
    },
    /// Magnet link without a `urn:btih:` exact topic.
    #[error("magnet link has no btih exact topic")]
    MissingInfoHash,
    /// `urn:btih:` value was empty or not alphanumeric.
    #[error("info hash is not alphanumeric")]
    InvalidInfoHash {
        /// Offending value.
        value: String,
    },
    /// `ix` was not a non-negative integer.
    #[error("file index is not a non-negative integer")]
    InvalidFileIndex {
        /// Offending value.
        value: String,
    },
}

/// Parse a torrent identifier.
///
/// # Errors
///
/// Returns a [`DescriptorError`] when the identifier is not a magnet URI with a
/// `btih` exact topic or a bare 40-character hex / 32-character base32 hash.
pub fn parse_descriptor(identifier: &str) -> Result<ParsedDescriptor, DescriptorError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(DescriptorError::Empty);
    }

    if is_bare_info_hash(trimmed) {
        return Ok(ParsedDescriptor {
            raw: identifier.to_owned(),
            name: None,
            selected_file_index: None,
            info_hash: Some(trimmed.to_ascii_lowercase()),
            trackers: Vec::new(),
        });
    }

    let url = Url::parse(trimmed).map_err(|source| DescriptorError::InvalidUri { source })?;
    if url.scheme() != MAGNET_SCHEME {
        return Err(DescriptorError::UnsupportedScheme {
            scheme: url.scheme().to_owned(),
        });
    }

    let mut descriptor = ParsedDescriptor {
        raw: identifier.to_owned(),
        name: None,
        selected_file_index: None,
        info_hash: None,
        trackers: Vec::new(),
    };

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "xt" => {
                let Some(hash) = strip_btih(&value) else {
                    continue;
                };
                if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(DescriptorError::InvalidInfoHash {
                        value: hash.to_owned(),
                    });
                }
                if descriptor.info_hash.is_none() {
                    descriptor.info_hash = Some(hash.to_ascii_lowercase());
                }
            }
            "dn" if descriptor.name.is_none() && !value.is_empty() => {
                descriptor.name = Some(value.into_owned());
            }
            "ix" => {
                let index = value.trim().parse::<usize>().map_err(|_| {
                    DescriptorError::InvalidFileIndex {
                        value: value.to_string(),
                    }
                })?;
                descriptor.selected_file_index.get_or_insert(index);
            }
            "tr" if !value.is_empty() => descriptor.trackers.push(value.into_owned()),
            _ => {}
        }
    }

    if descriptor.info_hash.is_none() {
        return Err(DescriptorError::MissingInfoHash);
    }
    Ok(descriptor)
}

fn strip_btih(value: &str) -> Option<&str> {
    let prefix = value.get(..BTIH_PREFIX.len())?;
    prefix
        .eq_ignore_ascii_case(BTIH_PREFIX)
        .then(|| &value[BTIH_PREFIX.len()..])
}

fn is_bare_info_hash(value: &str) -> bool {
    match value.len() {
        40 => value.chars().all(|c| c.is_ascii_hexdigit()),
        32 => value
            .chars()
            .all(|c| c.is_ascii_alphabetic() || ('2'..='7').contains(&c)),
        _ => false,
    }
}
