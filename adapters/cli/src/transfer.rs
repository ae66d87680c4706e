#![allow(clippy::missing_errors_doc)]

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use outbreak_core::Position;
use serde::{Deserialize, Serialize};

const SNAPSHOT_DOMAIN: &str = "outbreak";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded challenge payload.
pub(crate) const SNAPSHOT_HEADER: &str = "outbreak:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Snapshot of one shareable challenge: the seed map plus a candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ChallengeSnapshot {
    /// Number of grid columns.
    pub columns: u32,
    /// Number of grid rows.
    pub rows: u32,
    /// Seed map in marker-text form.
    pub map: String,
    /// Ordered cells the player visits, spawn cell first.
    pub player_path: Vec<Position>,
    /// Cells where boxes are dropped before the player spawns.
    pub box_placements: Vec<Position>,
}

impl ChallengeSnapshot {
    /// Encodes the snapshot into a single-line string suitable for clipboard transfer.
    #[must_use]
    pub(crate) fn encode(&self) -> String {
        let payload = SerializableSnapshot {
            map: self.map.clone(),
            player_path: self.player_path.clone(),
            box_placements: self.box_placements.clone(),
        };
        let json =
            serde_json::to_vec(&payload).expect("challenge snapshot serialization never fails");
        let encoded = STANDARD_NO_PAD.encode(json);
        format!("{SNAPSHOT_HEADER}:{}x{}:{encoded}", self.columns, self.rows)
    }

    /// Decodes a snapshot from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, ChallengeTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ChallengeTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(ChallengeTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(ChallengeTransferError::MissingVersion)?;
        let dimensions = parts
            .next()
            .ok_or(ChallengeTransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(ChallengeTransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(ChallengeTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(ChallengeTransferError::UnsupportedVersion(
                version.to_owned(),
            ));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(ChallengeTransferError::InvalidEncoding)?;
        let decoded: SerializableSnapshot =
            serde_json::from_slice(&bytes).map_err(ChallengeTransferError::InvalidPayload)?;

        Ok(Self {
            columns,
            rows,
            map: decoded.map,
            player_path: decoded.player_path,
            box_placements: decoded.box_placements,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableSnapshot {
    map: String,
    player_path: Vec<Position>,
    box_placements: Vec<Position>,
}

/// Errors that can occur while decoding challenge transfer strings.
#[derive(Debug)]
pub(crate) enum ChallengeTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded challenge.
    MissingPrefix,
    /// The encoded challenge did not contain a version segment.
    MissingVersion,
    /// The encoded challenge did not include grid dimensions.
    MissingDimensions,
    /// The encoded challenge did not include the payload segment.
    MissingPayload,
    /// The encoded challenge used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded challenge used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the encoded challenge.
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
}

impl fmt::Display for ChallengeTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "challenge code was empty"),
            Self::MissingPrefix => write!(f, "challenge code is missing the prefix"),
            Self::MissingVersion => write!(f, "challenge code is missing the version"),
            Self::MissingDimensions => write!(f, "challenge code is missing the grid dimensions"),
            Self::MissingPayload => write!(f, "challenge code is missing the payload"),
            Self::InvalidPrefix(prefix) => {
                write!(f, "challenge prefix '{prefix}' is not supported")
            }
            Self::UnsupportedVersion(version) => {
                write!(f, "challenge version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse grid dimensions '{dimensions}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode challenge payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse challenge payload: {error}")
            }
        }
    }
}

impl Error for ChallengeTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), ChallengeTransferError> {
    let (columns, rows) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| ChallengeTransferError::InvalidDimensions(dimensions.to_owned()))?;

    let columns = columns
        .trim()
        .parse::<u32>()
        .map_err(|_| ChallengeTransferError::InvalidDimensions(dimensions.to_owned()))?;
    let rows = rows
        .trim()
        .parse::<u32>()
        .map_err(|_| ChallengeTransferError::InvalidDimensions(dimensions.to_owned()))?;

    if columns == 0 || rows == 0 {
        return Err(ChallengeTransferError::InvalidDimensions(
            dimensions.to_owned(),
        ));
    }

    Ok((columns, rows))
}
