use crate::sequence::Sequence;
use flate2::read::GzDecoder;
use mycotax_core::error::MycotaxError;
use nom::{
    bytes::complete::{tag, take_till},
    character::complete::{line_ending, not_line_ending},
    combinator::{map, opt},
    sequence::preceded,
    IResult,
};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Parse a FASTA header line
fn parse_header(input: &[u8]) -> IResult<&[u8], (&str, Option<&str>)> {
    let (input, _) = tag(b">")(input)?;
    let (input, id) = map(
        take_till(|c: u8| c == b' ' || c == b'\t' || c == b'\n' || c == b'\r'),
        |s| std::str::from_utf8(s).unwrap_or(""),
    )(input)?;
    let (input, description) = opt(preceded(
        take_till(|c: u8| c != b' ' && c != b'\t'),
        map(not_line_ending, |s| std::str::from_utf8(s).unwrap_or("")),
    ))(input)?;
    let (input, _) = opt(line_ending)(input)?;
    let description = description.map(str::trim).filter(|d| !d.is_empty());
    Ok((input, (id, description)))
}

/// Parse sequence lines until next header or EOF
fn parse_sequence(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let mut sequence = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() && remaining[0] != b'>' {
        let (rest, line) =
            take_till::<_, _, nom::error::Error<_>>(|c: u8| c == b'\n' || c == b'\r')(remaining)?;
        let newlines = rest
            .iter()
            .take_while(|&&c| c == b'\n' || c == b'\r')
            .count();
        let rest = &rest[newlines..];

        sequence.extend(
            line.iter()
                .filter(|c| !c.is_ascii_whitespace())
                .map(|c| c.to_ascii_uppercase()),
        );
        remaining = rest;
    }

    Ok((remaining, sequence))
}

/// Parse a single FASTA record
fn parse_record(input: &[u8]) -> IResult<&[u8], Sequence> {
    let (input, (id, description)) = parse_header(input)?;
    let (input, sequence) = parse_sequence(input)?;

    let mut seq = Sequence::new(id.to_string(), sequence);
    if let Some(desc) = description {
        seq = seq.with_description(desc.to_string());
    }
    Ok((input, seq))
}

/// Parse FASTA from bytes
pub fn parse_fasta_from_bytes(data: &[u8]) -> Result<Vec<Sequence>, MycotaxError> {
    let mut sequences = Vec::new();
    let mut remaining = data;

    loop {
        // Skip empty lines and whitespace
        let start = remaining
            .iter()
            .position(|c| !c.is_ascii_whitespace())
            .unwrap_or(remaining.len());
        remaining = &remaining[start..];

        if remaining.is_empty() {
            break;
        }

        if remaining[0] != b'>' {
            return Err(MycotaxError::Parse(format!(
                "Expected '>' at start of FASTA record {}",
                sequences.len() + 1
            )));
        }

        let (rest, seq) = parse_record(remaining).map_err(|e| {
            MycotaxError::Parse(format!("Failed to parse FASTA record: {:?}", e))
        })?;
        if seq.id.is_empty() {
            return Err(MycotaxError::Parse(format!(
                "FASTA record {} has an empty identifier",
                sequences.len() + 1
            )));
        }
        sequences.push(seq);
        remaining = rest;
    }

    Ok(sequences)
}

/// Parse a FASTA file into sequences (supports .gz compression)
pub fn parse_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>, MycotaxError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MycotaxError::NotFound(path.display().to_string()));
    }

    let file = File::open(path)?;
    let mut buffer = Vec::new();
    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        GzDecoder::new(BufReader::new(file)).read_to_end(&mut buffer)?;
    } else {
        BufReader::new(file).read_to_end(&mut buffer)?;
    }

    let sequences = parse_fasta_from_bytes(&buffer)?;
    debug!("Parsed {} sequences from {}", sequences.len(), path.display());
    Ok(sequences)
}
